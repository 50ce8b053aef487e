//! GitHub REST implementation of [RepositoryClient].

use crate::error::{ReleaseError, Result};
use crate::host::retry::{is_transient_status, RetryConfig};
use crate::host::{BranchRef, CommitRef, NewRelease, ReleaseRef, RepositoryClient, TagRef};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct ApiCommitPointer {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ApiNamedRef {
    name: String,
    commit: ApiCommitPointer,
}

#[derive(Debug, Deserialize)]
struct ApiGitTag {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ApiRelease {
    tag_name: String,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// A GitHub API client scoped to one repository.
pub struct GitHubClient {
    http: Client,
    api_url: String,
    html_url: String,
    owner: String,
    repo: String,
    retry: RetryConfig,
}

impl GitHubClient {
    /// Create a client for `repository` (`owner/repo`) authenticated with `token`
    pub fn new(api_url: &str, repository: &str, token: &str) -> Result<Self> {
        let (owner, repo) = split_repository(repository)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("release-train"));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ReleaseError::config("GITHUB_TOKEN contains invalid characters"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder().default_headers(headers).build()?;
        let api_url = api_url.trim_end_matches('/').to_string();

        Ok(GitHubClient {
            html_url: web_url(&api_url, &owner, &repo),
            http,
            api_url,
            owner,
            repo,
            retry: RetryConfig::default(),
        })
    }

    /// Replace the retry policy for transient failures
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.api_url, self.owner, self.repo, path)
    }

    /// Send a request, retrying transient failures, and hand back whatever the host answered.
    fn send(&self, method: Method, path: &str, body: Option<&serde_json::Value>) -> Result<Response> {
        let url = self.url(path);
        let mut delays = self.retry.delays();

        loop {
            let mut request = self.http.request(method.clone(), &url);
            if let Some(body) = body {
                request = request.json(body);
            }

            debug!(method = %method, url = %url, "github request");
            let outcome = request.send();

            let retryable = match &outcome {
                Ok(response) => is_transient_status(response.status().as_u16()),
                Err(e) => e.is_timeout() || e.is_connect(),
            };

            match delays.next() {
                Some(delay) if retryable => {
                    warn!(url = %url, delay_secs = delay.as_secs_f64(), "transient github failure, retrying");
                    std::thread::sleep(delay);
                }
                _ => return Ok(outcome?),
            }
        }
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::GET, path, None)?;
        if !response.status().is_success() {
            return Err(error_from(response));
        }
        Ok(response.json()?)
    }

    fn get_all_pages<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        for page in 1.. {
            let batch: Vec<T> = self.get_json(&format!("{}?per_page={}&page={}", path, PAGE_SIZE, page))?;
            let done = batch.len() < PAGE_SIZE;
            items.extend(batch);
            if done {
                break;
            }
        }
        Ok(items)
    }

    fn create_ref(&self, reference: &str, sha: &str) -> Result<()> {
        let body = json!({ "ref": reference, "sha": sha });
        let response = self.send(Method::POST, "git/refs", Some(&body))?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNPROCESSABLE_ENTITY => {
                let text = response.text().unwrap_or_default();
                if !text.contains("already exists") {
                    return Err(ReleaseError::api(422, text));
                }
                let short = reference
                    .strip_prefix("refs/heads/")
                    .or_else(|| reference.strip_prefix("refs/tags/"))
                    .unwrap_or(reference);
                Err(ReleaseError::RefExists(short.to_string()))
            }
            _ => Err(error_from(response)),
        }
    }
}

impl RepositoryClient for GitHubClient {
    fn get_branch_tip(&self, name: &str) -> Result<CommitRef> {
        let branch: ApiNamedRef = self.get_json(&format!("branches/{}", name))?;
        Ok(CommitRef::new(branch.commit.sha))
    }

    fn create_branch(&self, name: &str, from: &CommitRef) -> Result<BranchRef> {
        self.create_ref(&format!("refs/heads/{}", name), from.as_str())?;
        Ok(BranchRef {
            name: name.to_string(),
            commit: from.clone(),
        })
    }

    fn create_tag(&self, name: &str, message: &str, target: &CommitRef) -> Result<TagRef> {
        let body = json!({
            "tag": name,
            "message": message,
            "object": target.as_str(),
            "type": "commit",
        });
        let response = self.send(Method::POST, "git/tags", Some(&body))?;
        if !response.status().is_success() {
            return Err(error_from(response));
        }
        let tag_object: ApiGitTag = response.json()?;
        debug!(tag = name, object = %tag_object.sha, "created tag object");

        // An annotated tag ref points at the tag object, not at the tagged commit.
        self.create_ref(&format!("refs/tags/{}", name), &tag_object.sha)?;
        Ok(TagRef {
            name: name.to_string(),
            commit: target.clone(),
        })
    }

    fn create_release(&self, release: &NewRelease) -> Result<ReleaseRef> {
        let body = json!({
            "tag_name": release.tag,
            "name": release.title,
            "body": release.body,
            "draft": release.draft,
            "target_commitish": release.target,
            "generate_release_notes": release.generate_notes,
        });
        let response = self.send(Method::POST, "releases", Some(&body))?;
        match response.status() {
            status if status.is_success() => {
                let created: ApiRelease = response.json()?;
                Ok(ReleaseRef {
                    tag: created.tag_name,
                    url: created.html_url,
                })
            }
            StatusCode::UNPROCESSABLE_ENTITY => {
                let text = response.text().unwrap_or_default();
                if text.contains("already_exists") {
                    Err(ReleaseError::RefExists(release.tag.clone()))
                } else {
                    Err(ReleaseError::api(422, text))
                }
            }
            _ => Err(error_from(response)),
        }
    }

    fn list_tags(&self) -> Result<Vec<TagRef>> {
        let tags: Vec<ApiNamedRef> = self.get_all_pages("tags")?;
        Ok(tags
            .into_iter()
            .map(|t| TagRef {
                name: t.name,
                commit: CommitRef::new(t.commit.sha),
            })
            .collect())
    }

    fn list_branches(&self) -> Result<Vec<BranchRef>> {
        let branches: Vec<ApiNamedRef> = self.get_all_pages("branches")?;
        Ok(branches
            .into_iter()
            .map(|b| BranchRef {
                name: b.name,
                commit: CommitRef::new(b.commit.sha),
            })
            .collect())
    }

    fn merge(&self, into: &str, from: &CommitRef, message: &str) -> Result<Option<CommitRef>> {
        let body = json!({
            "base": into,
            "head": from.as_str(),
            "commit_message": message,
        });
        let response = self.send(Method::POST, "merges", Some(&body))?;
        match response.status() {
            StatusCode::CREATED => {
                let merge: ApiCommitPointer = response.json()?;
                Ok(Some(CommitRef::new(merge.sha)))
            }
            StatusCode::NO_CONTENT => Ok(None),
            StatusCode::CONFLICT => Err(ReleaseError::MergeConflict {
                into: into.to_string(),
                from: from.to_string(),
            }),
            _ => Err(error_from(response)),
        }
    }

    fn resolve_commit(&self, hash: &str) -> Result<CommitRef> {
        let response = self.send(Method::GET, &format!("commits/{}", hash), None)?;
        match response.status() {
            status if status.is_success() => {
                let commit: ApiCommitPointer = response.json()?;
                Ok(CommitRef::new(commit.sha))
            }
            StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(ReleaseError::CommitNotFound(hash.to_string()))
            }
            _ => Err(error_from(response)),
        }
    }

    fn html_url(&self) -> String {
        self.html_url.clone()
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_url", &self.api_url)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .finish_non_exhaustive()
    }
}

fn error_from(response: Response) -> ReleaseError {
    let status = response.status().as_u16();
    let text = response.text().unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&text)
        .map(|body| body.message)
        .unwrap_or(text);
    ReleaseError::api(status, message)
}

/// Split `owner/repo` into its two halves
fn split_repository(repository: &str) -> Result<(String, String)> {
    match repository.trim().split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(ReleaseError::config(format!(
            "repository '{}' must look like owner/repo",
            repository
        ))),
    }
}

/// Browser URL for a repository served by `api_url`
///
/// github.com answers on api.github.com; Enterprise servers on `<host>/api/v3`.
fn web_url(api_url: &str, owner: &str, repo: &str) -> String {
    let base = if api_url.contains("://api.github.com") {
        "https://github.com".to_string()
    } else {
        api_url.trim_end_matches("/api/v3").to_string()
    };
    format!("{}/{}/{}", base, owner, repo)
}
