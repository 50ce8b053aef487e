// tests/github_test.rs
use release_train::host::{CommitRef, GitHubClient, RepositoryClient, RetryConfig};
use release_train::ReleaseError;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RETRY_NOW: RetryConfig = RetryConfig {
    max_retries: 2,
    initial_delay: Duration::ZERO,
    max_delay: Duration::ZERO,
    backoff_multiplier: 1.0,
};

fn client(server: &MockServer) -> GitHubClient {
    // reqwest's blocking client must not be built on an async runtime thread.
    let uri = server.uri();
    std::thread::spawn(move || GitHubClient::new(&uri, "acme/portal", "token"))
        .join()
        .unwrap()
        .unwrap()
        .with_retry(RetryConfig::NONE)
}

/// The client is blocking, so it has to run off the async test runtime.
async fn blocking<T, F>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tag_ref_points_at_tag_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/portal/git/tags"))
        .and(body_partial_json(json!({ "tag": "portal/v1.0.0-rc2", "object": "c0ffee" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": "7a90b1ec7" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/portal/git/refs"))
        .and(body_partial_json(json!({
            "ref": "refs/tags/portal/v1.0.0-rc2",
            "sha": "7a90b1ec7",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let tag = blocking(move || {
        client.create_tag("portal/v1.0.0-rc2", "rc2", &CommitRef::new("c0ffee"))
    })
    .await
    .unwrap();

    assert_eq!(tag.name, "portal/v1.0.0-rc2");
    assert_eq!(tag.commit, CommitRef::new("c0ffee"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_existing_branch_is_ref_exists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/portal/git/refs"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "message": "Reference already exists" })),
        )
        .mount(&server)
        .await;

    let client = client(&server);
    let result = blocking(move || {
        client.create_branch("release/portal/v2.0.0", &CommitRef::new("abc"))
    })
    .await;

    match result {
        Err(ReleaseError::RefExists(name)) => assert_eq!(name, "release/portal/v2.0.0"),
        other => panic!("expected RefExists, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_other_unprocessable_ref_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/portal/git/refs"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "message": "Object does not exist" })),
        )
        .mount(&server)
        .await;

    let client = client(&server);
    let result = blocking(move || client.create_branch("release/portal/v2.0.0", &CommitRef::new("abc")))
        .await;

    assert!(matches!(result, Err(ReleaseError::Api { status: 422, .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_merge_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/portal/merges"))
        .and(body_partial_json(json!({ "head": "conflicting" })))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({ "message": "Merge conflict" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/portal/merges"))
        .and(body_partial_json(json!({ "head": "merged" })))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/portal/merges"))
        .and(body_partial_json(json!({ "head": "fresh" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": "m3rg3" })))
        .mount(&server)
        .await;

    let client = client(&server);
    let (conflict, noop, created) = blocking(move || {
        (
            client.merge("main", &CommitRef::new("conflicting"), "merge"),
            client.merge("main", &CommitRef::new("merged"), "merge"),
            client.merge("main", &CommitRef::new("fresh"), "merge"),
        )
    })
    .await;

    match conflict {
        Err(ReleaseError::MergeConflict { into, from }) => {
            assert_eq!(into, "main");
            assert_eq!(from, "conflicting");
        }
        other => panic!("expected MergeConflict, got {:?}", other),
    }
    assert_eq!(noop.unwrap(), None);
    assert_eq!(created.unwrap(), Some(CommitRef::new("m3rg3")));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_commit_is_commit_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/portal/commits/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/portal/commits/zzz"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "message": "No commit found for SHA: zzz" })),
        )
        .mount(&server)
        .await;

    let client = client(&server);
    let (missing, malformed) = blocking(move || {
        (client.resolve_commit("missing"), client.resolve_commit("zzz"))
    })
    .await;

    assert!(matches!(missing, Err(ReleaseError::CommitNotFound(h)) if h == "missing"));
    assert!(matches!(malformed, Err(ReleaseError::CommitNotFound(h)) if h == "zzz"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/portal/commits/abc"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/portal/commits/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sha": "abc123" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server).with_retry(RETRY_NOW);
    let commit = blocking(move || client.resolve_commit("abc")).await.unwrap();

    assert_eq!(commit, CommitRef::new("abc123"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_transient_failure_without_retries_surfaces() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/portal/branches/main"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "message": "Unavailable" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let result = blocking(move || client.get_branch_tip("main")).await;

    assert!(matches!(result, Err(ReleaseError::Api { status: 503, .. })));
}
