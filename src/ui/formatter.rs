//! Pure formatting functions for UI output.
//!
//! `format_*` functions build the text and are tested directly; `display_*` functions print it.

use console::style;

use crate::cherry_pick::AppliedCommit;
use crate::cli::orchestration::{ActionOutcome, ReleasePlan};

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display the plan an action would carry out.
pub fn display_plan(plan: &ReleasePlan) {
    println!("\n{}", style("Planned release train steps:").bold());
    for line in plan.to_string().lines() {
        println!("  {}", line);
    }
    println!();
}

/// Display what an executed action produced.
pub fn display_outcome(outcome: &ActionOutcome) {
    for line in format_outcome(outcome) {
        display_success(&line);
    }
}

/// Lines describing an action outcome, most important first.
pub fn format_outcome(outcome: &ActionOutcome) -> Vec<String> {
    match outcome {
        ActionOutcome::Released(release) => vec![
            format!("Published release {}", release.tag),
            format!("Release notes: {}", release.url),
        ],
        ActionOutcome::Advanced {
            tag,
            compare_url,
            applied,
            merge_commit,
        } => {
            let mut lines = vec![format!("Created release candidate {}", tag.name)];
            if !applied.is_empty() {
                lines.push(format!("Cherry-picked {}", format_applied(applied)));
            }
            match merge_commit {
                Some(commit) => lines.push(format!("Merged into release branch as {}", commit)),
                None => lines.push("Release branch already contained the tag".to_string()),
            }
            lines.push(format!("Compare: {}", compare_url));
            lines
        }
        ActionOutcome::Skipped => vec!["Nothing to do".to_string()],
    }
}

fn format_applied(applied: &[AppliedCommit]) -> String {
    applied
        .iter()
        .map(|a| match a.mainline {
            Some(parent) => format!("{} (merge, mainline {})", a.commit, parent),
            None => a.commit.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{CommitRef, ReleaseRef, TagRef};

    #[test]
    fn test_format_release() {
        let lines = format_outcome(&ActionOutcome::Released(ReleaseRef {
            tag: "portal/v1.0.0".into(),
            url: "https://github.com/acme/portal/releases/tag/portal/v1.0.0".into(),
        }));
        assert_eq!(lines[0], "Published release portal/v1.0.0");
    }

    #[test]
    fn test_format_advanced_with_merge_commit_pick() {
        let lines = format_outcome(&ActionOutcome::Advanced {
            tag: TagRef {
                name: "portal/v1.0.0-rc2".into(),
                commit: CommitRef::new("tip"),
            },
            compare_url: "https://github.com/acme/portal/compare/a...b".into(),
            applied: vec![
                AppliedCommit {
                    commit: CommitRef::new("aaa"),
                    mainline: None,
                },
                AppliedCommit {
                    commit: CommitRef::new("mmm"),
                    mainline: Some(1),
                },
            ],
            merge_commit: None,
        });

        assert_eq!(lines[1], "Cherry-picked aaa, mmm (merge, mainline 1)");
        assert_eq!(lines[2], "Release branch already contained the tag");
    }
}
