//! Test helpers for constructing pull request fixtures.
//!
//! This module provides builder functions for creating [`ObservedPullRequest`]
//! instances in tests, reducing boilerplate and ensuring consistency across
//! test modules.
//!
//! # Examples
//!
//! ```
//! use prnotify::github::models::ReviewDecision;
//! use prnotify::github::models::test_support::{minimal_observed, observed_with_decision};
//!
//! let observed = minimal_observed("acme", "svc", 1);
//! let approved = observed_with_decision(&observed, ReviewDecision::Approved);
//! assert!(approved.review_decision.is_approved());
//! ```

use super::{ObservedPullRequest, PullRequestKey, ReviewDecision};

/// Constructs a minimal non-draft observation with no review decision.
///
/// # Examples
///
/// ```
/// use prnotify::github::models::test_support::minimal_observed;
///
/// let observed = minimal_observed("acme", "svc", 1);
/// assert_eq!(observed.key.to_string(), "acme#svc#1");
/// assert!(!observed.draft);
/// ```
#[must_use]
pub fn minimal_observed(organization: &str, repository: &str, number: u64) -> ObservedPullRequest {
    ObservedPullRequest {
        key: PullRequestKey::new(organization, repository, number),
        github_id: Some(number),
        created_at: None,
        creator: "alice".to_owned(),
        title: format!("Pull request {number}"),
        url: format!("https://github.com/{organization}/{repository}/pull/{number}"),
        labels: Vec::new(),
        draft: false,
        review_decision: ReviewDecision::Unknown,
    }
}

/// Clones an observation with a different review decision.
#[must_use]
pub fn observed_with_decision(
    base: &ObservedPullRequest,
    review_decision: ReviewDecision,
) -> ObservedPullRequest {
    ObservedPullRequest {
        review_decision,
        ..base.clone()
    }
}

/// Clones an observation with a different draft flag.
#[must_use]
pub fn observed_with_draft(base: &ObservedPullRequest, draft: bool) -> ObservedPullRequest {
    ObservedPullRequest {
        draft,
        // Provider ids are absent while a pull request is a draft.
        github_id: if draft { None } else { base.github_id },
        ..base.clone()
    }
}
