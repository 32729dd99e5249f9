//! Data models for observed and stored pull requests.
//!
//! This module contains the domain models flowing through the reconciliation
//! pipeline. Types prefixed with `Api` are internal deserialisation targets
//! for the GraphQL search response and convert into the public domain types.
//! The provider output is treated as untrusted: every non-identity field is
//! optional on the wire and defaults to a zero value when extraction fails.

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Composite identity of a pull request, stable across fetch cycles.
///
/// Two observations of the same real-world pull request always produce the
/// same key, regardless of which fetch cycle produced them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PullRequestKey {
    /// Organization that owns the repository.
    pub organization: String,
    /// Repository name within the organization.
    pub repository: String,
    /// Pull request number within the repository.
    pub number: u64,
}

impl PullRequestKey {
    /// Creates a key from its components.
    #[must_use]
    pub fn new(
        organization: impl Into<String>,
        repository: impl Into<String>,
        number: u64,
    ) -> Self {
        Self {
            organization: organization.into(),
            repository: repository.into(),
            number,
        }
    }
}

impl std::fmt::Display for PullRequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{organization}#{repository}#{number}",
            organization = self.organization,
            repository = self.repository,
            number = self.number
        )
    }
}

/// Review decision reported by the provider for a pull request.
///
/// The provider defines this set and may grow it; values outside the two the
/// reconciliation condition cares about are preserved verbatim in
/// [`ReviewDecision::Other`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    /// No decision reported (empty provider value).
    Unknown,
    /// The pull request requires a review ("Review required").
    ReviewRequired,
    /// The pull request has been approved ("Approved").
    Approved,
    /// A provider-defined value this crate does not interpret.
    Other(String),
}

/// Provider display string for [`ReviewDecision::ReviewRequired`].
const REVIEW_REQUIRED: &str = "Review required";

/// Provider display string for [`ReviewDecision::Approved`].
const APPROVED: &str = "Approved";

impl ReviewDecision {
    /// Parses the stored provider string form.
    #[must_use]
    pub fn from_provider(value: &str) -> Self {
        match value {
            "" => Self::Unknown,
            REVIEW_REQUIRED => Self::ReviewRequired,
            APPROVED => Self::Approved,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Maps the GraphQL `reviewDecision` enum value, `None` for null.
    #[must_use]
    pub fn from_graphql(value: Option<&str>) -> Self {
        match value {
            None => Self::Unknown,
            Some("REVIEW_REQUIRED") => Self::ReviewRequired,
            Some("APPROVED") => Self::Approved,
            Some("CHANGES_REQUESTED") => Self::Other("Changes requested".to_owned()),
            Some(other) => Self::Other(other.to_owned()),
        }
    }

    /// Returns the provider string form used for storage and display.
    #[must_use]
    pub fn as_provider_str(&self) -> &str {
        match self {
            Self::Unknown => "",
            Self::ReviewRequired => REVIEW_REQUIRED,
            Self::Approved => APPROVED,
            Self::Other(value) => value,
        }
    }

    /// Returns true when the decision is "Review required".
    #[must_use]
    pub const fn is_review_required(&self) -> bool {
        matches!(self, Self::ReviewRequired)
    }

    /// Returns true when the decision is "Approved".
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl std::fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_provider_str())
    }
}

/// A pull request as observed in one fetch cycle.
///
/// Carries no notification state; a fresh observation never knows whether a
/// notification has been sent. That flag lives on [`StoredPullRequest`] and
/// is recovered by reading the prior stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedPullRequest {
    /// Composite identity of the pull request.
    pub key: PullRequestKey,
    /// Provider-assigned numeric id; may be absent for draft items.
    pub github_id: Option<u64>,
    /// Creation timestamp when the provider reported one.
    pub created_at: Option<DateTime<Utc>>,
    /// Login of the pull request creator, empty when extraction failed.
    pub creator: String,
    /// Pull request title, empty when extraction failed.
    pub title: String,
    /// Canonical HTML URL, empty when extraction failed.
    pub url: String,
    /// Label names; unordered and may repeat across fetches in any order.
    pub labels: Vec<String>,
    /// Whether the pull request is a draft.
    pub draft: bool,
    /// Review decision reported by the provider.
    pub review_decision: ReviewDecision,
}

/// The store's resident copy of a pull request.
///
/// Created on first successful reconciliation of a previously-unseen key,
/// overwritten in place on qualifying updates, never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPullRequest {
    /// The most recently persisted observation.
    pub pull_request: ObservedPullRequest,
    /// Whether a notification has ever been sent for this identity.
    ///
    /// Transitions false to true at most once, ever.
    pub notified: bool,
}

impl StoredPullRequest {
    /// Wraps an observation with its notification state.
    #[must_use]
    pub const fn new(pull_request: ObservedPullRequest, notified: bool) -> Self {
        Self {
            pull_request,
            notified,
        }
    }
}

/// Envelope of a GraphQL response body.
#[derive(Debug, Clone, Deserialize)]
pub(super) struct GraphQlResponse<T> {
    pub(super) data: Option<T>,
    pub(super) errors: Option<Vec<GraphQlErrorMessage>>,
}

/// A single entry of the GraphQL `errors` array.
#[derive(Debug, Clone, Deserialize)]
pub(super) struct GraphQlErrorMessage {
    pub(super) message: String,
}

/// `data` payload of the pull request search query.
#[derive(Debug, Clone, Deserialize)]
pub(super) struct ApiSearchData {
    pub(super) search: ApiSearchConnection,
}

/// The `search` connection: one page of results plus cursor state.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ApiSearchConnection {
    pub(super) page_info: ApiPageInfo,
    #[serde(default)]
    pub(super) nodes: Vec<ApiSearchNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ApiPageInfo {
    pub(super) has_next_page: bool,
    pub(super) end_cursor: Option<String>,
}

/// One search result node.
///
/// The inline fragment only populates fields for pull request nodes; any
/// other node type deserialises as an empty object and is dropped during
/// conversion.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ApiSearchNode {
    pub(super) number: Option<u64>,
    pub(super) title: Option<String>,
    pub(super) url: Option<String>,
    pub(super) is_draft: Option<bool>,
    pub(super) review_decision: Option<String>,
    pub(super) created_at: Option<DateTime<Utc>>,
    pub(super) full_database_id: Option<String>,
    pub(super) author: Option<ApiActor>,
    pub(super) repository: Option<ApiRepositoryRef>,
    pub(super) labels: Option<ApiLabelConnection>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ApiActor {
    pub(super) login: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ApiRepositoryRef {
    pub(super) name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ApiLabelConnection {
    #[serde(default)]
    pub(super) nodes: Vec<Option<ApiLabel>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ApiLabel {
    pub(super) name: Option<String>,
}

impl ApiSearchNode {
    /// Converts a search node into an observation for `organization`.
    ///
    /// Returns `None` when the node is not a pull request (no number or no
    /// repository), mirroring how non-matching rows are dropped rather than
    /// failing the whole page.
    pub(super) fn into_observed(self, organization: &str) -> Option<ObservedPullRequest> {
        let number = self.number?;
        let repository = self.repository.and_then(|repository| repository.name)?;

        let labels = self
            .labels
            .map(|connection| {
                connection
                    .nodes
                    .into_iter()
                    .flatten()
                    .filter_map(|label| label.name)
                    .collect()
            })
            .unwrap_or_default();

        Some(ObservedPullRequest {
            key: PullRequestKey::new(organization, repository, number),
            github_id: self
                .full_database_id
                .and_then(|id| id.parse::<u64>().ok()),
            created_at: self.created_at,
            creator: self
                .author
                .and_then(|author| author.login)
                .unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            url: self.url.unwrap_or_default(),
            labels,
            draft: self.is_draft.unwrap_or(false),
            review_decision: ReviewDecision::from_graphql(self.review_decision.as_deref()),
        })
    }
}
