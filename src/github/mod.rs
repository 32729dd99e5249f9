//! GitHub pull request discovery: identity wrappers, domain models, and the
//! search-backed source.

pub mod error;
pub mod identity;
pub mod models;
pub mod source;

pub use error::SourceError;
pub use identity::{OrganizationName, PersonalAccessToken};
pub use models::{ObservedPullRequest, PullRequestKey, ReviewDecision, StoredPullRequest};
pub use source::{GraphqlPullRequestSource, PullRequestSource};
