//! Pull request discovery against the GitHub search API.
//!
//! This module provides the trait-based source for fetching the snapshot of
//! currently-open pull requests across an organization. The trait-based
//! design enables mocking in tests while [`GraphqlPullRequestSource`] issues
//! real GraphQL search requests through Octocrab. GraphQL search is the one
//! listing surface that reports `reviewDecision` alongside the rest of the
//! pull request metadata.

mod error_mapping;

use async_trait::async_trait;
use http::Uri;
use octocrab::Octocrab;

use crate::github::error::SourceError;
use crate::github::identity::{OrganizationName, PersonalAccessToken};
use crate::github::models::{
    ApiPageInfo, ApiSearchData, GraphQlResponse, ObservedPullRequest,
};

use error_mapping::map_octocrab_error;

/// Number of pull requests requested per search page.
///
/// Matches the provider's listing page size, so one "light" pass covers the
/// most recently active window.
pub const DEFAULT_PAGE_SIZE: u8 = 25;

/// GraphQL query for one page of open pull requests in an organization.
const SEARCH_QUERY: &str = "\
query($search: String!, $first: Int!, $after: String) {\
  search(query: $search, type: ISSUE, first: $first, after: $after) {\
    pageInfo { hasNextPage endCursor }\
    nodes {\
      ... on PullRequest {\
        number\
        title\
        url\
        isDraft\
        reviewDecision\
        createdAt\
        fullDatabaseId\
        author { login }\
        repository { name }\
        labels(first: 20) { nodes { name } }\
      }\
    }\
  }\
}";

/// Source that can produce a snapshot of currently-open pull requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Fetch a single page of pull requests for the organization.
    async fn fetch_page(
        &self,
        organization: &OrganizationName,
        page: u32,
        open_only: bool,
    ) -> Result<Vec<ObservedPullRequest>, SourceError>;

    /// Fetch the complete paginated set of pull requests for the
    /// organization.
    async fn fetch_all(
        &self,
        organization: &OrganizationName,
        open_only: bool,
    ) -> Result<Vec<ObservedPullRequest>, SourceError>;
}

/// Octocrab-backed source issuing GraphQL search queries.
pub struct GraphqlPullRequestSource {
    client: Octocrab,
    page_size: u8,
}

impl GraphqlPullRequestSource {
    /// Creates a source from an Octocrab client.
    #[must_use]
    pub const fn new(client: Octocrab) -> Self {
        Self {
            client,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Builds an authenticated source for the given token and API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidApiBase`] when the base URI cannot be
    /// parsed or [`SourceError::Api`] when Octocrab fails to construct a
    /// client.
    pub fn for_token(token: &PersonalAccessToken, api_base: &str) -> Result<Self, SourceError> {
        let base_uri: Uri = api_base
            .parse::<Uri>()
            .map_err(|error| SourceError::InvalidApiBase(error.to_string()))?;

        let client = Octocrab::builder()
            .personal_token(token.as_ref())
            .base_uri(base_uri)
            .map_err(|error| SourceError::Api {
                message: format!("build client failed: {error}"),
            })?
            .build()
            .map_err(|error| map_octocrab_error("build client", &error))?;

        Ok(Self::new(client))
    }

    /// Overrides the search page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u8) -> Self {
        self.page_size = page_size;
        self
    }

    async fn fetch_chunk(
        &self,
        organization: &OrganizationName,
        search: &str,
        after: Option<&str>,
    ) -> Result<(Vec<ObservedPullRequest>, ApiPageInfo), SourceError> {
        let payload = serde_json::json!({
            "query": SEARCH_QUERY,
            "variables": {
                "search": search,
                "first": i64::from(self.page_size),
                "after": after,
            },
        });

        let response: GraphQlResponse<ApiSearchData> = self
            .client
            .graphql(&payload)
            .await
            .map_err(|error| map_octocrab_error("search pull requests", &error))?;

        if let Some(errors) = response.errors {
            if !errors.is_empty() {
                let message = errors
                    .into_iter()
                    .map(|error| error.message)
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(SourceError::Api {
                    message: format!("search pull requests failed: {message}"),
                });
            }
        }

        let data = response.data.ok_or_else(|| SourceError::MalformedResponse {
            message: "search response carried no data".to_owned(),
        })?;

        let observed = data
            .search
            .nodes
            .into_iter()
            .filter_map(|node| node.into_observed(organization.as_str()))
            .collect();

        Ok((observed, data.search.page_info))
    }
}

/// Builds the search term for open pull requests in an organization.
fn search_term(organization: &OrganizationName, open_only: bool) -> String {
    let mut term = format!("org:{organization} is:pr");
    if open_only {
        term.push_str(" is:open");
    }
    term
}

#[async_trait]
impl PullRequestSource for GraphqlPullRequestSource {
    /// Fetch a single page of pull requests.
    ///
    /// The provider paginates by cursor, so requesting a page beyond the
    /// first traverses the earlier pages to reach it. Pages past the end of
    /// the result set come back empty.
    async fn fetch_page(
        &self,
        organization: &OrganizationName,
        page: u32,
        open_only: bool,
    ) -> Result<Vec<ObservedPullRequest>, SourceError> {
        if page == 0 {
            return Err(SourceError::InvalidPagination {
                message: "page must be at least 1".to_owned(),
            });
        }

        let search = search_term(organization, open_only);
        let mut cursor: Option<String> = None;

        for _ in 1..page {
            let (_, page_info) = self
                .fetch_chunk(organization, &search, cursor.as_deref())
                .await?;
            if !page_info.has_next_page {
                return Ok(Vec::new());
            }
            cursor = page_info.end_cursor;
        }

        let (observed, _) = self
            .fetch_chunk(organization, &search, cursor.as_deref())
            .await?;
        Ok(observed)
    }

    async fn fetch_all(
        &self,
        organization: &OrganizationName,
        open_only: bool,
    ) -> Result<Vec<ObservedPullRequest>, SourceError> {
        let search = search_term(organization, open_only);
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let (mut chunk, page_info) = self
                .fetch_chunk(organization, &search, cursor.as_deref())
                .await?;
            all.append(&mut chunk);

            if !page_info.has_next_page {
                break;
            }
            let Some(next_cursor) = page_info.end_cursor else {
                // The provider reported another page without a cursor to
                // continue from; stop rather than re-request the same page.
                break;
            };
            cursor = Some(next_cursor);
        }

        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{GraphqlPullRequestSource, PullRequestSource, search_term};
    use crate::github::error::SourceError;
    use crate::github::identity::{OrganizationName, PersonalAccessToken};

    fn search_page(nodes: serde_json::Value, has_next: bool, cursor: Option<&str>) -> serde_json::Value {
        json!({
            "data": {
                "search": {
                    "pageInfo": { "hasNextPage": has_next, "endCursor": cursor },
                    "nodes": nodes,
                }
            }
        })
    }

    fn pull_request_node(number: u64, repository: &str) -> serde_json::Value {
        json!({
            "number": number,
            "title": format!("PR {number}"),
            "url": format!("https://github.com/acme/{repository}/pull/{number}"),
            "isDraft": false,
            "reviewDecision": "REVIEW_REQUIRED",
            "createdAt": "2026-02-01T12:00:00Z",
            "fullDatabaseId": number.to_string(),
            "author": { "login": "alice" },
            "repository": { "name": repository },
            "labels": { "nodes": [] }
        })
    }

    async fn source_for(server: &MockServer) -> GraphqlPullRequestSource {
        let token = PersonalAccessToken::new("valid-token").expect("token should be valid");
        GraphqlPullRequestSource::for_token(&token, &server.uri())
            .expect("source should be constructed")
    }

    #[test]
    fn search_term_includes_open_filter() {
        let organization = OrganizationName::new("acme").expect("name should be valid");
        assert_eq!(search_term(&organization, true), "org:acme is:pr is:open");
        assert_eq!(search_term(&organization, false), "org:acme is:pr");
    }

    #[tokio::test]
    async fn fetch_page_converts_search_nodes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_page(
                json!([pull_request_node(1, "svc"), {}]),
                false,
                None,
            )))
            .mount(&server)
            .await;

        let source = source_for(&server).await;
        let organization = OrganizationName::new("acme").expect("name should be valid");

        let observed = source
            .fetch_page(&organization, 1, true)
            .await
            .expect("fetch should succeed");

        assert_eq!(observed.len(), 1, "non-PR nodes should be dropped");
        assert_eq!(observed[0].key.to_string(), "acme#svc#1");
        assert!(observed[0].review_decision.is_review_required());
    }

    #[tokio::test]
    async fn fetch_all_follows_cursors_until_exhausted() {
        let server = MockServer::start().await;

        // Mount the cursor-specific page first so it wins over the catch-all.
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(body_partial_json(json!({
                "variables": { "after": "CURSOR-1" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_page(
                json!([pull_request_node(2, "svc")]),
                false,
                None,
            )))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_page(
                json!([pull_request_node(1, "svc")]),
                true,
                Some("CURSOR-1"),
            )))
            .mount(&server)
            .await;

        let source = source_for(&server).await;
        let organization = OrganizationName::new("acme").expect("name should be valid");

        let observed = source
            .fetch_all(&organization, true)
            .await
            .expect("fetch should succeed");

        let numbers: Vec<u64> = observed.iter().map(|pr| pr.key.number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[tokio::test]
    async fn graphql_errors_surface_as_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{ "message": "field 'reviewDecision' is unavailable" }]
            })))
            .mount(&server)
            .await;

        let source = source_for(&server).await;
        let organization = OrganizationName::new("acme").expect("name should be valid");

        let error = source
            .fetch_page(&organization, 1, true)
            .await
            .expect_err("fetch should fail");

        assert!(matches!(error, SourceError::Api { .. }), "got {error:?}");
    }

    #[tokio::test]
    async fn authentication_failure_is_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "message": "Bad credentials",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&server)
            .await;

        let source = source_for(&server).await;
        let organization = OrganizationName::new("acme").expect("name should be valid");

        let error = source
            .fetch_all(&organization, true)
            .await
            .expect_err("fetch should fail");

        assert!(
            matches!(error, SourceError::Authentication { .. }),
            "got {error:?}"
        );
    }

    #[tokio::test]
    async fn zero_page_is_rejected() {
        let server = MockServer::start().await;
        let source = source_for(&server).await;
        let organization = OrganizationName::new("acme").expect("name should be valid");

        let error = source
            .fetch_page(&organization, 0, true)
            .await
            .expect_err("page 0 should be rejected");

        assert!(matches!(error, SourceError::InvalidPagination { .. }));
    }
}
