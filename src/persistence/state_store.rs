//! `SQLite`-backed state store for last-known pull request state.
//!
//! The reconciliation engine reads and writes one row per pull request
//! identity. Rows are created on first observation, overwritten in place on
//! qualifying updates, and never deleted: closed or merged pull requests
//! simply stop appearing in future fetches and their row goes stale.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::Connection;
use diesel::OptionalExtension;
use diesel::QueryableByName;
use diesel::RunQueryDsl;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Bool, Nullable, Text};
use diesel::sqlite::SqliteConnection;

use crate::github::models::{
    ObservedPullRequest, PullRequestKey, ReviewDecision, StoredPullRequest,
};

use super::StoreError;

const STATE_TABLE: &str = "pull_request_state";

/// Key-value persistence for stored pull request records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Reads the stored record for a key, `None` when never observed.
    async fn get(&self, key: &PullRequestKey) -> Result<Option<StoredPullRequest>, StoreError>;

    /// Inserts or overwrites the stored record for a key.
    async fn put(&self, key: &PullRequestKey, record: &StoredPullRequest)
    -> Result<(), StoreError>;
}

#[async_trait]
impl<S> StateStore for std::sync::Arc<S>
where
    S: StateStore + ?Sized,
{
    async fn get(&self, key: &PullRequestKey) -> Result<Option<StoredPullRequest>, StoreError> {
        (**self).get(key).await
    }

    async fn put(
        &self,
        key: &PullRequestKey,
        record: &StoredPullRequest,
    ) -> Result<(), StoreError> {
        (**self).put(key, record).await
    }
}

/// `SQLite`-backed store keyed by the composite pull request identity.
#[derive(Debug, Clone)]
pub struct SqliteStateStore {
    database_url: String,
}

impl SqliteStateStore {
    /// Create a store wrapper targeting the configured `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BlankDatabaseUrl`] when the URL is blank.
    pub fn new(database_url: impl Into<String>) -> Result<Self, StoreError> {
        let database_url_string = database_url.into();
        if database_url_string.trim().is_empty() {
            return Err(StoreError::BlankDatabaseUrl);
        }
        Ok(Self {
            database_url: database_url_string,
        })
    }

    fn establish_connection(&self) -> Result<SqliteConnection, StoreError> {
        let mut connection =
            SqliteConnection::establish(&self.database_url).map_err(|error| {
                StoreError::ConnectionFailed {
                    message: error.to_string(),
                }
            })?;

        sql_query("PRAGMA foreign_keys = ON;")
            .execute(&mut connection)
            .map(drop)
            .map_err(|error| StoreError::ForeignKeysEnableFailed {
                message: error.to_string(),
            })?;

        Ok(connection)
    }

    fn number_to_i64(key: &PullRequestKey) -> i64 {
        // PR numbers are `u64` but Diesel's `BigInt` binding uses `i64`; saturate.
        i64::try_from(key.number).unwrap_or(i64::MAX)
    }

    fn github_id_to_i64(record: &StoredPullRequest) -> Option<i64> {
        record
            .pull_request
            .github_id
            .map(|id| i64::try_from(id).unwrap_or(i64::MAX))
    }

    fn state_table_exists(
        connection: &mut SqliteConnection,
    ) -> Result<bool, diesel::result::Error> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = BigInt)]
            count: i64,
        }

        let row: Row = sql_query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = ?;",
        )
        .bind::<Text, _>(STATE_TABLE)
        .get_result(connection)?;

        Ok(row.count > 0)
    }

    fn map_error_with_schema_check<F>(
        connection: &mut SqliteConnection,
        error: &diesel::result::Error,
        create_error: F,
    ) -> StoreError
    where
        F: Fn(String) -> StoreError,
    {
        match Self::state_table_exists(connection) {
            Ok(false) => StoreError::SchemaNotInitialised,
            Ok(true) => create_error(error.to_string()),
            Err(check_error) => create_error(format!(
                "schema presence check failed: {check_error}; original error: {error}"
            )),
        }
    }

    fn map_query_error(
        connection: &mut SqliteConnection,
        error: &diesel::result::Error,
    ) -> StoreError {
        Self::map_error_with_schema_check(connection, error, |message| StoreError::QueryFailed {
            message,
        })
    }

    fn map_write_error(
        connection: &mut SqliteConnection,
        error: &diesel::result::Error,
    ) -> StoreError {
        Self::map_error_with_schema_check(connection, error, |message| StoreError::WriteFailed {
            message,
        })
    }
}

#[derive(Debug, QueryableByName)]
struct StateRow {
    #[diesel(sql_type = Nullable<BigInt>)]
    github_id: Option<i64>,
    #[diesel(sql_type = Nullable<Text>)]
    created_at: Option<String>,
    #[diesel(sql_type = Text)]
    creator: String,
    #[diesel(sql_type = Text)]
    title: String,
    #[diesel(sql_type = Text)]
    url: String,
    #[diesel(sql_type = Text)]
    labels: String,
    #[diesel(sql_type = Bool)]
    draft: bool,
    #[diesel(sql_type = Text)]
    review_decision: String,
    #[diesel(sql_type = Bool)]
    notified: bool,
}

impl StateRow {
    fn into_record(self, key: &PullRequestKey) -> StoredPullRequest {
        let created_at = self.created_at.as_deref().and_then(|value| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|parsed| parsed.with_timezone(&Utc))
        });
        let labels: Vec<String> = serde_json::from_str(&self.labels).unwrap_or_default();

        StoredPullRequest {
            pull_request: ObservedPullRequest {
                key: key.clone(),
                github_id: self.github_id.and_then(|id| u64::try_from(id).ok()),
                created_at,
                creator: self.creator,
                title: self.title,
                url: self.url,
                labels,
                draft: self.draft,
                review_decision: ReviewDecision::from_provider(&self.review_decision),
            },
            notified: self.notified,
        }
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn get(&self, key: &PullRequestKey) -> Result<Option<StoredPullRequest>, StoreError> {
        let mut connection = self.establish_connection()?;

        let result: Option<StateRow> = sql_query(
            "SELECT github_id, created_at, creator, title, url, labels, draft, \
             review_decision, notified \
             FROM pull_request_state \
             WHERE organization = ? AND repository = ? AND pr_number = ? \
             LIMIT 1;",
        )
        .bind::<Text, _>(key.organization.as_str())
        .bind::<Text, _>(key.repository.as_str())
        .bind::<BigInt, _>(Self::number_to_i64(key))
        .get_result(&mut connection)
        .optional()
        .map_err(|error| Self::map_query_error(&mut connection, &error))?;

        Ok(result.map(|row| row.into_record(key)))
    }

    async fn put(
        &self,
        key: &PullRequestKey,
        record: &StoredPullRequest,
    ) -> Result<(), StoreError> {
        let mut connection = self.establish_connection()?;

        let labels =
            serde_json::to_string(&record.pull_request.labels).map_err(|error| {
                StoreError::WriteFailed {
                    message: format!("failed to serialise labels: {error}"),
                }
            })?;
        let created_at = record
            .pull_request
            .created_at
            .map(|timestamp| timestamp.to_rfc3339());

        sql_query(
            "INSERT INTO pull_request_state \
             (organization, repository, pr_number, github_id, created_at, creator, title, \
              url, labels, draft, review_decision, notified) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(organization, repository, pr_number) DO UPDATE SET \
               github_id = excluded.github_id, \
               created_at = excluded.created_at, \
               creator = excluded.creator, \
               title = excluded.title, \
               url = excluded.url, \
               labels = excluded.labels, \
               draft = excluded.draft, \
               review_decision = excluded.review_decision, \
               notified = excluded.notified, \
               updated_at = CURRENT_TIMESTAMP;",
        )
        .bind::<Text, _>(key.organization.as_str())
        .bind::<Text, _>(key.repository.as_str())
        .bind::<BigInt, _>(Self::number_to_i64(key))
        .bind::<Nullable<BigInt>, _>(Self::github_id_to_i64(record))
        .bind::<Nullable<Text>, _>(created_at)
        .bind::<Text, _>(record.pull_request.creator.as_str())
        .bind::<Text, _>(record.pull_request.title.as_str())
        .bind::<Text, _>(record.pull_request.url.as_str())
        .bind::<Text, _>(labels)
        .bind::<Bool, _>(record.pull_request.draft)
        .bind::<Text, _>(record.pull_request.review_decision.as_provider_str())
        .bind::<Bool, _>(record.notified)
        .execute(&mut connection)
        .map(drop)
        .map_err(|error| Self::map_write_error(&mut connection, &error))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    use super::{SqliteStateStore, StateStore};
    use crate::github::models::test_support::minimal_observed;
    use crate::github::models::{PullRequestKey, ReviewDecision, StoredPullRequest};
    use crate::persistence::{StoreError, migrate_database};
    use crate::telemetry::NoopTelemetrySink;

    fn migrated_store(directory: &TempDir) -> SqliteStateStore {
        let path = directory.path().join("state.sqlite");
        let database_url = path.to_string_lossy().into_owned();
        migrate_database(&database_url, &NoopTelemetrySink).expect("migration should succeed");
        SqliteStateStore::new(database_url).expect("store should be constructed")
    }

    #[test]
    fn blank_database_url_is_rejected() {
        assert_eq!(
            SqliteStateStore::new("  ").err(),
            Some(StoreError::BlankDatabaseUrl)
        );
    }

    #[tokio::test]
    async fn get_returns_none_for_unknown_key() {
        let directory = TempDir::new().expect("tempdir should be created");
        let store = migrated_store(&directory);
        let key = PullRequestKey::new("acme", "svc", 1);

        let record = store.get(&key).await.expect("get should succeed");
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn put_then_get_round_trips_the_record() {
        let directory = TempDir::new().expect("tempdir should be created");
        let store = migrated_store(&directory);

        let mut observed = minimal_observed("acme", "svc", 7);
        observed.labels = vec!["backend".to_owned(), "urgent".to_owned()];
        observed.review_decision = ReviewDecision::ReviewRequired;
        observed.created_at = Some(Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).single().expect(
            "timestamp should be valid",
        ));
        let key = observed.key.clone();
        let record = StoredPullRequest::new(observed, true);

        store.put(&key, &record).await.expect("put should succeed");
        let loaded = store
            .get(&key)
            .await
            .expect("get should succeed")
            .expect("record should exist");

        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn put_overwrites_the_existing_record() {
        let directory = TempDir::new().expect("tempdir should be created");
        let store = migrated_store(&directory);

        let observed = minimal_observed("acme", "svc", 7);
        let key = observed.key.clone();
        store
            .put(&key, &StoredPullRequest::new(observed.clone(), false))
            .await
            .expect("first put should succeed");

        let mut updated = observed;
        updated.review_decision = ReviewDecision::Approved;
        store
            .put(&key, &StoredPullRequest::new(updated.clone(), true))
            .await
            .expect("second put should succeed");

        let loaded = store
            .get(&key)
            .await
            .expect("get should succeed")
            .expect("record should exist");
        assert!(loaded.notified);
        assert!(loaded.pull_request.review_decision.is_approved());
    }

    #[tokio::test]
    async fn missing_schema_is_reported() {
        let directory = TempDir::new().expect("tempdir should be created");
        let path = directory.path().join("empty.sqlite");
        let store = SqliteStateStore::new(path.to_string_lossy().into_owned())
            .expect("store should be constructed");
        let key = PullRequestKey::new("acme", "svc", 1);

        let error = store.get(&key).await.expect_err("get should fail");
        assert_eq!(error, StoreError::SchemaNotInitialised);
    }
}
