//! prnotify: a one-way polling pipeline that discovers open pull requests
//! across a GitHub organization, reconciles them against previously observed
//! state, and posts a Slack message exactly once per pull request that newly
//! becomes reviewable.
//!
//! The crate is organised around three trait-based collaborators — a
//! [`github::PullRequestSource`], a [`persistence::StateStore`], and a
//! [`notify::Notifier`] — driven by the [`reconcile::ReconciliationEngine`]
//! and the periodic [`scheduler::Scheduler`].

pub mod config;
pub mod github;
pub mod notify;
pub mod persistence;
pub mod reconcile;
pub mod scheduler;
pub mod telemetry;

pub use config::{ConfigError, PrnotifyConfig};
pub use github::{
    GraphqlPullRequestSource, ObservedPullRequest, OrganizationName, PersonalAccessToken,
    PullRequestKey, PullRequestSource, ReviewDecision, SourceError, StoredPullRequest,
};
pub use notify::{Notifier, NotifyError, SlackNotifier};
pub use persistence::{SqliteStateStore, StateStore, StoreError, migrate_database};
pub use reconcile::{PassCounts, PassOutcome, ReconciliationEngine};
pub use scheduler::Scheduler;
