//! Reconciliation and notification-dedup engine.
//!
//! Given a snapshot of observed pull requests, the engine compares each one
//! against stored state, classifies it as uploaded / updated / skipped /
//! failed, persists qualifying observations, and sends at most one
//! notification per pull request identity, ever.
//!
//! # Invariants
//!
//! - A key appears in at most one classification bucket per pass.
//! - A pull request only appears in the notify bucket if it was uploaded or
//!   updated in the same pass.
//! - The stored `notified` flag transitions false to true at most once per
//!   identity; prior state is always read before writing.
//! - Reconciling an identical snapshot twice with no store mutation in
//!   between classifies everything as skipped the second time and notifies
//!   nobody.

use tracing::warn;

use crate::github::models::{ObservedPullRequest, StoredPullRequest};
use crate::notify::Notifier;
use crate::persistence::StateStore;


/// Aggregated result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassOutcome {
    /// First-time records persisted this pass.
    pub uploaded: Vec<ObservedPullRequest>,
    /// Existing records re-persisted after a qualifying transition.
    pub updated: Vec<ObservedPullRequest>,
    /// Observations with no qualifying change; nothing written.
    pub skipped: Vec<ObservedPullRequest>,
    /// Observations dropped by a store failure.
    pub failed: Vec<ObservedPullRequest>,
    /// Pull requests for which a notification fired this pass.
    ///
    /// Always a subset of `uploaded` and `updated` combined.
    pub notified: Vec<ObservedPullRequest>,
}

impl PassOutcome {
    /// Returns the per-bucket counts for the pass summary.
    #[must_use]
    pub const fn counts(&self) -> PassCounts {
        PassCounts {
            uploaded: self.uploaded.len(),
            updated: self.updated.len(),
            skipped: self.skipped.len(),
            failed: self.failed.len(),
            notified: self.notified.len(),
        }
    }
}

/// Per-bucket counts of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassCounts {
    /// Number of first-time records.
    pub uploaded: usize,
    /// Number of qualifying updates.
    pub updated: usize,
    /// Number of unchanged observations.
    pub skipped: usize,
    /// Number of store failures.
    pub failed: usize,
    /// Number of notifications fired.
    pub notified: usize,
}

impl std::fmt::Display for PassCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Uploaded: {uploaded}, Updated: {updated}, Skipped: {skipped}, \
             Failed: {failed}, Notified: {notified}",
            uploaded = self.uploaded,
            updated = self.updated,
            skipped = self.skipped,
            failed = self.failed,
            notified = self.notified
        )
    }
}

/// Tentative classification of one observed key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Classification {
    Uploaded,
    Updated,
}

/// Pure decision for one observed key, derived from prior stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct KeyDecision {
    /// `None` means skip: no write, no notification.
    classification: Option<Classification>,
    /// Whether a notification must fire, assuming the write lands.
    notify: bool,
}

impl KeyDecision {
    const SKIP: Self = Self {
        classification: None,
        notify: false,
    };
}

/// Decides classification and notification for one observation.
///
/// Only two state transitions qualify for re-persisting an existing record:
/// a draft becoming ready, and a pull request newly entering "Review
/// required". Any other difference (labels, title, other review-decision
/// changes) is intentionally ignored to keep write volume and notification
/// noise down.
fn decide(existing: Option<&StoredPullRequest>, observed: &ObservedPullRequest) -> KeyDecision {
    let reviewable = !observed.draft && !observed.review_decision.is_approved();

    let Some(existing_record) = existing else {
        return KeyDecision {
            classification: Some(Classification::Uploaded),
            notify: reviewable,
        };
    };

    let update = (existing_record.pull_request.draft && !observed.draft)
        || (existing_record.pull_request.review_decision != observed.review_decision
            && observed.review_decision.is_review_required());
    if !update {
        return KeyDecision::SKIP;
    }

    KeyDecision {
        classification: Some(Classification::Updated),
        notify: !existing_record.notified && reviewable,
    }
}

/// Engine driving per-key lookup, classification, persistence, and
/// notification.
pub struct ReconciliationEngine<Store, Sink> {
    store: Store,
    notifier: Sink,
}

impl<Store, Sink> ReconciliationEngine<Store, Sink>
where
    Store: StateStore,
    Sink: Notifier,
{
    /// Creates an engine over the given store and notifier.
    pub const fn new(store: Store, notifier: Sink) -> Self {
        Self { store, notifier }
    }

    /// Reconciles one snapshot of observed pull requests.
    ///
    /// Items are processed independently; a store failure on one key never
    /// affects the others. Duplicate keys within a snapshot are not expected
    /// but are each processed, last one wins.
    pub async fn reconcile(&self, observed: Vec<ObservedPullRequest>) -> PassOutcome {
        let mut outcome = PassOutcome::default();
        for pull_request in observed {
            self.reconcile_one(pull_request, &mut outcome).await;
        }
        outcome
    }

    async fn reconcile_one(&self, pull_request: ObservedPullRequest, outcome: &mut PassOutcome) {
        let key = pull_request.key.clone();

        let existing = match self.store.get(&key).await {
            Ok(existing) => existing,
            Err(error) => {
                warn!(%key, stage = "lookup", %error, "state lookup failed");
                outcome.failed.push(pull_request);
                return;
            }
        };

        let decision = decide(existing.as_ref(), &pull_request);
        let Some(classification) = decision.classification else {
            outcome.skipped.push(pull_request);
            return;
        };

        // The notified flag is carried forward from the stored record so a
        // pull request that was ever notified can never be notified again.
        let notified_before = existing.as_ref().is_some_and(|record| record.notified);
        let record =
            StoredPullRequest::new(pull_request.clone(), notified_before || decision.notify);

        if let Err(error) = self.store.put(&key, &record).await {
            // Never notify on a write that did not durably land; the next
            // pass re-reads state and retries the notification decision.
            warn!(%key, stage = "persist", %error, "state write failed");
            outcome.failed.push(pull_request);
            return;
        }

        match classification {
            Classification::Uploaded => outcome.uploaded.push(pull_request.clone()),
            Classification::Updated => outcome.updated.push(pull_request.clone()),
        }

        if decision.notify {
            if let Err(error) = self.notifier.send(&pull_request).await {
                // The flag is already durably true; delivery is best-effort
                // and this pull request will not be retried.
                warn!(%key, stage = "send", %error, "notification delivery failed");
            }
            outcome.notified.push(pull_request);
        }
    }
}
