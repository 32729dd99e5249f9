//! Periodic scheduling loop driving reconciliation passes.
//!
//! One eager full-breadth pass runs immediately, then a lighter first-page
//! pass repeats on a fixed interval until the shutdown channel fires.
//! Passes run sequentially on one task, so they can never overlap; a slow
//! pass simply delays the next tick. Cancellation is cooperative and checked
//! between passes, never mid-pass.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::github::identity::OrganizationName;
use crate::github::source::PullRequestSource;
use crate::notify::Notifier;
use crate::persistence::StateStore;
use crate::reconcile::ReconciliationEngine;

/// Default polling interval between light passes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(180);

/// Only open pull requests are ever fetched; closed ones simply stop
/// appearing and their stored records go stale.
const OPEN_ONLY: bool = true;

/// Breadth of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassKind {
    /// Complete paginated result set.
    Full,
    /// First page only: the bounded recent-activity window.
    Light,
}

impl std::fmt::Display for PassKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Full => "full",
            Self::Light => "light",
        })
    }
}

/// Drives the reconciliation engine on a fixed cadence.
pub struct Scheduler<Source, Store, Sink> {
    source: Source,
    engine: ReconciliationEngine<Store, Sink>,
    organization: OrganizationName,
    poll_interval: Duration,
}

impl<Source, Store, Sink> Scheduler<Source, Store, Sink>
where
    Source: PullRequestSource,
    Store: StateStore,
    Sink: Notifier,
{
    /// Creates a scheduler over the given source and engine.
    pub const fn new(
        source: Source,
        engine: ReconciliationEngine<Store, Sink>,
        organization: OrganizationName,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            engine,
            organization,
            poll_interval,
        }
    }

    /// Runs the scheduling loop until `shutdown` observes `true` or its
    /// sender is dropped.
    ///
    /// A pass that fails at the fetch stage is logged and skipped; the next
    /// tick is the retry.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        self.run_pass(PassKind::Full).await;

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first interval tick completes immediately; the eager full pass
        // already covered it.
        ticker.tick().await;

        loop {
            // Poll shutdown before the ticker so an overdue tick can never
            // start a pass once cancellation was signalled.
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.run_pass(PassKind::Light).await;
                }
            }
        }

        info!("scheduler stopped");
    }

    async fn run_pass(&self, kind: PassKind) {
        info!(organization = %self.organization, pass = %kind, "starting pass");

        let fetched = match kind {
            PassKind::Full => self.source.fetch_all(&self.organization, OPEN_ONLY).await,
            PassKind::Light => {
                self.source
                    .fetch_page(&self.organization, 1, OPEN_ONLY)
                    .await
            }
        };

        let observed = match fetched {
            Ok(observed) => observed,
            Err(error) => {
                warn!(pass = %kind, %error, "fetch failed; pass skipped");
                return;
            }
        };

        info!(count = observed.len(), "loaded pull requests");
        let outcome = self.engine.reconcile(observed).await;
        info!(pass = %kind, counts = %outcome.counts(), "pass complete");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::{Notify, mpsc, watch};

    use super::{DEFAULT_POLL_INTERVAL, Scheduler};
    use crate::github::error::SourceError;
    use crate::github::identity::OrganizationName;
    use crate::github::models::ObservedPullRequest;
    use crate::github::models::test_support::minimal_observed;
    use crate::github::source::{MockPullRequestSource, PullRequestSource};
    use crate::notify::test_support::RecordingNotifier;
    use crate::persistence::test_support::MemoryStateStore;
    use crate::reconcile::ReconciliationEngine;

    /// Source whose light passes block on a gate, letting a test overlap a
    /// running pass with other events.
    struct GatedSource {
        light_passes: Arc<AtomicUsize>,
        started: mpsc::UnboundedSender<()>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl PullRequestSource for GatedSource {
        async fn fetch_page(
            &self,
            _organization: &OrganizationName,
            _page: u32,
            _open_only: bool,
        ) -> Result<Vec<ObservedPullRequest>, SourceError> {
            self.light_passes.fetch_add(1, Ordering::SeqCst);
            let _ignored = self.started.send(());
            self.release.notified().await;
            Ok(Vec::new())
        }

        async fn fetch_all(
            &self,
            _organization: &OrganizationName,
            _open_only: bool,
        ) -> Result<Vec<ObservedPullRequest>, SourceError> {
            Ok(Vec::new())
        }
    }

    fn scheduler_over(
        source: MockPullRequestSource,
        store: Arc<MemoryStateStore>,
        notifier: Arc<RecordingNotifier>,
    ) -> Scheduler<MockPullRequestSource, Arc<MemoryStateStore>, Arc<RecordingNotifier>> {
        let organization = OrganizationName::new("acme").expect("name should be valid");
        Scheduler::new(
            source,
            ReconciliationEngine::new(store, notifier),
            organization,
            DEFAULT_POLL_INTERVAL,
        )
    }

    #[tokio::test]
    async fn eager_full_pass_runs_before_any_tick() {
        let mut source = MockPullRequestSource::new();
        source
            .expect_fetch_all()
            .times(1)
            .returning(|_, _| Ok(vec![minimal_observed("acme", "svc", 1)]));
        source.expect_fetch_page().never();

        let store = Arc::new(MemoryStateStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let scheduler = scheduler_over(source, Arc::clone(&store), Arc::clone(&notifier));

        // Shutdown is already requested, so the loop exits after the eager
        // pass without waiting for the interval.
        let (sender, receiver) = watch::channel(false);
        sender.send(true).expect("receiver should be alive");
        scheduler.run(receiver).await;

        assert_eq!(store.len(), 1);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_failure_skips_the_pass_and_the_next_tick_retries() {
        let (observed_tx, mut observed_rx) = mpsc::unbounded_channel();

        let mut source = MockPullRequestSource::new();
        source.expect_fetch_all().times(1).returning(|_, _| {
            Err(SourceError::Network {
                message: "connection reset".to_owned(),
            })
        });
        source.expect_fetch_page().returning(move |_, page, _| {
            observed_tx
                .send(page)
                .expect("test channel should be alive");
            Ok(vec![minimal_observed("acme", "svc", 2)])
        });

        let store = Arc::new(MemoryStateStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let scheduler = scheduler_over(source, Arc::clone(&store), Arc::clone(&notifier));

        let (sender, receiver) = watch::channel(false);
        let handle = tokio::spawn(scheduler.run(receiver));

        // The failed full pass leaves the store untouched; the first light
        // pass after the interval elapses picks the work up again.
        let page = observed_rx.recv().await.expect("a light pass should run");
        assert_eq!(page, 1);

        sender.send(true).expect("receiver should be alive");
        handle.await.expect("scheduler task should complete");

        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_an_overrunning_pass_prevents_further_passes() {
        let light_passes = Arc::new(AtomicUsize::new(0));
        let release = Arc::new(Notify::new());
        let (started_sender, mut started_receiver) = mpsc::unbounded_channel();
        let source = GatedSource {
            light_passes: Arc::clone(&light_passes),
            started: started_sender,
            release: Arc::clone(&release),
        };

        let store = Arc::new(MemoryStateStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let organization = OrganizationName::new("acme").expect("name should be valid");
        let scheduler = Scheduler::new(
            source,
            ReconciliationEngine::new(store, notifier),
            organization,
            DEFAULT_POLL_INTERVAL,
        );

        let (sender, receiver) = watch::channel(false);
        let handle = tokio::spawn(scheduler.run(receiver));

        // The first light pass starts and blocks on the gate.
        started_receiver
            .recv()
            .await
            .expect("a light pass should start");

        // Shutdown lands while that pass is still running, and the pass
        // overruns the next tick deadline before the gate releases it.
        sender.send(true).expect("receiver should be alive");
        tokio::time::advance(DEFAULT_POLL_INTERVAL * 2).await;
        release.notify_one();

        handle.await.expect("scheduler task should complete");
        assert_eq!(
            light_passes.load(Ordering::SeqCst),
            1,
            "no pass may start after shutdown was signalled"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_shutdown_sender_stops_the_loop() {
        let mut source = MockPullRequestSource::new();
        source.expect_fetch_all().times(1).returning(|_, _| Ok(vec![]));
        source.expect_fetch_page().returning(|_, _, _| Ok(vec![]));

        let store = Arc::new(MemoryStateStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let scheduler = scheduler_over(source, store, notifier);

        let (sender, receiver) = watch::channel(false);
        drop(sender);

        tokio::time::timeout(Duration::from_secs(600), scheduler.run(receiver))
            .await
            .expect("scheduler should stop once the sender is gone");
    }
}
