//! Recording [`Notifier`] double for engine and scheduler tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::github::models::ObservedPullRequest;

use super::{Notifier, NotifyError};

/// Notifier that records every delivered pull request.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<ObservedPullRequest>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    /// Creates a notifier that accepts every message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `send` fail with a network error.
    pub fn fail_sends(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Returns the pull requests delivered so far.
    #[must_use]
    pub fn sent(&self) -> Vec<ObservedPullRequest> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, pull_request: &ObservedPullRequest) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Network {
                message: "injected send failure".to_owned(),
            });
        }

        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(pull_request.clone());
        Ok(())
    }
}
