//! Read-after-write consistency waiter
//!
//! After a write, the graph store may not expose the node to readers right
//! away. [`ConsistencyWaiter`] polls for the expected state with linearly
//! growing delays, up to a bounded number of attempts, and stops early when
//! the caller's [`CancellationToken`] fires.
//!
//! Giving up is not an error: callers usually proceed anyway, so the waiter
//! returns [`WaitOutcome::GaveUp`] and logs a warning. Use
//! [`WaitOutcome::into_result`] where a hard failure is wanted.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::data::traits::GraphReader;
use crate::utils::retry::incremental_delay;

/// Polling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    /// Maximum number of probes, at least 1
    pub max_attempts: u32,
    /// Delay after the first failed probe; attempt `n` waits `base_delay * n`.
    /// At least [`MIN_BASE_DELAY`].
    pub base_delay: Duration,
}

/// Smallest accepted base delay
pub const MIN_BASE_DELAY: Duration = Duration::from_millis(1);

impl WaitConfig {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: base_delay.max(MIN_BASE_DELAY),
        }
    }
}

/// Expected node state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Created,
    Deleted,
}

impl Expectation {
    fn satisfied_by(&self, exists: bool) -> bool {
        match self {
            Self::Created => exists,
            Self::Deleted => !exists,
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Deleted => f.write_str("deleted"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum WaitOutcome {
    /// Expected state observed on probe number `attempts`
    Confirmed { attempts: u32 },
    /// Attempts or time budget exhausted without observing the expected state
    GaveUp { attempts: u32 },
    /// Caller cancelled; `attempts` probes had completed
    Cancelled { attempts: u32 },
}

impl WaitOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Confirmed { attempts }
            | Self::GaveUp { attempts }
            | Self::Cancelled { attempts } => *attempts,
        }
    }

    pub fn into_result(self) -> Result<u32, WaitError> {
        match self {
            Self::Confirmed { attempts } => Ok(attempts),
            Self::GaveUp { attempts } => Err(WaitError::Timeout { attempts }),
            Self::Cancelled { .. } => Err(WaitError::Cancelled),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaitError {
    #[error("expected state not observed after {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("wait cancelled")]
    Cancelled,
}

/// Bounded poller for node visibility
#[derive(Clone)]
pub struct ConsistencyWaiter {
    reader: Arc<dyn GraphReader>,
    config: WaitConfig,
}

impl ConsistencyWaiter {
    pub fn new(reader: Arc<dyn GraphReader>, config: WaitConfig) -> Self {
        Self { reader, config }
    }

    pub fn config(&self) -> WaitConfig {
        self.config
    }

    /// Wait until the node is visible
    pub async fn wait_for_created(
        &self,
        cancel: &CancellationToken,
        tenant: &str,
        id: &str,
        label: &str,
    ) -> WaitOutcome {
        self.wait(cancel, tenant, id, label, Expectation::Created, None)
            .await
    }

    /// Wait until the node is no longer visible
    pub async fn wait_for_deleted(
        &self,
        cancel: &CancellationToken,
        tenant: &str,
        id: &str,
        label: &str,
    ) -> WaitOutcome {
        self.wait(cancel, tenant, id, label, Expectation::Deleted, None)
            .await
    }

    /// Like [`Self::wait_for_created`], but also gives up once `timeout` has
    /// elapsed or the next sleep would overrun it.
    pub async fn wait_for_created_with_timeout(
        &self,
        cancel: &CancellationToken,
        tenant: &str,
        id: &str,
        label: &str,
        timeout: Duration,
    ) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        self.wait(
            cancel,
            tenant,
            id,
            label,
            Expectation::Created,
            Some(deadline),
        )
        .await
    }

    /// Like [`Self::wait_for_deleted`], bounded by `timeout` the same way as
    /// [`Self::wait_for_created_with_timeout`].
    pub async fn wait_for_deleted_with_timeout(
        &self,
        cancel: &CancellationToken,
        tenant: &str,
        id: &str,
        label: &str,
        timeout: Duration,
    ) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        self.wait(
            cancel,
            tenant,
            id,
            label,
            Expectation::Deleted,
            Some(deadline),
        )
        .await
    }

    async fn wait(
        &self,
        cancel: &CancellationToken,
        tenant: &str,
        id: &str,
        label: &str,
        expect: Expectation,
        deadline: Option<Instant>,
    ) -> WaitOutcome {
        let mut attempt = 1u32;

        loop {
            let probe = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(tenant, id, label, attempts = attempt - 1, "Consistency wait cancelled");
                    return WaitOutcome::Cancelled { attempts: attempt - 1 };
                }
                result = self.reader.node_exists(tenant, id, label) => result,
            };

            match probe {
                Ok(exists) if expect.satisfied_by(exists) => {
                    tracing::debug!(tenant, id, label, attempts = attempt, "Node {}", expect);
                    return WaitOutcome::Confirmed { attempts: attempt };
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(error = %e, tenant, id, label, attempt, "Consistency probe failed");
                }
            }

            let delay = incremental_delay(attempt, self.config.base_delay);
            let out_of_time = deadline.is_some_and(|d| Instant::now() + delay > d);
            if attempt >= self.config.max_attempts || out_of_time {
                tracing::warn!(
                    tenant,
                    id,
                    label,
                    attempts = attempt,
                    "Node not {} in graph store, giving up",
                    expect
                );
                return WaitOutcome::GaveUp { attempts: attempt };
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(tenant, id, label, attempts = attempt, "Consistency wait cancelled");
                    return WaitOutcome::Cancelled { attempts: attempt };
                }
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::error::DataError;
    use crate::data::traits::{Params, Row};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Node becomes visible on probe `visible_from`, and disappears on
    /// probe `gone_from`
    struct FakeReader {
        probes: AtomicU32,
        visible_from: u32,
        gone_from: u32,
        fail_first: u32,
    }

    impl FakeReader {
        fn visible_from(n: u32) -> Self {
            Self {
                probes: AtomicU32::new(0),
                visible_from: n,
                gone_from: u32::MAX,
                fail_first: 0,
            }
        }

        fn probes(&self) -> u32 {
            self.probes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GraphReader for FakeReader {
        async fn run(&self, _statement: &str, _params: &Params) -> Result<Vec<Row>, DataError> {
            Ok(Vec::new())
        }

        async fn node_exists(&self, _t: &str, _id: &str, _l: &str) -> Result<bool, DataError> {
            let n = self.probes.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.fail_first {
                return Err(DataError::timeout(1));
            }
            Ok(n >= self.visible_from && n < self.gone_from)
        }
    }

    fn waiter(reader: Arc<FakeReader>, max_attempts: u32) -> ConsistencyWaiter {
        ConsistencyWaiter::new(reader, WaitConfig::new(max_attempts, Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_confirmed_on_third_attempt() {
        let reader = Arc::new(FakeReader::visible_from(3));
        let outcome = waiter(reader.clone(), 5)
            .wait_for_created(&CancellationToken::new(), "acme", "1", "Contact")
            .await;
        assert_eq!(outcome, WaitOutcome::Confirmed { attempts: 3 });
        assert_eq!(reader.probes(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let reader = Arc::new(FakeReader::visible_from(u32::MAX));
        let outcome = waiter(reader.clone(), 4)
            .wait_for_created(&CancellationToken::new(), "acme", "1", "Contact")
            .await;
        assert_eq!(outcome, WaitOutcome::GaveUp { attempts: 4 });
        assert_eq!(reader.probes(), 4);
        assert_eq!(outcome.into_result(), Err(WaitError::Timeout { attempts: 4 }));
    }

    #[tokio::test]
    async fn test_deleted_confirmed_when_node_disappears() {
        let reader = Arc::new(FakeReader {
            probes: AtomicU32::new(0),
            visible_from: 1,
            gone_from: 2,
            fail_first: 0,
        });
        let outcome = waiter(reader, 5)
            .wait_for_deleted(&CancellationToken::new(), "acme", "1", "Contact")
            .await;
        assert_eq!(outcome, WaitOutcome::Confirmed { attempts: 2 });
    }

    #[tokio::test]
    async fn test_probe_errors_count_as_failed_attempts() {
        let reader = Arc::new(FakeReader {
            probes: AtomicU32::new(0),
            visible_from: 1,
            gone_from: u32::MAX,
            fail_first: 2,
        });
        let outcome = waiter(reader, 5)
            .wait_for_created(&CancellationToken::new(), "acme", "1", "Contact")
            .await;
        assert_eq!(outcome, WaitOutcome::Confirmed { attempts: 3 });
    }

    #[tokio::test]
    async fn test_cancelled_before_first_probe() {
        let reader = Arc::new(FakeReader::visible_from(1));
        let token = CancellationToken::new();
        token.cancel();
        let outcome = waiter(reader.clone(), 5)
            .wait_for_created(&token, "acme", "1", "Contact")
            .await;
        assert_eq!(outcome, WaitOutcome::Cancelled { attempts: 0 });
        assert_eq!(reader.probes(), 0);
        assert_eq!(outcome.into_result(), Err(WaitError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_sleep() {
        let reader = Arc::new(FakeReader::visible_from(u32::MAX));
        let waiter = ConsistencyWaiter::new(
            reader.clone(),
            WaitConfig::new(1000, Duration::from_secs(60)),
        );
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let outcome = waiter
            .wait_for_created(&token, "acme", "1", "Contact")
            .await;
        assert_eq!(outcome, WaitOutcome::Cancelled { attempts: 1 });
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    /// Existence check that never answers
    struct StalledReader;

    #[async_trait]
    impl GraphReader for StalledReader {
        async fn run(&self, _statement: &str, _params: &Params) -> Result<Vec<Row>, DataError> {
            Ok(Vec::new())
        }

        async fn node_exists(&self, _t: &str, _id: &str, _l: &str) -> Result<bool, DataError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_cancel_interrupts_running_check() {
        let waiter = ConsistencyWaiter::new(
            Arc::new(StalledReader),
            WaitConfig::new(5, Duration::from_millis(1)),
        );
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            waiter.wait_for_created(&token, "acme", "1", "Contact"),
        )
        .await
        .expect("cancellation should stop the running check");
        assert_eq!(outcome, WaitOutcome::Cancelled { attempts: 0 });
    }

    #[tokio::test]
    async fn test_timeout_bounds_total_wait() {
        let reader = Arc::new(FakeReader::visible_from(u32::MAX));
        let waiter = ConsistencyWaiter::new(
            reader.clone(),
            WaitConfig::new(1000, Duration::from_millis(10)),
        );
        let outcome = waiter
            .wait_for_created_with_timeout(
                &CancellationToken::new(),
                "acme",
                "1",
                "Contact",
                Duration::from_millis(35),
            )
            .await;
        // Sleeps of 10ms and 20ms fit in 35ms, the third (30ms) would not
        assert!(matches!(outcome, WaitOutcome::GaveUp { attempts } if attempts <= 3));
        assert_eq!(reader.probes(), outcome.attempts());
    }

    #[tokio::test]
    async fn test_deleted_timeout_bounds_total_wait() {
        // Node stays visible for the whole wait
        let reader = Arc::new(FakeReader::visible_from(1));
        let waiter = ConsistencyWaiter::new(
            reader.clone(),
            WaitConfig::new(1000, Duration::from_millis(10)),
        );
        let outcome = waiter
            .wait_for_deleted_with_timeout(
                &CancellationToken::new(),
                "acme",
                "1",
                "Contact",
                Duration::from_millis(35),
            )
            .await;
        assert!(matches!(outcome, WaitOutcome::GaveUp { attempts } if attempts <= 3));
        assert_eq!(reader.probes(), outcome.attempts());
    }

    #[tokio::test]
    async fn test_deleted_timeout_confirms_when_gone() {
        let reader = Arc::new(FakeReader {
            probes: AtomicU32::new(0),
            visible_from: 1,
            gone_from: 2,
            fail_first: 0,
        });
        let outcome = waiter(reader, 5)
            .wait_for_deleted_with_timeout(
                &CancellationToken::new(),
                "acme",
                "1",
                "Contact",
                Duration::from_secs(5),
            )
            .await;
        assert_eq!(outcome, WaitOutcome::Confirmed { attempts: 2 });
    }

    #[test]
    fn test_config_clamps_attempts_and_delay() {
        let config = WaitConfig::new(0, Duration::ZERO);
        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.base_delay, MIN_BASE_DELAY);
        assert!(
            incremental_delay(2, config.base_delay) > incremental_delay(1, config.base_delay)
        );
    }
}
