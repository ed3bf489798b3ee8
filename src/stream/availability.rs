//! Live stream availability polling.
//!
//! An [`AvailabilityPoller`] repeatedly probes a URL until it answers with
//! HTTP 200 or the poll is cancelled. Probe failures are logged and retried
//! after a fixed interval; they never reach the caller.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::http_client::probe_client;

/// Status code that marks a stream as available.
pub const AVAILABLE_STATUS: u16 = 200;

/// Lightweight existence check against a stream URL.
#[async_trait]
pub trait AvailabilityCheck: Send + Sync {
    /// Probe `url` and return the HTTP status code.
    async fn check(&self, url: &Url) -> Result<u16>;
}

/// `HEAD` request probe.
pub struct HttpAvailabilityCheck {
    client: Client,
}

impl HttpAvailabilityCheck {
    pub fn new() -> crate::Result<Self> {
        Ok(Self::with_client(probe_client()?))
    }

    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AvailabilityCheck for HttpAvailabilityCheck {
    #[instrument(skip(self, url), fields(url = %url))]
    async fn check(&self, url: &Url) -> Result<u16> {
        let response = self.client.head(url.clone()).send().await?;
        Ok(response.status().as_u16())
    }
}

/// How a poll ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The URL answered 200 and the callback fired.
    Available { attempts: u64 },
    /// Cancellation was observed; the callback never fired.
    Cancelled { attempts: u64 },
    /// The poll task panicked or was aborted before reporting.
    Failed,
}

/// Handle to a running poll task.
pub struct PollHandle {
    cancel: CancellationToken,
    task: JoinHandle<PollOutcome>,
}

impl PollHandle {
    /// Request cancellation without waiting for the task to stop.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel and wait until the task has stopped.
    pub async fn cancel_and_wait(self) -> PollOutcome {
        self.cancel.cancel();
        self.wait().await
    }

    /// Wait for the poll to end on its own.
    pub async fn wait(self) -> PollOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Availability poll task failed");
                PollOutcome::Failed
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Polls a URL until it becomes available.
#[derive(Clone)]
pub struct AvailabilityPoller {
    checker: Arc<dyn AvailabilityCheck>,
    interval: Duration,
}

impl AvailabilityPoller {
    /// Fixed wait between two checks.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    pub fn new(checker: Arc<dyn AvailabilityCheck>) -> Self {
        Self {
            checker,
            interval: Self::DEFAULT_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the poll loop on the current runtime.
    pub fn start<F>(&self, url: Url, on_available: F, cancel: CancellationToken) -> PollHandle
    where
        F: FnOnce(Url) + Send + 'static,
    {
        let poller = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move { poller.run(url, on_available, token).await });
        PollHandle { cancel, task }
    }

    /// Run the poll loop to completion on the current task.
    ///
    /// Retries are unbounded: only a 200 or cancellation ends the loop.
    #[instrument(skip(self, url, on_available, cancel), fields(url = %url))]
    pub async fn run<F>(&self, url: Url, on_available: F, cancel: CancellationToken) -> PollOutcome
    where
        F: FnOnce(Url) + Send,
    {
        let mut attempts = 0u64;

        loop {
            if cancel.is_cancelled() {
                debug!(attempts, "Availability poll cancelled");
                return PollOutcome::Cancelled { attempts };
            }

            attempts += 1;
            debug!(attempts, "Checking live stream availability...");

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(attempts, "Availability poll cancelled during check");
                    return PollOutcome::Cancelled { attempts };
                }
                result = self.checker.check(&url) => result,
            };

            match result {
                Ok(AVAILABLE_STATUS) => {
                    if cancel.is_cancelled() {
                        return PollOutcome::Cancelled { attempts };
                    }
                    info!(attempts, "Live stream available");
                    on_available(url);
                    return PollOutcome::Available { attempts };
                }
                Ok(status) => {
                    debug!(
                        status,
                        "Live stream not available yet, checking again in {:?}", self.interval
                    );
                }
                Err(e) => {
                    warn!(error = %e, "Error checking live stream");
                }
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(attempts, "Availability poll cancelled while waiting");
                    return PollOutcome::Cancelled { attempts };
                }
                () = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Answers from a script, then keeps repeating the last entry.
    struct ScriptedCheck {
        script: Vec<Option<u16>>,
        calls: AtomicUsize,
    }

    impl ScriptedCheck {
        fn new(script: Vec<Option<u16>>) -> Arc<Self> {
            Arc::new(Self {
                script,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AvailabilityCheck for ScriptedCheck {
        async fn check(&self, _url: &Url) -> Result<u16> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let entry = self.script[n.min(self.script.len() - 1)];
            entry.ok_or_else(|| anyhow::anyhow!("connection refused"))
        }
    }

    fn stream_url() -> Url {
        Url::parse("https://spatial.streamvoodoo.com/api/stream/alice/5").unwrap()
    }

    fn recorder() -> (Arc<Mutex<Vec<Url>>>, impl FnOnce(Url) + Send + 'static) {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        (fired, move |url| sink.lock().unwrap().push(url))
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_n_failures() {
        let check = ScriptedCheck::new(vec![Some(404), Some(503), Some(404), Some(200)]);
        let poller = AvailabilityPoller::new(check.clone());
        let (fired, on_available) = recorder();

        let outcome = poller
            .run(stream_url(), on_available, CancellationToken::new())
            .await;

        assert_eq!(outcome, PollOutcome::Available { attempts: 4 });
        assert_eq!(check.calls(), 4);
        assert_eq!(*fired.lock().unwrap(), vec![stream_url()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_errors_are_retried() {
        let check = ScriptedCheck::new(vec![None, None, Some(200)]);
        let poller = AvailabilityPoller::new(check.clone());
        let (fired, on_available) = recorder();

        let outcome = poller
            .run(stream_url(), on_available, CancellationToken::new())
            .await;

        assert_eq!(outcome, PollOutcome::Available { attempts: 3 });
        assert_eq!(fired.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_200_counts() {
        let check = ScriptedCheck::new(vec![Some(204), Some(301), Some(200)]);
        let poller = AvailabilityPoller::new(check.clone());
        let (_fired, on_available) = recorder();

        let outcome = poller
            .run(stream_url(), on_available, CancellationToken::new())
            .await;

        assert_eq!(outcome, PollOutcome::Available { attempts: 3 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_fixed_interval_between_checks() {
        let check = ScriptedCheck::new(vec![Some(404), Some(404), Some(200)]);
        let poller = AvailabilityPoller::new(check.clone());
        let (_fired, on_available) = recorder();

        let start = tokio::time::Instant::now();
        poller
            .run(stream_url(), on_available, CancellationToken::new())
            .await;

        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_start_never_checks() {
        let check = ScriptedCheck::new(vec![Some(200)]);
        let poller = AvailabilityPoller::new(check.clone());
        let (fired, on_available) = recorder();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = poller.run(stream_url(), on_available, cancel).await;

        assert_eq!(outcome, PollOutcome::Cancelled { attempts: 0 });
        assert_eq!(check.calls(), 0);
        assert!(fired.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_waiting() {
        let check = ScriptedCheck::new(vec![Some(404)]);
        let poller = AvailabilityPoller::new(check.clone());
        let (fired, on_available) = recorder();

        let handle = poller.start(stream_url(), on_available, CancellationToken::new());
        tokio::time::sleep(Duration::from_millis(2500)).await;
        let outcome = handle.cancel_and_wait().await;

        assert!(matches!(outcome, PollOutcome::Cancelled { .. }));
        assert_eq!(check.calls(), 3);
        assert!(fired.lock().unwrap().is_empty());

        // No further checks once cancelled.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(check.calls(), 3);
    }

    /// Takes ten seconds to answer 200.
    struct SlowCheck {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AvailabilityCheck for SlowCheck {
        async fn check(&self, _url: &Url) -> Result<u16> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(AVAILABLE_STATUS)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_check() {
        let check = Arc::new(SlowCheck {
            calls: AtomicUsize::new(0),
        });
        let poller = AvailabilityPoller::new(check.clone());
        let (fired, on_available) = recorder();

        let handle = poller.start(stream_url(), on_available, CancellationToken::new());
        tokio::time::sleep(Duration::from_millis(500)).await;
        let outcome = handle.cancel_and_wait().await;

        assert_eq!(outcome, PollOutcome::Cancelled { attempts: 1 });
        assert_eq!(check.calls.load(Ordering::SeqCst), 1);

        // The in-flight check would have answered 200 by now.
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(fired.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_callback_reports_failed() {
        let check = ScriptedCheck::new(vec![Some(200)]);
        let poller = AvailabilityPoller::new(check);

        let handle = poller.start(
            stream_url(),
            |_url| panic!("callback blew up"),
            CancellationToken::new(),
        );

        assert_eq!(handle.wait().await, PollOutcome::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_pending_until_cancelled() {
        let check = ScriptedCheck::new(vec![Some(503)]);
        let poller = AvailabilityPoller::new(check);
        let (fired, on_available) = recorder();
        let cancel = CancellationToken::new();

        let handle = poller.start(stream_url(), on_available, cancel.clone());
        let mut wait = tokio_test::task::spawn(handle.wait());
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        tokio_test::assert_pending!(wait.poll());

        cancel.cancel();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(wait.is_woken());
        let outcome = tokio_test::assert_ready!(wait.poll());
        assert!(matches!(outcome, PollOutcome::Cancelled { attempts: 11 }));
        assert!(fired.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_reports_finished() {
        let check = ScriptedCheck::new(vec![Some(200)]);
        let poller = AvailabilityPoller::new(check).with_interval(Duration::from_millis(10));
        let (fired, on_available) = recorder();

        let handle = poller.start(stream_url(), on_available, CancellationToken::new());
        let outcome = handle.wait().await;

        assert_eq!(outcome, PollOutcome::Available { attempts: 1 });
        assert_eq!(fired.lock().unwrap().len(), 1);
    }
}
