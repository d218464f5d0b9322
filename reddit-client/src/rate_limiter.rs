use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;

/// Throttle applied between two consecutive page requests.
///
/// The fetcher awaits [`Pacer::pace`] after a page is processed and before the
/// next request goes out; it is never called before the first page or after
/// the last one.
pub trait Pacer {
    fn pace(&self) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Clone)]
pub struct PacerConfig {
    pub base_delay: Duration,
    /// Upper bound of the random extra delay added to `base_delay`.
    pub jitter: Duration,
}

impl PacerConfig {
    pub fn reddit_public() -> Self {
        Self {
            base_delay: Duration::from_millis(2500), // unauthenticated listings are throttled hard
            jitter: Duration::from_millis(700),
        }
    }

    pub fn fixed(delay: Duration) -> Self {
        Self {
            base_delay: delay,
            jitter: Duration::ZERO,
        }
    }
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self::reddit_public()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PacerStatus {
    pub waits: u32,
    pub total_waited: Duration,
    pub last_wait: Option<Duration>,
}

/// Sleeps `base_delay` plus a random jitter on every call.
#[derive(Debug)]
pub struct IntervalPacer {
    config: PacerConfig,
    status: Mutex<PacerStatus>,
}

impl IntervalPacer {
    pub fn new(config: PacerConfig) -> Self {
        Self {
            config,
            status: Mutex::new(PacerStatus::default()),
        }
    }

    pub fn config(&self) -> &PacerConfig {
        &self.config
    }

    pub fn next_delay(&self) -> Duration {
        if self.config.jitter.is_zero() {
            return self.config.base_delay;
        }
        self.config.base_delay + self.config.jitter.mul_f64(fastrand::f64())
    }

    pub fn status(&self) -> PacerStatus {
        self.status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Pacer for IntervalPacer {
    async fn pace(&self) {
        let delay = self.next_delay();
        tracing::debug!("Waiting {:?} before next request", delay);
        sleep(delay).await;

        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        status.waits += 1;
        status.total_waited += delay;
        status.last_wait = Some(delay);
    }
}
