//! Request pacing for the upstream budget
//!
//! Two constraints are enforced for every request: consecutive requests are
//! at least `min_interval` apart, and no rolling window of length `window`
//! ever holds more than `max_per_window` requests. Grants are recorded in a
//! sliding log so the window check holds for every window position, not just
//! for windows aligned to a reset point.

use crate::gateway::config::{DEFAULT_MAX_PER_WINDOW, DEFAULT_MIN_INTERVAL, DEFAULT_WINDOW};
use crate::metrics::RateLimiterMetrics;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Rate limiter settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Minimum spacing between consecutive requests
    pub min_interval: Duration,
    /// Rolling window length
    pub window: Duration,
    /// Maximum requests in any rolling window
    pub max_per_window: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval: DEFAULT_MIN_INTERVAL,
            window: DEFAULT_WINDOW,
            max_per_window: DEFAULT_MAX_PER_WINDOW,
        }
    }
}

#[derive(Debug, Default)]
struct LimiterState {
    last_request_at: Option<Instant>,
    /// Grant times still inside the window, oldest first
    recent: VecDeque<Instant>,
}

impl LimiterState {
    fn evict_expired(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.recent.front() {
            if now.saturating_duration_since(oldest) >= window {
                self.recent.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Process-wide pacing for upstream requests
///
/// All callers share one critical section. The lock is held while a caller
/// sleeps for its slot, which queues later callers behind it in arrival order
/// (the tokio mutex is fair), but it is never held across the HTTP call itself.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Create a limiter with the given settings
    ///
    /// A `max_per_window` of 0 is treated as 1.
    pub fn new(config: RateLimitConfig) -> Self {
        let capacity = config.max_per_window.max(1) as usize;
        Self {
            config,
            state: Mutex::new(LimiterState {
                last_request_at: None,
                recent: VecDeque::with_capacity(capacity),
            }),
        }
    }

    /// Limiter settings
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Wait until one request may be issued, then record it
    ///
    /// Never fails and never drops a caller.
    pub async fn acquire(&self) {
        let metrics = RateLimiterMetrics::start();
        let max = self.config.max_per_window.max(1) as usize;
        let window = self.config.window;

        let mut state = self.state.lock().await;
        state.evict_expired(Instant::now(), window);

        if state.recent.len() >= max {
            if let Some(&oldest) = state.recent.front() {
                let wait = (oldest + window).saturating_duration_since(Instant::now());
                warn!(
                    wait_ms = wait.as_millis() as u64,
                    max_per_window = max,
                    "Request budget exhausted, waiting for window to roll over"
                );
                sleep(wait).await;
                state.evict_expired(Instant::now(), window);
            }
        }

        if let Some(last) = state.last_request_at {
            let elapsed = Instant::now().saturating_duration_since(last);
            if elapsed < self.config.min_interval {
                let wait = self.config.min_interval - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "Spacing upstream request");
                sleep(wait).await;
            }
        }

        let granted = Instant::now();
        state.last_request_at = Some(granted);
        state.recent.push_back(granted);

        metrics.record_acquired(state.recent.len(), max);
    }

    /// Requests recorded in the window ending now
    pub async fn window_request_count(&self) -> usize {
        let state = self.state.lock().await;
        let now = Instant::now();
        state
            .recent
            .iter()
            .filter(|&&t| now.saturating_duration_since(t) < self.config.window)
            .count()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
