//! Process-wide request budget against the marketplace API.
//!
//! A fixed-window counter shared by every component that talks upstream:
//! the fetcher consults it before each page request, regardless of which
//! job or pass triggered the fetch. When the window is exhausted, callers
//! wait for the next window instead of failing.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant, sleep};
use tracing::debug;

use crate::config::RateLimitConfig;

struct WindowState {
    window_started: Instant,
    used: u32,
}

/// Fixed-window request budget shared across the process.
pub struct RequestBudget {
    max_requests: u32,
    window: Duration,
    state: Mutex<WindowState>,
}

impl RequestBudget {
    /// Create a budget from configuration.
    pub fn new(config: &RateLimitConfig) -> Arc<Self> {
        Arc::new(Self {
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_seconds),
            state: Mutex::new(WindowState {
                window_started: Instant::now(),
                used: 0,
            }),
        })
    }

    /// Consume one request slot, waiting for the next window if the
    /// current one is exhausted.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let elapsed = state.window_started.elapsed();

                if elapsed >= self.window {
                    state.window_started = Instant::now();
                    state.used = 0;
                }

                if state.used < self.max_requests {
                    state.used += 1;
                    return;
                }

                self.window.saturating_sub(state.window_started.elapsed())
            };

            debug!(wait_ms = wait.as_millis() as u64, "Request budget exhausted, waiting for next window");
            sleep(wait).await;
        }
    }

    /// Number of slots still available in the current window.
    pub async fn remaining(&self) -> u32 {
        let state = self.state.lock().await;
        if state.window_started.elapsed() >= self.window {
            self.max_requests
        } else {
            self.max_requests.saturating_sub(state.used)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(max_requests: u32, window_seconds: u64) -> RateLimitConfig {
        RateLimitConfig {
            max_requests,
            window_seconds,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_allows_up_to_max() {
        let budget = RequestBudget::new(&test_config(3, 60));

        budget.acquire().await;
        budget.acquire().await;
        budget.acquire().await;

        assert_eq!(budget.remaining().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_waits_for_next_window() {
        let budget = RequestBudget::new(&test_config(1, 60));

        budget.acquire().await;

        let before = Instant::now();
        // Paused-clock runtime auto-advances through the sleep.
        budget.acquire().await;
        let waited = before.elapsed();

        assert!(waited >= Duration::from_secs(59));
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_resets_after_window() {
        let budget = RequestBudget::new(&test_config(2, 60));

        budget.acquire().await;
        budget.acquire().await;
        assert_eq!(budget.remaining().await, 0);

        sleep(Duration::from_secs(61)).await;
        assert_eq!(budget.remaining().await, 2);
    }
}
