//! Polite request pacing for tfrrs.org.
//!
//! Token bucket with a jittered delay between requests, so a multi-meet
//! load neither hammers the site nor fires at a fixed cadence.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Token bucket rate limiter
pub struct RateLimiter {
    state: Arc<Mutex<BucketState>>,
}

struct BucketState {
    tokens: f64,
    last_update: Instant,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
    min_delay: Duration,
    max_delay: Duration,
}

impl RateLimiter {
    /// Create a limiter allowing `requests_per_minute`, with each request
    /// preceded by a jittered delay in `[min_delay_secs, max_delay_secs]`.
    pub fn new(requests_per_minute: u32, min_delay_secs: f64, max_delay_secs: f64) -> Self {
        let max_tokens = requests_per_minute as f64;
        Self {
            state: Arc::new(Mutex::new(BucketState {
                tokens: max_tokens,
                last_update: Instant::now(),
                max_tokens,
                refill_rate: requests_per_minute as f64 / 60.0,
                min_delay: Duration::from_secs_f64(min_delay_secs),
                max_delay: Duration::from_secs_f64(max_delay_secs),
            })),
        }
    }

    /// Acquire a token, waiting if necessary
    pub async fn acquire(&self) {
        let delay = {
            let mut state = self.state.lock().await;

            let now = Instant::now();
            let elapsed = now.duration_since(state.last_update).as_secs_f64();
            state.tokens = (state.tokens + elapsed * state.refill_rate).min(state.max_tokens);
            state.last_update = now;

            if state.tokens >= 1.0 {
                state.tokens -= 1.0;
                let jitter_range = state.max_delay - state.min_delay;
                state.min_delay + jitter_range.mul_f64(jitter())
            } else {
                // wait for the next token to accrue
                let wait = (1.0 - state.tokens) / state.refill_rate;
                state.tokens = 0.0;
                Duration::from_secs_f64(wait) + state.min_delay
            }
        };

        tokio::time::sleep(delay).await;
    }
}

/// Pseudo-random factor in [0, 1) from the clock's sub-second noise
fn jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}
