//! Async token-bucket limiter used to keep drive API calls under the
//! per-minute ceilings.
//!
//! The bucket holds up to `per_minute` tokens and refills continuously at
//! `per_minute` tokens per minute. [`RateLimiter::acquire`] takes one token,
//! sleeping until one is available. The limiter is shared process-wide and
//! is safe to call from concurrent tasks.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Tokens are tracked in millionths so partial refills are not lost.
const TOKEN_SCALE: u128 = 1_000_000;
const PERIOD: Duration = Duration::from_secs(60);

struct Bucket {
    tokens: u128,
    last_refill: Instant,
}

pub struct RateLimiter {
    per_minute: u32,
    bucket: Mutex<Bucket>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("per_minute", &self.per_minute)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    /// Create a limiter that starts full.
    pub fn per_minute(per_minute: u32) -> Self {
        let capacity = u128::from(per_minute) * TOKEN_SCALE;
        Self {
            per_minute,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    fn capacity(&self) -> u128 {
        u128::from(self.per_minute) * TOKEN_SCALE
    }

    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        let elapsed = now.saturating_duration_since(bucket.last_refill);
        if elapsed.is_zero() {
            return;
        }
        let capacity = self.capacity();
        let amount = capacity.saturating_mul(elapsed.as_micros()) / PERIOD.as_micros();
        if amount > 0 {
            bucket.tokens = (bucket.tokens + amount).min(capacity);
            bucket.last_refill = now;
        }
    }

    /// Time until the bucket holds one whole token.
    fn wait_for_token(&self, bucket: &Bucket) -> Duration {
        let capacity = self.capacity();
        if capacity == 0 {
            return PERIOD;
        }
        let deficit = TOKEN_SCALE.saturating_sub(bucket.tokens);
        let micros = deficit
            .saturating_mul(PERIOD.as_micros())
            .div_ceil(capacity)
            .min(u128::from(u64::MAX));
        Duration::from_micros(u64::try_from(micros).unwrap_or(u64::MAX)).max(Duration::from_millis(1))
    }

    /// Take a token if one is available; otherwise report how long until
    /// one will be.
    async fn try_take(&self) -> Result<(), Duration> {
        let mut bucket = self.bucket.lock().await;
        self.refill(&mut bucket, Instant::now());
        if bucket.tokens >= TOKEN_SCALE {
            bucket.tokens -= TOKEN_SCALE;
            Ok(())
        } else {
            Err(self.wait_for_token(&bucket))
        }
    }

    /// Take one token, waiting for the bucket to refill if it is empty.
    pub async fn acquire(&self) {
        while let Err(wait) = self.try_take().await {
            tracing::trace!(wait_ms = wait.as_millis() as u64, "rate limited");
            tokio::time::sleep(wait).await;
        }
    }
}
