//! Rate Limiter (Token Bucket Algorithm)
//!
//! Throttles submissions. Status reads are never throttled.

use std::sync::Mutex;
use std::time::Instant;

/// Token bucket: `burst` tokens, refilled continuously at `per_second`
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
    burst: f64,
    per_second: f64,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// # Example
    /// Allow 10 submissions/sec with burst of 20:
    /// `RateLimiter::new(20, 10)`
    pub fn new(burst: u32, per_second: u32) -> Self {
        Self {
            bucket: Mutex::new(Bucket {
                tokens: burst as f64,
                last_refill: Instant::now(),
            }),
            burst: burst as f64,
            per_second: per_second as f64,
        }
    }

    /// Consume one token; false if the bucket is empty
    pub fn try_acquire(&self) -> bool {
        let mut bucket = match self.bucket.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.per_second).min(self.burst);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
