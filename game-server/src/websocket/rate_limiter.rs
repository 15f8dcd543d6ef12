use std::time::{Duration, Instant};

/// Token bucket guarding one connection's inbound traffic. Solve attempts and
/// chat lines share the budget; a client that floods either gets cut off.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    available: u32,
    capacity: u32,
    refill_every: Duration,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new() -> Self {
        // 20 message burst, one token back every 500ms.
        Self::with_limits(20, Duration::from_millis(500))
    }

    pub fn with_limits(capacity: u32, refill_every: Duration) -> Self {
        Self {
            available: capacity,
            capacity,
            refill_every,
            last_refill: Instant::now(),
        }
    }

    /// Takes one token if any are available.
    pub fn allow(&mut self) -> bool {
        let elapsed = self.last_refill.elapsed();
        if elapsed >= self.refill_every {
            let refilled = (elapsed.as_millis() / self.refill_every.as_millis().max(1)) as u32;
            self.available = (self.available + refilled).min(self.capacity);
            self.last_refill = Instant::now();
        }

        if self.available > 0 {
            self.available -= 1;
            true
        } else {
            false
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
