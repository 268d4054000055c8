use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Duration, Instant};

/// Shared pacing for outbound bulk sends.
///
/// Every caller of [`SendThrottle::acquire`] gets a slot at least `interval`
/// after the previous slot, regardless of which task asked for it. Clones
/// share the same schedule.
#[derive(Clone)]
pub struct SendThrottle {
    /// Earliest instant the next send may start
    next_slot: Arc<Mutex<Instant>>,
    interval: Duration,
}

impl SendThrottle {
    /// Creates a throttle that spaces sends by `interval`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use storebot::core::throttle::SendThrottle;
    /// use std::time::Duration;
    ///
    /// # async fn example() {
    /// let throttle = SendThrottle::new(Duration::from_millis(70));
    /// throttle.acquire().await;
    /// // send one message...
    /// # }
    /// ```
    pub fn new(interval: Duration) -> Self {
        Self {
            next_slot: Arc::new(Mutex::new(Instant::now())),
            interval,
        }
    }

    /// Configured spacing between two sends.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until this caller's slot arrives.
    ///
    /// The slot is reserved under the lock and the wait happens after the
    /// lock is released, so concurrent callers queue up without holding it.
    pub async fn acquire(&self) {
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = if *next_slot > now { *next_slot } else { now };
            *next_slot = slot + self.interval;
            slot
        };
        sleep_until(slot).await;
    }
}
