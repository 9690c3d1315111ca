//! Sliding-window admission control shared by all callers of one client.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

/// Length of the admission window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Time source used for admission and backoff.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`Instant`] and [`thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Clock that only moves when slept on. Records every sleep.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    state: Mutex<ManualState>,
}

#[derive(Debug, Default)]
struct ManualState {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            state: Mutex::new(ManualState::default()),
        }
    }

    /// Move time forward without recording a sleep.
    pub fn advance(&self, by: Duration) {
        self.lock().elapsed += by;
    }

    /// Total simulated time since creation.
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.lock().elapsed
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.lock();
        state.elapsed += duration;
        state.sleeps.push(duration);
    }
}

/// At most `capacity` admissions in any trailing window.
pub struct RateLimiter {
    capacity: usize,
    window: Duration,
    clock: Arc<dyn Clock>,
    admitted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// `capacity` admissions per minute on the system clock.
    pub fn new(capacity: usize) -> Self {
        Self::with_clock(capacity, WINDOW, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: usize, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            capacity: capacity.max(1),
            window,
            clock,
            admitted: Mutex::new(VecDeque::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Block until a slot is free, then claim it. Returns the time waited.
    ///
    /// The lock is only held for the admission decision, never while sleeping.
    pub fn acquire(&self) -> Duration {
        let mut waited = Duration::ZERO;
        loop {
            let wait = {
                let mut admitted = self.admitted.lock().unwrap_or_else(|e| e.into_inner());
                let now = self.clock.now();
                while admitted
                    .front()
                    .is_some_and(|&t| now.saturating_duration_since(t) >= self.window)
                {
                    admitted.pop_front();
                }
                match admitted.front() {
                    Some(&oldest) if admitted.len() >= self.capacity => {
                        self.window - now.saturating_duration_since(oldest)
                    }
                    _ => {
                        admitted.push_back(now);
                        return waited;
                    }
                }
            };
            debug!(wait_ms = wait.as_millis() as u64, "rate limit reached, waiting for a slot");
            self.clock.sleep(wait);
            waited += wait;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(capacity: usize) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (RateLimiter::with_clock(capacity, WINDOW, clock.clone()), clock)
    }

    #[test]
    fn test_admits_up_to_capacity_without_waiting() {
        let (limiter, clock) = limiter(3);
        for _ in 0..3 {
            assert_eq!(limiter.acquire(), Duration::ZERO);
        }
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_next_call_waits_for_oldest_to_age_out() {
        let (limiter, clock) = limiter(2);
        limiter.acquire();
        clock.advance(Duration::from_secs(10));
        limiter.acquire();

        let waited = limiter.acquire();
        assert_eq!(waited, Duration::from_secs(50));
        assert_eq!(clock.elapsed(), Duration::from_secs(60));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(50)]);

        // The second admission ages out ten seconds later.
        assert_eq!(limiter.acquire(), Duration::from_secs(10));
    }

    #[test]
    fn test_window_slides() {
        let (limiter, clock) = limiter(1);
        limiter.acquire();
        clock.advance(WINDOW);
        assert_eq!(limiter.acquire(), Duration::ZERO);
    }

    #[test]
    fn test_zero_capacity_is_one() {
        let (limiter, _clock) = limiter(0);
        assert_eq!(limiter.capacity(), 1);
        assert_eq!(limiter.acquire(), Duration::ZERO);
    }

    #[test]
    fn test_concurrent_admissions_respect_capacity() {
        let limiter = Arc::new(RateLimiter::with_clock(
            4,
            Duration::from_millis(300),
            Arc::new(SystemClock),
        ));
        let start = Instant::now();
        let handles: Vec<_> = (0..5)
            .map(|_| {
                let limiter = limiter.clone();
                thread::spawn(move || limiter.acquire())
            })
            .collect();
        let waits: Vec<Duration> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(waits.iter().filter(|w| w.is_zero()).count(), 4);
        assert!(start.elapsed() >= Duration::from_millis(250));
    }
}
