// Holder Raffle Engine - Entry rate limiting
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use crate::{clock::Clock, error::GameError};

struct Window {
    count: u32,
    reset_at: i64,
}

/// Fixed-window limiter keyed by request source
pub struct RateLimiter {
    max: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            max,
            window,
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request from `source`, rejecting it once the window is full
    pub fn check(&self, source: &str) -> Result<(), GameError> {
        let now = self.clock.now_millis();
        let mut windows = self
            .windows
            .lock()
            .map_err(|_| GameError::Store("rate limiter lock poisoned".to_string()))?;

        // Drop expired windows so the map does not grow without bound
        windows.retain(|_, w| w.reset_at > now);

        match windows.get_mut(source) {
            Some(window) if window.count >= self.max => Err(GameError::RateLimited),
            Some(window) => {
                window.count += 1;
                Ok(())
            }
            None => {
                windows.insert(
                    source.to_string(),
                    Window {
                        count: 1,
                        reset_at: now + self.window.as_millis() as i64,
                    },
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_window_fills_and_resets() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = RateLimiter::new(5, Duration::from_secs(60), clock.clone());
        for _ in 0..5 {
            limiter.check("10.0.0.1").unwrap();
        }
        assert_eq!(limiter.check("10.0.0.1"), Err(GameError::RateLimited));
        // Other sources are unaffected
        limiter.check("10.0.0.2").unwrap();

        clock.advance(Duration::from_secs(60));
        limiter.check("10.0.0.1").unwrap();
    }
}
