use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);
const MAX_REQUESTS: u32 = 10;
const COMMAND_COOLDOWN: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct WindowState {
    count: u32,
    reset_at: Instant,
}

/// In-memory per-user rate limiting: a fixed request window plus a short
/// per-command cooldown. Entries expire with their window; good enough for
/// a single low-traffic process.
#[derive(Clone)]
pub struct Throttle {
    windows: Arc<Mutex<HashMap<i64, WindowState>>>,
    cooldowns: Arc<Mutex<HashMap<(i64, String), Instant>>>,
}

impl Throttle {
    pub fn new() -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            cooldowns: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// `None` means the request may proceed; `Some(secs)` is how long the
    /// user has to wait.
    pub fn check_rate_limit(&self, tg_id: i64) -> Option<u64> {
        self.check_rate_limit_at(tg_id, Instant::now())
    }

    fn check_rate_limit_at(&self, tg_id: i64, now: Instant) -> Option<u64> {
        let mut windows = self.windows.lock().unwrap();
        let entry = windows.entry(tg_id).or_insert(WindowState {
            count: 0,
            reset_at: now + WINDOW,
        });

        if now >= entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + WINDOW;
        }

        if entry.count >= MAX_REQUESTS {
            let wait = entry.reset_at.saturating_duration_since(now);
            return Some(wait.as_secs().max(1));
        }

        entry.count += 1;
        None
    }

    pub fn check_cooldown(&self, tg_id: i64, command: &str) -> Option<u64> {
        self.check_cooldown_at(tg_id, command, Instant::now(), COMMAND_COOLDOWN)
    }

    fn check_cooldown_at(
        &self,
        tg_id: i64,
        command: &str,
        now: Instant,
        cooldown: Duration,
    ) -> Option<u64> {
        let mut cooldowns = self.cooldowns.lock().unwrap();
        let key = (tg_id, command.to_string());

        if let Some(last) = cooldowns.get(&key) {
            let elapsed = now.saturating_duration_since(*last);
            if elapsed < cooldown {
                let wait = cooldown - elapsed;
                return Some(wait.as_secs().max(1));
            }
        }

        cooldowns.insert(key, now);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_allows_up_to_max_requests() {
        let throttle = Throttle::new();
        let now = Instant::now();
        for _ in 0..MAX_REQUESTS {
            assert_eq!(throttle.check_rate_limit_at(7, now), None);
        }
        assert!(throttle.check_rate_limit_at(7, now).is_some());
    }

    #[test]
    fn window_resets_after_expiry() {
        let throttle = Throttle::new();
        let now = Instant::now();
        for _ in 0..MAX_REQUESTS {
            throttle.check_rate_limit_at(7, now);
        }
        assert!(throttle.check_rate_limit_at(7, now).is_some());

        let later = now + WINDOW + Duration::from_secs(1);
        assert_eq!(throttle.check_rate_limit_at(7, later), None);
    }

    #[test]
    fn users_are_limited_independently() {
        let throttle = Throttle::new();
        let now = Instant::now();
        for _ in 0..MAX_REQUESTS {
            throttle.check_rate_limit_at(1, now);
        }
        assert!(throttle.check_rate_limit_at(1, now).is_some());
        assert_eq!(throttle.check_rate_limit_at(2, now), None);
    }

    #[test]
    fn cooldown_blocks_rapid_repeats_of_same_command() {
        let throttle = Throttle::new();
        let now = Instant::now();
        let cd = Duration::from_secs(5);

        assert_eq!(throttle.check_cooldown_at(7, "buy", now, cd), None);
        assert!(throttle
            .check_cooldown_at(7, "buy", now + Duration::from_secs(2), cd)
            .is_some());
        assert_eq!(
            throttle.check_cooldown_at(7, "misordenes", now + Duration::from_secs(2), cd),
            None
        );
        assert_eq!(
            throttle.check_cooldown_at(7, "buy", now + Duration::from_secs(6), cd),
            None
        );
    }
}
