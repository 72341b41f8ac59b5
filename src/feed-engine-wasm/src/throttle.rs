/// At most one acquisition per interval
#[derive(Debug, Clone)]
pub struct RateLimit {
    interval_ms: f64,
    last_ms: Option<f64>,
}

impl RateLimit {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            last_ms: None,
        }
    }

    /// Whether an acquisition at `now_ms` would succeed
    #[inline]
    pub fn is_clear(&self, now_ms: f64) -> bool {
        self.last_ms
            .map_or(true, |last| now_ms - last >= self.interval_ms)
    }

    pub fn try_acquire(&mut self, now_ms: f64) -> bool {
        if self.is_clear(now_ms) {
            self.last_ms = Some(now_ms);
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}

/// Suppresses duplicate clicks on the same target within a short window
#[derive(Debug, Clone)]
pub struct ClickGuard {
    window_ms: f64,
    last: Option<(String, f64)>,
}

impl ClickGuard {
    pub fn new(window_ms: f64) -> Self {
        Self {
            window_ms,
            last: None,
        }
    }

    /// Returns false when the same key was accepted less than a window ago
    pub fn allow(&mut self, key: &str, now_ms: f64) -> bool {
        if let Some((last_key, at)) = &self.last {
            if last_key == key && now_ms - at < self.window_ms {
                return false;
            }
        }
        self.last = Some((key.to_string(), now_ms));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit() {
        let mut limit = RateLimit::new(1000.0);
        assert!(limit.try_acquire(0.0));
        assert!(!limit.try_acquire(999.0));
        assert!(limit.is_clear(1000.0));
        assert!(limit.try_acquire(1000.0));
    }

    #[test]
    fn test_click_guard() {
        let mut guard = ClickGuard::new(400.0);
        assert!(guard.allow("Dune", 0.0));
        assert!(!guard.allow("Dune", 100.0));
        assert!(guard.allow("Arrival", 150.0));
        assert!(guard.allow("Dune", 200.0));
        assert!(guard.allow("Dune", 700.0));
    }
}
