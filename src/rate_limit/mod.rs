use axum::http::HeaderMap;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Limited { retry_after_secs: u64 },
}

/// Fixed-window counter keyed by an opaque string (the derived client IP).
///
/// State is process-local and in-memory with no persistence or cross-instance
/// coordination: created at process start, reset on restart. Advisory
/// protection for the login paths, not a security boundary.
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    state: Mutex<HashMap<String, WindowState>>,
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    count: u32,
    window_start: Instant,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Count one attempt for `key` and decide.
    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Decision {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let entry = state.entry(key.to_string()).or_insert(WindowState {
            count: 0,
            window_start: now,
        });

        // Window elapsed: start a fresh one.
        if now.duration_since(entry.window_start) >= self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= self.max_requests {
            let elapsed = now.duration_since(entry.window_start);
            let remaining = self.window.saturating_sub(elapsed);
            // Round up so clients never retry inside the same window.
            let retry_after_secs =
                (remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)).max(1);
            return Decision::Limited { retry_after_secs };
        }

        entry.count += 1;
        Decision::Allowed
    }
}

/// Limiter for login attempts (default 10 per minute per IP).
pub static LOGIN_LIMITER: Lazy<FixedWindowLimiter> = Lazy::new(|| {
    let cfg = &config::config().rate_limit;
    FixedWindowLimiter::new(cfg.login_attempts, Duration::from_secs(cfg.login_window_secs))
});

/// Limiter for UI-reported failed-login events (default 20 per 5 minutes).
pub static FAILED_LOGIN_LIMITER: Lazy<FixedWindowLimiter> = Lazy::new(|| {
    let cfg = &config::config().rate_limit;
    FixedWindowLimiter::new(
        cfg.failed_login_reports,
        Duration::from_secs(cfg.failed_login_window_secs),
    )
});

/// Derive the client IP key: first value of `x-forwarded-for`, then
/// `x-real-ip`. Absent both, callers fall back to a shared "unknown" bucket.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let trimmed = first.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let limiter = FixedWindowLimiter::new(3, Duration::from_secs(60));
        let start = Instant::now();

        for _ in 0..3 {
            assert_eq!(limiter.check_at("1.2.3.4", start), Decision::Allowed);
        }
        match limiter.check_at("1.2.3.4", start + Duration::from_secs(10)) {
            Decision::Limited { retry_after_secs } => {
                assert!(retry_after_secs > 0);
                assert!(retry_after_secs <= 60);
            }
            Decision::Allowed => panic!("expected limit"),
        }
    }

    #[test]
    fn window_reset_allows_again() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();

        assert_eq!(limiter.check_at("k", start), Decision::Allowed);
        assert!(matches!(
            limiter.check_at("k", start + Duration::from_secs(30)),
            Decision::Limited { .. }
        ));
        assert_eq!(
            limiter.check_at("k", start + Duration::from_secs(61)),
            Decision::Allowed
        );
    }

    #[test]
    fn keys_are_independent() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();

        assert_eq!(limiter.check_at("a", start), Decision::Allowed);
        assert_eq!(limiter.check_at("b", start), Decision::Allowed);
        assert!(matches!(
            limiter.check_at("a", start),
            Decision::Limited { .. }
        ));
    }

    #[test]
    fn forwarded_for_first_value_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.7, 70.41.3.18, 150.172.238.178".parse().unwrap(),
        );
        headers.insert("x-real-ip", "10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn real_ip_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&headers).as_deref(), Some("10.0.0.1"));
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }
}
