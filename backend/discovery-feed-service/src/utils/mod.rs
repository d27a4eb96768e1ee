// Utility functions for discovery-feed-service

use chrono::{DateTime, Utc};

/// Keep a threshold if it is finite and non-negative, otherwise use the default
pub fn sanitize_threshold(value: f64, default: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        default
    }
}

/// Current time, never earlier than `last`
pub fn monotonic_now(last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match last {
        Some(last) if last > now => last,
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_sanitize_threshold() {
        assert_eq!(sanitize_threshold(100.0, 50.0), 100.0);
        assert_eq!(sanitize_threshold(0.0, 50.0), 0.0);
        assert_eq!(sanitize_threshold(-1.0, 50.0), 50.0);
        assert_eq!(sanitize_threshold(f64::NAN, 50.0), 50.0);
        assert_eq!(sanitize_threshold(f64::INFINITY, 50.0), 50.0);
    }

    #[test]
    fn test_monotonic_now() {
        // 時鐘回撥時沿用上一筆時間
        let future = Utc::now() + Duration::hours(1);
        assert_eq!(monotonic_now(Some(future)), future);

        let past = Utc::now() - Duration::hours(1);
        assert!(monotonic_now(Some(past)) > past);
        assert!(monotonic_now(None) <= Utc::now());
    }
}
