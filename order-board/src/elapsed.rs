//! Elapsed preparation time
//!
//! Pure function of (created_at, frozen seconds, status, now). Finalized
//! orders show their frozen duration; everything else counts up from
//! creation.

use serde::Serialize;
use shared::order::{OrderSnapshot, OrderStatus};
use std::fmt;

/// Minutes at which the display stops counting
pub const DISPLAY_CAP_MINUTES: i64 = 60;
/// Minutes at which an order becomes a warning
pub const WARNING_MINUTES: i64 = 20;
/// Minutes at which an order becomes critical
pub const CRITICAL_MINUTES: i64 = 30;

/// Display emphasis by elapsed minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyTier {
    Nominal,
    Warning,
    Critical,
}

impl UrgencyTier {
    pub fn from_minutes(minutes: i64) -> Self {
        if minutes < WARNING_MINUTES {
            UrgencyTier::Nominal
        } else if minutes < CRITICAL_MINUTES {
            UrgencyTier::Warning
        } else {
            UrgencyTier::Critical
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ElapsedTime {
    pub minutes: i64,
    pub seconds: i64,
    pub urgency: UrgencyTier,
}

impl ElapsedTime {
    pub fn from_seconds(total: i64) -> Self {
        let total = total.max(0);
        let minutes = total / 60;
        Self {
            minutes,
            seconds: total % 60,
            urgency: UrgencyTier::from_minutes(minutes),
        }
    }

    /// Display stops at 60:00+
    pub fn is_capped(&self) -> bool {
        self.minutes >= DISPLAY_CAP_MINUTES
    }
}

impl fmt::Display for ElapsedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_capped() {
            write!(f, "{}:00+", DISPLAY_CAP_MINUTES)
        } else {
            write!(f, "{:02}:{:02}", self.minutes, self.seconds)
        }
    }
}

/// Compute elapsed time for display.
///
/// Returns `None` without a creation timestamp; callers skip rendering.
pub fn elapsed_time(
    created_at: Option<i64>,
    frozen_seconds: Option<i64>,
    status: OrderStatus,
    now: i64,
) -> Option<ElapsedTime> {
    let created_at = created_at?;
    let total = match frozen_seconds {
        Some(frozen) if status.is_finalized() => frozen,
        _ => (now - created_at).div_euclid(1000),
    };
    Some(ElapsedTime::from_seconds(total))
}

/// Seconds between creation and `now`, floored, never negative
pub fn seconds_since(created_at: i64, now: i64) -> i64 {
    (now - created_at).div_euclid(1000).max(0)
}

/// [`elapsed_time`] for a snapshot
pub fn for_order(order: &OrderSnapshot, now: i64) -> Option<ElapsedTime> {
    elapsed_time(
        Some(order.created_at),
        order.elapsed_seconds,
        order.status,
        now,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    #[test]
    fn test_counts_up_from_creation() {
        let t = elapsed_time(Some(T0), None, OrderStatus::Preparing, T0 + 125_000).unwrap();
        assert_eq!((t.minutes, t.seconds), (2, 5));
        assert_eq!(t.urgency, UrgencyTier::Nominal);
        assert_eq!(t.to_string(), "02:05");
    }

    #[test]
    fn test_urgency_tiers() {
        let at = |minutes: i64| {
            elapsed_time(Some(T0), None, OrderStatus::Pending, T0 + minutes * 60 * 1000)
                .unwrap()
                .urgency
        };
        assert_eq!(at(19), UrgencyTier::Nominal);
        assert_eq!(at(20), UrgencyTier::Warning);
        assert_eq!(at(21), UrgencyTier::Warning);
        assert_eq!(at(29), UrgencyTier::Warning);
        assert_eq!(at(30), UrgencyTier::Critical);
        assert_eq!(at(31), UrgencyTier::Critical);
    }

    #[test]
    fn test_tier_ignores_seconds() {
        let t = elapsed_time(Some(T0), None, OrderStatus::Ready, T0 + (19 * 60 + 59) * 1000).unwrap();
        assert_eq!(t.urgency, UrgencyTier::Nominal);
    }

    #[test]
    fn test_frozen_duration_for_finalized() {
        let t = elapsed_time(Some(T0), Some(754), OrderStatus::Delivered, T0 + 99_999_999).unwrap();
        assert_eq!((t.minutes, t.seconds), (12, 34));

        // frozen value is ignored while the order is still active
        let t = elapsed_time(Some(T0), Some(754), OrderStatus::Ready, T0 + 60_000).unwrap();
        assert_eq!((t.minutes, t.seconds), (1, 0));

        // finalized without a frozen value keeps counting
        let t = elapsed_time(Some(T0), None, OrderStatus::Cancelled, T0 + 61_000).unwrap();
        assert_eq!((t.minutes, t.seconds), (1, 1));
    }

    #[test]
    fn test_future_creation_clamps_to_zero() {
        let t = elapsed_time(Some(T0), None, OrderStatus::Pending, T0 - 5_000).unwrap();
        assert_eq!((t.minutes, t.seconds), (0, 0));
        assert_eq!(seconds_since(T0, T0 - 1), 0);
        assert_eq!(seconds_since(T0, T0 + 1_999), 1);
    }

    #[test]
    fn test_display_caps_at_sixty_minutes() {
        let t = elapsed_time(Some(T0), None, OrderStatus::Pending, T0 + 60 * 60 * 1000).unwrap();
        assert!(t.is_capped());
        assert_eq!(t.to_string(), "60:00+");

        let t = elapsed_time(Some(T0), None, OrderStatus::Pending, T0 + 3 * 60 * 60 * 1000 + 7_000).unwrap();
        assert_eq!(t.to_string(), "60:00+");
        assert_eq!(t.urgency, UrgencyTier::Critical);

        let t = ElapsedTime::from_seconds(59 * 60 + 59);
        assert_eq!(t.to_string(), "59:59");
    }

    #[test]
    fn test_missing_creation_yields_nothing() {
        assert_eq!(elapsed_time(None, Some(10), OrderStatus::Delivered, T0), None);
    }
}
