//! Booking windows and the overlap rule.
//!
//! Two windows overlap iff `s1 <= e2 && e1 >= s2`. Touching endpoints count
//! as an overlap: a vehicle returned at 10:00 cannot be handed out again at
//! 10:00 without a turnaround.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::Reservation;
use crate::shared::errors::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window, rejecting empty or inverted ranges.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<Self> {
        if start >= end {
            return Err(DomainError::PreconditionFailed(format!(
                "start ({}) must be before end ({})",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

/// Whether `candidate` blocks a booking of `asset_id` over `window`.
///
/// This is the single predicate every store implementation must agree with;
/// SQL-backed stores express the same conditions as a WHERE clause.
pub fn blocks_window(
    candidate: &Reservation,
    asset_id: Uuid,
    window: &TimeWindow,
    exclude: Option<Uuid>,
) -> bool {
    candidate.asset_id == asset_id
        && exclude != Some(candidate.id)
        && candidate.status.occupies_asset()
        && candidate.window().overlaps(window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reservation::ReservationStatus;
    use chrono::{Duration, TimeZone};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, d, 10, 0, 0).unwrap()
    }

    fn window(s: u32, e: u32) -> TimeWindow {
        TimeWindow::new(day(s), day(e)).unwrap()
    }

    #[test]
    fn empty_and_inverted_windows_are_rejected() {
        assert!(matches!(
            TimeWindow::new(day(3), day(3)),
            Err(DomainError::PreconditionFailed(_))
        ));
        assert!(TimeWindow::new(day(4), day(3)).is_err());
    }

    #[test]
    fn overlap_cases() {
        let base = window(1, 5);
        assert!(base.overlaps(&window(3, 4)), "contained");
        assert!(base.overlaps(&window(4, 8)), "straddles end");
        assert!(base.overlaps(&window(1, 5)), "identical");
        assert!(window(3, 4).overlaps(&base), "symmetric");
        assert!(base.overlaps(&window(5, 7)), "touching end counts");
        assert!(!base.overlaps(&window(6, 9)), "disjoint");
        let just_after = TimeWindow::new(day(5) + Duration::seconds(1), day(9)).unwrap();
        assert!(!base.overlaps(&just_after));
    }

    #[test]
    fn blocking_ignores_terminal_other_assets_and_excluded_id() {
        let asset = Uuid::new_v4();
        let mut r = Reservation::sample(asset, window(1, 5));

        assert!(blocks_window(&r, asset, &window(2, 3), None));
        assert!(!blocks_window(&r, Uuid::new_v4(), &window(2, 3), None));
        assert!(!blocks_window(&r, asset, &window(2, 3), Some(r.id)));

        r.status = ReservationStatus::CheckedOut;
        assert!(blocks_window(&r, asset, &window(2, 3), None));

        for status in [
            ReservationStatus::Cancelled,
            ReservationStatus::CheckedIn,
            ReservationStatus::NoShow,
        ] {
            r.status = status;
            assert!(!blocks_window(&r, asset, &window(2, 3), None), "{status}");
        }
    }
}
