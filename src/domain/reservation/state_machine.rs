//! Reservation status lifecycle
//!
//! ```text
//! CONFIRMED ──► CHECKED_OUT ──► CHECKED_IN
//!     │
//!     └──────► CANCELLED
//! NO_SHOW (terminal, set externally)
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::shared::errors::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Confirmed,
    CheckedOut,
    CheckedIn,
    Cancelled,
    NoShow,
}

impl ReservationStatus {
    pub const ALL: [ReservationStatus; 5] = [
        Self::Confirmed,
        Self::CheckedOut,
        Self::CheckedIn,
        Self::Cancelled,
        Self::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "CONFIRMED",
            Self::CheckedOut => "CHECKED_OUT",
            Self::CheckedIn => "CHECKED_IN",
            Self::Cancelled => "CANCELLED",
            Self::NoShow => "NO_SHOW",
        }
    }

    /// Statuses reachable from `self` in one step.
    pub fn allowed_transitions(&self) -> &'static [ReservationStatus] {
        match self {
            Self::Confirmed => &[Self::CheckedOut, Self::Cancelled],
            Self::CheckedOut => &[Self::CheckedIn],
            Self::CheckedIn | Self::Cancelled | Self::NoShow => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Whether a reservation in this status holds its asset for its window.
    pub fn occupies_asset(&self) -> bool {
        matches!(self, Self::Confirmed | Self::CheckedOut)
    }

    pub fn can_transition_to(&self, requested: ReservationStatus) -> bool {
        self.allowed_transitions().contains(&requested)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::Storage(format!("unknown reservation status '{s}'")))
    }
}

/// The allowed successor set of a status, rendered for error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedTransitions(pub Vec<ReservationStatus>);

impl AllowedTransitions {
    pub fn of(status: ReservationStatus) -> Self {
        Self(status.allowed_transitions().to_vec())
    }
}

impl fmt::Display for AllowedTransitions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("none (terminal state)");
        }
        let names: Vec<&str> = self.0.iter().map(ReservationStatus::as_str).collect();
        f.write_str(&names.join(", "))
    }
}

/// Check that `current -> requested` is a legal step.
pub fn validate_transition(
    current: ReservationStatus,
    requested: ReservationStatus,
) -> DomainResult<()> {
    if current.can_transition_to(requested) {
        Ok(())
    } else {
        Err(DomainError::InvalidTransition {
            from: current,
            to: requested,
            allowed: AllowedTransitions::of(current),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReservationStatus::*;

    fn expected_allowed(from: ReservationStatus, to: ReservationStatus) -> bool {
        matches!(
            (from, to),
            (Confirmed, CheckedOut) | (Confirmed, Cancelled) | (CheckedOut, CheckedIn)
        )
    }

    #[test]
    fn every_pair_matches_the_transition_table() {
        for from in ReservationStatus::ALL {
            for to in ReservationStatus::ALL {
                let result = validate_transition(from, to);
                assert_eq!(
                    result.is_ok(),
                    expected_allowed(from, to),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn validation_is_deterministic() {
        for from in ReservationStatus::ALL {
            for to in ReservationStatus::ALL {
                let first = validate_transition(from, to).map_err(|e| e.to_string());
                let second = validate_transition(from, to).map_err(|e| e.to_string());
                assert_eq!(first, second);
            }
        }
    }

    #[test]
    fn denial_reports_current_state_and_allowed_set() {
        let err = validate_transition(Confirmed, CheckedIn).unwrap_err();
        match err {
            DomainError::InvalidTransition { from, to, allowed } => {
                assert_eq!(from, Confirmed);
                assert_eq!(to, CheckedIn);
                assert_eq!(allowed.to_string(), "CHECKED_OUT, CANCELLED");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn terminal_states() {
        assert!(CheckedIn.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(NoShow.is_terminal());
        assert!(!Confirmed.is_terminal());
        assert!(!CheckedOut.is_terminal());
        assert_eq!(AllowedTransitions::of(NoShow).to_string(), "none (terminal state)");
    }

    #[test]
    fn only_confirmed_and_checked_out_occupy_the_asset() {
        let occupying: Vec<_> = ReservationStatus::ALL
            .into_iter()
            .filter(ReservationStatus::occupies_asset)
            .collect();
        assert_eq!(occupying, vec![Confirmed, CheckedOut]);
    }

    #[test]
    fn parses_stored_names() {
        for status in ReservationStatus::ALL {
            assert_eq!(status.as_str().parse::<ReservationStatus>().unwrap(), status);
        }
        assert!("Accepted".parse::<ReservationStatus>().is_err());
    }
}
