//! Requester domain entity

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequesterStatus {
    #[default]
    Active,
    Inactive,
    Blocked,
}

impl RequesterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Blocked => "blocked",
        }
    }
}

impl fmt::Display for RequesterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequesterStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "blocked" => Ok(Self::Blocked),
            other => Err(DomainError::Storage(format!(
                "unknown requester status '{other}'"
            ))),
        }
    }
}

/// The party a reservation is made for (a driver)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub status: RequesterStatus,
    /// Last day the driving licence is valid, if known
    pub licence_expires_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Requester {
    pub fn new(tenant_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.into(),
            email: None,
            status: RequesterStatus::Active,
            licence_expires_on: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == RequesterStatus::Active
    }

    /// Whether the licence is still valid on the day `until` falls on.
    /// An unknown expiry is treated as valid.
    pub fn licence_valid_through(&self, until: DateTime<Utc>) -> bool {
        self.licence_expires_on
            .map_or(true, |expiry| expiry >= until.date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn licence_validity_is_checked_by_day() {
        let mut r = Requester::new(Uuid::new_v4(), "Jo Doe");
        let end = Utc.with_ymd_and_hms(2026, 8, 31, 18, 0, 0).unwrap();
        assert!(r.licence_valid_through(end));

        r.licence_expires_on = NaiveDate::from_ymd_opt(2026, 8, 31);
        assert!(r.licence_valid_through(end));

        r.licence_expires_on = NaiveDate::from_ymd_opt(2026, 8, 30);
        assert!(!r.licence_valid_through(end));
    }

    #[test]
    fn only_active_requesters_are_active() {
        let mut r = Requester::new(Uuid::new_v4(), "Jo Doe");
        assert!(r.is_active());
        r.status = RequesterStatus::Blocked;
        assert!(!r.is_active());
    }
}
