//! Asset domain entity

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::reservation::ReservationStatus;
use crate::shared::errors::DomainError;

/// Operational status of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetStatus {
    #[default]
    Available,
    Reserved,
    Rented,
    OutOfService,
}

impl AssetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Reserved => "reserved",
            Self::Rented => "rented",
            Self::OutOfService => "out-of-service",
        }
    }

    /// Status implied by the non-terminal reservations held on an asset.
    ///
    /// Any checked-out reservation wins over confirmed ones.
    pub fn from_occupancy<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = ReservationStatus>,
    {
        let mut status = Self::Available;
        for reservation_status in statuses {
            match reservation_status {
                ReservationStatus::CheckedOut => return Self::Rented,
                ReservationStatus::Confirmed => status = Self::Reserved,
                _ => {}
            }
        }
        status
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "reserved" => Ok(Self::Reserved),
            "rented" => Ok(Self::Rented),
            "out-of-service" => Ok(Self::OutOfService),
            other => Err(DomainError::Storage(format!("unknown asset status '{other}'"))),
        }
    }
}

/// A rentable vehicle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Licence plate or other display label
    pub label: String,
    pub category: String,
    pub status: AssetStatus,
    pub odometer: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    pub fn new(tenant_id: Uuid, label: impl Into<String>, category: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            label: label.into(),
            category: category.into(),
            status: AssetStatus::Available,
            odometer: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_out_of_service(&self) -> bool {
        self.status == AssetStatus::OutOfService
    }

    /// Recompute status from occupancy. `out-of-service` is left alone.
    pub fn apply_occupancy<I>(&mut self, statuses: I, now: DateTime<Utc>)
    where
        I: IntoIterator<Item = ReservationStatus>,
    {
        if self.is_out_of_service() {
            return;
        }
        self.status = AssetStatus::from_occupancy(statuses);
        self.updated_at = now;
    }
}
