//! Parcel record and status lifecycle.
//!
//! # Responsibility
//! - Define the canonical `Parcel` record shared by repository and service.
//! - Map `ParcelStatus` to and from its canonical storage string.
//!
//! # Invariants
//! - `number` is `0` until the store assigns an identifier.
//! - `client` and `created_at` never change after creation.
//! - Status strings outside `registered|sent|delivered` are rejected at
//!   the boundary instead of being stored.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Store-assigned parcel identifier.
pub type ParcelNumber = i64;

/// Identifier of the client owning a parcel.
///
/// Not checked against any client table.
pub type ClientId = i64;

/// Delivery lifecycle of a parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParcelStatus {
    /// Accepted for shipment. Address and deletion are still allowed.
    Registered,
    /// Handed over to the carrier.
    Sent,
    /// Received by the client. Terminal state.
    Delivered,
}

impl ParcelStatus {
    /// Returns the canonical storage form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
        }
    }

    /// Returns the status that follows this one, or `None` once delivered.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Registered => Some(Self::Sent),
            Self::Sent => Some(Self::Delivered),
            Self::Delivered => None,
        }
    }

    /// Whether address changes and deletion are permitted in this state.
    pub fn is_mutable(self) -> bool {
        self == Self::Registered
    }
}

impl Display for ParcelStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected status text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError(pub String);

impl Display for ParseStatusError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown parcel status `{}`; expected registered|sent|delivered",
            self.0
        )
    }
}

impl Error for ParseStatusError {}

impl FromStr for ParcelStatus {
    type Err = ParseStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "registered" => Ok(Self::Registered),
            "sent" => Ok(Self::Sent),
            "delivered" => Ok(Self::Delivered),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Shipment record tracked by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    /// Store-assigned identifier. Ignored on insert.
    pub number: ParcelNumber,
    pub client: ClientId,
    pub status: ParcelStatus,
    /// Free-form delivery address.
    pub address: String,
    /// RFC3339 timestamp, stored verbatim.
    pub created_at: String,
}

impl Parcel {
    /// Creates a `registered` parcel stamped with the current UTC time.
    ///
    /// # Invariants
    /// - `number` stays `0` until the store assigns one.
    /// - `created_at` uses RFC3339 with second precision and a `Z` suffix.
    pub fn new(client: ClientId, address: impl Into<String>) -> Self {
        Self {
            number: 0,
            client,
            status: ParcelStatus::Registered,
            address: address.into(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Returns a copy carrying the store-assigned number.
    pub fn with_number(mut self, number: ParcelNumber) -> Self {
        self.number = number;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{Parcel, ParcelStatus};
    use chrono::DateTime;

    #[test]
    fn status_lifecycle_ends_at_delivered() {
        assert_eq!(ParcelStatus::Registered.next(), Some(ParcelStatus::Sent));
        assert_eq!(ParcelStatus::Sent.next(), Some(ParcelStatus::Delivered));
        assert_eq!(ParcelStatus::Delivered.next(), None);
    }

    #[test]
    fn only_registered_is_mutable() {
        assert!(ParcelStatus::Registered.is_mutable());
        assert!(!ParcelStatus::Sent.is_mutable());
        assert!(!ParcelStatus::Delivered.is_mutable());
    }

    #[test]
    fn status_parse_rejects_unknown_and_non_canonical_text() {
        assert_eq!("sent".parse::<ParcelStatus>(), Ok(ParcelStatus::Sent));
        let err = "Sent".parse::<ParcelStatus>().unwrap_err();
        assert_eq!(err.0, "Sent");
        assert!("".parse::<ParcelStatus>().is_err());
    }

    #[test]
    fn new_parcel_is_registered_with_rfc3339_timestamp() {
        let parcel = Parcel::new(1000, "test");
        assert_eq!(parcel.number, 0);
        assert_eq!(parcel.status, ParcelStatus::Registered);
        assert!(parcel.created_at.ends_with('Z'));
        DateTime::parse_from_rfc3339(&parcel.created_at).expect("timestamp should be RFC3339");
    }
}
