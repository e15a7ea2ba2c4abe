//! Parcel domain model.
//!
//! # Responsibility
//! - Define the shipment record persisted by the repository layer.
//! - Own the closed status set and its lifecycle ordering.
//!
//! # Invariants
//! - Parcel numbers are assigned by the store, never by callers.
//! - Only `registered` parcels accept address changes or deletion.

pub mod parcel;
