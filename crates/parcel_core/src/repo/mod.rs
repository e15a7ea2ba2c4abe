//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the parcel data access contract.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Address changes and deletion are gated on `registered` status inside
//!   the same write that performs them.
//! - Repository APIs return semantic errors (`NotFound`,
//!   `PreconditionFailed`) in addition to DB transport errors.

pub mod parcel_repo;
