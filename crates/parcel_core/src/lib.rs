//! Persistence layer for parcel shipment records.
//! Owns the parcel schema, the status gate and the use cases built on top.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, open_db_with_options, DbError, DbOptions};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::parcel::{ClientId, Parcel, ParcelNumber, ParcelStatus, ParseStatusError};
pub use repo::parcel_repo::{
    GatedAction, MissingParcelPolicy, ParcelRepository, RepoError, RepoOptions, RepoResult,
    SqliteParcelRepository,
};
pub use service::parcel_service::ParcelService;

/// Minimal health-check API for integration probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
