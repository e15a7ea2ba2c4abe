//! Parcel tracking use-case service.
//!
//! # Responsibility
//! - Register parcels, walk them through the delivery lifecycle and expose
//!   the gated address/deletion operations.
//! - Emit metadata-only log events for each use case.
//!
//! # Invariants
//! - Service APIs never bypass the repository gates.
//! - Addresses are never written to logs.

use crate::model::parcel::{ClientId, Parcel, ParcelNumber, ParcelStatus};
use crate::repo::parcel_repo::{ParcelRepository, RepoResult};
use log::{debug, info, warn};

/// Use-case service wrapper for parcel operations.
pub struct ParcelService<R: ParcelRepository> {
    repo: R,
}

impl<R: ParcelRepository> ParcelService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a new parcel for `client` and returns the stored record.
    pub fn register(&self, client: ClientId, address: impl Into<String>) -> RepoResult<Parcel> {
        let parcel = Parcel::new(client, address);
        let number = self.repo.add_parcel(&parcel)?;
        info!("event=parcel_register module=service status=ok number={number} client={client}");
        Ok(parcel.with_number(number))
    }

    pub fn parcel(&self, number: ParcelNumber) -> RepoResult<Parcel> {
        self.repo.get_parcel(number)
    }

    pub fn client_parcels(&self, client: ClientId) -> RepoResult<Vec<Parcel>> {
        let parcels = self.repo.list_parcels_by_client(client)?;
        debug!(
            "event=parcel_list module=service status=ok client={client} count={}",
            parcels.len()
        );
        Ok(parcels)
    }

    /// Moves a parcel to the next lifecycle status.
    ///
    /// # Contract
    /// - Returns `Ok(Some(new_status))` after a transition.
    /// - Returns `Ok(None)` when the parcel is already `delivered`.
    /// - Fails with `PreconditionFailed` when another caller changed the
    ///   status after it was read; the parcel is left untouched.
    pub fn advance_status(&self, number: ParcelNumber) -> RepoResult<Option<ParcelStatus>> {
        let current = self.repo.get_parcel(number)?.status;
        let Some(next) = current.next() else {
            debug!("event=parcel_advance module=service status=skipped number={number} current={current}");
            return Ok(None);
        };

        self.repo
            .transition_status(number, current, next)
            .inspect_err(|err| {
                warn!("event=parcel_advance module=service status=error number={number} from={current} to={next} error={err}");
            })?;
        info!("event=parcel_advance module=service status=ok number={number} from={current} to={next}");
        Ok(Some(next))
    }

    /// Changes the delivery address; rejected once the parcel left `registered`.
    pub fn change_address(&self, number: ParcelNumber, address: &str) -> RepoResult<()> {
        self.repo.set_address(number, address).inspect_err(|err| {
            warn!("event=parcel_change_address module=service status=error number={number} error={err}");
        })?;
        info!("event=parcel_change_address module=service status=ok number={number}");
        Ok(())
    }

    /// Deletes a parcel; rejected once the parcel left `registered`.
    pub fn remove(&self, number: ParcelNumber) -> RepoResult<()> {
        self.repo.delete_parcel(number).inspect_err(|err| {
            warn!("event=parcel_delete module=service status=error number={number} error={err}");
        })?;
        info!("event=parcel_delete module=service status=ok number={number}");
        Ok(())
    }
}
