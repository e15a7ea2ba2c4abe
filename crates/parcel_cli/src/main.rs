//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `parcel_core` linkage and walk one parcel through its lifecycle.
//! - Keep output deterministic apart from the assigned number and timestamp.
//!
//! Usage: `parcel_cli [DB_PATH]`. Without a path an in-memory store is used.
//! Set `PARCEL_LOG_DIR` to an absolute directory to enable file logging.

use parcel_core::{
    default_log_level, init_logging, open_db, open_db_in_memory, ParcelService,
    SqliteParcelRepository,
};
use std::error::Error;
use std::process::ExitCode;

const DEMO_CLIENT: i64 = 1000;

fn main() -> ExitCode {
    println!("parcel_core ping={}", parcel_core::ping());
    println!("parcel_core version={}", parcel_core::core_version());

    if let Ok(log_dir) = std::env::var("PARCEL_LOG_DIR") {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    match run(std::env::args().nth(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(db_path: Option<String>) -> Result<(), Box<dyn Error>> {
    let conn = match db_path.as_deref() {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let service = ParcelService::new(SqliteParcelRepository::try_new(&conn)?);

    let parcel = service.register(DEMO_CLIENT, "test")?;
    println!(
        "registered number={} status={} created_at={}",
        parcel.number, parcel.status, parcel.created_at
    );

    service.change_address(parcel.number, "new address")?;
    println!("address changed number={}", parcel.number);

    if let Some(status) = service.advance_status(parcel.number)? {
        println!("status advanced number={} status={status}", parcel.number);
    }

    if let Err(err) = service.change_address(parcel.number, "blocked") {
        println!("address change rejected: {err}");
    }
    if let Err(err) = service.remove(parcel.number) {
        println!("delete rejected: {err}");
    }

    let parcels = service.client_parcels(DEMO_CLIENT)?;
    println!("client={DEMO_CLIENT} parcels={}", parcels.len());
    Ok(())
}
