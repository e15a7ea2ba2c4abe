//! Parcel repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide single-record CRUD over the `parcel` table.
//! - Enforce the `registered`-only gate for address changes and deletion.
//! - Offer compare-and-set status transitions for lifecycle moves.
//!
//! # Invariants
//! - `number` is assigned by SQLite on insert and never taken from callers.
//! - Gated writes run inside one `IMMEDIATE` transaction, so the status
//!   check and the mutation cannot interleave with another writer.
//! - Read paths reject unknown persisted statuses instead of masking them.
//! - No retries: every store failure reaches the caller unchanged.

use crate::db::migrations::{latest_version, schema_version};
use crate::db::DbError;
use crate::model::parcel::{ClientId, Parcel, ParcelNumber, ParcelStatus};
use rusqlite::{params, Connection, OptionalExtension, Params, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PARCEL_SELECT_SQL: &str = "SELECT
    number,
    client,
    status,
    address,
    created_at
FROM parcel";

const PARCEL_TABLE: &str = "parcel";
const PARCEL_COLUMNS: &[&str] = &["number", "client", "status", "address", "created_at"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Mutation guarded by a required current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatedAction {
    ChangeAddress,
    Delete,
    /// Compare-and-set status change, see `ParcelRepository::transition_status`.
    Transition(ParcelStatus),
}

/// Behavior of `set_status` when no row matches the number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingParcelPolicy {
    /// Report `RepoError::NotFound`.
    #[default]
    Reject,
    /// Treat the update as an idempotent no-op.
    Ignore,
}

/// Repository tuning knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepoOptions {
    pub missing_parcel: MissingParcelPolicy,
}

/// Repository error for parcel persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// No parcel carries the requested number.
    NotFound(ParcelNumber),
    /// A gated mutation was attempted outside the required status.
    PreconditionFailed {
        number: ParcelNumber,
        action: GatedAction,
        status: ParcelStatus,
        required: ParcelStatus,
    },
    /// Underlying store failure.
    Db(DbError),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(number) => write!(f, "parcel not found: {number}"),
            Self::PreconditionFailed {
                number,
                action: GatedAction::ChangeAddress,
                status,
                required,
            } => write!(
                f,
                "unable to change address for parcel {number}: status is `{status}`, address changes require `{required}`"
            ),
            Self::PreconditionFailed {
                number,
                action: GatedAction::Delete,
                status,
                required,
            } => write!(
                f,
                "unable to delete parcel {number}: status is `{status}`, deletion requires `{required}`"
            ),
            Self::PreconditionFailed {
                number,
                action: GatedAction::Transition(target),
                status,
                required,
            } => write!(
                f,
                "unable to move parcel {number} to `{target}`: status is `{status}`, expected `{required}`"
            ),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted parcel data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it through db::open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for parcel operations.
pub trait ParcelRepository {
    /// Inserts a parcel and returns the store-assigned number.
    fn add_parcel(&self, parcel: &Parcel) -> RepoResult<ParcelNumber>;
    /// Loads one parcel, failing with `NotFound` when absent.
    fn get_parcel(&self, number: ParcelNumber) -> RepoResult<Parcel>;
    /// Lists every parcel owned by `client`. Empty when none match.
    fn list_parcels_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>>;
    /// Overwrites the status regardless of the current one.
    fn set_status(&self, number: ParcelNumber, status: ParcelStatus) -> RepoResult<()>;
    /// Moves the parcel from `from` to `to` only if its status is still `from`.
    fn transition_status(
        &self,
        number: ParcelNumber,
        from: ParcelStatus,
        to: ParcelStatus,
    ) -> RepoResult<()>;
    /// Overwrites the address while the parcel is still `registered`.
    fn set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<()>;
    /// Removes the parcel while it is still `registered`.
    fn delete_parcel(&self, number: ParcelNumber) -> RepoResult<()>;
}

/// SQLite-backed parcel repository over an injected connection.
///
/// A `Connection` is not `Sync`; concurrent callers open one connection
/// each against the same database file.
pub struct SqliteParcelRepository<'conn> {
    conn: &'conn Connection,
    options: RepoOptions,
}

impl<'conn> SqliteParcelRepository<'conn> {
    /// Constructs a repository from a migrated connection with default options.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Self::with_options(conn, RepoOptions::default())
    }

    /// Constructs a repository after checking schema version and table shape.
    pub fn with_options(conn: &'conn Connection, options: RepoOptions) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn, options })
    }

    fn gated_write<P: Params>(
        &self,
        number: ParcelNumber,
        action: GatedAction,
        required: ParcelStatus,
        sql: &str,
        params: P,
    ) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(sql, params)?;

        if changed == 0 {
            return Err(match read_status(&tx, number)? {
                None => RepoError::NotFound(number),
                Some(status) => RepoError::PreconditionFailed {
                    number,
                    action,
                    status,
                    required,
                },
            });
        }

        tx.commit()?;
        Ok(())
    }
}

impl ParcelRepository for SqliteParcelRepository<'_> {
    fn add_parcel(&self, parcel: &Parcel) -> RepoResult<ParcelNumber> {
        self.conn.execute(
            "INSERT INTO parcel (client, status, address, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                parcel.client,
                parcel.status.as_str(),
                parcel.address.as_str(),
                parcel.created_at.as_str(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_parcel(&self, number: ParcelNumber) -> RepoResult<Parcel> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PARCEL_SELECT_SQL} WHERE number = ?1;"))?;
        let mut rows = stmt.query([number])?;

        match rows.next()? {
            Some(row) => parse_parcel_row(row),
            None => Err(RepoError::NotFound(number)),
        }
    }

    fn list_parcels_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PARCEL_SELECT_SQL} WHERE client = ?1 ORDER BY number ASC;"
        ))?;
        let mut rows = stmt.query([client])?;
        let mut parcels = Vec::new();

        while let Some(row) = rows.next()? {
            parcels.push(parse_parcel_row(row)?);
        }

        Ok(parcels)
    }

    fn set_status(&self, number: ParcelNumber, status: ParcelStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE parcel SET status = ?2 WHERE number = ?1;",
            params![number, status.as_str()],
        )?;

        if changed == 0 && self.options.missing_parcel == MissingParcelPolicy::Reject {
            return Err(RepoError::NotFound(number));
        }

        Ok(())
    }

    fn transition_status(
        &self,
        number: ParcelNumber,
        from: ParcelStatus,
        to: ParcelStatus,
    ) -> RepoResult<()> {
        self.gated_write(
            number,
            GatedAction::Transition(to),
            from,
            "UPDATE parcel SET status = ?2 WHERE number = ?1 AND status = ?3;",
            params![number, to.as_str(), from.as_str()],
        )
    }

    fn set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<()> {
        self.gated_write(
            number,
            GatedAction::ChangeAddress,
            ParcelStatus::Registered,
            "UPDATE parcel SET address = ?2 WHERE number = ?1 AND status = ?3;",
            params![number, address, ParcelStatus::Registered.as_str()],
        )
    }

    fn delete_parcel(&self, number: ParcelNumber) -> RepoResult<()> {
        self.gated_write(
            number,
            GatedAction::Delete,
            ParcelStatus::Registered,
            "DELETE FROM parcel WHERE number = ?1 AND status = ?2;",
            params![number, ParcelStatus::Registered.as_str()],
        )
    }
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let columns = stmt
        .query_map([PARCEL_TABLE], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    if columns.is_empty() {
        return Err(RepoError::MissingRequiredTable(PARCEL_TABLE));
    }

    for &column in PARCEL_COLUMNS {
        if !columns.iter().any(|existing| existing == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: PARCEL_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn read_status(conn: &Connection, number: ParcelNumber) -> RepoResult<Option<ParcelStatus>> {
    let status_text = conn
        .query_row(
            "SELECT status FROM parcel WHERE number = ?1;",
            [number],
            |row| row.get::<_, String>(0),
        )
        .optional()?;

    status_text.map(|text| parse_status(&text)).transpose()
}

fn parse_status(text: &str) -> RepoResult<ParcelStatus> {
    text.parse()
        .map_err(|_| RepoError::InvalidData(format!("invalid status `{text}` in parcel.status")))
}

fn parse_parcel_row(row: &Row<'_>) -> RepoResult<Parcel> {
    let status_text: String = row.get("status")?;

    Ok(Parcel {
        number: row.get("number")?,
        client: row.get("client")?,
        status: parse_status(&status_text)?,
        address: row.get("address")?,
        created_at: row.get("created_at")?,
    })
}
