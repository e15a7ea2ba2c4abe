use parcel_core::db::open_db;
use parcel_core::{ParcelRepository, ParcelStatus, RepoError, SqliteParcelRepository};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::thread;

const WORKERS: usize = 8;

fn seed(path: &Path) -> i64 {
    let conn = open_db(path).unwrap();
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();
    repo.add_parcel(&parcel_core::Parcel::new(1000, "test"))
        .unwrap()
}

fn run_workers<F>(path: PathBuf, work: F) -> Vec<Result<(), RepoError>>
where
    F: Fn(&SqliteParcelRepository<'_>, usize) -> Result<(), RepoError> + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(WORKERS));
    let work = Arc::new(work);
    let handles: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let barrier = Arc::clone(&barrier);
            let work = Arc::clone(&work);
            let path = path.clone();
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let repo = SqliteParcelRepository::try_new(&conn).unwrap();
                barrier.wait();
                work(&repo, worker)
            })
        })
        .collect();

    handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect()
}

#[test]
fn concurrent_deletes_succeed_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker.db");
    let number = seed(&path);

    let results = run_workers(path.clone(), move |repo, _| repo.delete_parcel(number));

    let succeeded = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(succeeded, 1);
    assert!(results
        .iter()
        .filter_map(|result| result.as_ref().err())
        .all(|err| matches!(err, RepoError::NotFound(n) if *n == number)));
}

/// Records every committed status/address write in commit order.
fn install_write_journal(path: &Path) {
    let conn = open_db(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE write_journal (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            status TEXT NOT NULL,
            address TEXT NOT NULL
        );
        CREATE TRIGGER journal_address AFTER UPDATE OF address ON parcel
        BEGIN
            INSERT INTO write_journal (kind, status, address)
            VALUES ('address', NEW.status, NEW.address);
        END;
        CREATE TRIGGER journal_status AFTER UPDATE OF status ON parcel
        BEGIN
            INSERT INTO write_journal (kind, status, address)
            VALUES ('status', NEW.status, NEW.address);
        END;",
    )
    .unwrap();
}

#[test]
fn address_changes_commit_only_before_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker.db");
    let number = seed(&path);
    install_write_journal(&path);

    let results = run_workers(path.clone(), move |repo, worker| {
        if worker == 0 {
            repo.set_status(number, ParcelStatus::Sent)
        } else {
            repo.set_address(number, &format!("address {worker}"))
        }
    });
    assert!(results[0].is_ok());

    let successes = results[1..].iter().filter(|result| result.is_ok()).count();
    let rejected = results[1..]
        .iter()
        .filter(|result| {
            matches!(
                result,
                Err(RepoError::PreconditionFailed {
                    status: ParcelStatus::Sent,
                    ..
                })
            )
        })
        .count();
    assert_eq!(successes + rejected, WORKERS - 1);

    let conn = open_db(&path).unwrap();
    let journal: Vec<(String, String, String)> = conn
        .prepare("SELECT kind, status, address FROM write_journal ORDER BY seq;")
        .unwrap()
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    let dispatch_at = journal
        .iter()
        .position(|(kind, _, _)| kind == "status")
        .expect("status change should be journaled");
    assert_eq!(journal.len(), successes + 1);
    assert_eq!(dispatch_at, successes);
    assert!(journal[..dispatch_at]
        .iter()
        .all(|(_, status, _)| status == "registered"));

    let parcel = SqliteParcelRepository::try_new(&conn)
        .unwrap()
        .get_parcel(number)
        .unwrap();
    assert_eq!(parcel.status, ParcelStatus::Sent);
    assert_eq!(parcel.address, journal[dispatch_at].2);
}
