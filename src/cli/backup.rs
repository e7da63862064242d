use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rusqlite::{Connection, DatabaseName};
use tracing::info;

use crate::auth;
use crate::db::{self, OpStatus};
use crate::error::{KakeiboError, Result};
use crate::fmt::format_bytes;
use crate::settings::load_settings;

/// What ended up in a backup file, read back from the copy itself.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    expenses: usize,
    queued: i64,
    bytes: u64,
}

fn default_backup_path(data_dir: &str, taken_at: NaiveDateTime) -> PathBuf {
    PathBuf::from(data_dir)
        .join("backups")
        .join(format!("kakeibo-{}.sqlite3", taken_at.format("%Y%m%d-%H%M%S")))
}

/// Copy the cache, the outbox and sync metadata into `dest` using SQLite's
/// online backup. An existing file at `dest` is never overwritten.
fn backup_to(conn: &Connection, dest: &Path) -> Result<Snapshot> {
    if dest.exists() {
        return Err(KakeiboError::Other(format!(
            "{} already exists; choose another --output",
            dest.display()
        )));
    }
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    conn.backup(DatabaseName::Main, dest, None)?;

    let copy = Connection::open(dest)?;
    let expenses = db::list_expenses(&copy)?.len();
    let queued = db::count_by_status(&copy, OpStatus::Pending)? + db::count_by_status(&copy, OpStatus::Failed)?;
    let bytes = std::fs::metadata(dest)?.len();
    Ok(Snapshot { expenses, queued, bytes })
}

pub fn run(output: Option<String>) -> Result<()> {
    let settings = load_settings();
    auth::ensure_unlocked(&settings)?;
    let conn = db::get_connection(&settings.db_path())?;

    let dest = match output {
        Some(p) => PathBuf::from(p),
        None => default_backup_path(&settings.data_dir, chrono::Local::now().naive_local()),
    };
    let snapshot = backup_to(&conn, &dest)?;
    info!(path = %dest.display(), expenses = snapshot.expenses, "backup written");

    println!("Backup saved to {}", dest.display());
    println!(
        "{} expense(s), {} unsent change(s), {}",
        snapshot.expenses,
        snapshot.queued,
        format_bytes(snapshot.bytes)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::OpKind;
    use crate::models::Expense;

    #[test]
    fn test_backup_carries_cache_and_outbox() {
        let dir = tempfile::tempdir().unwrap();
        let conn = db::get_connection(&dir.path().join("live.db")).unwrap();
        let rent = Expense {
            id: "rent-1".to_string(),
            date: "2026/01/30".to_string(),
            item_name: "Rent".to_string(),
            category: "housing/utilities".to_string(),
            amount: 74000,
            payer: "B".to_string(),
            is_settled: false,
        };
        db::insert_expense(&conn, &rent).unwrap();
        db::enqueue(&conn, OpKind::Add, "rent-1", "{}").unwrap();

        let dest = dir.path().join("nested").join("copy.sqlite3");
        let snapshot = backup_to(&conn, &dest).unwrap();
        assert_eq!(snapshot.expenses, 1);
        assert_eq!(snapshot.queued, 1);
        assert!(snapshot.bytes > 0);

        let copy = Connection::open(&dest).unwrap();
        assert_eq!(db::get_expense(&copy, "rent-1").unwrap(), Some(rent));
    }

    #[test]
    fn test_backup_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let conn = db::get_connection(&dir.path().join("live.db")).unwrap();
        let dest = dir.path().join("copy.sqlite3");
        std::fs::write(&dest, b"keep me").unwrap();
        assert!(backup_to(&conn, &dest).is_err());
        assert_eq!(std::fs::read(&dest).unwrap(), b"keep me");
    }

    #[test]
    fn test_default_backup_path() {
        let at = chrono::NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(9, 3, 7)
            .unwrap();
        assert_eq!(
            default_backup_path("/tmp/k", at),
            PathBuf::from("/tmp/k/backups/kakeibo-20260105-090307.sqlite3")
        );
    }
}
