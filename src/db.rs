use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{KakeiboError, Result};
use crate::models::{Expense, MAX_AMOUNT};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS expenses (
    id TEXT PRIMARY KEY,
    date TEXT NOT NULL,
    item_name TEXT NOT NULL,
    category TEXT NOT NULL,
    amount INTEGER NOT NULL CHECK (amount >= 0),
    payer TEXT NOT NULL,
    is_settled INTEGER NOT NULL DEFAULT 0,
    position INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS outbox (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    expense_id TEXT NOT NULL,
    payload TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    attempts INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT
);

CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    init_db(&conn)?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Expense cache
// ---------------------------------------------------------------------------

fn row_to_expense(row: &rusqlite::Row) -> rusqlite::Result<Expense> {
    Ok(Expense {
        id: row.get(0)?,
        date: row.get(1)?,
        item_name: row.get(2)?,
        category: row.get(3)?,
        amount: row.get(4)?,
        payer: row.get(5)?,
        is_settled: row.get(6)?,
    })
}

/// All cached expenses, newest-added first.
pub fn list_expenses(conn: &Connection) -> Result<Vec<Expense>> {
    let mut stmt = conn.prepare(
        "SELECT id, date, item_name, category, amount, payer, is_settled \
         FROM expenses ORDER BY position DESC",
    )?;
    let rows = stmt.query_map([], row_to_expense)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub fn get_expense(conn: &Connection, id: &str) -> Result<Option<Expense>> {
    Ok(conn
        .query_row(
            "SELECT id, date, item_name, category, amount, payer, is_settled FROM expenses WHERE id = ?1",
            [id],
            row_to_expense,
        )
        .optional()?)
}

/// Insert at the front of the list.
pub fn insert_expense(conn: &Connection, e: &Expense) -> Result<()> {
    let next: i64 = conn.query_row("SELECT COALESCE(MAX(position), 0) + 1 FROM expenses", [], |r| r.get(0))?;
    conn.execute(
        "INSERT INTO expenses (id, date, item_name, category, amount, payer, is_settled, position) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![e.id, e.date, e.item_name, e.category, e.amount, e.payer, e.is_settled, next],
    )?;
    Ok(())
}

pub fn set_settled(conn: &Connection, id: &str, is_settled: bool) -> Result<()> {
    let changed = conn.execute(
        "UPDATE expenses SET is_settled = ?1 WHERE id = ?2",
        params![is_settled, id],
    )?;
    if changed == 0 {
        return Err(KakeiboError::UnknownExpense(id.to_string()));
    }
    Ok(())
}

pub fn delete_expense(conn: &Connection, id: &str) -> Result<()> {
    let changed = conn.execute("DELETE FROM expenses WHERE id = ?1", [id])?;
    if changed == 0 {
        return Err(KakeiboError::UnknownExpense(id.to_string()));
    }
    Ok(())
}

/// Replace the whole cache with `expenses`, which are given newest first.
pub fn replace_expenses(conn: &mut Connection, expenses: &[Expense]) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM expenses", [])?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO expenses (id, date, item_name, category, amount, payer, is_settled, position) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        let count = expenses.len() as i64;
        for (i, e) in expenses.iter().enumerate() {
            stmt.execute(params![
                e.id,
                e.date,
                e.item_name,
                e.category,
                e.amount.clamp(0, MAX_AMOUNT),
                e.payer,
                e.is_settled,
                count - i as i64
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Outbox
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Add,
    Toggle,
    Delete,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Toggle => "toggle",
            Self::Delete => "delete",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "add" => Some(Self::Add),
            "toggle" => Some(Self::Toggle),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpStatus {
    Pending,
    Confirmed,
    Failed,
}

impl OpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }

    fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutboxOp {
    pub seq: i64,
    pub kind: OpKind,
    pub expense_id: String,
    /// JSON: the full expense for `add`, `{"isSettled": bool}` for `toggle`,
    /// `null` for `delete`.
    pub payload: String,
    pub status: OpStatus,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: String,
}

pub fn enqueue(conn: &Connection, kind: OpKind, expense_id: &str, payload: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO outbox (kind, expense_id, payload) VALUES (?1, ?2, ?3)",
        params![kind.as_str(), expense_id, payload],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn mark_confirmed(conn: &Connection, seq: i64) -> Result<()> {
    conn.execute(
        "UPDATE outbox SET status = 'confirmed', attempts = attempts + 1, last_error = NULL, \
         updated_at = datetime('now') WHERE seq = ?1",
        [seq],
    )?;
    Ok(())
}

pub fn mark_failed(conn: &Connection, seq: i64, error: &str) -> Result<()> {
    conn.execute(
        "UPDATE outbox SET status = 'failed', attempts = attempts + 1, last_error = ?2, \
         updated_at = datetime('now') WHERE seq = ?1",
        params![seq, error],
    )?;
    Ok(())
}

/// Operations not yet confirmed by the remote, oldest first.
pub fn unconfirmed_ops(conn: &Connection) -> Result<Vec<OutboxOp>> {
    query_ops(conn, "WHERE status != 'confirmed' ORDER BY seq ASC")
}

pub fn get_op(conn: &Connection, seq: i64) -> Result<Option<OutboxOp>> {
    Ok(query_ops(conn, &format!("WHERE seq = {seq}"))?.into_iter().next())
}

pub fn recent_ops(conn: &Connection, limit: i64) -> Result<Vec<OutboxOp>> {
    query_ops(conn, &format!("ORDER BY seq DESC LIMIT {limit}"))
}

fn query_ops(conn: &Connection, tail: &str) -> Result<Vec<OutboxOp>> {
    let sql = format!(
        "SELECT seq, kind, expense_id, payload, status, attempts, last_error, COALESCE(created_at, '') \
         FROM outbox {tail}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let raw: Vec<(i64, String, String, String, String, i64, Option<String>, String)> = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(raw
        .into_iter()
        .filter_map(|(seq, kind, expense_id, payload, status, attempts, last_error, created_at)| {
            Some(OutboxOp {
                seq,
                kind: OpKind::from_str_opt(&kind)?,
                expense_id,
                payload,
                status: OpStatus::from_str_opt(&status)?,
                attempts,
                last_error,
                created_at,
            })
        })
        .collect())
}

pub fn count_by_status(conn: &Connection, status: OpStatus) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT count(*) FROM outbox WHERE status = ?1",
        [status.as_str()],
        |r| r.get(0),
    )?)
}

pub fn prune_confirmed(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM outbox WHERE status = 'confirmed'", [])?)
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

pub fn get_metadata(conn: &Connection, key: &str) -> Option<String> {
    conn.query_row("SELECT value FROM metadata WHERE key = ?1", [key], |r| r.get(0))
        .ok()
}

pub fn set_metadata(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}
