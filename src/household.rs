//! The application shell: owns the working set of expenses, keeps the local
//! cache in step with it, and mirrors every mutation to the remote store on a
//! best-effort basis through the outbox.

use std::collections::HashSet;
use std::fmt;

use rusqlite::Connection;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::{self, OpKind, OpStatus};
use crate::error::{KakeiboError, Result};
use crate::models::{parse_amount, parse_date, Expense, ExpenseDraft, DATE_FORMAT};
use crate::remote::{self, RemoteStore};
use crate::sample::sample_expenses;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Remote,
    Cache,
    Fallback,
}

impl fmt::Display for LoadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote => write!(f, "remote"),
            Self::Cache => write!(f, "local cache"),
            Self::Fallback => write!(f, "sample data"),
        }
    }
}

/// What happened to the remote mirror of a local mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Synced,
    /// No remote configured (or offline); queued for a later `sync`.
    LocalOnly,
    /// The remote call failed; queued for a later `sync`.
    Failed(String),
    /// Applied to the sample data only; nothing stored.
    Preview,
}

#[derive(Debug, Clone)]
pub struct Mutation {
    pub expense: Expense,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub confirmed: usize,
    pub failed: usize,
    /// Not attempted: queued behind a failed operation for the same expense,
    /// or left over after the remote became unreachable.
    pub waiting: usize,
    /// The flush stopped early because the remote could not be reached.
    pub unreachable: bool,
    pub last_error: Option<String>,
}

pub struct Household {
    conn: Connection,
    remote: Option<Box<dyn RemoteStore>>,
    payers: [String; 2],
    default_category: String,
    expenses: Vec<Expense>,
    source: LoadSource,
}

impl Household {
    pub fn new(
        conn: Connection,
        remote: Option<Box<dyn RemoteStore>>,
        payers: [String; 2],
        default_category: &str,
    ) -> Self {
        Self {
            conn,
            remote,
            payers,
            default_category: default_category.to_string(),
            expenses: Vec::new(),
            source: LoadSource::Cache,
        }
    }

    /// Open the local cache, connect to the configured remote, and load.
    pub fn open(settings: &Settings, offline: bool) -> Result<Self> {
        let conn = db::get_connection(&settings.db_path())?;
        let remote = remote::connect(settings, offline);
        let mut household = Self::new(conn, remote, settings.payers.clone(), settings.default_category());
        household.load()?;
        Ok(household)
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn source(&self) -> LoadSource {
        self.source
    }

    pub fn payers(&self) -> &[String; 2] {
        &self.payers
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn unconfirmed_count(&self) -> Result<i64> {
        Ok(db::count_by_status(&self.conn, OpStatus::Pending)?
            + db::count_by_status(&self.conn, OpStatus::Failed)?)
    }

    /// Records whose date does not parse as `YYYY/MM/DD`.
    pub fn malformed(&self) -> Vec<&Expense> {
        self.expenses.iter().filter(|e| !e.has_valid_date()).collect()
    }

    // -----------------------------------------------------------------------
    // Load
    // -----------------------------------------------------------------------

    pub fn load(&mut self) -> Result<LoadSource> {
        if self.remote.is_some() {
            let reachable = match self.sync() {
                Ok(report) => !report.unreachable,
                Err(e) => {
                    warn!(error = %e, "could not flush outbox before load");
                    true
                }
            };
            if reachable {
                match self.fetch_remote() {
                    Ok(true) => {
                        self.expenses = db::list_expenses(&self.conn)?;
                        self.source = LoadSource::Remote;
                        info!(count = self.expenses.len(), "loaded expenses from remote");
                        return Ok(self.source);
                    }
                    Ok(false) => warn!("remote returned no expenses; using local data"),
                    Err(e) => warn!(error = %e, "remote fetch failed; using local data"),
                }
            } else {
                warn!("remote unreachable; skipping fetch and using local data");
            }
        }

        let cached = db::list_expenses(&self.conn)?;
        if cached.is_empty() {
            self.expenses = sample_expenses(&self.payers);
            self.source = LoadSource::Fallback;
            info!("no stored expenses; showing sample data");
        } else {
            self.expenses = cached;
            self.source = LoadSource::Cache;
            info!(count = self.expenses.len(), "loaded expenses from local cache");
        }
        Ok(self.source)
    }

    /// Replace the cache with the remote copy and re-apply anything the remote
    /// has not confirmed yet. Returns false when the remote had nothing.
    fn fetch_remote(&mut self) -> Result<bool> {
        let Some(remote) = self.remote.as_ref() else {
            return Err(KakeiboError::NotConfigured);
        };
        let fetched = remote.fetch_expenses()?;
        if fetched.is_empty() {
            return Ok(false);
        }
        for e in fetched.iter().filter(|e| !e.has_valid_date()) {
            warn!(id = %e.id, date = %e.date, "remote expense has a malformed date");
        }
        db::replace_expenses(&mut self.conn, &fetched)?;
        self.reapply_unconfirmed()?;
        db::set_metadata(&self.conn, "last_fetch", &chrono::Local::now().to_rfc3339())?;
        Ok(true)
    }

    fn reapply_unconfirmed(&self) -> Result<()> {
        for op in db::unconfirmed_ops(&self.conn)? {
            let applied = match op.kind {
                OpKind::Add => {
                    let expense: Expense = serde_json::from_str(&op.payload)?;
                    if db::get_expense(&self.conn, &expense.id)?.is_none() {
                        db::insert_expense(&self.conn, &expense)
                    } else {
                        Ok(())
                    }
                }
                OpKind::Toggle => {
                    let is_settled = toggle_payload(&op.payload)?;
                    db::set_settled(&self.conn, &op.expense_id, is_settled)
                }
                OpKind::Delete => db::delete_expense(&self.conn, &op.expense_id),
            };
            match applied {
                Ok(()) | Err(KakeiboError::UnknownExpense(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Sync
    // -----------------------------------------------------------------------

    /// Push every unconfirmed operation in sequence order.
    ///
    /// A rejected operation holds back every later operation for the same
    /// expense so the remote never sees them out of order. A transport error
    /// stops the flush outright.
    pub fn sync(&self) -> Result<SyncReport> {
        let Some(remote) = self.remote.as_ref() else {
            return Err(KakeiboError::NotConfigured);
        };
        let ops = db::unconfirmed_ops(&self.conn)?;
        let mut report = SyncReport::default();
        let mut blocked: HashSet<String> = HashSet::new();

        for (i, op) in ops.iter().enumerate() {
            if blocked.contains(&op.expense_id) {
                report.waiting += 1;
                continue;
            }
            match push(remote.as_ref(), op.kind, &op.expense_id, &op.payload) {
                Ok(()) => {
                    db::mark_confirmed(&self.conn, op.seq)?;
                    report.confirmed += 1;
                }
                Err(e) => {
                    warn!(seq = op.seq, kind = op.kind.as_str(), error = %e, "sync failed");
                    db::mark_failed(&self.conn, op.seq, &e.to_string())?;
                    report.failed += 1;
                    report.last_error = Some(e.to_string());
                    if matches!(e, KakeiboError::Transport(_)) {
                        report.unreachable = true;
                        report.waiting += ops.len() - i - 1;
                        break;
                    }
                    blocked.insert(op.expense_id.clone());
                }
            }
        }
        if report.failed == 0 && report.waiting == 0 {
            db::set_metadata(&self.conn, "last_sync", &chrono::Local::now().to_rfc3339())?;
        }
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Validate a draft into a new expense with a fresh id.
    pub fn build_expense(&self, draft: ExpenseDraft) -> Result<Expense> {
        let item_name = draft.item_name.trim().to_string();
        if item_name.is_empty() {
            return Err(KakeiboError::invalid("item name", "item name is required"));
        }
        let amount = parse_amount(&draft.amount)?;
        let date = match draft.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(raw) => parse_date(raw)?,
            None => chrono::Local::now().date_naive(),
        };
        let payer = draft.payer.trim().to_string();
        if !self.payers.contains(&payer) {
            return Err(KakeiboError::invalid(
                "payer",
                format!("'{payer}' is not one of {} / {}", self.payers[0], self.payers[1]),
            ));
        }
        let category = draft
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| self.default_category.clone());

        Ok(Expense {
            id: Uuid::new_v4().to_string(),
            date: date.format(DATE_FORMAT).to_string(),
            item_name,
            category,
            amount,
            payer,
            is_settled: draft.is_settled,
        })
    }

    pub fn add(&mut self, draft: ExpenseDraft) -> Result<Mutation> {
        let expense = self.build_expense(draft)?;
        if self.source == LoadSource::Fallback {
            self.expenses.clear();
            self.source = LoadSource::Cache;
        }
        db::insert_expense(&self.conn, &expense)?;
        self.expenses.insert(0, expense.clone());

        let payload = serde_json::to_string(&expense)?;
        let outcome = self.mirror(OpKind::Add, &expense.id, &payload)?;
        Ok(Mutation { expense, outcome })
    }

    pub fn set_settled(&mut self, id_or_prefix: &str, is_settled: bool) -> Result<Mutation> {
        let idx = self.position(id_or_prefix)?;
        self.expenses[idx].is_settled = is_settled;
        let expense = self.expenses[idx].clone();
        if self.source == LoadSource::Fallback {
            return Ok(Mutation { expense, outcome: Outcome::Preview });
        }
        db::set_settled(&self.conn, &expense.id, is_settled)?;
        let payload = serde_json::json!({ "isSettled": is_settled }).to_string();
        let outcome = self.mirror(OpKind::Toggle, &expense.id, &payload)?;
        Ok(Mutation { expense, outcome })
    }

    pub fn toggle(&mut self, id_or_prefix: &str) -> Result<Mutation> {
        let idx = self.position(id_or_prefix)?;
        let next = !self.expenses[idx].is_settled;
        let id = self.expenses[idx].id.clone();
        self.set_settled(&id, next)
    }

    pub fn delete(&mut self, id_or_prefix: &str) -> Result<Mutation> {
        let idx = self.position(id_or_prefix)?;
        let expense = self.expenses.remove(idx);
        if self.source == LoadSource::Fallback {
            return Ok(Mutation { expense, outcome: Outcome::Preview });
        }
        db::delete_expense(&self.conn, &expense.id)?;
        let outcome = self.mirror(OpKind::Delete, &expense.id, "null")?;
        Ok(Mutation { expense, outcome })
    }

    /// Look up by full id or a unique prefix of at least four characters.
    pub fn find(&self, id_or_prefix: &str) -> Result<&Expense> {
        Ok(&self.expenses[self.position(id_or_prefix)?])
    }

    fn position(&self, id_or_prefix: &str) -> Result<usize> {
        let needle = id_or_prefix.trim();
        if let Some(idx) = self.expenses.iter().position(|e| e.id == needle) {
            return Ok(idx);
        }
        if needle.chars().count() < 4 {
            return Err(KakeiboError::UnknownExpense(needle.to_string()));
        }
        let matches: Vec<usize> = self
            .expenses
            .iter()
            .enumerate()
            .filter(|(_, e)| e.id.starts_with(needle))
            .map(|(i, _)| i)
            .collect();
        match matches.as_slice() {
            [] => Err(KakeiboError::UnknownExpense(needle.to_string())),
            [idx] => Ok(*idx),
            many => Err(KakeiboError::AmbiguousId(needle.to_string(), many.len())),
        }
    }

    /// Record the operation, then flush the outbox so that anything queued
    /// before it reaches the remote first.
    fn mirror(&self, kind: OpKind, expense_id: &str, payload: &str) -> Result<Outcome> {
        let seq = db::enqueue(&self.conn, kind, expense_id, payload)?;
        if self.remote.is_none() {
            debug!(seq, kind = kind.as_str(), "no remote; operation queued");
            return Ok(Outcome::LocalOnly);
        }
        let report = self.sync()?;
        let op = db::get_op(&self.conn, seq)?;
        Ok(match op.map(|op| (op.status, op.last_error)) {
            None | Some((OpStatus::Confirmed, _)) => Outcome::Synced,
            Some((OpStatus::Failed, err)) => Outcome::Failed(
                err.or(report.last_error)
                    .unwrap_or_else(|| "remote update failed".to_string()),
            ),
            Some((OpStatus::Pending, _)) => Outcome::Failed(format!(
                "queued behind an earlier change ({})",
                report.last_error.as_deref().unwrap_or("not yet sent")
            )),
        })
    }
}

fn toggle_payload(payload: &str) -> Result<bool> {
    let value: serde_json::Value = serde_json::from_str(payload)?;
    value
        .get("isSettled")
        .and_then(serde_json::Value::as_bool)
        .ok_or_else(|| KakeiboError::Other(format!("bad toggle payload: {payload}")))
}

fn push(remote: &dyn RemoteStore, kind: OpKind, expense_id: &str, payload: &str) -> Result<()> {
    match kind {
        OpKind::Add => {
            let expense: Expense = serde_json::from_str(payload)?;
            if let Some(echo) = remote.add_expense(&expense)? {
                debug!(id = %echo.id, "remote stored expense");
            }
            Ok(())
        }
        OpKind::Toggle => remote.toggle_settled(expense_id, toggle_payload(payload)?),
        OpKind::Delete => remote.delete_expense(expense_id),
    }
}
