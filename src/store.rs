//! Analysis store: SQLite persistence for components, per-line content
//! hashes and issues, read through session-scoped connections (one
//! connection opened, used and dropped per call, never held across
//! components).

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::component::Component;
use crate::config::StoreConfig;
use crate::issue::{Issue, IssueChange, IssueStatus};

/// Hard failures of the underlying store. Absence of data is never an error:
/// missing rows surface as `None` / empty on the read APIs.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open analysis db at {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },
    #[error("analysis db query failed: {0}")]
    Query(#[from] rusqlite::Error),
    #[error("corrupt row in analysis db: {0}")]
    Corrupt(String),
}

/// Read side of the analysis store, as consumed by the tracking engine.
///
/// `Sync` because one store instance is shared by every component's input
/// across the parallel pass.
pub trait SourceStore: Sync {
    /// Ordered per-line hashes recorded for a component version, or `None`
    /// when no source has been recorded for it.
    fn line_hashes(&self, component_uuid: &str) -> Result<Option<Vec<String>>, StoreError>;

    /// All issues attached to a component version, with their change
    /// history, ordered by issue key.
    fn issues(&self, component_uuid: &str) -> Result<Vec<Issue>, StoreError>;

    /// `(key, uuid)` of every component on a branch, for index building.
    fn components_of_branch(&self, branch_uuid: &str)
        -> Result<Vec<(String, String)>, StoreError>;
}

// ── Path helpers ────────────────────────────────────────────────────────────

/// Resolve the analysis db location.
/// Priority: explicit config path > SCANTRACK_DB_PATH env var > default.
pub fn analysis_db_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(p) = std::env::var("SCANTRACK_DB_PATH") {
        return PathBuf::from(p);
    }
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("scantrack")
        .join("analysis.db")
}

// ── SQLite backend ──────────────────────────────────────────────────────────

/// WAL-mode SQLite implementation of the analysis store.
///
/// Connections are opened per call; the schema is created idempotently on
/// `open`. Writes retry on transient `SQLITE_BUSY` since several analysis
/// workers may share one db file.
pub struct SqliteStore {
    db_path: PathBuf,
    busy_timeout_ms: u64,
    retry_attempts: u32,
}

impl SqliteStore {
    /// Open (or create) the analysis db described by `config` and initialise
    /// the schema.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let db_path = analysis_db_path(config.database_path.as_deref());
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create analysis db directory {}", parent.display())
            })?;
        }
        let store = Self {
            db_path,
            busy_timeout_ms: config.busy_timeout_ms,
            retry_attempts: config.retry_attempts,
        };
        let conn = store
            .connect()
            .context("Failed to open analysis db for schema init")?;
        init_schema(&conn).context("Failed to initialise analysis db schema")?;
        Ok(store)
    }

    /// Open a store at an explicit path with default tuning. Test convenience.
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self> {
        let config = StoreConfig {
            database_path: Some(path.into()),
            ..StoreConfig::default()
        };
        Self::open(&config)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.db_path).map_err(|source| StoreError::Open {
            path: self.db_path.clone(),
            source,
        })?;
        configure_connection(&conn, self.busy_timeout_ms)?;
        Ok(conn)
    }

    // ── Write side: recording an analysis ───────────────────────────────

    /// Upsert one component row under `branch_uuid`.
    pub fn save_component(&self, branch_uuid: &str, component: &Component) -> Result<()> {
        self.with_retry(|| {
            let conn = self.connect()?;
            conn.execute(
                "INSERT OR REPLACE INTO components (uuid, branch_uuid, kee, path, kind)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    component.uuid,
                    branch_uuid,
                    component.key,
                    component.path,
                    component.kind.as_str()
                ],
            )
            .context("Failed to upsert component")?;
            Ok(())
        })
    }

    /// Record the per-line hashes of one file version. Stored newline-joined
    /// in a single row, one row per component.
    pub fn save_line_hashes(&self, component_uuid: &str, hashes: &[String]) -> Result<()> {
        self.with_retry(|| {
            let conn = self.connect()?;
            let joined = hashes.join("\n");
            conn.execute(
                "INSERT OR REPLACE INTO file_line_hashes (component_uuid, hashes, updated_at)
                 VALUES (?1, ?2, ?3)",
                params![component_uuid, joined, Utc::now().timestamp_millis()],
            )
            .context("Failed to upsert line hashes")?;
            Ok(())
        })
    }

    /// Upsert one issue and replace its recorded change history.
    pub fn save_issue(&self, issue: &Issue) -> Result<()> {
        self.with_retry(|| {
            let conn = self.connect()?;
            conn.execute(
                "INSERT OR REPLACE INTO issues
                     (kee, rule, component_uuid, line, checksum, status, message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    issue.key,
                    issue.rule,
                    issue.component_uuid,
                    issue.line,
                    issue.checksum,
                    issue.status.as_str(),
                    issue.message,
                    issue.created_at.timestamp_millis()
                ],
            )
            .context("Failed to upsert issue")?;
            conn.execute(
                "DELETE FROM issue_changes WHERE issue_key = ?1",
                params![issue.key],
            )
            .context("Failed to clear issue changes")?;
            for change in &issue.changes {
                let payload = serde_json::to_string(&change.change_data)
                    .context("Failed to serialise issue change payload")?;
                conn.execute(
                    "INSERT INTO issue_changes (issue_key, change_data, created_at)
                     VALUES (?1, ?2, ?3)",
                    params![issue.key, payload, change.created_at.timestamp_millis()],
                )
                .context("Failed to insert issue change")?;
            }
            Ok(())
        })
    }

    /// Retry wrapper for writes that may fail with SQLITE_BUSY when several
    /// workers share the db file. Exponential backoff (100ms, 200ms, 400ms).
    fn with_retry<T, F: Fn() -> Result<T>>(&self, op: F) -> Result<T> {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(val) => return Ok(val),
                Err(e) => {
                    let is_busy = e
                        .chain()
                        .any(|cause| cause.to_string().contains("database is locked"));
                    if !is_busy || attempt >= self.retry_attempts {
                        return Err(e);
                    }
                    attempt += 1;
                    let backoff_ms = 100 * (1u64 << (attempt - 1));
                    std::thread::sleep(std::time::Duration::from_millis(backoff_ms));
                }
            }
        }
    }
}

impl SourceStore for SqliteStore {
    fn line_hashes(&self, component_uuid: &str) -> Result<Option<Vec<String>>, StoreError> {
        let conn = self.connect()?;
        let row: Option<String> = conn
            .query_row(
                "SELECT hashes FROM file_line_hashes WHERE component_uuid = ?1",
                params![component_uuid],
                |row| row.get(0),
            )
            .optional()?;
        Ok(row.map(|text| split_hashes(&text)))
    }

    fn issues(&self, component_uuid: &str) -> Result<Vec<Issue>, StoreError> {
        let conn = self.connect()?;

        let mut stmt = conn.prepare(
            "SELECT kee, rule, component_uuid, line, checksum, status, message, created_at
             FROM issues WHERE component_uuid = ?1 ORDER BY kee",
        )?;
        let rows = stmt
            .query_map(params![component_uuid], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<u32>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, i64>(7)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut changes = self.changes_for_component(&conn, component_uuid)?;

        let mut issues = Vec::with_capacity(rows.len());
        for (key, rule, component_uuid, line, checksum, status, message, created_at) in rows {
            let status = IssueStatus::parse(&status)
                .ok_or_else(|| StoreError::Corrupt(format!("unknown issue status {status:?}")))?;
            let issue_changes = changes.remove(&key).unwrap_or_default();
            issues.push(Issue {
                key,
                rule,
                component_uuid,
                line,
                checksum,
                status,
                message,
                created_at: datetime_from_millis(created_at)?,
                changes: issue_changes,
            });
        }
        Ok(issues)
    }

    fn components_of_branch(
        &self,
        branch_uuid: &str,
    ) -> Result<Vec<(String, String)>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("SELECT kee, uuid FROM components WHERE branch_uuid = ?1 ORDER BY kee")?;
        let pairs = stmt
            .query_map(params![branch_uuid], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(pairs)
    }
}

impl SqliteStore {
    /// Change history of every issue on a component, keyed by issue, in
    /// recorded order.
    fn changes_for_component(
        &self,
        conn: &Connection,
        component_uuid: &str,
    ) -> Result<HashMap<String, Vec<IssueChange>>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT c.issue_key, c.change_data, c.created_at
             FROM issue_changes c
             JOIN issues i ON i.kee = c.issue_key
             WHERE i.component_uuid = ?1
             ORDER BY c.id",
        )?;
        let rows = stmt
            .query_map(params![component_uuid], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut by_issue: HashMap<String, Vec<IssueChange>> = HashMap::new();
        for (issue_key, payload, created_at) in rows {
            let change_data = serde_json::from_str(&payload).map_err(|e| {
                StoreError::Corrupt(format!("bad change payload for issue {issue_key}: {e}"))
            })?;
            by_issue.entry(issue_key.clone()).or_default().push(IssueChange {
                issue_key,
                change_data,
                created_at: datetime_from_millis(created_at)?,
            });
        }
        Ok(by_issue)
    }
}

// ── SQLite helpers ──────────────────────────────────────────────────────────

fn configure_connection(conn: &Connection, busy_timeout_ms: u64) -> Result<(), StoreError> {
    conn.execute_batch(&format!(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;
         PRAGMA busy_timeout={busy_timeout_ms};"
    ))?;
    Ok(())
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS components (
            uuid        TEXT PRIMARY KEY,
            branch_uuid TEXT NOT NULL,
            kee         TEXT NOT NULL,
            path        TEXT,
            kind        TEXT NOT NULL,
            UNIQUE(branch_uuid, kee)
         );
         CREATE TABLE IF NOT EXISTS file_line_hashes (
            component_uuid TEXT    PRIMARY KEY,
            hashes         TEXT    NOT NULL,
            updated_at     INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS issues (
            kee            TEXT    PRIMARY KEY,
            rule           TEXT    NOT NULL,
            component_uuid TEXT    NOT NULL,
            line           INTEGER,
            checksum       TEXT,
            status         TEXT    NOT NULL,
            message        TEXT    NOT NULL,
            created_at     INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS issue_changes (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            issue_key   TEXT    NOT NULL,
            change_data TEXT    NOT NULL,
            created_at  INTEGER NOT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_issues_component
             ON issues(component_uuid);
         CREATE INDEX IF NOT EXISTS idx_issue_changes_issue
             ON issue_changes(issue_key);",
    )?;
    Ok(())
}

/// Inverse of the newline-join in `save_line_hashes`. An empty row means an
/// empty file (zero lines), not absence; absence is no row at all.
fn split_hashes(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n').map(str::to_string).collect()
}

fn datetime_from_millis(millis: i64) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| StoreError::Corrupt(format!("bad timestamp {millis}")))
}
