use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::OptionalExtension;
use rusqlite::types::{FromSqlError, Type};
use tokio_rusqlite::Connection;

use crate::audit::AuditStore;
use crate::error::AuditError;
use crate::types::{AuditBatch, ContextRef, EditAction, EditRecord, EditTag, ReviewSession};

/// Opens (or creates) the SQLite database at `path`, configures WAL mode,
/// and applies schema migrations via the `schema_version` table.
///
/// This function is the single entry point for all database connections.
/// It sets `busy_timeout` via the `Connection` method (not a PRAGMA string) so the
/// setting takes effect regardless of pragma caching.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the file cannot be opened, WAL configuration
/// fails, or schema DDL fails.
pub async fn open_db(path: &str) -> Result<Connection, tokio_rusqlite::Error> {
    let conn = Connection::open(path).await?;

    // Step 1: WAL pragmas, re-applied on every open.
    conn.call(|db| -> rusqlite::Result<()> {
        db.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;
        db.busy_timeout(Duration::from_secs(5))?;
        Ok(())
    })
    .await?;

    // Step 2: Checkpoint any leftover WAL from a previous run.
    conn.call(|db| -> rusqlite::Result<()> {
        db.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
    })
    .await?;

    // Step 3: Forward-only migrations.
    conn.call(|db| -> rusqlite::Result<()> { crate::schema::migrate(db) })
        .await?;

    tracing::debug!(path, "audit database opened");
    Ok(conn)
}

/// Returns the current Unix timestamp in seconds.
fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Finds the most recent session for `document_path + report_path`, or creates one.
///
/// On resume: updates `updated_at` to the current time via `BEGIN IMMEDIATE`.
/// On create: generates a new UUID v4 and inserts the session via `BEGIN IMMEDIATE`.
///
/// Call this before the first event-loop frame so edits made in the first frame
/// already have a session to be filed under.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the query or write transaction fails.
pub async fn detect_or_create_session(
    conn: &Connection,
    document_path: &str,
    report_path: &str,
) -> Result<ReviewSession, tokio_rusqlite::Error> {
    let document_path = document_path.to_owned();
    let report_path = report_path.to_owned();

    conn.call(move |db| -> rusqlite::Result<ReviewSession> {
        let existing: Option<ReviewSession> = db
            .query_row(
                "SELECT id, document_path, report_path, created_at, updated_at
                 FROM review_sessions
                 WHERE document_path = ?1 AND report_path = ?2
                 ORDER BY updated_at DESC
                 LIMIT 1",
                rusqlite::params![&document_path, &report_path],
                |r| {
                    Ok(ReviewSession {
                        id: r.get(0)?,
                        document_path: r.get(1)?,
                        report_path: r.get(2)?,
                        created_at: r.get(3)?,
                        updated_at: r.get(4)?,
                    })
                },
            )
            .optional()?;

        let now = now_secs();
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let session = match existing {
            Some(mut session) => {
                tx.execute(
                    "UPDATE review_sessions SET updated_at = ?1 WHERE id = ?2",
                    rusqlite::params![now, &session.id],
                )?;
                session.updated_at = now;
                tracing::info!(session = %session.id, "resumed review session");
                session
            }
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                tx.execute(
                    "INSERT INTO review_sessions
                         (id, document_path, report_path, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?4)",
                    rusqlite::params![&id, &document_path, &report_path, now],
                )?;
                tracing::info!(session = %id, "created review session");
                ReviewSession {
                    id,
                    document_path,
                    report_path,
                    created_at: now,
                    updated_at: now,
                }
            }
        };
        tx.commit()?;
        Ok(session)
    })
    .await
}

/// Updates the `updated_at` timestamp for `session_id` to the current time.
///
/// Called on quit so `detect_or_create_session` resumes the most recently used session.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the `BEGIN IMMEDIATE` transaction fails.
pub async fn update_session_timestamp(
    conn: &Connection,
    session_id: &str,
) -> Result<(), tokio_rusqlite::Error> {
    let session_id = session_id.to_owned();

    conn.call(move |db| -> rusqlite::Result<()> {
        let now = now_secs();
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute(
            "UPDATE review_sessions SET updated_at = ?1 WHERE id = ?2",
            rusqlite::params![now, &session_id],
        )?;
        tx.commit()
    })
    .await
}

/// An edit record as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEdit {
    pub record: EditRecord,
    pub note: Option<String>,
}

/// Loads every edit record of `session_id` in insertion order.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the query fails or a row holds a value the
/// schema CHECK constraints should have rejected.
pub async fn load_edit_records(
    conn: &Connection,
    session_id: &str,
) -> Result<Vec<StoredEdit>, tokio_rusqlite::Error> {
    let session_id = session_id.to_owned();

    conn.call(move |db| -> rusqlite::Result<Vec<StoredEdit>> {
        let mut stmt = db.prepare(
            "SELECT context_kind, context_index, line_index, line_number, action, outcome,
                    original_content, modified_content, note, edited_at
             FROM edit_records
             WHERE session_id = ?1
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![&session_id], |r| {
                let kind: String = r.get(0)?;
                let index: i64 = r.get(1)?;
                let target = match kind.as_str() {
                    "issue" => ContextRef::Issue(index as usize),
                    "patch" => ContextRef::Patch(index as usize),
                    _ => return Err(invalid_text(0)),
                };
                let action = match r.get::<_, String>(4)?.as_str() {
                    "edit" => EditAction::Edit,
                    "delete" => EditAction::Delete,
                    _ => return Err(invalid_text(4)),
                };
                let tag = match r.get::<_, String>(5)?.as_str() {
                    "edit" => EditTag::Edit,
                    "delete" => EditTag::Delete,
                    "patch_success" => EditTag::PatchSuccess,
                    "matching_failed" => EditTag::MatchingFailed,
                    _ => return Err(invalid_text(5)),
                };
                Ok(StoredEdit {
                    record: EditRecord {
                        target,
                        line_index: r.get::<_, i64>(2)? as usize,
                        line_number: r.get::<_, i64>(3)? as usize,
                        action,
                        original_content: r.get(6)?,
                        modified_content: r.get(7)?,
                        edited_at: r.get(9)?,
                        tag,
                    },
                    note: r.get(8)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    })
    .await
}

fn invalid_text(column: usize) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(FromSqlError::InvalidType))
}

/// [`AuditStore`] backed by the `edit_records` table of one review session.
///
/// Each batch is written in its own `BEGIN IMMEDIATE` transaction, so a batch is
/// durable all-or-nothing.
#[derive(Debug, Clone)]
pub struct SqliteAuditStore {
    conn: Connection,
    session_id: String,
}

impl SqliteAuditStore {
    pub fn new(conn: Connection, session_id: impl Into<String>) -> Self {
        Self { conn, session_id: session_id.into() }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl AuditStore for SqliteAuditStore {
    async fn save_edit_records(&self, batch: &AuditBatch) -> Result<(), AuditError> {
        let session_id = self.session_id.clone();
        let context = batch.context;
        let records = batch.records.len();
        let batch = batch.clone();

        self.conn
            .call(move |db| -> rusqlite::Result<()> {
                let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO edit_records
                             (session_id, context_kind, context_index, line_index, line_number,
                              action, outcome, original_content, modified_content, note, edited_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    )?;
                    for record in &batch.records {
                        stmt.execute(rusqlite::params![
                            &session_id,
                            record.target.kind(),
                            record.target.index() as i64,
                            record.line_index as i64,
                            record.line_number as i64,
                            record.action.as_str(),
                            record.tag.as_str(),
                            &record.original_content,
                            &record.modified_content,
                            &batch.metadata.note,
                            record.edited_at,
                        ])?;
                    }
                }
                tx.commit()
            })
            .await?;

        tracing::debug!(%context, records, "audit batch stored");
        Ok(())
    }
}
