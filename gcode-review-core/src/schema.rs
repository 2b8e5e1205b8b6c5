/// DDL to create the schema_version tracking table.
///
/// Applied unconditionally on every DB open (before checking the version),
/// using `IF NOT EXISTS` so it is safe to run multiple times.
pub const SCHEMA_VERSION_DDL: &str = "
    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER NOT NULL
    ) STRICT;
";

/// DDL for the v1 schema.
///
/// - `review_sessions`: one row per reviewed document and report pair, keyed by UUID v4 text.
/// - `edit_records`: append-only audit trail. `context_kind` and `context_index` carry the
///   issue/patch namespace split; `outcome` is the classification tag.
///
/// All tables use `STRICT` mode. Removing a session cascades to its records.
pub const SCHEMA_V1_SQL: &str = "
    CREATE TABLE IF NOT EXISTS review_sessions (
        id            TEXT    PRIMARY KEY,
        document_path TEXT    NOT NULL,
        report_path   TEXT    NOT NULL DEFAULT '',
        created_at    INTEGER NOT NULL,
        updated_at    INTEGER NOT NULL
    ) STRICT;

    CREATE TABLE IF NOT EXISTS edit_records (
        id               INTEGER PRIMARY KEY,
        session_id       TEXT    NOT NULL REFERENCES review_sessions(id) ON DELETE CASCADE,
        context_kind     TEXT    NOT NULL CHECK(context_kind IN ('issue', 'patch')),
        context_index    INTEGER NOT NULL CHECK(context_index >= 0),
        line_index       INTEGER NOT NULL,
        line_number      INTEGER NOT NULL,
        action           TEXT    NOT NULL CHECK(action IN ('edit', 'delete')),
        outcome          TEXT    NOT NULL
                                 CHECK(outcome IN
                                       ('edit', 'delete', 'patch_success', 'matching_failed')),
        original_content TEXT    NOT NULL,
        modified_content TEXT,
        note             TEXT,
        edited_at        INTEGER NOT NULL
    ) STRICT;

    CREATE INDEX IF NOT EXISTS edit_records_by_context
        ON edit_records (session_id, context_kind, context_index);
";

/// Runs forward-only schema migration to the latest version.
///
/// Idempotent: safe to call on every startup.
///
/// 1. Creates the `schema_version` table if it does not exist.
/// 2. Reads the current version (`0` if the table is empty).
/// 3. Below 1, applies `SCHEMA_V1_SQL` inside a `BEGIN IMMEDIATE` transaction and
///    records `version = 1`.
///
/// # Errors
///
/// Returns `rusqlite::Error` if the DDL fails or the version row cannot be read.
pub fn migrate(db: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    db.execute_batch(SCHEMA_VERSION_DDL)?;

    let version: i64 = db.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute_batch(SCHEMA_V1_SQL)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
        tx.commit()?;
        tracing::info!("database migrated to schema v1");
    }

    Ok(())
}
