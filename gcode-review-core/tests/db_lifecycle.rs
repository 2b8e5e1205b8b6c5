//! Integration test for the SQLite audit store.
//!
//! Exercises: open_db, migrate, detect_or_create_session, SqliteAuditStore,
//! load_edit_records, update_session_timestamp.

use gcode_review_core::db::{self, SqliteAuditStore};
use gcode_review_core::{
    Annotations, AuditBatch, AuditMetadata, AuditStore, ContextRef, EditAction, EditRecord,
    EditTag, EngineConfig, Patch, PatchAction, ReviewEngine,
};

fn temp_db_path() -> String {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.keep().join("test.db");
    path.to_string_lossy().to_string()
}

fn record(target: ContextRef, line: usize, tag: EditTag) -> EditRecord {
    EditRecord {
        target,
        line_index: line,
        line_number: line + 1,
        action: EditAction::Edit,
        original_content: "M104 S200".into(),
        modified_content: Some("M104 S210".into()),
        edited_at: 1_700_000_000_123,
        tag,
    }
}

#[tokio::test]
async fn full_session_lifecycle() {
    let path = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();

    // Verify schema_version = 1
    let version: i64 = conn
        .call(|db| -> rusqlite::Result<i64> {
            db.query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
        })
        .await
        .unwrap();
    assert_eq!(version, 1, "schema_version should be 1");

    // Verify WAL mode
    let journal: String = conn
        .call(|db| -> rusqlite::Result<String> {
            db.query_row("PRAGMA journal_mode", [], |r| r.get(0))
        })
        .await
        .unwrap();
    assert_eq!(journal, "wal", "journal_mode should be wal");

    // Verify review_sessions has a TEXT primary key
    let session_pk_type: String = conn
        .call(|db| -> rusqlite::Result<String> {
            db.query_row(
                "SELECT type FROM pragma_table_info('review_sessions') WHERE name = 'id'",
                [],
                |r| r.get(0),
            )
        })
        .await
        .unwrap();
    assert_eq!(session_pk_type, "TEXT", "review_sessions.id should be TEXT");

    // Create a session
    let session = db::detect_or_create_session(&conn, "/tmp/part.gcode", "/tmp/part.json")
        .await
        .unwrap();
    assert!(!session.id.is_empty(), "session ID should be non-empty UUID");
    assert_eq!(session.document_path, "/tmp/part.gcode");
    assert_eq!(session.report_path, "/tmp/part.json");

    // Resume same session
    let resumed = db::detect_or_create_session(&conn, "/tmp/part.gcode", "/tmp/part.json")
        .await
        .unwrap();
    assert_eq!(resumed.id, session.id, "should resume same session");

    // A different report creates a new session
    let other = db::detect_or_create_session(&conn, "/tmp/part.gcode", "")
        .await
        .unwrap();
    assert_ne!(other.id, session.id, "different report = new session");

    let count: i64 = conn
        .call(|db| -> rusqlite::Result<i64> {
            db.query_row("SELECT COUNT(*) FROM review_sessions", [], |r| r.get(0))
        })
        .await
        .unwrap();
    assert_eq!(count, 2, "should have 2 sessions");

    // No records yet
    let records = db::load_edit_records(&conn, &session.id).await.unwrap();
    assert!(records.is_empty());

    // Store two batches, one per namespace
    let store = SqliteAuditStore::new(conn.clone(), session.id.clone());
    store
        .save_edit_records(&AuditBatch {
            context: ContextRef::Issue(3),
            records: vec![
                record(ContextRef::Issue(3), 4, EditTag::Edit),
                record(ContextRef::Issue(3), 9, EditTag::Edit),
            ],
            metadata: AuditMetadata { line_number: 5, line_index: 4, note: Some("two".into()) },
        })
        .await
        .unwrap();
    store
        .save_edit_records(&AuditBatch {
            context: ContextRef::Patch(3),
            records: vec![record(ContextRef::Patch(3), 1, EditTag::PatchSuccess)],
            metadata: AuditMetadata { line_number: 2, line_index: 1, note: None },
        })
        .await
        .unwrap();

    let stored = db::load_edit_records(&conn, &session.id).await.unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[0].record, record(ContextRef::Issue(3), 4, EditTag::Edit));
    assert_eq!(stored[0].note.as_deref(), Some("two"));
    assert_eq!(stored[1].record.line_index, 9);
    assert_eq!(stored[2].record.target, ContextRef::Patch(3), "namespaces stay apart");
    assert_eq!(stored[2].record.tag, EditTag::PatchSuccess);
    assert!(db::load_edit_records(&conn, &other.id).await.unwrap().is_empty());

    db::update_session_timestamp(&conn, &session.id).await.unwrap();

    // Verify persistence: open a second connection to the same DB
    let conn2 = db::open_db(&path).await.unwrap();
    let stored2 = db::load_edit_records(&conn2, &session.id).await.unwrap();
    assert_eq!(stored2.len(), 3, "records should persist across connections");
}

#[tokio::test]
async fn migration_is_idempotent() {
    let path = temp_db_path();
    drop(db::open_db(&path).await.unwrap());
    let conn = db::open_db(&path).await.unwrap();

    let rows: i64 = conn
        .call(|db| -> rusqlite::Result<i64> {
            db.query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
        })
        .await
        .unwrap();
    assert_eq!(rows, 1, "v1 is recorded once");
}

#[tokio::test]
async fn check_constraints_reject_unknown_outcomes() {
    let path = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();
    let session = db::detect_or_create_session(&conn, "a.gcode", "").await.unwrap();

    let id = session.id.clone();
    let result = conn
        .call(move |db| -> rusqlite::Result<usize> {
            db.execute(
                "INSERT INTO edit_records
                     (session_id, context_kind, context_index, line_index, line_number,
                      action, outcome, original_content, edited_at)
                 VALUES (?1, 'issue', 0, 0, 1, 'edit', 'maybe', 'x', 0)",
                rusqlite::params![&id],
            )
        })
        .await;
    assert!(result.is_err(), "outcome CHECK should reject 'maybe'");
}

#[tokio::test]
async fn engine_writes_through_the_sqlite_store() {
    let path = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();
    let session = db::detect_or_create_session(&conn, "part.gcode", "part.json").await.unwrap();

    let annotations = Annotations {
        issues: vec![],
        patches: vec![Patch {
            id: "cooler".into(),
            action: PatchAction::Modify,
            line_ref: 1,
            original_text: "M104 S200".into(),
            proposed_text: Some("M104 S210".into()),
            reason: "PLA".into(),
        }],
    };
    let mut engine = ReviewEngine::new(
        "G1 X1\nM104 S200\nG1 X2\n",
        annotations,
        SqliteAuditStore::new(conn.clone(), session.id.clone()),
        EngineConfig::default(),
    );

    engine.edit_line(1, "M104 S210".into()).unwrap();
    assert_eq!(engine.close().await, 0);

    let stored = db::load_edit_records(&conn, &session.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    let record = &stored[0].record;
    assert_eq!(record.target, ContextRef::Patch(0));
    assert_eq!(record.tag, EditTag::PatchSuccess);
    assert_eq!(record.original_content, "M104 S200");
    assert_eq!(record.modified_content.as_deref(), Some("M104 S210"));
    assert_eq!(stored[0].note.as_deref(), Some("patch cooler: patch_success"));
}
