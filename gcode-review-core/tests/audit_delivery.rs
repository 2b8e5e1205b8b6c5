//! Best-effort delivery through the bounded outbox.

use gcode_review_core::{
    AuditBatch, AuditEmitter, AuditMetadata, ContextRef, EditAction, EditRecord, EditTag,
    FlushOutcome, MemoryAuditStore,
};

fn batch(context: ContextRef, line: usize) -> AuditBatch {
    AuditBatch {
        context,
        records: vec![EditRecord {
            target: context,
            line_index: line,
            line_number: line + 1,
            action: EditAction::Edit,
            original_content: "G1 X0".into(),
            modified_content: Some(format!("G1 X{line}")),
            edited_at: 1_700_000_000_000,
            tag: EditTag::Edit,
        }],
        metadata: AuditMetadata { line_number: line + 1, line_index: line, note: None },
    }
}

fn lines(store: &MemoryAuditStore) -> Vec<usize> {
    store.records().iter().map(|r| r.line_index).collect()
}

#[tokio::test]
async fn drain_delivers_in_enqueue_order() {
    let store = MemoryAuditStore::new();
    let mut emitter = AuditEmitter::new(store.clone(), 8);
    for line in 0..3 {
        emitter.enqueue(batch(ContextRef::Patch(line), line));
    }
    assert_eq!(emitter.pending(), 3);
    assert_eq!(emitter.drain().await, 3);
    assert_eq!(emitter.pending(), 0);
    assert_eq!(lines(&store), [0, 1, 2]);
    assert_eq!(emitter.stats().delivered, 3);
}

#[tokio::test]
async fn failed_write_stays_at_the_front() {
    let store = MemoryAuditStore::new();
    let mut emitter = AuditEmitter::new(store.clone(), 8);
    emitter.enqueue(batch(ContextRef::Patch(0), 0));
    emitter.enqueue(batch(ContextRef::Patch(1), 1));

    store.fail_next(1);
    assert_eq!(emitter.drain().await, 0);
    assert_eq!(emitter.pending(), 2);
    assert_eq!(emitter.stats().failed, 1);

    assert_eq!(emitter.drain().await, 2);
    assert_eq!(lines(&store), [0, 1]);
}

#[tokio::test]
async fn overflow_drops_the_oldest_batch() {
    let store = MemoryAuditStore::new();
    let mut emitter = AuditEmitter::new(store.clone(), 2);
    for line in 0..3 {
        emitter.enqueue(batch(ContextRef::Patch(line), line));
    }
    assert_eq!(emitter.pending(), 2);
    assert_eq!(emitter.stats().dropped, 1);

    emitter.drain().await;
    assert_eq!(lines(&store), [1, 2]);
}

#[tokio::test]
async fn zero_capacity_still_holds_one_batch() {
    let store = MemoryAuditStore::new();
    let mut emitter = AuditEmitter::new(store, 0);
    emitter.enqueue(batch(ContextRef::Patch(0), 0));
    assert_eq!(emitter.pending(), 1);
}

#[tokio::test]
async fn flush_now_goes_after_queued_batches() {
    let store = MemoryAuditStore::new();
    let mut emitter = AuditEmitter::new(store.clone(), 8);
    emitter.enqueue(batch(ContextRef::Issue(0), 4));

    let outcome = emitter.flush_now(batch(ContextRef::Issue(0), 7)).await;
    assert_eq!(outcome, FlushOutcome::Delivered);
    assert_eq!(lines(&store), [4, 7]);
}

#[tokio::test]
async fn flush_now_queues_behind_an_undeliverable_batch() {
    let store = MemoryAuditStore::new();
    let mut emitter = AuditEmitter::new(store.clone(), 8);
    emitter.enqueue(batch(ContextRef::Issue(0), 4));

    store.fail_next(1);
    let outcome = emitter.flush_now(batch(ContextRef::Issue(0), 7)).await;
    assert_eq!(outcome, FlushOutcome::Queued);
    assert!(store.batches().is_empty());
    assert_eq!(emitter.pending(), 2);

    emitter.drain().await;
    assert_eq!(lines(&store), [4, 7]);
}

#[tokio::test]
async fn flush_now_failure_is_queued() {
    let store = MemoryAuditStore::new();
    let mut emitter = AuditEmitter::new(store.clone(), 8);

    store.fail_next(1);
    assert_eq!(
        emitter.flush_now(batch(ContextRef::Issue(2), 0)).await,
        FlushOutcome::Queued
    );
    assert_eq!(emitter.pending(), 1);
    assert_eq!(emitter.drain().await, 1);
    assert_eq!(store.batches()[0].context, ContextRef::Issue(2));
}
