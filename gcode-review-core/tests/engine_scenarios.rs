//! Edit, delete, apply and revert flows through `ReviewEngine`.

use std::collections::BTreeSet;

use gcode_review_core::annotations::PatchState;
use gcode_review_core::{
    Annotations, ContextRef, EditAction, EditOutcome, EditTag, EngineConfig, EngineError, Issue,
    MemoryAuditStore, Patch, PatchAction, ReviewEngine, Severity,
};

const SAMPLE: &str = "G1 X1\nM104 S200\nG1 X2\n";

fn patch(action: PatchAction, line: usize, original: &str, proposed: Option<&str>) -> Patch {
    Patch {
        id: format!("p{line}"),
        action,
        line_ref: line,
        original_text: original.to_owned(),
        proposed_text: proposed.map(str::to_owned),
        reason: String::new(),
    }
}

fn issue(id: &str, lines: &[usize]) -> Issue {
    Issue {
        id: id.to_owned(),
        severity: Severity::Major,
        title: id.to_owned(),
        description: String::new(),
        suggestion: None,
        line_refs: lines.iter().copied().collect::<BTreeSet<_>>(),
    }
}

fn setup(
    text: &str,
    issues: Vec<Issue>,
    patches: Vec<Patch>,
) -> (ReviewEngine<MemoryAuditStore>, MemoryAuditStore) {
    let store = MemoryAuditStore::new();
    let engine = ReviewEngine::new(
        text,
        Annotations { issues, patches },
        store.clone(),
        EngineConfig::default(),
    );
    (engine, store)
}

fn temperature_patch() -> Vec<Patch> {
    vec![patch(PatchAction::Modify, 1, "M104 S200", Some("M104 S210"))]
}

#[tokio::test]
async fn following_a_patch_is_patch_success() {
    let (mut engine, store) = setup(SAMPLE, vec![], temperature_patch());

    let outcome = engine.edit_line(1, "M104 S210".into()).unwrap();
    assert_eq!(outcome, EditOutcome::Patch { patch: 0, tag: EditTag::PatchSuccess });
    assert_eq!(
        engine.annotations().patch(0).unwrap().state,
        PatchState::Applied(EditTag::PatchSuccess)
    );
    assert_eq!(engine.annotations().proposed_patches().count(), 0);

    // Patch-path writes are queued, not awaited by the edit.
    assert!(store.records().is_empty());
    assert_eq!(engine.drain_audit().await, 1);

    let records = store.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.target, ContextRef::Patch(0));
    assert_eq!(record.line_index, 1);
    assert_eq!(record.line_number, 2);
    assert_eq!(record.action, EditAction::Edit);
    assert_eq!(record.original_content, "M104 S200");
    assert_eq!(record.modified_content.as_deref(), Some("M104 S210"));
    assert_eq!(record.tag, EditTag::PatchSuccess);
}

#[test]
fn deleting_a_line_above_a_patch_rebases_it() {
    let (mut engine, _store) = setup(SAMPLE, vec![], temperature_patch());

    let outcome = engine.delete_line(0).unwrap();
    assert_eq!(outcome, EditOutcome::Unfiled { tag: EditTag::Delete });
    assert_eq!(engine.buffer().lines(), ["M104 S200", "G1 X2"]);
    assert_eq!(engine.annotations().patch(0).unwrap().patch.line_ref, 0);
    assert!(engine.annotations().patch(0).unwrap().is_proposed());
}

#[tokio::test]
async fn divergent_edit_waits_for_confirmation() {
    let (mut engine, store) = setup(SAMPLE, vec![], temperature_patch());

    let outcome = engine.edit_line(1, "M104 S220".into()).unwrap();
    assert_eq!(outcome, EditOutcome::AwaitingConfirmation);
    assert_eq!(engine.buffer().line(1), Some("M104 S200"), "nothing applied yet");
    let pending = engine.pending_apply().unwrap();
    assert_eq!(pending.suggested_text.as_deref(), Some("M104 S210"));
    assert_eq!(pending.replacement, "M104 S220");

    assert_eq!(engine.edit_line(0, "G1 X9".into()), Err(EngineError::PendingApplyOpen));
    assert_eq!(engine.delete_line(0), Err(EngineError::PendingApplyOpen));

    let outcome = engine.confirm_pending().unwrap();
    assert_eq!(outcome, EditOutcome::Patch { patch: 0, tag: EditTag::MatchingFailed });
    assert_eq!(engine.buffer().line(1), Some("M104 S220"));
    assert_eq!(
        engine.annotations().patch(0).unwrap().state,
        PatchState::Applied(EditTag::MatchingFailed)
    );

    engine.drain_audit().await;
    assert_eq!(store.records()[0].tag, EditTag::MatchingFailed);
}

#[tokio::test]
async fn discarding_a_pending_apply_leaves_no_trace() {
    let (mut engine, store) = setup(SAMPLE, vec![], temperature_patch());

    engine.edit_line(1, "M104 S220".into()).unwrap();
    engine.discard_pending().unwrap();

    assert!(engine.pending_apply().is_none());
    assert_eq!(engine.buffer().line(1), Some("M104 S200"));
    assert!(engine.annotations().patch(0).unwrap().is_proposed());
    assert!(engine.history().is_empty());
    assert_eq!(engine.drain_audit().await, 0);
    assert!(store.batches().is_empty());
    assert_eq!(engine.discard_pending(), Err(EngineError::NoPendingApply));
}

#[test]
fn keep_editing_hands_the_text_back() {
    let (mut engine, _store) = setup(SAMPLE, vec![], temperature_patch());

    engine.edit_line(1, "M104 S220".into()).unwrap();
    let pending = engine.keep_editing().unwrap();
    assert_eq!(pending.replacement, "M104 S220");
    assert_eq!(pending.original_text, "M104 S200");
    assert!(!engine.is_blocked());
    assert!(engine.annotations().patch(0).unwrap().is_proposed());
}

#[test]
fn deleting_a_patched_line() {
    let (mut engine, _store) = setup(SAMPLE, vec![], temperature_patch());
    assert_eq!(
        engine.delete_line(1).unwrap(),
        EditOutcome::Patch { patch: 0, tag: EditTag::MatchingFailed }
    );
    assert_eq!(engine.buffer().len(), 2);
    assert_eq!(
        engine.annotations().patch(0).unwrap().state,
        PatchState::Applied(EditTag::MatchingFailed),
        "consumed, not obsolete"
    );

    let remove = vec![patch(PatchAction::Remove, 1, "M104 S200", None)];
    let (mut engine, _store) = setup(SAMPLE, vec![], remove);
    assert_eq!(
        engine.delete_line(1).unwrap(),
        EditOutcome::Patch { patch: 0, tag: EditTag::PatchSuccess }
    );
}

#[test]
fn unchanged_text_is_a_no_op() {
    let (mut engine, _store) = setup(SAMPLE, vec![issue("a", &[0])], temperature_patch());
    engine.select_issue(0).unwrap();
    assert_eq!(engine.edit_line(0, "G1 X1".into()).unwrap(), EditOutcome::Unchanged);
    assert_eq!(engine.edit_line(1, "M104 S200".into()).unwrap(), EditOutcome::Unchanged);
    assert!(!engine.session().has_unsaved());
    assert!(engine.annotations().patch(0).unwrap().is_proposed());
}

#[test]
fn out_of_range_is_an_error() {
    let (mut engine, _store) = setup(SAMPLE, vec![], vec![]);
    assert_eq!(
        engine.edit_line(3, "x".into()),
        Err(EngineError::IndexOutOfRange { index: 3, len: 3 })
    );
    assert_eq!(engine.delete_line(7), Err(EngineError::IndexOutOfRange { index: 7, len: 3 }));
    assert_eq!(engine.buffer().len(), 3);
}

#[tokio::test]
async fn one_click_apply() {
    let patches = vec![
        patch(PatchAction::Modify, 1, "M104 S200", Some("M104 S210")),
        patch(PatchAction::InsertAfter, 2, "G1 X2", Some("M400")),
    ];
    let (mut engine, store) = setup(SAMPLE, vec![], patches);

    assert_eq!(
        engine.apply_patch(0).unwrap(),
        EditOutcome::Patch { patch: 0, tag: EditTag::PatchSuccess }
    );
    assert_eq!(engine.buffer().line(1), Some("M104 S210"));
    assert_eq!(engine.focus_line(), 1);
    assert!(engine.badges(1).applied);
    assert!(engine.badges(1).modified);
    assert!(!engine.badges(1).patch);

    assert_eq!(engine.apply_patch(0), Err(EngineError::PatchNotActive(0)));
    assert_eq!(
        engine.apply_patch(1),
        Err(EngineError::UnsupportedPatchAction(PatchAction::InsertAfter))
    );
    assert_eq!(engine.apply_patch(9), Err(EngineError::UnknownPatch(9)));

    engine.drain_audit().await;
    let batches = store.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].metadata.line_number, 2);
    assert!(batches[0].metadata.note.is_some());
}

#[test]
fn revert_is_single_slot_per_line() {
    let text = "L0\nL1\nL2\nL3\nL4\nL5\nL6\n";
    let patches = vec![
        patch(PatchAction::Modify, 5, "L5", Some("A")),
        patch(PatchAction::Modify, 5, "L5", Some("B")),
    ];
    let (mut engine, _store) = setup(text, vec![], patches);

    engine.apply_patch(0).unwrap();
    assert_eq!(engine.buffer().line(5), Some("A"));

    // The second patch on the line is now the proposed one.
    assert_eq!(
        engine.edit_line(5, "B".into()).unwrap(),
        EditOutcome::Patch { patch: 1, tag: EditTag::PatchSuccess }
    );
    assert_eq!(engine.history().len(), 1);

    assert!(engine.revert_line(5).unwrap());
    assert_eq!(engine.buffer().line(5), Some("A"), "only the second application is undone");
    assert!(engine.annotations().patch(1).unwrap().is_proposed());
    assert_eq!(
        engine.annotations().patch(0).unwrap().state,
        PatchState::Applied(EditTag::PatchSuccess)
    );

    assert!(!engine.revert_line(5).unwrap(), "history entries are single-use");
    assert_eq!(engine.buffer().line(5), Some("A"));
}

#[test]
fn revert_restores_a_deleted_line_and_its_annotations() {
    let issues = vec![issue("far", &[3])];
    let patches = vec![patch(PatchAction::Remove, 1, "M104 S200", None)];
    let (mut engine, _store) = setup("G1 X1\nM104 S200\nG1 X2\nG1 X3\n", issues, patches);

    engine.apply_patch(0).unwrap();
    assert_eq!(engine.buffer().len(), 3);
    assert_eq!(engine.annotations().issue(0).unwrap().first_line(), Some(2));

    assert!(engine.revert_line(1).unwrap());
    assert_eq!(engine.buffer().lines(), ["G1 X1", "M104 S200", "G1 X2", "G1 X3"]);
    assert_eq!(engine.annotations().issue(0).unwrap().first_line(), Some(3));
    assert!(engine.annotations().patch(0).unwrap().is_proposed());
    assert!(!engine.badges(1).modified);
}

#[test]
fn revert_with_no_history_is_a_no_op() {
    let (mut engine, _store) = setup(SAMPLE, vec![], vec![]);
    engine.edit_line(0, "G1 X5".into()).unwrap();
    assert!(!engine.revert_line(0).unwrap());
    assert_eq!(engine.buffer().line(0), Some("G1 X5"));
}

#[test]
fn history_keys_are_nominal_lines() {
    let text = "L0\nL1\nL2\nL3\n";
    let patches = vec![patch(PatchAction::Modify, 2, "L2", Some("X"))];
    let (mut engine, _store) = setup(text, vec![], patches);

    engine.apply_patch(0).unwrap();
    engine.delete_line(0).unwrap();
    assert!(engine.history().contains(2));
    assert!(!engine.revert_line(1).unwrap());

    // Whole-document snapshot: the later delete is undone as well.
    assert!(engine.revert_line(2).unwrap());
    assert_eq!(engine.buffer().lines(), ["L0", "L1", "L2", "L3"]);
}

#[test]
fn deleting_an_issue_line_keeps_other_references() {
    let issues = vec![issue("multi", &[0, 2]), issue("single", &[1])];
    let (mut engine, _store) = setup(SAMPLE, issues, vec![]);

    engine.delete_line(0).unwrap();
    let multi = engine.annotations().issue(0).unwrap();
    assert_eq!(multi.line_refs.iter().copied().collect::<Vec<_>>(), [1]);
    assert!(multi.is_active());

    engine.delete_line(0).unwrap();
    assert!(!engine.annotations().issue(1).unwrap().is_active());
    assert_eq!(engine.annotations().active_issues().count(), 1);
}

#[test]
fn applied_patches_keep_their_line_after_deletions() {
    let patches = vec![patch(PatchAction::Modify, 2, "G1 X2", Some("G1 X3"))];
    let (mut engine, _store) = setup(SAMPLE, vec![], patches);

    engine.edit_line(2, "G1 X3".into()).unwrap();
    engine.delete_line(0).unwrap();
    assert_eq!(engine.annotations().patch(0).unwrap().patch.line_ref, 2);
    assert!(engine.badges(1).applied);
    assert!(!engine.badges(0).applied);
}

#[test]
fn a_second_patch_on_a_consumed_line_goes_obsolete() {
    let patches = vec![
        patch(PatchAction::Remove, 1, "M104 S200", None),
        patch(PatchAction::Modify, 1, "M104 S200", Some("M104 S210")),
    ];
    let (mut engine, _store) = setup(SAMPLE, vec![], patches);

    engine.delete_line(1).unwrap();
    assert_eq!(
        engine.annotations().patch(0).unwrap().state,
        PatchState::Applied(EditTag::PatchSuccess)
    );
    assert_eq!(engine.annotations().patch(1).unwrap().state, PatchState::Obsolete);
    assert_eq!(engine.annotations().proposed_patches().count(), 0);
}

#[test]
fn export_joins_current_lines() {
    let (mut engine, _store) = setup(SAMPLE, vec![], temperature_patch());
    engine.apply_patch(0).unwrap();
    engine.delete_line(2).unwrap();
    assert_eq!(engine.export_text(), "G1 X1\nM104 S210\n");
}

#[tokio::test]
async fn revert_rolls_back_unsaved_issue_edits_made_after_the_apply() {
    let issues = vec![issue("i", &[0, 2])];
    let patches = vec![patch(PatchAction::Modify, 1, "L1", Some("P1"))];
    let (mut engine, store) = setup("L0\nL1\nL2\n", issues, patches);
    engine.select_issue(0).unwrap();
    engine.edit_line(0, "X0".into()).unwrap();
    engine.apply_patch(0).unwrap();
    engine.edit_line(2, "X2".into()).unwrap();
    assert_eq!(engine.session().unsaved().len(), 2);

    assert!(engine.revert_line(1).unwrap());
    assert_eq!(engine.buffer().lines(), ["X0", "L1", "L2"]);
    let pending = engine.session().unsaved();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].line_index, 0);

    engine.commit_active().await.unwrap();
    let issue_records: Vec<_> = store
        .records()
        .into_iter()
        .filter(|r| r.target == ContextRef::Issue(0))
        .map(|r| r.modified_content)
        .collect();
    assert_eq!(issue_records, [Some("X0".to_owned())]);
}

#[tokio::test]
async fn revert_after_a_commit_drops_every_newer_unsaved_edit() {
    let issues = vec![issue("i", &[0, 2])];
    let patches = vec![patch(PatchAction::Modify, 1, "L1", Some("P1"))];
    let (mut engine, _store) = setup("L0\nL1\nL2\n", issues, patches);
    engine.select_issue(0).unwrap();
    engine.apply_patch(0).unwrap();
    engine.edit_line(2, "X2".into()).unwrap();
    engine.commit_active().await.unwrap();
    engine.edit_line(0, "X0".into()).unwrap();

    assert!(engine.revert_line(1).unwrap());
    assert_eq!(engine.buffer().lines(), ["L0", "L1", "L2"]);
    assert!(!engine.session().has_unsaved());
    assert_eq!(engine.session().active(), Some(0));
}
