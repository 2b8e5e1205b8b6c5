//! Rebasing, classification, window and buffer properties over generated inputs.

use std::collections::BTreeSet;

use gcode_review_core::buffer::{BaselineChange, LineBuffer};
use gcode_review_core::classify::patch_outcome;
use gcode_review_core::rebase::shift_after_delete;
use gcode_review_core::viewport::compute_window;
use gcode_review_core::{
    Annotations, EditTag, EngineConfig, Issue, MemoryAuditStore, Patch, PatchAction,
    ReviewEngine, Severity, ViewportWindow,
};

/// Small deterministic generator so failures are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next_below(&mut self, bound: usize) -> usize {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }
}

fn numbered(n: usize) -> String {
    (0..n).map(|i| format!("G1 X{i}\n")).collect()
}

#[test]
fn surviving_references_count_the_lines_still_before_them() {
    const N: usize = 40;
    for seed in [1_u64, 7, 42, 1234, 99_999] {
        let issues = (0..N)
            .map(|line| Issue {
                id: format!("i{line}"),
                severity: Severity::Info,
                title: String::new(),
                description: String::new(),
                suggestion: None,
                line_refs: BTreeSet::from([line]),
            })
            .collect();
        // Patches on odd lines only, so some deletions hit a patch and some do not.
        let patches = (1..N)
            .step_by(2)
            .map(|line| Patch {
                id: format!("p{line}"),
                action: PatchAction::Modify,
                line_ref: line,
                original_text: format!("G1 X{line}"),
                proposed_text: Some(format!("G1 X{line}0")),
                reason: String::new(),
            })
            .collect();
        let mut engine = ReviewEngine::new(
            &numbered(N),
            Annotations { issues, patches },
            MemoryAuditStore::new(),
            EngineConfig::default(),
        );

        // Baseline index of every line still present, in order.
        let mut alive: Vec<usize> = (0..N).collect();
        let mut rng = Lcg(seed);
        for _ in 0..N / 2 {
            let index = rng.next_below(alive.len());
            engine.delete_line(index).unwrap();
            alive.remove(index);

            assert_eq!(engine.buffer().len(), alive.len());
            for (k, issue) in engine.annotations().issues().iter().enumerate() {
                match alive.binary_search(&k) {
                    Ok(position) => assert_eq!(issue.first_line(), Some(position), "seed {seed}"),
                    Err(_) => assert!(!issue.is_active(), "seed {seed}"),
                }
            }
            for (_, patch) in engine.annotations().proposed_patches() {
                let baseline: usize = patch.id[1..].parse().unwrap();
                let position = alive.binary_search(&baseline).unwrap();
                assert_eq!(patch.line_ref, position, "seed {seed}");
                assert_eq!(engine.buffer().line(position), Some(patch.original_text.as_str()));
            }
        }
    }
}

#[test]
fn shift_after_delete_table() {
    assert_eq!(shift_after_delete(2, 5), Some(2));
    assert_eq!(shift_after_delete(5, 5), None);
    assert_eq!(shift_after_delete(6, 5), Some(5));
    assert_eq!(shift_after_delete(0, 0), None);
}

#[test]
fn classification_follows_text_equality() {
    let texts = [None, Some(""), Some("M104 S200"), Some("M104 S210"), Some("m104 s210")];
    for proposed in texts {
        let patch = Patch {
            id: "p".into(),
            action: if proposed.is_some() { PatchAction::Modify } else { PatchAction::Remove },
            line_ref: 0,
            original_text: "M104 S200".into(),
            proposed_text: proposed.map(str::to_owned),
            reason: String::new(),
        };
        for new_text in texts {
            let expected = if new_text == proposed {
                EditTag::PatchSuccess
            } else {
                EditTag::MatchingFailed
            };
            assert_eq!(patch_outcome(&patch, new_text), expected, "{proposed:?} vs {new_text:?}");
        }
    }
}

#[test]
fn window_is_bounded_for_any_length() {
    for len in [0_usize, 1, 2, 50, 101, 1_000, 5_000_000] {
        for radius in [0_usize, 1, 50] {
            for focus in [0, 1, len / 2, len.saturating_sub(1), len, len + 10] {
                let range = compute_window(focus, radius, len);
                assert!(range.len() <= 2 * radius + 1, "{len} {radius} {focus}");
                assert!(range.end <= len);
                if len > 0 {
                    let clamped = focus.min(len - 1);
                    assert!(range.contains(&clamped), "{len} {radius} {focus}");
                } else {
                    assert!(range.is_empty());
                }
            }
        }
    }
}

#[test]
fn window_edges() {
    assert_eq!(compute_window(0, 50, 1_000), 0..51);
    assert_eq!(compute_window(500, 50, 1_000), 450..551);
    assert_eq!(compute_window(999, 50, 1_000), 949..1_000);
    assert_eq!(compute_window(10, 50, 20), 0..20);

    let window = ViewportWindow::new(500, 50, 1_000);
    assert_eq!(window.focus_offset(), 50);
    assert_eq!(window.len(), 101);
    let window = ViewportWindow::new(2_000, 50, 1_000);
    assert_eq!(window.focus_line, 999);
}

#[test]
fn engine_materializes_only_the_window() {
    let mut engine = ReviewEngine::new(
        &numbered(10_000),
        Annotations::default(),
        MemoryAuditStore::new(),
        EngineConfig { viewport_radius: 5, ..EngineConfig::default() },
    );
    engine.focus_line_at(7_000);
    let visible: Vec<_> = engine.visible_lines().collect();
    assert_eq!(visible.len(), 11);
    assert_eq!(visible.first(), Some(&(6_995, "G1 X6995")));
    assert_eq!(visible.last(), Some(&(7_005, "G1 X7005")));

    assert_eq!(engine.focus_line_at(50_000).focus_line, 9_999);
}

#[test]
fn baseline_changes_track_origins() {
    let mut buffer = LineBuffer::from_text("a\nb\nc\nd\n");
    buffer.replace_line(2, "C".into()).unwrap();
    buffer.delete_line(1).unwrap();

    assert_eq!(
        buffer.baseline_changes(),
        vec![
            BaselineChange::Removed { baseline_line: 1, text: "b".into() },
            BaselineChange::Modified {
                baseline_line: 2,
                current_line: 1,
                before: "c".into(),
                after: "C".into(),
            },
        ]
    );
    assert_eq!(buffer.origin_of(2), Some(3));
    assert!(buffer.is_modified(1));
    assert!(!buffer.is_modified(2));

    buffer.replace_line(1, "c".into()).unwrap();
    assert!(!buffer.is_modified(1), "edited back to baseline");
}

#[test]
fn text_round_trip_keeps_line_endings() {
    let crlf = LineBuffer::from_text("G28\r\nG1 X1\r\n");
    assert_eq!(crlf.lines(), ["G28", "G1 X1"]);
    assert_eq!(crlf.to_text(), "G28\r\nG1 X1\r\n");

    let bare = LineBuffer::from_text("G28\nG1 X1");
    assert_eq!(bare.to_text(), "G28\nG1 X1");

    let empty = LineBuffer::from_text("");
    assert!(empty.is_empty());
    assert_eq!(empty.to_text(), "");
}
