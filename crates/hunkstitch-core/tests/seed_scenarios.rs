//! End-to-end scenarios exercised against the public `apply`/`apply_with_config`
//! surface rather than internal stage functions. Each test corresponds to one
//! of the engine's own seed scenarios for the escalating-placement pipeline.

use hunkstitch_core::{apply, apply_with_config, ApplyOptions, FailureReason, HunkStatus};

fn status_at(result: &hunkstitch_core::PipelineResult, idx: usize) -> &HunkStatus {
    &result.hunks[idx].status
}

#[test]
fn s1_trivial_apply() {
    let original = b"a\nb\nc\n";
    let diff = "--- a/f\n+++ b/f\n@@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n";
    let result = apply(original, diff);
    assert_eq!(result.patched.unwrap(), b"a\nB\nc\n".to_vec());
    assert!(matches!(status_at(&result, 0), HunkStatus::Applied { .. }));
}

#[test]
fn s2_offset_drift_is_located_by_the_search_window() {
    let mut original = String::new();
    for i in 0..10 {
        original.push_str(&format!("boilerplate{i}\n"));
    }
    original.push_str("one\ntwo\nthree\n");
    // Header claims the block starts at line 1, but it actually starts at line 11.
    let diff = "--- a/f\n+++ b/f\n@@ -1,3 +1,3 @@\n one\n-two\n+TWO\n three\n";
    let result = apply(original.as_bytes(), diff);
    let HunkStatus::Applied { strategy, confidence } = status_at(&result, 0) else {
        panic!("expected Applied, got {:?}", status_at(&result, 0));
    };
    assert_eq!(*strategy, hunkstitch_core::Strategy::ExactWindow);
    assert_eq!(*confidence, 0.95);
    assert!(result.patched.unwrap().ends_with(b"one\nTWO\nthree\n"));
}

#[test]
fn s3_whitespace_only_change_uses_the_tolerant_strategy() {
    let original = "def total(items):\n    total = 0.0\n    for item in items:\n        total += item.price\n\n    return total\n";
    // The diff's captured context line is tab-indented where the file uses
    // spaces, so a byte-exact match fails; it also removes the blank line
    // and re-indents the final line with a tab.
    let diff = "--- a/f\n+++ b/f\n@@ -3,4 +3,3 @@\n \tfor item in items:\n         total += item.price\n-\n-    return total\n+\treturn total\n";
    let result = apply_with_config(original.as_bytes(), diff, &ApplyOptions::default());
    let HunkStatus::Applied { strategy, .. } = status_at(&result, 0) else {
        panic!("expected Applied, got {:?}", status_at(&result, 0));
    };
    assert_eq!(*strategy, hunkstitch_core::Strategy::WhitespaceTolerant);
    let patched = String::from_utf8(result.patched.unwrap()).unwrap();
    assert_eq!(
        patched,
        "def total(items):\n    total = 0.0\n\tfor item in items:\n        total += item.price\n\treturn total\n"
    );
}

#[test]
fn s4_reapplying_the_same_diff_is_a_no_op() {
    let original = b"a\nb\nc\n";
    let diff = "--- a/f\n+++ b/f\n@@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n";
    let first = apply(original, diff);
    let patched = first.patched.unwrap();
    let second = apply(&patched, diff);
    assert_eq!(second.patched.as_deref(), Some(patched.as_slice()));
    assert!(matches!(status_at(&second, 0), HunkStatus::AlreadyApplied));
}

#[test]
fn s5_overlapping_hunks_first_wins_second_fails() {
    let original = (1..=20).map(|i| format!("line{i}\n")).collect::<String>();
    let diff = "--- a/f\n+++ b/f\n\
@@ -9,3 +9,3 @@\n line9\n-line10\n+L10\n line11\n\
@@ -10,3 +10,3 @@\n line10\n-line11\n+L11\n line12\n";
    let result = apply(original.as_bytes(), diff);
    assert!(matches!(status_at(&result, 0), HunkStatus::Applied { .. }));
    assert!(matches!(
        status_at(&result, 1),
        HunkStatus::Failed {
            reason: FailureReason::Overlap
        }
    ));
    let patched = result.patched.unwrap();
    let text = String::from_utf8(patched).unwrap();
    assert!(text.contains("L10"));
    assert!(!text.contains("L11"));
    assert!(text.contains("line1\n"));
    assert!(text.contains("line20\n"));
}

#[test]
fn s6_invisible_unicode_is_preserved_outside_the_hunk_but_not_on_the_changed_line() {
    let original = "let zwsp = \"a\u{200B}b\";\nlet other = \"a\u{200B}c\";\n";
    // The diff was produced from a copy that had the zero-width space
    // stripped, so only the invisible-tolerant strategy (level 4) matches.
    let diff = "--- a/f\n+++ b/f\n@@ -1,1 +1,1 @@\n-let zwsp = \"ab\";\n+let zwsp_renamed = \"ab\";\n";
    let result = apply(original.as_bytes(), diff);
    let HunkStatus::Applied { strategy, .. } = status_at(&result, 0) else {
        panic!("expected Applied, got {:?}", status_at(&result, 0));
    };
    assert_eq!(*strategy, hunkstitch_core::Strategy::InvisibleTolerant);
    let patched = String::from_utf8(result.patched.unwrap()).unwrap();
    // Changed line takes the hunk's (ZWSP-free) form.
    assert_eq!(patched.lines().next().unwrap(), "let zwsp_renamed = \"ab\";");
    // Untouched line keeps its original zero-width space byte-for-byte.
    assert!(patched.lines().nth(1).unwrap().contains('\u{200B}'));
}

#[test]
fn s7_misordered_hunks_apply_the_same_as_sorted_ones() {
    let original = b"a\nb\nc\nd\n";
    let misordered = "--- a/f\n+++ b/f\n\
@@ -3,1 +3,1 @@\n-c\n+C\n\
@@ -1,1 +1,1 @@\n-a\n+A\n";
    let sorted = "--- a/f\n+++ b/f\n\
@@ -1,1 +1,1 @@\n-a\n+A\n\
@@ -3,1 +3,1 @@\n-c\n+C\n";
    let from_misordered = apply(original, misordered);
    let from_sorted = apply(original, sorted);
    assert_eq!(from_misordered.patched, from_sorted.patched);
    assert_eq!(from_misordered.patched.unwrap(), b"A\nb\nC\nd\n".to_vec());
}

#[test]
fn s8_crlf_context_with_lf_add_keeps_crlf_on_emitted_lines() {
    // Context/Remove lines are copied verbatim from the CRLF file by the
    // tool that produced this diff; the replacement (Add) line is freshly
    // written with a bare LF. The majority rule among the hunk's retained
    // Context lines still resolves to CRLF.
    let original = b"a\r\nb\r\nc\r\n";
    let diff = "--- a/f\n+++ b/f\n@@ -1,3 +1,3 @@\n a\r\n-b\r\n+B\n c\r\n";
    let result = apply(original, diff);
    assert!(matches!(status_at(&result, 0), HunkStatus::Applied { .. }));
    assert_eq!(result.patched.unwrap(), b"a\r\nB\r\nc\r\n".to_vec());
}

#[test]
fn s9_corrected_counts_apply_leniently_but_fail_strictly() {
    let original = b"a\nb\nc\nd\ne\n";
    // Header claims old_count=5, body only has 3 context/remove lines.
    let diff = "--- a/f\n+++ b/f\n@@ -1,5 +1,5 @@\n a\n-b\n+B\n c\n";

    let lenient = apply_with_config(original, diff, &ApplyOptions::default());
    assert!(matches!(status_at(&lenient, 0), HunkStatus::Applied { .. }));

    let strict_options = ApplyOptions {
        validate_diff: true,
        ..ApplyOptions::default()
    };
    let strict = apply_with_config(original, diff, &strict_options);
    assert!(matches!(
        status_at(&strict, 0),
        HunkStatus::Failed {
            reason: FailureReason::CountMismatch
        }
    ));
}

#[test]
fn s10_no_newline_marker_on_the_removed_line_does_not_strip_the_added_lines_newline() {
    // The original file has no trailing newline on its final line; the diff
    // marks that with `\ No newline at end of file` right after the `-old`
    // line, which is where a real unified diff attaches it. The replacement
    // `+new` line was written with its own trailing newline and must keep it.
    let original = b"x\nold";
    let diff = "--- a/f\n+++ b/f\n@@ -2,1 +2,1 @@\n-old\n\\ No newline at end of file\n+new\n";
    let result = apply(original, diff);
    assert!(matches!(status_at(&result, 0), HunkStatus::Applied { .. }));
    assert_eq!(result.patched.unwrap(), b"x\nnew\n".to_vec());
}
