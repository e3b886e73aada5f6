//! A robust unified-diff application engine.
//!
//! Where a strict patch tool stops at the first hunk whose declared line
//! numbers or context don't match exactly, this crate keeps going: it
//! escalates through a ladder of increasingly tolerant matching strategies
//! (whitespace, escape sequences, invisible Unicode, fuzzy line scoring, and
//! finally a difflib-style rescue) before giving up on a hunk, and it
//! recognizes when a hunk's change is already present so re-applying the
//! same diff is a no-op rather than a failure.
//!
//! The core pipeline is synchronous, single-threaded, and free of side
//! effects: [`apply`] takes the original bytes and the diff text and
//! returns a [`PipelineResult`] describing exactly what happened to every
//! hunk. It never touches the filesystem itself — that's the caller's job
//! (see the `hunkstitch` binary for a filesystem-facing driver).
//!
//! ```
//! use hunkstitch_core::apply;
//!
//! let original = b"fn main() {\n    println!(\"hi\");\n}\n";
//! let diff = "\
//! --- a/src/main.rs
//! +++ b/src/main.rs
//! @@ -1,3 +1,3 @@
//!  fn main() {
//! -    println!(\"hi\");
//! +    println!(\"hello\");
//!  }
//! ";
//! let result = apply(original, diff);
//! assert_eq!(result.summary.applied, 1);
//! assert_eq!(
//!     result.patched.unwrap(),
//!     b"fn main() {\n    println!(\"hello\");\n}\n".to_vec()
//! );
//! ```
//!
//! # Panics
//!
//! The pipeline panics rather than returning an error when one of its own
//! invariants is violated — an accepted placement landing outside its
//! search window, an equivalence level regressing to "less equal" than a
//! stricter level, or two accepted placements overlapping after the
//! orchestrator's guard should have ruled that out. These indicate a bug in
//! this crate, not a malformed diff; a malformed diff is always reported
//! through [`PipelineResult`] or [`ParseError`], never a panic.

pub mod error;
pub mod model;
pub mod normalize;
pub mod orchestrate;
pub mod parse;
pub mod place;
pub mod reconstruct;

pub use error::{ParseError, ParseErrorKind};
pub use model::{
    ApplyOptions, DiffLine, EquivalenceClass, FailureReason, Hunk, HunkDefect, HunkReport, HunkStatus, LineEnding,
    NoMatchReason, Op, Placement, PipelineResult, SourceLine, Strategy, Summary,
};
pub use parse::{parse, parse_multi, FileDiff};

/// Applies `diff` to `original` using the default [`ApplyOptions`].
pub fn apply(original: &[u8], diff: &str) -> PipelineResult {
    apply_with_config(original, diff, &ApplyOptions::default())
}

/// Applies `diff` to `original` under explicit `options`.
///
/// Deterministic and side-effect-free: the same inputs always produce the
/// same [`PipelineResult`]. An empty (or all-whitespace) diff is treated as
/// the identity transform and short-circuits before parsing, so it never
/// produces a [`ParseErrorKind::EmptyDiff`] failure — that error is reserved
/// for diff text that has headers or preamble but no `@@` hunks at all.
pub fn apply_with_config(original: &[u8], diff: &str, options: &ApplyOptions) -> PipelineResult {
    if diff.trim().is_empty() {
        return PipelineResult {
            patched: Some(original.to_vec()),
            hunks: Vec::new(),
            summary: Summary::default(),
            parse_error: None,
        };
    }

    let hunks = match parse::parse(diff, options.validate_diff) {
        Ok(hunks) => hunks,
        Err(err) => {
            return PipelineResult {
                patched: None,
                hunks: Vec::new(),
                summary: Summary::default(),
                parse_error: Some(err.to_string()),
            };
        }
    };

    let file = split_source_lines(original);
    let output = orchestrate::orchestrate(&file, &hunks, options);

    let any_success = output.summary.applied > 0 || output.summary.already_applied > 0;
    let patched = any_success
        .then(|| reconstruct::reconstruct(&file, &hunks, &output.accepted, options.preserve_crlf));

    PipelineResult {
        patched,
        hunks: output.reports,
        summary: output.summary,
        parse_error: None,
    }
}

fn split_source_lines(bytes: &[u8]) -> Vec<SourceLine> {
    let mut out = Vec::new();
    let mut rest = bytes;
    while !rest.is_empty() {
        match rest.iter().position(|&b| b == b'\n') {
            Some(idx) => {
                let (line, after) = rest.split_at(idx + 1);
                let ending = if line.len() >= 2 && line[line.len() - 2] == b'\r' {
                    Some(LineEnding::CrLf)
                } else {
                    Some(LineEnding::Lf)
                };
                out.push(SourceLine::new(line.to_vec(), ending));
                rest = after;
            }
            None => {
                out.push(SourceLine::new(rest.to_vec(), None));
                rest = &[];
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_diff_is_the_identity() {
        let original = b"unchanged\ncontent\n";
        let result = apply(original, "");
        assert_eq!(result.patched.as_deref(), Some(original.as_slice()));
        assert!(result.hunks.is_empty());
    }

    #[test]
    fn idempotent_reapplication_reports_already_applied() {
        let original = b"fn main() {\n    println!(\"hi\");\n}\n";
        let diff = "--- a/f\n+++ b/f\n@@ -1,3 +1,3 @@\n fn main() {\n-    println!(\"hi\");\n+    println!(\"hello\");\n }\n";
        let first = apply(original, diff);
        let patched = first.patched.unwrap();
        let second = apply(&patched, diff);
        assert_eq!(second.patched.as_deref(), Some(patched.as_slice()));
        assert_eq!(second.summary.already_applied, 1);
        assert_eq!(second.summary.applied, 0);
    }

    #[test]
    fn unparseable_diff_yields_no_patched_bytes() {
        let result = apply(b"original\n", "not a diff at all\njust text\n");
        assert!(result.patched.is_none());
        assert!(result.parse_error.is_some());
    }

    #[test]
    fn all_hunks_failing_yields_no_patched_bytes() {
        let original = b"a\nb\nc\n";
        let diff = "--- a/f\n+++ b/f\n@@ -1,1 +1,1 @@\n-nonexistent\n+replacement\n";
        let result = apply(original, diff);
        assert!(result.patched.is_none());
        assert_eq!(result.summary.failed, 1);
        assert!(result.all_failed());
    }

    #[test]
    fn pure_append_at_end_of_file() {
        let original = b"a\nb\n";
        let diff = "--- a/f\n+++ b/f\n@@ -2,0 +3,1 @@\n+c\n";
        let result = apply(original, diff);
        assert_eq!(result.patched.unwrap(), b"a\nb\nc\n".to_vec());
    }
}
