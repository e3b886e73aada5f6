//! Error types. A `ParseError` aborts the whole diff; everything else is
//! reported per-hunk through `HunkStatus::Failed` and never surfaces as a
//! `Result::Err`. Violated invariants panic instead of returning an error —
//! see the crate root docs for the distinction.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("hunk header is malformed")]
    MalformedHeader,
    #[error("diff contains no hunks")]
    EmptyDiff,
    #[error("hunk body ends before the declared range is satisfied")]
    TruncatedHunk,
    #[error("hunk body contains a line with an unrecognized prefix")]
    UnknownPrefix,
}

/// A fatal, whole-diff parse failure. Carries the 1-based line number in the
/// diff text where the problem was detected.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} (line {line_number}): {context}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line_number: usize,
    pub context: String,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, line_number: usize, context: impl Into<String>) -> Self {
        Self {
            kind,
            line_number,
            context: context.into(),
        }
    }
}
