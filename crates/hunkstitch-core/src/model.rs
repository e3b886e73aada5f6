//! Data types shared across the pipeline: lines, hunks, placements, and the
//! report returned to callers.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// A line ending as it was actually written on disk or in a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            LineEnding::Lf => b"\n",
            LineEnding::CrLf => b"\r\n",
        }
    }
}

/// One physical line of the *original* file, stored with its exact on-disk
/// bytes so that unchanged regions can be copied through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    raw: Vec<u8>,
    ending: Option<LineEnding>,
}

impl SourceLine {
    pub(crate) fn new(raw: Vec<u8>, ending: Option<LineEnding>) -> Self {
        Self { raw, ending }
    }

    /// The exact bytes of this line, including its line ending (if any).
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn ending(&self) -> Option<LineEnding> {
        self.ending
    }

    /// The line's content, excluding the line ending.
    pub fn content(&self) -> &[u8] {
        let ending_len = self.ending.map(|e| e.as_bytes().len()).unwrap_or(0);
        &self.raw[..self.raw.len() - ending_len]
    }

    /// Lossy UTF-8 view of the content, used for every comparison in the
    /// placer. The raw bytes (not this view) are what ends up in the output.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.content())
    }
}

/// A line as it appears inside a hunk body in the diff, decoded to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub content: String,
    pub ending: Option<LineEnding>,
}

/// One tagged entry of a hunk body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Context(DiffLine),
    Remove(DiffLine),
    Add(DiffLine),
}

impl Op {
    pub fn content(&self) -> &str {
        match self {
            Op::Context(l) | Op::Remove(l) | Op::Add(l) => &l.content,
        }
    }

    /// The line ending this op was actually parsed with, `None` if the
    /// `\ No newline at end of file` marker attaches to it.
    pub fn ending(&self) -> Option<LineEnding> {
        match self {
            Op::Context(l) | Op::Remove(l) | Op::Add(l) => l.ending,
        }
    }

    pub fn is_context(&self) -> bool {
        matches!(self, Op::Context(_))
    }

    pub fn is_remove(&self) -> bool {
        matches!(self, Op::Remove(_))
    }

    pub fn is_add(&self) -> bool {
        matches!(self, Op::Add(_))
    }
}

/// A defect in a hunk's header that `validate_diff` refuses to silently
/// paper over. When present, the orchestrator fails the hunk immediately
/// without attempting placement; sibling hunks in the same diff are
/// unaffected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HunkDefect {
    CountMismatch,
    Malformed,
}

/// A single `@@ ... @@` hunk, parsed and validated.
#[derive(Debug, Clone, PartialEq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub operations: Vec<Op>,
    pub has_no_newline_marker: bool,
    pub heading: Option<String>,
    /// Set when the declared header counts disagreed with the body and were
    /// silently corrected to the observed values (lenient mode, the default).
    pub corrected_counts: bool,
    /// Set instead of `corrected_counts` under `validate_diff`, or when the
    /// body itself cannot be reconciled with any recovery.
    pub defect: Option<HunkDefect>,
}

impl Hunk {
    /// Context+Remove line contents: what this hunk expects to find.
    pub fn old_block(&self) -> Vec<&str> {
        self.operations
            .iter()
            .filter(|op| op.is_context() || op.is_remove())
            .map(Op::content)
            .collect()
    }

    /// Context+Add line contents: what this hunk produces.
    pub fn new_block(&self) -> Vec<&str> {
        self.operations
            .iter()
            .filter(|op| op.is_context() || op.is_add())
            .map(Op::content)
            .collect()
    }

    /// The 0-based index in the current file state where this hunk's
    /// `old_block` is declared to start.
    pub fn declared_anchor(&self) -> usize {
        if self.old_count == 0 {
            self.old_start
        } else {
            self.old_start.saturating_sub(1)
        }
    }
}

/// One of the seven escalating matchers, or the two non-matcher dispositions
/// (`AlreadyApplied` is produced by the pre-check and by the orchestrator's
/// false-positive rule, neither of which run a normal strategy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    ExactOffset,
    ExactWindow,
    WhitespaceTolerant,
    EscapeTolerant,
    InvisibleTolerant,
    Fuzzy,
    DifflibRescue,
    AlreadyApplied,
}

/// The kind of match a `Placement` represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EquivalenceClass {
    Exact,
    WhitespaceEquivalent,
    EscapeEquivalent,
    InvisibleEquivalent,
    Fuzzy,
}

/// Why the placer could not produce a `Placement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoMatchReason {
    NoCandidate,
    Ambiguous,
}

/// An accepted (hunk, anchor, strategy) triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub anchor: usize,
    pub strategy: Strategy,
    pub confidence: f64,
    pub equivalence_class: EquivalenceClass,
    pub indentation_flagged: bool,
}

/// Why a hunk ended up `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    NoMatch,
    Ambiguous,
    Overlap,
    Malformed,
    CountMismatch,
    AppliedOutOfBounds,
}

/// The lifecycle state of one hunk, owned exclusively by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HunkStatus {
    Pending,
    Applied {
        strategy: Strategy,
        confidence: f64,
    },
    AlreadyApplied,
    Failed {
        reason: FailureReason,
    },
    Skipped,
}

impl HunkStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, HunkStatus::Pending)
    }
}

/// Explicit, immutable configuration for a single `apply` call. Never read
/// from globals or the environment inside the core; the CLI driver is the
/// only place that touches flags or a config file (see `hunkstitch-cli`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyOptions {
    /// Run the parser in strict mode: a hunk whose header counts disagree
    /// with its body becomes a per-hunk `CountMismatch` failure instead of
    /// being silently corrected.
    pub validate_diff: bool,
    /// Upper bound on the search window used by strategies 2-7.
    pub max_search_window: usize,
    /// Minimum line-match ratio for the fuzzy strategy to accept.
    pub fuzzy_min_score: f64,
    /// Minimum lead the best fuzzy candidate must have over the runner-up.
    pub fuzzy_margin: f64,
    /// Enable the already-applied pre-check and the false-positive-hunk
    /// rule.
    pub detect_already_applied: bool,
    /// Respect the CRLF-majority rule when choosing the line ending for
    /// emitted hunk lines; when off, always emit LF.
    pub preserve_crlf: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            validate_diff: false,
            max_search_window: 200,
            fuzzy_min_score: 0.80,
            fuzzy_margin: 0.10,
            detect_already_applied: true,
            preserve_crlf: true,
        }
    }
}

/// Per-hunk entry of the report returned alongside (or instead of) the
/// patched bytes.
#[derive(Debug, Clone, Serialize)]
pub struct HunkReport {
    pub index: usize,
    pub old_start: usize,
    pub status: HunkStatus,
    pub strategy_used: Option<Strategy>,
    pub confidence: Option<f64>,
    pub reason: Option<FailureReason>,
}

/// Aggregate counts over all hunks in a `PipelineResult`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Summary {
    pub applied: usize,
    pub already_applied: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// The outcome of one `apply` call.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    /// Final bytes, present whenever at least one hunk is `Applied` or
    /// `AlreadyApplied`. Absent only when every hunk failed, or the diff
    /// itself failed to parse.
    pub patched: Option<Vec<u8>>,
    pub hunks: Vec<HunkReport>,
    pub summary: Summary,
    /// Set when parsing failed wholly; `hunks` is empty and `patched` is
    /// `None` in that case.
    pub parse_error: Option<String>,
}

impl PipelineResult {
    pub fn all_failed(&self) -> bool {
        self.patched.is_none() && !self.hunks.is_empty()
    }
}
