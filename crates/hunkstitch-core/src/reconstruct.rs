//! File reconstructor (component E): a single left-to-right pass that
//! splices accepted placements into the original line sequence.
//!
//! Unchanged regions are copied through as raw bytes, so files that mix line
//! endings or carry non-UTF-8 content outside the touched regions come back
//! byte-for-byte. Only the lines a hunk actually emits go through the
//! line-ending decision in `hunk_line_ending`.

use crate::model::{Hunk, LineEnding, Op, Placement, SourceLine};

/// Rebuilds the file from `file`, splicing in every (hunk, placement) pair
/// in `accepted`. `accepted` must already be sorted by anchor ascending and
/// pairwise non-overlapping — the orchestrator guarantees this.
pub fn reconstruct(file: &[SourceLine], hunks: &[Hunk], accepted: &[(usize, Placement)], preserve_crlf: bool) -> Vec<u8> {
    let mut out = Vec::new();
    let mut cursor = 0usize;

    for (pos, (hunk_idx, placement)) in accepted.iter().enumerate() {
        let hunk = &hunks[*hunk_idx];

        for line in &file[cursor..placement.anchor] {
            out.extend_from_slice(line.raw());
        }

        let ending = hunk_line_ending(hunk, preserve_crlf);
        let kept: Vec<&Op> = hunk
            .operations
            .iter()
            .filter(|op| op.is_context() || op.is_add())
            .collect();

        let next_cursor = placement.anchor + hunk.old_count;
        let is_last_placement = pos == accepted.len() - 1;
        let owns_file_tail = is_last_placement && next_cursor == file.len();

        for (i, op) in kept.iter().enumerate() {
            out.extend_from_slice(op.content().as_bytes());
            let is_final_line_of_output = owns_file_tail && i == kept.len() - 1;
            if is_final_line_of_output && op.ending().is_none() {
                continue;
            }
            out.extend_from_slice(ending.as_bytes());
        }

        cursor = next_cursor;
    }

    for line in &file[cursor..] {
        out.extend_from_slice(line.raw());
    }

    out
}

/// LF unless every retained context line in the hunk ended in CRLF; ties
/// (including a hunk with no context lines at all) resolve to LF.
fn hunk_line_ending(hunk: &Hunk, preserve_crlf: bool) -> LineEnding {
    if !preserve_crlf {
        return LineEnding::Lf;
    }
    let mut crlf = 0usize;
    let mut lf = 0usize;
    for op in &hunk.operations {
        if let Op::Context(dl) = op {
            match dl.ending {
                Some(LineEnding::CrLf) => crlf += 1,
                Some(LineEnding::Lf) => lf += 1,
                None => {}
            }
        }
    }
    if crlf > lf {
        LineEnding::CrLf
    } else {
        LineEnding::Lf
    }
}
