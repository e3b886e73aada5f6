//! Stage orchestrator (component D): sorts hunks by declared position,
//! places each one independently, guards against overlapping acceptances,
//! and recovers hunks that only *look* like failures because their content
//! is already present in the file.

use tracing::{debug, info_span, warn};

use crate::model::{
    ApplyOptions, FailureReason, Hunk, HunkDefect, HunkReport, HunkStatus, NoMatchReason, Placement, SourceLine,
    Strategy, Summary,
};
use crate::normalize::equivalence_key;
use crate::place::place;

/// Everything the reconstructor and the caller need once every hunk has
/// been resolved.
pub struct OrchestrationOutput {
    pub reports: Vec<HunkReport>,
    /// (index into the original `hunks` slice, accepted placement), sorted
    /// by anchor ascending and guaranteed pairwise non-overlapping.
    pub accepted: Vec<(usize, Placement)>,
    pub summary: Summary,
}

pub fn orchestrate(file: &[SourceLine], hunks: &[Hunk], options: &ApplyOptions) -> OrchestrationOutput {
    let span = info_span!("apply", hunk_count = hunks.len());
    let _enter = span.enter();

    let mut order: Vec<usize> = (0..hunks.len()).collect();
    order.sort_by_key(|&i| hunks[i].old_start);

    let mut reports: Vec<Option<HunkReport>> = (0..hunks.len()).map(|_| None).collect();
    let mut accepted: Vec<(usize, Placement)> = Vec::new();
    let mut occupied: Vec<(usize, usize)> = Vec::new();

    for &idx in &order {
        let hunk = &hunks[idx];

        if let Some(defect) = hunk.defect {
            let reason = match defect {
                HunkDefect::CountMismatch => FailureReason::CountMismatch,
                HunkDefect::Malformed => FailureReason::Malformed,
            };
            warn!(hunk_id = idx, ?reason, "hunk has a header defect, skipping placement");
            reports[idx] = Some(failed_report(idx, hunk, reason));
            continue;
        }

        match place(file, hunk, options) {
            Ok(placement) if placement.strategy == Strategy::AlreadyApplied => {
                debug!(hunk_id = idx, "hunk content already present at declared position");
                reports[idx] = Some(HunkReport {
                    index: idx,
                    old_start: hunk.old_start,
                    status: HunkStatus::AlreadyApplied,
                    strategy_used: Some(placement.strategy),
                    confidence: Some(placement.confidence),
                    reason: None,
                });
            }
            Ok(placement) => {
                let interval = (placement.anchor, placement.anchor + hunk.old_count);
                if overlaps(&occupied, interval) {
                    warn!(hunk_id = idx, "accepted placement overlaps an already-accepted hunk");
                    reports[idx] = Some(failed_report(idx, hunk, FailureReason::Overlap));
                    continue;
                }
                insert_sorted(&mut occupied, interval);
                debug!(
                    hunk_id = idx,
                    strategy = ?placement.strategy,
                    confidence = placement.confidence,
                    "hunk placed"
                );
                reports[idx] = Some(HunkReport {
                    index: idx,
                    old_start: hunk.old_start,
                    status: HunkStatus::Applied {
                        strategy: placement.strategy,
                        confidence: placement.confidence,
                    },
                    strategy_used: Some(placement.strategy),
                    confidence: Some(placement.confidence),
                    reason: None,
                });
                accepted.push((idx, placement));
            }
            Err(raw_reason) => {
                if options.detect_already_applied && new_block_found_anywhere(file, hunk) {
                    debug!(hunk_id = idx, "hunk recovered by false-positive rule");
                    reports[idx] = Some(HunkReport {
                        index: idx,
                        old_start: hunk.old_start,
                        status: HunkStatus::AlreadyApplied,
                        strategy_used: None,
                        confidence: None,
                        reason: None,
                    });
                    continue;
                }
                let reason = classify_failure(raw_reason, hunk, file);
                warn!(hunk_id = idx, ?reason, "hunk failed to place");
                reports[idx] = Some(failed_report(idx, hunk, reason));
            }
        }
    }

    accepted.sort_by_key(|(_, p)| p.anchor);

    let reports: Vec<HunkReport> = reports
        .into_iter()
        .map(|r| r.expect("every hunk index is visited exactly once"))
        .collect();
    let summary = summarize(&reports);

    OrchestrationOutput {
        reports,
        accepted,
        summary,
    }
}

fn classify_failure(reason: NoMatchReason, hunk: &Hunk, file: &[SourceLine]) -> FailureReason {
    match reason {
        NoMatchReason::Ambiguous => FailureReason::Ambiguous,
        NoMatchReason::NoCandidate if hunk.old_count > file.len() => FailureReason::AppliedOutOfBounds,
        NoMatchReason::NoCandidate => FailureReason::NoMatch,
    }
}

fn failed_report(idx: usize, hunk: &Hunk, reason: FailureReason) -> HunkReport {
    HunkReport {
        index: idx,
        old_start: hunk.old_start,
        status: HunkStatus::Failed { reason },
        strategy_used: None,
        confidence: None,
        reason: Some(reason),
    }
}

fn overlaps(occupied: &[(usize, usize)], interval: (usize, usize)) -> bool {
    occupied.iter().any(|&(s, e)| interval.0 < e && s < interval.1)
}

fn insert_sorted(occupied: &mut Vec<(usize, usize)>, interval: (usize, usize)) {
    let pos = occupied.partition_point(|&(s, _)| s < interval.0);
    occupied.insert(pos, interval);
}

/// The false-positive-hunk rule: a hunk that failed every strategy is
/// reclassified as `AlreadyApplied` if its post-image already occurs
/// somewhere in the file, independent of the declared offset or the search
/// window. Never runs on hunks that already succeeded normally.
fn new_block_found_anywhere(file: &[SourceLine], hunk: &Hunk) -> bool {
    let new_block = hunk.new_block();
    if new_block.is_empty() || new_block.len() > file.len() {
        return false;
    }
    (0..=file.len() - new_block.len()).any(|pos| {
        new_block
            .iter()
            .enumerate()
            .all(|(i, expected)| equivalence_key(&file[pos + i].text(), 2) == equivalence_key(expected, 2))
    })
}

fn summarize(reports: &[HunkReport]) -> Summary {
    let mut summary = Summary::default();
    for report in reports {
        match report.status {
            HunkStatus::Applied { .. } => summary.applied += 1,
            HunkStatus::AlreadyApplied => summary.already_applied += 1,
            HunkStatus::Failed { .. } => summary.failed += 1,
            HunkStatus::Skipped => summary.skipped += 1,
            HunkStatus::Pending => {}
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DiffLine, LineEnding, Op};

    fn src(contents: &[&str]) -> Vec<SourceLine> {
        contents
            .iter()
            .map(|c| SourceLine::new(format!("{c}\n").into_bytes(), Some(LineEnding::Lf)))
            .collect()
    }

    fn simple_hunk(old_start: usize, old: &str, new: &str) -> Hunk {
        Hunk {
            old_start,
            old_count: 1,
            new_start: old_start,
            new_count: 1,
            operations: vec![
                Op::Remove(DiffLine {
                    content: old.to_string(),
                    ending: Some(LineEnding::Lf),
                }),
                Op::Add(DiffLine {
                    content: new.to_string(),
                    ending: Some(LineEnding::Lf),
                }),
            ],
            has_no_newline_marker: false,
            heading: None,
            corrected_counts: false,
            defect: None,
        }
    }

    #[test]
    fn overlapping_hunks_after_sort_fail_the_later_one() {
        let file = src(&["a", "b", "c", "d"]);
        let h1 = Hunk {
            old_start: 1,
            old_count: 2,
            new_start: 1,
            new_count: 1,
            operations: vec![
                Op::Remove(DiffLine {
                    content: "a".to_string(),
                    ending: Some(LineEnding::Lf),
                }),
                Op::Remove(DiffLine {
                    content: "b".to_string(),
                    ending: Some(LineEnding::Lf),
                }),
                Op::Add(DiffLine {
                    content: "AB".to_string(),
                    ending: Some(LineEnding::Lf),
                }),
            ],
            has_no_newline_marker: false,
            heading: None,
            corrected_counts: false,
            defect: None,
        };
        let h2 = simple_hunk(2, "b", "B");
        let out = orchestrate(&file, &[h1, h2], &ApplyOptions::default());
        assert!(matches!(out.reports[0].status, HunkStatus::Applied { .. }));
        assert!(matches!(
            out.reports[1].status,
            HunkStatus::Failed {
                reason: FailureReason::Overlap
            }
        ));
    }

    #[test]
    fn misordered_hunks_are_sorted_before_placement() {
        let file = src(&["a", "b", "c", "d"]);
        let first = simple_hunk(3, "c", "C");
        let second = simple_hunk(1, "a", "A");
        let out = orchestrate(&file, &[first, second], &ApplyOptions::default());
        assert!(matches!(out.reports[0].status, HunkStatus::Applied { .. }));
        assert!(matches!(out.reports[1].status, HunkStatus::Applied { .. }));
        assert_eq!(out.accepted[0].1.anchor, 0);
        assert_eq!(out.accepted[1].1.anchor, 2);
    }

    #[test]
    fn defect_hunk_fails_immediately_without_touching_placement() {
        let file = src(&["a", "b"]);
        let mut h = simple_hunk(1, "a", "A");
        h.defect = Some(HunkDefect::CountMismatch);
        let out = orchestrate(&file, &[h], &ApplyOptions::default());
        assert!(matches!(
            out.reports[0].status,
            HunkStatus::Failed {
                reason: FailureReason::CountMismatch
            }
        ));
        assert!(out.accepted.is_empty());
    }

    #[test]
    fn false_positive_rule_recovers_a_hunk_that_cannot_place_but_is_already_applied() {
        // "A" (the hunk's post-image) sits far outside the narrow search
        // window, so place() itself must fail before the orchestrator's
        // unbounded full-file rescue has a chance to recover the hunk.
        let file = src(&["x", "y", "z", "w", "v", "A"]);
        let mut h = simple_hunk(1, "gone", "A");
        h.old_start = 1;
        h.old_count = 1;
        let options = ApplyOptions {
            max_search_window: 1,
            ..ApplyOptions::default()
        };
        let out = orchestrate(&file, std::slice::from_ref(&h), &options);
        assert!(matches!(out.reports[0].status, HunkStatus::AlreadyApplied));
    }
}
