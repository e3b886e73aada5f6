//! Hunk placer (component C): the escalating ladder of matching strategies
//! that locates where a hunk's old block actually lives in the current file.
//!
//! Strategies run in order from strictest to loosest. The first one that
//! accepts wins; a strategy that finds more than one equally-close candidate
//! reports `NoMatchReason::Ambiguous`, which stops the ladder immediately —
//! looser matching only ever widens a tie, it never resolves one.

use crate::model::{ApplyOptions, EquivalenceClass, Hunk, NoMatchReason, Op, Placement, SourceLine, Strategy};
use crate::normalize::{equivalence_key, lines_equal, MAX_LEVEL};

/// Finds where `hunk` applies against `file` in its current state.
pub fn place(file: &[SourceLine], hunk: &Hunk, options: &ApplyOptions) -> Result<Placement, NoMatchReason> {
    if hunk.old_count == 0 {
        return place_pure_insert(file, hunk);
    }

    let window = window_size(hunk.old_count, options.max_search_window);

    if options.detect_already_applied && already_applied_at_declared(file, hunk, window) {
        return Ok(Placement {
            anchor: hunk.declared_anchor().min(file.len()),
            strategy: Strategy::AlreadyApplied,
            confidence: 1.0,
            equivalence_class: EquivalenceClass::Exact,
            indentation_flagged: false,
        });
    }

    if let Some(p) = strategy_exact_offset(file, hunk) {
        return Ok(finish(file, hunk, p));
    }

    for (level, strategy, confidence, class) in [
        (0u8, Strategy::ExactWindow, 0.95, EquivalenceClass::Exact),
        (2u8, Strategy::WhitespaceTolerant, 0.85, EquivalenceClass::WhitespaceEquivalent),
        (3u8, Strategy::EscapeTolerant, 0.75, EquivalenceClass::EscapeEquivalent),
        (4u8, Strategy::InvisibleTolerant, 0.70, EquivalenceClass::InvisibleEquivalent),
    ] {
        if let Some(p) = tolerant_strategy(file, hunk, level, window, strategy, confidence, class)? {
            return Ok(finish(file, hunk, p));
        }
    }

    if let Some(p) = strategy_fuzzy(file, hunk, window, options.fuzzy_min_score, options.fuzzy_margin) {
        return Ok(finish(file, hunk, p));
    }

    if let Some(p) = strategy_difflib_rescue(file, hunk, window, 0.70) {
        return Ok(finish(file, hunk, p));
    }

    Err(NoMatchReason::NoCandidate)
}

fn place_pure_insert(file: &[SourceLine], hunk: &Hunk) -> Result<Placement, NoMatchReason> {
    let naive = hunk.declared_anchor();
    let anchor = if naive == file.len() + 1 { file.len() } else { naive };
    if anchor <= file.len() {
        Ok(Placement {
            anchor,
            strategy: Strategy::ExactOffset,
            confidence: 1.0,
            equivalence_class: EquivalenceClass::Exact,
            indentation_flagged: false,
        })
    } else {
        Err(NoMatchReason::NoCandidate)
    }
}

fn finish(file: &[SourceLine], hunk: &Hunk, mut p: Placement) -> Placement {
    apply_indentation_check(file, hunk, &mut p);
    p
}

fn window_size(old_count: usize, max_search_window: usize) -> usize {
    max_search_window.min(old_count.saturating_mul(2).max(20))
}

fn window_bounds(file_len: usize, anchor: usize, block_len: usize, window: usize) -> Option<(usize, usize)> {
    if block_len > file_len {
        return None;
    }
    let max_start = file_len - block_len;
    let lo = anchor.saturating_sub(window);
    let hi = (anchor + window).min(max_start);
    if lo > hi {
        None
    } else {
        Some((lo, hi))
    }
}

fn block_matches_at(file: &[SourceLine], pos: usize, block: &[&str], level: u8) -> bool {
    if pos + block.len() > file.len() {
        return false;
    }
    block
        .iter()
        .enumerate()
        .all(|(i, expected)| equivalence_key(&file[pos + i].text(), level) == equivalence_key(expected, level))
}

/// Checks whether `hunk.new_block` is already present at the declared
/// anchor (byte-exact) or anywhere within the window (whitespace-tolerant).
/// Run before any strategy; a match here means the hunk is a no-op.
fn already_applied_at_declared(file: &[SourceLine], hunk: &Hunk, window: usize) -> bool {
    let new_block = hunk.new_block();
    if new_block.is_empty() {
        return false;
    }
    let anchor = hunk.declared_anchor();
    if block_matches_at(file, anchor, &new_block, 0) {
        return true;
    }
    let Some((lo, hi)) = window_bounds(file.len(), anchor, new_block.len(), window) else {
        return false;
    };
    (lo..=hi).any(|pos| block_matches_at(file, pos, &new_block, 2))
}

enum ScanOutcome {
    Found(usize),
    Ambiguous,
    None,
}

/// Scans `[lo, hi]` for positions matching `is_match`, preferring the
/// candidate closest to `anchor`. A genuine tie at the minimum distance is
/// reported as ambiguous rather than arbitrarily broken.
fn scan_unique(
    file: &[SourceLine],
    anchor: usize,
    block_len: usize,
    window: usize,
    is_match: impl Fn(usize) -> bool,
) -> ScanOutcome {
    let Some((lo, hi)) = window_bounds(file.len(), anchor, block_len, window) else {
        return ScanOutcome::None;
    };
    let mut best: Option<usize> = None; // distance
    let mut best_pos = 0usize;
    let mut ties = 0usize;
    for pos in lo..=hi {
        if !is_match(pos) {
            continue;
        }
        let dist = pos.abs_diff(anchor);
        match best {
            None => {
                best = Some(dist);
                best_pos = pos;
                ties = 1;
            }
            Some(bd) if dist < bd => {
                best = Some(dist);
                best_pos = pos;
                ties = 1;
            }
            Some(bd) if dist == bd => {
                ties += 1;
            }
            _ => {}
        }
    }
    match best {
        None => ScanOutcome::None,
        Some(_) if ties == 1 => ScanOutcome::Found(best_pos),
        Some(_) => ScanOutcome::Ambiguous,
    }
}

fn strategy_exact_offset(file: &[SourceLine], hunk: &Hunk) -> Option<Placement> {
    let old_block = hunk.old_block();
    let anchor = hunk.declared_anchor();
    if block_matches_at(file, anchor, &old_block, 0) {
        Some(Placement {
            anchor,
            strategy: Strategy::ExactOffset,
            confidence: 1.0,
            equivalence_class: EquivalenceClass::Exact,
            indentation_flagged: false,
        })
    } else {
        None
    }
}

fn tolerant_strategy(
    file: &[SourceLine],
    hunk: &Hunk,
    level: u8,
    window: usize,
    strategy: Strategy,
    confidence: f64,
    equivalence_class: EquivalenceClass,
) -> Result<Option<Placement>, NoMatchReason> {
    let old_block = hunk.old_block();
    let anchor = hunk.declared_anchor();
    match scan_unique(file, anchor, old_block.len(), window, |pos| {
        block_matches_at(file, pos, &old_block, level)
    }) {
        ScanOutcome::Found(pos) => Ok(Some(Placement {
            anchor: pos,
            strategy,
            confidence,
            equivalence_class,
            indentation_flagged: false,
        })),
        ScanOutcome::Ambiguous => Err(NoMatchReason::Ambiguous),
        ScanOutcome::None => Ok(None),
    }
}

/// True if `a` and `b` are equal at the loosest equivalence level (level 5,
/// all whitespace removed). This is the exact boolean test the fuzzy
/// strategy's score is defined over: "(matched lines at level 5) /
/// old_count", with no similarity fuzz folded in before the ratio.
fn line_close_enough(a: &str, b: &str) -> bool {
    lines_equal(a, b, MAX_LEVEL)
}

/// Looser than [`line_close_enough`]: also accepts lines that are merely
/// similar by normalized Levenshtein distance. Used only by the difflib-
/// rescue strategy's subsequence search, where the goal is coverage of a
/// last-resort candidate rather than a calibrated score — see
/// `longest_common_subsequence`.
fn line_similar_enough(a: &str, b: &str) -> bool {
    if line_close_enough(a, b) {
        return true;
    }
    let ka = equivalence_key(a, MAX_LEVEL);
    let kb = equivalence_key(b, MAX_LEVEL);
    strsim::normalized_levenshtein(&ka, &kb) >= 0.85
}

fn line_match_ratio(file: &[SourceLine], pos: usize, block: &[&str]) -> f64 {
    if pos + block.len() > file.len() {
        return 0.0;
    }
    let matched = block
        .iter()
        .enumerate()
        .filter(|(i, expected)| line_close_enough(&file[pos + i].text(), expected))
        .count();
    matched as f64 / block.len() as f64
}

fn strategy_fuzzy(
    file: &[SourceLine],
    hunk: &Hunk,
    window: usize,
    min_score: f64,
    margin: f64,
) -> Option<Placement> {
    let old_block = hunk.old_block();
    let (lo, hi) = window_bounds(file.len(), hunk.declared_anchor(), old_block.len(), window)?;
    let mut scored: Vec<(usize, f64)> = (lo..=hi).map(|pos| (pos, line_match_ratio(file, pos, &old_block))).collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
    let (pos, score) = *scored.first()?;
    let runner_up = scored.get(1).map(|x| x.1).unwrap_or(0.0);
    if score >= min_score && (score - runner_up) >= margin {
        Some(Placement {
            anchor: pos,
            strategy: Strategy::Fuzzy,
            confidence: 0.5 * score,
            equivalence_class: EquivalenceClass::Fuzzy,
            indentation_flagged: false,
        })
    } else {
        None
    }
}

/// Longest ordered subsequence of `a` found inside `b`, matching lines with
/// [`line_similar_enough`]. A difflib-style last resort: rather than
/// requiring a contiguous block match, it asks how much of the hunk's old
/// content can still be found, in order, within a same-length window.
fn longest_common_subsequence(a: &[&str], b: &[String]) -> usize {
    let (n, m) = (a.len(), b.len());
    let mut dp = vec![vec![0usize; m + 1]; n + 1];
    for i in 1..=n {
        for j in 1..=m {
            dp[i][j] = if line_similar_enough(a[i - 1], &b[j - 1]) {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }
    dp[n][m]
}

fn strategy_difflib_rescue(file: &[SourceLine], hunk: &Hunk, window: usize, min_coverage: f64) -> Option<Placement> {
    let old_block = hunk.old_block();
    let (lo, hi) = window_bounds(file.len(), hunk.declared_anchor(), old_block.len(), window)?;
    let mut best: Option<(usize, f64)> = None;
    for pos in lo..=hi {
        let slice: Vec<String> = file[pos..pos + old_block.len()].iter().map(|l| l.text().into_owned()).collect();
        let coverage = longest_common_subsequence(&old_block, &slice) as f64 / old_block.len() as f64;
        let better = match best {
            Some((_, b)) => coverage > b,
            None => true,
        };
        if better {
            best = Some((pos, coverage));
        }
    }
    let (pos, coverage) = best?;
    if coverage >= min_coverage {
        Some(Placement {
            anchor: pos,
            strategy: Strategy::DifflibRescue,
            confidence: 0.40,
            equivalence_class: EquivalenceClass::Fuzzy,
            indentation_flagged: false,
        })
    } else {
        None
    }
}

fn leading_ws_len(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

/// Downgrades confidence when the indentation delta between the file and
/// the hunk's leading context line disagrees with the delta on the trailing
/// context line — a common symptom of a hunk landing one indent level off.
fn apply_indentation_check(file: &[SourceLine], hunk: &Hunk, placement: &mut Placement) {
    let first_is_context = matches!(hunk.operations.first(), Some(Op::Context(_)));
    let last_is_context = matches!(hunk.operations.last(), Some(Op::Context(_)));
    if !first_is_context || !last_is_context {
        return;
    }
    let old_block = hunk.old_block();
    if old_block.len() < 2 || placement.anchor + old_block.len() > file.len() {
        return;
    }
    let first_file = file[placement.anchor].text();
    let last_file = file[placement.anchor + old_block.len() - 1].text();
    let first_delta = leading_ws_len(&first_file) as isize - leading_ws_len(old_block[0]) as isize;
    let last_delta =
        leading_ws_len(&last_file) as isize - leading_ws_len(old_block[old_block.len() - 1]) as isize;
    if first_delta != last_delta {
        placement.indentation_flagged = true;
        placement.confidence = (placement.confidence - 0.10).max(0.0);
    }
}
