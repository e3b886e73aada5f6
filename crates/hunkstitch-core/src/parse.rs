//! Diff parser (component B): turns unified-diff text into a sequence of
//! `Hunk`s for a single file. Preamble lines (`diff --git ...`, `index ...`,
//! the `---`/`+++` filename lines) are skipped, never inspected structurally
//! — renames and mode changes are out of scope.

use crate::error::{ParseError, ParseErrorKind};
use crate::model::{DiffLine, Hunk, HunkDefect, LineEnding, Op};

/// The hunks belonging to one file section of a multi-file diff.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDiff {
    pub hunks: Vec<Hunk>,
}

struct DiffLines<'a> {
    raw: Vec<(&'a str, Option<LineEnding>)>,
    pos: usize,
}

impl<'a> DiffLines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            raw: split_lines(text),
            pos: 0,
        }
    }

    fn line_number(&self) -> usize {
        self.pos + 1
    }

    fn peek(&self) -> Option<(&'a str, Option<LineEnding>)> {
        self.raw.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<(&'a str, Option<LineEnding>)> {
        let item = self.peek();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn at_end(&self) -> bool {
        self.pos >= self.raw.len()
    }
}

fn split_lines(text: &str) -> Vec<(&str, Option<LineEnding>)> {
    let mut out = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        if let Some(idx) = rest.find('\n') {
            let (line, after) = rest.split_at(idx);
            let after = &after[1..];
            if let Some(stripped) = line.strip_suffix('\r') {
                out.push((stripped, Some(LineEnding::CrLf)));
            } else {
                out.push((line, Some(LineEnding::Lf)));
            }
            rest = after;
        } else {
            out.push((rest, None));
            rest = "";
        }
    }
    out
}

/// Parses the hunks of the first (or only) file in `diff`. Misordered hunks
/// are accepted here — the orchestrator sorts and overlap-checks them; a
/// parse-time order check would only duplicate that work and reject diffs
/// the orchestrator is specifically built to tolerate.
pub fn parse(diff: &str, strict: bool) -> Result<Vec<Hunk>, ParseError> {
    let mut lines = DiffLines::new(diff);
    skip_preamble(&mut lines);
    skip_file_headers(&mut lines);
    let hunks = parse_hunks(&mut lines, strict)?;
    if hunks.is_empty() {
        return Err(ParseError::new(
            ParseErrorKind::EmptyDiff,
            lines.line_number(),
            "no @@ hunks found",
        ));
    }
    Ok(hunks)
}

/// Parses every file section of a (possibly multi-file) diff.
pub fn parse_multi(diff: &str, strict: bool) -> Result<Vec<FileDiff>, ParseError> {
    let mut lines = DiffLines::new(diff);
    let mut files = Vec::new();
    loop {
        skip_preamble(&mut lines);
        if lines.at_end() {
            break;
        }
        skip_file_headers(&mut lines);
        let hunks = parse_hunks(&mut lines, strict)?;
        if hunks.is_empty() {
            break;
        }
        files.push(FileDiff { hunks });
    }
    if files.is_empty() {
        return Err(ParseError::new(ParseErrorKind::EmptyDiff, 1, "no @@ hunks found"));
    }
    Ok(files)
}

fn skip_preamble(lines: &mut DiffLines) {
    while let Some((l, _)) = lines.peek() {
        if l.starts_with("--- ") || l.starts_with("+++ ") || l.starts_with("@@ ") {
            break;
        }
        lines.next();
    }
}

fn skip_file_headers(lines: &mut DiffLines) {
    if matches!(lines.peek(), Some((l, _)) if l.starts_with("--- ")) {
        lines.next();
    }
    if matches!(lines.peek(), Some((l, _)) if l.starts_with("+++ ")) {
        lines.next();
    }
}

fn parse_hunks(lines: &mut DiffLines, strict: bool) -> Result<Vec<Hunk>, ParseError> {
    let mut hunks = Vec::new();
    while matches!(lines.peek(), Some((l, _)) if l.starts_with("@@ ")) {
        hunks.push(parse_hunk(lines, strict)?);
    }
    Ok(hunks)
}

fn parse_hunk(lines: &mut DiffLines, strict: bool) -> Result<Hunk, ParseError> {
    let header_line_no = lines.line_number();
    let (header, _) = lines.next().expect("caller checked for @@ prefix");
    let (old_start, old_declared, new_start, new_declared, heading) = parse_header(header, header_line_no)?;

    let body = parse_body(lines, old_declared, new_declared, strict)?;

    let mismatched = body.old_seen != old_declared || body.new_seen != new_declared;
    let (corrected_counts, defect, old_count, new_count) = if !mismatched {
        (false, None, old_declared, new_declared)
    } else if strict {
        (false, Some(HunkDefect::CountMismatch), old_declared, new_declared)
    } else {
        (true, None, body.old_seen, body.new_seen)
    };

    Ok(Hunk {
        old_start,
        old_count,
        new_start,
        new_count,
        operations: body.ops,
        has_no_newline_marker: body.has_no_newline_marker,
        heading,
        corrected_counts,
        defect,
    })
}

fn parse_header(
    line: &str,
    line_no: usize,
) -> Result<(usize, usize, usize, usize, Option<String>), ParseError> {
    let malformed = || ParseError::new(ParseErrorKind::MalformedHeader, line_no, line);

    let rest = line.strip_prefix("@@ ").ok_or_else(malformed)?;
    let close = rest.find(" @@").ok_or_else(malformed)?;
    let ranges = &rest[..close];
    let heading = rest[close + 3..].trim_start();
    let heading = if heading.is_empty() {
        None
    } else {
        Some(heading.to_string())
    };

    let mut parts = ranges.split_whitespace();
    let old = parts.next().ok_or_else(malformed)?;
    let new = parts.next().ok_or_else(malformed)?;
    let (old_start, old_count) = parse_range(old, '-', line_no, line)?;
    let (new_start, new_count) = parse_range(new, '+', line_no, line)?;
    Ok((old_start, old_count, new_start, new_count, heading))
}

fn parse_range(s: &str, sign: char, line_no: usize, full_line: &str) -> Result<(usize, usize), ParseError> {
    let malformed = || ParseError::new(ParseErrorKind::MalformedHeader, line_no, full_line);
    let body = s.strip_prefix(sign).ok_or_else(malformed)?;
    if let Some((start, count)) = body.split_once(',') {
        let start: usize = start.parse().map_err(|_| malformed())?;
        let count: usize = count.parse().map_err(|_| malformed())?;
        Ok((start, count))
    } else {
        let start: usize = body.parse().map_err(|_| malformed())?;
        Ok((start, 1))
    }
}

struct Body {
    ops: Vec<Op>,
    old_seen: usize,
    new_seen: usize,
    has_no_newline_marker: bool,
}

fn parse_body(
    lines: &mut DiffLines,
    old_declared: usize,
    new_declared: usize,
    strict: bool,
) -> Result<Body, ParseError> {
    let mut ops = Vec::new();
    let mut old_seen = 0usize;
    let mut new_seen = 0usize;
    let mut has_no_newline_marker = false;

    loop {
        let Some((content, ending)) = lines.peek() else {
            break;
        };
        if content.starts_with("@@ ") || content.starts_with("--- ") || content.starts_with("+++ ") {
            break;
        }
        if content.is_empty() {
            lines.next();
            ops.push(Op::Context(DiffLine {
                content: String::new(),
                ending,
            }));
            old_seen += 1;
            new_seen += 1;
            continue;
        }
        match content.as_bytes()[0] {
            b' ' => {
                lines.next();
                ops.push(Op::Context(DiffLine {
                    content: content[1..].to_string(),
                    ending,
                }));
                old_seen += 1;
                new_seen += 1;
            }
            b'-' => {
                lines.next();
                ops.push(Op::Remove(DiffLine {
                    content: content[1..].to_string(),
                    ending,
                }));
                old_seen += 1;
            }
            b'+' => {
                lines.next();
                ops.push(Op::Add(DiffLine {
                    content: content[1..].to_string(),
                    ending,
                }));
                new_seen += 1;
            }
            b'\\' => {
                lines.next();
                has_no_newline_marker = true;
                if let Some(last) = ops.last_mut() {
                    let dl = match last {
                        Op::Context(l) | Op::Remove(l) | Op::Add(l) => l,
                    };
                    dl.ending = None;
                }
            }
            _ => {
                if strict && (old_seen < old_declared || new_seen < new_declared) {
                    return Err(ParseError::new(
                        ParseErrorKind::UnknownPrefix,
                        lines.line_number(),
                        content,
                    ));
                }
                break;
            }
        }
    }

    if ops.is_empty() {
        return Err(ParseError::new(
            ParseErrorKind::TruncatedHunk,
            lines.line_number(),
            "hunk has no body lines",
        ));
    }

    Ok(Body {
        ops,
        old_seen,
        new_seen,
        has_no_newline_marker,
    })
}
