//! Text normalizer (component A): the family of cumulative transforms that
//! define the six equivalence levels used throughout placement.
//!
//! Level 0 is the identity transform (compared as decoded text, which for
//! well-formed UTF-8 input is byte-exact). Each higher level applies one more
//! normalization on top of the previous level's output, which is what makes
//! the family monotone: two lines equal at level *k* are still equal at every
//! level above it, since the extra transform is a pure function of the
//! already-equal intermediate string.

const INVISIBLE_CODEPOINTS: [char; 4] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

/// Highest meaningful level; levels above this repeat the level-5 transform.
pub const MAX_LEVEL: u8 = 5;

/// CRLF/CR -> LF.
pub fn normalize_line_endings(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    out
}

/// Tabs expand to four spaces, runs of spaces collapse to one, and leading
/// and trailing whitespace is trimmed. Operates on a single line's content;
/// callers never pass embedded newlines through this function.
pub fn normalize_whitespace(s: &str) -> String {
    let expanded = s.replace('\t', "    ");
    collapse_spaces(expanded.trim())
}

fn collapse_spaces(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for c in s.chars() {
        if c == ' ' {
            if !prev_space {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
    }
    out
}

/// Unescapes the fixed set `\n \r \t \" \' \\` with a single left-to-right
/// scan, so a literal `\\n` in the source is never misread as two separate
/// escapes. Unknown escape sequences are left untouched.
pub fn normalize_escape_sequences(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('n') => {
                out.push('\n');
                chars.next();
            }
            Some('r') => {
                out.push('\r');
                chars.next();
            }
            Some('t') => {
                out.push('\t');
                chars.next();
            }
            Some('"') => {
                out.push('"');
                chars.next();
            }
            Some('\'') => {
                out.push('\'');
                chars.next();
            }
            Some('\\') => {
                out.push('\\');
                chars.next();
            }
            _ => out.push('\\'),
        }
    }
    out
}

/// Drops zero-width/BOM codepoints and control characters (other than tab,
/// newline, and carriage return) that are invisible to a human diff reviewer
/// but defeat byte-exact comparison.
pub fn strip_invisible(s: &str) -> String {
    s.chars()
        .filter(|c| !INVISIBLE_CODEPOINTS.contains(c))
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

/// Removes every Unicode whitespace codepoint. This is the loosest
/// equivalence level and is only used by the fuzzy and difflib-rescue
/// strategies to score line similarity, never to accept a match outright.
pub fn remove_all_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Applies the cumulative transform chain for `level` (clamped to
/// `0..=MAX_LEVEL`) and returns the comparison key for `line`.
pub fn equivalence_key(line: &str, level: u8) -> String {
    let level = level.min(MAX_LEVEL);
    let mut s = line.to_string();
    if level >= 1 {
        s = normalize_line_endings(&s);
    }
    if level >= 2 {
        s = normalize_whitespace(&s);
    }
    if level >= 3 {
        s = normalize_escape_sequences(&s);
    }
    if level >= 4 {
        s = strip_invisible(&s);
    }
    if level >= 5 {
        s = remove_all_whitespace(&s);
    }
    s
}

/// True if `a` and `b` are equivalent at the given level.
pub fn lines_equal(a: &str, b: &str, level: u8) -> bool {
    equivalence_key(a, level) == equivalence_key(b, level)
}
