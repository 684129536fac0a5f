// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Text helpers shared by the evaluator and the builtins: MUCK-style number parsing and truth,
//! debug escaping, and the `smatch` wildcard matcher.

use std::cmp::Ordering;

/// The carriage return that separates lines and list items.
pub const CR: char = '\r';
/// ANSI escape, written `\[` in MPI source.
pub const ESC: char = '\x1b';

/// Parse a leading integer the way C's `atoi` does: optional whitespace and sign, then as many
/// digits as there are. Anything unparseable is zero; overflow wraps.
pub fn atoi(s: &str) -> i32 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut n: i32 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        n = n.wrapping_mul(10).wrapping_add((b - b'0') as i32);
    }
    if negative { n.wrapping_neg() } else { n }
}

/// True if the whole string (after leading whitespace and an optional sign) is digits.
pub fn is_number(s: &str) -> bool {
    let s = s.trim_start();
    let s = s.strip_prefix(['+', '-']).unwrap_or(s);
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// MPI truth: empty text and numeric zero are false, everything else is true.
pub fn truestr(s: &str) -> bool {
    let s = s.trim_start();
    !(s.is_empty() || (is_number(s) && atoi(s) == 0))
}

pub fn bool_str(b: bool) -> String {
    if b { "1" } else { "0" }.to_string()
}

/// Trim leading and trailing spaces (spaces only, not other whitespace).
pub fn strip_spaces(s: &str) -> &str {
    s.trim_matches(' ')
}

/// Compare as numbers when both sides are non-empty numbers, otherwise case-insensitively.
pub fn msg_compare(a: &str, b: &str) -> Ordering {
    if !a.is_empty() && !b.is_empty() && is_number(a) && is_number(b) {
        atoi(a).cmp(&atoi(b))
    } else {
        a.bytes()
            .map(|c| c.to_ascii_lowercase())
            .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
    }
}

/// Make control characters visible for debug output, stopping after roughly `limit` bytes.
/// Returns the escaped text and whether it was cut short.
pub fn cr2slash(s: &str, limit: usize) -> (String, bool) {
    let mut out = String::with_capacity(s.len().min(limit));
    for c in s.chars() {
        if out.len() >= limit.saturating_sub(3) {
            return (out, true);
        }
        match c {
            CR => out.push_str("\\r"),
            ESC => out.push_str("\\["),
            '`' => out.push_str("\\`"),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    (out, false)
}

/// Truncate `s` in place to at most `limit` bytes, on a character boundary.
pub fn truncate_to(s: &mut String, limit: usize) {
    if s.len() > limit {
        let mut cut = limit;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
    }
}

fn at(b: &[u8], i: usize) -> u8 {
    b.get(i).copied().unwrap_or(0)
}

fn lower(c: u8) -> u8 {
    c.to_ascii_lowercase()
}

/// Position of the first unescaped `c`.
fn find_unescaped(pat: &[u8], c: u8) -> Option<usize> {
    let mut i = 0;
    while i < pat.len() {
        if pat[i] == c {
            return Some(i);
        }
        if pat[i] == b'\\' {
            i += 1;
        }
        if i < pat.len() {
            i += 1;
        }
    }
    None
}

/// Whether the `[...]` character class `set` rejects `c`.
fn class_rejects(set: &[u8], c: u8) -> bool {
    if c == 0 {
        return true;
    }
    let c = lower(c);
    let mut i = 0;
    let negate = at(set, 0) == b'^';
    if negate {
        i += 1;
    }
    if at(set, i) == b'-' {
        if c == b'-' {
            return negate;
        }
        i += 1;
    }
    while i < set.len() {
        if set[i] == b'\\' && i + 1 < set.len() {
            i += 1;
        }
        if set[i] == b'-' && i > 0 {
            let (start, end) = (set[i - 1], at(set, i + 1));
            if start > end {
                if c == b'-' {
                    return negate;
                }
                i += 1;
            } else {
                if (start..=end).any(|r| lower(r) == c) {
                    return negate;
                }
                i += 2;
            }
        } else {
            if lower(set[i]) == c {
                return negate;
            }
            i += 1;
        }
    }
    !negate
}

/// Match the word at the start of `text` against `|`-separated alternatives. Returns whether
/// one matched and how many bytes the word spans.
fn word_match(alternatives: &[u8], text: &[u8]) -> (bool, usize) {
    let word_len = text.iter().position(|&c| c == b' ').unwrap_or(text.len());
    let word = &text[..word_len];
    let mut rest = alternatives;
    loop {
        let (alt, next) = match find_unescaped(rest, b'|') {
            Some(bar) => (&rest[..bar], Some(&rest[bar + 1..])),
            None => (rest, None),
        };
        if smatch_bytes(alt, word) {
            return (true, word_len);
        }
        match next {
            Some(n) => rest = n,
            None => return (false, word_len),
        }
    }
}

fn smatch_bytes(pat: &[u8], text: &[u8]) -> bool {
    let (mut p, mut s) = (0usize, 0usize);
    while p < pat.len() {
        match pat[p] {
            b'\\' => {
                if p + 1 >= pat.len() || lower(pat[p + 1]) != lower(at(text, s)) {
                    return false;
                }
                p += 2;
                s += 1;
            }
            b'?' => {
                if s >= text.len() {
                    return false;
                }
                p += 1;
                s += 1;
            }
            b'*' => {
                loop {
                    match at(pat, p) {
                        b'*' => p += 1,
                        b'?' if s < text.len() => {
                            p += 1;
                            s += 1;
                        }
                        _ => break,
                    }
                }
                if at(pat, p) == b'?' {
                    return false;
                }
                let rest = &pat[p..];
                match at(pat, p) {
                    b'{' => {
                        if s == 0 && smatch_bytes(rest, text) {
                            return true;
                        }
                        let mut pos = s;
                        while let Some(off) = text[pos..].iter().position(|&c| c == b' ') {
                            pos += off + 1;
                            if smatch_bytes(rest, &text[pos..]) {
                                return true;
                            }
                        }
                        return false;
                    }
                    b'[' => {
                        return (s..text.len()).any(|pos| smatch_bytes(rest, &text[pos..]));
                    }
                    _ => {}
                }
                let anchor = if at(pat, p) == b'\\' && p + 1 < pat.len() {
                    pat[p + 1]
                } else {
                    at(pat, p)
                };
                if anchor == 0 {
                    return true;
                }
                let anchor = lower(anchor);
                return (s..text.len())
                    .filter(|&pos| lower(text[pos]) == anchor)
                    .any(|pos| smatch_bytes(rest, &text[pos..]));
            }
            b'[' => {
                let Some(end) = find_unescaped(&pat[p..], b']') else {
                    return false;
                };
                if class_rejects(&pat[p + 1..p + end], at(text, s)) {
                    return false;
                }
                p += end + 1;
                s += 1;
            }
            b'{' => {
                if s != 0 && text[s - 1] != b' ' {
                    return false;
                }
                let negate = at(pat, p + 1) == b'^';
                let Some(end) = find_unescaped(&pat[p..], b'}') else {
                    return false;
                };
                let first = (p + 1 + negate as usize).min(p + end);
                let (matched, consumed) =
                    word_match(&pat[first..p + end], &text[s.min(text.len())..]);
                if matched == negate {
                    return false;
                }
                s += consumed;
                p += end + 1;
            }
            c => {
                if lower(c) != lower(at(text, s)) {
                    return false;
                }
                p += 1;
                s += 1;
            }
        }
    }
    s >= text.len()
}

/// Case-insensitive wildcard match of all of `text` against `pattern`.
///
/// `*` matches any run, `?` any one character, `[a-z]` (or `[^...]`) a character class, and
/// `{foo|bar}` (or `{^...}`) a whole word from a list. A backslash quotes the next character.
pub fn smatch(pattern: &str, text: &str) -> bool {
    smatch_bytes(pattern.as_bytes(), text.as_bytes())
}
