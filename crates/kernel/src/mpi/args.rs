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

//! Splitting a call's argument list.

pub const LEAD_CHAR: u8 = b'{';
pub const ARG_START: u8 = b':';
pub const ARG_SEP: u8 = b',';
pub const ARG_END: u8 = b'}';
pub const LIT_CHAR: u8 = b'`';
pub const ESCAPE_CHAR: u8 = b'\\';

/// The raw (unevaluated) arguments of one call, and how much input they spanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitArgs {
    pub args: Vec<String>,
    /// Bytes consumed, including the closing brace.
    pub consumed: usize,
}

/// Split the text following a call's `:` into at most `max_args` arguments.
///
/// Nested calls and backquoted text are kept whole, and escapes are passed through untouched.
/// Once the last permitted argument is reached, further separators stay part of it. Returns
/// `None` if the input runs out before the closing brace.
pub fn split_args(text: &str, max_args: usize) -> Option<SplitArgs> {
    let bytes = text.as_bytes();
    let mut args = vec![];
    let mut start = 0;
    let mut depth = 0usize;
    let mut literal = false;
    let mut r = 0;
    while r < bytes.len() {
        match bytes[r] {
            ESCAPE_CHAR => {
                r += 2;
                continue;
            }
            LIT_CHAR => literal = !literal,
            LEAD_CHAR if !literal => depth += 1,
            ARG_END if !literal => {
                if depth == 0 {
                    args.push(text[start..r].to_string());
                    return Some(SplitArgs {
                        args,
                        consumed: r + 1,
                    });
                }
                depth -= 1;
            }
            ARG_SEP if !literal && depth == 0 && args.len() + 1 < max_args => {
                args.push(text[start..r].to_string());
                start = r + 1;
            }
            _ => {}
        }
        r += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("a,b,c}rest", 9, &["a", "b", "c"], 6 ; "simple")]
    #[test_case("{add:1,2},x}", 9, &["{add:1,2}", "x"], 12 ; "nested call")]
    #[test_case("`a,b`,c}", 9, &["`a,b`", "c"], 8 ; "backquoted")]
    #[test_case("a\\,b,c}", 9, &["a\\,b", "c"], 7 ; "escaped separator")]
    #[test_case("a,b,c,d}", 2, &["a", "b,c,d"], 8 ; "argument limit")]
    #[test_case("}", 9, &[""], 1 ; "one empty argument")]
    fn test_split(text: &str, max: usize, expected: &[&str], consumed: usize) {
        let result = split_args(text, max).unwrap();
        assert_eq!(result.args, expected.to_vec());
        assert_eq!(result.consumed, consumed);
    }

    #[test]
    fn test_unterminated() {
        assert_eq!(split_args("a,{b}", 9), None);
        assert_eq!(split_args("a\\}", 9), None);
        assert_eq!(split_args("", 9), None);
    }

    #[test]
    fn test_rejoin_is_stable() {
        let items = ["alpha", "beta", "gamma"];
        let joined = format!("{}}}", items.join(","));
        assert_eq!(split_args(&joined, 9).unwrap().args, items.to_vec());
    }
}
