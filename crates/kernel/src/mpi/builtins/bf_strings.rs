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

use muckr_var::{AMBIGUOUS, HOME, NOTHING};

use crate::mpi::builtins::{BfCallState, BuiltinRegistry};
use crate::mpi::errors::{AbortKind, MpiError};
use crate::mpi::pronouns::pronoun_substitute;
use crate::mpi::resolve::{ResolveMode, Resolved, resolve};
use crate::mpi::strings::{atoi, smatch, strip_spaces, truncate_to};

const DEFAULT_FIELD_WIDTH: i32 = 78;

fn bf_strlen(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(bf_args.arg(0).len().to_string())
}

/// `{subst:text,old,new}`
fn bf_subst(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let (text, old, new) = (bf_args.arg(0), bf_args.arg(1), bf_args.arg(2));
    if old.is_empty() {
        return Ok(text.to_string());
    }
    let mut result = text.replace(old, new);
    truncate_to(&mut result, bf_args.limit());
    Ok(result)
}

fn bf_instr(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let (haystack, needle) = (bf_args.arg(0), bf_args.arg(1));
    if needle.is_empty() {
        return Err(bf_args.abort("Can't search for a null string."));
    }
    let needle = needle.as_bytes();
    let position = haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
        .map_or(0, |i| i + 1);
    Ok(position.to_string())
}

fn bf_midstr(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let chars: Vec<char> = bf_args.arg(0).chars().collect();
    let len = chars.len() as i32;
    let clamp = |pos: i32| -> Option<usize> {
        if pos == 0 {
            return None;
        }
        let mut pos = pos.min(len);
        if pos < 0 {
            pos += len + 1;
        }
        Some(pos.max(1) as usize)
    };
    let first = atoi(bf_args.arg(1));
    let last = if bf_args.argc() > 2 {
        atoi(bf_args.arg(2))
    } else {
        first
    };
    let (Some(first), Some(last)) = (clamp(first), clamp(last)) else {
        return Ok(String::new());
    };
    let pick = |i: usize| chars.get(i - 1).copied();
    let result = if last >= first {
        (first..=last).filter_map(pick).collect()
    } else {
        (last..=first).rev().filter_map(pick).collect()
    };
    Ok(result)
}

fn bf_toupper(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(bf_args.arg(0).to_ascii_uppercase())
}

fn bf_tolower(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(bf_args.arg(0).to_ascii_lowercase())
}

/// Field width and pad string for `left`, `right` and `center`.
fn field(bf_args: &BfCallState<'_, '_>) -> Result<(usize, Vec<char>), MpiError> {
    let width = if bf_args.argc() > 1 {
        atoi(bf_args.arg(1))
    } else {
        DEFAULT_FIELD_WIDTH
    };
    if width > bf_args.limit() as i32 {
        return Err(bf_args.abort("Fieldwidth too big."));
    }
    let pad = if bf_args.argc() > 2 { bf_args.arg(2) } else { " " };
    if pad.is_empty() {
        return Err(bf_args.abort("Null pad string."));
    }
    Ok((width.max(0) as usize, pad.chars().collect()))
}

/// `count` characters of `pad`, repeated from its start as often as needed.
fn padding(pad: &[char], count: usize) -> String {
    pad.iter().cycle().take(count).collect()
}

fn bf_left(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let (width, pad) = field(bf_args)?;
    let text = bf_args.arg(0);
    let fill = width.saturating_sub(text.chars().count());
    Ok(format!("{text}{}", padding(&pad, fill)))
}

fn bf_right(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let (width, pad) = field(bf_args)?;
    let text = bf_args.arg(0);
    let fill = width.saturating_sub(text.chars().count());
    Ok(format!("{}{text}", padding(&pad, fill)))
}

fn bf_center(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let (width, pad) = field(bf_args)?;
    let text = bf_args.arg(0);
    let text_len = text.chars().count();
    let lead = (width / 2).saturating_sub(text_len / 2);
    let mut result = padding(&pad, lead);
    result.push_str(text);
    let trail = width.saturating_sub(lead + text_len);
    result.push_str(&padding(&pad, trail));
    Ok(result)
}

fn bf_lit(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let mut result = bf_args.args.join(",");
    truncate_to(&mut result, bf_args.limit());
    Ok(result)
}

fn bf_strip(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(strip_spaces(bf_args.arg(0)).to_string())
}

/// `{smatch:text,pattern}`
fn bf_smatch(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let matched = smatch(bf_args.arg(1), bf_args.arg(0));
    Ok(if matched { "1" } else { "0" }.to_string())
}

/// Quote text so that evaluating the result gives the text back.
fn bf_escape(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let limit = bf_args.limit();
    let mut result = String::from("`");
    for c in bf_args.arg(0).chars() {
        let needs_escape = c == '\\' || c == '`';
        if result.len() + c.len_utf8() + usize::from(needs_escape) >= limit {
            break;
        }
        if needs_escape {
            result.push('\\');
        }
        result.push(c);
    }
    result.push('`');
    Ok(result)
}

fn ansi_code(tag: &str) -> Option<&'static str> {
    let code = match tag.to_ascii_lowercase().as_str() {
        "reset" | "normal" => "0",
        "bold" => "1",
        "dim" => "2",
        "italic" => "3",
        "uline" | "underline" => "4",
        "flash" => "5",
        "reverse" => "7",
        "ostrike" | "overstrike" => "9",
        "black" => "30",
        "red" => "31",
        "green" => "32",
        "yellow" => "33",
        "blue" => "34",
        "magenta" => "35",
        "cyan" => "36",
        "white" => "37",
        "bg_black" => "40",
        "bg_red" => "41",
        "bg_green" => "42",
        "bg_yellow" => "43",
        "bg_blue" => "44",
        "bg_magenta" => "45",
        "bg_cyan" => "46",
        "bg_white" => "47",
        _ => return None,
    };
    Some(code)
}

const ANSI_RESET: &str = "\x1b[0m";

/// `{attr:tag,...,text}` wraps the text in the ANSI sequences for the tags, then a reset.
fn bf_attr(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let Some((text, tags)) = bf_args.args.split_last() else {
        return Ok(String::new());
    };
    let mut result = String::new();
    for tag in tags.iter().filter(|t| !t.is_empty()) {
        let Some(code) = ansi_code(tag) else {
            return Err(bf_args.abort(
                "Unrecognized ansi tag.  Try one of reset, bold, dim, italic, underline, \
                 reverse, overstrike, black, red, yellow, green, cyan, blue, magenta, white, \
                 bg_black, bg_red, bg_yellow, bg_green, bg_cyan, bg_blue, bg_magenta, or bg_white.",
            ));
        };
        result.push_str(&format!("\x1b[{code}m"));
    }
    let mut text = text.clone();
    truncate_to(
        &mut text,
        bf_args.limit().saturating_sub(result.len() + ANSI_RESET.len()),
    );
    result.push_str(&text);
    result.push_str(ANSI_RESET);
    Ok(result)
}

fn bf_pronouns(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let mut obj = bf_args.player();
    if bf_args.argc() > 1 {
        obj = match resolve(&*bf_args.ctx, &bf_args.frame, bf_args.arg(1), ResolveMode::Local) {
            Resolved::Found(o) if o != AMBIGUOUS && o != NOTHING && o != HOME => o,
            Resolved::Denied => {
                return Err(bf_args.abort_kind(AbortKind::Permission, "Permission Denied."));
            }
            _ => return Err(bf_args.abort_kind(AbortKind::Permission, "Match failed.")),
        };
    }
    let text = bf_args.arg(0).to_string();
    Ok(pronoun_substitute(&mut *bf_args.ctx, obj, &text))
}

fn bf_nl(_bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok("\r".to_string())
}

fn bf_tab(_bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok("\t".to_string())
}

pub(crate) fn register_bf_strings(builtins: &mut BuiltinRegistry) {
    builtins.register("strlen", bf_strlen);
    builtins.register("subst", bf_subst);
    builtins.register("instr", bf_instr);
    builtins.register("midstr", bf_midstr);
    builtins.register("toupper", bf_toupper);
    builtins.register("tolower", bf_tolower);
    builtins.register("left", bf_left);
    builtins.register("right", bf_right);
    builtins.register("center", bf_center);
    builtins.register("lit", bf_lit);
    builtins.register("strip", bf_strip);
    builtins.register("smatch", bf_smatch);
    builtins.register("escape", bf_escape);
    builtins.register("attr", bf_attr);
    builtins.register("pronouns", bf_pronouns);
    builtins.register("nl", bf_nl);
    builtins.register("tab", bf_tab);
}

#[cfg(test)]
mod tests {
    use crate::testing::TestWorld;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("{strlen:hello}{strlen:}", "50" ; "strlen")]
    #[test_case("{subst:hello world,o,0}", "hell0 w0rld" ; "subst")]
    #[test_case("{subst:abc,,x}", "abc" ; "subst empty old")]
    #[test_case("{instr:Hello World,world}{instr:abc,z}", "70" ; "instr")]
    #[test_case("{midstr:abcdef,2,4}", "bcd" ; "midstr range")]
    #[test_case("{midstr:abcdef,3}", "c" ; "midstr single")]
    #[test_case("{midstr:abcdef,-1,-3}", "fed" ; "midstr reversed from end")]
    #[test_case("{midstr:abcdef,0,3}", "" ; "midstr zero")]
    #[test_case("{midstr:abc,2,99}", "bc" ; "midstr clamped")]
    #[test_case("{toupper:MiXed}{tolower:MiXed}", "MIXEDmixed" ; "case")]
    #[test_case("[{left:ab,5}]", "[ab   ]" ; "left")]
    #[test_case("[{right:ab,5,.-}]", "[.-.ab]" ; "right cycles pad")]
    #[test_case("[{center:ab,8,-}]", "[---ab---]" ; "center")]
    #[test_case("[{center:abc,8,12}]", "[121abc12]" ; "center pad restarts")]
    #[test_case("[{left:toolong,3}]", "[toolong]" ; "left no truncation")]
    #[test_case("{lit:a,{b},c}", "a,{b},c" ; "lit")]
    #[test_case("[{strip:   x y  }]", "[x y]" ; "strip")]
    #[test_case("{smatch:foobar,f*r}{smatch:foobar,b*}", "10" ; "smatch")]
    #[test_case("{escape:a\\`b\\\\c}", "`a\\`b\\\\c`" ; "escape")]
    #[test_case("{nl}{tab}", "\r\t" ; "nl tab")]
    fn test_strings(source: &str, expected: &str) {
        let mut t = TestWorld::new();
        assert_eq!(t.eval(source), expected);
    }

    #[test]
    fn test_field_errors() {
        let mut t = TestWorld::new();
        let err = t.try_eval("{left:x,5,}").unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {LEFT}: Null pad string."]);
        let err = t.try_eval("{center:x,99999}").unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {CENTER}: Fieldwidth too big."]);
        let err = t.try_eval("{instr:abc,}").unwrap_err();
        assert_eq!(
            err.diagnostics,
            vec!["(test) {INSTR}: Can't search for a null string."]
        );
    }

    #[test]
    fn test_attr() {
        let mut t = TestWorld::new();
        assert_eq!(
            t.eval("{attr:bold,red,hi}"),
            "\x1b[1m\x1b[31mhi\x1b[0m"
        );
        assert_eq!(t.eval("{attr:,hi}"), "hi\x1b[0m");
        let err = t.try_eval("{attr:plaid,hi}").unwrap_err();
        assert!(err.diagnostics[0].starts_with("(test) {ATTR}: Unrecognized ansi tag."));
    }

    #[test]
    fn test_pronouns_builtin() {
        let mut t = TestWorld::new();
        t.set_prop(t.alice, "sex", "female");
        assert_eq!(t.eval("{pronouns:%N smiles at %o.}"), "Alice smiles at her.");
        assert_eq!(t.eval("{pronouns:%n,me}"), "Alice");
        let err = t.try_eval("{pronouns:%n,nobody}").unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {PRONOUNS}: Match failed."]);
    }
}
