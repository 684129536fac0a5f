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

//! The evaluator: a left-to-right scan of MPI text that copies plain text through, expands
//! escapes, and dispatches `{calls}` to builtins, user functions and property macros.

use muckr_common::model::{ObjType, WorldState};
use muckr_var::Obj;
use tracing::debug;

use crate::mpi::args::{ARG_END, ARG_SEP, ARG_START, ESCAPE_CHAR, LEAD_CHAR, LIT_CHAR, split_args};
use crate::mpi::builtins::{BUILTINS, BfCallState, Builtin};
use crate::mpi::context::{EvalContext, Frame, MpiFlag};
use crate::mpi::errors::{AbortKind, MpiError};
use crate::mpi::macros::{expand_macro, lookup_macro};
use crate::mpi::strings::{CR, ESC, cr2slash, strip_spaces, truncate_to};

/// Maximum arguments a call is split into, including the value of a `{&var}` call.
pub const MAX_ARGS: usize = 9;
/// Name of the builtin that `{&var:...}` calls are routed to.
const VARIABLE_BUILTIN: &str = "sublist";
const VAR_SIGIL: char = '&';

fn is_garbage(world: &dyn WorldState, obj: Obj) -> bool {
    matches!(world.object_type(obj), Ok(ObjType::Garbage))
}

fn indent(depth: usize) -> String {
    " ".repeat((depth as i64 * 2 - 4).unsigned_abs() as usize)
}

/// Escape `text` for a debug line, marking it when it had to be shortened.
fn debug_quote(text: &str, limit: usize) -> String {
    let (escaped, truncated) = cr2slash(text, limit);
    if truncated {
        format!("`{escaped}...`")
    } else {
        format!("`{escaped}`")
    }
}

/// Evaluate `source` on behalf of `frame`, returning the expanded text.
///
/// Any failure aborts the whole evaluation: the error carries every diagnostic to be shown to
/// the player, and no partial output is returned.
pub(crate) fn evaluate(
    ctx: &mut EvalContext<'_>,
    frame: &Frame,
    source: &str,
) -> Result<String, MpiError> {
    let mut ctx = ctx.depth_scope();
    ctx.depth += 1;
    if ctx.depth > ctx.config.max_recursion {
        return Err(MpiError::new(
            AbortKind::Governor,
            format!("{} Recursion limit exceeded.", ctx.how()),
        ));
    }
    if is_garbage(&*ctx.world, ctx.player) {
        return Err(MpiError::silent(AbortKind::Handler));
    }
    if is_garbage(&*ctx.world, frame.what) {
        return Err(MpiError::new(
            AbortKind::Handler,
            "MPI Error: Garbage trigger.".to_string(),
        ));
    }

    let limit = ctx.config.buffer_len.saturating_sub(1);
    let max_name = ctx.config.max_name_len;
    let mut work = source.to_string();
    truncate_to(&mut work, limit);
    let mut out = String::new();
    let mut p = 0;
    let mut literal = false;
    let mut show_text = false;

    while p < work.len() && out.len() < limit {
        let bytes = work.as_bytes();
        match bytes[p] {
            ESCAPE_CHAR => {
                show_text = true;
                p += 1;
                let Some(c) = work[p..].chars().next() else {
                    break;
                };
                match c {
                    'r' => out.push(CR),
                    '[' => out.push(ESC),
                    c => out.push(c),
                }
                p += c.len_utf8();
            }
            LIT_CHAR => {
                literal = !literal;
                p += 1;
            }
            LEAD_CHAR if !literal => {
                if bytes.get(p + 1) == Some(&LEAD_CHAR) {
                    show_text = true;
                    out.push('{');
                    p += 2;
                    continue;
                }
                let name_start = p + 1;
                let mut name_end = name_start;
                let mut name_len = 0;
                for (i, c) in work[name_start..].char_indices() {
                    if c == '{'
                        || c == ':'
                        || c == '}'
                        || c.is_whitespace()
                        || name_len > max_name
                    {
                        break;
                    }
                    name_len += 1;
                    name_end = name_start + i + c.len_utf8();
                }
                let name = &work[name_start..name_end];
                let stop = work.as_bytes().get(name_end).copied();
                let name_ok = name_len <= max_name
                    || (name_len <= max_name + 1 && name.starts_with(VAR_SIGIL));
                if !name_ok || !matches!(stop, Some(ARG_START) | Some(ARG_END)) {
                    // Not a call after all; keep the brace and the fragment as text.
                    show_text = true;
                    out.push_str(&work[p..name_end]);
                    p = name_end;
                    continue;
                }
                let name = name.to_string();
                let after = name_end + 1;
                let args_text = (stop == Some(ARG_START)).then(|| &work[after..]);

                let variable = name.starts_with(VAR_SIGIL);
                let builtin = if variable {
                    BUILTINS.find(VARIABLE_BUILTIN)
                } else {
                    BUILTINS.find(&name)
                };
                if let Some(builtin) = builtin {
                    let (result, consumed) =
                        call_builtin(&mut ctx, frame, builtin, &name, variable, args_text)?;
                    p = after + consumed;
                    out.push_str(&result);
                } else if let Some(found) = lookup_macro(&ctx, frame, &name) {
                    count_instruction(&mut ctx, &name)?;
                    let (args, consumed) = match args_text {
                        None => (vec![], 0),
                        Some(text) => {
                            let split = split_args(text, MAX_ARGS)
                                .ok_or_else(|| end_brace_missing(&ctx, &name))?;
                            (split.args, split.consumed)
                        }
                    };
                    if let Some(arity) = found.arity {
                        check_arity(&ctx, &name, args.len(), arity, arity as i32)?;
                    }
                    debug!(macro_name = name.as_str(), args = args.len(), "expanding macro");
                    work = expand_macro(&found.body, &args, &work[after + consumed..], limit);
                    p = 0;
                } else {
                    return Err(MpiError::new(
                        AbortKind::UnknownCall,
                        format!("{} {{{name}}}: Unrecognized function.", ctx.how()),
                    ));
                }
            }
            _ => {
                show_text = true;
                let c = work[p..].chars().next().unwrap_or_default();
                out.push(c);
                p += c.len_utf8().max(1);
            }
        }
    }
    truncate_to(&mut out, limit);

    if frame.is(MpiFlag::Debug) && show_text {
        let (mut shown, _) = cr2slash(&out, ctx.config.buffer_len);
        truncate_to(&mut shown, 512);
        let line = format!("{} {}`{shown}`", ctx.how(), indent(ctx.depth));
        ctx.tell_player(&line);
    }
    Ok(out)
}

fn count_instruction(ctx: &mut EvalContext<'_>, label: &str) -> Result<(), MpiError> {
    ctx.instructions += 1;
    if ctx.instructions > ctx.config.max_commands {
        return Err(MpiError::new(
            AbortKind::Governor,
            format!("{} {{{label}}}: Instruction limit exceeded.", ctx.how()),
        ));
    }
    Ok(())
}

fn end_brace_missing(ctx: &EvalContext<'_>, name: &str) -> MpiError {
    MpiError::new(
        AbortKind::Parse,
        format!("{} {{{name}}}: End brace not found.", ctx.how()),
    )
}

fn check_arity(
    ctx: &EvalContext<'_>,
    label: &str,
    argc: usize,
    min: usize,
    max: i32,
) -> Result<(), MpiError> {
    let problem = if argc < min {
        "Too few arguments."
    } else if max > 0 && argc > max as usize {
        "Too many arguments."
    } else {
        return Ok(());
    };
    Err(MpiError::new(
        AbortKind::Arity,
        format!("{} {{{label}}}: {problem}", ctx.how()),
    ))
}

/// Run one builtin call. `args_text` is the input after the `:`, or `None` for `{name}`.
/// Returns the result and how many bytes of `args_text` the call spanned.
fn call_builtin(
    ctx: &mut EvalContext<'_>,
    frame: &Frame,
    builtin: &'static Builtin,
    typed_name: &str,
    variable: bool,
    args_text: Option<&str>,
) -> Result<(String, usize), MpiError> {
    let label = if variable {
        typed_name
    } else {
        builtin.label.as_str()
    };
    count_instruction(ctx, label)?;

    let first = usize::from(variable);
    let (mut args, consumed) = match args_text {
        None => (vec![], 0),
        Some(text) => {
            let max_args = if builtin.max_args < 0 {
                builtin.max_args.unsigned_abs() as usize + first
            } else {
                MAX_ARGS - first
            };
            let split =
                split_args(text, max_args).ok_or_else(|| end_brace_missing(ctx, typed_name))?;
            (split.args, split.consumed)
        }
    };
    if variable {
        let Some(value) = ctx.vars.get(&typed_name[1..]).cloned() else {
            return Err(MpiError::new(
                AbortKind::UnknownCall,
                format!("{} {{{typed_name}}}: Unrecognized variable.", ctx.how()),
            ));
        };
        args.insert(0, value);
    }

    let debugging = frame.is(MpiFlag::Debug);
    let quote_limit = ctx.config.buffer_len / 8;
    let debug_line = |ctx: &EvalContext<'_>, args: &[String]| {
        let mut line = format!("{} {}{{{label}{}", ctx.how(), indent(ctx.depth), ARG_START as char);
        for (i, arg) in args.iter().enumerate().skip(first) {
            if i > 0 {
                line.push(ARG_SEP as char);
            }
            line.push_str(&debug_quote(arg, quote_limit));
        }
        line.push('}');
        line
    };
    if debugging {
        let line = debug_line(ctx, &args);
        ctx.tell_player(&line);
    }

    if builtin.strip {
        for arg in args.iter_mut().skip(first) {
            *arg = strip_spaces(arg).to_string();
        }
    }
    if builtin.parse_args {
        for i in first..args.len() {
            args[i] = evaluate(ctx, frame, &args[i]).map_err(|e| {
                e.context(format!("{} {{{label}}} (arg {})", ctx.how(), i + 1))
            })?;
        }
    }
    let mut post_line = debugging.then(|| debug_line(ctx, &args));

    check_arity(ctx, label, args.len(), builtin.min_args, builtin.max_args)?;
    let Some(handler) = builtin.handler else {
        return Err(MpiError::new(
            AbortKind::UnknownCall,
            format!("{} {{{label}}}: Unrecognized function.", ctx.how()),
        ));
    };
    debug!(builtin = builtin.name, argc = args.len(), depth = ctx.depth, "calling builtin");
    let mut result = {
        let mut bf_args = BfCallState {
            name: builtin.label.as_str(),
            args,
            ctx: &mut *ctx,
            frame: *frame,
        };
        handler(&mut bf_args)?
    };
    if builtin.post_parse {
        result = evaluate(ctx, frame, &result).map_err(|e| {
            e.context(format!("{} {{{label}}} (returned string)", ctx.how()))
        })?;
    }
    if let Some(line) = post_line.as_mut() {
        line.push_str(" = ");
        line.push_str(&debug_quote(&result, quote_limit));
        ctx.tell_player(line.as_str());
    }
    Ok((result, consumed))
}

#[cfg(test)]
mod tests {
    use crate::mpi::context::MpiFlag;
    use crate::mpi::errors::AbortKind;
    use crate::testing::TestWorld;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("plain text", "plain text" ; "identity")]
    #[test_case("a\\rb", "a\rb" ; "carriage return escape")]
    #[test_case("\\{add:1,2}", "{add:1,2}" ; "escaped brace")]
    #[test_case("{{add:1,2}", "{add:1,2}" ; "doubled brace")]
    #[test_case("`{add:1,2}`", "{add:1,2}" ; "literal mode")]
    #[test_case("{add:1,2}", "3" ; "simple call")]
    #[test_case("{ADD:1,{mult:2,3}}", "7" ; "nested call")]
    #[test_case("x{add:1,2}y", "x3y" ; "call in text")]
    #[test_case("{not a call}", "{not a call}" ; "space in name")]
    #[test_case("a{b", "a{b" ; "stray brace")]
    #[test_case("{add:1,2", "" ; "unterminated")]
    fn test_scan(source: &str, expected: &str) {
        let mut t = TestWorld::new();
        assert_eq!(t.eval(source), expected);
    }

    #[test]
    fn test_long_name_fragment_continues() {
        let mut t = TestWorld::new();
        assert_eq!(
            t.eval("{abcdefghijklmnopqrstuvwxyz}"),
            "{abcdefghijklmnopqrstuvwxyz}"
        );
    }

    #[test]
    fn test_unknown_function() {
        let mut t = TestWorld::new();
        let err = t.try_eval("{frobnicate:1}").unwrap_err();
        assert_eq!(err.kind, AbortKind::UnknownCall);
        assert_eq!(err.diagnostics, vec!["(test) {frobnicate}: Unrecognized function."]);
        let err = t.try_eval("{}").unwrap_err();
        assert_eq!(err.kind, AbortKind::UnknownCall);
    }

    #[test]
    fn test_unterminated_reports_end_brace() {
        let mut t = TestWorld::new();
        let err = t.try_eval("{add:1,2").unwrap_err();
        assert_eq!(err.kind, AbortKind::Parse);
        assert_eq!(err.diagnostics, vec!["(test) {add}: End brace not found."]);
    }

    #[test]
    fn test_arity() {
        let mut t = TestWorld::new();
        let err = t.try_eval("{abs}").unwrap_err();
        assert_eq!(err.kind, AbortKind::Arity);
        assert_eq!(err.diagnostics, vec!["(test) {ABS}: Too few arguments."]);
        let err = t.try_eval("{abs:1,2}").unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {ABS}: Too many arguments."]);
    }

    #[test]
    fn test_argument_failure_adds_context() {
        let mut t = TestWorld::new();
        let err = t.try_eval("{add:1,{abs}}").unwrap_err();
        assert_eq!(
            err.diagnostics,
            vec![
                "(test) {ABS}: Too few arguments.".to_string(),
                "(test) {ADD} (arg 2)".to_string(),
            ]
        );
    }

    #[test]
    fn test_variables() {
        let mut t = TestWorld::new();
        assert_eq!(t.eval("{with:x,a\\rb\\rc,{&x}}"), "a\rb\rc");
        assert_eq!(t.eval("{with:x,a\\rb\\rc,{&x:2}}"), "b");
        assert_eq!(t.eval("{with:x,a\\rb\\rc,{&x:2,3,-}}"), "b-c");
        let err = t.try_eval("{&nope}").unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {&nope}: Unrecognized variable."]);
        assert_eq!(t.eval("{&how}"), "(test)");
    }

    #[test]
    fn test_recursion_limit() {
        let mut t = TestWorld::new();
        let limit = t.config.max_recursion;
        // Each nested argument is one more evaluation level.
        let nest = |levels: usize| {
            let mut s = "1".to_string();
            for _ in 0..levels {
                s = format!("{{abs:{s}}}");
            }
            s
        };
        assert_eq!(t.eval(&nest(limit - 1)), "1");
        let err = t.try_eval(&nest(limit)).unwrap_err();
        assert_eq!(err.kind, AbortKind::Governor);
        assert_eq!(err.diagnostics[0], "(test) Recursion limit exceeded.");
    }

    #[test]
    fn test_instruction_limit_stops_runaway_macro() {
        let mut t = TestWorld::new();
        t.set_prop(t.alice, "_msgmacs/loop", "{loop}");
        let err = t.try_eval("{loop}").unwrap_err();
        assert_eq!(err.kind, AbortKind::Governor);
        assert_eq!(err.diagnostics, vec!["(test) {loop}: Instruction limit exceeded."]);
    }

    #[test]
    fn test_macro_expansion() {
        let mut t = TestWorld::new();
        t.set_prop(t.alice, "_msgmacs/twice", "{:1}{:1}");
        assert_eq!(t.eval("<{twice:{add:1,1}}>"), "<22>");
    }

    #[test]
    fn test_user_function() {
        let mut t = TestWorld::new();
        assert_eq!(t.eval("{func:double,x,{add:{&x},{&x}}}{double:21}"), "42");
        let err = t.try_eval("{func:double,x,{&x}}{double:1,2}").unwrap_err();
        assert_eq!(err.kind, AbortKind::Arity);
        assert_eq!(err.diagnostics, vec!["(test) {double}: Too many arguments."]);
    }

    #[test]
    fn test_output_is_bounded() {
        let mut t = TestWorld::new();
        let limit = t.config.buffer_len - 1;
        let long = "x".repeat(limit + 100);
        assert_eq!(t.eval(&long).len(), limit);
    }

    #[test]
    fn test_debug_trace() {
        let mut t = TestWorld::new();
        let alice = t.alice;
        let out = t.eval_flags("{add:1,2}", &[MpiFlag::Debug]);
        assert_eq!(out, "3");
        assert_eq!(
            t.messages(alice),
            vec![
                "(test)   {ADD:`1`,`2`}".to_string(),
                "(test) `1`".to_string(),
                "(test) `2`".to_string(),
                "(test)   {ADD:`1`,`2`} = `3`".to_string(),
            ]
        );
    }
}
