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

//! Variables, user functions, conditionals, loops and evaluation control.

use minstant::Instant;

use crate::mpi::builtins::{BfCallState, BuiltinRegistry};
use crate::mpi::context::MpiFlag;
use crate::mpi::errors::MpiError;
use crate::mpi::macros::{UserFunction, define_function};
use crate::mpi::strings::{truestr, truncate_to};
use crate::mpi::vars::PushError;

fn bf_v(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    match bf_args.ctx.vars.get(bf_args.arg(0)) {
        Some(value) => Ok(value.clone()),
        None => Err(bf_args.abort("No such variable defined.")),
    }
}

fn bf_set(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let value = bf_args.arg(1).to_string();
    let name = bf_args.arg(0).to_string();
    match bf_args.ctx.vars.get_mut(&name) {
        Some(slot) => {
            *slot = value.clone();
            Ok(value)
        }
        None => Err(bf_args.abort("No such variable currently defined.")),
    }
}

/// `{with:var,value,expr...}` binds `var` while the remaining arguments are evaluated, and
/// returns the value of the last one.
fn bf_with(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let name = bf_args.eval_arg(0)?;
    let value = bf_args.eval_arg(1)?;
    bf_args.var_scope(|bf_args| {
        bf_args.push_var(&name, &value)?;
        let mut result = String::new();
        for i in 2..bf_args.argc() {
            result = bf_args.eval_arg(i)?;
        }
        Ok(result)
    })
}

/// `{func:name,param...,body}` defines a user function for the rest of this evaluation.
fn bf_func(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let name = bf_args.eval(&bf_args.arg(0).to_string(), "name argument (1)")?;
    let last = bf_args.argc() - 1;
    let max_name = bf_args.ctx.config.max_name_len;
    let mut params = Vec::with_capacity(last.saturating_sub(1));
    for i in 1..last {
        let mut param = bf_args.eval(&bf_args.arg(i).to_string(), "variable name argument")?;
        truncate_to(&mut param, max_name);
        params.push(param);
    }
    let func = UserFunction::with_params(&params, bf_args.arg(last));
    match define_function(&mut *bf_args.ctx, &name, func) {
        Ok(()) => Ok(String::new()),
        Err(PushError::NameTooLong) => Err(bf_args.abort("Function Name too long.")),
        Err(PushError::Full) => Err(bf_args.abort("Too many functions defined.")),
    }
}

fn bf_if(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    if truestr(&bf_args.eval_arg(0)?) {
        bf_args.eval_arg(1)
    } else if bf_args.argc() == 3 && !bf_args.arg(2).is_empty() {
        bf_args.eval_arg(2)
    } else {
        Ok(String::new())
    }
}

/// `{while:cond,expr}` returns the value of the last pass of `expr`.
fn bf_while(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let mut result = String::new();
    let mut passes = 0;
    while truestr(&bf_args.eval_arg(0)?) {
        result = bf_args.eval_arg(1)?;
        bf_args.iteration(&mut passes)?;
    }
    Ok(result)
}

fn bf_default(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let value = bf_args.eval_arg(0)?;
    if truestr(&value) {
        Ok(value)
    } else {
        bf_args.eval_arg(1)
    }
}

fn bf_null(_bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(String::new())
}

/// Evaluate the (already evaluated) argument a second time, without blessing.
fn bf_eval(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let frame = bf_args.frame.with(MpiFlag::Blessed, false);
    let text = bf_args.arg(0).to_string();
    bf_args.eval_with(frame, &text, "arg 1")
}

/// As `eval`, but keeping the caller's blessing.
fn bf_eval_bang(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let text = bf_args.arg(0).to_string();
    bf_args.eval(&text, "arg 1")
}

fn bf_debug(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let frame = bf_args.frame.with(MpiFlag::Debug, true);
    let text = bf_args.arg(0).to_string();
    bf_args.eval_with(frame, &text, "arg 1")
}

/// `{debugif:cond,expr}` traces `expr` only when `cond` evaluates true.
fn bf_debugif(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let condition = bf_args.eval_arg(0)?;
    let frame = bf_args.frame.with(MpiFlag::Debug, truestr(&condition));
    let text = bf_args.arg(1).to_string();
    bf_args.eval_with(frame, &text, "arg 2")
}

fn bf_revoke(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let frame = bf_args.frame.with(MpiFlag::Blessed, false);
    let text = bf_args.arg(0).to_string();
    bf_args.eval_with(frame, &text, "arg 1")
}

/// Evaluate the argument and tell the player how long it took.
fn bf_timing(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let start = Instant::now();
    let result = bf_args.eval_arg(0)?;
    let elapsed = start.elapsed();
    bf_args
        .ctx
        .tell_player(&format!("Time elapsed: {:.6} seconds", elapsed.as_secs_f64()));
    Ok(result)
}

pub(crate) fn register_bf_control(builtins: &mut BuiltinRegistry) {
    builtins.register("v", bf_v);
    builtins.register("set", bf_set);
    builtins.register("with", bf_with);
    builtins.register("func", bf_func);
    builtins.register("if", bf_if);
    builtins.register("while", bf_while);
    builtins.register("default", bf_default);
    builtins.register("null", bf_null);
    builtins.register("eval", bf_eval);
    builtins.register("eval!", bf_eval_bang);
    builtins.register("debug", bf_debug);
    builtins.register("debugif", bf_debugif);
    builtins.register("revoke", bf_revoke);
    builtins.register("timing", bf_timing);
}

#[cfg(test)]
mod tests {
    use crate::mpi::context::MpiFlag;
    use crate::testing::TestWorld;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("{with:x,5,{v:x}}", "5" ; "with and v")]
    #[test_case("{with:x,5,{set:x,7}.{&x}}", "7.7" ; "set returns value")]
    #[test_case("{with:x,a,{with:x,b,{&x}}{&x}}", "ba" ; "shadowing")]
    #[test_case("{with:x,1,ignored,last}", "last" ; "with returns last")]
    #[test_case("{if:1,yes,no}{if:0,yes,no}{if:0,yes}", "yesno" ; "if")]
    #[test_case("{if:{eq:a,A},same}", "same" ; "if condition evaluated")]
    #[test_case("{default:,fallback}{default:given,fallback}", "fallbackgiven" ; "default")]
    #[test_case("[{null:a,b,c}]", "[]" ; "null")]
    #[test_case("{with:n,0,{while:{lt:{&n},3},{inc:n}}}", "3" ; "while")]
    #[test_case("{func:double,x,{mult:{&x},2}}{double:21}", "42" ; "func")]
    #[test_case("{func:greet,a,b,{&a} {&b}}{greet:hello,world}", "hello world" ; "func two params")]
    #[test_case("{func:three,3}{three}", "3" ; "func without params")]
    #[test_case("{eval:{lit:{add:1,2}}}", "3" ; "eval")]
    #[test_case("{eval!:{lit:{add:2,2}}}", "4" ; "eval bang")]
    #[test_case("{revoke:{add:1,1}}", "2" ; "revoke")]
    fn test_control(source: &str, expected: &str) {
        let mut t = TestWorld::new();
        assert_eq!(t.eval(source), expected);
    }

    #[test]
    fn test_variable_errors() {
        let mut t = TestWorld::new();
        let err = t.try_eval("{v:nope}").unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {V}: No such variable defined."]);
        let err = t.try_eval("{set:nope,1}").unwrap_err();
        assert_eq!(
            err.diagnostics,
            vec!["(test) {SET}: No such variable currently defined."]
        );
        let err = t
            .try_eval("{with:abcdefghijklmnopq,1,x}")
            .unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {WITH}: Variable name too long."]);
    }

    #[test]
    fn test_function_arity() {
        let mut t = TestWorld::new();
        let err = t.try_eval("{func:pair,a,b,{&a}{&b}}{pair:1}").unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {pair}: Too few arguments."]);
        let err = t.try_eval("{func:pair,a,b,{&a}{&b}}{pair:1,2,3}").unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {pair}: Too many arguments."]);
    }

    #[test]
    fn test_function_name_too_long() {
        let mut t = TestWorld::new();
        let err = t.try_eval("{func:abcdefghijklmnopq,x}").unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {FUNC}: Function Name too long."]);
    }

    #[test]
    fn test_while_limit() {
        let mut t = TestWorld::new();
        let err = t.try_eval("{while:1,x}").unwrap_err();
        assert_eq!(err.diagnostics[0], "(test) {WHILE}: Iteration limit exceeded");
    }

    #[test]
    fn test_debug_traces_calls() {
        let mut t = TestWorld::new();
        assert_eq!(t.eval("{debug:{add:1,2}}"), "3");
        let lines = t.messages(t.alice);
        assert!(lines.iter().any(|l| l.contains("{ADD:`1`,`2`}")));
        assert!(lines.iter().any(|l| l.ends_with("= `3`")));
    }

    #[test]
    fn test_debugif_uses_evaluated_condition() {
        let mut t = TestWorld::new();
        assert_eq!(t.eval("{debugif:{eq:1,2},{add:1,2}}"), "3");
        assert!(t.messages(t.alice).is_empty());
        assert_eq!(t.eval("{debugif:{eq:1,1},{add:1,2}}"), "3");
        assert!(!t.messages(t.alice).is_empty());
    }

    #[test]
    fn test_eval_drops_blessing() {
        let mut t = TestWorld::new();
        t.set_prop(t.bob, ".secret", "hidden");
        assert_eq!(t.eval_blessed("{prop:.secret,*bob}"), "hidden");
        let err = t.try_eval_flags("{eval:{lit:{prop:.secret,*bob}}}", &[MpiFlag::Blessed]);
        assert!(err.is_err());
        assert_eq!(
            t.eval_blessed("{eval!:{lit:{prop:.secret,*bob}}}"),
            "hidden"
        );
    }

    #[test]
    fn test_timing_reports() {
        let mut t = TestWorld::new();
        assert_eq!(t.eval("{timing:{add:1,1}}"), "2");
        let lines = t.messages(t.alice);
        assert!(lines.iter().any(|l| l.starts_with("Time elapsed: ")));
    }
}
