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

use std::cmp::Ordering;

use muckr_var::Obj;
use rand::Rng;

use crate::mpi::builtins::{BfCallState, BuiltinRegistry};
use crate::mpi::errors::MpiError;
use crate::mpi::strings::{atoi, bool_str, is_number, msg_compare, truestr};

fn fold_ints(bf_args: &BfCallState<'_, '_>, op: fn(i32, i32) -> i32) -> String {
    let mut acc = atoi(bf_args.arg(0));
    for arg in &bf_args.args[1..] {
        acc = op(acc, atoi(arg));
    }
    acc.to_string()
}

fn bf_add(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(fold_ints(bf_args, i32::wrapping_add))
}

fn bf_subt(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(fold_ints(bf_args, i32::wrapping_sub))
}

fn bf_mult(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(fold_ints(bf_args, i32::wrapping_mul))
}

// Division by zero, and the one overflowing quotient, give zero.
fn bf_div(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(fold_ints(bf_args, |a, b| a.checked_div(b).unwrap_or(0)))
}

fn bf_mod(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(fold_ints(bf_args, |a, b| a.checked_rem(b).unwrap_or(0)))
}

fn bf_abs(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(atoi(bf_args.arg(0)).wrapping_abs().to_string())
}

fn bf_sign(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(atoi(bf_args.arg(0)).signum().to_string())
}

fn adjust_var(bf_args: &mut BfCallState<'_, '_>, direction: i32) -> Result<String, MpiError> {
    let amount = if bf_args.argc() > 1 {
        atoi(bf_args.arg(1))
    } else {
        1
    };
    let name = bf_args.arg(0).to_string();
    let Some(value) = bf_args.ctx.vars.get_mut(&name) else {
        return Err(bf_args.abort("No such variable currently defined."));
    };
    let updated = atoi(value)
        .wrapping_add(amount.wrapping_mul(direction))
        .to_string();
    *value = updated.clone();
    Ok(updated)
}

fn bf_inc(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    adjust_var(bf_args, 1)
}

fn bf_dec(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    adjust_var(bf_args, -1)
}

fn bf_min(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let pick = match msg_compare(bf_args.arg(0), bf_args.arg(1)) {
        Ordering::Greater => 1,
        _ => 0,
    };
    Ok(bf_args.arg(pick).to_string())
}

fn bf_max(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let pick = match msg_compare(bf_args.arg(0), bf_args.arg(1)) {
        Ordering::Less => 1,
        _ => 0,
    };
    Ok(bf_args.arg(pick).to_string())
}

fn compare(bf_args: &BfCallState<'_, '_>, accept: fn(Ordering) -> bool) -> String {
    bool_str(accept(msg_compare(bf_args.arg(0), bf_args.arg(1))))
}

fn bf_eq(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(compare(bf_args, Ordering::is_eq))
}

fn bf_ne(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(compare(bf_args, Ordering::is_ne))
}

fn bf_lt(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(compare(bf_args, Ordering::is_lt))
}

fn bf_gt(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(compare(bf_args, Ordering::is_gt))
}

fn bf_le(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(compare(bf_args, Ordering::is_le))
}

fn bf_ge(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(compare(bf_args, Ordering::is_ge))
}

fn bf_not(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(bool_str(!truestr(bf_args.arg(0))))
}

fn bf_xor(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(bool_str(truestr(bf_args.arg(0)) != truestr(bf_args.arg(1))))
}

/// `and`/`or` evaluate their arguments themselves, stopping at the first that decides the result.
fn short_circuit(bf_args: &mut BfCallState<'_, '_>, decides: bool) -> Result<String, MpiError> {
    for i in 0..bf_args.argc() {
        let value = bf_args.eval_arg(i)?;
        if truestr(&value) == decides {
            return Ok(bool_str(decides));
        }
    }
    Ok(bool_str(!decides))
}

fn bf_and(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    short_circuit(bf_args, false)
}

fn bf_or(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    short_circuit(bf_args, true)
}

fn bf_isnum(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(bool_str(is_number(bf_args.arg(0))))
}

fn bf_isdbref(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let text = bf_args.arg(0).trim_start();
    let valid = match text.strip_prefix('#') {
        Some(num) if is_number(num) => bf_args.ctx.world.valid(Obj::mk_id(atoi(num))),
        _ => false,
    };
    Ok(bool_str(valid))
}

fn bf_dist(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let n: Vec<f64> = bf_args.args.iter().map(|a| atoi(a) as f64).collect();
    let (a, b, c) = match n.as_slice() {
        [x, y] => (*x, *y, 0.0),
        [x, y, z] => (*x, *y, *z),
        [x1, y1, x2, y2] => (x1 - x2, y1 - y2, 0.0),
        [x1, y1, z1, x2, y2, z2] => (x1 - x2, y1 - y2, z1 - z2),
        _ => return Err(bf_args.abort("Takes 2,3,4, or 6 arguments.")),
    };
    let dist = (a * a + b * b + c * c).sqrt();
    Ok(format!("{:.0}", (dist + 0.5).floor()))
}

const MAX_DICE: i32 = 8888;

/// The face showing for a zero-based roll. Dice with 2^31 faces wrap like the rest of the
/// arithmetic.
fn face_value(roll: u32) -> i32 {
    (roll as i32).wrapping_add(1)
}

fn bf_dice(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let sides = atoi(bf_args.arg(0));
    let count = if bf_args.argc() >= 2 {
        atoi(bf_args.arg(1))
    } else {
        1
    };
    let offset = if bf_args.argc() >= 3 {
        atoi(bf_args.arg(2))
    } else {
        0
    };
    if count > MAX_DICE {
        return Err(bf_args.abort("Too many dice!"));
    }
    if sides == 0 {
        return Ok("0".to_string());
    }
    let mut rng = rand::rng();
    let faces = sides.unsigned_abs();
    let total = (0..count.max(0)).fold(0i32, |total, _| {
        total.wrapping_add(face_value(rng.random_range(0..faces)))
    });
    Ok(total.wrapping_add(offset).to_string())
}

pub(crate) fn register_bf_num(builtins: &mut BuiltinRegistry) {
    builtins.register("add", bf_add);
    builtins.register("subt", bf_subt);
    builtins.register("mult", bf_mult);
    builtins.register("div", bf_div);
    builtins.register("mod", bf_mod);
    builtins.register("abs", bf_abs);
    builtins.register("sign", bf_sign);
    builtins.register("inc", bf_inc);
    builtins.register("dec", bf_dec);
    builtins.register("min", bf_min);
    builtins.register("max", bf_max);
    builtins.register("eq", bf_eq);
    builtins.register("ne", bf_ne);
    builtins.register("lt", bf_lt);
    builtins.register("gt", bf_gt);
    builtins.register("le", bf_le);
    builtins.register("ge", bf_ge);
    builtins.register("not", bf_not);
    builtins.register("xor", bf_xor);
    builtins.register("and", bf_and);
    builtins.register("or", bf_or);
    builtins.register("isnum", bf_isnum);
    builtins.register("isdbref", bf_isdbref);
    builtins.register("dist", bf_dist);
    builtins.register("dice", bf_dice);
}

#[cfg(test)]
mod tests {
    use crate::testing::TestWorld;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("{add:2,3,5}", "10" ; "add")]
    #[test_case("{add:2147483647,1}", "-2147483648" ; "add wraps")]
    #[test_case("{subt:10,3,2}", "5" ; "subt")]
    #[test_case("{mult:2,3,4}", "24" ; "mult")]
    #[test_case("{div:20,2,5}", "2" ; "div")]
    #[test_case("{div:5,0}", "0" ; "div by zero")]
    #[test_case("{div:-2147483648,-1}", "0" ; "div overflow")]
    #[test_case("{mod:17,5}", "2" ; "mod")]
    #[test_case("{mod:17,0}", "0" ; "mod by zero")]
    #[test_case("{add:abc,4}", "4" ; "non numeric is zero")]
    #[test_case("{abs:-7}", "7" ; "abs")]
    #[test_case("{sign:-7}{sign:0}{sign:3}", "-101" ; "sign")]
    #[test_case("{min:3,10}{max:3,10}", "310" ; "numeric min max")]
    #[test_case("{min:b,A}{max:b,A}", "Ab" ; "string min max")]
    #[test_case("{eq:1,01}{eq:abc,ABC}{ne:a,b}", "111" ; "equality")]
    #[test_case("{lt:2,10}{lt:b,a}{gt:10,2}{le:3,3}{ge:2,3}", "10110" ; "ordering")]
    #[test_case("{not:0}{not:}{not:x}", "110" ; "not")]
    #[test_case("{xor:1,0}{xor:1,1}", "10" ; "xor")]
    #[test_case("{and:1,x,5}{and:1,0}{or:0,,1}{or:0,0}", "1010" ; "and or")]
    #[test_case("{isnum:42}{isnum:-3}{isnum:4x}{isnum:}", "1100" ; "isnum")]
    #[test_case("{isdbref:#3}{isdbref: #5}{isdbref:#999}{isdbref:3}", "1100" ; "isdbref")]
    #[test_case("{dist:3,4}{dist:1,1,4,5}{dist:0,0,0}", "550" ; "dist")]
    #[test_case("{dice:0,5}", "0" ; "zero sided dice")]
    #[test_case("{dice:1,3,2}", "5" ; "one sided dice")]
    fn test_num(source: &str, expected: &str) {
        let mut t = TestWorld::new();
        assert_eq!(t.eval(source), expected);
    }

    #[test]
    fn test_widest_dice_wrap() {
        assert_eq!(super::face_value(0), 1);
        assert_eq!(super::face_value(i32::MAX as u32), i32::MIN);
        let mut t = TestWorld::new();
        for _ in 0..20 {
            assert!(t.try_eval("{dice:-2147483648,8}").is_ok());
        }
    }

    #[test]
    fn test_and_short_circuits() {
        let mut t = TestWorld::new();
        // The failing call is never evaluated.
        assert_eq!(t.eval("{and:0,{abs}}"), "0");
        assert_eq!(t.eval("{or:1,{abs}}"), "1");
    }

    #[test]
    fn test_inc_dec() {
        let mut t = TestWorld::new();
        assert_eq!(t.eval("{with:n,5,{inc:n}{inc:n,10}:{dec:n,3}:{&n}}"), "616:13:13");
        let err = t.try_eval("{inc:nothing}").unwrap_err();
        assert_eq!(
            err.diagnostics,
            vec!["(test) {INC}: No such variable currently defined."]
        );
    }

    #[test]
    fn test_dice_range() {
        let mut t = TestWorld::new();
        for _ in 0..20 {
            let roll: i32 = t.eval("{dice:6,2}").parse().unwrap();
            assert!((2..=12).contains(&roll));
        }
        let err = t.try_eval("{dice:6,9000}").unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {DICE}: Too many dice!"]);
    }

    #[test]
    fn test_dist_arity() {
        let mut t = TestWorld::new();
        let err = t.try_eval("{dist:1,2,3,4,5}").unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {DIST}: Takes 2,3,4, or 6 arguments."]);
    }
}
