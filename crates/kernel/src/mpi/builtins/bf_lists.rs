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

//! List builtins. A list is text whose items are separated by carriage returns, or by a
//! caller-supplied separator where a builtin accepts one.

use std::cmp::Ordering;

use rand::Rng;

use crate::mpi::builtins::{BfCallState, BuiltinRegistry};
use crate::mpi::errors::MpiError;
use crate::mpi::strings::{atoi, truestr, truncate_to};

const LIST_SEP: &str = "\r";

/// Items of `list` for iteration. A trailing separator does not start another item.
fn split_items<'a>(list: &'a str, sep: &str) -> Vec<&'a str> {
    if list.is_empty() {
        return vec![];
    }
    let mut items: Vec<&str> = list.split(sep).collect();
    if list.ends_with(sep) {
        items.pop();
    }
    items
}

/// Items of `list` for counting and indexing, where a trailing separator ends an empty item.
fn indexed_items<'a>(list: &'a str, sep: &str) -> Vec<&'a str> {
    if list.is_empty() {
        vec![]
    } else {
        list.split(sep).collect()
    }
}

/// Argument `i` as a separator, defaulting to a carriage return.
fn separator<'a>(bf_args: &'a BfCallState<'_, '_>, i: usize) -> Result<&'a str, MpiError> {
    if bf_args.argc() <= i {
        return Ok(LIST_SEP);
    }
    match bf_args.arg(i) {
        "" => Err(bf_args.abort("Can't use null seperator string.")),
        sep => Ok(sep),
    }
}

/// Case-insensitive membership.
fn contains_item(items: &[&str], item: &str) -> bool {
    items.iter().any(|i| i.eq_ignore_ascii_case(item))
}

/// Clamp a 1-based list position the way `sublist` does: zero selects nothing, positions past
/// the end select the last item, negative positions count back from the end.
fn clamp_position(pos: i32, count: usize) -> Option<usize> {
    if pos == 0 {
        return None;
    }
    let count = count as i32;
    let mut pos = pos.min(count);
    if pos < 0 {
        pos += count + 1;
    }
    Some(pos.max(1) as usize)
}

fn bf_sublist(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    if bf_args.argc() < 2 {
        return Ok(bf_args.arg(0).to_string());
    }
    let sep = separator(bf_args, 3)?;
    let items = indexed_items(bf_args.arg(0), sep);
    let Some(first) = clamp_position(atoi(bf_args.arg(1)), items.len()) else {
        return Ok(String::new());
    };
    let last = if bf_args.argc() > 2 {
        atoi(bf_args.arg(2))
    } else {
        first as i32
    };
    let Some(last) = clamp_position(last, items.len()) else {
        return Ok(String::new());
    };
    let positions: Vec<usize> = if last >= first {
        (first..=last).collect()
    } else {
        (last..=first).rev().collect()
    };
    let picked: Vec<&str> = positions
        .into_iter()
        .map(|p| items.get(p - 1).copied().unwrap_or(""))
        .collect();
    let mut result = picked.join(sep);
    truncate_to(&mut result, bf_args.limit());
    Ok(result)
}

fn bf_count(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let sep = separator(bf_args, 1)?;
    Ok(indexed_items(bf_args.arg(0), sep).len().to_string())
}

fn bf_lrand(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let sep = separator(bf_args, 1)?;
    let items = indexed_items(bf_args.arg(0), sep);
    if items.is_empty() {
        return Ok(String::new());
    }
    let which = rand::rng().random_range(0..items.len());
    Ok(items[which].to_string())
}

fn bf_mklist(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let total: usize = bf_args.args.iter().map(String::len).sum();
    if total + bf_args.argc() + 1 > bf_args.limit() {
        return Err(bf_args.abort("Max string length exceeded."));
    }
    Ok(bf_args.args.join(LIST_SEP))
}

/// `{lmember:list,item[,delim]}`: the 1-based position of `item`, or 0.
fn bf_lmember(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let delim = if bf_args.argc() > 2 {
        bf_args.arg(2)
    } else {
        LIST_SEP
    };
    if delim.is_empty() {
        return Err(bf_args.abort("List delimiter cannot be a null string."));
    }
    let needle = bf_args.arg(1);
    let position = split_items(bf_args.arg(0), delim)
        .iter()
        .position(|item| item.eq_ignore_ascii_case(needle))
        .map_or(0, |i| i + 1);
    Ok(position.to_string())
}

/// Append each item of `items` not already present in `out`, stopping quietly once the output
/// would no longer fit.
fn merge_unique<'a>(
    bf_args: &BfCallState<'_, '_>,
    out: &mut Vec<&'a str>,
    items: &[&'a str],
    passes: &mut usize,
) -> Result<(), MpiError> {
    let mut len: usize = out.iter().map(|i| i.len() + 1).sum();
    for &item in items {
        if !contains_item(out, item) {
            if len + item.len() > bf_args.limit().saturating_sub(2) {
                return Ok(());
            }
            len += item.len() + 1;
            out.push(item);
        }
        bf_args.iteration(passes)?;
    }
    Ok(())
}

fn bf_lunique(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let items = split_items(bf_args.arg(0), LIST_SEP);
    let mut out = vec![];
    merge_unique(bf_args, &mut out, &items, &mut 0)?;
    Ok(out.join(LIST_SEP))
}

fn bf_lunion(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let mut out = vec![];
    let mut passes = 0;
    merge_unique(bf_args, &mut out, &split_items(bf_args.arg(0), LIST_SEP), &mut passes)?;
    merge_unique(bf_args, &mut out, &split_items(bf_args.arg(1), LIST_SEP), &mut passes)?;
    Ok(out.join(LIST_SEP))
}

/// Items of the second list that also appear in the first, without repeats.
fn bf_lcommon(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let first = split_items(bf_args.arg(0), LIST_SEP);
    let mut out: Vec<&str> = vec![];
    let mut passes = 0;
    for item in split_items(bf_args.arg(1), LIST_SEP) {
        if contains_item(&first, item) && !contains_item(&out, item) {
            out.push(item);
        }
        bf_args.iteration(&mut passes)?;
    }
    Ok(out.join(LIST_SEP))
}

/// Items of the first list that are not in the second, without repeats. Case-sensitive.
fn bf_lremove(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let removed = split_items(bf_args.arg(1), LIST_SEP);
    let mut out: Vec<&str> = vec![];
    let mut passes = 0;
    for item in split_items(bf_args.arg(0), LIST_SEP) {
        if !removed.contains(&item) && !out.contains(&item) {
            out.push(item);
        }
        bf_args.iteration(&mut passes)?;
    }
    Ok(out.join(LIST_SEP))
}

/// `{lsort:list[,var1,var2,expr]}` sorts naturally and case-insensitively, or swaps any pair
/// for which `expr` is true with `var1` and `var2` bound to the earlier and later item.
fn bf_lsort(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    if bf_args.argc() > 1 && bf_args.argc() < 4 {
        return Err(bf_args.abort("Takes 1 or 4 arguments."));
    }
    let list = bf_args.eval_arg(0)?;
    bf_args.var_scope(|bf_args| {
        let slots = if bf_args.argc() > 1 {
            let a = bf_args.eval_arg(1)?;
            let a = bf_args.push_var(&a, "")?;
            let b = bf_args.eval_arg(2)?;
            let b = bf_args.push_var(&b, "")?;
            Some((a, b))
        } else {
            None
        };
        let mut items: Vec<String> = split_items(&list, LIST_SEP)
            .into_iter()
            .map(str::to_string)
            .collect();
        if items.len() >= bf_args.ctx.config.list_limit {
            return Err(bf_args.abort("Iteration limit exceeded"));
        }
        let expr = bf_args.arg(3).to_string();
        for i in 0..items.len() {
            for j in i + 1..items.len() {
                let swap = match slots {
                    Some((a, b)) => {
                        bf_args.set_var(a, &items[i]);
                        bf_args.set_var(b, &items[j]);
                        truestr(&bf_args.eval(&expr, "arg 4")?)
                    }
                    None => natord::compare_ignore_case(&items[i], &items[j]) == Ordering::Greater,
                };
                if swap {
                    items.swap(i, j);
                }
            }
        }
        Ok(items.join(LIST_SEP))
    })
}

/// `{commas:list[,last-sep[,var,expr]]}` renders "a, b and c".
fn bf_commas(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    if bf_args.argc() == 3 {
        return Err(bf_args.abort("Takes 1, 2, or 4 arguments."));
    }
    let list = bf_args.eval_arg(0)?;
    let items = indexed_items(&list, LIST_SEP);
    if items.is_empty() {
        return Ok(String::new());
    }
    let last_sep = if bf_args.argc() > 1 {
        bf_args.eval_arg(1)?
    } else {
        " and ".to_string()
    };
    bf_args.var_scope(|bf_args| {
        let slot = if bf_args.argc() > 2 {
            let name = bf_args.eval_arg(2)?;
            Some(bf_args.push_var(&name, "")?)
        } else {
            None
        };
        let expr = bf_args.arg(3).to_string();
        let limit = bf_args.limit();
        let mut out = String::new();
        for (i, item) in items.iter().enumerate() {
            let text = match slot {
                Some(slot) => {
                    bf_args.set_var(slot, item);
                    bf_args.eval(&expr, "arg 4")?
                }
                None => item.to_string(),
            };
            if out.len() + text.len() > limit {
                break;
            }
            out.push_str(&text);
            let joiner = match items.len() - i - 1 {
                0 => break,
                1 => last_sep.as_str(),
                _ => ", ",
            };
            if out.len() + joiner.len() > limit {
                break;
            }
            out.push_str(joiner);
        }
        Ok(out)
    })
}

/// The input separator at argument `i` of an iterating builtin, evaluated.
fn eval_separator(bf_args: &mut BfCallState<'_, '_>, i: usize) -> Result<String, MpiError> {
    if bf_args.argc() <= i {
        return Ok(LIST_SEP.to_string());
    }
    let sep = bf_args.eval_arg(i)?;
    if sep.is_empty() {
        return Err(bf_args.abort("Can't use Null seperator string"));
    }
    Ok(sep)
}

/// Evaluate the variable name at argument 0 and the list at argument 1, bind the variable, and
/// return its slot with the list.
fn bind_iteration(bf_args: &mut BfCallState<'_, '_>) -> Result<(usize, String), MpiError> {
    let name = bf_args.eval_arg(0)?;
    let slot = bf_args.push_var(&name, "")?;
    let list = bf_args.eval_arg(1)?;
    Ok((slot, list))
}

/// `{foreach:var,list,expr[,sep]}` evaluates `expr` once per item; the last result is returned.
fn bf_foreach(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    bf_args.var_scope(|bf_args| {
        let (slot, list) = bind_iteration(bf_args)?;
        let sep = eval_separator(bf_args, 3)?;
        let expr = bf_args.arg(2).to_string();
        let mut result = String::new();
        let mut passes = 0;
        for item in split_items(&list, &sep) {
            bf_args.set_var(slot, item);
            result = bf_args.eval(&expr, "arg 3")?;
            bf_args.iteration(&mut passes)?;
        }
        Ok(result)
    })
}

/// `{for:var,start,end,step,expr}`; the last result is returned.
fn bf_for(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    bf_args.var_scope(|bf_args| {
        let name = bf_args.eval(&bf_args.arg(0).to_string(), "arg 1 (varname)")?;
        let slot = bf_args.push_var(&name, "")?;
        let start = atoi(&bf_args.eval(&bf_args.arg(1).to_string(), "arg 2 (start num)")?);
        let end = atoi(&bf_args.eval(&bf_args.arg(2).to_string(), "arg 3 (end num)")?);
        let step = atoi(&bf_args.eval(&bf_args.arg(3).to_string(), "arg 4 (increment)")?);
        let expr = bf_args.arg(4).to_string();
        let mut result = String::new();
        let mut passes = 0;
        let mut i = start;
        while (step >= 0 && i <= end) || (step < 0 && i >= end) {
            bf_args.set_var(slot, &i.to_string());
            result = bf_args.eval(&expr, "arg 5 (repeated command)")?;
            bf_args.iteration(&mut passes)?;
            let Some(next) = i.checked_add(step) else {
                break;
            };
            i = next;
        }
        Ok(result)
    })
}

/// Shared body of `filter` and `parse`: per item, evaluate `expr`, and let `keep` decide what,
/// if anything, goes into the output.
fn map_items(
    bf_args: &mut BfCallState<'_, '_>,
    keep: fn(&str, String) -> Option<String>,
) -> Result<String, MpiError> {
    bf_args.var_scope(|bf_args| {
        let (slot, list) = bind_iteration(bf_args)?;
        let sep_in = eval_separator(bf_args, 3)?;
        let sep_out = if bf_args.argc() > 4 {
            bf_args.eval_arg(4)?
        } else {
            sep_in.clone()
        };
        let expr = bf_args.arg(2).to_string();
        let limit = bf_args.limit().saturating_sub(2);
        let mut out = String::new();
        let mut first = true;
        let mut passes = 0;
        for item in split_items(&list, &sep_in) {
            bf_args.set_var(slot, item);
            let value = bf_args.eval(&expr, "arg 3")?;
            if let Some(kept) = keep(item, value) {
                if out.len() + kept.len() + sep_out.len() > limit {
                    break;
                }
                if !first {
                    out.push_str(&sep_out);
                }
                first = false;
                out.push_str(&kept);
            }
            bf_args.iteration(&mut passes)?;
        }
        Ok(out)
    })
}

/// `{filter:var,list,expr[,sepin[,sepout]]}` keeps the items for which `expr` is true.
fn bf_filter(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    map_items(bf_args, |item, value| truestr(&value).then(|| item.to_string()))
}

/// `{parse:var,list,expr[,sepin[,sepout]]}` replaces each item with the value of `expr`.
fn bf_parse(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    map_items(bf_args, |_, value| Some(value))
}

/// `{fold:accvar,itemvar,list,expr[,sep]}` starts from the first item and replaces the
/// accumulator with `expr` for every following one.
fn bf_fold(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    bf_args.var_scope(|bf_args| {
        let acc_name = bf_args.eval_arg(0)?;
        let acc = bf_args.push_var(&acc_name, "")?;
        let item_name = bf_args.eval_arg(1)?;
        let item = bf_args.push_var(&item_name, "")?;
        let sep = eval_separator(bf_args, 4)?;
        let list = bf_args.eval_arg(2)?;
        let expr = bf_args.arg(3).to_string();

        let (head, rest) = match list.split_once(sep.as_str()) {
            Some((head, rest)) => (head, rest),
            None => (list.as_str(), ""),
        };
        let mut result = head.to_string();
        let mut passes = 0;
        for value in split_items(rest, &sep) {
            bf_args.set_var(item, value);
            bf_args.set_var(acc, &result);
            result = bf_args.eval(&expr, "arg 4")?;
            bf_args.iteration(&mut passes)?;
        }
        Ok(result)
    })
}

pub(crate) fn register_bf_lists(builtins: &mut BuiltinRegistry) {
    builtins.register("sublist", bf_sublist);
    builtins.register("count", bf_count);
    builtins.register("lrand", bf_lrand);
    builtins.register("mklist", bf_mklist);
    builtins.register("lmember", bf_lmember);
    builtins.register("lunique", bf_lunique);
    builtins.register("lunion", bf_lunion);
    builtins.register("lcommon", bf_lcommon);
    builtins.register("lremove", bf_lremove);
    builtins.register("lsort", bf_lsort);
    builtins.register("commas", bf_commas);
    builtins.register("foreach", bf_foreach);
    builtins.register("for", bf_for);
    builtins.register("filter", bf_filter);
    builtins.register("parse", bf_parse);
    builtins.register("fold", bf_fold);
}

#[cfg(test)]
mod tests {
    use crate::testing::TestWorld;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("{sublist:a\\rb\\rc\\rd,2,3}", "b\rc" ; "sublist range")]
    #[test_case("{sublist:a\\rb\\rc\\rd,-1}", "d" ; "sublist from end")]
    #[test_case("{sublist:a\\rb\\rc\\rd,3,1}", "c\rb\ra" ; "sublist reversed")]
    #[test_case("{sublist:a-b-c,9,2,-}", "c-b" ; "sublist separator and clamp")]
    #[test_case("{sublist:a\\rb,0}", "" ; "sublist zero")]
    #[test_case("{count:a\\rb\\rc}{count:}{count:a\\r}", "302" ; "count")]
    #[test_case("{count:a;b,;}", "2" ; "count separator")]
    #[test_case("{mklist:a,b,c}", "a\rb\rc" ; "mklist")]
    #[test_case("{lmember:{mklist:a,b,c},B}{lmember:a;b,c,;}", "20" ; "lmember")]
    #[test_case("{lunique:{mklist:a,b,A,c,b}}", "a\rb\rc" ; "lunique")]
    #[test_case("{lunion:{mklist:a,b},{mklist:B,c}}", "a\rb\rc" ; "lunion")]
    #[test_case("{lcommon:{mklist:a,b,c},{mklist:c,x,a,c}}", "c\ra" ; "lcommon")]
    #[test_case("{lremove:{mklist:a,b,c,a},{mklist:b}}", "a\rc" ; "lremove")]
    #[test_case("{lsort:{mklist:b10,B2,a}}", "a\rB2\rb10" ; "lsort natural")]
    #[test_case("{lsort:{mklist:1,3,2},x,y,{lt:{&x},{&y}}}", "3\r2\r1" ; "lsort custom")]
    #[test_case("{commas:{mklist:a,b,c}}", "a, b and c" ; "commas")]
    #[test_case("{commas:{mklist:a,b}, or }", "a or b" ; "commas two")]
    #[test_case("{commas:{mklist:1,2},;,n,<{&n}>}", "<1>;<2>" ; "commas with expression")]
    #[test_case("{commas:}", "" ; "commas empty")]
    #[test_case("{foreach:x,{mklist:a,b,c},{&x}}", "c" ; "foreach returns last")]
    #[test_case("{with:s,,{foreach:x,a b c,{set:s,{&s}{&x}}, }}", "abc" ; "foreach separator")]
    #[test_case("{with:s,,{for:i,1,5,2,{set:s,{&s}{&i}}}}", "135" ; "for")]
    #[test_case("{with:s,,{for:i,3,1,-1,{set:s,{&s}{&i}}}}", "321" ; "for down")]
    #[test_case("{filter:x,{mklist:1,0,2},{&x}}", "1\r2" ; "filter")]
    #[test_case("{filter:x,1 0 2,{&x}, ,+}", "1+2" ; "filter separators")]
    #[test_case("{parse:x,{mklist:a,b},<{&x}>}", "<a>\r<b>" ; "parse")]
    #[test_case("{fold:a,b,{mklist:1,2,3,4},{add:{&a},{&b}}}", "10" ; "fold")]
    fn test_lists(source: &str, expected: &str) {
        let mut t = TestWorld::new();
        assert_eq!(t.eval(source), expected);
    }

    #[test]
    fn test_lrand_picks_an_item() {
        let mut t = TestWorld::new();
        for _ in 0..10 {
            let picked = t.eval("{lrand:{mklist:a,b,c}}");
            assert!(["a", "b", "c"].contains(&picked.as_str()));
        }
        assert_eq!(t.eval("{lrand:}"), "");
    }

    #[test]
    fn test_loop_variables_are_scoped() {
        let mut t = TestWorld::new();
        let err = t.try_eval("{foreach:x,a,{&x}}{&x}").unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {&x}: Unrecognized variable."]);
    }

    #[test]
    fn test_iteration_limit() {
        let mut t = TestWorld::new();
        let err = t.try_eval("{for:i,1,2,0,x}").unwrap_err();
        assert_eq!(err.diagnostics[0], "(test) {FOR}: Iteration limit exceeded");
    }

    #[test]
    fn test_separator_errors() {
        let mut t = TestWorld::new();
        let err = t.try_eval("{count:abc,}").unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {COUNT}: Can't use null seperator string."]);
        let err = t.try_eval("{lsort:a,b}").unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {LSORT}: Takes 1 or 4 arguments."]);
    }
}
