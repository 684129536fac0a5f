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

//! Property builtins. Reads, writes and blessings all go through the safe accessor in
//! [`crate::mpi::props`]; the `exec`-style builtins then evaluate what they read, trusted only as
//! far as the property itself is blessed.

use muckr_common::model::{WorldState, is_hidden, is_private, is_read_only, is_see_only, is_system};
use muckr_var::{NOTHING, Obj};
use rand::Rng;

use crate::mpi::builtins::{BfCallState, BuiltinRegistry};
use crate::mpi::context::MpiFlag;
use crate::mpi::errors::MpiError;
use crate::mpi::props::{
    ConcatMode, PropRead, bless_prop, concat_list, list_count, list_item, read_scanned,
    read_strict, write_prop,
};
use crate::mpi::resolve::ResolveMode;
use crate::mpi::strings::{atoi, bool_str, is_number, smatch};

/// Whether a read climbs the environment or stays on the object.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Reach {
    Environment,
    Object,
}

/// The object named by argument `i`, or the trigger when there are not that many arguments.
fn target(bf_args: &BfCallState<'_, '_>, i: usize, mode: ResolveMode) -> Result<Obj, MpiError> {
    if bf_args.argc() > i {
        bf_args.obj_arg(i, mode)
    } else {
        Ok(bf_args.frame.what)
    }
}

fn read(bf_args: &BfCallState<'_, '_>, obj: Obj, name: &str, reach: Reach) -> Option<PropRead> {
    match reach {
        Reach::Environment => read_scanned(&*bf_args.ctx, &bf_args.frame, obj, name),
        Reach::Object => read_strict(&*bf_args.ctx, &bf_args.frame, obj, name),
    }
}

fn read_or_abort(
    bf_args: &BfCallState<'_, '_>,
    obj: Obj,
    name: &str,
    reach: Reach,
) -> Result<PropRead, MpiError> {
    read(bf_args, obj, name, reach).ok_or_else(|| bf_args.abort("Failed read."))
}

/// Whether `name` is set on `obj` or, for environment reads, anywhere it inherits from.
fn prop_exists(world: &dyn WorldState, obj: Obj, name: &str, reach: Reach) -> bool {
    let mut here = obj;
    for _ in 0..=world.db_top() {
        if here == NOTHING {
            break;
        }
        if matches!(world.get_property(here, name), Ok(Some(_))) {
            return true;
        }
        if reach == Reach::Object {
            break;
        }
        here = world.parent_of(here);
    }
    false
}

fn is_restricted(name: &str) -> bool {
    is_read_only(name) || is_private(name) || is_see_only(name) || is_hidden(name)
}

/// Evaluate text read from `obj`. Restricted property classes run with `obj` as the
/// permission source; the blessing is whatever the property carried.
fn run_read(
    bf_args: &mut BfCallState<'_, '_>,
    obj: Obj,
    classify: &str,
    read: PropRead,
    detail: &str,
) -> Result<String, MpiError> {
    let perms = if is_restricted(classify) {
        obj
    } else {
        bf_args.frame.what
    };
    let frame = bf_args
        .frame
        .running_on(obj, perms)
        .with(MpiFlag::Blessed, read.blessed);
    bf_args.eval_with(frame, &read.value, detail)
}

fn fetch(bf_args: &mut BfCallState<'_, '_>, reach: Reach) -> Result<String, MpiError> {
    let obj = target(bf_args, 1, ResolveMode::Readable)?;
    let name = bf_args.arg(0);
    let value = read_or_abort(bf_args, obj, name, reach)?.value;
    if value.is_empty() && !prop_exists(&*bf_args.ctx.world, obj, name, reach) {
        return Err(bf_args.abort("Failed read."));
    }
    Ok(value)
}

/// `{prop:name[,obj]}`: a property's text, looked up the environment.
fn bf_prop(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    fetch(bf_args, Reach::Environment)
}

/// `{prop!:name[,obj]}`: as `prop`, on the object alone.
fn bf_prop_bang(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    fetch(bf_args, Reach::Object)
}

fn exec(bf_args: &mut BfCallState<'_, '_>, reach: Reach) -> Result<String, MpiError> {
    let obj = target(bf_args, 1, ResolveMode::Readable)?;
    let name = bf_args.arg(0).trim_start_matches('/').to_string();
    let read = read_or_abort(bf_args, obj, &name, reach)?;
    run_read(bf_args, obj, &name, read, "propval")
}

/// `{exec:name[,obj]}`: evaluate a property.
fn bf_exec(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    exec(bf_args, Reach::Environment)
}

fn bf_exec_bang(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    exec(bf_args, Reach::Object)
}

/// Read a property whose value names a second property, and evaluate that.
fn index(bf_args: &mut BfCallState<'_, '_>, reach: Reach) -> Result<String, MpiError> {
    let obj = target(bf_args, 1, ResolveMode::Readable)?;
    let pointer = read_or_abort(bf_args, obj, bf_args.arg(0), reach)?.value;
    if pointer.is_empty() {
        return Ok(String::new());
    }
    let read = read_or_abort(bf_args, obj, &pointer, reach)?;
    let classify = read.value.clone();
    run_read(bf_args, obj, &classify, read, "listval")
}

fn bf_index(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    index(bf_args, Reach::Environment)
}

fn bf_index_bang(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    index(bf_args, Reach::Object)
}

/// `{list:name[,obj]}`: a numbered list, one item per line.
fn bf_list(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let obj = target(bf_args, 1, ResolveMode::Readable)?;
    let read = concat_list(&*bf_args.ctx, &bf_args.frame, obj, bf_args.arg(0), ConcatMode::Lines);
    Ok(read.map(|r| r.value).unwrap_or_default())
}

/// `{concat:name[,obj]}`: a numbered list run together as prose.
fn bf_concat(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let obj = target(bf_args, 1, ResolveMode::Readable)?;
    concat_list(&*bf_args.ctx, &bf_args.frame, obj, bf_args.arg(0), ConcatMode::Prose)
        .map(|r| r.value)
        .ok_or_else(|| bf_args.abort("Failed list read."))
}

/// `{lexec:name[,obj]}`: a numbered list joined with nothing in between, then evaluated.
fn bf_lexec(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let obj = target(bf_args, 1, ResolveMode::Readable)?;
    let name = bf_args.arg(0).trim_start_matches('/').to_string();
    let read = concat_list(&*bf_args.ctx, &bf_args.frame, obj, &name, ConcatMode::Packed)
        .unwrap_or_default();
    run_read(bf_args, obj, &name, read, "listval")
}

/// Fetch item `n` of a list and evaluate it, the item's own text deciding its trust.
fn run_item(
    bf_args: &mut BfCallState<'_, '_>,
    obj: Obj,
    listname: &str,
    n: usize,
) -> Result<String, MpiError> {
    let read = list_item(&*bf_args.ctx, &bf_args.frame, obj, listname, n)
        .ok_or_else(|| bf_args.abort("Failed list read."))?;
    let classify = read.value.clone();
    run_read(bf_args, obj, &classify, read, "listval")
}

fn nonempty_count(
    bf_args: &BfCallState<'_, '_>,
    obj: Obj,
    listname: &str,
) -> Result<usize, MpiError> {
    match list_count(&*bf_args.ctx, &bf_args.frame, obj, listname) {
        0 => Err(bf_args.abort("Failed list read.")),
        n => Ok(n),
    }
}

/// `{rand:listname[,obj]}`: evaluate a random item of a list.
fn bf_rand(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let obj = target(bf_args, 1, ResolveMode::Readable)?;
    let listname = bf_args.arg(0).to_string();
    let count = nonempty_count(bf_args, obj, &listname)?;
    let which = rand::rng().random_range(1..=count);
    run_item(bf_args, obj, &listname, which)
}

/// `{timesub:period,offset,listname[,obj]}`: evaluate the list item for the current point in a
/// repeating period of `period` seconds.
fn bf_timesub(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let period = i64::from(atoi(bf_args.arg(0)));
    let offset = i64::from(atoi(bf_args.arg(1)));
    let obj = target(bf_args, 3, ResolveMode::Readable)?;
    let listname = bf_args.arg(2).to_string();
    let count = nonempty_count(bf_args, obj, &listname)?;
    if period < 1 {
        return Err(bf_args.abort("Time period too short."));
    }
    let now = chrono::Utc::now().timestamp();
    let slot = (((now + offset) % period) * count as i64 / period).unsigned_abs() as usize;
    run_item(bf_args, obj, &listname, slot + 1)
}

/// Consecutive items `select` tries before falling back to scanning the properties.
const SELECT_PROBES: usize = 19;

/// `/a//b` as `a/b`.
fn normalize(name: &str) -> String {
    name.split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

/// The item number of `name` if it is `base` followed by a number.
fn item_number(name: &str, base: &str) -> Option<i32> {
    let rest = strip_prefix_ci(name, base)?;
    is_number(rest).then(|| atoi(rest))
}

/// The best `select` candidate on one object: the highest-numbered item at or below `wanted`,
/// stored as `base<N>`, `base/<N>` or `base#/<N>`.
fn best_item(world: &dyn WorldState, obj: Obj, base: &str, wanted: i32) -> Option<(i32, String)> {
    let dir = base.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
    let mut best: Option<(i32, String)> = None;
    let mut consider = |n: i32, name: &str| {
        if n <= wanted && best.as_ref().is_none_or(|(b, _)| *b < n) {
            best = Some((n, name.to_string()));
        }
    };
    for name in world.property_names(obj, dir).unwrap_or_default() {
        let Some(rest) = strip_prefix_ci(&name, base) else {
            continue;
        };
        let rest = rest.strip_prefix('#').unwrap_or(rest);
        if rest.is_empty() && world.is_propdir(obj, &name).unwrap_or(false) {
            let sub_base = format!("{name}/");
            for child in world.property_names(obj, &name).unwrap_or_default() {
                if let Some(n) = item_number(&child, &sub_base) {
                    consider(n, &child);
                }
            }
        }
        if let Some(n) = item_number(&name, base) {
            consider(n, &name);
        }
    }
    best
}

/// `{select:value,listname[,obj]}`: the list item numbered `value`, or failing that the
/// nearest lower-numbered one. Suited to sparse lists keyed by number.
fn bf_select(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let obj = target(bf_args, 2, ResolveMode::Readable)?;
    let wanted = atoi(bf_args.arg(0));
    let listname = bf_args.arg(1);
    if let Ok(top) = usize::try_from(wanted) {
        for n in (0..=top).rev().take(SELECT_PROBES) {
            let item = list_item(&*bf_args.ctx, &bf_args.frame, obj, listname, n)
                .ok_or_else(|| bf_args.abort("Failed list read."))?;
            if !item.value.is_empty() {
                return Ok(item.value);
            }
        }
    }

    let base = normalize(listname);
    let world = &*bf_args.ctx.world;
    let mut best: Option<(i32, Obj, String)> = None;
    let mut here = obj;
    for _ in 0..=world.db_top() {
        if here == NOTHING {
            break;
        }
        if let Some((n, name)) = best_item(world, here, &base, wanted)
            && best.as_ref().is_none_or(|(b, _, _)| *b < n)
        {
            best = Some((n, here, name));
        }
        here = world.parent_of(here);
    }
    match best {
        Some((_, holder, name)) => read_strict(&*bf_args.ctx, &bf_args.frame, holder, &name)
            .map(|r| r.value)
            .ok_or_else(|| bf_args.abort("Failed property read.")),
        None => Ok(String::new()),
    }
}

/// `{listprops:dir[,obj[,pattern]]}`: the properties directly under `dir` the caller may see,
/// optionally only those whose last path segment matches `pattern`.
fn bf_listprops(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let obj = target(bf_args, 1, ResolveMode::Readable)?;
    let pattern = (bf_args.argc() > 2).then(|| bf_args.arg(2));
    let world = &*bf_args.ctx.world;
    let owner = |o: Obj| world.owner_of(o).unwrap_or(NOTHING);
    let what = bf_args.frame.what;
    let blessed = bf_args.frame.blessed();
    let visible = |name: &str| {
        if is_system(name) {
            return false;
        }
        if !blessed
            && (is_hidden(name)
                || (is_private(name) && owner(what) != owner(obj))
                || (obj != bf_args.player() && owner(obj) != owner(what)))
        {
            return false;
        }
        match pattern {
            Some(pattern) => {
                let leaf = name.rsplit('/').next().unwrap_or(name);
                smatch(pattern, leaf)
            }
            None => true,
        }
    };
    let limit = bf_args.ctx.config.buffer_len;
    let mut out = String::new();
    for name in world.property_names(obj, bf_args.arg(0))? {
        if !visible(&name) || out.len() + name.len() + 2 >= limit {
            continue;
        }
        if !out.is_empty() {
            out.push('\r');
        }
        out.push_str(&name);
    }
    Ok(out)
}

/// `{propdir:name[,obj]}`: whether `name` has properties beneath it.
fn bf_propdir(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let obj = target(bf_args, 1, ResolveMode::Readable)?;
    Ok(bool_str(bf_args.ctx.world.is_propdir(obj, bf_args.arg(0))?))
}

/// `{store:value,name[,obj]}`: set a property, returning the value stored.
fn bf_store(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let obj = target(bf_args, 2, ResolveMode::Strict)?;
    let (value, name) = (bf_args.arg(0).to_string(), bf_args.arg(1).to_string());
    let frame = bf_args.frame;
    if !write_prop(bf_args.ctx, &frame, obj, &name, Some(&value)) {
        return Err(bf_args.abort("Permission denied."));
    }
    Ok(value)
}

fn bf_delprop(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let obj = target(bf_args, 1, ResolveMode::Strict)?;
    let name = bf_args.arg(0).to_string();
    let frame = bf_args.frame;
    if !write_prop(bf_args.ctx, &frame, obj, &name, None) {
        return Err(bf_args.abort("Permission denied."));
    }
    Ok(String::new())
}

fn set_blessing(bf_args: &mut BfCallState<'_, '_>, on: bool) -> Result<String, MpiError> {
    let obj = target(bf_args, 1, ResolveMode::Strict)?;
    let name = bf_args.arg(0).to_string();
    let frame = bf_args.frame;
    if !bless_prop(bf_args.ctx, &frame, obj, &name, on) {
        return Err(bf_args.abort("Permission denied."));
    }
    Ok(String::new())
}

/// `{bless:name[,obj]}`: mark a property as trusted. Only blessed code may.
fn bf_bless(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    set_blessing(bf_args, true)
}

fn bf_unbless(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    set_blessing(bf_args, false)
}

pub(crate) fn register_bf_properties(builtins: &mut BuiltinRegistry) {
    builtins.register("prop", bf_prop);
    builtins.register("prop!", bf_prop_bang);
    builtins.register("exec", bf_exec);
    builtins.register("exec!", bf_exec_bang);
    builtins.register("index", bf_index);
    builtins.register("index!", bf_index_bang);
    builtins.register("list", bf_list);
    builtins.register("concat", bf_concat);
    builtins.register("lexec", bf_lexec);
    builtins.register("rand", bf_rand);
    builtins.register("timesub", bf_timesub);
    builtins.register("select", bf_select);
    builtins.register("listprops", bf_listprops);
    builtins.register("propdir", bf_propdir);
    builtins.register("store", bf_store);
    builtins.register("delprop", bf_delprop);
    builtins.register("bless", bf_bless);
    builtins.register("unbless", bf_unbless);
}
