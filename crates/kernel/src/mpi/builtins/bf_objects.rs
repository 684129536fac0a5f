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

//! Object introspection: names, ownership, location, contents, type, flags, locks, connection
//! status and timestamps.

use muckr_common::model::{
    LOCK_PROP, ObjFlag, ObjType, Timestamps, WorldState, is_hidden, is_private, is_system,
    test_lock, unparse_flags,
};
use muckr_common::tasks::Session;
use muckr_var::{AMBIGUOUS, HOME, NOTHING, Obj};

use crate::mpi::builtins::{BfCallState, BuiltinRegistry};
use crate::mpi::context::MpiFlag;
use crate::mpi::errors::{AbortKind, MpiError};
use crate::mpi::resolve::{ResolveMode, Resolved, is_neighbor, ref2str, resolve};
use crate::mpi::strings::{atoi, bool_str, is_number};

/// `#-1`, `#-2`, `#-3` or `#-4` written out literally.
fn sentinel_literal(text: &str) -> Option<Obj> {
    Obj::try_from(text).ok().filter(Obj::is_sentinel)
}

/// Resolve `text`, aborting with the given messages when it does not match or is off limits.
fn find(
    bf_args: &BfCallState<'_, '_>,
    text: &str,
    mode: ResolveMode,
    failed: &str,
    denied: &str,
) -> Result<Obj, MpiError> {
    match resolve(&*bf_args.ctx, &bf_args.frame, text, mode) {
        Resolved::Found(obj) => Ok(obj),
        Resolved::Unknown => Err(bf_args.abort_kind(AbortKind::Permission, failed)),
        Resolved::Denied => Err(bf_args.abort_kind(AbortKind::Permission, denied)),
    }
}

/// Resolve argument `i`, aborting with the usual messages.
fn find_arg(bf_args: &BfCallState<'_, '_>, i: usize, mode: ResolveMode) -> Result<Obj, MpiError> {
    find(bf_args, bf_args.arg(i), mode, "Match failed.", "Permission denied.")
}

fn resolve_arg(bf_args: &BfCallState<'_, '_>, i: usize, mode: ResolveMode) -> Resolved {
    resolve(&*bf_args.ctx, &bf_args.frame, bf_args.arg(i), mode)
}

fn owner(world: &dyn WorldState, obj: Obj) -> Obj {
    world.owner_of(obj).unwrap_or(NOTHING)
}

fn otype(world: &dyn WorldState, obj: Obj) -> Option<ObjType> {
    world.object_type(obj).ok()
}

fn has_flag(world: &dyn WorldState, obj: Obj, flag: ObjFlag) -> bool {
    world.flags_of(obj).is_ok_and(|f| f.contains(flag))
}

/// Render a list of objects, one per line, stopping at the list limit or the output bound.
fn ref_list(bf_args: &BfCallState<'_, '_>, objs: impl IntoIterator<Item = Obj>) -> String {
    let world = &*bf_args.ctx.world;
    let limit = bf_args.limit().saturating_sub(2);
    let mut out = String::new();
    for obj in objs.into_iter().take(bf_args.ctx.config.list_limit) {
        let item = ref2str(world, obj);
        if out.len() + item.len() >= limit {
            break;
        }
        if !out.is_empty() {
            out.push('\r');
        }
        out.push_str(&item);
    }
    out
}

fn sentinel_name(obj: Obj) -> Option<&'static str> {
    match obj {
        NOTHING => Some("#NOTHING#"),
        AMBIGUOUS => Some("#AMBIGUOUS#"),
        HOME => Some("#HOME#"),
        _ => None,
    }
}

fn object_name(bf_args: &BfCallState<'_, '_>, full: bool) -> Result<String, MpiError> {
    if let Some(name) = sentinel_literal(bf_args.arg(0)).and_then(sentinel_name) {
        return Ok(name.to_string());
    }
    let obj = find_arg(bf_args, 0, ResolveMode::Raw)?;
    let world = &*bf_args.ctx.world;
    let name = world.name_of(obj)?;
    if !full && otype(world, obj) == Some(ObjType::Exit) {
        return Ok(name.split(';').next().unwrap_or_default().to_string());
    }
    Ok(name)
}

/// The name, with an exit's aliases dropped.
fn bf_name(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    object_name(bf_args, false)
}

fn bf_fullname(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    object_name(bf_args, true)
}

/// `#N` for the referenced object, `#-1` if nothing matches.
fn bf_ref(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let text = bf_args.arg(0).trim_start();
    if let Some(number) = text.strip_prefix('#')
        && is_number(number)
    {
        return Ok(format!("#{}", atoi(number)));
    }
    match resolve_arg(bf_args, 0, ResolveMode::Local) {
        Resolved::Found(obj) => Ok(obj.to_literal()),
        Resolved::Unknown => Ok(NOTHING.to_literal()),
        Resolved::Denied => Err(bf_args.abort_kind(AbortKind::Permission, "Permission denied.")),
    }
}

fn bf_owner(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let obj = find(
        bf_args,
        bf_args.arg(0),
        ResolveMode::Raw,
        "Failed match.",
        "Permission denied.",
    )?;
    let world = &*bf_args.ctx.world;
    Ok(ref2str(world, owner(world, obj)))
}

/// `{controls:obj[,who]}`: whether `who` (by default the owner of the permission source)
/// controls `obj`.
fn bf_controls(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let obj = find(
        bf_args,
        bf_args.arg(0),
        ResolveMode::Raw,
        "Match failed. (arg1)",
        "Permission denied. (arg1)",
    )?;
    let who = if bf_args.argc() > 1 {
        find(
            bf_args,
            bf_args.arg(1),
            ResolveMode::Raw,
            "Match failed. (arg2)",
            "Permission denied. (arg2)",
        )?
    } else {
        bf_args.frame.perms
    };
    let world = &*bf_args.ctx.world;
    Ok(bool_str(world.controls(owner(world, who), obj)))
}

/// Where an object leads: a room's drop-to, the home of a thing or player, or every
/// destination of an exit.
fn bf_links(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let obj = find_arg(bf_args, 0, ResolveMode::Readable)?;
    let world = &*bf_args.ctx.world;
    let links = world.links_of(obj)?;
    match otype(world, obj) {
        Some(ObjType::Exit) if !links.is_empty() => Ok(ref_list(bf_args, links)),
        Some(ObjType::Room | ObjType::Player | ObjType::Thing) => {
            Ok(ref2str(world, links.first().copied().unwrap_or(NOTHING)))
        }
        _ => Ok(NOTHING.to_literal()),
    }
}

/// `{locked:who,obj}`: whether `obj`'s lock keeps `who` out.
fn bf_locked(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let who = find(
        bf_args,
        bf_args.arg(0),
        ResolveMode::Local,
        "Match failed. (arg1)",
        "Permission denied. (arg1)",
    )?;
    let obj = find(
        bf_args,
        bf_args.arg(1),
        ResolveMode::Local,
        "Match failed. (arg2)",
        "Permission denied. (arg2)",
    )?;
    let passes = test_lock(&*bf_args.ctx.world, who, obj, LOCK_PROP)?.unwrap_or(true);
    Ok(bool_str(!passes))
}

/// `{testlock:obj,prop[,who[,default]]}`: test the lock stored in `prop`. With no lock there,
/// the result is `default` if given, otherwise success.
fn bf_testlock(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let obj = find(
        bf_args,
        bf_args.arg(0),
        ResolveMode::Local,
        "Match failed. (arg1)",
        "Permission denied. (arg1)",
    )?;
    let who = if bf_args.argc() > 2 {
        find(
            bf_args,
            bf_args.arg(2),
            ResolveMode::Local,
            "Match failed. (arg3)",
            "Permission denied. (arg3)",
        )?
    } else {
        bf_args.player()
    };
    let world = &*bf_args.ctx.world;
    if !matches!(otype(world, who), Some(ObjType::Player | ObjType::Thing)) {
        return Err(bf_args.abort("Invalid object type. (arg3)"));
    }
    let prop = bf_args.arg(1);
    if is_system(prop) {
        return Err(bf_args.abort_kind(AbortKind::Permission, "Permission denied. (arg1)"));
    }
    if !bf_args.frame.blessed()
        && (is_hidden(prop)
            || (is_private(prop)
                && owner(world, bf_args.frame.perms) != owner(world, bf_args.frame.what)))
    {
        return Err(bf_args.abort_kind(AbortKind::Permission, "Permission denied. (arg2)"));
    }
    match test_lock(world, who, obj, prop)? {
        None if bf_args.argc() > 3 => Ok(bf_args.arg(3).to_string()),
        None => Ok(bool_str(true)),
        Some(passes) => Ok(bool_str(passes)),
    }
}

const TYPE_ERROR: &str = "Type must be 'player', 'room', 'thing', 'program', or 'exit'. (arg2).";

/// `{contents:obj[,type]}`: what `obj` holds and the caller can see.
fn bf_contents(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let obj = find_arg(bf_args, 0, ResolveMode::Local)?;
    let wanted = if bf_args.argc() > 1 {
        match bf_args.arg(1).parse::<ObjType>() {
            Ok(t) if t != ObjType::Garbage => Some(t),
            _ => return Err(bf_args.abort(TYPE_ERROR)),
        }
    } else {
        None
    };
    let world = &*bf_args.ctx.world;
    let perms = bf_args.frame.perms;
    let own_room = world.controls(perms, obj);
    let visible = |o: Obj| {
        let t = otype(world, o);
        if wanted.is_some() && t != wanted {
            return false;
        }
        if t == Some(ObjType::Room) && wanted != Some(ObjType::Room) {
            return false;
        }
        let dark = has_flag(world, o, ObjFlag::Dark)
            || has_flag(world, world.location_of(o).unwrap_or(NOTHING), ObjFlag::Dark)
            || (t == Some(ObjType::Program) && !has_flag(world, o, ObjFlag::LinkOk));
        own_room || world.controls(perms, o) || !dark
    };
    let shown: Vec<Obj> = world.contents_of(obj)?.into_iter().filter(|&o| visible(o)).collect();
    Ok(ref_list(bf_args, shown))
}

fn bf_exits(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let obj = find_arg(bf_args, 0, ResolveMode::Readable)?;
    let world = &*bf_args.ctx.world;
    let exits = match otype(world, obj) {
        Some(ObjType::Room | ObjType::Thing | ObjType::Player) => world.exits_of(obj)?,
        _ => vec![],
    };
    Ok(ref_list(bf_args, exits))
}

fn bf_loc(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let obj = find_arg(bf_args, 0, ResolveMode::Local)?;
    let world = &*bf_args.ctx.world;
    Ok(ref2str(world, world.location_of(obj)?))
}

fn bf_money(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let obj = find_arg(bf_args, 0, ResolveMode::Readable)?;
    let world = &*bf_args.ctx.world;
    match otype(world, obj) {
        Some(ObjType::Thing | ObjType::Player) => Ok(world.pennies_of(obj)?.to_string()),
        _ => Ok("0".to_string()),
    }
}

fn bf_flags(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let obj = find_arg(bf_args, 0, ResolveMode::Local)?;
    let world = &*bf_args.ctx.world;
    Ok(unparse_flags(world.object_type(obj)?, world.flags_of(obj)?))
}

/// The type name of the referenced object: `Player`, `Room`, `Exit`, `Thing`, `Program`, or
/// `Bad` when it is not an object.
fn type_name(bf_args: &BfCallState<'_, '_>) -> Result<String, MpiError> {
    if sentinel_literal(bf_args.arg(0)) == Some(HOME) {
        return Ok(ObjType::Room.to_string());
    }
    match resolve_arg(bf_args, 0, ResolveMode::Local) {
        Resolved::Found(obj) => Ok(match otype(&*bf_args.ctx.world, obj) {
            Some(ObjType::Garbage) | None => "Bad".to_string(),
            Some(t) => t.to_string(),
        }),
        Resolved::Unknown => Ok("Bad".to_string()),
        Resolved::Denied => Err(bf_args.abort_kind(AbortKind::Permission, "Permission Denied.")),
    }
}

fn bf_type(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    type_name(bf_args)
}

fn bf_istype(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let actual = type_name(bf_args)?;
    Ok(bool_str(actual.eq_ignore_ascii_case(bf_args.arg(1))))
}

/// The player an object stands for when asking about connections: players themselves, and the
/// owners of zombie things.
fn puppeteer(world: &dyn WorldState, obj: Obj) -> Option<Obj> {
    match otype(world, obj)? {
        ObjType::Player => Some(obj),
        ObjType::Thing if has_flag(world, obj, ObjFlag::Zombie) => Some(owner(world, obj)),
        _ => None,
    }
}

/// The number of connections the player (or zombie's owner) has open.
fn bf_awake(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let Resolved::Found(obj) = resolve_arg(bf_args, 0, ResolveMode::Local) else {
        return Ok("0".to_string());
    };
    let Some(player) = puppeteer(&*bf_args.ctx.world, obj) else {
        return Ok("0".to_string());
    };
    let count = bf_args.ctx.session.connection_count(player).unwrap_or(0);
    Ok(count.to_string())
}

/// Seconds from the owner's least idle connection, via `measure`, or -1 when not connected.
fn connection_seconds(
    bf_args: &BfCallState<'_, '_>,
    measure: fn(&dyn Session, Obj) -> Option<f64>,
) -> Result<String, MpiError> {
    let obj = match resolve_arg(bf_args, 0, ResolveMode::Raw) {
        Resolved::Found(obj) => obj,
        Resolved::Unknown => return Ok("-1".to_string()),
        Resolved::Denied => {
            return Err(bf_args.abort_kind(AbortKind::Permission, "Permission denied."));
        }
    };
    let who = owner(&*bf_args.ctx.world, obj);
    match measure(bf_args.ctx.session.as_ref(), who) {
        Some(secs) => Ok((secs as i64).to_string()),
        None => Ok("-1".to_string()),
    }
}

fn bf_ontime(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    connection_seconds(bf_args, |s, p| s.connected_seconds(p).ok())
}

fn bf_idle(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    connection_seconds(bf_args, |s, p| s.idle_seconds(p).ok())
}

/// Every connected player. Only available to blessed evaluations.
fn bf_online(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    if !bf_args.frame.is(MpiFlag::Blessed) {
        return Err(bf_args.abort_kind(AbortKind::Permission, "Permission denied."));
    }
    let players = bf_args.ctx.session.connected_players().unwrap_or_default();
    Ok(ref_list(bf_args, players))
}

/// `{contains:obj[,container]}`: whether `obj` is somewhere inside `container`, by default the
/// player.
fn bf_contains(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let inner = find(
        bf_args,
        bf_args.arg(0),
        ResolveMode::Raw,
        "Match failed (1).",
        "Permission Denied (1).",
    )?;
    let outer = if bf_args.argc() > 1 {
        find(
            bf_args,
            bf_args.arg(1),
            ResolveMode::Local,
            "Match failed (2).",
            "Permission Denied (2).",
        )?
    } else {
        bf_args.player()
    };
    let world = &*bf_args.ctx.world;
    let mut here = inner;
    for _ in 0..=world.db_top() {
        if here == outer || here == NOTHING {
            break;
        }
        here = world.location_of(here).unwrap_or(NOTHING);
    }
    Ok(bool_str(here == outer))
}

/// `{holds:obj[,holder]}`: whether `holder` (by default the player) directly holds `obj`.
fn bf_holds(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let held = find(
        bf_args,
        bf_args.arg(0),
        ResolveMode::Raw,
        "Match failed (1).",
        "Permission Denied (1).",
    )?;
    let holder = if bf_args.argc() > 1 {
        find(
            bf_args,
            bf_args.arg(1),
            ResolveMode::Local,
            "Match failed (2).",
            "Permission Denied (2).",
        )?
    } else {
        bf_args.player()
    };
    Ok(bool_str(bf_args.ctx.world.location_of(held)? == holder))
}

/// `{nearby:obj[,obj2]}`: whether the two objects (the second defaulting to the trigger) are
/// neighbours. Unless blessed, one of them must be near the trigger or the player.
fn bf_nearby(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let a = find(
        bf_args,
        bf_args.arg(0),
        ResolveMode::Raw,
        "Match failed (arg1).",
        "Permission denied (arg1).",
    )?;
    let b = if bf_args.argc() > 1 {
        find(
            bf_args,
            bf_args.arg(1),
            ResolveMode::Raw,
            "Match failed (arg2).",
            "Permission denied (arg2).",
        )?
    } else {
        bf_args.frame.what
    };
    let world = &*bf_args.ctx.world;
    let (what, player) = (bf_args.frame.what, bf_args.player());
    let local = is_neighbor(world, a, what)
        || is_neighbor(world, b, what)
        || is_neighbor(world, a, player)
        || is_neighbor(world, b, player);
    if !bf_args.frame.blessed() && !local {
        return Err(bf_args.abort_kind(
            AbortKind::Permission,
            "Permission denied.  Neither object is local.",
        ));
    }
    Ok(bool_str(is_neighbor(world, a, b)))
}

/// An object reference that may also be a literal `#-1` style sentinel.
fn ref_or_sentinel(bf_args: &BfCallState<'_, '_>, i: usize, failed: &str) -> Result<Obj, MpiError> {
    match sentinel_literal(bf_args.arg(i)) {
        Some(obj) => Ok(obj),
        None => find(bf_args, bf_args.arg(i), ResolveMode::Raw, failed, failed),
    }
}

/// Whether two references name the same object. Literal `#-1` style references compare too.
fn bf_dbeq(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let a = ref_or_sentinel(bf_args, 0, "Match failed (1).")?;
    let b = ref_or_sentinel(bf_args, 1, "Match failed (2).")?;
    Ok(bool_str(a == b))
}

fn timestamp(
    bf_args: &BfCallState<'_, '_>,
    field: fn(&Timestamps) -> i64,
) -> Result<String, MpiError> {
    let obj = find_arg(bf_args, 0, ResolveMode::Readable)?;
    let stamps = bf_args.ctx.world.timestamps_of(obj)?;
    Ok(field(&stamps).to_string())
}

fn bf_created(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    timestamp(bf_args, |t| t.created)
}

fn bf_modified(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    timestamp(bf_args, |t| t.modified)
}

fn bf_lastused(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    timestamp(bf_args, |t| t.last_used)
}

fn bf_usecount(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    timestamp(bf_args, |t| t.use_count as i64)
}

pub(crate) fn register_bf_objects(builtins: &mut BuiltinRegistry) {
    builtins.register("name", bf_name);
    builtins.register("fullname", bf_fullname);
    builtins.register("ref", bf_ref);
    builtins.register("owner", bf_owner);
    builtins.register("controls", bf_controls);
    builtins.register("links", bf_links);
    builtins.register("locked", bf_locked);
    builtins.register("testlock", bf_testlock);
    builtins.register("contents", bf_contents);
    builtins.register("exits", bf_exits);
    builtins.register("loc", bf_loc);
    builtins.register("money", bf_money);
    builtins.register("flags", bf_flags);
    builtins.register("type", bf_type);
    builtins.register("istype", bf_istype);
    builtins.register("awake", bf_awake);
    builtins.register("ontime", bf_ontime);
    builtins.register("idle", bf_idle);
    builtins.register("online", bf_online);
    builtins.register("contains", bf_contains);
    builtins.register("holds", bf_holds);
    builtins.register("nearby", bf_nearby);
    builtins.register("dbeq", bf_dbeq);
    builtins.register("created", bf_created);
    builtins.register("modified", bf_modified);
    builtins.register("lastused", bf_lastused);
    builtins.register("usecount", bf_usecount);
}

#[cfg(test)]
mod tests {
    use crate::testing::TestWorld;
    use muckr_common::model::{Lock, PropEntry, PropValue, Timestamps};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("{name:me}", "Alice" ; "name of player")]
    #[test_case("{name:north}", "north" ; "exit name drops aliases")]
    #[test_case("{fullname:north}", "north;n" ; "fullname keeps aliases")]
    #[test_case("{name:#-1}{name:#-3}", "#NOTHING##HOME#" ; "sentinel names")]
    #[test_case("{ref:me}{ref:#5}{ref:nobody}", "#3#5#-1" ; "ref")]
    #[test_case("{owner:widget}{owner:here}", "*Alice*Wizard" ; "owner")]
    #[test_case("{loc:me}{loc:widget}", "#2*Alice" ; "loc")]
    #[test_case("{contents:here}", "*Alice\r#6" ; "contents")]
    #[test_case("{contents:here,player}", "*Alice" ; "contents of type")]
    #[test_case("{links:north}{links:me}", "#8#2" ; "links")]
    #[test_case("{money:me}", "50" ; "money")]
    #[test_case(
        "{type:me}{type:here}{type:north}{type:widget}{type:nobody}",
        "PlayerRoomExitThingBad"
        ; "type"
    )]
    #[test_case("{istype:me,player}{istype:nobody,bad}{istype:me,room}", "110" ; "istype")]
    #[test_case("{flags:me}", "P" ; "flags")]
    #[test_case("{controls:widget}{controls:statue}", "10" ; "controls")]
    #[test_case("{controls:statue,*bob}", "1" ; "controls for someone else")]
    #[test_case("{contains:widget}{contains:widget,here}{contains:statue}", "110" ; "contains")]
    #[test_case("{holds:widget}{holds:widget,here}", "10" ; "holds")]
    #[test_case("{nearby:statue}{nearby:widget,statue}", "10" ; "nearby")]
    #[test_case("{dbeq:me,*alice}{dbeq:me,here}{dbeq:#-1,#-1}", "101" ; "dbeq")]
    fn test_objects(source: &str, expected: &str) {
        let mut t = TestWorld::new();
        assert_eq!(t.eval(source), expected);
    }

    #[test]
    fn test_match_failures() {
        let mut t = TestWorld::new();
        let err = t.try_eval("{loc:nobody}").unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {LOC}: Match failed."]);
        let err = t.try_eval("{owner:nobody}").unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {OWNER}: Failed match."]);
    }

    #[test]
    fn test_nearby_requires_locality() {
        let mut t = TestWorld::new();
        let err = t.try_eval("{nearby:#9,#8}").unwrap_err();
        assert_eq!(
            err.diagnostics,
            vec!["(test) {NEARBY}: Permission denied.  Neither object is local."]
        );
        assert_eq!(t.eval_blessed("{nearby:#9,#8}"), "1");
    }

    #[test]
    fn test_exits_need_read_permission() {
        let mut t = TestWorld::new();
        let err = t.try_eval("{exits:here}").unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {EXITS}: Permission denied."]);
        assert_eq!(t.eval_blessed("{exits:here}"), "#7");
    }

    #[test]
    fn test_locks() {
        let mut t = TestWorld::new();
        assert_eq!(t.eval("{locked:me,statue}"), "0");
        t.world
            .put_property(
                t.statue,
                "_/lok",
                PropEntry::new(PropValue::Lock(Lock::Object(t.bob))),
            )
            .unwrap();
        assert_eq!(t.eval("{locked:me,statue}"), "1");
        assert_eq!(t.eval("{testlock:statue,_/lok}"), "0");
        assert_eq!(t.eval("{testlock:statue,_/nolock,me,maybe}"), "maybe");
        assert_eq!(t.eval("{testlock:statue,_/nolock}"), "1");
    }

    #[test]
    fn test_connections() {
        let mut t = TestWorld::new();
        assert_eq!(t.eval("{awake:me}{ontime:me}{idle:me}"), "0-1-1");
        t.session.connect(t.alice, 120.5, 7.0);
        assert_eq!(t.eval("{awake:me}{ontime:me}{idle:widget}"), "11207");
        let err = t.try_eval("{online}").unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {ONLINE}: Permission denied."]);
        assert_eq!(t.eval_blessed("{online}"), "*Alice");
    }

    #[test]
    fn test_timestamps() {
        let mut t = TestWorld::new();
        t.world
            .set_timestamps(
                t.widget,
                Timestamps {
                    created: 100,
                    modified: 200,
                    last_used: 300,
                    use_count: 4,
                },
            )
            .unwrap();
        assert_eq!(
            t.eval("{created:widget},{modified:widget},{lastused:widget},{usecount:widget}"),
            "100,200,300,4"
        );
    }
}
