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

//! Turning object references written in MPI (`me`, `here`, `#12`, `*Bob`, `$reg`, `widget`) into
//! objects, under the permission rules of the caller.

use muckr_common::matching::{DefaultObjectNameMatcher, ObjectNameMatcher, WsMatchEnv};
use muckr_common::model::{ObjType, PropValue, READLOCK_PROP, WorldState, test_lock};
use muckr_var::{HOME, NIL, NOTHING, Obj};
use tracing::trace;

use crate::mpi::context::{EvalContext, Frame};

/// The outcome of resolving an object reference.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Resolved {
    Found(Obj),
    /// Nothing matched, the match was ambiguous, or the result is not a usable object.
    Unknown,
    /// Something matched but the caller may not look at it.
    Denied,
}

impl Resolved {
    pub fn found(self) -> Option<Obj> {
        match self {
            Resolved::Found(obj) => Some(obj),
            _ => None,
        }
    }
}

/// How much access to the resolved object the caller needs.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResolveMode {
    /// No check beyond the match itself.
    Raw,
    /// The caller must be able to read the object.
    Readable,
    /// The object must be near the caller or the player, or readable.
    Local,
    /// The permission source must share the object's owner.
    Strict,
}

fn match_rooted(world: &dyn WorldState, player: Obj, text: &str) -> Obj {
    let matcher = DefaultObjectNameMatcher {
        env: WsMatchEnv::new(world),
        player,
    };
    matcher.match_object(text).unwrap_or(NOTHING)
}

/// Look a `$name` up in the `_reg/name` registry, searching `root` and then its environment.
fn match_registered(world: &dyn WorldState, root: Obj, name: &str) -> Obj {
    if name.is_empty() {
        return NOTHING;
    }
    let prop = format!("_reg/{name}");
    let mut here = root;
    for _ in 0..=world.db_top() {
        if !world.valid(here) {
            return NOTHING;
        }
        if let Ok(Some(entry)) = world.get_property(here, &prop) {
            return registered_value(world, &entry.value);
        }
        here = world.parent_of(here);
    }
    NOTHING
}

fn registered_value(world: &dyn WorldState, value: &PropValue) -> Obj {
    let obj = match value {
        PropValue::Str(s) => {
            let digits = s.strip_prefix('#').unwrap_or(s);
            match digits.parse::<i32>() {
                Ok(id) => Obj::mk_id(id),
                Err(_) => return NOTHING,
            }
        }
        PropValue::Int(id) => Obj::mk_id(*id),
        PropValue::Ref(obj) if *obj == HOME || *obj == NIL => return *obj,
        PropValue::Ref(obj) => *obj,
        PropValue::Lock(_) => return NOTHING,
    };
    if world.valid(obj) { obj } else { NOTHING }
}

/// Resolve `text` with no permission check.
pub fn resolve_raw(ctx: &EvalContext<'_>, frame: &Frame, text: &str) -> Resolved {
    let world = &*ctx.world;
    let player = ctx.player;
    let obj = if text.is_empty() {
        NOTHING
    } else if text.eq_ignore_ascii_case("this") {
        frame.what
    } else if text.eq_ignore_ascii_case("me") {
        player
    } else if text.eq_ignore_ascii_case("here") {
        world.location_of(player).unwrap_or(NOTHING)
    } else if text.eq_ignore_ascii_case("home") {
        world.home_of(player).unwrap_or(NOTHING)
    } else if let Some(name) = text.strip_prefix('$') {
        match match_registered(world, player, name) {
            NOTHING => match_registered(world, frame.what, name),
            HOME => world.home_of(player).unwrap_or(NOTHING),
            found => found,
        }
    } else {
        match match_rooted(world, player, text) {
            NOTHING => match_rooted(world, frame.what, text),
            found => found,
        }
    };
    let resolved = if world.valid(obj) {
        Resolved::Found(obj)
    } else {
        Resolved::Unknown
    };
    trace!(text, ?resolved, "resolved object reference");
    resolved
}

/// Resolve `text`, applying the check for `mode`.
pub fn resolve(ctx: &EvalContext<'_>, frame: &Frame, text: &str, mode: ResolveMode) -> Resolved {
    let resolved = resolve_raw(ctx, frame, text);
    let Resolved::Found(obj) = resolved else {
        return resolved;
    };
    let allowed = match mode {
        ResolveMode::Raw => true,
        ResolveMode::Readable => read_perms(ctx, frame, obj),
        ResolveMode::Local => local_perms(ctx, frame, obj),
        ResolveMode::Strict => {
            frame.blessed() || owner(ctx.world, frame.perms) == owner(ctx.world, obj)
        }
    };
    if allowed {
        resolved
    } else {
        trace!(text, ?obj, ?mode, "object reference denied");
        Resolved::Denied
    }
}

fn owner(world: &dyn WorldState, obj: Obj) -> Obj {
    world.owner_of(obj).unwrap_or(NOTHING)
}

fn is_room(world: &dyn WorldState, obj: Obj) -> bool {
    matches!(world.object_type(obj), Ok(ObjType::Room))
}

fn read_lock_passes(world: &dyn WorldState, who: Obj, obj: Obj) -> bool {
    matches!(test_lock(world, who, obj, READLOCK_PROP), Ok(Some(true)))
}

/// Whether the evaluation may read `obj`: it is the world root, the player, the permission
/// source, shares the permission source's owner, or lets that owner through its read lock.
pub fn read_perms(ctx: &EvalContext<'_>, frame: &Frame, obj: Obj) -> bool {
    let world = &*ctx.world;
    obj == muckr_var::SYSTEM_OBJECT
        || obj == ctx.player
        || obj == frame.perms
        || owner(world, frame.perms) == owner(world, obj)
        || read_lock_passes(world, owner(world, frame.perms), obj)
        || frame.blessed()
}

/// Whether two objects are in the same place, or one directly holds the other.
pub fn is_neighbor(world: &dyn WorldState, a: Obj, b: Obj) -> bool {
    if a == b {
        return true;
    }
    let (a_room, b_room) = (is_room(world, a), is_room(world, b));
    let loc = |o: Obj| world.location_of(o).unwrap_or(NOTHING);
    if !a_room && loc(a) == b {
        return true;
    }
    if !b_room && loc(b) == a {
        return true;
    }
    !a_room && !b_room && loc(a) != NOTHING && loc(a) == loc(b)
}

/// The "local" check: `obj` is somewhere the permission source or the player could plausibly
/// see, or its location's owner is the permission owner or lets them through, or it is readable.
pub fn local_perms(ctx: &EvalContext<'_>, frame: &Frame, obj: Obj) -> bool {
    let world = &*ctx.world;
    let location = world.location_of(obj).unwrap_or(NOTHING);
    let perms_owner = owner(world, frame.perms);
    if location != NOTHING && perms_owner == owner(world, location) {
        return true;
    }
    if is_neighbor(world, frame.perms, obj) || is_neighbor(world, ctx.player, obj) {
        return true;
    }
    if location != NOTHING && read_lock_passes(world, perms_owner, owner(world, location)) {
        return true;
    }
    read_perms(ctx, frame, obj)
}

/// Render an object for output: `*Name` for players, `#N` otherwise, `Bad` when out of range.
pub fn ref2str(world: &dyn WorldState, obj: Obj) -> String {
    if obj.id() < -4 || obj.id() >= world.db_top() {
        return "Bad".to_string();
    }
    if obj.is_positive()
        && matches!(world.object_type(obj), Ok(ObjType::Player))
        && let Ok(name) = world.name_of(obj)
    {
        return format!("*{name}");
    }
    obj.to_literal()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpi::context::{MpiFlag, MpiFlags};
    use crate::mpi::errors::AbortKind;
    use crate::testing::TestWorld;
    use muckr_common::model::{Lock, PropEntry, PropValue};
    use muckr_var::HOME;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("me", "alice" ; "me")]
    #[test_case("ME", "alice" ; "case insensitive")]
    #[test_case("here", "lobby" ; "here")]
    #[test_case("home", "lobby" ; "home")]
    #[test_case("this", "widget" ; "this")]
    #[test_case("statue", "statue" ; "neighbor")]
    #[test_case("wid", "widget" ; "alias prefix")]
    #[test_case("n", "north" ; "exit alias")]
    #[test_case("*bob", "bob" ; "player lookup")]
    #[test_case("#8", "garden" ; "literal")]
    #[test_case("$gnome", "gnome" ; "registered on room zero")]
    #[test_case("$pet", "widget" ; "registered on the player")]
    #[test_case("$homebase", "lobby" ; "registered home")]
    fn test_resolve_raw(text: &str, expected: &str) {
        let mut t = TestWorld::new();
        t.set_prop(t.room_zero, "_reg/gnome", "#9");
        t.set_prop(t.alice, "_reg/pet", "5");
        t.world
            .put_property(t.room_zero, "_reg/homebase", PropEntry::new(PropValue::Ref(HOME)))
            .unwrap();
        let expected = t.by_name(expected);
        let frame = Frame::new(t.widget, t.widget, MpiFlags::new());
        let alice = t.alice;
        let got = t.with_context(alice, |ctx| resolve_raw(ctx, &frame, text));
        assert_eq!(got, Resolved::Found(expected));
    }

    #[test]
    fn test_resolve_remote_and_unknown() {
        let mut t = TestWorld::new();
        // The gnome is in the garden with nobody around; only a match rooted at the trigger
        // (the garden) finds it.
        let frame = Frame::new(t.garden, t.garden, MpiFlags::new());
        let (alice, gnome) = (t.alice, t.gnome);
        t.with_context(alice, |ctx| {
            assert_eq!(resolve_raw(ctx, &frame, "gnome"), Resolved::Found(gnome));
            assert_eq!(resolve_raw(ctx, &frame, "nothing here"), Resolved::Unknown);
            assert_eq!(resolve_raw(ctx, &frame, ""), Resolved::Unknown);
            assert_eq!(resolve_raw(ctx, &frame, "#-1"), Resolved::Unknown);
            assert_eq!(resolve_raw(ctx, &frame, "#999"), Resolved::Unknown);
        });
    }

    #[test]
    fn test_registered_lookup_misses() {
        let mut t = TestWorld::new();
        t.set_prop(t.room_zero, "_reg/junk", "gnome");
        t.set_prop(t.room_zero, "_reg/gone", "#999");
        // Registered on Bob's garden: found only through the trigger's environment.
        t.set_prop(t.garden, "_reg/bench", "#9");
        let lobby = t.lobby;
        let frame = Frame::new(lobby, lobby, MpiFlags::new());
        let garden_frame = Frame::new(t.gnome, t.gnome, MpiFlags::new());
        let (alice, gnome) = (t.alice, t.gnome);
        t.with_context(alice, |ctx| {
            assert_eq!(resolve_raw(ctx, &frame, "$nothing"), Resolved::Unknown);
            assert_eq!(resolve_raw(ctx, &frame, "$"), Resolved::Unknown);
            assert_eq!(resolve_raw(ctx, &frame, "$junk"), Resolved::Unknown);
            assert_eq!(resolve_raw(ctx, &frame, "$gone"), Resolved::Unknown);
            assert_eq!(resolve_raw(ctx, &frame, "$bench"), Resolved::Unknown);
            assert_eq!(resolve_raw(ctx, &garden_frame, "$bench"), Resolved::Found(gnome));
        });
        let err = t.try_eval("{name:$nothing}").unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {NAME}: Match failed."]);
        assert_eq!(t.eval("{ref:$nothing}"), "#-1");
    }

    #[test]
    fn test_registered_names_in_mpi() {
        let mut t = TestWorld::new();
        t.set_prop(t.room_zero, "_reg/gnome", "#9");
        t.set_prop(t.room_zero, "_reg/statue", "#6");
        assert_eq!(t.eval("{name:$gnome}"), "gnome");
        assert_eq!(t.eval("{ref:$statue}"), "#6");
        // The gnome is out of reach, so its number needs a blessed caller.
        assert_eq!(t.try_eval("{ref:$gnome}").unwrap_err().kind, AbortKind::Permission);
        assert_eq!(t.eval_blessed("{ref:$gnome}"), "#9");
    }

    #[test]
    fn test_resolve_modes() {
        let mut t = TestWorld::new();
        let frame = Frame::new(t.alice, t.alice, MpiFlags::new());
        let blessed = frame.with(MpiFlag::Blessed, true);
        let (alice, statue, gnome) = (t.alice, t.statue, t.gnome);
        t.with_context(alice, |ctx| {
            // Bob's statue is in the same room: local, but neither readable nor strict.
            assert_eq!(resolve(ctx, &frame, "statue", ResolveMode::Local), Resolved::Found(statue));
            assert_eq!(resolve(ctx, &frame, "statue", ResolveMode::Readable), Resolved::Denied);
            assert_eq!(resolve(ctx, &frame, "statue", ResolveMode::Strict), Resolved::Denied);
            assert_eq!(
                resolve(ctx, &blessed, "statue", ResolveMode::Strict),
                Resolved::Found(statue)
            );
            // The gnome is far away in Bob's garden.
            assert_eq!(resolve(ctx, &frame, "#9", ResolveMode::Local), Resolved::Denied);
            assert_eq!(resolve(ctx, &blessed, "#9", ResolveMode::Local), Resolved::Found(gnome));
        });
    }

    #[test]
    fn test_read_lock_grants_access() {
        let mut t = TestWorld::new();
        t.world
            .put_property(
                t.statue,
                READLOCK_PROP,
                PropEntry::new(PropValue::Lock(Lock::Object(t.alice))),
            )
            .unwrap();
        let frame = Frame::new(t.alice, t.alice, MpiFlags::new());
        let (alice, statue) = (t.alice, t.statue);
        t.with_context(alice, |ctx| {
            assert_eq!(
                resolve(ctx, &frame, "statue", ResolveMode::Readable),
                Resolved::Found(statue)
            );
        });
    }

    #[test]
    fn test_neighbors() {
        let t = TestWorld::new();
        let world: &dyn WorldState = &t.world;
        assert!(is_neighbor(world, t.alice, t.statue));
        assert!(is_neighbor(world, t.alice, t.widget));
        assert!(is_neighbor(world, t.statue, t.lobby));
        assert!(is_neighbor(world, t.lobby, t.alice));
        assert!(!is_neighbor(world, t.alice, t.gnome));
        assert!(!is_neighbor(world, t.lobby, t.garden));
    }

    #[test]
    fn test_ref2str() {
        let t = TestWorld::new();
        let world: &dyn WorldState = &t.world;
        assert_eq!(ref2str(world, t.alice), "*Alice");
        assert_eq!(ref2str(world, t.widget), "#5");
        assert_eq!(ref2str(world, HOME), "#-3");
        assert_eq!(ref2str(world, Obj::mk_id(-7)), "Bad");
        assert_eq!(ref2str(world, Obj::mk_id(500)), "Bad");
    }
}
