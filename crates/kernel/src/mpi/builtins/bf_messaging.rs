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

//! `tell` and `otell`.

use muckr_common::model::{ObjType, WorldState};
use muckr_var::{NOTHING, Obj};

use crate::mpi::builtins::{BfCallState, BuiltinRegistry};
use crate::mpi::context::MpiFlag;
use crate::mpi::errors::{AbortKind, MpiError};
use crate::mpi::resolve::{ResolveMode, resolve};

/// Longest part of the speaker's name put in front of a message.
const SPEAKER_NAME_LEN: usize = 16;

fn otype(world: &dyn WorldState, obj: Obj) -> Option<ObjType> {
    world.object_type(obj).ok()
}

fn owner(world: &dyn WorldState, obj: Obj) -> Obj {
    world.owner_of(obj).unwrap_or(NOTHING)
}

/// Whether the trigger is a room, or an exit in one.
fn room_bound(world: &dyn WorldState, what: Obj) -> bool {
    match otype(world, what) {
        Some(ObjType::Room) => true,
        Some(ObjType::Exit) => {
            let loc = world.location_of(what).unwrap_or(NOTHING);
            otype(world, loc) == Some(ObjType::Room)
        }
        _ => false,
    }
}

/// Whether `ancestor` encloses `obj`, directly or further up.
fn encloses(world: &dyn WorldState, ancestor: Obj, obj: Obj) -> bool {
    let mut here = obj;
    for _ in 0..=world.db_top() {
        if here == NOTHING {
            return false;
        }
        if here == ancestor {
            return true;
        }
        here = world.parent_of(here);
    }
    false
}

/// `NAME msg`, the way a pose or say from the player reads.
fn attributed(world: &dyn WorldState, player: Obj, msg: &str, line: &str) -> String {
    let name: String = world
        .name_of(player)
        .unwrap_or_default()
        .chars()
        .take(SPEAKER_NAME_LEN)
        .collect();
    let gap = if msg.starts_with('\'') || msg.starts_with(char::is_whitespace) {
        ""
    } else {
        " "
    };
    format!("{name}{gap}{line}")
}

fn starts_with_name(world: &dyn WorldState, player: Obj, msg: &str) -> bool {
    let name = world.name_of(player).unwrap_or_default();
    msg.get(..name.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(&name))
}

fn check_listener(bf_args: &BfCallState<'_, '_>) -> Result<(), MpiError> {
    let what = bf_args.frame.what;
    if bf_args.frame.is(MpiFlag::Listener)
        && otype(&*bf_args.ctx.world, what) != Some(ObjType::Room)
    {
        return Err(bf_args.abort_kind(AbortKind::Permission, "Permission denied."));
    }
    Ok(())
}

/// `{tell:msg[,who]}`: send each line of `msg` to `who` (by default the player). Messages
/// from objects the player does not stand behind are attributed, and flagged with `> ` when
/// they reach someone other than the player or the permission owner.
fn bf_tell(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let target = if bf_args.argc() > 1 {
        bf_args.obj_arg(1, ResolveMode::Local)?
    } else {
        bf_args.player()
    };
    check_listener(bf_args)?;
    let world = &*bf_args.ctx.world;
    let (what, player) = (bf_args.frame.what, bf_args.player());
    let msg = bf_args.arg(0);
    let plain = otype(world, what) == Some(ObjType::Room)
        || owner(world, what) == target
        || owner(world, target) == player
        || target == player
        || room_bound(world, what)
        || starts_with_name(world, player, msg);
    let marker = if target == owner(world, bf_args.frame.perms) || target == player {
        ""
    } else {
        "> "
    };
    for line in msg.split('\r').filter(|l| !l.is_empty()) {
        let text = if plain {
            line.to_string()
        } else {
            attributed(world, player, msg, line)
        };
        bf_args.ctx.notify(target, &format!("{marker}{text}"));
    }
    Ok(msg.to_string())
}

/// `{otell:msg[,room[,except]]}`: send each line of `msg` to everything in `room` (by default
/// the player's location) other than `except` (by default the player).
fn bf_otell(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let room = if bf_args.argc() > 1 {
        bf_args.obj_arg(1, ResolveMode::Local)?
    } else {
        bf_args.ctx.world.location_of(bf_args.player())?
    };
    check_listener(bf_args)?;
    let except = if bf_args.argc() > 2 {
        resolve(&*bf_args.ctx, &bf_args.frame, bf_args.arg(2), ResolveMode::Raw)
            .found()
            .unwrap_or(NOTHING)
    } else {
        bf_args.player()
    };
    let world = &*bf_args.ctx.world;
    let (what, player) = (bf_args.frame.what, bf_args.player());
    let msg = bf_args.arg(0);
    let plain = ((owner(world, what) == owner(world, room) || encloses(world, what, room))
        && room_bound(world, what))
        || starts_with_name(world, player, msg);
    let hearers: Vec<Obj> = world
        .contents_of(room)?
        .into_iter()
        .filter(|&o| o != except)
        .collect();
    for line in msg.split('\r').filter(|l| !l.is_empty()) {
        let text = if plain {
            line.to_string()
        } else {
            attributed(world, player, msg, line)
        };
        for &hearer in &hearers {
            bf_args.ctx.notify(hearer, &text);
        }
    }
    Ok(msg.to_string())
}

pub(crate) fn register_bf_messaging(builtins: &mut BuiltinRegistry) {
    builtins.register("tell", bf_tell);
    builtins.register("otell", bf_otell);
}

#[cfg(test)]
mod tests {
    use crate::mpi::context::MpiFlag;
    use crate::mpi::errors::AbortKind;
    use crate::testing::TestWorld;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tell_self_is_plain() {
        let mut t = TestWorld::new();
        assert_eq!(t.eval("{tell:Hello}"), "Hello");
        assert_eq!(t.messages(t.alice), vec!["Hello"]);
    }

    #[test]
    fn test_tell_other_is_attributed() {
        let mut t = TestWorld::new();
        t.eval("{tell:waves.,statue}");
        assert_eq!(t.messages(t.statue), vec!["> Alice waves."]);
        t.eval("{tell:'s here,statue}");
        assert_eq!(t.messages(t.statue), vec!["> Alice waves.", "> Alice's here"]);
        // Bob is elsewhere, and not Alice's to reach.
        let err = t.try_eval("{tell:psst,*bob}").unwrap_err();
        assert_eq!(err.kind, AbortKind::Permission);
        assert!(t.messages(t.bob).is_empty());
    }

    #[test]
    fn test_tell_own_object_is_plain() {
        let mut t = TestWorld::new();
        t.eval("{tell:ping,widget}");
        assert_eq!(t.messages(t.widget), vec!["> ping"]);
    }

    #[test]
    fn test_tell_multiline() {
        let mut t = TestWorld::new();
        t.eval("{tell:one{nl}two}");
        assert_eq!(t.messages(t.alice), vec!["one", "two"]);
    }

    #[test]
    fn test_otell_skips_player() {
        let mut t = TestWorld::new();
        assert_eq!(t.eval("{otell:waves.}"), "waves.");
        assert_eq!(t.messages(t.statue), vec!["Alice waves."]);
        assert!(t.messages(t.alice).is_empty());
        t.eval("{otell:Alice nods{nl}Alice smiles,here,statue}");
        assert_eq!(t.messages(t.alice), vec!["Alice nods", "Alice smiles"]);
        assert_eq!(t.messages(t.statue), vec!["Alice waves."]);
    }

    #[test]
    fn test_listener_needs_room_trigger() {
        let mut t = TestWorld::new();
        let err = t
            .try_eval_flags("{tell:psst}", &[MpiFlag::Listener])
            .unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {TELL}: Permission denied."]);
    }
}
