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

//! The safe property accessor: every property read, write and blessing MPI performs goes
//! through here, so that hidden, private and system properties stay out of reach of unblessed
//! code. Also the numbered-list conventions built on top of plain reads.

use muckr_common::model::{PropValue, is_hidden, is_private, is_see_only, is_system};
use muckr_var::{NOTHING, Obj};
use tracing::trace;

use crate::mpi::context::{EvalContext, Frame};

/// Subtree holding MPI macros; unblessed code may not write into it.
pub const MACROS_PROPDIR: &str = "_msgmacs";

/// The text of a property as MPI sees it, and whether the property itself was blessed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropRead {
    pub value: String,
    pub blessed: bool,
}

fn owner_or_nothing(ctx: &EvalContext<'_>, obj: Obj) -> Obj {
    ctx.world.owner_of(obj).unwrap_or(NOTHING)
}

/// Read one property from `obj` itself. Returns `None`, after telling the player why, when the
/// name is empty or the property may not be read. A missing property reads as empty.
pub fn read_strict(ctx: &EvalContext<'_>, frame: &Frame, obj: Obj, name: &str) -> Option<PropRead> {
    let name = name.trim_start_matches('/');
    if name.is_empty() {
        ctx.tell_player("PropFetch: Propname required.");
        return None;
    }
    let denied = is_system(name)
        || (!frame.blessed()
            && (is_hidden(name)
                || (is_private(name)
                    && owner_or_nothing(ctx, frame.perms) != owner_or_nothing(ctx, obj))));
    if denied {
        trace!(?obj, name, "property read denied");
        ctx.tell_player("PropFetch: Permission denied.");
        return None;
    }
    let entry = ctx.world.get_property(obj, name).ok().flatten();
    Some(match entry {
        Some(entry) => PropRead {
            value: entry.value.as_text(),
            blessed: entry.blessed,
        },
        None => PropRead::default(),
    })
}

/// Read a property from `obj` or, failing a non-empty value, from the first object up its
/// environment that has one.
pub fn read_scanned(
    ctx: &EvalContext<'_>,
    frame: &Frame,
    obj: Obj,
    name: &str,
) -> Option<PropRead> {
    let mut obj = obj;
    let mut steps = 0;
    while obj != NOTHING && steps <= ctx.world.db_top() {
        let read = read_strict(ctx, frame, obj, name)?;
        if !read.value.is_empty() {
            return Some(read);
        }
        obj = ctx.world.parent_of(obj);
        steps += 1;
    }
    Some(PropRead::default())
}

/// Like [`read_scanned`], but values are only accepted from objects owned by `whom`, or from
/// blessed properties.
pub fn read_limited(
    ctx: &EvalContext<'_>,
    frame: &Frame,
    obj: Obj,
    whom: Obj,
    name: &str,
) -> Option<PropRead> {
    let mut obj = obj;
    let mut steps = 0;
    while obj != NOTHING && steps <= ctx.world.db_top() {
        let read = read_strict(ctx, frame, obj, name)?;
        if !read.value.is_empty() && (owner_or_nothing(ctx, obj) == whom || read.blessed) {
            return Some(read);
        }
        obj = ctx.world.parent_of(obj);
        steps += 1;
    }
    Some(PropRead::default())
}

fn writable_name(name: &str) -> Option<&str> {
    let name = name.trim_start_matches('/');
    if name.is_empty() || name.contains(['\r', ':']) {
        return None;
    }
    Some(name)
}

/// Set (or with `None` or an empty value, remove) a property. Returns false if refused.
pub fn write_prop(
    ctx: &mut EvalContext<'_>,
    frame: &Frame,
    obj: Obj,
    name: &str,
    value: Option<&str>,
) -> bool {
    let Some(name) = writable_name(name) else {
        return false;
    };
    if is_system(name) {
        return false;
    }
    if !frame.blessed() {
        let macro_prefix = format!("{MACROS_PROPDIR}/");
        let in_macros = name
            .get(..macro_prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(&macro_prefix));
        if is_hidden(name) || is_see_only(name) || in_macros {
            return false;
        }
    }
    let result = match value {
        Some(v) if !v.is_empty() => ctx.world.set_property(obj, name, PropValue::from(v)),
        _ => ctx.world.remove_property(obj, name),
    };
    result.is_ok()
}

/// Set or clear the blessed bit on a property. Only blessed code may do this.
pub fn bless_prop(
    ctx: &mut EvalContext<'_>,
    frame: &Frame,
    obj: Obj,
    name: &str,
    on: bool,
) -> bool {
    let Some(name) = writable_name(name) else {
        return false;
    };
    if !frame.blessed() {
        return false;
    }
    ctx.world.set_property_blessed(obj, name, on).is_ok()
}

fn list_base(listname: &str) -> &str {
    listname.strip_suffix('#').unwrap_or(listname)
}

/// Item `n` of a list stored as `name#/N`, `name/N` or `nameN`, whichever is found first.
pub fn list_item(
    ctx: &EvalContext<'_>,
    frame: &Frame,
    obj: Obj,
    listname: &str,
    n: usize,
) -> Option<PropRead> {
    let base = list_base(listname);
    for candidate in [format!("{base}#/{n}"), format!("{base}/{n}")] {
        let read = read_scanned(ctx, frame, obj, &candidate)?;
        if !read.value.is_empty() {
            return Some(read);
        }
    }
    read_scanned(ctx, frame, obj, &format!("{base}{n}"))
}

/// Number of items in a list: an explicit `name#` or `name/#` count if set, otherwise the
/// number of consecutive items present.
pub fn list_count(ctx: &EvalContext<'_>, frame: &Frame, obj: Obj, listname: &str) -> usize {
    let base = list_base(listname);
    for candidate in [format!("{base}#"), format!("{base}/#")] {
        if let Some(read) = read_scanned(ctx, frame, obj, &candidate)
            && !read.value.is_empty()
        {
            return crate::mpi::strings::atoi(&read.value).max(0) as usize;
        }
    }
    let limit = ctx.config.list_limit;
    for i in 1..limit {
        match list_item(ctx, frame, obj, base, i) {
            None => return 0,
            Some(read) if read.value.is_empty() => return i - 1,
            Some(_) => {}
        }
    }
    limit
}

/// How [`concat_list`] joins items.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ConcatMode {
    /// One item per line.
    Lines,
    /// Run together as prose: single spaces, two after sentence punctuation.
    Prose,
    /// Run together with nothing in between.
    Packed,
}

/// Read a whole list into one string. `None` when the list is empty. The result is blessed
/// only if every item was.
pub fn concat_list(
    ctx: &EvalContext<'_>,
    frame: &Frame,
    obj: Obj,
    listname: &str,
    mode: ConcatMode,
) -> Option<PropRead> {
    let count = list_count(ctx, frame, obj, listname);
    if count == 0 {
        return None;
    }
    let limit = ctx.config.buffer_len.saturating_sub(3);
    let mut out = String::new();
    let mut blessed = true;
    for i in 1..=count.min(ctx.config.list_limit) {
        if out.len() >= limit {
            break;
        }
        let Some(item) = list_item(ctx, frame, obj, listname, i) else {
            continue;
        };
        blessed &= item.blessed;
        let text = match mode {
            ConcatMode::Lines => item.value.as_str(),
            _ => item.value.trim_start(),
        };
        if !out.is_empty() {
            match mode {
                ConcatMode::Lines => out.push('\r'),
                ConcatMode::Prose => {
                    if out.ends_with(['.', '?', '!']) {
                        out.push(' ');
                    }
                    out.push(' ');
                }
                ConcatMode::Packed => {}
            }
        }
        out.push_str(text);
        if mode != ConcatMode::Lines {
            let trimmed = out.trim_end_matches(' ').len();
            out.truncate(trimmed);
        }
    }
    crate::mpi::strings::truncate_to(&mut out, limit);
    Some(PropRead {
        value: out,
        blessed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpi::context::{MpiFlag, MpiFlags};
    use crate::testing::TestWorld;
    use muckr_common::model::{PropEntry, WorldState};
    use pretty_assertions::assert_eq;

    fn frame_for(t: &TestWorld, blessed: bool) -> Frame {
        Frame::new(t.alice, t.alice, MpiFlags::new()).with(MpiFlag::Blessed, blessed)
    }

    #[test]
    fn test_strict_read_permissions() {
        let mut t = TestWorld::new();
        t.set_prop(t.bob, "@secret", "hidden");
        t.set_prop(t.bob, ".diary", "private");
        t.set_prop(t.bob, "public", "hello");
        let frame = frame_for(&t, false);
        let alice = t.alice;
        let bob = t.bob;
        t.with_context(alice, |ctx| {
            assert_eq!(read_strict(ctx, &frame, bob, "/public").unwrap().value, "hello");
            assert_eq!(read_strict(ctx, &frame, bob, "missing").unwrap().value, "");
            assert!(read_strict(ctx, &frame, bob, "@secret").is_none());
            assert!(read_strict(ctx, &frame, bob, ".diary").is_none());
            assert!(read_strict(ctx, &frame, bob, "//").is_none());
            let blessed = frame.with(MpiFlag::Blessed, true);
            assert_eq!(read_strict(ctx, &blessed, bob, ".diary").unwrap().value, "private");
            assert!(read_strict(ctx, &blessed, bob, "@__sys__/x").is_none());
        });
        assert_eq!(
            t.messages(alice),
            vec![
                "PropFetch: Permission denied.".to_string(),
                "PropFetch: Permission denied.".to_string(),
                "PropFetch: Propname required.".to_string(),
                "PropFetch: Permission denied.".to_string(),
            ]
        );
    }

    #[test]
    fn test_scanned_and_limited_reads() {
        let mut t = TestWorld::new();
        t.set_prop(t.lobby, "motto", "lobby motto");
        t.set_prop(t.room_zero, "motto", "global motto");
        let frame = frame_for(&t, false);
        let (alice, lobby, wizard) = (t.alice, t.lobby, t.wizard);
        t.with_context(alice, |ctx| {
            assert_eq!(
                read_scanned(ctx, &frame, alice, "motto").unwrap().value,
                "lobby motto"
            );
            // The lobby is owned by the wizard, so an Alice-limited scan skips it.
            assert_eq!(read_limited(ctx, &frame, alice, alice, "motto").unwrap().value, "");
            assert_eq!(
                read_limited(ctx, &frame, lobby, wizard, "motto").unwrap().value,
                "lobby motto"
            );
        });
    }

    #[test]
    fn test_write_rules() {
        let mut t = TestWorld::new();
        let frame = frame_for(&t, false);
        let alice = t.alice;
        t.with_context(alice, |ctx| {
            assert!(write_prop(ctx, &frame, alice, "mood", Some("happy")));
            assert!(!write_prop(ctx, &frame, alice, "@hidden", Some("x")));
            assert!(!write_prop(ctx, &frame, alice, "~seen", Some("x")));
            assert!(!write_prop(ctx, &frame, alice, "_msgmacs/foo", Some("x")));
            assert!(!write_prop(ctx, &frame, alice, "a:b", Some("x")));
            let blessed = frame.with(MpiFlag::Blessed, true);
            assert!(write_prop(ctx, &blessed, alice, "_msgmacs/foo", Some("x")));
            assert!(!write_prop(ctx, &blessed, alice, "@__sys__/foo", Some("x")));
            assert!(write_prop(ctx, &frame, alice, "mood", None));
        });
        assert_eq!(t.prop(alice, "mood"), None);
        assert_eq!(t.prop(alice, "_msgmacs/foo").as_deref(), Some("x"));
    }

    #[test]
    fn test_bless_requires_blessing() {
        let mut t = TestWorld::new();
        t.set_prop(t.alice, "desc", "{prop:x}");
        let frame = frame_for(&t, false);
        let alice = t.alice;
        t.with_context(alice, |ctx| {
            assert!(!bless_prop(ctx, &frame, alice, "desc", true));
            assert!(bless_prop(ctx, &frame.with(MpiFlag::Blessed, true), alice, "desc", true));
        });
        assert!(t.world.get_property(alice, "desc").unwrap().unwrap().blessed);
    }

    #[test]
    fn test_lists() {
        let mut t = TestWorld::new();
        t.set_prop(t.alice, "notes#/1", "First line.");
        t.set_prop(t.alice, "notes#/2", "  second");
        t.set_prop(t.alice, "notes#/3", "third ");
        t.world
            .put_property(
                t.alice,
                "blessed/1",
                PropEntry {
                    value: PropValue::from("x"),
                    blessed: true,
                },
            )
            .unwrap();
        let frame = frame_for(&t, false);
        let alice = t.alice;
        t.with_context(alice, |ctx| {
            assert_eq!(list_count(ctx, &frame, alice, "notes"), 3);
            assert_eq!(list_count(ctx, &frame, alice, "notes#"), 3);
            assert_eq!(list_item(ctx, &frame, alice, "notes", 2).unwrap().value, "  second");
            assert_eq!(
                concat_list(ctx, &frame, alice, "notes", ConcatMode::Lines).unwrap().value,
                "First line.\r  second\rthird "
            );
            assert_eq!(
                concat_list(ctx, &frame, alice, "notes", ConcatMode::Prose).unwrap().value,
                "First line.  second third"
            );
            assert_eq!(
                concat_list(ctx, &frame, alice, "notes", ConcatMode::Packed).unwrap().value,
                "First line.secondthird"
            );
            assert!(concat_list(ctx, &frame, alice, "nothing", ConcatMode::Lines).is_none());
            assert!(concat_list(ctx, &frame, alice, "blessed", ConcatMode::Lines).unwrap().blessed);
            assert!(!concat_list(ctx, &frame, alice, "notes", ConcatMode::Lines).unwrap().blessed);
        });
    }
}
