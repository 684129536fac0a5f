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

//! A simple in-memory world. Objects live in a vector indexed by object number; each object's
//! property tree is a sorted map keyed by the case-folded, normalized path.

use std::collections::BTreeMap;
use std::time::Duration;

use muckr_common::model::{
    ObjFlag, ObjType, PropEntry, PropValue, Timestamps, WorldState, WorldStateError,
    normalize_prop_name,
};
use muckr_common::util::BitEnum;
use muckr_var::{NOTHING, Obj};
use tracing::trace;

#[derive(Debug, Clone)]
struct StoredProp {
    /// The name as it was first written, for listing.
    name: String,
    entry: PropEntry,
}

#[derive(Debug, Clone)]
struct ObjectRec {
    name: String,
    otype: ObjType,
    owner: Obj,
    location: Obj,
    links: Vec<Obj>,
    flags: BitEnum<ObjFlag>,
    pennies: i32,
    timestamps: Timestamps,
    props: BTreeMap<String, StoredProp>,
    mpi_uses: u64,
    mpi_time: Duration,
}

/// In-memory implementation of [`WorldState`].
#[derive(Debug, Clone, Default)]
pub struct MemWorld {
    objects: Vec<Option<ObjectRec>>,
}

fn prop_key(name: &str) -> String {
    normalize_prop_name(name).to_lowercase()
}

impl MemWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new object at the next free number. Players own themselves when `owner` is
    /// `NOTHING`.
    pub fn create(&mut self, name: &str, otype: ObjType, owner: Obj, location: Obj) -> Obj {
        let oid = Obj::mk_id(self.objects.len() as i32);
        self.insert(oid, name, otype, owner, location);
        oid
    }

    /// Create (or replace) the object with a specific number, growing the database as needed.
    pub fn insert(&mut self, oid: Obj, name: &str, otype: ObjType, owner: Obj, location: Obj) {
        let idx = oid.id() as usize;
        if self.objects.len() <= idx {
            self.objects.resize(idx + 1, None);
        }
        let owner = if owner.is_nothing() { oid } else { owner };
        self.objects[idx] = Some(ObjectRec {
            name: name.to_string(),
            otype,
            owner,
            location,
            links: vec![],
            flags: BitEnum::new(),
            pennies: 0,
            timestamps: Timestamps::default(),
            props: BTreeMap::new(),
            mpi_uses: 0,
            mpi_time: Duration::ZERO,
        });
    }

    fn rec(&self, oid: Obj) -> Result<&ObjectRec, WorldStateError> {
        if !oid.is_positive() {
            return Err(WorldStateError::ObjectNotFound(oid));
        }
        self.objects
            .get(oid.id() as usize)
            .and_then(|o| o.as_ref())
            .ok_or(WorldStateError::ObjectNotFound(oid))
    }

    fn rec_mut(&mut self, oid: Obj) -> Result<&mut ObjectRec, WorldStateError> {
        if !oid.is_positive() {
            return Err(WorldStateError::ObjectNotFound(oid));
        }
        self.objects
            .get_mut(oid.id() as usize)
            .and_then(|o| o.as_mut())
            .ok_or(WorldStateError::ObjectNotFound(oid))
    }

    pub fn set_links(&mut self, oid: Obj, links: Vec<Obj>) -> Result<(), WorldStateError> {
        self.rec_mut(oid)?.links = links;
        Ok(())
    }

    pub fn set_flag(&mut self, oid: Obj, flag: ObjFlag) -> Result<(), WorldStateError> {
        self.rec_mut(oid)?.flags.set(flag);
        Ok(())
    }

    pub fn set_flags(&mut self, oid: Obj, flags: BitEnum<ObjFlag>) -> Result<(), WorldStateError> {
        self.rec_mut(oid)?.flags = flags;
        Ok(())
    }

    pub fn set_pennies(&mut self, oid: Obj, pennies: i32) -> Result<(), WorldStateError> {
        self.rec_mut(oid)?.pennies = pennies;
        Ok(())
    }

    pub fn set_timestamps(&mut self, oid: Obj, ts: Timestamps) -> Result<(), WorldStateError> {
        self.rec_mut(oid)?.timestamps = ts;
        Ok(())
    }

    pub fn set_location(&mut self, oid: Obj, location: Obj) -> Result<(), WorldStateError> {
        self.rec_mut(oid)?.location = location;
        Ok(())
    }

    pub fn set_owner(&mut self, oid: Obj, owner: Obj) -> Result<(), WorldStateError> {
        self.rec_mut(oid)?.owner = owner;
        Ok(())
    }

    /// Set a property and its blessed bit in one go.
    pub fn put_property(
        &mut self,
        oid: Obj,
        name: &str,
        entry: PropEntry,
    ) -> Result<(), WorldStateError> {
        let key = prop_key(name);
        if key.is_empty() {
            return Err(WorldStateError::InvalidPropertyName(name.to_string()));
        }
        let display = normalize_prop_name(name);
        let rec = self.rec_mut(oid)?;
        rec.props.insert(
            key,
            StoredProp {
                name: display,
                entry,
            },
        );
        Ok(())
    }

    /// How many MPI evaluations were recorded against `oid`, and their total time.
    pub fn mpi_profile(&self, oid: Obj) -> Option<(u64, Duration)> {
        self.rec(oid).ok().map(|r| (r.mpi_uses, r.mpi_time))
    }

    fn children_of(&self, oid: Obj, otype_filter: impl Fn(ObjType) -> bool) -> Vec<Obj> {
        self.objects
            .iter()
            .enumerate()
            .filter_map(|(i, o)| o.as_ref().map(|o| (Obj::mk_id(i as i32), o)))
            .filter(|(_, o)| o.location == oid && otype_filter(o.otype))
            .map(|(i, _)| i)
            .collect()
    }
}

impl WorldState for MemWorld {
    fn valid(&self, obj: Obj) -> bool {
        self.rec(obj)
            .map(|r| r.otype != ObjType::Garbage)
            .unwrap_or(false)
    }

    fn db_top(&self) -> i32 {
        self.objects.len() as i32
    }

    fn object_type(&self, obj: Obj) -> Result<ObjType, WorldStateError> {
        Ok(self.rec(obj)?.otype)
    }

    fn name_of(&self, obj: Obj) -> Result<String, WorldStateError> {
        Ok(self.rec(obj)?.name.clone())
    }

    fn owner_of(&self, obj: Obj) -> Result<Obj, WorldStateError> {
        Ok(self.rec(obj)?.owner)
    }

    fn location_of(&self, obj: Obj) -> Result<Obj, WorldStateError> {
        Ok(self.rec(obj)?.location)
    }

    fn contents_of(&self, obj: Obj) -> Result<Vec<Obj>, WorldStateError> {
        self.rec(obj)?;
        Ok(self.children_of(obj, |t| t != ObjType::Exit && t != ObjType::Garbage))
    }

    fn exits_of(&self, obj: Obj) -> Result<Vec<Obj>, WorldStateError> {
        self.rec(obj)?;
        Ok(self.children_of(obj, |t| t == ObjType::Exit))
    }

    fn links_of(&self, obj: Obj) -> Result<Vec<Obj>, WorldStateError> {
        let rec = self.rec(obj)?;
        Ok(match rec.otype {
            ObjType::Program | ObjType::Garbage => vec![],
            _ => rec.links.clone(),
        })
    }

    fn flags_of(&self, obj: Obj) -> Result<BitEnum<ObjFlag>, WorldStateError> {
        Ok(self.rec(obj)?.flags)
    }

    fn pennies_of(&self, obj: Obj) -> Result<i32, WorldStateError> {
        Ok(self.rec(obj)?.pennies)
    }

    fn timestamps_of(&self, obj: Obj) -> Result<Timestamps, WorldStateError> {
        Ok(self.rec(obj)?.timestamps)
    }

    fn get_property(&self, obj: Obj, name: &str) -> Result<Option<PropEntry>, WorldStateError> {
        let key = prop_key(name);
        Ok(self.rec(obj)?.props.get(&key).map(|p| p.entry.clone()))
    }

    fn set_property(
        &mut self,
        obj: Obj,
        name: &str,
        value: PropValue,
    ) -> Result<(), WorldStateError> {
        trace!(?obj, name, "set property");
        let key = prop_key(name);
        if key.is_empty() {
            return Err(WorldStateError::InvalidPropertyName(name.to_string()));
        }
        let display = normalize_prop_name(name);
        let rec = self.rec_mut(obj)?;
        match rec.props.get_mut(&key) {
            Some(existing) => existing.entry.value = value,
            None => {
                rec.props.insert(
                    key,
                    StoredProp {
                        name: display,
                        entry: PropEntry::new(value),
                    },
                );
            }
        }
        Ok(())
    }

    fn remove_property(&mut self, obj: Obj, name: &str) -> Result<(), WorldStateError> {
        trace!(?obj, name, "remove property");
        let key = prop_key(name);
        let prefix = format!("{key}/");
        let rec = self.rec_mut(obj)?;
        rec.props.retain(|k, _| *k != key && !k.starts_with(&prefix));
        Ok(())
    }

    fn set_property_blessed(
        &mut self,
        obj: Obj,
        name: &str,
        blessed: bool,
    ) -> Result<(), WorldStateError> {
        let key = prop_key(name);
        let rec = self.rec_mut(obj)?;
        match rec.props.get_mut(&key) {
            Some(p) => {
                p.entry.blessed = blessed;
                Ok(())
            }
            None => Err(WorldStateError::PropertyNotFound(obj, name.to_string())),
        }
    }

    fn is_propdir(&self, obj: Obj, name: &str) -> Result<bool, WorldStateError> {
        let key = prop_key(name);
        if key.is_empty() {
            return Ok(false);
        }
        let prefix = format!("{key}/");
        Ok(self
            .rec(obj)?
            .props
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(k, _)| k.starts_with(&prefix)))
    }

    fn property_names(&self, obj: Obj, dir: &str) -> Result<Vec<String>, WorldStateError> {
        let key = prop_key(dir);
        let prefix = if key.is_empty() {
            String::new()
        } else {
            format!("{key}/")
        };
        let rec = self.rec(obj)?;
        let mut names: Vec<String> = vec![];
        let mut seen: Vec<String> = vec![];
        for (k, p) in rec.props.range(prefix.clone()..) {
            if !k.starts_with(&prefix) {
                break;
            }
            // Only the segment directly below `dir` counts; deeper paths imply a propdir child.
            let child_key = match k[prefix.len()..].split_once('/') {
                Some((head, _)) => format!("{prefix}{head}"),
                None => k.clone(),
            };
            if seen.contains(&child_key) {
                continue;
            }
            let segments = child_key.matches('/').count() + 1;
            let display: String = p
                .name
                .split('/')
                .take(segments)
                .collect::<Vec<_>>()
                .join("/");
            seen.push(child_key);
            names.push(display);
        }
        Ok(names)
    }

    fn find_player(&self, name: &str) -> Option<Obj> {
        self.objects.iter().enumerate().find_map(|(i, o)| {
            o.as_ref()
                .filter(|o| o.otype == ObjType::Player && o.name.eq_ignore_ascii_case(name))
                .map(|_| Obj::mk_id(i as i32))
        })
    }

    fn record_mpi_profile(&mut self, obj: Obj, elapsed: Duration) -> Result<(), WorldStateError> {
        let rec = self.rec_mut(obj)?;
        rec.mpi_uses += 1;
        rec.mpi_time += elapsed;
        Ok(())
    }
}

impl MemWorld {
    /// The location chain of `obj`, not including `obj` itself.
    pub fn environment(&self, obj: Obj) -> Vec<Obj> {
        let mut chain = vec![];
        let mut cur = self.parent_of(obj);
        while cur != NOTHING && !chain.contains(&cur) {
            chain.push(cur);
            cur = self.parent_of(cur);
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muckr_common::model::{Lock, LOCK_PROP, test_lock};
    use pretty_assertions::assert_eq;

    fn small_world() -> (MemWorld, Obj, Obj, Obj) {
        let mut w = MemWorld::new();
        let room = w.create("Lobby", ObjType::Room, NOTHING, NOTHING);
        let player = w.create("Alice", ObjType::Player, NOTHING, room);
        w.set_owner(room, player).unwrap();
        let thing = w.create("widget", ObjType::Thing, player, player);
        (w, room, player, thing)
    }

    #[test]
    fn test_players_own_themselves() {
        let (w, room, player, thing) = small_world();
        assert_eq!(w.owner_of(player).unwrap(), player);
        assert_eq!(w.owner_of(thing).unwrap(), player);
        assert_eq!(w.contents_of(room).unwrap(), vec![player]);
        assert_eq!(w.contents_of(player).unwrap(), vec![thing]);
        assert_eq!(w.find_player("alice"), Some(player));
        assert_eq!(w.environment(thing), vec![player, room]);
    }

    #[test]
    fn test_property_names_are_case_insensitive_and_normalized() {
        let (mut w, _, player, _) = small_world();
        w.set_property(player, "/Desc//Line", "hello".into()).unwrap();
        let entry = w.get_property(player, "desc/line").unwrap().unwrap();
        assert_eq!(entry.value.as_text(), "hello");
        assert!(w.is_propdir(player, "DESC").unwrap());
        assert!(!w.is_propdir(player, "desc/line").unwrap());
    }

    #[test]
    fn test_property_listing() {
        let (mut w, _, player, _) = small_world();
        for name in ["list#/1", "list#/2", "list#", "other", "list#/2/deeper"] {
            w.set_property(player, name, "x".into()).unwrap();
        }
        assert_eq!(
            w.property_names(player, "list#").unwrap(),
            vec!["list#/1".to_string(), "list#/2".to_string()]
        );
        assert_eq!(
            w.property_names(player, "").unwrap(),
            vec!["list#".to_string(), "other".to_string()]
        );
        w.remove_property(player, "list#").unwrap();
        assert_eq!(w.property_names(player, "").unwrap(), vec!["other".to_string()]);
    }

    #[test]
    fn test_bless_requires_existing_property() {
        let (mut w, _, player, _) = small_world();
        assert!(w.set_property_blessed(player, "nope", true).is_err());
        w.set_property(player, "yep", "1".into()).unwrap();
        w.set_property_blessed(player, "yep", true).unwrap();
        assert!(w.get_property(player, "yep").unwrap().unwrap().blessed);
    }

    #[test]
    fn test_locks() {
        let (mut w, room, player, thing) = small_world();
        assert_eq!(test_lock(&w, player, room, LOCK_PROP).unwrap(), None);

        w.set_property(room, LOCK_PROP, PropValue::Lock(Lock::Object(thing)))
            .unwrap();
        // Carrying the key object passes.
        assert_eq!(test_lock(&w, player, room, LOCK_PROP).unwrap(), Some(true));

        w.set_property(player, "sex", "female".into()).unwrap();
        let lock = Lock::And(
            Box::new(Lock::Prop {
                name: "sex".to_string(),
                value: "Female".to_string(),
            }),
            Box::new(Lock::Not(Box::new(Lock::Object(room)))),
        );
        w.set_property(thing, LOCK_PROP, PropValue::Lock(lock)).unwrap();
        // Standing in the room fails the negated object clause.
        assert_eq!(test_lock(&w, player, thing, LOCK_PROP).unwrap(), Some(false));
    }

    #[test]
    fn test_profile_recording() {
        let (mut w, room, _, _) = small_world();
        w.record_mpi_profile(room, Duration::from_millis(3)).unwrap();
        w.record_mpi_profile(room, Duration::from_millis(2)).unwrap();
        assert_eq!(w.mpi_profile(room), Some((2, Duration::from_millis(5))));
    }
}
