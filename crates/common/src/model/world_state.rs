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

use std::time::Duration;

use muckr_var::{NOTHING, Obj};
use thiserror::Error;

use crate::model::objects::{ObjFlag, ObjType, Timestamps};
use crate::model::props::{PropEntry, PropValue};
use crate::model::Lock;
use crate::util::BitEnum;

/// Errors related to the world state and operations on it.
#[derive(Error, Debug, Eq, PartialEq, Clone)]
pub enum WorldStateError {
    #[error("Object not found: {0}")]
    ObjectNotFound(Obj),
    #[error("Invalid property name: {0:?}")]
    InvalidPropertyName(String),
    #[error("Property not found: {0}.{1}")]
    PropertyNotFound(Obj, String),
    #[error("Failed object match: {0}")]
    FailedMatch(String),

    // Catch-all for storage level errors.
    #[error("DB communications/internal error: {0}")]
    DatabaseError(String),
}

/// The live, mutable object database as the MPI interpreter sees it: object attributes, the
/// location/contents tree, and each object's property tree.
///
/// Property names are slash-delimited paths. Implementations compare them case-insensitively and
/// ignore leading, trailing and doubled delimiters.
pub trait WorldState {
    /// True if `obj` names an existing, non-garbage object.
    fn valid(&self, obj: Obj) -> bool;

    /// One past the highest object number in use.
    fn db_top(&self) -> i32;

    fn object_type(&self, obj: Obj) -> Result<ObjType, WorldStateError>;

    /// The full name, including `;`-separated aliases for exits.
    fn name_of(&self, obj: Obj) -> Result<String, WorldStateError>;

    fn owner_of(&self, obj: Obj) -> Result<Obj, WorldStateError>;

    fn location_of(&self, obj: Obj) -> Result<Obj, WorldStateError>;

    fn contents_of(&self, obj: Obj) -> Result<Vec<Obj>, WorldStateError>;

    /// Exits attached to a room, thing or player.
    fn exits_of(&self, obj: Obj) -> Result<Vec<Obj>, WorldStateError>;

    /// Link targets: the drop-to of a room, the home of a thing or player, the destinations of
    /// an exit. Programs have none.
    fn links_of(&self, obj: Obj) -> Result<Vec<Obj>, WorldStateError>;

    fn flags_of(&self, obj: Obj) -> Result<BitEnum<ObjFlag>, WorldStateError>;

    fn pennies_of(&self, obj: Obj) -> Result<i32, WorldStateError>;

    fn timestamps_of(&self, obj: Obj) -> Result<Timestamps, WorldStateError>;

    /// The property stored directly on `obj`, if any. No inheritance is applied.
    fn get_property(&self, obj: Obj, name: &str) -> Result<Option<PropEntry>, WorldStateError>;

    fn set_property(
        &mut self,
        obj: Obj,
        name: &str,
        value: PropValue,
    ) -> Result<(), WorldStateError>;

    /// Remove the property and everything beneath it. Removing a missing property is not an
    /// error.
    fn remove_property(&mut self, obj: Obj, name: &str) -> Result<(), WorldStateError>;

    fn set_property_blessed(
        &mut self,
        obj: Obj,
        name: &str,
        blessed: bool,
    ) -> Result<(), WorldStateError>;

    /// True if any property lives beneath `name`.
    fn is_propdir(&self, obj: Obj, name: &str) -> Result<bool, WorldStateError>;

    /// Full paths of the properties directly beneath `dir`, in sorted order. An empty `dir`
    /// lists the top level.
    fn property_names(&self, obj: Obj, dir: &str) -> Result<Vec<String>, WorldStateError>;

    /// Look up a player by exact (case-insensitive) name.
    fn find_player(&self, name: &str) -> Option<Obj>;

    /// Record that an MPI evaluation ran on `obj` and took `elapsed`.
    fn record_mpi_profile(&mut self, obj: Obj, elapsed: Duration) -> Result<(), WorldStateError>;

    /// The home of a thing or player, or `NOTHING`.
    fn home_of(&self, obj: Obj) -> Result<Obj, WorldStateError> {
        Ok(self.links_of(obj)?.first().copied().unwrap_or(NOTHING))
    }

    /// The next object up the environment chain, or `NOTHING` at the top.
    fn parent_of(&self, obj: Obj) -> Obj {
        if !self.valid(obj) {
            return NOTHING;
        }
        self.location_of(obj).unwrap_or(NOTHING)
    }

    /// Whether `who` (by way of its owner) controls `what`: wizards control everything valid,
    /// everyone controls what they own.
    fn controls(&self, who: Obj, what: Obj) -> bool {
        if !self.valid(what) {
            return false;
        }
        let (Ok(who_owner), Ok(what_owner)) = (self.owner_of(who), self.owner_of(what)) else {
            return false;
        };
        if self
            .flags_of(who_owner)
            .map(|f| f.contains(ObjFlag::Wizard))
            .unwrap_or(false)
        {
            return true;
        }
        who_owner == what_owner
    }
}

/// Evaluate the lock stored in `prop` on `obj` against `who`. `None` when no lock is set.
pub fn test_lock(
    ws: &dyn WorldState,
    who: Obj,
    obj: Obj,
    prop: &str,
) -> Result<Option<bool>, WorldStateError> {
    let Some(entry) = ws.get_property(obj, prop)? else {
        return Ok(None);
    };
    let lock: Lock = match entry.value {
        PropValue::Lock(lock) => lock,
        PropValue::Ref(o) if o.is_positive() => Lock::Object(o),
        _ => return Ok(None),
    };
    if lock == Lock::True {
        return Ok(None);
    }
    lock.eval(ws, who).map(Some)
}
