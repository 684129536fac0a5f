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

use muckr_var::Obj;
use serde::{Deserialize, Serialize};

use crate::model::{WorldState, WorldStateError};

/// Standard lock on an object, tested when something tries to use it.
pub const LOCK_PROP: &str = "_/lok";
/// Read lock; passing it lets MPI on other objects read this one.
pub const READLOCK_PROP: &str = "_/rlk";

/// A boolean lock expression, as stored in a lock-valued property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lock {
    /// Always passes.
    True,
    /// Passes for the object itself, anything carrying it, or anything standing in it.
    Object(Obj),
    /// Passes if the tester (or something it carries) has the property set to the value.
    Prop { name: String, value: String },
    And(Box<Lock>, Box<Lock>),
    Or(Box<Lock>, Box<Lock>),
    Not(Box<Lock>),
}

impl Lock {
    /// Evaluate the lock for `who`.
    pub fn eval(&self, ws: &dyn WorldState, who: Obj) -> Result<bool, WorldStateError> {
        match self {
            Lock::True => Ok(true),
            Lock::Object(o) => {
                if *o == who {
                    return Ok(true);
                }
                if ws.contents_of(who)?.contains(o) {
                    return Ok(true);
                }
                Ok(ws.location_of(who)? == *o)
            }
            Lock::Prop { name, value } => {
                let mut candidates = vec![who];
                candidates.extend(ws.contents_of(who)?);
                for c in candidates {
                    if let Some(entry) = ws.get_property(c, name)?
                        && entry.value.as_text().eq_ignore_ascii_case(value)
                    {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Lock::And(a, b) => Ok(a.eval(ws, who)? && b.eval(ws, who)?),
            Lock::Or(a, b) => Ok(a.eval(ws, who)? || b.eval(ws, who)?),
            Lock::Not(a) => Ok(!a.eval(ws, who)?),
        }
    }
}
