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

use enum_primitive_derive::Primitive;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::util::BitEnum;

/// The kind of a database object. Every object is exactly one of these.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Primitive,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ObjType {
    #[strum(to_string = "Room", serialize = "room")]
    Room = 0,
    #[strum(to_string = "Thing", serialize = "thing")]
    Thing = 1,
    #[strum(to_string = "Exit", serialize = "exit")]
    Exit = 2,
    #[strum(to_string = "Player", serialize = "player")]
    Player = 3,
    #[strum(to_string = "Program", serialize = "program")]
    Program = 4,
    #[strum(to_string = "Garbage", serialize = "garbage")]
    Garbage = 5,
}

impl ObjType {
    /// The one-character code used when unparsing flags. Things have none.
    pub fn type_code(&self) -> Option<char> {
        match self {
            ObjType::Room => Some('R'),
            ObjType::Thing => None,
            ObjType::Exit => Some('E'),
            ObjType::Player => Some('P'),
            ObjType::Program => Some('F'),
            ObjType::Garbage => Some('G'),
        }
    }
}

/// Object flags, in the order they are listed by `unparse_flags`.
#[derive(
    Debug,
    Ord,
    PartialOrd,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Primitive,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive, serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ObjFlag {
    Wizard = 0,
    LinkOk = 1,
    KillOk = 2,
    Dark = 3,
    Sticky = 4,
    Quell = 5,
    Builder = 6,
    ChownOk = 7,
    JumpOk = 8,
    Guest = 9,
    Haven = 10,
    Abode = 11,
    Vehicle = 12,
    XForcible = 13,
    Zombie = 14,
    Listener = 15,
}

impl ObjFlag {
    /// The single letter shown for this flag, if it is displayed at all.
    pub fn letter(&self) -> Option<char> {
        Some(match self {
            ObjFlag::Wizard => 'W',
            ObjFlag::LinkOk => 'L',
            ObjFlag::KillOk => 'K',
            ObjFlag::Dark => 'D',
            ObjFlag::Sticky => 'S',
            ObjFlag::Quell => 'Q',
            ObjFlag::Builder => 'B',
            ObjFlag::ChownOk => 'C',
            ObjFlag::JumpOk => 'J',
            ObjFlag::Guest => 'G',
            ObjFlag::Haven => 'H',
            ObjFlag::Abode => 'A',
            ObjFlag::Vehicle => 'V',
            ObjFlag::XForcible => 'X',
            ObjFlag::Zombie => 'Z',
            ObjFlag::Listener => return None,
        })
    }
}

/// Render an object's type and flags the way `@flags`-style output shows them, e.g. `PWB`.
pub fn unparse_flags(otype: ObjType, flags: BitEnum<ObjFlag>) -> String {
    let mut out = String::new();
    if let Some(code) = otype.type_code() {
        out.push(code);
    }
    for flag in ObjFlag::iter() {
        if flags.contains(flag)
            && let Some(letter) = flag.letter()
        {
            out.push(letter);
        }
    }
    out
}

/// Creation/modification/use bookkeeping kept for every object.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created: i64,
    pub modified: i64,
    pub last_used: i64,
    pub use_count: i32,
}
