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

mod lock;
mod objects;
mod props;
mod world_state;

pub use lock::{LOCK_PROP, Lock, READLOCK_PROP};
pub use objects::{ObjFlag, ObjType, Timestamps, unparse_flags};
pub use props::{
    PROPDIR_DELIMITER, PropEntry, PropValue, is_hidden, is_private, is_read_only, is_see_only,
    is_system, normalize_prop_name,
};
pub use world_state::{WorldState, WorldStateError, test_lock};
