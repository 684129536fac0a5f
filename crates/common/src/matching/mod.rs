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

//! Matching of object names typed by players (or written into MPI) against the objects around
//! them.

use muckr_var::Obj;

use crate::model::WorldStateError;

pub mod match_env;
#[doc(hidden)]
pub mod mock_matching_env;
pub mod ws_match_env;

pub use match_env::DefaultObjectNameMatcher;
pub use ws_match_env::WsMatchEnv;

/// This is the interface that the matching code needs to be able to call into the world state.
/// Separated out so can be more easily mocked.
pub trait MatchEnvironment {
    // Test whether a given object is valid in this environment.
    fn obj_valid(&self, oid: Obj) -> Result<bool, WorldStateError>;

    // Return all match names & aliases for an object.
    fn get_names(&self, oid: Obj) -> Result<Vec<String>, WorldStateError>;

    // Returns contents, location contents, exits, the location and the player itself: everything
    // we'd search for matches on.
    fn get_surroundings(&self, player: Obj) -> Result<Vec<Obj>, WorldStateError>;

    // Return the location of a given object.
    fn location_of(&self, player: Obj) -> Result<Obj, WorldStateError>;

    // Look a player up by name, wherever they are.
    fn find_player(&self, name: &str) -> Result<Option<Obj>, WorldStateError>;
}

/// Trait for matching names in the environment.
///
/// The result is the matched object, `NOTHING` when nothing matched, or `AMBIGUOUS` when more
/// than one object matched equally well.
pub trait ObjectNameMatcher {
    fn match_object(&self, name: &str) -> Result<Obj, WorldStateError>;
}
