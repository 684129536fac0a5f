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

use crate::matching::MatchEnvironment;
use crate::model::{WorldState, WorldStateError};

/// A "match environment" which matches out of the current DB world state.
pub struct WsMatchEnv<'a> {
    pub(crate) ws: &'a dyn WorldState,
}

impl<'a> WsMatchEnv<'a> {
    pub fn new(ws: &'a dyn WorldState) -> Self {
        Self { ws }
    }
}

impl MatchEnvironment for WsMatchEnv<'_> {
    fn obj_valid(&self, oid: Obj) -> Result<bool, WorldStateError> {
        Ok(self.ws.valid(oid))
    }

    fn get_names(&self, oid: Obj) -> Result<Vec<String>, WorldStateError> {
        let name = self.ws.name_of(oid)?;
        Ok(name.split(';').map(|n| n.trim().to_string()).collect())
    }

    fn get_surroundings(&self, player: Obj) -> Result<Vec<Obj>, WorldStateError> {
        let location = self.ws.location_of(player)?;
        // Order: own inventory and exits first, then the location's contents and exits, then
        // the location and player.
        let mut surroundings = self.ws.contents_of(player)?;
        surroundings.extend(self.ws.exits_of(player)?);
        if self.ws.valid(location) {
            surroundings.extend(self.ws.contents_of(location)?);
            surroundings.extend(self.ws.exits_of(location)?);
        }
        surroundings.push(location);
        surroundings.push(player);
        Ok(surroundings)
    }

    fn location_of(&self, player: Obj) -> Result<Obj, WorldStateError> {
        self.ws.location_of(player)
    }

    fn find_player(&self, name: &str) -> Result<Option<Obj>, WorldStateError> {
        Ok(self.ws.find_player(name))
    }
}
