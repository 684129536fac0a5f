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

use std::collections::HashMap;

use muckr_var::{NOTHING, Obj};

use crate::matching::MatchEnvironment;
use crate::model::WorldStateError;

pub const MOCK_ROOM1: Obj = Obj::mk_id(1);
pub const MOCK_ROOM2: Obj = Obj::mk_id(2);
pub const MOCK_PLAYER: Obj = Obj::mk_id(3);
pub const MOCK_THING1: Obj = Obj::mk_id(4);
pub const MOCK_THING2: Obj = Obj::mk_id(5);
pub const MOCK_THING3: Obj = Obj::mk_id(6);
pub const MOCK_EXIT: Obj = Obj::mk_id(7);

pub struct MockObject {
    pub location: Obj,
    pub contents: Vec<Obj>,
    pub exits: Vec<Obj>,
    pub names: Vec<String>,
    pub is_player: bool,
}

#[derive(Default)]
pub struct MockMatchEnv {
    objects: HashMap<Obj, MockObject>,
}

impl MockMatchEnv {
    pub fn new(objects: HashMap<Obj, MockObject>) -> Self {
        MockMatchEnv { objects }
    }
}

impl MatchEnvironment for MockMatchEnv {
    fn obj_valid(&self, oid: Obj) -> Result<bool, WorldStateError> {
        Ok(self.objects.contains_key(&oid))
    }

    fn get_names(&self, oid: Obj) -> Result<Vec<String>, WorldStateError> {
        Ok(self
            .objects
            .get(&oid)
            .map_or_else(Vec::new, |o| o.names.clone()))
    }

    fn get_surroundings(&self, player: Obj) -> Result<Vec<Obj>, WorldStateError> {
        let mut result = Vec::new();
        if let Some(player_obj) = self.objects.get(&player) {
            result.extend(player_obj.contents.iter().copied());
            if let Some(location_obj) = self.objects.get(&player_obj.location) {
                result.extend(location_obj.contents.iter().copied());
                result.extend(location_obj.exits.iter().copied());
            }
            result.push(player_obj.location);
            result.push(player);
        }
        Ok(result)
    }

    fn location_of(&self, oid: Obj) -> Result<Obj, WorldStateError> {
        self.objects
            .get(&oid)
            .map(|o| o.location)
            .ok_or(WorldStateError::ObjectNotFound(oid))
    }

    fn find_player(&self, name: &str) -> Result<Option<Obj>, WorldStateError> {
        Ok(self
            .objects
            .iter()
            .find(|(_, o)| o.is_player && o.names.iter().any(|n| n.eq_ignore_ascii_case(name)))
            .map(|(oid, _)| *oid))
    }
}

fn create_mock_object(
    env: &mut MockMatchEnv,
    oid: Obj,
    location: Obj,
    contents: &[Obj],
    names: &[&str],
) {
    env.objects.insert(
        oid,
        MockObject {
            location,
            contents: contents.to_vec(),
            exits: vec![],
            names: names.iter().map(|n| n.to_string()).collect(),
            is_player: false,
        },
    );
}

pub fn setup_mock_environment() -> MockMatchEnv {
    let mut env = MockMatchEnv::default();

    create_mock_object(&mut env, MOCK_PLAYER, MOCK_ROOM1, &[], &["porcupine"]);
    create_mock_object(
        &mut env,
        MOCK_ROOM1,
        NOTHING,
        &[MOCK_PLAYER, MOCK_THING1, MOCK_THING2],
        &["room1", "r1"],
    );
    create_mock_object(&mut env, MOCK_ROOM2, NOTHING, &[MOCK_THING3], &["room2"]);
    create_mock_object(&mut env, MOCK_THING1, MOCK_ROOM1, &[], &["thing1", "t1"]);
    create_mock_object(&mut env, MOCK_THING2, MOCK_ROOM1, &[], &["thing2", "t2"]);
    create_mock_object(&mut env, MOCK_THING3, MOCK_ROOM2, &[], &["thing3", "t3"]);
    create_mock_object(&mut env, MOCK_EXIT, MOCK_ROOM1, &[], &["out", "o"]);

    if let Some(player) = env.objects.get_mut(&MOCK_PLAYER) {
        player.is_player = true;
    }
    if let Some(room) = env.objects.get_mut(&MOCK_ROOM1) {
        room.exits.push(MOCK_EXIT);
    }

    env
}
