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

use muckr_var::{AMBIGUOUS, NOTHING, Obj};

use crate::matching::{MatchEnvironment, ObjectNameMatcher};
use crate::model::WorldStateError;

const ME: &str = "me";
const HERE: &str = "here";
const PLAYER_LOOKUP: char = '*';

#[derive(Clone, Eq, PartialEq, Debug, Default)]
struct MatchData {
    exact: Vec<Obj>,
    partial: Vec<Obj>,
}

fn do_match_object_names(
    oid: Obj,
    match_data: &mut MatchData,
    names: Vec<String>,
    match_name: &str,
) {
    let match_name = match_name.to_lowercase();

    for object_name in names {
        let object_name = object_name.trim().to_lowercase();
        if !object_name.starts_with(&match_name) {
            continue;
        }
        let bucket = if match_name == object_name {
            &mut match_data.exact
        } else {
            &mut match_data.partial
        };
        if !bucket.contains(&oid) {
            bucket.push(oid);
        }
    }
}

fn pick(candidates: &[Obj]) -> Option<Obj> {
    match candidates {
        [] => None,
        [one] => Some(*one),
        _ => Some(AMBIGUOUS),
    }
}

fn match_contents<M: MatchEnvironment>(
    env: &M,
    player: Obj,
    object_name: &str,
) -> Result<Obj, WorldStateError> {
    let mut match_data = MatchData::default();

    for oid in env.get_surroundings(player)? {
        if !env.obj_valid(oid)? {
            continue;
        }
        let object_names = env.get_names(oid)?;
        do_match_object_names(oid, &mut match_data, object_names, object_name);
    }

    // Exact matches win over partial ones.
    Ok(pick(&match_data.exact)
        .or_else(|| pick(&match_data.partial))
        .unwrap_or(NOTHING))
}

pub struct DefaultObjectNameMatcher<M: MatchEnvironment> {
    pub env: M,
    pub player: Obj,
}

impl<M: MatchEnvironment> ObjectNameMatcher for DefaultObjectNameMatcher<M> {
    fn match_object(&self, object_name: &str) -> Result<Obj, WorldStateError> {
        let object_name = object_name.trim();
        if object_name.is_empty() {
            return Ok(NOTHING);
        }

        // Object numbers are taken literally; validity is the caller's business.
        if object_name.starts_with('#') {
            return Ok(Obj::try_from(object_name).unwrap_or(NOTHING));
        }

        if let Some(player_name) = object_name.strip_prefix(PLAYER_LOOKUP) {
            return Ok(self.env.find_player(player_name)?.unwrap_or(NOTHING));
        }

        if !self.env.obj_valid(self.player)? {
            return Err(WorldStateError::FailedMatch(
                "Invalid current player when performing object match".to_string(),
            ));
        }

        if object_name.eq_ignore_ascii_case(ME) {
            return Ok(self.player);
        }
        if object_name.eq_ignore_ascii_case(HERE) {
            return self.env.location_of(self.player);
        }

        match_contents(&self.env, self.player, object_name)
    }
}

#[cfg(test)]
mod tests {
    use crate::matching::{
        ObjectNameMatcher,
        match_env::{DefaultObjectNameMatcher, MatchData, do_match_object_names},
        mock_matching_env::{
            MOCK_EXIT, MOCK_PLAYER, MOCK_ROOM1, MOCK_THING1, MOCK_THING2, setup_mock_environment,
        },
    };
    use muckr_var::{AMBIGUOUS, NOTHING, Obj};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn matcher() -> DefaultObjectNameMatcher<crate::matching::mock_matching_env::MockMatchEnv> {
        DefaultObjectNameMatcher {
            env: setup_mock_environment(),
            player: MOCK_PLAYER,
        }
    }

    #[test]
    fn test_match_object_names_fail() {
        let mut match_data = MatchData::default();
        let names = vec!["apple", "banana", "cherry"];
        do_match_object_names(
            Obj::mk_id(2),
            &mut match_data,
            names.into_iter().map(String::from).collect(),
            "durian",
        );
        assert_eq!(match_data, MatchData::default());
    }

    #[test]
    fn test_match_object_names_exact_and_partial() {
        let mut match_data = MatchData::default();
        let names = vec!["apple", "banana", "bunch"];
        do_match_object_names(
            Obj::mk_id(2),
            &mut match_data,
            names.into_iter().map(String::from).collect(),
            "BANANA",
        );
        assert_eq!(match_data.exact, vec![Obj::mk_id(2)]);
        assert!(match_data.partial.is_empty());
    }

    #[test_case("", NOTHING ; "empty")]
    #[test_case("#4", MOCK_THING1 ; "object number")]
    #[test_case("me", MOCK_PLAYER ; "me")]
    #[test_case("HERE", MOCK_ROOM1 ; "here is case insensitive")]
    #[test_case("room1", MOCK_ROOM1 ; "room name")]
    #[test_case("r1", MOCK_ROOM1 ; "room alias")]
    #[test_case("porcupine", MOCK_PLAYER ; "player name")]
    #[test_case("*porcupine", MOCK_PLAYER ; "player lookup")]
    #[test_case("*nobody", NOTHING ; "missing player lookup")]
    #[test_case("thing1", MOCK_THING1 ; "thing name")]
    #[test_case("t2", MOCK_THING2 ; "thing alias")]
    #[test_case("thing", AMBIGUOUS ; "ambiguous partial")]
    #[test_case("out", MOCK_EXIT ; "exit alias")]
    #[test_case("durian", NOTHING ; "no match")]
    fn test_match_object(name: &str, expected: Obj) {
        assert_eq!(matcher().match_object(name).unwrap(), expected);
    }

    #[test]
    fn test_match_object_invalid_player() {
        let menv = DefaultObjectNameMatcher {
            env: setup_mock_environment(),
            player: NOTHING,
        };
        assert!(menv.match_object("thing1").is_err());
    }
}
