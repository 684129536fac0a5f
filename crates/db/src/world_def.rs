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

//! Serde description of a world, used to seed a [`MemWorld`] from a JSON or YAML file.

use std::collections::BTreeMap;
use std::path::Path;

use figment::Figment;
use figment::providers::{Format, Json, Yaml};
use muckr_common::model::{ObjFlag, ObjType, PropEntry, PropValue, Timestamps};
use muckr_var::{NOTHING, Obj};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::MemWorld;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Failed to read world description from {0}: {1}")]
    LoadFailed(String, String),
    #[error("Object {0} is defined more than once")]
    DuplicateObject(Obj),
    #[error("Object {0} refers to missing object {1}")]
    DanglingReference(Obj, Obj),
    #[error("Invalid property {1:?} on {0}")]
    InvalidProperty(Obj, String),
}

/// A property as written in a world file: a bare string or integer, or a full entry with an
/// explicitly typed value and blessed bit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropSpec {
    Int(i32),
    Str(String),
    Entry(PropEntry),
}

impl From<PropSpec> for PropEntry {
    fn from(spec: PropSpec) -> Self {
        match spec {
            PropSpec::Int(i) => PropEntry::new(PropValue::Int(i)),
            PropSpec::Str(s) => PropEntry::new(PropValue::Str(s)),
            PropSpec::Entry(e) => e,
        }
    }
}

fn nothing() -> Obj {
    NOTHING
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDef {
    pub id: Obj,
    pub name: String,
    #[serde(rename = "type")]
    pub otype: ObjType,
    #[serde(default = "nothing")]
    pub owner: Obj,
    #[serde(default = "nothing")]
    pub location: Obj,
    #[serde(default)]
    pub links: Vec<Obj>,
    #[serde(default)]
    pub flags: Vec<ObjFlag>,
    #[serde(default)]
    pub pennies: i32,
    #[serde(default)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub props: BTreeMap<String, PropSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldDef {
    pub objects: Vec<ObjectDef>,
}

impl WorldDef {
    /// Read a world description. Files ending in `.json` are read as JSON, anything else as YAML.
    pub fn load_file(path: &Path) -> Result<Self, DbError> {
        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Figment::new().merge(Json::file(path)),
            _ => Figment::new().merge(Yaml::file(path)),
        };
        figment
            .extract::<WorldDef>()
            .map_err(|e| DbError::LoadFailed(path.display().to_string(), e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self, DbError> {
        serde_json::from_str(text)
            .map_err(|e| DbError::LoadFailed("<json>".to_string(), e.to_string()))
    }

    /// Build the world, checking that every reference points at a defined object.
    pub fn build(self) -> Result<MemWorld, DbError> {
        let mut world = MemWorld::new();
        let mut defined: Vec<Obj> = vec![];
        for def in &self.objects {
            if defined.contains(&def.id) {
                return Err(DbError::DuplicateObject(def.id));
            }
            defined.push(def.id);
        }
        let check = |from: Obj, to: Obj| -> Result<(), DbError> {
            if to.is_sentinel() || defined.contains(&to) {
                Ok(())
            } else {
                Err(DbError::DanglingReference(from, to))
            }
        };
        for def in &self.objects {
            check(def.id, def.owner)?;
            check(def.id, def.location)?;
            for l in &def.links {
                check(def.id, *l)?;
            }
        }

        let count = self.objects.len();
        for def in self.objects {
            let oid = def.id;
            world.insert(oid, &def.name, def.otype, def.owner, def.location);
            let invalid = |_| DbError::InvalidProperty(oid, String::new());
            world.set_links(oid, def.links).map_err(invalid)?;
            world
                .set_flags(oid, def.flags.into_iter().collect())
                .map_err(invalid)?;
            world.set_pennies(oid, def.pennies).map_err(invalid)?;
            world.set_timestamps(oid, def.timestamps).map_err(invalid)?;
            for (name, spec) in def.props {
                world
                    .put_property(oid, &name, spec.into())
                    .map_err(|_| DbError::InvalidProperty(oid, name.clone()))?;
            }
        }
        info!(objects = count, "world loaded");
        Ok(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muckr_common::model::WorldState;
    use pretty_assertions::assert_eq;

    const WORLD: &str = r##"{
        "objects": [
            {"id": 0, "name": "Room Zero", "type": "room", "owner": 1},
            {"id": 1, "name": "Wizard", "type": "player", "location": 0, "links": [0],
             "flags": ["wizard"], "pennies": 100,
             "props": {
                "_/de": "A wizard.",
                "count": 3,
                "blessed": {"value": {"str": "{prop:count}"}, "blessed": true},
                "home": {"value": {"ref": 0}}
             }}
        ]
    }"##;

    #[test]
    fn test_load_json() {
        let world = WorldDef::from_json(WORLD).unwrap().build().unwrap();
        let wiz = Obj::mk_id(1);
        assert_eq!(world.db_top(), 2);
        assert_eq!(world.name_of(wiz).unwrap(), "Wizard");
        assert_eq!(world.home_of(wiz).unwrap(), Obj::mk_id(0));
        assert!(world.flags_of(wiz).unwrap().contains(ObjFlag::Wizard));
        assert_eq!(world.pennies_of(wiz).unwrap(), 100);
        assert_eq!(
            world.get_property(wiz, "_/de").unwrap().unwrap().value,
            PropValue::Str("A wizard.".to_string())
        );
        assert_eq!(
            world.get_property(wiz, "count").unwrap().unwrap().value,
            PropValue::Int(3)
        );
        assert!(world.get_property(wiz, "blessed").unwrap().unwrap().blessed);
        assert_eq!(
            world.get_property(wiz, "home").unwrap().unwrap().value.as_text(),
            "#0"
        );
    }

    #[test]
    fn test_dangling_reference() {
        let text = r#"{"objects": [{"id": 0, "name": "x", "type": "room", "location": 9}]}"#;
        let err = WorldDef::from_json(text).unwrap().build().unwrap_err();
        assert!(matches!(err, DbError::DanglingReference(_, o) if o == Obj::mk_id(9)));
    }
}
