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

//! A small fixed world and a harness for running MPI against it in tests.
//!
//! ```text
//! #0 Room Zero (room)           #1 Wizard (player, W)    #4 Bob (player)
//!  |- #2 Lobby (room)                                      #8 Garden (room, Bob's)
//!  |   |- #3 Alice (player) holding #5 widget;wid          |- #9 gnome
//!  |   |- #6 statue (Bob's)
//!  |   `- #7 north;n (exit to the Garden)
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use muckr_common::model::{ObjFlag, ObjType, PropValue, WorldState};
use muckr_common::tasks::MockClientSession;
use muckr_db::MemWorld;
use muckr_var::{NOTHING, Obj};

use crate::config::MpiConfig;
use crate::mpi::{EvalContext, MpiError, MpiFlag, MpiFlags, parse, try_parse};

pub struct TestWorld {
    pub world: MemWorld,
    pub session: Arc<MockClientSession>,
    pub config: Arc<MpiConfig>,
    pub room_zero: Obj,
    pub wizard: Obj,
    pub lobby: Obj,
    pub alice: Obj,
    pub bob: Obj,
    pub widget: Obj,
    pub statue: Obj,
    pub north: Obj,
    pub garden: Obj,
    pub gnome: Obj,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    pub fn new() -> Self {
        let mut world = MemWorld::new();
        let room_zero = world.create("Room Zero", ObjType::Room, NOTHING, NOTHING);
        let wizard = world.create("Wizard", ObjType::Player, NOTHING, room_zero);
        world.set_owner(room_zero, wizard).unwrap();
        let lobby = world.create("Lobby", ObjType::Room, wizard, room_zero);
        let alice = world.create("Alice", ObjType::Player, NOTHING, lobby);
        let bob = world.create("Bob", ObjType::Player, NOTHING, room_zero);
        let widget = world.create("widget;wid", ObjType::Thing, alice, alice);
        let statue = world.create("statue", ObjType::Thing, bob, lobby);
        let north = world.create("north;n", ObjType::Exit, alice, lobby);
        let garden = world.create("Garden", ObjType::Room, bob, room_zero);
        let gnome = world.create("gnome", ObjType::Thing, bob, garden);

        world.set_flag(wizard, ObjFlag::Wizard).unwrap();
        for (obj, home) in [
            (wizard, room_zero),
            (alice, lobby),
            (bob, room_zero),
            (widget, lobby),
            (statue, lobby),
            (north, garden),
            (gnome, garden),
        ] {
            world.set_links(obj, vec![home]).unwrap();
        }
        world.set_pennies(alice, 50).unwrap();

        let config = MpiConfig {
            sysparms: BTreeMap::from([("dumpwarn_mesg".to_string(), "Dumping soon.".to_string())]),
            ..MpiConfig::default()
        };
        Self {
            world,
            session: Arc::new(MockClientSession::new()),
            config: Arc::new(config),
            room_zero,
            wizard,
            lobby,
            alice,
            bob,
            widget,
            statue,
            north,
            garden,
            gnome,
        }
    }

    /// Look up one of the fixture objects by its field name.
    pub fn by_name(&self, name: &str) -> Obj {
        match name {
            "room_zero" => self.room_zero,
            "wizard" => self.wizard,
            "lobby" => self.lobby,
            "alice" => self.alice,
            "bob" => self.bob,
            "widget" => self.widget,
            "statue" => self.statue,
            "north" => self.north,
            "garden" => self.garden,
            "gnome" => self.gnome,
            _ => panic!("no fixture object named {name}"),
        }
    }

    pub fn set_prop(&mut self, obj: Obj, name: &str, value: &str) {
        self.world
            .set_property(obj, name, PropValue::Str(value.to_string()))
            .unwrap();
    }

    pub fn prop(&self, obj: Obj, name: &str) -> Option<String> {
        self.world
            .get_property(obj, name)
            .unwrap()
            .map(|e| e.value.as_text())
    }

    /// Run `f` with a fresh evaluation context for `player`, on no particular descriptor.
    pub fn with_context<R>(&mut self, player: Obj, f: impl FnOnce(&mut EvalContext<'_>) -> R) -> R {
        let mut ctx = EvalContext::new(
            &mut self.world,
            self.session.clone(),
            self.config.clone(),
            -1,
            player,
        );
        f(&mut ctx)
    }

    /// Everything sent to `obj` so far.
    pub fn messages(&self, obj: Obj) -> Vec<String> {
        self.session.received_by(obj)
    }

    /// Evaluate as Alice, with Alice as the trigger. Aborts are reported to Alice and give "".
    pub fn eval(&mut self, source: &str) -> String {
        self.eval_flags(source, &[])
    }

    pub fn eval_blessed(&mut self, source: &str) -> String {
        self.eval_flags(source, &[MpiFlag::Blessed])
    }

    pub fn eval_flags(&mut self, source: &str, flags: &[MpiFlag]) -> String {
        let (alice, flags) = (self.alice, to_flags(flags));
        self.with_context(alice, |ctx| parse(ctx, alice, source, "(test)", flags))
    }

    /// Evaluate as Alice, returning the abort instead of reporting it.
    pub fn try_eval(&mut self, source: &str) -> Result<String, MpiError> {
        self.try_eval_flags(source, &[])
    }

    pub fn try_eval_flags(&mut self, source: &str, flags: &[MpiFlag]) -> Result<String, MpiError> {
        let (alice, flags) = (self.alice, to_flags(flags));
        self.with_context(alice, |ctx| try_parse(ctx, alice, source, "(test)", flags))
    }
}

fn to_flags(flags: &[MpiFlag]) -> MpiFlags {
    let mut set = MpiFlags::new();
    for flag in flags {
        set.set(*flag);
    }
    set
}
