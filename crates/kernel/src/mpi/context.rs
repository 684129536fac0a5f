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

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use enum_primitive_derive::Primitive;
use muckr_common::model::WorldState;
use muckr_common::tasks::Session;
use muckr_common::util::BitEnum;
use muckr_var::Obj;
use tracing::warn;

use crate::config::MpiConfig;
use crate::mpi::macros::UserFunction;
use crate::mpi::vars::NamedStack;

/// Capabilities and modes of one evaluation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Primitive)]
pub enum MpiFlag {
    /// Output goes only to the player.
    Private = 0,
    /// Running for a listener; messaging only works from rooms.
    Listener = 1,
    /// Running to evaluate a lock.
    Lock = 2,
    /// Emit a trace of every call.
    Debug = 3,
    /// Elevated trust: hidden, private and foreign properties become accessible.
    Blessed = 4,
    /// Do not define the `how` variable.
    NoHow = 5,
}

pub type MpiFlags = BitEnum<MpiFlag>;

/// Who an evaluation runs on behalf of, and with what capabilities. Nested evaluations get a
/// copy, possibly with a different trigger, permission source or blessing.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Frame {
    /// The trigger: the object whose property is being evaluated.
    pub what: Obj,
    /// The object whose ownership decides permissions.
    pub perms: Obj,
    pub flags: MpiFlags,
}

impl Frame {
    pub fn new(what: Obj, perms: Obj, flags: MpiFlags) -> Self {
        Self { what, perms, flags }
    }

    pub fn is(&self, flag: MpiFlag) -> bool {
        self.flags.contains(flag)
    }

    pub fn blessed(&self) -> bool {
        self.is(MpiFlag::Blessed)
    }

    /// The same frame with `flag` turned on or off.
    pub fn with(mut self, flag: MpiFlag, on: bool) -> Self {
        if on {
            self.flags.set(flag);
        } else {
            self.flags.clear(flag);
        }
        self
    }

    pub fn running_on(mut self, what: Obj, perms: Obj) -> Self {
        self.what = what;
        self.perms = perms;
        self
    }
}

/// The state shared by every nested evaluation under one top-level call: the world, the
/// player's session, variables, user functions and the runaway-execution counters.
pub struct EvalContext<'w> {
    pub(crate) world: &'w mut dyn WorldState,
    pub(crate) session: Arc<dyn Session>,
    pub(crate) config: Arc<MpiConfig>,
    pub(crate) descriptor: i32,
    pub(crate) player: Obj,
    /// The command and argument text that led to this evaluation, for `{&cmd}` and `{&arg}`.
    pub(crate) command: String,
    pub(crate) command_args: String,
    pub(crate) vars: NamedStack<String>,
    pub(crate) funcs: NamedStack<UserFunction>,
    pub(crate) depth: usize,
    pub(crate) instructions: usize,
}

impl<'w> EvalContext<'w> {
    pub fn new(
        world: &'w mut dyn WorldState,
        session: Arc<dyn Session>,
        config: Arc<MpiConfig>,
        descriptor: i32,
        player: Obj,
    ) -> Self {
        let vars = NamedStack::new(config.max_vars, config.max_name_len);
        let funcs = NamedStack::new(config.max_funcs, config.max_name_len);
        Self {
            world,
            session,
            config,
            descriptor,
            player,
            command: String::new(),
            command_args: String::new(),
            vars,
            funcs,
            depth: 0,
            instructions: 0,
        }
    }

    /// Set the command text reported through `{&cmd}` and `{&arg}`.
    pub fn with_command(mut self, command: &str, args: &str) -> Self {
        self.command = command.to_string();
        self.command_args = args.to_string();
        self
    }

    pub fn player(&self) -> Obj {
        self.player
    }

    pub fn config(&self) -> &MpiConfig {
        &self.config
    }

    /// The current `how` context string, used to prefix diagnostics.
    pub fn how(&self) -> String {
        self.vars.get("how").cloned().unwrap_or_default()
    }

    /// Deliver a line of output. Delivery failures are logged, never fatal.
    pub fn notify(&self, target: Obj, msg: &str) {
        if let Err(e) = self.session.notify(target, msg) {
            warn!(?target, error = ?e, "could not deliver MPI output");
        }
    }

    /// Deliver a line to the acting player.
    pub fn tell_player(&self, msg: &str) {
        self.notify(self.player, msg);
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            vars: self.vars.len(),
            funcs: self.funcs.len(),
            depth: self.depth,
            instructions: self.instructions,
        }
    }

    /// Guard that, when dropped, pops any variables pushed since it was taken.
    pub(crate) fn var_scope(&mut self) -> Restore<'_, 'w> {
        self.restore_on_drop(RestoreScope::Variables)
    }

    /// Guard that, when dropped, returns the recursion depth to its current value.
    pub(crate) fn depth_scope(&mut self) -> Restore<'_, 'w> {
        self.restore_on_drop(RestoreScope::Depth)
    }

    /// Guard that, when dropped, restores variables, functions and both counters.
    pub(crate) fn top_level_scope(&mut self) -> Restore<'_, 'w> {
        self.restore_on_drop(RestoreScope::All)
    }

    fn restore_on_drop(&mut self, scope: RestoreScope) -> Restore<'_, 'w> {
        let mark = self.checkpoint();
        Restore {
            ctx: self,
            mark,
            scope,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    vars: usize,
    funcs: usize,
    depth: usize,
    instructions: usize,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum RestoreScope {
    Variables,
    Depth,
    All,
}

/// Restores part of an [`EvalContext`] to a recorded mark when dropped, on every exit path.
pub(crate) struct Restore<'c, 'w> {
    ctx: &'c mut EvalContext<'w>,
    mark: Checkpoint,
    scope: RestoreScope,
}

impl<'w> Deref for Restore<'_, 'w> {
    type Target = EvalContext<'w>;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl DerefMut for Restore<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl Drop for Restore<'_, '_> {
    fn drop(&mut self) {
        match self.scope {
            RestoreScope::Variables => self.ctx.vars.truncate(self.mark.vars),
            RestoreScope::Depth => self.ctx.depth = self.mark.depth,
            RestoreScope::All => {
                self.ctx.vars.truncate(self.mark.vars);
                self.ctx.funcs.truncate(self.mark.funcs);
                self.ctx.depth = self.mark.depth;
                self.ctx.instructions = self.mark.instructions;
            }
        }
    }
}
