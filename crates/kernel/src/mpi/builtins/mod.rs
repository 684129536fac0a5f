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

//! The builtin function table: one descriptor per MPI primitive, with its argument handling
//! flags and arity, and the handler registered for it by one of the `bf_*` modules.

use ahash::AHashMap;
use lazy_static::lazy_static;
use muckr_var::Obj;
use tracing::error;
use unicase::UniCase;

use crate::mpi::builtins::bf_control::register_bf_control;
use crate::mpi::builtins::bf_lists::register_bf_lists;
use crate::mpi::builtins::bf_messaging::register_bf_messaging;
use crate::mpi::builtins::bf_num::register_bf_num;
use crate::mpi::builtins::bf_objects::register_bf_objects;
use crate::mpi::builtins::bf_properties::register_bf_properties;
use crate::mpi::builtins::bf_server::register_bf_server;
use crate::mpi::builtins::bf_strings::register_bf_strings;
use crate::mpi::builtins::bf_time::register_bf_time;
use crate::mpi::context::{EvalContext, Frame};
use crate::mpi::errors::{AbortKind, MpiError};
use crate::mpi::eval::evaluate;
use crate::mpi::resolve::{ResolveMode, Resolved, resolve};
use crate::mpi::vars::PushError;

mod bf_control;
mod bf_lists;
mod bf_messaging;
mod bf_num;
mod bf_objects;
mod bf_properties;
mod bf_server;
mod bf_strings;
mod bf_time;

lazy_static! {
    pub(crate) static ref BUILTINS: BuiltinRegistry = BuiltinRegistry::new();
}

/// The process-wide builtin table.
pub fn builtins() -> &'static BuiltinRegistry {
    &BUILTINS
}

pub(crate) type BuiltinFunction = fn(&mut BfCallState<'_, '_>) -> Result<String, MpiError>;

/// Descriptor of one builtin.
pub struct Builtin {
    pub name: &'static str,
    /// The upper-case form used in diagnostics, e.g. `ADD`.
    pub label: String,
    /// Evaluate each argument before calling the handler.
    pub parse_args: bool,
    /// Evaluate the handler's result as MPI.
    pub post_parse: bool,
    /// Trim leading and trailing spaces from each argument.
    pub strip: bool,
    pub min_args: usize,
    /// Upper bound on the argument count. A negative value lets the call take up to that many
    /// arguments without ever failing the arity check.
    pub max_args: i32,
    pub(crate) handler: Option<BuiltinFunction>,
}

fn mk_builtin(
    name: &'static str,
    parse_args: bool,
    post_parse: bool,
    strip: bool,
    min_args: usize,
    max_args: i32,
) -> Builtin {
    Builtin {
        name,
        label: name.to_uppercase(),
        parse_args,
        post_parse,
        strip,
        min_args,
        max_args,
        handler: None,
    }
}

const P: bool = true;
const N: bool = false;

fn mk_builtin_table() -> Vec<Builtin> {
    vec![
        mk_builtin("abs", P, N, P, 1, 1),
        mk_builtin("add", P, N, P, 2, 9),
        mk_builtin("and", N, N, P, 2, 9),
        mk_builtin("attr", P, N, P, 2, 9),
        mk_builtin("awake", P, N, P, 1, 1),
        mk_builtin("bless", P, N, P, 1, 2),
        mk_builtin("center", P, N, N, 1, 3),
        mk_builtin("commas", N, N, N, 1, 4),
        mk_builtin("concat", P, N, P, 1, 2),
        mk_builtin("contains", P, N, P, 1, 2),
        mk_builtin("contents", P, N, P, 1, 2),
        mk_builtin("controls", P, N, P, 1, 2),
        mk_builtin("convsecs", P, N, P, 1, 1),
        mk_builtin("convtime", P, N, P, 1, 1),
        mk_builtin("count", P, N, N, 1, 2),
        mk_builtin("created", P, N, P, 1, 1),
        mk_builtin("date", P, N, P, 0, 1),
        mk_builtin("dbeq", P, N, P, 2, 2),
        mk_builtin("debug", N, N, N, 1, 1),
        mk_builtin("debugif", N, N, N, 2, 2),
        mk_builtin("dec", P, N, P, 1, 2),
        mk_builtin("default", N, N, N, 2, 2),
        mk_builtin("delprop", P, N, P, 1, 2),
        mk_builtin("descr", P, N, P, 0, 0),
        mk_builtin("dice", P, N, P, 1, 3),
        mk_builtin("dist", P, N, P, 2, 6),
        mk_builtin("div", P, N, P, 2, 9),
        mk_builtin("escape", P, N, N, 1, 1),
        mk_builtin("eq", P, N, N, 2, 2),
        mk_builtin("eval", P, N, N, 1, 1),
        mk_builtin("eval!", P, N, N, 1, 1),
        mk_builtin("exec", P, N, P, 1, 2),
        mk_builtin("exec!", P, N, P, 1, 2),
        mk_builtin("exits", P, N, P, 1, 1),
        mk_builtin("filter", N, N, N, 3, 5),
        mk_builtin("flags", P, N, P, 1, 1),
        mk_builtin("fold", N, N, N, 4, 5),
        mk_builtin("for", N, N, N, 5, 5),
        mk_builtin("foreach", N, N, N, 3, 4),
        mk_builtin("fox", N, N, N, 0, 0),
        mk_builtin("ftime", P, N, N, 1, 3),
        mk_builtin("fullname", P, N, P, 1, 1),
        mk_builtin("func", N, N, P, 2, 9),
        mk_builtin("ge", P, N, P, 2, 2),
        mk_builtin("gt", P, N, P, 2, 2),
        mk_builtin("holds", P, N, P, 1, 2),
        mk_builtin("idle", P, N, P, 1, 1),
        mk_builtin("if", N, N, N, 2, 3),
        mk_builtin("inc", P, N, P, 1, 2),
        mk_builtin("index", P, N, P, 1, 2),
        mk_builtin("index!", P, N, P, 1, 2),
        mk_builtin("instr", P, N, N, 2, 2),
        mk_builtin("isdbref", P, N, P, 1, 1),
        mk_builtin("isnum", P, N, P, 1, 1),
        mk_builtin("istype", P, N, P, 2, 2),
        mk_builtin("lastused", P, N, P, 1, 1),
        mk_builtin("lcommon", P, N, N, 2, 2),
        mk_builtin("le", P, N, P, 2, 2),
        mk_builtin("left", P, N, N, 1, 3),
        mk_builtin("lexec", P, N, P, 1, 2),
        mk_builtin("links", P, N, P, 1, 1),
        mk_builtin("list", P, N, P, 1, 2),
        mk_builtin("listprops", P, N, P, 1, 3),
        mk_builtin("lit", N, N, N, 1, -1),
        mk_builtin("lmember", P, N, N, 2, 3),
        mk_builtin("loc", P, N, P, 1, 1),
        mk_builtin("locked", P, N, P, 2, 2),
        mk_builtin("lrand", P, N, N, 1, 2),
        mk_builtin("lremove", P, N, N, 2, 2),
        mk_builtin("lsort", N, N, N, 1, 4),
        mk_builtin("lt", P, N, P, 2, 2),
        mk_builtin("ltimestr", P, N, P, 1, 1),
        mk_builtin("lunion", P, N, N, 2, 2),
        mk_builtin("lunique", P, N, N, 1, 1),
        mk_builtin("max", P, N, P, 2, 2),
        mk_builtin("midstr", P, N, N, 2, 3),
        mk_builtin("min", P, N, P, 2, 2),
        mk_builtin("mklist", P, N, N, 0, 9),
        mk_builtin("mod", P, N, P, 2, 9),
        mk_builtin("modified", P, N, P, 1, 1),
        mk_builtin("money", P, N, P, 1, 1),
        mk_builtin("muckname", N, N, N, 0, 0),
        mk_builtin("mult", P, N, P, 2, 9),
        mk_builtin("name", P, N, P, 1, 1),
        mk_builtin("ne", P, N, N, 2, 2),
        mk_builtin("nearby", P, N, P, 1, 2),
        mk_builtin("nl", N, N, N, 0, 0),
        mk_builtin("not", P, N, P, 1, 1),
        mk_builtin("null", P, N, N, 0, 9),
        mk_builtin("online", N, N, N, 0, 0),
        mk_builtin("ontime", P, N, P, 1, 1),
        mk_builtin("or", N, N, P, 2, 9),
        mk_builtin("otell", P, N, N, 1, 3),
        mk_builtin("owner", P, N, P, 1, 1),
        mk_builtin("parse", N, N, N, 3, 5),
        mk_builtin("pronouns", P, N, N, 1, 2),
        mk_builtin("prop", P, N, P, 1, 2),
        mk_builtin("prop!", P, N, P, 1, 2),
        mk_builtin("propdir", P, N, P, 1, 2),
        mk_builtin("rand", P, N, P, 1, 2),
        mk_builtin("ref", P, N, P, 1, 1),
        mk_builtin("revoke", N, N, N, 1, 1),
        mk_builtin("right", P, N, N, 1, 3),
        mk_builtin("secs", N, N, N, 0, 0),
        mk_builtin("select", P, N, P, 2, 3),
        mk_builtin("set", P, N, N, 2, 2),
        mk_builtin("sign", P, N, P, 1, 1),
        mk_builtin("smatch", P, N, N, 2, 2),
        mk_builtin("stimestr", P, N, P, 1, 1),
        mk_builtin("store", P, N, P, 2, 3),
        mk_builtin("strip", P, N, N, 1, -1),
        mk_builtin("strlen", P, N, N, 1, 1),
        mk_builtin("sublist", P, N, N, 1, 4),
        mk_builtin("subst", P, N, N, 3, 3),
        mk_builtin("subt", P, N, P, 2, 9),
        mk_builtin("sysparm", P, N, P, 1, 1),
        mk_builtin("tab", N, N, N, 0, 0),
        mk_builtin("tell", P, N, N, 1, 2),
        mk_builtin("testlock", P, N, P, 2, 4),
        mk_builtin("time", P, N, P, 0, 1),
        mk_builtin("timestr", P, N, P, 1, 1),
        mk_builtin("timesub", P, N, P, 3, 4),
        mk_builtin("timing", N, N, N, 1, 1),
        mk_builtin("tolower", P, N, N, 1, 1),
        mk_builtin("toupper", P, N, N, 1, 1),
        mk_builtin("type", P, N, P, 1, 1),
        mk_builtin("tzoffset", N, N, N, 0, 0),
        mk_builtin("unbless", P, N, P, 1, 2),
        mk_builtin("usecount", P, N, P, 1, 1),
        mk_builtin("v", P, N, P, 1, 1),
        mk_builtin("version", N, N, N, 0, 0),
        mk_builtin("while", N, N, N, 2, 2),
        mk_builtin("with", N, N, N, 3, 9),
        mk_builtin("xor", P, N, P, 2, 2),
    ]
}

/// The builtins, indexed by case-insensitive name.
pub struct BuiltinRegistry {
    builtins: Vec<Builtin>,
    index: AHashMap<UniCase<String>, usize>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        let builtins = mk_builtin_table();
        let index = builtins
            .iter()
            .enumerate()
            .map(|(i, b)| (UniCase::new(b.name.to_string()), i))
            .collect();
        let mut registry = Self { builtins, index };
        register_bf_num(&mut registry);
        register_bf_strings(&mut registry);
        register_bf_lists(&mut registry);
        register_bf_control(&mut registry);
        register_bf_objects(&mut registry);
        register_bf_properties(&mut registry);
        register_bf_messaging(&mut registry);
        register_bf_time(&mut registry);
        register_bf_server(&mut registry);
        registry
    }

    pub fn find(&self, name: &str) -> Option<&Builtin> {
        self.index
            .get(&UniCase::new(name.to_string()))
            .map(|&i| &self.builtins[i])
    }

    pub(crate) fn register(&mut self, name: &str, handler: BuiltinFunction) {
        match self.index.get(&UniCase::new(name.to_string())) {
            Some(&i) => self.builtins[i].handler = Some(handler),
            None => error!(name, "no descriptor for builtin"),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.builtins.iter().map(|b| b.name)
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The arguments and other state passed to a builtin.
pub(crate) struct BfCallState<'c, 'w> {
    /// The upper-case name of the invoked builtin.
    pub(crate) name: &'static str,
    /// Arguments, already evaluated if the builtin asked for that.
    pub(crate) args: Vec<String>,
    pub(crate) ctx: &'c mut EvalContext<'w>,
    pub(crate) frame: Frame,
}

impl BfCallState<'_, '_> {
    /// Argument `i`, or empty text when there is none.
    pub fn arg(&self, i: usize) -> &str {
        self.args.get(i).map(String::as_str).unwrap_or("")
    }

    pub fn argc(&self) -> usize {
        self.args.len()
    }

    pub fn player(&self) -> Obj {
        self.ctx.player
    }

    /// Output size bound for anything a builtin builds.
    pub fn limit(&self) -> usize {
        self.ctx.config.buffer_len.saturating_sub(1)
    }

    /// Abort this call with `msg`, attributed to the builtin.
    pub fn abort(&self, msg: &str) -> MpiError {
        self.abort_kind(AbortKind::Handler, msg)
    }

    pub fn abort_kind(&self, kind: AbortKind, msg: &str) -> MpiError {
        MpiError::new(kind, format!("{} {{{}}}: {msg}", self.ctx.how(), self.name))
    }

    /// Note, on an abort unwinding through this call, what the builtin was doing.
    pub fn return_check(&self, err: MpiError, detail: &str) -> MpiError {
        err.context(format!("{} {{{}}} ({detail})", self.ctx.how(), self.name))
    }

    /// Evaluate `text` in the current frame.
    pub fn eval(&mut self, text: &str, detail: &str) -> Result<String, MpiError> {
        let frame = self.frame;
        self.eval_with(frame, text, detail)
    }

    /// Evaluate `text` in `frame`, which may run on another object or with other flags.
    pub fn eval_with(
        &mut self,
        frame: Frame,
        text: &str,
        detail: &str,
    ) -> Result<String, MpiError> {
        let result = evaluate(&mut *self.ctx, &frame, text);
        result.map_err(|e| self.return_check(e, detail))
    }

    /// Evaluate argument `i` (for builtins that receive theirs unevaluated).
    pub fn eval_arg(&mut self, i: usize) -> Result<String, MpiError> {
        let text = self.arg(i).to_string();
        self.eval(&text, &format!("arg {}", i + 1))
    }

    /// Bind a new variable for the duration of the enclosing [`Self::var_scope`].
    pub fn push_var(&mut self, name: &str, value: &str) -> Result<usize, MpiError> {
        match self.ctx.vars.push(name, value.to_string()) {
            Ok(slot) => Ok(slot),
            Err(PushError::NameTooLong) => Err(self.abort("Variable name too long.")),
            Err(PushError::Full) => Err(self.abort("Too many variables already defined.")),
        }
    }

    pub fn set_var(&mut self, slot: usize, value: &str) {
        self.ctx.vars.set(slot, value.to_string());
    }

    /// Run `f`, then pop whatever variables it bound, whether or not it succeeded.
    pub fn var_scope<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, MpiError>,
    ) -> Result<R, MpiError> {
        let mark = self.ctx.vars.len();
        let result = f(self);
        self.ctx.vars.truncate(mark);
        result
    }

    /// Count one pass of a loop, aborting once the list limit is reached.
    pub fn iteration(&self, passes: &mut usize) -> Result<(), MpiError> {
        *passes += 1;
        if *passes >= self.ctx.config.list_limit {
            return Err(self.abort_kind(AbortKind::Governor, "Iteration limit exceeded"));
        }
        Ok(())
    }

    /// Resolve argument `i` as an object, aborting with "Match failed." or
    /// "Permission denied." as appropriate.
    pub fn obj_arg(&self, i: usize, mode: ResolveMode) -> Result<Obj, MpiError> {
        self.resolve_obj(self.arg(i), mode)
    }

    pub fn resolve_obj(&self, text: &str, mode: ResolveMode) -> Result<Obj, MpiError> {
        match resolve(&*self.ctx, &self.frame, text, mode) {
            Resolved::Found(obj) => Ok(obj),
            Resolved::Unknown => Err(self.abort_kind(AbortKind::Permission, "Match failed.")),
            Resolved::Denied => Err(self.abort_kind(AbortKind::Permission, "Permission denied.")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpi::context::MpiFlag;
    use crate::testing::TestWorld;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn permissions_world() -> TestWorld {
        let mut t = TestWorld::new();
        t.set_prop(t.alice, "mood", "cheery");
        t.set_prop(t.alice, "@hush", "quiet");
        t.set_prop(t.statue, "motto", "Still");
        t
    }

    #[test]
    fn test_every_builtin_has_a_handler() {
        let registry = BuiltinRegistry::new();
        let missing: Vec<&str> = registry
            .builtins
            .iter()
            .filter(|b| b.handler.is_none())
            .map(|b| b.name)
            .collect();
        assert_eq!(missing, Vec::<&str>::new());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let add = BUILTINS.find("AdD").unwrap();
        assert_eq!(add.label, "ADD");
        assert!(add.parse_args);
        assert_eq!((add.min_args, add.max_args), (2, 9));
        assert!(BUILTINS.find("eval!").is_some());
        assert!(BUILTINS.find("delay").is_none());
    }

    #[test_case("{prop:mood}", false ; "own prop")]
    #[test_case("{prop:motto,statue}", true ; "prop on a foreign object")]
    #[test_case("{prop:@hush}", true ; "hidden prop")]
    #[test_case("{store:x,note}", false ; "store on self")]
    #[test_case("{store:x,note,statue}", true ; "store on a foreign object")]
    #[test_case("{name:statue}", false ; "name of a neighbor")]
    #[test_case("{name:#9}", false ; "name of a remote object")]
    #[test_case("{nearby:statue}", false ; "nearby neighbor")]
    #[test_case("{nearby:#9,#8}", true ; "nearby remote objects")]
    fn test_blessing_only_widens_access(source: &str, needs_blessing: bool) {
        let plain = permissions_world().try_eval(source);
        let blessed = permissions_world().try_eval_flags(source, &[MpiFlag::Blessed]);
        assert_eq!(plain.is_err(), needs_blessing);
        match plain {
            Ok(out) => assert_eq!(blessed.ok(), Some(out)),
            Err(e) => assert!(blessed.is_ok(), "blessed {source} still failed after {e:?}"),
        }
    }
}
