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

//! The top-level entry points collaborators call: evaluate a message or a property's text on
//! behalf of a player, with the ambient `how`/`cmd`/`arg` variables bound, and put every piece
//! of shared interpreter state back afterward.

use minstant::Instant;
use muckr_var::Obj;
use tracing::{debug, warn};

use crate::mpi::context::{EvalContext, Frame, MpiFlag, MpiFlags};
use crate::mpi::errors::{AbortKind, MpiError};
use crate::mpi::eval::evaluate;

fn bind_ambient(ctx: &mut EvalContext<'_>, tag: &str, flags: MpiFlags) -> Result<(), MpiError> {
    let out_of_vars = || MpiError::new(AbortKind::Resource, format!("{tag} Out of MPI variables."));
    if !flags.contains(MpiFlag::NoHow) {
        ctx.vars.push("how", tag.to_string()).map_err(|_| out_of_vars())?;
    }
    let (command, args) = (ctx.command.clone(), ctx.command_args.clone());
    ctx.vars.push("cmd", command).map_err(|_| out_of_vars())?;
    ctx.vars.push("arg", args).map_err(|_| out_of_vars())?;
    Ok(())
}

/// Evaluate `source` with `what` as both trigger and permission source, returning the error
/// rather than reporting it. `tag` names the context in diagnostics, e.g. `(@desc)`.
pub fn try_parse(
    ctx: &mut EvalContext<'_>,
    what: Obj,
    source: &str,
    tag: &str,
    flags: MpiFlags,
) -> Result<String, MpiError> {
    if !ctx.config.enabled {
        return Ok(source.to_string());
    }
    let started = Instant::now();
    let result = {
        let mut ctx = ctx.top_level_scope();
        bind_ambient(&mut ctx, tag, flags)?;
        evaluate(&mut ctx, &Frame::new(what, what, flags), source)
    };
    // An aborted evaluation produced empty text.
    let output = result.as_deref().unwrap_or("");
    if output != source
        && let Err(e) = ctx.world.record_mpi_profile(what, started.elapsed())
    {
        warn!(?what, error = ?e, "could not record MPI profile");
    }
    result
}

/// Evaluate `source` for the player. On an abort the player is sent every diagnostic and the
/// result is empty.
pub fn parse(
    ctx: &mut EvalContext<'_>,
    what: Obj,
    source: &str,
    tag: &str,
    flags: MpiFlags,
) -> String {
    match try_parse(ctx, what, source, tag, flags) {
        Ok(output) => output,
        Err(e) => {
            warn!(?what, tag, kind = %e.kind, "MPI evaluation aborted");
            for line in &e.diagnostics {
                ctx.tell_player(line);
            }
            String::new()
        }
    }
}

/// Evaluate the text of property `name` on `what`, trusted if the property is blessed.
/// `None` if there is no such property.
pub fn parse_property(
    ctx: &mut EvalContext<'_>,
    what: Obj,
    name: &str,
    tag: &str,
    flags: MpiFlags,
) -> Option<String> {
    let entry = ctx.world.get_property(what, name).ok().flatten()?;
    let mut flags = flags;
    if entry.blessed {
        flags.set(MpiFlag::Blessed);
    }
    debug!(?what, name, blessed = entry.blessed, "evaluating property");
    Some(parse(ctx, what, &entry.value.as_text(), tag, flags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestWorld;
    use muckr_common::model::{PropEntry, PropValue};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_reports_aborts_to_player() {
        let mut t = TestWorld::new();
        let alice = t.alice;
        let out = t.with_context(alice, |ctx| {
            parse(ctx, alice, "{prop:nonexistent}", "(@desc)", MpiFlags::new())
        });
        assert_eq!(out, "");
        assert_eq!(t.messages(alice), vec!["(@desc) {PROP}: Failed read."]);
    }

    #[test]
    fn test_state_restored_after_abort() {
        let mut t = TestWorld::new();
        let alice = t.alice;
        t.with_context(alice, |ctx| {
            let vars = ctx.vars.len();
            let funcs = ctx.funcs.len();
            let out = parse(
                ctx,
                alice,
                "{func:f,x,{&x}}{with:y,1,{prop:nonexistent}}",
                "(test)",
                MpiFlags::new(),
            );
            assert_eq!(out, "");
            assert_eq!(ctx.vars.len(), vars);
            assert_eq!(ctx.funcs.len(), funcs);
            assert_eq!(ctx.depth, 0);
            assert_eq!(ctx.instructions, 0);
        });
    }

    #[test]
    fn test_ambient_variables() {
        let mut t = TestWorld::new();
        let alice = t.alice;
        let out = t.with_context(alice, |ctx| {
            ctx.command = "look".to_string();
            ctx.command_args = "statue".to_string();
            parse(ctx, alice, "{&how}|{&cmd}|{&arg}", "(@desc)", MpiFlags::new())
        });
        assert_eq!(out, "(@desc)|look|statue");
        let err = t
            .try_eval_flags("{&how}", &[MpiFlag::NoHow])
            .unwrap_err();
        assert_eq!(err.kind, AbortKind::UnknownCall);
    }

    #[test]
    fn test_disabled_passes_text_through() {
        let mut t = TestWorld::new();
        let alice = t.alice;
        let mut config = (*t.config).clone();
        config.enabled = false;
        t.config = std::sync::Arc::new(config);
        let out = t.with_context(alice, |ctx| {
            parse(ctx, alice, "{add:1,2}", "(test)", MpiFlags::new())
        });
        assert_eq!(out, "{add:1,2}");
    }

    #[test]
    fn test_profile_recorded_when_output_changes() {
        let mut t = TestWorld::new();
        let alice = t.alice;
        t.with_context(alice, |ctx| parse(ctx, alice, "no calls", "(test)", MpiFlags::new()));
        assert_eq!(t.world.mpi_profile(alice).map(|(uses, _)| uses), Some(0));
        t.with_context(alice, |ctx| parse(ctx, alice, "{add:1,2}", "(test)", MpiFlags::new()));
        assert_eq!(t.world.mpi_profile(alice).map(|(uses, _)| uses), Some(1));
    }

    #[test]
    fn test_profile_recorded_for_aborts() {
        let mut t = TestWorld::new();
        let alice = t.alice;
        t.set_prop(alice, "_msgmacs/loop", "{loop}");
        t.with_context(alice, |ctx| parse(ctx, alice, "{abs}", "(test)", MpiFlags::new()));
        assert_eq!(t.world.mpi_profile(alice).map(|(uses, _)| uses), Some(1));
        t.with_context(alice, |ctx| parse(ctx, alice, "{loop}", "(test)", MpiFlags::new()));
        assert_eq!(t.world.mpi_profile(alice).map(|(uses, _)| uses), Some(2));
        // Empty in, empty out: not a use.
        t.with_context(alice, |ctx| parse(ctx, alice, "", "(test)", MpiFlags::new()));
        assert_eq!(t.world.mpi_profile(alice).map(|(uses, _)| uses), Some(2));
    }

    #[test]
    fn test_parse_property_inherits_blessing() {
        let mut t = TestWorld::new();
        let alice = t.alice;
        t.set_prop(alice, "@hush", "quiet");
        t.set_prop(alice, "peek", "{prop:@hush}");
        let out = t.with_context(alice, |ctx| {
            parse_property(ctx, alice, "peek", "(test)", MpiFlags::new())
        });
        assert_eq!(out, Some(String::new()));
        t.world
            .put_property(
                alice,
                "peek",
                PropEntry {
                    value: PropValue::Str("{prop:@hush}".to_string()),
                    blessed: true,
                },
            )
            .unwrap();
        let out = t.with_context(alice, |ctx| {
            parse_property(ctx, alice, "peek", "(test)", MpiFlags::new())
        });
        assert_eq!(out, Some("quiet".to_string()));
        let out = t.with_context(alice, |ctx| {
            parse_property(ctx, alice, "absent", "(test)", MpiFlags::new())
        });
        assert_eq!(out, None);
    }

    #[test]
    fn test_tell_scenarios() {
        let mut t = TestWorld::new();
        let (alice, statue, widget) = (t.alice, t.statue, t.widget);
        t.eval("{tell:Hello}");
        assert_eq!(t.messages(alice), vec!["Hello"]);
        t.eval("{tell:Hello,statue}");
        assert_eq!(t.messages(statue), vec!["> Alice Hello"]);
        t.eval("{tell:Hello,widget}");
        assert_eq!(t.messages(widget), vec!["> Hello"]);
    }
}
