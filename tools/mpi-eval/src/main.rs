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

//! Evaluate MPI against a world file, as a given player, and print the result.

mod console;

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use clap_derive::Parser;
use eyre::{Result, bail, eyre};
use figment::Figment;
use figment::providers::{Format, Serialized, Yaml};
use muckr_common::model::WorldState;
use muckr_common::tracing::init_tracing;
use muckr_db::WorldDef;
use muckr_kernel::mpi::{EvalContext, MpiFlag, MpiFlags, parse, parse_property};
use muckr_kernel::MpiConfig;
use muckr_var::Obj;
use tracing::{debug, info};

use crate::console::ConsoleSession;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[arg(help = "World description to evaluate against (.json, or YAML otherwise)")]
    world: PathBuf,

    #[arg(help = "MPI text to evaluate. Read from stdin when omitted and --prop is not given")]
    source: Option<String>,

    #[arg(long, help = "YAML file of interpreter settings, layered over the defaults")]
    config: Option<PathBuf>,

    #[arg(long, default_value = "#1", help = "The player the evaluation runs for")]
    player: Obj,

    #[arg(long, help = "The object the MPI is attached to; defaults to the player")]
    trigger: Option<Obj>,

    #[arg(long, help = "Evaluate this property of the trigger instead of SOURCE")]
    prop: Option<String>,

    #[arg(long, default_value = "(mpi-eval)", help = "Context tag used in diagnostics and {&how}")]
    tag: String,

    #[arg(long, default_value = "", help = "Command text reported by {&cmd}")]
    command: String,

    #[arg(long, default_value = "", help = "Command arguments reported by {&arg}")]
    args: String,

    #[arg(long, help = "Run with wizard-level trust")]
    blessed: bool,

    #[arg(long, help = "Trace every call as it is evaluated")]
    trace: bool,

    #[arg(long, help = "Override the recursion ceiling")]
    max_recursion: Option<usize>,

    #[arg(long, help = "Override the instruction ceiling")]
    max_commands: Option<usize>,

    #[arg(long, help = "Enable debug logging")]
    debug: bool,
}

fn load_config(args: &Args) -> Result<MpiConfig> {
    let mut figment = Figment::new().merge(Serialized::defaults(MpiConfig::default()));
    if let Some(path) = &args.config {
        figment = figment.merge(Yaml::file(path));
    }
    let mut config: MpiConfig = figment.extract()?;
    if let Some(max) = args.max_recursion {
        config.max_recursion = max;
    }
    if let Some(max) = args.max_commands {
        config.max_commands = max;
    }
    Ok(config)
}

fn flags(args: &Args) -> MpiFlags {
    let mut flags = MpiFlags::new();
    if args.blessed {
        flags.set(MpiFlag::Blessed);
    }
    if args.trace {
        flags.set(MpiFlag::Debug);
    }
    flags
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing(args.debug)?;

    let config = Arc::new(load_config(&args)?);
    debug!(?config, "interpreter settings");
    let mut world = WorldDef::load_file(&args.world)?.build()?;
    let trigger = args.trigger.unwrap_or(args.player);
    for obj in [args.player, trigger] {
        if !world.valid(obj) {
            bail!("{obj} is not an object in {}", args.world.display());
        }
    }
    info!(player = ?args.player, ?trigger, "evaluating");

    let session = Arc::new(ConsoleSession::new(args.player, std::io::stdout()));
    let mut ctx = EvalContext::new(&mut world, session, config, 0, args.player)
        .with_command(&args.command, &args.args);
    let output = match &args.prop {
        Some(prop) => parse_property(&mut ctx, trigger, prop, &args.tag, flags(&args))
            .ok_or_else(|| eyre!("{trigger} has no property {prop:?}"))?,
        None => {
            let source = match &args.source {
                Some(source) => source.clone(),
                None => {
                    let mut text = String::new();
                    std::io::stdin().read_to_string(&mut text)?;
                    text.trim_end_matches('\n').to_string()
                }
            };
            parse(&mut ctx, trigger, &source, &args.tag, flags(&args))
        }
    };
    println!("{output}");
    Ok(())
}
