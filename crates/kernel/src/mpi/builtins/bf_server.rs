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

//! Facts about the server and the current connection.

use crate::mpi::builtins::{BfCallState, BuiltinRegistry};
use crate::mpi::errors::MpiError;

fn bf_muckname(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(bf_args.ctx.config.muckname.clone())
}

fn bf_version(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(bf_args.ctx.config.version.clone())
}

/// `{sysparm:name}`: a tunable server parameter, or nothing if there is no such parameter.
fn bf_sysparm(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let wanted = bf_args.arg(0);
    Ok(bf_args
        .ctx
        .config
        .sysparms
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
        .map(|(_, value)| value.clone())
        .unwrap_or_default())
}

/// The descriptor of the connection the evaluation runs for.
fn bf_descr(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(bf_args.ctx.descriptor.to_string())
}

fn bf_fox(_bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok("You found the easter egg!".to_string())
}

pub(crate) fn register_bf_server(builtins: &mut BuiltinRegistry) {
    builtins.register("muckname", bf_muckname);
    builtins.register("version", bf_version);
    builtins.register("sysparm", bf_sysparm);
    builtins.register("descr", bf_descr);
    builtins.register("fox", bf_fox);
}

#[cfg(test)]
mod tests {
    use crate::testing::TestWorld;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("{muckname}", "TygryssMUCK" ; "muckname")]
    #[test_case("{version}", "Muck2.2fb7.00b1+master" ; "version")]
    #[test_case("{sysparm:DUMPWARN_MESG}", "Dumping soon." ; "sysparm")]
    #[test_case("{sysparm:no_such_parm}", "" ; "unknown sysparm")]
    #[test_case("{descr}", "-1" ; "descriptor")]
    #[test_case("{fox}", "You found the easter egg!" ; "easter egg")]
    fn test_server(source: &str, expected: &str) {
        let mut t = TestWorld::new();
        assert_eq!(t.eval(source), expected);
    }
}
