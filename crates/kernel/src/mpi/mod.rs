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

//! The MPI interpreter: brace-delimited calls embedded in message text, evaluated against the
//! world on behalf of a player.

pub use context::{EvalContext, Frame, MpiFlag, MpiFlags};
pub use errors::{AbortKind, MpiError};
pub use parse::{parse, parse_property, try_parse};
pub use pronouns::pronoun_substitute;
pub use resolve::{ResolveMode, Resolved};

pub(crate) mod args;
pub mod builtins;
pub mod context;
pub mod errors;
pub(crate) mod eval;
pub(crate) mod macros;
pub mod parse;
pub(crate) mod props;
pub mod pronouns;
pub(crate) mod resolve;
pub(crate) mod strings;
pub(crate) mod vars;
