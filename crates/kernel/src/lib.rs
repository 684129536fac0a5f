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

//! The MPI interpreter. Hosts build an [`mpi::EvalContext`] over their world and session, then
//! hand message text to [`mpi::parse`] or a property to [`mpi::parse_property`].

pub use crate::config::MpiConfig;
pub use crate::mpi::{
    AbortKind, EvalContext, MpiError, MpiFlag, MpiFlags, parse, parse_property, try_parse,
};

pub mod config;
pub mod mpi;

pub mod testing;
