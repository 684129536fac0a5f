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

use muckr_common::model::WorldStateError;
use strum::Display;
use thiserror::Error;

/// The broad reason an evaluation was abandoned.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display)]
pub enum AbortKind {
    /// Malformed or unterminated call syntax.
    Parse,
    /// Too few or too many arguments.
    Arity,
    /// No builtin, user function or macro by that name.
    UnknownCall,
    /// An object match or property access was refused.
    Permission,
    /// The recursion, instruction or iteration ceiling was reached.
    Governor,
    /// The variable or function table is full, or a name is too long.
    Resource,
    /// A builtin rejected its arguments or could not complete.
    Handler,
}

/// An aborted evaluation. Carries, in order, every line the acting player is to be told about
/// the failure; layers the abort unwinds through append their own context lines.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("MPI evaluation aborted ({kind}): {}", .diagnostics.join(" / "))]
pub struct MpiError {
    pub kind: AbortKind,
    pub diagnostics: Vec<String>,
}

impl MpiError {
    pub fn new(kind: AbortKind, diagnostic: String) -> Self {
        Self {
            kind,
            diagnostics: vec![diagnostic],
        }
    }

    /// An abort that has already been reported (or has nothing to report).
    pub fn silent(kind: AbortKind) -> Self {
        Self {
            kind,
            diagnostics: vec![],
        }
    }

    /// Append a line describing where, on the way out, the abort passed through.
    pub fn context(mut self, line: String) -> Self {
        self.diagnostics.push(line);
        self
    }
}

impl From<WorldStateError> for MpiError {
    fn from(err: WorldStateError) -> Self {
        MpiError::new(AbortKind::Handler, format!("MPI Error: {err}"))
    }
}
