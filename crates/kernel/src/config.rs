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

//! Config is created by the host and handed to every evaluation. Used to hold the interpreter's
//! limits and the server facts MPI can report, typically loaded from a YAML file and CLI flags.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MpiConfig {
    /// Whether MPI is evaluated at all. When false, text is passed through untouched.
    pub enabled: bool,
    /// Maximum nesting of evaluations before aborting.
    pub max_recursion: usize,
    /// Maximum number of builtin and macro dispatches in one top-level evaluation.
    pub max_commands: usize,
    /// Size of an output buffer; results are truncated to one less than this.
    pub buffer_len: usize,
    pub max_vars: usize,
    pub max_funcs: usize,
    /// Longest allowed variable, function or builtin name.
    pub max_name_len: usize,
    /// Longest list read from properties, and the iteration limit for the looping builtins.
    pub list_limit: usize,
    pub muckname: String,
    pub version: String,
    /// Offset from UTC, in seconds, used by the time builtins.
    pub tz_offset_secs: i32,
    /// The property holding a player's gender, used for pronoun substitution.
    pub gender_prop: String,
    /// Values served by `{sysparm:NAME}`.
    pub sysparms: BTreeMap<String, String>,
}

impl Default for MpiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_recursion: 26,
            max_commands: 2048,
            buffer_len: 8192,
            max_vars: 32,
            max_funcs: 32,
            max_name_len: 16,
            list_limit: 512,
            muckname: "TygryssMUCK".to_string(),
            version: "Muck2.2fb7.00b1+master".to_string(),
            tz_offset_secs: 0,
            gender_prop: "sex".to_string(),
            sysparms: BTreeMap::new(),
        }
    }
}
