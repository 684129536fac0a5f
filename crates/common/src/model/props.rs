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

use muckr_var::Obj;
use serde::{Deserialize, Serialize};

use crate::model::Lock;

pub const PROPDIR_DELIMITER: char = '/';
pub const PROP_RDONLY: char = '_';
pub const PROP_RDONLY2: char = '%';
pub const PROP_PRIVATE: char = '.';
pub const PROP_HIDDEN: char = '@';
pub const PROP_SEEONLY: char = '~';
const PROP_SYSTEM_PREFIX: &str = "@__sys__";

/// The value held by a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropValue {
    Str(String),
    Int(i32),
    Ref(Obj),
    Lock(Lock),
}

impl PropValue {
    /// Coerce to text the way property readers see it: strings as-is, integers in decimal,
    /// references as `#N`. Locks and `#-1` references read as empty.
    pub fn as_text(&self) -> String {
        match self {
            PropValue::Str(s) => s.clone(),
            PropValue::Int(i) => i.to_string(),
            PropValue::Ref(o) if o.is_nothing() => String::new(),
            PropValue::Ref(o) => o.to_literal(),
            PropValue::Lock(_) => String::new(),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value)
    }
}

/// A property as stored: its value plus the blessed bit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropEntry {
    pub value: PropValue,
    #[serde(default)]
    pub blessed: bool,
}

impl PropEntry {
    pub fn new(value: PropValue) -> Self {
        Self {
            value,
            blessed: false,
        }
    }
}

/// True if `marker` begins the name or any of its path segments.
fn prop_check(name: &str, marker: char) -> bool {
    name.starts_with(marker)
        || name
            .split(PROPDIR_DELIMITER)
            .skip(1)
            .any(|seg| seg.starts_with(marker))
}

pub fn is_read_only(name: &str) -> bool {
    prop_check(name, PROP_RDONLY) || prop_check(name, PROP_RDONLY2)
}

pub fn is_private(name: &str) -> bool {
    prop_check(name, PROP_PRIVATE)
}

pub fn is_hidden(name: &str) -> bool {
    prop_check(name, PROP_HIDDEN)
}

pub fn is_see_only(name: &str) -> bool {
    prop_check(name, PROP_SEEONLY)
}

/// Server-internal properties, never visible to MPI even when blessed.
pub fn is_system(name: &str) -> bool {
    let name = name.trim_start_matches(PROPDIR_DELIMITER);
    match name.get(..PROP_SYSTEM_PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(PROP_SYSTEM_PREFIX) => {
            let rest = &name[PROP_SYSTEM_PREFIX.len()..];
            rest.is_empty() || rest.starts_with(PROPDIR_DELIMITER)
        }
        _ => false,
    }
}

/// Canonical form of a property path: no leading, trailing or doubled delimiters.
pub fn normalize_prop_name(name: &str) -> String {
    name.split(PROPDIR_DELIMITER)
        .filter(|seg| !seg.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("_desc", true, false, false, false ; "read only")]
    #[test_case("%n", true, false, false, false ; "pronoun read only")]
    #[test_case("foo/.secret", false, true, false, false ; "private segment")]
    #[test_case("@hidden/x", false, false, true, false ; "hidden")]
    #[test_case("a/~see", false, false, false, true ; "see only")]
    #[test_case("plain/name_with_underscore", false, false, false, false ; "plain")]
    fn test_classify(name: &str, ro: bool, private: bool, hidden: bool, see_only: bool) {
        assert_eq!(is_read_only(name), ro);
        assert_eq!(is_private(name), private);
        assert_eq!(is_hidden(name), hidden);
        assert_eq!(is_see_only(name), see_only);
    }

    #[test_case("@__sys__", true)]
    #[test_case("/@__sys__/foo", true)]
    #[test_case("@__sys__x", false)]
    #[test_case("@sys", false)]
    fn test_system(name: &str, expected: bool) {
        assert_eq!(is_system(name), expected);
    }

    #[test]
    fn test_normalize_and_text() {
        assert_eq!(normalize_prop_name("//a//b/"), "a/b");
        assert_eq!(PropValue::Int(5).as_text(), "5");
        assert_eq!(PropValue::Ref(Obj::mk_id(7)).as_text(), "#7");
        assert_eq!(PropValue::Ref(Obj::mk_id(-1)).as_text(), "");
    }
}
