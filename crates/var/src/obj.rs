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

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// The global environment room. Properties not found anywhere else up an environment chain
/// (macros, pronoun tables, sysparms) are looked up here last.
pub const SYSTEM_OBJECT: Obj = Obj::mk_id(0);

/// Used throughout to refer to a missing object value.
pub const NOTHING: Obj = Obj::mk_id(-1);
/// Used in matching to indicate that the match was ambiguous on multiple objects in the
/// environment.
pub const AMBIGUOUS: Obj = Obj::mk_id(-2);
/// The virtual room standing for a mover's home, as used by links.
pub const HOME: Obj = Obj::mk_id(-3);
/// The do-nothing link destination of actions.
pub const NIL: Obj = Obj::mk_id(-4);

/// A reference to an object in the world database: a "dbref".
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Obj(i32);

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ObjParseError {
    #[error("Expected object reference to start with '#', got {0:?}")]
    MissingHash(String),
    #[error("Could not parse object number in {0:?}")]
    BadNumber(String),
}

impl Obj {
    pub const fn mk_id(id: i32) -> Self {
        Self(id)
    }

    pub const fn id(&self) -> i32 {
        self.0
    }

    pub fn to_literal(&self) -> String {
        format!("#{}", self.0)
    }

    pub fn is_sysobj(&self) -> bool {
        self.0 == 0
    }

    pub fn is_nothing(&self) -> bool {
        self.0 == NOTHING.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 >= 0
    }

    /// True for the reserved negative values (`NOTHING`, `AMBIGUOUS`, `HOME`, `NIL`).
    pub fn is_sentinel(&self) -> bool {
        (NIL.0..=NOTHING.0).contains(&self.0)
    }
}

impl Debug for Obj {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl Display for Obj {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i32> for Obj {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl TryFrom<&str> for Obj {
    type Error = ObjParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let Some(number) = value.trim_start().strip_prefix('#') else {
            return Err(ObjParseError::MissingHash(value.to_string()));
        };
        let number = number
            .trim_end()
            .parse::<i32>()
            .map_err(|_| ObjParseError::BadNumber(value.to_string()))?;
        Ok(Self::mk_id(number))
    }
}

impl FromStr for Obj {
    type Err = ObjParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Obj::try_from(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn test_obj() {
        let obj = Obj::mk_id(0);
        assert_eq!(obj.id(), 0);
        assert_eq!(obj.to_literal(), "#0");
        assert!(obj.is_sysobj());

        let obj = Obj::mk_id(-1);
        assert_eq!(obj.to_literal(), "#-1");
        assert!(obj.is_nothing());
        assert!(!obj.is_positive());

        let obj = Obj::mk_id(0x7fff_ffff);
        assert_eq!(obj.to_literal(), "#2147483647");
    }

    #[test_case("#12", Some(12) ; "plain")]
    #[test_case("  #-1", Some(-1) ; "leading whitespace and negative")]
    #[test_case("12", None ; "missing hash")]
    #[test_case("#twelve", None ; "not a number")]
    fn test_parse(input: &str, expected: Option<i32>) {
        assert_eq!(Obj::try_from(input).ok().map(|o| o.id()), expected);
    }

    #[test]
    fn test_sentinels() {
        for s in [NOTHING, AMBIGUOUS, HOME, NIL] {
            assert!(s.is_sentinel(), "{s} should be a sentinel");
        }
        assert!(!SYSTEM_OBJECT.is_sentinel());
        assert!(!Obj::mk_id(-5).is_sentinel());
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&Obj::mk_id(42)).unwrap();
        assert_eq!(json, "42");
        let back: Obj = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Obj::mk_id(42));
    }
}
