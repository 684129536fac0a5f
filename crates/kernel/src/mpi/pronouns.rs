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

//! `%`-substitution of pronouns and names, driven by the gender property of the object being
//! described.

use muckr_common::model::{PropValue, WorldState};
use muckr_var::{Obj, SYSTEM_OBJECT};

use crate::mpi::context::{EvalContext, Frame, MpiFlag, MpiFlags};
use crate::mpi::eval::evaluate;

/// Directory, on the object or on #0, holding per-gender overrides: `_pronouns/<gender>/%s`.
pub const PRONOUNS_PROPDIR: &str = "_pronouns";

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Gender {
    Unassigned,
    Neuter,
    Female,
    Male,
    Herm,
}

impl Gender {
    fn parse(text: &str) -> Self {
        match text.to_ascii_lowercase().as_str() {
            "male" => Gender::Male,
            "female" => Gender::Female,
            "hermaphrodite" | "herm" => Gender::Herm,
            "neuter" => Gender::Neuter,
            _ => Gender::Unassigned,
        }
    }

    /// The built-in form for pronoun code `code` (lower case), if this gender has one.
    fn form(self, code: char) -> Option<&'static str> {
        // subjective, possessive, objective, reflexive, absolute
        let forms: [&str; 5] = match self {
            Gender::Unassigned => return None,
            Gender::Neuter => ["it", "its", "it", "itself", "its"],
            Gender::Female => ["she", "her", "her", "herself", "hers"],
            Gender::Male => ["he", "his", "him", "himself", "his"],
            Gender::Herm => ["sie", "hir", "hir", "hirself", "hirs"],
        };
        match code {
            's' => Some(forms[0]),
            'p' => Some(forms[1]),
            'o' => Some(forms[2]),
            'r' => Some(forms[3]),
            'a' => Some(forms[4]),
            _ => None,
        }
    }
}

fn str_prop(world: &dyn WorldState, obj: Obj, name: &str) -> Option<String> {
    match world.get_property(obj, name).ok().flatten()?.value {
        PropValue::Str(s) => Some(s),
        _ => None,
    }
}

/// Look `name` up on `obj` and then up its chain of locations.
fn env_prop(world: &dyn WorldState, obj: Obj, name: &str) -> Option<String> {
    let mut here = obj;
    for _ in 0..=world.db_top() {
        if !world.valid(here) {
            return None;
        }
        if let Some(s) = str_prop(world, here, name) {
            return Some(s);
        }
        here = world.location_of(here).ok()?;
    }
    None
}

fn capitalize_first(s: &mut String, start: usize) {
    if let Some(c) = s[start..].chars().next() {
        if c.is_ascii_lowercase() {
            s.replace_range(start..start + 1, &c.to_ascii_uppercase().to_string());
        }
    }
}

/// The gender text of `obj`: its gender property, evaluated as a private lock expression.
fn gender_text(ctx: &mut EvalContext<'_>, obj: Obj) -> Option<String> {
    let prop = ctx.config.gender_prop.clone();
    let entry = ctx.world.get_property(obj, &prop).ok().flatten()?;
    let PropValue::Str(source) = entry.value else {
        return None;
    };
    let mut flags = MpiFlags::new();
    flags.set(MpiFlag::Private);
    flags.set(MpiFlag::Lock);
    if entry.blessed {
        flags.set(MpiFlag::Blessed);
    }
    let text = evaluate(ctx, &Frame::new(obj, obj, flags), &source).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Replace `%` codes in `text` with `obj`'s pronouns and name.
///
/// `%s %o %p %r %a` are subjective, objective, possessive, reflexive and absolute pronouns,
/// `%n` is the name, and `%%` a literal percent. An upper-case code capitalizes the result.
/// Overrides are looked up as a `%x` property on the object (for any other letter, on the
/// object's environment), then under [`PRONOUNS_PROPDIR`] on the object and on #0. An object
/// with no recognised gender gets its name (or possessive name) instead.
pub fn pronoun_substitute(ctx: &mut EvalContext<'_>, obj: Obj, text: &str) -> String {
    let limit = ctx.config.buffer_len.saturating_sub(2);
    let gender_name = gender_text(ctx, obj);
    let gender = gender_name.as_deref().map(Gender::parse).unwrap_or(Gender::Unassigned);
    let gender_dir = gender_name.unwrap_or_else(|| "_default".to_string());
    let world = &*ctx.world;
    let name = world.name_of(obj).unwrap_or_default();

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if out.len() > limit {
            break;
        }
        if c != '%' {
            out.push(c);
            continue;
        }
        let Some(code) = chars.next() else {
            out.push('%');
            break;
        };
        if code == '%' {
            out.push('%');
            continue;
        }
        let prop = format!("%{code}");
        let lower = code.to_ascii_lowercase();
        let start = out.len();

        let own = if "asoprn".contains(lower) {
            str_prop(world, obj, &prop)
        } else {
            env_prop(world, obj, &prop)
        };
        let gendered = |dir: &str| {
            let path = format!("{PRONOUNS_PROPDIR}/{dir}/{prop}");
            str_prop(world, obj, &path).or_else(|| str_prop(world, SYSTEM_OBJECT, &path))
        };
        let mut custom = own.or_else(|| gendered(&gender_dir));
        if custom.is_none() && gender == Gender::Unassigned {
            custom = gendered("_default");
        }

        if let Some(sub) = custom {
            // "%n..." in an override stands for the name followed by the rest.
            let sub = match sub.strip_prefix('%') {
                Some(rest) if rest.starts_with(['n', 'N']) => format!("{name}{}", &rest[1..]),
                _ => sub,
            };
            if start + sub.len() > limit {
                break;
            }
            out.push_str(&sub);
        } else if gender == Gender::Unassigned {
            match lower {
                'n' | 'o' | 's' | 'r' => out.push_str(&name),
                'a' | 'p' => {
                    out.push_str(&name);
                    out.push_str("'s");
                }
                _ => out.push(code),
            }
            continue;
        } else if lower == 'n' {
            out.push_str(&name);
        } else {
            match gender.form(lower) {
                Some(form) => out.push_str(form),
                None => out.push(code),
            }
        }
        if code.is_ascii_uppercase() {
            capitalize_first(&mut out, start);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestWorld;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("male", "%N waves %p hand at %o. %S is proud of %r.",
        "Alice waves his hand at him. He is proud of himself." ; "male")]
    #[test_case("female", "%s %p %o %r %a", "she her her herself hers" ; "female")]
    #[test_case("herm", "%s %p %a", "sie hir hirs" ; "herm")]
    #[test_case("Neuter", "%S %a", "It its" ; "neuter case insensitive")]
    #[test_case(
        "",
        "%n lost %p hat; %s is sad.",
        "Alice lost Alice's hat; Alice is sad."
        ; "unassigned"
    )]
    #[test_case("female", "100%% %x%", "100% x%" ; "literal percent and unknown code")]
    fn test_pronouns(gender: &str, text: &str, expected: &str) {
        let mut t = TestWorld::new();
        if !gender.is_empty() {
            t.set_prop(t.alice, "sex", gender);
        }
        let alice = t.alice;
        let result = t.with_context(alice, |ctx| pronoun_substitute(ctx, alice, text));
        assert_eq!(result, expected);
    }

    #[test]
    fn test_overrides() {
        let mut t = TestWorld::new();
        t.set_prop(t.alice, "sex", "spivak");
        t.set_prop(t.room_zero, "_pronouns/spivak/%s", "e");
        t.set_prop(t.alice, "%p", "%n's very own");
        let alice = t.alice;
        let result = t.with_context(alice, |ctx| pronoun_substitute(ctx, alice, "%S took %p cup"));
        assert_eq!(result, "E took Alice's very own cup");
    }

    #[test]
    fn test_gender_is_evaluated() {
        let mut t = TestWorld::new();
        t.set_prop(t.alice, "sex", "{if:1,female,male}");
        let alice = t.alice;
        let result = t.with_context(alice, |ctx| pronoun_substitute(ctx, alice, "%s"));
        assert_eq!(result, "she");
    }
}
