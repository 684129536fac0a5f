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

//! User functions (`{func:...}`) and property macros (`_msgmacs/NAME`). Both expand textually:
//! the body has its `{:N}` placeholders replaced by the raw arguments and is then scanned in
//! place of the call.

use muckr_var::{NOTHING, SYSTEM_OBJECT};

use crate::mpi::args::{ARG_END, ARG_START, ESCAPE_CHAR, LEAD_CHAR};
use crate::mpi::context::{EvalContext, Frame};
use crate::mpi::props::{MACROS_PROPDIR, PropRead, read_limited, read_strict};
use crate::mpi::strings::{CR, ESC, truncate_to};
use crate::mpi::vars::PushError;

/// A function defined with `{func:name,var1,...,body}`, stored already wrapped in the `{with:}`
/// calls that bind its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFunction {
    pub arity: usize,
    pub body: String,
}

impl UserFunction {
    pub fn new(arity: usize, body: String) -> Self {
        Self { arity, body }
    }

    /// Build a function binding each of `params`, in order, to the matching positional argument.
    pub fn with_params(params: &[String], body: &str) -> Self {
        let mut wrapped = body.to_string();
        for (i, param) in params.iter().enumerate() {
            wrapped = format!("{{with:{param},{{:{}}},{wrapped}}}", i + 1);
        }
        Self::new(params.len(), wrapped)
    }
}

/// What a macro name expanded to. Only user functions check their argument count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroBody {
    pub body: String,
    pub arity: Option<usize>,
}

pub(crate) fn define_function(
    ctx: &mut EvalContext<'_>,
    name: &str,
    func: UserFunction,
) -> Result<(), PushError> {
    ctx.funcs.push(name, func).map(|_| ())
}

/// Find the expansion for `name`: a user function, else `_msgmacs/NAME` on the trigger's owner,
/// then up the trigger's environment (owned by that same owner, or blessed), then on `#0`.
pub(crate) fn lookup_macro(ctx: &EvalContext<'_>, frame: &Frame, name: &str) -> Option<MacroBody> {
    if name.is_empty() {
        return None;
    }
    if let Some(func) = ctx.funcs.get(name)
        && !func.body.is_empty()
    {
        return Some(MacroBody {
            body: func.body.clone(),
            arity: Some(func.arity),
        });
    }
    let path = format!("{MACROS_PROPDIR}/{name}");
    let owner = ctx.world.owner_of(frame.what).unwrap_or(NOTHING);
    let nonempty = |read: Option<PropRead>| read.filter(|r| !r.value.is_empty());
    nonempty(read_strict(ctx, frame, owner, &path))
        .or_else(|| nonempty(read_limited(ctx, frame, frame.what, owner, &path)))
        .or_else(|| nonempty(read_strict(ctx, frame, SYSTEM_OBJECT, &path)))
        .map(|read| MacroBody {
            body: read.value,
            arity: None,
        })
}

/// Substitute `args` into `body` and append `rest`, the unscanned input after the call. The
/// result is cut at `limit` bytes.
pub(crate) fn expand_macro(body: &str, args: &[String], rest: &str, limit: usize) -> String {
    let bytes = body.as_bytes();
    let mut out = String::with_capacity(body.len() + rest.len());
    let mut i = 0;
    while i < bytes.len() && out.len() < limit {
        match bytes[i] {
            ESCAPE_CHAR => match bytes.get(i + 1) {
                Some(b'r') => {
                    out.push(CR);
                    i += 2;
                }
                Some(b'[') => {
                    out.push(ESC);
                    i += 2;
                }
                _ => {
                    out.push('\\');
                    i += 1;
                    if let Some(c) = body[i..].chars().next() {
                        out.push(c);
                        i += c.len_utf8();
                    }
                }
            },
            LEAD_CHAR
                if bytes.get(i + 1) == Some(&ARG_START)
                    && bytes.get(i + 2).is_some_and(u8::is_ascii_digit)
                    && bytes.get(i + 3) == Some(&ARG_END) =>
            {
                let n = (bytes[i + 2] - b'0') as usize;
                if let Some(arg) = n.checked_sub(1).and_then(|idx| args.get(idx)) {
                    out.push_str(arg);
                }
                i += 4;
            }
            _ => {
                let c = body[i..].chars().next().unwrap_or_default();
                out.push(c);
                i += c.len_utf8().max(1);
            }
        }
    }
    out.push_str(rest);
    truncate_to(&mut out, limit);
    out
}
