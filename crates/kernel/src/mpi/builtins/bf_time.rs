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

//! Clock and duration builtins. "Local" time is UTC shifted by the configured offset.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};

use crate::mpi::builtins::{BfCallState, BuiltinRegistry};
use crate::mpi::errors::MpiError;
use crate::mpi::strings::atoi;

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;

/// The layout `convtime` reads: `HH:MM:SS MM/DD/YY`.
const CONVTIME_FORMAT: &str = "%H:%M:%S %m/%d/%y";

fn now() -> i64 {
    Utc::now().timestamp()
}

fn tz_offset(bf_args: &BfCallState<'_, '_>) -> i64 {
    i64::from(bf_args.ctx.config.tz_offset_secs)
}

fn local_zone(bf_args: &BfCallState<'_, '_>) -> FixedOffset {
    FixedOffset::east_opt(bf_args.ctx.config.tz_offset_secs).unwrap_or_else(|| Utc.fix())
}

/// `secs` as a local date and time, or an abort if it is out of range.
fn local_time(bf_args: &BfCallState<'_, '_>, secs: i64) -> Result<DateTime<FixedOffset>, MpiError> {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.with_timezone(&local_zone(bf_args)))
        .ok_or_else(|| bf_args.abort("Out of range time argument."))
}

/// Now, or with an hours argument, now as seen in the zone that many hours from UTC.
fn shifted_now(bf_args: &BfCallState<'_, '_>) -> i64 {
    let mut t = now();
    if bf_args.argc() == 1 {
        t += HOUR * i64::from(atoi(bf_args.arg(0))) - tz_offset(bf_args);
    }
    t
}

/// `{time[:zone]}`: the time of day as `HH:MM:SS`.
fn bf_time(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let t = shifted_now(bf_args);
    Ok(local_time(bf_args, t)?.format("%T").to_string())
}

/// `{date[:zone]}`: the date as `MM/DD/YY`.
fn bf_date(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let t = shifted_now(bf_args);
    Ok(local_time(bf_args, t)?.format("%D").to_string())
}

/// `{ftime:format[,zone[,secs]]}`: strftime-style formatting. A zone between -24 and 24 is in
/// hours, anything else in seconds.
fn bf_ftime(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let mut t = if bf_args.argc() == 3 {
        i64::from(atoi(bf_args.arg(2)))
    } else {
        now()
    };
    if bf_args.argc() > 1 && !bf_args.arg(1).is_empty() {
        let zone = i64::from(atoi(bf_args.arg(1)));
        t += if zone > -25 && zone < 25 { HOUR * zone } else { zone };
        t -= tz_offset(bf_args);
    }
    let items: Vec<Item<'_>> = StrftimeItems::new(bf_args.arg(0)).collect();
    if items.iter().any(|i| matches!(i, Item::Error)) {
        return Err(bf_args.abort("Invalid time format."));
    }
    let when = local_time(bf_args, t)?;
    Ok(when.format_with_items(items.into_iter()).to_string())
}

/// `{convtime:HH:MM:SS MM/DD/YY}`: a local date and time as epoch seconds.
fn bf_convtime(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let parsed = NaiveDateTime::parse_from_str(bf_args.arg(0).trim(), CONVTIME_FORMAT)
        .map_err(|_| bf_args.abort("Invalid time string"))?;
    Ok((parsed.and_utc().timestamp() - tz_offset(bf_args)).to_string())
}

/// `{convsecs:secs}`: epoch seconds as a full local date.
fn bf_convsecs(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let when = local_time(bf_args, i64::from(atoi(bf_args.arg(0))))?;
    let zone = if when.offset().local_minus_utc() == 0 {
        "UTC".to_string()
    } else {
        when.format("%:z").to_string()
    };
    Ok(when.format(&format!("%a %b %d %T {zone} %Y")).to_string())
}

fn bf_secs(_bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(now().to_string())
}

fn bf_tzoffset(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(tz_offset(bf_args).to_string())
}

/// A duration spelled out, e.g. "1 week, 2 days, 10 mins, 52 secs".
pub fn long_duration(secs: i64) -> String {
    let units = [
        (WEEK, "week"),
        (DAY, "day"),
        (HOUR, "hour"),
        (MINUTE, "min"),
        (1, "sec"),
    ];
    let mut rest = secs.max(0);
    let mut parts = vec![];
    for (size, unit) in units {
        let n = rest / size;
        rest %= size;
        if n > 0 {
            let plural = if n == 1 { "" } else { "s" };
            parts.push(format!("{n} {unit}{plural}"));
        }
    }
    if parts.is_empty() {
        return "0 secs".to_string();
    }
    parts.join(", ")
}

/// `{ltimestr:secs}`: a duration in words.
fn bf_ltimestr(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    Ok(long_duration(i64::from(atoi(bf_args.arg(0)))))
}

fn split_duration(secs: i64) -> (i64, i64, i64, i64) {
    let days = if secs >= DAY { secs / DAY } else { 0 };
    let secs = if secs >= DAY { secs % DAY } else { secs };
    let hours = if secs >= HOUR { secs / HOUR } else { 0 };
    let secs = if secs >= HOUR { secs % HOUR } else { secs };
    let mins = if secs >= MINUTE { secs / MINUTE } else { 0 };
    let secs = if secs >= MINUTE { secs % MINUTE } else { secs };
    (days, hours, mins, secs)
}

/// `{timestr:secs}`: a duration as `[Nd ]HH:MM`, the way WHO lists connection times.
fn bf_timestr(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let (days, hours, mins, _) = split_duration(i64::from(atoi(bf_args.arg(0))));
    if days > 0 {
        Ok(format!("{days}d {hours:02}:{mins:02}"))
    } else {
        Ok(format!("{hours:02}:{mins:02}"))
    }
}

/// `{stimestr:secs}`: a duration as its largest unit only, e.g. `3h`.
fn bf_stimestr(bf_args: &mut BfCallState<'_, '_>) -> Result<String, MpiError> {
    let (days, hours, mins, secs) = split_duration(i64::from(atoi(bf_args.arg(0))));
    Ok(match (days, hours, mins) {
        (d, _, _) if d > 0 => format!("{d}d"),
        (_, h, _) if h > 0 => format!("{h}h"),
        (_, _, m) if m > 0 => format!("{m}m"),
        _ => format!("{secs}s"),
    })
}

pub(crate) fn register_bf_time(builtins: &mut BuiltinRegistry) {
    builtins.register("time", bf_time);
    builtins.register("date", bf_date);
    builtins.register("ftime", bf_ftime);
    builtins.register("convtime", bf_convtime);
    builtins.register("convsecs", bf_convsecs);
    builtins.register("secs", bf_secs);
    builtins.register("tzoffset", bf_tzoffset);
    builtins.register("ltimestr", bf_ltimestr);
    builtins.register("timestr", bf_timestr);
    builtins.register("stimestr", bf_stimestr);
}

#[cfg(test)]
mod tests {
    use super::long_duration;
    use crate::testing::TestWorld;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(0, "0 secs" ; "zero")]
    #[test_case(1, "1 sec" ; "singular")]
    #[test_case(3600, "1 hour" ; "exact hour")]
    #[test_case(7 * 86400 + 2 * 86400 + 652, "1 week, 2 days, 10 mins, 52 secs" ; "mixed")]
    fn test_long_duration(secs: i64, expected: &str) {
        assert_eq!(long_duration(secs), expected);
    }

    #[test_case("{timestr:59}", "00:00" ; "under a minute")]
    #[test_case("{timestr:3723}", "01:02" ; "hours and minutes")]
    #[test_case("{timestr:90061}", "1d 01:01" ; "with days")]
    #[test_case("{stimestr:42}", "42s" ; "seconds")]
    #[test_case("{stimestr:3723}", "1h" ; "largest unit")]
    #[test_case("{stimestr:200000}", "2d" ; "days")]
    #[test_case("{ltimestr:90}", "1 min, 30 secs" ; "ltimestr")]
    #[test_case("{convsecs:0}", "Thu Jan 01 00:00:00 UTC 1970" ; "epoch")]
    #[test_case("{convtime:01:02:03 02/01/70}", "2682123" ; "convtime")]
    #[test_case("{ftime:%Y-%m-%d %H:%M,0,86400}", "1970-01-02 00:00" ; "ftime fixed time")]
    #[test_case("{ftime:%H,5,0}", "05" ; "ftime zone in hours")]
    #[test_case("{tzoffset}", "0" ; "tzoffset")]
    fn test_time(source: &str, expected: &str) {
        let mut t = TestWorld::new();
        assert_eq!(t.eval(source), expected);
    }

    #[test]
    fn test_clock_shapes() {
        let mut t = TestWorld::new();
        let time = t.eval("{time}");
        assert_eq!(time.len(), 8);
        assert_eq!(time.matches(':').count(), 2);
        let date = t.eval("{date:-5}");
        assert_eq!(date.matches('/').count(), 2);
        let secs: i64 = t.eval("{secs}").parse().unwrap();
        assert!(secs > 1_600_000_000);
    }

    #[test]
    fn test_bad_inputs() {
        let mut t = TestWorld::new();
        let err = t.try_eval("{ftime:%Q}").unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {FTIME}: Invalid time format."]);
        let err = t.try_eval("{convtime:yesterday}").unwrap_err();
        assert_eq!(err.diagnostics, vec!["(test) {CONVTIME}: Invalid time string"]);
    }
}
