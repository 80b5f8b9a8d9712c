//! The function library bound into every evaluation.
//!
//! The set is fixed at compile time: a call can only reach a function
//! listed in [`lookup`]. Every function is pure; none of them read the
//! clock, the environment or the filesystem.

use std::fmt::Write as _;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::error::{ExprError, ExprResult};
use crate::value::Value;

/// Signature shared by all library functions
pub type Builtin = fn(&[Value]) -> ExprResult<Value>;

/// Names of every bound function, in documentation order
pub const FUNCTION_NAMES: &[&str] = &[
    "unixtime",
    "datetime_format",
    "timedelta_days",
    "timedelta_hours",
    "timedelta_minutes",
    "timedelta_seconds",
    "starts_with",
    "ends_with",
    "start",
    "end",
    "int",
    "float",
    "str",
    "len",
    "lower",
    "upper",
];

/// Resolve a function name against the allow-list
pub fn lookup(name: &str) -> Option<Builtin> {
    let f: Builtin = match name {
        "unixtime" => unixtime,
        "datetime_format" => datetime_format,
        "timedelta_days" => timedelta_days,
        "timedelta_hours" => timedelta_hours,
        "timedelta_minutes" => timedelta_minutes,
        "timedelta_seconds" => timedelta_seconds,
        "starts_with" => starts_with,
        "ends_with" => ends_with,
        "start" => start,
        "end" => end,
        "int" => to_int,
        "float" => to_float,
        "str" => to_str,
        "len" => len,
        "lower" => lower,
        "upper" => upper,
        _ => return None,
    };
    Some(f)
}

// -- argument helpers --

fn arity(name: &str, args: &[Value], expected: usize) -> ExprResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ExprError::evaluation(format!(
            "{}() takes {} argument{} ({} given)",
            name,
            expected,
            if expected == 1 { "" } else { "s" },
            args.len()
        )))
    }
}

fn wrong_type(name: &str, position: usize, expected: &str, got: &Value) -> ExprError {
    ExprError::evaluation(format!(
        "{}() argument {} must be {}, not '{}'",
        name,
        position + 1,
        expected,
        got.type_name()
    ))
}

fn str_arg<'a>(name: &str, args: &'a [Value], position: usize) -> ExprResult<&'a str> {
    match &args[position] {
        Value::Str(s) => Ok(s),
        other => Err(wrong_type(name, position, "str", other)),
    }
}

fn int_arg(name: &str, args: &[Value], position: usize) -> ExprResult<i64> {
    match &args[position] {
        Value::Int(i) => Ok(*i),
        other => Err(wrong_type(name, position, "int", other)),
    }
}

fn count_arg(name: &str, args: &[Value], position: usize) -> ExprResult<usize> {
    let n = int_arg(name, args, position)?;
    usize::try_from(n).map_err(|_| {
        ExprError::evaluation(format!(
            "{}() argument {} must not be negative",
            name,
            position + 1
        ))
    })
}

// -- date and time --

/// Best-effort date/time parsing; inputs without an offset are taken as UTC
pub fn parse_datetime(input: &str) -> ExprResult<DateTime<Utc>> {
    let s = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, pattern) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    for pattern in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, pattern) {
            return Ok(naive.and_utc());
        }
    }
    for pattern in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, pattern) {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return Ok(naive.and_utc());
            }
        }
    }
    // Compact YYYYMMDD; %Y would swallow every digit
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        let date = s[0..4].parse().ok().and_then(|y| {
            let m = s[4..6].parse().ok()?;
            let d = s[6..8].parse().ok()?;
            NaiveDate::from_ymd_opt(y, m, d)
        });
        if let Some(naive) = date.and_then(|d| d.and_hms_opt(0, 0, 0)) {
            return Ok(naive.and_utc());
        }
    }

    Err(ExprError::Parse {
        input: input.to_string(),
    })
}

fn unixtime(args: &[Value]) -> ExprResult<Value> {
    arity("unixtime", args, 1)?;
    match &args[0] {
        Value::Str(s) => Ok(Value::Int(parse_datetime(s)?.timestamp())),
        Value::DateTime(dt) => Ok(Value::Int(dt.timestamp())),
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Float(f) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
        other => Err(wrong_type("unixtime", 0, "str or datetime", other)),
    }
}

fn datetime_format(args: &[Value]) -> ExprResult<Value> {
    arity("datetime_format", args, 2)?;
    let dt = match &args[0] {
        Value::DateTime(dt) => *dt,
        other => return Err(wrong_type("datetime_format", 0, "datetime", other)),
    };
    let pattern = str_arg("datetime_format", args, 1)?;

    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(ExprError::evaluation(format!(
            "invalid format pattern: '{}'",
            pattern
        )));
    }

    let mut out = String::new();
    write!(out, "{}", dt.format_with_items(items.iter())).map_err(|_| {
        ExprError::evaluation(format!("unable to format datetime with '{}'", pattern))
    })?;
    Ok(Value::Str(out))
}

fn timedelta(name: &str, args: &[Value], make: fn(i64) -> Option<Duration>) -> ExprResult<Value> {
    arity(name, args, 1)?;
    let n = int_arg(name, args, 0)?;
    make(n)
        .map(Value::Duration)
        .ok_or_else(|| ExprError::evaluation(format!("{}() value out of range: {}", name, n)))
}

fn timedelta_days(args: &[Value]) -> ExprResult<Value> {
    timedelta("timedelta_days", args, Duration::try_days)
}

fn timedelta_hours(args: &[Value]) -> ExprResult<Value> {
    timedelta("timedelta_hours", args, Duration::try_hours)
}

fn timedelta_minutes(args: &[Value]) -> ExprResult<Value> {
    timedelta("timedelta_minutes", args, Duration::try_minutes)
}

fn timedelta_seconds(args: &[Value]) -> ExprResult<Value> {
    timedelta("timedelta_seconds", args, Duration::try_seconds)
}

// -- strings --

fn starts_with(args: &[Value]) -> ExprResult<Value> {
    arity("starts_with", args, 2)?;
    let s = str_arg("starts_with", args, 0)?;
    let prefix = str_arg("starts_with", args, 1)?;
    Ok(Value::Bool(s.starts_with(prefix)))
}

fn ends_with(args: &[Value]) -> ExprResult<Value> {
    arity("ends_with", args, 2)?;
    let s = str_arg("ends_with", args, 0)?;
    let suffix = str_arg("ends_with", args, 1)?;
    Ok(Value::Bool(s.ends_with(suffix)))
}

/// First `n` characters, clamped to the string length
fn start(args: &[Value]) -> ExprResult<Value> {
    arity("start", args, 2)?;
    let s = str_arg("start", args, 0)?;
    let n = count_arg("start", args, 1)?;
    Ok(Value::Str(s.chars().take(n).collect()))
}

/// Last `n` characters, clamped to the string length
fn end(args: &[Value]) -> ExprResult<Value> {
    arity("end", args, 2)?;
    let s = str_arg("end", args, 0)?;
    let n = count_arg("end", args, 1)?;
    let total = s.chars().count();
    Ok(Value::Str(s.chars().skip(total.saturating_sub(n)).collect()))
}

fn len(args: &[Value]) -> ExprResult<Value> {
    arity("len", args, 1)?;
    let s = str_arg("len", args, 0)?;
    Ok(Value::Int(s.chars().count() as i64))
}

fn lower(args: &[Value]) -> ExprResult<Value> {
    arity("lower", args, 1)?;
    Ok(Value::Str(str_arg("lower", args, 0)?.to_lowercase()))
}

fn upper(args: &[Value]) -> ExprResult<Value> {
    arity("upper", args, 1)?;
    Ok(Value::Str(str_arg("upper", args, 0)?.to_uppercase()))
}

// -- conversions --

fn to_int(args: &[Value]) -> ExprResult<Value> {
    arity("int", args, 1)?;
    match &args[0] {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::Float(f) => {
            let t = f.trunc();
            if t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64 {
                Ok(Value::Int(t as i64))
            } else {
                Err(ExprError::evaluation(format!(
                    "cannot convert float {} to int",
                    f
                )))
            }
        }
        Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            ExprError::evaluation(format!("invalid literal for int(): '{}'", s))
        }),
        other => Err(wrong_type("int", 0, "a number or numeric string", other)),
    }
}

fn to_float(args: &[Value]) -> ExprResult<Value> {
    arity("float", args, 1)?;
    match &args[0] {
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::Bool(b) => Ok(Value::Float(*b as i64 as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            ExprError::evaluation(format!("could not convert string to float: '{}'", s))
        }),
        other => Err(wrong_type("float", 0, "a number or numeric string", other)),
    }
}

fn to_str(args: &[Value]) -> ExprResult<Value> {
    arity("str", args, 1)?;
    Ok(Value::Str(args[0].to_string()))
}
