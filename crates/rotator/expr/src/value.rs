//! Runtime values and the operator semantics over them.
//!
//! Arithmetic follows the familiar scripting rules the templates are
//! written against: ints widen to floats when mixed, `/` always yields a
//! float, `//` and `%` floor towards negative infinity. Integer overflow
//! is an error, never a wrap.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

/// Largest exponent accepted by `**`
pub const MAX_POWER: i64 = 4_000_000;

/// Longest string `*` repetition may produce, in characters
pub const MAX_STRING_LENGTH: usize = 100_000;

/// A value produced or consumed by an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    DateTime(DateTime<Utc>),
    Duration(Duration),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::DateTime(_) => "datetime",
            Value::Duration(_) => "duration",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::DateTime(_) => true,
            Value::Duration(d) => !d.is_zero(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view; bools count as 0 / 1
    fn number(&self) -> Option<Number> {
        match self {
            Value::Bool(b) => Some(Number::Int(*b as i64)),
            Value::Int(i) => Some(Number::Int(*i)),
            Value::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::None)
    }
}

/// Canonical string form, used when splicing into templates
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => {
                let text = x.to_string();
                if x.is_finite() && !text.contains(['.', 'e', 'E']) {
                    write!(f, "{}.0", text)
                } else {
                    write!(f, "{}", text)
                }
            }
            Value::Str(s) => write!(f, "{}", s),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Duration(d) => write!(f, "{}", d),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::None => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

/// Operator failures carry only a message; the evaluator attaches the source
pub(crate) type OpResult = Result<Value, String>;

fn unsupported(op: &str, left: &Value, right: &Value) -> String {
    format!(
        "unsupported operand types for {}: '{}' and '{}'",
        op,
        left.type_name(),
        right.type_name()
    )
}

fn overflow(op: &str) -> String {
    format!("integer overflow in '{}'", op)
}

fn float_result(x: f64) -> OpResult {
    if x.is_finite() {
        Ok(Value::Float(x))
    } else {
        Err("float result out of range".to_string())
    }
}

pub(crate) fn add(left: &Value, right: &Value) -> OpResult {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (Value::DateTime(t), Value::Duration(d)) | (Value::Duration(d), Value::DateTime(t)) => t
            .checked_add_signed(*d)
            .map(Value::DateTime)
            .ok_or_else(|| "datetime out of range".to_string()),
        (Value::Duration(a), Value::Duration(b)) => a
            .checked_add(b)
            .map(Value::Duration)
            .ok_or_else(|| "duration out of range".to_string()),
        _ => match (left.number(), right.number()) {
            (Some(Number::Int(a)), Some(Number::Int(b))) => {
                a.checked_add(b).map(Value::Int).ok_or_else(|| overflow("+"))
            }
            (Some(a), Some(b)) => float_result(a.as_f64() + b.as_f64()),
            _ => Err(unsupported("+", left, right)),
        },
    }
}

pub(crate) fn sub(left: &Value, right: &Value) -> OpResult {
    match (left, right) {
        (Value::DateTime(t), Value::Duration(d)) => t
            .checked_sub_signed(*d)
            .map(Value::DateTime)
            .ok_or_else(|| "datetime out of range".to_string()),
        (Value::DateTime(a), Value::DateTime(b)) => Ok(Value::Duration(a.signed_duration_since(*b))),
        (Value::Duration(a), Value::Duration(b)) => a
            .checked_sub(b)
            .map(Value::Duration)
            .ok_or_else(|| "duration out of range".to_string()),
        _ => match (left.number(), right.number()) {
            (Some(Number::Int(a)), Some(Number::Int(b))) => {
                a.checked_sub(b).map(Value::Int).ok_or_else(|| overflow("-"))
            }
            (Some(a), Some(b)) => float_result(a.as_f64() - b.as_f64()),
            _ => Err(unsupported("-", left, right)),
        },
    }
}

pub(crate) fn mul(left: &Value, right: &Value) -> OpResult {
    match (left, right) {
        (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
            let count = usize::try_from(*n).unwrap_or(0);
            let length = s.chars().count().saturating_mul(count);
            if length > MAX_STRING_LENGTH {
                return Err(format!(
                    "string repetition longer than {} characters",
                    MAX_STRING_LENGTH
                ));
            }
            Ok(Value::Str(s.repeat(count)))
        }
        (Value::Duration(d), Value::Int(n)) | (Value::Int(n), Value::Duration(d)) => {
            let factor = i32::try_from(*n).map_err(|_| "duration out of range".to_string())?;
            d.checked_mul(factor)
                .map(Value::Duration)
                .ok_or_else(|| "duration out of range".to_string())
        }
        _ => match (left.number(), right.number()) {
            (Some(Number::Int(a)), Some(Number::Int(b))) => {
                a.checked_mul(b).map(Value::Int).ok_or_else(|| overflow("*"))
            }
            (Some(a), Some(b)) => float_result(a.as_f64() * b.as_f64()),
            _ => Err(unsupported("*", left, right)),
        },
    }
}

pub(crate) fn div(left: &Value, right: &Value) -> OpResult {
    match (left.number(), right.number()) {
        (Some(a), Some(b)) => {
            if b.as_f64() == 0.0 {
                return Err("division by zero".to_string());
            }
            float_result(a.as_f64() / b.as_f64())
        }
        _ => Err(unsupported("/", left, right)),
    }
}

pub(crate) fn floor_div(left: &Value, right: &Value) -> OpResult {
    match (left.number(), right.number()) {
        (Some(Number::Int(a)), Some(Number::Int(b))) => {
            if b == 0 {
                return Err("integer division by zero".to_string());
            }
            let q = a.checked_div(b).ok_or_else(|| overflow("//"))?;
            if a % b != 0 && ((a < 0) != (b < 0)) {
                Ok(Value::Int(q - 1))
            } else {
                Ok(Value::Int(q))
            }
        }
        (Some(a), Some(b)) => {
            if b.as_f64() == 0.0 {
                return Err("float division by zero".to_string());
            }
            float_result((a.as_f64() / b.as_f64()).floor())
        }
        _ => Err(unsupported("//", left, right)),
    }
}

pub(crate) fn rem(left: &Value, right: &Value) -> OpResult {
    match (left.number(), right.number()) {
        (Some(Number::Int(a)), Some(Number::Int(b))) => {
            if b == 0 {
                return Err("integer modulo by zero".to_string());
            }
            let r = a.checked_rem(b).ok_or_else(|| overflow("%"))?;
            if r != 0 && ((r < 0) != (b < 0)) {
                Ok(Value::Int(r + b))
            } else {
                Ok(Value::Int(r))
            }
        }
        (Some(a), Some(b)) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            if b == 0.0 {
                return Err("float modulo by zero".to_string());
            }
            float_result(a - b * (a / b).floor())
        }
        _ => Err(unsupported("%", left, right)),
    }
}

pub(crate) fn pow(left: &Value, right: &Value) -> OpResult {
    let (base, exponent) = match (left.number(), right.number()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(unsupported("**", left, right)),
    };

    if exponent.as_f64().abs() > MAX_POWER as f64 {
        return Err(format!("exponent larger than {}", MAX_POWER));
    }

    match (base, exponent) {
        (Number::Int(a), Number::Int(b)) if b >= 0 => {
            let b = u32::try_from(b).map_err(|_| overflow("**"))?;
            a.checked_pow(b).map(Value::Int).ok_or_else(|| overflow("**"))
        }
        (a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            if a == 0.0 && b < 0.0 {
                return Err("zero cannot be raised to a negative power".to_string());
            }
            float_result(a.powf(b))
        }
    }
}

pub(crate) fn negate(operand: &Value) -> OpResult {
    match operand {
        Value::Duration(d) => Ok(Value::Duration(-*d)),
        other => match other.number() {
            Some(Number::Int(i)) => i.checked_neg().map(Value::Int).ok_or_else(|| overflow("-")),
            Some(Number::Float(f)) => Ok(Value::Float(-f)),
            None => Err(format!("bad operand type for unary -: '{}'", other.type_name())),
        },
    }
}

pub(crate) fn positive(operand: &Value) -> OpResult {
    match operand {
        Value::Duration(_) => Ok(operand.clone()),
        other => match other.number() {
            Some(Number::Int(i)) => Ok(Value::Int(i)),
            Some(Number::Float(f)) => Ok(Value::Float(f)),
            None => Err(format!("bad operand type for unary +: '{}'", other.type_name())),
        },
    }
}

/// Equality; values of unrelated types are simply unequal
pub(crate) fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::None, Value::None) => true,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::DateTime(a), Value::DateTime(b)) => a == b,
        (Value::Duration(a), Value::Duration(b)) => a == b,
        _ => match (left.number(), right.number()) {
            (Some(Number::Int(a)), Some(Number::Int(b))) => a == b,
            (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
            _ => false,
        },
    }
}

/// Ordering; unrelated types cannot be ordered
pub(crate) fn compare(op: &str, left: &Value, right: &Value) -> Result<Ordering, String> {
    let ordering = match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
        (Value::Duration(a), Value::Duration(b)) => Some(a.cmp(b)),
        _ => match (left.number(), right.number()) {
            (Some(Number::Int(a)), Some(Number::Int(b))) => Some(a.cmp(&b)),
            (Some(a), Some(b)) => a.as_f64().partial_cmp(&b.as_f64()),
            _ => None,
        },
    };

    ordering.ok_or_else(|| {
        format!(
            "'{}' not supported between instances of '{}' and '{}'",
            op,
            left.type_name(),
            right.type_name()
        )
    })
}

/// Membership test for `in`
pub(crate) fn contains(container: &Value, item: &Value) -> Result<bool, String> {
    match (container, item) {
        (Value::Str(haystack), Value::Str(needle)) => Ok(haystack.contains(needle.as_str())),
        (Value::Str(_), other) => Err(format!(
            "'in <string>' requires string as left operand, not '{}'",
            other.type_name()
        )),
        (other, _) => Err(format!(
            "argument of type '{}' is not a container",
            other.type_name()
        )),
    }
}
