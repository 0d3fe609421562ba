use chrono::{DateTime, TimeZone, Utc};
use serde::ser::{Serialize, Serializer};

use crate::duration;
use crate::errors::{Error, Result};

mod arith;
mod compare;
mod control;
mod fs;
mod math;
mod temporal;
mod text;

pub use compare::Ordering;
pub use math::{e, pi, random};
pub use temporal::now;

/// Time values are rendered and parsed with this layout, always in UTC.
pub const TIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// The tagged value every column holds.
///
/// `Duration` is a signed nanosecond count; its string form is Go-style
/// (`"1h30m0s"`). Operators never panic on a variant mismatch: unsupported
/// combinations return [`Error::Unavailable`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Float(f64),
    Int(i64),
    Bool(bool),
    String(String),
    Time(DateTime<Utc>),
    Duration(i64),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Float(_) => "Float",
            Value::Int(_) => "Int",
            Value::Bool(_) => "Bool",
            Value::String(_) => "String",
            Value::Time(_) => "Time",
            Value::Duration(_) => "Duration",
        }
    }

    /// Debug-ish rendering used in error messages and logs.
    pub fn display(&self) -> String {
        match self {
            Value::Null => "Null".to_string(),
            Value::Float(v) => format!("Float({v})"),
            Value::Int(v) => format!("Int({v})"),
            Value::Bool(v) => format!("Bool({v})"),
            Value::String(v) => format!("String({v})"),
            Value::Time(v) => format!("Time({})", v.format(TIME_LAYOUT)),
            Value::Duration(v) => format!("Duration({})", duration::format(*v)),
        }
    }

    pub fn same_kind(&self, other: &Value) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    pub fn string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Time(v) => Some(*v),
            _ => None,
        }
    }

    pub fn duration(&self) -> Option<i64> {
        match self {
            Value::Duration(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True iff the value coerces to Bool and is true.
    pub fn is_true(&self) -> bool {
        matches!(self.as_bool(), Ok(Value::Bool(true)))
    }

    /// True iff the value coerces to Bool and is false.
    pub fn is_false(&self) -> bool {
        matches!(self.as_bool(), Ok(Value::Bool(false)))
    }

    //
    // explicit coercions
    //

    pub fn as_null(&self) -> Result<Value> {
        match self {
            Value::Null => Ok(Value::Null),
            other => Err(Error::unavailable("AsNull", &[other])),
        }
    }

    pub fn as_float(&self) -> Result<Value> {
        match self {
            Value::Float(v) => Ok(Value::Float(*v)),
            Value::Int(v) => Ok(Value::Float(*v as f64)),
            Value::Bool(_) | Value::Time(_) | Value::Duration(_) => self.as_int()?.as_float(),
            Value::String(s) => s
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|err| Error::unavailable_msg("AsFloat", &[self], err.to_string())),
            other => Err(Error::unavailable("AsFloat", &[other])),
        }
    }

    pub fn as_int(&self) -> Result<Value> {
        match self {
            Value::Float(v) => Ok(Value::Int(*v as i64)),
            Value::Int(v) => Ok(Value::Int(*v)),
            Value::Bool(v) => Ok(Value::Int(i64::from(*v))),
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|err| Error::unavailable_msg("AsInt", &[self], err.to_string())),
            Value::Time(t) => Ok(Value::Int(t.timestamp())),
            Value::Duration(n) => Ok(Value::Int(*n)),
            other => Err(Error::unavailable("AsInt", &[other])),
        }
    }

    pub fn as_bool(&self) -> Result<Value> {
        match self {
            Value::Float(_) => self.as_int()?.as_bool(),
            Value::Int(v) => Ok(Value::Bool(*v != 0)),
            Value::Bool(v) => Ok(Value::Bool(*v)),
            Value::String(s) => Ok(Value::Bool(!s.is_empty())),
            other => Err(Error::unavailable("AsBool", &[other])),
        }
    }

    pub fn as_string(&self) -> Result<Value> {
        match self {
            Value::Null => Ok(Value::String("null".to_string())),
            Value::Float(v) => Ok(Value::String(v.to_string())),
            Value::Int(v) => Ok(Value::String(v.to_string())),
            Value::Bool(v) => Ok(Value::String(v.to_string())),
            Value::String(s) => Ok(Value::String(s.clone())),
            Value::Time(t) => Ok(Value::String(t.format(TIME_LAYOUT).to_string())),
            Value::Duration(n) => Ok(Value::String(duration::format(*n))),
        }
    }

    pub fn as_time(&self) -> Result<Value> {
        match self {
            Value::Float(_) => self.as_int()?.as_time(),
            Value::Int(v) => Utc
                .timestamp_opt(*v, 0)
                .single()
                .map(Value::Time)
                .ok_or_else(|| Error::unavailable_msg("AsTime", &[self], "out of range")),
            Value::String(s) => parse_time(s)
                .map(Value::Time)
                .map_err(|err| Error::unavailable_msg("AsTime", &[self], err)),
            Value::Time(t) => Ok(Value::Time(*t)),
            other => Err(Error::unavailable("AsTime", &[other])),
        }
    }

    pub fn as_duration(&self) -> Result<Value> {
        match self {
            Value::Float(_) => self.as_int()?.as_duration(),
            Value::Int(v) => Ok(Value::Duration(*v)),
            Value::String(s) => duration::parse(s)
                .map(Value::Duration)
                .map_err(|err| Error::unavailable_msg("AsDuration", &[self], err)),
            Value::Duration(n) => Ok(Value::Duration(*n)),
            other => Err(Error::unavailable("AsDuration", &[other])),
        }
    }

    //
    // JSON codec
    //

    /// Decode a JSON scalar, trying Null, Bool, Time, Duration, Int, Float,
    /// String in that order; the first that parses wins.
    pub fn from_json(value: &serde_json::Value) -> Result<Value> {
        match value {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Value::Float(f))
                } else {
                    Err(Error::InvalidValue(format!("unrepresentable number {n}")))
                }
            }
            serde_json::Value::String(s) => {
                if let Ok(t) = parse_time(s) {
                    return Ok(Value::Time(t));
                }
                if let Ok(n) = duration::parse(s) {
                    return Ok(Value::Duration(n));
                }
                Ok(Value::String(s.clone()))
            }
            other => Err(Error::InvalidValue(format!("not a scalar: {other}"))),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Int(v) => serde_json::Value::Number((*v).into()),
            Value::Bool(v) => serde_json::Value::Bool(*v),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Time(t) => serde_json::Value::String(t.format(TIME_LAYOUT).to_string()),
            Value::Duration(n) => serde_json::Value::String(duration::format(*n)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    chrono::NaiveDateTime::parse_from_str(s, TIME_LAYOUT)
        .map(|t| t.and_utc())
        .map_err(|err| err.to_string())
}
