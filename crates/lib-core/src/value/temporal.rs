use chrono::{Datelike, TimeZone, Timelike, Utc};

use crate::duration::NANOS_PER_SECOND;
use crate::errors::{Error, Result};
use crate::value::Value;

/// now() as a Time value.
pub fn now() -> Value {
    Value::Time(Utc::now())
}

impl Value {
    /// Format a Time with a chrono `%`-format string.
    pub fn time_format(&self, layout: &Value) -> Result<Value> {
        match (self, layout) {
            (Value::Time(t), Value::String(layout_str)) => {
                use std::fmt::Write;
                let mut out = String::new();
                write!(out, "{}", t.format(layout_str)).map_err(|_| {
                    Error::unavailable_msg("TimeFormat", &[self, layout], "invalid layout")
                })?;
                Ok(Value::String(out))
            }
            _ => Err(Error::unavailable("TimeFormat", &[self, layout])),
        }
    }

    /// Parse a String into a Time with a chrono `%`-format string; a layout
    /// without time components reads as midnight.
    pub fn str_to_time(&self, layout: &Value) -> Result<Value> {
        match (self, layout) {
            (Value::String(s), Value::String(layout_str)) => {
                if let Ok(t) = chrono::NaiveDateTime::parse_from_str(s, layout_str) {
                    return Ok(Value::Time(t.and_utc()));
                }
                chrono::NaiveDate::parse_from_str(s, layout_str)
                    .map(|d| {
                        Value::Time(d.and_time(chrono::NaiveTime::default()).and_utc())
                    })
                    .map_err(|err| {
                        Error::unavailable_msg("StrToTime", &[self, layout], err.to_string())
                    })
            }
            _ => Err(Error::unavailable("StrToTime", &[self, layout])),
        }
    }

    pub fn year(&self) -> Result<Value> {
        self.time_part("Year", |t| i64::from(t.year()))
    }

    pub fn month(&self) -> Result<Value> {
        self.time_part("Month", |t| i64::from(t.month()))
    }

    pub fn day(&self) -> Result<Value> {
        self.time_part("Day", |t| i64::from(t.day()))
    }

    pub fn hour(&self) -> Result<Value> {
        self.time_part("Hour", |t| i64::from(t.hour()))
    }

    pub fn minute(&self) -> Result<Value> {
        self.time_part("Minute", |t| i64::from(t.minute()))
    }

    pub fn second(&self) -> Result<Value> {
        self.time_part("Second", |t| i64::from(t.second()))
    }

    /// Sunday = 1 .. Saturday = 7.
    pub fn day_of_week(&self) -> Result<Value> {
        self.time_part("DayOfWeek", |t| {
            i64::from(t.weekday().num_days_from_sunday()) + 1
        })
    }

    /// 1..=366.
    pub fn day_of_year(&self) -> Result<Value> {
        self.time_part("DayOfYear", |t| i64::from(t.ordinal()))
    }

    fn time_part(&self, op: &str, f: impl Fn(&chrono::DateTime<Utc>) -> i64) -> Result<Value> {
        match self {
            Value::Time(t) => Ok(Value::Int(f(t))),
            _ => Err(Error::unavailable(op, &[self])),
        }
    }

    /// Build a UTC Time from Int components; self is the year, the rest
    /// default to month=1, day=1, hour=0, minute=0, second=0.
    pub fn new_time(&self, rest: &[Value]) -> Result<Value> {
        let mut parts = [0i64, 1, 1, 0, 0, 0];
        let all = || {
            let mut v: Vec<&Value> = vec![self];
            v.extend(rest);
            v
        };
        for (i, slot) in parts.iter_mut().enumerate() {
            let arg = match i {
                0 => Some(self),
                _ => rest.get(i - 1),
            };
            let Some(arg) = arg else { break };
            *slot = arg.int().ok_or_else(|| {
                Error::unavailable_msg("NewTime", &all(), format!("invalid arg[{i}]"))
            })?;
        }
        Utc.with_ymd_and_hms(
            parts[0] as i32,
            parts[1] as u32,
            parts[2] as u32,
            parts[3] as u32,
            parts[4] as u32,
            parts[5] as u32,
        )
        .single()
        .map(Value::Time)
        .ok_or_else(|| Error::unavailable_msg("NewTime", &all(), "invalid date"))
    }

    /// Block the calling worker: Int/Float are seconds, Duration as-is.
    /// Returns Int(0).
    pub fn sleep(&self) -> Result<Value> {
        let nanos = match self {
            Value::Float(v) => (v * NANOS_PER_SECOND as f64) as i64,
            Value::Int(v) => v.saturating_mul(NANOS_PER_SECOND),
            Value::Duration(n) => *n,
            _ => return Err(Error::unavailable("Sleep", &[self])),
        };
        log::debug!("sleep for {}", crate::duration::format(nanos));
        if nanos > 0 {
            std::thread::sleep(std::time::Duration::from_nanos(nanos as u64));
        }
        Ok(Value::Int(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Value {
        Value::String(s.to_string()).as_time().unwrap()
    }

    #[test]
    fn test_time_parts() {
        let v = t("2023-04-05 06:07:08");
        assert_eq!(v.year().unwrap(), Value::Int(2023));
        assert_eq!(v.month().unwrap(), Value::Int(4));
        assert_eq!(v.day().unwrap(), Value::Int(5));
        assert_eq!(v.hour().unwrap(), Value::Int(6));
        assert_eq!(v.minute().unwrap(), Value::Int(7));
        assert_eq!(v.second().unwrap(), Value::Int(8));
        // 2023-04-05 is a Wednesday
        assert_eq!(v.day_of_week().unwrap(), Value::Int(4));
        assert_eq!(v.day_of_year().unwrap(), Value::Int(95));
        assert!(Value::Int(1).year().is_err());
    }

    #[test]
    fn test_time_format() {
        let v = t("2023-04-05 06:07:08");
        assert_eq!(
            v.time_format(&Value::String("%Y/%m/%d".into())).unwrap(),
            Value::String("2023/04/05".into())
        );
        assert_eq!(
            v.time_format(&Value::String("%H:%M".into())).unwrap(),
            Value::String("06:07".into())
        );
        assert!(Value::Int(0).time_format(&Value::String("%Y".into())).is_err());
    }

    #[test]
    fn test_str_to_time() {
        assert_eq!(
            Value::String("2023/04/05".into())
                .str_to_time(&Value::String("%Y/%m/%d %H:%M:%S".into()))
                .is_err(),
            true
        );
        assert_eq!(
            Value::String("2023-04-05 06:07:08".into())
                .str_to_time(&Value::String("%Y-%m-%d %H:%M:%S".into()))
                .unwrap(),
            t("2023-04-05 06:07:08")
        );
    }

    #[test]
    fn test_new_time() {
        assert_eq!(Value::Int(2023).new_time(&[]).unwrap(), t("2023-01-01 00:00:00"));
        assert_eq!(
            Value::Int(2023)
                .new_time(&[Value::Int(4), Value::Int(5), Value::Int(6)])
                .unwrap(),
            t("2023-04-05 06:00:00")
        );
        assert!(Value::Int(2023).new_time(&[Value::String("x".into())]).is_err());
        assert!(Value::Int(2023).new_time(&[Value::Int(13)]).is_err());
    }

    #[test]
    fn test_sleep() {
        assert_eq!(Value::Int(0).sleep().unwrap(), Value::Int(0));
        assert_eq!(Value::Duration(1).sleep().unwrap(), Value::Int(0));
        assert!(Value::String("1".into()).sleep().is_err());
    }
}
