use chrono::Duration as TimeDelta;

use crate::errors::{Error, Result};
use crate::value::Value;

impl Value {
    /// `+`: numeric addition (Float-promoting), String concat, Bool OR,
    /// Time+Duration (commutative), Duration+Duration.
    pub fn add(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
            (Value::Float(_), Value::Int(_)) => self.add(&other.as_float()?),
            (Value::Int(_), Value::Float(_)) => other.add(self),
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(*b))),
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(*a || *b)),
            (Value::Time(t), Value::Duration(n)) => Ok(Value::Time(*t + TimeDelta::nanoseconds(*n))),
            (Value::Duration(_), Value::Time(_)) => other.add(self),
            (Value::Duration(a), Value::Duration(b)) => Ok(Value::Duration(a.wrapping_add(*b))),
            _ => Err(Error::unavailable("Add", &[self, other])),
        }
    }

    /// `-` is `x + neg(y)`, so it covers whatever `add` and `neg` do.
    pub fn subtract(&self, other: &Value) -> Result<Value> {
        let negated = other
            .neg()
            .map_err(|err| Error::unavailable_msg("Subtract", &[self, other], err.to_string()))?;
        self.add(&negated)
            .map_err(|err| Error::unavailable_msg("Subtract", &[self, other], err.to_string()))
    }

    /// `*`: numeric product (Float-promoting), Int×String repetition, Bool
    /// AND, numeric×Duration scaling.
    pub fn multiply(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a * b)),
            (Value::Float(_), Value::Int(_)) => self.multiply(&other.as_float()?),
            (Value::Float(a), Value::Duration(n)) => Ok(Value::Duration((a * *n as f64) as i64)),
            (Value::Int(_), Value::Float(_)) => self.as_float()?.multiply(other),
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_mul(*b))),
            (Value::Int(count), Value::String(s)) => {
                if *count > 0 {
                    Ok(Value::String(s.repeat(*count as usize)))
                } else {
                    Ok(Value::String(String::new()))
                }
            }
            (Value::Int(_), Value::Duration(_)) => self.as_float()?.multiply(other),
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(*a && *b)),
            (Value::String(_), Value::Int(_)) => other.multiply(self),
            (Value::Duration(_), Value::Float(_) | Value::Int(_)) => other.multiply(self),
            _ => Err(Error::unavailable("Multiply", &[self, other])),
        }
    }

    /// `/` is `x * inverse(y)`.
    pub fn divide(&self, other: &Value) -> Result<Value> {
        let inverted = other
            .inverse()
            .map_err(|err| Error::unavailable_msg("Divide", &[self, other], err.to_string()))?;
        self.multiply(&inverted)
            .map_err(|err| Error::unavailable_msg("Divide", &[self, other], err.to_string()))
    }

    /// Numeric reciprocal (zero is an error); String reversal by code point.
    pub fn inverse(&self) -> Result<Value> {
        match self {
            Value::Float(v) => {
                if *v == 0.0 {
                    Err(Error::unavailable_msg("Inverse", &[self], "div by zero"))
                } else {
                    Ok(Value::Float(1.0 / v))
                }
            }
            Value::Int(v) => {
                if *v == 0 {
                    Err(Error::unavailable_msg("Inverse", &[self], "div by zero"))
                } else {
                    Ok(Value::Float(1.0 / *v as f64))
                }
            }
            Value::String(s) => Ok(Value::String(s.chars().rev().collect())),
            _ => Err(Error::unavailable("Inverse", &[self])),
        }
    }

    /// Negation: numeric and Duration sign flip, Bool logical NOT.
    pub fn neg(&self) -> Result<Value> {
        match self {
            Value::Float(v) => Ok(Value::Float(-v)),
            Value::Int(v) => Ok(Value::Int(v.wrapping_neg())),
            Value::Bool(v) => Ok(Value::Bool(!v)),
            Value::Duration(v) => Ok(Value::Duration(v.wrapping_neg())),
            _ => Err(Error::unavailable("Neg", &[self])),
        }
    }

    /// `%`: numeric modulo, zero divisor is an error.
    pub fn rem(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => {
                if *b == 0.0 {
                    Err(Error::unavailable_msg("Mod", &[self, other], "div by zero"))
                } else {
                    Ok(Value::Float(a % b))
                }
            }
            (Value::Float(_), Value::Int(_)) => self.rem(&other.as_float()?),
            (Value::Int(_), Value::Float(_)) => self.as_float()?.rem(other),
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    Err(Error::unavailable_msg("Mod", &[self, other], "div by zero"))
                } else {
                    Ok(Value::Int(a.wrapping_rem(*b)))
                }
            }
            _ => Err(Error::unavailable("Mod", &[self, other])),
        }
    }

    //
    // bitwise; Int only
    //

    pub fn bit_not(&self) -> Result<Value> {
        match self {
            Value::Int(v) => Ok(Value::Int(!v)),
            _ => Err(Error::unavailable("BitNot", &[self])),
        }
    }

    pub fn bit_and(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a & b)),
            _ => Err(Error::unavailable("BitAnd", &[self, other])),
        }
    }

    pub fn bit_or(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a | b)),
            _ => Err(Error::unavailable("BitOr", &[self, other])),
        }
    }

    pub fn bit_xor(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a ^ b)),
            _ => Err(Error::unavailable("BitXor", &[self, other])),
        }
    }

    /// `<<`; a negative shift turns into `>>` of the magnitude.
    pub fn shift_left(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => {
                if *b < 0 {
                    self.shift_right(&other.neg()?)
                } else {
                    Ok(Value::Int(a.wrapping_shl(*b as u32)))
                }
            }
            _ => Err(Error::unavailable("LeftShift", &[self, other])),
        }
    }

    /// `>>`; a negative shift turns into `<<` of the magnitude.
    pub fn shift_right(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => {
                if *b < 0 {
                    self.shift_left(&other.neg()?)
                } else {
                    Ok(Value::Int(a.wrapping_shr(*b as u32)))
                }
            }
            _ => Err(Error::unavailable("RightShift", &[self, other])),
        }
    }

    //
    // logical; Bool only
    //

    pub fn logical_not(&self) -> Result<Value> {
        match self {
            Value::Bool(_) => self.neg(),
            _ => Err(Error::unavailable("LogicalNot", &[self])),
        }
    }

    pub fn logical_and(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(*a && *b)),
            _ => Err(Error::unavailable("LogicalAnd", &[self, other])),
        }
    }

    pub fn logical_or(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(*a || *b)),
            _ => Err(Error::unavailable("LogicalOr", &[self, other])),
        }
    }

    pub fn logical_xor(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a != b)),
            _ => Err(Error::unavailable("LogicalXor", &[self, other])),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono::Utc;

    use super::*;
    use crate::duration::{NANOS_PER_HOUR, NANOS_PER_MINUTE, NANOS_PER_SECOND};

    #[test]
    fn test_add() {
        let t = Utc.with_ymd_and_hms(2023, 4, 5, 6, 0, 0).unwrap();
        let tests = [
            (Value::Int(1), Value::Int(2), Value::Int(3)),
            (Value::Int(1), Value::Float(0.5), Value::Float(1.5)),
            (Value::Float(0.5), Value::Int(1), Value::Float(1.5)),
            (
                Value::String("ab".into()),
                Value::String("cd".into()),
                Value::String("abcd".into()),
            ),
            (Value::Bool(false), Value::Bool(true), Value::Bool(true)),
            (
                Value::Time(t),
                Value::Duration(NANOS_PER_HOUR),
                Value::Time(Utc.with_ymd_and_hms(2023, 4, 5, 7, 0, 0).unwrap()),
            ),
            (
                Value::Duration(NANOS_PER_HOUR),
                Value::Time(t),
                Value::Time(Utc.with_ymd_and_hms(2023, 4, 5, 7, 0, 0).unwrap()),
            ),
            (
                Value::Duration(NANOS_PER_MINUTE),
                Value::Duration(NANOS_PER_SECOND),
                Value::Duration(NANOS_PER_MINUTE + NANOS_PER_SECOND),
            ),
        ];
        for (a, b, want) in tests {
            assert_eq!(a.add(&b).unwrap(), want, "{} + {}", a.display(), b.display());
        }
        assert!(Value::Int(1).add(&Value::String("x".into())).is_err());
        assert!(Value::Null.add(&Value::Null).is_err());
    }

    #[test]
    fn test_subtract() {
        let t = Utc.with_ymd_and_hms(2023, 4, 5, 6, 0, 0).unwrap();
        let tests = [
            (Value::Int(3), Value::Int(2), Value::Int(1)),
            (Value::Float(1.5), Value::Int(1), Value::Float(0.5)),
            (
                Value::Time(t),
                Value::Duration(NANOS_PER_HOUR),
                Value::Time(Utc.with_ymd_and_hms(2023, 4, 5, 5, 0, 0).unwrap()),
            ),
            (
                Value::Duration(NANOS_PER_MINUTE),
                Value::Duration(NANOS_PER_SECOND),
                Value::Duration(NANOS_PER_MINUTE - NANOS_PER_SECOND),
            ),
            // Bool subtraction = a + !b = OR with the negation
            (Value::Bool(true), Value::Bool(true), Value::Bool(true)),
            (Value::Bool(false), Value::Bool(true), Value::Bool(false)),
        ];
        for (a, b, want) in tests {
            assert_eq!(a.subtract(&b).unwrap(), want, "{} - {}", a.display(), b.display());
        }
        assert!(Value::String("a".into()).subtract(&Value::String("b".into())).is_err());
    }

    #[test]
    fn test_multiply() {
        let tests = [
            (Value::Int(3), Value::Int(2), Value::Int(6)),
            (Value::Int(2), Value::Float(0.5), Value::Float(1.0)),
            (Value::Int(3), Value::String("ab".into()), Value::String("ababab".into())),
            (Value::String("ab".into()), Value::Int(2), Value::String("abab".into())),
            (Value::Int(0), Value::String("ab".into()), Value::String("".into())),
            (Value::Int(-1), Value::String("ab".into()), Value::String("".into())),
            (Value::Bool(true), Value::Bool(false), Value::Bool(false)),
            (
                Value::Int(2),
                Value::Duration(NANOS_PER_MINUTE),
                Value::Duration(2 * NANOS_PER_MINUTE),
            ),
            (
                Value::Float(1.5),
                Value::Duration(NANOS_PER_MINUTE),
                Value::Duration(90 * NANOS_PER_SECOND),
            ),
            (
                Value::Duration(NANOS_PER_MINUTE),
                Value::Int(2),
                Value::Duration(2 * NANOS_PER_MINUTE),
            ),
        ];
        for (a, b, want) in tests {
            assert_eq!(a.multiply(&b).unwrap(), want, "{} * {}", a.display(), b.display());
        }
        assert!(Value::Null.multiply(&Value::Int(2)).is_err());
    }

    #[test]
    fn test_divide_and_inverse() {
        assert_eq!(Value::Int(3).divide(&Value::Int(2)).unwrap(), Value::Float(1.5));
        assert_eq!(Value::Float(1.0).divide(&Value::Float(4.0)).unwrap(), Value::Float(0.25));
        assert!(Value::Int(1).divide(&Value::Int(0)).is_err());
        assert!(Value::Int(1).divide(&Value::Float(0.0)).is_err());
        assert_eq!(
            Value::String("abc".into()).inverse().unwrap(),
            Value::String("cba".into())
        );
        assert!(Value::Bool(true).inverse().is_err());
    }

    #[test]
    fn test_rem() {
        assert_eq!(Value::Int(7).rem(&Value::Int(3)).unwrap(), Value::Int(1));
        assert_eq!(Value::Float(7.5).rem(&Value::Int(2)).unwrap(), Value::Float(1.5));
        assert!(Value::Int(7).rem(&Value::Int(0)).is_err());
        assert!(Value::String("7".into()).rem(&Value::Int(2)).is_err());
    }

    #[test]
    fn test_bitwise() {
        assert_eq!(Value::Int(0b1100).bit_and(&Value::Int(0b1010)).unwrap(), Value::Int(0b1000));
        assert_eq!(Value::Int(0b1100).bit_or(&Value::Int(0b1010)).unwrap(), Value::Int(0b1110));
        assert_eq!(Value::Int(0b1100).bit_xor(&Value::Int(0b1010)).unwrap(), Value::Int(0b0110));
        assert_eq!(Value::Int(0).bit_not().unwrap(), Value::Int(-1));
        assert_eq!(Value::Int(1).shift_left(&Value::Int(4)).unwrap(), Value::Int(16));
        assert_eq!(Value::Int(16).shift_right(&Value::Int(4)).unwrap(), Value::Int(1));
        // negative shifts reverse direction
        assert_eq!(Value::Int(1).shift_left(&Value::Int(-1)).unwrap(), Value::Int(0));
        assert_eq!(Value::Int(1).shift_right(&Value::Int(-4)).unwrap(), Value::Int(16));
        assert!(Value::Bool(true).bit_and(&Value::Int(1)).is_err());
    }

    #[test]
    fn test_logical() {
        assert_eq!(Value::Bool(true).logical_and(&Value::Bool(false)).unwrap(), Value::Bool(false));
        assert_eq!(Value::Bool(true).logical_or(&Value::Bool(false)).unwrap(), Value::Bool(true));
        assert_eq!(Value::Bool(true).logical_xor(&Value::Bool(true)).unwrap(), Value::Bool(false));
        assert_eq!(Value::Bool(true).logical_not().unwrap(), Value::Bool(false));
        assert!(Value::Int(1).logical_and(&Value::Bool(true)).is_err());
        assert!(Value::Int(1).logical_not().is_err());
    }
}
