use crate::errors::{Error, Result};
use crate::value::Value;

/// Result of comparing two values. `Unknown` means the pair is not
/// comparable; boolean contexts treat it as false.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    Less,
    Equal,
    Greater,
    Unknown,
}

impl From<std::cmp::Ordering> for Ordering {
    fn from(ord: std::cmp::Ordering) -> Self {
        match ord {
            std::cmp::Ordering::Less => Ordering::Less,
            std::cmp::Ordering::Equal => Ordering::Equal,
            std::cmp::Ordering::Greater => Ordering::Greater,
        }
    }
}

impl Value {
    /// Natural ordering within a variant; Int and Float compare as Float,
    /// Bool via Int, Time and Duration via their integer representation,
    /// Null equals Null. Every other pairing is `Unknown`.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Float(a), Value::Float(b)) => compare_floats(*a, *b),
            (Value::Float(a), Value::Int(b)) => compare_floats(*a, *b as f64),
            (Value::Int(a), Value::Float(b)) => compare_floats(*a as f64, *b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b).into(),
            (Value::Bool(a), Value::Bool(b)) => i64::from(*a).cmp(&i64::from(*b)).into(),
            (Value::String(a), Value::String(b)) => a.cmp(b).into(),
            (Value::Time(a), Value::Time(b)) => a.cmp(b).into(),
            (Value::Duration(a), Value::Duration(b)) => a.cmp(b).into(),
            _ => Ordering::Unknown,
        }
    }

    /// True iff the value compares equal to any member of the list.
    pub fn in_list(&self, list: &[Value]) -> bool {
        list.iter().any(|x| self.compare(x) == Ordering::Equal)
    }

    /// `low <= self <= high`; all three values must share a variant.
    pub fn between(&self, low: &Value, high: &Value) -> Result<bool> {
        if !(self.same_kind(low) && low.same_kind(high)) {
            return Err(Error::unavailable_msg(
                "Between",
                &[self, low, high],
                "type conflict",
            ));
        }
        Ok(matches!(self.compare(low), Ordering::Equal | Ordering::Greater)
            && matches!(self.compare(high), Ordering::Equal | Ordering::Less))
    }

    /// Smallest of self and the rest; any incomparable pair yields Null.
    pub fn least(&self, rest: &[Value]) -> Value {
        let mut smallest = self;
        for x in rest {
            match x.compare(smallest) {
                Ordering::Less => smallest = x,
                Ordering::Unknown => return Value::Null,
                _ => {}
            }
        }
        smallest.clone()
    }

    /// Largest of self and the rest; any incomparable pair yields Null.
    pub fn greatest(&self, rest: &[Value]) -> Value {
        let mut largest = self;
        for x in rest {
            match x.compare(largest) {
                Ordering::Greater => largest = x,
                Ordering::Unknown => return Value::Null,
                _ => {}
            }
        }
        largest.clone()
    }

    /// First non-Null of self and the rest.
    pub fn coalesce(&self, rest: &[Value]) -> Value {
        if !self.is_null() {
            return self.clone();
        }
        rest.iter().find(|x| !x.is_null()).cloned().unwrap_or(Value::Null)
    }
}

fn compare_floats(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).map(Into::into).unwrap_or(Ordering::Unknown)
}
