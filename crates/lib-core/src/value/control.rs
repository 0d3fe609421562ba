use crate::errors::{Error, Result};
use crate::value::compare::Ordering;
use crate::value::Value;

impl Value {
    /// `if(cond, then, else)`: the condition must coerce to Bool true to pick
    /// the first branch.
    pub fn if_then(&self, then: &Value, otherwise: &Value) -> Value {
        if self.is_true() {
            then.clone()
        } else {
            otherwise.clone()
        }
    }

    pub fn if_null(&self, fallback: &Value) -> Value {
        if self.is_null() {
            fallback.clone()
        } else {
            self.clone()
        }
    }

    /// Null when self compares equal to other, self otherwise.
    pub fn null_if(&self, other: &Value) -> Value {
        match self.compare(other) {
            Ordering::Equal => Value::Null,
            _ => self.clone(),
        }
    }

    /// Environment variable lookup; an unset or empty variable falls back.
    pub fn env_or(&self, fallback: &Value) -> Result<Value> {
        match self {
            Value::String(name) => match std::env::var(name) {
                Ok(v) if !v.is_empty() => Ok(Value::String(v)),
                _ => Ok(fallback.clone()),
            },
            _ => Err(Error::unavailable("EnvOr", &[self, fallback])),
        }
    }

    /// Environment variable lookup; unset or empty is Null.
    pub fn env(&self) -> Result<Value> {
        self.env_or(&Value::Null)
            .map_err(|err| Error::unavailable_msg("Env", &[self], err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_if_then() {
        assert_eq!(Value::Bool(true).if_then(&Value::Int(1), &Value::Int(2)), Value::Int(1));
        assert_eq!(Value::Bool(false).if_then(&Value::Int(1), &Value::Int(2)), Value::Int(2));
        assert_eq!(Value::Int(5).if_then(&Value::Int(1), &Value::Int(2)), Value::Int(1));
        // a non-coercible condition picks the else branch
        assert_eq!(Value::Null.if_then(&Value::Int(1), &Value::Int(2)), Value::Int(2));
    }

    #[test]
    fn test_if_null() {
        assert_eq!(Value::Null.if_null(&Value::Int(1)), Value::Int(1));
        assert_eq!(Value::Int(0).if_null(&Value::Int(1)), Value::Int(0));
    }

    #[test]
    fn test_null_if() {
        assert_eq!(Value::Int(1).null_if(&Value::Int(1)), Value::Null);
        assert_eq!(Value::Int(0).null_if(&Value::Int(1)), Value::Int(0));
        assert_eq!(Value::Int(0).null_if(&Value::String("0".into())), Value::Int(0));
    }

    #[test]
    fn test_env() {
        std::env::set_var("NDQL_CONTROL_TEST", "v1");
        assert_eq!(
            Value::String("NDQL_CONTROL_TEST".into()).env().unwrap(),
            Value::String("v1".into())
        );
        assert_eq!(
            Value::String("NDQL_CONTROL_TEST_MISSING".into()).env().unwrap(),
            Value::Null
        );
        assert_eq!(
            Value::String("NDQL_CONTROL_TEST_MISSING".into())
                .env_or(&Value::Int(7))
                .unwrap(),
            Value::Int(7)
        );
        assert!(Value::Int(1).env().is_err());
    }
}
