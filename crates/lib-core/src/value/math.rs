use crate::errors::{Error, Result};
use crate::value::Value;

impl Value {
    pub fn abs(&self) -> Result<Value> {
        self.unary_math("abs", f64::abs)
    }

    pub fn sqrt(&self) -> Result<Value> {
        self.unary_math("sqrt", f64::sqrt)
    }

    pub fn degrees(&self) -> Result<Value> {
        self.unary_math("degrees", f64::to_degrees)
    }

    pub fn radians(&self) -> Result<Value> {
        self.unary_math("radians", f64::to_radians)
    }

    pub fn acos(&self) -> Result<Value> {
        self.unary_math("acos", f64::acos)
    }

    pub fn asin(&self) -> Result<Value> {
        self.unary_math("asin", f64::asin)
    }

    pub fn atan(&self) -> Result<Value> {
        self.unary_math("atan", f64::atan)
    }

    pub fn cos(&self) -> Result<Value> {
        self.unary_math("cos", f64::cos)
    }

    pub fn sin(&self) -> Result<Value> {
        self.unary_math("sin", f64::sin)
    }

    pub fn tan(&self) -> Result<Value> {
        self.unary_math("tan", f64::tan)
    }

    pub fn cot(&self) -> Result<Value> {
        self.unary_math("cot", |x| {
            let t = x.tan();
            if t.is_nan() || t == 0.0 {
                f64::NAN
            } else {
                1.0 / t
            }
        })
    }

    pub fn ln(&self) -> Result<Value> {
        self.unary_math("ln", f64::ln)
    }

    pub fn log2(&self) -> Result<Value> {
        self.unary_math("log2", f64::log2)
    }

    pub fn log10(&self) -> Result<Value> {
        self.unary_math("log10", f64::log10)
    }

    pub fn exp(&self) -> Result<Value> {
        self.unary_math("exp", f64::exp)
    }

    pub fn ceil(&self) -> Result<Value> {
        self.unary_math("ceil", f64::ceil)
    }

    pub fn floor(&self) -> Result<Value> {
        self.unary_math("floor", f64::floor)
    }

    pub fn round(&self) -> Result<Value> {
        self.unary_math("round", f64::round)
    }

    pub fn atan2(&self, other: &Value) -> Result<Value> {
        self.binary_math("atan2", other, f64::atan2)
    }

    pub fn pow(&self, other: &Value) -> Result<Value> {
        self.binary_math("pow", other, f64::powf)
    }

    fn number(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Non-finite results on well-typed input become Null with a warning;
    /// non-numeric input is `Unavailable`.
    fn unary_math(&self, name: &str, f: impl Fn(f64) -> f64) -> Result<Value> {
        let x = self
            .number()
            .ok_or_else(|| Error::unavailable_msg(name, &[self], "invalid argument"))?;
        let y = f(x);
        if y.is_finite() {
            return Ok(Value::Float(y));
        }
        log::warn!("math func {name}: invalid argument {x}, returned NULL");
        Ok(Value::Null)
    }

    fn binary_math(&self, name: &str, other: &Value, f: impl Fn(f64, f64) -> f64) -> Result<Value> {
        let x = self
            .number()
            .ok_or_else(|| Error::unavailable_msg(name, &[self, other], "invalid argument left"))?;
        let y = other
            .number()
            .ok_or_else(|| Error::unavailable_msg(name, &[self, other], "invalid argument right"))?;
        let z = f(x, y);
        if z.is_finite() {
            return Ok(Value::Float(z));
        }
        log::warn!("math func {name}: invalid arguments {x}, {y}, returned NULL");
        Ok(Value::Null)
    }
}

/// Euler's number.
pub fn e() -> Value {
    Value::Float(std::f64::consts::E)
}

pub fn pi() -> Value {
    Value::Float(std::f64::consts::PI)
}

/// Uniform in [0, 1).
pub fn random() -> Value {
    Value::Float(rand::random::<f64>())
}
