use sha2::{Digest, Sha256};

use crate::cache;
use crate::errors::{Error, Result};
use crate::like;
use crate::value::Value;

/// Default length cap of `substr` when no length argument is given.
const SUBSTR_MAX_LENGTH: i64 = 2048;

impl Value {
    /// Character count.
    pub fn len(&self) -> Result<Value> {
        match self {
            Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
            _ => Err(Error::unavailable("Len", &[self])),
        }
    }

    /// Byte count.
    pub fn size(&self) -> Result<Value> {
        match self {
            Value::String(s) => Ok(Value::Int(s.len() as i64)),
            _ => Err(Error::unavailable("Size", &[self])),
        }
    }

    /// MySQL LIKE with escape `|`; unanchored.
    pub fn like(&self, pattern: &Value) -> Result<Value> {
        match (self, pattern) {
            (Value::String(s), Value::String(p)) => {
                let re = cache::regex(&like::like_to_regex_default(p))
                    .map_err(|err| Error::unavailable_msg("Like", &[self, pattern], err.to_string()))?;
                Ok(Value::Bool(re.is_match(s)))
            }
            _ => Err(Error::unavailable("Like", &[self, pattern])),
        }
    }

    pub fn regexp(&self, pattern: &Value) -> Result<Value> {
        match (self, pattern) {
            (Value::String(s), Value::String(p)) => {
                let re = cache::regex(p)
                    .map_err(|err| Error::unavailable_msg("Regexp", &[self, pattern], err.to_string()))?;
                Ok(Value::Bool(re.is_match(s)))
            }
            _ => Err(Error::unavailable("Regexp", &[self, pattern])),
        }
    }

    pub fn regexp_count(&self, pattern: &Value) -> Result<Value> {
        match (self, pattern) {
            (Value::String(s), Value::String(p)) => {
                let re = cache::regex(p).map_err(|err| {
                    Error::unavailable_msg("RegexpCount", &[self, pattern], err.to_string())
                })?;
                Ok(Value::Int(re.find_iter(s).count() as i64))
            }
            _ => Err(Error::unavailable("RegexpCount", &[self, pattern])),
        }
    }

    /// 1-based byte offset of the first match; 0 when there is none.
    pub fn regexp_instr(&self, pattern: &Value) -> Result<Value> {
        match (self, pattern) {
            (Value::String(s), Value::String(p)) => {
                let re = cache::regex(p).map_err(|err| {
                    Error::unavailable_msg("RegexpInstr", &[self, pattern], err.to_string())
                })?;
                Ok(Value::Int(
                    re.find(s).map(|m| m.start() as i64 + 1).unwrap_or(0),
                ))
            }
            _ => Err(Error::unavailable("RegexpInstr", &[self, pattern])),
        }
    }

    /// Text of the first match; empty when there is none.
    pub fn regexp_substr(&self, pattern: &Value) -> Result<Value> {
        match (self, pattern) {
            (Value::String(s), Value::String(p)) => {
                let re = cache::regex(p).map_err(|err| {
                    Error::unavailable_msg("RegexpSubstr", &[self, pattern], err.to_string())
                })?;
                Ok(Value::String(
                    re.find(s).map(|m| m.as_str().to_string()).unwrap_or_default(),
                ))
            }
            _ => Err(Error::unavailable("RegexpSubstr", &[self, pattern])),
        }
    }

    pub fn regexp_replace(&self, pattern: &Value, replacement: &Value) -> Result<Value> {
        let args: &[&Value] = &[self, pattern, replacement];
        let Value::String(s) = self else {
            return Err(Error::unavailable("RegexpReplace", args));
        };
        let Value::String(p) = pattern else {
            return Err(Error::unavailable_msg("RegexpReplace", args, "no expr"));
        };
        let Value::String(r) = replacement else {
            return Err(Error::unavailable_msg("RegexpReplace", args, "no repl"));
        };
        let re = cache::regex(p)
            .map_err(|err| Error::unavailable_msg("RegexpReplace", args, err.to_string()))?;
        Ok(Value::String(re.replace_all(s, r.as_str()).into_owned()))
    }

    /// printf-style formatting: `%v %s %d %f %x %%`; anything else passes
    /// through untouched, as do surplus directives.
    pub fn format(&self, args: &[Value]) -> Result<Value> {
        let Value::String(spec) = self else {
            let mut all: Vec<&Value> = vec![self];
            all.extend(args);
            return Err(Error::unavailable("Format", &all));
        };
        let mut out = String::with_capacity(spec.len());
        let mut next = args.iter();
        let mut chars = spec.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.peek().copied() {
                Some('%') => {
                    chars.next();
                    out.push('%');
                }
                Some(d @ ('v' | 's' | 'd' | 'f' | 'x')) => {
                    chars.next();
                    match next.next() {
                        Some(arg) => out.push_str(&format_directive(d, arg)),
                        None => {
                            out.push('%');
                            out.push(d);
                        }
                    }
                }
                _ => out.push('%'),
            }
        }
        Ok(Value::String(out))
    }

    pub fn lower(&self) -> Result<Value> {
        match self {
            Value::String(s) => Ok(Value::String(s.to_lowercase())),
            _ => Err(Error::unavailable("Lower", &[self])),
        }
    }

    pub fn upper(&self) -> Result<Value> {
        match self {
            Value::String(s) => Ok(Value::String(s.to_uppercase())),
            _ => Err(Error::unavailable("Upper", &[self])),
        }
    }

    /// Hex SHA-256 of the string.
    pub fn sha2(&self) -> Result<Value> {
        match self {
            Value::String(s) => {
                let digest = Sha256::digest(s.as_bytes());
                Ok(Value::String(format!("{digest:x}")))
            }
            _ => Err(Error::unavailable("Sha2", &[self])),
        }
    }

    /// Join the arguments with self as separator; every argument must
    /// already be a String.
    pub fn concat_ws(&self, args: &[Value]) -> Result<Value> {
        let Value::String(sep) = self else {
            let mut all: Vec<&Value> = vec![self];
            all.extend(args);
            return Err(Error::unavailable("ConcatWs", &all));
        };
        let mut parts = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let Value::String(s) = arg else {
                let mut all: Vec<&Value> = vec![self];
                all.extend(args);
                return Err(Error::unavailable_msg(
                    "ConcatWs",
                    &all,
                    format!("arg[{i}] is not a string"),
                ));
            };
            parts.push(s.as_str());
        }
        Ok(Value::String(parts.join(sep)))
    }

    /// 1-based byte offset of the first occurrence; 0 when absent.
    pub fn instr(&self, needle: &Value) -> Result<Value> {
        match (self, needle) {
            (Value::String(s), Value::String(n)) => {
                Ok(Value::Int(s.find(n.as_str()).map(|i| i as i64 + 1).unwrap_or(0)))
            }
            _ => Err(Error::unavailable("Instr", &[self, needle])),
        }
    }

    pub fn instr_count(&self, needle: &Value) -> Result<Value> {
        match (self, needle) {
            (Value::String(s), Value::String(n)) => {
                if n.is_empty() {
                    return Ok(Value::Int(s.chars().count() as i64 + 1));
                }
                Ok(Value::Int(s.matches(n.as_str()).count() as i64))
            }
            _ => Err(Error::unavailable("InstrCount", &[self, needle])),
        }
    }

    /// 1-based substring; a negative position counts from the end; the
    /// default length is 2048; out-of-range indices clamp.
    pub fn substr(&self, args: &[Value]) -> Result<Value> {
        let all = || {
            let mut v: Vec<&Value> = vec![self];
            v.extend(args);
            v
        };
        let Value::String(s) = self else {
            return Err(Error::unavailable("Substr", &all()));
        };
        if args.is_empty() || args.len() > 2 {
            return Err(Error::unavailable_msg("Substr", &all(), "arg len is not in [2, 3]"));
        }
        let Some(mut pos) = args[0].int() else {
            return Err(Error::unavailable_msg("Substr", &all(), "arg[1] should be Int"));
        };
        let length = match args.get(1) {
            None => SUBSTR_MAX_LENGTH,
            Some(v) => v
                .int()
                .ok_or_else(|| Error::unavailable_msg("Substr", &all(), "arg[2] should be Int"))?,
        };

        let chars: Vec<char> = s.chars().collect();
        let total = chars.len() as i64;
        let from_end = pos < 0;
        while pos < 0 {
            pos += total;
        }
        if pos == 0 {
            if from_end {
                return Ok(self.clone());
            }
            if length < 1 {
                return Ok(Value::String(String::new()));
            }
        }
        let mut start = pos - 1;
        if from_end {
            start += 1;
        }
        let start = start.clamp(0, total) as usize;
        let end = (start as i64 + length.max(0)).clamp(start as i64, total) as usize;
        Ok(Value::String(chars[start..end].iter().collect()))
    }

    /// Leading (positive count) or trailing (negative count) delimited
    /// parts, clamped to the number of parts.
    pub fn substr_index(&self, delim: &Value, count: &Value) -> Result<Value> {
        let args: &[&Value] = &[self, delim, count];
        let Value::String(s) = self else {
            return Err(Error::unavailable("SubstrIndex", args));
        };
        let Value::String(d) = delim else {
            return Err(Error::unavailable_msg("SubstrIndex", args, "delim should be String"));
        };
        let Some(n) = count.int() else {
            return Err(Error::unavailable_msg("SubstrIndex", args, "count should be Int"));
        };
        let mut parts: Vec<&str> = s.split(d.as_str()).collect();
        if n < 0 {
            parts.reverse();
        }
        let keep = (n.unsigned_abs() as usize).min(parts.len());
        let mut kept = parts[..keep].to_vec();
        if n < 0 {
            kept.reverse();
        }
        Ok(Value::String(kept.join(d)))
    }

    pub fn replace(&self, from: &Value, to: &Value) -> Result<Value> {
        let args: &[&Value] = &[self, from, to];
        let Value::String(s) = self else {
            return Err(Error::unavailable("Replace", args));
        };
        let Value::String(f) = from else {
            return Err(Error::unavailable_msg("Replace", args, "from should be String"));
        };
        let Value::String(t) = to else {
            return Err(Error::unavailable_msg("Replace", args, "to should be String"));
        };
        Ok(Value::String(s.replace(f.as_str(), t)))
    }

    /// No argument trims whitespace; one argument trims that character set.
    pub fn trim(&self, args: &[Value]) -> Result<Value> {
        let all = || {
            let mut v: Vec<&Value> = vec![self];
            v.extend(args);
            v
        };
        let Value::String(s) = self else {
            return Err(Error::unavailable("Trim", &all()));
        };
        match args {
            [] => Ok(Value::String(s.trim().to_string())),
            [Value::String(set)] => {
                let set: Vec<char> = set.chars().collect();
                Ok(Value::String(s.trim_matches(|c| set.contains(&c)).to_string()))
            }
            [_] => Err(Error::unavailable_msg("Trim", &all(), "arg[1] should be String")),
            _ => Err(Error::unavailable("Trim", &all())),
        }
    }
}

fn format_directive(directive: char, arg: &Value) -> String {
    let plain = || match arg.as_string() {
        Ok(Value::String(s)) => s,
        _ => arg.display(),
    };
    match directive {
        'd' => match arg.as_int() {
            Ok(Value::Int(v)) => v.to_string(),
            _ => plain(),
        },
        'f' => match arg.as_float() {
            Ok(Value::Float(v)) => format!("{v:.6}"),
            _ => plain(),
        },
        'x' => match arg.int() {
            Some(v) => format!("{v:x}"),
            None => plain(),
        },
        _ => plain(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::String(v.to_string())
    }

    #[test]
    fn test_len_size() {
        assert_eq!(s("héllo").len().unwrap(), Value::Int(5));
        assert_eq!(s("héllo").size().unwrap(), Value::Int(6));
        assert!(Value::Int(1).len().is_err());
    }

    #[test]
    fn test_like() {
        let tests = [
            ("abc", "a%c", true),
            ("abc", "a_c", true),
            ("abc", "x%", false),
            ("100%", "100|%", true),
            ("a_test.go", "%|_test.go", true),
        ];
        for (input, pattern, want) in tests {
            assert_eq!(
                s(input).like(&s(pattern)).unwrap(),
                Value::Bool(want),
                "{input} LIKE {pattern}"
            );
        }
        assert!(s("a").like(&Value::Int(1)).is_err());
    }

    #[test]
    fn test_regexp_family() {
        assert_eq!(s("abcabc").regexp(&s("b.")).unwrap(), Value::Bool(true));
        assert_eq!(s("abcabc").regexp_count(&s("b.")).unwrap(), Value::Int(2));
        assert_eq!(s("abcabc").regexp_instr(&s("b.")).unwrap(), Value::Int(2));
        assert_eq!(s("abcabc").regexp_instr(&s("zz")).unwrap(), Value::Int(0));
        assert_eq!(s("abcabc").regexp_substr(&s("b.")).unwrap(), s("bc"));
        assert_eq!(
            s("a1b2").regexp_replace(&s("[0-9]"), &s("#")).unwrap(),
            s("a#b#")
        );
        assert!(s("a").regexp(&s("(")).is_err());
    }

    #[test]
    fn test_format() {
        assert_eq!(
            s("%s=%d (%v)").format(&[s("k"), Value::Int(3), Value::Bool(true)]).unwrap(),
            s("k=3 (true)")
        );
        assert_eq!(s("100%%").format(&[]).unwrap(), s("100%"));
        assert_eq!(s("%x").format(&[Value::Int(255)]).unwrap(), s("ff"));
        assert_eq!(s("%d").format(&[]).unwrap(), s("%d"));
        assert!(Value::Int(1).format(&[]).is_err());
    }

    #[test]
    fn test_case_and_sha2() {
        assert_eq!(s("AbC").lower().unwrap(), s("abc"));
        assert_eq!(s("AbC").upper().unwrap(), s("ABC"));
        assert_eq!(
            s("").sha2().unwrap(),
            s("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
    }

    #[test]
    fn test_concat_ws() {
        assert_eq!(s(",").concat_ws(&[s("a"), s("b")]).unwrap(), s("a,b"));
        assert!(s(",").concat_ws(&[s("a"), Value::Int(1)]).is_err());
    }

    #[test]
    fn test_instr() {
        assert_eq!(s("hello").instr(&s("ll")).unwrap(), Value::Int(3));
        assert_eq!(s("hello").instr(&s("xx")).unwrap(), Value::Int(0));
        assert_eq!(s("aaa").instr_count(&s("aa")).unwrap(), Value::Int(1));
        assert_eq!(s("abab").instr_count(&s("ab")).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_substr() {
        let input = s("str.i.ng");
        assert_eq!(input.substr(&[Value::Int(3), Value::Int(3)]).unwrap(), s("r.i"));
        assert_eq!(input.substr(&[Value::Int(1)]).unwrap(), s("str.i.ng"));
        assert_eq!(input.substr(&[Value::Int(-2)]).unwrap(), s("ng"));
        assert_eq!(input.substr(&[Value::Int(100)]).unwrap(), s(""));
        assert!(input.substr(&[s("x")]).is_err());
        assert!(input.substr(&[]).is_err());
    }

    #[test]
    fn test_substr_index() {
        let input = s("str.i.ng");
        assert_eq!(input.substr_index(&s("."), &Value::Int(2)).unwrap(), s("str.i"));
        assert_eq!(input.substr_index(&s("."), &Value::Int(-2)).unwrap(), s("i.ng"));
        assert_eq!(input.substr_index(&s("."), &Value::Int(10)).unwrap(), s("str.i.ng"));
        assert_eq!(input.substr_index(&s("."), &Value::Int(0)).unwrap(), s(""));
    }

    #[test]
    fn test_replace_trim() {
        assert_eq!(s("a-b-c").replace(&s("-"), &s("+")).unwrap(), s("a+b+c"));
        assert_eq!(s("  pad  ").trim(&[]).unwrap(), s("pad"));
        assert_eq!(s("xxpadxx").trim(&[s("x")]).unwrap(), s("pad"));
        assert!(s("x").trim(&[Value::Int(1)]).is_err());
    }
}
