use std::path::{Component, Path, PathBuf};

use crate::errors::{Error, Result};
use crate::value::Value;

impl Value {
    /// All but the last path element; `"."` when there is none.
    pub fn dir(&self) -> Result<Value> {
        match self {
            Value::String(s) => {
                let p = Path::new(s);
                let parent = p.parent().map(|d| d.to_string_lossy().to_string());
                Ok(Value::String(match parent {
                    Some(d) if !d.is_empty() => d,
                    Some(_) => ".".to_string(),
                    None => s.clone(),
                }))
            }
            _ => Err(Error::unavailable("Dir", &[self])),
        }
    }

    /// The last path element.
    pub fn basename(&self) -> Result<Value> {
        match self {
            Value::String(s) => Ok(Value::String(
                Path::new(s)
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| s.clone()),
            )),
            _ => Err(Error::unavailable("Basename", &[self])),
        }
    }

    /// The extension including its dot, or the empty string.
    pub fn extension(&self) -> Result<Value> {
        match self {
            Value::String(s) => Ok(Value::String(
                Path::new(s)
                    .extension()
                    .map(|e| format!(".{}", e.to_string_lossy()))
                    .unwrap_or_default(),
            )),
            _ => Err(Error::unavailable("Extension", &[self])),
        }
    }

    /// Absolute form of the path, resolved against the working directory
    /// without touching the filesystem.
    pub fn abs_path(&self) -> Result<Value> {
        match self {
            Value::String(s) => std::path::absolute(s)
                .map(|p| Value::String(p.to_string_lossy().to_string()))
                .map_err(|err| Error::unavailable_msg("AbsPath", &[self], err.to_string())),
            _ => Err(Error::unavailable("AbsPath", &[self])),
        }
    }

    /// The path of self relative to `base`, computed lexically.
    pub fn rel_path(&self, base: &Value) -> Result<Value> {
        match (self, base) {
            (Value::String(target), Value::String(base_str)) => {
                let target_abs = std::path::absolute(target)
                    .map_err(|err| Error::unavailable_msg("RelPath", &[self, base], err.to_string()))?;
                let base_abs = std::path::absolute(base_str)
                    .map_err(|err| Error::unavailable_msg("RelPath", &[self, base], err.to_string()))?;
                Ok(Value::String(
                    relative_to(&target_abs, &base_abs).to_string_lossy().to_string(),
                ))
            }
            (Value::String(_), other) => Err(Error::unavailable_msg(
                "RelPath",
                &[self, other],
                "args[1] should be String",
            )),
            _ => Err(Error::unavailable("RelPath", &[self, base])),
        }
    }
}

fn relative_to(target: &Path, base: &Path) -> PathBuf {
    let mut target_parts = target.components().peekable();
    let mut base_parts = base.components().peekable();
    while let (Some(t), Some(b)) = (target_parts.peek(), base_parts.peek()) {
        if t != b {
            break;
        }
        target_parts.next();
        base_parts.next();
    }
    let mut out = PathBuf::new();
    for part in base_parts {
        if !matches!(part, Component::CurDir) {
            out.push("..");
        }
    }
    for part in target_parts {
        out.push(part.as_os_str());
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
