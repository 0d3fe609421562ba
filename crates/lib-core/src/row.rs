use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::errors::{Error, Result};
use crate::value::Value;

pub const KEY_PATH: &str = "path";
pub const KEY_SIZE: &str = "size";
pub const KEY_IS_DIR: &str = "is_dir";
pub const KEY_MOD_TIME: &str = "mod_time";
pub const KEY_MODE: &str = "mode";

/// The columns every filesystem row carries.
pub const BUILTIN_KEYS: [&str; 5] = [KEY_PATH, KEY_SIZE, KEY_IS_DIR, KEY_MOD_TIME, KEY_MODE];

pub fn is_builtin_key(key: &str) -> bool {
    BUILTIN_KEYS.contains(&key)
}

/// A row: an insertion-ordered mapping from storage-form keys to values.
///
/// Rows are mutated while a stream stage builds them and treated as
/// immutable once emitted downstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    entries: IndexMap<String, Value>,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn delete(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    /// Copy every entry of `other` into self; last write wins.
    pub fn merge(&mut self, other: &Node) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry in insertion order, if any.
    pub fn first(&self) -> Option<(&str, &Value)> {
        self.entries.first().map(|(k, v)| (k.as_str(), v))
    }

    /// Check that the five built-in keys are present with their variants.
    pub fn validate(&self) -> Result<()> {
        for key in BUILTIN_KEYS {
            if self.get(key).is_none() {
                return Err(Error::InvalidValue(format!("invalid node: no {key}")));
            }
        }
        let ok = self.get(KEY_PATH).map(|v| v.string().is_some()) == Some(true)
            && self.get(KEY_SIZE).map(|v| v.int().is_some()) == Some(true)
            && self.get(KEY_IS_DIR).map(|v| v.bool().is_some()) == Some(true)
            && self.get(KEY_MOD_TIME).map(|v| v.time().is_some()) == Some(true)
            && self.get(KEY_MODE).map(|v| v.string().is_some()) == Some(true);
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidValue("invalid node: builtin key type".into()))
        }
    }

    // typed accessors for validated rows

    pub fn path(&self) -> Option<&str> {
        self.get(KEY_PATH).and_then(Value::string)
    }

    pub fn size(&self) -> Option<i64> {
        self.get(KEY_SIZE).and_then(Value::int)
    }

    pub fn is_dir(&self) -> Option<bool> {
        self.get(KEY_IS_DIR).and_then(Value::bool)
    }

    pub fn mod_time(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.get(KEY_MOD_TIME).and_then(Value::time)
    }

    pub fn mode(&self) -> Option<&str> {
        self.get(KEY_MODE).and_then(Value::string)
    }

    //
    // JSON codec
    //

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).expect("row serialization is infallible")
    }

    /// Parse one JSON object; member values follow the scalar decode order
    /// of [`Value::from_json`].
    pub fn parse_json(line: &str) -> Result<Node> {
        let raw: serde_json::Value = serde_json::from_str(line)
            .map_err(|err| Error::InvalidValue(format!("not a JSON object: {err}")))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &serde_json::Value) -> Result<Node> {
        let serde_json::Value::Object(members) = raw else {
            return Err(Error::InvalidValue(format!("not a JSON object: {raw}")));
        };
        let mut node = Node::new();
        for (k, v) in members {
            node.set(k.clone(), Value::from_json(v)?);
        }
        Ok(node)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl FromIterator<(String, Value)> for Node {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self::from_entries(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::from_entries([
            (KEY_PATH.to_string(), Value::String("a/b.go".into())),
            (KEY_SIZE.to_string(), Value::Int(10)),
            (KEY_IS_DIR.to_string(), Value::Bool(false)),
            (
                KEY_MOD_TIME.to_string(),
                Value::String("2023-04-05 06:07:08".into()).as_time().unwrap(),
            ),
            (KEY_MODE.to_string(), Value::String("-rw-r--r--".into())),
        ])
    }

    #[test]
    fn test_get_set_delete() {
        let mut n = Node::new();
        n.set("k1", Value::Int(1));
        n.set("k1", Value::Int(2));
        assert_eq!(n.get("k1"), Some(&Value::Int(2)));
        assert_eq!(n.delete("k1"), Some(Value::Int(2)));
        assert!(n.is_empty());
    }

    #[test]
    fn test_merge_last_write_wins() {
        let mut a = Node::from_entries([
            ("k1".to_string(), Value::Int(1)),
            ("k2".to_string(), Value::Int(2)),
        ]);
        let b = Node::from_entries([
            ("k2".to_string(), Value::Int(20)),
            ("k3".to_string(), Value::Int(3)),
        ]);
        a.merge(&b);
        assert_eq!(a.get("k2"), Some(&Value::Int(20)));
        assert_eq!(a.get("k3"), Some(&Value::Int(3)));
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn test_validate() {
        assert!(sample().validate().is_ok());

        let mut missing = sample();
        missing.delete(KEY_SIZE);
        assert!(missing.validate().is_err());

        let mut wrong = sample();
        wrong.set(KEY_SIZE, Value::String("10".into()));
        assert!(wrong.validate().is_err());
    }

    #[test]
    fn test_typed_accessors() {
        let n = sample();
        assert_eq!(n.path(), Some("a/b.go"));
        assert_eq!(n.size(), Some(10));
        assert_eq!(n.is_dir(), Some(false));
        assert_eq!(n.mode(), Some("-rw-r--r--"));
        assert!(n.mod_time().is_some());
    }

    #[test]
    fn test_json_round_trip() {
        let n = sample();
        let parsed = Node::parse_json(&n.to_json_string()).unwrap();
        assert_eq!(parsed, n);
    }

    #[test]
    fn test_json_preserves_key_order() {
        let mut n = Node::new();
        n.set("z", Value::Int(1));
        n.set("a", Value::Int(2));
        assert_eq!(n.to_json_string(), r#"{"z":1,"a":2}"#);
    }

    #[test]
    fn test_parse_json_rejects_non_objects() {
        assert!(Node::parse_json("[1]").is_err());
        assert!(Node::parse_json("not json").is_err());
        assert!(Node::parse_json(r#"{"k":[1]}"#).is_err());
    }
}
