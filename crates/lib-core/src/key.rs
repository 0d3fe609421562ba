use crate::row::Node;
use crate::value::Value;

/// Separator of the storage form of a qualified key (`table___column`).
pub const TABLE_KEY_SEPARATOR: &str = "___";

/// The distinguished key that carries an unnamed expression result between
/// evaluator stages.
pub const NODE_VALUE_KEY: &str = "___value___";

/// A column reference, optionally qualified by a table name.
///
/// Storage form joins with [`TABLE_KEY_SEPARATOR`] so that lookups never have
/// to parse dotted identifiers embedded in user data; the display form uses
/// a dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub table: String,
    pub column: String,
}

impl Key {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Parse the storage form (`table___column` or bare `column`).
    pub fn from_storage(s: &str) -> Self {
        match s.split_once(TABLE_KEY_SEPARATOR) {
            Some((table, column)) => Self::new(table, column),
            None => Self::new("", s),
        }
    }

    /// Parse the display form (`table.column` or bare `column`).
    pub fn from_name(s: &str) -> Self {
        match s.split_once('.') {
            Some((table, column)) => Self::new(table, column),
            None => Self::new("", s),
        }
    }

    pub fn storage(&self) -> String {
        if self.table.is_empty() {
            self.column.clone()
        } else {
            format!("{}{}{}", self.table, TABLE_KEY_SEPARATOR, self.column)
        }
    }

    pub fn name(&self) -> String {
        if self.table.is_empty() {
            self.column.clone()
        } else {
            format!("{}.{}", self.table, self.column)
        }
    }

    /// Look the key up in a row.
    ///
    /// A qualified key must match exactly. A bare key first matches any
    /// qualified key with the same column, then the bare key itself. On a
    /// hit the single found entry is returned under its found name.
    pub fn lookup(&self, node: &Node) -> Option<(String, Value)> {
        if !self.table.is_empty() {
            let storage = self.storage();
            return node.get(&storage).map(|v| (storage, v.clone()));
        }
        for stored in node.keys() {
            let candidate = Key::from_storage(stored);
            if candidate.table.is_empty() {
                continue;
            }
            if candidate.column == self.column {
                let value = node.get(stored).cloned();
                return value.map(|v| (stored.to_string(), v));
            }
        }
        node.get(&self.column).map(|v| (self.column.clone(), v.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forms_round_trip() {
        let k = Key::new("t1", "k1");
        assert_eq!(k.storage(), "t1___k1");
        assert_eq!(k.name(), "t1.k1");
        assert_eq!(Key::from_storage("t1___k1"), k);
        assert_eq!(Key::from_name("t1.k1"), k);

        let bare = Key::new("", "k1");
        assert_eq!(bare.storage(), "k1");
        assert_eq!(bare.name(), "k1");
        assert_eq!(Key::from_storage("k1"), bare);
        assert_eq!(Key::from_name("k1"), bare);
    }

    #[test]
    fn test_lookup_qualified() {
        let mut n = Node::new();
        n.set("t1___k1", Value::Int(1));
        n.set("k1", Value::Int(2));

        assert_eq!(
            Key::new("t1", "k1").lookup(&n),
            Some(("t1___k1".to_string(), Value::Int(1)))
        );
        assert_eq!(Key::new("t2", "k1").lookup(&n), None);
    }

    #[test]
    fn test_lookup_bare_prefers_qualified() {
        let mut n = Node::new();
        n.set("t1___k1", Value::Int(1));
        n.set("k1", Value::Int(2));

        assert_eq!(
            Key::new("", "k1").lookup(&n),
            Some(("t1___k1".to_string(), Value::Int(1)))
        );
    }

    #[test]
    fn test_lookup_bare_fallback() {
        let mut n = Node::new();
        n.set("k1", Value::Int(2));
        n.set("t1___k2", Value::Int(3));

        assert_eq!(
            Key::new("", "k1").lookup(&n),
            Some(("k1".to_string(), Value::Int(2)))
        );
        assert_eq!(Key::new("", "k3").lookup(&n), None);
    }
}
