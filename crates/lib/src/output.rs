use std::io::Write;

use ndql_lib_core::{Key, Node};

/// Rewrite qualified storage keys to their dotted display form; `raw` skips
/// the rewrite.
pub fn display_node(node: &Node, raw: bool) -> Node {
    if raw {
        return node.clone();
    }
    node.iter()
        .map(|(stored, value)| (Key::from_storage(stored).name(), value.clone()))
        .collect()
}

/// Emit one row as a JSON line.
pub fn write_node(out: &mut dyn Write, node: &Node, raw: bool) -> std::io::Result<()> {
    writeln!(out, "{}", display_node(node, raw).to_json_string())
}

#[cfg(test)]
mod tests {
    use ndql_lib_core::Value;

    use super::*;

    fn sample() -> Node {
        let mut n = Node::new();
        n.set("k1", Value::Int(1));
        n.set("t1___k2", Value::Int(2));
        n
    }

    #[test]
    fn test_display_node_rewrites_qualified_keys() {
        let shown = display_node(&sample(), false);
        assert_eq!(shown.get("k1"), Some(&Value::Int(1)));
        assert_eq!(shown.get("t1.k2"), Some(&Value::Int(2)));
        assert_eq!(shown.get("t1___k2"), None);
    }

    #[test]
    fn test_display_node_raw() {
        let shown = display_node(&sample(), true);
        assert_eq!(shown.get("t1___k2"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_write_node() {
        let mut out = Vec::new();
        write_node(&mut out, &sample(), false).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"k1\":1,\"t1.k2\":2}\n"
        );
    }
}
