use ndql_lib_core::{Error, Key, Node, Result, Value};

use crate::executor::Cancellation;

mod grep;
mod lua;
mod script;
mod shell;
mod text;

pub use grep::GrepTemplate;
pub use lua::LuaTemplate;
pub use script::ScriptTemplate;
pub use shell::ShellTemplate;
pub use text::TextTemplate;

/// A generator template: produces a textual payload from one row. The
/// payload is parsed by [`parse_payload`] into zero or more new rows.
pub trait GenTemplate: Send + Sync {
    fn generate(&self, cancel: &Cancellation, node: &Node) -> Result<Vec<u8>>;
}

/// Run a template against a parent row and merge every generated row into a
/// clone of the parent; generated keys override parent keys.
pub fn generate_rows(
    template: &dyn GenTemplate,
    cancel: &Cancellation,
    parent: &Node,
) -> Result<Vec<Node>> {
    let payload = template.generate(cancel, parent)?;
    let generated = parse_payload(&payload)?;
    Ok(generated
        .into_iter()
        .map(|update| {
            let mut merged = parent.clone();
            merged.merge(&update);
            merged
        })
        .collect())
}

/// Parse a generated payload. The first byte picks the shape: `[` a JSON
/// array of objects, `{` a single JSON object, anything else "equal-pair"
/// lines (`k=v,k=v` per line, values are Strings).
pub fn parse_payload(payload: &[u8]) -> Result<Vec<Node>> {
    match payload.first() {
        Some(b'[') => {
            let raw: Vec<serde_json::Value> = serde_json::from_slice(payload)
                .map_err(|err| Error::ParseGenResult(err.to_string()))?;
            raw.iter()
                .map(|v| Node::from_json(v).map_err(|err| Error::ParseGenResult(err.to_string())))
                .collect()
        }
        Some(b'{') => {
            let raw: serde_json::Value = serde_json::from_slice(payload)
                .map_err(|err| Error::ParseGenResult(err.to_string()))?;
            let node =
                Node::from_json(&raw).map_err(|err| Error::ParseGenResult(err.to_string()))?;
            Ok(vec![node])
        }
        _ => {
            let text = String::from_utf8_lossy(payload);
            Ok(parse_equal_pairs(&text))
        }
    }
}

fn parse_equal_pairs(text: &str) -> Vec<Node> {
    text.lines()
        .map(|line| {
            let mut node = Node::new();
            for pair in line.split(',') {
                if let Some((k, v)) = pair.split_once('=') {
                    node.set(k, Value::String(v.to_string()));
                }
            }
            node
        })
        .collect()
}

/// Present a row as a nested JSON object: qualified keys become submaps
/// (`a___b` turns into `{"a":{"b":…}}`).
pub fn node_as_structured_json(node: &Node) -> serde_json::Map<String, serde_json::Value> {
    let mut out = serde_json::Map::new();
    for (stored, value) in node.iter() {
        let key = Key::from_storage(stored);
        let json = value.to_json();
        if key.table.is_empty() {
            out.insert(stored.to_string(), json);
            continue;
        }
        match out
            .entry(key.table.clone())
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()))
        {
            serde_json::Value::Object(sub) => {
                sub.insert(key.column, json);
            }
            // a bare key already claimed the table name; leave it alone
            _ => {}
        }
    }
    out
}

/// Environment lookup with a fallback for unset or empty variables.
pub(crate) fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}

/// Resolve `@FILE` bodies: a leading `@` loads the script from the file,
/// anything else is the script itself.
pub fn load_body(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|err| Error::InvalidArgument(format!("cannot read {path}: {err}"))),
        None => Ok(arg.to_string()),
    }
}
