use std::io::BufRead;
use std::path::Path;

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use ndql_lib_core::row::{KEY_IS_DIR, KEY_MODE, KEY_MOD_TIME, KEY_PATH, KEY_SIZE};
use ndql_lib_core::{Node, Value};

/// Walk a directory tree, yielding one row per entry with the five built-in
/// columns. Unreadable entries are logged and skipped.
pub fn walk_dir(root: impl AsRef<Path>) -> impl Iterator<Item = Node> {
    WalkDir::new(root).into_iter().filter_map(|entry| {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("walk: {err}");
                return None;
            }
        };
        let path = entry.path().to_string_lossy().to_string();
        match entry.metadata() {
            Ok(metadata) => Some(node_from_metadata(path, &metadata)),
            Err(err) => {
                log::warn!("walk {path}: {err}");
                None
            }
        }
    })
}

/// Treat each line of the reader as a path and `stat` it; on failure the
/// metadata columns stay zero-valued.
pub fn walk_reader(reader: impl BufRead) -> impl Iterator<Item = Node> {
    reader.lines().filter_map(|line| {
        let path = match line {
            Ok(line) => line,
            Err(err) => {
                log::warn!("walk reader: {err}");
                return None;
            }
        };
        match std::fs::metadata(&path) {
            Ok(metadata) => Some(node_from_metadata(path, &metadata)),
            Err(_) => Some(node_from_parts(path, 0, false, DateTime::UNIX_EPOCH, "----------".to_string())),
        }
    })
}

/// Read newline-delimited JSON objects as rows; invalid lines are logged
/// and skipped. With `validate`, rows missing the built-in columns are
/// dropped too.
pub fn read_json_rows(reader: impl BufRead, validate: bool) -> impl Iterator<Item = Node> {
    reader.lines().filter_map(move |line| {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                log::warn!("read input: {err}");
                return None;
            }
        };
        if line.trim().is_empty() {
            return None;
        }
        let node = match Node::parse_json(&line) {
            Ok(node) => node,
            Err(err) => {
                log::warn!("failed to unmarshal input {line:?}: {err}");
                return None;
            }
        };
        if validate {
            if let Err(err) = node.validate() {
                log::warn!("invalid input {line:?}: {err}");
                return None;
            }
        }
        Some(node)
    })
}

fn node_from_metadata(path: String, metadata: &std::fs::Metadata) -> Node {
    let mod_time = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or(DateTime::UNIX_EPOCH);
    node_from_parts(
        path,
        metadata.len() as i64,
        metadata.is_dir(),
        mod_time,
        mode_string(metadata),
    )
}

fn node_from_parts(
    path: String,
    size: i64,
    is_dir: bool,
    mod_time: DateTime<Utc>,
    mode: String,
) -> Node {
    Node::from_entries([
        (KEY_PATH.to_string(), Value::String(path)),
        (KEY_SIZE.to_string(), Value::Int(size)),
        (KEY_IS_DIR.to_string(), Value::Bool(is_dir)),
        (KEY_MOD_TIME.to_string(), Value::Time(mod_time)),
        (KEY_MODE.to_string(), Value::String(mode)),
    ])
}

/// Unix-style mode string (`drwxr-xr-x`).
#[cfg(unix)]
fn mode_string(metadata: &std::fs::Metadata) -> String {
    use std::os::unix::fs::MetadataExt;
    let mode = metadata.mode();
    let kind = if metadata.is_dir() {
        'd'
    } else if metadata.file_type().is_symlink() {
        'L'
    } else {
        '-'
    };
    let mut out = String::with_capacity(10);
    out.push(kind);
    for shift in [6u32, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

#[cfg(not(unix))]
fn mode_string(metadata: &std::fs::Metadata) -> String {
    let kind = if metadata.is_dir() { 'd' } else { '-' };
    let write = if metadata.permissions().readonly() { '-' } else { 'w' };
    format!("{kind}r{write}xr{write}xr{write}x")
}
