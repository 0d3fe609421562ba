use std::sync::{Arc, OnceLock};

use ndql_lib_core::cache::{self, Cache};
use ndql_lib_core::{Error, Node, Result};

use crate::executor::Cancellation;
use crate::templates::GenTemplate;

const CONTENT_CACHE_CAPACITY: usize = 100;

static CONTENTS: OnceLock<Cache<Arc<String>>> = OnceLock::new();

fn content(path: &str) -> Result<Arc<String>> {
    CONTENTS
        .get_or_init(|| {
            Cache::new(CONTENT_CACHE_CAPACITY, |path| {
                std::fs::read(path)
                    .map(|bytes| Arc::new(String::from_utf8_lossy(&bytes).into_owned()))
                    .map_err(|err| Error::GenTemplate(format!("cannot read {path}: {err}")))
            })
        })
        .get(path)
}

/// `grep(pattern, template)`: match the pattern against the content of the
/// row's `path` and expand the template once per match (`$1`, `$name`).
/// The expansions joined with newlines form an equal-pair payload.
pub struct GrepTemplate {
    pattern: String,
    template: String,
}

impl GrepTemplate {
    pub fn new(pattern: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            template: template.into(),
        }
    }
}

impl GenTemplate for GrepTemplate {
    fn generate(&self, _cancel: &Cancellation, node: &Node) -> Result<Vec<u8>> {
        let re = cache::regex(&self.pattern)
            .map_err(|err| Error::GenTemplate(format!("failed to compile expr: {err}")))?;
        let path = node
            .path()
            .ok_or_else(|| Error::GenTemplate("node has no path".to_string()))?;
        let text = content(path)
            .map_err(|err| err.context(format!("failed to read content to grep, file={path}")))?;

        let mut lines = Vec::new();
        for caps in re.captures_iter(text.as_str()) {
            let mut line = String::new();
            caps.expand(&self.template, &mut line);
            lines.push(line);
        }
        Ok(lines.join("\n").into_bytes())
    }
}
