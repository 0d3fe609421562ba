use std::sync::{Arc, OnceLock};

use ndql_lib_core::cache::Cache;
use ndql_lib_core::{Error, Node, Result};

use crate::executor::Cancellation;
use crate::templates::{node_as_structured_json, GenTemplate};

const SCRIPT_CACHE_CAPACITY: usize = 100;

static ENGINE: OnceLock<rhai::Engine> = OnceLock::new();
static ASTS: OnceLock<Cache<Arc<rhai::AST>>> = OnceLock::new();

fn engine() -> &'static rhai::Engine {
    ENGINE.get_or_init(rhai::Engine::new)
}

fn ast(expression: &str) -> Result<Arc<rhai::AST>> {
    ASTS.get_or_init(|| {
        Cache::new(SCRIPT_CACHE_CAPACITY, |expression| {
            engine()
                .compile_expression(expression)
                .map(Arc::new)
                .map_err(|err| Error::GenTemplate(format!("failed to compile expr: {err}")))
        })
    })
    .get(expression)
}

/// `expr(e)`: evaluate a rhai expression with `n` bound to the structured
/// row and `e` to the process environment; the result is stringified.
pub struct ScriptTemplate {
    expression: String,
}

impl ScriptTemplate {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }
}

impl GenTemplate for ScriptTemplate {
    fn generate(&self, _cancel: &Cancellation, node: &Node) -> Result<Vec<u8>> {
        let ast = ast(&self.expression)?;

        let mut scope = rhai::Scope::new();
        scope.push_dynamic(
            "n",
            json_to_dynamic(&serde_json::Value::Object(node_as_structured_json(node))),
        );
        scope.push_dynamic("e", environment_map());

        let result = engine()
            .eval_ast_with_scope::<rhai::Dynamic>(&mut scope, &ast)
            .map_err(|err| Error::GenTemplate(format!("failed to run expr: {err}")))?;
        Ok(result.to_string().into_bytes())
    }
}

fn environment_map() -> rhai::Dynamic {
    let mut map = rhai::Map::new();
    for (key, value) in std::env::vars() {
        map.insert(key.into(), value.into());
    }
    rhai::Dynamic::from_map(map)
}

fn json_to_dynamic(value: &serde_json::Value) -> rhai::Dynamic {
    match value {
        serde_json::Value::Null => rhai::Dynamic::UNIT,
        serde_json::Value::Bool(b) => (*b).into(),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into()
            } else {
                n.as_f64().unwrap_or(f64::NAN).into()
            }
        }
        serde_json::Value::String(s) => s.clone().into(),
        serde_json::Value::Array(items) => {
            let array: rhai::Array = items.iter().map(json_to_dynamic).collect();
            rhai::Dynamic::from_array(array)
        }
        serde_json::Value::Object(members) => {
            let mut map = rhai::Map::new();
            for (k, v) in members {
                map.insert(k.as_str().into(), json_to_dynamic(v));
            }
            rhai::Dynamic::from_map(map)
        }
    }
}
