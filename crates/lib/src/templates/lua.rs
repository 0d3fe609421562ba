use std::sync::{Arc, Mutex, OnceLock};

use ndql_lib_core::cache::Cache;
use ndql_lib_core::{Error, Node, Result};

use crate::executor::Cancellation;
use crate::templates::{env_or, node_as_structured_json, GenTemplate};

const STATE_CACHE_CAPACITY: usize = 100;
const ENV_TABLE: &str = "E";

static STATES: OnceLock<Cache<Arc<Mutex<mlua::Lua>>>> = OnceLock::new();

/// Load and execute the script once, keeping the initialized interpreter.
/// Entry construction fails fast when the script does not compile.
fn state(script: &str) -> Result<Arc<Mutex<mlua::Lua>>> {
    STATES
        .get_or_init(|| {
            Cache::new(STATE_CACHE_CAPACITY, |script| {
                let lua = mlua::Lua::new();
                register_env_table(&lua)
                    .and_then(|_| lua.load(script).exec())
                    .map_err(|err| Error::GenTemplate(format!("failed to compile lua: {err}")))?;
                Ok(Arc::new(Mutex::new(lua)))
            })
        })
        .get(script)
}

/// Global table `E` with `E.get(key [, default])` over the process
/// environment.
fn register_env_table(lua: &mlua::Lua) -> mlua::Result<()> {
    let table = lua.create_table()?;
    table.set(
        "get",
        lua.create_function(|_, (key, default): (String, Option<String>)| {
            Ok(env_or(&key, default.as_deref().unwrap_or("")))
        })?,
    )?;
    lua.globals().set(ENV_TABLE, table)
}

/// `lua(script, entrypoint)`: call `entrypoint(row_table)` in the script's
/// interpreter; the return value must be a string.
pub struct LuaTemplate {
    script: String,
    entrypoint: String,
}

impl LuaTemplate {
    pub fn new(script: impl Into<String>, entrypoint: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            entrypoint: entrypoint.into(),
        }
    }
}

impl GenTemplate for LuaTemplate {
    fn generate(&self, cancel: &Cancellation, node: &Node) -> Result<Vec<u8>> {
        if cancel.is_cancelled() {
            return Err(Error::Ignore);
        }
        let state = state(&self.script)?;
        let lua = state.lock().unwrap();

        let row = json_to_lua(&lua, &serde_json::Value::Object(node_as_structured_json(node)))
            .map_err(|err| Error::GenTemplate(format!("failed to build lua row: {err}")))?;
        let entrypoint: mlua::Function = lua
            .globals()
            .get(self.entrypoint.as_str())
            .map_err(|err| Error::GenTemplate(format!("no entrypoint {}: {err}", self.entrypoint)))?;
        let value: mlua::Value = entrypoint
            .call(row)
            .map_err(|err| Error::GenTemplate(format!("failed to call lua script: {err}")))?;
        match value {
            mlua::Value::String(s) => Ok(s.as_bytes().to_vec()),
            other => Err(Error::GenTemplate(format!(
                "lua return value must be a string, got {}",
                other.type_name()
            ))),
        }
    }
}

fn json_to_lua(lua: &mlua::Lua, value: &serde_json::Value) -> mlua::Result<mlua::Value> {
    match value {
        serde_json::Value::Null => Ok(mlua::Value::Nil),
        serde_json::Value::Bool(b) => Ok(mlua::Value::Boolean(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(mlua::Value::Integer(i))
            } else {
                Ok(mlua::Value::Number(n.as_f64().unwrap_or(f64::NAN)))
            }
        }
        serde_json::Value::String(s) => Ok(mlua::Value::String(lua.create_string(s)?)),
        serde_json::Value::Array(items) => {
            let table = lua.create_table()?;
            for (i, item) in items.iter().enumerate() {
                table.set(i + 1, json_to_lua(lua, item)?)?;
            }
            Ok(mlua::Value::Table(table))
        }
        serde_json::Value::Object(members) => {
            let table = lua.create_table()?;
            for (k, v) in members {
                table.set(k.as_str(), json_to_lua(lua, v)?)?;
            }
            Ok(mlua::Value::Table(table))
        }
    }
}
