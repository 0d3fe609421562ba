use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::time::Duration;

use ndql_lib_core::cache::Cache;
use ndql_lib_core::key::TABLE_KEY_SEPARATOR;
use ndql_lib_core::{Error, Node, Result};
use sha2::{Digest, Sha256};

use crate::executor::Cancellation;
use crate::templates::GenTemplate;

const SCRIPT_CACHE_CAPACITY: usize = 100;
const SHELL: &str = "bash";
const KILL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Helper functions prepended to every script. `get`/`get_or` resolve bare
/// and qualified names against the exported row, preferring an exact table
/// match, then any qualified variable with the same column, then the bare
/// column.
const PRELUDE: &str = r#"key_has_table() {
  echo "$1" | grep -q 'SEP'
}
key_from_name() {
  echo "$1" | sed 's|\.|SEP|g'
}
name_from_key() {
  echo "$1" | sed 's|SEP|\.|g'
}
key_suffix() {
  name_from_key "$1" | cut -d "." -f 2-
}
get() {
  local -r name="$1"
  local -r key="$(key_from_name "$name")"
  if key_has_table "$key" ; then
    echo "${!key}"
    return
  fi
  local -r suffix="$(key_suffix "$key")"
  for varname in $(compgen -v | grep -E "SEP${suffix}$") ; do
    if ! key_has_table "$varname" ; then
      continue
    fi
    echo "${!varname}"
    return
  done
  echo "${!suffix}"
}
get_or() {
  local -r name="$1"
  local -r default_value="$2"
  local r="$(get "$name")"
  if [[ "$r" == "" ]] ; then
    echo "$default_value"
  else
    echo "$r"
  fi
}"#;

static SCRIPT_FILES: OnceLock<Cache<String>> = OnceLock::new();

/// Materialize the script under `$TMPDIR/ndql/shell_template/<sha256>`,
/// reusing the file when the content was seen before. Files are retained
/// across runs on purpose.
fn script_file(script: &str) -> Result<String> {
    SCRIPT_FILES
        .get_or_init(|| {
            Cache::new(SCRIPT_CACHE_CAPACITY, |script| {
                let dir = std::env::temp_dir().join("ndql").join("shell_template");
                std::fs::create_dir_all(&dir)
                    .map_err(|err| Error::GenTemplate(format!("cannot create {}: {err}", dir.display())))?;
                let digest = Sha256::digest(script.as_bytes());
                let path = dir.join(format!("{digest:x}"));
                std::fs::write(&path, script)
                    .map_err(|err| Error::GenTemplate(format!("cannot write {}: {err}", path.display())))?;
                Ok(path.display().to_string())
            })
        })
        .get(script)
}

/// `sh(script)`: run the script with bash, the row exported as environment
/// variables in storage form; stdout (trimmed) is the payload.
pub struct ShellTemplate {
    text: String,
}

impl ShellTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    fn full_script(&self) -> String {
        let prelude = PRELUDE.replace("SEP", TABLE_KEY_SEPARATOR);
        format!("#!/bin/{SHELL}\n{prelude}\n{}", self.text)
    }
}

impl GenTemplate for ShellTemplate {
    fn generate(&self, cancel: &Cancellation, node: &Node) -> Result<Vec<u8>> {
        let file = script_file(&self.full_script())
            .map_err(|err| err.context("cannot get shell template"))?;
        log::debug!("shell template file {file}");

        let mut command = Command::new(SHELL);
        command.arg(&file).stdout(Stdio::piped()).stderr(Stdio::inherit());
        for (key, value) in node.iter() {
            if let Ok(ndql_lib_core::Value::String(s)) = value.as_string() {
                command.env(key, s);
            }
        }
        let mut child = command
            .spawn()
            .map_err(|err| Error::GenTemplate(format!("failed to run shell template {file}: {err}")))?;

        let mut stdout = child.stdout.take().expect("stdout is piped");
        let mut output = Vec::new();
        let status = std::thread::scope(|scope| {
            let reader = scope.spawn(move || {
                let mut buffer = Vec::new();
                let _ = stdout.read_to_end(&mut buffer);
                buffer
            });
            let status = loop {
                if cancel.is_cancelled() {
                    let _ = child.kill();
                }
                match child.try_wait() {
                    Ok(Some(status)) => break Ok(status),
                    Ok(None) => std::thread::sleep(KILL_POLL_INTERVAL),
                    Err(err) => break Err(err),
                }
            };
            output = reader.join().unwrap_or_default();
            status
        })
        .map_err(|err| Error::GenTemplate(format!("failed to wait shell template {file}: {err}")))?;

        if !status.success() {
            return Err(Error::GenTemplate(format!(
                "failed to run shell template {file}: {status}"
            )));
        }
        Ok(output.trim_ascii().to_vec())
    }
}
