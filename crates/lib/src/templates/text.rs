use std::sync::{Arc, OnceLock};

use minijinja::Environment;
use ndql_lib_core::cache::Cache;
use ndql_lib_core::{Error, Node, Result};

use crate::executor::Cancellation;
use crate::templates::{env_or, node_as_structured_json, GenTemplate};

const TEMPLATE_CACHE_CAPACITY: usize = 100;
const TEMPLATE_NAME: &str = "template";

static ENVIRONMENTS: OnceLock<Cache<Arc<Environment<'static>>>> = OnceLock::new();

fn environment(text: &str) -> Result<Arc<Environment<'static>>> {
    ENVIRONMENTS
        .get_or_init(|| {
            Cache::new(TEMPLATE_CACHE_CAPACITY, |text| {
                let mut env = Environment::new();
                env.add_function("env", |key: String| env_or(&key, ""));
                env.add_function("envor", |key: String, default: String| env_or(&key, &default));
                env.add_template_owned(TEMPLATE_NAME.to_string(), text.to_string())
                    .map_err(|err| Error::GenTemplate(format!("cannot parse text template: {err}")))?;
                Ok(Arc::new(env))
            })
        })
        .get(text)
}

/// `tmpl(text)`: render a minijinja template against the row presented as a
/// nested map (qualified keys become submaps); extra functions `env(k)` and
/// `envor(k, default)`.
pub struct TextTemplate {
    text: String,
}

impl TextTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl GenTemplate for TextTemplate {
    fn generate(&self, _cancel: &Cancellation, node: &Node) -> Result<Vec<u8>> {
        let env = environment(&self.text)?;
        let template = env
            .get_template(TEMPLATE_NAME)
            .map_err(|err| Error::GenTemplate(format!("cannot get text template: {err}")))?;
        let context = minijinja::Value::from_serialize(node_as_structured_json(node));
        let rendered = template
            .render(context)
            .map_err(|err| Error::GenTemplate(format!("failed to render: {err}")))?;
        Ok(rendered.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use ndql_lib_core::Value;

    use super::*;
    use crate::templates::generate_rows;

    fn sample() -> Node {
        let mut n = Node::new();
        n.set("k1", Value::String("v1".into()));
        n.set("t1___k2", Value::Int(2));
        n
    }

    #[test]
    fn test_render_bare_and_qualified_keys() {
        let template = TextTemplate::new("a={{ k1 }},b={{ t1.k2 }}");
        let rows = generate_rows(&template, &Cancellation::new(), &sample()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("a"), Some(&Value::String("v1".into())));
        assert_eq!(rows[0].get("b"), Some(&Value::String("2".into())));
    }

    #[test]
    fn test_render_json_payload() {
        let template = TextTemplate::new(r#"{"n": {{ t1.k2 }}}"#);
        let rows = generate_rows(&template, &Cancellation::new(), &sample()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("n"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_env_functions() {
        std::env::set_var("NDQL_TEXT_TEMPLATE_TEST", "from-env");
        let template =
            TextTemplate::new("a={{ env(\"NDQL_TEXT_TEMPLATE_TEST\") }},b={{ envor(\"NDQL_TEXT_TEMPLATE_MISSING\", \"dflt\") }}");
        let rows = generate_rows(&template, &Cancellation::new(), &sample()).unwrap();
        assert_eq!(rows[0].get("a"), Some(&Value::String("from-env".into())));
        assert_eq!(rows[0].get("b"), Some(&Value::String("dflt".into())));
    }

    #[test]
    fn test_broken_template_is_error() {
        let template = TextTemplate::new("{{ unclosed");
        assert!(template.generate(&Cancellation::new(), &sample()).is_err());
    }
}
