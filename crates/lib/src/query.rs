use std::io::Write;

use ndql_lib_core::{Node, Result, StreamFunction};

use crate::compiler;
use crate::executor::{self, CloneableIter, ExecOptions};
use crate::parser::{self, DumpMode};

/// Parse, compile and run a (possibly multi-statement) query over the input
/// rows, handing every produced row to the sink.
///
/// All statements are compiled before any input is pulled, so compile
/// errors abort the whole query. With multiple statements the input is
/// wrapped in a clonable iterator and each statement replays it from the
/// start.
pub fn run_query(
    sql: &str,
    input: impl Iterator<Item = Node> + Send + 'static,
    options: &ExecOptions,
    sink: &mut dyn FnMut(Node),
) -> Result<()> {
    let statements = parser::parse(sql)?;
    let mut functions = Vec::with_capacity(statements.len());
    for (i, statement) in statements.iter().enumerate() {
        let function = compiler::compile(statement, &options.cancel)
            .map_err(|err| err.context(format!("statement[{i}]")))?;
        functions.push(function);
    }

    match <[StreamFunction; 1]>::try_from(functions) {
        Ok([function]) => executor::run(input, &function, options, sink),
        Err(functions) => {
            let shared = CloneableIter::new(input);
            for function in &functions {
                executor::run(shared.clone_view(), function, options, sink)?;
            }
            Ok(())
        }
    }
}

/// Parse the query and dump each statement; nothing is executed.
pub fn dry_run(sql: &str, out: &mut dyn Write, mode: DumpMode) -> Result<()> {
    for statement in parser::parse(sql)? {
        parser::dump(out, &statement, mode)
            .map_err(|err| ndql_lib_core::Error::InvalidArgument(err.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ndql_lib_core::Value;

    use super::*;

    fn rows(values: &[i64]) -> Vec<Node> {
        values
            .iter()
            .map(|v| {
                let mut n = Node::new();
                n.set("k1", Value::Int(*v));
                n
            })
            .collect()
    }

    fn collect(sql: &str, input: Vec<Node>) -> Vec<Node> {
        let mut out = Vec::new();
        run_query(sql, input.into_iter(), &ExecOptions::default(), &mut |n| {
            out.push(n)
        })
        .unwrap();
        out
    }

    #[test]
    fn test_single_statement() {
        let got = collect("select * where k1 > 0", rows(&[1, 0, 2]));
        assert_eq!(got, rows(&[1, 2]));
    }

    #[test]
    fn test_multi_statement_replays_input() {
        let got = collect("select * where k1 > 0; select * where k1 = 0", rows(&[1, 0]));
        assert_eq!(got, rows(&[1, 0]));
    }

    #[test]
    fn test_compile_error_aborts_before_running() {
        let mut out = Vec::new();
        let err = run_query(
            "select nosuchfunc(k1)",
            rows(&[1]).into_iter(),
            &ExecOptions::default(),
            &mut |n| out.push(n),
        )
        .unwrap_err();
        assert!(matches!(err, ndql_lib_core::Error::NotImplemented(_)));
        assert!(out.is_empty());
    }

    #[test]
    fn test_dry_run() {
        let mut out = Vec::new();
        dry_run("select path where k1 > 0", &mut out, DumpMode::Text).unwrap();
        assert!(!out.is_empty());
    }
}
