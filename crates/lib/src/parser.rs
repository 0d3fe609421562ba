use std::io::Write;

use sqlparser::ast::Statement;
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;

use ndql_lib_core::{Error, Result};

/// Parse a (possibly multi-statement) query with the MySQL dialect.
pub fn parse(sql: &str) -> Result<Vec<Statement>> {
    Parser::parse_sql(&MySqlDialect {}, sql).map_err(|err| Error::Parse(err.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpMode {
    Text,
    Verbose,
}

/// Render a parsed statement for `dry`: the canonical SQL text, or the
/// serde_json debug tree in verbose mode.
pub fn dump(out: &mut dyn Write, statement: &Statement, mode: DumpMode) -> std::io::Result<()> {
    match mode {
        DumpMode::Text => writeln!(out, "{statement}"),
        DumpMode::Verbose => writeln!(out, "{statement:#?}"),
    }
}
