use std::io::Write;

use clap::{Parser, Subcommand};

use ndql_lib::executor::{Cancellation, ExecOptions};
use ndql_lib::parser::DumpMode;
use ndql_lib::{output, query};
use ndql_lib_core::{Error, Node, Result};

use crate::source::{check_stdin_conflict, Source, SOURCE_USAGE};

#[derive(Debug, Parser)]
#[command(name = "ndql")]
#[command(about = "Select metadata from files by SQL", version = env!("CARGO_PKG_VERSION"))]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,
    /// Maximum number of workers to process the query; 0 means 1.
    #[arg(short, long, global = true, default_value_t = 0)]
    pub(crate) concurrency: usize,
    /// Index source (newline-delimited JSON rows); exclusive with PATH.
    #[arg(short, long, global = true)]
    pub(crate) index: Option<String>,
    /// Keep storage-form keys in the output.
    #[arg(long, global = true, default_value_t = false)]
    pub(crate) raw: bool,
    /// Enable debug logs.
    #[arg(long, global = true, default_value_t = false)]
    pub(crate) debug: bool,
    /// Enable trace logs.
    #[arg(long, global = true, default_value_t = false)]
    pub(crate) trace: bool,
    /// Quiet logs except errors.
    #[arg(short, long, global = true, default_value_t = false)]
    pub(crate) quiet: bool,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    #[command(about = "Run query", long_about = query_long_about())]
    Query {
        query: String,
        path: Option<String>,
    },
    #[command(about = "List paths and exit; equivalent to: ndql query 'select *' PATH")]
    Ls { path: String },
    #[command(about = "Parse query and exit")]
    Dry {
        query: String,
        /// Dump the parse tree verbosely.
        #[arg(short, long, default_value_t = false)]
        verbose: bool,
    },
    #[command(about = "Show version and exit")]
    Version,
}

fn query_long_about() -> String {
    format!(
        "Run query.

QUERY and PATH accept sources: {SOURCE_USAGE}.

Examples:

  List all files and directories under the dir:

      ndql query 'select *' dir

  List all file paths under the dir:

      ndql query 'select path where not is_dir' dir

  Roughly list the func names defined in Go files:

      ndql query 'select path, func from (select grep(\"func (?P<name>[^(]+)\", \"func=$name\") where not is_dir and path not like \"%_test.go\")' dir"
    )
}

/// Returns the process exit code.
pub(crate) fn run(cli: Cli) -> i32 {
    match dispatch(&cli) {
        Ok(()) => 0,
        Err(Error::Exit(code)) => {
            log::error!("exit with {code}");
            code
        }
        Err(err) => {
            log::error!("{err}");
            1
        }
    }
}

fn dispatch(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Query { query, path } => run_query(cli, query, path.as_deref()),
        Commands::Ls { path } => run_ls(cli, path),
        Commands::Dry { query, verbose } => run_dry(query, *verbose),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn exec_options(cli: &Cli) -> ExecOptions {
    ExecOptions {
        concurrency: cli.concurrency.max(1),
        cancel: Cancellation::new(),
    }
}

fn run_query(cli: &Cli, query_arg: &str, path_arg: Option<&str>) -> Result<()> {
    let query_source = Source::parse_or_raw(query_arg);

    let (input, input_source): (Box<dyn Iterator<Item = Node> + Send>, Source) =
        match (&cli.index, path_arg) {
            (Some(_), Some(_)) => {
                return Err(Error::InvalidArgument("index is exclusive with PATH".into()));
            }
            (Some(index), None) => {
                let source = Source::parse(index)
                    .map_err(|err| err.context("invalid index source"))?;
                check_stdin_conflict(&[&query_source, &source])?;
                (source.index_rows()?, source)
            }
            (None, Some(path)) => {
                let source = Source::parse_or_raw(path);
                check_stdin_conflict(&[&query_source, &source])?;
                (source.walk_rows()?, source)
            }
            (None, None) => {
                return Err(Error::InvalidArgument("no PATH and no index".into()));
            }
        };
    log::debug!("query from {query_source:?}, input from {input_source:?}");

    let sql = query_source.read_all()?;
    let options = exec_options(cli);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    query::run_query(&sql, input, &options, &mut |node| {
        if let Err(err) = output::write_node(&mut out, &node, cli.raw) {
            log::error!("failed to write output: {err}");
        }
    })?;
    out.flush().ok();
    Ok(())
}

fn run_ls(cli: &Cli, path_arg: &str) -> Result<()> {
    let source = Source::parse_or_raw(path_arg);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for node in source.walk_rows()? {
        if let Err(err) = output::write_node(&mut out, &node, cli.raw) {
            log::error!("failed to write output: {err}");
        }
    }
    out.flush().ok();
    Ok(())
}

fn run_dry(query_arg: &str, verbose: bool) -> Result<()> {
    let sql = Source::parse_or_raw(query_arg).read_all()?;
    let mode = if verbose { DumpMode::Verbose } else { DumpMode::Text };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    query::dry_run(&sql, &mut out, mode)
}
