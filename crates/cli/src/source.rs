use std::io::{BufRead, BufReader, Read};

use ndql_lib::input;
use ndql_lib_core::{Error, Node, Result};

pub(crate) const SOURCE_USAGE: &str = "@- or @stdin reads stdin, @FILE reads the file, anything else is used as it is";

/// How an `@`-style argument resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Source {
    Stdin,
    File(String),
    Raw(String),
}

impl Source {
    /// `@-`/`@stdin` is stdin, `@FILE` is a file, anything else is invalid
    /// here (see [`Source::parse_or_raw`]).
    pub(crate) fn parse(arg: &str) -> Result<Source> {
        match arg {
            "@-" | "@stdin" => Ok(Source::Stdin),
            _ => match arg.strip_prefix('@') {
                Some(path) if !path.is_empty() => Ok(Source::File(path.to_string())),
                _ => Err(Error::InvalidArgument(format!("invalid source {arg:?}"))),
            },
        }
    }

    /// Like [`Source::parse`], but a plain argument is kept verbatim.
    pub(crate) fn parse_or_raw(arg: &str) -> Source {
        Self::parse(arg).unwrap_or_else(|_| Source::Raw(arg.to_string()))
    }

    pub(crate) fn is_stdin(&self) -> bool {
        matches!(self, Source::Stdin)
    }

    /// The full content: the raw string, the file, or all of stdin.
    pub(crate) fn read_all(&self) -> Result<String> {
        match self {
            Source::Raw(text) => Ok(text.clone()),
            Source::File(path) => std::fs::read_to_string(path)
                .map_err(|err| Error::InvalidArgument(format!("cannot read {path}: {err}"))),
            Source::Stdin => {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .map_err(|err| Error::InvalidArgument(format!("cannot read stdin: {err}")))?;
                Ok(text)
            }
        }
    }

    fn reader(&self) -> Result<Box<dyn BufRead + Send>> {
        match self {
            Source::Stdin => Ok(Box::new(BufReader::new(std::io::stdin()))),
            Source::File(path) => {
                let file = std::fs::File::open(path)
                    .map_err(|err| Error::InvalidArgument(format!("cannot open {path}: {err}")))?;
                Ok(Box::new(BufReader::new(file)))
            }
            Source::Raw(text) => Ok(Box::new(std::io::Cursor::new(text.clone().into_bytes()))),
        }
    }

    /// Rows for a PATH argument: a plain path walks the directory tree, a
    /// stdin/file source yields one path per line, each `stat`ed.
    pub(crate) fn walk_rows(&self) -> Result<Box<dyn Iterator<Item = Node> + Send>> {
        match self {
            Source::Raw(path) => Ok(Box::new(input::walk_dir(path.clone()))),
            _ => Ok(Box::new(input::walk_reader(self.reader()?))),
        }
    }

    /// Rows for an `--index` argument: newline-delimited JSON objects.
    pub(crate) fn index_rows(&self) -> Result<Box<dyn Iterator<Item = Node> + Send>> {
        if matches!(self, Source::Raw(_)) {
            return Err(Error::InvalidArgument("invalid index source".into()));
        }
        Ok(Box::new(input::read_json_rows(self.reader()?, false)))
    }
}

/// At most one argument may resolve to stdin.
pub(crate) fn check_stdin_conflict(sources: &[&Source]) -> Result<()> {
    if sources.iter().filter(|s| s.is_stdin()).count() > 1 {
        return Err(Error::InvalidArgument(
            "at most one argument may read stdin".into(),
        ));
    }
    Ok(())
}
