use crate::value::Value;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error kinds shared by the whole engine.
///
/// Compile errors (everything from `Parse` to `InvalidFunctionArity`) abort a
/// query. Runtime errors drop the offending row; `Ignore` does so silently.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Parse: {0}")]
    Parse(String),
    #[error("InvalidTree: {0}")]
    InvalidTree(String),
    #[error("NotImplemented: {0}")]
    NotImplemented(String),
    #[error("InvalidKey: {0}")]
    InvalidKey(String),
    #[error("InvalidValue: {0}")]
    InvalidValue(String),
    #[error("InvalidArgument: {0}")]
    InvalidArgument(String),
    #[error("InvalidFunctionArity: {0}")]
    InvalidFunctionArity(String),
    /// An operator is not defined for its operand variants.
    #[error("Unavailable: {0}")]
    Unavailable(String),
    #[error("ParseGenResult: {0}")]
    ParseGenResult(String),
    #[error("GenTemplate: {0}")]
    GenTemplate(String),
    /// Sentinel: drop the current row without logging.
    #[error("Ignore")]
    Ignore,
    #[error("Exit: code {0}")]
    Exit(i32),
}

impl Error {
    pub fn is_ignore(&self) -> bool {
        matches!(self, Error::Ignore)
    }

    /// `Unavailable` for an operator applied to unsupported operands.
    pub fn unavailable(op: &str, args: &[&Value]) -> Error {
        Error::Unavailable(format!("{op}({})", display_args(args)))
    }

    pub fn unavailable_msg(op: &str, args: &[&Value], msg: impl AsRef<str>) -> Error {
        Error::Unavailable(format!("{op}({}): {}", display_args(args), msg.as_ref()))
    }

    /// Wrap with context while keeping the error kind.
    pub fn context(self, msg: impl AsRef<str>) -> Error {
        let msg = msg.as_ref();
        match self {
            Error::Parse(s) => Error::Parse(format!("{msg}: {s}")),
            Error::InvalidTree(s) => Error::InvalidTree(format!("{msg}: {s}")),
            Error::NotImplemented(s) => Error::NotImplemented(format!("{msg}: {s}")),
            Error::InvalidKey(s) => Error::InvalidKey(format!("{msg}: {s}")),
            Error::InvalidValue(s) => Error::InvalidValue(format!("{msg}: {s}")),
            Error::InvalidArgument(s) => Error::InvalidArgument(format!("{msg}: {s}")),
            Error::InvalidFunctionArity(s) => Error::InvalidFunctionArity(format!("{msg}: {s}")),
            Error::Unavailable(s) => Error::Unavailable(format!("{msg}: {s}")),
            Error::ParseGenResult(s) => Error::ParseGenResult(format!("{msg}: {s}")),
            Error::GenTemplate(s) => Error::GenTemplate(format!("{msg}: {s}")),
            other => other,
        }
    }
}

fn display_args(args: &[&Value]) -> String {
    let mut out = String::new();
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&a.display());
    }
    out
}
