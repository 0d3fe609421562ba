pub mod compiler;
pub mod executor;
pub mod input;
pub mod output;
pub mod parser;
pub mod query;
pub mod templates;

pub use ndql_lib_core::{Error, Key, Node, Result, StreamFunction, Value};
