pub mod cache;
pub mod duration;
pub mod errors;
pub mod key;
pub mod like;
pub mod row;
pub mod stream;
pub mod value;

pub use errors::{Error, Result};
pub use key::Key;
pub use row::Node;
pub use stream::StreamFunction;
pub use value::Value;
