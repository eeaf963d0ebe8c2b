mod arity;
mod error;
mod record;

pub use arity::*;
pub use error::*;
pub use record::*;
