mod point;
mod postgres;
mod publisher;

pub use point::*;
pub use postgres::*;
pub use publisher::*;
