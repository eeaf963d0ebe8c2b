mod command;
mod handler;
mod polling;

pub use command::*;
pub use handler::*;
pub use polling::*;
