mod config;
mod notifier;
mod target;
mod threshold;

pub use config::*;
pub use notifier::*;
pub use target::*;
pub use threshold::*;
