// Submodules
pub mod error;
pub mod fleet;

pub use error::Error;
pub use fleet::{Fleet, ShardConfig};
