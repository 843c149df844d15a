//! Directory errors.

use thiserror::Error;

use super::{DataElement, OperationKind};

#[derive(Debug, Error)]
pub enum Error {
    #[error("no shards configured for {element} {operation}")]
    NoShards {
        element: DataElement,
        operation: OperationKind,
    },

    #[error("{0}")]
    Config(#[from] accessmux_config::Error),

    #[error("shard client construction failed for \"{shard}\": {reason}")]
    ClientConstruction { shard: String, reason: String },
}
