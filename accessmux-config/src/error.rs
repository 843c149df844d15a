//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("syntax error in \"{path}\": {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("shard name \"{0}\" is declared more than once")]
    DuplicateShard(String),

    #[error("shard declared with an empty name")]
    EmptyShardName,

    #[error("shard \"{0}\" declared with an empty url")]
    EmptyShardUrl(String),
}

impl Error {
    pub fn toml(path: &str, source: toml::de::Error) -> Self {
        Self::Toml {
            path: path.to_owned(),
            source,
        }
    }
}
