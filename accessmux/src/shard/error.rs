//! Errors surfaced by shard clients.

use thiserror::Error;

/// Everything a shard RPC can fail with.
///
/// The NotFound variants are control flow, not failures: operation policy
/// decides per query whether they propagate to the caller, contribute an
/// empty result, or are swallowed. Anything else is fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("user '{0}' does not exist")]
    UserNotFound(String),

    #[error("group '{0}' does not exist")]
    GroupNotFound(String),

    #[error("entity type '{0}' does not exist")]
    EntityTypeNotFound(String),

    #[error("entity '{entity}' with type '{entity_type}' does not exist")]
    EntityNotFound {
        entity_type: String,
        entity: String,
    },

    /// Returned by batched group-side calls handed an empty group set.
    /// The coordinator preflights the empty case, so seeing this means a
    /// shard and the coordinator disagree; it contributes an empty result.
    #[error("group set is empty")]
    EmptyGroupSet,

    #[error("{0}")]
    Rpc(String),
}

impl ClientError {
    /// NotFound variants carry a missing key, everything else is a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_)
                | Self::GroupNotFound(_)
                | Self::EntityTypeNotFound(_)
                | Self::EntityNotFound { .. }
        )
    }
}
