//! The coordinator's public failure model.

use thiserror::Error;

use crate::shard::ClientError;

/// Everything a coordinator operation can fail with.
///
/// NotFound variants round-trip from the shard untouched: same payload,
/// same message, never wrapped, so callers can tell a missing key from a
/// broken shard. Everything else a shard raises is wrapped with the shard's
/// description, original error retained as the cause.
#[derive(Debug, Error)]
pub enum Error {
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

    #[error("{message}")]
    ShardOperation {
        message: String,
        shard: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to refresh shard configuration: {source}")]
    ConfigurationRefresh {
        #[source]
        source: crate::directory::Error,
    },

    #[error("{0}")]
    Directory(#[from] crate::directory::Error),
}

impl Error {
    /// Translate a shard error at the boundary: NotFound passes through
    /// typed, anything else is wrapped with the failed action and the
    /// shard's description.
    pub(crate) fn from_client(action: &str, shard: &str, source: ClientError) -> Self {
        match source {
            ClientError::UserNotFound(user) => Self::UserNotFound(user),
            ClientError::GroupNotFound(group) => Self::GroupNotFound(group),
            ClientError::EntityTypeNotFound(entity_type) => Self::EntityTypeNotFound(entity_type),
            ClientError::EntityNotFound {
                entity_type,
                entity,
            } => Self::EntityNotFound {
                entity_type,
                entity,
            },
            source => Self::ShardOperation {
                message: format!(
                    "Failed to {} shard with configuration '{}'.",
                    action, shard
                ),
                shard: shard.to_owned(),
                source,
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_wrap_message_format() {
        let err = Error::from_client(
            "retrieve users from",
            "ShardDescription2",
            ClientError::Rpc("Mock exception".into()),
        );

        assert_eq!(
            err.to_string(),
            "Failed to retrieve users from shard with configuration 'ShardDescription2'."
        );
        match err {
            Error::ShardOperation { shard, source, .. } => {
                assert_eq!(shard, "ShardDescription2");
                assert_eq!(source, ClientError::Rpc("Mock exception".into()));
            }
            other => panic!("expected ShardOperation, got {:?}", other),
        }
    }

    #[test]
    fn test_not_found_is_never_wrapped() {
        let client = ClientError::EntityNotFound {
            entity_type: "Order".into(),
            entity: "order1".into(),
        };
        let message = client.to_string();

        let err = Error::from_client("retrieve entities from", "shard-0", client);
        assert_eq!(err.to_string(), message);
        assert!(matches!(
            err,
            Error::EntityNotFound { entity_type, entity }
                if entity_type == "Order" && entity == "order1"
        ));
    }

    #[test]
    fn test_source_is_exposed() {
        use std::error::Error as _;

        let err = Error::from_client(
            "add group 'group1' to",
            "ShardDescription2",
            ClientError::Rpc("Mock exception".into()),
        );

        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "Mock exception");
    }
}
