//! Shard directory: resolves operations to the shard clients that serve them.

pub mod error;
pub mod table;

pub use error::Error;
pub use table::{ClientFactory, ShardManager};

use std::collections::HashSet;
use std::fmt;

use accessmux_config::Fleet;

use crate::shard::ShardRef;

/// The kind of records a shard owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataElement {
    User,
    Group,
    GroupToGroupMapping,
}

impl fmt::Display for DataElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::Group => "group",
            Self::GroupToGroupMapping => "group-to-group mapping",
        };
        write!(f, "{}", name)
    }
}

/// Read or write, so fleets can split the two per element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Query,
    Event,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Query => "query",
            Self::Event => "event",
        };
        write!(f, "{}", name)
    }
}

/// A shard paired with the subset of caller-supplied keys it owns.
#[derive(Debug, Clone)]
pub struct ShardBucket {
    pub shard: ShardRef,
    pub keys: HashSet<String>,
}

/// Resolution primitives the coordinator depends on.
///
/// Implementations must be safe for concurrent use; `refresh_configuration`
/// must be atomic with respect to concurrent resolutions (readers observe
/// the old table or the new one, never a mix).
pub trait ShardDirectory: Send + Sync {
    /// The one shard owning `key` for this element and operation.
    fn get_client(
        &self,
        element: DataElement,
        operation: OperationKind,
        key: &str,
    ) -> Result<ShardRef, Error>;

    /// Every shard serving this element and operation. Order is not
    /// observable by callers.
    fn get_all_clients(
        &self,
        element: DataElement,
        operation: OperationKind,
    ) -> Result<Vec<ShardRef>, Error>;

    /// Partition `keys` by shard ownership. Each key lands in exactly one
    /// bucket; an empty key set produces no buckets.
    fn get_clients(
        &self,
        element: DataElement,
        operation: OperationKind,
        keys: &HashSet<String>,
    ) -> Result<Vec<ShardBucket>, Error>;

    /// Replace the live routing table. On failure the previous table stays
    /// in place untouched.
    fn refresh_configuration(&self, fleet: Fleet) -> Result<(), Error>;
}
