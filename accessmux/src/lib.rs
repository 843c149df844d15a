//! accessmux presents one logical access-management surface over a fleet of
//! sharded backend services. Each backend shard owns a disjoint slice of
//! user, group, or group-to-group mapping records; the coordinator fans
//! operations out to the owning shards, merges partial results with set
//! semantics, and walks the group graph for authorization queries.

pub mod coordinator;
pub mod directory;
pub(crate) mod fanout;
pub(crate) mod resolver;
pub mod shard;
pub mod testing;

pub use coordinator::{Coordinator, Error};
pub use directory::{
    ClientFactory, DataElement, OperationKind, ShardBucket, ShardDirectory, ShardManager,
};
pub use shard::{ClientError, ShardClient, ShardRef};

use once_cell::sync::OnceCell;

/// Initialize logging once, for tests and simple hosts. Respects
/// `RUST_LOG`; repeated calls are no-ops.
pub fn logger() {
    static INIT: OnceCell<()> = OnceCell::new();

    INIT.get_or_init(|| {
        use tracing_subscriber::EnvFilter;

        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init()
            .ok();
    });
}
