//! Routing table construction and atomic replacement.

use std::collections::{HashMap, HashSet};
use std::hash::Hasher;
use std::sync::Arc;

use arc_swap::ArcSwap;
use fnv::FnvHasher;
use parking_lot::Mutex;
use tracing::info;

use accessmux_config::{Fleet, ShardConfig};

use crate::shard::{ShardClient, ShardRef};

use super::{DataElement, Error, OperationKind, ShardBucket, ShardDirectory};

/// Builds a shard client for one configured shard and operation kind.
///
/// The transport lives behind this seam; the directory never constructs
/// clients itself.
pub trait ClientFactory: Send + Sync {
    fn client(
        &self,
        element: DataElement,
        operation: OperationKind,
        config: &ShardConfig,
    ) -> Result<Arc<dyn ShardClient>, Error>;
}

/// One element's shards, split by operation kind.
#[derive(Clone, Default)]
struct ElementTable {
    query: Vec<ShardRef>,
    event: Vec<ShardRef>,
}

impl ElementTable {
    fn shards(&self, operation: OperationKind) -> &[ShardRef] {
        match operation {
            OperationKind::Query => &self.query,
            OperationKind::Event => &self.event,
        }
    }
}

/// Immutable routing table. Replaced wholesale on refresh.
#[derive(Clone, Default)]
struct RoutingTable {
    users: ElementTable,
    groups: ElementTable,
    group_to_group: ElementTable,
}

impl RoutingTable {
    fn from_fleet(fleet: &Fleet, factory: &dyn ClientFactory) -> Result<Self, Error> {
        fleet.validate()?;

        Ok(Self {
            users: Self::element_table(DataElement::User, &fleet.users, factory)?,
            groups: Self::element_table(DataElement::Group, &fleet.groups, factory)?,
            group_to_group: Self::element_table(
                DataElement::GroupToGroupMapping,
                &fleet.group_to_group,
                factory,
            )?,
        })
    }

    fn element_table(
        element: DataElement,
        configs: &[ShardConfig],
        factory: &dyn ClientFactory,
    ) -> Result<ElementTable, Error> {
        let mut table = ElementTable::default();
        for config in configs {
            let query = factory.client(element, OperationKind::Query, config)?;
            let event = factory.client(element, OperationKind::Event, config)?;
            table
                .query
                .push(ShardRef::new(query, config.name.as_str()));
            table
                .event
                .push(ShardRef::new(event, config.name.as_str()));
        }
        Ok(table)
    }

    fn element(&self, element: DataElement) -> &ElementTable {
        match element {
            DataElement::User => &self.users,
            DataElement::Group => &self.groups,
            DataElement::GroupToGroupMapping => &self.group_to_group,
        }
    }
}

/// Stable key to shard-index assignment.
fn shard_index(key: &str, shards: usize) -> usize {
    let mut hasher = FnvHasher::default();
    hasher.write(key.as_bytes());
    (hasher.finish() % shards as u64) as usize
}

/// The concrete shard directory.
///
/// Resolution reads go through an `ArcSwap`, so lookups never block behind a
/// refresh. Refreshes build a complete replacement table first and swap it
/// in with a single store; a failed build leaves the live table untouched.
pub struct ShardManager {
    factory: Arc<dyn ClientFactory>,
    table: ArcSwap<RoutingTable>,
    // Serializes refreshes, not lookups.
    refresh_lock: Mutex<()>,
}

impl ShardManager {
    /// Build a manager from an initial fleet description.
    pub fn new(fleet: Fleet, factory: Arc<dyn ClientFactory>) -> Result<Self, Error> {
        let table = RoutingTable::from_fleet(&fleet, &*factory)?;

        Ok(Self {
            factory,
            table: ArcSwap::from_pointee(table),
            refresh_lock: Mutex::new(()),
        })
    }
}

impl ShardDirectory for ShardManager {
    fn get_client(
        &self,
        element: DataElement,
        operation: OperationKind,
        key: &str,
    ) -> Result<ShardRef, Error> {
        let table = self.table.load();
        let shards = table.element(element).shards(operation);
        if shards.is_empty() {
            return Err(Error::NoShards { element, operation });
        }

        Ok(shards[shard_index(key, shards.len())].clone())
    }

    fn get_all_clients(
        &self,
        element: DataElement,
        operation: OperationKind,
    ) -> Result<Vec<ShardRef>, Error> {
        let table = self.table.load();
        let shards = table.element(element).shards(operation);
        if shards.is_empty() {
            return Err(Error::NoShards { element, operation });
        }

        Ok(shards.to_vec())
    }

    fn get_clients(
        &self,
        element: DataElement,
        operation: OperationKind,
        keys: &HashSet<String>,
    ) -> Result<Vec<ShardBucket>, Error> {
        if keys.is_empty() {
            return Ok(vec![]);
        }

        let table = self.table.load();
        let shards = table.element(element).shards(operation);
        if shards.is_empty() {
            return Err(Error::NoShards { element, operation });
        }

        let mut buckets: HashMap<usize, HashSet<String>> = HashMap::new();
        for key in keys {
            buckets
                .entry(shard_index(key, shards.len()))
                .or_default()
                .insert(key.clone());
        }

        Ok(buckets
            .into_iter()
            .map(|(index, keys)| ShardBucket {
                shard: shards[index].clone(),
                keys,
            })
            .collect())
    }

    fn refresh_configuration(&self, fleet: Fleet) -> Result<(), Error> {
        // One refresh at a time; lookups stay lock-free.
        let _lock = self.refresh_lock.lock();

        let table = RoutingTable::from_fleet(&fleet, &*self.factory)?;
        self.table.store(Arc::new(table));

        info!(
            "shard configuration refreshed ({} user, {} group, {} group-to-group shards)",
            fleet.users.len(),
            fleet.groups.len(),
            fleet.group_to_group.len(),
        );

        Ok(())
    }
}
