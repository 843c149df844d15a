//! Group element operations.
//!
//! Group records are referenced by all three data elements, so group writes
//! broadcast to every shard of every element. A broadcast commits shard by
//! shard until the first failure; shards already written stay written.

use std::collections::HashSet;

use accessmux_stats::CoordinatorMetric;

use crate::directory::{DataElement, OperationKind};
use crate::fanout::{self, Policy};
use crate::shard::ShardRef;

use super::{Coordinator, Error};

impl Coordinator {
    fn all_element_shards(&self, operation: OperationKind) -> Result<Vec<ShardRef>, Error> {
        let mut shards = self
            .directory
            .get_all_clients(DataElement::Group, operation)?;
        shards.extend(
            self.directory
                .get_all_clients(DataElement::GroupToGroupMapping, operation)?,
        );
        shards.extend(self.directory.get_all_clients(DataElement::User, operation)?);
        Ok(shards)
    }

    /// Create a group record on every shard of every element.
    pub async fn add_group(&self, group: &str) -> Result<(), Error> {
        let guard = self.begin(CoordinatorMetric::AddGroup);
        let shards = self.all_element_shards(OperationKind::Event)?;
        let action = format!("add group '{}' to", group);
        let group = group.to_owned();

        fanout::all(shards, Policy::new(&action), move |shard| {
            let group = group.clone();
            async move { shard.client().add_group(&group).await }
        })
        .await?;

        guard.complete();
        Ok(())
    }

    /// Whether any group shard knows `group`.
    pub async fn contains_group(&self, group: &str) -> Result<bool, Error> {
        let guard = self.begin(CoordinatorMetric::ContainsGroup);
        let shards = self
            .directory
            .get_all_clients(DataElement::Group, OperationKind::Query)?;
        let action = format!("check for group '{}' in", group);
        let group = group.to_owned();

        let found = fanout::any(shards, Policy::new(&action), move |shard| {
            let group = group.clone();
            async move { shard.client().contains_group(&group).await }
        })
        .await?;

        guard.complete();
        Ok(found)
    }

    /// Remove a group record from every shard of every element.
    pub async fn remove_group(&self, group: &str) -> Result<(), Error> {
        let guard = self.begin(CoordinatorMetric::RemoveGroup);
        let shards = self.all_element_shards(OperationKind::Event)?;
        let action = format!("remove group '{}' from", group);
        let group = group.to_owned();

        fanout::all(shards, Policy::new(&action), move |shard| {
            let group = group.clone();
            async move { shard.client().remove_group(&group).await }
        })
        .await?;

        guard.complete();
        Ok(())
    }

    /// All groups across the group shards.
    pub async fn get_groups(&self) -> Result<HashSet<String>, Error> {
        let guard = self.begin(CoordinatorMetric::GetGroups);
        let shards = self
            .directory
            .get_all_clients(DataElement::Group, OperationKind::Query)?;

        let groups = fanout::union(shards, Policy::new("retrieve groups from"), |shard| {
            async move { shard.client().get_groups().await }
        })
        .await?;

        guard.complete();
        Ok(groups)
    }
}
