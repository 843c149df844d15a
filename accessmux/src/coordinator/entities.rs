//! Entity type and entity operations.
//!
//! Entity records live alongside the user and group mappings that reference
//! them, so these operations target the user and group shards together.
//! During reads, a shard that never saw the entity type contributes an
//! empty result.

use std::collections::HashSet;

use accessmux_stats::CoordinatorMetric;

use crate::directory::{DataElement, OperationKind};
use crate::fanout::{self, Policy};
use crate::shard::ShardRef;

use super::{Coordinator, Error};

impl Coordinator {
    fn entity_shards(&self, operation: OperationKind) -> Result<Vec<ShardRef>, Error> {
        let mut shards = self.directory.get_all_clients(DataElement::User, operation)?;
        shards.extend(
            self.directory
                .get_all_clients(DataElement::Group, operation)?,
        );
        Ok(shards)
    }

    /// Register an entity type on every user and group shard.
    pub async fn add_entity_type(&self, entity_type: &str) -> Result<(), Error> {
        let guard = self.begin(CoordinatorMetric::AddEntityType);
        let shards = self.entity_shards(OperationKind::Event)?;
        let action = format!("add entity type '{}' to", entity_type);
        let entity_type = entity_type.to_owned();

        fanout::all(shards, Policy::new(&action), move |shard| {
            let entity_type = entity_type.clone();
            async move { shard.client().add_entity_type(&entity_type).await }
        })
        .await?;

        guard.complete();
        Ok(())
    }

    /// Whether any user or group shard knows the entity type.
    pub async fn contains_entity_type(&self, entity_type: &str) -> Result<bool, Error> {
        let guard = self.begin(CoordinatorMetric::ContainsEntityType);
        let shards = self.entity_shards(OperationKind::Query)?;
        let action = format!("check for entity type '{}' in", entity_type);
        let entity_type = entity_type.to_owned();

        let found = fanout::any(shards, Policy::benign_not_found(&action), move |shard| {
            let entity_type = entity_type.clone();
            async move { shard.client().contains_entity_type(&entity_type).await }
        })
        .await?;

        guard.complete();
        Ok(found)
    }

    /// Remove an entity type from every user and group shard.
    pub async fn remove_entity_type(&self, entity_type: &str) -> Result<(), Error> {
        let guard = self.begin(CoordinatorMetric::RemoveEntityType);
        let shards = self.entity_shards(OperationKind::Event)?;
        let action = format!("remove entity type '{}' from", entity_type);
        let entity_type = entity_type.to_owned();

        fanout::all(shards, Policy::new(&action), move |shard| {
            let entity_type = entity_type.clone();
            async move { shard.client().remove_entity_type(&entity_type).await }
        })
        .await?;

        guard.complete();
        Ok(())
    }

    /// All entity types known anywhere in the fleet.
    pub async fn get_entity_types(&self) -> Result<HashSet<String>, Error> {
        let guard = self.begin(CoordinatorMetric::GetEntityTypes);
        let shards = self.entity_shards(OperationKind::Query)?;

        let types = fanout::union(
            shards,
            Policy::new("retrieve entity types from"),
            |shard| async move { shard.client().get_entity_types().await },
        )
        .await?;

        guard.complete();
        Ok(types)
    }

    /// Register an entity on every user and group shard.
    pub async fn add_entity(&self, entity_type: &str, entity: &str) -> Result<(), Error> {
        let guard = self.begin(CoordinatorMetric::AddEntity);
        let shards = self.entity_shards(OperationKind::Event)?;
        let action = format!("add entity '{}' with type '{}' to", entity, entity_type);
        let entity_type = entity_type.to_owned();
        let entity = entity.to_owned();

        fanout::all(shards, Policy::new(&action), move |shard| {
            let entity_type = entity_type.clone();
            let entity = entity.clone();
            async move { shard.client().add_entity(&entity_type, &entity).await }
        })
        .await?;

        guard.complete();
        Ok(())
    }

    /// Whether any user or group shard knows the entity.
    pub async fn contains_entity(&self, entity_type: &str, entity: &str) -> Result<bool, Error> {
        let guard = self.begin(CoordinatorMetric::ContainsEntity);
        let shards = self.entity_shards(OperationKind::Query)?;
        let action = format!("check for entity '{}' with type '{}' in", entity, entity_type);
        let entity_type = entity_type.to_owned();
        let entity = entity.to_owned();

        let found = fanout::any(shards, Policy::benign_not_found(&action), move |shard| {
            let entity_type = entity_type.clone();
            let entity = entity.clone();
            async move { shard.client().contains_entity(&entity_type, &entity).await }
        })
        .await?;

        guard.complete();
        Ok(found)
    }

    /// Remove an entity from every user and group shard.
    pub async fn remove_entity(&self, entity_type: &str, entity: &str) -> Result<(), Error> {
        let guard = self.begin(CoordinatorMetric::RemoveEntity);
        let shards = self.entity_shards(OperationKind::Event)?;
        let action = format!("remove entity '{}' with type '{}' from", entity, entity_type);
        let entity_type = entity_type.to_owned();
        let entity = entity.to_owned();

        fanout::all(shards, Policy::new(&action), move |shard| {
            let entity_type = entity_type.clone();
            let entity = entity.clone();
            async move { shard.client().remove_entity(&entity_type, &entity).await }
        })
        .await?;

        guard.complete();
        Ok(())
    }

    /// All entities of one type, unioned across user and group shards.
    /// Shards unaware of the type contribute nothing.
    pub async fn get_entities(&self, entity_type: &str) -> Result<HashSet<String>, Error> {
        let guard = self.begin(CoordinatorMetric::GetEntities);
        let shards = self.entity_shards(OperationKind::Query)?;
        let action = format!("retrieve entities of type '{}' from", entity_type);
        let entity_type = entity_type.to_owned();

        let entities = fanout::union(shards, Policy::benign_not_found(&action), move |shard| {
            let entity_type = entity_type.clone();
            async move { shard.client().get_entities(&entity_type).await }
        })
        .await?;

        guard.complete();
        Ok(entities)
    }
}
