//! Entity mapping operations.

use std::collections::HashSet;

use accessmux_stats::CoordinatorMetric;

use crate::directory::{DataElement, OperationKind};
use crate::fanout::{self, Policy};

use super::{Coordinator, Error};

impl Coordinator {
    /// Map `user` to the entity.
    pub async fn add_user_to_entity_mapping(
        &self,
        user: &str,
        entity_type: &str,
        entity: &str,
    ) -> Result<(), Error> {
        let guard = self.begin(CoordinatorMetric::AddUserToEntityMapping);
        let shard =
            self.directory
                .get_client(DataElement::User, OperationKind::Event, user)?;
        let action = format!(
            "add a mapping between user '{}' and entity '{}' with type '{}' to",
            user, entity, entity_type
        );

        shard
            .client()
            .add_user_to_entity_mapping(user, entity_type, entity)
            .await
            .map_err(|err| Error::from_client(&action, shard.description(), err))?;

        guard.complete();
        Ok(())
    }

    /// Unmap `user` from the entity.
    pub async fn remove_user_to_entity_mapping(
        &self,
        user: &str,
        entity_type: &str,
        entity: &str,
    ) -> Result<(), Error> {
        let guard = self.begin(CoordinatorMetric::RemoveUserToEntityMapping);
        let shard =
            self.directory
                .get_client(DataElement::User, OperationKind::Event, user)?;
        let action = format!(
            "remove the mapping between user '{}' and entity '{}' with type '{}' from",
            user, entity, entity_type
        );

        shard
            .client()
            .remove_user_to_entity_mapping(user, entity_type, entity)
            .await
            .map_err(|err| Error::from_client(&action, shard.description(), err))?;

        guard.complete();
        Ok(())
    }

    /// Entity type and entity pairs mapped directly to `user`.
    pub async fn get_user_to_entity_mappings(
        &self,
        user: &str,
    ) -> Result<HashSet<(String, String)>, Error> {
        let guard = self.begin(CoordinatorMetric::GetUserToEntityMappings);
        let shard =
            self.directory
                .get_client(DataElement::User, OperationKind::Query, user)?;
        let action = format!("retrieve user to entity mappings for user '{}' from", user);

        let mappings = shard
            .client()
            .get_user_to_entity_mappings(user)
            .await
            .map_err(|err| Error::from_client(&action, shard.description(), err))?;

        guard.complete();
        Ok(mappings)
    }

    /// Entities of one type mapped directly to `user`.
    pub async fn get_user_to_entity_mappings_of_type(
        &self,
        user: &str,
        entity_type: &str,
    ) -> Result<HashSet<String>, Error> {
        let guard = self.begin(CoordinatorMetric::GetUserToEntityMappingsOfType);
        let shard =
            self.directory
                .get_client(DataElement::User, OperationKind::Query, user)?;
        let action = format!(
            "retrieve user to entity mappings for user '{}' and entity type '{}' from",
            user, entity_type
        );

        let mappings = shard
            .client()
            .get_user_to_entity_mappings_of_type(user, entity_type)
            .await
            .map_err(|err| Error::from_client(&action, shard.description(), err))?;

        guard.complete();
        Ok(mappings)
    }

    /// Users mapped to the entity. The indirect form also includes users
    /// reaching it through group membership. Shards unaware of the entity
    /// type or entity contribute nothing.
    pub async fn get_entity_to_user_mappings(
        &self,
        entity_type: &str,
        entity: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, Error> {
        let guard = self.begin(CoordinatorMetric::GetEntityToUserMappings);
        let resolver = self.resolver();

        let mut users = self.entity_users_direct(entity_type, entity).await?;

        if include_indirect {
            let seed = self.entity_groups_direct(entity_type, entity).await?;
            if seed.is_empty() {
                self.record_traversal(CoordinatorMetric::GroupsMappedToGroup, 0, 0);
            } else {
                let (mut groups, shards_queried) = resolver.reverse_group_closure(&seed).await?;
                groups.extend(seed);
                self.record_traversal(
                    CoordinatorMetric::GroupsMappedToGroup,
                    groups.len() as u64,
                    shards_queried,
                );
                users.extend(resolver.users_mapped_to_groups(&groups).await?);
            }
        }

        guard.complete();
        Ok(users)
    }

    /// Map `group` to the entity.
    pub async fn add_group_to_entity_mapping(
        &self,
        group: &str,
        entity_type: &str,
        entity: &str,
    ) -> Result<(), Error> {
        let guard = self.begin(CoordinatorMetric::AddGroupToEntityMapping);
        let shard =
            self.directory
                .get_client(DataElement::Group, OperationKind::Event, group)?;
        let action = format!(
            "add a mapping between group '{}' and entity '{}' with type '{}' to",
            group, entity, entity_type
        );

        shard
            .client()
            .add_group_to_entity_mapping(group, entity_type, entity)
            .await
            .map_err(|err| Error::from_client(&action, shard.description(), err))?;

        guard.complete();
        Ok(())
    }

    /// Unmap `group` from the entity.
    pub async fn remove_group_to_entity_mapping(
        &self,
        group: &str,
        entity_type: &str,
        entity: &str,
    ) -> Result<(), Error> {
        let guard = self.begin(CoordinatorMetric::RemoveGroupToEntityMapping);
        let shard =
            self.directory
                .get_client(DataElement::Group, OperationKind::Event, group)?;
        let action = format!(
            "remove the mapping between group '{}' and entity '{}' with type '{}' from",
            group, entity, entity_type
        );

        shard
            .client()
            .remove_group_to_entity_mapping(group, entity_type, entity)
            .await
            .map_err(|err| Error::from_client(&action, shard.description(), err))?;

        guard.complete();
        Ok(())
    }

    /// Entity type and entity pairs mapped directly to `group`.
    pub async fn get_group_to_entity_mappings(
        &self,
        group: &str,
    ) -> Result<HashSet<(String, String)>, Error> {
        let guard = self.begin(CoordinatorMetric::GetGroupToEntityMappings);
        let shard =
            self.directory
                .get_client(DataElement::Group, OperationKind::Query, group)?;
        let action = format!("retrieve group to entity mappings for group '{}' from", group);

        let mappings = shard
            .client()
            .get_group_to_entity_mappings(group)
            .await
            .map_err(|err| Error::from_client(&action, shard.description(), err))?;

        guard.complete();
        Ok(mappings)
    }

    /// Entities of one type mapped directly to `group`.
    pub async fn get_group_to_entity_mappings_of_type(
        &self,
        group: &str,
        entity_type: &str,
    ) -> Result<HashSet<String>, Error> {
        let guard = self.begin(CoordinatorMetric::GetGroupToEntityMappingsOfType);
        let shard =
            self.directory
                .get_client(DataElement::Group, OperationKind::Query, group)?;
        let action = format!(
            "retrieve group to entity mappings for group '{}' and entity type '{}' from",
            group, entity_type
        );

        let mappings = shard
            .client()
            .get_group_to_entity_mappings_of_type(group, entity_type)
            .await
            .map_err(|err| Error::from_client(&action, shard.description(), err))?;

        guard.complete();
        Ok(mappings)
    }

    /// Groups mapped to the entity, optionally including groups reaching it
    /// through the group graph.
    pub async fn get_entity_to_group_mappings(
        &self,
        entity_type: &str,
        entity: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, Error> {
        let guard = self.begin(CoordinatorMetric::GetEntityToGroupMappings);

        let mut groups = self.entity_groups_direct(entity_type, entity).await?;

        if include_indirect {
            if groups.is_empty() {
                self.record_traversal(CoordinatorMetric::GroupsMappedToGroup, 0, 0);
            } else {
                let (reverse, shards_queried) =
                    self.resolver().reverse_group_closure(&groups).await?;
                groups.extend(reverse);
                self.record_traversal(
                    CoordinatorMetric::GroupsMappedToGroup,
                    groups.len() as u64,
                    shards_queried,
                );
            }
        }

        guard.complete();
        Ok(groups)
    }

    async fn entity_users_direct(
        &self,
        entity_type: &str,
        entity: &str,
    ) -> Result<HashSet<String>, Error> {
        let shards = self
            .directory
            .get_all_clients(DataElement::User, OperationKind::Query)?;
        let action = "retrieve entity to user mappings from";
        let entity_type = entity_type.to_owned();
        let entity = entity.to_owned();

        fanout::union(shards, Policy::benign_not_found(action), move |shard| {
            let entity_type = entity_type.clone();
            let entity = entity.clone();
            async move {
                shard
                    .client()
                    .get_entity_to_user_mappings(&entity_type, &entity, false)
                    .await
            }
        })
        .await
    }

    async fn entity_groups_direct(
        &self,
        entity_type: &str,
        entity: &str,
    ) -> Result<HashSet<String>, Error> {
        let shards = self
            .directory
            .get_all_clients(DataElement::Group, OperationKind::Query)?;
        let action = "retrieve entity to group mappings from";
        let entity_type = entity_type.to_owned();
        let entity = entity.to_owned();

        fanout::union(shards, Policy::benign_not_found(action), move |shard| {
            let entity_type = entity_type.clone();
            let entity = entity.clone();
            async move {
                shard
                    .client()
                    .get_entity_to_group_mappings(&entity_type, &entity, false)
                    .await
            }
        })
        .await
    }
}
