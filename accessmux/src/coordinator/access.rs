//! Authorization queries.
//!
//! These are the traversal-driven reads: the answer is assembled from the
//! user's own shard and from the group layer reached through the
//! group-to-group closure. The user-shard leg and the traversal run
//! concurrently. For the boolean queries a missing user means "no access";
//! for the list queries it propagates as a typed error.

use std::collections::HashSet;

use accessmux_stats::CoordinatorMetric;

use crate::directory::{DataElement, OperationKind};
use crate::shard::ClientError;

use super::{Coordinator, Error};

impl Coordinator {
    /// Whether `user` can act on the component at the level, directly or
    /// through any group reachable from the user.
    pub async fn has_access_to_application_component(
        &self,
        user: &str,
        component: &str,
        access_level: &str,
    ) -> Result<bool, Error> {
        let guard = self.begin(CoordinatorMetric::HasAccessToApplicationComponent);
        let resolver = self.resolver();

        let direct = async {
            let shard =
                self.directory
                    .get_client(DataElement::User, OperationKind::Query, user)?;
            let action = format!("check application component access for user '{}' on", user);
            shard
                .client()
                .has_access_to_application_component(user, component, access_level)
                .await
                .map_err(|err| Error::from_client(&action, shard.description(), err))
        };
        let via_groups = async {
            let groups = resolver.user_group_closure(user).await?;
            let (granted, shards) = resolver
                .groups_have_access_to_component(&groups, component, access_level)
                .await?;
            Ok::<_, Error>((groups.len() as u64, granted, shards))
        };

        let (direct, via_groups) = futures::join!(direct, via_groups);

        if matches!(direct, Err(Error::UserNotFound(_)))
            || matches!(via_groups, Err(Error::UserNotFound(_)))
        {
            self.deny_unknown_user(guard);
            return Ok(false);
        }

        let direct = direct?;
        let (mapped, granted, shards) = via_groups?;
        self.record_traversal(CoordinatorMetric::GroupsMappedToUser, mapped, shards);

        guard.complete();
        Ok(direct || granted)
    }

    /// Whether `user` can act on the entity, directly or through any group
    /// reachable from the user.
    pub async fn has_access_to_entity(
        &self,
        user: &str,
        entity_type: &str,
        entity: &str,
    ) -> Result<bool, Error> {
        let guard = self.begin(CoordinatorMetric::HasAccessToEntity);
        let resolver = self.resolver();

        let direct = async {
            let shard =
                self.directory
                    .get_client(DataElement::User, OperationKind::Query, user)?;
            let action = format!("check entity access for user '{}' on", user);
            match shard
                .client()
                .has_access_to_entity(user, entity_type, entity)
                .await
            {
                Ok(granted) => Ok(granted),
                Err(err) if err.is_not_found() && !matches!(err, ClientError::UserNotFound(_)) => {
                    Ok(false)
                }
                Err(err) => Err(Error::from_client(&action, shard.description(), err)),
            }
        };
        let via_groups = async {
            let groups = resolver.user_group_closure(user).await?;
            let (granted, shards) = resolver
                .groups_have_access_to_entity(&groups, entity_type, entity)
                .await?;
            Ok::<_, Error>((groups.len() as u64, granted, shards))
        };

        let (direct, via_groups) = futures::join!(direct, via_groups);

        if matches!(direct, Err(Error::UserNotFound(_)))
            || matches!(via_groups, Err(Error::UserNotFound(_)))
        {
            self.deny_unknown_user(guard);
            return Ok(false);
        }

        let direct = direct?;
        let (mapped, granted, shards) = via_groups?;
        self.record_traversal(CoordinatorMetric::GroupsMappedToUser, mapped, shards);

        guard.complete();
        Ok(direct || granted)
    }

    /// Component and access level pairs `user` can act on, directly or
    /// through group membership.
    pub async fn get_application_components_accessible_by_user(
        &self,
        user: &str,
    ) -> Result<HashSet<(String, String)>, Error> {
        let guard = self.begin(CoordinatorMetric::GetApplicationComponentsAccessibleByUser);
        let resolver = self.resolver();

        let direct = async {
            let shard =
                self.directory
                    .get_client(DataElement::User, OperationKind::Query, user)?;
            let action = format!(
                "retrieve application components accessible by user '{}' from",
                user
            );
            shard
                .client()
                .get_application_components_accessible_by_user(user)
                .await
                .map_err(|err| Error::from_client(&action, shard.description(), err))
        };

        let (direct, groups) = futures::join!(direct, resolver.user_group_closure(user));
        let mut components = direct?;
        let groups = groups?;

        let (from_groups, shards) = resolver.components_accessible_by_groups(&groups).await?;
        components.extend(from_groups);
        self.record_traversal(
            CoordinatorMetric::GroupsMappedToUser,
            groups.len() as u64,
            shards,
        );

        guard.complete();
        Ok(components)
    }

    /// Component and access level pairs `group` can act on, directly or
    /// through the group graph.
    pub async fn get_application_components_accessible_by_group(
        &self,
        group: &str,
    ) -> Result<HashSet<(String, String)>, Error> {
        let guard = self.begin(CoordinatorMetric::GetApplicationComponentsAccessibleByGroup);
        let resolver = self.resolver();

        let groups = resolver.group_closure(group).await?;
        let (components, shards) = resolver.components_accessible_by_groups(&groups).await?;
        self.record_traversal(
            CoordinatorMetric::GroupsMappedToGroup,
            groups.len() as u64 - 1,
            shards,
        );

        guard.complete();
        Ok(components)
    }

    /// Entity type and entity pairs `user` can act on.
    pub async fn get_entities_accessible_by_user(
        &self,
        user: &str,
    ) -> Result<HashSet<(String, String)>, Error> {
        let guard = self.begin(CoordinatorMetric::GetEntitiesAccessibleByUser);
        let resolver = self.resolver();

        let direct = async {
            let shard =
                self.directory
                    .get_client(DataElement::User, OperationKind::Query, user)?;
            let action = format!("retrieve entities accessible by user '{}' from", user);
            shard
                .client()
                .get_entities_accessible_by_user(user)
                .await
                .map_err(|err| Error::from_client(&action, shard.description(), err))
        };

        let (direct, groups) = futures::join!(direct, resolver.user_group_closure(user));
        let mut entities = direct?;
        let groups = groups?;

        let (from_groups, shards) = resolver.entities_accessible_by_groups(&groups).await?;
        entities.extend(from_groups);
        self.record_traversal(
            CoordinatorMetric::GroupsMappedToUser,
            groups.len() as u64,
            shards,
        );

        guard.complete();
        Ok(entities)
    }

    /// Entities of one type `user` can act on. An entity type unknown to
    /// the user's shard contributes nothing rather than failing the query.
    pub async fn get_entities_accessible_by_user_of_type(
        &self,
        user: &str,
        entity_type: &str,
    ) -> Result<HashSet<String>, Error> {
        let guard = self.begin(CoordinatorMetric::GetEntitiesAccessibleByUserOfType);
        let resolver = self.resolver();

        let direct = async {
            let shard =
                self.directory
                    .get_client(DataElement::User, OperationKind::Query, user)?;
            let action = format!(
                "retrieve entities of type '{}' accessible by user '{}' from",
                entity_type, user
            );
            match shard
                .client()
                .get_entities_of_type_accessible_by_user(user, entity_type)
                .await
            {
                Ok(entities) => Ok(entities),
                Err(ClientError::EntityTypeNotFound(_)) => Ok(HashSet::new()),
                Err(err) => Err(Error::from_client(&action, shard.description(), err)),
            }
        };

        let (direct, groups) = futures::join!(direct, resolver.user_group_closure(user));
        let mut entities = direct?;
        let groups = groups?;

        let (from_groups, shards) = resolver
            .entities_of_type_accessible_by_groups(&groups, entity_type)
            .await?;
        entities.extend(from_groups);
        self.record_traversal(
            CoordinatorMetric::GroupsMappedToUser,
            groups.len() as u64,
            shards,
        );

        guard.complete();
        Ok(entities)
    }

    /// Entity type and entity pairs `group` can act on.
    pub async fn get_entities_accessible_by_group(
        &self,
        group: &str,
    ) -> Result<HashSet<(String, String)>, Error> {
        let guard = self.begin(CoordinatorMetric::GetEntitiesAccessibleByGroup);
        let resolver = self.resolver();

        let groups = resolver.group_closure(group).await?;
        let (entities, shards) = resolver.entities_accessible_by_groups(&groups).await?;
        self.record_traversal(
            CoordinatorMetric::GroupsMappedToGroup,
            groups.len() as u64 - 1,
            shards,
        );

        guard.complete();
        Ok(entities)
    }

    /// Entities of one type `group` can act on.
    pub async fn get_entities_accessible_by_group_of_type(
        &self,
        group: &str,
        entity_type: &str,
    ) -> Result<HashSet<String>, Error> {
        let guard = self.begin(CoordinatorMetric::GetEntitiesAccessibleByGroupOfType);
        let resolver = self.resolver();

        let groups = resolver.group_closure(group).await?;
        let (entities, shards) = resolver
            .entities_of_type_accessible_by_groups(&groups, entity_type)
            .await?;
        self.record_traversal(
            CoordinatorMetric::GroupsMappedToGroup,
            groups.len() as u64 - 1,
            shards,
        );

        guard.complete();
        Ok(entities)
    }

    fn deny_unknown_user(&self, guard: accessmux_stats::MetricGuard<'_>) {
        self.record_traversal(CoordinatorMetric::GroupsMappedToUser, 0, 0);
        guard.complete();
    }
}
