//! Application component and access level mapping operations.

use std::collections::HashSet;

use accessmux_stats::CoordinatorMetric;

use crate::directory::{DataElement, OperationKind};
use crate::fanout::{self, Policy};

use super::{Coordinator, Error};

impl Coordinator {
    /// Grant `user` the access level on the component.
    pub async fn add_user_to_application_component_and_access_level_mapping(
        &self,
        user: &str,
        component: &str,
        access_level: &str,
    ) -> Result<(), Error> {
        let guard =
            self.begin(CoordinatorMetric::AddUserToApplicationComponentAndAccessLevelMapping);
        let shard =
            self.directory
                .get_client(DataElement::User, OperationKind::Event, user)?;
        let action = format!(
            "add a mapping between user '{}' and application component '{}' at access level '{}' to",
            user, component, access_level
        );

        shard
            .client()
            .add_user_to_application_component_and_access_level_mapping(
                user,
                component,
                access_level,
            )
            .await
            .map_err(|err| Error::from_client(&action, shard.description(), err))?;

        guard.complete();
        Ok(())
    }

    /// Revoke the grant.
    pub async fn remove_user_to_application_component_and_access_level_mapping(
        &self,
        user: &str,
        component: &str,
        access_level: &str,
    ) -> Result<(), Error> {
        let guard =
            self.begin(CoordinatorMetric::RemoveUserToApplicationComponentAndAccessLevelMapping);
        let shard =
            self.directory
                .get_client(DataElement::User, OperationKind::Event, user)?;
        let action = format!(
            "remove the mapping between user '{}' and application component '{}' at access level '{}' from",
            user, component, access_level
        );

        shard
            .client()
            .remove_user_to_application_component_and_access_level_mapping(
                user,
                component,
                access_level,
            )
            .await
            .map_err(|err| Error::from_client(&action, shard.description(), err))?;

        guard.complete();
        Ok(())
    }

    /// Component and access level pairs mapped directly to `user`.
    pub async fn get_user_to_application_component_and_access_level_mappings(
        &self,
        user: &str,
    ) -> Result<HashSet<(String, String)>, Error> {
        let guard =
            self.begin(CoordinatorMetric::GetUserToApplicationComponentAndAccessLevelMappings);
        let shard =
            self.directory
                .get_client(DataElement::User, OperationKind::Query, user)?;
        let action = format!(
            "retrieve user to application component and access level mappings for user '{}' from",
            user
        );

        let mappings = shard
            .client()
            .get_user_to_application_component_and_access_level_mappings(user)
            .await
            .map_err(|err| Error::from_client(&action, shard.description(), err))?;

        guard.complete();
        Ok(mappings)
    }

    /// Users granted the component at the level. The indirect form also
    /// includes users reaching the grant through group membership.
    pub async fn get_application_component_and_access_level_to_user_mappings(
        &self,
        component: &str,
        access_level: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, Error> {
        let guard =
            self.begin(CoordinatorMetric::GetApplicationComponentAndAccessLevelToUserMappings);
        let resolver = self.resolver();

        let mut users = self
            .component_users_direct(component, access_level)
            .await?;

        if include_indirect {
            let seed = self
                .component_groups_direct(component, access_level)
                .await?;
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

    /// Grant `group` the access level on the component.
    pub async fn add_group_to_application_component_and_access_level_mapping(
        &self,
        group: &str,
        component: &str,
        access_level: &str,
    ) -> Result<(), Error> {
        let guard =
            self.begin(CoordinatorMetric::AddGroupToApplicationComponentAndAccessLevelMapping);
        let shard =
            self.directory
                .get_client(DataElement::Group, OperationKind::Event, group)?;
        let action = format!(
            "add a mapping between group '{}' and application component '{}' at access level '{}' to",
            group, component, access_level
        );

        shard
            .client()
            .add_group_to_application_component_and_access_level_mapping(
                group,
                component,
                access_level,
            )
            .await
            .map_err(|err| Error::from_client(&action, shard.description(), err))?;

        guard.complete();
        Ok(())
    }

    /// Revoke the group grant.
    pub async fn remove_group_to_application_component_and_access_level_mapping(
        &self,
        group: &str,
        component: &str,
        access_level: &str,
    ) -> Result<(), Error> {
        let guard =
            self.begin(CoordinatorMetric::RemoveGroupToApplicationComponentAndAccessLevelMapping);
        let shard =
            self.directory
                .get_client(DataElement::Group, OperationKind::Event, group)?;
        let action = format!(
            "remove the mapping between group '{}' and application component '{}' at access level '{}' from",
            group, component, access_level
        );

        shard
            .client()
            .remove_group_to_application_component_and_access_level_mapping(
                group,
                component,
                access_level,
            )
            .await
            .map_err(|err| Error::from_client(&action, shard.description(), err))?;

        guard.complete();
        Ok(())
    }

    /// Component and access level pairs mapped directly to `group`.
    pub async fn get_group_to_application_component_and_access_level_mappings(
        &self,
        group: &str,
    ) -> Result<HashSet<(String, String)>, Error> {
        let guard =
            self.begin(CoordinatorMetric::GetGroupToApplicationComponentAndAccessLevelMappings);
        let shard =
            self.directory
                .get_client(DataElement::Group, OperationKind::Query, group)?;
        let action = format!(
            "retrieve group to application component and access level mappings for group '{}' from",
            group
        );

        let mappings = shard
            .client()
            .get_group_to_application_component_and_access_level_mappings(group)
            .await
            .map_err(|err| Error::from_client(&action, shard.description(), err))?;

        guard.complete();
        Ok(mappings)
    }

    /// Groups granted the component at the level, optionally including
    /// groups reaching the grant through the group graph.
    pub async fn get_application_component_and_access_level_to_group_mappings(
        &self,
        component: &str,
        access_level: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, Error> {
        let guard =
            self.begin(CoordinatorMetric::GetApplicationComponentAndAccessLevelToGroupMappings);

        let mut groups = self
            .component_groups_direct(component, access_level)
            .await?;

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

    async fn component_users_direct(
        &self,
        component: &str,
        access_level: &str,
    ) -> Result<HashSet<String>, Error> {
        let shards = self
            .directory
            .get_all_clients(DataElement::User, OperationKind::Query)?;
        let action = "retrieve application component and access level to user mappings from";
        let component = component.to_owned();
        let access_level = access_level.to_owned();

        fanout::union(shards, Policy::benign_not_found(action), move |shard| {
            let component = component.clone();
            let access_level = access_level.clone();
            async move {
                shard
                    .client()
                    .get_application_component_and_access_level_to_user_mappings(
                        &component,
                        &access_level,
                        false,
                    )
                    .await
            }
        })
        .await
    }

    async fn component_groups_direct(
        &self,
        component: &str,
        access_level: &str,
    ) -> Result<HashSet<String>, Error> {
        let shards = self
            .directory
            .get_all_clients(DataElement::Group, OperationKind::Query)?;
        let action = "retrieve application component and access level to group mappings from";
        let component = component.to_owned();
        let access_level = access_level.to_owned();

        fanout::union(shards, Policy::benign_not_found(action), move |shard| {
            let component = component.clone();
            let access_level = access_level.clone();
            async move {
                shard
                    .client()
                    .get_application_component_and_access_level_to_group_mappings(
                        &component,
                        &access_level,
                        false,
                    )
                    .await
            }
        })
        .await
    }
}
