//! User-to-group and group-to-group mapping operations.

use std::collections::HashSet;

use accessmux_stats::CoordinatorMetric;

use crate::directory::{DataElement, OperationKind};
use crate::fanout::{self, Policy};
use crate::shard::ClientError;

use super::{Coordinator, Error};

impl Coordinator {
    /// Map `user` into `group` on the shard owning the user.
    pub async fn add_user_to_group_mapping(&self, user: &str, group: &str) -> Result<(), Error> {
        let guard = self.begin(CoordinatorMetric::AddUserToGroupMapping);
        let shard =
            self.directory
                .get_client(DataElement::User, OperationKind::Event, user)?;
        let action = format!(
            "add a mapping between user '{}' and group '{}' to",
            user, group
        );

        shard
            .client()
            .add_user_to_group_mapping(user, group)
            .await
            .map_err(|err| Error::from_client(&action, shard.description(), err))?;

        guard.complete();
        Ok(())
    }

    /// Unmap `user` from `group` on the shard owning the user.
    pub async fn remove_user_to_group_mapping(
        &self,
        user: &str,
        group: &str,
    ) -> Result<(), Error> {
        let guard = self.begin(CoordinatorMetric::RemoveUserToGroupMapping);
        let shard =
            self.directory
                .get_client(DataElement::User, OperationKind::Event, user)?;
        let action = format!(
            "remove the mapping between user '{}' and group '{}' from",
            user, group
        );

        shard
            .client()
            .remove_user_to_group_mapping(user, group)
            .await
            .map_err(|err| Error::from_client(&action, shard.description(), err))?;

        guard.complete();
        Ok(())
    }

    /// Groups mapped to `user`, optionally expanded through the
    /// group-to-group graph. A missing user is an error here, unlike in the
    /// Has-access queries.
    pub async fn get_user_to_group_mappings(
        &self,
        user: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, Error> {
        let guard = self.begin(CoordinatorMetric::GetUserToGroupMappings);
        let resolver = self.resolver();

        let direct = resolver.direct_user_groups(user).await?;
        if !include_indirect {
            guard.complete();
            return Ok(direct);
        }

        let (groups, shards_queried) = resolver.transitive_closure(&direct).await?;
        self.record_traversal(
            CoordinatorMetric::GroupsMappedToUser,
            groups.len() as u64,
            shards_queried,
        );

        guard.complete();
        Ok(groups)
    }

    /// Users mapped to `group`. The direct form asks every user shard; the
    /// indirect form first collects the groups from which `group` is
    /// reachable and asks the user shards about the whole set.
    pub async fn get_group_to_user_mappings(
        &self,
        group: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, Error> {
        let guard = self.begin(CoordinatorMetric::GetGroupToUserMappings);
        let resolver = self.resolver();

        let users = if include_indirect {
            let seed: HashSet<String> = [group.to_owned()].into();
            let (mut groups, shards_queried) = resolver.reverse_group_closure(&seed).await?;
            self.record_traversal(
                CoordinatorMetric::GroupsMappedToGroup,
                groups.len() as u64,
                shards_queried,
            );
            groups.insert(group.to_owned());
            resolver.users_mapped_to_groups(&groups).await?
        } else {
            let shards = self
                .directory
                .get_all_clients(DataElement::User, OperationKind::Query)?;
            let action = format!("retrieve group to user mappings for group '{}' from", group);
            let group = group.to_owned();

            fanout::union(shards, Policy::benign_not_found(&action), move |shard| {
                let group = group.clone();
                async move { shard.client().get_group_to_user_mappings(&group, false).await }
            })
            .await?
        };

        guard.complete();
        Ok(users)
    }

    /// Map `from_group` into `to_group` on the shard owning the source
    /// group's mappings.
    pub async fn add_group_to_group_mapping(
        &self,
        from_group: &str,
        to_group: &str,
    ) -> Result<(), Error> {
        let guard = self.begin(CoordinatorMetric::AddGroupToGroupMapping);
        let shard = self.directory.get_client(
            DataElement::GroupToGroupMapping,
            OperationKind::Event,
            from_group,
        )?;
        let action = format!(
            "add a mapping between groups '{}' and '{}' to",
            from_group, to_group
        );

        shard
            .client()
            .add_group_to_group_mapping(from_group, to_group)
            .await
            .map_err(|err| Error::from_client(&action, shard.description(), err))?;

        guard.complete();
        Ok(())
    }

    /// Unmap `from_group` from `to_group`.
    pub async fn remove_group_to_group_mapping(
        &self,
        from_group: &str,
        to_group: &str,
    ) -> Result<(), Error> {
        let guard = self.begin(CoordinatorMetric::RemoveGroupToGroupMapping);
        let shard = self.directory.get_client(
            DataElement::GroupToGroupMapping,
            OperationKind::Event,
            from_group,
        )?;
        let action = format!(
            "remove the mapping between groups '{}' and '{}' from",
            from_group, to_group
        );

        shard
            .client()
            .remove_group_to_group_mapping(from_group, to_group)
            .await
            .map_err(|err| Error::from_client(&action, shard.description(), err))?;

        guard.complete();
        Ok(())
    }

    /// Groups that `group` maps to. An unknown group yields the empty set,
    /// matching a group that simply has no mappings.
    pub async fn get_group_to_group_mappings(
        &self,
        group: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, Error> {
        let guard = self.begin(CoordinatorMetric::GetGroupToGroupMappings);
        let shard = self.directory.get_client(
            DataElement::GroupToGroupMapping,
            OperationKind::Query,
            group,
        )?;
        let action = format!(
            "retrieve group to group mappings for group '{}' from",
            group
        );

        let direct = match shard.client().get_group_to_group_mappings(group, false).await {
            Ok(groups) => groups,
            Err(ClientError::GroupNotFound(_)) => {
                if include_indirect {
                    self.record_traversal(CoordinatorMetric::GroupsMappedToGroup, 0, 0);
                }
                guard.complete();
                return Ok(HashSet::new());
            }
            Err(err) => return Err(Error::from_client(&action, shard.description(), err)),
        };

        if !include_indirect {
            guard.complete();
            return Ok(direct);
        }

        // Empty direct set short-circuits inside the closure helper.
        let (groups, shards_queried) = self.resolver().transitive_closure(&direct).await?;
        self.record_traversal(
            CoordinatorMetric::GroupsMappedToGroup,
            groups.len() as u64,
            shards_queried,
        );

        guard.complete();
        Ok(groups)
    }

    /// Groups that map to `group`. Reverse edges live on the shards of the
    /// mapping groups, so both forms ask every group-to-group shard.
    pub async fn get_group_to_group_reverse_mappings(
        &self,
        group: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, Error> {
        let guard = self.begin(CoordinatorMetric::GetGroupToGroupReverseMappings);

        let groups = if include_indirect {
            let seed: HashSet<String> = [group.to_owned()].into();
            let (groups, shards_queried) = self.resolver().reverse_group_closure(&seed).await?;
            self.record_traversal(
                CoordinatorMetric::GroupsMappedToGroup,
                groups.len() as u64,
                shards_queried,
            );
            groups
        } else {
            let shards = self
                .directory
                .get_all_clients(DataElement::GroupToGroupMapping, OperationKind::Query)?;
            let action = format!(
                "retrieve group to group reverse mappings for group '{}' from",
                group
            );
            let group = group.to_owned();

            fanout::union(shards, Policy::benign_not_found(&action), move |shard| {
                let group = group.clone();
                async move {
                    shard
                        .client()
                        .get_group_to_group_reverse_mappings(&group, false)
                        .await
                }
            })
            .await?
        };

        guard.complete();
        Ok(groups)
    }
}
