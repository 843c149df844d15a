//! Transitive user/group traversal.
//!
//! Authorization answers are spread over three shard layers: the user shard
//! holding the user's direct groups, the group-to-group shards holding the
//! mapping graph, and the group shards holding group-level permissions. The
//! resolver walks those layers, visiting each at most once, and hands the
//! group layer a single batched set per owning shard.

use std::collections::HashSet;

use crate::coordinator::Error;
use crate::directory::{DataElement, OperationKind, ShardDirectory};
use crate::fanout::{self, Policy};

/// Stateless traversal engine borrowing the directory per call.
pub(crate) struct Resolver<'a> {
    directory: &'a dyn ShardDirectory,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(directory: &'a dyn ShardDirectory) -> Self {
        Self { directory }
    }

    /// Phase 1: the groups `user` is directly mapped to. A missing user
    /// surfaces as a typed error for the caller to translate per query.
    pub(crate) async fn direct_user_groups(&self, user: &str) -> Result<HashSet<String>, Error> {
        let shard =
            self.directory
                .get_client(DataElement::User, OperationKind::Query, user)?;
        let action = format!("retrieve user to group mappings for user '{}' from", user);

        shard
            .client()
            .get_user_to_group_mappings(user, false)
            .await
            .map_err(|err| Error::from_client(&action, shard.description(), err))
    }

    /// Phase 2: the groups transitively reachable from `seed`, `seed`
    /// included, and the number of mapping shards contacted. An empty seed
    /// skips the directory and the fan-out entirely.
    pub(crate) async fn transitive_closure(
        &self,
        seed: &HashSet<String>,
    ) -> Result<(HashSet<String>, u64), Error> {
        if seed.is_empty() {
            return Ok((HashSet::new(), 0));
        }

        let buckets = self.directory.get_clients(
            DataElement::GroupToGroupMapping,
            OperationKind::Query,
            seed,
        )?;
        let shards_queried = buckets.len() as u64;

        let groups = fanout::union_buckets(
            buckets,
            Policy::benign_not_found("retrieve group to group mappings from"),
            |shard, keys| async move {
                shard
                    .client()
                    .get_group_to_group_mappings_for_groups(&keys)
                    .await
            },
        )
        .await?;

        Ok((groups, shards_queried))
    }

    /// Phases 1 and 2 for a user-rooted query.
    pub(crate) async fn user_group_closure(&self, user: &str) -> Result<HashSet<String>, Error> {
        let direct = self.direct_user_groups(user).await?;
        let (groups, _) = self.transitive_closure(&direct).await?;
        Ok(groups)
    }

    /// Group-rooted closure. The group itself is always part of the result,
    /// even when it is mapped to no other groups, so the group layer still
    /// sees its direct permissions.
    pub(crate) async fn group_closure(&self, group: &str) -> Result<HashSet<String>, Error> {
        let seed: HashSet<String> = [group.to_owned()].into();
        let (mut groups, _) = self.transitive_closure(&seed).await?;
        groups.insert(group.to_owned());
        Ok(groups)
    }

    /// Reverse closure: the groups from which anything in `seed` is
    /// reachable, and the number of mapping shards contacted. One broadcast
    /// round over every group-to-group shard.
    pub(crate) async fn reverse_group_closure(
        &self,
        seed: &HashSet<String>,
    ) -> Result<(HashSet<String>, u64), Error> {
        if seed.is_empty() {
            return Ok((HashSet::new(), 0));
        }

        let shards = self
            .directory
            .get_all_clients(DataElement::GroupToGroupMapping, OperationKind::Query)?;
        let shards_queried = shards.len() as u64;
        let seed = seed.clone();

        let groups = fanout::union(
            shards,
            Policy::benign_not_found("retrieve group to group reverse mappings from"),
            move |shard| {
                let seed = seed.clone();
                async move {
                    shard
                        .client()
                        .get_group_to_group_reverse_mappings_for_groups(&seed)
                        .await
                }
            },
        )
        .await?;

        Ok((groups, shards_queried))
    }

    /// Users mapped to any group in `groups`, unioned over every user shard.
    pub(crate) async fn users_mapped_to_groups(
        &self,
        groups: &HashSet<String>,
    ) -> Result<HashSet<String>, Error> {
        if groups.is_empty() {
            return Ok(HashSet::new());
        }

        let shards = self
            .directory
            .get_all_clients(DataElement::User, OperationKind::Query)?;
        let groups = groups.clone();

        fanout::union(
            shards,
            Policy::benign_not_found("retrieve group to user mappings from"),
            move |shard| {
                let groups = groups.clone();
                async move {
                    shard
                        .client()
                        .get_group_to_user_mappings_for_groups(&groups)
                        .await
                }
            },
        )
        .await
    }

    /// Phase 3, boolean shape: does any group in `groups` grant the
    /// component at the level. Returns the grant and the number of group
    /// shards contacted.
    pub(crate) async fn groups_have_access_to_component(
        &self,
        groups: &HashSet<String>,
        component: &str,
        access_level: &str,
    ) -> Result<(bool, u64), Error> {
        if groups.is_empty() {
            return Ok((false, 0));
        }

        let buckets =
            self.directory
                .get_clients(DataElement::Group, OperationKind::Query, groups)?;
        let shards_queried = buckets.len() as u64;
        let component = component.to_owned();
        let access_level = access_level.to_owned();

        let granted = fanout::any_buckets(
            buckets,
            Policy::benign_not_found("check application component access on"),
            move |shard, keys| {
                let component = component.clone();
                let access_level = access_level.clone();
                async move {
                    shard
                        .client()
                        .has_access_to_application_component_for_groups(
                            &keys,
                            &component,
                            &access_level,
                        )
                        .await
                }
            },
        )
        .await?;

        Ok((granted, shards_queried))
    }

    /// Phase 3, boolean shape for entities.
    pub(crate) async fn groups_have_access_to_entity(
        &self,
        groups: &HashSet<String>,
        entity_type: &str,
        entity: &str,
    ) -> Result<(bool, u64), Error> {
        if groups.is_empty() {
            return Ok((false, 0));
        }

        let buckets =
            self.directory
                .get_clients(DataElement::Group, OperationKind::Query, groups)?;
        let shards_queried = buckets.len() as u64;
        let entity_type = entity_type.to_owned();
        let entity = entity.to_owned();

        let granted = fanout::any_buckets(
            buckets,
            Policy::benign_not_found("check entity access on"),
            move |shard, keys| {
                let entity_type = entity_type.clone();
                let entity = entity.clone();
                async move {
                    shard
                        .client()
                        .has_access_to_entity_for_groups(&keys, &entity_type, &entity)
                        .await
                }
            },
        )
        .await?;

        Ok((granted, shards_queried))
    }

    /// Phase 3, union shape: components accessible through `groups`.
    pub(crate) async fn components_accessible_by_groups(
        &self,
        groups: &HashSet<String>,
    ) -> Result<(HashSet<(String, String)>, u64), Error> {
        if groups.is_empty() {
            return Ok((HashSet::new(), 0));
        }

        let buckets =
            self.directory
                .get_clients(DataElement::Group, OperationKind::Query, groups)?;
        let shards_queried = buckets.len() as u64;

        let components = fanout::union_buckets(
            buckets,
            Policy::benign_not_found("retrieve application components accessible by groups from"),
            |shard, keys| async move {
                shard
                    .client()
                    .get_application_components_accessible_by_groups(&keys)
                    .await
            },
        )
        .await?;

        Ok((components, shards_queried))
    }

    /// Phase 3, union shape: entities accessible through `groups`.
    pub(crate) async fn entities_accessible_by_groups(
        &self,
        groups: &HashSet<String>,
    ) -> Result<(HashSet<(String, String)>, u64), Error> {
        if groups.is_empty() {
            return Ok((HashSet::new(), 0));
        }

        let buckets =
            self.directory
                .get_clients(DataElement::Group, OperationKind::Query, groups)?;
        let shards_queried = buckets.len() as u64;

        let entities = fanout::union_buckets(
            buckets,
            Policy::benign_not_found("retrieve entities accessible by groups from"),
            |shard, keys| async move {
                shard.client().get_entities_accessible_by_groups(&keys).await
            },
        )
        .await?;

        Ok((entities, shards_queried))
    }

    /// Phase 3, union shape: entities of one type accessible through
    /// `groups`. An unknown entity type on a shard contributes nothing.
    pub(crate) async fn entities_of_type_accessible_by_groups(
        &self,
        groups: &HashSet<String>,
        entity_type: &str,
    ) -> Result<(HashSet<String>, u64), Error> {
        if groups.is_empty() {
            return Ok((HashSet::new(), 0));
        }

        let buckets =
            self.directory
                .get_clients(DataElement::Group, OperationKind::Query, groups)?;
        let shards_queried = buckets.len() as u64;
        let entity_type = entity_type.to_owned();

        let entities = fanout::union_buckets(
            buckets,
            Policy::benign_not_found("retrieve entities accessible by groups from"),
            move |shard, keys| {
                let entity_type = entity_type.clone();
                async move {
                    shard
                        .client()
                        .get_entities_of_type_accessible_by_groups(&keys, &entity_type)
                        .await
                }
            },
        )
        .await?;

        Ok((entities, shards_queried))
    }
}
