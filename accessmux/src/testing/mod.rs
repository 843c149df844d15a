//! Test doubles: a scripted shard client, a directory with explicit key
//! assignments, and client factories for exercising the shard manager.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::sleep;

use accessmux_config::{Fleet, ShardConfig};

use crate::directory::{
    ClientFactory, DataElement, Error as DirectoryError, OperationKind, ShardBucket,
    ShardDirectory,
};
use crate::shard::{ClientError, ShardClient, ShardRef};

/// A canned response for one mock method.
#[derive(Debug, Clone)]
pub enum Response {
    Strings(HashSet<String>),
    Pairs(HashSet<(String, String)>),
    Bool(bool),
    Error(ClientError),
}

/// Scripted shard client.
///
/// Responses are looked up by method name, optionally specialized per first
/// argument (`method/arg`). Unscripted methods return the empty result for
/// their shape. Every call is recorded for assertions.
#[derive(Default)]
pub struct MockShardClient {
    responses: HashMap<String, Response>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl MockShardClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a string-set response.
    pub fn strings(mut self, method: &str, values: &[&str]) -> Self {
        self.responses.insert(
            method.into(),
            Response::Strings(values.iter().map(|v| v.to_string()).collect()),
        );
        self
    }

    /// Script a string-set response for one specific key.
    pub fn strings_for(mut self, method: &str, key: &str, values: &[&str]) -> Self {
        self.responses.insert(
            format!("{}/{}", method, key),
            Response::Strings(values.iter().map(|v| v.to_string()).collect()),
        );
        self
    }

    /// Script a pair-set response.
    pub fn pairs(mut self, method: &str, values: &[(&str, &str)]) -> Self {
        self.responses.insert(
            method.into(),
            Response::Pairs(
                values
                    .iter()
                    .map(|(a, b)| (a.to_string(), b.to_string()))
                    .collect(),
            ),
        );
        self
    }

    /// Script a boolean response.
    pub fn boolean(mut self, method: &str, value: bool) -> Self {
        self.responses.insert(method.into(), Response::Bool(value));
        self
    }

    /// Script an error response.
    pub fn error(mut self, method: &str, error: ClientError) -> Self {
        self.responses.insert(method.into(), Response::Error(error));
        self
    }

    /// Script an error response for one specific key.
    pub fn error_for(mut self, method: &str, key: &str, error: ClientError) -> Self {
        self.responses
            .insert(format!("{}/{}", method, key), Response::Error(error));
        self
    }

    /// Sleep before answering any call. Lets tests prove peers get aborted.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    async fn respond(&self, method: &str, arg: Option<&str>, call: String) -> Option<Response> {
        self.calls.lock().push(call);
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }

        arg.and_then(|arg| self.responses.get(&format!("{}/{}", method, arg)).cloned())
            .or_else(|| self.responses.get(method).cloned())
    }

    async fn strings_response(
        &self,
        method: &str,
        arg: Option<&str>,
        call: String,
    ) -> Result<HashSet<String>, ClientError> {
        match self.respond(method, arg, call).await {
            None => Ok(HashSet::new()),
            Some(Response::Strings(values)) => Ok(values),
            Some(Response::Error(error)) => Err(error),
            Some(other) => panic!("{} scripted with mismatched response {:?}", method, other),
        }
    }

    async fn pairs_response(
        &self,
        method: &str,
        arg: Option<&str>,
        call: String,
    ) -> Result<HashSet<(String, String)>, ClientError> {
        match self.respond(method, arg, call).await {
            None => Ok(HashSet::new()),
            Some(Response::Pairs(values)) => Ok(values),
            Some(Response::Error(error)) => Err(error),
            Some(other) => panic!("{} scripted with mismatched response {:?}", method, other),
        }
    }

    async fn bool_response(
        &self,
        method: &str,
        arg: Option<&str>,
        call: String,
    ) -> Result<bool, ClientError> {
        match self.respond(method, arg, call).await {
            None => Ok(false),
            Some(Response::Bool(value)) => Ok(value),
            Some(Response::Error(error)) => Err(error),
            Some(other) => panic!("{} scripted with mismatched response {:?}", method, other),
        }
    }

    async fn unit_response(
        &self,
        method: &str,
        arg: Option<&str>,
        call: String,
    ) -> Result<(), ClientError> {
        match self.respond(method, arg, call).await {
            None => Ok(()),
            Some(Response::Error(error)) => Err(error),
            Some(_) => Ok(()),
        }
    }
}

fn sorted(keys: &HashSet<String>) -> String {
    let mut keys: Vec<_> = keys.iter().cloned().collect();
    keys.sort();
    keys.join(",")
}

#[async_trait]
impl ShardClient for MockShardClient {
    async fn get_users(&self) -> Result<HashSet<String>, ClientError> {
        self.strings_response("get_users", None, "get_users()".into())
            .await
    }

    async fn get_groups(&self) -> Result<HashSet<String>, ClientError> {
        self.strings_response("get_groups", None, "get_groups()".into())
            .await
    }

    async fn get_entity_types(&self) -> Result<HashSet<String>, ClientError> {
        self.strings_response("get_entity_types", None, "get_entity_types()".into())
            .await
    }

    async fn get_entities(&self, entity_type: &str) -> Result<HashSet<String>, ClientError> {
        self.strings_response(
            "get_entities",
            Some(entity_type),
            format!("get_entities({})", entity_type),
        )
        .await
    }

    async fn contains_user(&self, user: &str) -> Result<bool, ClientError> {
        self.bool_response("contains_user", Some(user), format!("contains_user({})", user))
            .await
    }

    async fn contains_group(&self, group: &str) -> Result<bool, ClientError> {
        self.bool_response(
            "contains_group",
            Some(group),
            format!("contains_group({})", group),
        )
        .await
    }

    async fn contains_entity_type(&self, entity_type: &str) -> Result<bool, ClientError> {
        self.bool_response(
            "contains_entity_type",
            Some(entity_type),
            format!("contains_entity_type({})", entity_type),
        )
        .await
    }

    async fn contains_entity(
        &self,
        entity_type: &str,
        entity: &str,
    ) -> Result<bool, ClientError> {
        self.bool_response(
            "contains_entity",
            Some(entity_type),
            format!("contains_entity({}, {})", entity_type, entity),
        )
        .await
    }

    async fn add_user(&self, user: &str) -> Result<(), ClientError> {
        self.unit_response("add_user", Some(user), format!("add_user({})", user))
            .await
    }

    async fn remove_user(&self, user: &str) -> Result<(), ClientError> {
        self.unit_response("remove_user", Some(user), format!("remove_user({})", user))
            .await
    }

    async fn add_group(&self, group: &str) -> Result<(), ClientError> {
        self.unit_response("add_group", Some(group), format!("add_group({})", group))
            .await
    }

    async fn remove_group(&self, group: &str) -> Result<(), ClientError> {
        self.unit_response("remove_group", Some(group), format!("remove_group({})", group))
            .await
    }

    async fn add_entity_type(&self, entity_type: &str) -> Result<(), ClientError> {
        self.unit_response(
            "add_entity_type",
            Some(entity_type),
            format!("add_entity_type({})", entity_type),
        )
        .await
    }

    async fn remove_entity_type(&self, entity_type: &str) -> Result<(), ClientError> {
        self.unit_response(
            "remove_entity_type",
            Some(entity_type),
            format!("remove_entity_type({})", entity_type),
        )
        .await
    }

    async fn add_entity(&self, entity_type: &str, entity: &str) -> Result<(), ClientError> {
        self.unit_response(
            "add_entity",
            Some(entity_type),
            format!("add_entity({}, {})", entity_type, entity),
        )
        .await
    }

    async fn remove_entity(&self, entity_type: &str, entity: &str) -> Result<(), ClientError> {
        self.unit_response(
            "remove_entity",
            Some(entity_type),
            format!("remove_entity({}, {})", entity_type, entity),
        )
        .await
    }

    async fn add_user_to_group_mapping(
        &self,
        user: &str,
        group: &str,
    ) -> Result<(), ClientError> {
        self.unit_response(
            "add_user_to_group_mapping",
            Some(user),
            format!("add_user_to_group_mapping({}, {})", user, group),
        )
        .await
    }

    async fn remove_user_to_group_mapping(
        &self,
        user: &str,
        group: &str,
    ) -> Result<(), ClientError> {
        self.unit_response(
            "remove_user_to_group_mapping",
            Some(user),
            format!("remove_user_to_group_mapping({}, {})", user, group),
        )
        .await
    }

    async fn get_user_to_group_mappings(
        &self,
        user: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, ClientError> {
        self.strings_response(
            "get_user_to_group_mappings",
            Some(user),
            format!("get_user_to_group_mappings({}, {})", user, include_indirect),
        )
        .await
    }

    async fn get_group_to_user_mappings(
        &self,
        group: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, ClientError> {
        self.strings_response(
            "get_group_to_user_mappings",
            Some(group),
            format!("get_group_to_user_mappings({}, {})", group, include_indirect),
        )
        .await
    }

    async fn get_group_to_user_mappings_for_groups(
        &self,
        groups: &HashSet<String>,
    ) -> Result<HashSet<String>, ClientError> {
        self.strings_response(
            "get_group_to_user_mappings_for_groups",
            None,
            format!("get_group_to_user_mappings_for_groups({})", sorted(groups)),
        )
        .await
    }

    async fn add_group_to_group_mapping(
        &self,
        from_group: &str,
        to_group: &str,
    ) -> Result<(), ClientError> {
        self.unit_response(
            "add_group_to_group_mapping",
            Some(from_group),
            format!("add_group_to_group_mapping({}, {})", from_group, to_group),
        )
        .await
    }

    async fn remove_group_to_group_mapping(
        &self,
        from_group: &str,
        to_group: &str,
    ) -> Result<(), ClientError> {
        self.unit_response(
            "remove_group_to_group_mapping",
            Some(from_group),
            format!("remove_group_to_group_mapping({}, {})", from_group, to_group),
        )
        .await
    }

    async fn get_group_to_group_mappings(
        &self,
        group: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, ClientError> {
        self.strings_response(
            "get_group_to_group_mappings",
            Some(group),
            format!("get_group_to_group_mappings({}, {})", group, include_indirect),
        )
        .await
    }

    async fn get_group_to_group_mappings_for_groups(
        &self,
        groups: &HashSet<String>,
    ) -> Result<HashSet<String>, ClientError> {
        self.strings_response(
            "get_group_to_group_mappings_for_groups",
            None,
            format!("get_group_to_group_mappings_for_groups({})", sorted(groups)),
        )
        .await
    }

    async fn get_group_to_group_reverse_mappings(
        &self,
        group: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, ClientError> {
        self.strings_response(
            "get_group_to_group_reverse_mappings",
            Some(group),
            format!(
                "get_group_to_group_reverse_mappings({}, {})",
                group, include_indirect
            ),
        )
        .await
    }

    async fn get_group_to_group_reverse_mappings_for_groups(
        &self,
        groups: &HashSet<String>,
    ) -> Result<HashSet<String>, ClientError> {
        self.strings_response(
            "get_group_to_group_reverse_mappings_for_groups",
            None,
            format!(
                "get_group_to_group_reverse_mappings_for_groups({})",
                sorted(groups)
            ),
        )
        .await
    }

    async fn add_user_to_application_component_and_access_level_mapping(
        &self,
        user: &str,
        component: &str,
        access_level: &str,
    ) -> Result<(), ClientError> {
        self.unit_response(
            "add_user_to_application_component_and_access_level_mapping",
            Some(user),
            format!(
                "add_user_to_application_component_and_access_level_mapping({}, {}, {})",
                user, component, access_level
            ),
        )
        .await
    }

    async fn remove_user_to_application_component_and_access_level_mapping(
        &self,
        user: &str,
        component: &str,
        access_level: &str,
    ) -> Result<(), ClientError> {
        self.unit_response(
            "remove_user_to_application_component_and_access_level_mapping",
            Some(user),
            format!(
                "remove_user_to_application_component_and_access_level_mapping({}, {}, {})",
                user, component, access_level
            ),
        )
        .await
    }

    async fn get_user_to_application_component_and_access_level_mappings(
        &self,
        user: &str,
    ) -> Result<HashSet<(String, String)>, ClientError> {
        self.pairs_response(
            "get_user_to_application_component_and_access_level_mappings",
            Some(user),
            format!(
                "get_user_to_application_component_and_access_level_mappings({})",
                user
            ),
        )
        .await
    }

    async fn get_application_component_and_access_level_to_user_mappings(
        &self,
        component: &str,
        access_level: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, ClientError> {
        self.strings_response(
            "get_application_component_and_access_level_to_user_mappings",
            Some(component),
            format!(
                "get_application_component_and_access_level_to_user_mappings({}, {}, {})",
                component, access_level, include_indirect
            ),
        )
        .await
    }

    async fn add_group_to_application_component_and_access_level_mapping(
        &self,
        group: &str,
        component: &str,
        access_level: &str,
    ) -> Result<(), ClientError> {
        self.unit_response(
            "add_group_to_application_component_and_access_level_mapping",
            Some(group),
            format!(
                "add_group_to_application_component_and_access_level_mapping({}, {}, {})",
                group, component, access_level
            ),
        )
        .await
    }

    async fn remove_group_to_application_component_and_access_level_mapping(
        &self,
        group: &str,
        component: &str,
        access_level: &str,
    ) -> Result<(), ClientError> {
        self.unit_response(
            "remove_group_to_application_component_and_access_level_mapping",
            Some(group),
            format!(
                "remove_group_to_application_component_and_access_level_mapping({}, {}, {})",
                group, component, access_level
            ),
        )
        .await
    }

    async fn get_group_to_application_component_and_access_level_mappings(
        &self,
        group: &str,
    ) -> Result<HashSet<(String, String)>, ClientError> {
        self.pairs_response(
            "get_group_to_application_component_and_access_level_mappings",
            Some(group),
            format!(
                "get_group_to_application_component_and_access_level_mappings({})",
                group
            ),
        )
        .await
    }

    async fn get_application_component_and_access_level_to_group_mappings(
        &self,
        component: &str,
        access_level: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, ClientError> {
        self.strings_response(
            "get_application_component_and_access_level_to_group_mappings",
            Some(component),
            format!(
                "get_application_component_and_access_level_to_group_mappings({}, {}, {})",
                component, access_level, include_indirect
            ),
        )
        .await
    }

    async fn get_application_components_accessible_by_user(
        &self,
        user: &str,
    ) -> Result<HashSet<(String, String)>, ClientError> {
        self.pairs_response(
            "get_application_components_accessible_by_user",
            Some(user),
            format!("get_application_components_accessible_by_user({})", user),
        )
        .await
    }

    async fn get_application_components_accessible_by_groups(
        &self,
        groups: &HashSet<String>,
    ) -> Result<HashSet<(String, String)>, ClientError> {
        self.pairs_response(
            "get_application_components_accessible_by_groups",
            None,
            format!(
                "get_application_components_accessible_by_groups({})",
                sorted(groups)
            ),
        )
        .await
    }

    async fn add_user_to_entity_mapping(
        &self,
        user: &str,
        entity_type: &str,
        entity: &str,
    ) -> Result<(), ClientError> {
        self.unit_response(
            "add_user_to_entity_mapping",
            Some(user),
            format!("add_user_to_entity_mapping({}, {}, {})", user, entity_type, entity),
        )
        .await
    }

    async fn remove_user_to_entity_mapping(
        &self,
        user: &str,
        entity_type: &str,
        entity: &str,
    ) -> Result<(), ClientError> {
        self.unit_response(
            "remove_user_to_entity_mapping",
            Some(user),
            format!(
                "remove_user_to_entity_mapping({}, {}, {})",
                user, entity_type, entity
            ),
        )
        .await
    }

    async fn get_user_to_entity_mappings(
        &self,
        user: &str,
    ) -> Result<HashSet<(String, String)>, ClientError> {
        self.pairs_response(
            "get_user_to_entity_mappings",
            Some(user),
            format!("get_user_to_entity_mappings({})", user),
        )
        .await
    }

    async fn get_user_to_entity_mappings_of_type(
        &self,
        user: &str,
        entity_type: &str,
    ) -> Result<HashSet<String>, ClientError> {
        self.strings_response(
            "get_user_to_entity_mappings_of_type",
            Some(user),
            format!("get_user_to_entity_mappings_of_type({}, {})", user, entity_type),
        )
        .await
    }

    async fn get_entity_to_user_mappings(
        &self,
        entity_type: &str,
        entity: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, ClientError> {
        self.strings_response(
            "get_entity_to_user_mappings",
            Some(entity_type),
            format!(
                "get_entity_to_user_mappings({}, {}, {})",
                entity_type, entity, include_indirect
            ),
        )
        .await
    }

    async fn add_group_to_entity_mapping(
        &self,
        group: &str,
        entity_type: &str,
        entity: &str,
    ) -> Result<(), ClientError> {
        self.unit_response(
            "add_group_to_entity_mapping",
            Some(group),
            format!(
                "add_group_to_entity_mapping({}, {}, {})",
                group, entity_type, entity
            ),
        )
        .await
    }

    async fn remove_group_to_entity_mapping(
        &self,
        group: &str,
        entity_type: &str,
        entity: &str,
    ) -> Result<(), ClientError> {
        self.unit_response(
            "remove_group_to_entity_mapping",
            Some(group),
            format!(
                "remove_group_to_entity_mapping({}, {}, {})",
                group, entity_type, entity
            ),
        )
        .await
    }

    async fn get_group_to_entity_mappings(
        &self,
        group: &str,
    ) -> Result<HashSet<(String, String)>, ClientError> {
        self.pairs_response(
            "get_group_to_entity_mappings",
            Some(group),
            format!("get_group_to_entity_mappings({})", group),
        )
        .await
    }

    async fn get_group_to_entity_mappings_of_type(
        &self,
        group: &str,
        entity_type: &str,
    ) -> Result<HashSet<String>, ClientError> {
        self.strings_response(
            "get_group_to_entity_mappings_of_type",
            Some(group),
            format!(
                "get_group_to_entity_mappings_of_type({}, {})",
                group, entity_type
            ),
        )
        .await
    }

    async fn get_entity_to_group_mappings(
        &self,
        entity_type: &str,
        entity: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, ClientError> {
        self.strings_response(
            "get_entity_to_group_mappings",
            Some(entity_type),
            format!(
                "get_entity_to_group_mappings({}, {}, {})",
                entity_type, entity, include_indirect
            ),
        )
        .await
    }

    async fn get_entities_accessible_by_user(
        &self,
        user: &str,
    ) -> Result<HashSet<(String, String)>, ClientError> {
        self.pairs_response(
            "get_entities_accessible_by_user",
            Some(user),
            format!("get_entities_accessible_by_user({})", user),
        )
        .await
    }

    async fn get_entities_of_type_accessible_by_user(
        &self,
        user: &str,
        entity_type: &str,
    ) -> Result<HashSet<String>, ClientError> {
        self.strings_response(
            "get_entities_of_type_accessible_by_user",
            Some(user),
            format!(
                "get_entities_of_type_accessible_by_user({}, {})",
                user, entity_type
            ),
        )
        .await
    }

    async fn get_entities_accessible_by_groups(
        &self,
        groups: &HashSet<String>,
    ) -> Result<HashSet<(String, String)>, ClientError> {
        self.pairs_response(
            "get_entities_accessible_by_groups",
            None,
            format!("get_entities_accessible_by_groups({})", sorted(groups)),
        )
        .await
    }

    async fn get_entities_of_type_accessible_by_groups(
        &self,
        groups: &HashSet<String>,
        entity_type: &str,
    ) -> Result<HashSet<String>, ClientError> {
        self.strings_response(
            "get_entities_of_type_accessible_by_groups",
            Some(entity_type),
            format!(
                "get_entities_of_type_accessible_by_groups({}, {})",
                sorted(groups),
                entity_type
            ),
        )
        .await
    }

    async fn has_access_to_application_component(
        &self,
        user: &str,
        component: &str,
        access_level: &str,
    ) -> Result<bool, ClientError> {
        self.bool_response(
            "has_access_to_application_component",
            Some(user),
            format!(
                "has_access_to_application_component({}, {}, {})",
                user, component, access_level
            ),
        )
        .await
    }

    async fn has_access_to_application_component_for_groups(
        &self,
        groups: &HashSet<String>,
        component: &str,
        access_level: &str,
    ) -> Result<bool, ClientError> {
        self.bool_response(
            "has_access_to_application_component_for_groups",
            None,
            format!(
                "has_access_to_application_component_for_groups({}, {}, {})",
                sorted(groups),
                component,
                access_level
            ),
        )
        .await
    }

    async fn has_access_to_entity(
        &self,
        user: &str,
        entity_type: &str,
        entity: &str,
    ) -> Result<bool, ClientError> {
        self.bool_response(
            "has_access_to_entity",
            Some(user),
            format!("has_access_to_entity({}, {}, {})", user, entity_type, entity),
        )
        .await
    }

    async fn has_access_to_entity_for_groups(
        &self,
        groups: &HashSet<String>,
        entity_type: &str,
        entity: &str,
    ) -> Result<bool, ClientError> {
        self.bool_response(
            "has_access_to_entity_for_groups",
            None,
            format!(
                "has_access_to_entity_for_groups({}, {}, {})",
                sorted(groups),
                entity_type,
                entity
            ),
        )
        .await
    }
}

/// Directory with explicit shard lists and key assignments.
///
/// Keys route to their assigned shard, or to the element's first shard when
/// unassigned, so tests control bucket topology exactly.
#[derive(Default)]
pub struct MockDirectory {
    users: Vec<ShardRef>,
    groups: Vec<ShardRef>,
    group_to_group: Vec<ShardRef>,
    assignments: HashMap<(DataElement, String), String>,
    refreshes: AtomicUsize,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_shard(mut self, name: &str, client: Arc<dyn ShardClient>) -> Self {
        self.users.push(ShardRef::new(client, name));
        self
    }

    pub fn group_shard(mut self, name: &str, client: Arc<dyn ShardClient>) -> Self {
        self.groups.push(ShardRef::new(client, name));
        self
    }

    pub fn group_to_group_shard(mut self, name: &str, client: Arc<dyn ShardClient>) -> Self {
        self.group_to_group.push(ShardRef::new(client, name));
        self
    }

    /// Route `key` to the named shard for this element.
    pub fn assign(mut self, element: DataElement, key: &str, shard: &str) -> Self {
        self.assignments
            .insert((element, key.to_string()), shard.to_string());
        self
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::Relaxed)
    }

    fn shards(&self, element: DataElement) -> &[ShardRef] {
        match element {
            DataElement::User => &self.users,
            DataElement::Group => &self.groups,
            DataElement::GroupToGroupMapping => &self.group_to_group,
        }
    }

    fn shard_for(&self, element: DataElement, key: &str) -> Result<ShardRef, DirectoryError> {
        let shards = self.shards(element);
        if shards.is_empty() {
            return Err(DirectoryError::NoShards {
                element,
                operation: OperationKind::Query,
            });
        }

        match self.assignments.get(&(element, key.to_string())) {
            Some(name) => Ok(shards
                .iter()
                .find(|shard| shard.description() == name)
                .unwrap_or(&shards[0])
                .clone()),
            None => Ok(shards[0].clone()),
        }
    }
}

impl ShardDirectory for MockDirectory {
    fn get_client(
        &self,
        element: DataElement,
        _operation: OperationKind,
        key: &str,
    ) -> Result<ShardRef, DirectoryError> {
        self.shard_for(element, key)
    }

    fn get_all_clients(
        &self,
        element: DataElement,
        operation: OperationKind,
    ) -> Result<Vec<ShardRef>, DirectoryError> {
        let shards = self.shards(element);
        if shards.is_empty() {
            return Err(DirectoryError::NoShards { element, operation });
        }
        Ok(shards.to_vec())
    }

    fn get_clients(
        &self,
        element: DataElement,
        _operation: OperationKind,
        keys: &HashSet<String>,
    ) -> Result<Vec<ShardBucket>, DirectoryError> {
        if keys.is_empty() {
            return Ok(vec![]);
        }

        let mut buckets: HashMap<String, (ShardRef, HashSet<String>)> = HashMap::new();
        for key in keys {
            let shard = self.shard_for(element, key)?;
            buckets
                .entry(shard.description().to_string())
                .or_insert_with(|| (shard, HashSet::new()))
                .1
                .insert(key.clone());
        }

        Ok(buckets
            .into_values()
            .map(|(shard, keys)| ShardBucket { shard, keys })
            .collect())
    }

    fn refresh_configuration(&self, _fleet: Fleet) -> Result<(), DirectoryError> {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Factory producing unscripted mock clients.
#[derive(Default)]
pub struct MockFactory;

impl ClientFactory for MockFactory {
    fn client(
        &self,
        _element: DataElement,
        _operation: OperationKind,
        _config: &ShardConfig,
    ) -> Result<Arc<dyn ShardClient>, DirectoryError> {
        Ok(Arc::new(MockShardClient::new()))
    }
}

/// Factory that always fails, for refresh-failure tests.
pub struct FailingFactory;

impl ClientFactory for FailingFactory {
    fn client(
        &self,
        _element: DataElement,
        _operation: OperationKind,
        config: &ShardConfig,
    ) -> Result<Arc<dyn ShardClient>, DirectoryError> {
        Err(DirectoryError::ClientConstruction {
            shard: config.name.clone(),
            reason: "factory disabled".into(),
        })
    }
}
