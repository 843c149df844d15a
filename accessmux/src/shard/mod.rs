//! The shard RPC surface the coordinator consumes.
//!
//! Clients are built by the hosting layer (HTTP, gRPC, in-process fakes) and
//! handed to the shard manager through a factory. The coordinator borrows
//! them per call and never retains one past the call.

pub mod error;

pub use error::ClientError;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

/// One backend shard's access-management RPC surface.
///
/// Batched `*_for_groups` methods evaluate their query over a set of groups
/// in one round trip; shard-side semantics for `include_indirect` cover
/// chains local to the shard's slice of the mapping graph.
#[async_trait]
pub trait ShardClient: Send + Sync {
    // Element queries.
    async fn get_users(&self) -> Result<HashSet<String>, ClientError>;
    async fn get_groups(&self) -> Result<HashSet<String>, ClientError>;
    async fn get_entity_types(&self) -> Result<HashSet<String>, ClientError>;
    async fn get_entities(&self, entity_type: &str) -> Result<HashSet<String>, ClientError>;
    async fn contains_user(&self, user: &str) -> Result<bool, ClientError>;
    async fn contains_group(&self, group: &str) -> Result<bool, ClientError>;
    async fn contains_entity_type(&self, entity_type: &str) -> Result<bool, ClientError>;
    async fn contains_entity(&self, entity_type: &str, entity: &str)
        -> Result<bool, ClientError>;

    // Element events.
    async fn add_user(&self, user: &str) -> Result<(), ClientError>;
    async fn remove_user(&self, user: &str) -> Result<(), ClientError>;
    async fn add_group(&self, group: &str) -> Result<(), ClientError>;
    async fn remove_group(&self, group: &str) -> Result<(), ClientError>;
    async fn add_entity_type(&self, entity_type: &str) -> Result<(), ClientError>;
    async fn remove_entity_type(&self, entity_type: &str) -> Result<(), ClientError>;
    async fn add_entity(&self, entity_type: &str, entity: &str) -> Result<(), ClientError>;
    async fn remove_entity(&self, entity_type: &str, entity: &str) -> Result<(), ClientError>;

    // User to group mappings.
    async fn add_user_to_group_mapping(&self, user: &str, group: &str)
        -> Result<(), ClientError>;
    async fn remove_user_to_group_mapping(
        &self,
        user: &str,
        group: &str,
    ) -> Result<(), ClientError>;
    async fn get_user_to_group_mappings(
        &self,
        user: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, ClientError>;
    async fn get_group_to_user_mappings(
        &self,
        group: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, ClientError>;
    async fn get_group_to_user_mappings_for_groups(
        &self,
        groups: &HashSet<String>,
    ) -> Result<HashSet<String>, ClientError>;

    // Group to group mappings.
    async fn add_group_to_group_mapping(
        &self,
        from_group: &str,
        to_group: &str,
    ) -> Result<(), ClientError>;
    async fn remove_group_to_group_mapping(
        &self,
        from_group: &str,
        to_group: &str,
    ) -> Result<(), ClientError>;
    async fn get_group_to_group_mappings(
        &self,
        group: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, ClientError>;
    async fn get_group_to_group_mappings_for_groups(
        &self,
        groups: &HashSet<String>,
    ) -> Result<HashSet<String>, ClientError>;
    async fn get_group_to_group_reverse_mappings(
        &self,
        group: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, ClientError>;
    async fn get_group_to_group_reverse_mappings_for_groups(
        &self,
        groups: &HashSet<String>,
    ) -> Result<HashSet<String>, ClientError>;

    // Application component mappings.
    async fn add_user_to_application_component_and_access_level_mapping(
        &self,
        user: &str,
        component: &str,
        access_level: &str,
    ) -> Result<(), ClientError>;
    async fn remove_user_to_application_component_and_access_level_mapping(
        &self,
        user: &str,
        component: &str,
        access_level: &str,
    ) -> Result<(), ClientError>;
    async fn get_user_to_application_component_and_access_level_mappings(
        &self,
        user: &str,
    ) -> Result<HashSet<(String, String)>, ClientError>;
    async fn get_application_component_and_access_level_to_user_mappings(
        &self,
        component: &str,
        access_level: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, ClientError>;
    async fn add_group_to_application_component_and_access_level_mapping(
        &self,
        group: &str,
        component: &str,
        access_level: &str,
    ) -> Result<(), ClientError>;
    async fn remove_group_to_application_component_and_access_level_mapping(
        &self,
        group: &str,
        component: &str,
        access_level: &str,
    ) -> Result<(), ClientError>;
    async fn get_group_to_application_component_and_access_level_mappings(
        &self,
        group: &str,
    ) -> Result<HashSet<(String, String)>, ClientError>;
    async fn get_application_component_and_access_level_to_group_mappings(
        &self,
        component: &str,
        access_level: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, ClientError>;
    async fn get_application_components_accessible_by_user(
        &self,
        user: &str,
    ) -> Result<HashSet<(String, String)>, ClientError>;
    async fn get_application_components_accessible_by_groups(
        &self,
        groups: &HashSet<String>,
    ) -> Result<HashSet<(String, String)>, ClientError>;

    // Entity mappings.
    async fn add_user_to_entity_mapping(
        &self,
        user: &str,
        entity_type: &str,
        entity: &str,
    ) -> Result<(), ClientError>;
    async fn remove_user_to_entity_mapping(
        &self,
        user: &str,
        entity_type: &str,
        entity: &str,
    ) -> Result<(), ClientError>;
    async fn get_user_to_entity_mappings(
        &self,
        user: &str,
    ) -> Result<HashSet<(String, String)>, ClientError>;
    async fn get_user_to_entity_mappings_of_type(
        &self,
        user: &str,
        entity_type: &str,
    ) -> Result<HashSet<String>, ClientError>;
    async fn get_entity_to_user_mappings(
        &self,
        entity_type: &str,
        entity: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, ClientError>;
    async fn add_group_to_entity_mapping(
        &self,
        group: &str,
        entity_type: &str,
        entity: &str,
    ) -> Result<(), ClientError>;
    async fn remove_group_to_entity_mapping(
        &self,
        group: &str,
        entity_type: &str,
        entity: &str,
    ) -> Result<(), ClientError>;
    async fn get_group_to_entity_mappings(
        &self,
        group: &str,
    ) -> Result<HashSet<(String, String)>, ClientError>;
    async fn get_group_to_entity_mappings_of_type(
        &self,
        group: &str,
        entity_type: &str,
    ) -> Result<HashSet<String>, ClientError>;
    async fn get_entity_to_group_mappings(
        &self,
        entity_type: &str,
        entity: &str,
        include_indirect: bool,
    ) -> Result<HashSet<String>, ClientError>;
    async fn get_entities_accessible_by_user(
        &self,
        user: &str,
    ) -> Result<HashSet<(String, String)>, ClientError>;
    async fn get_entities_of_type_accessible_by_user(
        &self,
        user: &str,
        entity_type: &str,
    ) -> Result<HashSet<String>, ClientError>;
    async fn get_entities_accessible_by_groups(
        &self,
        groups: &HashSet<String>,
    ) -> Result<HashSet<(String, String)>, ClientError>;
    async fn get_entities_of_type_accessible_by_groups(
        &self,
        groups: &HashSet<String>,
        entity_type: &str,
    ) -> Result<HashSet<String>, ClientError>;

    // Access checks.
    async fn has_access_to_application_component(
        &self,
        user: &str,
        component: &str,
        access_level: &str,
    ) -> Result<bool, ClientError>;
    async fn has_access_to_application_component_for_groups(
        &self,
        groups: &HashSet<String>,
        component: &str,
        access_level: &str,
    ) -> Result<bool, ClientError>;
    async fn has_access_to_entity(
        &self,
        user: &str,
        entity_type: &str,
        entity: &str,
    ) -> Result<bool, ClientError>;
    async fn has_access_to_entity_for_groups(
        &self,
        groups: &HashSet<String>,
        entity_type: &str,
        entity: &str,
    ) -> Result<bool, ClientError>;
}

/// A shard client plus the human-readable tag identifying the shard in
/// errors and logs. Cheap to clone; the directory owns the client.
#[derive(Clone)]
pub struct ShardRef {
    client: Arc<dyn ShardClient>,
    description: Arc<str>,
}

impl ShardRef {
    pub fn new(client: Arc<dyn ShardClient>, description: impl Into<Arc<str>>) -> Self {
        Self {
            client,
            description: description.into(),
        }
    }

    pub fn client(&self) -> &dyn ShardClient {
        &*self.client
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub(crate) fn description_arc(&self) -> Arc<str> {
        self.description.clone()
    }
}

impl fmt::Debug for ShardRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardRef")
            .field("description", &self.description)
            .finish()
    }
}
