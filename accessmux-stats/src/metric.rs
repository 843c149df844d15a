//! Metric tags, one per coordinator operation plus traversal gauges.

use serde::{Deserialize, Serialize};

/// Every timer/counter/gauge the coordinator emits.
///
/// Operation variants are used both as interval timers (`begin`/`end`) and
/// as completion counters (`increment`). The trailing variants are gauges
/// recorded with `add`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoordinatorMetric {
    // Users.
    AddUser,
    ContainsUser,
    RemoveUser,
    GetUsers,

    // Groups.
    AddGroup,
    ContainsGroup,
    RemoveGroup,
    GetGroups,

    // Entity types.
    AddEntityType,
    ContainsEntityType,
    RemoveEntityType,
    GetEntityTypes,

    // Entities.
    AddEntity,
    ContainsEntity,
    RemoveEntity,
    GetEntities,

    // User to group mappings.
    AddUserToGroupMapping,
    GetUserToGroupMappings,
    GetGroupToUserMappings,
    RemoveUserToGroupMapping,

    // Group to group mappings.
    AddGroupToGroupMapping,
    GetGroupToGroupMappings,
    GetGroupToGroupReverseMappings,
    RemoveGroupToGroupMapping,

    // User to application component mappings.
    AddUserToApplicationComponentAndAccessLevelMapping,
    GetUserToApplicationComponentAndAccessLevelMappings,
    GetApplicationComponentAndAccessLevelToUserMappings,
    RemoveUserToApplicationComponentAndAccessLevelMapping,

    // Group to application component mappings.
    AddGroupToApplicationComponentAndAccessLevelMapping,
    GetGroupToApplicationComponentAndAccessLevelMappings,
    GetApplicationComponentAndAccessLevelToGroupMappings,
    RemoveGroupToApplicationComponentAndAccessLevelMapping,

    // User to entity mappings.
    AddUserToEntityMapping,
    GetUserToEntityMappings,
    GetUserToEntityMappingsOfType,
    GetEntityToUserMappings,
    RemoveUserToEntityMapping,

    // Group to entity mappings.
    AddGroupToEntityMapping,
    GetGroupToEntityMappings,
    GetGroupToEntityMappingsOfType,
    GetEntityToGroupMappings,
    RemoveGroupToEntityMapping,

    // Access queries.
    HasAccessToApplicationComponent,
    HasAccessToEntity,
    GetApplicationComponentsAccessibleByUser,
    GetApplicationComponentsAccessibleByGroup,
    GetEntitiesAccessibleByUser,
    GetEntitiesAccessibleByUserOfType,
    GetEntitiesAccessibleByGroup,
    GetEntitiesAccessibleByGroupOfType,

    // Gauges.
    GroupsMappedToUser,
    GroupsMappedToGroup,
    GroupShardsQueried,
}

impl CoordinatorMetric {
    /// Stable name used in snapshots and logs.
    pub fn as_str(&self) -> &'static str {
        use CoordinatorMetric::*;

        match self {
            AddUser => "add_user",
            ContainsUser => "contains_user",
            RemoveUser => "remove_user",
            GetUsers => "get_users",
            AddGroup => "add_group",
            ContainsGroup => "contains_group",
            RemoveGroup => "remove_group",
            GetGroups => "get_groups",
            AddEntityType => "add_entity_type",
            ContainsEntityType => "contains_entity_type",
            RemoveEntityType => "remove_entity_type",
            GetEntityTypes => "get_entity_types",
            AddEntity => "add_entity",
            ContainsEntity => "contains_entity",
            RemoveEntity => "remove_entity",
            GetEntities => "get_entities",
            AddUserToGroupMapping => "add_user_to_group_mapping",
            GetUserToGroupMappings => "get_user_to_group_mappings",
            GetGroupToUserMappings => "get_group_to_user_mappings",
            RemoveUserToGroupMapping => "remove_user_to_group_mapping",
            AddGroupToGroupMapping => "add_group_to_group_mapping",
            GetGroupToGroupMappings => "get_group_to_group_mappings",
            GetGroupToGroupReverseMappings => "get_group_to_group_reverse_mappings",
            RemoveGroupToGroupMapping => "remove_group_to_group_mapping",
            AddUserToApplicationComponentAndAccessLevelMapping => {
                "add_user_to_application_component_and_access_level_mapping"
            }
            GetUserToApplicationComponentAndAccessLevelMappings => {
                "get_user_to_application_component_and_access_level_mappings"
            }
            GetApplicationComponentAndAccessLevelToUserMappings => {
                "get_application_component_and_access_level_to_user_mappings"
            }
            RemoveUserToApplicationComponentAndAccessLevelMapping => {
                "remove_user_to_application_component_and_access_level_mapping"
            }
            AddGroupToApplicationComponentAndAccessLevelMapping => {
                "add_group_to_application_component_and_access_level_mapping"
            }
            GetGroupToApplicationComponentAndAccessLevelMappings => {
                "get_group_to_application_component_and_access_level_mappings"
            }
            GetApplicationComponentAndAccessLevelToGroupMappings => {
                "get_application_component_and_access_level_to_group_mappings"
            }
            RemoveGroupToApplicationComponentAndAccessLevelMapping => {
                "remove_group_to_application_component_and_access_level_mapping"
            }
            AddUserToEntityMapping => "add_user_to_entity_mapping",
            GetUserToEntityMappings => "get_user_to_entity_mappings",
            GetUserToEntityMappingsOfType => "get_user_to_entity_mappings_of_type",
            GetEntityToUserMappings => "get_entity_to_user_mappings",
            RemoveUserToEntityMapping => "remove_user_to_entity_mapping",
            AddGroupToEntityMapping => "add_group_to_entity_mapping",
            GetGroupToEntityMappings => "get_group_to_entity_mappings",
            GetGroupToEntityMappingsOfType => "get_group_to_entity_mappings_of_type",
            GetEntityToGroupMappings => "get_entity_to_group_mappings",
            RemoveGroupToEntityMapping => "remove_group_to_entity_mapping",
            HasAccessToApplicationComponent => "has_access_to_application_component",
            HasAccessToEntity => "has_access_to_entity",
            GetApplicationComponentsAccessibleByUser => {
                "get_application_components_accessible_by_user"
            }
            GetApplicationComponentsAccessibleByGroup => {
                "get_application_components_accessible_by_group"
            }
            GetEntitiesAccessibleByUser => "get_entities_accessible_by_user",
            GetEntitiesAccessibleByUserOfType => "get_entities_accessible_by_user_of_type",
            GetEntitiesAccessibleByGroup => "get_entities_accessible_by_group",
            GetEntitiesAccessibleByGroupOfType => "get_entities_accessible_by_group_of_type",
            GroupsMappedToUser => "groups_mapped_to_user",
            GroupsMappedToGroup => "groups_mapped_to_group",
            GroupShardsQueried => "group_shards_queried",
        }
    }
}

impl std::fmt::Display for CoordinatorMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
