//! End-to-end coordinator behavior against scripted shard fleets.

use std::collections::HashSet;
use std::sync::Arc;

use accessmux::testing::{MockDirectory, MockShardClient};
use accessmux::{ClientError, Coordinator, DataElement, Error};
use accessmux_stats::{CoordinatorMetric, MetricEvent, Recorder};

fn set(values: &[&str]) -> HashSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn coordinator(directory: MockDirectory) -> (Coordinator, Arc<Recorder>) {
    accessmux::logger();
    let recorder = Arc::new(Recorder::new());
    (
        Coordinator::new(Arc::new(directory), recorder.clone()),
        recorder,
    )
}

fn terminal_events(recorder: &Recorder, metric: CoordinatorMetric) -> (usize, usize, usize) {
    let completions = recorder.count(|e| *e == MetricEvent::End(metric));
    let cancellations = recorder.count(|e| *e == MetricEvent::CancelBegin(metric));
    let increments = recorder.count(|e| *e == MetricEvent::Increment(metric));
    (completions, cancellations, increments)
}

#[tokio::test]
async fn test_get_users_unions_shard_partials() {
    let directory = MockDirectory::new()
        .user_shard(
            "ShardDescription1",
            Arc::new(MockShardClient::new().strings("get_users", &["user1", "user2", "user3"])),
        )
        .user_shard(
            "ShardDescription2",
            Arc::new(MockShardClient::new()),
        )
        .user_shard(
            "ShardDescription3",
            Arc::new(MockShardClient::new().strings("get_users", &["user4", "user5", "user6"])),
        );
    let (coordinator, recorder) = coordinator(directory);

    let users = coordinator.get_users().await.unwrap();

    assert_eq!(
        users,
        set(&["user1", "user2", "user3", "user4", "user5", "user6"])
    );
    assert_eq!(
        terminal_events(&recorder, CoordinatorMetric::GetUsers),
        (1, 0, 1)
    );
}

#[tokio::test]
async fn test_get_users_mid_fanout_failure() {
    let directory = MockDirectory::new()
        .user_shard(
            "ShardDescription1",
            Arc::new(MockShardClient::new().strings("get_users", &["user1", "user2", "user3"])),
        )
        .user_shard(
            "ShardDescription2",
            Arc::new(
                MockShardClient::new()
                    .error("get_users", ClientError::Rpc("Mock exception".into())),
            ),
        )
        .user_shard(
            "ShardDescription3",
            Arc::new(MockShardClient::new().strings("get_users", &["user4", "user5", "user6"])),
        );
    let (coordinator, recorder) = coordinator(directory);

    let err = coordinator.get_users().await.unwrap_err();

    assert!(err.to_string().starts_with(
        "Failed to retrieve users from shard with configuration 'ShardDescription2'."
    ));
    match err {
        Error::ShardOperation { source, .. } => {
            assert_eq!(source, ClientError::Rpc("Mock exception".into()));
        }
        other => panic!("expected ShardOperation, got {:?}", other),
    }
    assert_eq!(
        terminal_events(&recorder, CoordinatorMetric::GetUsers),
        (0, 1, 0)
    );
}

#[tokio::test]
async fn test_has_access_true_via_group_shard() {
    let user_shard = MockShardClient::new()
        .strings_for(
            "get_user_to_group_mappings",
            "user1",
            &["group1", "group2", "group3"],
        )
        .boolean("has_access_to_application_component", false);
    let g2g_shard = MockShardClient::new().strings(
        "get_group_to_group_mappings_for_groups",
        &["group1", "group2", "group3", "group4", "group5", "group6"],
    );
    let group_shard_1 =
        MockShardClient::new().boolean("has_access_to_application_component_for_groups", false);
    let group_shard_2 =
        MockShardClient::new().boolean("has_access_to_application_component_for_groups", true);

    let directory = MockDirectory::new()
        .user_shard("UserShard", Arc::new(user_shard))
        .group_to_group_shard("MappingShard", Arc::new(g2g_shard))
        .group_shard("GroupShard1", Arc::new(group_shard_1))
        .group_shard("GroupShard2", Arc::new(group_shard_2))
        .assign(DataElement::Group, "group3", "GroupShard1")
        .assign(DataElement::Group, "group5", "GroupShard1")
        .assign(DataElement::Group, "group1", "GroupShard2")
        .assign(DataElement::Group, "group2", "GroupShard2")
        .assign(DataElement::Group, "group4", "GroupShard2")
        .assign(DataElement::Group, "group6", "GroupShard2");
    let (coordinator, recorder) = coordinator(directory);

    let granted = coordinator
        .has_access_to_application_component("user1", "Order", "Create")
        .await
        .unwrap();

    assert!(granted);
    assert_eq!(recorder.added(CoordinatorMetric::GroupsMappedToUser), 6);
    assert_eq!(recorder.added(CoordinatorMetric::GroupShardsQueried), 2);
    assert_eq!(
        terminal_events(&recorder, CoordinatorMetric::HasAccessToApplicationComponent),
        (1, 0, 1)
    );
}

#[tokio::test]
async fn test_has_access_unknown_user_is_denied_not_an_error() {
    let user_shard = MockShardClient::new()
        .error(
            "get_user_to_group_mappings",
            ClientError::UserNotFound("user1".into()),
        )
        .error(
            "has_access_to_application_component",
            ClientError::UserNotFound("user1".into()),
        );
    let directory = MockDirectory::new()
        .user_shard("UserShard", Arc::new(user_shard))
        .group_shard("GroupShard", Arc::new(MockShardClient::new()))
        .group_to_group_shard("MappingShard", Arc::new(MockShardClient::new()));
    let (coordinator, recorder) = coordinator(directory);

    let granted = coordinator
        .has_access_to_application_component("user1", "Order", "Create")
        .await
        .unwrap();

    assert!(!granted);
    assert_eq!(recorder.added(CoordinatorMetric::GroupsMappedToUser), 0);
    assert_eq!(recorder.added(CoordinatorMetric::GroupShardsQueried), 0);
    // Two gauge samples, both zero.
    assert_eq!(
        recorder.count(|e| matches!(e, MetricEvent::Add(_, _))),
        2
    );
    assert_eq!(
        terminal_events(&recorder, CoordinatorMetric::HasAccessToApplicationComponent),
        (1, 0, 1)
    );
}

#[tokio::test]
async fn test_indirect_user_to_group_mappings_multi_shard_closure() {
    let user_shard = MockShardClient::new().strings_for(
        "get_user_to_group_mappings",
        "user1",
        &["group2", "group3", "group1", "group5", "group4"],
    );
    let g2g_shard_1 = MockShardClient::new().strings(
        "get_group_to_group_mappings_for_groups",
        &["group6", "group2", "group1", "group4", "group3"],
    );
    let g2g_shard_2 = MockShardClient::new().strings(
        "get_group_to_group_mappings_for_groups",
        &["group7", "group3", "group5", "group1"],
    );

    let directory = MockDirectory::new()
        .user_shard("UserShard", Arc::new(user_shard))
        .group_to_group_shard("MappingShard1", Arc::new(g2g_shard_1))
        .group_to_group_shard("MappingShard2", Arc::new(g2g_shard_2))
        .assign(DataElement::GroupToGroupMapping, "group3", "MappingShard2")
        .assign(DataElement::GroupToGroupMapping, "group5", "MappingShard2");
    let (coordinator, recorder) = coordinator(directory);

    let groups = coordinator
        .get_user_to_group_mappings("user1", true)
        .await
        .unwrap();

    assert_eq!(
        groups,
        set(&["group1", "group2", "group3", "group4", "group5", "group6", "group7"])
    );
    assert_eq!(recorder.added(CoordinatorMetric::GroupsMappedToUser), 7);
    assert_eq!(recorder.added(CoordinatorMetric::GroupShardsQueried), 2);
}

#[tokio::test]
async fn test_add_group_broadcast_mid_fanout_failure() {
    let group_shard = MockShardClient::new();
    let g2g_shard =
        MockShardClient::new().error("add_group", ClientError::Rpc("Mock exception".into()));
    let user_shard = MockShardClient::new();

    let directory = MockDirectory::new()
        .group_shard("ShardDescription1", Arc::new(group_shard))
        .group_to_group_shard("ShardDescription2", Arc::new(g2g_shard))
        .user_shard("ShardDescription3", Arc::new(user_shard));
    let (coordinator, recorder) = coordinator(directory);

    let err = coordinator.add_group("group1").await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Failed to add group 'group1' to shard with configuration 'ShardDescription2'."
    );
    match err {
        Error::ShardOperation { source, .. } => {
            assert_eq!(source, ClientError::Rpc("Mock exception".into()));
        }
        other => panic!("expected ShardOperation, got {:?}", other),
    }
    assert_eq!(
        terminal_events(&recorder, CoordinatorMetric::AddGroup),
        (0, 1, 0)
    );
}

#[tokio::test]
async fn test_add_group_targets_all_three_elements() {
    let group_shard = Arc::new(MockShardClient::new());
    let g2g_shard = Arc::new(MockShardClient::new());
    let user_shard = Arc::new(MockShardClient::new());

    let directory = MockDirectory::new()
        .group_shard("GroupShard", group_shard.clone())
        .group_to_group_shard("MappingShard", g2g_shard.clone())
        .user_shard("UserShard", user_shard.clone());
    let (coordinator, _) = coordinator(directory);

    coordinator.add_group("group1").await.unwrap();

    assert_eq!(group_shard.calls(), vec!["add_group(group1)"]);
    assert_eq!(g2g_shard.calls(), vec!["add_group(group1)"]);
    assert_eq!(user_shard.calls(), vec!["add_group(group1)"]);
}

#[tokio::test]
async fn test_user_not_found_round_trips_unchanged() {
    let user_shard = MockShardClient::new().error(
        "get_user_to_group_mappings",
        ClientError::UserNotFound("user1".into()),
    );
    let directory = MockDirectory::new().user_shard("UserShard", Arc::new(user_shard));
    let (coordinator, recorder) = coordinator(directory);

    let err = coordinator
        .get_user_to_group_mappings("user1", false)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UserNotFound(ref user) if user == "user1"));
    assert_eq!(
        err.to_string(),
        ClientError::UserNotFound("user1".into()).to_string()
    );
    assert_eq!(
        terminal_events(&recorder, CoordinatorMetric::GetUserToGroupMappings),
        (0, 1, 0)
    );
}

#[tokio::test]
async fn test_empty_direct_groups_skip_closure_and_group_layer() {
    let user_shard = Arc::new(MockShardClient::new().boolean("has_access_to_entity", false));
    let g2g_shard = Arc::new(MockShardClient::new());
    let group_shard = Arc::new(MockShardClient::new());

    let directory = MockDirectory::new()
        .user_shard("UserShard", user_shard)
        .group_to_group_shard("MappingShard", g2g_shard.clone())
        .group_shard("GroupShard", group_shard.clone());
    let (coordinator, recorder) = coordinator(directory);

    let granted = coordinator
        .has_access_to_entity("user1", "Order", "order1")
        .await
        .unwrap();

    assert!(!granted);
    // No direct groups: neither the mapping layer nor the group layer is
    // contacted.
    assert!(g2g_shard.calls().is_empty());
    assert!(group_shard.calls().is_empty());
    assert_eq!(recorder.added(CoordinatorMetric::GroupsMappedToUser), 0);
    assert_eq!(recorder.added(CoordinatorMetric::GroupShardsQueried), 0);
}

#[tokio::test]
async fn test_boolean_or_never_flips_back() {
    // Whichever shard answers first, one true grant decides the query.
    for (first, second) in [(true, false), (false, true)] {
        let user_shard = MockShardClient::new().strings_for(
            "get_user_to_group_mappings",
            "user1",
            &["group1", "group2"],
        );
        let g2g_shard = MockShardClient::new()
            .strings("get_group_to_group_mappings_for_groups", &["group1", "group2"]);
        let group_shard_1 = MockShardClient::new()
            .boolean("has_access_to_application_component_for_groups", first);
        let group_shard_2 = MockShardClient::new()
            .boolean("has_access_to_application_component_for_groups", second);

        let directory = MockDirectory::new()
            .user_shard("UserShard", Arc::new(user_shard))
            .group_to_group_shard("MappingShard", Arc::new(g2g_shard))
            .group_shard("GroupShard1", Arc::new(group_shard_1))
            .group_shard("GroupShard2", Arc::new(group_shard_2))
            .assign(DataElement::Group, "group1", "GroupShard1")
            .assign(DataElement::Group, "group2", "GroupShard2");
        let (coordinator, _) = coordinator(directory);

        let granted = coordinator
            .has_access_to_application_component("user1", "Order", "Create")
            .await
            .unwrap();

        assert!(granted);
    }
}

#[tokio::test]
async fn test_unmapped_group_still_reaches_group_layer() {
    // A group mapped to no other groups must still contribute its direct
    // entity mappings.
    let g2g_shard = Arc::new(MockShardClient::new());
    let group_shard = Arc::new(MockShardClient::new().strings(
        "get_entities_of_type_accessible_by_groups",
        &["order1", "order2"],
    ));

    let directory = MockDirectory::new()
        .user_shard("UserShard", Arc::new(MockShardClient::new()))
        .group_to_group_shard("MappingShard", g2g_shard)
        .group_shard("GroupShard", group_shard.clone());
    let (coordinator, recorder) = coordinator(directory);

    let entities = coordinator
        .get_entities_accessible_by_group_of_type("group1", "Order")
        .await
        .unwrap();

    assert_eq!(entities, set(&["order1", "order2"]));
    assert_eq!(
        group_shard.calls(),
        vec!["get_entities_of_type_accessible_by_groups(group1, Order)"]
    );
    assert_eq!(recorder.added(CoordinatorMetric::GroupsMappedToGroup), 0);
    assert_eq!(recorder.added(CoordinatorMetric::GroupShardsQueried), 1);
}

#[tokio::test]
async fn test_group_to_group_mappings_swallow_unknown_group() {
    let g2g_shard = MockShardClient::new().error(
        "get_group_to_group_mappings",
        ClientError::GroupNotFound("group1".into()),
    );
    let directory =
        MockDirectory::new().group_to_group_shard("MappingShard", Arc::new(g2g_shard));
    let (coordinator, recorder) = coordinator(directory);

    let groups = coordinator
        .get_group_to_group_mappings("group1", false)
        .await
        .unwrap();

    assert!(groups.is_empty());
    assert_eq!(
        terminal_events(&recorder, CoordinatorMetric::GetGroupToGroupMappings),
        (1, 0, 1)
    );
}

#[tokio::test]
async fn test_indirect_group_to_group_mappings_record_gauges() {
    let g2g_shard = MockShardClient::new()
        .strings_for("get_group_to_group_mappings", "group1", &["group2"])
        .strings(
            "get_group_to_group_mappings_for_groups",
            &["group2", "group3"],
        );
    let directory =
        MockDirectory::new().group_to_group_shard("MappingShard", Arc::new(g2g_shard));
    let (coordinator, recorder) = coordinator(directory);

    let groups = coordinator
        .get_group_to_group_mappings("group1", true)
        .await
        .unwrap();

    assert_eq!(groups, set(&["group2", "group3"]));
    assert_eq!(recorder.added(CoordinatorMetric::GroupsMappedToGroup), 2);
    assert_eq!(recorder.added(CoordinatorMetric::GroupShardsQueried), 1);
}

#[tokio::test]
async fn test_indirect_swallowed_group_records_zero_gauges() {
    let g2g_shard = MockShardClient::new().error(
        "get_group_to_group_mappings",
        ClientError::GroupNotFound("group1".into()),
    );
    let directory =
        MockDirectory::new().group_to_group_shard("MappingShard", Arc::new(g2g_shard));
    let (coordinator, recorder) = coordinator(directory);

    let groups = coordinator
        .get_group_to_group_mappings("group1", true)
        .await
        .unwrap();

    assert!(groups.is_empty());
    assert_eq!(recorder.added(CoordinatorMetric::GroupsMappedToGroup), 0);
    assert_eq!(recorder.added(CoordinatorMetric::GroupShardsQueried), 0);
    // Both gauges are still sampled on the swallowed path.
    assert_eq!(recorder.count(|e| matches!(e, MetricEvent::Add(_, _))), 2);
}

#[tokio::test]
async fn test_reverse_group_to_user_traversal() {
    // group1 is reachable from groupA; users of both map in.
    let g2g_shard = MockShardClient::new().strings(
        "get_group_to_group_reverse_mappings_for_groups",
        &["groupA"],
    );
    let user_shard_1 = MockShardClient::new()
        .strings("get_group_to_user_mappings_for_groups", &["user1", "user2"]);
    let user_shard_2 =
        MockShardClient::new().strings("get_group_to_user_mappings_for_groups", &["user3"]);

    let directory = MockDirectory::new()
        .group_to_group_shard("MappingShard", Arc::new(g2g_shard))
        .user_shard("UserShard1", Arc::new(user_shard_1))
        .user_shard("UserShard2", Arc::new(user_shard_2));
    let (coordinator, recorder) = coordinator(directory);

    let users = coordinator
        .get_group_to_user_mappings("group1", true)
        .await
        .unwrap();

    assert_eq!(users, set(&["user1", "user2", "user3"]));
    assert_eq!(recorder.added(CoordinatorMetric::GroupsMappedToGroup), 1);
    assert_eq!(recorder.added(CoordinatorMetric::GroupShardsQueried), 1);
}

#[tokio::test]
async fn test_indirect_entity_to_user_mappings() {
    let user_shard = MockShardClient::new()
        .strings("get_entity_to_user_mappings", &["user1"])
        .strings("get_group_to_user_mappings_for_groups", &["user2", "user3"]);
    let group_shard =
        MockShardClient::new().strings("get_entity_to_group_mappings", &["group1"]);
    let g2g_shard = MockShardClient::new().strings(
        "get_group_to_group_reverse_mappings_for_groups",
        &["group2"],
    );

    let directory = MockDirectory::new()
        .user_shard("UserShard", Arc::new(user_shard))
        .group_shard("GroupShard", Arc::new(group_shard))
        .group_to_group_shard("MappingShard", Arc::new(g2g_shard));
    let (coordinator, recorder) = coordinator(directory);

    let users = coordinator
        .get_entity_to_user_mappings("Order", "order1", true)
        .await
        .unwrap();

    assert_eq!(users, set(&["user1", "user2", "user3"]));
    // group1 direct plus group2 from the reverse closure, over one shard.
    assert_eq!(recorder.added(CoordinatorMetric::GroupsMappedToGroup), 2);
    assert_eq!(recorder.added(CoordinatorMetric::GroupShardsQueried), 1);
}

#[tokio::test]
async fn test_entity_reads_tolerate_unknown_type_per_shard() {
    let user_shard = MockShardClient::new().error(
        "get_entities",
        ClientError::EntityTypeNotFound("Order".into()),
    );
    let group_shard = MockShardClient::new().strings("get_entities", &["order1"]);

    let directory = MockDirectory::new()
        .user_shard("UserShard", Arc::new(user_shard))
        .group_shard("GroupShard", Arc::new(group_shard));
    let (coordinator, _) = coordinator(directory);

    let entities = coordinator.get_entities("Order").await.unwrap();

    assert_eq!(entities, set(&["order1"]));
}

#[tokio::test]
async fn test_accessible_by_user_unions_direct_and_group_results() {
    let user_shard = MockShardClient::new()
        .strings_for("get_user_to_group_mappings", "user1", &["group1"])
        .pairs(
            "get_application_components_accessible_by_user",
            &[("Order", "View")],
        );
    let g2g_shard =
        MockShardClient::new().strings("get_group_to_group_mappings_for_groups", &["group1"]);
    let group_shard = MockShardClient::new().pairs(
        "get_application_components_accessible_by_groups",
        &[("Order", "Create"), ("Order", "View")],
    );

    let directory = MockDirectory::new()
        .user_shard("UserShard", Arc::new(user_shard))
        .group_to_group_shard("MappingShard", Arc::new(g2g_shard))
        .group_shard("GroupShard", Arc::new(group_shard));
    let (coordinator, recorder) = coordinator(directory);

    let components = coordinator
        .get_application_components_accessible_by_user("user1")
        .await
        .unwrap();

    let expected: HashSet<(String, String)> = [
        ("Order".to_string(), "View".to_string()),
        ("Order".to_string(), "Create".to_string()),
    ]
    .into();
    assert_eq!(components, expected);
    assert_eq!(recorder.added(CoordinatorMetric::GroupsMappedToUser), 1);
}

#[tokio::test]
async fn test_directory_failure_cancels_metric_interval() {
    // No user shards configured at all.
    let directory = MockDirectory::new().group_shard("GroupShard", Arc::new(MockShardClient::new()));
    let (coordinator, recorder) = coordinator(directory);

    let err = coordinator.get_users().await.unwrap_err();

    assert!(matches!(err, Error::Directory(_)));
    assert_eq!(
        terminal_events(&recorder, CoordinatorMetric::GetUsers),
        (0, 1, 0)
    );
}

#[tokio::test]
async fn test_point_writes_route_to_owning_shard_only() {
    let owner = Arc::new(MockShardClient::new());
    let other = Arc::new(MockShardClient::new());

    let directory = MockDirectory::new()
        .user_shard("Owner", owner.clone())
        .user_shard("Other", other.clone())
        .assign(DataElement::User, "user1", "Owner");
    let (coordinator, _) = coordinator(directory);

    coordinator.add_user("user1").await.unwrap();
    coordinator
        .add_user_to_group_mapping("user1", "group1")
        .await
        .unwrap();

    assert_eq!(
        owner.calls(),
        vec![
            "add_user(user1)",
            "add_user_to_group_mapping(user1, group1)"
        ]
    );
    assert!(other.calls().is_empty());
}
