//! Fan-out executor: one logical operation expanded to N concurrent shard
//! RPCs.
//!
//! Every shard call runs on its own task. The first fatal error aborts the
//! peers and surfaces alone; benign errors contribute empty results; the
//! boolean shapes short-circuit on the first `true`. Dropping the future of
//! the enclosing operation drops the `JoinSet`, which aborts all in-flight
//! tasks, so caller cancellation propagates transitively.

pub(crate) mod policy;

pub(crate) use policy::{Disposition, Policy};

use std::collections::HashSet;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::coordinator::Error;
use crate::directory::ShardBucket;
use crate::shard::{ClientError, ShardRef};

type TaskOutput<T> = (Arc<str>, Result<T, ClientError>);

fn spawn_all<T, F, Fut>(shards: Vec<ShardRef>, op: F) -> JoinSet<TaskOutput<T>>
where
    T: Send + 'static,
    F: Fn(ShardRef) -> Fut,
    Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
{
    let mut tasks = JoinSet::new();
    for shard in shards {
        let description = shard.description_arc();
        let fut = op(shard);
        tasks.spawn(async move { (description, fut.await) });
    }
    tasks
}

fn spawn_buckets<T, F, Fut>(buckets: Vec<ShardBucket>, op: F) -> JoinSet<TaskOutput<T>>
where
    T: Send + 'static,
    F: Fn(ShardRef, HashSet<String>) -> Fut,
    Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
{
    let mut tasks = JoinSet::new();
    for bucket in buckets {
        let description = bucket.shard.description_arc();
        let fut = op(bucket.shard, bucket.keys);
        tasks.spawn(async move { (description, fut.await) });
    }
    tasks
}

/// Drain the task set, pushing successes and applying the error policy.
/// Returns early on the first fatal or propagated error.
async fn drain<T: 'static>(
    mut tasks: JoinSet<TaskOutput<T>>,
    policy: Policy<'_>,
) -> Result<Vec<T>, Error> {
    let mut partials = Vec::with_capacity(tasks.len());

    while let Some(joined) = tasks.join_next().await {
        let (description, result) = match joined {
            Ok(output) => output,
            Err(err) if err.is_cancelled() => continue,
            Err(err) => std::panic::resume_unwind(err.into_panic()),
        };

        match result {
            Ok(partial) => partials.push(partial),
            Err(err) => match policy.classify(&err) {
                Disposition::Benign => {
                    warn!(
                        "shard \"{}\" contributed no result to \"{}\": {}",
                        description, policy.action, err
                    );
                }
                Disposition::Propagate | Disposition::Fatal => {
                    tasks.abort_all();
                    return Err(Error::from_client(policy.action, &description, err));
                }
            },
        }
    }

    Ok(partials)
}

/// Run `op` on every shard and return all partial results.
pub(crate) async fn collect<T, F, Fut>(
    shards: Vec<ShardRef>,
    policy: Policy<'_>,
    op: F,
) -> Result<Vec<T>, Error>
where
    T: Send + 'static,
    F: Fn(ShardRef) -> Fut,
    Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
{
    debug!("fan-out \"{}\" over {} shards", policy.action, shards.len());
    drain(spawn_all(shards, op), policy).await
}

/// Broadcast write: every shard must succeed.
pub(crate) async fn all<F, Fut>(
    shards: Vec<ShardRef>,
    policy: Policy<'_>,
    op: F,
) -> Result<(), Error>
where
    F: Fn(ShardRef) -> Fut,
    Fut: Future<Output = Result<(), ClientError>> + Send + 'static,
{
    collect(shards, policy, op).await.map(|_| ())
}

/// Set-union aggregation over a plain fan-out.
pub(crate) async fn union<T, F, Fut>(
    shards: Vec<ShardRef>,
    policy: Policy<'_>,
    op: F,
) -> Result<HashSet<T>, Error>
where
    T: Eq + Hash + Send + 'static,
    F: Fn(ShardRef) -> Fut,
    Fut: Future<Output = Result<HashSet<T>, ClientError>> + Send + 'static,
{
    Ok(collect(shards, policy, op)
        .await?
        .into_iter()
        .flatten()
        .collect())
}

/// Set-union aggregation over a bucketed fan-out.
pub(crate) async fn union_buckets<T, F, Fut>(
    buckets: Vec<ShardBucket>,
    policy: Policy<'_>,
    op: F,
) -> Result<HashSet<T>, Error>
where
    T: Eq + Hash + Send + 'static,
    F: Fn(ShardRef, HashSet<String>) -> Fut,
    Fut: Future<Output = Result<HashSet<T>, ClientError>> + Send + 'static,
{
    debug!(
        "bucketed fan-out \"{}\" over {} shards",
        policy.action,
        buckets.len()
    );
    Ok(drain(spawn_buckets(buckets, op), policy)
        .await?
        .into_iter()
        .flatten()
        .collect())
}

/// Boolean OR over the shard results. The first `true` aborts the remaining
/// tasks and wins immediately; benign errors count as `false`.
async fn drain_any(mut tasks: JoinSet<TaskOutput<bool>>, policy: Policy<'_>) -> Result<bool, Error> {
    while let Some(joined) = tasks.join_next().await {
        let (description, result) = match joined {
            Ok(output) => output,
            Err(err) if err.is_cancelled() => continue,
            Err(err) => std::panic::resume_unwind(err.into_panic()),
        };

        match result {
            Ok(true) => {
                tasks.abort_all();
                return Ok(true);
            }
            Ok(false) => {}
            Err(err) => match policy.classify(&err) {
                Disposition::Benign => {
                    warn!(
                        "shard \"{}\" contributed no result to \"{}\": {}",
                        description, policy.action, err
                    );
                }
                Disposition::Propagate | Disposition::Fatal => {
                    tasks.abort_all();
                    return Err(Error::from_client(policy.action, &description, err));
                }
            },
        }
    }

    Ok(false)
}

pub(crate) async fn any<F, Fut>(
    shards: Vec<ShardRef>,
    policy: Policy<'_>,
    op: F,
) -> Result<bool, Error>
where
    F: Fn(ShardRef) -> Fut,
    Fut: Future<Output = Result<bool, ClientError>> + Send + 'static,
{
    debug!("fan-out \"{}\" over {} shards", policy.action, shards.len());
    drain_any(spawn_all(shards, op), policy).await
}

pub(crate) async fn any_buckets<F, Fut>(
    buckets: Vec<ShardBucket>,
    policy: Policy<'_>,
    op: F,
) -> Result<bool, Error>
where
    F: Fn(ShardRef, HashSet<String>) -> Fut,
    Fut: Future<Output = Result<bool, ClientError>> + Send + 'static,
{
    debug!(
        "bucketed fan-out \"{}\" over {} shards",
        policy.action,
        buckets.len()
    );
    drain_any(spawn_buckets(buckets, op), policy).await
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use tokio::time::sleep;

    use super::*;
    use crate::testing::MockShardClient;

    fn shard(name: &str, client: MockShardClient) -> ShardRef {
        ShardRef::new(Arc::new(client), name)
    }

    #[tokio::test]
    async fn test_union_deduplicates() {
        let shards = vec![
            shard(
                "shard-0",
                MockShardClient::new().strings("get_users", &["user1", "user2"]),
            ),
            shard(
                "shard-1",
                MockShardClient::new().strings("get_users", &["user2", "user3"]),
            ),
        ];

        let users = union(shards, Policy::new("retrieve users from"), |shard| {
            async move { shard.client().get_users().await }
        })
        .await
        .unwrap();

        let expected: HashSet<String> = ["user1", "user2", "user3"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(users, expected);
    }

    #[tokio::test]
    async fn test_fatal_error_wraps_with_description() {
        let shards = vec![
            shard("shard-0", MockShardClient::new()),
            shard(
                "shard-1",
                MockShardClient::new().error("get_users", ClientError::Rpc("Mock exception".into())),
            ),
        ];

        let err = union(shards, Policy::new("retrieve users from"), |shard| {
            async move { shard.client().get_users().await }
        })
        .await
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to retrieve users from shard with configuration 'shard-1'."
        );
        match err {
            Error::ShardOperation { source, .. } => {
                assert_eq!(source, ClientError::Rpc("Mock exception".into()));
            }
            other => panic!("expected ShardOperation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_not_found_passes_through_typed() {
        let shards = vec![shard(
            "shard-0",
            MockShardClient::new()
                .error("get_users", ClientError::UserNotFound("user1".into())),
        )];

        let err = union(shards, Policy::new("retrieve users from"), |shard| {
            async move { shard.client().get_users().await }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::UserNotFound(user) if user == "user1"));
    }

    #[tokio::test]
    async fn test_benign_error_contributes_empty() {
        let shards = vec![
            shard(
                "shard-0",
                MockShardClient::new().strings("get_entities", &["entity1"]),
            ),
            shard(
                "shard-1",
                MockShardClient::new().error(
                    "get_entities",
                    ClientError::EntityTypeNotFound("Order".into()),
                ),
            ),
        ];

        let entities = union(
            shards,
            Policy::benign_not_found("retrieve entities from"),
            |shard| async move { shard.client().get_entities("Order").await },
        )
        .await
        .unwrap();

        assert_eq!(entities.len(), 1);
        assert!(entities.contains("entity1"));
    }

    #[tokio::test]
    async fn test_any_short_circuits_on_true() {
        // The slow shard never gets to answer.
        let fast = shard(
            "fast",
            MockShardClient::new().boolean("contains_user", true),
        );
        let slow = shard("slow", MockShardClient::new().delay(Duration::from_secs(5)));

        let granted = any(
            vec![slow, fast],
            Policy::new("check for user 'user1' in"),
            |shard| async move { shard.client().contains_user("user1").await },
        )
        .await
        .unwrap();

        assert!(granted);
    }

    #[tokio::test]
    async fn test_any_false_when_all_false() {
        let shards = vec![
            shard("shard-0", MockShardClient::new()),
            shard("shard-1", MockShardClient::new()),
        ];

        let granted = any(shards, Policy::new("check for user 'user1' in"), |shard| {
            async move { shard.client().contains_user("user1").await }
        })
        .await
        .unwrap();

        assert!(!granted);
    }

    #[tokio::test]
    async fn test_all_aborts_peers_on_failure() {
        let failing = shard(
            "failing",
            MockShardClient::new().error("add_group", ClientError::Rpc("Mock exception".into())),
        );
        let slow_client = MockShardClient::new().delay(Duration::from_secs(5));
        let slow = shard("slow", slow_client);

        let started = std::time::Instant::now();
        let err = all(
            vec![slow, failing],
            Policy::new("add group 'group1' to"),
            |shard| async move { shard.client().add_group("group1").await },
        )
        .await
        .unwrap_err();

        // The slow peer was aborted, not awaited.
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(
            err.to_string(),
            "Failed to add group 'group1' to shard with configuration 'failing'."
        );
    }

    #[tokio::test]
    async fn test_empty_fanout_returns_empty() {
        let users: HashSet<String> = union(vec![], Policy::new("retrieve users from"), |shard| {
            async move { shard.client().get_users().await }
        })
        .await
        .unwrap();

        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn test_dropping_fanout_aborts_tasks() {
        let slow = shard("slow", MockShardClient::new().delay(Duration::from_secs(60)));

        let fut = union(vec![slow], Policy::new("retrieve users from"), |shard| {
            async move { shard.client().get_users().await }
        });

        tokio::select! {
            _ = fut => panic!("should not complete"),
            _ = sleep(Duration::from_millis(20)) => {}
        }
        // Dropping the future dropped the JoinSet and its tasks with it.
    }
}
