//! User element operations.

use std::collections::HashSet;

use accessmux_stats::CoordinatorMetric;

use crate::directory::{DataElement, OperationKind};
use crate::fanout::{self, Policy};

use super::{Coordinator, Error};

impl Coordinator {
    /// Add a user record on the shard owning `user`.
    pub async fn add_user(&self, user: &str) -> Result<(), Error> {
        let guard = self.begin(CoordinatorMetric::AddUser);
        let shard =
            self.directory
                .get_client(DataElement::User, OperationKind::Event, user)?;
        let action = format!("add user '{}' to", user);

        shard
            .client()
            .add_user(user)
            .await
            .map_err(|err| Error::from_client(&action, shard.description(), err))?;

        guard.complete();
        Ok(())
    }

    /// Whether any shard knows `user`.
    pub async fn contains_user(&self, user: &str) -> Result<bool, Error> {
        let guard = self.begin(CoordinatorMetric::ContainsUser);
        let shards = self
            .directory
            .get_all_clients(DataElement::User, OperationKind::Query)?;
        let action = format!("check for user '{}' in", user);
        let user = user.to_owned();

        let found = fanout::any(shards, Policy::new(&action), move |shard| {
            let user = user.clone();
            async move { shard.client().contains_user(&user).await }
        })
        .await?;

        guard.complete();
        Ok(found)
    }

    /// Remove a user record from the shard owning `user`.
    pub async fn remove_user(&self, user: &str) -> Result<(), Error> {
        let guard = self.begin(CoordinatorMetric::RemoveUser);
        let shard =
            self.directory
                .get_client(DataElement::User, OperationKind::Event, user)?;
        let action = format!("remove user '{}' from", user);

        shard
            .client()
            .remove_user(user)
            .await
            .map_err(|err| Error::from_client(&action, shard.description(), err))?;

        guard.complete();
        Ok(())
    }

    /// All users across the fleet.
    pub async fn get_users(&self) -> Result<HashSet<String>, Error> {
        let guard = self.begin(CoordinatorMetric::GetUsers);
        let shards = self
            .directory
            .get_all_clients(DataElement::User, OperationKind::Query)?;

        let users = fanout::union(shards, Policy::new("retrieve users from"), |shard| {
            async move { shard.client().get_users().await }
        })
        .await?;

        guard.complete();
        Ok(users)
    }
}
