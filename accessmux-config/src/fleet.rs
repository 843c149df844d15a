//! Shard fleet description.
//!
//! A fleet names every backend shard the coordinator routes to, grouped by
//! the data element the shard owns. Loaded from TOML and handed to the shard
//! manager, which turns it into a live routing table.

use std::collections::HashSet;
use std::fs::read_to_string;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::Error;

/// One backend shard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardConfig {
    /// Human-readable shard tag. Round-trips verbatim into error messages.
    pub name: String,
    /// Base URL of the shard's query endpoint.
    pub url: String,
    /// Separate event (write) endpoint, if reads and writes are split.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_url: Option<String>,
}

impl ShardConfig {
    pub fn query_url(&self) -> &str {
        &self.url
    }

    /// Event endpoint, falling back to the query endpoint when not split.
    pub fn event_url(&self) -> &str {
        self.event_url.as_deref().unwrap_or(&self.url)
    }
}

/// The whole shard fleet, one shard list per data element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fleet {
    /// Shards owning user records.
    #[serde(default)]
    pub users: Vec<ShardConfig>,
    /// Shards owning group records.
    #[serde(default)]
    pub groups: Vec<ShardConfig>,
    /// Shards owning group-to-group mapping records.
    #[serde(default)]
    pub group_to_group: Vec<ShardConfig>,
}

impl Fleet {
    /// Load a fleet description from disk.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let contents = read_to_string(path)?;
        let fleet: Fleet = toml::from_str(&contents)
            .map_err(|err| Error::toml(&path.display().to_string(), err))?;
        fleet.validate()?;

        info!(
            "loaded \"{}\" ({} user, {} group, {} group-to-group shards)",
            path.display(),
            fleet.users.len(),
            fleet.groups.len(),
            fleet.group_to_group.len(),
        );

        Ok(fleet)
    }

    /// Check the fleet is internally consistent. Shard names must be unique
    /// fleet-wide since they identify shards in errors and logs.
    pub fn validate(&self) -> Result<(), Error> {
        let mut seen = HashSet::new();
        for shard in self.all() {
            if shard.name.is_empty() {
                return Err(Error::EmptyShardName);
            }
            if shard.url.is_empty() {
                return Err(Error::EmptyShardUrl(shard.name.clone()));
            }
            if !seen.insert(shard.name.as_str()) {
                return Err(Error::DuplicateShard(shard.name.clone()));
            }
        }
        Ok(())
    }

    fn all(&self) -> impl Iterator<Item = &ShardConfig> {
        self.users
            .iter()
            .chain(self.groups.iter())
            .chain(self.group_to_group.iter())
    }
}
