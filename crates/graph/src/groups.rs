//! Destination group resolution with a per-run cache.

use std::collections::HashMap;

use tracing::{debug, info};

use cloudlift_core::directory::DirectoryClient;
use cloudlift_core::error::Result;
use cloudlift_core::models::directory::{DirectoryGroup, NewGroup};

/// Groups known to exist in the destination, keyed by lowercased display
/// name. Loaded from `list_groups` on first use.
#[derive(Debug, Default)]
pub struct GroupCache {
    loaded: bool,
    by_name: HashMap<String, DirectoryGroup>,
    created: usize,
}

impl GroupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of groups created through this cache.
    pub fn created(&self) -> usize {
        self.created
    }

    pub fn get(&self, display_name: &str) -> Option<&DirectoryGroup> {
        self.by_name.get(&display_name.to_lowercase())
    }

    /// Reload the cache from the directory.
    pub async fn refresh<D: DirectoryClient + ?Sized>(&mut self, client: &D) -> Result<()> {
        let groups = client.list_groups().await?;
        debug!(count = groups.len(), "loaded destination groups");
        self.by_name = groups
            .into_iter()
            .map(|g| (g.display_name.to_lowercase(), g))
            .collect();
        self.loaded = true;
        Ok(())
    }

    /// Return the named group, creating it as a security group when absent.
    /// A create rejected because the group already exists is resolved by
    /// re-listing.
    pub async fn ensure<D: DirectoryClient + ?Sized>(
        &mut self,
        client: &D,
        display_name: &str,
    ) -> Result<DirectoryGroup> {
        if !self.loaded {
            self.refresh(client).await?;
        }
        if let Some(group) = self.get(display_name) {
            return Ok(group.clone());
        }

        match client.create_group(&NewGroup::security(display_name)).await {
            Ok(group) => {
                info!(group = %display_name, id = %group.id, "created group");
                self.created += 1;
                self.by_name
                    .insert(display_name.to_lowercase(), group.clone());
                Ok(group)
            }
            Err(e) if e.is_already_exists() => {
                debug!(group = %display_name, "group created concurrently, re-listing");
                self.refresh(client).await?;
                self.get(display_name).cloned().ok_or(e)
            }
            Err(e) => Err(e),
        }
    }
}
