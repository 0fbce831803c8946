use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::pair::Asset;

/// Sector buckets that bound pairwise comparison.
///
/// Keys iterate in sorted order so candidate generation is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniversePartition {
    groups: BTreeMap<String, Vec<Asset>>,
}

impl UniversePartition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single bucket holding a flat universe
    pub fn flat(assets: Vec<Asset>) -> Self {
        let mut partition = Self::new();
        partition.insert("all", assets);
        partition
    }

    /// Add assets to a group, skipping duplicates within the group
    pub fn insert(&mut self, key: impl Into<String>, assets: Vec<Asset>) {
        let group = self.groups.entry(key.into()).or_default();
        for asset in assets {
            if !group.contains(&asset) {
                group.push(asset);
            }
        }
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &[Asset])> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// All groups collapsed into one, keeping first-seen order
    pub fn merged(&self) -> UniversePartition {
        let mut merged = Vec::new();
        let mut seen = BTreeSet::new();
        for assets in self.groups.values() {
            for asset in assets {
                if seen.insert(asset.clone()) {
                    merged.push(asset.clone());
                }
            }
        }
        Self::flat(merged)
    }

    /// Every group truncated to its first `max` assets
    pub fn capped(&self, max: usize) -> UniversePartition {
        let groups = self
            .groups
            .iter()
            .map(|(k, v)| (k.clone(), v.iter().take(max).cloned().collect()))
            .collect();
        UniversePartition { groups }
    }

    /// Distinct assets across all groups
    pub fn assets(&self) -> BTreeSet<Asset> {
        self.groups.values().flatten().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.values().all(|v| v.is_empty())
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}
