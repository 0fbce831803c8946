use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::pair::Asset;

/// Signed fraction of portfolio value per asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetWeights {
    weights: BTreeMap<Asset, f64>,
}

impl TargetWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every asset present with a zero weight
    pub fn zeroed<'a>(assets: impl IntoIterator<Item = &'a Asset>) -> Self {
        let weights = assets.into_iter().map(|a| (a.clone(), 0.0)).collect();
        Self { weights }
    }

    pub fn set(&mut self, asset: Asset, weight: f64) {
        self.weights.insert(asset, weight);
    }

    pub fn get(&self, asset: &Asset) -> Option<f64> {
        self.weights.get(asset).copied()
    }

    pub fn remove(&mut self, asset: &Asset) -> Option<f64> {
        self.weights.remove(asset)
    }

    pub fn contains(&self, asset: &Asset) -> bool {
        self.weights.contains_key(asset)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Asset, f64)> {
        self.weights.iter().map(|(a, w)| (a, *w))
    }

    pub fn assets(&self) -> Vec<Asset> {
        self.weights.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Sum of absolute weights (non-finite weights excluded)
    pub fn gross_exposure(&self) -> f64 {
        self.weights
            .values()
            .filter(|w| w.is_finite())
            .map(|w| w.abs())
            .sum()
    }

    /// Sum of signed weights
    pub fn net_exposure(&self) -> f64 {
        self.weights.values().filter(|w| w.is_finite()).sum()
    }

    /// Multiply every weight by `factor`
    pub fn scale(&mut self, factor: f64) {
        for w in self.weights.values_mut() {
            *w *= factor;
        }
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&Asset, f64) -> bool) {
        self.weights.retain(|a, w| keep(a, *w));
    }
}
