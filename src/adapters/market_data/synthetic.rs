//! Synthetic universe generator
//!
//! Each sector gets one embedded cointegrated pair: a geometric random walk
//! and a hedged copy of it plus mean-reverting noise. The remaining assets
//! in the sector are independent geometric random walks.

use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::Normal;
use std::collections::{BTreeMap, BTreeSet};

use super::price_file::PriceFile;
use crate::domain::{Asset, Pair, UniversePartition};

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticUniverse {
    pub sectors: usize,
    pub assets_per_sector: usize,
    pub periods: usize,
    pub seed: u64,
    /// Half-life of the embedded spreads, in periods
    pub spread_half_life: f64,
    /// Per-period log-return volatility of the walks
    pub volatility: f64,
}

impl Default for SyntheticUniverse {
    fn default() -> Self {
        Self {
            sectors: 3,
            assets_per_sector: 4,
            periods: 800,
            seed: 7,
            spread_half_life: 12.0,
            volatility: 0.01,
        }
    }
}

impl SyntheticUniverse {
    pub fn asset(sector: usize, index: usize) -> Asset {
        Asset::new(format!("S{}A{}", sector, index))
    }

    /// The cointegrated pair embedded in each sector (hedged copy first)
    pub fn embedded_pairs(&self) -> Vec<Pair> {
        if self.assets_per_sector < 2 {
            return Vec::new();
        }
        (0..self.sectors)
            .map(|s| Pair {
                first: Self::asset(s, 1),
                second: Self::asset(s, 0),
            })
            .collect()
    }

    pub fn generate(&self) -> PriceFile {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let normal = Normal::standard();

        let mut sectors = UniversePartition::new();
        let mut prices = BTreeMap::new();

        for s in 0..self.sectors {
            let mut members = Vec::with_capacity(self.assets_per_sector);
            let mut base: Vec<f64> = Vec::new();

            for a in 0..self.assets_per_sector {
                let series = if a == 1 {
                    self.hedged_copy(&base, &mut rng, &normal)
                } else {
                    self.walk(&mut rng, &normal)
                };
                if a == 0 {
                    base = series.clone();
                }
                let asset = Self::asset(s, a);
                prices.insert(asset.clone(), series);
                members.push(asset);
            }
            sectors.insert(format!("sector{}", s), members);
        }

        PriceFile {
            sectors,
            prices,
            untradeable: BTreeSet::new(),
        }
    }

    fn walk(&self, rng: &mut StdRng, normal: &Normal) -> Vec<f64> {
        let mut price: f64 = rng.gen_range(20.0..150.0);
        (0..self.periods)
            .map(|_| {
                price *= (self.volatility * normal.sample(rng)).exp();
                price
            })
            .collect()
    }

    /// `beta * base + alpha + ou` with an AR(1) spread of the configured half-life
    fn hedged_copy(&self, base: &[f64], rng: &mut StdRng, normal: &Normal) -> Vec<f64> {
        let phi = (-std::f64::consts::LN_2 / self.spread_half_life).exp();
        let beta: f64 = rng.gen_range(0.5..1.5);
        let alpha: f64 = rng.gen_range(5.0..25.0);
        let sigma = 0.005 * beta * base.first().copied().unwrap_or(50.0);
        let mut spread = 0.0;
        base.iter()
            .map(|b| {
                spread = phi * spread + sigma * normal.sample(rng);
                (beta * b + alpha + spread).max(0.01)
            })
            .collect()
    }
}
