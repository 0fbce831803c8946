//! Pair Screener
//!
//! Generates directed candidates within each universe partition, runs the
//! gate pipeline on each, ranks survivors by one metric and keeps the best
//! pairs such that no asset is used twice.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, info};

use crate::domain::{estimate_commission, Asset, MetricKind, Pair, ScreeningMetrics, UniversePartition};
use crate::ports::PriceHistoryPort;
use crate::strategy::gates::{build_pipeline, run_pipeline, Gate, PairStatistics, Verdict};
use crate::strategy::params::ScreeningParams;

/// One selected pair with its screening record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortlistEntry {
    pub pair: Pair,
    pub metrics: ScreeningMetrics,
    /// Entry commission for both legs, when estimated
    pub estimated_commission: Option<f64>,
}

/// Ranked, deduplicated pairs selected for trading
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shortlist {
    entries: Vec<ShortlistEntry>,
}

impl Shortlist {
    pub fn entries(&self) -> &[ShortlistEntry] {
        &self.entries
    }

    pub fn pairs(&self) -> Vec<Pair> {
        self.entries.iter().map(|e| e.pair.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, pair: &Pair) -> Option<&ShortlistEntry> {
        self.entries.iter().find(|e| &e.pair == pair)
    }

    /// Every asset used by a selected pair
    pub fn assets(&self) -> BTreeSet<Asset> {
        self.entries
            .iter()
            .flat_map(|e| e.pair.assets().into_iter().cloned())
            .collect()
    }

    /// Drop a pair and its metrics
    pub fn remove(&mut self, pair: &Pair) -> Option<ShortlistEntry> {
        let index = self.entries.iter().position(|e| &e.pair == pair)?;
        Some(self.entries.remove(index))
    }

    /// Fill in the commission of entering each pair with half a pair's
    /// capital share on each leg
    pub fn estimate_commissions(
        &mut self,
        prices: &dyn PriceHistoryPort,
        portfolio_value: f64,
        rate: f64,
        desired_pairs: usize,
    ) {
        let bet_size = portfolio_value * 0.5 / desired_pairs.max(1) as f64;
        for entry in &mut self.entries {
            let first = prices.current_price(&entry.pair.first);
            let second = prices.current_price(&entry.pair.second);
            entry.estimated_commission = match (first, second) {
                (Ok(p1), Ok(p2)) => Some(
                    estimate_commission(p1, bet_size, rate) + estimate_commission(p2, bet_size, rate),
                ),
                _ => None,
            };
        }
    }
}

/// Per-gate counters for one screening cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateTally {
    pub evaluated: usize,
    pub passed: usize,
    pub rejected: usize,
    pub errors: usize,
}

/// Outcome of one screening cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreeningReport {
    pub partitions: usize,
    pub candidates: usize,
    pub survivors: usize,
    /// Assets skipped because their history could not be fetched
    pub missing_history: Vec<Asset>,
    pub gates: BTreeMap<MetricKind, GateTally>,
    pub shortlist: Shortlist,
}

impl fmt::Display for ScreeningReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Screened {} candidates in {} partition(s): {} survived, {} selected",
            self.candidates,
            self.partitions,
            self.survivors,
            self.shortlist.len()
        )?;
        for (kind, tally) in &self.gates {
            writeln!(
                f,
                "  {:<14} evaluated {:>6}  passed {:>6}  rejected {:>6}  errors {:>6}",
                kind.label(),
                tally.evaluated,
                tally.passed,
                tally.rejected,
                tally.errors
            )?;
        }
        if !self.missing_history.is_empty() {
            writeln!(f, "  missing history: {}", self.missing_history.len())?;
        }
        for (rank, entry) in self.shortlist.entries().iter().enumerate() {
            write!(f, "{:>3}. {}", rank + 1, entry.pair)?;
            for kind in MetricKind::ALL {
                if let Some(value) = entry.metrics.get(kind) {
                    write!(f, "  {}={:.4}", kind.label(), value)?;
                }
            }
            if let Some(commission) = entry.estimated_commission {
                write!(f, "  commission={:.2}", commission)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Screens a universe for tradable pairs
pub struct PairScreener<'a> {
    params: &'a ScreeningParams,
    statistics: &'a dyn PairStatistics,
    gates: Vec<Gate>,
}

impl<'a> PairScreener<'a> {
    pub fn new(params: &'a ScreeningParams, statistics: &'a dyn PairStatistics) -> Self {
        Self {
            params,
            statistics,
            gates: build_pipeline(params),
        }
    }

    pub fn screen(
        &self,
        universe: &UniversePartition,
        prices: &dyn PriceHistoryPort,
    ) -> ScreeningReport {
        let universe = if self.params.cross_partition {
            universe.merged()
        } else {
            universe.clone()
        };
        let universe = universe.capped(self.params.max_partition_size);
        let lookback = self.params.max_lookback();

        let mut report = ScreeningReport {
            partitions: universe.group_count(),
            gates: self.gates.iter().map(|g| (g.kind(), GateTally::default())).collect(),
            ..Default::default()
        };
        let mut survivors = Vec::new();

        for (key, assets) in universe.groups() {
            let mut histories: Vec<(&Asset, Vec<f64>)> = Vec::with_capacity(assets.len());
            for asset in assets {
                match prices.history(asset, lookback) {
                    Ok(series) => histories.push((asset, series)),
                    Err(e) => {
                        debug!("Skipping {} in {}: {}", asset, key, e);
                        report.missing_history.push(asset.clone());
                    }
                }
            }

            for i in 0..histories.len() {
                for j in (i + 1)..histories.len() {
                    let (a, series_a) = &histories[i];
                    let (b, series_b) = &histories[j];
                    for (first, second, s1, s2) in [(a, b, series_a, series_b), (b, a, series_b, series_a)] {
                        let pair = Pair {
                            first: (*first).clone(),
                            second: (*second).clone(),
                        };
                        report.candidates += 1;
                        if let Some(metrics) = self.evaluate(&pair, s1, s2, &mut report.gates) {
                            survivors.push((pair, metrics));
                        }
                    }
                }
            }
        }

        report.survivors = survivors.len();
        report.shortlist = rank_and_select(survivors, self.params.ranking_metric, self.params.desired_pairs);

        info!(
            "Screening complete: {} candidates, {} survivors, {} pairs selected",
            report.candidates,
            report.survivors,
            report.shortlist.len()
        );
        report
    }

    fn evaluate(
        &self,
        pair: &Pair,
        first: &[f64],
        second: &[f64],
        tallies: &mut BTreeMap<MetricKind, GateTally>,
    ) -> Option<ScreeningMetrics> {
        let run = run_pipeline(&self.gates, self.statistics, first, second);

        // Every gate before the stopping one passed
        let stopped_at = match &run.verdict {
            Verdict::Survived => None,
            Verdict::Rejected(kind) | Verdict::Failed(kind, _) => Some(*kind),
        };
        for gate in &self.gates {
            let tally = tallies.entry(gate.kind()).or_default();
            tally.evaluated += 1;
            if Some(gate.kind()) == stopped_at {
                match &run.verdict {
                    Verdict::Failed(_, e) => {
                        tally.errors += 1;
                        debug!("{} dropped at {} gate: {}", pair, gate.kind(), e);
                    }
                    _ => {
                        tally.rejected += 1;
                        debug!(
                            "{} rejected at {} gate ({:?})",
                            pair,
                            gate.kind(),
                            run.metrics.get(gate.kind())
                        );
                    }
                }
                break;
            }
            tally.passed += 1;
        }

        match run.verdict {
            Verdict::Survived => Some(run.metrics),
            _ => None,
        }
    }
}

/// Rank survivors by `metric`, give each asset to its best-ranked pair and
/// keep at most `desired` pairs.
///
/// The sort is stable, so ties keep candidate generation order.
pub fn rank_and_select(
    mut survivors: Vec<(Pair, ScreeningMetrics)>,
    metric: MetricKind,
    desired: usize,
) -> Shortlist {
    let key = |m: &ScreeningMetrics| m.ranking_key(metric).unwrap_or(f64::NAN);
    survivors.sort_by(|(_, a), (_, b)| {
        let (ka, kb) = (key(a), key(b));
        match (ka.is_nan(), kb.is_nan()) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            (false, false) if metric.higher_is_better() => kb.total_cmp(&ka),
            (false, false) => ka.total_cmp(&kb),
        }
    });

    let mut used: BTreeSet<Asset> = BTreeSet::new();
    let mut entries = Vec::new();
    for (pair, metrics) in survivors {
        if entries.len() >= desired {
            break;
        }
        if used.contains(&pair.first) || used.contains(&pair.second) {
            continue;
        }
        used.insert(pair.first.clone());
        used.insert(pair.second.clone());
        entries.push(ShortlistEntry {
            pair,
            metrics,
            estimated_commission: None,
        });
    }
    Shortlist { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mocks::MockPriceHistory;
    use crate::strategy::gates::ClassicalStatistics;
    use crate::strategy::stats::test_series::{random_walk, white_noise};
    use crate::strategy::stats::StatError;
    use approx::assert_relative_eq;

    fn pair(a: &str, b: &str) -> Pair {
        Pair::new(Asset::from(a), Asset::from(b)).unwrap()
    }

    fn with_coint(p: f64) -> ScreeningMetrics {
        ScreeningMetrics {
            cointegration_p: Some(p),
            ..Default::default()
        }
    }

    #[test]
    fn test_rank_ascending_for_p_values() {
        let survivors = vec![
            (pair("A", "B"), with_coint(0.02)),
            (pair("C", "D"), with_coint(0.001)),
            (pair("E", "F"), with_coint(0.01)),
        ];
        let shortlist = rank_and_select(survivors, MetricKind::Cointegration, 10);
        assert_eq!(shortlist.pairs(), vec![pair("C", "D"), pair("E", "F"), pair("A", "B")]);
    }

    #[test]
    fn test_rank_descending_for_correlation_magnitude() {
        let corr = |c: f64| ScreeningMetrics {
            correlation: Some(c),
            ..Default::default()
        };
        let survivors = vec![
            (pair("A", "B"), corr(0.96)),
            (pair("C", "D"), corr(-0.99)),
            (pair("E", "F"), corr(0.98)),
        ];
        let shortlist = rank_and_select(survivors, MetricKind::Correlation, 10);
        assert_eq!(shortlist.pairs(), vec![pair("C", "D"), pair("E", "F"), pair("A", "B")]);
    }

    #[test]
    fn test_dedup_first_ranked_wins() {
        let survivors = vec![
            (pair("KO", "PEP"), with_coint(0.001)),
            (pair("PEP", "KO"), with_coint(0.002)),
            (pair("PEP", "MO"), with_coint(0.003)),
            (pair("XOM", "CVX"), with_coint(0.004)),
        ];
        let shortlist = rank_and_select(survivors, MetricKind::Cointegration, 10);
        assert_eq!(shortlist.pairs(), vec![pair("KO", "PEP"), pair("XOM", "CVX")]);
        assert!(shortlist.get(&pair("PEP", "MO")).is_none());
    }

    #[test]
    fn test_truncates_to_desired() {
        let survivors = vec![
            (pair("A", "B"), with_coint(0.01)),
            (pair("C", "D"), with_coint(0.02)),
            (pair("E", "F"), with_coint(0.03)),
        ];
        let shortlist = rank_and_select(survivors, MetricKind::Cointegration, 2);
        assert_eq!(shortlist.len(), 2);
    }

    #[test]
    fn test_ties_keep_generation_order() {
        let survivors = vec![
            (pair("A", "B"), with_coint(0.01)),
            (pair("C", "D"), with_coint(0.01)),
        ];
        let shortlist = rank_and_select(survivors, MetricKind::Cointegration, 2);
        assert_eq!(shortlist.pairs(), vec![pair("A", "B"), pair("C", "D")]);
    }

    /// Cointegration p-value grows with the price level of both legs;
    /// normality never computes
    struct PriceLevelStatistics;

    impl PairStatistics for PriceLevelStatistics {
        fn correlation(&self, _: &[f64], _: &[f64]) -> Result<f64, StatError> {
            Ok(0.99)
        }
        fn cointegration_p_value(&self, first: &[f64], second: &[f64]) -> Result<f64, StatError> {
            Ok((first[0] + second[0]) / 10_000.0)
        }
        fn hedge_ratio(&self, _: &[f64], _: &[f64]) -> Result<f64, StatError> {
            Ok(1.0)
        }
        fn stationarity_p_value(&self, _: &[f64]) -> Result<f64, StatError> {
            Ok(0.001)
        }
        fn hurst_exponent(&self, _: &[f64]) -> Result<f64, StatError> {
            Ok(0.2)
        }
        fn half_life(&self, _: &[f64]) -> Result<f64, StatError> {
            Ok(12.0)
        }
        fn normality_p_value(&self, _: &[f64]) -> Result<f64, StatError> {
            Err(StatError::InsufficientData("test".into()))
        }
    }

    #[test]
    fn test_screen_counts_candidates_and_tallies() {
        let params = ScreeningParams::default()
            .with_lookback(10)
            .with_gate(MetricKind::Normality, false);
        let prices = MockPriceHistory::new()
            .with_series("A", vec![10.0; 10])
            .with_series("B", vec![20.0; 10])
            .with_series("C", vec![30.0; 10]);
        let universe = UniversePartition::flat(vec![Asset::from("A"), Asset::from("B"), Asset::from("C")]);

        let statistics = PriceLevelStatistics;
        let screener = PairScreener::new(&params, &statistics);
        let report = screener.screen(&universe, &prices);

        assert_eq!(report.candidates, 6);
        assert_eq!(report.survivors, 6);
        assert_eq!(report.gates[&MetricKind::Correlation].passed, 6);
        assert!(!report.gates.contains_key(&MetricKind::Normality));
        // A/B ranks first and takes both assets a second pair could use
        assert_eq!(report.shortlist.pairs(), vec![pair("A", "B")]);
    }

    #[test]
    fn test_screen_tolerates_gate_errors_and_missing_history() {
        let params = ScreeningParams::default().with_lookback(10);
        let prices = MockPriceHistory::new()
            .with_series("A", vec![10.0; 10])
            .with_series("B", vec![20.0; 10])
            .with_series("SHORT", vec![5.0; 3]);
        let universe = UniversePartition::flat(vec![
            Asset::from("A"),
            Asset::from("SHORT"),
            Asset::from("B"),
        ]);
        let statistics = PriceLevelStatistics;
        let report = PairScreener::new(&params, &statistics).screen(&universe, &prices);

        assert_eq!(report.missing_history, vec![Asset::from("SHORT")]);
        assert_eq!(report.candidates, 2);
        assert_eq!(report.gates[&MetricKind::Normality].errors, 2);
        assert!(report.shortlist.is_empty());
    }

    #[test]
    fn test_partitions_bound_comparisons() {
        let params = ScreeningParams::default()
            .with_lookback(10)
            .with_gate(MetricKind::Normality, false);
        let prices = MockPriceHistory::new()
            .with_series("A", vec![10.0; 10])
            .with_series("B", vec![20.0; 10])
            .with_series("C", vec![30.0; 10])
            .with_series("D", vec![40.0; 10]);
        let mut universe = UniversePartition::new();
        universe.insert("one", vec![Asset::from("A"), Asset::from("B")]);
        universe.insert("two", vec![Asset::from("C"), Asset::from("D")]);

        let statistics = PriceLevelStatistics;
        let report = PairScreener::new(&params, &statistics).screen(&universe, &prices);
        assert_eq!(report.candidates, 4);
        assert_eq!(report.shortlist.pairs(), vec![pair("A", "B"), pair("C", "D")]);

        let mut merged = params.clone();
        merged.cross_partition = true;
        let report = PairScreener::new(&merged, &statistics).screen(&universe, &prices);
        assert_eq!(report.candidates, 12);
    }

    #[test]
    fn test_screen_finds_cointegrated_pair() {
        let mut params = ScreeningParams::default().with_lookback(500);
        params.correlation.min_abs = 0.7;
        params.half_life.lower = 0.0;
        params.half_life.upper = 50.0;
        params = params
            .with_gate(MetricKind::Normality, false)
            .with_gate(MetricKind::Hurst, false);

        let x = random_walk(500, 50.0, 1.0, 3);
        let noise = white_noise(500, 4);
        let y: Vec<f64> = x.iter().zip(noise.iter()).map(|(v, e)| 0.5 * v + 20.0 + 3.0 * e).collect();
        let z = random_walk(500, 80.0, 1.0, 99);
        let prices = MockPriceHistory::new()
            .with_series("Y", y)
            .with_series("X", x)
            .with_series("Z", z);
        let universe = UniversePartition::flat(vec![Asset::from("Y"), Asset::from("X"), Asset::from("Z")]);

        let statistics = ClassicalStatistics;
        let report = PairScreener::new(&params, &statistics).screen(&universe, &prices);
        assert_eq!(report.shortlist.pairs(), vec![pair("Y", "X")]);
    }

    #[test]
    fn test_commission_estimate() {
        let prices = MockPriceHistory::new()
            .with_series("A", vec![50.0])
            .with_series("B", vec![100.0]);
        let mut shortlist = rank_and_select(vec![(pair("A", "B"), with_coint(0.01))], MetricKind::Cointegration, 4);
        shortlist.estimate_commissions(&prices, 100_000.0, 0.0035, 4);
        // bet 12500 per leg: 250 + 125 shares
        let commission = shortlist.entries()[0].estimated_commission.unwrap();
        assert_relative_eq!(commission, 375.0 * 0.0035, epsilon = 1e-12);
    }

    #[test]
    fn test_report_renders_text_and_json() {
        let report = ScreeningReport {
            partitions: 1,
            candidates: 2,
            survivors: 1,
            shortlist: rank_and_select(vec![(pair("KO", "PEP"), with_coint(0.001))], MetricKind::Cointegration, 4),
            ..Default::default()
        };
        let text = report.to_string();
        assert!(text.contains("KO/PEP"));
        assert!(text.contains("cointegration=0.0010"));
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"KO\""));
    }
}
