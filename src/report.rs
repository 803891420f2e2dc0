// src/report.rs - Per-miner terminal summaries for the reporting collaborator

use serde::Serialize;
use std::fmt;

use crate::config::Config;
use crate::consensus::DecisionReason;
use crate::miner::Miner;

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

pub fn median(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Most frequent values; multiple on a tie, ascending.
pub fn mode(xs: &[f64]) -> Vec<f64> {
    let mut counts: std::collections::HashMap<u64, usize> = std::collections::HashMap::new();
    for x in xs {
        *counts.entry(x.to_bits()).or_insert(0) += 1;
    }
    let max = counts.values().copied().max().unwrap_or(0);
    if max <= 1 {
        return Vec::new();
    }
    let mut modes: Vec<f64> = counts
        .iter()
        .filter(|(_, &c)| c == max)
        .map(|(&bits, _)| f64::from_bits(bits))
        .collect();
    modes.sort_by(f64::total_cmp);
    modes
}

/// Final state of one miner, distilled for terminal output.
#[derive(Debug, Clone, Serialize)]
pub struct MinerSummary {
    pub address: String,
    pub algorithm: String,
    pub hashrate: f64,
    pub wins: usize,
    pub win_rate: f64,
    pub head_height: u64,
    pub head_tabs: i64,
    pub head_difficulty: i64,
    pub head_total_difficulty: i64,
    pub head_ttdtabs: i64,
    pub k_mean: f64,
    pub k_median: f64,
    pub k_mode: Vec<f64>,
    pub intervals_mean_secs: f64,
    pub difficulties_rel_genesis_mean: f64,
    pub balance: i64,
    pub objective_decision_rate: f64,
    pub arbitrations: u64,
    pub reorg_magnitude_mean: f64,
    /// Fractions of arbitrations settled by each ladder rule, in ladder
    /// order; rules that never decided are omitted.
    pub decision_rates: Vec<(String, f64)>,
}

pub fn summarize(miner: &Miner, cfg: &Config) -> MinerSummary {
    let head = miner.head_block();

    let wins = miner
        .tree
        .filtered(|b| b.canonical && b.author == miner.id)
        .len();
    let win_rate = if head.height > 0 {
        wins as f64 / head.height as f64
    } else {
        0.0
    };

    let ks = miner.tree.block_counts();
    let intervals = miner.tree.canonical_intervals();
    let difficulties = miner.tree.canonical_difficulties();

    let arbitrations = miner.arbiter.arbitrations;
    let objective_rate = if arbitrations > 0 {
        miner.arbiter.objective_arbitrations as f64 / arbitrations as f64
    } else {
        0.0
    };

    let decision_rates = DecisionReason::ALL
        .iter()
        .filter(|&&r| miner.arbiter.tally(r) > 0)
        .map(|&r| {
            (
                r.as_str().to_string(),
                miner.arbiter.tally(r) as f64 / arbitrations as f64,
            )
        })
        .collect();

    MinerSummary {
        address: miner.address.clone(),
        algorithm: miner.arbiter.algorithm.to_string(),
        hashrate: miner.hashrate,
        wins,
        win_rate,
        head_height: head.height,
        head_tabs: head.tabs,
        head_difficulty: head.difficulty,
        head_total_difficulty: head.total_difficulty,
        head_ttdtabs: head.ttdtabs,
        k_mean: mean(&ks),
        k_median: median(&ks),
        k_mode: mode(&ks),
        intervals_mean_secs: mean(&intervals) / cfg.sim.ticks_per_second as f64,
        difficulties_rel_genesis_mean: mean(&difficulties) / cfg.genesis.difficulty as f64,
        balance: miner.balance,
        objective_decision_rate: objective_rate,
        arbitrations,
        reorg_magnitude_mean: mean(&miner.reorg_magnitudes()),
        decision_rates,
    }
}

impl fmt::Display for MinerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "a={} c={} hr={:.2} winr={:.3} wins={} head.i={} head.tabs={} head.d={} head.td={} \
             head.ttdtabs={} k_mean={:.3} k_med={:.3} k_mode={:?} intervals_mean={:.3}s \
             d_mean.rel={:.3} balance={} objective_decs={:.3} arbs={} reorgs.mag_mean={:.3}",
            self.address,
            self.algorithm,
            self.hashrate,
            self.win_rate,
            self.wins,
            self.head_height,
            self.head_tabs,
            self.head_difficulty,
            self.head_total_difficulty,
            self.head_ttdtabs,
            self.k_mean,
            self.k_median,
            self.k_mode,
            self.intervals_mean_secs,
            self.difficulties_rel_genesis_mean,
            self.balance,
            self.objective_decision_rate,
            self.arbitrations,
            self.reorg_magnitude_mean,
        )?;
        for (name, rate) in &self.decision_rates {
            write!(f, "{}={:.2} ", name, rate)?;
        }
        Ok(())
    }
}
