// src/config.rs

use anyhow::Result;
use serde::Deserialize;
use thiserror::Error;

use crate::block::Tick;
use crate::consensus::ConsensusAlgorithm;

/// The main configuration struct for a simulation run. Constructed once,
/// validated, and threaded immutably into every component.
#[derive(Clone, Deserialize, Debug, Default)]
#[serde(default)]
pub struct Config {
    pub sim: SimConfig,
    pub network: NetworkConfig,
    pub consensus: ConsensusConfig,
    pub genesis: GenesisConfig,
}

/// Run-shape configuration.
#[derive(Clone, Deserialize, Debug)]
#[serde(default)]
pub struct SimConfig {
    pub ticks_per_second: i64,
    /// Run length in simulated seconds.
    pub run_secs: i64,
    pub miners: usize,
    pub hashrate_distribution: HashrateDist,
    pub seed: u64,
}

/// Propagation and topology configuration.
#[derive(Clone, Deserialize, Debug)]
#[serde(default)]
pub struct NetworkConfig {
    /// Probability of each directed neighbor edge existing.
    pub neighbor_rate: f64,
    /// Target block production interval; source of the network-rate
    /// constant lambda.
    pub target_block_time_secs: f64,
    pub latency_secs: f64,
    pub withhold_secs: f64,
    pub postpone_secs: f64,
}

/// Fork-choice and reward configuration.
#[derive(Clone, Deserialize, Debug)]
#[serde(default)]
pub struct ConsensusConfig {
    pub algorithm: ConsensusAlgorithm,
    /// Lower values move the score faster toward the reference, favoring
    /// richer miners; 4096 is the conservative equilibrium value.
    pub tabs_adjustment_denominator: i64,
    pub block_reward: i64,
    /// Maximum balance a miner will hold. 0 means no limit.
    pub balance_cap: i64,
    pub skip_random_tiebreak: bool,
}

/// Genesis block and starting-balance configuration.
#[derive(Clone, Deserialize, Debug)]
#[serde(default)]
pub struct GenesisConfig {
    pub tabs: i64,
    pub difficulty: i64,
    /// A miner's starting balance is presumed to account for 1 / this value
    /// of the genesis TAB score, scaled by hashrate share.
    pub balance_share_denominator: i64,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            ticks_per_second: 10,
            run_secs: 6 * 60 * 60,
            miners: 12,
            hashrate_distribution: HashrateDist::Longtail,
            seed: 42,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            neighbor_rate: 0.5,
            target_block_time_secs: 13.0,
            latency_secs: 1.0,
            withhold_secs: 0.0,
            postpone_secs: 0.0,
        }
    }
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        ConsensusConfig {
            algorithm: ConsensusAlgorithm::TotalDifficulty,
            tabs_adjustment_denominator: 128,
            block_reward: 3,
            balance_cap: 0,
            skip_random_tiebreak: false,
        }
    }
}

impl Default for GenesisConfig {
    fn default() -> Self {
        GenesisConfig {
            tabs: 10_000,
            difficulty: 10_000_000_000,
            balance_share_denominator: 100,
        }
    }
}

/// Configuration rejected before a run is constructed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("simulation requires at least one miner")]
    NoMiners,
    #[error("ticks_per_second must be positive, got {0}")]
    TickRate(i64),
    #[error("run_secs must be positive, got {0}")]
    RunLength(i64),
    #[error("neighbor_rate must be within [0, 1], got {0}")]
    NeighborRate(f64),
    #[error("target_block_time_secs must be positive, got {0}")]
    BlockTime(f64),
    #[error("delay seconds must be non-negative")]
    Delay,
    #[error("tabs_adjustment_denominator must be positive, got {0}")]
    Denominator(i64),
    #[error("block_reward must be non-negative, got {0}")]
    Reward(i64),
    #[error("genesis tabs and difficulty must be positive")]
    Genesis,
    #[error("balance_share_denominator must be positive, got {0}")]
    BalanceShare(i64),
    #[error("hashrate distribution does not partition to 1 (sum {0})")]
    HashratePartition(f64),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sim.miners == 0 {
            return Err(ConfigError::NoMiners);
        }
        if self.sim.ticks_per_second < 1 {
            return Err(ConfigError::TickRate(self.sim.ticks_per_second));
        }
        if self.sim.run_secs < 1 {
            return Err(ConfigError::RunLength(self.sim.run_secs));
        }
        if !(0.0..=1.0).contains(&self.network.neighbor_rate) {
            return Err(ConfigError::NeighborRate(self.network.neighbor_rate));
        }
        if self.network.target_block_time_secs <= 0.0 {
            return Err(ConfigError::BlockTime(self.network.target_block_time_secs));
        }
        if self.network.latency_secs < 0.0
            || self.network.withhold_secs < 0.0
            || self.network.postpone_secs < 0.0
        {
            return Err(ConfigError::Delay);
        }
        if self.consensus.tabs_adjustment_denominator < 1 {
            return Err(ConfigError::Denominator(
                self.consensus.tabs_adjustment_denominator,
            ));
        }
        if self.consensus.block_reward < 0 {
            return Err(ConfigError::Reward(self.consensus.block_reward));
        }
        if self.genesis.tabs < 1 || self.genesis.difficulty < 1 {
            return Err(ConfigError::Genesis);
        }
        if self.genesis.balance_share_denominator < 1 {
            return Err(ConfigError::BalanceShare(
                self.genesis.balance_share_denominator,
            ));
        }
        // Shares must partition the whole network rate.
        let shares = self.sim.hashrate_distribution.shares(self.sim.miners)?;
        let sum: f64 = shares.iter().sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(ConfigError::HashratePartition(sum));
        }
        Ok(())
    }

    pub fn run_ticks(&self) -> Tick {
        self.sim.run_secs * self.sim.ticks_per_second
    }

    /// Per-tick network-rate constant lambda.
    pub fn network_lambda(&self) -> f64 {
        1.0 / self.network.target_block_time_secs / self.sim.ticks_per_second as f64
    }

    pub fn secs_to_ticks(&self, secs: f64) -> Tick {
        (secs * self.sim.ticks_per_second as f64) as Tick
    }
}

/// How the unit hashrate is split across the fleet.
#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum HashrateDist {
    Equal,
    Longtail,
}

impl HashrateDist {
    /// Produces one share per miner, summing to 1. The longtail variant
    /// gives each successive miner a third of the remaining rate and the
    /// last miner whatever is left, sorted descending.
    pub fn shares(self, n: usize) -> Result<Vec<f64>, ConfigError> {
        if n == 0 {
            return Err(ConfigError::NoMiners);
        }
        if n == 1 {
            return Ok(vec![1.0]);
        }
        match self {
            HashrateDist::Equal => Ok(vec![1.0 / n as f64; n]),
            HashrateDist::Longtail => {
                let mut out = Vec::with_capacity(n);
                let mut rem = 1.0f64;
                for i in 0..n {
                    let share = if i == 0 { 1.0 / 3.0 } else { 0.6 };
                    let mut take = if i != n - 1 { rem * share } else { 0.0 };
                    if take > rem / 3.0 {
                        take = rem / 3.0;
                    }
                    if i == n - 1 {
                        take = rem;
                    }
                    out.push(take);
                    rem -= take;
                }
                out.sort_by(|a, b| b.total_cmp(a));
                Ok(out)
            }
        }
    }
}

/// Loads the configuration, falling back to defaults when the file is
/// absent or a key is omitted.
pub fn load(filename: &str) -> Result<Config> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name(filename).required(false));

    let cfg: Config = builder.build()?.try_deserialize()?;
    Ok(cfg)
}
