// src/tests/support.rs - Shared fixtures for the test modules

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::sync::Arc;

use crate::block::{Block, BlockHash, MinerId, Tick};
use crate::config::Config;
use crate::delay::{Delay, DelayModel};
use crate::miner::Miner;
use crate::txpool::TxPoolOracle;

/// Small-run configuration with round numbers that make hand-computed
/// weights easy to follow.
pub fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.sim.miners = 3;
    cfg.sim.run_secs = 600;
    cfg.sim.seed = 7;
    cfg.genesis.difficulty = 1000;
    cfg
}

/// A standalone miner with zero-delay propagation, seeded with its own
/// genesis block.
pub fn test_miner(id: usize, hashes_per_tick: i64, cfg: Arc<Config>) -> Miner {
    let oracle = Arc::new(TxPoolOracle::new(cfg.genesis.tabs, 7).expect("oracle"));
    let mut rng = ChaCha20Rng::seed_from_u64(99);
    let genesis = Block::genesis(cfg.genesis.tabs, cfg.genesis.difficulty, &mut rng);
    Miner::new(
        MinerId(id),
        format!("{:06x}", id),
        0.5,
        hashes_per_tick,
        0,
        DelayModel::constant(0, 0, 0),
        genesis,
        cfg,
        oracle,
        ChaCha20Rng::seed_from_u64(id as u64),
    )
}

/// Hand-built block with explicit identity and chain weight; score weight
/// follows the difficulty weight so both algorithms order candidates the
/// same way unless a test overrides it.
pub fn block(height: u64, hash: u64, parent_hash: u64, td: i64) -> Block {
    Block {
        height,
        timestamp: height as Tick * 10,
        interval: 10,
        difficulty: 1000,
        total_difficulty: td,
        tabs: 10_000,
        ttdtabs: td * 10_000,
        fall_count: 0,
        score_cmp: 0,
        author: MinerId::GENESIS,
        hash: BlockHash(hash),
        parent_hash: BlockHash(parent_hash),
        canonical: false,
        delay: Delay::default(),
    }
}
