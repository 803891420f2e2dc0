// src/txpool.rs - Shared per-height transaction-pool TAB reference

use anyhow::{Context, Result};
use parking_lot::{Mutex, RwLock};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Normal};
use std::collections::HashMap;

/// Models the TAB mass sitting in the transaction pool at each height: one
/// normally distributed draw per height, shared by every miner. The first
/// miner to mine at a height fixes the value; all later observers read the
/// same one. A miner's local reference is this draw plus its own balance.
pub struct TxPoolOracle {
    draws: RwLock<HashMap<u64, i64>>,
    rng: Mutex<ChaCha20Rng>,
    dist: Normal<f64>,
}

impl TxPoolOracle {
    pub fn new(genesis_tabs: i64, seed: u64) -> Result<Self> {
        let mu = genesis_tabs as f64;
        let dist = Normal::new(mu, mu / 4.0).context("tx pool TAB distribution")?;
        Ok(TxPoolOracle {
            draws: RwLock::new(HashMap::new()),
            rng: Mutex::new(ChaCha20Rng::seed_from_u64(seed)),
            dist,
        })
    }

    /// The shared reference draw for a height, sampling it on first access.
    pub fn reference_at(&self, height: u64) -> i64 {
        if let Some(v) = self.draws.read().get(&height) {
            return *v;
        }
        let mut draws = self.draws.write();
        *draws
            .entry(height)
            .or_insert_with(|| self.dist.sample(&mut *self.rng.lock()) as i64)
    }
}
