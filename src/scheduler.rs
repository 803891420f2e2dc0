// src/scheduler.rs - Discrete-tick driver and block delivery routing

use anyhow::Result;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::collections::HashSet;
use std::sync::Arc;

use crate::block::{Block, MinerId};
use crate::config::Config;
use crate::delay::DelayModel;
use crate::miner::{HeadEvent, Miner, Relay};
use crate::txpool::TxPoolOracle;

// RNG stream tags, so every component draws from its own deterministic
// sequence under one configured seed.
const TICK_STREAM: u64 = 0;
const ORACLE_STREAM: u64 = 1;
const SETUP_STREAM: u64 = 2;
const MINER_STREAM_BASE: u64 = 16;

fn derive_seed(seed: u64, stream: u64) -> u64 {
    seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Owns the fleet and drives global discrete ticks. Each tick visits every
/// miner once in a fresh random permutation, routes the resulting block
/// deliveries until quiescent, and drains the ordered head-event queue to
/// the caller's sink.
pub struct Scheduler {
    cfg: Arc<Config>,
    miners: Vec<Miner>,
    rng: ChaCha20Rng,
    high_block: u64,
}

impl Scheduler {
    /// Validates the configuration and builds the fleet: hashrate shares,
    /// starting balances, delay models, the shared genesis block and tx
    /// pool oracle, and the random directed neighbor topology.
    pub fn new(cfg: Arc<Config>) -> Result<Self> {
        cfg.validate()?;

        let seed = cfg.sim.seed;
        let n = cfg.sim.miners;
        let shares = cfg.sim.hashrate_distribution.shares(n)?;

        let oracle = Arc::new(TxPoolOracle::new(
            cfg.genesis.tabs,
            derive_seed(seed, ORACLE_STREAM),
        )?);
        let mut setup_rng = ChaCha20Rng::seed_from_u64(derive_seed(seed, SETUP_STREAM));
        let genesis = Block::genesis(cfg.genesis.tabs, cfg.genesis.difficulty, &mut setup_rng);

        // Hashrate stands proxy for capital: the presumed circulating
        // supply is split by share, pairing the largest hashrate with the
        // smallest starting balance.
        let supply = cfg.genesis.tabs / cfg.genesis.balance_share_denominator * n as i64;

        let mut addresses = HashSet::new();
        let mut miners = Vec::with_capacity(n);
        for (i, &share) in shares.iter().enumerate() {
            let address = loop {
                let a = format!("{:06x}", setup_rng.gen::<u32>() & 0x00ff_ffff);
                if addresses.insert(a.clone()) {
                    break a;
                }
            };
            let balance = (supply as f64 * shares[n - 1 - i]) as i64;
            let hashes_per_tick = (cfg.genesis.difficulty as f64 * share) as i64;
            let delays = DelayModel::constant(
                cfg.secs_to_ticks(cfg.network.withhold_secs),
                cfg.secs_to_ticks(cfg.network.latency_secs),
                cfg.secs_to_ticks(cfg.network.postpone_secs),
            );
            let rng =
                ChaCha20Rng::seed_from_u64(derive_seed(seed, MINER_STREAM_BASE + i as u64));
            miners.push(Miner::new(
                MinerId(i),
                address,
                share,
                hashes_per_tick,
                balance,
                delays,
                genesis.clone(),
                cfg.clone(),
                oracle.clone(),
                rng,
            ));
        }

        for i in 0..n {
            for j in 0..n {
                if i != j && setup_rng.gen::<f64>() < cfg.network.neighbor_rate {
                    miners[i].add_neighbor(MinerId(j));
                }
            }
        }

        Ok(Scheduler {
            cfg: cfg.clone(),
            miners,
            rng: ChaCha20Rng::seed_from_u64(derive_seed(seed, TICK_STREAM)),
            high_block: 0,
        })
    }

    pub fn miners(&self) -> &[Miner] {
        &self.miners
    }

    /// Greatest head height any miner has reached.
    pub fn high_block(&self) -> u64 {
        self.high_block
    }

    /// Runs the full tick range, handing every head event to the sink in
    /// emission order after each tick.
    pub fn run(&mut self, mut on_event: impl FnMut(&HeadEvent)) {
        let run_ticks = self.cfg.run_ticks();
        info!(
            "[SIM] running {} miners for {} ticks ({} simulated hours), algorithm {}",
            self.miners.len(),
            run_ticks,
            self.cfg.sim.run_secs / 3600,
            self.cfg.consensus.algorithm
        );

        let mut order: Vec<usize> = (0..self.miners.len()).collect();
        for tick in 1..=run_ticks {
            // A fresh permutation each tick smooths any influence miner
            // ordering would have on block discovery outcomes.
            order.shuffle(&mut self.rng);

            let mut relay = Relay::default();
            for &i in &order {
                self.miners[i].handle_tick(tick, &mut relay);
                self.route(&mut relay);
            }

            for event in relay.events.drain(..) {
                if event.height > self.high_block {
                    self.high_block = event.height;
                    debug!(
                        "[SIM] tick {}: high block {} ({} competitors)",
                        tick,
                        event.height,
                        event.blocks.len()
                    );
                }
                on_event(&event);
            }
        }

        info!("[SIM] run complete, high block {}", self.high_block);
    }

    /// Drains the delivery queue, including cascades from recipients that
    /// process and relay immediately. Per-recipient mutation stays
    /// serialized: exactly one miner is borrowed at a time.
    fn route(&mut self, relay: &mut Relay) {
        while let Some(delivery) = relay.deliveries.pop_front() {
            self.miners[delivery.to.0].receive_block(delivery.block, relay);
        }
    }
}
