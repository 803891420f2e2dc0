// src/miner.rs - Mining agent: tick handling, mining, broadcast, receipt,
// and reorg bookkeeping

use log::debug;
use rand_chacha::ChaCha20Rng;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use crate::block::{Block, BlockHash, BlockId, MinerId, Tick};
use crate::config::Config;
use crate::consensus::{Arbiter, Choice, ConsensusAlgorithm};
use crate::delay::{Delay, DelayModel};
use crate::difficulty;
use crate::mining;
use crate::score;
use crate::tree::BlockTree;
use crate::txpool::TxPoolOracle;

/// Window, in seconds, within which a due pending block is still processed.
/// Anything released later than this past its scheduled tick is stale and
/// silently dropped.
const FUTURE_INHIBITION_SECS: i64 = 15;

/// A block in flight to a specific recipient.
pub struct Delivery {
    pub to: MinerId,
    pub block: Block,
}

/// Emitted every time a miner adopts a new head. The block set carries all
/// competitors recorded at the new head's height.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HeadEvent {
    pub miner: MinerId,
    pub height: u64,
    pub blocks: Vec<Block>,
}

/// Outbound traffic of a tick: deliveries awaiting routing by the scheduler,
/// and head events awaiting the end-of-tick drain.
#[derive(Default)]
pub struct Relay {
    pub deliveries: VecDeque<Delivery>,
    pub events: Vec<HeadEvent>,
}

/// Canonical-set churn of a single reorg.
#[derive(Debug, Clone, Copy)]
pub struct Reorg {
    pub added: u64,
    pub dropped: u64,
}

impl Reorg {
    pub fn magnitude(&self) -> f64 {
        (self.added + self.dropped) as f64
    }
}

pub struct Miner {
    pub id: MinerId,
    pub address: String,
    /// Share of the global hashrate, for reporting.
    pub hashrate: f64,
    pub hashes_per_tick: i64,
    pub balance: i64,
    /// Maximum balance this miner will hold; 0 means uncapped.
    pub balance_cap: i64,
    pub arbiter: Arbiter,
    /// Reorg log keyed by the adopted head's height.
    pub reorgs: BTreeMap<u64, Reorg>,
    pub tree: BlockTree,

    delays: DelayModel,
    head: Option<BlockId>,
    neighbors: Vec<MinerId>,
    /// Received blocks not yet visible, keyed by their scheduled-visible
    /// tick; FIFO within a key.
    pending: BTreeMap<Tick, Vec<Block>>,
    tick: Tick,
    rng: ChaCha20Rng,
    cfg: Arc<Config>,
    oracle: Arc<TxPoolOracle>,
}

impl Miner {
    pub fn new(
        id: MinerId,
        address: String,
        hashrate: f64,
        hashes_per_tick: i64,
        balance: i64,
        delays: DelayModel,
        genesis: Block,
        cfg: Arc<Config>,
        oracle: Arc<TxPoolOracle>,
        rng: ChaCha20Rng,
    ) -> Self {
        let mut miner = Miner {
            id,
            address,
            hashrate,
            hashes_per_tick,
            balance,
            balance_cap: cfg.consensus.balance_cap,
            arbiter: Arbiter::new(cfg.consensus.algorithm, cfg.consensus.skip_random_tiebreak),
            reorgs: BTreeMap::new(),
            tree: BlockTree::new(),
            delays,
            head: None,
            neighbors: Vec::new(),
            pending: BTreeMap::new(),
            tick: 0,
            rng,
            cfg,
            oracle,
        };
        // Seeding the shared genesis runs the no-head path: forced
        // canonical, no arbitration, no traffic.
        let mut relay = Relay::default();
        miner.process_block(genesis, &mut relay);
        miner
    }

    pub fn add_neighbor(&mut self, id: MinerId) {
        self.neighbors.push(id);
    }

    pub fn neighbors(&self) -> &[MinerId] {
        &self.neighbors
    }

    pub fn head(&self) -> BlockId {
        self.head.expect("miner head is set at construction")
    }

    pub fn head_block(&self) -> &Block {
        self.tree.get(self.head())
    }

    pub fn reorg_magnitudes(&self) -> Vec<f64> {
        self.reorgs.values().map(Reorg::magnitude).collect()
    }

    /// One scheduler tick: release due pending blocks, then attempt one
    /// mining trial.
    pub fn handle_tick(&mut self, tick: Tick, relay: &mut Relay) {
        self.tick = tick;

        let window = FUTURE_INHIBITION_SECS * self.cfg.sim.ticks_per_second;
        let due: Vec<Tick> = self.pending.range(..=tick).map(|(&k, _)| k).collect();
        for k in due {
            let blocks = self.pending.remove(&k).expect("due key present");
            if tick <= k + window {
                for b in blocks {
                    self.process_block(b, relay);
                }
            } else {
                debug!(
                    "[MINER {}] dropped {} stale blocks scheduled for tick {}",
                    self.address,
                    blocks.len(),
                    k
                );
            }
        }

        self.mine(relay);
    }

    /// Accepts a block from a neighbor, applying any postponement policy.
    /// Zero total delay means immediate processing; otherwise the block is
    /// queued under its scheduled-visible tick.
    pub fn receive_block(&mut self, mut block: Block, relay: &mut Relay) {
        if let Some(postpone) = &self.delays.postpone {
            block.delay.postpone = postpone(&block);
        }
        let total = block.delay.total();
        if total > 0 {
            self.pending
                .entry(block.timestamp + total)
                .or_default()
                .push(block);
            return;
        }
        self.process_block(block, relay);
    }

    /// Appends a block, arbitrates it against the current head, and relays
    /// it onward if it was new to this miner.
    pub fn process_block(&mut self, block: Block, relay: &mut Relay) {
        let append = self.tree.insert(block);
        let id = append.id();
        let is_new = !append.is_duplicate();

        let head = match self.head {
            None => {
                // First block ever processed becomes head unconditionally.
                self.tree.get_mut(id).canonical = true;
                self.head = Some(id);
                return;
            }
            Some(h) => h,
        };

        let choice =
            self.arbiter
                .arbitrate(self.id, &mut self.rng, self.tree.get(head), self.tree.get(id));
        let winner = match choice {
            Choice::Incumbent => head,
            Choice::Challenger => id,
        };
        self.set_head(winner, relay);

        if is_new {
            self.relay_block(id, relay);
        }
    }

    fn mine(&mut self, relay: &mut Relay) {
        let Some(parent_id) = self.head else { return };
        let parent = self.tree.get(parent_id).clone();

        let solved = mining::trial(
            self.hashes_per_tick as f64,
            parent.difficulty as f64,
            self.cfg.network_lambda(),
            &mut self.rng,
        );
        if !solved {
            return;
        }

        // Timestamps are whole-second values expressed in tick units; a
        // collision with the parent bumps strictly past it.
        let tps = self.cfg.sim.ticks_per_second;
        let mut s = self.tick / tps * tps;
        if s == parent.timestamp {
            s = parent.timestamp + 1;
        }
        let interval = s - parent.timestamp;

        let reference = self.oracle.reference_at(parent.height + 1) + self.balance;
        let cmp = score::score_cmp(parent.tabs, reference);
        let falls = score::next_fall_count(parent.fall_count, cmp);

        // Naive uncle model: any competitor recorded at the parent's parent
        // height counts as citable.
        let uncles = parent.height > 0 && self.tree.level(parent.height - 1).len() > 1;
        let block_difficulty = difficulty::next_difficulty(parent.difficulty, uncles, interval, tps);

        let denominator = self.cfg.consensus.tabs_adjustment_denominator;
        let tabs = match self.arbiter.algorithm {
            ConsensusAlgorithm::ScoreWeightedDifficultyStepped => {
                score::next_score_stepped(parent.tabs, falls, reference, denominator)
            }
            _ => score::next_score(parent.tabs, reference, denominator),
        };

        let block = Block {
            height: parent.height + 1,
            timestamp: s,
            interval,
            difficulty: block_difficulty,
            total_difficulty: parent.total_difficulty + block_difficulty,
            tabs,
            ttdtabs: parent.ttdtabs + tabs * block_difficulty,
            fall_count: falls,
            score_cmp: cmp,
            author: self.id,
            hash: BlockHash::random(&mut self.rng),
            parent_hash: parent.hash,
            canonical: false,
            delay: Delay::default(),
        };
        self.process_block(block, relay);
    }

    /// Queues one copy of a block for every neighbor, stamped with the
    /// sender-side delay components.
    fn relay_block(&self, id: BlockId, relay: &mut Relay) {
        if self.neighbors.is_empty() {
            return;
        }
        let base = self.tree.get(id).clone();
        for &n in &self.neighbors {
            let mut b = base.clone();
            b.delay = Delay {
                withhold: (self.delays.withhold)(&b),
                postpone: 0,
                material: (self.delays.latency)(&b),
            };
            relay.deliveries.push_back(Delivery { to: n, block: b });
        }
    }

    /// Adopts a head, running the reorg walk when the new head does not
    /// extend the old one, and emits the head event.
    fn set_head(&mut self, new_head: BlockId, relay: &mut Relay) {
        let old_head = self.head.expect("set_head runs after genesis seeding");
        let new_height = new_head.height;

        let reorg = self.tree.get(new_head).parent_hash != self.tree.get(old_head).hash;
        if reorg {
            // The new head itself is pre-counted.
            let mut added: u64 = 1;
            let mut dropped: u64 = 0;

            // No block above the new head stays canonical. A height with no
            // recorded blocks ends the walk.
            let mut h = new_height + 1;
            while !self.tree.level(h).is_empty() {
                for slot in 0..self.tree.level(h).len() {
                    if self.drop_canon(BlockId { height: h, slot }) {
                        dropped += 1;
                    }
                }
                h += 1;
            }

            // Nor does any competitor at the new head's own height.
            for slot in 0..self.tree.level(new_height).len() {
                let id = BlockId {
                    height: new_height,
                    slot,
                };
                if id != new_head && self.drop_canon(id) {
                    dropped += 1;
                }
            }

            // Walk back through the accepted lineage until the common
            // ancestor, swapping each level's canonical block.
            let mut parent = self.tree.parent_of(new_head);
            while let Some(pid) = parent {
                if self.tree.get(pid).canonical {
                    break;
                }
                for slot in 0..self.tree.level(pid.height).len() {
                    if self.drop_canon(BlockId {
                        height: pid.height,
                        slot,
                    }) {
                        dropped += 1;
                    }
                }
                if self.add_canon(pid) {
                    added += 1;
                }
                parent = self.tree.parent_of(pid);
            }

            self.reorgs.insert(new_height, Reorg { added, dropped });
            debug!(
                "[REORG] miner={} height={} added={} dropped={}",
                self.address, new_height, added, dropped
            );
        }

        self.head = Some(new_head);
        self.add_canon(new_head);

        relay.events.push(HeadEvent {
            miner: self.id,
            height: new_height,
            blocks: self.tree.level(new_height).to_vec(),
        });
    }

    /// Marks a block canonical. Self-authored blocks earn the block reward
    /// on a genuine flip only.
    fn add_canon(&mut self, id: BlockId) -> bool {
        let author = {
            let b = self.tree.get_mut(id);
            if b.canonical {
                return false;
            }
            b.canonical = true;
            b.author
        };
        if author == self.id {
            self.balance_add(self.cfg.consensus.block_reward);
        }
        true
    }

    /// Clears a block's canonical flag, refunding the reward for
    /// self-authored blocks. No-op when already non-canonical.
    fn drop_canon(&mut self, id: BlockId) -> bool {
        let author = {
            let b = self.tree.get_mut(id);
            if !b.canonical {
                return false;
            }
            b.canonical = false;
            b.author
        };
        if author == self.id {
            self.balance_add(-self.cfg.consensus.block_reward);
        }
        true
    }

    fn balance_add(&mut self, amount: i64) {
        self.balance += amount;
        if self.balance_cap != 0 && self.balance > self.balance_cap {
            self.balance = self.balance_cap;
        }
    }
}
