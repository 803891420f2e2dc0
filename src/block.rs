// src/block.rs

use rand::Rng;
use serde::Serialize;
use std::fmt;

use crate::delay::Delay;

/// Simulation time, measured in scheduler ticks.
pub type Tick = i64;

/// Identifies a miner by its index in the simulation fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MinerId(pub usize);

impl MinerId {
    /// Sentinel author for the genesis block; never matches a real miner.
    pub const GENESIS: MinerId = MinerId(usize::MAX);
}

impl fmt::Display for MinerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == MinerId::GENESIS {
            write!(f, "genesis")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Content hash of a block. The simulation does not hash real contents;
/// a random 64-bit draw from the authoring miner's RNG stands in, and the
/// uniqueness invariant holds per-tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BlockHash(pub u64);

impl BlockHash {
    pub fn random(rng: &mut impl Rng) -> Self {
        BlockHash(rng.gen())
    }

    /// Abbreviated form used in tree dumps.
    pub fn short(&self) -> String {
        format!("{:08x}", (self.0 >> 32) as u32)
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Stable address of a block inside one miner's tree arena.
/// Slots are assigned in arrival order within a height bucket, so the same
/// block generally occupies different slots in different miners' trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockId {
    pub height: u64,
    pub slot: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Block {
    pub height: u64,
    /// Timestamp in tick units, normalized to whole-second boundaries.
    pub timestamp: Tick,
    /// Timestamp interval to the parent block.
    pub interval: Tick,
    pub difficulty: i64,
    /// Cumulative difficulty of the chain ending at this block.
    pub total_difficulty: i64,
    /// TAB synthesis score.
    pub tabs: i64,
    /// Cumulative score-weighted difficulty (running sum of tabs * difficulty).
    pub ttdtabs: i64,
    /// Consecutive blocks along this lineage with a falling score.
    pub fall_count: i64,
    /// Sign of the score reference vs the parent score: -1, 0 or +1.
    pub score_cmp: i64,
    pub author: MinerId,
    pub hash: BlockHash,
    pub parent_hash: BlockHash,
    pub canonical: bool,
    pub delay: Delay,
}

impl Block {
    /// The genesis block shared by every miner. Its hash is drawn once at
    /// setup so all trees agree on it.
    pub fn genesis(tabs: i64, difficulty: i64, rng: &mut impl Rng) -> Self {
        Block {
            height: 0,
            timestamp: 0,
            interval: 0,
            difficulty,
            total_difficulty: difficulty,
            tabs,
            ttdtabs: tabs * difficulty,
            fall_count: 0,
            score_cmp: 0,
            author: MinerId::GENESIS,
            hash: BlockHash::random(rng),
            parent_hash: BlockHash(0),
            canonical: false,
            delay: Delay::default(),
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[i={} s={}(+{}) h={} ph={} d={} td={} c={}]",
            self.height,
            self.timestamp,
            self.interval,
            self.hash.short(),
            self.parent_hash.short(),
            self.difficulty,
            self.total_difficulty,
            self.canonical
        )
    }
}
