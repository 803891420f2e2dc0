// src/tree.rs - Per-miner block tree arena

use std::fmt;

use crate::block::{Block, BlockHash, BlockId};

/// Outcome of an insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Append {
    Inserted(BlockId),
    /// A block with the same hash already exists at that height; the tree
    /// is unchanged and the existing block's id is returned.
    Duplicate(BlockId),
}

impl Append {
    pub fn id(&self) -> BlockId {
        match *self {
            Append::Inserted(id) | Append::Duplicate(id) => id,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Append::Duplicate(_))
    }
}

/// Height-indexed arena of blocks. Owned exclusively by one miner; no
/// internal synchronization. Height buckets left empty by out-of-order
/// arrival are legal and are skipped by the aggregate extractors.
#[derive(Debug, Default)]
pub struct BlockTree {
    levels: Vec<Vec<Block>>,
}

impl BlockTree {
    pub fn new() -> Self {
        BlockTree { levels: Vec::new() }
    }

    /// Appends a block at its height, deduplicating by hash.
    pub fn insert(&mut self, block: Block) -> Append {
        let height = block.height as usize;
        while self.levels.len() <= height {
            self.levels.push(Vec::new());
        }
        let bucket = &mut self.levels[height];
        for (slot, b) in bucket.iter().enumerate() {
            if b.hash == block.hash {
                return Append::Duplicate(BlockId {
                    height: block.height,
                    slot,
                });
            }
        }
        bucket.push(block);
        Append::Inserted(BlockId {
            height: height as u64,
            slot: bucket.len() - 1,
        })
    }

    /// Resolves a minted id. Ids only come from [`BlockTree::insert`], so a
    /// miss is a broken invariant.
    pub fn get(&self, id: BlockId) -> &Block {
        &self.levels[id.height as usize][id.slot]
    }

    pub fn get_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.levels[id.height as usize][id.slot]
    }

    /// All blocks recorded at a height, in arrival order.
    pub fn level(&self, height: u64) -> &[Block] {
        self.levels
            .get(height as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn max_height(&self) -> u64 {
        self.levels.len().saturating_sub(1) as u64
    }

    /// The canonical block at a height, if one has been accepted.
    pub fn canonical_at(&self, height: u64) -> Option<&Block> {
        self.level(height).iter().find(|b| b.canonical)
    }

    /// All non-canonical blocks at a height.
    pub fn side_blocks_at(&self, height: u64) -> Vec<&Block> {
        self.level(height).iter().filter(|b| !b.canonical).collect()
    }

    /// Hash lookup, searching newest heights first.
    pub fn by_hash(&self, hash: BlockHash) -> Option<BlockId> {
        for (height, bucket) in self.levels.iter().enumerate().rev() {
            for (slot, b) in bucket.iter().enumerate() {
                if b.hash == hash {
                    return Some(BlockId {
                        height: height as u64,
                        slot,
                    });
                }
            }
        }
        None
    }

    /// The parent of a block: the block at height-1 whose hash matches the
    /// child's parent-hash reference.
    pub fn parent_of(&self, id: BlockId) -> Option<BlockId> {
        let block = self.get(id);
        let parent_height = block.height.checked_sub(1)?;
        self.level(parent_height)
            .iter()
            .position(|b| b.hash == block.parent_hash)
            .map(|slot| BlockId {
                height: parent_height,
                slot,
            })
    }

    /// All blocks matching a predicate.
    pub fn filtered(&self, mut predicate: impl FnMut(&Block) -> bool) -> Vec<&Block> {
        self.levels
            .iter()
            .flatten()
            .filter(|b| predicate(b))
            .collect()
    }

    /// Per-height block tallies, for the reporting collaborator.
    pub fn block_counts(&self) -> Vec<f64> {
        self.levels
            .iter()
            .filter(|bucket| !bucket.is_empty())
            .map(|bucket| bucket.len() as f64)
            .collect()
    }

    /// Timestamp intervals of all canonical blocks.
    pub fn canonical_intervals(&self) -> Vec<f64> {
        self.levels
            .iter()
            .flatten()
            .filter(|b| b.canonical)
            .map(|b| b.interval as f64)
            .collect()
    }

    /// Difficulties of all canonical blocks.
    pub fn canonical_difficulties(&self) -> Vec<f64> {
        self.levels
            .iter()
            .flatten()
            .filter(|b| b.canonical)
            .map(|b| b.difficulty as f64)
            .collect()
    }
}

impl fmt::Display for BlockTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (height, bucket) in self.levels.iter().enumerate() {
            write!(f, "n={} ", height)?;
            for b in bucket {
                write!(f, "{}", b)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
