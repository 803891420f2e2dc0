// src/consensus.rs - Fork-choice arbitration ladder

use rand::Rng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::block::{Block, MinerId};

/// Chain-weight metric used by the primary arbitration rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsensusAlgorithm {
    /// Classic heaviest chain by cumulative difficulty.
    TotalDifficulty,
    /// Heaviest chain by cumulative score-weighted difficulty.
    ScoreWeightedDifficulty,
    /// Same weight metric, but blocks are scored with the
    /// consecutive-falls-stepping adjustment.
    ScoreWeightedDifficultyStepped,
}

impl ConsensusAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsensusAlgorithm::TotalDifficulty => "total-difficulty",
            ConsensusAlgorithm::ScoreWeightedDifficulty => "score-weighted-difficulty",
            ConsensusAlgorithm::ScoreWeightedDifficultyStepped => {
                "score-weighted-difficulty-stepped"
            }
        }
    }
}

impl fmt::Display for ConsensusAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsensusAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "total-difficulty" => Ok(ConsensusAlgorithm::TotalDifficulty),
            "score-weighted-difficulty" => Ok(ConsensusAlgorithm::ScoreWeightedDifficulty),
            "score-weighted-difficulty-stepped" => {
                Ok(ConsensusAlgorithm::ScoreWeightedDifficultyStepped)
            }
            other => Err(format!("unknown consensus algorithm '{}'", other)),
        }
    }
}

/// Which of the two candidates an arbitration settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Incumbent,
    Challenger,
}

/// The rule that ultimately decided an arbitration. Identity dedupes carry
/// no reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    ConsensusScoreHigh,
    HeightLow,
    MinerSelfish,
    FirstSeen,
    Random,
}

impl DecisionReason {
    pub const ALL: [DecisionReason; 5] = [
        DecisionReason::ConsensusScoreHigh,
        DecisionReason::HeightLow,
        DecisionReason::MinerSelfish,
        DecisionReason::FirstSeen,
        DecisionReason::Random,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::ConsensusScoreHigh => "consensus_score_high",
            DecisionReason::HeightLow => "height_low",
            DecisionReason::MinerSelfish => "miner_selfish",
            DecisionReason::FirstSeen => "first_seen",
            DecisionReason::Random => "random",
        }
    }
}

/// Fork-choice state for one miner: the selected algorithm, the terminal
/// tie-break strategy, and the running decision statistics.
pub struct Arbiter {
    pub algorithm: ConsensusAlgorithm,
    /// When set, the terminal coin toss is skipped and the first-seen block
    /// is kept deterministically.
    pub skip_random: bool,
    /// Total arbitration calls, identity dedupes included.
    pub arbitrations: u64,
    /// Arbitrations decided purely on chain weight.
    pub objective_arbitrations: u64,
    tallies: [u64; DecisionReason::ALL.len()],
}

impl Arbiter {
    pub fn new(algorithm: ConsensusAlgorithm, skip_random: bool) -> Self {
        Arbiter {
            algorithm,
            skip_random,
            arbitrations: 0,
            objective_arbitrations: 0,
            tallies: [0; DecisionReason::ALL.len()],
        }
    }

    pub fn tally(&self, reason: DecisionReason) -> u64 {
        self.tallies[reason as usize]
    }

    fn decide(&mut self, reason: DecisionReason, choice: Choice) -> Choice {
        self.tallies[reason as usize] += 1;
        choice
    }

    /// Selects one canonical block from two. `a` is the incumbent head and
    /// `b` the later-available challenger; each ladder rule applies only if
    /// the previous rule tied.
    pub fn arbitrate(
        &mut self,
        owner: MinerId,
        rng: &mut ChaCha20Rng,
        a: &Block,
        b: &Block,
    ) -> Choice {
        self.arbitrations += 1;

        // Identity: the same block needs no decision.
        if a.hash == b.hash {
            return Choice::Incumbent;
        }

        // Assume the primary weight rule will decide; undone below if it
        // ties.
        self.objective_arbitrations += 1;

        let (wa, wb) = match self.algorithm {
            ConsensusAlgorithm::TotalDifficulty => (a.total_difficulty, b.total_difficulty),
            ConsensusAlgorithm::ScoreWeightedDifficulty
            | ConsensusAlgorithm::ScoreWeightedDifficultyStepped => (a.ttdtabs, b.ttdtabs),
        };
        if wa > wb {
            return self.decide(DecisionReason::ConsensusScoreHigh, Choice::Incumbent);
        } else if wb > wa {
            return self.decide(DecisionReason::ConsensusScoreHigh, Choice::Challenger);
        }

        self.objective_arbitrations -= 1;

        // Height: the shallower competitor wins.
        if a.height < b.height {
            return self.decide(DecisionReason::HeightLow, Choice::Incumbent);
        } else if b.height < a.height {
            return self.decide(DecisionReason::HeightLow, Choice::Challenger);
        }

        // Self-interest: keep our own work when exactly one side is ours.
        if a.author == owner && b.author != owner {
            return self.decide(DecisionReason::MinerSelfish, Choice::Incumbent);
        } else if b.author == owner && a.author != owner {
            return self.decide(DecisionReason::MinerSelfish, Choice::Challenger);
        }

        if self.skip_random {
            return self.decide(DecisionReason::FirstSeen, Choice::Incumbent);
        }
        if rng.gen::<f64>() < 0.5 {
            self.decide(DecisionReason::Random, Choice::Incumbent)
        } else {
            self.decide(DecisionReason::Random, Choice::Challenger)
        }
    }
}
