// src/delay.rs - Block propagation delay components

use serde::Serialize;

use crate::block::{Block, Tick};

/// Per-recipient propagation delay, split into its three sources.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Delay {
    /// Selfish withholding of a discovered solution. Controlled by the
    /// authoring miner.
    pub withhold: Tick,
    /// Deliberate postponement of processing. Controlled by the receiving
    /// miner, to buy itself more time to mine on the previous head.
    pub postpone: Tick,
    /// Network/material latency.
    pub material: Tick,
}

impl Delay {
    pub fn total(&self) -> Tick {
        self.withhold + self.postpone + self.material
    }
}

/// Delay term computed from the block in flight.
pub type DelayFn = Box<dyn Fn(&Block) -> Tick>;

/// The pluggable delay behavior of one miner. Withhold and latency are
/// applied by the sender at broadcast time; postpone is applied by the
/// receiver on receipt.
pub struct DelayModel {
    pub withhold: DelayFn,
    pub latency: DelayFn,
    pub postpone: Option<DelayFn>,
}

impl DelayModel {
    /// Constant delays, in tick units. A zero postpone is left unset so the
    /// receive path matches a miner with no postponement policy at all.
    pub fn constant(withhold: Tick, latency: Tick, postpone: Tick) -> Self {
        DelayModel {
            withhold: Box::new(move |_| withhold),
            latency: Box::new(move |_| latency),
            postpone: if postpone > 0 {
                Some(Box::new(move |_| postpone))
            } else {
                None
            },
        }
    }
}
