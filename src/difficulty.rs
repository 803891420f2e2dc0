// src/difficulty.rs - Interval-responsive difficulty retargeting

use crate::block::Tick;

/// Retarget granularity in seconds: each elapsed 9-second period past the
/// parent pushes the adjustment one step downward.
const INTERVAL_PERIOD_SECS: i64 = 9;

/// Largest permitted downward step.
const MIN_ADJUSTMENT: i64 = -99;

/// Denominator of the per-step adjustment fraction.
const ADJUSTMENT_QUOTIENT: i64 = 2048;

/// Computes the difficulty of a child block from its parent difficulty, the
/// timestamp interval between them, and whether the child cites uncles.
/// Citing uncles earns one extra upward step, modelling fork pressure.
pub fn next_difficulty(
    parent_difficulty: i64,
    uncles: bool,
    interval: Tick,
    ticks_per_second: i64,
) -> i64 {
    let x = interval / (INTERVAL_PERIOD_SECS * ticks_per_second);
    let mut y = if uncles { 2 - x } else { 1 - x };
    if y < MIN_ADJUSTMENT {
        y = MIN_ADJUSTMENT;
    }
    parent_difficulty + y * parent_difficulty / ADJUSTMENT_QUOTIENT
}
