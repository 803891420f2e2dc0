// src/mining.rs - Probabilistic proof-of-work trial

use rand::Rng;

/// One mining trial. The success probability is proportional to the miner's
/// hash budget relative to the parent difficulty, scaled by the network-rate
/// constant lambda.
///
/// Two independent uniforms are drawn and the trial succeeds when they land
/// within the target probability mass of each other, measured with
/// wraparound, which yields the right success rate without a dedicated
/// Bernoulli sampler.
pub fn trial(
    hashes_per_tick: f64,
    parent_difficulty: f64,
    network_lambda: f64,
    rng: &mut impl Rng,
) -> bool {
    let tick_r = hashes_per_tick / parent_difficulty * network_lambda / 2.0;

    let needle: f64 = rng.gen();
    let sample: f64 = rng.gen();

    (sample - needle).abs() <= tick_r || (sample - needle).abs() >= 1.0 - tick_r
}
