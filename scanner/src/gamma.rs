//! Gamma-distribution ring member selection (C7).
//!
//! Ported from `gamma_picker`'s "Sarang's output-lineup method": outputs
//! are biased towards recently-created ones by sampling an output *age*
//! from a gamma distribution, then mapping that age back to a global
//! output index via the cumulative per-block RingCT output counts
//! (`rct_offsets`). Ages younger than the unlock window are redrawn
//! uniformly from the recent-spend window instead of extrapolating the
//! gamma curve into territory it wasn't fit for.

use lws_core::{Error, GammaParams, Result};
use rand::Rng;
use rand_distr::{Distribution, Gamma};

/// Selects ring members biased towards recently-created outputs.
///
/// `rct_offsets[i]` is the cumulative number of RingCT outputs that exist
/// at the end of block `i`; this is exactly the daemon's
/// `get_output_distribution` response for a cumulative query.
pub struct GammaPicker {
    rct_offsets: Vec<u64>,
    gamma: Gamma<f64>,
    outputs_per_second: f64,
    params: GammaParams,
}

impl GammaPicker {
    /// Builds a picker over `rct_offsets` using `params`'s gamma shape and
    /// scale. An empty or too-short `rct_offsets` yields a picker that
    /// reports [`GammaPicker::is_valid`] `false` rather than erroring —
    /// callers check `is_valid` before the chain has enough depth to pick
    /// from.
    pub fn new(rct_offsets: Vec<u64>, params: GammaParams) -> Result<Self> {
        let gamma = Gamma::new(params.shape, params.scale)
            .map_err(|e| Error::Configuration(format!("invalid gamma parameters: {e}")))?;

        let outputs_per_second = if rct_offsets.is_empty() {
            0.0
        } else {
            let blocks_to_consider = rct_offsets.len().min(params.blocks_in_a_year as usize);
            let initial = if blocks_to_consider < rct_offsets.len() {
                rct_offsets[rct_offsets.len() - blocks_to_consider - 1]
            } else {
                0
            };
            let outputs_to_consider = rct_offsets[rct_offsets.len() - 1].saturating_sub(initial);
            outputs_to_consider as f64 / (params.block_time_secs as f64 * blocks_to_consider as f64)
        };

        Ok(GammaPicker { rct_offsets, gamma, outputs_per_second, params })
    }

    pub fn is_valid(&self) -> bool {
        self.rct_offsets.len() > self.params.default_spendable_age
    }

    /// The highest global output index old enough to be spendable.
    pub fn spendable_upper_bound(&self) -> u64 {
        if !self.is_valid() {
            return 0;
        }
        self.rct_offsets[self.rct_offsets.len() - self.params.default_spendable_age - 1]
    }

    /// Selects one global output index, retrying up to 100 times if the
    /// gamma draw lands outside the spendable range or in a block with no
    /// RingCT outputs at all.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<u64> {
        if !self.is_valid() {
            return Err(Error::RingPickFailed);
        }

        let spendable_end = self.rct_offsets.len() - self.params.default_spendable_age;
        let num_rct_outputs = self.spendable_upper_bound();

        for _ in 0..100 {
            let sampled: f64 = self.gamma.sample(rng);
            let mut age_secs = sampled.exp();

            if age_secs > self.params.default_unlock_time as f64 {
                age_secs -= self.params.default_unlock_time as f64;
            } else {
                age_secs = rng.gen_range(0..self.params.recent_spend_window.max(1)) as f64;
            }

            let output_index = (age_secs * self.outputs_per_second) as u64;
            if num_rct_outputs <= output_index {
                continue;
            }
            let output_index = num_rct_outputs - 1 - output_index;

            let selection = match self.rct_offsets[..spendable_end].partition_point(|&v| v <= output_index) {
                idx if idx < spendable_end => idx,
                _ => continue,
            };

            let first_rct = if selection == 0 { 0 } else { self.rct_offsets[selection - 1] };
            let n_rct = self.rct_offsets[selection] - first_rct;
            if n_rct != 0 {
                return Ok(first_rct + rng.gen_range(0..n_rct));
            }
        }
        Err(Error::RingPickFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn dense_offsets(blocks: usize, per_block: u64) -> Vec<u64> {
        (1..=blocks as u64).map(|i| i * per_block).collect()
    }

    #[test]
    fn short_chain_is_invalid() {
        let picker = GammaPicker::new(dense_offsets(5, 10), GammaParams::DEFAULT).unwrap();
        assert!(!picker.is_valid());
    }

    #[test]
    fn picking_from_invalid_picker_errors() {
        let picker = GammaPicker::new(Vec::new(), GammaParams::DEFAULT).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(picker.pick(&mut rng), Err(Error::RingPickFailed)));
    }

    #[test]
    fn pick_stays_within_spendable_range() {
        let offsets = dense_offsets(2000, 5);
        let picker = GammaPicker::new(offsets, GammaParams::DEFAULT).unwrap();
        assert!(picker.is_valid());
        let upper = picker.spendable_upper_bound();

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let idx = picker.pick(&mut rng).unwrap();
            assert!(idx < upper);
        }
    }
}
