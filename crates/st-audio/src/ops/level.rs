// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::error::AudioResult;
use crate::transform::{ChannelBatch, Transform};
use rand::rngs::StdRng;

/// Rescales each example so its largest absolute sample is 1.
///
/// Silent examples are passed through untouched.
#[derive(Clone, Debug, Default)]
pub struct PeakNormalization;

impl Transform for PeakNormalization {
    fn name(&self) -> &'static str {
        "peak_normalization"
    }

    fn apply(
        &self,
        batch: &ChannelBatch,
        _sample_rate: u32,
        _rng: &mut StdRng,
    ) -> AudioResult<ChannelBatch> {
        let factors: Vec<f32> = batch
            .example_slices()
            .map(|example| {
                let peak = example.iter().fold(0.0f32, |acc, v| acc.max(v.abs()));
                if peak > 0.0 {
                    1.0 / peak
                } else {
                    1.0
                }
            })
            .collect();
        batch.map_examples(&factors, |factor, row| {
            for v in row.iter_mut() {
                *v *= factor;
            }
        })
    }
}

/// Flips the sign of every sample.
#[derive(Clone, Debug, Default)]
pub struct PolarityInversion;

impl Transform for PolarityInversion {
    fn name(&self) -> &'static str {
        "polarity_inversion"
    }

    fn apply(
        &self,
        batch: &ChannelBatch,
        _sample_rate: u32,
        _rng: &mut StdRng,
    ) -> AudioResult<ChannelBatch> {
        let unit = vec![(); batch.examples()];
        batch.map_examples(&unit, |_, row| {
            for v in row.iter_mut() {
                *v = -*v;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use st_tensor::Tensor;

    #[test]
    fn peak_normalisation_reaches_unit_peak() {
        let input = Tensor::from_rows(&[vec![0.1, -0.25, 0.2], vec![0.0, 0.0, 0.0]]).unwrap();
        let batch = ChannelBatch::mono(input);
        let mut rng = StdRng::seed_from_u64(0);
        let out = PeakNormalization.apply(&batch, 16_000, &mut rng).unwrap();
        let rows: Vec<&[f32]> = out.samples().rows_iter().collect();
        assert_relative_eq!(rows[0][1], -1.0);
        assert_relative_eq!(rows[0][0], 0.4, epsilon = 1e-6);
        assert_eq!(rows[1], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn polarity_inversion_negates() {
        let input = Tensor::from_vec(1, 3, vec![1.0, -2.0, 0.5]).unwrap();
        let batch = ChannelBatch::mono(input);
        let mut rng = StdRng::seed_from_u64(0);
        let out = PolarityInversion.apply(&batch, 16_000, &mut rng).unwrap();
        assert_eq!(out.samples().data(), &[-1.0, 2.0, -0.5]);
    }
}
