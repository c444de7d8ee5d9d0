// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::error::AudioResult;
use crate::transform::{ChannelBatch, ParameterRange, Transform};
use rand::rngs::StdRng;

/// Multiplies every example by a random gain drawn in decibels.
#[derive(Clone, Debug)]
pub struct Gain {
    gain_db: ParameterRange,
}

impl Gain {
    pub fn new(min_gain_db: f32, max_gain_db: f32) -> AudioResult<Self> {
        Ok(Self {
            gain_db: ParameterRange::new("gain_db", min_gain_db, max_gain_db)?,
        })
    }

    pub fn gain_db(&self) -> ParameterRange {
        self.gain_db
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self {
            gain_db: ParameterRange::from_bounds(-15.0, 5.0),
        }
    }
}

pub(crate) fn db_to_amplitude(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

impl Transform for Gain {
    fn name(&self) -> &'static str {
        "gain"
    }

    fn apply(
        &self,
        batch: &ChannelBatch,
        _sample_rate: u32,
        rng: &mut StdRng,
    ) -> AudioResult<ChannelBatch> {
        let factors: Vec<f32> = self
            .gain_db
            .sample_n(batch.examples(), rng)
            .into_iter()
            .map(db_to_amplitude)
            .collect();
        batch.map_examples(&factors, |factor, row| {
            for v in row.iter_mut() {
                *v *= factor;
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
    fn decibel_conversion_matches_reference_points() {
        assert_relative_eq!(db_to_amplitude(0.0), 1.0);
        assert_relative_eq!(db_to_amplitude(20.0), 10.0, epsilon = 1e-5);
        assert_relative_eq!(db_to_amplitude(-20.0), 0.1, epsilon = 1e-6);
    }

    #[test]
    fn gain_scales_each_example_uniformly() {
        let input = Tensor::full(3, 64, 0.5).unwrap();
        let batch = ChannelBatch::mono(input);
        let mut rng = StdRng::seed_from_u64(11);
        let out = Gain::default().apply(&batch, 16_000, &mut rng).unwrap();
        for row in out.samples().rows_iter() {
            let factor = row[0] / 0.5;
            assert!(factor >= db_to_amplitude(-15.0) - 1e-6);
            assert!(factor <= db_to_amplitude(5.0) + 1e-6);
            assert!(row.iter().all(|v| (v - row[0]).abs() < 1e-7));
        }
    }
}
