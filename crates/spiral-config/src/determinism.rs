// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Seed derivation for the stochastic parts of the augmentation stack.
//!
//! Every random draw (operator choice, operator parameters, blend
//! initialisation, prior sampling) goes through an [`StdRng`] obtained here so
//! a single `SPIRAL_DETERMINISTIC_SEED` reproduces a whole attack.

use rand::{rngs::StdRng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

const ENABLED_VAR: &str = "SPIRAL_DETERMINISTIC";
const SEED_VAR: &str = "SPIRAL_DETERMINISTIC_SEED";
const DEFAULT_SEED: u64 = 42;

/// Deterministic runtime switches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeterminismConfig {
    /// Whether labelled RNGs are derived from `base_seed` instead of entropy.
    pub enabled: bool,
    /// Base seed mixed with every component label.
    pub base_seed: u64,
}

impl Default for DeterminismConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_seed: DEFAULT_SEED,
        }
    }
}

impl DeterminismConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = lookup(ENABLED_VAR)
            .map(|raw| !matches!(raw.trim(), "" | "0" | "false" | "False" | "off" | "OFF"))
            .unwrap_or(false);
        let base_seed = lookup(SEED_VAR)
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_SEED);
        Self { enabled, base_seed }
    }

    /// Mixes the base seed with a component label.
    pub fn seed_for<L: Hash>(&self, label: L) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.base_seed.hash(&mut hasher);
        label.hash(&mut hasher);
        hasher.finish()
    }

    /// Returns a labelled RNG when determinism is enabled.
    pub fn rng_for(&self, label: &str) -> Option<StdRng> {
        self.enabled
            .then(|| StdRng::seed_from_u64(self.seed_for(label)))
    }
}

static CONFIG: OnceLock<DeterminismConfig> = OnceLock::new();

/// Returns the process-wide configuration, reading the environment once.
pub fn config() -> &'static DeterminismConfig {
    CONFIG.get_or_init(DeterminismConfig::from_env)
}

/// Installs an explicit configuration. Has no effect once [`config`] was read.
pub fn configure(cfg: DeterminismConfig) -> &'static DeterminismConfig {
    CONFIG.get_or_init(|| cfg)
}

/// RNG derived from `label` when determinism is enabled, entropy otherwise.
pub fn rng_from_label(label: &str) -> StdRng {
    config()
        .rng_for(label)
        .unwrap_or_else(StdRng::from_entropy)
}

/// An explicit seed always wins over the labelled derivation.
pub fn rng_from_optional(seed: Option<u64>, label: &str) -> StdRng {
    match seed {
        Some(value) => StdRng::seed_from_u64(value),
        None => rng_from_label(label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_variables_disable_determinism() {
        let cfg = DeterminismConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg, DeterminismConfig::default());
        assert!(cfg.rng_for("anything").is_none());
    }

    #[test]
    fn textual_switches_are_parsed() {
        let on = DeterminismConfig::from_lookup(lookup(&[
            (ENABLED_VAR, "1"),
            (SEED_VAR, "1337"),
        ]));
        assert!(on.enabled);
        assert_eq!(on.base_seed, 1337);

        let off = DeterminismConfig::from_lookup(lookup(&[(ENABLED_VAR, "off")]));
        assert!(!off.enabled);

        let bad_seed = DeterminismConfig::from_lookup(lookup(&[(SEED_VAR, "seven")]));
        assert_eq!(bad_seed.base_seed, DEFAULT_SEED);
    }

    #[test]
    fn labelled_rngs_are_stable_and_distinct() {
        let cfg = DeterminismConfig {
            enabled: true,
            base_seed: 99,
        };
        assert_eq!(cfg.seed_for("augmax"), cfg.seed_for("augmax"));
        assert_ne!(cfg.seed_for("augmax"), cfg.seed_for("augmix"));

        let mut first = cfg.rng_for("augmax").unwrap();
        let mut second = cfg.rng_for("augmax").unwrap();
        assert_eq!(first.gen::<u64>(), second.gen::<u64>());
    }

    #[test]
    fn explicit_seed_overrides_label() {
        let mut a = rng_from_optional(Some(5), "x");
        let mut b = rng_from_optional(Some(5), "y");
        assert_eq!(a.gen::<u32>(), b.gen::<u32>());
    }
}
