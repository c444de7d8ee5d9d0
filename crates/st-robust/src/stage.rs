// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use core::fmt;
use serde::{Deserialize, Serialize};

/// Execution stage handed to the brain with every forward and objective call.
///
/// `Attack` is used while an adversary probes the model: brains must neither
/// update persistent state (running normalisation statistics, caches) nor
/// detach gradients at the encoder boundary when they see it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Train,
    Valid,
    Test,
    Attack,
}

impl Stage {
    pub fn mutates_state(self) -> bool {
        matches!(self, Stage::Train)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Train => "train",
            Stage::Valid => "valid",
            Stage::Test => "test",
            Stage::Attack => "attack",
        };
        f.write_str(label)
    }
}

/// Behaviour of dropout and normalisation layers inside the brain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrainMode {
    Train,
    Eval,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_training_mutates_state() {
        assert!(Stage::Train.mutates_state());
        for stage in [Stage::Valid, Stage::Test, Stage::Attack] {
            assert!(!stage.mutates_state());
        }
        assert_eq!(Stage::Attack.to_string(), "attack");
    }
}
