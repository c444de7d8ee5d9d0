// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Robustness tooling for speech recognisers.
//!
//! [`AugMaxAttack`] searches for the worst convex blend of randomly augmented
//! copies of an utterance against a differentiable [`AsrBrain`];
//! [`AugMixModule`] draws the same kind of blend from fixed priors and is used
//! as a training-time augmentation layer, optionally wired into a brain via
//! [`AugMixBrain`].

pub mod attack;
pub mod augmix;
pub mod batch;
pub mod brain;
pub mod combiner;
pub mod config;
pub mod error;
pub mod generator;
pub mod stage;
pub mod staging;

pub use attack::{AttackOutcome, AttackStep, Attacker, AugMaxAttack};
pub use augmix::{AugMixBrain, AugMixModule, AugMixSample};
pub use batch::{AudioBatch, Signal};
pub use brain::{AsrBrain, ModeScope};
pub use combiner::{CombinerGradients, ConvexCombiner};
pub use config::{AugMaxConfig, AugMixConfig, Epsilon};
pub use error::{RobustError, RobustResult};
pub use generator::{effective_depth, VariantGenerator, VariantSet};
pub use stage::{BrainMode, Stage};
pub use staging::HostStaging;
