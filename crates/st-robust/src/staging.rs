// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Host boundary for the augmentation operators.
//!
//! The DSP operators only run on host memory. [`HostStaging::scoped`] copies
//! the input to the CPU, runs the host-side work, checks that every produced
//! tensor is still host-resident and hands the results back on the caller's
//! device.

use crate::error::{RobustError, RobustResult};
use st_tensor::{Device, Tensor};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostStaging {
    origin: Device,
}

impl HostStaging {
    pub fn new(origin: Device) -> Self {
        Self { origin }
    }

    pub fn origin(&self) -> Device {
        self.origin
    }

    /// Host-resident copy of `tensor`.
    pub fn stage(&self, tensor: &Tensor) -> Tensor {
        tensor.to_device(Device::Cpu)
    }

    /// Moves a host tensor back to the origin device.
    pub fn restore(&self, tensor: Tensor) -> RobustResult<Tensor> {
        ensure_device(&tensor, Device::Cpu)?;
        Ok(tensor.to_device(self.origin))
    }

    /// Runs `work` on a host copy of `input` and returns its outputs on the
    /// device `input` came from.
    pub fn scoped<F>(input: &Tensor, work: F) -> RobustResult<Vec<Tensor>>
    where
        F: FnOnce(Tensor) -> RobustResult<Vec<Tensor>>,
    {
        let staging = Self::new(input.device());
        let produced = work(staging.stage(input))?;
        produced
            .into_iter()
            .map(|tensor| staging.restore(tensor))
            .collect()
    }
}

/// Fails with [`RobustError::DeviceTransfer`] unless `tensor` lives on `expected`.
pub fn ensure_device(tensor: &Tensor, expected: Device) -> RobustResult<()> {
    let found = tensor.device();
    if found != expected {
        return Err(RobustError::DeviceTransfer { expected, found });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_work_sees_host_and_returns_to_origin() {
        let mut input = Tensor::zeros(1, 4).unwrap();
        input.set_device(Device::Cuda(1));
        let out = HostStaging::scoped(&input, |host| {
            assert!(host.device().is_cpu());
            Ok(vec![host.clone(), host])
        })
        .unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|t| t.device() == Device::Cuda(1)));
    }

    #[test]
    fn non_host_output_is_a_transfer_error() {
        let input = Tensor::zeros(1, 4).unwrap();
        let err = HostStaging::scoped(&input, |host| Ok(vec![host.to_device(Device::Mps)]))
            .unwrap_err();
        assert!(matches!(
            err,
            RobustError::DeviceTransfer {
                expected: Device::Cpu,
                found: Device::Mps
            }
        ));
    }
}
