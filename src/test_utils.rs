// SPDX-License-Identifier: Apache-2.0

//! Test-only helpers.

use std::sync::Once;

use half::f16;

use crate::convert::ConvertScratch;

static LOGGER: Once = Once::new();

/// Routes `log` output to stderr for the test run. Honors `RUST_LOG`.
pub fn config_test_logger() {
    LOGGER.call_once(|| {
        // the handle must outlive every test
        let _ = flexi_logger::Logger::try_with_env_or_str("warn")
            .and_then(|logger| logger.start())
            .map(std::mem::forget);
    });
}

/// Relative error with an absolute floor so subnormal results do not dominate.
pub fn rel_err(got: f32, expected: f32) -> f32 {
    (got - expected).abs() / expected.abs().max(f32::MIN_POSITIVE)
}

/// Distance in half ulps between a result and the exact value.
pub fn half_ulps(got: f16, expected: f32) -> f32 {
    let nearest = f16::from_f32(expected);
    let ulp = if nearest.is_finite() && nearest.to_f32() != 0.0 {
        let next = f16::from_bits(nearest.to_bits() + 1).to_f32();
        (next - nearest.to_f32()).abs()
    } else {
        f16::from_bits(1).to_f32()
    };
    (got.to_f32() - expected).abs() / ulp
}

/// Evenly spaced values in `[lo, hi]`.
pub fn linspace(lo: f32, hi: f32, n: usize) -> Vec<f32> {
    let step = (hi - lo) / (n.max(2) - 1) as f32;
    (0..n).map(|i| lo + step * i as f32).collect()
}

pub fn halves(values: &[f32]) -> Vec<f16> {
    values.iter().map(|v| f16::from_f32(*v)).collect()
}

/// Owned conversion scratch sized for `count` elements.
pub struct ConvertWorkspace {
    work: Vec<f32>,
    seg: Vec<u32>,
}

impl ConvertWorkspace {
    pub fn new(count: usize) -> Self {
        Self {
            work: vec![0.0; count],
            seg: vec![0; crate::constants::SEG_LANES_32],
        }
    }

    pub fn scratch(&mut self) -> ConvertScratch<'_> {
        ConvertScratch::new(&mut self.work, &mut self.seg)
    }
}

/// Pads `values` with zeros up to a whole number of 128-byte segments.
pub fn pad_to_segment<T: Copy + Default>(values: &[T]) -> Vec<T> {
    let lanes = crate::constants::SEG_LANES_32;
    let len = values.len().div_ceil(lanes).max(1) * lanes;
    let mut out = vec![T::default(); len];
    out[..values.len()].copy_from_slice(values);
    out
}
