// SPDX-License-Identifier: Apache-2.0

//! Reciprocal, exponential and sigmoid kernels
//!
//! Each operation has a native variant (tiers with exact reciprocal and
//! power-of-two instructions) and a fallback variant built on the approximate
//! instructions. Half-precision kernels either widen into an f32 scratch
//! buffer, compute there and narrow back, or (fallback tier, fast precision)
//! run the approximate instruction directly on half lanes.
//!
//! All kernels here are in place; `dispatch` resolves [`Operands`] into the
//! destination buffer before calling them.
//!
//! [`Operands`]: crate::types::Operands

use half::f16;

use crate::helpers::{take_scratch, widen_scratch_len};
use crate::isa;
use crate::types::{Precision, Result};

/// In-place f32 kernel.
pub type F32Kernel = fn(&mut [f32], Precision) -> Result<()>;

/// In-place half kernel with optional widening scratch.
pub type HalfKernel = fn(&mut [f16], Option<&mut [f32]>, Precision) -> Result<()>;

#[inline]
fn widen<'a>(buf: &[f16], scratch: Option<&'a mut [f32]>) -> Result<&'a mut [f32]> {
    let wide = take_scratch(scratch, widen_scratch_len(buf.len()))?;
    isa::half2float(wide, buf);
    Ok(wide)
}

// =============================================================================
// RECIPROCAL
// =============================================================================

pub fn recip_f32_native(buf: &mut [f32], _precision: Precision) -> Result<()> {
    isa::recip(buf);
    Ok(())
}

pub fn recip_f32_fallback(buf: &mut [f32], _precision: Precision) -> Result<()> {
    isa::active_reciphp(buf);
    Ok(())
}

pub fn recip_half_native(
    buf: &mut [f16],
    scratch: Option<&mut [f32]>,
    _precision: Precision,
) -> Result<()> {
    if buf.is_empty() {
        return Ok(());
    }
    let wide = widen(buf, scratch)?;
    isa::recip(wide);
    isa::float2half_rn(buf, wide);
    Ok(())
}

pub fn recip_half_fallback(
    buf: &mut [f16],
    scratch: Option<&mut [f32]>,
    precision: Precision,
) -> Result<()> {
    if buf.is_empty() {
        return Ok(());
    }
    match precision {
        Precision::High => {
            let wide = widen(buf, scratch)?;
            isa::active_reciphp(wide);
            isa::float2half_rd(buf, wide);
        }
        Precision::Fast => isa::active_reciphp_half(buf),
    }
    Ok(())
}

// =============================================================================
// EXPONENTIAL
// =============================================================================

/// e^x = 2^(x * log2(e))
pub fn exp_f32_native(buf: &mut [f32], _precision: Precision) -> Result<()> {
    isa::mul_scalar(buf, isa::log2e());
    isa::pow2(buf);
    Ok(())
}

pub fn exp_f32_fallback(buf: &mut [f32], _precision: Precision) -> Result<()> {
    isa::active_exphp(buf);
    Ok(())
}

pub fn exp_half_native(
    buf: &mut [f16],
    scratch: Option<&mut [f32]>,
    precision: Precision,
) -> Result<()> {
    if buf.is_empty() {
        return Ok(());
    }
    let wide = widen(buf, scratch)?;
    exp_f32_native(wide, precision)?;
    isa::float2half_rn(buf, wide);
    Ok(())
}

pub fn exp_half_fallback(
    buf: &mut [f16],
    scratch: Option<&mut [f32]>,
    precision: Precision,
) -> Result<()> {
    if buf.is_empty() {
        return Ok(());
    }
    match precision {
        Precision::High => {
            let wide = widen(buf, scratch)?;
            isa::active_exphp(wide);
            isa::float2half_rd(buf, wide);
        }
        Precision::Fast => isa::active_exphp_half(buf),
    }
    Ok(())
}

// =============================================================================
// SIGMOID
// =============================================================================

/// 1 / (1 + e^-x), composed from the native exponential and reciprocal.
pub fn sigmoid_f32_native(buf: &mut [f32], precision: Precision) -> Result<()> {
    isa::mul_scalar(buf, -1.0);
    exp_f32_native(buf, precision)?;
    isa::add_scalar(buf, 1.0);
    recip_f32_native(buf, precision)
}

pub fn sigmoid_f32_fallback(buf: &mut [f32], _precision: Precision) -> Result<()> {
    isa::active_sigmoid(buf);
    Ok(())
}

pub fn sigmoid_half_native(
    buf: &mut [f16],
    scratch: Option<&mut [f32]>,
    precision: Precision,
) -> Result<()> {
    if buf.is_empty() {
        return Ok(());
    }
    let wide = widen(buf, scratch)?;
    sigmoid_f32_native(wide, precision)?;
    isa::float2half_rn(buf, wide);
    Ok(())
}

pub fn sigmoid_half_fallback(
    buf: &mut [f16],
    scratch: Option<&mut [f32]>,
    precision: Precision,
) -> Result<()> {
    if buf.is_empty() {
        return Ok(());
    }
    match precision {
        Precision::High => {
            let wide = widen(buf, scratch)?;
            isa::active_sigmoid(wide);
            isa::float2half_rd(buf, wide);
        }
        Precision::Fast => isa::active_sigmoid_half(buf),
    }
    Ok(())
}
