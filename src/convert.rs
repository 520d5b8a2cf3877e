// SPDX-License-Identifier: Apache-2.0

//! Int32 <-> Float32 conversion kernels
//!
//! Newer tiers have native convert instructions. Older tiers rebuild the
//! conversion from bitwise and float instructions on the IEEE-754 layout,
//! using a single 128-byte pattern segment for the repeating masks.
//!
//! Fallback contract:
//! - source and destination never overlap (enforced by the borrow rules: they
//!   are distinct slices of different element types)
//! - `count * 4` must be a multiple of 128
//! - values must lie in [-2^23, 2^23 - 1]; anything else converts incorrectly

use crate::constants::{
    ALL_ONES_32, LOW_24_ONES, LOW_BIT_32, MANTISSA_MASK_32, NEG_ONE_BITS, ONE_BITS, SEG_LANES_32,
    SHIFT_23, SHIFT_23_BITS, SIGN_LOW_BIT_32, SIGN_MASK_32,
};
use crate::helpers::{check_aligned, check_same_len, check_scratch, mask_scratch_len};
use crate::isa;
use crate::types::{KernelError, Result};

/// Working memory for the conversion fallbacks.
///
/// `work` needs one f32 lane per element; `seg` needs one 128-byte segment
/// (32 lanes) and only ever holds a repeated mask.
#[derive(Debug)]
pub struct ConvertScratch<'a> {
    pub work: &'a mut [f32],
    pub seg: &'a mut [u32],
}

impl<'a> ConvertScratch<'a> {
    #[inline]
    pub fn new(work: &'a mut [f32], seg: &'a mut [u32]) -> Self {
        Self { work, seg }
    }
}

pub type IntToFloatKernel = fn(&mut [f32], &[i32], Option<ConvertScratch<'_>>) -> Result<()>;
pub type FloatToIntKernel = fn(&mut [i32], &[f32], Option<ConvertScratch<'_>>) -> Result<()>;

#[inline]
fn bits(buf: &mut [f32]) -> &mut [u32] {
    bytemuck::cast_slice_mut(buf)
}

#[inline]
fn floats(seg: &[u32]) -> &[f32] {
    bytemuck::cast_slice(seg)
}

/// Validates the fallback contract and trims the scratch to size.
fn prepare<'a>(
    count: usize,
    scratch: Option<ConvertScratch<'a>>,
) -> Result<(&'a mut [f32], &'a mut [u32])> {
    check_aligned(count, 4)?;
    let ConvertScratch { work, seg } = scratch.ok_or(KernelError::ScratchTooSmall {
        required: count,
        actual: 0,
    })?;
    check_scratch(count, work.len())?;
    check_scratch(mask_scratch_len(), seg.len())?;
    Ok((&mut work[..count], &mut seg[..SEG_LANES_32]))
}

// =============================================================================
// INT32 -> FLOAT32
// =============================================================================

pub fn int32_to_float32_native(
    dst: &mut [f32],
    src: &[i32],
    _scratch: Option<ConvertScratch<'_>>,
) -> Result<()> {
    check_same_len(dst.len(), src.len())?;
    isa::int322float(dst, src);
    Ok(())
}

pub fn int32_to_float32_fallback(
    dst: &mut [f32],
    src: &[i32],
    scratch: Option<ConvertScratch<'_>>,
) -> Result<()> {
    check_same_len(dst.len(), src.len())?;
    if src.is_empty() {
        return Ok(());
    }
    let (work, seg) = prepare(src.len(), scratch)?;
    let src_bits: &[u32] = bytemuck::cast_slice(src);

    // sign bit, then OR 1 so zero and positive values never match below
    isa::copy(bits(work), src_bits);
    isa::write_value(seg, SIGN_MASK_32);
    isa::cycle_band(bits(work), seg);
    isa::write_value(seg, LOW_BIT_32);
    isa::cycle_bor(bits(work), seg);

    // work = 1.0 for negative input, 0.0 otherwise
    isa::write_value(seg, SIGN_LOW_BIT_32);
    isa::cycle_eq(work, floats(seg));

    // all-ones for negatives: xor turns x into |x| - 1, positives unchanged
    isa::copy(dst, work);
    isa::write_value(seg, ALL_ONES_32);
    isa::cycle_mul(dst, floats(seg));
    isa::bxor(bits(dst), src_bits);

    // 2^23 + low 23 bits, minus 2^23, is the magnitude as a float
    isa::write_value(seg, MANTISSA_MASK_32);
    isa::cycle_band(bits(dst), seg);
    isa::write_value(seg, SHIFT_23_BITS);
    isa::cycle_bor(bits(dst), seg);
    isa::sub_scalar(dst, SHIFT_23);
    isa::add(dst, work);

    // sign mask back from the negative flag
    isa::write_value(seg, ALL_ONES_32);
    isa::cycle_mul(work, floats(seg));

    // +1 correction kept from the newer-tier fix; the sign AND below drops it
    isa::write_value(seg, LOW_BIT_32);
    isa::cycle_add(work, floats(seg));

    isa::write_value(seg, SIGN_MASK_32);
    isa::cycle_band(bits(work), seg);
    isa::bor(bits(dst), bits(work));
    Ok(())
}

// =============================================================================
// FLOAT32 -> INT32
// =============================================================================

pub fn float32_to_int32_native(
    dst: &mut [i32],
    src: &[f32],
    _scratch: Option<ConvertScratch<'_>>,
) -> Result<()> {
    check_same_len(dst.len(), src.len())?;
    isa::float2int32_tz(dst, src);
    Ok(())
}

pub fn float32_to_int32_fallback(
    dst: &mut [i32],
    src: &[f32],
    scratch: Option<ConvertScratch<'_>>,
) -> Result<()> {
    check_same_len(dst.len(), src.len())?;
    if src.is_empty() {
        return Ok(());
    }
    let (work, seg) = prepare(src.len(), scratch)?;
    // dst holds float lanes until the final OR writes integer bits
    let out: &mut [f32] = bytemuck::cast_slice_mut(dst);

    // out = +-1.0, work = |x|
    isa::copy(out, src);
    isa::active_sign(out);
    isa::copy(work, src);
    isa::mul(work, out);

    // +1 where |x| < 1 so (-1, 0) does not count as negative
    isa::write_value_f32(bytemuck::cast_slice_mut(seg), 1.0);
    isa::cycle_lt(work, floats(seg));
    isa::add_tz(out, work);

    // out = 1.0 where x <= -1.0
    isa::write_value(seg, NEG_ONE_BITS);
    isa::cycle_eq(out, floats(seg));

    // 2^23 + trunc(|x|): the integer lands in the low 23 mantissa bits
    isa::copy(work, src);
    isa::active_abs(work);
    isa::write_value_f32(bytemuck::cast_slice_mut(seg), SHIFT_23);
    isa::cycle_add_tz(work, floats(seg));
    isa::sub(work, out);

    // negatives: complement the low bits of trunc(|x|) - 1
    isa::mul_scalar(out, LOW_24_ONES);
    isa::bxor(bits(work), bits(out));
    isa::write_value(seg, MANTISSA_MASK_32);
    isa::cycle_band(bits(work), seg);

    // back to a 0.0 / 1.0 flag, then fill the high bits for negatives
    isa::write_value(seg, ONE_BITS);
    isa::cycle_and(out, floats(seg));
    isa::bor(bits(work), bits(out));
    isa::mul_scalar(out, -2.0);
    isa::bor(bits(out), bits(work));
    Ok(())
}
