// SPDX-License-Identifier: Apache-2.0

//! Common constants used across implementations
//!
//! This module centralizes bit patterns, alignment units, lane counts and the
//! documented input domains used by the native and fallback kernel paths.

// =============================================================================
// ALIGNMENT & LANE COUNTS
// =============================================================================

/// Byte granularity required by the cycle (repeating-mask) instructions.
pub const ALIGN_BYTES: usize = 128;

/// f32/i32/u32 lanes in one alignment segment (128 / 4 = 32).
pub const SEG_LANES_32: usize = ALIGN_BYTES / 4;

// =============================================================================
// IEEE-754 BIT PATTERNS
// =============================================================================

/// log2(e) as a 32-bit float bit pattern. Kept as bits: the decimal literal
/// does not round to the same value on every toolchain.
pub const LOG2E_BITS: u32 = 0x3fb8_aa3b;

pub const SIGN_MASK_32: u32 = 0x8000_0000;
pub const MANTISSA_MASK_32: u32 = 0x007f_ffff;
pub const ALL_ONES_32: u32 = 0xffff_ffff;

/// Lowest mantissa bit, also the smallest positive subnormal when viewed as f32.
pub const LOW_BIT_32: u32 = 0x0000_0001;

/// Sign bit plus lowest mantissa bit; tested against `(x & SIGN) | 1`.
pub const SIGN_LOW_BIT_32: u32 = 0x8000_0001;

/// Exponent field of 2^23: OR-ing a 23-bit integer in yields `2^23 + n`.
pub const SHIFT_23_BITS: u32 = 0x4b00_0000;

/// -1.0f32
pub const NEG_ONE_BITS: u32 = 0xbf80_0000;

/// 1.0f32
pub const ONE_BITS: u32 = 0x3f80_0000;

/// Seed constant for the reciprocal approximation. Exact on powers of two.
pub const RECIP_SEED_BITS: u32 = 0x7f00_0000;

// =============================================================================
// FLOAT CONSTANTS
// =============================================================================

/// 2^23 as a float
pub const SHIFT_23: f32 = 8_388_608.0;

/// 2^24 - 1, the low-24-bit all-ones pattern when added to 2^23 exponent
pub const LOW_24_ONES: f32 = 16_777_215.0;

/// Largest finite half-precision value.
pub const HALF_MAX: f32 = 65504.0;

// =============================================================================
// CONVERSION DOMAIN
// =============================================================================

/// Smallest integer the bit-level conversions handle (-2^23).
pub const CONVERT_MIN: i32 = -(1 << 23);

/// Largest integer the bit-level conversions handle (2^23 - 1).
pub const CONVERT_MAX: i32 = (1 << 23) - 1;

// =============================================================================
// APPROXIMATION DOMAINS (fallback tier)
// =============================================================================

/// Lower magnitude bound for the approximate reciprocal instruction.
pub const RECIP_DOMAIN_MIN: f32 = 0.00391;

/// Upper magnitude bound for the approximate f32 reciprocal instruction.
pub const RECIP_DOMAIN_MAX_F32: f32 = 2.0e6;

/// Upper magnitude bound for the approximate f16 reciprocal instruction.
pub const RECIP_DOMAIN_MAX_F16: f32 = HALF_MAX;

/// Exponential input range where 2^n scaling stays in the normal f32 range.
pub const EXP_DOMAIN_MIN_F32: f32 = -87.0;
pub const EXP_DOMAIN_MAX_F32: f32 = 88.0;

/// Exponential input range whose result is a finite half.
pub const EXP_DOMAIN_MIN_F16: f32 = -9.7;
pub const EXP_DOMAIN_MAX_F16: f32 = 11.0;

/// Sigmoid inputs beyond this magnitude overflow the approximate exponential.
pub const SIGMOID_DOMAIN_F32: f32 = 87.0;
pub const SIGMOID_DOMAIN_F16: f32 = 11.0;

// =============================================================================
// APPROXIMATION STEPS
// =============================================================================

/// Newton-Raphson refinements used by the high-precision reciprocal.
pub const RECIP_HP_ITERATIONS: usize = 3;

/// Newton-Raphson refinements used by the half-precision reciprocal.
pub const RECIP_HALF_ITERATIONS: usize = 1;
