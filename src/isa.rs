// SPDX-License-Identifier: Apache-2.0

//! Vector unit instruction set
//!
//! Software model of the vector unit's instructions. Every kernel in this crate
//! is written only in terms of these, so a fallback path here is the same
//! instruction sequence the hardware runs.
//!
//! ## Lane model
//! 32-bit instructions act on untyped lanes: bitwise instructions take `u32`
//! lanes, float instructions take `f32` lanes, and kernels reinterpret buffers
//! with `bytemuck`. All instructions are in place: the first operand is both a
//! source and the destination. `cycle_*` instructions combine the operand with
//! a short pattern segment repeated across its length.
//!
//! ## Arithmetic semantics
//! - add/sub/mul round to nearest on ordinary values.
//! - A NaN operand propagates its own bit pattern unchanged.
//! - A product with a zero factor is `+0.0`, including `NaN * 0` and `inf * 0`.
//! - Comparisons produce `1.0` / `0.0` and do not flush subnormals.
//!
//! ## Half-lane approximations
//! The `_half` math instructions approximate from below and narrow round-down,
//! so on every in-domain input their result is at or below the widened
//! high-precision path, which also narrows round-down.

use half::f16;

use crate::constants::{
  LOG2E_BITS, RECIP_HALF_ITERATIONS, RECIP_HP_ITERATIONS, RECIP_SEED_BITS,
};

// High and low parts of ln(2) for two-step range reduction
const LN2_HI: f32 = 0.693_145_751_953_125;
const LN2_LO: f32 = 1.428_606_765_330_187e-6;

/// Taylor degree of the high-precision exponential.
const EXP_HP_DEGREE: usize = 6;

/// Taylor degree of the half-lane exponential. Odd, so never above e^r.
const EXP_HALF_DEGREE: usize = 3;

/// Taylor degree of e^r inside the half-lane sigmoid. Even, so never below
/// e^r once `r <= 0`.
const EXP_HALF_SIGMOID_DEGREE: usize = 4;

// =============================================================================
// LANE ARITHMETIC
// =============================================================================

#[inline(always)]
fn lane_add(a: f32, b: f32) -> f32 {
  if a.is_nan() {
    return a;
  }
  if b.is_nan() {
    return b;
  }
  a + b
}

#[inline(always)]
fn lane_sub(a: f32, b: f32) -> f32 {
  if a.is_nan() {
    return a;
  }
  if b.is_nan() {
    return b;
  }
  a - b
}

#[inline(always)]
fn lane_mul(a: f32, b: f32) -> f32 {
  if a == 0.0 || b == 0.0 {
    return 0.0;
  }
  if a.is_nan() {
    return a;
  }
  if b.is_nan() {
    return b;
  }
  a * b
}

/// Addition rounded toward zero.
#[inline(always)]
fn lane_add_tz(a: f32, b: f32) -> f32 {
  if a.is_nan() {
    return a;
  }
  if b.is_nan() {
    return b;
  }
  let s = a + b;
  if s.is_infinite() {
    if a.is_infinite() || b.is_infinite() {
      return s;
    }
    return f32::MAX.copysign(s);
  }
  // TwoSum: err is the exact rounding error of s
  let bb = s - a;
  let err = (a - (s - bb)) + (b - bb);
  if err != 0.0 && s != 0.0 && (err < 0.0) != (s < 0.0) {
    // rounded away from zero; one ulp back toward it
    return f32::from_bits(s.to_bits() - 1);
  }
  s
}

#[inline(always)]
fn lane_flag(cond: bool) -> f32 {
  if cond {
    1.0
  } else {
    0.0
  }
}

// =============================================================================
// SEGMENT FILL & COPY
// =============================================================================

/// Fills a pattern segment with one bit pattern.
#[inline]
pub fn write_value(seg: &mut [u32], bits: u32) {
  seg.fill(bits);
}

/// Fills a pattern segment with one float value.
#[inline]
pub fn write_value_f32(seg: &mut [f32], value: f32) {
  seg.fill(value);
}

#[inline]
pub fn copy<T: Copy>(dst: &mut [T], src: &[T]) {
  dst.copy_from_slice(src);
}

// =============================================================================
// BITWISE (u32 lanes)
// =============================================================================

#[inline]
pub fn band(acc: &mut [u32], other: &[u32]) {
  for (a, b) in acc.iter_mut().zip(other) {
    *a &= *b;
  }
}

#[inline]
pub fn bor(acc: &mut [u32], other: &[u32]) {
  for (a, b) in acc.iter_mut().zip(other) {
    *a |= *b;
  }
}

#[inline]
pub fn bxor(acc: &mut [u32], other: &[u32]) {
  for (a, b) in acc.iter_mut().zip(other) {
    *a ^= *b;
  }
}

#[inline]
pub fn cycle_band(acc: &mut [u32], seg: &[u32]) {
  for (a, b) in acc.iter_mut().zip(seg.iter().cycle()) {
    *a &= *b;
  }
}

#[inline]
pub fn cycle_bor(acc: &mut [u32], seg: &[u32]) {
  for (a, b) in acc.iter_mut().zip(seg.iter().cycle()) {
    *a |= *b;
  }
}

// =============================================================================
// FLOAT ARITHMETIC (f32 lanes)
// =============================================================================

#[inline]
pub fn add(acc: &mut [f32], other: &[f32]) {
  for (a, b) in acc.iter_mut().zip(other) {
    *a = lane_add(*a, *b);
  }
}

#[inline]
pub fn sub(acc: &mut [f32], other: &[f32]) {
  for (a, b) in acc.iter_mut().zip(other) {
    *a = lane_sub(*a, *b);
  }
}

#[inline]
pub fn mul(acc: &mut [f32], other: &[f32]) {
  for (a, b) in acc.iter_mut().zip(other) {
    *a = lane_mul(*a, *b);
  }
}

#[inline]
pub fn add_tz(acc: &mut [f32], other: &[f32]) {
  for (a, b) in acc.iter_mut().zip(other) {
    *a = lane_add_tz(*a, *b);
  }
}

#[inline]
pub fn add_scalar(acc: &mut [f32], value: f32) {
  for a in acc.iter_mut() {
    *a = lane_add(*a, value);
  }
}

#[inline]
pub fn sub_scalar(acc: &mut [f32], value: f32) {
  for a in acc.iter_mut() {
    *a = lane_sub(*a, value);
  }
}

#[inline]
pub fn mul_scalar(acc: &mut [f32], value: f32) {
  for a in acc.iter_mut() {
    *a = lane_mul(*a, value);
  }
}

#[inline]
pub fn cycle_add(acc: &mut [f32], seg: &[f32]) {
  for (a, b) in acc.iter_mut().zip(seg.iter().cycle()) {
    *a = lane_add(*a, *b);
  }
}

#[inline]
pub fn cycle_add_tz(acc: &mut [f32], seg: &[f32]) {
  for (a, b) in acc.iter_mut().zip(seg.iter().cycle()) {
    *a = lane_add_tz(*a, *b);
  }
}

#[inline]
pub fn cycle_mul(acc: &mut [f32], seg: &[f32]) {
  for (a, b) in acc.iter_mut().zip(seg.iter().cycle()) {
    *a = lane_mul(*a, *b);
  }
}

/// `1.0` where the lane equals the pattern, else `0.0`.
#[inline]
pub fn cycle_eq(acc: &mut [f32], seg: &[f32]) {
  for (a, b) in acc.iter_mut().zip(seg.iter().cycle()) {
    *a = lane_flag(*a == *b);
  }
}

/// `1.0` where the lane is less than the pattern, else `0.0`.
#[inline]
pub fn cycle_lt(acc: &mut [f32], seg: &[f32]) {
  for (a, b) in acc.iter_mut().zip(seg.iter().cycle()) {
    *a = lane_flag(*a < *b);
  }
}

/// Logical AND: `1.0` where both lane and pattern are nonzero.
#[inline]
pub fn cycle_and(acc: &mut [f32], seg: &[f32]) {
  for (a, b) in acc.iter_mut().zip(seg.iter().cycle()) {
    *a = lane_flag(*a != 0.0 && *b != 0.0);
  }
}

/// `-1.0` for negative lanes, `+1.0` otherwise (zeros and NaN included).
#[inline]
pub fn active_sign(acc: &mut [f32]) {
  for a in acc.iter_mut() {
    *a = if *a < 0.0 { -1.0 } else { 1.0 };
  }
}

#[inline]
pub fn active_abs(acc: &mut [f32]) {
  for a in acc.iter_mut() {
    *a = a.abs();
  }
}

// =============================================================================
// NATIVE MATH (newer tiers)
// =============================================================================

/// Exact reciprocal.
#[inline]
pub fn recip(acc: &mut [f32]) {
  for a in acc.iter_mut() {
    *a = 1.0 / *a;
  }
}

/// Exact power of two.
#[inline]
pub fn pow2(acc: &mut [f32]) {
  for a in acc.iter_mut() {
    *a = a.exp2();
  }
}

/// log2(e) decoded from its bit pattern.
#[inline]
pub fn log2e() -> f32 {
  f32::from_bits(LOG2E_BITS)
}

// =============================================================================
// APPROXIMATE MATH (all tiers)
// =============================================================================

#[inline(always)]
fn recip_approx_lane(x: f32, iterations: usize) -> f32 {
  let a = x.abs();
  // Seed is exact on powers of two, within 12.5% elsewhere
  let mut y = f32::from_bits(RECIP_SEED_BITS.wrapping_sub(a.to_bits()));
  for _ in 0..iterations {
    y = y * (2.0 - a * y);
  }
  y.copysign(x)
}

// `reduce` picks n from x * log2(e): round keeps |r| <= ln2 / 2, floor gives
// r >= 0 and ceil gives r <= 0
#[inline(always)]
fn exp_approx_lane(x: f32, degree: usize, reduce: fn(f32) -> f32) -> f32 {
  if x.is_nan() {
    return x;
  }
  let n = reduce(x * log2e());
  if n > 127.0 {
    return f32::INFINITY;
  }
  if n < -126.0 {
    return 0.0;
  }
  let r = (x - n * LN2_HI) - n * LN2_LO;

  // Horner over 1/k! for k = degree..=0
  let mut coeff = 1.0f32;
  for k in 2..=degree {
    coeff /= k as f32;
  }
  let mut p = coeff;
  for k in (1..=degree).rev() {
    coeff *= k as f32;
    p = p * r + coeff;
  }

  let scale = f32::from_bits(((n as i32 + 127) as u32) << 23);
  p * scale
}

#[inline(always)]
fn sigmoid_approx_lane(x: f32) -> f32 {
  recip_approx_lane(
    1.0 + exp_approx_lane(-x, EXP_HP_DEGREE, f32::round),
    RECIP_HP_ITERATIONS,
  )
}

// One Newton step undershoots 1/|x|. Negative lanes take the reflected step
// `y * (3 - 2|x|y)` instead, which overshoots, so the signed result stays low.
#[inline(always)]
fn recip_half_lane(x: f32) -> f32 {
  let a = x.abs();
  let y = recip_approx_lane(a, RECIP_HALF_ITERATIONS);
  if x.is_sign_negative() {
    -(y * (3.0 - 2.0 * (a * y)))
  } else {
    y
  }
}

#[inline(always)]
fn exp_half_lane(x: f32) -> f32 {
  exp_approx_lane(x, EXP_HALF_DEGREE, f32::floor)
}

// Over-estimated denominator, under-estimated reciprocal
#[inline(always)]
fn sigmoid_half_lane(x: f32) -> f32 {
  let d = 1.0 + exp_approx_lane(-x, EXP_HALF_SIGMOID_DEGREE, f32::ceil);
  recip_approx_lane(d, RECIP_HALF_ITERATIONS)
}

/// High-precision approximate reciprocal on f32 lanes.
///
/// Valid for magnitudes in [0.00391, 2e6].
#[inline]
pub fn active_reciphp(acc: &mut [f32]) {
  for a in acc.iter_mut() {
    *a = recip_approx_lane(*a, RECIP_HP_ITERATIONS);
  }
}

/// High-precision approximate exponential on f32 lanes.
#[inline]
pub fn active_exphp(acc: &mut [f32]) {
  for a in acc.iter_mut() {
    *a = exp_approx_lane(*a, EXP_HP_DEGREE, f32::round);
  }
}

/// Approximate sigmoid on f32 lanes.
#[inline]
pub fn active_sigmoid(acc: &mut [f32]) {
  for a in acc.iter_mut() {
    *a = sigmoid_approx_lane(*a);
  }
}

/// Approximate reciprocal on half lanes (about 2% relative error), rounded
/// toward negative infinity.
#[inline]
pub fn active_reciphp_half(acc: &mut [f16]) {
  for a in acc.iter_mut() {
    *a = f32_to_f16_rd(recip_half_lane(a.to_f32()));
  }
}

/// Approximate exponential on half lanes (under 1% relative error), rounded
/// toward negative infinity.
#[inline]
pub fn active_exphp_half(acc: &mut [f16]) {
  for a in acc.iter_mut() {
    *a = f32_to_f16_rd(exp_half_lane(a.to_f32()));
  }
}

/// Approximate sigmoid on half lanes (about 2% relative error), rounded
/// toward negative infinity.
#[inline]
pub fn active_sigmoid_half(acc: &mut [f16]) {
  for a in acc.iter_mut() {
    *a = f32_to_f16_rd(sigmoid_half_lane(a.to_f32()));
  }
}

// =============================================================================
// WIDTH CONVERSION
// =============================================================================

#[inline]
pub fn half2float(dst: &mut [f32], src: &[f16]) {
  for (d, s) in dst.iter_mut().zip(src) {
    *d = s.to_f32();
  }
}

/// Narrow to half, round to nearest even.
#[inline]
pub fn float2half_rn(dst: &mut [f16], src: &[f32]) {
  for (d, s) in dst.iter_mut().zip(src) {
    *d = f16::from_f32(*s);
  }
}

/// Narrow to half, round toward negative infinity.
#[inline]
pub fn float2half_rd(dst: &mut [f16], src: &[f32]) {
  for (d, s) in dst.iter_mut().zip(src) {
    *d = f32_to_f16_rd(*s);
  }
}

pub(crate) fn f32_to_f16_rd(x: f32) -> f16 {
  let h = f16::from_f32(x);
  if x.is_nan() || h.to_f32() <= x {
    return h;
  }
  // rounded up: step one half ulp pattern toward -inf
  let bits = h.to_bits();
  let down = if bits == 0x0000 {
    0x8001
  } else if bits & 0x8000 == 0 {
    bits - 1
  } else {
    bits + 1
  };
  f16::from_bits(down)
}

// =============================================================================
// NATIVE INTEGER CONVERSION (newer tiers)
// =============================================================================

/// i32 lanes to f32, rounding toward zero.
#[inline]
pub fn int322float(dst: &mut [f32], src: &[i32]) {
  for (d, s) in dst.iter_mut().zip(src) {
    let f = *s as f32;
    // i32 -> f64 is exact, so this detects rounding away from zero
    *d = if (f as f64).abs() > (*s as f64).abs() {
      f32::from_bits(f.to_bits() - 1)
    } else {
      f
    };
  }
}

/// f32 lanes to i32, truncating toward zero.
#[inline]
pub fn float2int32_tz(dst: &mut [i32], src: &[f32]) {
  for (d, s) in dst.iter_mut().zip(src) {
    *d = *s as i32;
  }
}
