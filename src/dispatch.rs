// SPDX-License-Identifier: Apache-2.0

//! # tiermath dispatch framework
//!
//! This module contains the dispatch layer used across the crate: it maps a
//! hardware capability tier to the native or fallback implementation of each
//! kernel, once, into a [`KernelTable`]. The public entry points below run
//! against the table for the tier the crate was built for; callers that need
//! another tier (tests, cross-tier validation) build a table explicitly.
//!
//! ## Tiers
//! - **V200**: approximate reciprocal/exp/sigmoid instructions only, no native
//!   integer conversion
//! - **V300**: exact reciprocal, power-of-two and int32 -> float32
//! - **V322**: adds truncating float32 -> int32

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::sync::OnceLock;

use half::f16;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::constants::*;
use crate::activation::{self, F32Kernel, HalfKernel};
use crate::convert::{self, ConvertScratch, FloatToIntKernel, IntToFloatKernel};
use crate::helpers::{check_scratch, mask_scratch_len, max_of, min_of, widen_scratch_len};
use crate::types::{DataType, KernelError, Operands, Precision, Result};

// =============================================================================
//  TIERS & CAPABILITIES
// =============================================================================

/// Hardware generation of the target vector unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    V200,
    V300,
    V322,
}

/// Native instructions available on a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierCapabilities {
    pub has_native_recip: bool,
    pub has_native_pow2: bool,
    pub has_native_int2float: bool,
    pub has_native_float2int_tz: bool,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::V200, Tier::V300, Tier::V322];

    #[inline]
    pub fn from_arch(arch: u32) -> Self {
        if arch >= 322 {
            Tier::V322
        } else if arch >= 300 {
            Tier::V300
        } else {
            Tier::V200
        }
    }

    /// Lowest architecture number belonging to the tier.
    #[inline]
    pub fn arch(self) -> u32 {
        match self {
            Tier::V200 => 200,
            Tier::V300 => 300,
            Tier::V322 => 322,
        }
    }

    /// The tier selected by `build.rs` (from `TIERMATH_ARCH` or the device query).
    #[inline]
    pub fn build_default() -> Self {
        #[cfg(tier_v322)]
        return Tier::V322;
        #[cfg(all(tier_v300, not(tier_v322)))]
        return Tier::V300;
        #[cfg(not(tier_v300))]
        return Tier::V200;
    }

    /// Raw architecture number recorded at build time.
    #[inline]
    pub fn build_arch() -> u32 {
        env!("TIERMATH_BUILD_ARCH").parse().unwrap_or(200)
    }

    #[inline]
    pub fn capabilities(self) -> TierCapabilities {
        TierCapabilities {
            has_native_recip: self >= Tier::V300,
            has_native_pow2: self >= Tier::V300,
            has_native_int2float: self >= Tier::V300,
            has_native_float2int_tz: self >= Tier::V322,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.arch())
    }
}

impl FromStr for Tier {
    type Err = KernelError;

    /// Accepts `"v300"`, `"V300"` or a bare architecture number like `"372"`.
    fn from_str(s: &str) -> Result<Self> {
        let digits = s.trim().trim_start_matches(['v', 'V']);
        digits
            .parse::<u32>()
            .map(Tier::from_arch)
            .map_err(|_| KernelError::Unsupported(format!("unknown tier '{}'", s)))
    }
}

/// Get the capabilities of the tier this build targets.
#[inline]
pub fn get_hw_capabilities() -> TierCapabilities {
    Tier::build_default().capabilities()
}

// =============================================================================
//  OPERATIONS & DOMAINS
// =============================================================================

/// The elementwise float operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Recip,
    Exp,
    Sigmoid,
}

/// Documented input range of a kernel. Outside it results are unspecified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub lo: f32,
    pub hi: f32,
    /// Bounds apply to `|x|` rather than `x`.
    pub magnitude: bool,
}

impl Domain {
    #[inline]
    pub fn contains(&self, x: f32) -> bool {
        let v = if self.magnitude { x.abs() } else { x };
        v >= self.lo && v <= self.hi
    }

    /// Nearest in-domain value. Magnitude domains keep the sign of `x`.
    #[inline]
    pub fn clamp(&self, x: f32) -> f32 {
        if self.magnitude {
            max_of(min_of(x.abs(), self.hi), self.lo).copysign(x)
        } else {
            max_of(min_of(x, self.hi), self.lo)
        }
    }
}

/// Input domain a caller must respect for `op` on `dtype` at `tier`.
///
/// `None` means the kernel has no documented restriction there, or the dtype is
/// not a float type.
pub fn input_domain(op: UnaryOp, dtype: DataType, tier: Tier) -> Option<Domain> {
    let half = match dtype {
        DataType::Half => true,
        DataType::Float => false,
        DataType::Int32 => return None,
    };
    let caps = tier.capabilities();
    match op {
        UnaryOp::Recip => {
            if caps.has_native_recip {
                return None;
            }
            Some(Domain {
                lo: RECIP_DOMAIN_MIN,
                hi: if half {
                    RECIP_DOMAIN_MAX_F16
                } else {
                    RECIP_DOMAIN_MAX_F32
                },
                magnitude: true,
            })
        }
        UnaryOp::Exp => Some(if half {
            Domain {
                lo: EXP_DOMAIN_MIN_F16,
                hi: EXP_DOMAIN_MAX_F16,
                magnitude: false,
            }
        } else {
            Domain {
                lo: EXP_DOMAIN_MIN_F32,
                hi: EXP_DOMAIN_MAX_F32,
                magnitude: false,
            }
        }),
        UnaryOp::Sigmoid => {
            let bound = if half {
                SIGMOID_DOMAIN_F16
            } else {
                SIGMOID_DOMAIN_F32
            };
            Some(Domain {
                lo: -bound,
                hi: bound,
                magnitude: false,
            })
        }
    }
}

/// Integer range the bit-level conversions handle exactly.
#[inline]
pub fn convert_domain() -> RangeInclusive<i32> {
    CONVERT_MIN..=CONVERT_MAX
}

// =============================================================================
//  ELEMENT TYPES
// =============================================================================

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for half::f16 {}
}

/// Float element types the unary kernels accept.
pub trait KernelFloat: Copy + sealed::Sealed + 'static {
    const DTYPE: DataType;

    #[doc(hidden)]
    fn run(
        table: &KernelTable,
        op: UnaryOp,
        buf: &mut [Self],
        scratch: Option<&mut [f32]>,
        precision: Precision,
    ) -> Result<()>;
}

impl KernelFloat for f32 {
    const DTYPE: DataType = DataType::Float;

    #[inline]
    fn run(
        table: &KernelTable,
        op: UnaryOp,
        buf: &mut [f32],
        _scratch: Option<&mut [f32]>,
        precision: Precision,
    ) -> Result<()> {
        let kernel = match op {
            UnaryOp::Recip => table.recip_f32,
            UnaryOp::Exp => table.exp_f32,
            UnaryOp::Sigmoid => table.sigmoid_f32,
        };
        kernel(buf, precision)
    }
}

impl KernelFloat for f16 {
    const DTYPE: DataType = DataType::Half;

    #[inline]
    fn run(
        table: &KernelTable,
        op: UnaryOp,
        buf: &mut [f16],
        scratch: Option<&mut [f32]>,
        precision: Precision,
    ) -> Result<()> {
        let kernel = match op {
            UnaryOp::Recip => table.recip_half,
            UnaryOp::Exp => table.exp_half,
            UnaryOp::Sigmoid => table.sigmoid_half,
        };
        kernel(buf, scratch, precision)
    }
}

// =============================================================================
//  DISPATCH TABLE
// =============================================================================

/// Per-tier table of kernel implementations, resolved once.
#[derive(Clone, Copy)]
pub struct KernelTable {
    tier: Tier,
    recip_f32: F32Kernel,
    recip_half: HalfKernel,
    exp_f32: F32Kernel,
    exp_half: HalfKernel,
    sigmoid_f32: F32Kernel,
    sigmoid_half: HalfKernel,
    int_to_float: IntToFloatKernel,
    float_to_int: FloatToIntKernel,
}

impl fmt::Debug for KernelTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelTable")
            .field("tier", &self.tier)
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

impl KernelTable {
    pub fn for_tier(tier: Tier) -> Self {
        let caps = tier.capabilities();

        let (recip_f32, recip_half): (F32Kernel, HalfKernel) = if caps.has_native_recip {
            (activation::recip_f32_native, activation::recip_half_native)
        } else {
            (activation::recip_f32_fallback, activation::recip_half_fallback)
        };

        let (exp_f32, exp_half, sigmoid_f32, sigmoid_half): (
            F32Kernel,
            HalfKernel,
            F32Kernel,
            HalfKernel,
        ) = if caps.has_native_pow2 {
            (
                activation::exp_f32_native,
                activation::exp_half_native,
                activation::sigmoid_f32_native,
                activation::sigmoid_half_native,
            )
        } else {
            (
                activation::exp_f32_fallback,
                activation::exp_half_fallback,
                activation::sigmoid_f32_fallback,
                activation::sigmoid_half_fallback,
            )
        };

        let int_to_float: IntToFloatKernel = if caps.has_native_int2float {
            convert::int32_to_float32_native
        } else {
            convert::int32_to_float32_fallback
        };

        let float_to_int: FloatToIntKernel = if caps.has_native_float2int_tz {
            convert::float32_to_int32_native
        } else {
            convert::float32_to_int32_fallback
        };

        KernelTable {
            tier,
            recip_f32,
            recip_half,
            exp_f32,
            exp_half,
            sigmoid_f32,
            sigmoid_half,
            int_to_float,
            float_to_int,
        }
    }

    /// Table for the tier this build targets.
    pub fn global() -> &'static KernelTable {
        static TABLE: OnceLock<KernelTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            let tier = Tier::build_default();
            debug!(
                "tiermath kernel table: tier={}, build arch={}",
                tier,
                Tier::build_arch()
            );
            KernelTable::for_tier(tier)
        })
    }

    #[inline]
    pub fn tier(&self) -> Tier {
        self.tier
    }

    #[inline]
    pub fn capabilities(&self) -> TierCapabilities {
        self.tier.capabilities()
    }

    /// f32 lanes of widening scratch `op` needs for `count` elements of `dtype`.
    pub fn scratch_len(
        &self,
        op: UnaryOp,
        dtype: DataType,
        precision: Precision,
        count: usize,
    ) -> usize {
        if dtype != DataType::Half {
            return 0;
        }
        let caps = self.capabilities();
        let native = match op {
            UnaryOp::Recip => caps.has_native_recip,
            UnaryOp::Exp | UnaryOp::Sigmoid => caps.has_native_pow2,
        };
        if native || precision.is_high() {
            widen_scratch_len(count)
        } else {
            0
        }
    }

    /// `(work, seg)` lane counts the conversion kernels need for `count` elements.
    /// Both are zero where the tier converts natively.
    pub fn convert_scratch_len(&self, to_float: bool, count: usize) -> (usize, usize) {
        let caps = self.capabilities();
        let native = if to_float {
            caps.has_native_int2float
        } else {
            caps.has_native_float2int_tz
        };
        if native {
            (0, 0)
        } else {
            (count, mask_scratch_len())
        }
    }

    pub fn unary<T: KernelFloat>(
        &self,
        op: UnaryOp,
        ops: Operands<'_, T>,
        scratch: Option<&mut [f32]>,
        precision: Precision,
    ) -> Result<()> {
        trace!(
            "{:?} DISPATCH: dtype={:?}, tier={}, len={}, precision={:?}",
            op,
            T::DTYPE,
            self.tier,
            ops.len(),
            precision
        );
        // Checked before `into_dst` so a rejected split call leaves dst as it was
        let required = self.scratch_len(op, T::DTYPE, precision, ops.len());
        if required > 0 {
            check_scratch(required, scratch.as_ref().map_or(0, |s| s.len()))?;
        }
        let buf = ops.into_dst()?;
        if buf.is_empty() {
            return Ok(());
        }
        T::run(self, op, buf, scratch, precision)
    }

    #[inline]
    pub fn recip<T: KernelFloat>(
        &self,
        ops: Operands<'_, T>,
        scratch: Option<&mut [f32]>,
        precision: Precision,
    ) -> Result<()> {
        self.unary(UnaryOp::Recip, ops, scratch, precision)
    }

    #[inline]
    pub fn exp<T: KernelFloat>(
        &self,
        ops: Operands<'_, T>,
        scratch: Option<&mut [f32]>,
        precision: Precision,
    ) -> Result<()> {
        self.unary(UnaryOp::Exp, ops, scratch, precision)
    }

    #[inline]
    pub fn sigmoid<T: KernelFloat>(
        &self,
        ops: Operands<'_, T>,
        scratch: Option<&mut [f32]>,
        precision: Precision,
    ) -> Result<()> {
        self.unary(UnaryOp::Sigmoid, ops, scratch, precision)
    }

    pub fn int32_to_float32(
        &self,
        dst: &mut [f32],
        src: &[i32],
        scratch: Option<ConvertScratch<'_>>,
    ) -> Result<()> {
        trace!(
            "INT32_TO_FLOAT32 DISPATCH: tier={}, dst.len()={}, src.len()={}",
            self.tier,
            dst.len(),
            src.len()
        );
        (self.int_to_float)(dst, src, scratch)
    }

    pub fn float32_to_int32(
        &self,
        dst: &mut [i32],
        src: &[f32],
        scratch: Option<ConvertScratch<'_>>,
    ) -> Result<()> {
        trace!(
            "FLOAT32_TO_INT32 DISPATCH: tier={}, dst.len()={}, src.len()={}",
            self.tier,
            dst.len(),
            src.len()
        );
        (self.float_to_int)(dst, src, scratch)
    }
}

// =============================================================================
//  ENTRY POINTS
// =============================================================================

/// Element-wise reciprocal `1/x` on the build's tier.
///
/// # Arguments
/// * `ops` - In-place buffer or destination/source pair
/// * `scratch` - f32 widening scratch, one lane per element; needed for half
///   inputs except in fast mode on V200. See [`KernelTable::scratch_len`].
/// * `precision` - Only consulted for half inputs on V200
///
/// # Returns
/// * `Ok(())` - Success
/// * `Err(KernelError::LengthMismatch)` - `dst` and `src` differ in length
/// * `Err(KernelError::ScratchTooSmall)` - widening scratch missing or short
///
/// # Examples
/// ```rust
/// use tiermath::{compute_recip, Operands, Precision};
///
/// let mut values = vec![2.0f32, 4.0, 0.5];
/// compute_recip(Operands::InPlace(&mut values), None, Precision::Fast)?;
/// assert!((values[0] - 0.5).abs() < 1e-6);
/// assert!((values[2] - 2.0).abs() < 1e-6);
/// # Ok::<(), tiermath::KernelError>(())
/// ```
///
/// # Domain
/// On V200 the magnitude must lie in [0.00391, 2e6] (f32) or [0.00391, 65504]
/// (f16); outside it the approximation is unreliable.
#[inline]
pub fn compute_recip<T: KernelFloat>(
    ops: Operands<'_, T>,
    scratch: Option<&mut [f32]>,
    precision: Precision,
) -> Result<()> {
    KernelTable::global().recip(ops, scratch, precision)
}

/// Element-wise exponential `e^x` on the build's tier.
///
/// Tiers with a power-of-two instruction compute `2^(x * log2(e))`; V200 uses
/// the approximate exponential.
///
/// # Examples
/// ```rust
/// use half::f16;
/// use tiermath::{compute_exp, Operands, Precision};
///
/// let src = vec![f16::from_f32(0.0), f16::from_f32(1.0)];
/// let mut dst = vec![f16::ZERO; 2];
/// let mut scratch = vec![0.0f32; 2];
/// compute_exp(Operands::split(&mut dst, &src), Some(&mut scratch), Precision::High)?;
/// assert_eq!(dst[0].to_f32(), 1.0);
/// assert!((dst[1].to_f32() - std::f32::consts::E).abs() < 0.01);
/// # Ok::<(), tiermath::KernelError>(())
/// ```
#[inline]
pub fn compute_exp<T: KernelFloat>(
    ops: Operands<'_, T>,
    scratch: Option<&mut [f32]>,
    precision: Precision,
) -> Result<()> {
    KernelTable::global().exp(ops, scratch, precision)
}

/// Element-wise sigmoid `1 / (1 + e^-x)` on the build's tier.
///
/// # Examples
/// ```rust
/// use tiermath::{compute_sigmoid, Operands, Precision};
///
/// let mut values = vec![0.0f32];
/// compute_sigmoid(Operands::InPlace(&mut values), None, Precision::High)?;
/// assert_eq!(values[0], 0.5);
/// # Ok::<(), tiermath::KernelError>(())
/// ```
#[inline]
pub fn compute_sigmoid<T: KernelFloat>(
    ops: Operands<'_, T>,
    scratch: Option<&mut [f32]>,
    precision: Precision,
) -> Result<()> {
    KernelTable::global().sigmoid(ops, scratch, precision)
}

/// Converts i32 values to f32 on the build's tier.
///
/// Without a native instruction the conversion is rebuilt bitwise and needs
/// [`ConvertScratch`]; `src.len() * 4` must then be a multiple of 128 and values
/// must lie in [-2^23, 2^23 - 1].
///
/// # Examples
/// ```rust
/// use tiermath::{int32_to_float32, ConvertScratch};
///
/// let mut src = vec![0i32; 32];
/// src[0] = 5;
/// src[1] = -8388608;
/// let mut dst = vec![0.0f32; 32];
/// let mut work = vec![0.0f32; 32];
/// let mut seg = vec![0u32; 32];
/// int32_to_float32(&mut dst, &src, Some(ConvertScratch::new(&mut work, &mut seg)))?;
/// assert_eq!(dst[0], 5.0);
/// assert_eq!(dst[1], -8388608.0);
/// # Ok::<(), tiermath::KernelError>(())
/// ```
#[inline]
pub fn int32_to_float32(
    dst: &mut [f32],
    src: &[i32],
    scratch: Option<ConvertScratch<'_>>,
) -> Result<()> {
    KernelTable::global().int32_to_float32(dst, src, scratch)
}

/// Converts f32 values to i32, truncating toward zero, on the build's tier.
///
/// Same scratch, alignment and domain contract as [`int32_to_float32`].
///
/// # Examples
/// ```rust
/// use tiermath::{float32_to_int32, ConvertScratch};
///
/// let mut src = vec![0.0f32; 32];
/// src[0] = 5.0;
/// src[1] = -2.75;
/// let mut dst = vec![0i32; 32];
/// let mut work = vec![0.0f32; 32];
/// let mut seg = vec![0u32; 32];
/// float32_to_int32(&mut dst, &src, Some(ConvertScratch::new(&mut work, &mut seg)))?;
/// assert_eq!(dst[0], 5);
/// assert_eq!(dst[1], -2);
/// # Ok::<(), tiermath::KernelError>(())
/// ```
#[inline]
pub fn float32_to_int32(
    dst: &mut [i32],
    src: &[f32],
    scratch: Option<ConvertScratch<'_>>,
) -> Result<()> {
    KernelTable::global().float32_to_int32(dst, src, scratch)
}
