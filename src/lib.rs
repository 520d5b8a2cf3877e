// SPDX-License-Identifier: Apache-2.0

//! tiermath library
//!
//! Elementwise numeric kernels for vector units whose native instruction set
//! varies by hardware generation. Each kernel has a native path for tiers that
//! provide a single instruction for it and a fallback path assembled from more
//! primitive vector instructions.
//!
//! - Reciprocal, exponential and sigmoid over f16 and f32 buffers
//! - Bit-exact int32 <-> float32 conversion
//!
//! ## Tier selection
//! - `TIERMATH_ARCH` at build time picks the tier (default 322); see `build.rs`
//! - the `disable-native` feature forces the fallback tier for every kernel
//! - [`KernelTable::for_tier`] runs any tier explicitly
//!
//! ## Usage
//!
//! ```rust
//! use half::f16;
//! use tiermath::{KernelTable, Operands, Precision, Tier};
//!
//! // Build's tier
//! let mut values = vec![2.0f32, 4.0, 0.5];
//! tiermath::compute_recip(Operands::InPlace(&mut values), None, Precision::Fast)?;
//!
//! // Explicit tier, half inputs in fast mode need no scratch
//! let table = KernelTable::for_tier(Tier::V200);
//! let mut halves = vec![f16::from_f32(0.0); 4];
//! table.sigmoid(Operands::InPlace(&mut halves), None, Precision::Fast)?;
//! assert_eq!(halves[0].to_f32(), 0.5);
//! # Ok::<(), tiermath::KernelError>(())
//! ```

pub mod activation;
pub mod constants;
pub mod convert;
pub mod dispatch;
pub mod helpers;
pub mod isa;
pub mod raw;
pub mod types;

pub use types::*;

#[cfg(test)]
pub mod test_utils;

#[cfg(test)]
#[path = "tests/isa_tests.rs"]
mod isa_tests;
#[cfg(test)]
#[path = "tests/activation_tests.rs"]
mod activation_tests;
#[cfg(test)]
#[path = "tests/convert_tests.rs"]
mod convert_tests;
#[cfg(test)]
#[path = "tests/dispatch_tests.rs"]
mod dispatch_tests;
#[cfg(test)]
#[path = "tests/raw_tests.rs"]
mod raw_tests;

pub use convert::ConvertScratch;
pub use dispatch::*;
pub use raw::{compute_exp_raw, compute_recip_raw, compute_sigmoid_raw, compute_unary_raw};
