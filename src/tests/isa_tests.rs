// SPDX-License-Identifier: Apache-2.0

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
  use half::f16;

  use crate::constants::{ALL_ONES_32, LOG2E_BITS, SEG_LANES_32, SIGN_LOW_BIT_32};
  use crate::isa::{self, f32_to_f16_rd};
  use crate::test_utils::config_test_logger;

  // =============================================================================
  //   LANE ARITHMETIC
  // =============================================================================

  #[test]
  fn test_mul_with_zero_factor_is_positive_zero() {
    config_test_logger();
    let mut acc = vec![0.0f32, -0.0, 0.0, 5.0];
    let other = vec![f32::from_bits(ALL_ONES_32), -2.0, f32::INFINITY, 0.0];
    isa::mul(&mut acc, &other);
    for lane in &acc {
      assert_eq!(lane.to_bits(), 0, "expected +0.0, got {:#x}", lane.to_bits());
    }
  }

  #[test]
  fn test_mul_propagates_nan_pattern() {
    let mut acc = vec![1.0f32, -3.5];
    let seg = vec![f32::from_bits(ALL_ONES_32)];
    isa::cycle_mul(&mut acc, &seg);
    assert_eq!(acc[0].to_bits(), ALL_ONES_32);
    assert_eq!(acc[1].to_bits(), ALL_ONES_32);
  }

  #[test]
  fn test_add_propagates_nan_pattern() {
    let mut acc = vec![f32::from_bits(ALL_ONES_32), 0.0];
    let seg = vec![f32::from_bits(1)];
    isa::cycle_add(&mut acc, &seg);
    assert_eq!(acc[0].to_bits(), ALL_ONES_32);
    assert_eq!(acc[1].to_bits(), 1);
  }

  #[test]
  fn test_add_tz_rounds_toward_zero() {
    let shift = 8_388_608.0f32;
    let mut acc = vec![5.7f32, -5.7, 0.25, 8_388_607.0];
    isa::cycle_add_tz(&mut acc, &[shift]);
    assert_eq!(acc, vec![8_388_613.0, 8_388_602.0, 8_388_608.0, 16_777_215.0]);

    let mut acc = vec![1.0f32, -1.0, 1.0];
    isa::add_tz(&mut acc, &[-1e-8, 1e-8, 1e-8]);
    assert_eq!(acc[0], f32::from_bits(0x3f7f_ffff));
    assert_eq!(acc[1], -f32::from_bits(0x3f7f_ffff));
    assert_eq!(acc[2], 1.0);
  }

  #[test]
  fn test_add_tz_exact_sums_unchanged() {
    let mut acc = vec![1.5f32, -2.0, 0.0, -1.0];
    isa::add_tz(&mut acc, &[2.25, 2.0, 0.0, 1.0]);
    assert_eq!(acc, vec![3.75, 0.0, 0.0, 0.0]);
  }

  #[test]
  fn test_add_tz_saturates_instead_of_overflowing() {
    let mut acc = vec![f32::MAX, -f32::MAX];
    isa::add_tz(&mut acc, &[f32::MAX, -f32::MAX]);
    assert_eq!(acc, vec![f32::MAX, -f32::MAX]);
  }

  // =============================================================================
  //   CYCLE & BITWISE
  // =============================================================================

  #[test]
  fn test_cycle_ops_repeat_segment() {
    let mut seg = vec![0u32; SEG_LANES_32];
    for (i, s) in seg.iter_mut().enumerate() {
      *s = 1u32 << (i % 32);
    }
    let mut acc = vec![u32::MAX; SEG_LANES_32 * 3];
    isa::cycle_band(&mut acc, &seg);
    for (i, a) in acc.iter().enumerate() {
      assert_eq!(*a, 1u32 << (i % 32), "lane {}", i);
    }

    let mut acc = vec![0u32; SEG_LANES_32 * 2];
    isa::write_value(&mut seg, 0x00ff_0000);
    isa::cycle_bor(&mut acc, &seg);
    assert!(acc.iter().all(|a| *a == 0x00ff_0000));
  }

  #[test]
  fn test_full_length_bitwise() {
    let mut acc = vec![0b1100u32, 0b1010, 0xffff_0000];
    isa::band(&mut acc, &[0b1010, 0b0110, 0x0fff_f000]);
    assert_eq!(acc, vec![0b1000, 0b0010, 0x0fff_0000]);
    isa::bor(&mut acc, &[0b0001, 0b0001, 0x0000_000f]);
    assert_eq!(acc, vec![0b1001, 0b0011, 0x0fff_000f]);
    isa::bxor(&mut acc, &[0b1001, 0, 0xffff_ffff]);
    assert_eq!(acc, vec![0, 0b0011, 0xf000_fff0]);
  }

  #[test]
  fn test_cycle_eq_does_not_flush_subnormals() {
    let mut acc = vec![f32::from_bits(SIGN_LOW_BIT_32), f32::from_bits(1), 0.0, -0.0];
    isa::cycle_eq(&mut acc, &[f32::from_bits(SIGN_LOW_BIT_32)]);
    assert_eq!(acc, vec![1.0, 0.0, 0.0, 0.0]);
  }

  #[test]
  fn test_compare_and_logical_ops() {
    let mut acc = vec![0.5f32, 1.0, -3.0, 2.0];
    isa::cycle_lt(&mut acc, &[1.0]);
    assert_eq!(acc, vec![1.0, 0.0, 1.0, 0.0]);

    let mut acc = vec![0.0f32, 1.0, 7.0, f32::NAN];
    isa::cycle_and(&mut acc, &[3.0]);
    assert_eq!(acc, vec![0.0, 1.0, 1.0, 1.0]);

    let mut acc = vec![1.0f32, 1.0];
    isa::cycle_and(&mut acc, &[0.0, 2.0]);
    assert_eq!(acc, vec![0.0, 1.0]);
  }

  #[test]
  fn test_sign_and_abs() {
    let mut acc = vec![-2.5f32, 0.0, -0.0, 3.0, -1e-30];
    isa::active_sign(&mut acc);
    assert_eq!(acc, vec![-1.0, 1.0, 1.0, 1.0, -1.0]);

    let mut acc = vec![-2.5f32, -0.0, 3.0];
    isa::active_abs(&mut acc);
    assert_eq!(acc, vec![2.5, 0.0, 3.0]);
    assert_eq!(acc[1].to_bits(), 0);
  }

  #[test]
  fn test_scalar_ops() {
    let mut acc = vec![1.0f32, -2.0, 0.0];
    isa::mul_scalar(&mut acc, -1.0);
    assert_eq!(acc, vec![-1.0, 2.0, 0.0]);
    assert_eq!(acc[2].to_bits(), 0);
    isa::add_scalar(&mut acc, 1.0);
    assert_eq!(acc, vec![0.0, 3.0, 1.0]);
    isa::sub_scalar(&mut acc, 0.5);
    assert_eq!(acc, vec![-0.5, 2.5, 0.5]);
    isa::sub(&mut acc, &[0.5, 0.5, 0.5]);
    assert_eq!(acc, vec![-1.0, 2.0, 0.0]);
  }

  // =============================================================================
  //   NATIVE & APPROXIMATE MATH
  // =============================================================================

  #[test]
  fn test_log2e_bit_pattern() {
    assert_eq!(isa::log2e().to_bits(), LOG2E_BITS);
    assert!((isa::log2e() - std::f32::consts::LOG2_E).abs() < 1e-6);
  }

  #[test]
  fn test_native_recip_and_pow2() {
    let mut acc = vec![2.0f32, -4.0, 0.1];
    isa::recip(&mut acc);
    assert_eq!(acc, vec![0.5, -0.25, 1.0 / 0.1f32]);

    let mut acc = vec![0.0f32, 3.0, -1.0, 0.5];
    isa::pow2(&mut acc);
    for (got, want) in acc.iter().zip([1.0f32, 8.0, 0.5, std::f32::consts::SQRT_2]) {
      assert!((got - want).abs() <= want * 1e-6, "got={} want={}", got, want);
    }
  }

  #[test]
  fn test_reciphp_exact_on_powers_of_two() {
    let mut acc = vec![1.0f32, 2.0, 4.0, 0.5, 0.0078125, 1024.0, -8.0];
    let expected: Vec<f32> = acc.iter().map(|x| 1.0 / x).collect();
    isa::active_reciphp(&mut acc);
    assert_eq!(acc, expected);
  }

  #[test]
  fn test_reciphp_accuracy_across_domain() {
    // log-spaced over [0.00391, 2e6]
    let n = 500;
    let (lo, hi) = (0.00391f64, 2.0e6f64);
    for i in 0..n {
      let x = (lo * (hi / lo).powf(i as f64 / (n - 1) as f64)) as f32;
      let mut acc = [x, -x];
      isa::active_reciphp(&mut acc);
      let exact = 1.0 / x as f64;
      let err = ((acc[0] as f64 - exact) / exact).abs();
      assert!(err < 1e-6, "x={} got={} err={}", x, acc[0], err);
      assert_eq!(acc[1], -acc[0]);
    }
  }

  #[test]
  fn test_exphp_accuracy() {
    let n = 801;
    for i in 0..n {
      let x = -80.0 + 160.0 * i as f32 / (n - 1) as f32;
      let mut acc = [x];
      isa::active_exphp(&mut acc);
      let exact = (x as f64).exp();
      let err = ((acc[0] as f64 - exact) / exact).abs();
      assert!(err < 2e-6, "x={} got={} err={}", x, acc[0], err);
    }
  }

  #[test]
  fn test_exphp_at_zero_is_one() {
    let mut acc = [0.0f32, -0.0];
    isa::active_exphp(&mut acc);
    assert_eq!(acc, [1.0, 1.0]);
  }

  #[test]
  fn test_sigmoid_approximations() {
    let mut acc = [0.0f32, 2.0, -2.0, 10.0];
    isa::active_sigmoid(&mut acc);
    assert_eq!(acc[0], 0.5);
    for (got, x) in acc.iter().zip([0.0f64, 2.0, -2.0, 10.0]) {
      let exact = 1.0 / (1.0 + (-x).exp());
      assert!(((*got as f64) - exact).abs() < 1e-6, "x={} got={}", x, got);
    }

    let mut halves: Vec<f16> = [0.0f32, 2.0, -2.0].iter().map(|v| f16::from_f32(*v)).collect();
    isa::active_sigmoid_half(&mut halves);
    assert_eq!(halves[0].to_f32(), 0.5);
    assert!((halves[1].to_f32() - 0.8808).abs() < 0.03);
    assert!((halves[2].to_f32() - 0.1192).abs() < 0.03);
  }

  #[test]
  fn test_half_lane_approximations_are_coarse_but_bounded() {
    let xs = [0.3f32, 0.7, 1.5, 3.0, 100.0];
    let mut halves: Vec<f16> = xs.iter().map(|v| f16::from_f32(*v)).collect();
    isa::active_reciphp_half(&mut halves);
    for (h, x) in halves.iter().zip(xs) {
      let exact = 1.0 / f16::from_f32(x).to_f32();
      assert!(((h.to_f32() - exact) / exact).abs() < 2e-2, "x={} got={}", x, h);
    }

    let xs = [-3.0f32, -0.5, 0.25, 1.0, 4.0];
    let mut halves: Vec<f16> = xs.iter().map(|v| f16::from_f32(*v)).collect();
    isa::active_exphp_half(&mut halves);
    for (h, x) in halves.iter().zip(xs) {
      let exact = f16::from_f32(x).to_f32().exp();
      assert!(((h.to_f32() - exact) / exact).abs() < 1e-2, "x={} got={}", x, h);
    }
  }

  #[test]
  fn test_half_lanes_stay_below_narrowed_high_precision() {
    type Pair = (fn(&mut [f16]), fn(&mut [f32]), Vec<f32>);
    let recip_xs: Vec<f32> = (0..360)
      .flat_map(|i| {
        let x = 0.004 * 1.03f32.powi(i);
        [x, -x]
      })
      .collect();
    let sweeps: [Pair; 3] = [
      (isa::active_reciphp_half, isa::active_reciphp, recip_xs),
      (isa::active_exphp_half, isa::active_exphp, crate::test_utils::linspace(-9.5, 10.5, 700)),
      (isa::active_sigmoid_half, isa::active_sigmoid, crate::test_utils::linspace(-10.5, 10.5, 700)),
    ];
    for (half_lane, wide_lane, xs) in sweeps {
      let mut halves: Vec<f16> = xs.iter().map(|v| f16::from_f32(*v)).collect();
      let mut wide: Vec<f32> = halves.iter().map(|h| h.to_f32()).collect();
      half_lane(&mut halves);
      wide_lane(&mut wide);
      for ((h, w), x) in halves.iter().zip(&wide).zip(&xs) {
        let high = f32_to_f16_rd(*w);
        assert!(h.to_f32() <= high.to_f32(), "x={} half={} high={}", x, h, high);
      }
    }
  }

  // =============================================================================
  //   WIDTH CONVERSION
  // =============================================================================

  #[test]
  fn test_half_widen_is_exact() {
    let src: Vec<f16> = (0..=0x7bffu16).step_by(97).map(f16::from_bits).collect();
    let mut wide = vec![0.0f32; src.len()];
    isa::half2float(&mut wide, &src);
    for (w, h) in wide.iter().zip(&src) {
      assert_eq!(f16::from_f32(*w), *h);
    }
  }

  #[test]
  fn test_narrow_round_to_nearest() {
    let src = [1.0f32 / 3.0, 2.0 / 3.0, 65504.0, 1.0 + 1.0 / 4096.0];
    let mut dst = [f16::ZERO; 4];
    isa::float2half_rn(&mut dst, &src);
    for (d, s) in dst.iter().zip(src) {
      assert_eq!(*d, f16::from_f32(s));
    }
  }

  #[test]
  fn test_narrow_round_down() {
    for x in [1.0f32 / 3.0, 2.0 / 3.0, -1.0 / 3.0, -2.0 / 3.0, 0.1, -0.1, 1234.567] {
      let rd = f32_to_f16_rd(x);
      assert!(rd.to_f32() <= x, "x={} rd={}", x, rd);
      let up = if rd.to_bits() & 0x8000 == 0 {
        f16::from_bits(rd.to_bits() + 1)
      } else {
        f16::from_bits(rd.to_bits() - 1)
      };
      assert!(up.to_f32() > x, "x={} rd={} is not the largest half below", x, rd);
    }

    // exactly representable values are unchanged
    for x in [0.5f32, -0.75, 2048.0, 0.0] {
      assert_eq!(f32_to_f16_rd(x).to_f32(), x);
    }
  }

  #[test]
  fn test_narrow_round_down_edges() {
    assert_eq!(f32_to_f16_rd(70000.0), f16::MAX);
    assert_eq!(f32_to_f16_rd(-65510.0), f16::NEG_INFINITY);
    assert_eq!(f32_to_f16_rd(f32::INFINITY), f16::INFINITY);
    assert_eq!(f32_to_f16_rd(-1e-10).to_bits(), 0x8001);
    assert_eq!(f32_to_f16_rd(1e-10).to_bits(), 0x0000);
    assert!(f32_to_f16_rd(f32::NAN).is_nan());

    let mut dst = [f16::ZERO; 2];
    isa::float2half_rd(&mut dst, &[1.0 / 3.0, -1.0 / 3.0]);
    assert!(dst[0].to_f32() < 1.0 / 3.0);
    assert!(dst[1].to_f32() < -1.0 / 3.0);
  }

  // =============================================================================
  //   NATIVE INTEGER CONVERSION
  // =============================================================================

  #[test]
  fn test_native_int322float_truncates() {
    let src = [5i32, -8_388_608, 16_777_217, -16_777_217, i32::MAX, 0];
    let mut dst = [0.0f32; 6];
    isa::int322float(&mut dst, &src);
    assert_eq!(dst[0], 5.0);
    assert_eq!(dst[1], -8_388_608.0);
    assert_eq!(dst[2], 16_777_216.0);
    assert_eq!(dst[3], -16_777_216.0);
    assert_eq!(dst[4], 2_147_483_520.0);
    assert_eq!(dst[5].to_bits(), 0);
  }

  #[test]
  fn test_native_float2int32_truncates() {
    let src = [5.0f32, 2.9, -2.9, -0.5, 8_388_607.0, -8_388_608.0];
    let mut dst = [0i32; 6];
    isa::float2int32_tz(&mut dst, &src);
    assert_eq!(dst, [5, 2, -2, 0, 8_388_607, -8_388_608]);
  }
}
