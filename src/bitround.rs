/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

//! The bit-rounding kernel (§4.5): clears the low-order mantissa bits
//! beyond `nsb` significant bits, with a half-bit additive bias for
//! round-to-nearest. Fill-value and NaN sentinels are left untouched.

use wide::u32x8;

const SIGNIFICAND_BITS: u32 = 23;
const LANES: usize = 8;

/// precomputed (zero_mask, half_bit_mask) pair for a given NSB (§3 `MaskPair`).
#[inline(always)]
fn masks_for_nsb(nsb: u8) -> (u32, u32) {
    debug_assert!((1..=23).contains(&nsb), "nsb out of range: {nsb}");

    let zero_bits = SIGNIFICAND_BITS - nsb as u32;
    // shifting a u32 by 32 is undefined in Rust; zero_bits == 0 only when
    // nsb == 23, which is the documented no-op case.
    let zero_mask = if zero_bits == 0 {
        0xFFFF_FFFFu32
    } else {
        0xFFFF_FFFFu32 << zero_bits
    };
    let half_bit_mask = (!zero_mask) & (zero_mask >> 1);

    (zero_mask, half_bit_mask)
}

/// Rounds a single non-sentinel value to `nsb` significant mantissa bits.
#[inline(always)]
pub fn bitround_value(x: f32, nsb: u8) -> f32 {
    let (zero_mask, half_bit_mask) = masks_for_nsb(nsb);
    let u = x.to_bits();
    let rounded = u.wrapping_add(half_bit_mask) & zero_mask;
    f32::from_bits(rounded)
}

/// Rounds every element of `slice` to `nsb` significant mantissa bits in
/// place, skipping elements that are bitwise-equal to `fill_value` or are
/// NaN (§4.5). `nsb` must be in `[1, 23]`.
///
/// This is the hottest loop in the crate (§9, "just-in-time-compiled
/// numerical kernels" / "avoid dynamic dispatch"), so full 8-lane chunks are
/// rounded with `wide::u32x8` — the add-and-mask is branch-free and safe to
/// run on every lane; the NaN/sentinel check stays scalar and its result is
/// only used to decide which lanes get written back.
pub fn bitround_in_place(slice: &mut [f32], nsb: u8, fill_value: f32) {
    debug_assert!((1..=23).contains(&nsb), "nsb out of range: {nsb}");

    let (zero_mask, half_bit_mask) = masks_for_nsb(nsb);
    let fill_bits = fill_value.to_bits();
    let zero_mask_v = u32x8::splat(zero_mask);
    let half_bit_v = u32x8::splat(half_bit_mask);

    let mut chunks = slice.chunks_exact_mut(LANES);
    for chunk in &mut chunks {
        let mut bits = [0u32; LANES];
        let mut skip = [false; LANES];
        for lane in 0..LANES {
            bits[lane] = chunk[lane].to_bits();
            skip[lane] = chunk[lane].is_nan() || bits[lane] == fill_bits;
        }

        let rounded = (u32x8::new(bits) + half_bit_v) & zero_mask_v;
        let rounded = rounded.to_array();

        for lane in 0..LANES {
            if !skip[lane] {
                chunk[lane] = f32::from_bits(rounded[lane]);
            }
        }
    }

    for x in chunks.into_remainder() {
        if x.is_nan() || x.to_bits() == fill_bits {
            continue;
        }
        let u = x.to_bits();
        let rounded = u.wrapping_add(half_bit_mask) & zero_mask;
        *x = f32::from_bits(rounded);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn simd_fast_path_matches_scalar_kernel_across_chunk_boundary() {
        // 19 elements: two full 8-lane SIMD chunks plus a 3-element scalar
        // remainder, with NaN/fill-value sentinels straddling both.
        let fill_value = -999.0f32;
        let mut data: Vec<f32> = (0..19).map(|i| (i as f32) * 0.1 - 1.0).collect();
        data[2] = f32::NAN;
        data[8] = fill_value;
        data[17] = f32::NAN;

        let expected: Vec<f32> = data
            .iter()
            .map(|&x| {
                if x.is_nan() || x.to_bits() == fill_value.to_bits() {
                    x
                } else {
                    bitround_value(x, 6)
                }
            })
            .collect();

        bitround_in_place(&mut data, 6, fill_value);

        for (got, want) in data.iter().zip(expected.iter()) {
            if want.is_nan() {
                assert!(got.is_nan());
            } else {
                assert_eq!(got.to_bits(), want.to_bits());
            }
        }
    }

    #[test]
    fn no_op_at_full_precision() {
        let mut data = vec![1.234_567_9f32, -0.000_123_4, 3.14159];
        let original = data.clone();
        bitround_in_place(&mut data, 23, -999.0);
        assert_eq!(data, original);
    }

    #[test]
    fn sentinel_and_nan_are_preserved() {
        let mut data = vec![-999.0f32, f32::NAN, 1.0, 2.0];
        bitround_in_place(&mut data, 4, -999.0);
        assert_eq!(data[0], -999.0);
        assert!(data[1].is_nan());
        assert_ne!(data[2].to_bits(), 1.0f32.to_bits().wrapping_add(0)); // just sanity: still finite
        assert!(data[2].is_finite());
        assert!(data[3].is_finite());
    }

    #[test]
    fn idempotent_for_all_nsb_on_random_finite_values() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x0DDB_A11);
        for nsb in 1u8..=23 {
            for _ in 0..2_000 {
                let u: u32 = rng.gen();
                let x = f32::from_bits(u);
                if !x.is_finite() {
                    continue;
                }
                let once = bitround_value(x, nsb);
                if !once.is_finite() {
                    // carry into +/-inf is legal IEEE behavior (§9); idempotence
                    // of rounding an infinity is not meaningful to assert bit-for-bit
                    // beyond "still produces the same infinity" under further rounding,
                    // which the sentinel/NaN skip in bitround_in_place already covers.
                    continue;
                }
                let twice = bitround_value(once, nsb);
                assert_eq!(
                    once.to_bits(),
                    twice.to_bits(),
                    "not idempotent at nsb={nsb}, x={x}"
                );
            }
        }
    }

    #[test]
    fn magnitude_bound_holds_for_finite_non_sentinel_values() {
        let mut rng = ChaCha8Rng::seed_from_u64(0xFACE_FEED);
        for nsb in 1u8..=23 {
            for _ in 0..2_000 {
                let u: u32 = rng.gen();
                let x = f32::from_bits(u);
                if !x.is_finite() || x == 0.0 {
                    continue;
                }
                let rounded = bitround_value(x, nsb);
                if !rounded.is_finite() {
                    continue; // carry to infinity is the documented exception
                }
                let e = x.abs().log2().floor() as i32;
                let bound = 2f64.powi(e - nsb as i32);
                let diff = (rounded as f64 - x as f64).abs();
                assert!(
                    diff <= bound * 1.0001, // small slack for log2/floor edge rounding
                    "bound violated: x={x}, nsb={nsb}, diff={diff}, bound={bound}"
                );
            }
        }
    }

    #[test]
    fn carry_into_infinity_is_not_specially_handled() {
        // largest finite f32, rounding up near the top should be allowed to
        // overflow into +inf when nsb is small enough that the half-bit
        // bias pushes the mantissa past its maximum value.
        let x = f32::MAX;
        let rounded = bitround_value(x, 1);
        // either still finite (if carry didn't reach the exponent) or +inf;
        // both are acceptable, the property under test is that we don't panic
        // and don't clamp it back down artificially.
        assert!(rounded.is_infinite() || rounded.is_finite());
    }
}
