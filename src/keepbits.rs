/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

//! The three keep-bits selectors (§4.4), each mapping a 32-element,
//! MSB-first `BitInfo` vector to an NSB in `[1, 23]`, plus
//! [`analyze_and_get_nsb`], the slice-level entry point that ties the
//! signed-exponent transform, bit-information computation and selected
//! policy together (§4.6 step 1-3).

use crate::bitinfo::{bitinformation, BitInfo, NBITS};
use crate::enabled_features::{Policy, DEFAULT_CONFIDENCE};
use crate::signed_exponent::signed_exponent_kernel;

/// 1 sign bit + 8 exponent bits precede the 23 mantissa bits.
const NON_MANTISSA_BITS: usize = 9;
const MIN_NSB: u8 = 1;
const MAX_NSB: u8 = 23;

fn clamp_nsb(keep_mantissa_bits: i32) -> u8 {
    keep_mantissa_bits.clamp(MIN_NSB as i32, MAX_NSB as i32) as u8
}

/// first index (MSB-first) at which `cdf[i] > inflevel`, or `None` if the
/// CDF never strictly crosses the threshold.
fn first_cdf_crossing(cumulative: &BitInfo, total: f64, inflevel: f64) -> Option<usize> {
    if total <= 0.0 {
        return None;
    }
    for i in 0..NBITS {
        if cumulative[i] / total > inflevel {
            return Some(i);
        }
    }
    None
}

fn cumulative_sum(values: &BitInfo) -> BitInfo {
    let mut out = [0.0; NBITS];
    out[0] = values[0];
    for i in 1..NBITS {
        out[i] = out[i - 1] + values[i];
    }
    out
}

/// Default selector: floors out anything below 1.5x the peak MI among the
/// four least-significant mantissa bits (indices `[28, 32)` of the
/// MSB-first vector), then crosses the CDF at `inflevel`.
pub fn get_keepbits(bit_info: &BitInfo, inflevel: f64) -> u8 {
    let max_last_four = bit_info[NBITS - 4..NBITS]
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max)
        * 1.5;

    let mut cleaned: BitInfo = [0.0; NBITS];
    for i in 0..NBITS {
        if bit_info[i] > max_last_four {
            cleaned[i] = bit_info[i];
        }
    }

    let cumulative = cumulative_sum(&cleaned);
    let total = cumulative[NBITS - 1];

    let keep_mantissa_bits = match first_cdf_crossing(&cumulative, total, inflevel) {
        Some(i) => (i as i32 + 1) - NON_MANTISSA_BITS as i32,
        None => MAX_NSB as i32,
    };

    clamp_nsb(keep_mantissa_bits)
}

/// Monotonic selector: tracks a running minimum of MI from index 9 onward
/// and zeroes everything past the point where MI has exceeded 1.5x that
/// running minimum more than twice.
pub fn get_keepbits_monotonic(bit_info: &BitInfo, inflevel: f64) -> u8 {
    let mut cleaned: BitInfo = [0.0; NBITS];
    for i in 0..NON_MANTISSA_BITS {
        cleaned[i] = bit_info[i];
    }

    let mut current_min = bit_info[NON_MANTISSA_BITS];
    let mut flag = 0u32;
    for i in NON_MANTISSA_BITS..NBITS {
        current_min = current_min.min(bit_info[i]);
        if bit_info[i] > current_min * 1.5 {
            flag += 1;
        }
        cleaned[i] = if flag > 2 { 0.0 } else { bit_info[i] };
    }

    let cumulative = cumulative_sum(&cleaned);
    let total = cumulative[NBITS - 1];

    let keep_mantissa_bits = match first_cdf_crossing(&cumulative, total, inflevel) {
        Some(i) => (i as i32 + 1) - NON_MANTISSA_BITS as i32,
        None => MAX_NSB as i32,
    };

    clamp_nsb(keep_mantissa_bits)
}

/// Gradient selector: no noise filter, just a stopping rule on the CDF's
/// first difference. Preserves the source's off-by-one: the scan stops at
/// index `NBITS - 2` (i.e. it never examines the very last gradient slot),
/// which the spec's Open Questions flag as possibly unintentional but
/// instructs to keep as-is.
pub fn get_keepbits_gradient(bit_info: &BitInfo, threshold: f64, tolerance: f64) -> u8 {
    let cumulative = cumulative_sum(bit_info);
    let total = cumulative[NBITS - 1];

    if total <= 0.0 {
        return MAX_NSB;
    }

    let cdf: BitInfo = {
        let mut out = [0.0; NBITS];
        for i in 0..NBITS {
            out[i] = cumulative[i] / total;
        }
        out
    };

    // gradient[i] = cdf[i+1] - cdf[i], for i in [0, NBITS - 1)
    let mut gradient = [0.0; NBITS - 1];
    for i in 0..NBITS - 1 {
        gradient[i] = cdf[i + 1] - cdf[i];
    }

    let sign_exp_sum: f64 = bit_info[..NON_MANTISSA_BITS].iter().sum();
    let mut running_sum = sign_exp_sum;

    let mut infbits = NBITS - 1;
    let mut found = false;
    // deliberately `gradient.len() - 1`, not `gradient.len()`: preserved
    // from the source, which never inspects the final gradient slot.
    for i in NON_MANTISSA_BITS..gradient.len() - 1 {
        running_sum += bit_info[i];
        if gradient[i] < tolerance && running_sum >= threshold * total {
            infbits = i;
            found = true;
            break;
        }
    }

    if !found {
        infbits = NBITS - 1;
    }

    let keep_mantissa_bits = (infbits as i32 + 1) - NON_MANTISSA_BITS as i32;
    clamp_nsb(keep_mantissa_bits)
}

/// Applies the signed-exponent transform and computes the bit-information
/// vector for a slice, then dispatches to the requested policy. Returns
/// NSB=1 for slices shorter than 2 elements (§4.6). Uses the fixed
/// `DEFAULT_CONFIDENCE` for the significance filter; callers that need to
/// thread a caller-supplied confidence (§6 `EnabledFeatures::confidence`)
/// use [`analyze_and_get_nsb_with_confidence`].
pub fn analyze_and_get_nsb(slice: &[f32], inflevel: f64, policy: Policy) -> u8 {
    analyze_and_get_nsb_with_confidence(slice, inflevel, policy, DEFAULT_CONFIDENCE)
}

/// As [`analyze_and_get_nsb`], but with the free-entropy significance
/// filter's confidence threaded in explicitly rather than fixed at
/// `DEFAULT_CONFIDENCE`; this is what the driver calls with
/// `EnabledFeatures::confidence` (§6).
pub fn analyze_and_get_nsb_with_confidence(
    slice: &[f32],
    inflevel: f64,
    policy: Policy,
    confidence: f64,
) -> u8 {
    if slice.len() < 2 {
        return MIN_NSB;
    }

    let words: &[u32] = bytemuck::cast_slice(slice);
    let transformed: Vec<u32> = words.iter().map(|&u| signed_exponent_kernel(u)).collect();

    let bit_info = bitinformation(&transformed, confidence);

    match policy {
        Policy::Default => get_keepbits(&bit_info, inflevel),
        Policy::Monotonic => get_keepbits_monotonic(&bit_info, inflevel),
        Policy::Gradient {
            threshold,
            tolerance,
        } => get_keepbits_gradient(&bit_info, threshold, tolerance),
    }
}
