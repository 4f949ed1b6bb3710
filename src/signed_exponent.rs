/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

//! The signed-exponent transform (§4.2): replaces a binary32's biased
//! 8-bit exponent with a sign-magnitude 8-bit exponent, localising the
//! bit flips a small exponent change produces around zero so that
//! inter-sample mutual information concentrates on genuinely informative
//! bits. Reversible, and never persisted outside the analysis copy.

const SIGN_SIGNIFICAND_MASK: u32 = 0x807F_FFFF;
const EXPONENT_MASK: u32 = 0x7F80_0000;
const EXPONENT_SIGN_BIT: u32 = 0x4000_0000;
const SIGNIFICAND_BITS: u32 = 23;
const EXPONENT_BIAS: i32 = 127;

/// Applies the signed-exponent transform to a single 32-bit word.
#[inline(always)]
pub fn signed_exponent_kernel(u: u32) -> u32 {
    let sf = u & SIGN_SIGNIFICAND_MASK;
    let e = ((u & EXPONENT_MASK) >> SIGNIFICAND_BITS) as i32 - EXPONENT_BIAS;
    let e_abs = e.unsigned_abs();
    let e_sign = if e < 0 { EXPONENT_SIGN_BIT } else { 0 };

    sf | e_sign | (e_abs << SIGNIFICAND_BITS)
}

/// Inverts [`signed_exponent_kernel`]; used only by the round-trip test
/// since the driver never needs to undo the transform on live data (the
/// transform is applied to a throwaway analysis copy, §4.6).
///
/// `eabs` ranges over [0, 128] (128 only for the biased-255 inf/nan
/// exponent), which needs a full 8 bits, the same width as the exponent
/// sign flag's bit position. The two never actually collide: `eabs == 128`
/// only arises from `e == 128`, which is never negative, so the sign flag
/// is always 0 in that case. Bit 30 of the packed word is therefore 1 in
/// exactly two disjoint situations — `esign == 1` (with `eabs` in the low
/// 7 bits) or `eabs == 128` (with the low 7 bits all zero) — and those are
/// distinguished by checking whether the low 7 bits are zero.
#[inline(always)]
pub fn signed_exponent_inverse_kernel(u: u32) -> u32 {
    let sf = u & SIGN_SIGNIFICAND_MASK;
    let low7 = (u >> SIGNIFICAND_BITS) & 0x7F;
    let sign_bit_set = u & EXPONENT_SIGN_BIT != 0;

    let e = if sign_bit_set && low7 == 0 {
        128
    } else if sign_bit_set {
        -(low7 as i32)
    } else {
        low7 as i32
    };

    let biased = ((e + EXPONENT_BIAS) as u32) << SIGNIFICAND_BITS;

    sf | (biased & EXPONENT_MASK)
}

/// Applies the transform over a whole slice, producing a fresh working
/// copy (the original `data` is left untouched). Reinterprets the input
/// as `&[u32]` in bulk via `bytemuck` rather than calling `f32::to_bits`
/// element by element.
pub fn signed_exponent(data: &[f32]) -> Vec<f32> {
    let words: &[u32] = bytemuck::cast_slice(data);
    words
        .iter()
        .map(|&u| f32::from_bits(signed_exponent_kernel(u)))
        .collect()
}
