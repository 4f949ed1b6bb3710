/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

//! Statistical primitives underlying the significance filter (§4.1):
//! Acklam's inverse normal CDF, binary entropy, the binomial confidence
//! bound, and the free-entropy threshold derived from them.

// Acklam's rational approximation coefficients, central region.
const A: [f64; 6] = [
    -3.969683028665376e+01,
    2.209460984245205e+02,
    -2.759285104469687e+02,
    1.383577518672690e+02,
    -3.066479806614716e+01,
    2.506628277459239e+00,
];
const B: [f64; 5] = [
    -5.447609879822406e+01,
    1.615858368580409e+02,
    -1.556989798598866e+02,
    6.680131188771972e+01,
    -1.328068155288572e+01,
];
// tail regions
const C: [f64; 6] = [
    -7.784894002430293e-03,
    -3.223964580411365e-01,
    -2.400758277161838e+00,
    -2.549732539343734e+00,
    4.374664141464968e+00,
    2.938163982698783e+00,
];
const D: [f64; 4] = [
    7.784695709041462e-03,
    3.224671290700398e-01,
    2.445134137142996e+00,
    3.754408661907416e+00,
];

const P_LOW: f64 = 0.02425;
const P_HIGH: f64 = 1.0 - P_LOW;

/// Inverse of the standard normal CDF (the quantile function), via Acklam's
/// rational approximation. Accurate to a maximum relative error of about
/// 1.15e-9 over (0, 1). Returns `-inf`/`+inf` at the domain boundary rather
/// than panicking, since callers pass probabilities derived from sample
/// sizes that can legitimately sit at the edge.
pub fn normal_inv_acklam(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        return (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0);
    }

    if p > P_HIGH {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        return -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0);
    }

    let q = p - 0.5;
    let r = q * q;
    (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
        / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
}

/// Binary entropy of (p1, p2) in bits, with the convention `0 * log 0 = 0`.
/// `p1` and `p2` need not sum to exactly 1.0 (callers pass `(p, 1-p)`).
pub fn entropy2(p1: f64, p2: f64) -> f64 {
    let mut result = 0.0;
    if p1 > 0.0 {
        result -= p1 * p1.ln();
    }
    if p2 > 0.0 {
        result -= p2 * p2.ln();
    }
    result / std::f64::consts::LN_2
}

/// Upper confidence bound on the probability of a biased-coin bit match,
/// for a sample of size `n` at confidence `c` (§4.1).
pub fn binom_confidence(n: f64, c: f64) -> f64 {
    let v = 1.0 - (1.0 - c) * 0.5;
    let p = 0.5 + normal_inv_acklam(v) / (2.0 * n.sqrt());
    if p > 1.0 {
        1.0
    } else {
        p
    }
}

/// Free-entropy threshold H_free(n, c): the per-bit mutual information
/// below which measurement noise alone could plausibly explain the
/// observed bit correlation at confidence `c` over `n` samples.
pub fn binom_free_entropy(n: f64, c: f64) -> f64 {
    let p = binom_confidence(n, c);
    1.0 - entropy2(p, 1.0 - p)
}

#[cfg(test)]
mod test {
    use super::*;

    // reference values from a standard normal quantile table
    #[test]
    fn acklam_matches_reference_quantiles() {
        assert!((normal_inv_acklam(0.5) - 0.0).abs() <= 1e-9);
        assert!((normal_inv_acklam(0.975) - 1.959963984540054).abs() <= 1e-9);
        assert!((normal_inv_acklam(0.025) - (-1.959963984540054)).abs() <= 1e-9);
    }

    #[test]
    fn acklam_domain_boundary() {
        assert_eq!(normal_inv_acklam(0.0), f64::NEG_INFINITY);
        assert_eq!(normal_inv_acklam(-1.0), f64::NEG_INFINITY);
        assert_eq!(normal_inv_acklam(1.0), f64::INFINITY);
        assert_eq!(normal_inv_acklam(2.0), f64::INFINITY);
    }

    #[test]
    fn entropy_is_zero_at_extremes_and_max_at_half() {
        assert_eq!(entropy2(0.0, 1.0), 0.0);
        assert_eq!(entropy2(1.0, 0.0), 0.0);
        let h = entropy2(0.5, 0.5);
        assert!((h - 1.0).abs() < 1e-12);
    }

    #[test]
    fn h_free_monotone_in_confidence_and_n() {
        let n = 1000.0;
        let low = binom_free_entropy(n, 0.90);
        let mid = binom_free_entropy(n, 0.99);
        let high = binom_free_entropy(n, 0.9999);
        assert!(low <= mid + 1e-12);
        assert!(mid <= high + 1e-12);

        let c = 0.99;
        let small_n = binom_free_entropy(10.0, c);
        let large_n = binom_free_entropy(100000.0, c);
        assert!(large_n <= small_n + 1e-12);
    }
}
