/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

//! The slice driver (§4.6) and the variable dispatcher (§4.7), wired
//! together behind [`round_field`], the single entry point a host calls
//! per variable.

use log::info;

use crate::bitround::bitround_in_place;
use crate::bitround_error::Result;
use crate::enabled_features::EnabledFeatures;
use crate::field::{slices_mut, Field};
use crate::keepbits::analyze_and_get_nsb_with_confidence;
use crate::metrics::Metrics;

/// Outcome of dispatching one Field: either it was skipped for one of the
/// §4.7 reasons (never an error), or it went through the slice driver and
/// produced per-Field metrics.
#[derive(Debug)]
pub enum DispatchOutcome {
    Skipped(SkipReason),
    Rounded(Metrics),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotBinary32,
    Coordinate,
    ContainsSentinel,
}

impl SkipReason {
    pub fn message(&self) -> &'static str {
        match self {
            SkipReason::NotBinary32 => "not float32",
            SkipReason::Coordinate => "coordinate variable",
            SkipReason::ContainsSentinel => "contains missing values or NaNs",
        }
    }
}

/// Runs analysis and rounding on every 2-D slice of `field`, folding
/// per-slice NSB into a single `Metrics` (§4.6). The signed-exponent
/// transform is applied only to a throwaway analysis copy of each slice;
/// `field`'s own buffer is rounded in place.
///
/// Dispatches to the `use_rayon`-gated parallel path when the caller has
/// asked for it via `EnabledFeatures::parallel_slices`; slices are
/// independent (§5), so this is a plain fan-out, not a pipeline.
fn round_field_unchecked(field: &mut Field, features: &EnabledFeatures) -> Result<Metrics> {
    let fill_value = field.fill_value.unwrap_or(-999.0);

    #[cfg(feature = "use_rayon")]
    if features.parallel_slices {
        return round_slices_parallel(slices_mut(field)?, features, fill_value);
    }

    round_slices_serial(slices_mut(field)?, features, fill_value)
}

fn round_one_slice(data: &mut [f32], features: &EnabledFeatures, fill_value: f32, metrics: &mut Metrics) {
    let nsb = analyze_and_get_nsb_with_confidence(
        data,
        features.inflevel,
        features.policy,
        features.confidence,
    );

    if (1..=23).contains(&nsb) {
        bitround_in_place(data, nsb, fill_value);
        metrics.record_rounded(nsb);
    } else {
        // unreachable if the selectors are correct; falls through as a
        // no-op rather than aborting the whole Field (§7, "Analytic
        // degeneracy" / "Invariant violation" distinction: a selector
        // bug here is a programming error, but it must not corrupt data).
        metrics.record_skipped();
    }
}

fn round_slices_serial(
    slices: Vec<crate::field::SliceMut<'_>>,
    features: &EnabledFeatures,
    fill_value: f32,
) -> Result<Metrics> {
    let mut metrics = Metrics::new();
    for slice in slices {
        round_one_slice(slice.data, features, fill_value, &mut metrics);
    }
    Ok(metrics)
}

/// Dispatches each slice onto a `rayon_core` scope and merges the per-slice
/// `Metrics` under a mutex; the merge is the associative/commutative
/// reduction `Metrics::merge` already provides for exactly this purpose.
#[cfg(feature = "use_rayon")]
fn round_slices_parallel(
    slices: Vec<crate::field::SliceMut<'_>>,
    features: &EnabledFeatures,
    fill_value: f32,
) -> Result<Metrics> {
    use std::sync::Mutex;

    let combined = Mutex::new(Metrics::new());
    rayon_core::scope(|scope| {
        for slice in slices {
            let combined = &combined;
            scope.spawn(move |_| {
                let mut local = Metrics::new();
                round_one_slice(slice.data, features, fill_value, &mut local);
                combined.lock().unwrap().merge(&local);
            });
        }
    });

    Ok(combined.into_inner().unwrap())
}

/// Gates and processes a single Field per the §4.7 dispatcher rules:
/// skip non-float32 (not representable in this crate's `Field`, so this
/// gate is the caller's responsibility before constructing one), skip
/// coordinate Fields, skip Fields containing NaN or the fill-value
/// sentinel, otherwise run the slice driver.
pub fn round_field(field: &mut Field, features: &EnabledFeatures) -> Result<DispatchOutcome> {
    if field.is_coordinate {
        info!("Variable {}: skipping ({})", field.name, SkipReason::Coordinate.message());
        return Ok(DispatchOutcome::Skipped(SkipReason::Coordinate));
    }

    if field.contains_nan() || field.contains_fill_value() {
        info!(
            "Variable {}: skipping ({})",
            field.name,
            SkipReason::ContainsSentinel.message()
        );
        return Ok(DispatchOutcome::Skipped(SkipReason::ContainsSentinel));
    }

    let metrics = round_field_unchecked(field, features)?;
    info!(
        "Variable {}: NSB min={} max={} ({} slices rounded, {} skipped)",
        field.name, metrics.min_nsb, metrics.max_nsb, metrics.slices_rounded, metrics.slices_skipped
    );
    Ok(DispatchOutcome::Rounded(metrics))
}
