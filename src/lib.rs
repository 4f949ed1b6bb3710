/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

//! A lossy compression preprocessor for binary32 scientific array data.
//!
//! Computes, per array (or per 2-D slice of a higher-rank array), the
//! number of significant mantissa bits (NSB) that preserve a configurable
//! fraction of the bitwise mutual-information content between neighboring
//! samples, then rewrites the array in place by clearing the discarded
//! low bits. The result is still a valid IEEE-754 binary32 field, but
//! compresses substantially better under a downstream lossless codec.
//!
//! Container I/O (NetCDF/HDF5), compression-level/chunking knobs, and
//! diagnostic reporting live outside this crate; see [`field::Field`] for
//! the minimal shape this crate needs from a caller's buffer.

pub mod bitinfo;
pub mod bitround;
pub mod bitround_error;
pub mod driver;
pub mod enabled_features;
pub mod field;
pub mod keepbits;
pub mod metrics;
pub mod signed_exponent;
pub mod stats;

pub use bitround::{bitround_in_place, bitround_value};
pub use bitround_error::{BitroundError, ExitCode};
pub use driver::{round_field, DispatchOutcome, SkipReason};
pub use enabled_features::{EnabledFeatures, Policy};
pub use field::Field;
pub use keepbits::analyze_and_get_nsb;
pub use metrics::{Metrics, RunTally};
