/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

use std::fmt::Display;

/// Tags every fatal condition the core can produce. Skip-reasons and analytic
/// degeneracies (§7.1/§7.2) are not represented here since they are absorbed
/// locally and only logged; only invariant violations and malformed input
/// reach this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// NSB fell outside [1, 23] after clamping; should be unreachable if the
    /// selectors are correct.
    InvariantViolation,
    /// buffer length is not a multiple of the declared trailing 2-D extent.
    MalformedBuffer,
    /// generic assertion failure surfaced as a typed error instead of a panic.
    AssertionFailed,
}

impl Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExitCode::InvariantViolation => "invariant violation",
            ExitCode::MalformedBuffer => "malformed buffer",
            ExitCode::AssertionFailed => "assertion failed",
        };
        write!(f, "{}", s)
    }
}

/// Error type for the bitround core. Every variant carries an [`ExitCode`]
/// plus a human-readable detail string, mirroring the two-part
/// (kind, message) errors the teacher reports via `err_exit_code`.
#[derive(Debug)]
pub struct BitroundError {
    pub code: ExitCode,
    pub message: String,
}

impl BitroundError {
    pub fn new(code: ExitCode, message: impl Into<String>) -> Self {
        BitroundError {
            code,
            message: message.into(),
        }
    }
}

impl Display for BitroundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for BitroundError {}

pub type Result<T> = std::result::Result<T, BitroundError>;

/// Constructs the `Err` branch directly, the way the teacher's
/// `err_exit_code` is used at every fallible call site instead of writing
/// `Err(...)` by hand.
pub fn err_exit_code<T>(code: ExitCode, message: &str) -> Result<T> {
    Err(BitroundError::new(code, message))
}

/// Expands to a `"file:line"` string, used as a breadcrumb with
/// `anyhow::Context` at the CLI boundary so failures can be traced back to
/// the call site without a backtrace build.
#[macro_export]
macro_rules! here {
    () => {
        concat!(file!(), ":", line!())
    };
}
