/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

//! `bitround_util`: a minimal command-line front end exercising the
//! core over a raw, flat, little-endian binary32 buffer (`.f32` file).
//! Actual NetCDF/HDF5 container I/O is out of scope (§1) and left to a
//! host that wraps this crate; this binary exists to demonstrate the
//! core API end-to-end without that dependency.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::process::ExitCode as ProcessExitCode;

use anyhow::{bail, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{info, LevelFilter};

use bitround::enabled_features::{EnabledFeatures, Policy};
use bitround::field::Field;
use bitround::metrics::RunTally;
use bitround::{round_field, DispatchOutcome};

const VERSION: &str = git_version::git_version!(fallback = "unknown");

struct Args {
    input: String,
    output: String,
    inflevel: f64,
    policy: Policy,
    fill_value: Option<f32>,
    shape: Vec<usize>,
    verbose: bool,
    parallel: bool,
}

fn print_usage() {
    eprintln!("bitround_util {VERSION}");
    eprintln!();
    eprintln!("Usage: bitround_util <input.f32> <output.f32> --shape=D1,D2,... [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --inflevel=F              information level threshold, 0.0-1.0 (default 0.9999)");
    eprintln!("  --policy=NAME             default|monotonic|gradient (default: default)");
    eprintln!("  --gradient-threshold=F    threshold for the gradient policy (default 0.9999)");
    eprintln!("  --gradient-tolerance=F    tolerance for the gradient policy (default 0.001)");
    eprintln!("  --fill-value=F            sentinel value that disables rounding if present");
    eprintln!("  --shape=D1,D2,...         row-major dimensions; required");
    eprintln!("  --parallel                process independent slices across a rayon_core pool");
    eprintln!("                            (requires this binary to be built with --features use_rayon)");
    eprintln!("  -v, --verbose             raise the log level to debug");
    eprintln!("  -h, --help                print this message");
}

fn parse_args() -> Result<Args> {
    parse_args_from(std::env::args().skip(1))
}

/// As [`parse_args`], but reads from an injected argument source rather
/// than `std::env::args()` so the CLI's validation can be exercised from
/// a `#[cfg(test)]` module without a real process invocation.
fn parse_args_from(args: impl Iterator<Item = String>) -> Result<Args> {
    let mut pargs = pico_args::Arguments::from_vec(args.map(Into::into).collect());

    if pargs.contains(["-h", "--help"]) {
        print_usage();
        std::process::exit(0);
    }

    let verbose = pargs.contains(["-v", "--verbose"]);
    let parallel = pargs.contains("--parallel");
    let inflevel: f64 = pargs
        .opt_value_from_str("--inflevel")?
        .unwrap_or(0.9999);
    let gradient_threshold: f64 = pargs
        .opt_value_from_str("--gradient-threshold")?
        .unwrap_or(0.9999);
    let gradient_tolerance: f64 = pargs
        .opt_value_from_str("--gradient-tolerance")?
        .unwrap_or(0.001);
    let fill_value: Option<f32> = pargs.opt_value_from_str("--fill-value")?;
    let policy_name: String = pargs
        .opt_value_from_str("--policy")?
        .unwrap_or_else(|| "default".to_string());
    let shape_str: Option<String> = pargs.opt_value_from_str("--shape")?;

    let free = pargs.finish();
    if free.len() != 2 {
        print_usage();
        bail!("expected exactly 2 positional arguments (input, output), got {}", free.len());
    }
    let input = free[0].to_string_lossy().into_owned();
    let output = free[1].to_string_lossy().into_owned();

    if !(0.0..=1.0).contains(&inflevel) {
        bail!("--inflevel must be between 0.0 and 1.0, got {inflevel}");
    }

    let policy = match policy_name.as_str() {
        "default" => Policy::Default,
        "monotonic" => Policy::Monotonic,
        "gradient" => Policy::Gradient {
            threshold: gradient_threshold,
            tolerance: gradient_tolerance,
        },
        other => bail!("unknown --policy '{other}', expected default|monotonic|gradient"),
    };

    let shape_str = shape_str.context("--shape is required")?;
    let shape: Vec<usize> = shape_str
        .split(',')
        .map(|s| s.trim().parse::<usize>().context("invalid --shape entry"))
        .collect::<Result<_>>()?;
    if shape.is_empty() {
        bail!("--shape must name at least one dimension");
    }

    Ok(Args {
        input,
        output,
        inflevel,
        policy,
        fill_value,
        shape,
        verbose,
        parallel,
    })
}

fn read_f32_buffer(path: &str) -> Result<Vec<f32>> {
    let file = File::open(path).with_context(|| format!("cannot open input file '{path}'"))?;
    let mut reader = BufReader::new(file);

    let mut buf = Vec::new();
    reader
        .read_to_end(&mut buf)
        .with_context(|| format!("failed reading '{path}'"))?;

    if buf.len() % 4 != 0 {
        bail!("'{path}' is not a whole number of 4-byte f32 elements ({} bytes)", buf.len());
    }

    let mut cursor = &buf[..];
    let mut data = Vec::with_capacity(buf.len() / 4);
    while !cursor.is_empty() {
        data.push(
            cursor
                .read_f32::<LittleEndian>()
                .with_context(|| format!("failed decoding f32 from '{path}'"))?,
        );
    }
    Ok(data)
}

fn write_f32_buffer(path: &str, data: &[f32]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("cannot create output file '{path}'"))?;
    let mut writer = BufWriter::new(file);
    for &x in data {
        writer
            .write_f32::<LittleEndian>(x)
            .with_context(|| format!("failed writing '{path}'"))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed flushing '{path}'"))?;
    Ok(())
}

fn run() -> Result<()> {
    let args = parse_args()?;

    simple_logger::SimpleLogger::new()
        .with_level(if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init()
        .context("failed to initialize logger")?;

    info!(
        "Processing: {} -> {} (inflevel={:.6})",
        args.input, args.output, args.inflevel
    );

    let data = read_f32_buffer(&args.input)?;
    let mut field = Field::new("data", args.shape, data)?;
    if let Some(f) = args.fill_value {
        field = field.with_fill_value(f);
    }

    let features = EnabledFeatures::new(args.policy, args.inflevel).with_parallel_slices(args.parallel);
    #[cfg(not(feature = "use_rayon"))]
    if args.parallel {
        bail!("--parallel requires this binary to be built with --features use_rayon");
    }

    let mut tally = RunTally::new();
    let outcome = round_field(&mut field, &features)?;
    tally.record_variable(matches!(outcome, DispatchOutcome::Rounded(_)));

    write_f32_buffer(&args.output, &field.data)?;

    info!(
        "Bitrounding complete: {} processed, {} rounded",
        tally.processed_vars, tally.rounded_vars
    );

    Ok(())
}

fn main() -> ProcessExitCode {
    match run() {
        Ok(()) => ProcessExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ProcessExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn args(strs: &[&str]) -> impl Iterator<Item = String> {
        strs.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn rejects_out_of_range_inflevel() {
        let err = parse_args_from(args(&["in.f32", "out.f32", "--inflevel=1.5", "--shape=4"]))
            .unwrap_err();
        assert!(
            err.to_string().contains("--inflevel"),
            "unexpected error message: {err}"
        );
    }

    #[test]
    fn rejects_unknown_policy() {
        let err = parse_args_from(args(&["in.f32", "out.f32", "--policy=bogus", "--shape=4"]))
            .unwrap_err();
        assert!(
            err.to_string().contains("unknown --policy"),
            "unexpected error message: {err}"
        );
    }

    #[test]
    fn accepts_valid_arguments() {
        let parsed = parse_args_from(args(&[
            "in.f32",
            "out.f32",
            "--inflevel=0.95",
            "--policy=monotonic",
            "--shape=2,3",
        ]))
        .unwrap();
        assert_eq!(parsed.input, "in.f32");
        assert_eq!(parsed.output, "out.f32");
        assert_eq!(parsed.inflevel, 0.95);
        assert_eq!(parsed.policy, Policy::Monotonic);
        assert_eq!(parsed.shape, vec![2, 3]);
    }

    #[test]
    fn requires_exactly_two_positional_arguments() {
        let err = parse_args_from(args(&["only_one.f32", "--shape=4"])).unwrap_err();
        assert!(err.to_string().contains("positional"), "unexpected error message: {err}");
    }
}
