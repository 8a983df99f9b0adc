//
// cycloblur - Reversible circulant blur for images
// Copyright (c) 2026 cycloblur developers
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Command-line options definitions and parsing.
//!

use crate::blur::{Method, Normalization, OffsetMode};
use crate::logging;
use strum::IntoEnumIterator;

/// Tap count of the historical full-size run (one tap per 16 columns of a 512-wide image).
pub const DEFAULT_TAP_COUNT: usize = 32;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ModeOfOperation {
    Encode,
    Decode,
    CheckKernel
}

pub mod cmdline {
    pub const HELP:          &str = "help";
    pub const MODE:          &str = "mode";
    pub const INPUT_FILE:    &str = "input";
    pub const OUTPUT_FILE:   &str = "output";
    pub const SIZE:          &str = "size";
    pub const TAP_COUNT:     &str = "taps";
    pub const METHOD:        &str = "method";
    pub const OFFSET_MODE:   &str = "offset_mode";
    pub const NORMALIZATION: &str = "normalization";
    pub const LOG_LEVEL:     &str = "log_level";
}

#[derive(Debug)]
pub struct Configuration {
    mode: ModeOfOperation,
    input_file: Option<String>,
    output_file: Option<String>,
    size: Option<u32>,
    tap_count: usize,
    method: Method,
    offset_mode: OffsetMode,
    normalization: Normalization,
    log_level: logging::Level
}

impl Configuration {
    pub fn mode(&self) -> ModeOfOperation { self.mode }
    pub fn input_file(&self) -> &Option<String> { &self.input_file }
    pub fn output_file(&self) -> &Option<String> { &self.output_file }
    pub fn size(&self) -> Option<u32> { self.size }
    pub fn tap_count(&self) -> usize { self.tap_count }
    pub fn method(&self) -> Method { self.method }
    pub fn offset_mode(&self) -> OffsetMode { self.offset_mode }
    pub fn normalization(&self) -> Normalization { self.normalization }
    pub fn log_level(&self) -> logging::Level { self.log_level }
}

impl From<ModeOfOperation> for &str {
    fn from(m: ModeOfOperation) -> &'static str {
        match m {
            ModeOfOperation::Encode      => "encode",
            ModeOfOperation::Decode      => "decode",
            ModeOfOperation::CheckKernel => "check"
        }
    }
}

impl From<Method> for &str {
    fn from(m: Method) -> &'static str {
        match m {
            Method::Direct   => "direct",
            Method::Spectral => "spectral"
        }
    }
}

impl From<OffsetMode> for &str {
    fn from(m: OffsetMode) -> &'static str {
        match m {
            OffsetMode::Relative      => "relative",
            OffsetMode::AbsoluteSweep => "sweep"
        }
    }
}

impl From<Normalization> for &str {
    fn from(n: Normalization) -> &'static str {
        match n {
            Normalization::UnitSum      => "unit-sum",
            Normalization::Unnormalized => "raw"
        }
    }
}

impl From<logging::Level> for &str {
    fn from(level: logging::Level) -> &'static str {
        match level {
            logging::Level::Quiet   => "quiet",
            logging::Level::Info    => "info",
            logging::Level::Verbose => "verbose"
        }
    }
}

/// Matches a string against the `From<T> for &str` value of each of `T`'s variants.
macro_rules! from_str_by_iter {
    ($t:ty) => {
        impl std::str::FromStr for $t {
            type Err = ();
            fn from_str(s: &str) -> Result<$t, ()> {
                for variant in <$t>::iter() {
                    if s == Into::<&str>::into(variant) {
                        return Ok(variant);
                    }
                }

                Err(())
            }
        }
    }
}

from_str_by_iter!(logging::Level);
from_str_by_iter!(Method);
from_str_by_iter!(OffsetMode);
from_str_by_iter!(Normalization);

pub fn print_help() {
    println!(
r#"Command-line options:

  --{} <mode>

    Mode of operation. Possible values:

        {:8}    blur an image with the pseudo-random circulant kernel
        {:8}    undo the blur by spectral deconvolution
        {:8}    report whether the kernel for --{}/--{} is invertible


  --{} <file>

    Input image (BMP, 8-bit or 24-bit; color is reduced to luminance).
    Required in {} and {} modes.


  --{} <file>

    Output image (8-bit BMP). Default: input name with "_encoded"/"_decoded" appended.


  --{} <value>

    Side length of the transformed square; must be a power of 2. The image is cropped
    to this size (top-left corner). Default: the largest power of 2 that fits the input.
    Required in {} mode.


  --{} <value>

    Number of averaging taps. Both sides of a blur must use the same value.
    Default: {}.


  --{} <{}|{}>

    Forward transform strategy ({} mode only). Default: {}.


  --{} <{}|{}>

    Tap application strategy: precomputed relative taps, or absolute positions
    regenerated from each swept base cell. Both produce identical samples. Default: {}.


  --{} <{}|{}>

    Tap weights: 1/taps (energy preserving) or 1. Default: {}.


  --{} <{}|{}|{}>

    Chooses the amount of messages to print during processing.

"#,
        cmdline::MODE,
        Into::<&str>::into(ModeOfOperation::Encode),
        Into::<&str>::into(ModeOfOperation::Decode),
        Into::<&str>::into(ModeOfOperation::CheckKernel), cmdline::SIZE, cmdline::TAP_COUNT,

        cmdline::INPUT_FILE,
        Into::<&str>::into(ModeOfOperation::Encode), Into::<&str>::into(ModeOfOperation::Decode),

        cmdline::OUTPUT_FILE,

        cmdline::SIZE,
        Into::<&str>::into(ModeOfOperation::CheckKernel),

        cmdline::TAP_COUNT,
        DEFAULT_TAP_COUNT,

        cmdline::METHOD,
        Into::<&str>::into(Method::Direct), Into::<&str>::into(Method::Spectral),
        Into::<&str>::into(ModeOfOperation::Encode), Into::<&str>::into(Method::Spectral),

        cmdline::OFFSET_MODE,
        Into::<&str>::into(OffsetMode::Relative), Into::<&str>::into(OffsetMode::AbsoluteSweep),
        Into::<&str>::into(OffsetMode::Relative),

        cmdline::NORMALIZATION,
        Into::<&str>::into(Normalization::UnitSum), Into::<&str>::into(Normalization::Unnormalized),
        Into::<&str>::into(Normalization::UnitSum),

        cmdline::LOG_LEVEL,
        Into::<&str>::into(logging::Level::Quiet),
        Into::<&str>::into(logging::Level::Info),
        Into::<&str>::into(logging::Level::Verbose),
    );
}

/// Returns the value of a single-valued option of type `T`.
fn get_option_value<T: std::str::FromStr>(
    option: &str,
    option_values: &std::collections::HashMap::<String, Vec<String>>
) -> Result<Option<T>, ()> {
    match option_values.get(option) {
        None => Ok(None),
        Some(vals) => if vals.is_empty() {
            eprintln!("Value missing for option {}.", option);
            Err(())
        } else if vals.len() > 1 {
            eprintln!("Too many values for option {}.", option);
            Err(())
        } else {
            match vals[0].parse::<T>() {
                Ok(value) => Ok(Some(value)),
                Err(_) => {
                    eprintln!("Invalid value for option {}: {}.", option, vals[0]);
                    Err(())
                }
            }
        }
    }
}

/// Returns Ok(None) if help was requested.
pub fn parse_command_line<I: Iterator<Item=String>>(stream: I) -> Result<Option<Configuration>, ()> {
    let allowed_options = vec![
        cmdline::HELP,
        cmdline::MODE,
        cmdline::INPUT_FILE,
        cmdline::OUTPUT_FILE,
        cmdline::SIZE,
        cmdline::TAP_COUNT,
        cmdline::METHOD,
        cmdline::OFFSET_MODE,
        cmdline::NORMALIZATION,
        cmdline::LOG_LEVEL
    ];

    // key: option name
    let mut option_values = std::collections::HashMap::<String, Vec<String>>::new();

    let mut current: Option<&mut Vec<String>> = None;

    for arg in stream.skip(1) /*skip the binary name*/ {
        if arg.starts_with("--") {
            match &arg[2..] {
                cmdline::HELP => { print_help(); return Ok(None); },
                x if !allowed_options.contains(&x) => {
                    eprintln!("Unknown command-line option: {}.", x); return Err(());
                },
                opt => current = Some(option_values.entry(opt.to_string()).or_insert(vec![])),
            }
        } else {
            if current.is_none() {
                eprintln!("Unexpected value: {}.", arg);
                return Err(());
            } else {
                (*(*current.as_mut().unwrap())).push(arg);
            }
        }
    }

    let opt_mode = option_values.get(cmdline::MODE);
    if opt_mode.is_none() || opt_mode.unwrap().is_empty() {
        eprintln!("Mode not specified."); return Err(());
    }
    let mode = match &opt_mode.unwrap()[0] {
        x if x == Into::<&str>::into(ModeOfOperation::Encode) => ModeOfOperation::Encode,
        x if x == Into::<&str>::into(ModeOfOperation::Decode) => ModeOfOperation::Decode,
        x if x == Into::<&str>::into(ModeOfOperation::CheckKernel) => ModeOfOperation::CheckKernel,
        x => {
            eprintln!("Invalid mode of operation: {}. Expected one of: {}, {}, {}.",
                x,
                Into::<&str>::into(ModeOfOperation::Encode),
                Into::<&str>::into(ModeOfOperation::Decode),
                Into::<&str>::into(ModeOfOperation::CheckKernel)
            );
            return Err(());
        }
    };

    let input_file = match option_values.get(cmdline::INPUT_FILE) {
        None => None,
        Some(vals) => if vals.is_empty() { None } else { Some(vals[0].clone()) }
    };
    if mode != ModeOfOperation::CheckKernel && input_file.is_none() {
        eprintln!("Input file not specified.");
        return Err(());
    }
    if mode == ModeOfOperation::CheckKernel && input_file.is_some() {
        eprintln!("Unexpected option {} (mode is {}).",
            cmdline::INPUT_FILE, Into::<&str>::into(ModeOfOperation::CheckKernel)
        );
        return Err(());
    }

    let output_file = match option_values.get(cmdline::OUTPUT_FILE) {
        None => None,
        Some(vals) => if vals.is_empty() { None } else { Some(vals[0].clone()) }
    };
    if mode == ModeOfOperation::CheckKernel && output_file.is_some() {
        eprintln!("Unexpected option {} (mode is {}).",
            cmdline::OUTPUT_FILE, Into::<&str>::into(ModeOfOperation::CheckKernel)
        );
        return Err(());
    }

    let size = get_option_value::<u32>(cmdline::SIZE, &option_values)?;
    if mode == ModeOfOperation::CheckKernel && size.is_none() {
        eprintln!("Option {} must be specified in {} mode.",
            cmdline::SIZE, Into::<&str>::into(ModeOfOperation::CheckKernel)
        );
        return Err(());
    }

    let tap_count = get_option_value::<usize>(cmdline::TAP_COUNT, &option_values)?
        .unwrap_or(DEFAULT_TAP_COUNT);

    let method = {
        match get_option_value::<Method>(cmdline::METHOD, &option_values) {
            Err(_) => return Err(()),

            Ok(Some(val)) => if mode != ModeOfOperation::Encode {
                eprintln!("Unexpected option {} (mode is not {}).",
                    cmdline::METHOD, Into::<&str>::into(ModeOfOperation::Encode)
                );
                return Err(());
            } else {
                val
            },

            Ok(None) => Method::Spectral
        }
    };

    let offset_mode = get_option_value::<OffsetMode>(cmdline::OFFSET_MODE, &option_values)?
        .unwrap_or(OffsetMode::Relative);

    let normalization = get_option_value::<Normalization>(cmdline::NORMALIZATION, &option_values)?
        .unwrap_or(Normalization::UnitSum);

    let log_level = get_option_value::<logging::Level>(cmdline::LOG_LEVEL, &option_values)?
        .unwrap_or(logging::Level::Info);

    Ok(Some(Configuration{
        mode,
        input_file,
        output_file,
        size,
        tap_count,
        method,
        offset_mode,
        normalization,
        log_level
    }))
}
