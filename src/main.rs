//
// cycloblur - Reversible circulant blur for images
// Copyright (c) 2026 cycloblur developers
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Entry point and main functions of the `cycloblur` executable.
//!

mod args;
mod blur;
mod image;
mod logging;

use args::ModeOfOperation;
use blur::BlurParams;
use image::{FileType, Image, PixelFormat};
use logging::Logger;
use std::path::Path;

const VERSION_STRING: &'static str = include_str!(concat!(env!("OUT_DIR"), "/version"));

fn print_header() {
    println!(r#"
_________________

   {}
   Reversible pseudo-random circulant blur for images

   This program is licensed under MIT license (see LICENSE for details).

_________________
"#,
        VERSION_STRING
    );
}

/// Largest power of 2 not exceeding `n` (n > 0).
fn floor_power_of_2(n: u32) -> u32 {
    let mut result = 1;
    while result <= n / 2 {
        result *= 2;
    }

    result
}

fn default_output_file(input_file: &str, suffix: &str) -> String {
    let path = Path::new(input_file);
    let file_name = format!(
        "{}_{}.bmp",
        path.file_stem().unwrap().to_str().unwrap(),
        suffix
    );
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() =>
            parent.join(file_name).to_str().unwrap().to_string(),
        _ => file_name
    }
}

/// Loads `file_name`, reduces it to `Mono32f` and crops it to a square transform size:
/// `config_size` if given, otherwise the largest power of 2 that fits.
///
/// Returns (image, size).
///
fn load_transform_input(
    file_name: &str,
    config_size: Option<u32>,
    logger: &Logger
) -> Option<(Image, u32)> {
    let image = match Image::load(file_name, FileType::Auto) {
        Ok(image) => image,
        Err(err) => {
            eprintln!("Failed to load {}: {:?}", file_name, err);
            return None;
        }
    };
    logger.verbose(&format!(
        "loaded {}: {}x{}, {:?}", file_name, image.width(), image.height(), image.pixel_format()
    ));

    let size = match config_size {
        Some(size) => size,
        None => floor_power_of_2(image.width().min(image.height()))
    };
    if size > image.width() || size > image.height() {
        eprintln!(
            "Image is {}x{}; too small for transform size {}.",
            image.width(), image.height(), size
        );
        return None;
    }

    let mono = image.convert_pix_fmt(PixelFormat::Mono32f);
    let cropped = if mono.width() != size || mono.height() != size {
        logger.verbose(&format!("cropping to {0}x{0}", size));
        mono.crop(size, size)
    } else {
        mono
    };

    Some((cropped, size))
}

fn make_params(config: &args::Configuration, size: u32) -> Option<BlurParams> {
    match BlurParams::new(size, config.tap_count(), config.offset_mode(), config.normalization()) {
        Ok(params) => Some(params),
        Err(err) => { eprintln!("Error: {}.", err); None }
    }
}

fn save_as_mono8(image: &Image, file_name: &str, logger: &Logger) -> bool {
    logger.info(&format!("\nSaving: {}", file_name));
    match image.convert_pix_fmt(PixelFormat::Mono8).save(file_name, FileType::Bmp) {
        Ok(()) => true,
        Err(err) => { eprintln!("Failed to save {}: {:?}", file_name, err); false }
    }
}

fn mode_encode(config: args::Configuration, logger: &Logger) -> bool {
    let input_file = config.input_file().clone().unwrap();
    let output_file = match config.output_file().clone() {
        Some(output_file) => output_file,
        None => default_output_file(&input_file, "encoded")
    };

    let (input, size) = match load_transform_input(&input_file, config.size(), logger) {
        Some(result) => result,
        None => return false
    };
    let params = match make_params(&config, size) {
        Some(params) => params,
        None => return false
    };

    logger.info(&format!(
        "Encoding {} ({}x{}, {} taps, {} method)...",
        input_file, size, size, params.tap_count(), Into::<&str>::into(config.method())
    ));

    let encoded = match blur::encode_image(&input, &params, config.method()) {
        Ok(encoded) => encoded,
        Err(err) => { eprintln!("Error: {}.", err); return false; }
    };

    save_as_mono8(&encoded, &output_file, logger)
}

fn mode_decode(config: args::Configuration, logger: &Logger) -> bool {
    let input_file = config.input_file().clone().unwrap();
    let output_file = match config.output_file().clone() {
        Some(output_file) => output_file,
        None => default_output_file(&input_file, "decoded")
    };

    let (input, size) = match load_transform_input(&input_file, config.size(), logger) {
        Some(result) => result,
        None => return false
    };
    let params = match make_params(&config, size) {
        Some(params) => params,
        None => return false
    };

    logger.info(&format!(
        "Decoding {} ({}x{}, {} taps)...", input_file, size, size, params.tap_count()
    ));

    // a bin this weak still divides cleanly, but it amplifies any noise in the input
    // (e.g. the 8-bit quantization of an encoded file) by its reciprocal
    const NOISE_WARNING_THRESHOLD: f64 = 1.0e-3;
    let kernel = blur::comp::build_kernel(params.size(), params.tap_count(), params.normalization());
    let (bin, magnitude) = blur::comp::min_spectrum_magnitude(&kernel);
    if magnitude >= blur::comp::SINGULARITY_EPSILON && magnitude < NOISE_WARNING_THRESHOLD {
        logger.warn(&format!(
            "weakest kernel bin {} has magnitude {:.3e}; expect visible noise in the output",
            bin, magnitude
        ));
    }

    let decoded = match blur::decode_image(&input, &params) {
        Ok(decoded) => decoded,
        Err(err) => { eprintln!("Error: {}.", err); return false; }
    };

    save_as_mono8(&decoded, &output_file, logger)
}

fn mode_check(config: args::Configuration, logger: &Logger) -> bool {
    let size = config.size().unwrap();
    let params = match make_params(&config, size) {
        Some(params) => params,
        None => return false
    };

    logger.info(&format!(
        "Checking the kernel for size {}, {} taps ({} normalization)...",
        size, params.tap_count(), Into::<&str>::into(params.normalization())
    ));
    logger.verbose("computing exact polynomial gcd; this is slow for large sizes");

    let diag = blur::check_kernel(&params);

    println!("Distinct taps:        {} (of {})", diag.nonzero_taps, params.tap_count());
    println!("Gcd degree:           {}", diag.gcd_degree);
    println!("Weakest bin:          {} (magnitude {:.3e})", diag.min_bin, diag.min_magnitude);
    println!(
        "Verdict:              {}",
        if diag.invertible() { "invertible, decoding will reconstruct exactly" }
        else { "SINGULAR, decoding would divide by a vanishing frequency bin" }
    );

    true
}

fn run_program() -> bool {
    print_header();
    println!();

    let config = match args::parse_command_line(std::env::args()) {
        Ok(config) => match config {
            None => return true, // help was requested
            Some(config) => config
        },
        Err(_) => { println!("\nUse --{} for more information.\n", args::cmdline::HELP); return false; }
    };

    let mode = config.mode();

    let logger = Logger::new(config.log_level());

    let tstart = std::time::Instant::now();

    let success = match mode {
        ModeOfOperation::Encode => mode_encode(config, &logger),

        ModeOfOperation::Decode => mode_decode(config, &logger),

        ModeOfOperation::CheckKernel => mode_check(config, &logger)
    };

    let elapsed = tstart.elapsed();
    let mins = elapsed.as_secs() / 60;
    let secs = elapsed.as_secs() % 60;
    let frac_secs = elapsed.as_secs_f32() - (mins * 60) as f32 - secs as f32;
    logger.info(&format!("Completed in {} min {:02}.{:0.0} s.", mins, secs, frac_secs * 10.0));

    success
}

fn main() {
    std::process::exit(if run_program() { 0 } else { 1 });
}
