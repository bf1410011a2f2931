//! Strip command implementation.
//!
//! Decoding to raw RGB and re-encoding as PNG drops EXIF, XMP, ICC and any
//! other ancillary data carried by the input file.

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use crate::utils::{default_output_path, encode_png, print_json, read_image, write_file};
use crate::Output;

/// Execute the strip command.
pub fn execute(file: PathBuf, output: Option<PathBuf>, out: Output) -> Result<()> {
    let input = read_image(&file)?;
    let png = encode_png(&input.pixels)?;
    let output = output.unwrap_or_else(|| default_output_path(&file, "clean"));
    write_file(&output, &png)?;

    if out.json {
        print_json(&json!({ "output": output.display().to_string() }))
    } else {
        if !out.quiet {
            println!("{} {}", "Metadata stripped:".green(), output.display());
        }
        Ok(())
    }
}
