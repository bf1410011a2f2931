//! Detect command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use pixelguard_core::Verifier;

use crate::config::Config;
use crate::utils::{load_store, print_json, read_image};
use crate::Output;

/// Execute the detect command. A positive detection is not an error.
pub fn execute(config: &Config, file: PathBuf, out: Output) -> Result<()> {
    let input = read_image(&file)?;
    let store = load_store(&config.store_path)?;
    let report = Verifier::new(Arc::new(store)).detect(&input.pixels, &input.hash);

    if out.json {
        return print_json(&report);
    }

    if out.quiet {
        println!("{}", report.has_watermark);
    } else if report.has_watermark {
        println!("{}", report.message.yellow());
    } else {
        println!("{}", report.message.green());
    }
    Ok(())
}
