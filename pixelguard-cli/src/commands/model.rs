//! Model command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use pixelguard_core::LinearClassifier;
use serde_json::json;
use tracing::info;

use crate::utils::print_json;
use crate::Output;

/// Write a seeded reference classifier to `output`.
pub fn init(
    output: PathBuf,
    input_size: usize,
    num_classes: usize,
    seed: u64,
    out: Output,
) -> Result<()> {
    let model = LinearClassifier::seeded(input_size, num_classes, seed)
        .context("Failed to build classifier")?;
    model
        .save(&output)
        .with_context(|| format!("Failed to write model: {}", output.display()))?;

    info!(path = %output.display(), input_size, num_classes, seed, "Model written");

    if out.json {
        return print_json(&json!({
            "output": output.display().to_string(),
            "input_size": input_size,
            "num_classes": num_classes,
            "seed": seed,
        }));
    }
    if !out.quiet {
        println!(
            "{} {} ({}x{} input, {} classes)",
            "Model written:".green(),
            output.display(),
            input_size,
            input_size,
            num_classes
        );
    }
    Ok(())
}
