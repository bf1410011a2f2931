//! Protect command implementation.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use pixelguard_core::{map_epsilon, ClassifierService};
use serde_json::json;
use tracing::info;

use crate::config::Config;
use crate::utils::{default_output_path, encode_png, print_json, read_image, write_file};
use crate::Output;

/// Execute the protect command.
pub fn execute(
    config: &Config,
    file: PathBuf,
    output: Option<PathBuf>,
    epsilon: f32,
    out: Output,
) -> Result<()> {
    // Reject bad strengths before loading the model
    let epsilon = map_epsilon(epsilon).context("Invalid perturbation strength")?;

    let input = read_image(&file)?;
    let pixels = u64::from(input.pixels.width()) * u64::from(input.pixels.height());
    if pixels > config.max_pixels {
        bail!(
            "Image too large: {} pixels exceeds the {} pixel limit",
            pixels,
            config.max_pixels
        );
    }

    let service = ClassifierService::load(config.classifier_config())
        .context("Failed to load classifier")?;
    let result = service
        .perturber()
        .protect(&input.pixels, epsilon)
        .context("Protection failed")?;
    service.shutdown();

    let png = encode_png(&result.image)?;
    let output = output.unwrap_or_else(|| default_output_path(&file, "protected"));
    write_file(&output, &png)?;

    info!(
        output = %output.display(),
        robustness_score = result.robustness_score,
        "Protected image written"
    );

    if out.json {
        return print_json(&json!({
            "output": output.display().to_string(),
            "epsilon": result.epsilon,
            "robustness_score": result.robustness_score,
            "target_class": result.target_class,
            "original_confidence": result.original_confidence,
            "adversarial_confidence": result.adversarial_confidence,
        }));
    }

    if out.quiet {
        println!("{:.2}", result.robustness_score);
        return Ok(());
    }

    println!();
    println!("{}", "╔════════════════════════════════════════╗".green());
    println!(
        "{}",
        "║           IMAGE PROTECTED              ║".green().bold()
    );
    println!("{}", "╚════════════════════════════════════════╝".green());
    println!();
    println!("   {} {:.4}", "Epsilon:".dimmed(), result.epsilon);
    println!(
        "   {} {:.2}%",
        "Robustness score:".dimmed(),
        result.robustness_score
    );
    println!(
        "   {} class {} ({:.3} -> {:.3})",
        "Target:".dimmed(),
        result.target_class,
        result.original_confidence,
        result.adversarial_confidence
    );
    println!("   {} {}", "Output:".dimmed(), output.display());
    Ok(())
}
