//! Verify command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use colored::{Color, Colorize};
use pixelguard_core::{TamperStatus, Verifier};
use tracing::{error, info};

use crate::config::Config;
use crate::utils::{load_store, print_json, read_image};
use crate::Output;

/// Execute the verify command.
pub fn execute(config: &Config, file: PathBuf, out: Output) -> Result<()> {
    let input = read_image(&file)?;
    let store = load_store(&config.store_path)?;
    let verdict = Verifier::new(Arc::new(store)).verify(&input.pixels, &input.hash);

    if out.json {
        print_json(&verdict)?;
    } else if !out.quiet {
        let (banner, color) = match verdict.tamper_status {
            TamperStatus::Intact => ("║              INTACT                    ║", Color::Green),
            TamperStatus::Modified => ("║              MODIFIED                  ║", Color::Yellow),
            TamperStatus::NoWatermark => ("║            NO WATERMARK                ║", Color::Red),
        };
        println!();
        println!("{}", "╔════════════════════════════════════════╗".color(color));
        println!("{}", banner.color(color).bold());
        println!("{}", "╚════════════════════════════════════════╝".color(color));
        println!();
        println!(
            "   {} {}",
            "Owner:".dimmed(),
            verdict.owner_id.as_deref().unwrap_or("-")
        );
        println!("   {} {}%", "Confidence:".dimmed(), verdict.confidence);
        println!("   {} {}", "Tamper status:".dimmed(), verdict.tamper_status);
        println!("   {} {}", "Extracted:".dimmed(), verdict.extracted_text);
    } else {
        println!(
            "{} {} {}",
            verdict.tamper_status,
            verdict.confidence,
            verdict.owner_id.as_deref().unwrap_or("-")
        );
    }

    if verdict.found {
        info!(owner = ?verdict.owner_id, "Watermark verified");
        Ok(())
    } else {
        error!(confidence = verdict.confidence, "No watermark found");
        bail!("No watermark found in {}", file.display())
    }
}
