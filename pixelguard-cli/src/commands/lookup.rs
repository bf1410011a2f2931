//! Lookup command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use pixelguard_core::RecordStore;

use crate::config::Config;
use crate::utils::{load_store, print_json};
use crate::Output;

/// Execute the lookup command.
pub fn execute(config: &Config, watermark_id: String, out: Output) -> Result<()> {
    let store = load_store(&config.store_path)?;
    let record = store
        .find_by_watermark_id(&watermark_id)
        .with_context(|| format!("Watermark record not found: {watermark_id}"))?;

    if out.json {
        return print_json(&record);
    }

    if out.quiet {
        println!("{}", record.owner_id);
        return Ok(());
    }

    println!("   {} {}", "Watermark ID:".dimmed(), record.watermark_id);
    println!("   {} {}", "Owner:".dimmed(), record.owner_id.bold());
    println!("   {} {}", "Image hash:".dimmed(), record.image_hash);
    println!("   {} {}", "Strength:".dimmed(), record.strength);
    println!(
        "   {} {}",
        "Created:".dimmed(),
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    Ok(())
}
