//! Embed command implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use pixelguard_core::{
    embed, image_hash, InMemoryRecordStore, PixelGuardError, RecordStore, Verifier,
    WatermarkRecord,
};
use tracing::{info, warn};

use crate::config::Config;
use crate::utils::{default_output_path, encode_png, load_store, print_json, read_image, write_file};
use crate::Output;

/// Execute the embed command.
pub fn execute(
    config: &Config,
    file: PathBuf,
    owner: String,
    output: Option<PathBuf>,
    strength: u32,
    force: bool,
    out: Output,
) -> Result<()> {
    let strength =
        u8::try_from(strength).map_err(|_| PixelGuardError::InvalidStrength(strength))?;
    let input = read_image(&file)?;
    let store = Arc::new(load_store(&config.store_path)?);

    let report = Verifier::new(store.clone()).detect(&input.pixels, &input.hash);
    if report.has_watermark {
        if !force {
            bail!("{}", report.message);
        }
        warn!(existing = %report.extracted_text, "Overwriting existing watermark");
        if !out.quiet && !out.json {
            eprintln!(
                "{}",
                format!("Overwriting existing watermark ({})", report.extracted_text).yellow()
            );
        }
    }

    let marked = embed(&input.pixels, &owner, strength).context("Embedding failed")?;

    let png = encode_png(&marked.image)?;
    let output = output.unwrap_or_else(|| default_output_path(&file, "watermarked"));
    write_file(&output, &png)?;

    let record = WatermarkRecord::new(&owner, image_hash(&png), strength, marked.bit_length());
    if let Err(err) = save_record(&store, record.clone(), &config.store_path) {
        // Never leave an output behind without its record
        if let Err(remove_err) = std::fs::remove_file(&output) {
            warn!(path = %output.display(), error = %remove_err, "Failed to remove output");
        }
        return Err(err);
    }

    info!(
        watermark_id = %record.watermark_id,
        owner = %record.owner_id,
        strength,
        bits = record.bit_length,
        "Watermark embedded"
    );

    if out.json {
        return print_json(&record);
    }

    if !out.quiet {
        println!();
        println!("{}", "╔════════════════════════════════════════╗".green());
        println!(
            "{}",
            "║          WATERMARK EMBEDDED            ║".green().bold()
        );
        println!("{}", "╚════════════════════════════════════════╝".green());
        println!();
        println!("   {} {}", "Owner:".dimmed(), record.owner_id);
        println!("   {} {}", "Watermark ID:".dimmed(), record.watermark_id);
        println!(
            "   {} {} ({} bits)",
            "Strength:".dimmed(),
            record.strength,
            record.bit_length
        );
        println!("   {} {}", "Image hash:".dimmed(), &record.image_hash[..16]);
        println!("   {} {}", "Output:".dimmed(), output.display());
    } else {
        println!("{}", record.watermark_id);
    }
    Ok(())
}

fn save_record(store: &InMemoryRecordStore, record: WatermarkRecord, path: &Path) -> Result<()> {
    store.save(record)?;
    store
        .save_json(path)
        .with_context(|| format!("Failed to write record file: {}", path.display()))
}
