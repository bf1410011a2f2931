//! Extract command implementation.

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use pixelguard_core::extract;

use crate::utils::{print_json, read_image};
use crate::Output;

/// Execute the extract command.
pub fn execute(file: PathBuf, out: Output) -> Result<()> {
    let input = read_image(&file)?;
    let result = extract(&input.pixels);

    if out.json {
        return print_json(&result);
    }

    if out.quiet {
        println!("{}", result.text);
    } else if result.is_unknown() {
        println!("{} {}", "No watermark text:".yellow(), result.text);
    } else {
        println!("{} {}", "Watermark text:".dimmed(), result.text.bold());
        println!("{} {:.2}", "Match ratio:".dimmed(), result.match_ratio);
    }
    Ok(())
}
