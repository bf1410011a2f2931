//! Common utility functions shared across CLI commands.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pixelguard_core::{image_hash, InMemoryRecordStore, PixelBuffer};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "pixelguard=debug" } else { "pixelguard=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// An input image with the hash of its encoded bytes.
pub struct LoadedImage {
    pub pixels: PixelBuffer,
    pub hash: String,
}

/// Read and decode an image file.
pub fn read_image(path: &Path) -> Result<LoadedImage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "Read file");

    let pixels = PixelBuffer::decode(&bytes)
        .with_context(|| format!("Failed to decode image: {}", path.display()))?;
    debug!(
        width = pixels.width(),
        height = pixels.height(),
        "Decoded image"
    );

    Ok(LoadedImage {
        pixels,
        hash: image_hash(&bytes),
    })
}

/// Encode pixels as PNG bytes.
pub fn encode_png(pixels: &PixelBuffer) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    pixels
        .to_rgb_image()
        .write_to(&mut buffer, image::ImageFormat::Png)
        .context("Failed to encode PNG")?;
    Ok(buffer.into_inner())
}

/// Write PNG bytes to `path`.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes)
        .with_context(|| format!("Failed to write output: {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "Wrote file");
    Ok(())
}

/// Build the default output path: `dir/photo.jpg` becomes `dir/photo_<suffix>.png`.
pub fn default_output_path(file: &Path, suffix: &str) -> PathBuf {
    let stem = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    file.with_file_name(format!("{stem}_{suffix}.png"))
}

/// Load the record file named by the configuration.
pub fn load_store(path: &Path) -> Result<InMemoryRecordStore> {
    InMemoryRecordStore::load_json(path)
        .with_context(|| format!("Failed to load records from {}", path.display()))
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("photo.jpg"), "watermarked"),
            PathBuf::from("photo_watermarked.png")
        );
        assert_eq!(
            default_output_path(Path::new("dir/scan.png"), "protected"),
            PathBuf::from("dir/scan_protected.png")
        );
        assert_eq!(
            default_output_path(Path::new("noext"), "clean"),
            PathBuf::from("noext_clean.png")
        );
    }

    #[test]
    fn test_png_roundtrip_preserves_pixels() {
        let pixels = PixelBuffer::filled(5, 3, [1, 2, 3]).unwrap();
        let png = encode_png(&pixels).unwrap();
        assert_eq!(PixelBuffer::decode(&png).unwrap(), pixels);
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_image(Path::new("/nonexistent/photo.png")).err().unwrap();
        assert!(format!("{err:#}").contains("Failed to read file"));
    }
}
