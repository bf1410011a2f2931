//! Example demonstrating the engine's tracing instrumentation.
//!
//! Run with: cargo run -p pixelguard-core --example protect_tracing

use pixelguard_core::adversarial::{ClassifierConfig, ClassifierService};
use pixelguard_core::{classify, embed, extract, PixelBuffer};
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    // Initialize tracing subscriber with debug level
    fmt()
        .with_env_filter(EnvFilter::new("pixelguard_core=debug,info"))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    println!("=== PixelGuard Tracing Demo ===\n");

    let samples = (0..96 * 64 * 3).map(|i| (i * 37 % 251) as u8).collect();
    let image = match PixelBuffer::new(96, 64, samples) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Failed to build image: {}", e);
            return;
        }
    };

    let marked = match embed(&image, "demo-owner", 3) {
        Ok(marked) => marked,
        Err(e) => {
            eprintln!("Embedding failed: {}", e);
            return;
        }
    };
    let verdict = classify(&extract(&marked.image), None);
    println!("\nVerdict: {:?}\n", verdict);

    let config = ClassifierConfig::Seeded {
        input_size: 64,
        num_classes: 10,
        seed: 7,
    };
    let service = match ClassifierService::load(config) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Failed to load classifier: {}", e);
            return;
        }
    };

    match service.perturber().protect(&marked.image, 0.02) {
        Ok(result) => {
            println!("\nProtected");
            println!("   Robustness score: {:.2}", result.robustness_score);
            println!("   Target class:     {}", result.target_class);
        }
        Err(e) => {
            println!("\nFailed: {}", e);
        }
    }
    service.shutdown();
}
