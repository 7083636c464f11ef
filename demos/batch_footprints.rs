//! Example of generating footprints for many granules in parallel.
//!
//! Run with: cargo run --example batch_footprints --features parallel

use footprinter::{generate_many, FootprintConfig, FootprintInput};
use std::time::Instant;

fn granule(offset: f64) -> FootprintInput {
    let mut lon = Vec::new();
    let mut lat = Vec::new();
    for i in 0..60 {
        for j in 0..30 {
            lon.push(offset + i as f64 * 0.2);
            lat.push(-30.0 + j as f64 * 0.2 + (i as f64 * 0.1).sin());
        }
    }
    FootprintInput::new(lon, lat)
}

fn main() {
    println!("Batch Footprint Example\n");

    let inputs: Vec<FootprintInput> = (0..32).map(|n| granule(-170.0 + n as f64 * 10.0)).collect();
    let config = FootprintConfig::default().with_simplify(0.1);

    let start = Instant::now();
    let results = generate_many(&inputs, &config);
    let elapsed = start.elapsed();

    let ok = results.iter().filter(|r| r.is_ok()).count();
    println!("{} granules, {} footprints in {:?}\n", inputs.len(), ok, elapsed);

    for (i, result) in results.iter().take(3).enumerate() {
        match result {
            Ok(wkt) => println!("granule {}: {}", i, wkt),
            Err(e) => println!("granule {}: {}", i, e),
        }
    }
}
