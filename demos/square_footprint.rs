//! Basic example of fitting a concave-hull footprint.
//!
//! Run with: cargo run --example square_footprint

use footprinter::{generate_footprint, AlphaShapeParams, FootprintConfig, Strategy, ToWkt};

fn main() {
    // A swath over a 10° × 10° box, with a gap in the middle
    let mut lon = Vec::new();
    let mut lat = Vec::new();
    for i in 0..=20 {
        for j in 0..=20 {
            let x = i as f64 * 0.5;
            let y = j as f64 * 0.5;
            if (4.0..=6.0).contains(&x) && (4.0..=6.0).contains(&y) {
                continue;
            }
            lon.push(x);
            lat.push(y);
        }
    }

    println!("Concave Hull Footprints\n");
    println!("{} samples\n", lon.len());

    for alpha in [0.0, 0.05, 1.0, 2.5] {
        let config = FootprintConfig::new(Strategy::AlphaShape(AlphaShapeParams {
            alpha,
            ..AlphaShapeParams::default()
        }))
        .with_simplify(0.1);

        match generate_footprint(&lon, &lat, &config) {
            Ok(footprint) => {
                println!("alpha={}: {}", alpha, footprint.kind());
                println!("   {}\n", footprint.to_wkt());
            }
            Err(e) => println!("alpha={}: failed: {}\n", alpha, e),
        }
    }
}
