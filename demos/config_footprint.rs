//! Example of driving footprint generation from a dataset config document.
//!
//! Run with: cargo run --example config_footprint

use footprinter::{generate, FootprintConfig, FootprintEnvelope};

const CONFIG: &str = r#"{
    "is360": true,
    "lonVar": "lon",
    "latVar": "lat",
    "footprint": {
        "strategy": "alpha_shape",
        "alpha_shape": {
            "alpha": 0.2,
            "thinning": {"method": "standard", "value": 4},
            "fill_value": -9999.0,
            "simplify": 0.05
        }
    }
}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = FootprintConfig::from_json_str(CONFIG)?;
    println!("Strategy: {}", config.strategy.name());
    println!("Variables: {:?} / {:?}\n", config.longitude_var, config.latitude_var);

    // A descending pass across the Pacific in 0-360 longitudes
    let mut lon = Vec::new();
    let mut lat = Vec::new();
    for scan in 0..200 {
        let along = scan as f64 * 0.25;
        for pixel in 0..40 {
            let across = pixel as f64 * 0.1;
            if pixel % 13 == 7 && scan % 9 == 0 {
                // Dropped samples show up as the fill value
                lon.push(-9999.0);
                lat.push(-9999.0);
                continue;
            }
            lon.push(160.0 + across + along * 0.2);
            lat.push(40.0 - along);
        }
    }

    let wkt = generate(&lon, &lat, &config)?;
    let envelope = FootprintEnvelope::new(wkt);
    println!("{}", envelope.to_json()?);
    Ok(())
}
