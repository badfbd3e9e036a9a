use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ---------------------------------------------------------------------------
// Synthetic Milan listings generator
// ---------------------------------------------------------------------------
//
// Produces a deterministic CSV for demos and manual testing:
//
//   cargo run --bin generate_sample
//
// The planted structure: price grows with area, bedrooms and energy score,
// with a multiplier per transport category and log-normal noise, so the
// trained model has something real to find and attribute.

const OUTPUT_PATH: &str = "milan_listings.csv";
const N_ROWS: usize = 400;
const SEED: u64 = 42;

const TRANSPORTS: [(&str, f64, f64); 4] = [
    // (category, sampling weight, price multiplier)
    ("metro", 0.35, 1.25),
    ("tram", 0.25, 1.12),
    ("bus", 0.25, 1.05),
    ("none", 0.15, 1.00),
];

fn sample_transport(rng: &mut StdRng) -> (&'static str, f64) {
    let mut roll: f64 = rng.gen_range(0.0..1.0);
    for &(name, weight, multiplier) in &TRANSPORTS {
        if roll < weight {
            return (name, multiplier);
        }
        roll -= weight;
    }
    let last = TRANSPORTS[TRANSPORTS.len() - 1];
    (last.0, last.2)
}

/// Box-Muller transform for normal noise.
fn gauss(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen_range(1e-15..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

fn main() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut writer = csv::Writer::from_path(OUTPUT_PATH)
        .with_context(|| format!("creating {OUTPUT_PATH}"))?;

    writer.write_record(["area", "bedrooms", "energy_score", "transport", "price"])?;

    for _ in 0..N_ROWS {
        let bedrooms: u32 = rng.gen_range(1..=4);
        let area = 28.0 + 24.0 * bedrooms as f64 + rng.gen_range(-8.0..14.0);
        let energy = rng.gen_range(1..=10) as f64;
        let (transport, multiplier) = sample_transport(&mut rng);

        let base = 2_600.0 * area + 18_000.0 * bedrooms as f64 + 7_500.0 * energy;
        let price = (base * multiplier * gauss(&mut rng, 1.0, 0.06).max(0.5)).round();

        // A few listings come without an energy certificate.
        let energy_cell = if rng.gen_range(0.0..1.0) < 0.02 {
            String::new()
        } else {
            format!("{energy:.1}")
        };

        writer.write_record([
            format!("{area:.1}"),
            bedrooms.to_string(),
            energy_cell,
            transport.to_string(),
            format!("{price:.0}"),
        ])?;
    }

    writer.flush()?;
    println!("Wrote {N_ROWS} listings to {OUTPUT_PATH}");
    Ok(())
}
