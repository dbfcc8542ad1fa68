//! Daily Trending Demo
//!
//! Run with: `cargo run --example daily_run`
//!
//! Synthesizes one day of NIRSpec housekeeping telemetry, runs the daily
//! preset over it twice and prints the stored tables. The second run only
//! finds duplicates.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use telemetry_trending::config::presets;
use telemetry_trending::ingest::{rows_to_batch, SampleTable};
use telemetry_trending::logging::init_tracing;
use telemetry_trending::run::TrendingRun;
use telemetry_trending::store::MemoryStatsStore;

const DAY_START: f64 = 60_310.0;
const MINUTE: f64 = 1.0 / 1_440.0;

fn main() -> anyhow::Result<()> {
    init_tracing("info")?;
    println!("=== Daily Trending Demo ===\n");

    let rows = synthesize_day(&mut StdRng::seed_from_u64(2024));
    let row_refs: Vec<(&str, f64, &str)> = rows.iter().map(|(m, t, v)| (*m, *t, v.as_str())).collect();
    let table = SampleTable::from_batches(vec![rows_to_batch(&row_refs)?]);
    println!("Ingested {} rows", table.num_rows());

    let batch = table.into_series_set()?;
    println!("Series: {}\n", batch.len());

    let config = presets::nirspec_daily()?;
    let store = MemoryStatsStore::new();

    let first = TrendingRun::new(&config, &batch).execute(&store)?;
    println!("First run:  {} inserted, {} duplicates", first.inserted, first.duplicates);
    println!("  missing mnemonics: {}", first.missing_mnemonics.join(", "));

    let second = TrendingRun::new(&config, &batch).execute(&store)?;
    println!("Second run: {} inserted, {} duplicates\n", second.inserted, second.duplicates);

    for table in store.tables() {
        for row in store.aggregates(&table) {
            println!(
                "  {table:<28} n={:<4} mean={:>8.4} stdev={:.4}",
                row.record.count(),
                row.record.mean(),
                row.record.stdev()
            );
        }
        let positions = store.position_samples(&table);
        if !positions.is_empty() {
            println!("  {table:<28} {} readbacks", positions.len());
        }
    }

    println!("\nSnapshot:\n{}", store.snapshot_json()?);
    Ok(())
}

/// One day: three lamp activations, a handful of filter wheel moves and
/// the CAA reference voltage while the assembly is powered.
#[allow(clippy::cast_precision_loss)]
fn synthesize_day(rng: &mut StdRng) -> Vec<(&'static str, f64, String)> {
    let mut rows = Vec::new();
    let at = |minute: usize| DAY_START + minute as f64 * MINUTE;

    rows.push(("INRSH_CAA_PWRF_ST", at(0), "OFF".to_string()));
    rows.push(("INRSI_CAA_ON_FLAG", at(0), "OFF".to_string()));
    rows.push(("INRSH_CAA_PWRF_ST", at(60), "ON".to_string()));

    for (i, lamp) in ["LINE1", "FLAT3", "REF"].iter().enumerate() {
        let start = 120 + i * 240;
        rows.push(("INRSH_LAMP_SEL", at(start - 5), (*lamp).to_string()));
        rows.push(("INRSI_CAA_ON_FLAG", at(start), "ON".to_string()));
        for m in start + 1..start + 30 {
            rows.push(("INRSI_C_CAA_CURRENT", at(m), format!("{:.4}", rng.gen_range(0.48..0.52))));
            rows.push(("INRSI_C_CAA_VOLTAGE", at(m), format!("{:.3}", rng.gen_range(4.1..4.3))));
        }
        rows.push(("INRSI_CAA_ON_FLAG", at(start + 30), "OFF".to_string()));
        rows.push(("INRSH_LAMP_SEL", at(start + 35), "NO_LAMP".to_string()));
    }
    rows.push(("INRSH_CAA_PWRF_ST", at(1_000), "OFF".to_string()));

    for m in (0..1_440).step_by(10) {
        rows.push(("INRSH_CAA_VREF", at(m), format!("{:.4}", rng.gen_range(2.48..2.52))));
        rows.push(("INRSH_CAA_VREFOFF", at(m), format!("{:.4}", rng.gen_range(0.01..0.02))));
    }

    let filters = ["F070LP", "F100LP", "F170LP", "F290LP", "CLEAR"];
    for (i, filter) in filters.iter().enumerate() {
        let start = 30 + i * 270;
        rows.push(("INRSI_FWA_MOVE_ST", at(start), "STARTED".to_string()));
        rows.push(("INRSI_FWA_MECH_POS", at(start + 1), (*filter).to_string()));
        rows.push((
            "INRSI_C_FWA_POSITION",
            at(start + 1),
            format!("{:.3}", 3.0 + i as f64 + rng.gen_range(-0.01..0.01)),
        ));
        rows.push(("INRSI_FWA_MOVE_ST", at(start + 2), "SUCCESS".to_string()));
    }

    rows
}
