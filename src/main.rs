use std::time::Instant;

use anyhow::Context;
use seastats::Pipeline;
use tracing::info;
use tracing_subscriber::EnvFilter;

const INPUT: &str = "data.csv";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let pipeline = Pipeline::default();

    let start = Instant::now();
    let means = pipeline
        .run(INPUT)
        .with_context(|| format!("failed to process {}", INPUT))?;
    let elapsed = start.elapsed();

    info!(means = %serde_json::to_string(&means)?, "computed means");
    pipeline.validate(&means)?;

    println!(
        "Successfully validated the data using {} in {} seconds",
        env!("CARGO_BIN_NAME"),
        elapsed.as_secs_f64()
    );
    Ok(())
}
