use std::{fs::File, io::BufWriter, path::PathBuf};

use chrono::Utc;
use clap::Parser;
use navguard::{
    heatmap::{GridSpec, SafetyZoneAggregator},
    incidents::sample_incidents,
    models::{HeatmapResponse, Incident},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Compute campus safety zones from an incident export"
)]
struct Args {
    /// JSON array of incidents, as returned by GET /api/incidents
    #[arg(long)]
    incidents: Option<PathBuf>,

    /// Where to write the zones; stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,

    /// Add the built-in demo incidents
    #[arg(long)]
    include_samples: bool,

    /// Grid spacing in degrees
    #[arg(long, default_value_t = 0.002)]
    step: f64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let aggregator = SafetyZoneAggregator::new(GridSpec {
        step_deg: args.step,
        ..GridSpec::default()
    })?;

    let mut incidents: Vec<Incident> = match &args.incidents {
        Some(path) => serde_json::from_reader(File::open(path)?)?,
        None => Vec::new(),
    };
    if args.include_samples {
        incidents.extend(sample_incidents(Utc::now()));
    }
    tracing::info!("scoring grid against {} incidents", incidents.len());

    let response = HeatmapResponse {
        zones: aggregator.generate_safety_zones(&incidents),
        incident_count: incidents.len(),
    };

    match &args.output {
        Some(path) => {
            serde_json::to_writer_pretty(BufWriter::new(File::create(path)?), &response)?;
            tracing::info!("{} zones written to {:?}", response.zones.len(), path);
        }
        None => {
            serde_json::to_writer_pretty(std::io::stdout().lock(), &response)?;
            println!();
        }
    }

    Ok(())
}
