//! vantage-sampler - bulk sampling CLI
//!
//! Drives a running vantage-api: generates candidate coordinates, submits
//! them with bounded concurrency, and prints an outcome summary.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vantage_common::types::BoundingBox;

use vantage_sampler::client::{HeatmapClient, SubmitOutcome};
use vantage_sampler::coords;
use vantage_sampler::coverage;
use vantage_sampler::stats::RunStats;

/// Command-line arguments for vantage-sampler
#[derive(Parser, Debug)]
#[command(name = "vantage-sampler")]
#[command(about = "Bulk sampling driver for the vantage heatmap API")]
#[command(version)]
struct Cli {
    /// Base URL of the vantage-api instance
    #[arg(long, env = "VANTAGE_API_URL", default_value = "http://127.0.0.1:5860")]
    api_url: String,

    /// Maximum submissions in flight
    #[arg(long, default_value_t = 8)]
    concurrency: usize,

    /// Sampling box south edge
    #[arg(long, default_value_t = coords::LONDON_BBOX.south)]
    south: f64,

    /// Sampling box west edge
    #[arg(long, default_value_t = coords::LONDON_BBOX.west)]
    west: f64,

    /// Sampling box north edge
    #[arg(long, default_value_t = coords::LONDON_BBOX.north)]
    north: f64,

    /// Sampling box east edge
    #[arg(long, default_value_t = coords::LONDON_BBOX.east)]
    east: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit N random coordinates inside the sampling box
    Random {
        /// Number of coordinates to submit
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
    /// Submit a size x size grid of coordinates over the sampling box
    Grid {
        /// Grid size per side
        #[arg(long, default_value_t = 10)]
        size: usize,
    },
    /// Fill under-covered medium cells up to a per-cell point target
    Coverage {
        /// Desired points per medium (res 9) cell
        #[arg(long, default_value_t = 1)]
        target: i64,
    },
    /// Print dataset statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vantage_sampler=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let bbox = BoundingBox::new(cli.south, cli.west, cli.north, cli.east)
        .context("Invalid sampling box")?;
    let client = HeatmapClient::new(&cli.api_url).context("Failed to create API client")?;
    let concurrency = cli.concurrency.max(1);

    info!("API: {}", cli.api_url);

    match cli.command {
        Command::Random { count } => {
            let mut rng = rand::thread_rng();
            let addresses: Vec<String> = (0..count)
                .map(|_| {
                    let (lat, lng) = coords::random_coordinate(&mut rng, &bbox);
                    coords::coordinate_address(lat, lng)
                })
                .collect();

            info!("Submitting {} random coordinates", addresses.len());
            let (stats, elapsed) = submit_all(&client, addresses, concurrency).await;
            println!("{}", stats.report(elapsed));
        }
        Command::Grid { size } => {
            let addresses: Vec<String> = coords::grid_coordinates(&bbox, size)
                .into_iter()
                .map(|(lat, lng)| coords::coordinate_address(lat, lng))
                .collect();

            info!("Submitting {} grid coordinates ({}x{})", addresses.len(), size, size);
            let (stats, elapsed) = submit_all(&client, addresses, concurrency).await;
            println!("{}", stats.report(elapsed));
        }
        Command::Coverage { target } => {
            run_coverage(&client, &bbox, target, concurrency).await?;
        }
        Command::Stats => {
            let stats = client.stats().await.context("Failed to fetch stats")?;
            println!("total points: {}", stats.total_points);
            match stats.avg_beauty {
                Some(avg) => println!("avg beauty:   {:.2}", avg),
                None => println!("avg beauty:   n/a (no points yet)"),
            }
        }
    }

    Ok(())
}

/// Submit a batch of addresses with bounded concurrency
async fn submit_all(
    client: &HeatmapClient,
    addresses: Vec<String>,
    concurrency: usize,
) -> (RunStats, std::time::Duration) {
    let started = Instant::now();
    let stats = Arc::new(Mutex::new(RunStats::default()));

    stream::iter(addresses)
        .for_each_concurrent(concurrency, |address| {
            let client = client.clone();
            let stats = Arc::clone(&stats);
            async move {
                let outcome = client.submit_address(&address).await;
                log_outcome(&address, &outcome);
                stats.lock().unwrap().record(&outcome);
            }
        })
        .await;

    let stats = stats.lock().unwrap().clone();
    (stats, started.elapsed())
}

/// Fill under-covered cells until each reaches the target count
async fn run_coverage(
    client: &HeatmapClient,
    bbox: &BoundingBox,
    target: i64,
    concurrency: usize,
) -> Result<()> {
    let coverage_response = client
        .coverage(9)
        .await
        .context("Failed to fetch existing coverage")?;

    let plans = coverage::plan_cells(bbox, &coverage_response.cells, target)?;
    let pending: Vec<_> = plans.iter().filter(|p| p.needed > 0).collect();
    info!(
        "{} medium cells in box, {} below target {}",
        plans.len(),
        pending.len(),
        target
    );

    let started = Instant::now();
    let stats = Arc::new(Mutex::new(RunStats::default()));

    stream::iter(pending)
        .for_each_concurrent(concurrency, |plan| {
            let client = client.clone();
            let stats = Arc::clone(&stats);
            async move {
                fill_cell(&client, plan, &stats).await;
            }
        })
        .await;

    let stats = stats.lock().unwrap().clone();
    println!("{}", stats.report(started.elapsed()));
    Ok(())
}

/// Submit points inside one cell until it reaches its target, with a
/// bounded number of extra draws for no-imagery locations
async fn fill_cell(client: &HeatmapClient, plan: &coverage::CellPlan, stats: &Mutex<RunStats>) {
    let max_attempts = plan.needed * 3;
    let mut successes = 0;
    let mut attempts = 0;

    while successes < plan.needed && attempts < max_attempts {
        let (lat, lng) = {
            let mut rng = rand::thread_rng();
            coverage::random_point_in_cell(&mut rng, plan.cell)
        };
        let address = coords::coordinate_address(lat, lng);

        let outcome = client.submit_address(&address).await;
        log_outcome(&address, &outcome);
        if matches!(
            outcome,
            SubmitOutcome::Created(_) | SubmitOutcome::Duplicate(_)
        ) {
            successes += 1;
        }
        stats.lock().unwrap().record(&outcome);
        attempts += 1;
    }

    if successes < plan.needed {
        warn!(
            cell = %plan.cell,
            successes = successes,
            needed = plan.needed,
            "Cell left under target after retries"
        );
    }
}

fn log_outcome(address: &str, outcome: &SubmitOutcome) {
    match outcome {
        SubmitOutcome::Created(response) => info!(
            "added {} (score {}/10)",
            response.point.address, response.point.beauty
        ),
        SubmitOutcome::Duplicate(response) => info!(
            "duplicate {} (score {}/10)",
            response.point.address, response.point.beauty
        ),
        SubmitOutcome::NoImagery => info!("no imagery for {}", address),
        SubmitOutcome::Rejected(message) => warn!("rejected {}: {}", address, message),
        SubmitOutcome::Timeout => warn!("timeout for {}", address),
        SubmitOutcome::Failed(message) => warn!("failed {}: {}", address, message),
    }
}
