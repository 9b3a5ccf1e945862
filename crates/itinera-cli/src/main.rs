// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use itinera_core::config::{ConfigManager, ItineraConfig};
use itinera_core::http::HttpBackend;
use itinera_core::name_key::normalize_key;
use itinera_core::pipeline::{CycleReport, PipelineEvent, StageStatus, TripContext};
use itinera_core::services::TripRequest;
use itinera_core::viewport::Viewport;
use itinera_core::TripPipeline;
use log::LevelFilter;
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the trip backend
    #[arg(long, env = "ITINERA_API_URL")]
    api_url: Option<String>,

    /// Path to config.json
    #[arg(long, env = "ITINERA_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an itinerary, place its stops on the map and route between them
    Plan {
        #[arg(long)]
        destination: String,
        #[arg(long)]
        month: Option<String>,
        /// Repeatable interest, e.g. --pref museums --pref food
        #[arg(long = "pref")]
        preferences: Vec<String>,
        #[arg(long)]
        budget: Option<f64>,
        /// ISO country code to bias geocoding
        #[arg(long)]
        country: Option<String>,
        /// Extra attempts for stops that stay unresolved
        #[arg(long, default_value_t = 1)]
        retries: u32,
    },
    /// Normalize a saved generator payload without asking for a new one
    Show {
        file: PathBuf,
        #[arg(long)]
        destination: Option<String>,
        #[arg(long)]
        country: Option<String>,
        /// Also resolve coordinates through the backend
        #[arg(long)]
        resolve: bool,
    },
    /// Print the matching key for a place name
    Key { text: String },
    /// Print the effective configuration
    Config {
        /// Write it back to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let manager = match &cli.config {
        Some(path) => ConfigManager::new(path),
        None => ConfigManager::default(),
    };
    let mut config = manager.load()?;
    if let Some(url) = &cli.api_url {
        config.api_base_url = url.clone();
        config.validate()?;
    }

    init_logging(cli.verbose, &config);

    match cli.command {
        Commands::Plan {
            destination,
            month,
            preferences,
            budget,
            country,
            retries,
        } => {
            let pipeline = build_pipeline(&config)?;
            let request = TripRequest {
                destination,
                month,
                preferences,
                budget,
            };

            let report = pipeline.generate(&request, country).await?;
            print_stage_failures(&report);

            let mut missing = report.still_missing;
            for attempt in 1..=retries {
                if missing.is_empty() {
                    break;
                }
                println!(
                    "Retrying {} unresolved stop(s) (attempt {}/{})",
                    missing.len(),
                    attempt,
                    retries
                );
                let retry = pipeline.handle(PipelineEvent::RetryRequested).await;
                print_stage_failures(&retry);
                missing = retry.still_missing;
            }

            print_state(&pipeline);
        }
        Commands::Show {
            file,
            destination,
            country,
            resolve,
        } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let raw: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", file.display()))?;

            let pipeline = build_pipeline(&config)?;
            let count = pipeline.load_raw(&raw);
            println!("Loaded {} item(s) from {}", count, file.display());

            if resolve {
                let destination = destination
                    .or_else(|| {
                        raw.get("destination")
                            .and_then(|d| d.as_str())
                            .map(str::to_string)
                    })
                    .ok_or_else(|| {
                        anyhow::anyhow!(
                            "No destination in the payload. Please specify with --destination."
                        )
                    })?;
                let mut context = TripContext::new(destination);
                context.country = country;
                let report = pipeline
                    .handle(PipelineEvent::ContextChanged(context))
                    .await;
                print_stage_failures(&report);
            }

            print_state(&pipeline);
        }
        Commands::Key { text } => {
            println!("{}", normalize_key(&text));
        }
        Commands::Config { save } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if save {
                manager.save(&config)?;
                println!("Saved to {}", manager.path().display());
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, config: &ItineraConfig) {
    let level = match verbose {
        0 => LevelFilter::from_str(&config.log_level).unwrap_or(LevelFilter::Info),
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // Only fails when a logger is already installed.
    let _ = TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
}

fn build_pipeline(config: &ItineraConfig) -> Result<TripPipeline> {
    let backend = HttpBackend::new(config).context("Failed to build HTTP client")?;
    Ok(TripPipeline::with_backend(Arc::new(backend))
        .with_viewport_options(config.viewport.clone())
        .with_disambiguation(config.disambiguate_queries))
}

fn print_stage_failures(report: &CycleReport) {
    if let StageStatus::Failed(e) = &report.geocode {
        println!("Geocoding failed: {}", e);
    }
    if let StageStatus::Failed(e) = &report.routes {
        println!("Routing failed, showing markers only: {}", e);
    }
}

fn print_state(pipeline: &TripPipeline) {
    let state = pipeline.snapshot();
    if !state.context.destination.is_empty() {
        println!("Itinerary for {}", state.context.destination);
    }

    for (i, item) in state.items.iter().enumerate() {
        let marker = if item.is_resolved() { "[x]" } else { "[?]" };
        println!(
            "{} {:>2}. {} | {} | {} | {}",
            marker,
            i + 1,
            item.title,
            if item.time.is_empty() { "-" } else { item.time.as_str() },
            item.category,
            item.price
        );
        if let Some(at) = item.coordinates {
            println!("        at {:.5}, {:.5}", at.lat, at.lng);
        }
        if !item.description.is_empty() {
            println!("        {}", item.description);
        }
    }

    let missing: Vec<&str> = state
        .items
        .iter()
        .filter(|i| !i.is_resolved())
        .map(|i| i.title.as_str())
        .collect();
    if !missing.is_empty() {
        println!("Not on the map: {}", missing.join(", "));
    }
    for c in &state.collisions {
        println!(
            "Warning: {:?} and {:?} match the same place key '{}'",
            c.kept, c.dropped, c.key
        );
    }

    println!("Route segments: {}", state.segments.len());
    print_viewport(&pipeline.viewport());
}

fn print_viewport(viewport: &Viewport) {
    match viewport.zoom {
        Some(zoom) => println!(
            "Viewport: center {:.5}, {:.5} zoom {}",
            viewport.center.lat, viewport.center.lng, zoom
        ),
        None => match viewport.extent() {
            Some(b) => println!(
                "Viewport: fit [{:.5}, {:.5}] - [{:.5}, {:.5}] padding {}px",
                b.min_lat, b.min_lng, b.max_lat, b.max_lng, viewport.padding[0]
            ),
            None => println!("Viewport: fit {} point(s)", viewport.bounds.len()),
        },
    }
}
