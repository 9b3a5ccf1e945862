// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

pub mod config;
pub mod generation;
pub mod geo;
pub mod geocode;
pub mod http;
pub mod itinerary;
pub mod name_key;
pub mod pipeline;
pub mod route;
pub mod services;
pub mod viewport;

use std::path::PathBuf;
use thiserror::Error;

pub use geo::{BoundingBox, LatLng};
pub use itinerary::ItineraryItem;
pub use pipeline::{PipelineEvent, TripContext, TripPipeline};
pub use services::ServiceError;

#[derive(Error, Debug)]
pub enum ItineraError {
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Directory holding `config.json` and anything else itinera persists.
/// Falls back to the working directory when the platform has no config dir.
pub fn get_config_root() -> PathBuf {
    directories::ProjectDirs::from("org", "itinera", "Itinera")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
