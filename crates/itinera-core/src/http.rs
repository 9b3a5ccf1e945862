// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::config::ItineraConfig;
use crate::services::{
    GeocodeRequest, GeocodeResponse, Geocoder, ItineraryGenerator, PolylineRequest, RawSegment,
    RouteService, ServiceError, TripRequest,
};
use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// JSON-over-HTTP client for the trip backend. Serves all three collaborators.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    generate_path: String,
    geocode_path: String,
    polylines_path: String,
}

impl HttpBackend {
    pub fn new(config: &ItineraConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            generate_path: config.generate_path.clone(),
            geocode_path: config.geocode_path.clone(),
            polylines_path: config.polylines_path.clone(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, ServiceError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.url(path);
        debug!("POST {}", url);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        debug!("Response from {} — status={} bytes={}", url, status, text.len());
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl ItineraryGenerator for HttpBackend {
    async fn generate(&self, request: &TripRequest) -> Result<Value, ServiceError> {
        self.post_json(&self.generate_path, request).await
    }
}

#[async_trait]
impl Geocoder for HttpBackend {
    async fn geocode(&self, request: &GeocodeRequest) -> Result<GeocodeResponse, ServiceError> {
        self.post_json(&self.geocode_path, request).await
    }
}

#[async_trait]
impl RouteService for HttpBackend {
    async fn polylines(&self, request: &PolylineRequest) -> Result<Vec<RawSegment>, ServiceError> {
        self.post_json(&self.polylines_path, request).await
    }
}
