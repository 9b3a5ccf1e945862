// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use async_trait::async_trait;
use itinera_core::geo::LatLng;
use itinera_core::pipeline::{PipelineEvent, StageStatus, TripContext, TripPipeline};
use itinera_core::services::{
    GeocodeRequest, GeocodeResponse, Geocoder, ItineraryGenerator, PolylineRequest, RawSegment,
    RouteService, ServiceError, TripRequest,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Notify;

/// Answers every query with the location's coordinates. Requests scoped to
/// `held` block until `release` is notified.
struct GatedGeocoder {
    held: &'static str,
    release: Notify,
}

#[async_trait]
impl Geocoder for GatedGeocoder {
    async fn geocode(&self, request: &GeocodeRequest) -> Result<GeocodeResponse, ServiceError> {
        let location = request.location.clone().unwrap_or_default();
        if location == self.held {
            self.release.notified().await;
        }
        let at = match location.as_str() {
            "Paris" => LatLng::new(48.85, 2.35),
            "Tokyo" => LatLng::new(35.68, 139.76),
            _ => return Ok(GeocodeResponse::new()),
        };
        Ok(request
            .places
            .iter()
            .map(|p| (p.clone(), Some(at.into())))
            .collect())
    }
}

struct Unused;

#[async_trait]
impl ItineraryGenerator for Unused {
    async fn generate(&self, _request: &TripRequest) -> Result<Value, ServiceError> {
        Ok(Value::Null)
    }
}

#[async_trait]
impl RouteService for Unused {
    async fn polylines(&self, _request: &PolylineRequest) -> Result<Vec<RawSegment>, ServiceError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_stale_response_never_overwrites_fresh_state() {
    let geocoder = Arc::new(GatedGeocoder {
        held: "Paris",
        release: Notify::new(),
    });
    let pipeline = TripPipeline::new(Arc::new(Unused), geocoder.clone(), Arc::new(Unused));
    pipeline.load_raw(&json!([{"title": "Central Station"}]));

    let slow = pipeline.handle(PipelineEvent::ContextChanged(TripContext::new("Paris")));
    let fast = async {
        let report = pipeline
            .handle(PipelineEvent::ContextChanged(TripContext::new("Tokyo")))
            .await;
        geocoder.release.notify_one();
        report
    };
    let (slow_report, fast_report) = tokio::join!(slow, fast);

    assert_eq!(fast_report.geocode, StageStatus::Applied);
    assert_eq!(slow_report.geocode, StageStatus::Stale);

    let state = pipeline.snapshot();
    assert_eq!(state.context.destination, "Tokyo");
    assert_eq!(state.items[0].coordinates, Some(LatLng::new(35.68, 139.76)));
}

#[tokio::test]
async fn test_item_replacement_discards_in_flight_resolution() {
    let geocoder = Arc::new(GatedGeocoder {
        held: "Paris",
        release: Notify::new(),
    });
    let pipeline = TripPipeline::new(Arc::new(Unused), geocoder.clone(), Arc::new(Unused));
    pipeline.load_raw(&json!([{"title": "Old List Stop"}]));

    let slow = pipeline.handle(PipelineEvent::ContextChanged(TripContext::new("Paris")));
    let replace = async {
        tokio::task::yield_now().await;
        pipeline.load_raw(&json!([{"title": "New List Stop"}]));
        geocoder.release.notify_one();
    };
    let (report, ()) = tokio::join!(slow, replace);

    assert_eq!(report.geocode, StageStatus::Stale);
    let items = pipeline.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "New List Stop");
    assert!(items[0].coordinates.is_none());
}
