// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! Wire types and traits for the three external collaborators:
//! the itinerary generator, the geocoder and the route polyline service.

use crate::geo::LatLng;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripRequest {
    pub destination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    #[serde(default)]
    pub preferences: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
}

impl TripRequest {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.destination.trim().is_empty() {
            return Err(ServiceError::InvalidRequest(
                "destination is required".to_string(),
            ));
        }
        if let Some(budget) = self.budget {
            if !budget.is_finite() || budget < 0.0 {
                return Err(ServiceError::InvalidRequest(format!(
                    "budget must be a non-negative amount, got {}",
                    budget
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodeRequest {
    pub places: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// A geocoder answer for one query. Either half may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCoordinates {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default, alias = "lon")]
    pub lng: Option<f64>,
}

impl RawCoordinates {
    /// Complete coordinates only; a half-filled answer counts as unresolved.
    pub fn complete(&self) -> Option<LatLng> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(LatLng::new(lat, lng)),
            _ => None,
        }
    }
}

impl From<LatLng> for RawCoordinates {
    fn from(p: LatLng) -> Self {
        Self {
            lat: Some(p.lat),
            lng: Some(p.lng),
        }
    }
}

/// Query string (as echoed by the service) -> coordinates, `null` when unresolved.
///
/// Entries keep the order the service sent them in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeocodeResponse {
    entries: Vec<(String, Option<RawCoordinates>)>,
}

impl GeocodeResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// An existing key keeps its position and takes the new answer.
    pub fn insert(&mut self, key: String, coords: Option<RawCoordinates>) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = coords,
            None => self.entries.push((key, coords)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Option<RawCoordinates>> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, c)| c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<RawCoordinates>)> {
        self.entries.iter().map(|(k, c)| (k.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Option<RawCoordinates>)> for GeocodeResponse {
    fn from_iter<I: IntoIterator<Item = (String, Option<RawCoordinates>)>>(iter: I) -> Self {
        let mut response = Self::new();
        for (key, coords) in iter {
            response.insert(key, coords);
        }
        response
    }
}

impl<'de> Deserialize<'de> for GeocodeResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // serde_json's map keeps source order with `preserve_order`.
        let map = serde_json::Map::<String, Value>::deserialize(deserializer)?;
        map.into_iter()
            .map(|(key, value)| {
                serde_json::from_value::<Option<RawCoordinates>>(value)
                    .map(|coords| (key, coords))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub coordinates: Option<LatLng>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolylineRequest {
    pub itinerary: Vec<TrackPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(default)]
    pub polyline: Vec<[f64; 2]>,
}

/// One consecutive-pair answer from the route service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    #[serde(default)]
    pub walk: Option<Geometry>,
    #[serde(default)]
    pub car: Option<Geometry>,
}

#[async_trait]
pub trait ItineraryGenerator: Send + Sync {
    /// Returns the raw payload; shape decoding is left to the normalizer.
    async fn generate(&self, request: &TripRequest) -> Result<Value, ServiceError>;
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, request: &GeocodeRequest) -> Result<GeocodeResponse, ServiceError>;
}

#[async_trait]
pub trait RouteService: Send + Sync {
    async fn polylines(&self, request: &PolylineRequest) -> Result<Vec<RawSegment>, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trip_request_validation() {
        assert!(TripRequest::new("Kyoto").validate().is_ok());
        assert!(matches!(
            TripRequest::new("   ").validate(),
            Err(ServiceError::InvalidRequest(_))
        ));
        let mut req = TripRequest::new("Kyoto");
        req.budget = Some(-5.0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_trip_request_wire_shape() {
        let req = TripRequest {
            destination: "Lisbon".to_string(),
            month: Some("June".to_string()),
            preferences: vec!["food".to_string(), "museums".to_string()],
            budget: None,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"destination": "Lisbon", "month": "June", "preferences": ["food", "museums"]})
        );
    }

    #[test]
    fn test_geocode_response_tolerates_nulls() {
        let resp: GeocodeResponse = serde_json::from_value(json!({
            "Louvre, Paris": {"lat": 48.86, "lng": 2.33},
            "Nowhere, Paris": null,
            "Half, Paris": {"lat": 48.0, "lng": null},
            "Lon, Paris": {"lat": 48.1, "lon": 2.1}
        }))
        .unwrap();
        let complete = |key: &str| resp.get(key).copied().flatten().and_then(|c| c.complete());
        assert_eq!(complete("Louvre, Paris"), Some(LatLng::new(48.86, 2.33)));
        assert_eq!(resp.get("Nowhere, Paris"), Some(&None));
        assert!(resp.get("Half, Paris").copied().flatten().is_some());
        assert!(complete("Half, Paris").is_none());
        assert_eq!(complete("Lon, Paris"), Some(LatLng::new(48.1, 2.1)));
        assert_eq!(resp.len(), 4);
    }

    #[test]
    fn test_geocode_response_keeps_arrival_order() {
        let resp: GeocodeResponse = serde_json::from_value(json!({
            "Zoo, Berlin": null,
            "Altes Museum, Berlin": {"lat": 52.52, "lng": 13.4},
            "Mauerpark, Berlin": null
        }))
        .unwrap();
        let keys: Vec<&str> = resp.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec!["Zoo, Berlin", "Altes Museum, Berlin", "Mauerpark, Berlin"]
        );

        assert!(serde_json::from_value::<GeocodeResponse>(json!({"A": "north"})).is_err());
    }

    #[test]
    fn test_polyline_wire_shapes() {
        let req = PolylineRequest {
            itinerary: vec![
                TrackPoint {
                    coordinates: Some(LatLng::new(35.0, 139.0)),
                },
                TrackPoint { coordinates: None },
            ],
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"itinerary": [{"coordinates": {"lat": 35.0, "lng": 139.0}}, {"coordinates": null}]})
        );

        let segments: Vec<RawSegment> = serde_json::from_value(json!([
            {"walk": {"polyline": [[35.0, 139.0], [35.1, 139.1]]}},
            {"car": {"polyline": []}},
            {}
        ]))
        .unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].walk.as_ref().unwrap().polyline.len(), 2);
        assert!(segments[1].walk.is_none());
        assert!(segments[2].car.is_none());
    }
}
