// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::generation::Ticket;
use crate::geo::LatLng;
use crate::itinerary::ItineraryItem;
use crate::services::{Geometry, PolylineRequest, RawSegment, RouteService, TrackPoint};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TravelMode {
    Walk,
    Car,
}

/// Geometry drawn between two consecutive stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    /// Position of the segment in the service response.
    pub index: usize,
    pub mode: TravelMode,
    pub path: Vec<LatLng>,
}

/// What the map draws between stops.
///
/// `error` is set when the service failed; the overlay is then empty and the
/// map shows markers only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteOverlay {
    pub segments: Vec<RouteSegment>,
    pub error: Option<String>,
}

impl RouteOverlay {
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Ordered coordinates of the items, unresolved stops kept as `None`.
pub fn coordinate_track(items: &[ItineraryItem]) -> Vec<Option<LatLng>> {
    items.iter().map(|i| i.coordinates).collect()
}

pub fn resolved_count(track: &[Option<LatLng>]) -> usize {
    track.iter().filter(|p| p.is_some()).count()
}

/// Picks walking geometry over driving geometry; segments with neither are dropped.
pub fn select_segments(raw: Vec<RawSegment>) -> Vec<RouteSegment> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, seg)| {
            let (mode, geometry) = match (non_empty(seg.walk), non_empty(seg.car)) {
                (Some(walk), _) => (TravelMode::Walk, walk),
                (None, Some(car)) => (TravelMode::Car, car),
                (None, None) => return None,
            };
            Some(RouteSegment {
                index,
                mode,
                path: geometry.polyline.into_iter().map(LatLng::from).collect(),
            })
        })
        .collect()
}

fn non_empty(geometry: Option<Geometry>) -> Option<Geometry> {
    geometry.filter(|g| !g.polyline.is_empty())
}

#[derive(Clone)]
pub struct RouteAssembler {
    service: Arc<dyn RouteService>,
}

impl RouteAssembler {
    pub fn new(service: Arc<dyn RouteService>) -> Self {
        Self { service }
    }

    /// Requests route geometry for the whole track.
    ///
    /// Never fails: a service error degrades to an empty overlay. Returns
    /// `None` only when `ticket` was superseded while the request was in flight.
    pub async fn assemble(
        &self,
        track: &[Option<LatLng>],
        ticket: &Ticket,
    ) -> Option<RouteOverlay> {
        if resolved_count(track) < 2 {
            debug!(
                "Fewer than two resolved stops; skipping polyline request — resolved={}",
                resolved_count(track)
            );
            return Some(RouteOverlay::default());
        }

        let request = PolylineRequest {
            itinerary: track
                .iter()
                .map(|p| TrackPoint { coordinates: *p })
                .collect(),
        };

        let result = self.service.polylines(&request).await;
        if ticket.is_stale() {
            debug!(
                "Discarding polyline response for superseded generation={}",
                ticket.id()
            );
            return None;
        }

        match result {
            Ok(raw) => {
                let returned = raw.len();
                let segments = select_segments(raw);
                info!(
                    "Route polylines assembled — segments={} returned={} stops={}",
                    segments.len(),
                    returned,
                    track.len()
                );
                Some(RouteOverlay {
                    segments,
                    error: None,
                })
            }
            Err(e) => {
                warn!("Polyline request failed; showing markers without routes: {}", e);
                Some(RouteOverlay {
                    segments: Vec::new(),
                    error: Some(e.to_string()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::Generation;
    use crate::services::ServiceError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedRoutes {
        segments: Option<Vec<RawSegment>>,
        calls: AtomicUsize,
    }

    impl FixedRoutes {
        fn new(segments: Option<Vec<RawSegment>>) -> Arc<Self> {
            Arc::new(Self {
                segments,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RouteService for FixedRoutes {
        async fn polylines(&self, _req: &PolylineRequest) -> Result<Vec<RawSegment>, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.segments.clone().ok_or(ServiceError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }

    fn geometry(points: &[[f64; 2]]) -> Option<Geometry> {
        Some(Geometry {
            polyline: points.to_vec(),
        })
    }

    #[test]
    fn test_select_prefers_walk_then_car_then_omits() {
        let raw = vec![
            RawSegment {
                walk: geometry(&[[1.0, 1.0], [2.0, 2.0]]),
                car: geometry(&[[9.0, 9.0]]),
            },
            RawSegment {
                walk: geometry(&[]),
                car: geometry(&[[3.0, 3.0], [4.0, 4.0]]),
            },
            RawSegment {
                walk: None,
                car: None,
            },
        ];
        let segments = select_segments(raw);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].mode, TravelMode::Walk);
        assert_eq!(segments[0].path[1], LatLng::new(2.0, 2.0));
        assert_eq!(segments[1].mode, TravelMode::Car);
        assert_eq!(segments[1].index, 1);
    }

    #[tokio::test]
    async fn test_no_request_below_two_points() {
        let service = FixedRoutes::new(Some(Vec::new()));
        let assembler = RouteAssembler::new(service.clone());
        let ticket = Generation::new().advance();

        let track = vec![Some(LatLng::new(35.0, 139.0)), None, None];
        assert_eq!(
            assembler.assemble(&track, &ticket).await,
            Some(RouteOverlay::default())
        );
        assert_eq!(
            assembler.assemble(&[], &ticket).await,
            Some(RouteOverlay::default())
        );
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_two_points_with_walking_polyline() {
        let polyline = vec![[35.0, 139.0], [35.05, 139.05], [35.1, 139.1]];
        let service = FixedRoutes::new(Some(vec![RawSegment {
            walk: geometry(&polyline),
            car: None,
        }]));
        let assembler = RouteAssembler::new(service.clone());
        let ticket = Generation::new().advance();

        let track = vec![Some(LatLng::new(35.0, 139.0)), Some(LatLng::new(35.1, 139.1))];
        let overlay = assembler.assemble(&track, &ticket).await.unwrap();
        assert!(!overlay.is_degraded());
        let segments = overlay.segments;
        assert_eq!(segments.len(), 1);
        let expected: Vec<LatLng> = polyline.into_iter().map(LatLng::from).collect();
        assert_eq!(segments[0].path, expected);
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_yields_empty_overlay() {
        let assembler = RouteAssembler::new(FixedRoutes::new(None));
        let ticket = Generation::new().advance();
        let track = vec![Some(LatLng::new(1.0, 1.0)), Some(LatLng::new(2.0, 2.0))];
        let overlay = assembler.assemble(&track, &ticket).await.unwrap();
        assert!(overlay.segments.is_empty());
        assert_eq!(overlay.error.as_deref(), Some("HTTP 503: unavailable"));
    }

    #[tokio::test]
    async fn test_stale_ticket_discards_result() {
        let assembler = RouteAssembler::new(FixedRoutes::new(Some(vec![RawSegment::default()])));
        let generation = Generation::new();
        let ticket = generation.advance();
        generation.advance();
        let track = vec![Some(LatLng::new(1.0, 1.0)), Some(LatLng::new(2.0, 2.0))];
        assert_eq!(assembler.assemble(&track, &ticket).await, None);
    }

    #[test]
    fn test_coordinate_track_keeps_gaps() {
        let items: Vec<ItineraryItem> = serde_json::from_value(serde_json::json!([
            {"title": "A", "time": "", "category": "General", "price": "—", "description": "",
             "coordinates": {"lat": 1.0, "lng": 2.0}},
            {"title": "B", "time": "", "category": "General", "price": "—", "description": "",
             "coordinates": null}
        ]))
        .unwrap();
        let track = coordinate_track(&items);
        assert_eq!(track, vec![Some(LatLng::new(1.0, 2.0)), None]);
        assert_eq!(resolved_count(&track), 1);
    }
}
