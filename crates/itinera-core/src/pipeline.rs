// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! Page-level controller for one trip.
//!
//! `TripPipeline` owns the item list and the trip context. Each
//! [`PipelineEvent`] advances the generation and fans out to the geocode stage
//! and then the route stage. Stages read a snapshot, await their service, and
//! hand back a replacement that is applied only if their ticket is still
//! current. The state lock is never held across an await.

use crate::generation::{Generation, Ticket};
use crate::geocode::{missing_titles, GeocodeResolver, ResolveOutcome};
use crate::geo::LatLng;
use crate::itinerary::{normalize, ItineraryItem};
use crate::name_key::KeyCollision;
use crate::route::{coordinate_track, resolved_count, RouteAssembler, RouteSegment};
use crate::services::{Geocoder, ItineraryGenerator, RouteService, ServiceError, TripRequest};
use crate::viewport::{compute_viewport, Viewport, ViewportOptions};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

/// Destination and country used to scope geocoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripContext {
    pub destination: String,
    #[serde(default)]
    pub country: Option<String>,
}

impl TripContext {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            country: None,
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Trimmed destination, `None` when blank.
    pub fn destination_suffix(&self) -> Option<&str> {
        Some(self.destination.trim()).filter(|d| !d.is_empty())
    }

    pub fn country_code(&self) -> Option<&str> {
        self.country
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// The item list was replaced (new generator output).
    ItemsReplaced,
    ContextChanged(TripContext),
    /// User asked to resolve the stops that are still missing coordinates.
    RetryRequested,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageStatus {
    /// Nothing to do; no request made.
    Skipped,
    Applied,
    /// A newer event superseded this one; its result was dropped.
    Stale,
    /// The request failed; state was left as it was.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub generation: u64,
    pub geocode: StageStatus,
    pub routes: StageStatus,
    pub resolved: usize,
    pub still_missing: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripState {
    pub context: TripContext,
    pub items: Vec<ItineraryItem>,
    pub segments: Vec<RouteSegment>,
    /// Last geocode failure, kept for diagnosis until a later cycle succeeds.
    pub last_error: Option<String>,
    pub collisions: Vec<KeyCollision>,
    routed_track: Option<Vec<Option<LatLng>>>,
}

pub struct TripPipeline {
    generator: Arc<dyn ItineraryGenerator>,
    resolver: GeocodeResolver,
    assembler: RouteAssembler,
    generation: Generation,
    viewport_options: ViewportOptions,
    state: Mutex<TripState>,
}

impl TripPipeline {
    pub fn new(
        generator: Arc<dyn ItineraryGenerator>,
        geocoder: Arc<dyn Geocoder>,
        routes: Arc<dyn RouteService>,
    ) -> Self {
        Self {
            generator,
            resolver: GeocodeResolver::new(geocoder),
            assembler: RouteAssembler::new(routes),
            generation: Generation::new(),
            viewport_options: ViewportOptions::default(),
            state: Mutex::new(TripState::default()),
        }
    }

    /// One backend serving all three collaborators.
    pub fn with_backend<B>(backend: Arc<B>) -> Self
    where
        B: ItineraryGenerator + Geocoder + RouteService + 'static,
    {
        Self::new(backend.clone(), backend.clone(), backend)
    }

    pub fn with_viewport_options(mut self, options: ViewportOptions) -> Self {
        self.viewport_options = options;
        self
    }

    pub fn with_disambiguation(mut self, enabled: bool) -> Self {
        self.resolver = self.resolver.with_disambiguation(enabled);
        self
    }

    fn lock(&self) -> MutexGuard<'_, TripState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> TripState {
        self.lock().clone()
    }

    pub fn items(&self) -> Vec<ItineraryItem> {
        self.lock().items.clone()
    }

    /// Titles still lacking coordinates; these get a retry affordance.
    pub fn missing_titles(&self) -> Vec<String> {
        missing_titles(&self.lock().items)
    }

    pub fn viewport(&self) -> Viewport {
        let track = coordinate_track(&self.lock().items);
        compute_viewport(&track, &self.viewport_options)
    }

    /// Asks the generator for a new itinerary and runs the full cycle on it.
    ///
    /// Generator failures are returned to the caller and leave the current
    /// itinerary in place.
    pub async fn generate(
        &self,
        request: &TripRequest,
        country: Option<String>,
    ) -> Result<CycleReport, ServiceError> {
        request.validate()?;
        info!(
            "Requesting itinerary — destination={} month={:?} preferences={}",
            request.destination,
            request.month,
            request.preferences.len()
        );
        let raw = self.generator.generate(request).await?;
        let items = normalize(&raw);
        info!("Itinerary normalized — items={}", items.len());

        let mut context = TripContext::new(request.destination.trim());
        context.country = country;
        {
            let mut state = self.lock();
            state.items = items;
            state.context = context.clone();
            state.segments.clear();
            state.routed_track = None;
            state.collisions.clear();
            self.generation.advance();
        }
        Ok(self.handle(PipelineEvent::ContextChanged(context)).await)
    }

    /// Replaces the item list from an already-fetched payload. No I/O.
    pub fn load_raw(&self, raw: &Value) -> usize {
        let items = normalize(raw);
        let count = items.len();
        let mut state = self.lock();
        state.items = items;
        state.segments.clear();
        state.routed_track = None;
        state.collisions.clear();
        // Anything in flight was computed for the old list.
        self.generation.advance();
        count
    }

    pub async fn handle(&self, event: PipelineEvent) -> CycleReport {
        let ticket = self.generation.advance();
        let (items, context) = {
            let mut state = self.lock();
            if let PipelineEvent::ContextChanged(ctx) = &event {
                state.context = ctx.clone();
            }
            (state.items.clone(), state.context.clone())
        };

        let outcome = match event {
            PipelineEvent::RetryRequested => {
                self.resolver.retry(&items, &context, &ticket).await
            }
            PipelineEvent::ItemsReplaced | PipelineEvent::ContextChanged(_) => {
                self.resolver.resolve(&items, &context, &ticket).await
            }
        };

        let mut report = CycleReport {
            generation: ticket.id(),
            geocode: StageStatus::Skipped,
            routes: StageStatus::Skipped,
            resolved: 0,
            still_missing: Vec::new(),
        };

        match outcome {
            Ok(ResolveOutcome::Idle) => {}
            Ok(ResolveOutcome::Stale) => {
                report.geocode = StageStatus::Stale;
                report.routes = StageStatus::Stale;
                return report;
            }
            Ok(ResolveOutcome::Resolved(resolution)) => {
                let mut state = self.lock();
                if ticket.is_stale() {
                    report.geocode = StageStatus::Stale;
                    report.routes = StageStatus::Stale;
                    return report;
                }
                report.resolved = resolution.resolved;
                state.items = resolution.items;
                state.collisions = resolution.collisions;
                state.last_error = None;
                report.geocode = StageStatus::Applied;
            }
            Err(e) => {
                error!("Geocode request failed; places stay unresolved — error={}", e);
                let mut state = self.lock();
                if ticket.is_current() {
                    state.last_error = Some(e.to_string());
                }
                report.geocode = StageStatus::Failed(e.to_string());
            }
        }

        report.routes = self.route_stage(&ticket).await;
        report.still_missing = self.missing_titles();
        report
    }

    /// Runs the assembler when the coordinate track changed since it last ran.
    async fn route_stage(&self, ticket: &Ticket) -> StageStatus {
        let track = {
            let state = self.lock();
            let track = coordinate_track(&state.items);
            if state.routed_track.as_ref() == Some(&track) {
                return StageStatus::Skipped;
            }
            track
        };

        if resolved_count(&track) < 2 {
            let mut state = self.lock();
            if ticket.is_stale() {
                return StageStatus::Stale;
            }
            state.segments.clear();
            state.routed_track = Some(track);
            return StageStatus::Skipped;
        }

        match self.assembler.assemble(&track, ticket).await {
            Some(overlay) => {
                let mut state = self.lock();
                if ticket.is_stale() {
                    return StageStatus::Stale;
                }
                state.segments = overlay.segments;
                if let Some(e) = overlay.error {
                    // Leave routed_track unset so the next event asks again.
                    return StageStatus::Failed(e);
                }
                if state.segments.is_empty() {
                    warn!("No route geometry available for this itinerary");
                }
                state.routed_track = Some(track);
                StageStatus::Applied
            }
            None => StageStatus::Stale,
        }
    }
}
