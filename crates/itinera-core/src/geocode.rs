// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! Resolves coordinates for itinerary items that do not have any yet.
//!
//! One cycle issues a single batched request for every unresolved item,
//! then reconciles the answer back onto the items by matching key. A
//! resolved coordinate is never replaced or cleared by a later cycle.

use crate::generation::Ticket;
use crate::geo::LatLng;
use crate::itinerary::ItineraryItem;
use crate::name_key::{normalize_key, KeyCollision, KeyIndex};
use crate::pipeline::TripContext;
use crate::services::{GeocodeRequest, GeocodeResponse, Geocoder, ServiceError};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Arc;

/// What was sent to the geocoder for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceQuery {
    pub title: String,
    /// `"<title>, <destination>"` when disambiguating, otherwise the bare title.
    pub query: String,
}

/// Outcome of reconciling one geocoder response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub items: Vec<ItineraryItem>,
    /// Number of items that moved from unresolved to resolved.
    pub resolved: usize,
    pub still_missing: Vec<String>,
    pub collisions: Vec<KeyCollision>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    /// Every item already had coordinates; no request was made.
    Idle,
    Resolved(Resolution),
    /// The ticket was superseded while the request was in flight; the answer was dropped.
    Stale,
}

/// Builds one query per unresolved item. Repeated query strings are sent once.
pub fn build_queries(
    items: &[ItineraryItem],
    ctx: &TripContext,
    disambiguate: bool,
) -> Vec<PlaceQuery> {
    let destination = ctx.destination_suffix().filter(|_| disambiguate);
    let mut seen = HashSet::new();

    items
        .iter()
        .filter(|item| item.coordinates.is_none())
        .map(|item| PlaceQuery {
            title: item.title.clone(),
            query: match destination {
                Some(dest) => format!("{}, {}", item.title, dest),
                None => item.title.clone(),
            },
        })
        .filter(|q| seen.insert(q.query.clone()))
        .collect()
}

pub fn build_request(queries: &[PlaceQuery], ctx: &TripContext) -> GeocodeRequest {
    GeocodeRequest {
        places: queries.iter().map(|q| q.query.clone()).collect(),
        location: ctx.destination_suffix().map(str::to_string),
        country: ctx.country_code().map(str::to_string),
    }
}

/// Merges a geocoder response into a copy of `items`.
///
/// Each unresolved item is looked up by its disambiguated key first, then by
/// its bare title key. Only complete coordinates are assigned. When several
/// response keys share a matching key, the first one the service sent wins.
pub fn reconcile(
    items: &[ItineraryItem],
    response: &GeocodeResponse,
    ctx: &TripContext,
    disambiguate: bool,
) -> Resolution {
    // Only complete answers compete for a key; a null never shadows a usable echo.
    let mut answers: KeyIndex<LatLng> = KeyIndex::new();
    for (key, coords) in response.iter() {
        if let Some(point) = coords.and_then(|c| c.complete()) {
            answers.insert(key, point);
        }
    }

    let destination = ctx.destination_suffix().filter(|_| disambiguate);
    let mut collisions = answers.collisions().to_vec();
    collisions.extend(title_collisions(items));

    let mut resolved = 0;
    let mut still_missing = Vec::new();
    let items = items
        .iter()
        .map(|item| {
            if item.coordinates.is_some() {
                return item.clone();
            }
            if normalize_key(&item.title).is_empty() {
                // Only the destination suffix would be left to match on.
                still_missing.push(item.title.clone());
                return item.clone();
            }
            let disambiguated = destination.map(|dest| format!("{}, {}", item.title, dest));
            let found = disambiguated
                .as_deref()
                .and_then(|q| answers.get(q).copied())
                .or_else(|| answers.get(&item.title).copied());

            let mut item = item.clone();
            match found {
                Some(coords) => {
                    item.coordinates = Some(coords);
                    resolved += 1;
                }
                None => still_missing.push(item.title.clone()),
            }
            item
        })
        .collect();

    for c in &collisions {
        warn!(
            "Place names share a matching key; first match wins — key={} kept={:?} dropped={:?}",
            c.key, c.kept, c.dropped
        );
    }

    Resolution {
        items,
        resolved,
        still_missing,
        collisions,
    }
}

/// Distinct titles that would be matched through the same key.
fn title_collisions(items: &[ItineraryItem]) -> Vec<KeyCollision> {
    let index: KeyIndex<()> = items.iter().map(|i| (i.title.as_str(), ())).collect();
    index.into_collisions()
}

pub fn missing_titles(items: &[ItineraryItem]) -> Vec<String> {
    items
        .iter()
        .filter(|i| i.coordinates.is_none())
        .map(|i| i.title.clone())
        .collect()
}

#[derive(Clone)]
pub struct GeocodeResolver {
    geocoder: Arc<dyn Geocoder>,
    disambiguate: bool,
}

impl GeocodeResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            geocoder,
            disambiguate: true,
        }
    }

    /// Appending the destination to each query can be switched off for
    /// geocoders that already scope by `location`.
    pub fn with_disambiguation(mut self, enabled: bool) -> Self {
        self.disambiguate = enabled;
        self
    }

    pub async fn resolve(
        &self,
        items: &[ItineraryItem],
        ctx: &TripContext,
        ticket: &Ticket,
    ) -> Result<ResolveOutcome, ServiceError> {
        let queries = build_queries(items, ctx, self.disambiguate);
        if queries.is_empty() {
            debug!("All itinerary items resolved; geocoder idle");
            return Ok(ResolveOutcome::Idle);
        }

        let request = build_request(&queries, ctx);
        info!(
            "Geocoding itinerary places — queries={} location={:?} country={:?} generation={}",
            request.places.len(),
            request.location,
            request.country,
            ticket.id()
        );
        let response = self.geocoder.geocode(&request).await?;

        if ticket.is_stale() {
            debug!(
                "Discarding geocode response for superseded generation={}",
                ticket.id()
            );
            return Ok(ResolveOutcome::Stale);
        }

        let resolution = reconcile(items, &response, ctx, self.disambiguate);
        info!(
            "Geocode reconciled — resolved={} still_missing={} collisions={}",
            resolution.resolved,
            resolution.still_missing.len(),
            resolution.collisions.len()
        );
        Ok(ResolveOutcome::Resolved(resolution))
    }

    /// User-initiated retry of the items that are still missing coordinates.
    pub async fn retry(
        &self,
        items: &[ItineraryItem],
        ctx: &TripContext,
        ticket: &Ticket,
    ) -> Result<ResolveOutcome, ServiceError> {
        info!(
            "Retrying geocode for unresolved places — count={}",
            items.iter().filter(|i| !i.is_resolved()).count()
        );
        self.resolve(items, ctx, ticket).await
    }
}
