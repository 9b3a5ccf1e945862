// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! Canonical itinerary items and the decoder for the generator's payload shapes.
//!
//! Generators have emitted two shapes over time:
//!
//! * keyed: `{"Places": {"<place>": {time, category, price, description}}}`
//!   (the `Places` wrapper is optional)
//! * records: `[{title|place|name, start_time/end_time|start/end|time, price|cost, ...}]`
//!
//! Either may arrive wrapped in the response envelope `{destination, month, itinerary}`.
//! [`RawItinerary::from_value`] is the single dispatch point; [`RawRecord::into_item`]
//! applies the field precedence rules shared by both shapes.

use crate::geo::LatLng;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PRICE_PLACEHOLDER: &str = "—";
pub const DEFAULT_CATEGORY: &str = "General";
pub const UNTITLED: &str = "Untitled activity";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryItem {
    pub title: String,
    pub time: String,
    pub category: String,
    pub price: String,
    pub description: String,
    pub coordinates: Option<LatLng>,
}

impl ItineraryItem {
    pub fn is_resolved(&self) -> bool {
        self.coordinates.is_some()
    }
}

/// One record as the generator sent it. Every field is optional and loosely typed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    pub title: Option<Value>,
    pub place: Option<Value>,
    pub name: Option<Value>,
    pub time: Option<Value>,
    pub start_time: Option<Value>,
    pub end_time: Option<Value>,
    pub start: Option<Value>,
    pub end: Option<Value>,
    pub category: Option<Value>,
    #[serde(rename = "type")]
    pub kind: Option<Value>,
    pub price: Option<Value>,
    pub cost: Option<Value>,
    pub description: Option<Value>,
    pub notes: Option<Value>,
    pub coordinates: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub enum RawItinerary {
    #[default]
    Empty,
    /// Place name -> record, in source order.
    Keyed(Vec<(String, RawRecord)>),
    Records(Vec<RawRecord>),
}

impl RawItinerary {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => RawItinerary::Empty,
            Value::Array(records) => {
                RawItinerary::Records(records.iter().filter_map(decode_record).collect())
            }
            Value::Object(map) => {
                if let Some(inner) = map.get("itinerary") {
                    return Self::from_value(inner);
                }
                let places = match map.get("Places") {
                    Some(Value::Object(places)) => places,
                    Some(other) => return Self::from_value(other),
                    None => map,
                };
                RawItinerary::Keyed(
                    places
                        .iter()
                        .filter_map(|(name, record)| {
                            decode_record(record).map(|r| (name.clone(), r))
                        })
                        .collect(),
                )
            }
            other => {
                debug!("Ignoring itinerary payload of unexpected type — value={}", other);
                RawItinerary::Empty
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RawItinerary::Empty => 0,
            RawItinerary::Keyed(entries) => entries.len(),
            RawItinerary::Records(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_items(self) -> Vec<ItineraryItem> {
        match self {
            RawItinerary::Empty => Vec::new(),
            RawItinerary::Keyed(entries) => entries
                .into_iter()
                .map(|(name, record)| record.into_item(Some(name)))
                .collect(),
            RawItinerary::Records(records) => {
                records.into_iter().map(|r| r.into_item(None)).collect()
            }
        }
    }
}

fn decode_record(value: &Value) -> Option<RawRecord> {
    if !value.is_object() {
        debug!("Skipping non-object itinerary record — value={}", value);
        return None;
    }
    match serde_json::from_value(value.clone()) {
        Ok(record) => Some(record),
        Err(e) => {
            debug!("Skipping undecodable itinerary record — error={}", e);
            None
        }
    }
}

impl RawRecord {
    /// `key` is the place name of the keyed shape; it wins over any title field.
    pub fn into_item(self, key: Option<String>) -> ItineraryItem {
        let title = key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| first_text(&[&self.title, &self.place, &self.name]))
            .unwrap_or_else(|| UNTITLED.to_string());

        ItineraryItem {
            time: self.resolve_time(),
            category: first_text(&[&self.category, &self.kind])
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            price: format_price(first_present(&[&self.price, &self.cost])),
            description: first_text(&[&self.description, &self.notes]).unwrap_or_default(),
            coordinates: self.coordinates.as_ref().and_then(parse_coordinates),
            title,
        }
    }

    fn resolve_time(&self) -> String {
        match &self.time {
            Some(Value::Array(pair)) if pair.len() == 2 => {
                return format!("{} - {}", time_text(&pair[0]), time_text(&pair[1]));
            }
            Some(Value::String(s)) if !s.trim().is_empty() => return s.clone(),
            Some(Value::Number(n)) => {
                if let Some(t) = n.as_f64() {
                    return format_time(t);
                }
            }
            _ => {}
        }

        let start = first_time(&[&self.start_time, &self.start]);
        let end = first_time(&[&self.end_time, &self.end]);
        match (start, end) {
            (Some(s), Some(e)) => format!("{} - {}", s, e),
            (Some(s), None) => s,
            (None, Some(e)) => e,
            (None, None) => String::new(),
        }
    }
}

/// Formats fractional hours as `H:MM`, e.g. `10.5` -> `"10:30"`.
pub fn format_time(hours: f64) -> String {
    if !hours.is_finite() {
        return String::new();
    }
    let mut whole = hours.trunc() as i64;
    let mut minutes = ((hours - hours.trunc()) * 60.0).round().abs() as i64;
    if minutes >= 60 {
        whole += if hours < 0.0 { -1 } else { 1 };
        minutes -= 60;
    }
    format!("{}:{:02}", whole, minutes)
}

pub fn format_price(price: Option<&Value>) -> String {
    match price {
        None | Some(Value::Null) => PRICE_PLACEHOLDER.to_string(),
        Some(Value::String(s)) if s.is_empty() => PRICE_PLACEHOLDER.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match n.as_f64() {
            // Generators emit `15.0` for whole prices.
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("${}", f as i64)
            }
            _ => format!("${}", n),
        },
        Some(other) => other.to_string(),
    }
}

/// Normalizes a raw generator payload into canonical items, in source order.
pub fn normalize(value: &Value) -> Vec<ItineraryItem> {
    RawItinerary::from_value(value).into_items()
}

/// Runs canonical items back through the normalizer. Returns an equal list.
pub fn normalize_items(items: &[ItineraryItem]) -> Vec<ItineraryItem> {
    match serde_json::to_value(items) {
        Ok(value) => normalize(&value),
        Err(_) => items.to_vec(),
    }
}

fn time_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.as_f64().map(format_time).unwrap_or_default(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn first_time(candidates: &[&Option<Value>]) -> Option<String> {
    candidates
        .iter()
        .copied()
        .filter_map(Option::as_ref)
        .map(time_text)
        .find(|s| !s.is_empty())
}

fn first_text(candidates: &[&Option<Value>]) -> Option<String> {
    candidates.iter().copied().filter_map(Option::as_ref).find_map(|v| match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn first_present<'a>(candidates: &[&'a Option<Value>]) -> Option<&'a Value> {
    candidates
        .iter()
        .copied()
        .filter_map(Option::as_ref)
        .find(|v| !matches!(v, Value::Null) && v.as_str() != Some(""))
}

fn parse_coordinates(value: &Value) -> Option<LatLng> {
    let lat = value.get("lat")?.as_f64()?;
    let lng = value.get("lng").or_else(|| value.get("lon"))?.as_f64()?;
    Some(LatLng::new(lat, lng))
}
