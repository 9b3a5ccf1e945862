// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::geo::{BoundingBox, LatLng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportOptions {
    /// Shown when nothing is resolved yet.
    pub fallback_center: LatLng,
    pub fallback_zoom: f64,
    pub single_point_zoom: f64,
    /// Symmetric fit-to-bounds padding in pixels.
    pub padding: u32,
}

impl Default for ViewportOptions {
    fn default() -> Self {
        Self {
            fallback_center: LatLng::new(20.0, 0.0),
            fallback_zoom: 2.0,
            single_point_zoom: 13.0,
            padding: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: LatLng,
    /// Only set with zero or one point; with more the map fits `bounds`.
    pub zoom: Option<f64>,
    pub bounds: Vec<[f64; 2]>,
    pub padding: [u32; 2],
}

impl Viewport {
    pub fn fits_bounds(&self) -> bool {
        self.zoom.is_none()
    }

    pub fn extent(&self) -> Option<BoundingBox> {
        let points: Vec<LatLng> = self.bounds.iter().copied().map(LatLng::from).collect();
        BoundingBox::from_points(&points)
    }
}

pub fn compute_viewport(track: &[Option<LatLng>], opts: &ViewportOptions) -> Viewport {
    let points: Vec<LatLng> = track.iter().flatten().copied().collect();

    let center = points.first().copied().unwrap_or(opts.fallback_center);
    let zoom = match points.len() {
        0 => Some(opts.fallback_zoom),
        1 => Some(opts.single_point_zoom),
        _ => None,
    };

    Viewport {
        center,
        zoom,
        bounds: points.iter().map(LatLng::as_pair).collect(),
        padding: [opts.padding, opts.padding],
    }
}
