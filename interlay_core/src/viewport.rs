// Copyright 2026 the Interlay Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host camera → engine view state.
//!
//! [`compute_view_state`] reads the host map camera and produces the
//! [`ViewState`] the engine renders with. It is a pure function of host state
//! at call time.
//!
//! # Terrain
//!
//! When the host renders terrain, its camera targets the terrain surface
//! rather than sea level, and some hosts rewrite zoom accordingly. Drawing the
//! overlay with the raw zoom makes it drift away from the base map at high
//! pitch, so the view state is corrected:
//!
//! - [`Terrain::FreeCamera`]: zoom is recomputed from the camera's ground
//!   distance to the center, and a vertical offset places the virtual camera
//!   target on the surface.
//! - [`Terrain::Elevation`]: the reported elevation becomes the vertical
//!   offset; zoom is left alone.

use std::f64::consts::PI;

use kurbo::Insets;

use crate::engine::{MAP_VIEW_ID, Viewport};
use crate::host::{CameraPosition, HostMap, Terrain};

/// Size of a world tile in the engine's common space.
pub const TILE_SIZE: f64 = 512.0;

/// Earth circumference used by the web-mercator helpers, in meters.
pub const EARTH_CIRCUMFERENCE: f64 = 40.03e6;

const DEGREES_TO_RADIANS: f64 = PI / 180.0;

/// Camera height above the viewport, in multiples of its pixel height.
const ALTITUDE_FACTOR: f64 = 1.5;

/// Camera parameters of one redraw.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewState {
    /// Longitude in degrees, in `[-180, 180)`.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Zoom level.
    pub zoom: f64,
    /// Bearing in degrees.
    pub bearing: f64,
    /// Pitch in degrees.
    pub pitch: f64,
    /// Screen padding around the center.
    pub padding: Insets,
    /// Whether the world repeats horizontally.
    pub repeat: bool,
    /// Offset of the camera target in meters, set when terrain is active.
    pub position: Option<[f64; 3]>,
}

/// Wraps a longitude into `[-180, 180)`.
#[must_use]
pub fn normalize_longitude(lng: f64) -> f64 {
    (lng + 540.0).rem_euclid(360.0) - 180.0
}

/// Projects a longitude/latitude to the engine's zoom-0 common space.
#[must_use]
pub fn lng_lat_to_world(lng: f64, lat: f64) -> [f64; 2] {
    let lambda = lng * DEGREES_TO_RADIANS;
    let phi = lat * DEGREES_TO_RADIANS;
    let x = TILE_SIZE * (lambda + PI) / (2.0 * PI);
    let y = TILE_SIZE * (PI + (PI / 4.0 + phi * 0.5).tan().ln()) / (2.0 * PI);
    [x, y]
}

/// Common-space units per meter at the given latitude.
#[must_use]
pub fn units_per_meter(latitude: f64) -> f64 {
    let lat_cosine = (latitude * DEGREES_TO_RADIANS).cos();
    TILE_SIZE / EARTH_CIRCUMFERENCE / lat_cosine
}

/// Reads the host camera and returns the matching engine view state.
#[must_use]
pub fn compute_view_state(map: &dyn HostMap) -> ViewState {
    let center = map.center();
    let mut view_state = ViewState {
        // Hosts report longitudes outside [-180, 180] when zooming near the
        // antimeridian.
        longitude: normalize_longitude(center.lng),
        latitude: center.lat,
        zoom: map.zoom(),
        bearing: map.bearing(),
        pitch: map.pitch(),
        padding: map.padding(),
        repeat: map.render_world_copies(),
        position: None,
    };

    if let Some(terrain) = map.terrain() {
        center_camera_on_terrain(&terrain, &mut view_state);
    }

    view_state
}

fn center_camera_on_terrain(terrain: &Terrain, view_state: &mut ViewState) {
    match *terrain {
        Terrain::FreeCamera {
            position,
            viewport_height,
        } => {
            let Some(CameraPosition { x, y, z: Some(z) }) = position else {
                return;
            };

            // Host mercator coordinates are in [0, 1] with y pointing south.
            let camera_x = x * TILE_SIZE;
            let camera_y = (1.0 - y) * TILE_SIZE;
            let camera_z = z * TILE_SIZE;

            let [center_x, center_y] = lng_lat_to_world(view_state.longitude, view_state.latitude);
            let ground_distance = (camera_x - center_x).hypot(camera_y - center_y);

            let pitch = view_state.pitch * DEGREES_TO_RADIANS;
            let altitude_pixels = ALTITUDE_FACTOR * viewport_height;
            let scale = altitude_pixels * pitch.sin() / ground_distance;
            view_state.zoom = scale.log2();

            let camera_z_from_surface = altitude_pixels * pitch.cos() / scale;
            let surface_elevation = camera_z - camera_z_from_surface;
            view_state.position = Some([
                0.0,
                0.0,
                surface_elevation / units_per_meter(view_state.latitude),
            ]);
        }
        Terrain::Elevation(elevation) => {
            view_state.position = Some([0.0, 0.0, elevation]);
        }
    }
}

/// Builds the map viewport for a `width × height` canvas.
#[must_use]
pub fn map_viewport(
    view_state: ViewState,
    width: f64,
    height: f64,
    near_z_multiplier: f64,
) -> Viewport {
    Viewport {
        id: MAP_VIEW_ID.into(),
        x: 0.0,
        y: 0.0,
        width,
        height,
        view_state,
        near_z_multiplier,
    }
}
