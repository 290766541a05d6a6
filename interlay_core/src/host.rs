// Copyright 2026 the Interlay Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contract for the host map renderer.
//!
//! The host map owns the DOM surface, the GL context, the camera and an
//! imperative stack of native layers. Interlay talks to it through three
//! traits:
//!
//! - [`HostMap`]: what the compositor reads from and does to the map (camera
//!   getters, layer stack editing, event subscription).
//! - [`CustomLayer`]: the host's plugin contract for a layer drawn by foreign
//!   code inside the host's paint order. Implemented by
//!   [`LayerShim`](crate::shim::LayerShim).
//! - [`Control`]: the host's plugin contract for a UI control attached to the
//!   map. Implemented by
//!   [`CompositorControl`](crate::control::CompositorControl).
//!
//! # Listeners
//!
//! Listeners receive the map itself as an argument, so compositor state never
//! needs to hold a map reference. A host must not hold any internal borrow
//! while invoking a listener, since listeners call back into the map.
//!
//! # Custom layers
//!
//! [`HostMap::add_layer`] must call [`CustomLayer::on_add`] and
//! [`HostMap::remove_layer`] must call [`CustomLayer::on_remove`]. On each
//! repaint the host calls [`CustomLayer::render`] for every custom layer in
//! stack order and then fires [`MapEventKind::Render`].

use std::cell::RefCell;
use std::rc::Rc;

use kurbo::{Insets, Point, Size};

use crate::error::CompositorError;
use crate::id::{GlContextId, ListenerId, MapId};
use crate::layer::{LayerProps, RenderingMode};

/// A shared custom layer as stored in the host's layer stack.
pub type CustomLayerRef = Rc<RefCell<dyn CustomLayer>>;

/// A shared overlay surface.
pub type SurfaceHandle = Rc<RefCell<dyn OverlaySurface>>;

/// A host event listener.
pub type Listener = Rc<dyn Fn(&mut dyn HostMap, &MapEvent)>;

/// A geographic position in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LngLat {
    /// Longitude. Hosts may report values outside `[-180, 180]`.
    pub lng: f64,
    /// Latitude.
    pub lat: f64,
}

impl LngLat {
    /// Creates a position.
    #[must_use]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

/// Camera position in host mercator units (`[0, 1]` across the world).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPosition {
    /// Mercator x.
    pub x: f64,
    /// Mercator y, pointing south.
    pub y: f64,
    /// Altitude in mercator units, if known.
    pub z: Option<f64>,
}

/// Terrain state reported by the host.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Terrain {
    /// The host exposes a free camera whose position is above the terrain.
    FreeCamera {
        /// Camera position, if the host has computed one.
        position: Option<CameraPosition>,
        /// Height of the host viewport in CSS pixels.
        viewport_height: f64,
    },
    /// The host exposes only the elevation of the center point, in meters.
    Elevation(f64),
}

/// Host events the compositor subscribes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MapEventKind {
    /// The camera moved.
    Move,
    /// A repaint finished drawing every layer.
    Render,
    /// The container was resized.
    Resize,
    /// The style (and possibly the whole layer stack) changed.
    StyleData,
    /// The map is being destroyed.
    Remove,
    /// No tiles or style resources are pending.
    Idle,
    /// Pointer moved over the map.
    MouseMove,
    /// Pointer left the map.
    MouseOut,
    /// Single click.
    Click,
    /// Double click.
    DblClick,
}

/// Host pointer event types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerKind {
    /// `mousemove`
    MouseMove,
    /// `mouseout`
    MouseOut,
    /// `click`
    Click,
    /// `dblclick`
    DblClick,
}

impl PointerKind {
    /// The event kind to subscribe to for this pointer type.
    #[must_use]
    pub const fn event_kind(self) -> MapEventKind {
        match self {
            Self::MouseMove => MapEventKind::MouseMove,
            Self::MouseOut => MapEventKind::MouseOut,
            Self::Click => MapEventKind::Click,
            Self::DblClick => MapEventKind::DblClick,
        }
    }
}

/// A pointer event in host coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerInput {
    /// Event type.
    pub kind: PointerKind,
    /// Position relative to the map container.
    pub point: Point,
}

/// An event fired by the host.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MapEvent {
    /// The camera moved.
    Move,
    /// A repaint finished.
    Render,
    /// The container was resized.
    Resize,
    /// The style changed.
    StyleData,
    /// The map is being destroyed.
    Remove,
    /// Nothing is loading.
    Idle,
    /// Pointer activity.
    Pointer(PointerInput),
}

impl MapEvent {
    /// The subscription kind that receives this event.
    #[must_use]
    pub const fn kind(&self) -> MapEventKind {
        match self {
            Self::Move => MapEventKind::Move,
            Self::Render => MapEventKind::Render,
            Self::Resize => MapEventKind::Resize,
            Self::StyleData => MapEventKind::StyleData,
            Self::Remove => MapEventKind::Remove,
            Self::Idle => MapEventKind::Idle,
            Self::Pointer(input) => input.kind.event_kind(),
        }
    }
}

/// The host map renderer as seen by the compositor.
pub trait HostMap {
    /// Identity of this map instance.
    fn id(&self) -> MapId;

    /// Camera center.
    fn center(&self) -> LngLat;

    /// Camera zoom.
    fn zoom(&self) -> f64;

    /// Camera bearing in degrees.
    fn bearing(&self) -> f64;

    /// Camera pitch in degrees.
    fn pitch(&self) -> f64;

    /// Screen padding.
    fn padding(&self) -> Insets;

    /// Whether the world is repeated horizontally.
    fn render_world_copies(&self) -> bool;

    /// Active terrain, if any.
    fn terrain(&self) -> Option<Terrain>;

    /// Size of the map container in CSS pixels.
    fn container_size(&self) -> Size;

    /// The GL context the map paints with.
    fn gl_context(&self) -> GlContextId;

    /// Whether style and layer metadata finished loading.
    fn is_style_loaded(&self) -> bool;

    /// Ids of every native layer, bottom to top.
    fn layer_order(&self) -> Vec<String>;

    /// Whether a layer with this id exists.
    fn has_layer(&self, id: &str) -> bool;

    /// The custom layer registered under `id`, if it is one.
    fn custom_layer(&self, id: &str) -> Option<CustomLayerRef>;

    /// Inserts a custom layer before `before_id`, or on top when `None`.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by [`CustomLayer::on_add`]; the layer is
    /// not inserted in that case.
    fn add_layer(
        &mut self,
        layer: CustomLayerRef,
        before_id: Option<&str>,
    ) -> Result<(), CompositorError>;

    /// Removes a layer. Unknown ids are ignored.
    fn remove_layer(&mut self, id: &str);

    /// Moves a layer before `before_id`, or to the top when `None`.
    fn move_layer(&mut self, id: &str, before_id: Option<&str>);

    /// Registers a listener.
    fn subscribe(&mut self, kind: MapEventKind, listener: Listener) -> ListenerId;

    /// Detaches a listener. Returns `false` if it was not attached.
    fn unsubscribe(&mut self, id: ListenerId) -> bool;

    /// A callable that schedules a host repaint.
    fn repaint_trigger(&self) -> Rc<dyn Fn()>;
}

/// The host's custom-layer plugin contract.
pub trait CustomLayer {
    /// Layer id, unique in the host stack.
    fn id(&self) -> &str;

    /// How the layer interacts with host depth.
    fn rendering_mode(&self) -> RenderingMode;

    /// Called when the layer enters the host stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer cannot attach; the host then drops it.
    fn on_add(&mut self, map: &mut dyn HostMap, gl: GlContextId) -> Result<(), CompositorError>;

    /// Called when the layer leaves the host stack.
    fn on_remove(&mut self, map: &mut dyn HostMap);

    /// Draws the layer into the current host frame.
    fn render(&mut self, map: &dyn HostMap);

    /// Pushes new declarative props into the layer.
    fn set_props(&mut self, props: &LayerProps);
}

/// Where the host places a control's element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ControlPosition {
    /// Top-left corner.
    #[default]
    TopLeft,
    /// Top-right corner.
    TopRight,
    /// Bottom-left corner.
    BottomLeft,
    /// Bottom-right corner.
    BottomRight,
}

/// The host's control plugin contract.
pub trait Control {
    /// Called when the control is attached; returns the element to mount.
    ///
    /// # Errors
    ///
    /// Returns an error if the control cannot initialize.
    fn on_add(&mut self, map: &mut dyn HostMap) -> Result<SurfaceHandle, CompositorError>;

    /// Called when the control is detached.
    fn on_remove(&mut self, map: &mut dyn HostMap);

    /// Preferred placement.
    fn default_position(&self) -> ControlPosition {
        ControlPosition::TopLeft
    }
}

/// An element stacked over (or mounted into) the host map.
pub trait OverlaySurface {
    /// Resizes the element to `size` CSS pixels.
    fn resize(&mut self, size: Size);

    /// Current size, if one was set.
    fn size(&self) -> Option<Size>;
}

/// Creates overlay surfaces.
pub trait SurfaceFactory {
    /// Creates a surface. `overlay` requests an absolutely positioned,
    /// pointer-transparent element; otherwise a plain placeholder element.
    ///
    /// # Errors
    ///
    /// Returns [`CompositorError::SurfaceCreation`] if the element cannot be
    /// created.
    fn create(&self, overlay: bool) -> Result<SurfaceHandle, CompositorError>;
}
