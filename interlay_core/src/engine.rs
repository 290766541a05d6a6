// Copyright 2026 the Interlay Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contract for the GPU layer-rendering engine.
//!
//! The engine is an external collaborator. Interlay never draws anything
//! itself; it decides *when* the engine draws, *which* layers it draws, and
//! *with which viewport*. An engine integration implements [`RenderEngine`]
//! and an [`EngineFactory`] that builds instances from [`EngineProps`].
//!
//! Engines are shared between the [`ContextRegistry`], the per-layer shims
//! and the control that created them, so they are handled as
//! [`SharedEngine`] (`Rc<RefCell<dyn RenderEngine>>`).
//!
//! [`ContextRegistry`]: crate::registry::ContextRegistry

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use kurbo::{Point, Rect, Size};

use crate::error::CompositorError;
use crate::host::SurfaceHandle;
use crate::id::{CanvasId, GlContextId};
use crate::layer::{LayerList, empty_list};
use crate::viewport::ViewState;

/// Id of the view (and viewport) that follows the host map camera.
pub const MAP_VIEW_ID: &str = "mapbox";

/// Near-plane multiplier matching the host map's projection matrix.
pub const HOST_NEAR_Z_MULTIPLIER: f64 = 0.02;

/// The engine's own default near-plane multiplier.
pub const ENGINE_NEAR_Z_MULTIPLIER: f64 = 0.1;

/// A shared, dynamically typed engine instance.
pub type SharedEngine = Rc<RefCell<dyn RenderEngine>>;

/// Decides whether a layer is drawn into a viewport.
pub type LayerFilter = Rc<dyn Fn(&FilterContext<'_>) -> bool>;

/// Invoked by the engine when it wants a new frame.
pub type RenderHook = Rc<dyn Fn()>;

/// Blend factors used by [`GpuParameters::blend_func`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// `ONE`
    One,
    /// `SRC_ALPHA`
    SrcAlpha,
    /// `ONE_MINUS_SRC_ALPHA`
    OneMinusSrcAlpha,
}

/// Depth comparison function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DepthFunc {
    /// `LESS`
    Less,
    /// `LEQUAL`
    LessEqual,
    /// `ALWAYS`
    Always,
}

/// Blend equation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendEquation {
    /// `FUNC_ADD`
    Add,
    /// `FUNC_SUBTRACT`
    Subtract,
}

/// GPU pipeline state the engine applies before drawing.
///
/// Every field is optional so user-supplied parameters can override
/// [`interleaved defaults`](Self::interleaved_defaults) key by key.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GpuParameters {
    /// Write to the depth buffer.
    pub depth_mask: Option<bool>,
    /// Depth-test against existing contents.
    pub depth_test: Option<bool>,
    /// Enable blending.
    pub blend: Option<bool>,
    /// `[src_rgb, dst_rgb, src_alpha, dst_alpha]`.
    pub blend_func: Option<[BlendFactor; 4]>,
    /// Enable polygon offset for filled polygons.
    pub polygon_offset_fill: Option<bool>,
    /// Depth comparison.
    pub depth_func: Option<DepthFunc>,
    /// Blend equation.
    pub blend_equation: Option<BlendEquation>,
}

impl GpuParameters {
    /// State needed to draw correctly inside the host's own render pass.
    #[must_use]
    pub const fn interleaved_defaults() -> Self {
        Self {
            depth_mask: Some(true),
            depth_test: Some(true),
            blend: Some(true),
            blend_func: Some([
                BlendFactor::SrcAlpha,
                BlendFactor::OneMinusSrcAlpha,
                BlendFactor::One,
                BlendFactor::OneMinusSrcAlpha,
            ]),
            polygon_offset_fill: Some(true),
            depth_func: Some(DepthFunc::LessEqual),
            blend_equation: Some(BlendEquation::Add),
        }
    }

    /// Returns `self` with every field that `overrides` sets replaced.
    #[must_use]
    pub fn overridden_by(self, overrides: &Self) -> Self {
        Self {
            depth_mask: overrides.depth_mask.or(self.depth_mask),
            depth_test: overrides.depth_test.or(self.depth_test),
            blend: overrides.blend.or(self.blend),
            blend_func: overrides.blend_func.or(self.blend_func),
            polygon_offset_fill: overrides.polygon_offset_fill.or(self.polygon_offset_fill),
            depth_func: overrides.depth_func.or(self.depth_func),
            blend_equation: overrides.blend_equation.or(self.blend_equation),
        }
    }
}

/// A view the engine renders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewDescriptor {
    /// View id; viewports produced for it carry the same id.
    pub id: String,
}

impl ViewDescriptor {
    /// The map view that follows the host camera.
    #[must_use]
    pub fn map_view() -> Self {
        Self {
            id: MAP_VIEW_ID.into(),
        }
    }
}

/// Construction and update properties of an engine instance.
#[derive(Clone)]
pub struct EngineProps {
    /// GL context to draw into. `None` lets the engine create its own.
    pub gl: Option<GlContextId>,
    /// Canvas width. `None` means the host owns the canvas size.
    pub width: Option<f64>,
    /// Canvas height. `None` means the host owns the canvas size.
    pub height: Option<f64>,
    /// Camera state.
    pub view_state: Option<ViewState>,
    /// Views to render.
    pub views: Vec<ViewDescriptor>,
    /// GPU pipeline state.
    pub parameters: GpuParameters,
    /// Layers to draw.
    pub layers: LayerList,
    /// Render at device pixel resolution.
    pub use_device_pixels: bool,
    /// CSS `touch-action` for the engine's own event handling.
    pub touch_action: Option<String>,
    /// User layer filter, applied on top of the compositor's own filters.
    pub layer_filter: Option<LayerFilter>,
    /// Called by the engine instead of scheduling its own frame.
    pub custom_render: Option<RenderHook>,
    /// Surface the engine attaches its canvas to (overlaid mode).
    pub parent: Option<SurfaceHandle>,
}

impl Default for EngineProps {
    fn default() -> Self {
        Self {
            gl: None,
            width: None,
            height: None,
            view_state: None,
            views: Vec::new(),
            parameters: GpuParameters::default(),
            layers: empty_list(),
            use_device_pixels: true,
            touch_action: None,
            layer_filter: None,
            custom_render: None,
            parent: None,
        }
    }
}

impl fmt::Debug for EngineProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineProps")
            .field("gl", &self.gl)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("view_state", &self.view_state)
            .field("views", &self.views)
            .field("parameters", &self.parameters)
            .field("layers_len", &self.layers.len())
            .field("use_device_pixels", &self.use_device_pixels)
            .field("touch_action", &self.touch_action)
            .field("layer_filter", &self.layer_filter.is_some())
            .field("custom_render", &self.custom_render.is_some())
            .field("parent", &self.parent.is_some())
            .finish()
    }
}

/// Applies the props every interleaved engine needs.
///
/// User GPU parameters override [`GpuParameters::interleaved_defaults`] key by
/// key, and a lone [map view](ViewDescriptor::map_view) is used when the
/// caller supplied no views.
#[must_use]
pub fn interleaved_props(mut props: EngineProps) -> EngineProps {
    props.parameters = GpuParameters::interleaved_defaults().overridden_by(&props.parameters);
    if props.views.is_empty() {
        props.views.push(ViewDescriptor::map_view());
    }
    props
}

/// A camera plus the screen rectangle it renders to.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    /// Id of the view this viewport belongs to.
    pub id: String,
    /// Left edge in pixels.
    pub x: f64,
    /// Top edge in pixels.
    pub y: f64,
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
    /// Camera.
    pub view_state: ViewState,
    /// Near-plane distance as a multiple of the camera altitude.
    pub near_z_multiplier: f64,
}

/// What a layer filter is asked about.
#[derive(Clone, Copy, Debug)]
pub struct FilterContext<'a> {
    /// Layer being considered.
    pub layer_id: &'a str,
    /// Viewport it would be drawn into.
    pub viewport_id: &'a str,
}

/// One partial draw request.
pub struct DrawPass<'a> {
    /// Why the pass happens (diagnostics only).
    pub reason: &'static str,
    /// Viewports to draw.
    pub viewports: Vec<Viewport>,
    /// Layers for which this returns `false` are skipped.
    pub layer_filter: &'a dyn Fn(&FilterContext<'_>) -> bool,
    /// Reset the engine's per-frame layer stack before drawing.
    pub clear_stack: bool,
    /// Clear the canvas before drawing.
    pub clear_canvas: bool,
}

impl fmt::Debug for DrawPass<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawPass")
            .field("reason", &self.reason)
            .field("viewports", &self.viewports)
            .field("clear_stack", &self.clear_stack)
            .field("clear_canvas", &self.clear_canvas)
            .finish_non_exhaustive()
    }
}

/// Pointer event in the engine's own event model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnginePointerEvent {
    /// Event type as the engine understands it.
    pub kind: EngineEventKind,
    /// Position relative to the canvas.
    pub offset_center: Point,
    /// Click count; `0` for non-click events.
    pub tap_count: u8,
}

/// Engine-side event types produced from host pointer events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EngineEventKind {
    /// Pointer moved over the canvas.
    PointerMove,
    /// Pointer left the canvas.
    PointerLeave,
    /// Click (single or synthesized double).
    Click,
}

/// Picking at a point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PickOptions {
    /// Canvas position.
    pub point: Point,
    /// Search radius in pixels.
    pub radius: f64,
    /// Restrict picking to these layers.
    pub layer_ids: Option<Vec<String>>,
}

/// Picking every object in a rectangle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PickRectOptions {
    /// Canvas rectangle.
    pub rect: Rect,
    /// Restrict picking to these layers.
    pub layer_ids: Option<Vec<String>>,
    /// Stop after this many objects.
    pub max_objects: Option<usize>,
}

/// Picking overlapping objects at a point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PickMultipleOptions {
    /// Canvas position.
    pub point: Point,
    /// Search radius in pixels.
    pub radius: f64,
    /// Restrict picking to these layers.
    pub layer_ids: Option<Vec<String>>,
    /// Maximum number of overlapping objects.
    pub depth: Option<usize>,
}

/// One picked object.
#[derive(Clone, Debug, PartialEq)]
pub struct PickInfo {
    /// Layer that drew the object.
    pub layer_id: String,
    /// Index of the object within its layer's data.
    pub index: usize,
    /// Canvas position of the pick.
    pub point: Point,
}

/// An engine instance.
///
/// Readiness is reported separately for the layer manager (needed to draw)
/// and the view manager (needed to accept camera updates), since engines
/// initialize them asynchronously after construction.
pub trait RenderEngine {
    /// Current props.
    fn props(&self) -> &EngineProps;

    /// Replaces the props.
    fn set_props(&mut self, props: EngineProps);

    /// Replaces only the camera state.
    fn set_view_state(&mut self, view_state: ViewState);

    /// Whether layers can be drawn.
    fn is_layer_manager_ready(&self) -> bool;

    /// Whether camera updates are accepted.
    fn is_view_manager_ready(&self) -> bool;

    /// Drawing buffer size.
    fn size(&self) -> Size;

    /// Viewports derived from the current views.
    fn viewports(&self) -> Vec<Viewport>;

    /// Draws the layers selected by `pass` into the current frame.
    fn draw_layers(&mut self, pass: &DrawPass<'_>);

    /// Picks the closest object at a point.
    fn pick_object(&mut self, options: &PickOptions) -> Option<PickInfo>;

    /// Picks every object inside a rectangle.
    fn pick_objects(&mut self, options: &PickRectOptions) -> Vec<PickInfo>;

    /// Picks overlapping objects at a point.
    fn pick_multiple_objects(&mut self, options: &PickMultipleOptions) -> Vec<PickInfo>;

    /// Pointer went down (performs picking for the following click).
    fn on_pointer_down(&mut self, event: &EnginePointerEvent);

    /// Pointer moved or left.
    fn on_pointer_move(&mut self, event: &EnginePointerEvent);

    /// Generic gesture event (clicks).
    fn on_event(&mut self, event: &EnginePointerEvent);

    /// Drops pending redraw requests.
    fn clear_redraw_flags(&mut self);

    /// Redraws immediately if anything changed.
    fn redraw(&mut self);

    /// Canvas the engine draws into, once it has one.
    fn canvas(&self) -> Option<CanvasId>;

    /// Releases every GPU and DOM resource.
    fn finalize(&mut self);
}

/// Builds engine instances.
pub trait EngineFactory {
    /// Creates an instance from `props`.
    ///
    /// # Errors
    ///
    /// Returns [`CompositorError::EngineCreation`] if the instance cannot be
    /// built.
    fn create(&self, props: EngineProps) -> Result<SharedEngine, CompositorError>;
}
