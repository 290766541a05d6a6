// Copyright 2026 the Interlay Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host control that owns an engine for one map.
//!
//! [`CompositorControl`] is what applications attach to a host map. Its mode
//! is fixed at construction:
//!
//! - **Interleaved**: the engine draws into the host's GL context, and every
//!   logical layer becomes a [`LayerShim`](crate::shim::LayerShim) in the
//!   host's own paint order. The control keeps the host stack reconciled
//!   with its layer list, including after style changes.
//! - **Overlaid**: the engine draws into its own transparent surface stacked
//!   above the map. The control keeps the surface sized to the map, pushes
//!   the camera on every host render, and forwards pointer input (see
//!   [`pointer`](crate::pointer)).
//!
//! In both modes a capture hook can be installed to receive the engine canvas
//! whenever the map goes idle.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use kurbo::Size;

use crate::engine::{
    EngineProps, GpuParameters, LayerFilter, PickInfo, PickMultipleOptions, PickOptions,
    PickRectOptions, SharedEngine, interleaved_props,
};
use crate::error::CompositorError;
use crate::host::{
    Control, HostMap, Listener, MapEvent, MapEventKind, OverlaySurface, PointerKind,
    SurfaceHandle,
};
use crate::id::{CanvasId, ListenerId, MapId};
use crate::layer::{LayerList, LayerProps, empty_list, flatten_checked};
use crate::pointer;
use crate::reconcile::{check_native_ids, reconcile};
use crate::registry::ContextRegistry;
use crate::trace::{ErrorEvent, ErrorSource, PointerEvent};
use crate::viewport::{ViewState, compute_view_state};

/// Receives the engine canvas when the host map goes idle.
pub type CaptureHook = Rc<dyn Fn(CanvasId)>;

/// Construction options of a [`CompositorControl`].
#[derive(Clone)]
pub struct OverlayOptions {
    /// Draw inside the host's paint order instead of on a separate surface.
    pub interleaved: bool,
    /// Layers to draw.
    pub layers: LayerList,
    /// Initial camera. Only meaningful until the host pushes its own.
    pub view_state: Option<ViewState>,
    /// GPU state overrides.
    pub parameters: GpuParameters,
    /// User layer filter.
    pub layer_filter: Option<LayerFilter>,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            interleaved: false,
            layers: empty_list(),
            view_state: None,
            parameters: GpuParameters::default(),
            layer_filter: None,
        }
    }
}

impl fmt::Debug for OverlayOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayOptions")
            .field("interleaved", &self.interleaved)
            .field("layers_len", &self.layers.len())
            .field("view_state", &self.view_state)
            .field("parameters", &self.parameters)
            .field("layer_filter", &self.layer_filter.is_some())
            .finish()
    }
}

/// A partial update for [`CompositorControl::set_props`]. `None` fields are
/// left unchanged.
#[derive(Clone, Default)]
pub struct ControlUpdate {
    /// New layer list.
    pub layers: Option<LayerList>,
    /// New camera.
    pub view_state: Option<ViewState>,
    /// New GPU state overrides.
    pub parameters: Option<GpuParameters>,
    /// New user layer filter.
    pub layer_filter: Option<LayerFilter>,
}

impl fmt::Debug for ControlUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlUpdate")
            .field("layers_len", &self.layers.as_ref().map(|l| l.len()))
            .field("view_state", &self.view_state)
            .field("parameters", &self.parameters)
            .field("layer_filter", &self.layer_filter.is_some())
            .finish()
    }
}

impl ControlUpdate {
    /// An update that only replaces the layer list.
    #[must_use]
    pub fn layers(layers: LayerList) -> Self {
        Self {
            layers: Some(layers),
            ..Self::default()
        }
    }
}

/// Element handed to the host in interleaved mode, where nothing is mounted.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlaceholderSurface {
    size: Option<Size>,
}

impl OverlaySurface for PlaceholderSurface {
    fn resize(&mut self, size: Size) {
        self.size = Some(size);
    }

    fn size(&self) -> Option<Size> {
        self.size
    }
}

enum Mode {
    Interleaved,
    Overlaid { surface: SurfaceHandle },
}

struct Attached {
    map_id: MapId,
    engine: SharedEngine,
    owns_engine: bool,
    mode: Mode,
    listeners: Vec<ListenerId>,
}

struct ControlState {
    options: OverlayOptions,
    attached: Option<Attached>,
    capture_hook: Option<CaptureHook>,
}

/// Host control drawing a layer list over (or into) one map.
pub struct CompositorControl {
    registry: ContextRegistry,
    state: Rc<RefCell<ControlState>>,
}

impl fmt::Debug for CompositorControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("CompositorControl")
            .field("options", &state.options)
            .field("map", &state.attached.as_ref().map(|a| a.map_id))
            .field("capture_hook", &state.capture_hook.is_some())
            .finish_non_exhaustive()
    }
}

impl CompositorControl {
    /// Creates a detached control.
    #[must_use]
    pub fn new(options: OverlayOptions, registry: ContextRegistry) -> Self {
        Self {
            registry,
            state: Rc::new(RefCell::new(ControlState {
                options,
                attached: None,
                capture_hook: None,
            })),
        }
    }

    /// Whether the control draws in the host's paint order.
    #[must_use]
    pub fn is_interleaved(&self) -> bool {
        self.state.borrow().options.interleaved
    }

    /// Whether the control is attached to a map.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.state.borrow().attached.is_some()
    }

    /// The current layer list.
    #[must_use]
    pub fn layers(&self) -> LayerList {
        self.state.borrow().options.layers.clone()
    }

    /// The engine, once attached.
    #[must_use]
    pub fn engine(&self) -> Option<SharedEngine> {
        self.state
            .borrow()
            .attached
            .as_ref()
            .map(|a| Rc::clone(&a.engine))
    }

    /// The overlay surface, once attached in overlaid mode.
    #[must_use]
    pub fn surface(&self) -> Option<SurfaceHandle> {
        match &self.state.borrow().attached.as_ref()?.mode {
            Mode::Overlaid { surface } => Some(Rc::clone(surface)),
            Mode::Interleaved => None,
        }
    }

    /// Installs the hook called with the engine canvas on every host `idle`.
    pub fn set_capture_hook(&self, hook: CaptureHook) {
        self.state.borrow_mut().capture_hook = Some(hook);
    }

    /// Removes the capture hook.
    pub fn clear_capture_hook(&self) {
        self.state.borrow_mut().capture_hook = None;
    }

    /// Applies a partial update.
    ///
    /// In interleaved mode a new layer list is reconciled against the host
    /// stack first. Once attached, the merged options are pushed to the
    /// engine.
    ///
    /// # Errors
    ///
    /// Returns [`CompositorError::InvalidConfiguration`] if the new layer list
    /// is invalid; nothing is stored in that case.
    pub fn set_props(
        &mut self,
        map: &mut dyn HostMap,
        update: ControlUpdate,
    ) -> Result<(), CompositorError> {
        let (interleaved, engine, old_layers) = {
            let state = self.state.borrow();
            (
                state.options.interleaved,
                state.attached.as_ref().map(|a| Rc::clone(&a.engine)),
                state.options.layers.clone(),
            )
        };

        if let Some(layers) = &update.layers {
            match (&engine, interleaved) {
                (Some(engine), true) => {
                    reconcile(map, &self.registry, engine, &old_layers, layers)?;
                }
                _ => {
                    flatten_checked(layers)?;
                }
            }
        }

        let mut state = self.state.borrow_mut();
        let options = &mut state.options;
        if let Some(layers) = update.layers {
            options.layers = layers;
        }
        if let Some(view_state) = update.view_state {
            options.view_state = Some(view_state);
        }
        if let Some(parameters) = update.parameters {
            options.parameters = parameters;
        }
        if update.layer_filter.is_some() {
            options.layer_filter = update.layer_filter;
        }

        let options = state.options.clone();
        drop(state);

        if let Some(engine) = engine {
            let current = engine.borrow().props().clone();
            let props = apply_options(&options, current);
            engine.borrow_mut().set_props(props);
        }
        Ok(())
    }

    /// Picks the closest object at a point.
    ///
    /// # Errors
    ///
    /// Returns [`CompositorError::PreconditionFailed`] before the control is
    /// attached.
    pub fn pick_object(&self, options: &PickOptions) -> Result<Option<PickInfo>, CompositorError> {
        let engine = self.require_engine("pick_object")?;
        Ok(engine.borrow_mut().pick_object(options))
    }

    /// Picks every object in a rectangle.
    ///
    /// # Errors
    ///
    /// Returns [`CompositorError::PreconditionFailed`] before the control is
    /// attached.
    pub fn pick_objects(
        &self,
        options: &PickRectOptions,
    ) -> Result<Vec<PickInfo>, CompositorError> {
        let engine = self.require_engine("pick_objects")?;
        Ok(engine.borrow_mut().pick_objects(options))
    }

    /// Picks overlapping objects at a point.
    ///
    /// # Errors
    ///
    /// Returns [`CompositorError::PreconditionFailed`] before the control is
    /// attached.
    pub fn pick_multiple_objects(
        &self,
        options: &PickMultipleOptions,
    ) -> Result<Vec<PickInfo>, CompositorError> {
        let engine = self.require_engine("pick_multiple_objects")?;
        Ok(engine.borrow_mut().pick_multiple_objects(options))
    }

    fn require_engine(&self, what: &'static str) -> Result<SharedEngine, CompositorError> {
        self.engine()
            .ok_or(CompositorError::PreconditionFailed { what })
    }

    fn add_interleaved(&self, map: &mut dyn HostMap) -> Result<SurfaceHandle, CompositorError> {
        let options = self.state.borrow().options.clone();
        let flat = flatten_checked(&options.layers)?;
        check_native_ids(map, &flat)?;

        let libs = self.registry.libraries().clone();
        let placeholder: SurfaceHandle = match &libs.surfaces {
            Some(factory) => factory.create(false)?,
            None => Rc::new(RefCell::new(PlaceholderSurface::default())),
        };
        let gl = map.gl_context();
        let (engine, owns_engine) = match self.registry.get(map.id()) {
            Some(context) => (Rc::clone(context.engine()), false),
            None => {
                let props = apply_options(
                    &options,
                    EngineProps {
                        gl: Some(gl),
                        ..EngineProps::default()
                    },
                );
                (libs.engine.create(props)?, true)
            }
        };
        if let Err(err) = self
            .registry
            .obtain_context(map, gl, Some(Rc::clone(&engine)))
        {
            if owns_engine {
                engine.borrow_mut().finalize();
            }
            return Err(err);
        }

        let listeners = vec![
            map.subscribe(MapEventKind::StyleData, self.style_listener()),
            map.subscribe(MapEventKind::Idle, self.capture_listener()),
        ];
        self.state.borrow_mut().attached = Some(Attached {
            map_id: map.id(),
            engine: Rc::clone(&engine),
            owns_engine,
            mode: Mode::Interleaved,
            listeners,
        });

        if let Err(err) = reconcile(map, &self.registry, &engine, &empty_list(), &options.layers) {
            self.abandon(map, &flat);
            return Err(err);
        }

        Ok(placeholder)
    }

    /// Undoes a partial interleaved attach: the host never calls `on_remove`
    /// after a failed `on_add`.
    fn abandon(&self, map: &mut dyn HostMap, layers: &[Rc<LayerProps>]) {
        let Some(attached) = self.state.borrow_mut().attached.take() else {
            return;
        };
        for id in attached.listeners {
            map.unsubscribe(id);
        }
        // Only shims are removed; a failed pass may have stopped at a native id.
        for layer in layers {
            if map.custom_layer(&layer.id).is_some() {
                map.remove_layer(&layer.id);
            }
        }
        if attached.owns_engine {
            self.registry.release(map);
            attached.engine.borrow_mut().finalize();
        }
    }

    fn add_overlaid(&self, map: &mut dyn HostMap) -> Result<SurfaceHandle, CompositorError> {
        let libs = self.registry.libraries().clone();
        let factory = libs.surface_factory()?;
        let options = self.state.borrow().options.clone();

        // The surface is not mounted until the host receives it, so dropping it
        // on a failed engine creation below is a complete teardown.
        let surface = factory.create(true)?;
        let mut props = apply_options(
            &options,
            EngineProps {
                parent: Some(Rc::clone(&surface)),
                ..EngineProps::default()
            },
        );
        props.view_state = Some(compute_view_state(map));
        let engine = libs.engine.create(props)?;

        let mut listeners = vec![
            map.subscribe(MapEventKind::Resize, self.resize_listener()),
            map.subscribe(MapEventKind::Render, self.render_listener()),
            map.subscribe(MapEventKind::Idle, self.capture_listener()),
        ];
        for kind in [
            PointerKind::MouseMove,
            PointerKind::MouseOut,
            PointerKind::Click,
            PointerKind::DblClick,
        ] {
            listeners.push(map.subscribe(kind.event_kind(), self.pointer_listener()));
        }

        surface.borrow_mut().resize(map.container_size());
        self.state.borrow_mut().attached = Some(Attached {
            map_id: map.id(),
            engine,
            owns_engine: true,
            mode: Mode::Overlaid {
                surface: Rc::clone(&surface),
            },
            listeners,
        });
        Ok(surface)
    }

    fn weak_state(&self) -> Weak<RefCell<ControlState>> {
        Rc::downgrade(&self.state)
    }

    fn style_listener(&self) -> Listener {
        let state = self.weak_state();
        let registry = self.registry.clone();
        Rc::new(move |map, _| {
            let Some((engine, layers)) = attached_engine(&state, |s| s.options.layers.clone())
            else {
                return;
            };
            // A new style can bring native layers whose ids clash with ours.
            if let Err(error) = reconcile(map, &registry, &engine, &layers, &layers) {
                registry.tracer().error(&ErrorEvent {
                    map: map.id(),
                    source: ErrorSource::StyleReconcile,
                    error: &error,
                });
            }
        })
    }

    fn capture_listener(&self) -> Listener {
        let state = self.weak_state();
        Rc::new(move |_, _| {
            let Some((engine, hook)) = attached_engine(&state, |s| s.capture_hook.clone()) else {
                return;
            };
            let Some(hook) = hook else {
                return;
            };
            let canvas = engine.borrow().canvas();
            if let Some(canvas) = canvas {
                hook(canvas);
            }
        })
    }

    fn resize_listener(&self) -> Listener {
        let state = self.weak_state();
        Rc::new(move |map, _| {
            let Some(state) = state.upgrade() else {
                return;
            };
            let surface = match state.borrow().attached.as_ref().map(|a| &a.mode) {
                Some(Mode::Overlaid { surface }) => Rc::clone(surface),
                _ => return,
            };
            surface.borrow_mut().resize(map.container_size());
        })
    }

    fn render_listener(&self) -> Listener {
        let state = self.weak_state();
        Rc::new(move |map, _| {
            let Some((engine, ())) = attached_engine(&state, |_| ()) else {
                return;
            };
            let mut engine = engine.borrow_mut();
            engine.set_view_state(compute_view_state(map));
            engine.redraw();
        })
    }

    fn pointer_listener(&self) -> Listener {
        let state = self.weak_state();
        let tracer = self.registry.tracer().clone();
        Rc::new(move |map, event| {
            let MapEvent::Pointer(input) = event else {
                return;
            };
            let Some((engine, ())) = attached_engine(&state, |_| ()) else {
                return;
            };
            let forwarded = pointer::forward(&mut *engine.borrow_mut(), input);
            tracer.pointer(&PointerEvent {
                map: map.id(),
                host: input.kind,
                engine: forwarded.kind,
                tap_count: forwarded.tap_count,
            });
        })
    }
}

/// Reads the attached engine plus one more value out of a control's state.
fn attached_engine<T>(
    state: &Weak<RefCell<ControlState>>,
    extract: impl FnOnce(&ControlState) -> T,
) -> Option<(SharedEngine, T)> {
    let state = state.upgrade()?;
    let state = state.borrow();
    let engine = Rc::clone(&state.attached.as_ref()?.engine);
    Some((engine, extract(&state)))
}

/// Engine props for the stored options, on top of `base`.
fn apply_options(options: &OverlayOptions, mut base: EngineProps) -> EngineProps {
    base.layers = options.layers.clone();
    if options.view_state.is_some() {
        base.view_state = options.view_state;
    }
    base.parameters = options.parameters;
    base.layer_filter.clone_from(&options.layer_filter);
    if options.interleaved {
        interleaved_props(base)
    } else {
        base
    }
}

impl Control for CompositorControl {
    fn on_add(&mut self, map: &mut dyn HostMap) -> Result<SurfaceHandle, CompositorError> {
        if self.is_attached() {
            return Err(CompositorError::PreconditionFailed {
                what: "control is already attached",
            });
        }
        if self.is_interleaved() {
            self.add_interleaved(map)
        } else {
            self.add_overlaid(map)
        }
    }

    fn on_remove(&mut self, map: &mut dyn HostMap) {
        let Some(attached) = self.state.borrow_mut().attached.take() else {
            return;
        };
        for id in attached.listeners {
            map.unsubscribe(id);
        }
        if matches!(attached.mode, Mode::Interleaved) {
            let layers = self.layers();
            _ = reconcile(map, &self.registry, &attached.engine, &layers, &empty_list());
            if attached.owns_engine {
                self.registry.release(map);
            }
        }
        if attached.owns_engine {
            attached.engine.borrow_mut().finalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use kurbo::Point;

    use super::*;
    use crate::engine::{DepthFunc, EngineEventKind};
    use crate::host::PointerInput;
    use crate::layer::{LayerProps, layer_list};
    use crate::libs::{Libraries, SURFACE_MODULE};
    use crate::testing::{
        MockEngineFactory, MockMap, MockSurfaceFactory, PointerCall, is_engine,
    };

    struct Harness {
        map: MockMap,
        registry: ContextRegistry,
        engines: Rc<MockEngineFactory>,
        surfaces: Rc<MockSurfaceFactory>,
    }

    fn harness(native: &[&str], with_surfaces: bool) -> Harness {
        let engines = Rc::new(MockEngineFactory::default());
        let surfaces = Rc::new(MockSurfaceFactory::default());
        let libs = Libraries::new(
            engines.clone(),
            with_surfaces.then(|| surfaces.clone() as Rc<dyn crate::host::SurfaceFactory>),
        );
        Harness {
            map: MockMap::with_native(1, native),
            registry: ContextRegistry::new(libs),
            engines,
            surfaces,
        }
    }

    fn interleaved(h: &Harness, layers: LayerList) -> CompositorControl {
        CompositorControl::new(
            OverlayOptions {
                interleaved: true,
                layers,
                ..OverlayOptions::default()
            },
            h.registry.clone(),
        )
    }

    fn overlaid(h: &Harness) -> CompositorControl {
        CompositorControl::new(
            OverlayOptions {
                layers: layer_list([LayerProps::new("a")]),
                ..OverlayOptions::default()
            },
            h.registry.clone(),
        )
    }

    #[test]
    fn default_position_is_top_left() {
        let h = harness(&[], false);
        let control = overlaid(&h);
        assert_eq!(
            control.default_position(),
            crate::host::ControlPosition::TopLeft
        );
    }

    #[test]
    fn interleaved_add_builds_engine_on_host_gl_and_inserts_layers() {
        let mut h = harness(&["X", "Y"], false);
        let layers = layer_list([LayerProps::new("A"), LayerProps::new("B").before("A")]);
        let mut control = interleaved(&h, layers);
        let surface = control.on_add(&mut h.map).unwrap();
        assert_eq!(surface.borrow().size(), None);

        assert_eq!(h.map.order, ["X", "Y", "B", "A"]);
        assert_eq!(h.engines.count(), 1);
        let engine = h.engines.last();
        assert_eq!(engine.borrow().props.gl, Some(h.map.gl));
        assert_eq!(engine.borrow().props.parameters.depth_func, Some(DepthFunc::LessEqual));
        assert_eq!(engine.borrow().layer_ids(), ["A", "B"]);

        let ctx = h.registry.get(h.map.id).unwrap();
        assert!(ctx.is_externally_owned());
        assert!(is_engine(ctx.engine(), &engine));
        assert_eq!(ctx.handle_count(), 2);
    }

    #[test]
    fn style_change_restores_dropped_layers() {
        let mut h = harness(&["X"], false);
        let mut control = interleaved(&h, layer_list([LayerProps::new("A")]));
        control.on_add(&mut h.map).unwrap();

        h.map.remove_layer("A");
        h.map.fire(MapEvent::StyleData);
        assert_eq!(h.map.order, ["X", "A"]);
    }

    #[test]
    fn set_props_reconciles_new_list() {
        let mut h = harness(&["X"], false);
        let mut control = interleaved(&h, layer_list([LayerProps::new("A")]));
        control.on_add(&mut h.map).unwrap();

        let next = layer_list([LayerProps::new("B"), LayerProps::new("C").before("X")]);
        control
            .set_props(&mut h.map, ControlUpdate::layers(next))
            .unwrap();
        assert_eq!(h.map.order, ["C", "X", "B"]);
        assert_eq!(h.engines.last().borrow().layer_ids(), ["B", "C"]);
    }

    #[test]
    fn invalid_list_is_rejected_and_not_stored() {
        let mut h = harness(&[], false);
        let mut control = interleaved(&h, layer_list([LayerProps::new("A")]));
        control.on_add(&mut h.map).unwrap();

        let bad = layer_list([LayerProps::new("B"), LayerProps::new("B")]);
        let err = control
            .set_props(&mut h.map, ControlUpdate::layers(bad))
            .unwrap_err();
        assert!(matches!(err, CompositorError::InvalidConfiguration { .. }), "{err}");
        assert_eq!(control.layers().len(), 1);
        assert_eq!(h.map.order, ["A"]);
    }

    #[test]
    fn interleaved_remove_cleans_up_everything() {
        let mut h = harness(&["X"], false);
        let mut control = interleaved(&h, layer_list([LayerProps::new("A")]));
        control.on_add(&mut h.map).unwrap();
        assert_eq!(h.map.total_listeners(), 5);

        control.on_remove(&mut h.map);
        assert_eq!(h.map.order, ["X"]);
        assert_eq!(h.map.total_listeners(), 0);
        assert_eq!(h.engines.last().borrow().finalized, 1);
        assert!(h.registry.is_empty());
        assert!(!control.is_attached());

        // A second removal is a no-op.
        control.on_remove(&mut h.map);
        assert_eq!(h.engines.last().borrow().finalized, 1);
    }

    #[test]
    fn existing_context_is_reused_and_not_owned() {
        let mut h = harness(&[], false);
        let gl = h.map.gl;
        h.registry.obtain_context(&mut h.map, gl, None).unwrap();
        assert_eq!(h.engines.count(), 1);

        let mut control = interleaved(&h, layer_list([LayerProps::new("A")]));
        control.on_add(&mut h.map).unwrap();
        assert_eq!(h.engines.count(), 1);

        control.on_remove(&mut h.map);
        assert_eq!(h.engines.last().borrow().finalized, 0);
        assert_eq!(h.registry.len(), 1);
    }

    #[test]
    fn overlaid_requires_surface_module() {
        let mut h = harness(&[], false);
        let mut control = overlaid(&h);
        let Err(err) = control.on_add(&mut h.map) else {
            panic!("attach should fail");
        };
        assert_eq!(
            err,
            CompositorError::MissingCollaborator {
                module: SURFACE_MODULE
            }
        );
        assert_eq!(h.engines.count(), 0);
    }

    #[test]
    fn overlaid_surface_tracks_container_size() {
        let mut h = harness(&[], true);
        let mut control = overlaid(&h);
        control.on_add(&mut h.map).unwrap();

        let surface = h.surfaces.created.borrow()[0].clone();
        assert!(surface.borrow().overlay);
        assert_eq!(surface.borrow().size, Some(Size::new(800.0, 600.0)));

        h.map.container = Size::new(640.0, 480.0);
        h.map.fire(MapEvent::Resize);
        assert_eq!(surface.borrow().size, Some(Size::new(640.0, 480.0)));
        assert!(control.surface().is_some());
    }

    #[test]
    fn overlaid_render_pushes_camera_and_redraws() {
        let mut h = harness(&[], true);
        h.map.camera.zoom = 4.0;
        let mut control = overlaid(&h);
        control.on_add(&mut h.map).unwrap();

        let engine = h.engines.last();
        assert_eq!(engine.borrow().props.view_state.map(|vs| vs.zoom), Some(4.0));
        assert!(engine.borrow().props.parent.is_some());
        assert_eq!(engine.borrow().props.parameters, GpuParameters::default());

        h.map.camera.zoom = 6.0;
        h.map.fire(MapEvent::Render);
        assert_eq!(engine.borrow().view_states.last().map(|vs| vs.zoom), Some(6.0));
        assert_eq!(engine.borrow().redraws, 1);
    }

    #[test]
    fn overlaid_forwards_pointer_events() {
        let mut h = harness(&[], true);
        let mut control = overlaid(&h);
        control.on_add(&mut h.map).unwrap();

        let point = Point::new(5.0, 6.0);
        for kind in [PointerKind::Click, PointerKind::DblClick, PointerKind::MouseOut] {
            h.map.fire(MapEvent::Pointer(PointerInput { kind, point }));
        }
        let engine = h.engines.last();
        let calls: Vec<_> = engine
            .borrow()
            .pointer
            .iter()
            .map(|(c, e)| (*c, e.kind, e.tap_count))
            .collect();
        assert_eq!(
            calls,
            [
                (PointerCall::Down, EngineEventKind::Click, 1),
                (PointerCall::Event, EngineEventKind::Click, 1),
                (PointerCall::Event, EngineEventKind::Click, 2),
                (PointerCall::Move, EngineEventKind::PointerLeave, 0),
            ]
        );
    }

    #[test]
    fn overlaid_remove_detaches_and_finalizes() {
        let mut h = harness(&[], true);
        let mut control = overlaid(&h);
        control.on_add(&mut h.map).unwrap();
        assert_eq!(h.map.total_listeners(), 7);

        control.on_remove(&mut h.map);
        assert_eq!(h.map.total_listeners(), 0);
        assert_eq!(h.engines.last().borrow().finalized, 1);
    }

    #[test]
    fn picking_requires_attachment() {
        let mut h = harness(&[], true);
        let mut control = overlaid(&h);
        assert_eq!(
            control.pick_object(&PickOptions::default()),
            Err(CompositorError::PreconditionFailed {
                what: "pick_object"
            })
        );
        assert!(control.pick_objects(&PickRectOptions::default()).is_err());
        assert!(
            control
                .pick_multiple_objects(&PickMultipleOptions::default())
                .is_err()
        );

        control.on_add(&mut h.map).unwrap();
        let picked = control.pick_object(&PickOptions::default()).unwrap();
        assert_eq!(picked.map(|p| p.layer_id), Some("a".to_owned()));
        assert_eq!(h.engines.last().borrow().picks, 1);
    }

    #[test]
    fn capture_hook_receives_canvas_on_idle() {
        let mut h = harness(&[], true);
        let mut control = overlaid(&h);
        control.on_add(&mut h.map).unwrap();

        h.map.fire(MapEvent::Idle);
        let captured = Rc::new(Cell::new(None::<CanvasId>));
        let sink = captured.clone();
        control.set_capture_hook(Rc::new(move |canvas: CanvasId| sink.set(Some(canvas))));
        h.map.fire(MapEvent::Idle);
        assert_eq!(captured.get(), Some(CanvasId(7)));

        captured.set(None);
        control.clear_capture_hook();
        h.map.fire(MapEvent::Idle);
        assert_eq!(captured.get(), None);
    }

    #[test]
    fn set_props_pushes_merged_options_to_engine() {
        let mut h = harness(&[], false);
        let mut control = interleaved(&h, empty_list());
        control.on_add(&mut h.map).unwrap();

        let update = ControlUpdate {
            parameters: Some(GpuParameters {
                depth_test: Some(false),
                ..GpuParameters::default()
            }),
            ..ControlUpdate::default()
        };
        control.set_props(&mut h.map, update).unwrap();

        let engine = h.engines.last();
        let params = engine.borrow().props.parameters;
        assert_eq!(params.depth_test, Some(false));
        assert_eq!(params.depth_mask, Some(true));
        // The repaint hook installed by the registry survives.
        assert!(engine.borrow().props.custom_render.is_some());
    }

    #[test]
    fn attaching_twice_is_rejected() {
        let mut h = harness(&[], true);
        let mut control = overlaid(&h);
        control.on_add(&mut h.map).unwrap();
        assert!(matches!(
            control.on_add(&mut h.map),
            Err(CompositorError::PreconditionFailed { .. })
        ));
    }

    #[test]
    fn native_id_clash_fails_before_engine_is_built() {
        let mut h = harness(&["X"], false);
        let mut control = interleaved(&h, layer_list([LayerProps::new("X")]));
        let Err(err) = control.on_add(&mut h.map) else {
            panic!("attach should fail");
        };
        assert!(matches!(err, CompositorError::InvalidConfiguration { .. }), "{err}");

        assert!(!control.is_attached());
        assert_eq!(h.map.total_listeners(), 0);
        assert!(h.registry.is_empty());
        assert_eq!(h.engines.count(), 0);
        assert_eq!(h.map.order, ["X"]);
    }

    #[test]
    fn failed_insert_rolls_back_attach() {
        let mut h = harness(&["N"], false);
        h.map.reject = Some("B".into());
        let mut control = interleaved(
            &h,
            layer_list([LayerProps::new("A"), LayerProps::new("B")]),
        );
        assert!(control.on_add(&mut h.map).is_err());

        assert!(!control.is_attached());
        assert_eq!(h.map.total_listeners(), 0);
        assert!(h.registry.is_empty());
        assert_eq!(h.map.order, ["N"]);
        assert_eq!(h.engines.last().borrow().finalized, 1);

        h.map.reject = None;
        control.on_add(&mut h.map).unwrap();
        assert_eq!(h.map.order, ["N", "A", "B"]);
        assert_eq!(h.engines.count(), 2);
    }

    #[test]
    fn failed_engine_creation_leaves_overlay_detached() {
        let engines = Rc::new(MockEngineFactory {
            fail: true,
            ..MockEngineFactory::default()
        });
        let surfaces = Rc::new(MockSurfaceFactory::default());
        let registry = ContextRegistry::new(Libraries::new(
            engines,
            Some(surfaces.clone() as Rc<dyn crate::host::SurfaceFactory>),
        ));
        let mut map = MockMap::new(1);
        let mut control = CompositorControl::new(OverlayOptions::default(), registry);

        let Err(err) = control.on_add(&mut map) else {
            panic!("attach should fail");
        };
        assert!(matches!(err, CompositorError::EngineCreation { .. }), "{err}");
        assert!(!control.is_attached());
        assert_eq!(map.total_listeners(), 0);
        // Only the factory's own record still holds the unmounted surface.
        assert_eq!(Rc::strong_count(&surfaces.created.borrow()[0]), 1);
    }

    #[test]
    fn style_change_clash_is_reported_not_applied() {
        #[derive(Default)]
        struct Errors {
            seen: Vec<(ErrorSource, String)>,
        }
        impl crate::trace::TraceSink for Errors {
            fn on_error(&mut self, e: &ErrorEvent<'_>) {
                self.seen.push((e.source, e.error.to_string()));
            }
        }

        let engines = Rc::new(MockEngineFactory::default());
        let sink = Rc::new(RefCell::new(Errors::default()));
        let registry = ContextRegistry::with_tracer(
            Libraries::new(engines, None),
            crate::trace::Tracer::new(sink.clone()),
        );
        let mut map = MockMap::new(1);
        let mut control = CompositorControl::new(
            OverlayOptions {
                interleaved: true,
                layers: layer_list([LayerProps::new("A")]),
                ..OverlayOptions::default()
            },
            registry,
        );
        control.on_add(&mut map).unwrap();

        // The new style ships a native layer named like ours.
        map.remove_layer("A");
        map.order.push("A".into());
        map.fire(MapEvent::StyleData);

        assert_eq!(map.order, ["A"]);
        assert!(map.custom_layer("A").is_none());
        #[cfg(feature = "trace")]
        {
            let seen = &sink.borrow().seen;
            assert_eq!(seen.len(), 1);
            assert_eq!(seen[0].0, ErrorSource::StyleReconcile);
            assert!(seen[0].1.contains("already used by a host layer"), "{}", seen[0].1);
        }
        #[cfg(not(feature = "trace"))]
        assert!(sink.borrow().seen.is_empty());
    }
}
