// Copyright 2026 the Interlay Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory host map, engine and surface doubles for unit tests.
//!
//! Every native mutation and engine call is recorded so tests can assert on
//! exact counts.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use kurbo::{Insets, Size};

use crate::engine::{
    DrawPass, EngineFactory, EngineProps, EnginePointerEvent, FilterContext, PickInfo,
    PickMultipleOptions, PickOptions, PickRectOptions, RenderEngine, SharedEngine, Viewport,
};
use crate::error::CompositorError;
use crate::host::{
    CustomLayerRef, HostMap, Listener, LngLat, MapEvent, MapEventKind, OverlaySurface,
    SurfaceFactory, SurfaceHandle, Terrain,
};
use crate::id::{CanvasId, GlContextId, ListenerId, MapId};
use crate::layer::flatten;
use crate::viewport::{ViewState, map_viewport};

/// Host camera state.
#[derive(Clone, Debug)]
pub(crate) struct Camera {
    pub center: LngLat,
    pub zoom: f64,
    pub bearing: f64,
    pub pitch: f64,
    pub padding: Insets,
    pub world_copies: bool,
    pub terrain: Option<Terrain>,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            center: LngLat::new(0.0, 0.0),
            zoom: 1.0,
            bearing: 0.0,
            pitch: 0.0,
            padding: Insets::ZERO,
            world_copies: true,
            terrain: None,
        }
    }
}

/// A recorded layer stack mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Mutation {
    Add { id: String, before: Option<String> },
    Remove(String),
    Move { id: String, before: Option<String> },
}

pub(crate) struct MockMap {
    pub id: MapId,
    pub camera: Camera,
    pub container: Size,
    pub gl: GlContextId,
    pub style_loaded: bool,
    /// Every layer id, bottom to top. Native layers are plain ids.
    pub order: Vec<String>,
    pub custom: BTreeMap<String, CustomLayerRef>,
    pub mutations: Vec<Mutation>,
    pub repaints: Rc<Cell<u32>>,
    /// `add_layer` fails for this id.
    pub reject: Option<String>,
    listeners: Vec<(ListenerId, MapEventKind, Listener)>,
    next_listener: u64,
}

impl MockMap {
    pub fn new(id: u32) -> Self {
        Self {
            id: MapId(id),
            camera: Camera::default(),
            container: Size::new(800.0, 600.0),
            gl: GlContextId(id),
            style_loaded: true,
            order: Vec::new(),
            custom: BTreeMap::new(),
            mutations: Vec::new(),
            repaints: Rc::new(Cell::new(0)),
            reject: None,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// A loaded map with the given native layers.
    pub fn with_native(id: u32, native: &[&str]) -> Self {
        let mut map = Self::new(id);
        map.order = native.iter().map(|id| (*id).to_owned()).collect();
        map
    }

    /// Dispatches `event` to every listener of its kind.
    pub fn fire(&mut self, event: MapEvent) {
        let kind = event.kind();
        let targets: Vec<Listener> = self
            .listeners
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, l)| Rc::clone(l))
            .collect();
        let map: &mut dyn HostMap = self;
        for listener in targets {
            listener(&mut *map, &event);
        }
    }

    /// Renders every custom layer in stack order, then fires `render`.
    pub fn render_frame(&mut self) {
        let layers: Vec<CustomLayerRef> = self
            .order
            .iter()
            .filter_map(|id| self.custom.get(id).cloned())
            .collect();
        for layer in layers {
            layer.borrow_mut().render(&*self);
        }
        self.fire(MapEvent::Render);
    }

    pub fn listener_count(&self, kind: MapEventKind) -> usize {
        self.listeners.iter().filter(|(_, k, _)| *k == kind).count()
    }

    pub fn total_listeners(&self) -> usize {
        self.listeners.len()
    }

    fn insert_at(&mut self, id: String, before: Option<&str>) {
        match before.and_then(|b| self.order.iter().position(|o| o == b)) {
            Some(index) => self.order.insert(index, id),
            None => self.order.push(id),
        }
    }
}

impl HostMap for MockMap {
    fn id(&self) -> MapId {
        self.id
    }

    fn center(&self) -> LngLat {
        self.camera.center
    }

    fn zoom(&self) -> f64 {
        self.camera.zoom
    }

    fn bearing(&self) -> f64 {
        self.camera.bearing
    }

    fn pitch(&self) -> f64 {
        self.camera.pitch
    }

    fn padding(&self) -> Insets {
        self.camera.padding
    }

    fn render_world_copies(&self) -> bool {
        self.camera.world_copies
    }

    fn terrain(&self) -> Option<Terrain> {
        self.camera.terrain
    }

    fn container_size(&self) -> Size {
        self.container
    }

    fn gl_context(&self) -> GlContextId {
        self.gl
    }

    fn is_style_loaded(&self) -> bool {
        self.style_loaded
    }

    fn layer_order(&self) -> Vec<String> {
        self.order.clone()
    }

    fn has_layer(&self, id: &str) -> bool {
        self.order.iter().any(|o| o == id)
    }

    fn custom_layer(&self, id: &str) -> Option<CustomLayerRef> {
        self.custom.get(id).cloned()
    }

    fn add_layer(
        &mut self,
        layer: CustomLayerRef,
        before_id: Option<&str>,
    ) -> Result<(), CompositorError> {
        if self.reject.as_deref() == Some(layer.borrow().id()) {
            return Err(CompositorError::invalid("host refused the layer"));
        }
        let gl = self.gl;
        layer.borrow_mut().on_add(self, gl)?;
        let id = layer.borrow().id().to_owned();
        self.insert_at(id.clone(), before_id);
        self.custom.insert(id.clone(), layer);
        self.mutations.push(Mutation::Add {
            id,
            before: before_id.map(str::to_owned),
        });
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) {
        let Some(index) = self.order.iter().position(|o| o == id) else {
            return;
        };
        self.order.remove(index);
        if let Some(layer) = self.custom.remove(id) {
            layer.borrow_mut().on_remove(self);
        }
        self.mutations.push(Mutation::Remove(id.to_owned()));
    }

    fn move_layer(&mut self, id: &str, before_id: Option<&str>) {
        let Some(index) = self.order.iter().position(|o| o == id) else {
            return;
        };
        let owned = self.order.remove(index);
        self.insert_at(owned, before_id);
        self.mutations.push(Mutation::Move {
            id: id.to_owned(),
            before: before_id.map(str::to_owned),
        });
    }

    fn subscribe(&mut self, kind: MapEventKind, listener: Listener) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.push((id, kind, listener));
        id
    }

    fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _, _)| *l != id);
        self.listeners.len() != before
    }

    fn repaint_trigger(&self) -> Rc<dyn Fn()> {
        let repaints = Rc::clone(&self.repaints);
        Rc::new(move || repaints.set(repaints.get() + 1))
    }
}

/// One recorded [`RenderEngine::draw_layers`] call.
#[derive(Clone, Debug)]
pub(crate) struct DrawRecord {
    pub reason: &'static str,
    pub viewports: Vec<Viewport>,
    pub clear_stack: bool,
    pub clear_canvas: bool,
    /// `(layer_id, viewport_id)` pairs the filter let through.
    pub drawn: Vec<(String, String)>,
}

/// Which pointer entry point was called.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PointerCall {
    Down,
    Move,
    Event,
}

pub(crate) struct MockEngine {
    pub props: EngineProps,
    pub layer_ready: bool,
    pub view_ready: bool,
    pub size: Size,
    pub draws: Vec<DrawRecord>,
    pub view_states: Vec<ViewState>,
    pub set_props_calls: usize,
    pub redraw_flag_clears: usize,
    pub redraws: usize,
    pub finalized: usize,
    pub pointer: Vec<(PointerCall, EnginePointerEvent)>,
    pub picks: usize,
    pub canvas: Option<CanvasId>,
}

pub(crate) fn blank_view_state() -> ViewState {
    ViewState {
        longitude: 0.0,
        latitude: 0.0,
        zoom: 0.0,
        bearing: 0.0,
        pitch: 0.0,
        padding: Insets::ZERO,
        repeat: true,
        position: None,
    }
}

impl MockEngine {
    pub fn new(props: EngineProps) -> Self {
        Self {
            props,
            layer_ready: true,
            view_ready: true,
            size: Size::new(800.0, 600.0),
            draws: Vec::new(),
            view_states: Vec::new(),
            set_props_calls: 0,
            redraw_flag_clears: 0,
            redraws: 0,
            finalized: 0,
            pointer: Vec::new(),
            picks: 0,
            canvas: Some(CanvasId(7)),
        }
    }

    pub fn shared(props: EngineProps) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new(props)))
    }

    pub fn layer_ids(&self) -> Vec<String> {
        flatten(&self.props.layers)
            .iter()
            .map(|l| l.id.clone())
            .collect()
    }
}

impl RenderEngine for MockEngine {
    fn props(&self) -> &EngineProps {
        &self.props
    }

    fn set_props(&mut self, props: EngineProps) {
        self.set_props_calls += 1;
        self.props = props;
    }

    fn set_view_state(&mut self, view_state: ViewState) {
        self.view_states.push(view_state);
        self.props.view_state = Some(view_state);
    }

    fn is_layer_manager_ready(&self) -> bool {
        self.layer_ready
    }

    fn is_view_manager_ready(&self) -> bool {
        self.view_ready
    }

    fn size(&self) -> Size {
        self.size
    }

    fn viewports(&self) -> Vec<Viewport> {
        let view_state = self.props.view_state.unwrap_or_else(blank_view_state);
        self.props
            .views
            .iter()
            .map(|view| {
                let mut viewport =
                    map_viewport(view_state, self.size.width, self.size.height, 0.1);
                viewport.id.clone_from(&view.id);
                viewport
            })
            .collect()
    }

    fn draw_layers(&mut self, pass: &DrawPass<'_>) {
        let layers = flatten(&self.props.layers);
        let mut drawn = Vec::new();
        for viewport in &pass.viewports {
            for layer in &layers {
                let ctx = FilterContext {
                    layer_id: &layer.id,
                    viewport_id: &viewport.id,
                };
                if (pass.layer_filter)(&ctx) {
                    drawn.push((layer.id.clone(), viewport.id.clone()));
                }
            }
        }
        self.draws.push(DrawRecord {
            reason: pass.reason,
            viewports: pass.viewports.clone(),
            clear_stack: pass.clear_stack,
            clear_canvas: pass.clear_canvas,
            drawn,
        });
    }

    fn pick_object(&mut self, options: &PickOptions) -> Option<PickInfo> {
        self.picks += 1;
        let layer = flatten(&self.props.layers).into_iter().next()?;
        Some(PickInfo {
            layer_id: layer.id.clone(),
            index: 0,
            point: options.point,
        })
    }

    fn pick_objects(&mut self, options: &PickRectOptions) -> Vec<PickInfo> {
        self.picks += 1;
        flatten(&self.props.layers)
            .iter()
            .enumerate()
            .map(|(index, layer)| PickInfo {
                layer_id: layer.id.clone(),
                index,
                point: options.rect.center(),
            })
            .take(options.max_objects.unwrap_or(usize::MAX))
            .collect()
    }

    fn pick_multiple_objects(&mut self, options: &PickMultipleOptions) -> Vec<PickInfo> {
        self.picks += 1;
        flatten(&self.props.layers)
            .iter()
            .map(|layer| PickInfo {
                layer_id: layer.id.clone(),
                index: 0,
                point: options.point,
            })
            .take(options.depth.unwrap_or(usize::MAX))
            .collect()
    }

    fn on_pointer_down(&mut self, event: &EnginePointerEvent) {
        self.pointer.push((PointerCall::Down, *event));
    }

    fn on_pointer_move(&mut self, event: &EnginePointerEvent) {
        self.pointer.push((PointerCall::Move, *event));
    }

    fn on_event(&mut self, event: &EnginePointerEvent) {
        self.pointer.push((PointerCall::Event, *event));
    }

    fn clear_redraw_flags(&mut self) {
        self.redraw_flag_clears += 1;
    }

    fn redraw(&mut self) {
        self.redraws += 1;
    }

    fn canvas(&self) -> Option<CanvasId> {
        self.canvas
    }

    fn finalize(&mut self) {
        self.finalized += 1;
    }
}

/// Whether a shared engine is the given mock.
pub(crate) fn is_engine(shared: &SharedEngine, mock: &Rc<RefCell<MockEngine>>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(shared), Rc::as_ptr(mock))
}

#[derive(Default)]
pub(crate) struct MockEngineFactory {
    pub created: RefCell<Vec<Rc<RefCell<MockEngine>>>>,
    pub fail: bool,
}

impl MockEngineFactory {
    pub fn last(&self) -> Rc<RefCell<MockEngine>> {
        Rc::clone(
            self.created
                .borrow()
                .last()
                .expect("no engine was created"),
        )
    }

    pub fn count(&self) -> usize {
        self.created.borrow().len()
    }
}

impl EngineFactory for MockEngineFactory {
    fn create(&self, props: EngineProps) -> Result<SharedEngine, CompositorError> {
        if self.fail {
            return Err(CompositorError::EngineCreation {
                reason: "context lost".into(),
            });
        }
        let engine = MockEngine::shared(props);
        self.created.borrow_mut().push(Rc::clone(&engine));
        Ok(engine)
    }
}

#[derive(Debug, Default)]
pub(crate) struct MockSurface {
    pub overlay: bool,
    pub size: Option<Size>,
    pub resizes: usize,
}

impl OverlaySurface for MockSurface {
    fn resize(&mut self, size: Size) {
        self.resizes += 1;
        self.size = Some(size);
    }

    fn size(&self) -> Option<Size> {
        self.size
    }
}

#[derive(Default)]
pub(crate) struct MockSurfaceFactory {
    pub created: RefCell<Vec<Rc<RefCell<MockSurface>>>>,
}

impl SurfaceFactory for MockSurfaceFactory {
    fn create(&self, overlay: bool) -> Result<SurfaceHandle, CompositorError> {
        let surface = Rc::new(RefCell::new(MockSurface {
            overlay,
            ..MockSurface::default()
        }));
        self.created.borrow_mut().push(Rc::clone(&surface));
        Ok(surface)
    }
}
