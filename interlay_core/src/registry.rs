// Copyright 2026 the Interlay Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-map render contexts.
//!
//! A [`RenderContext`] binds exactly one engine instance to one host map. All
//! shims on that map share it: it owns the set of registered
//! [`LayerHandle`]s, the viewport cached for the current redraw cycle, and the
//! host listeners that keep the engine in step with the map.
//!
//! [`ContextRegistry::obtain_context`] is idempotent per map. The first call
//! either wraps a caller-supplied engine (*externally owned*) or builds one
//! through the [`EngineFactory`](crate::engine::EngineFactory) in
//! [`Libraries`]. Only owned engines are ever finalized by the registry.
//!
//! # Hooks
//!
//! Each context installs at most one of each host listener:
//!
//! | Event    | Installed when                          | Action                            |
//! |----------|-----------------------------------------|-----------------------------------|
//! | `move`   | the engine draws into the host GL       | push the view state               |
//! | `render` | always                                  | after-render pass, end the cycle  |
//! | `remove` | always                                  | [`ContextRegistry::release`]      |

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use hashbrown::HashSet;

use crate::engine::{
    DrawPass, ENGINE_NEAR_Z_MULTIPLIER, EngineProps, FilterContext, HOST_NEAR_Z_MULTIPLIER,
    MAP_VIEW_ID, SharedEngine, Viewport, interleaved_props,
};
use crate::error::CompositorError;
use crate::host::{HostMap, MapEventKind};
use crate::id::{GlContextId, ListenerId, MapId};
use crate::layer::{LayerNode, LayerProps, flatten, layer_list};
use crate::libs::Libraries;
use crate::trace::{ContextChange, ContextEvent, DrawEvent, Tracer};
use crate::viewport::{compute_view_state, map_viewport};

/// Draw reason reported to the engine for every compositor-driven pass.
pub const REPAINT_REASON: &str = "interlay-repaint";

/// Live record of one logical layer materialized into the host stack.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerHandle {
    /// Layer id.
    pub id: String,
    /// Props of the shim at the time of the last registration or update.
    pub props: Rc<LayerProps>,
}

impl LayerHandle {
    /// Snapshots `props` into a handle.
    #[must_use]
    pub fn new(props: &LayerProps) -> Self {
        Self {
            id: props.id.clone(),
            props: Rc::new(props.clone()),
        }
    }
}

#[derive(Default)]
struct ContextState {
    handles: Vec<LayerHandle>,
    current_viewport: Option<Viewport>,
    listeners: Vec<ListenerId>,
    finalized: bool,
}

struct ContextInner {
    map_id: MapId,
    engine: SharedEngine,
    externally_owned: bool,
    tracer: Tracer,
    state: RefCell<ContextState>,
}

/// The engine instance bound to one host map.
///
/// Cloning is cheap and yields a handle to the same context.
#[derive(Clone)]
pub struct RenderContext {
    inner: Rc<ContextInner>,
}

impl fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("RenderContext")
            .field("map_id", &self.inner.map_id)
            .field("externally_owned", &self.inner.externally_owned)
            .field("handles", &state.handles.len())
            .field("finalized", &state.finalized)
            .finish_non_exhaustive()
    }
}

impl RenderContext {
    fn new(map_id: MapId, engine: SharedEngine, externally_owned: bool, tracer: Tracer) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                map_id,
                engine,
                externally_owned,
                tracer,
                state: RefCell::new(ContextState::default()),
            }),
        }
    }

    /// Map this context belongs to.
    #[must_use]
    pub fn map_id(&self) -> MapId {
        self.inner.map_id
    }

    /// The engine instance.
    #[must_use]
    pub fn engine(&self) -> &SharedEngine {
        &self.inner.engine
    }

    /// Whether the engine was supplied by the caller.
    #[must_use]
    pub fn is_externally_owned(&self) -> bool {
        self.inner.externally_owned
    }

    /// Whether the registry already finalized the engine.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.inner.state.borrow().finalized
    }

    /// Returns whether `self` and `other` are the same context.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Ids of the registered handles, in registration order.
    #[must_use]
    pub fn handle_ids(&self) -> Vec<String> {
        self.inner
            .state
            .borrow()
            .handles
            .iter()
            .map(|h| h.id.clone())
            .collect()
    }

    /// Snapshot of the registered handles.
    #[must_use]
    pub fn handles(&self) -> Vec<LayerHandle> {
        self.inner.state.borrow().handles.clone()
    }

    /// Number of registered handles.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        self.inner.state.borrow().handles.len()
    }

    /// The viewport cached for the current redraw cycle, if any shim drew yet.
    #[must_use]
    pub fn current_viewport(&self) -> Option<Viewport> {
        self.inner.state.borrow().current_viewport.clone()
    }

    pub(crate) fn tracer(&self) -> &Tracer {
        &self.inner.tracer
    }

    /// Registers a handle, replacing one with the same id.
    pub(crate) fn add_handle(&self, handle: LayerHandle) {
        {
            let mut state = self.inner.state.borrow_mut();
            match state.handles.iter_mut().find(|h| h.id == handle.id) {
                Some(existing) => *existing = handle,
                None => state.handles.push(handle),
            }
        }
        self.sync_engine_layers();
    }

    /// Unregisters the handle with `id`. Returns `false` if none was found.
    pub(crate) fn remove_handle(&self, id: &str) -> bool {
        let removed = {
            let mut state = self.inner.state.borrow_mut();
            let before = state.handles.len();
            state.handles.retain(|h| h.id != id);
            state.handles.len() != before
        };
        if removed {
            self.sync_engine_layers();
        }
        removed
    }

    /// Replaces the props snapshot of the handle with the same id.
    pub(crate) fn update_handle(&self, props: &LayerProps) {
        {
            let mut state = self.inner.state.borrow_mut();
            let Some(handle) = state.handles.iter_mut().find(|h| h.id == props.id) else {
                return;
            };
            handle.props = Rc::new(props.clone());
        }
        self.sync_engine_layers();
    }

    /// Returns the viewport of the current redraw cycle, computing and caching
    /// it on first use. The flag is `true` when this call computed it.
    pub(crate) fn cycle_viewport(&self, map: &dyn HostMap) -> (Viewport, bool) {
        if let Some(viewport) = self.current_viewport() {
            return (viewport, false);
        }
        let size = self.inner.engine.borrow().size();
        let viewport = map_viewport(
            compute_view_state(map),
            size.width,
            size.height,
            HOST_NEAR_Z_MULTIPLIER,
        );
        self.inner.state.borrow_mut().current_viewport = Some(viewport.clone());
        (viewport, true)
    }

    /// Rebuilds an owned engine's layer list from the registered handles.
    fn sync_engine_layers(&self) {
        if self.inner.externally_owned {
            return;
        }
        let layers = layer_list(
            self.inner
                .state
                .borrow()
                .handles
                .iter()
                .map(|h| LayerNode::Layer(Rc::clone(&h.props))),
        );
        let mut props = self.inner.engine.borrow().props().clone();
        props.layers = layers;
        self.inner.engine.borrow_mut().set_props(props);
    }

    fn on_move(&self, map: &dyn HostMap) {
        let mut engine = self.inner.engine.borrow_mut();
        if !engine.is_view_manager_ready() {
            return;
        }
        engine.set_view_state(compute_view_state(map));
        // The host repaints right after a camera move.
        engine.clear_redraw_flags();
    }

    /// End of a host redraw cycle.
    fn after_render(&self, map: &dyn HostMap) {
        let ready = self.inner.engine.borrow().is_layer_manager_ready();
        if ready && self.inner.externally_owned {
            self.draw_unmanaged(map);
        }
        self.inner.state.borrow_mut().current_viewport = None;
    }

    /// Draws the layers and views of a supplied engine that no shim manages.
    fn draw_unmanaged(&self, map: &dyn HostMap) {
        let managed: HashSet<String> = self.handle_ids().into_iter().collect();
        let mut engine = self.inner.engine.borrow_mut();

        let has_unmanaged_layers = flatten(&engine.props().layers)
            .iter()
            .any(|layer| !managed.contains(&layer.id));
        let mut viewports = engine.viewports();
        let map_index = viewports.iter().position(|vp| vp.id == MAP_VIEW_ID);
        let has_other_views = viewports.len() > 1 || map_index.is_none();

        if !has_unmanaged_layers && !has_other_views {
            return;
        }

        if let Some(index) = map_index {
            let size = engine.size();
            viewports[index] = map_viewport(
                compute_view_state(map),
                size.width,
                size.height,
                ENGINE_NEAR_Z_MULTIPLIER,
            );
        }

        let user_filter = engine.props().layer_filter.clone();
        let filter = |ctx: &FilterContext<'_>| {
            user_filter.as_ref().is_none_or(|f| f(ctx))
                && (ctx.viewport_id != MAP_VIEW_ID || !managed.contains(ctx.layer_id))
        };
        engine.draw_layers(&DrawPass {
            reason: REPAINT_REASON,
            viewports,
            layer_filter: &filter,
            clear_stack: false,
            clear_canvas: false,
        });
        drop(engine);

        self.inner.tracer.draw(&DrawEvent {
            map: self.inner.map_id,
            layer_id: None,
            computed_viewport: false,
        });
    }

    /// Finalizes the engine if it is owned and still alive.
    fn finalize_owned(&self) -> bool {
        if self.inner.externally_owned {
            return false;
        }
        {
            let mut state = self.inner.state.borrow_mut();
            if state.finalized {
                return false;
            }
            state.finalized = true;
        }
        self.inner.engine.borrow_mut().finalize();
        true
    }
}

struct RegistryInner {
    libs: Libraries,
    tracer: Tracer,
    contexts: RefCell<BTreeMap<MapId, RenderContext>>,
}

/// Keeps one [`RenderContext`] per host map.
///
/// Cloning is cheap and yields a handle to the same registry.
#[derive(Clone)]
pub struct ContextRegistry {
    inner: Rc<RegistryInner>,
}

impl fmt::Debug for ContextRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextRegistry")
            .field("libs", &self.inner.libs)
            .field("contexts", &self.inner.contexts.borrow().len())
            .finish_non_exhaustive()
    }
}

impl ContextRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(libs: Libraries) -> Self {
        Self::with_tracer(libs, Tracer::none())
    }

    /// Creates an empty registry that reports to `tracer`.
    #[must_use]
    pub fn with_tracer(libs: Libraries, tracer: Tracer) -> Self {
        Self {
            inner: Rc::new(RegistryInner {
                libs,
                tracer,
                contexts: RefCell::new(BTreeMap::new()),
            }),
        }
    }

    /// The loaded collaborator modules.
    #[must_use]
    pub fn libraries(&self) -> &Libraries {
        &self.inner.libs
    }

    /// The tracer handed to every context.
    #[must_use]
    pub fn tracer(&self) -> &Tracer {
        &self.inner.tracer
    }

    /// The context of `map`, if one exists.
    #[must_use]
    pub fn get(&self, map: MapId) -> Option<RenderContext> {
        self.inner.contexts.borrow().get(&map).cloned()
    }

    /// Number of live contexts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.contexts.borrow().len()
    }

    /// Whether no context is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.contexts.borrow().is_empty()
    }

    /// Returns the context of `map`, creating it on first use.
    ///
    /// An existing context is returned unchanged, whatever `supplied` is.
    /// Otherwise `supplied` is wrapped as an externally owned engine, or a new
    /// engine is built on `gl`.
    ///
    /// # Errors
    ///
    /// Propagates [`CompositorError::EngineCreation`] from the engine factory.
    pub fn obtain_context(
        &self,
        map: &mut dyn HostMap,
        gl: GlContextId,
        supplied: Option<SharedEngine>,
    ) -> Result<RenderContext, CompositorError> {
        let map_id = map.id();
        if let Some(context) = self.get(map_id) {
            return Ok(context);
        }

        let base = supplied
            .as_ref()
            .map(|engine| engine.borrow().props().clone())
            .unwrap_or_default();
        let uses_host_gl = supplied.is_none() || base.gl == Some(gl);

        let repaint = map.repaint_trigger();
        let chained = base.custom_render.clone();
        let mut props = interleaved_props(EngineProps {
            custom_render: Some(Rc::new(move || {
                repaint();
                if let Some(hook) = &chained {
                    hook();
                }
            })),
            ..base
        });

        if uses_host_gl {
            props.gl = Some(gl);
            props.width = None;
            props.height = None;
            props.touch_action = Some("unset".into());
            props.view_state = Some(compute_view_state(map));
        }

        let externally_owned = supplied.is_some();
        let engine = match supplied {
            Some(engine) => {
                engine.borrow_mut().set_props(props);
                engine
            }
            None => self.inner.libs.engine.create(props)?,
        };

        let tracer = self.inner.tracer.clone();
        let context = RenderContext::new(map_id, engine, externally_owned, tracer);
        let listeners = self.install_hooks(map, &context, uses_host_gl);
        context.inner.state.borrow_mut().listeners = listeners;

        self.inner
            .contexts
            .borrow_mut()
            .insert(map_id, context.clone());
        self.inner.tracer.context(&ContextEvent {
            map: map_id,
            change: ContextChange::Created { externally_owned },
        });
        Ok(context)
    }

    fn install_hooks(
        &self,
        map: &mut dyn HostMap,
        context: &RenderContext,
        camera: bool,
    ) -> Vec<ListenerId> {
        let mut listeners = Vec::with_capacity(3);

        if camera {
            let weak = Rc::downgrade(&context.inner);
            listeners.push(map.subscribe(
                MapEventKind::Move,
                Rc::new(move |map, _| {
                    if let Some(inner) = weak.upgrade() {
                        RenderContext { inner }.on_move(map);
                    }
                }),
            ));
        }

        let weak = Rc::downgrade(&context.inner);
        listeners.push(map.subscribe(
            MapEventKind::Render,
            Rc::new(move |map, _| {
                if let Some(inner) = weak.upgrade() {
                    RenderContext { inner }.after_render(map);
                }
            }),
        ));

        let registry: Weak<RegistryInner> = Rc::downgrade(&self.inner);
        listeners.push(map.subscribe(
            MapEventKind::Remove,
            Rc::new(move |map, _| {
                if let Some(inner) = registry.upgrade() {
                    ContextRegistry { inner }.release(map);
                }
            }),
        ));

        listeners
    }

    /// Drops the context of `map`.
    ///
    /// Its host listeners are detached best-effort and its engine is finalized
    /// if the registry created it. Returns `false` if `map` had no context.
    pub fn release(&self, map: &mut dyn HostMap) -> bool {
        let Some(context) = self.inner.contexts.borrow_mut().remove(&map.id()) else {
            return false;
        };
        let listeners = core::mem::take(&mut context.inner.state.borrow_mut().listeners);
        for id in listeners {
            map.unsubscribe(id);
        }
        let finalized = context.finalize_owned();
        self.inner.tracer.context(&ContextEvent {
            map: context.map_id(),
            change: ContextChange::Released { finalized },
        });
        true
    }
}
