// Copyright 2026 the Interlay Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host custom layer standing in for one logical layer.
//!
//! The host calls [`CustomLayer::render`] on each shim in its own paint
//! order. Every shim on a map shares one [`RenderContext`], and each draw asks
//! the engine for exactly one layer. The first shim drawn in a host redraw
//! cycle computes the viewport and asks the engine to reset its layer stack;
//! the rest reuse that viewport until the context's render hook ends the
//! cycle.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::engine::{DrawPass, FilterContext, SharedEngine};
use crate::error::CompositorError;
use crate::host::{CustomLayer, CustomLayerRef, HostMap};
use crate::id::GlContextId;
use crate::layer::{LayerProps, RenderingMode};
use crate::registry::{ContextRegistry, LayerHandle, REPAINT_REASON, RenderContext};
use crate::trace::DrawEvent;

/// A host custom layer drawing one logical layer through the shared engine.
pub struct LayerShim {
    props: LayerProps,
    rendering_mode: RenderingMode,
    registry: ContextRegistry,
    supplied: Option<SharedEngine>,
    context: Option<RenderContext>,
}

impl fmt::Debug for LayerShim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerShim")
            .field("props", &self.props)
            .field("rendering_mode", &self.rendering_mode)
            .field("supplied", &self.supplied.is_some())
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl LayerShim {
    /// Creates a detached shim.
    ///
    /// `engine` is handed to the registry when the shim attaches; it only
    /// matters if the map has no context yet.
    ///
    /// # Errors
    ///
    /// Returns [`CompositorError::InvalidConfiguration`] if `props.id` is
    /// empty.
    pub fn new(
        props: LayerProps,
        registry: ContextRegistry,
        engine: Option<SharedEngine>,
    ) -> Result<Self, CompositorError> {
        if props.id.is_empty() {
            return Err(CompositorError::invalid("layer must have a unique id"));
        }
        Ok(Self {
            props,
            rendering_mode: RenderingMode::default(),
            registry,
            supplied: engine,
            context: None,
        })
    }

    /// Sets how the layer interacts with host depth.
    #[must_use]
    pub fn with_rendering_mode(mut self, mode: RenderingMode) -> Self {
        self.rendering_mode = mode;
        self
    }

    /// Current props.
    #[must_use]
    pub fn props(&self) -> &LayerProps {
        &self.props
    }

    /// The shared context, once attached.
    #[must_use]
    pub fn context(&self) -> Option<&RenderContext> {
        self.context.as_ref()
    }

    /// Wraps the shim for insertion into a host stack.
    #[must_use]
    pub fn into_ref(self) -> CustomLayerRef {
        Rc::new(RefCell::new(self))
    }
}

impl CustomLayer for LayerShim {
    fn id(&self) -> &str {
        &self.props.id
    }

    fn rendering_mode(&self) -> RenderingMode {
        self.rendering_mode
    }

    fn on_add(&mut self, map: &mut dyn HostMap, gl: GlContextId) -> Result<(), CompositorError> {
        let context = self
            .registry
            .obtain_context(map, gl, self.supplied.clone())?;
        context.add_handle(LayerHandle::new(&self.props));
        self.context = Some(context);
        Ok(())
    }

    fn on_remove(&mut self, _map: &mut dyn HostMap) {
        if let Some(context) = self.context.take() {
            context.remove_handle(&self.props.id);
        }
    }

    fn render(&mut self, map: &dyn HostMap) {
        let Some(context) = &self.context else {
            return;
        };
        let (viewport, computed) = context.cycle_viewport(map);

        let mut engine = context.engine().borrow_mut();
        if !engine.is_layer_manager_ready() {
            return;
        }
        let id = self.props.id.as_str();
        let filter = |ctx: &FilterContext<'_>| ctx.layer_id == id;
        engine.draw_layers(&DrawPass {
            reason: REPAINT_REASON,
            viewports: vec![viewport],
            layer_filter: &filter,
            clear_stack: computed,
            clear_canvas: false,
        });
        drop(engine);

        context.tracer().draw(&DrawEvent {
            map: context.map_id(),
            layer_id: Some(id),
            computed_viewport: computed,
        });
    }

    fn set_props(&mut self, props: &LayerProps) {
        self.props.merge_from(props);
        if let Some(context) = &self.context {
            context.update_handle(&self.props);
        }
    }
}
