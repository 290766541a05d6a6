// Copyright 2026 the Interlay Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the compositor.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! registry, reconciler, shims and control call as they work. All method
//! bodies default to no-ops, so implementing only the events you care about is
//! fine.
//!
//! [`Tracer`] is a cheap, cloneable handle around an optional shared sink.
//! When the `trace` feature is **off**, every `Tracer` method compiles to
//! nothing. When **on**, each method performs a single `Option` branch before
//! dispatching.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies.

use std::cell::RefCell;
use std::rc::Rc;

use crate::engine::EngineEventKind;
use crate::error::CompositorError;
use crate::host::PointerKind;
use crate::id::MapId;
use crate::reconcile::ReconcileStats;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What happened to a render context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContextChange {
    /// A context was created for the map.
    Created {
        /// Whether the engine was supplied by the caller.
        externally_owned: bool,
    },
    /// The context was dropped from the registry.
    Released {
        /// Whether the engine was finalized as part of the release.
        finalized: bool,
    },
}

/// What the reconciler did to one native layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerOp {
    /// Inserted into the host stack.
    Added,
    /// Removed from the host stack.
    Removed,
    /// Received new props.
    Updated,
    /// Moved within the host stack.
    Moved,
}

/// Host-driven work whose failure cannot be returned to a caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorSource {
    /// Reconciliation re-run after a host style change.
    StyleReconcile,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a render context is created or released.
#[derive(Clone, Copy, Debug)]
pub struct ContextEvent {
    /// Map the context belongs to.
    pub map: MapId,
    /// What happened.
    pub change: ContextChange,
}

/// Emitted after a reconciliation pass.
#[derive(Clone, Copy, Debug)]
pub struct ReconcileEvent {
    /// Map that was reconciled.
    pub map: MapId,
    /// `None` when the pass was deferred because the host was not ready.
    pub stats: Option<ReconcileStats>,
}

/// Emitted for each native layer mutation.
#[derive(Clone, Copy, Debug)]
pub struct LayerOpEvent<'a> {
    /// Map whose stack changed.
    pub map: MapId,
    /// Layer concerned.
    pub layer_id: &'a str,
    /// What happened.
    pub op: LayerOp,
    /// Anchor for additions and moves; `None` means top of the stack.
    pub before_id: Option<&'a str>,
}

/// Emitted for each partial draw requested from the engine.
#[derive(Clone, Copy, Debug)]
pub struct DrawEvent<'a> {
    /// Map being painted.
    pub map: MapId,
    /// Layer drawn, or `None` for the after-render pass.
    pub layer_id: Option<&'a str>,
    /// Whether this draw computed the cycle's viewport.
    pub computed_viewport: bool,
}

/// Emitted when a host pointer event is forwarded to the engine.
#[derive(Clone, Copy, Debug)]
pub struct PointerEvent {
    /// Map the event came from.
    pub map: MapId,
    /// Host event type.
    pub host: PointerKind,
    /// Engine event type it became.
    pub engine: EngineEventKind,
    /// Tap count passed to the engine.
    pub tap_count: u8,
}

/// Emitted when work run from a host listener fails.
#[derive(Clone, Copy, Debug)]
pub struct ErrorEvent<'a> {
    /// Map whose listener failed.
    pub map: MapId,
    /// What was running.
    pub source: ErrorSource,
    /// The failure.
    pub error: &'a CompositorError,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the compositor.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a render context is created or released.
    fn on_context(&mut self, e: &ContextEvent) {
        _ = e;
    }

    /// Called after each reconciliation pass.
    fn on_reconcile(&mut self, e: &ReconcileEvent) {
        _ = e;
    }

    /// Called for each native layer mutation.
    fn on_layer_op(&mut self, e: &LayerOpEvent<'_>) {
        _ = e;
    }

    /// Called for each partial draw.
    fn on_draw(&mut self, e: &DrawEvent<'_>) {
        _ = e;
    }

    /// Called when a pointer event is forwarded.
    fn on_pointer(&mut self, e: &PointerEvent) {
        _ = e;
    }

    /// Called when work run from a host listener fails.
    fn on_error(&mut self, e: &ErrorEvent<'_>) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer handle
// ---------------------------------------------------------------------------

/// Shared handle to an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
/// When **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
#[derive(Clone, Default)]
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Rc<RefCell<dyn TraceSink>>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Tracer {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: Rc<RefCell<dyn TraceSink>>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {}
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Emits a [`ContextEvent`].
    #[inline]
    pub fn context(&self, e: &ContextEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &self.sink {
            s.borrow_mut().on_context(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ReconcileEvent`].
    #[inline]
    pub fn reconcile(&self, e: &ReconcileEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &self.sink {
            s.borrow_mut().on_reconcile(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`LayerOpEvent`].
    #[inline]
    pub fn layer_op(&self, e: &LayerOpEvent<'_>) {
        #[cfg(feature = "trace")]
        if let Some(s) = &self.sink {
            s.borrow_mut().on_layer_op(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DrawEvent`].
    #[inline]
    pub fn draw(&self, e: &DrawEvent<'_>) {
        #[cfg(feature = "trace")]
        if let Some(s) = &self.sink {
            s.borrow_mut().on_draw(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PointerEvent`].
    #[inline]
    pub fn pointer(&self, e: &PointerEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &self.sink {
            s.borrow_mut().on_pointer(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`ErrorEvent`].
    #[inline]
    pub fn error(&self, e: &ErrorEvent<'_>) {
        #[cfg(feature = "trace")]
        if let Some(s) = &self.sink {
            s.borrow_mut().on_error(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
