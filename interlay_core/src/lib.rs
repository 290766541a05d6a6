// Copyright 2026 the Interlay Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositor that runs a declarative GPU layer engine inside a host map.
//!
//! `interlay_core` keeps an overlay engine and an imperative base-map
//! renderer in visual and temporal sync. It shares one engine instance per
//! map, mirrors the host camera into the engine's viewport, reconciles a
//! declarative list of logical layers against the host's own layer stack, and
//! forwards host pointer events to the engine.
//!
//! # Architecture
//!
//! The host map calls into the compositor through two small plugin traits and
//! a set of events:
//!
//! ```text
//!   CompositorControl::set_props(layers)
//!       │
//!       ▼
//!   reconcile() ──► HostMap::add_layer / move_layer / remove_layer
//!                          │
//!                          ▼
//!                   LayerShim::on_add ──► ContextRegistry::obtain_context
//!                                                │
//!                 ┌──────────────────────────────┘
//!                 ▼
//!   RenderContext (one per map) ──► RenderEngine
//!       ▲                              ▲
//!       │ move / render / remove       │ draw_layers (one layer per shim)
//!   HostMap events                 LayerShim::render
//! ```
//!
//! **[`control`]** — [`CompositorControl`](control::CompositorControl), the
//! entry point. In interleaved mode it reconciles layers into the host stack;
//! in overlaid mode it drives an engine on its own surface above the map.
//!
//! **[`registry`]** — At most one [`RenderContext`](registry::RenderContext)
//! per map, plus the host hooks that keep it in sync and tear it down.
//!
//! **[`reconcile`]** — Declarative-to-imperative layer diff with a greedy
//! reorder pass honoring `before_id` constraints.
//!
//! **[`shim`]** — [`LayerShim`](shim::LayerShim), the host custom layer that
//! draws one logical layer through the shared engine.
//!
//! **[`viewport`]** — Host camera to engine view state, including terrain
//! elevation correction.
//!
//! **[`pointer`]** — Host pointer events to engine pointer events.
//!
//! **[`capture`]** — Frame-by-frame video capture driven by the map's idle
//! event.
//!
//! **[`host`]** and **[`engine`]** — The collaborator traits the host map and
//! overlay engine implement. **[`libs`]** resolves the engine and surface
//! factories once at startup.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types, with
//! a zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! Everything runs on the host's UI thread. Shared state is reference counted
//! with `Rc` and listeners hold only weak references back into it.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod capture;
pub mod control;
pub mod engine;
pub mod error;
pub mod host;
pub mod id;
pub mod layer;
pub mod libs;
pub mod pointer;
pub mod reconcile;
pub mod registry;
pub mod shim;
pub mod trace;
pub mod viewport;

#[cfg(test)]
mod testing;
