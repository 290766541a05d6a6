// Copyright 2026 the Interlay Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host pointer events → engine pointer events.
//!
//! In overlaid mode the engine's canvas ignores pointer input, so host
//! events are forwarded by hand:
//!
//! | Host        | Engine type    | Entry points                   | Tap count |
//! |-------------|----------------|--------------------------------|-----------|
//! | `mousemove` | `pointermove`  | `on_pointer_move`              | 0         |
//! | `mouseout`  | `pointerleave` | `on_pointer_move`              | 0         |
//! | `click`     | `click`        | `on_pointer_down`, `on_event`  | 1         |
//! | `dblclick`  | `click`        | `on_event`                     | 2         |
//!
//! A click triggers picking through `on_pointer_down` because the host never
//! reports pointer-down. Double clicks are not debounced: the host fires two
//! `click`s before the `dblclick`, and all three are forwarded.

use crate::engine::{EngineEventKind, EnginePointerEvent, RenderEngine};
use crate::host::{PointerInput, PointerKind};

/// Which engine entry points an event goes through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerRoute {
    /// `on_pointer_move` only.
    Move,
    /// `on_pointer_down`, then `on_event`.
    DownThenEvent,
    /// `on_event` only.
    Event,
}

/// Translates a host pointer event.
#[must_use]
pub fn translate(input: &PointerInput) -> (EnginePointerEvent, PointerRoute) {
    let (kind, tap_count, route) = match input.kind {
        PointerKind::MouseMove => (EngineEventKind::PointerMove, 0, PointerRoute::Move),
        PointerKind::MouseOut => (EngineEventKind::PointerLeave, 0, PointerRoute::Move),
        PointerKind::Click => (EngineEventKind::Click, 1, PointerRoute::DownThenEvent),
        PointerKind::DblClick => (EngineEventKind::Click, 2, PointerRoute::Event),
    };
    let event = EnginePointerEvent {
        kind,
        offset_center: input.point,
        tap_count,
    };
    (event, route)
}

/// Translates `input` and feeds it to `engine`. Returns the engine event.
pub fn forward(engine: &mut dyn RenderEngine, input: &PointerInput) -> EnginePointerEvent {
    let (event, route) = translate(input);
    match route {
        PointerRoute::Move => engine.on_pointer_move(&event),
        PointerRoute::DownThenEvent => {
            engine.on_pointer_down(&event);
            engine.on_event(&event);
        }
        PointerRoute::Event => engine.on_event(&event),
    }
    event
}
