// Copyright 2026 the Interlay Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Opaque identity types shared between the compositor and its collaborators.
//!
//! Hosts and engines assign these values; the compositor only compares and
//! passes them through.

use core::fmt;

/// Identifies one live host map instance.
///
/// The [`ContextRegistry`](crate::registry::ContextRegistry) keys its entries
/// by this value, so two distinct maps must never report the same id while
/// both are alive.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MapId(pub u32);

impl fmt::Debug for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MapId({})", self.0)
    }
}

/// An opaque reference to a GL (or GPU) context owned by the host map.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlContextId(pub u32);

impl fmt::Debug for GlContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GlContextId({})", self.0)
    }
}

/// An opaque reference to the canvas an engine draws into.
///
/// Handed to the video-capture collaborator when the host goes idle.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanvasId(pub u32);

impl fmt::Debug for CanvasId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanvasId({})", self.0)
    }
}

/// A handle returned by [`HostMap::subscribe`](crate::host::HostMap::subscribe).
///
/// Pass it back to [`HostMap::unsubscribe`](crate::host::HostMap::unsubscribe)
/// to detach the listener.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

impl fmt::Debug for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListenerId({})", self.0)
    }
}
