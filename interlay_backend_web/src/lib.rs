// Copyright 2026 the Interlay Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web backend for interlay.
//!
//! This crate provides the browser side of overlaid mode:
//!
//! - [`DomSurface`]: a `<div>` stacked over the host map's canvas
//! - [`DomSurfaceFactory`]: creates surfaces from a [`Document`](web_sys::Document)

mod surface;

pub use interlay_core::host::{OverlaySurface, SurfaceFactory};
pub use surface::{DomSurface, DomSurfaceFactory};
