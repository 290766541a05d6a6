// Copyright 2026 the Interlay Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DOM overlay surfaces.
//!
//! In overlaid mode the engine draws into its own canvas, parented to a
//! `<div>` that sits exactly over the host map and lets pointer events fall
//! through to it. Interleaved mode only needs a bare placeholder element for
//! the host's control container.

use std::cell::RefCell;
use std::rc::Rc;

use interlay_core::error::CompositorError;
use interlay_core::host::{OverlaySurface, SurfaceFactory, SurfaceHandle};
use kurbo::Size;
use wasm_bindgen::{JsCast as _, JsValue};
use web_sys::{Document, HtmlElement};

/// Inline styles applied to overlay elements.
const OVERLAY_STYLE: [(&str, &str); 4] = [
    ("position", "absolute"),
    ("left", "0"),
    ("top", "0"),
    ("pointer-events", "none"),
];

/// A `<div>` the engine canvas is parented to.
pub struct DomSurface {
    element: HtmlElement,
    overlay: bool,
    size: Option<Size>,
}

impl core::fmt::Debug for DomSurface {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DomSurface")
            .field("element", &"HtmlElement")
            .field("overlay", &self.overlay)
            .field("size", &self.size)
            .finish()
    }
}

impl DomSurface {
    /// Creates a detached `<div>` in `document`.
    ///
    /// With `overlay`, the element is absolutely positioned at the top-left
    /// of its container and ignores pointer events.
    ///
    /// # Errors
    ///
    /// Returns the DOM exception if the element cannot be created or styled.
    pub fn new(document: &Document, overlay: bool) -> Result<Self, JsValue> {
        let element: HtmlElement = document.create_element("div")?.unchecked_into();
        if overlay {
            let style = element.style();
            for (property, value) in OVERLAY_STYLE {
                style.set_property(property, value)?;
            }
        }
        Ok(Self {
            element,
            overlay,
            size: None,
        })
    }

    /// The underlying element.
    #[must_use]
    pub fn element(&self) -> &HtmlElement {
        &self.element
    }

    /// Whether this is an overlay element rather than a placeholder.
    #[must_use]
    pub fn is_overlay(&self) -> bool {
        self.overlay
    }
}

impl OverlaySurface for DomSurface {
    fn resize(&mut self, size: Size) {
        let style = self.element.style();
        let _ = style.set_property("width", &css_px(size.width));
        let _ = style.set_property("height", &css_px(size.height));
        self.size = Some(size);
    }

    fn size(&self) -> Option<Size> {
        self.size
    }
}

/// Creates [`DomSurface`]s in one document.
#[derive(Clone)]
pub struct DomSurfaceFactory {
    document: Document,
}

impl core::fmt::Debug for DomSurfaceFactory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DomSurfaceFactory")
            .field("document", &"Document")
            .finish()
    }
}

impl DomSurfaceFactory {
    /// Creates a factory for `document`.
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// Creates a factory for the current window's document.
    ///
    /// Returns `None` outside a browser window (for example in a worker).
    #[must_use]
    pub fn from_window() -> Option<Self> {
        let document = web_sys::window()?.document()?;
        Some(Self::new(document))
    }
}

impl SurfaceFactory for DomSurfaceFactory {
    fn create(&self, overlay: bool) -> Result<SurfaceHandle, CompositorError> {
        let surface = DomSurface::new(&self.document, overlay).map_err(|err| {
            CompositorError::SurfaceCreation {
                reason: format!("{err:?}"),
            }
        })?;
        Ok(Rc::new(RefCell::new(surface)))
    }
}

/// Formats a CSS pixel length.
fn css_px(value: f64) -> String {
    format!("{value}px")
}
