// Copyright 2026 the Interlay Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collaborator modules injected into the compositor.
//!
//! The engine and surface implementations are loaded once by the embedding
//! application (possibly asynchronously) and handed to the compositor as
//! [`Libraries`]. Nothing in this crate constructs them on its own.

use std::fmt;
use std::rc::Rc;

use crate::engine::EngineFactory;
use crate::error::CompositorError;
use crate::host::SurfaceFactory;

/// Name reported when the engine core module is missing.
pub const ENGINE_CORE_MODULE: &str = "engine core";

/// Name reported when an overlay surface is needed but not provided.
pub const SURFACE_MODULE: &str = "overlay surface";

/// Resolves collaborator modules by name.
///
/// Returning `None` means the module is not installed.
pub trait ModuleLoader {
    /// Loads the engine core module.
    fn engine(&self) -> Option<Rc<dyn EngineFactory>>;

    /// Loads the overlay surface module. Only overlaid mode needs it.
    fn surfaces(&self) -> Option<Rc<dyn SurfaceFactory>>;
}

/// Loaded collaborator modules.
#[derive(Clone)]
pub struct Libraries {
    /// Builds engine instances.
    pub engine: Rc<dyn EngineFactory>,
    /// Builds overlay surfaces.
    pub surfaces: Option<Rc<dyn SurfaceFactory>>,
}

impl fmt::Debug for Libraries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Libraries")
            .field("engine", &"EngineFactory")
            .field("surfaces", &self.surfaces.is_some())
            .finish()
    }
}

impl Libraries {
    /// Bundles already-loaded modules.
    #[must_use]
    pub fn new(engine: Rc<dyn EngineFactory>, surfaces: Option<Rc<dyn SurfaceFactory>>) -> Self {
        Self { engine, surfaces }
    }

    /// Loads every module through `loader`.
    ///
    /// # Errors
    ///
    /// Returns [`CompositorError::MissingCollaborator`] naming
    /// [`ENGINE_CORE_MODULE`] if the engine is unavailable. A missing surface
    /// module is tolerated here and reported when overlaid mode needs it.
    pub fn load(loader: &dyn ModuleLoader) -> Result<Self, CompositorError> {
        let engine = loader
            .engine()
            .ok_or(CompositorError::MissingCollaborator {
                module: ENGINE_CORE_MODULE,
            })?;
        Ok(Self {
            engine,
            surfaces: loader.surfaces(),
        })
    }

    /// Returns the surface factory.
    ///
    /// # Errors
    ///
    /// Returns [`CompositorError::MissingCollaborator`] naming
    /// [`SURFACE_MODULE`] if none was loaded.
    pub fn surface_factory(&self) -> Result<&Rc<dyn SurfaceFactory>, CompositorError> {
        self.surfaces
            .as_ref()
            .ok_or(CompositorError::MissingCollaborator {
                module: SURFACE_MODULE,
            })
    }
}
