// Copyright 2026 the Interlay Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type for compositor operations.

use core::fmt;

/// Errors from compositor operations.
///
/// A host whose style has not finished loading is not an error: reconciliation
/// reports [`ReconcileOutcome::Deferred`](crate::reconcile::ReconcileOutcome::Deferred)
/// and waits for the next host event instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompositorError {
    /// A logical layer is missing its identifier, or an identifier appears
    /// more than once in one declarative list.
    InvalidConfiguration {
        /// What was wrong with the configuration.
        reason: String,
    },
    /// A required collaborator module could not be loaded.
    MissingCollaborator {
        /// Name of the module that is missing.
        module: &'static str,
    },
    /// An operation was called before the state it depends on exists.
    PreconditionFailed {
        /// The operation that was attempted.
        what: &'static str,
    },
    /// The engine factory refused to build a render instance.
    EngineCreation {
        /// Reason reported by the factory.
        reason: String,
    },
    /// The surface factory could not create an overlay element.
    SurfaceCreation {
        /// Reason reported by the factory.
        reason: String,
    },
}

impl CompositorError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CompositorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfiguration { reason } => {
                write!(f, "invalid layer configuration: {reason}")
            }
            Self::MissingCollaborator { module } => {
                write!(f, "required module `{module}` is not available")
            }
            Self::PreconditionFailed { what } => {
                write!(f, "{what} called before the render instance exists")
            }
            Self::EngineCreation { reason } => {
                write!(f, "render instance creation failed: {reason}")
            }
            Self::SurfaceCreation { reason } => {
                write!(f, "overlay surface creation failed: {reason}")
            }
        }
    }
}

impl core::error::Error for CompositorError {}
