// Copyright 2026 the Interlay Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing, JSON capture, and Chrome trace export for interlay
//! diagnostics.
//!
//! This crate provides [`TraceSink`](interlay_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`] — human-readable one-line-per-event output.
//! - [`json::JsonSink`] — events captured as `serde_json` values.
//! - [`chrome::export`] — writes Chrome Trace Event Format JSON from a
//!   [`json::JsonSink`].

pub mod chrome;
pub mod json;
pub mod pretty;
