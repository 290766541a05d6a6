// Copyright 2026 the Interlay Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use interlay_core::trace::{
    ContextChange, ContextEvent, DrawEvent, ErrorEvent, LayerOp, LayerOpEvent, PointerEvent,
    ReconcileEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the destination.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn op_name(op: LayerOp) -> &'static str {
    match op {
        LayerOp::Added => "add",
        LayerOp::Removed => "remove",
        LayerOp::Updated => "update",
        LayerOp::Moved => "move",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_context(&mut self, e: &ContextEvent) {
        let _ = match e.change {
            ContextChange::Created { externally_owned } => writeln!(
                self.writer,
                "[context:create] map={} external={externally_owned}",
                e.map.0,
            ),
            ContextChange::Released { finalized } => writeln!(
                self.writer,
                "[context:release] map={} finalized={finalized}",
                e.map.0,
            ),
        };
    }

    fn on_reconcile(&mut self, e: &ReconcileEvent) {
        let _ = match e.stats {
            Some(s) => writeln!(
                self.writer,
                "[reconcile] map={} removed={} added={} updated={} moved={}",
                e.map.0, s.removed, s.added, s.updated, s.moved,
            ),
            None => writeln!(self.writer, "[reconcile] map={} deferred", e.map.0),
        };
    }

    fn on_layer_op(&mut self, e: &LayerOpEvent<'_>) {
        let before = e.before_id.unwrap_or("<top>");
        let _ = writeln!(
            self.writer,
            "[layer:{}] map={} id={} before={before}",
            op_name(e.op),
            e.map.0,
            e.layer_id,
        );
    }

    fn on_draw(&mut self, e: &DrawEvent<'_>) {
        let layer = e.layer_id.unwrap_or("<after-render>");
        let _ = writeln!(
            self.writer,
            "[draw] map={} layer={layer} viewport={}",
            e.map.0,
            if e.computed_viewport { "computed" } else { "cached" },
        );
    }

    fn on_pointer(&mut self, e: &PointerEvent) {
        let _ = writeln!(
            self.writer,
            "[pointer] map={} {:?} -> {:?} taps={}",
            e.map.0, e.host, e.engine, e.tap_count,
        );
    }

    fn on_error(&mut self, e: &ErrorEvent<'_>) {
        let _ = writeln!(
            self.writer,
            "[error] map={} source={:?} {}",
            e.map.0, e.source, e.error,
        );
    }
}
