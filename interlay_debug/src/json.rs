// Copyright 2026 the Interlay Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trace events as JSON values.
//!
//! [`JsonSink`] implements [`TraceSink`] and keeps every event as a
//! [`serde_json::Value`] object with a `"seq"` number, an `"event"` name, the
//! `"map"` id, and event-specific fields. The values can be written out
//! directly or fed to [`chrome::export`](crate::chrome::export).

use std::io::{self, Write};

use serde_json::{Value, json};

use interlay_core::trace::{
    ContextChange, ContextEvent, DrawEvent, ErrorEvent, LayerOp, LayerOpEvent, PointerEvent,
    ReconcileEvent, TraceSink,
};

/// A [`TraceSink`] that records events as JSON values.
#[derive(Debug, Default)]
pub struct JsonSink {
    events: Vec<Value>,
}

impl JsonSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far, oldest first.
    #[must_use]
    pub fn events(&self) -> &[Value] {
        &self.events
    }

    /// Consumes the sink and returns the recorded events.
    #[must_use]
    pub fn into_events(self) -> Vec<Value> {
        self.events
    }

    /// Writes the events as one pretty-printed JSON array.
    pub fn write_to(&self, writer: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(writer, &self.events)?;
        Ok(())
    }

    fn push(&mut self, event: &str, map: u32, mut fields: Value) {
        if let Value::Object(obj) = &mut fields {
            obj.insert("seq".into(), json!(self.events.len()));
            obj.insert("event".into(), json!(event));
            obj.insert("map".into(), json!(map));
        }
        self.events.push(fields);
    }
}

fn op_name(op: LayerOp) -> &'static str {
    match op {
        LayerOp::Added => "added",
        LayerOp::Removed => "removed",
        LayerOp::Updated => "updated",
        LayerOp::Moved => "moved",
    }
}

impl TraceSink for JsonSink {
    fn on_context(&mut self, e: &ContextEvent) {
        let fields = match e.change {
            ContextChange::Created { externally_owned } => json!({
                "change": "created",
                "externally_owned": externally_owned,
            }),
            ContextChange::Released { finalized } => json!({
                "change": "released",
                "finalized": finalized,
            }),
        };
        self.push("context", e.map.0, fields);
    }

    fn on_reconcile(&mut self, e: &ReconcileEvent) {
        let fields = match e.stats {
            Some(s) => json!({
                "deferred": false,
                "removed": s.removed,
                "added": s.added,
                "updated": s.updated,
                "moved": s.moved,
            }),
            None => json!({ "deferred": true }),
        };
        self.push("reconcile", e.map.0, fields);
    }

    fn on_layer_op(&mut self, e: &LayerOpEvent<'_>) {
        self.push(
            "layer_op",
            e.map.0,
            json!({
                "layer_id": e.layer_id,
                "op": op_name(e.op),
                "before_id": e.before_id,
            }),
        );
    }

    fn on_draw(&mut self, e: &DrawEvent<'_>) {
        self.push(
            "draw",
            e.map.0,
            json!({
                "layer_id": e.layer_id,
                "computed_viewport": e.computed_viewport,
            }),
        );
    }

    fn on_pointer(&mut self, e: &PointerEvent) {
        self.push(
            "pointer",
            e.map.0,
            json!({
                "host": format!("{:?}", e.host),
                "engine": format!("{:?}", e.engine),
                "tap_count": e.tap_count,
            }),
        );
    }

    fn on_error(&mut self, e: &ErrorEvent<'_>) {
        self.push(
            "error",
            e.map.0,
            json!({
                "source": format!("{:?}", e.source),
                "message": e.error.to_string(),
            }),
        );
    }
}
