// Copyright 2026 the Interlay Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads the events captured by a [`JsonSink`] and writes
//! [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Map, Value, json};

use crate::json::JsonSink;

/// Exports captured events as Chrome Trace Event Format JSON.
///
/// Every event becomes a thread-scoped instant event. Trace events carry no
/// wall-clock time, so the sequence number is used as the timestamp in
/// microseconds. Each map gets its own process row.
pub fn export(sink: &JsonSink, writer: &mut dyn Write) -> io::Result<()> {
    let events: Vec<Value> = sink.events().iter().map(instant).collect();
    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn instant(event: &Value) -> Value {
    let args: Map<String, Value> = event
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter(|(key, _)| !matches!(key.as_str(), "seq" | "event" | "map"))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default();
    let name = event["event"].as_str().unwrap_or("unknown");
    json!({
        "ph": "i",
        "name": name,
        "cat": category(name),
        "ts": event["seq"],
        "pid": event["map"],
        "tid": 0,
        "s": "t",
        "args": args,
    })
}

fn category(name: &str) -> &'static str {
    match name {
        "context" => "Registry",
        "reconcile" | "layer_op" => "Reconcile",
        "draw" => "Render",
        "pointer" => "Input",
        "error" => "Error",
        _ => "Other",
    }
}
