// Copyright 2026 the Interlay Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Declarative list → host layer stack.
//!
//! [`reconcile`] turns the difference between two [`LayerList`]s into the
//! minimum native mutations on the host stack, in three steps:
//!
//! 1. **Removal.** Ids present in the old list but not the new one are
//!    removed from the host. Skipped when both lists are the same
//!    allocation.
//! 2. **Addition / update.** Layers the host already has as custom layers get
//!    new props; the rest are inserted as fresh [`LayerShim`]s before their
//!    `before_id`, or on top.
//! 3. **Order enforcement.** Layers are grouped by resolved `before_id` (ids
//!    the host does not know mean "no constraint"). For each group, in
//!    first-seen order, the layers are walked in reverse from the anchor
//!    (the `before_id` layer, or the top of the stack) and only layers that
//!    are out of place are moved.
//!
//! Layers sharing a `before_id` keep their list order. Calling `reconcile`
//! again with the same list performs no native mutation.

use std::rc::Rc;

use hashbrown::HashSet;

use crate::engine::SharedEngine;
use crate::error::CompositorError;
use crate::host::HostMap;
use crate::layer::{LayerList, LayerProps, flatten, flatten_checked, same_list};
use crate::registry::ContextRegistry;
use crate::shim::LayerShim;
use crate::trace::{LayerOp, LayerOpEvent, ReconcileEvent, Tracer};

/// Counts of native mutations performed by one pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ReconcileStats {
    /// Layers removed from the host.
    pub removed: usize,
    /// Shims inserted into the host.
    pub added: usize,
    /// Existing shims that received new props.
    pub updated: usize,
    /// Layers moved within the host stack.
    pub moved: usize,
}

impl ReconcileStats {
    /// Number of structural mutations (everything except prop updates).
    #[must_use]
    pub fn mutations(&self) -> usize {
        self.removed + self.added + self.moved
    }
}

/// Result of a reconciliation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The host style was not loaded; nothing was touched.
    Deferred,
    /// The pass ran.
    Applied(ReconcileStats),
}

/// Brings the host stack from `old` to `new`.
///
/// New shims are bound to `engine` through `registry`.
///
/// # Errors
///
/// Returns [`CompositorError::InvalidConfiguration`] before touching the
/// host if `new` contains an empty or duplicate id, or an id already used by
/// a host-native layer. Errors from [`HostMap::add_layer`] are propagated.
pub fn reconcile(
    map: &mut dyn HostMap,
    registry: &ContextRegistry,
    engine: &SharedEngine,
    old: &LayerList,
    new: &LayerList,
) -> Result<ReconcileOutcome, CompositorError> {
    let tracer = registry.tracer();
    if !map.is_style_loaded() {
        tracer.reconcile(&ReconcileEvent {
            map: map.id(),
            stats: None,
        });
        return Ok(ReconcileOutcome::Deferred);
    }

    let layers = flatten_checked(new)?;
    check_native_ids(map, &layers)?;

    let mut stats = ReconcileStats::default();
    if !same_list(old, new) {
        remove_stale(map, tracer, old, &layers, &mut stats);
    }
    add_or_update(map, registry, engine, &layers, &mut stats)?;
    enforce_order(map, tracer, &layers, &mut stats);

    tracer.reconcile(&ReconcileEvent {
        map: map.id(),
        stats: Some(stats),
    });
    Ok(ReconcileOutcome::Applied(stats))
}

/// Rejects logical layer ids already taken by host-native layers.
pub(crate) fn check_native_ids(
    map: &dyn HostMap,
    layers: &[Rc<LayerProps>],
) -> Result<(), CompositorError> {
    for layer in layers {
        if map.has_layer(&layer.id) && map.custom_layer(&layer.id).is_none() {
            return Err(CompositorError::invalid(format!(
                "layer id `{}` is already used by a host layer",
                layer.id
            )));
        }
    }
    Ok(())
}

fn remove_stale(
    map: &mut dyn HostMap,
    tracer: &Tracer,
    old: &LayerList,
    layers: &[Rc<LayerProps>],
    stats: &mut ReconcileStats,
) {
    let keep: HashSet<&str> = layers.iter().map(|l| l.id.as_str()).collect();
    let mut seen = HashSet::new();
    for layer in flatten(old) {
        if keep.contains(layer.id.as_str()) || !seen.insert(layer.id.clone()) {
            continue;
        }
        if map.has_layer(&layer.id) {
            map.remove_layer(&layer.id);
            stats.removed += 1;
            tracer.layer_op(&LayerOpEvent {
                map: map.id(),
                layer_id: &layer.id,
                op: LayerOp::Removed,
                before_id: None,
            });
        }
    }
}

fn add_or_update(
    map: &mut dyn HostMap,
    registry: &ContextRegistry,
    engine: &SharedEngine,
    layers: &[Rc<LayerProps>],
    stats: &mut ReconcileStats,
) -> Result<(), CompositorError> {
    let tracer = registry.tracer();
    for layer in layers {
        if let Some(existing) = map.custom_layer(&layer.id) {
            existing.borrow_mut().set_props(layer);
            stats.updated += 1;
            tracer.layer_op(&LayerOpEvent {
                map: map.id(),
                layer_id: &layer.id,
                op: LayerOp::Updated,
                before_id: None,
            });
            continue;
        }

        let shim = LayerShim::new(
            LayerProps::clone(layer),
            registry.clone(),
            Some(Rc::clone(engine)),
        )?;
        let before = layer
            .before_id
            .as_deref()
            .filter(|before| map.has_layer(before));
        map.add_layer(shim.into_ref(), before)?;
        stats.added += 1;
        tracer.layer_op(&LayerOpEvent {
            map: map.id(),
            layer_id: &layer.id,
            op: LayerOp::Added,
            before_id: before,
        });
    }
    Ok(())
}

/// Moves layers until every group sits right below its anchor.
fn enforce_order(
    map: &mut dyn HostMap,
    tracer: &Tracer,
    layers: &[Rc<LayerProps>],
    stats: &mut ReconcileStats,
) {
    let mut order = map.layer_order();

    // `None` anchors the group at the top of the stack.
    let mut groups: Vec<(Option<&str>, Vec<&str>)> = Vec::new();
    for layer in layers {
        let anchor = layer
            .before_id
            .as_deref()
            .filter(|before| *before != layer.id && order.iter().any(|id| id == before));
        match groups.iter_mut().find(|(a, _)| *a == anchor) {
            Some((_, members)) => members.push(layer.id.as_str()),
            None => groups.push((anchor, vec![layer.id.as_str()])),
        }
    }

    for (anchor, members) in &groups {
        let mut last_index = anchor
            .and_then(|a| position(&order, a))
            .unwrap_or(order.len());
        let mut last_id = *anchor;
        for id in members.iter().rev() {
            let Some(index) = position(&order, id) else {
                continue;
            };
            if index + 1 != last_index {
                map.move_layer(id, last_id);
                stats.moved += 1;
                tracer.layer_op(&LayerOpEvent {
                    map: map.id(),
                    layer_id: id,
                    op: LayerOp::Moved,
                    before_id: last_id,
                });
                if index > last_index {
                    // The anchor shifted up by one.
                    last_index += 1;
                }
                order = map.layer_order();
            }
            last_index = last_index.saturating_sub(1);
            last_id = Some(*id);
        }
    }
}

fn position(order: &[String], id: &str) -> Option<usize> {
    order.iter().position(|o| o == id)
}
