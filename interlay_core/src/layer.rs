// Copyright 2026 the Interlay Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Declarative layer descriptions.
//!
//! Callers describe what to draw as a [`LayerList`]: an ordered, possibly
//! nested list of [`LayerNode`]s. Each leaf is a [`LayerProps`] shared through
//! an `Rc`, so the compositor can read caller-owned descriptions without
//! copying or mutating them.
//!
//! Two lists are *the same list* when they are the same allocation
//! ([`same_list`]). Reconciliation uses this as a fast path for redraws that
//! did not change the structure at all.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::CompositorError;

/// A draw parameter value.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    /// A boolean flag.
    Bool(bool),
    /// A scalar.
    Number(f64),
    /// A string (accessor names, colors in CSS notation, ...).
    Text(String),
    /// A numeric vector (colors, offsets, ranges).
    Numbers(Vec<f64>),
}

/// Declarative description of one drawable unit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerProps {
    /// Identifier, unique within one declarative list.
    pub id: String,
    /// Identifier of a host-native layer this layer must render immediately
    /// before. `None` (or an id the host does not know) places the layer after
    /// every host layer.
    pub before_id: Option<String>,
    /// Draw parameters passed through to the engine.
    pub params: BTreeMap<String, ParamValue>,
}

impl LayerProps {
    /// Creates props with the given id and no constraint or parameters.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Sets the ordering constraint.
    #[must_use]
    pub fn before(mut self, before_id: impl Into<String>) -> Self {
        self.before_id = Some(before_id.into());
        self
    }

    /// Adds a draw parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Shallow-merges `update` into `self`.
    ///
    /// Parameters present in `update` overwrite ours; the ordering constraint
    /// is taken from `update`. The identifier never changes.
    pub fn merge_from(&mut self, update: &Self) {
        for (key, value) in &update.params {
            self.params.insert(key.clone(), value.clone());
        }
        self.before_id.clone_from(&update.before_id);
    }
}

/// How a custom layer participates in the host's depth handling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderingMode {
    /// Drawn without sharing the host's depth buffer.
    TwoD,
    /// Drawn depth-tested against host geometry.
    #[default]
    ThreeD,
}

/// One entry of a declarative layer list.
#[derive(Clone, Debug, PartialEq)]
pub enum LayerNode {
    /// A drawable layer.
    Layer(Rc<LayerProps>),
    /// A nested group, flattened in place.
    Group(Vec<LayerNode>),
    /// An absent slot (e.g. a conditionally disabled layer). Dropped by
    /// [`flatten`].
    Empty,
}

impl From<LayerProps> for LayerNode {
    fn from(props: LayerProps) -> Self {
        Self::Layer(Rc::new(props))
    }
}

impl From<Rc<LayerProps>> for LayerNode {
    fn from(props: Rc<LayerProps>) -> Self {
        Self::Layer(props)
    }
}

/// A declarative, ordered layer list.
pub type LayerList = Rc<[LayerNode]>;

/// Builds a [`LayerList`] from anything convertible into nodes.
#[must_use]
pub fn layer_list<I, N>(nodes: I) -> LayerList
where
    I: IntoIterator<Item = N>,
    N: Into<LayerNode>,
{
    nodes.into_iter().map(Into::into).collect()
}

/// Returns an empty layer list.
#[must_use]
pub fn empty_list() -> LayerList {
    Rc::from(Vec::new())
}

/// Returns whether `a` and `b` are the same list allocation.
#[must_use]
pub fn same_list(a: &LayerList, b: &LayerList) -> bool {
    Rc::ptr_eq(a, b)
}

/// Flattens nested groups depth-first, dropping [`LayerNode::Empty`] slots.
#[must_use]
pub fn flatten(nodes: &[LayerNode]) -> Vec<Rc<LayerProps>> {
    let mut out = Vec::new();
    flatten_into(nodes, &mut out);
    out
}

fn flatten_into(nodes: &[LayerNode], out: &mut Vec<Rc<LayerProps>>) {
    for node in nodes {
        match node {
            LayerNode::Layer(props) => out.push(Rc::clone(props)),
            LayerNode::Group(children) => flatten_into(children, out),
            LayerNode::Empty => {}
        }
    }
}

/// Flattens `nodes` and checks that every identifier is non-empty and unique.
///
/// # Errors
///
/// Returns [`CompositorError::InvalidConfiguration`] naming the first empty
/// or repeated identifier.
pub fn flatten_checked(nodes: &[LayerNode]) -> Result<Vec<Rc<LayerProps>>, CompositorError> {
    let layers = flatten(nodes);
    let mut seen = hashbrown::HashSet::with_capacity(layers.len());
    for layer in &layers {
        if layer.id.is_empty() {
            return Err(CompositorError::invalid("layer must have a non-empty id"));
        }
        if !seen.insert(layer.id.as_str()) {
            return Err(CompositorError::invalid(format!(
                "duplicate layer id `{}`",
                layer.id
            )));
        }
    }
    drop(seen);
    Ok(layers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(layers: &[Rc<LayerProps>]) -> Vec<&str> {
        layers.iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn flatten_walks_groups_in_order() {
        let list = [
            LayerNode::from(LayerProps::new("a")),
            LayerNode::Group(vec![
                LayerProps::new("b").into(),
                LayerNode::Empty,
                LayerNode::Group(vec![LayerProps::new("c").into()]),
            ]),
            LayerNode::Empty,
            LayerProps::new("d").into(),
        ];
        assert_eq!(ids(&flatten(&list)), ["a", "b", "c", "d"]);
    }

    #[test]
    fn flatten_checked_rejects_duplicates_across_groups() {
        let list = [
            LayerNode::from(LayerProps::new("a")),
            LayerNode::Group(vec![LayerProps::new("a").into()]),
        ];
        let err = flatten_checked(&list).unwrap_err();
        assert!(
            matches!(err, CompositorError::InvalidConfiguration { ref reason } if reason.contains("`a`")),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn flatten_checked_rejects_empty_id() {
        let list = [LayerNode::from(LayerProps::default())];
        assert!(
            flatten_checked(&list).is_err(),
            "empty ids must be rejected"
        );
    }

    #[test]
    fn merge_keeps_id_and_overwrites_params() {
        let mut props = LayerProps::new("roads")
            .with_param("width", ParamValue::Number(1.0))
            .with_param("visible", ParamValue::Bool(true));
        let mut update = LayerProps::new("ignored")
            .before("labels")
            .with_param("width", ParamValue::Number(3.0));
        update.id = "other".into();

        props.merge_from(&update);

        assert_eq!(props.id, "roads");
        assert_eq!(props.before_id.as_deref(), Some("labels"));
        assert_eq!(props.params["width"], ParamValue::Number(3.0));
        assert_eq!(props.params["visible"], ParamValue::Bool(true));
    }

    #[test]
    fn same_list_is_identity_not_content() {
        let a = layer_list([LayerProps::new("x")]);
        let b = layer_list([LayerProps::new("x")]);
        assert!(same_list(&a, &Rc::clone(&a)));
        assert!(!same_list(&a, &b));
        assert_eq!(a, b);
    }
}
