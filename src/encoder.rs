//! Graph → wire document encoding.
//!
//! [`encode`] turns a [`Graph`] into a [`GraphDocument`]:
//!
//! ```text
//! { "title": "...", "nodes": [NodeRecord], "edges": [EdgeRecord], "trace": {...}? }
//! ```
//!
//! Only attribute keys named in the [`LabelSelection`] are visited, so the cost
//! of serializing odd attribute shapes is paid only for what the front-end
//! asked to show. Encoding never fails as a whole: a node or edge whose labels
//! cannot be built (for example a self-referencing attribute) is still emitted
//! with its id and name, empty labels, and a warning.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::graph::{Graph, NodeId};
use crate::trace::TraceMap;
use crate::value::{make_serializable, Attrs, EncodeError};

/// Title used when the caller passes an empty one.
pub const DEFAULT_TITLE: &str = "Graph Visualization";

/// Serialized node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub name: String,
    pub labels: BTreeMap<String, Value>,
}

/// Serialized edge. `name` is omitted when the edge has neither `name` nor `label`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub labels: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The payload sent to the listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub title: String,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceMap>,
}

/// Attribute keys to expose as labels, separately for nodes and edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelection {
    pub node: Vec<String>,
    pub edge: Vec<String>,
}

impl LabelSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose `key` on nodes.
    pub fn node(mut self, key: impl Into<String>) -> Self {
        self.node.push(key.into());
        self
    }

    /// Expose `key` on edges.
    pub fn edge(mut self, key: impl Into<String>) -> Self {
        self.edge.push(key.into());
        self
    }

    /// Expose every key in `keys` on nodes.
    pub fn nodes<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.node.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Expose every key in `keys` on edges.
    pub fn edges<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.edge.extend(keys.into_iter().map(Into::into));
        self
    }
}

/// Encode `graph` into a wire document.
///
/// The graph is only read. Edge endpoints are not checked against the node
/// set.
pub fn encode<N: NodeId>(
    graph: &Graph<N>,
    title: &str,
    selection: &LabelSelection,
    trace: Option<&TraceMap>,
) -> GraphDocument {
    let nodes: Vec<NodeRecord> = graph
        .nodes()
        .map(|node| {
            let id = node.id.canonical_id();
            let name = resolve_name(&node.attrs).unwrap_or_else(|| id.clone());
            let labels = labels_or_empty(&node.attrs, &selection.node, &id);
            NodeRecord { id, name, labels }
        })
        .collect();

    let edges: Vec<EdgeRecord> = graph
        .edges()
        .map(|edge| {
            let source = edge.source.canonical_id();
            let target = edge.target.canonical_id();
            let context = format!("{} -> {}", source, target);
            EdgeRecord {
                labels: labels_or_empty(&edge.attrs, &selection.edge, &context),
                name: resolve_name(&edge.attrs),
                source,
                target,
            }
        })
        .collect();

    debug!(
        "Encoded graph '{}': {} nodes, {} edges, trace={}",
        title,
        nodes.len(),
        edges.len(),
        trace.is_some()
    );

    GraphDocument {
        title: if title.is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            title.to_string()
        },
        nodes,
        edges,
        trace: trace.cloned(),
    }
}

/// `name`, then `label`, skipping falsy values.
fn resolve_name(attrs: &Attrs) -> Option<String> {
    ["name", "label"]
        .iter()
        .filter_map(|key| attrs.get(*key))
        .find(|value| !value.is_falsy())
        .map(|value| value.to_string())
}

/// Collect the requested labels of one element.
///
/// Keys missing from `attrs` and falsy values are omitted. The first value
/// that cannot be serialized fails the whole element.
pub fn collect_labels(
    attrs: &Attrs,
    keys: &[String],
) -> Result<BTreeMap<String, Value>, EncodeError> {
    let mut labels = BTreeMap::new();
    for key in keys {
        let Some(value) = attrs.get(key) else {
            continue;
        };
        if let Some(json) = make_serializable(value)? {
            labels.insert(key.clone(), json);
        }
    }
    Ok(labels)
}

fn labels_or_empty(attrs: &Attrs, keys: &[String], element: &str) -> BTreeMap<String, Value> {
    collect_labels(attrs, keys).unwrap_or_else(|e| {
        warn!("Skipping labels for {}: {}", element, e);
        BTreeMap::new()
    })
}
