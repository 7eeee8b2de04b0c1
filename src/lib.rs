//! graphwire - push attributed graph snapshots to a visualization listener.
//!
//! This library provides the producer side of a graph visualization setup:
//!
//! - `graph` - attributed, (un)directed, (multi)graph model built by the caller
//! - `value` - attribute value shapes and their JSON reduction
//! - `encoder` - graph → wire document (`GraphDocument`)
//! - `trace` - message provenance attached to edges
//! - `transport` - ZeroMQ request/reply client delivering documents
//! - `config` - client configuration and environment overrides
//!
//! # Example
//!
//! ```ignore
//! use graphwire::{Graph, LabelSelection, VisualizationClient};
//!
//! let mut graph: Graph<&str> = Graph::directed();
//! graph.add_node_with("Alice", [("role", "developer")]);
//! graph.add_edge_with("Alice", "Bob", [("type", "mentors")]);
//!
//! let labels = LabelSelection::new().node("role").edge("type");
//! let mut client = VisualizationClient::default();
//! client.send_graph(&graph, "Team", &labels, None).await;
//! ```

pub mod config;
pub mod encoder;
pub mod graph;
pub mod trace;
pub mod transport;
pub mod value;

pub use config::ClientConfig;
pub use encoder::{encode, EdgeRecord, GraphDocument, LabelSelection, NodeRecord};
pub use graph::{Edge, Graph, GraphKind, Node, NodeId};
pub use trace::{Lineage, MessageId, TraceMap, TracePath, TraceStep};
pub use transport::{SendError, TransportError, VisualizationClient};
pub use value::{make_serializable, AttrValue, Attrs, EncodeError};
