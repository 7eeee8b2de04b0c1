//! Transport from producer to visualization listener.
//!
//! This module delivers encoded graph snapshots to a remote listener over a
//! ZeroMQ request socket with strict request/reply alternation.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────┐        tcp://host:port      ┌──────────────────────┐
//! │  Producer process     │  ──── graph snapshot ─────► │  Visualization       │
//! │  (VisualizationClient)│  ◄──── acknowledgement ──── │  listener            │
//! └───────────────────────┘     REQ            REP      └──────────────────────┘
//! ```
//!
//! # Protocol
//!
//! One exchange per snapshot: a request holding the JSON document as a single
//! text frame, then exactly one reply frame holding an acknowledgement string.
//!
//! ```text
//! REQ  {"title":"Simple Graph","nodes":[...],"edges":[...]}
//! REP  Graph received
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use graphwire::transport::VisualizationClient;
//!
//! let mut client = VisualizationClient::new("localhost", 8086);
//! let delivered = client.send_graph(&graph, "Simple Graph", &labels, None).await;
//! ```

mod client;

pub use client::{
    Connector, Exchange, SendError, TransportError, VisualizationClient, ZmqConnector,
    ZmqTransport,
};
