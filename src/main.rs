//! graphwire demo producer.
//!
//! Sends example graphs to a visualization listener so the front-end can be
//! checked by eye. The listener address comes from `GRAPHWIRE_*` variables
//! (default `localhost:8086`).
//!
//! ```text
//! graphwire-demo [simple|multi|live|trace|attributes]
//! ```

use std::fmt;
use std::time::Duration;

use anyhow::{bail, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use graphwire::value::MappingLike;
use graphwire::{AttrValue, Attrs, Graph, LabelSelection, Lineage, VisualizationClient};

const CHAIN_NODES: [&str; 5] = ["A", "B", "C", "D", "E"];
const CHAIN_EDGES: [(&str, &str); 5] = [("A", "B"), ("A", "C"), ("B", "D"), ("C", "D"), ("D", "E")];

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "graphwire=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    tracing::info!("Starting graphwire demo v{}", env!("CARGO_PKG_VERSION"));

    let demo = std::env::args().nth(1).unwrap_or_else(|| "simple".to_string());
    let mut client = VisualizationClient::from_env();

    let delivered = match demo.as_str() {
        "simple" => send_simple(&mut client).await,
        "multi" => send_multi(&mut client).await,
        "live" => send_live(&mut client).await,
        "trace" => send_trace(&mut client).await,
        "attributes" => send_attributes(&mut client).await,
        other => bail!(
            "Unknown demo '{}' (expected simple, multi, live, trace or attributes)",
            other
        ),
    };

    client.disconnect();

    if !delivered {
        bail!(
            "Visualization listener at {} did not acknowledge",
            client.config().address()
        );
    }
    Ok(())
}

async fn send_simple(client: &mut VisualizationClient) -> bool {
    let mut graph: Graph<&str> = Graph::directed();
    for node in CHAIN_NODES {
        graph.add_node(node);
    }
    for (u, v) in CHAIN_EDGES {
        graph.add_edge(u, v);
    }
    client
        .send_graph(&graph, "Simple Graph", &LabelSelection::default(), None)
        .await
}

async fn send_multi(client: &mut VisualizationClient) -> bool {
    let mut graph: Graph<&str> = Graph::multi_directed();
    let edges = [
        ("A", "B", 0),
        ("A", "B", 1),
        ("A", "C", 0),
        ("B", "D", 0),
        ("C", "D", 0),
        ("C", "D", 1),
        ("C", "D", 2),
        ("D", "E", 0),
        ("D", "E", 1),
        ("A", "D", 0),
        ("E", "C", 0),
    ];
    for (u, v, key) in edges {
        graph.add_keyed_edge(u, v, key);
    }
    client
        .send_graph(&graph, "Multi Graph", &LabelSelection::default(), None)
        .await
}

/// Grow the chain one node at a time, sending after each step.
async fn send_live(client: &mut VisualizationClient) -> bool {
    let mut graph: Graph<&str> = Graph::directed();
    let mut all_delivered = true;

    for node in CHAIN_NODES {
        graph.add_node(node);
        for (u, v) in CHAIN_EDGES.into_iter().filter(|&(_, v)| v == node) {
            graph.add_edge(u, v);
        }
        all_delivered &= client
            .send_graph(&graph, "Live Updates", &LabelSelection::default(), None)
            .await;
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    all_delivered
}

async fn send_trace(client: &mut VisualizationClient) -> bool {
    let mut graph: Graph<&str> = Graph::directed();
    let nodes = [
        ("Temperature Sensor", "sensor", "#4CAF50"),
        ("Humidity Sensor", "sensor", "#4CAF50"),
        ("Pressure Sensor", "sensor", "#4CAF50"),
        ("Data Validator", "processor", "#2196F3"),
        ("Data Aggregator", "processor", "#2196F3"),
        ("Anomaly Detector", "processor", "#2196F3"),
        ("Time Series DB", "storage", "#FF9800"),
        ("Alert System", "output", "#9C27B0"),
    ];
    for (name, kind, color) in nodes {
        graph.add_node_with(name, [("type", kind), ("color", color)]);
    }

    let flows = [
        ("Temperature Sensor", "Data Validator", 1, Vec::new()),
        ("Humidity Sensor", "Data Validator", 2, Vec::new()),
        ("Pressure Sensor", "Data Validator", 3, Vec::new()),
        ("Data Validator", "Data Aggregator", 4, vec![1, 2, 3]),
        ("Data Aggregator", "Time Series DB", 5, vec![4]),
        ("Data Aggregator", "Anomaly Detector", 6, vec![4]),
        ("Anomaly Detector", "Alert System", 7, vec![6]),
    ];

    let mut lineage = Lineage::new();
    for (source, target, msg_id, parents) in flows {
        graph.add_edge_with(source, target, [("msg_id", msg_id)]);
        lineage.record(msg_id, source, parents);
    }

    let traces = lineage.trace_map([4, 5, 7]);
    let labels = LabelSelection::new().nodes(["type", "color"]).edge("msg_id");
    client
        .send_graph(&graph, "Network Data Flow with Tracing", &labels, Some(&traces))
        .await
}

/// Attribute carrying its own mapping form.
#[derive(Debug)]
struct Contact {
    email: String,
    desk: u32,
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (desk {})", self.email, self.desk)
    }
}

impl MappingLike for Contact {
    fn to_mapping(&self) -> Result<Attrs> {
        Ok(Attrs::from([
            ("email".to_string(), self.email.as_str().into()),
            ("desk".to_string(), self.desk.into()),
        ]))
    }
}

async fn send_attributes(client: &mut VisualizationClient) -> bool {
    let mut graph: Graph<&str> = Graph::directed();
    let people = [
        ("Alice", "developer", "backend", "#4CAF50"),
        ("Bob", "developer", "frontend", "#4CAF50"),
        ("Diana", "manager", "product", "#F44336"),
        ("Frank", "tester", "qa", "#FF9800"),
    ];
    for (desk, (name, role, team, color)) in (1u32..).zip(people) {
        graph.add_node_with(
            name,
            [
                ("role", AttrValue::from(role)),
                ("team", AttrValue::from(team)),
                ("color", AttrValue::from(color)),
                (
                    "contact",
                    AttrValue::mapping(Contact {
                        email: format!("{}@example.com", name.to_lowercase()),
                        desk,
                    }),
                ),
            ],
        );
    }

    graph.add_edge_with("Diana", "Alice", [("type", "manages"), ("label", "manages")]);
    graph.add_edge_with("Diana", "Bob", [("type", "manages"), ("label", "manages")]);
    graph.add_edge_with("Frank", "Alice", [("type", "tests"), ("project", "api")]);
    graph.add_edge_with("Alice", "Bob", [("type", "collaboration"), ("project", "")]);

    let labels = LabelSelection::new()
        .nodes(["role", "team", "color", "contact"])
        .edges(["type", "project"]);
    client
        .send_graph(&graph, "Graph with Custom Attributes", &labels, None)
        .await
}
