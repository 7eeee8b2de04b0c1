//! In-memory attributed graph built by the producer.
//!
//! A [`Graph`] is directed or undirected and may allow parallel edges
//! (multigraph). Node identifiers are any [`NodeId`]; nodes and edges carry an
//! open-ended [`Attrs`] mapping. Insertion order of nodes and edges is kept, so
//! encoded snapshots are stable across sends.

use std::collections::HashMap;
use std::hash::Hash;

use crate::value::{AttrValue, Attrs};

/// Node identifier with a canonical text form.
///
/// The canonical form is what ends up in `id`, `source` and `target` on the
/// wire. Two distinct identifiers must not share a canonical form.
pub trait NodeId: Clone + Eq + Hash {
    /// Canonical string form of this identifier.
    fn canonical_id(&self) -> String;

    /// Form used when this identifier is an element of a tuple identifier.
    fn canonical_element(&self) -> String {
        self.canonical_id()
    }
}

impl NodeId for String {
    fn canonical_id(&self) -> String {
        self.clone()
    }

    fn canonical_element(&self) -> String {
        format!("{:?}", self)
    }
}

impl NodeId for &str {
    fn canonical_id(&self) -> String {
        (*self).to_string()
    }

    fn canonical_element(&self) -> String {
        format!("{:?}", self)
    }
}

impl NodeId for char {
    fn canonical_id(&self) -> String {
        self.to_string()
    }

    fn canonical_element(&self) -> String {
        format!("{:?}", self)
    }
}

macro_rules! int_node_id {
    ($($t:ty),*) => {
        $(impl NodeId for $t {
            fn canonical_id(&self) -> String {
                self.to_string()
            }
        })*
    };
}

int_node_id!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

macro_rules! tuple_node_id {
    ($($name:ident),+) => {
        impl<$($name: NodeId),+> NodeId for ($($name,)+) {
            #[allow(non_snake_case)]
            fn canonical_id(&self) -> String {
                let ($($name,)+) = self;
                let parts = [$($name.canonical_element()),+];
                format!("({})", parts.join(", "))
            }
        }
    };
}

tuple_node_id!(A);
tuple_node_id!(A, B);
tuple_node_id!(A, B, C);
tuple_node_id!(A, B, C, D);

/// Structural flavour of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphKind {
    pub directed: bool,
    pub multigraph: bool,
}

/// A node and its attributes.
#[derive(Debug, Clone)]
pub struct Node<N> {
    pub id: N,
    pub attrs: Attrs,
}

/// An edge between two nodes.
///
/// `key` distinguishes parallel edges in a multigraph and is always 0 in a
/// simple graph.
#[derive(Debug, Clone)]
pub struct Edge<N> {
    pub source: N,
    pub target: N,
    pub key: u32,
    pub attrs: Attrs,
}

/// Attributed graph, generic over its node identifier type.
#[derive(Debug, Clone)]
pub struct Graph<N: NodeId = String> {
    kind: GraphKind,
    nodes: Vec<Node<N>>,
    index: HashMap<N, usize>,
    edges: Vec<Edge<N>>,
}

impl<N: NodeId> Default for Graph<N> {
    fn default() -> Self {
        Self::with_kind(GraphKind::default())
    }
}

impl<N: NodeId> Graph<N> {
    /// Undirected simple graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Directed simple graph.
    pub fn directed() -> Self {
        Self::with_kind(GraphKind {
            directed: true,
            multigraph: false,
        })
    }

    /// Undirected multigraph.
    pub fn multi() -> Self {
        Self::with_kind(GraphKind {
            directed: false,
            multigraph: true,
        })
    }

    /// Directed multigraph.
    pub fn multi_directed() -> Self {
        Self::with_kind(GraphKind {
            directed: true,
            multigraph: true,
        })
    }

    pub fn with_kind(kind: GraphKind) -> Self {
        Self {
            kind,
            nodes: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
        }
    }

    pub fn kind(&self) -> GraphKind {
        self.kind
    }

    pub fn is_directed(&self) -> bool {
        self.kind.directed
    }

    pub fn is_multigraph(&self) -> bool {
        self.kind.multigraph
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_node(&self, id: &N) -> bool {
        self.index.contains_key(id)
    }

    /// Add a node, or return the attributes of the existing one.
    pub fn add_node(&mut self, id: N) -> &mut Attrs {
        let existing = self.index.get(&id).copied();
        let pos = match existing {
            Some(pos) => pos,
            None => {
                let pos = self.nodes.len();
                self.index.insert(id.clone(), pos);
                self.nodes.push(Node {
                    id,
                    attrs: Attrs::new(),
                });
                pos
            }
        };
        &mut self.nodes[pos].attrs
    }

    /// Add a node and merge `attrs` into its attributes.
    pub fn add_node_with<K, V>(&mut self, id: N, attrs: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<AttrValue>,
    {
        let node_attrs = self.add_node(id);
        node_attrs.extend(attrs.into_iter().map(|(k, v)| (k.into(), v.into())));
    }

    /// Set one attribute on a node, adding the node if needed.
    pub fn set_node_attr(&mut self, id: N, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.add_node(id).insert(key.into(), value.into());
    }

    pub fn node(&self, id: &N) -> Option<&Node<N>> {
        self.index.get(id).map(|&pos| &self.nodes[pos])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node<N>> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge<N>> {
        self.edges.iter()
    }

    /// Add an edge and return its attributes.
    ///
    /// Missing endpoints are added. In a simple graph an existing edge between
    /// the same endpoints is reused; in a multigraph a new parallel edge is
    /// added with the lowest unused key.
    pub fn add_edge(&mut self, source: N, target: N) -> &mut Attrs {
        self.add_node(source.clone());
        self.add_node(target.clone());

        let pos = if self.kind.multigraph {
            let key = self.next_key(&source, &target);
            self.push_edge(source, target, key)
        } else {
            match self.find_edge(&source, &target, 0) {
                Some(pos) => pos,
                None => self.push_edge(source, target, 0),
            }
        };
        &mut self.edges[pos].attrs
    }

    /// Add an edge and merge `attrs` into its attributes.
    pub fn add_edge_with<K, V>(
        &mut self,
        source: N,
        target: N,
        attrs: impl IntoIterator<Item = (K, V)>,
    ) where
        K: Into<String>,
        V: Into<AttrValue>,
    {
        let edge_attrs = self.add_edge(source, target);
        edge_attrs.extend(attrs.into_iter().map(|(k, v)| (k.into(), v.into())));
    }

    /// Add or fetch the parallel edge with an explicit key.
    ///
    /// In a simple graph the key is ignored and this behaves like [`Graph::add_edge`].
    pub fn add_keyed_edge(&mut self, source: N, target: N, key: u32) -> &mut Attrs {
        if !self.kind.multigraph {
            return self.add_edge(source, target);
        }
        self.add_node(source.clone());
        self.add_node(target.clone());

        let pos = match self.find_edge(&source, &target, key) {
            Some(pos) => pos,
            None => self.push_edge(source, target, key),
        };
        &mut self.edges[pos].attrs
    }

    /// Remove a node and every edge touching it.
    ///
    /// Returns the removed node, if it existed.
    pub fn remove_node(&mut self, id: &N) -> Option<Node<N>> {
        let pos = self.index.remove(id)?;
        let node = self.nodes.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        self.edges.retain(|e| &e.source != id && &e.target != id);
        Some(node)
    }

    fn same_endpoints(&self, edge: &Edge<N>, source: &N, target: &N) -> bool {
        let forward = &edge.source == source && &edge.target == target;
        if self.kind.directed {
            forward
        } else {
            forward || (&edge.source == target && &edge.target == source)
        }
    }

    fn find_edge(&self, source: &N, target: &N, key: u32) -> Option<usize> {
        self.edges
            .iter()
            .position(|e| e.key == key && self.same_endpoints(e, source, target))
    }

    fn next_key(&self, source: &N, target: &N) -> u32 {
        let mut key = 0;
        while self.find_edge(source, target, key).is_some() {
            key += 1;
        }
        key
    }

    fn push_edge(&mut self, source: N, target: N, key: u32) -> usize {
        self.edges.push(Edge {
            source,
            target,
            key,
            attrs: Attrs::new(),
        });
        self.edges.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_canonical_ids() {
        assert_eq!("A".canonical_id(), "A");
        assert_eq!(String::from("Entry").canonical_id(), "Entry");
        assert_eq!(42u32.canonical_id(), "42");
        assert_eq!((-3i64).canonical_id(), "-3");
        assert_eq!((1, 2).canonical_id(), "(1, 2)");
        assert_eq!(("a", 1, 'c').canonical_id(), r#"("a", 1, 'c')"#);
    }

    #[test]
    fn test_tuple_ids_do_not_collide() {
        let joined = ("a, b",).canonical_id();
        let split = ("a", "b").canonical_id();
        assert_ne!(joined, split);
        assert_ne!(("1", 2).canonical_id(), (1, 2).canonical_id());
    }

    #[test]
    fn test_add_edge_adds_missing_endpoints() {
        let mut g: Graph<&str> = Graph::directed();
        g.add_edge("A", "B");
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert!(g.contains_node(&"A"));
        assert!(g.contains_node(&"B"));
    }

    #[test]
    fn test_simple_graph_reuses_edge() {
        let mut g: Graph<&str> = Graph::directed();
        g.add_edge_with("A", "B", [("weight", 1i64)]);
        g.add_edge_with("A", "B", [("color", "red")]);
        g.add_edge("B", "A");
        assert_eq!(g.edge_count(), 2);
        let first = g.edges().next().unwrap();
        assert_eq!(first.attrs.len(), 2);
    }

    #[test]
    fn test_undirected_simple_graph_treats_reverse_as_same_edge() {
        let mut g: Graph<&str> = Graph::new();
        g.add_edge("A", "B");
        g.add_edge("B", "A");
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn test_multigraph_keeps_parallel_edges() {
        let mut g: Graph<&str> = Graph::multi_directed();
        g.add_edge("A", "B");
        g.add_edge("A", "B");
        g.add_keyed_edge("A", "B", 1).insert("label".into(), "again".into());
        g.add_keyed_edge("A", "B", 5);

        let keys: Vec<u32> = g.edges().map(|e| e.key).collect();
        assert_eq!(keys, vec![0, 1, 5]);
        assert_eq!(g.edges().nth(1).unwrap().attrs.len(), 1);
    }

    #[test]
    fn test_keyed_edge_on_simple_graph_ignores_key() {
        let mut g: Graph<&str> = Graph::directed();
        g.add_keyed_edge("A", "B", 3);
        g.add_keyed_edge("A", "B", 4);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.edges().next().unwrap().key, 0);
    }

    #[test]
    fn test_remove_node_drops_incident_edges() {
        let mut g: Graph<&str> = Graph::directed();
        g.add_edge("A", "B");
        g.add_edge("B", "C");
        g.add_edge("C", "D");

        let removed = g.remove_node(&"B").expect("B exists");
        assert_eq!(removed.id, "B");
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 1);
        // Index is still consistent after the shift
        assert_eq!(g.node(&"D").unwrap().id, "D");
        assert!(g.remove_node(&"B").is_none());
    }

    #[test]
    fn test_node_attributes_merge() {
        let mut g: Graph = Graph::new();
        g.add_node_with("Alice".to_string(), [("role", "developer")]);
        g.set_node_attr("Alice".to_string(), "level", "senior");
        let alice = g.node(&"Alice".to_string()).unwrap();
        assert_eq!(alice.attrs["role"].as_str(), Some("developer"));
        assert_eq!(alice.attrs["level"].as_str(), Some("senior"));
    }
}
