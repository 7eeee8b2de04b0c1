//! Message provenance attached to edges.
//!
//! A [`TraceMap`] maps a message id (as text) to one or more candidate
//! provenance paths. Each path is an ordered list of [`TraceStep`]s, serialized
//! as `[message_id, producer, [parent_ids...]]`:
//!
//! ```text
//! {"5": [[[1, "S1", []], [4, "V", [1]], [5, "Agg", [4]]]]}
//! ```
//!
//! Multiple paths for one message are kept side by side; choosing between them
//! is left to the front-end.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// Identifier of a message flowing through the producer's system.
pub type MessageId = u64;

/// One hop of a provenance path: which node produced which message from which parents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep(pub MessageId, pub String, pub Vec<MessageId>);

impl TraceStep {
    pub fn new(message: MessageId, producer: impl Into<String>, parents: Vec<MessageId>) -> Self {
        Self(message, producer.into(), parents)
    }

    pub fn message(&self) -> MessageId {
        self.0
    }

    pub fn producer(&self) -> &str {
        &self.1
    }

    pub fn parents(&self) -> &[MessageId] {
        &self.2
    }
}

/// Ordered steps leading to a message, ancestors first.
pub type TracePath = Vec<TraceStep>;

/// Message id → alternative provenance paths.
pub type TraceMap = BTreeMap<String, Vec<TracePath>>;

#[derive(Debug, Clone)]
struct Production {
    producer: String,
    parents: Vec<MessageId>,
}

/// Records which node produced each message and from which parents, and
/// derives [`TraceMap`]s from those facts.
///
/// A message recorded more than once (e.g. two nodes both claim it) keeps every
/// production; each one yields its own path.
///
/// # Example
///
/// ```ignore
/// let mut lineage = Lineage::new();
/// lineage.record(1, "Temperature Sensor", []);
/// lineage.record(4, "Data Validator", [1]);
/// let traces = lineage.trace_map([4]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Lineage {
    productions: BTreeMap<MessageId, Vec<Production>>,
}

impl Lineage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `producer` emitted `message` from `parents`.
    pub fn record(
        &mut self,
        message: MessageId,
        producer: impl Into<String>,
        parents: impl IntoIterator<Item = MessageId>,
    ) {
        self.productions.entry(message).or_default().push(Production {
            producer: producer.into(),
            parents: parents.into_iter().collect(),
        });
    }

    /// Number of distinct messages recorded.
    pub fn len(&self) -> usize {
        self.productions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.productions.is_empty()
    }

    /// Candidate provenance paths for `message`, one per recorded production.
    ///
    /// Ancestors appear before their descendants and at most once per path;
    /// they resolve through their first recorded production. Unknown ancestors
    /// are skipped and cycles are cut.
    pub fn paths(&self, message: MessageId) -> Vec<TracePath> {
        let Some(productions) = self.productions.get(&message) else {
            return Vec::new();
        };

        productions
            .iter()
            .map(|production| {
                let mut visited = HashSet::from([message]);
                let mut steps = Vec::new();
                for &parent in &production.parents {
                    self.collect_ancestors(parent, &mut visited, &mut steps);
                }
                steps.push(TraceStep::new(
                    message,
                    production.producer.clone(),
                    production.parents.clone(),
                ));
                steps
            })
            .collect()
    }

    /// Build a trace map for the given messages. Unknown ids are left out.
    pub fn trace_map(&self, messages: impl IntoIterator<Item = MessageId>) -> TraceMap {
        messages
            .into_iter()
            .filter_map(|id| {
                let paths = self.paths(id);
                (!paths.is_empty()).then(|| (id.to_string(), paths))
            })
            .collect()
    }

    fn collect_ancestors(
        &self,
        message: MessageId,
        visited: &mut HashSet<MessageId>,
        steps: &mut Vec<TraceStep>,
    ) {
        if !visited.insert(message) {
            return;
        }
        let Some(production) = self.productions.get(&message).and_then(|p| p.first()) else {
            return;
        };
        for &parent in &production.parents {
            self.collect_ancestors(parent, visited, steps);
        }
        steps.push(TraceStep::new(
            message,
            production.producer.clone(),
            production.parents.clone(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sensor_flow() -> Lineage {
        let mut lineage = Lineage::new();
        lineage.record(1, "Temperature Sensor", []);
        lineage.record(2, "Humidity Sensor", []);
        lineage.record(3, "Pressure Sensor", []);
        lineage.record(4, "Data Validator", [1, 2, 3]);
        lineage.record(5, "Data Aggregator", [4]);
        lineage
    }

    #[test]
    fn test_step_serializes_as_array() {
        let step = TraceStep::new(4, "V", vec![1]);
        assert_eq!(serde_json::to_value(&step).unwrap(), json!([4, "V", [1]]));

        let parsed: TraceStep = serde_json::from_value(json!([5, "Agg", [4]])).unwrap();
        assert_eq!(parsed.message(), 5);
        assert_eq!(parsed.producer(), "Agg");
        assert_eq!(parsed.parents(), &[4]);
    }

    #[test]
    fn test_paths_order_ancestors_first() {
        let lineage = sensor_flow();
        let paths = lineage.paths(5);
        assert_eq!(paths.len(), 1);

        let messages: Vec<MessageId> = paths[0].iter().map(TraceStep::message).collect();
        assert_eq!(messages, vec![1, 2, 3, 4, 5]);
        assert_eq!(paths[0][3], TraceStep::new(4, "Data Validator", vec![1, 2, 3]));
    }

    #[test]
    fn test_ambiguous_production_yields_multiple_paths() {
        let mut lineage = sensor_flow();
        lineage.record(5, "Backup Aggregator", [2]);

        let paths = lineage.paths(5);
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[1].last().unwrap().producer(), "Backup Aggregator");
        let messages: Vec<MessageId> = paths[1].iter().map(TraceStep::message).collect();
        assert_eq!(messages, vec![2, 5]);
    }

    #[test]
    fn test_shared_ancestor_appears_once() {
        let mut lineage = Lineage::new();
        lineage.record(1, "Source", []);
        lineage.record(2, "Left", [1]);
        lineage.record(3, "Right", [1]);
        lineage.record(4, "Join", [2, 3]);

        let messages: Vec<MessageId> = lineage.paths(4)[0].iter().map(TraceStep::message).collect();
        assert_eq!(messages, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_cycles_are_cut() {
        let mut lineage = Lineage::new();
        lineage.record(1, "A", [2]);
        lineage.record(2, "B", [1]);

        let messages: Vec<MessageId> = lineage.paths(1)[0].iter().map(TraceStep::message).collect();
        assert_eq!(messages, vec![2, 1]);
    }

    #[test]
    fn test_trace_map_skips_unknown_messages() {
        let lineage = sensor_flow();
        let map = lineage.trace_map([4, 99]);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["4"]);
        assert!(lineage.paths(99).is_empty());
        assert_eq!(lineage.len(), 5);
    }
}
