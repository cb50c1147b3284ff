//! Topology graph and connection bookkeeping
//!
//! Nodes are keyed by peer id. Edges are undirected and keyed by an
//! [`EdgeKey`] that always stores the lexicographically smaller peer first, so
//! a measurement reported as `A -> B` and one reported as `B -> A` land on the
//! same record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Virtual coordinate of a node (not yet populated by any measurement model)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A known peer in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyNode {
    pub peer_id: String,
    pub position: Position,
    pub region: String,
    pub capabilities: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

impl TopologyNode {
    /// Exact membership test, no prefix or substring matching
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }

    pub fn has_all_capabilities(&self, required: &[String]) -> bool {
        required.iter().all(|r| self.has_capability(r))
    }
}

/// Canonical undirected edge identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    low: String,
    high: String,
}

impl EdgeKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self {
                low: a.to_string(),
                high: b.to_string(),
            }
        } else {
            Self {
                low: b.to_string(),
                high: a.to_string(),
            }
        }
    }

    pub fn peers(&self) -> (&str, &str) {
        (&self.low, &self.high)
    }

    pub fn touches(&self, peer_id: &str) -> bool {
        self.low == peer_id || self.high == peer_id
    }
}

/// Measured link between two peers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyEdge {
    pub latency_ms: f64,
    pub bandwidth_mbps: f64,
    /// Link quality in `[0, 1]`
    pub quality: f64,
    pub last_updated: DateTime<Utc>,
}

/// In-memory model of known peers and the links between them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyGraph {
    pub nodes: HashMap<String, TopologyNode>,
    #[serde(with = "edge_list")]
    pub edges: HashMap<EdgeKey, TopologyEdge>,
}

impl TopologyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edge(&self, a: &str, b: &str) -> Option<&TopologyEdge> {
        self.edges.get(&EdgeKey::new(a, b))
    }

    /// Edges incident to `peer_id`
    pub fn edges_of<'a>(
        &'a self,
        peer_id: &'a str,
    ) -> impl Iterator<Item = (&'a EdgeKey, &'a TopologyEdge)> + 'a {
        self.edges.iter().filter(move |(key, _)| key.touches(peer_id))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Connection bookkeeping for a peer, kept apart from the graph node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerConnection {
    pub peer_id: String,
    pub connected: bool,
    pub last_seen: DateTime<Utc>,
    /// Number of calls reporting the peer as connected
    pub connection_count: u64,
    pub regions: Vec<String>,
    pub capabilities: Vec<String>,
}

/// JSON maps need string keys, so edges travel as a flat list
mod edge_list {
    use super::{EdgeKey, TopologyEdge};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;

    #[derive(Serialize, Deserialize)]
    struct EdgeEntry {
        a: String,
        b: String,
        #[serde(flatten)]
        edge: TopologyEdge,
    }

    pub(super) fn serialize<S>(
        edges: &HashMap<EdgeKey, TopologyEdge>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut entries: Vec<EdgeEntry> = edges
            .iter()
            .map(|(key, edge)| {
                let (a, b) = key.peers();
                EdgeEntry {
                    a: a.to_string(),
                    b: b.to_string(),
                    edge: edge.clone(),
                }
            })
            .collect();
        entries.sort_by(|x, y| (&x.a, &x.b).cmp(&(&y.a, &y.b)));
        entries.serialize(serializer)
    }

    pub(super) fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<HashMap<EdgeKey, TopologyEdge>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Vec::<EdgeEntry>::deserialize(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|entry| (EdgeKey::new(&entry.a, &entry.b), entry.edge))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(latency_ms: f64) -> TopologyEdge {
        TopologyEdge {
            latency_ms,
            bandwidth_mbps: 100.0,
            quality: 0.9,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_edge_key_is_canonical() {
        assert_eq!(EdgeKey::new("b", "a"), EdgeKey::new("a", "b"));
        assert_eq!(EdgeKey::new("b", "a").peers(), ("a", "b"));
    }

    #[test]
    fn test_edge_key_touches() {
        let key = EdgeKey::new("p2", "p1");
        assert!(key.touches("p1"));
        assert!(key.touches("p2"));
        assert!(!key.touches("p3"));
    }

    #[test]
    fn test_capability_exact_match() {
        let node = TopologyNode {
            peer_id: "p1".to_string(),
            position: Position::default(),
            region: "eu".to_string(),
            capabilities: vec!["gpu-lite".to_string()],
            last_updated: Utc::now(),
        };
        assert!(!node.has_capability("gpu"));
        assert!(node.has_capability("gpu-lite"));
        assert!(node.has_all_capabilities(&[]));
    }

    #[test]
    fn test_graph_serializes_edges_as_list() {
        let mut graph = TopologyGraph::new();
        graph.edges.insert(EdgeKey::new("b", "a"), edge(12.0));

        let json = serde_json::to_value(&graph).unwrap();
        let edges = json["edges"].as_array().unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0]["a"], "a");
        assert_eq!(edges[0]["b"], "b");

        let back: TopologyGraph = serde_json::from_value(json).unwrap();
        assert_eq!(back.edge("a", "b").map(|e| e.latency_ms), Some(12.0));
    }
}
