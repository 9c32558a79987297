//! Element resolution and neighborhood queries

use std::collections::BTreeSet;

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::debug;

use super::{GraphEdge, LineageGraph};

impl LineageGraph {
    /// Resolve a user-supplied element to a node id.
    ///
    /// Tiers, first match wins over ids in sorted order:
    /// 1. exact id (`FILE::ACCTFILE`)
    /// 2. id ending in `::element` (`ACCTFILE`)
    /// 3. case-insensitive substring of an id (`acct`)
    pub fn resolve(&self, element: &str) -> Option<&str> {
        let element = element.trim();
        if element.is_empty() {
            return None;
        }

        if let Some((id, _)) = self.index.get_key_value(element) {
            return Some(id.as_str());
        }

        let suffix = format!("::{element}");
        if let Some(id) = self.index.keys().find(|id| id.ends_with(&suffix)) {
            return Some(id.as_str());
        }

        let needle = element.to_lowercase();
        self.index
            .keys()
            .find(|id| id.to_lowercase().contains(&needle))
            .map(String::as_str)
    }

    /// Induced subgraph of every node within `radius` hops of `element`,
    /// following edges in both directions. Empty if `element` resolves to
    /// nothing.
    pub fn neighborhood(&self, element: &str, radius: usize) -> LineageGraph {
        let Some(start) = self.resolve(element).and_then(|id| self.index.get(id).copied()) else {
            debug!(element, "neighborhood target not found");
            return LineageGraph::new();
        };

        let visited = self.expand(start, radius);
        let sub = self.induced(&visited);
        debug!(
            element,
            radius,
            nodes = sub.node_count(),
            edges = sub.edge_count(),
            "neighborhood extracted"
        );
        sub
    }

    /// Undirected breadth-first expansion, one frontier per hop
    fn expand(&self, start: NodeIndex, radius: usize) -> BTreeSet<NodeIndex> {
        let mut visited = BTreeSet::from([start]);
        let mut frontier = vec![start];

        for _ in 0..radius {
            let mut next = Vec::new();
            for &node in &frontier {
                for neighbor in self.graph.neighbors_undirected(node) {
                    if visited.insert(neighbor) {
                        next.push(neighbor);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        visited
    }

    /// Copy `nodes` and every edge among them into a new graph
    fn induced(&self, nodes: &BTreeSet<NodeIndex>) -> LineageGraph {
        let mut sub = LineageGraph::new();

        let mut ordered: Vec<NodeIndex> = nodes.iter().copied().collect();
        ordered.sort_by(|a, b| self.graph[*a].id.cmp(&self.graph[*b].id));
        for &idx in &ordered {
            let node = &self.graph[idx];
            sub.ensure_node(node.kind, &node.label);
        }

        for &idx in &ordered {
            for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
                if !nodes.contains(&edge.target()) {
                    continue;
                }
                let source = sub.index[&self.graph[idx].id];
                let target = sub.index[&self.graph[edge.target()].id];
                sub.graph.update_edge(
                    source,
                    target,
                    GraphEdge {
                        label: edge.weight().label.clone(),
                    },
                );
            }
        }

        sub
    }
}

/// Free-function form of [`LineageGraph::neighborhood`]
pub fn neighborhood(graph: &LineageGraph, element: &str, radius: usize) -> LineageGraph {
    graph.neighborhood(element, radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;

    /// PGMA -> FILE::ACCTFILE <- PGMB -> TABLE::ACCOUNTS <- PGMC
    fn chain() -> LineageGraph {
        let mut graph = LineageGraph::new();
        let a = graph.ensure_node(NodeKind::Program, "PGMA.CBL");
        let b = graph.ensure_node(NodeKind::Program, "PGMB.CBL");
        let c = graph.ensure_node(NodeKind::Program, "PGMC.CBL");
        let file = graph.ensure_node(NodeKind::File, "ACCTFILE");
        let table = graph.ensure_node(NodeKind::Table, "ACCOUNTS");
        for (s, t, label) in [(a, file, "READ"), (b, file, "WRITE"), (b, table, "SELECT"), (c, table, "UPDATE")] {
            graph.graph.update_edge(s, t, GraphEdge { label: label.into() });
        }
        graph
    }

    fn ids(graph: &LineageGraph) -> Vec<&str> {
        graph.node_ids().map(String::as_str).collect()
    }

    #[test]
    fn test_resolve_tiers() {
        let graph = chain();
        assert_eq!(graph.resolve("FILE::ACCTFILE"), Some("FILE::ACCTFILE"));
        assert_eq!(graph.resolve("ACCTFILE"), Some("FILE::ACCTFILE"));
        assert_eq!(graph.resolve("pgmb"), Some("PGM::PGMB.CBL"));
        assert_eq!(graph.resolve("NOPE"), None);
        assert_eq!(graph.resolve("  "), None);
    }

    #[test]
    fn test_radius_zero_is_single_node() {
        let sub = chain().neighborhood("ACCTFILE", 0);
        assert_eq!(ids(&sub), vec!["FILE::ACCTFILE"]);
        assert_eq!(sub.edge_count(), 0);
    }

    #[test]
    fn test_radius_one_direct_neighbors() {
        let sub = chain().neighborhood("ACCTFILE", 1);
        assert_eq!(ids(&sub), vec!["FILE::ACCTFILE", "PGM::PGMA.CBL", "PGM::PGMB.CBL"]);
        assert_eq!(sub.edge_count(), 2);
        assert_eq!(sub.edge_label("PGM::PGMB.CBL", "FILE::ACCTFILE"), Some("WRITE"));
    }

    #[test]
    fn test_radius_follows_incoming_then_outgoing() {
        let sub = chain().neighborhood("PGMA.CBL", 2);
        assert_eq!(ids(&sub), vec!["FILE::ACCTFILE", "PGM::PGMA.CBL", "PGM::PGMB.CBL"]);

        let wider = chain().neighborhood("PGMA.CBL", 4);
        assert_eq!(wider.node_count(), 5);
        assert_eq!(wider.edge_count(), 4);
    }

    #[test]
    fn test_not_found_is_empty() {
        let sub = neighborhood(&chain(), "MISSING", 3);
        assert!(sub.is_empty());
        assert_eq!(sub.edge_count(), 0);
    }
}
