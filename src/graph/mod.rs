//! Lineage Dependency Graph
//!
//! Directed graph of programs and the files/tables they touch, built with
//! petgraph from a [`LineageReport`](crate::lineage::LineageReport). Node ids
//! are namespaced (`PGM::`, `FILE::`, `TABLE::`) so a file and a table with
//! the same name never share a node.
//!
//! Edges always run `program -> resource` and carry the sorted, comma-joined
//! operation tags of the resource's lineage entry.

pub mod builder;
pub mod query;

pub use builder::build_graph;
pub use query::neighborhood;

use std::collections::BTreeMap;
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

/// Node categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Program,
    File,
    Table,
}

impl NodeKind {
    /// Namespace prefix of node ids of this kind
    pub fn prefix(self) -> &'static str {
        match self {
            NodeKind::Program => "PGM::",
            NodeKind::File => "FILE::",
            NodeKind::Table => "TABLE::",
        }
    }

    /// Namespaced node id for `name`
    pub fn node_id(self, name: &str) -> String {
        format!("{}{}", self.prefix(), name)
    }

    fn dot_style(self) -> (&'static str, &'static str) {
        match self {
            NodeKind::Program => ("box", "#A3A3A3"),
            NodeKind::File => ("ellipse", "#60A5FA"),
            NodeKind::Table => ("ellipse", "#34D399"),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Program => "program",
            NodeKind::File => "file",
            NodeKind::Table => "table",
        };
        f.write_str(name)
    }
}

/// Graph node weight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
}

impl GraphNode {
    pub fn new(kind: NodeKind, name: &str) -> Self {
        Self {
            id: kind.node_id(name),
            label: name.to_string(),
            kind,
        }
    }
}

/// Graph edge weight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub label: String,
}

/// Edge as listed in a [`GraphView`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeView {
    pub source: String,
    pub target: String,
    pub label: String,
}

/// Serializable node and edge lists, sorted by id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<EdgeView>,
}

/// Fuzzy search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub kind: NodeKind,
    pub score: i64,
}

/// The program/resource lineage graph
#[derive(Debug, Clone, Default)]
pub struct LineageGraph {
    pub(crate) graph: DiGraph<GraphNode, GraphEdge>,

    /// Node id -> index, sorted so resolution order is stable
    pub(crate) index: BTreeMap<String, NodeIndex>,
}

impl LineageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, or return the existing one with the same id
    pub(crate) fn ensure_node(&mut self, kind: NodeKind, name: &str) -> NodeIndex {
        let id = kind.node_id(name);
        if let Some(&idx) = self.index.get(&id) {
            return idx;
        }
        let idx = self.graph.add_node(GraphNode::new(kind, name));
        self.index.insert(id, idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).and_then(|&idx| self.graph.node_weight(idx))
    }

    /// Label of the edge `source -> target`, if present
    pub fn edge_label(&self, source: &str, target: &str) -> Option<&str> {
        let (&a, &b) = (self.index.get(source)?, self.index.get(target)?);
        let edge = self.graph.find_edge(a, b)?;
        self.graph.edge_weight(edge).map(|e| e.label.as_str())
    }

    /// All node ids, sorted
    pub fn node_ids(&self) -> impl Iterator<Item = &String> {
        self.index.keys()
    }

    /// Nodes in id order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.index.values().filter_map(|&idx| self.graph.node_weight(idx))
    }

    /// Edges as `(source id, target id, label)`, sorted
    pub fn edges(&self) -> Vec<EdgeView> {
        let mut edges: Vec<EdgeView> = self
            .graph
            .edge_references()
            .map(|edge| EdgeView {
                source: self.graph[edge.source()].id.clone(),
                target: self.graph[edge.target()].id.clone(),
                label: edge.weight().label.clone(),
            })
            .collect();
        edges.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));
        edges
    }

    /// Node and edge lists for serialization
    pub fn view(&self) -> GraphView {
        GraphView {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges(),
        }
    }

    /// Fuzzy search node ids
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        use fuzzy_matcher::skim::SkimMatcherV2;
        use fuzzy_matcher::FuzzyMatcher;

        let matcher = SkimMatcherV2::default().ignore_case();
        let mut results: Vec<SearchResult> = self
            .nodes()
            .filter_map(|node| {
                matcher.fuzzy_match(&node.id, query).map(|score| SearchResult {
                    id: node.id.clone(),
                    kind: node.kind,
                    score,
                })
            })
            .collect();

        // Highest score first, ties by id
        results.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        results.truncate(limit);
        results
    }

    /// Export to GraphViz DOT format
    pub fn to_dot(&self) -> String {
        let mut output = String::new();

        output.push_str("digraph LineageGraph {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  bgcolor=\"#111111\";\n");
        output.push_str("  node [style=filled, fontname=\"Helvetica\", fontsize=10, fontcolor=\"white\", color=\"#404040\"];\n");
        output.push_str("  edge [fontname=\"Helvetica\", fontsize=8, fontcolor=\"#808080\", color=\"#808080\"];\n");
        output.push('\n');

        for node in self.nodes() {
            let (shape, color) = node.kind.dot_style();
            output.push_str(&format!(
                "  \"{}\" [label=\"{}\", shape={}, fillcolor=\"{}\"];\n",
                escape_dot(&node.id),
                escape_dot(&node.label),
                shape,
                color
            ));
        }

        output.push('\n');

        for edge in self.edges() {
            output.push_str(&format!(
                "  \"{}\" -> \"{}\" [label=\"{}\"];\n",
                escape_dot(&edge.source),
                escape_dot(&edge.target),
                escape_dot(&edge.label)
            ));
        }

        output.push_str("}\n");
        output
    }
}

fn escape_dot(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
