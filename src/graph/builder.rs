//! Graph construction from lineage maps

use tracing::info;

use super::{GraphEdge, LineageGraph, NodeKind};
use crate::lineage::{LineageMap, LineageReport};

/// Build the program -> resource graph for a lineage report.
///
/// One node per distinct program and per subject, one edge per
/// (program, subject) pair labeled with every operation tag recorded for the
/// subject.
pub fn build_graph(report: &LineageReport) -> LineageGraph {
    let mut graph = LineageGraph::new();
    add_map(&mut graph, NodeKind::File, &report.files);
    add_map(&mut graph, NodeKind::Table, &report.tables);

    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "lineage graph built"
    );
    graph
}

fn add_map(graph: &mut LineageGraph, kind: NodeKind, map: &LineageMap) {
    for (subject, entry) in map {
        let target = graph.ensure_node(kind, subject);
        let label = entry.op_names().join(",");
        for program in &entry.programs {
            let source = graph.ensure_node(NodeKind::Program, program);
            graph.graph.update_edge(source, target, GraphEdge { label: label.clone() });
        }
    }
}

impl From<&LineageReport> for LineageGraph {
    fn from(report: &LineageReport) -> Self {
        build_graph(report)
    }
}
