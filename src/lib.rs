//! Mainframe CRUD Lineage
//!
//! Heuristic lineage analysis over legacy mainframe sources (COBOL,
//! copybooks, JCL, CICS and embedded SQL) stored as text chunks.
//!
//! ## Pipeline
//!
//! ```text
//! ChunkStore ──► Snapshot ──► EntityExtractor ──► aggregate ──► LineageReport ──► build_graph ──► LineageGraph
//!                    │                                                                               │
//!                    └──────► FieldAnalyzer (copybook hint) ──► FieldAnalysis          neighborhood(element, radius)
//! ```
//!
//! - **Extraction**: regex recognizers per source construct, no parsing
//! - **Aggregation**: per-subject operation counts and program sets, merged
//!   commutatively (optionally in parallel with rayon)
//! - **Field lineage**: copybook fields classified as input, derived/updated,
//!   static or unused
//! - **Graph**: namespaced program/file/table nodes with labeled
//!   `program -> resource` edges and radius-bounded neighborhood queries

pub mod analyzer;
pub mod chunk;
pub mod config;
pub mod error;
pub mod extract;
pub mod fields;
pub mod graph;
pub mod ingest;
pub mod lineage;

pub use analyzer::LineageAnalyzer;
pub use chunk::{ChunkRecord, ChunkStore, MemoryChunkStore, Snapshot};
pub use config::LineageConfig;
pub use error::{LineageError, Result};
pub use extract::{Construct, EntityExtractor, Observation, OperationKind};
pub use fields::{FieldAnalysis, FieldAnalyzer, FieldUsageReport};
pub use graph::{build_graph, neighborhood, GraphView, LineageGraph, NodeKind};
pub use lineage::{aggregate, LineageEntry, LineageMaps, LineageReport};
