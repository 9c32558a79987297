//! Analysis entry points over a chunk store
//!
//! Each request fetches one [`Snapshot`] for the session and runs the pure
//! pipeline over it. Nothing is cached between requests.

use tracing::{debug, instrument};

use crate::chunk::{ChunkStore, Snapshot};
use crate::config::LineageConfig;
use crate::error::Result;
use crate::extract::EntityExtractor;
use crate::fields::{FieldAnalysis, FieldAnalyzer};
use crate::graph::{build_graph, LineageGraph};
use crate::lineage::{aggregate, LineageReport};

/// Lineage, field and graph analysis for the sessions of one store
pub struct LineageAnalyzer<S: ChunkStore> {
    store: S,
    extractor: EntityExtractor,
    fields: FieldAnalyzer,
    config: LineageConfig,
}

impl<S: ChunkStore> LineageAnalyzer<S> {
    pub fn new(store: S, config: LineageConfig) -> Result<Self> {
        Ok(Self {
            store,
            extractor: EntityExtractor::new()?,
            fields: FieldAnalyzer::new()?,
            config,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LineageConfig {
        &self.config
    }

    /// Fetch the session's chunks once
    pub fn snapshot(&self, session_id: &str) -> Result<Snapshot> {
        let snapshot = Snapshot::fetch(&self.store, session_id)?;
        debug!(session = session_id, chunks = snapshot.len(), digest = %snapshot.digest(), "snapshot fetched");
        Ok(snapshot)
    }

    /// CRUD lineage maps for a session
    #[instrument(skip(self))]
    pub fn analyze_lineage(&self, session_id: &str) -> Result<LineageReport> {
        let snapshot = self.snapshot(session_id)?;
        Ok(self.lineage_of(&snapshot))
    }

    /// Field usage classification for the copybook selected by `copybook_hint`
    #[instrument(skip(self))]
    pub fn analyze_fields(&self, session_id: &str, copybook_hint: &str) -> Result<FieldAnalysis> {
        let snapshot = self.snapshot(session_id)?;
        Ok(self.fields_of(&snapshot, copybook_hint))
    }

    /// Whole lineage graph for a session
    #[instrument(skip(self))]
    pub fn build_graph(&self, session_id: &str) -> Result<LineageGraph> {
        let report = self.analyze_lineage(session_id)?;
        Ok(build_graph(&report))
    }

    /// Neighborhood of `element`; `None` radius uses the configured default
    #[instrument(skip(self))]
    pub fn neighborhood(&self, session_id: &str, element: &str, radius: Option<usize>) -> Result<LineageGraph> {
        let graph = self.build_graph(session_id)?;
        let radius = radius.unwrap_or(self.config.graph.default_radius);
        Ok(graph.neighborhood(element, radius))
    }

    /// Lineage over an already fetched snapshot
    pub fn lineage_of(&self, snapshot: &Snapshot) -> LineageReport {
        aggregate(snapshot, &self.extractor, &self.config.scan)
    }

    /// Field analysis over an already fetched snapshot
    pub fn fields_of(&self, snapshot: &Snapshot, copybook_hint: &str) -> FieldAnalysis {
        self.fields
            .analyze(snapshot, copybook_hint, &self.config.fields, &self.config.scan)
    }
}
