//! Field Lineage Analysis
//!
//! Classifies how the fields of one copybook are used across a session:
//!
//! 1. Locate copybook chunks by filename marker and the caller's hint.
//! 2. Parse their declarations ([`copybook`]), merging first-wins.
//! 3. Scan every chunk for references ([`usage`]).
//! 4. `unused` is whatever is declared but neither input nor updated.
//!
//! A hint that matches no copybook is a normal outcome
//! ([`FieldAnalysis::NotFound`]), not an error.

pub mod copybook;
pub mod usage;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use copybook::{CopybookLayout, CopybookParser, FieldRecord};
pub use usage::{FieldUsage, UsageScanner};

use crate::chunk::{ChunkRecord, Snapshot};
use crate::config::{FieldsConfig, ScanConfig};
use crate::error::Result;

/// Field counts per bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTotals {
    pub fields: usize,
    pub input: usize,
    pub derived_or_updated: usize,
    #[serde(rename = "static")]
    pub static_fields: usize,
    pub unused: usize,
}

/// Field names per bucket, sorted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldBuckets {
    pub input: BTreeSet<String>,
    pub derived_or_updated: BTreeSet<String>,
    #[serde(rename = "static")]
    pub static_fields: BTreeSet<String>,
    pub unused: BTreeSet<String>,
}

/// Usage classification for one copybook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUsageReport {
    pub copybook_hint: String,
    pub record_names: BTreeSet<String>,
    pub totals: FieldTotals,
    pub fields: FieldBuckets,
    pub field_meta: BTreeMap<String, FieldRecord>,
}

/// Result of a field analysis request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldAnalysis {
    Report(FieldUsageReport),
    NotFound { error: String, hint: String },
}

impl FieldAnalysis {
    pub fn report(&self) -> Option<&FieldUsageReport> {
        match self {
            FieldAnalysis::Report(report) => Some(report),
            FieldAnalysis::NotFound { .. } => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FieldAnalysis::NotFound { .. })
    }
}

/// Copybook parser and usage scanner, compiled once
#[derive(Debug)]
pub struct FieldAnalyzer {
    parser: CopybookParser,
    scanner: UsageScanner,
}

impl FieldAnalyzer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            parser: CopybookParser::new()?,
            scanner: UsageScanner::new()?,
        })
    }

    /// Merge the layouts of every copybook file matching `hint`.
    /// `None` when no chunk qualifies.
    ///
    /// A file qualifies when any of its chunks matches. Its chunks are joined in
    /// position order and parsed as one text, so `01` ownership carries across
    /// chunk boundaries. Files merge in order of first appearance.
    pub fn locate_copybook(
        &self,
        snapshot: &Snapshot,
        hint: &str,
        fields: &FieldsConfig,
        scan: &ScanConfig,
    ) -> Option<CopybookLayout> {
        let hint = hint.trim().to_uppercase();
        let mut files: Vec<(&str, Vec<&ChunkRecord>)> = Vec::new();
        let mut matched: BTreeSet<&str> = BTreeSet::new();

        for chunk in &snapshot.chunks {
            if !fields.is_copybook(&chunk.filename) {
                continue;
            }
            match files.iter_mut().find(|(name, _)| *name == chunk.filename) {
                Some((_, chunks)) => chunks.push(chunk),
                None => files.push((chunk.filename.as_str(), vec![chunk])),
            }
            if hint.is_empty()
                || chunk.filename.to_uppercase().contains(&hint)
                || chunk.content.to_uppercase().contains(&hint)
            {
                matched.insert(&chunk.filename);
            }
        }

        let mut layout: Option<CopybookLayout> = None;
        for (filename, mut chunks) in files {
            if !matched.contains(filename) {
                continue;
            }
            chunks.sort_by_key(|c| c.position);
            debug!(file = %filename, chunks = chunks.len(), "copybook matched");
            let text = chunks
                .iter()
                .map(|c| c.source_text(scan.strip_line_numbers))
                .collect::<Vec<_>>()
                .join("\n");
            let parsed = self.parser.parse(&text);
            match layout.as_mut() {
                Some(existing) => existing.merge(parsed),
                None => layout = Some(parsed),
            }
        }

        layout
    }

    /// Classify the fields of the copybook selected by `hint`
    pub fn analyze(
        &self,
        snapshot: &Snapshot,
        hint: &str,
        fields: &FieldsConfig,
        scan: &ScanConfig,
    ) -> FieldAnalysis {
        let copybook_hint = hint.trim().to_uppercase();
        let Some(layout) = self.locate_copybook(snapshot, &copybook_hint, fields, scan) else {
            info!(session = %snapshot.session_id, hint = %copybook_hint, "no copybook matched");
            return FieldAnalysis::NotFound {
                error: "No copybook content found for hint".to_string(),
                hint: copybook_hint,
            };
        };

        let mut usage = FieldUsage::default();
        for chunk in &snapshot.chunks {
            let text = chunk.source_text(scan.strip_line_numbers);
            usage.merge(self.scanner.scan(&text, &layout));
        }

        let report = build_report(copybook_hint, layout, usage);
        info!(
            session = %snapshot.session_id,
            hint = %report.copybook_hint,
            fields = report.totals.fields,
            unused = report.totals.unused,
            "field lineage classified"
        );
        FieldAnalysis::Report(report)
    }
}

fn build_report(copybook_hint: String, layout: CopybookLayout, usage: FieldUsage) -> FieldUsageReport {
    let used = usage.used();
    let unused: BTreeSet<String> = layout
        .fields
        .keys()
        .filter(|name| !used.contains(*name))
        .cloned()
        .collect();
    let static_fields = layout.static_fields();

    FieldUsageReport {
        copybook_hint,
        totals: FieldTotals {
            fields: layout.fields.len(),
            input: usage.input.len(),
            derived_or_updated: usage.derived_or_updated.len(),
            static_fields: static_fields.len(),
            unused: unused.len(),
        },
        fields: FieldBuckets {
            input: usage.input,
            derived_or_updated: usage.derived_or_updated,
            static_fields,
            unused,
        },
        record_names: layout.record_names,
        field_meta: layout.fields,
    }
}
