//! Lineage Aggregation
//!
//! Folds per-chunk observations into the `files` and `tables` CRUD maps.
//! Aggregation is a commutative merge (operation counts add, program sets
//! union), so chunks can be extracted in any order or in parallel and merged
//! at the end.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::chunk::{ChunkRecord, Snapshot};
use crate::config::ScanConfig;
use crate::extract::{EntityExtractor, Observation, OperationKind, Target};

/// Accumulated operations and programs for one subject
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageEntry {
    /// Also the map key, so not serialized
    #[serde(skip)]
    pub subject: String,
    pub ops: BTreeMap<OperationKind, u64>,
    pub programs: BTreeSet<String>,
}

impl LineageEntry {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Default::default()
        }
    }

    /// Record one observation of `op` by `program`
    pub fn observe(&mut self, op: OperationKind, program: &str) {
        *self.ops.entry(op).or_insert(0) += 1;
        self.programs.insert(program.to_string());
    }

    /// Combine two entries for the same subject
    pub fn merge(mut self, other: LineageEntry) -> LineageEntry {
        for (op, count) in other.ops {
            *self.ops.entry(op).or_insert(0) += count;
        }
        self.programs.extend(other.programs);
        if self.subject.is_empty() {
            self.subject = other.subject;
        }
        self
    }

    /// Operation tags, sorted
    pub fn op_names(&self) -> Vec<String> {
        self.ops.keys().map(|op| op.to_string()).collect()
    }

    /// Count for a textual operation tag, 0 if never observed
    pub fn count(&self, tag: &str) -> u64 {
        tag.parse::<OperationKind>()
            .ok()
            .and_then(|op| self.ops.get(&op).copied())
            .unwrap_or(0)
    }
}

/// Subject → entry map
pub type LineageMap = BTreeMap<String, LineageEntry>;

/// The two CRUD maps for a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageMaps {
    pub files: LineageMap,
    pub tables: LineageMap,
}

/// Output of a lineage scan
pub type LineageReport = LineageMaps;

impl LineageMaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one observation in
    pub fn record(&mut self, observation: Observation) {
        let map = match observation.target {
            Target::Files => &mut self.files,
            Target::Tables => &mut self.tables,
        };
        map.entry(observation.subject.clone())
            .or_insert_with(|| LineageEntry::new(observation.subject))
            .observe(observation.op, &observation.program);
    }

    /// Merge two partial results; order of the operands does not matter
    pub fn merge(mut self, other: LineageMaps) -> LineageMaps {
        merge_map(&mut self.files, other.files);
        merge_map(&mut self.tables, other.tables);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.tables.is_empty()
    }

    /// Total number of subjects across both maps
    pub fn subject_count(&self) -> usize {
        self.files.len() + self.tables.len()
    }
}

impl FromIterator<Observation> for LineageMaps {
    fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
        let mut maps = LineageMaps::new();
        for observation in iter {
            maps.record(observation);
        }
        maps
    }
}

fn merge_map(into: &mut LineageMap, from: LineageMap) {
    for (subject, entry) in from {
        match into.remove(&subject) {
            Some(existing) => {
                into.insert(subject, existing.merge(entry));
            }
            None => {
                into.insert(subject, entry);
            }
        }
    }
}

/// Extract one chunk into a partial result. Chunks whose filename does not
/// look like a mainframe artifact contribute nothing.
pub fn extract_chunk(extractor: &EntityExtractor, config: &ScanConfig, chunk: &ChunkRecord) -> LineageMaps {
    if !config.is_artifact(&chunk.filename) {
        debug!(file = %chunk.filename, position = chunk.position, "skipping non-mainframe chunk");
        return LineageMaps::new();
    }
    let text = chunk.source_text(config.strip_line_numbers);
    extractor.extract(&chunk.filename, &text).into_iter().collect()
}

/// Build the CRUD lineage maps for a snapshot
pub fn aggregate(snapshot: &Snapshot, extractor: &EntityExtractor, config: &ScanConfig) -> LineageReport {
    let maps = if config.parallel {
        snapshot
            .chunks
            .par_iter()
            .map(|chunk| extract_chunk(extractor, config, chunk))
            .reduce(LineageMaps::new, LineageMaps::merge)
    } else {
        snapshot
            .chunks
            .iter()
            .map(|chunk| extract_chunk(extractor, config, chunk))
            .fold(LineageMaps::new(), LineageMaps::merge)
    };

    info!(
        session = %snapshot.session_id,
        chunks = snapshot.len(),
        files = maps.files.len(),
        tables = maps.tables.len(),
        "lineage aggregated"
    );
    maps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::IoVerb;

    fn obs(target: Target, subject: &str, op: OperationKind, program: &str) -> Observation {
        Observation {
            target,
            subject: subject.to_string(),
            op,
            program: program.to_string(),
        }
    }

    #[test]
    fn test_repeated_observations_accumulate() {
        let maps: LineageMaps = vec![
            obs(Target::Files, "ACCTFILE", OperationKind::Io(IoVerb::Read), "A.CBL"),
            obs(Target::Files, "ACCTFILE", OperationKind::Io(IoVerb::Read), "B.CBL"),
            obs(Target::Files, "ACCTFILE", OperationKind::Io(IoVerb::Read), "A.CBL"),
        ]
        .into_iter()
        .collect();

        let entry = &maps.files["ACCTFILE"];
        assert_eq!(entry.count("READ"), 3);
        assert_eq!(entry.programs.len(), 2);
        assert!(maps.tables.is_empty());
    }

    #[test]
    fn test_merge_is_commutative() {
        let a: LineageMaps = vec![
            obs(Target::Files, "F1", OperationKind::Io(IoVerb::Write), "A.CBL"),
            obs(Target::Tables, "T1", OperationKind::Select, "A.CBL"),
        ]
        .into_iter()
        .collect();
        let b: LineageMaps = vec![
            obs(Target::Files, "F1", OperationKind::Io(IoVerb::Read), "B.CBL"),
            obs(Target::Tables, "T1", OperationKind::Select, "B.CBL"),
        ]
        .into_iter()
        .collect();

        let ab = a.clone().merge(b.clone());
        let ba = b.merge(a);
        assert_eq!(ab, ba);
        assert_eq!(ab.tables["T1"].count("SELECT"), 2);
        assert_eq!(ab.files["F1"].op_names(), vec!["READ", "WRITE"]);
    }

    #[test]
    fn test_merge_with_empty_is_identity() {
        let a: LineageMaps = vec![obs(Target::Files, "F1", OperationKind::Fd, "A.CBL")]
            .into_iter()
            .collect();
        assert_eq!(a.clone().merge(LineageMaps::new()), a);
        assert_eq!(LineageMaps::new().merge(a.clone()), a);
    }

    #[test]
    fn test_non_artifact_chunks_skipped() {
        let extractor = EntityExtractor::new().unwrap();
        let chunk = ChunkRecord::new("S1", "requirements.pdf", 0, "READ ACCTFILE.");
        assert!(extract_chunk(&extractor, &ScanConfig::default(), &chunk).is_empty());
    }

    #[test]
    fn test_db2_prefixed_chunks_scanned() {
        let extractor = EntityExtractor::new().unwrap();
        let chunk = ChunkRecord::new(
            "S1",
            "DB2:ACCOUNTS",
            0,
            "EXEC SQL SELECT BAL INTO :B FROM ACCOUNTS END-EXEC.",
        );
        let maps = extract_chunk(&extractor, &ScanConfig::default(), &chunk);
        assert_eq!(maps.tables["ACCOUNTS"].count("SELECT"), 1);
    }

    #[test]
    fn test_empty_snapshot() {
        let extractor = EntityExtractor::new().unwrap();
        let report = aggregate(&Snapshot::default(), &extractor, &ScanConfig::default());
        assert!(report.is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let maps: LineageMaps = vec![obs(
            Target::Files,
            "LOGICAL:VSAMFILE",
            OperationKind::AssignTo("DDVSAM".to_string()),
            "PGMA.CBL",
        )]
        .into_iter()
        .collect();
        let json = serde_json::to_value(&maps).unwrap();
        assert_eq!(json["files"]["LOGICAL:VSAMFILE"]["ops"]["ASSIGN:DDVSAM"], 1);
        assert_eq!(json["files"]["LOGICAL:VSAMFILE"]["programs"][0], "PGMA.CBL");
        assert!(json["files"]["LOGICAL:VSAMFILE"].get("subject").is_none());

        let back: LineageMaps = serde_json::from_value(json).unwrap();
        assert_eq!(back.files["LOGICAL:VSAMFILE"].count("ASSIGN:DDVSAM"), 1);
    }
}
