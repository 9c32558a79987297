//! Source ingestion
//!
//! Splits source files into line-numbered chunks and appends them to a
//! [`MemoryChunkStore`]. This stands in for the document ingestion service so
//! the binaries can analyze a directory or a chunk dump directly.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::chunk::{ChunkRecord, MemoryChunkStore};
use crate::config::IngestConfig;
use crate::error::{LineageError, Result};

/// Split source text into blocks of `lines_per_chunk` lines, numbering each line
/// with its 1-based position as `00001: `
pub fn chunk_code(text: &str, lines_per_chunk: usize) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let per_chunk = lines_per_chunk.max(1);

    lines
        .chunks(per_chunk)
        .enumerate()
        .map(|(block_idx, block)| {
            let start = block_idx * per_chunk;
            block
                .iter()
                .enumerate()
                .map(|(j, line)| format!("{:05}: {}", start + j + 1, line))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect()
}

/// Chunk one file's text into the store under `filename`
pub fn ingest_code(
    store: &MemoryChunkStore,
    session_id: &str,
    filename: &str,
    code_text: &str,
    lines_per_chunk: usize,
) -> Result<usize> {
    let chunks = chunk_code(code_text, lines_per_chunk);
    for chunk in &chunks {
        store.add_chunk(session_id, filename, chunk)?;
    }
    Ok(chunks.len())
}

/// Walk a source directory and ingest every file with a configured extension.
/// Returns the number of chunks added.
pub fn ingest_directory(
    store: &MemoryChunkStore,
    session_id: &str,
    dir: &Path,
    config: &IngestConfig,
) -> Result<usize> {
    if !dir.is_dir() {
        return Err(LineageError::InvalidInput(format!(
            "not a directory: {}",
            dir.display()
        )));
    }

    let mut added = 0;
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let relative = path.strip_prefix(dir).unwrap_or(path);
        let relative_str = relative.to_string_lossy().replace('\\', "/");

        if config.skip_prefixes.iter().any(|p| relative_str.starts_with(p)) {
            continue;
        }
        if !has_extension(&relative_str, &config.extensions) {
            continue;
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable source file");
                continue;
            }
        };

        let count = ingest_code(store, session_id, &relative_str, &content, config.lines_per_chunk)?;
        debug!(file = %relative_str, chunks = count, "ingested source file");
        added += count;
    }

    Ok(added)
}

/// Read a JSON array of chunk records
pub fn load_chunks_json(path: &Path) -> Result<Vec<ChunkRecord>> {
    let content = fs::read_to_string(path)?;
    let records: Vec<ChunkRecord> = serde_json::from_str(&content)?;
    Ok(records)
}

/// Session used for directory sources when none is named
pub const DEFAULT_SESSION: &str = "default";

/// The explicit session, or else the first session of the loaded store
pub fn pick_session(store: &MemoryChunkStore, requested: Option<&str>) -> String {
    match requested {
        Some(session) => session.to_string(),
        None => store
            .sessions()
            .into_iter()
            .next()
            .unwrap_or_else(|| DEFAULT_SESSION.to_string()),
    }
}

/// Where the binaries read chunks from
#[derive(Debug, Clone)]
pub enum Source {
    /// Source tree, chunked on load
    Directory(PathBuf),
    /// JSON array of [`ChunkRecord`]s
    ChunkDump(PathBuf),
}

/// Build a store holding `source`'s chunks. Directory sources are filed under
/// `session_id`; chunk dumps keep their own session ids.
pub fn load_source(source: &Source, session_id: &str, config: &IngestConfig) -> Result<MemoryChunkStore> {
    let store = MemoryChunkStore::new();
    let added = match source {
        Source::Directory(dir) => ingest_directory(&store, session_id, dir, config)?,
        Source::ChunkDump(path) => store.extend(load_chunks_json(path)?)?,
    };
    info!(chunks = added, sessions = store.sessions().len(), "chunk store loaded");
    Ok(store)
}

fn has_extension(name: &str, extensions: &[String]) -> bool {
    let lower = name.to_lowercase();
    extensions.iter().any(|ext| lower.ends_with(&ext.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkStore;
    use tempfile::TempDir;

    #[test]
    fn test_chunk_code_numbers_lines() {
        let text = "LINE A\nLINE B\nLINE C";
        let chunks = chunk_code(text, 2);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "00001: LINE A\n00002: LINE B");
        assert_eq!(chunks[1], "00003: LINE C");
    }

    #[test]
    fn test_chunk_code_empty() {
        assert!(chunk_code("", 120).is_empty());
    }

    #[test]
    fn test_ingest_directory_filters_extensions() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("PGMA.cbl"), "       READ VSAMFILE.\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "not source").unwrap();
        fs::create_dir(dir.path().join("copy")).unwrap();
        fs::write(dir.path().join("copy/ACCTREC.cpy"), "       01 ACCT-REC.\n").unwrap();

        let store = MemoryChunkStore::new();
        let added = ingest_directory(&store, "S1", dir.path(), &IngestConfig::default()).unwrap();
        assert_eq!(added, 2);

        let chunks = store.list_chunks("S1").unwrap();
        let names: Vec<&str> = chunks.iter().map(|c| c.filename.as_str()).collect();
        assert_eq!(names, vec!["PGMA.cbl", "copy/ACCTREC.cpy"]);
        assert!(chunks[0].content.starts_with("00001: "));
    }

    #[test]
    fn test_load_source_chunk_dump() {
        let dir = TempDir::new().unwrap();
        let dump = dir.path().join("chunks.json");
        let records = vec![
            ChunkRecord::new("S9", "PGMA.CBL", 0, "READ VSAMFILE."),
            ChunkRecord::new("S9", "PGMA.CBL", 1, "WRITE VSAMFILE."),
        ];
        fs::write(&dump, serde_json::to_string(&records).unwrap()).unwrap();

        let store = load_source(&Source::ChunkDump(dump), "ignored", &IngestConfig::default()).unwrap();
        assert_eq!(store.sessions(), vec!["S9".to_string()]);
        assert_eq!(store.list_chunks("S9").unwrap().len(), 2);
    }

    #[test]
    fn test_pick_session_defaults_to_dump_session() {
        let store = MemoryChunkStore::new();
        assert_eq!(pick_session(&store, None), DEFAULT_SESSION);

        store.extend(vec![ChunkRecord::new("S9", "PGMA.CBL", 0, "READ VSAMFILE.")]).unwrap();
        assert_eq!(pick_session(&store, None), "S9");
        assert_eq!(pick_session(&store, Some("S1")), "S1");
    }

    #[test]
    fn test_ingest_rejects_missing_dir() {
        let store = MemoryChunkStore::new();
        let result = ingest_directory(&store, "S1", Path::new("/no/such/dir"), &IngestConfig::default());
        assert!(matches!(result, Err(LineageError::InvalidInput(_))));
    }
}
