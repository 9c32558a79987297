//! Chunk records and the chunk store seam
//!
//! The chunk store owns stored source text. Analysis only ever reads it, through
//! a [`Snapshot`] fetched once per request.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{LineageError, Result};

/// One stored unit of source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub session_id: String,
    pub filename: String,
    pub position: usize,
    pub content: String,
}

impl ChunkRecord {
    pub fn new(
        session_id: impl Into<String>,
        filename: impl Into<String>,
        position: usize,
        content: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            filename: filename.into(),
            position,
            content: content.into(),
        }
    }

    /// Content as the recognizers should see it
    pub fn source_text(&self, strip_line_numbers: bool) -> Cow<'_, str> {
        if strip_line_numbers {
            strip_line_number_prefixes(&self.content)
        } else {
            Cow::Borrowed(&self.content)
        }
    }
}

/// Read access to stored chunks
pub trait ChunkStore {
    /// All chunks of a session, ordered by insertion position.
    /// An unknown session yields an empty list.
    fn list_chunks(&self, session_id: &str) -> Result<Vec<ChunkRecord>>;
}

impl<S: ChunkStore + ?Sized> ChunkStore for &S {
    fn list_chunks(&self, session_id: &str) -> Result<Vec<ChunkRecord>> {
        (**self).list_chunks(session_id)
    }
}

/// Append-only in-memory chunk store
#[derive(Debug, Default)]
pub struct MemoryChunkStore {
    sessions: RwLock<HashMap<String, Vec<ChunkRecord>>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk to a session, returning its position
    pub fn add_chunk(&self, session_id: &str, filename: &str, content: &str) -> Result<usize> {
        let mut sessions = self.sessions.write().map_err(|_| LineageError::Store {
            session: session_id.to_string(),
            message: "chunk store lock poisoned".to_string(),
        })?;
        let chunks = sessions.entry(session_id.to_string()).or_default();
        let position = chunks.len();
        chunks.push(ChunkRecord::new(session_id, filename, position, content));
        Ok(position)
    }

    /// Append pre-built records, keeping their session ids. Records are taken in
    /// `(session_id, position)` order and positions are reassigned.
    pub fn extend(&self, records: impl IntoIterator<Item = ChunkRecord>) -> Result<usize> {
        let mut records: Vec<ChunkRecord> = records.into_iter().collect();
        records.sort_by(|a, b| (&a.session_id, a.position).cmp(&(&b.session_id, b.position)));
        for record in &records {
            self.add_chunk(&record.session_id, &record.filename, &record.content)?;
        }
        Ok(records.len())
    }

    /// Known session ids, sorted
    pub fn sessions(&self) -> Vec<String> {
        let Ok(sessions) = self.sessions.read() else {
            return Vec::new();
        };
        let mut ids: Vec<String> = sessions.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl ChunkStore for MemoryChunkStore {
    fn list_chunks(&self, session_id: &str) -> Result<Vec<ChunkRecord>> {
        let sessions = self.sessions.read().map_err(|_| LineageError::Store {
            session: session_id.to_string(),
            message: "chunk store lock poisoned".to_string(),
        })?;
        Ok(sessions.get(session_id).cloned().unwrap_or_default())
    }
}

/// Immutable view of a session's chunks for one analysis request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub session_id: String,
    pub chunks: Vec<ChunkRecord>,
}

impl Snapshot {
    /// Bulk-read a session from a store
    pub fn fetch<S: ChunkStore + ?Sized>(store: &S, session_id: &str) -> Result<Self> {
        let mut chunks = store.list_chunks(session_id)?;
        chunks.sort_by_key(|c| c.position);
        Ok(Self {
            session_id: session_id.to_string(),
            chunks,
        })
    }

    pub fn from_chunks(session_id: impl Into<String>, chunks: Vec<ChunkRecord>) -> Self {
        Self {
            session_id: session_id.into(),
            chunks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// SHA-256 over every chunk's filename, position and content, in order
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for chunk in &self.chunks {
            hasher.update(chunk.filename.as_bytes());
            hasher.update([0u8]);
            hasher.update(chunk.position.to_le_bytes());
            hasher.update(chunk.content.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

static LINE_NUMBER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\d{5}: ").unwrap());

/// Remove the `00042: ` prefixes added by code chunking
pub fn strip_line_number_prefixes(content: &str) -> Cow<'_, str> {
    LINE_NUMBER_PREFIX.replace_all(content, "")
}
