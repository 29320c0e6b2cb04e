// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Grouped-media (album) reassembly.
//!
//! The platform delivers album parts as separate events sharing a group
//! key, in no guaranteed order. The assembler buffers parts per key; the
//! first arrival for an unseen key reports `Armed` so the caller starts
//! exactly one quiescence timer, later arrivals append silently. When
//! the timer fires the caller takes the whole buffer in one step.

use dashmap::DashMap;
use deskrelay_core::{MediaItem, MessageId, TopicId, UserId, UserProfile};

/// Which side an album came from, with everything flush needs to route it.
#[derive(Debug, Clone)]
pub enum AlbumOrigin {
    User {
        profile: UserProfile,
        reply_to: Option<MessageId>,
    },
    Operator {
        topic: TopicId,
        sender: UserId,
        reply_to: Option<MessageId>,
    },
}

/// One buffered album part. `seq` is the original message id, which
/// carries the sender's intended order.
#[derive(Debug, Clone)]
pub struct AlbumPart {
    pub seq: MessageId,
    pub item: MediaItem,
}

struct AlbumBuffer {
    origin: AlbumOrigin,
    parts: Vec<AlbumPart>,
}

/// Result of [`AlbumAssembler::ingest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    /// First part for this key; the caller must arm the flush timer.
    Armed,
    /// Appended to an existing buffer.
    Buffered,
}

/// Platform cap on items per grouped-media call.
pub const MAX_CHUNK: usize = 10;

pub struct AlbumAssembler {
    buffers: DashMap<String, AlbumBuffer>,
}

impl AlbumAssembler {
    pub fn new() -> Self {
        Self {
            buffers: DashMap::new(),
        }
    }

    /// Buffers one part. The origin is captured from the first part;
    /// later parts of the same group carry the same routing facts.
    pub fn ingest(&self, key: &str, origin: AlbumOrigin, part: AlbumPart) -> Ingest {
        match self.buffers.entry(key.to_string()) {
            dashmap::Entry::Vacant(vacant) => {
                vacant.insert(AlbumBuffer {
                    origin,
                    parts: vec![part],
                });
                Ingest::Armed
            }
            dashmap::Entry::Occupied(mut occupied) => {
                occupied.get_mut().parts.push(part);
                Ingest::Buffered
            }
        }
    }

    /// Takes the buffer for `key`, sorted by original message id
    /// ascending. Returns `None` when the key was already flushed.
    pub fn flush(&self, key: &str) -> Option<(AlbumOrigin, Vec<AlbumPart>)> {
        let (_, mut buffer) = self.buffers.remove(key)?;
        buffer.parts.sort_by_key(|p| p.seq.0);
        Some((buffer.origin, buffer.parts))
    }
}

impl Default for AlbumAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits sorted parts into send-ready chunks of at most [`MAX_CHUNK`]
/// items. Within each chunk only the first non-empty caption survives;
/// the platform would otherwise render one caption per item.
pub fn into_chunks(parts: Vec<AlbumPart>) -> Vec<Vec<AlbumPart>> {
    let mut chunks: Vec<Vec<AlbumPart>> = Vec::new();
    for batch in parts.chunks(MAX_CHUNK) {
        let mut chunk: Vec<AlbumPart> = batch.to_vec();
        let mut kept = false;
        for part in &mut chunk {
            match &part.item.caption {
                Some(c) if !c.is_empty() && !kept => kept = true,
                _ => part.item.caption = None,
            }
        }
        chunks.push(chunk);
    }
    chunks
}
