//! Listing protocol: wire records, decoder and encoder

pub mod decoder;
pub mod records;

pub use decoder::{decode, decode_response, encode};
pub use records::{AuthorRecord, LevelRecord, SongRecord};

use std::collections::HashMap;

/// Outcome of one listing request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Success,
    /// Empty payload: upstream throttling, not an empty listing
    Blocked,
    /// Rejection, transport failure or malformed payload
    Error,
}

/// One decoded listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPage {
    pub status: FetchStatus,
    pub total: i64,
    pub offset: i64,
    pub page_size: i64,
    pub levels: Vec<LevelRecord>,
    /// Keyed by player id
    pub authors: HashMap<i64, AuthorRecord>,
    /// Keyed by the song record's own id
    pub songs: HashMap<i64, SongRecord>,
}

/// A level record with its side-table entries looked up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRecord {
    pub level: LevelRecord,
    pub author: AuthorRecord,
    pub song: SongRecord,
    /// Whether the author came from the page's author list
    pub author_listed: bool,
}

impl DecodedPage {
    /// Zero-result page with the given status
    pub fn empty(status: FetchStatus) -> Self {
        Self {
            status,
            total: 0,
            offset: 0,
            page_size: 0,
            levels: Vec::new(),
            authors: HashMap::new(),
            songs: HashMap::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == FetchStatus::Success
    }

    /// Look up author and song of every level record
    ///
    /// A missing author resolves to [`AuthorRecord::placeholder`], a missing
    /// song to an empty record.
    pub fn resolve(&self) -> Vec<ResolvedRecord> {
        self.levels
            .iter()
            .map(|level| {
                let owner = level.owner_id();
                let (author, author_listed) = match self.authors.get(&owner) {
                    Some(author) => (author.clone(), true),
                    None => (AuthorRecord::placeholder(owner), false),
                };
                let song = self
                    .songs
                    .get(&level.custom_song())
                    .cloned()
                    .unwrap_or_default();
                ResolvedRecord {
                    level: level.clone(),
                    author,
                    song,
                    author_listed,
                }
            })
            .collect()
    }
}
