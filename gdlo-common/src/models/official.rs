//! Built-in catalog of official songs
//!
//! Loaded once from the bundled JSON list of `[name, artist]` pairs. Catalog
//! entry `n` is stored under song id `~n` (`-n - 1`), keeping official ids
//! disjoint from the positive custom song ids.

use once_cell::sync::Lazy;
use serde::Serialize;

const CATALOG_JSON: &str = include_str!("../../data/official_songs.json");

static CATALOG: Lazy<OfficialCatalog> = Lazy::new(|| {
    let pairs: Vec<(String, String)> = match serde_json::from_str(CATALOG_JSON) {
        Ok(pairs) => pairs,
        Err(e) => {
            tracing::error!("Bundled official song catalog is unreadable: {}", e);
            Vec::new()
        }
    };
    OfficialCatalog::from_pairs(pairs)
});

/// One entry of the official catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfficialSong {
    /// Catalog index (0-based)
    pub index: u32,
    pub name: String,
    /// Negative index of the artist's first appearance in the catalog
    pub artist_id: i64,
    pub artist: String,
}

impl OfficialSong {
    /// Entry for an index the catalog does not know
    pub fn unknown(index: u32) -> Self {
        Self {
            index,
            name: "?".to_string(),
            artist_id: 0,
            artist: "?".to_string(),
        }
    }

    /// Signed storage id (`~index`)
    pub fn storage_id(&self) -> i64 {
        index_to_storage_id(self.index)
    }
}

/// Convert an official index into its storage id (`~n`)
pub fn index_to_storage_id(index: u32) -> i64 {
    !(index as i64)
}

/// Convert a negative storage id back into an official index
pub fn storage_id_to_index(id: i64) -> Option<u32> {
    if id < 0 {
        u32::try_from(!id).ok()
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct OfficialCatalog {
    songs: Vec<OfficialSong>,
}

impl OfficialCatalog {
    /// Process-wide catalog
    pub fn global() -> &'static OfficialCatalog {
        &CATALOG
    }

    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut artists: Vec<String> = Vec::new();
        let songs = pairs
            .into_iter()
            .enumerate()
            .map(|(i, (name, artist))| {
                let artist_pos = match artists.iter().position(|a| *a == artist) {
                    Some(pos) => pos,
                    None => {
                        artists.push(artist.clone());
                        artists.len() - 1
                    }
                };
                OfficialSong {
                    index: i as u32,
                    name,
                    artist_id: -(artist_pos as i64),
                    artist,
                }
            })
            .collect();
        Self { songs }
    }

    pub fn get(&self, index: u32) -> Option<&OfficialSong> {
        self.songs.get(index as usize)
    }

    /// Catalog entry, or an `?` placeholder for unknown indices
    pub fn resolve(&self, index: u32) -> OfficialSong {
        self.get(index)
            .cloned()
            .unwrap_or_else(|| OfficialSong::unknown(index))
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OfficialSong> {
        self.songs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_catalog_loads() {
        let catalog = OfficialCatalog::global();
        assert!(!catalog.is_empty());
        let first = catalog.get(0).unwrap();
        assert_eq!(first.name, "Stereo Madness");
        assert_eq!(first.artist_id, 0);
    }

    #[test]
    fn test_storage_id_complement() {
        assert_eq!(index_to_storage_id(0), -1);
        assert_eq!(index_to_storage_id(5), -6);
        for n in 0..50u32 {
            assert_eq!(storage_id_to_index(index_to_storage_id(n)), Some(n));
        }
        assert_eq!(storage_id_to_index(0), None);
        assert_eq!(storage_id_to_index(42), None);
    }

    #[test]
    fn test_artist_ids_follow_first_appearance() {
        let catalog = OfficialCatalog::from_pairs(vec![
            ("A".into(), "X".into()),
            ("B".into(), "Y".into()),
            ("C".into(), "X".into()),
        ]);
        assert_eq!(catalog.get(0).unwrap().artist_id, 0);
        assert_eq!(catalog.get(1).unwrap().artist_id, -1);
        assert_eq!(catalog.get(2).unwrap().artist_id, 0);
    }

    #[test]
    fn test_unknown_index_resolves_to_placeholder() {
        let catalog = OfficialCatalog::from_pairs(vec![]);
        let song = catalog.resolve(7);
        assert_eq!(song.name, "?");
        assert_eq!(song.storage_id(), -8);
    }
}
