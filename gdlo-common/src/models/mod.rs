//! Data model shared by the observer and the query server

pub mod official;

pub use official::{OfficialCatalog, OfficialSong};

use serde::Serialize;

/// Star rating value that marks the demon tier
pub const DEMON_STARS: u8 = 10;

/// Demon sub-rating names, indexed by `demon_tier - 1`
pub const DEMON_TIER_NAMES: [&str; 5] = ["Easy", "Medium", "Hard", "Insane", "Extreme"];

/// Length tier names, indexed by `length_tier`
pub const LENGTH_NAMES: [&str; 5] = ["Tiny", "Short", "Medium", "Long", "XL"];

/// Level owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Creator {
    pub player_id: i64,
    pub name: String,
    /// 0 for anonymous/legacy players
    pub account_id: i64,
    /// Creator point total maintained by the CP ledger
    pub cumulative_cp: i64,
}

impl Creator {
    pub fn new(player_id: i64, name: impl Into<String>, account_id: i64) -> Self {
        Self {
            player_id,
            name: name.into(),
            account_id,
            cumulative_cp: 0,
        }
    }

    /// Neutral value used when storage cannot provide a creator
    pub fn fallback() -> Self {
        Self::new(0, "?", 0)
    }
}

/// User-submitted song
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomSong {
    pub id: i64,
    pub name: String,
    pub artist_id: i64,
    pub artist: String,
    /// Size in MB as transported
    pub size: String,
    pub download_link: String,
    pub video_id: String,
    pub external_url: String,
    pub verified: bool,
    pub priority: i64,
}

impl CustomSong {
    /// Neutral value used when storage cannot provide a song
    pub fn fallback() -> Self {
        Self {
            id: 0,
            name: "?".to_string(),
            artist_id: 0,
            artist: "?".to_string(),
            size: String::new(),
            download_link: String::new(),
            video_id: String::new(),
            external_url: String::new(),
            verified: false,
            priority: 0,
        }
    }

    /// Tracked fields as `(label, rendered value)` pairs, for change reports
    pub fn tracked_fields(&self) -> [(&'static str, String); 9] {
        [
            ("name", self.name.clone()),
            ("artistID", self.artist_id.to_string()),
            ("artist", self.artist.clone()),
            ("size", self.size.clone()),
            ("link", self.download_link.clone()),
            ("videoID", self.video_id.clone()),
            ("youtubeURL", self.external_url.clone()),
            ("isVerified", self.verified.to_string()),
            ("songPriority", self.priority.to_string()),
        ]
    }
}

/// The one song a level uses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SongReference {
    Custom(CustomSong),
    Official(OfficialSong),
}

impl SongReference {
    /// Signed id used at the storage boundary: custom ids are positive,
    /// official index `n` is stored as `~n`
    pub fn storage_id(&self) -> i64 {
        match self {
            SongReference::Custom(song) => song.id,
            SongReference::Official(song) => song.storage_id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SongReference::Custom(song) => &song.name,
            SongReference::Official(song) => &song.name,
        }
    }

    pub fn artist(&self) -> &str {
        match self {
            SongReference::Custom(song) => &song.artist,
            SongReference::Official(song) => &song.artist,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, SongReference::Custom(_))
    }

    /// Short display form used in change reports
    pub fn describe(&self) -> String {
        match self {
            SongReference::Custom(song) => {
                format!("{} by {} ({})", song.name, song.artist, song.id)
            }
            SongReference::Official(song) => format!("{} by {}", song.name, song.artist),
        }
    }
}

/// Comparable state of one level at one fetch instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelSnapshot {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub author: Creator,
    pub downloads: i64,
    pub likes: i64,
    /// 0-3
    pub creator_points: u8,
    /// 0 = unrated, 1-10
    pub difficulty_rating: u8,
    /// 0-5, only meaningful when `difficulty_rating == 10`
    pub demon_tier: u8,
    pub reward_coin_count: u8,
    pub coins_verified: bool,
    /// 0-4
    pub length_tier: u8,
    pub game_version_code: i64,
    pub format_version: i64,
    /// 0 for originals
    pub source_level_id: i64,
    pub supports_two_player: bool,
    pub requested_difficulty: u8,
    pub object_count: i64,
    pub song: SongReference,
}

impl LevelSnapshot {
    pub fn owner_player_id(&self) -> i64 {
        self.author.player_id
    }

    pub fn is_rated(&self) -> bool {
        self.difficulty_rating != 0
    }

    /// `"{name} by {author} ({id})"`, with `?` standing in for blanks
    pub fn describe(&self) -> String {
        let name = if self.name.is_empty() { "?" } else { &self.name };
        let author = if self.author.name.is_empty() {
            "?"
        } else {
            &self.author.name
        };
        format!("{} by {} ({})", name, author, self.id)
    }

    pub fn difficulty_text(&self) -> String {
        difficulty_text(self.difficulty_rating, self.demon_tier)
    }

    pub fn length_text(&self) -> &'static str {
        length_text(self.length_tier)
    }
}

/// Human-readable difficulty for a star rating
pub fn difficulty_text(stars: u8, demon_tier: u8) -> String {
    match stars {
        0 => "Unrated".to_string(),
        1 => "Auto".to_string(),
        2 => "Easy".to_string(),
        3 => "Normal".to_string(),
        4 | 5 => "Hard".to_string(),
        6 | 7 => "Harder".to_string(),
        8 | 9 => "Insane".to_string(),
        _ => match demon_tier {
            1..=5 => format!("{} Demon", DEMON_TIER_NAMES[demon_tier as usize - 1]),
            _ => "Demon".to_string(),
        },
    }
}

pub fn length_text(length_tier: u8) -> &'static str {
    LENGTH_NAMES.get(length_tier as usize).copied().unwrap_or("?")
}

/// In-game version label for a game version code
pub fn ingame_version(version: i64) -> String {
    if version > 17 {
        format!("{:.1}", version as f64 / 10.0)
    } else if version == 11 {
        "1.8".to_string()
    } else if version == 10 {
        "1.7".to_string()
    } else {
        format!("1.{}", version - 1)
    }
}
