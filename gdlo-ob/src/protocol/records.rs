//! Wire records of the listing protocol
//!
//! Level and song records arrive as flat `index, value, index, value, ...`
//! sequences. Each record type is a struct of optional named fields with a
//! table mapping wire index to field; indices outside the table are ignored.

/// Defines a record struct plus its index table
macro_rules! wire_record {
    (
        $(#[$meta:meta])*
        $name:ident { $($index:literal => $field:ident),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name {
            $(pub $field: Option<String>,)+
        }

        impl $name {
            /// Wire indices this record understands, in field order
            pub const INDICES: &'static [u32] = &[$($index),+];

            /// Store `value` under wire index `index`; returns `false` for
            /// indices this record does not know
            pub fn set_field(&mut self, index: u32, value: &str) -> bool {
                match index {
                    $($index => self.$field = Some(value.to_string()),)+
                    _ => return false,
                }
                true
            }

            pub fn field(&self, index: u32) -> Option<&str> {
                match index {
                    $($index => self.$field.as_deref(),)+
                    _ => None,
                }
            }

            /// Present fields as `(index, value)` pairs, in field order
            pub fn present_fields(&self) -> Vec<(u32, &str)> {
                let mut fields = Vec::new();
                $(
                    if let Some(value) = self.$field.as_deref() {
                        fields.push(($index, value));
                    }
                )+
                fields
            }

            /// Build a record from a flat `index, value, ...` sequence
            pub fn from_pairs<'a, I>(parts: I) -> Self
            where
                I: IntoIterator<Item = &'a str>,
            {
                let mut record = Self::default();
                let mut parts = parts.into_iter();
                while let (Some(index), Some(value)) = (parts.next(), parts.next()) {
                    if let Ok(index) = index.trim().parse::<u32>() {
                        record.set_field(index, value);
                    }
                }
                record
            }
        }
    };
}

wire_record! {
    /// One level entry of a listing page
    LevelRecord {
        1 => id,
        2 => name,
        3 => description,
        5 => version,
        6 => player_id,
        8 => difficulty_denominator,
        9 => difficulty_numerator,
        10 => downloads,
        12 => official_song,
        13 => game_version,
        14 => likes,
        15 => length,
        17 => demon,
        18 => stars,
        19 => featured,
        25 => auto,
        30 => copied_id,
        31 => two_player,
        35 => custom_song_id,
        37 => coins,
        38 => verified_coins,
        39 => stars_requested,
        42 => epic,
        43 => demon_difficulty,
        45 => objects,
    }
}

wire_record! {
    /// One custom song entry of a listing page
    SongRecord {
        1 => id,
        2 => name,
        3 => artist_id,
        4 => artist,
        5 => size,
        6 => video_id,
        7 => external_url,
        8 => verified,
        9 => priority,
        10 => link,
    }
}

/// Parse a numeric wire value; absent or non-numeric values read as 0
pub fn int(value: Option<&str>) -> i64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

impl LevelRecord {
    pub fn level_id(&self) -> Option<i64> {
        self.id.as_deref().and_then(|v| v.trim().parse().ok())
    }

    pub fn owner_id(&self) -> i64 {
        int(self.player_id.as_deref())
    }

    pub fn custom_song(&self) -> i64 {
        int(self.custom_song_id.as_deref())
    }
}

impl SongRecord {
    pub fn song_id(&self) -> Option<i64> {
        self.id.as_deref().and_then(|v| v.trim().parse().ok())
    }
}

/// `playerID:name:accountID` entry of the author list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorRecord {
    pub player_id: i64,
    pub name: String,
    pub account_id: i64,
}

impl AuthorRecord {
    /// Stand-in for an owner missing from the author list
    pub fn placeholder(player_id: i64) -> Self {
        Self {
            player_id,
            name: "-".to_string(),
            account_id: 0,
        }
    }

    /// Parse one author entry; `None` when the player id is not numeric
    pub fn parse(entry: &str) -> Option<Self> {
        let mut parts = entry.split(':');
        let player_id = parts.next()?.trim().parse().ok()?;
        let name = parts.next().unwrap_or("");
        let account_id = int(parts.next());
        Some(Self {
            player_id,
            name: if name.is_empty() { "-" } else { name }.to_string(),
            account_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pairs_ignores_unknown_indices() {
        let record = LevelRecord::from_pairs("1:128:2:1st Level:999:junk:18:5".split(':'));
        assert_eq!(record.level_id(), Some(128));
        assert_eq!(record.name.as_deref(), Some("1st Level"));
        assert_eq!(record.stars.as_deref(), Some("5"));
        assert_eq!(record.present_fields().len(), 3);
    }

    #[test]
    fn test_from_pairs_drops_dangling_index() {
        let record = LevelRecord::from_pairs("1:7:2".split(':'));
        assert_eq!(record.level_id(), Some(7));
        assert!(record.name.is_none());
    }

    #[test]
    fn test_set_field_reports_unknown() {
        let mut song = SongRecord::default();
        assert!(song.set_field(2, "Name"));
        assert!(!song.set_field(11, "x"));
        assert_eq!(song.field(2), Some("Name"));
        assert_eq!(SongRecord::INDICES.len(), 10);
    }

    #[test]
    fn test_author_parse() {
        let author = AuthorRecord::parse("16:RobTop:71").unwrap();
        assert_eq!(author.player_id, 16);
        assert_eq!(author.name, "RobTop");
        assert_eq!(author.account_id, 71);

        let legacy = AuthorRecord::parse("42:Someone").unwrap();
        assert_eq!(legacy.account_id, 0);
        assert!(AuthorRecord::parse("abc:x:1").is_none());
    }
}
