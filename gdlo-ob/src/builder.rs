//! Turns resolved wire records into [`LevelSnapshot`] values
//!
//! Everything here is pure: no I/O, no logging, no failure. Fields that do
//! not parse take their neutral value.

use crate::protocol::records::int;
use crate::protocol::{AuthorRecord, DecodedPage, LevelRecord, SongRecord};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use gdlo_common::models::{
    Creator, CustomSong, LevelSnapshot, OfficialCatalog, SongReference, DEMON_STARS,
};

/// Raw demon sub-rating codes in tier order (tier = position + 1)
const DEMON_TIER_CODES: [i64; 5] = [3, 4, 0, 5, 6];

const PADDING_INDIFFERENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, PADDING_INDIFFERENT);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, PADDING_INDIFFERENT);

/// Build every level of a decoded page, in page order
pub fn build_page(page: &DecodedPage, catalog: &OfficialCatalog) -> Vec<LevelSnapshot> {
    page.resolve()
        .iter()
        .map(|r| build_snapshot(&r.level, &r.author, &r.song, catalog))
        .collect()
}

pub fn build_snapshot(
    level: &LevelRecord,
    author: &AuthorRecord,
    song: &SongRecord,
    catalog: &OfficialCatalog,
) -> LevelSnapshot {
    let num = |value: &Option<String>| int(value.as_deref());
    let stars = num(&level.stars);

    LevelSnapshot {
        id: level.level_id().unwrap_or(0),
        name: level.name.clone().unwrap_or_default(),
        description: decode_description(level.description.as_deref().unwrap_or("")),
        author: build_creator(author),
        downloads: num(&level.downloads),
        likes: num(&level.likes),
        creator_points: creator_points(level),
        difficulty_rating: clamp_u8(stars),
        demon_tier: if stars == i64::from(DEMON_STARS) {
            demon_tier(num(&level.demon_difficulty))
        } else {
            0
        },
        reward_coin_count: clamp_u8(num(&level.coins)),
        coins_verified: num(&level.verified_coins) > 0,
        length_tier: clamp_u8(num(&level.length)),
        game_version_code: num(&level.game_version),
        format_version: num(&level.version),
        source_level_id: num(&level.copied_id),
        supports_two_player: num(&level.two_player) != 0,
        requested_difficulty: clamp_u8(num(&level.stars_requested)),
        object_count: num(&level.objects),
        song: build_song(level, song, catalog),
    }
}

/// One point each for a star rating, a featured score and an epic tier
pub fn creator_points(level: &LevelRecord) -> u8 {
    [&level.stars, &level.featured, &level.epic]
        .into_iter()
        .filter(|field| int(field.as_deref()) > 0)
        .count() as u8
}

/// Map a raw demon sub-rating code to its tier (1-5); unknown codes give 0
pub fn demon_tier(code: i64) -> u8 {
    DEMON_TIER_CODES
        .iter()
        .position(|&c| c == code)
        .map(|pos| pos as u8 + 1)
        .unwrap_or(0)
}

pub fn build_creator(author: &AuthorRecord) -> Creator {
    Creator::new(author.player_id, author.name.clone(), author.account_id)
}

fn build_song(level: &LevelRecord, song: &SongRecord, catalog: &OfficialCatalog) -> SongReference {
    let custom_id = level.custom_song();
    if custom_id > 0 {
        let mut custom = build_custom_song(song);
        custom.id = custom_id;
        SongReference::Custom(custom)
    } else {
        let index = u32::try_from(int(level.official_song.as_deref())).unwrap_or(0);
        SongReference::Official(catalog.resolve(index))
    }
}

/// Custom song from a song record; absent text fields become `?`/empty
pub fn build_custom_song(song: &SongRecord) -> CustomSong {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    CustomSong {
        id: song.song_id().unwrap_or(0),
        name: song.name.clone().unwrap_or_else(|| "?".to_string()),
        artist_id: int(song.artist_id.as_deref()),
        artist: song.artist.clone().unwrap_or_else(|| "?".to_string()),
        size: text(&song.size),
        download_link: decode_link(song.link.as_deref().unwrap_or("")),
        video_id: text(&song.video_id),
        external_url: text(&song.external_url),
        verified: int(song.verified.as_deref()) != 0,
        priority: int(song.priority.as_deref()),
    }
}

/// Base64 text (URL-safe or standard alphabet); undecodable input gives ""
pub fn decode_description(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    URL_SAFE_LENIENT
        .decode(raw)
        .or_else(|_| STANDARD_LENIENT.decode(raw))
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Percent-decoded download link, or the raw value if it does not decode
pub fn decode_link(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|link| link.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

fn clamp_u8(value: i64) -> u8 {
    value.clamp(0, i64::from(u8::MAX)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &str) -> LevelRecord {
        LevelRecord::from_pairs(pairs.split(':'))
    }

    #[test]
    fn test_creator_points_count_independent_flags() {
        assert_eq!(creator_points(&record("1:1")), 0);
        assert_eq!(creator_points(&record("1:1:18:4")), 1);
        assert_eq!(creator_points(&record("1:1:18:4:19:1200")), 2);
        assert_eq!(creator_points(&record("1:1:18:4:19:1200:42:1")), 3);
        assert_eq!(creator_points(&record("1:1:19:5")), 1);
    }

    #[test]
    fn test_demon_tier_mapping() {
        assert_eq!(demon_tier(3), 1);
        assert_eq!(demon_tier(4), 2);
        assert_eq!(demon_tier(0), 3);
        assert_eq!(demon_tier(5), 4);
        assert_eq!(demon_tier(6), 5);
        assert_eq!(demon_tier(7), 0);
    }

    #[test]
    fn test_demon_tier_only_for_demons() {
        let catalog = OfficialCatalog::global();
        let author = AuthorRecord::placeholder(1);
        let song = SongRecord::default();

        let demon = build_snapshot(&record("1:5:18:10:43:6"), &author, &song, catalog);
        assert_eq!(demon.demon_tier, 5);

        let hard = build_snapshot(&record("1:5:18:5:43:6"), &author, &song, catalog);
        assert_eq!(hard.demon_tier, 0);
    }

    #[test]
    fn test_full_snapshot() {
        let catalog = OfficialCatalog::global();
        let level = record(
            "1:128:2:1st Level:3:SGVsbG8gd29ybGQ=:5:3:6:4:10:5000:13:21:14:300:15:2:18:5:19:10:30:77:31:1:35:501:37:3:38:1:39:6:45:4200",
        );
        let author = AuthorRecord {
            player_id: 4,
            name: "RobTop".to_string(),
            account_id: 71,
        };
        let song = SongRecord::from_pairs(
            "1~|~501~|~2~|~Track~|~3~|~9~|~4~|~Artist~|~5~|~3.5~|~8~|~1~|~10~|~https%3A%2F%2Fa.b%2Fc.mp3"
                .split("~|~"),
        );

        let snapshot = build_snapshot(&level, &author, &song, catalog);
        assert_eq!(snapshot.id, 128);
        assert_eq!(snapshot.name, "1st Level");
        assert_eq!(snapshot.description, "Hello world");
        assert_eq!(snapshot.author, Creator::new(4, "RobTop", 71));
        assert_eq!(snapshot.downloads, 5000);
        assert_eq!(snapshot.likes, 300);
        assert_eq!(snapshot.creator_points, 2);
        assert_eq!(snapshot.difficulty_rating, 5);
        assert_eq!(snapshot.reward_coin_count, 3);
        assert!(snapshot.coins_verified);
        assert_eq!(snapshot.length_tier, 2);
        assert_eq!(snapshot.game_version_code, 21);
        assert_eq!(snapshot.format_version, 3);
        assert_eq!(snapshot.source_level_id, 77);
        assert!(snapshot.supports_two_player);
        assert_eq!(snapshot.requested_difficulty, 6);
        assert_eq!(snapshot.object_count, 4200);

        match snapshot.song {
            SongReference::Custom(song) => {
                assert_eq!(song.id, 501);
                assert_eq!(song.name, "Track");
                assert_eq!(song.artist_id, 9);
                assert_eq!(song.download_link, "https://a.b/c.mp3");
                assert!(song.verified);
            }
            other => panic!("expected custom song, got {:?}", other),
        }
    }

    #[test]
    fn test_official_song_resolution_covers_catalog() {
        let catalog = OfficialCatalog::global();
        let author = AuthorRecord::placeholder(1);
        for entry in catalog.iter() {
            let level = record(&format!("1:1:12:{}:35:0", entry.index));
            let snapshot = build_snapshot(&level, &author, &SongRecord::default(), catalog);
            assert_eq!(snapshot.song, SongReference::Official(entry.clone()));
            assert_eq!(snapshot.song.storage_id(), !(entry.index as i64));
        }
    }

    #[test]
    fn test_bad_description_is_empty() {
        assert_eq!(decode_description("%%%not base64%%%"), "");
        assert_eq!(decode_description(""), "");
        assert_eq!(decode_description("SGk"), "Hi");
    }

    #[test]
    fn test_link_decoding_falls_back_to_raw() {
        assert_eq!(decode_link("a%20b"), "a b");
        assert_eq!(decode_link("bad%FF%FE"), "bad%FF%FE");
    }
}
