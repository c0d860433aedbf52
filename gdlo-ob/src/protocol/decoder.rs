//! Listing payload decoder
//!
//! A payload is `levels#authors#songs#total:offset:pageSize`:
//! - levels: `|`-separated records of `index:value:index:value...`
//! - authors: `|`-separated `playerID:name:accountID`, entries starting with
//!   `~` are skipped
//! - songs: `~:~`-separated records of `index~|~value~|~...`

use super::records::{int, AuthorRecord, LevelRecord, SongRecord};
use super::{DecodedPage, FetchStatus};
use crate::error::DecodeError;
use std::collections::HashMap;
use tracing::warn;

/// Diagnostic banner some server errors prepend to the payload
const BANNER: &str = "<br />";

const SONG_SEPARATOR: &str = "~:~";
const SONG_FIELD_SEPARATOR: &str = "~|~";

/// Decode one raw payload
pub fn decode(raw: &str) -> Result<DecodedPage, DecodeError> {
    let stripped;
    let payload = if raw.starts_with(BANNER) {
        stripped = raw.split(BANNER).skip(2).collect::<Vec<_>>().join(BANNER);
        stripped.trim()
    } else {
        raw
    };

    if payload.is_empty() {
        return Err(DecodeError::Blocked);
    }
    if payload == "-1" {
        return Err(DecodeError::Rejected);
    }

    let segments: Vec<&str> = payload.split('#').collect();
    if segments.len() < 4 {
        return Err(DecodeError::Malformed(format!(
            "expected 4 segments, found {}",
            segments.len()
        )));
    }

    let mut page_info = segments[3].split(':');
    let total = parse_page_number(page_info.next(), "total")?;
    let offset = parse_page_number(page_info.next(), "offset")?;
    let page_size = int(page_info.next());

    let mut page = DecodedPage {
        total,
        offset,
        page_size,
        ..DecodedPage::empty(FetchStatus::Success)
    };

    if segments[0].is_empty() {
        return Ok(page);
    }

    page.levels = segments[0]
        .split('|')
        .filter(|entry| !entry.is_empty())
        .map(|entry| LevelRecord::from_pairs(entry.split(':')))
        .collect();
    page.authors = decode_authors(segments[1]);
    page.songs = decode_songs(segments[2]);

    Ok(page)
}

/// Decode a payload, folding failures into the page status
pub fn decode_response(raw: &str) -> DecodedPage {
    match decode(raw) {
        Ok(page) => page,
        Err(DecodeError::Blocked) => {
            warn!("Game server returned an empty response (blocked)");
            DecodedPage::empty(FetchStatus::Blocked)
        }
        Err(DecodeError::Rejected) => {
            warn!("Game server rejected the request");
            DecodedPage::empty(FetchStatus::Error)
        }
        Err(e) => {
            warn!("Failed to decode listing: {}", e);
            DecodedPage::empty(FetchStatus::Error)
        }
    }
}

fn parse_page_number(value: Option<&str>, what: &str) -> Result<i64, DecodeError> {
    let value = value.unwrap_or("");
    value
        .trim()
        .parse()
        .map_err(|_| DecodeError::Malformed(format!("{} is not a number: {:?}", what, value)))
}

fn decode_authors(segment: &str) -> HashMap<i64, AuthorRecord> {
    segment
        .split('|')
        .filter(|entry| !entry.is_empty() && !entry.starts_with('~'))
        .filter_map(AuthorRecord::parse)
        .map(|author| (author.player_id, author))
        .collect()
}

fn decode_songs(segment: &str) -> HashMap<i64, SongRecord> {
    let wrapped = format!("~{}~", segment);
    wrapped
        .split(SONG_SEPARATOR)
        .map(|entry| {
            let entry = entry.strip_prefix('~').unwrap_or(entry);
            entry.strip_suffix('~').unwrap_or(entry)
        })
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let song = SongRecord::from_pairs(entry.split(SONG_FIELD_SEPARATOR));
            song.song_id().map(|id| (id, song))
        })
        .collect()
}

/// Encode a page back into the wire format
///
/// Authors and songs are written in ascending id order.
pub fn encode(page: &DecodedPage) -> String {
    let levels = page
        .levels
        .iter()
        .map(|level| join_pairs(level.present_fields(), ":"))
        .collect::<Vec<_>>()
        .join("|");

    let mut authors: Vec<&AuthorRecord> = page.authors.values().collect();
    authors.sort_by_key(|author| author.player_id);
    let authors = authors
        .iter()
        .map(|a| format!("{}:{}:{}", a.player_id, a.name, a.account_id))
        .collect::<Vec<_>>()
        .join("|");

    let mut song_ids: Vec<&i64> = page.songs.keys().collect();
    song_ids.sort();
    let songs = song_ids
        .into_iter()
        .filter_map(|id| page.songs.get(id))
        .map(|song| join_pairs(song.present_fields(), SONG_FIELD_SEPARATOR))
        .collect::<Vec<_>>()
        .join(SONG_SEPARATOR);

    format!(
        "{}#{}#{}#{}:{}:{}",
        levels, authors, songs, page.total, page.offset, page.page_size
    )
}

fn join_pairs(fields: Vec<(u32, &str)>, separator: &str) -> String {
    fields
        .into_iter()
        .flat_map(|(index, value)| [index.to_string(), value.to_string()])
        .collect::<Vec<_>>()
        .join(separator)
}
