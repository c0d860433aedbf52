//! Song lookup
//!
//! Custom songs are addressed by their positive id; official songs by the
//! negated catalog index and rendered with the index as `id`.

use axum::{
    extract::{Path, State},
    Json,
};
use gdlo_common::db::songs;
use gdlo_common::SongReference;
use serde::Serialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::search::{in_request_order, song_storage_ids};
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongView {
    pub id: i64,
    pub name: String,
    pub artist: String,
    #[serde(rename = "artistID", skip_serializing_if = "Option::is_none")]
    pub artist_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(rename = "videoID", skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(rename = "youtubeURL", skip_serializing_if = "Option::is_none")]
    pub youtube_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub song_priority: Option<i64>,
    pub custom: bool,
}

impl SongView {
    /// Every stored field, blanks omitted
    pub fn full(song: &SongReference) -> Self {
        match song {
            SongReference::Custom(song) => Self {
                id: song.id,
                name: song.name.clone(),
                artist: song.artist.clone(),
                artist_id: Some(song.artist_id),
                size: non_empty(&song.size).map(|size| format!("{}MB", size)),
                link: non_empty(&song.download_link),
                video_id: non_empty(&song.video_id),
                youtube_url: non_empty(&song.external_url),
                is_verified: Some(song.verified),
                song_priority: (song.priority != 0).then_some(song.priority),
                custom: true,
            },
            SongReference::Official(_) => Self::brief(song, false),
        }
    }

    /// Form embedded in level results
    pub fn brief(song: &SongReference, less_verbose: bool) -> Self {
        match song {
            SongReference::Custom(song) => Self {
                id: song.id,
                name: song.name.clone(),
                artist: song.artist.clone(),
                artist_id: None,
                size: Some(if less_verbose {
                    song.size.clone()
                } else {
                    format!("{}MB", song.size)
                }),
                link: Some(song.download_link.clone()),
                video_id: None,
                youtube_url: None,
                is_verified: None,
                song_priority: None,
                custom: true,
            },
            SongReference::Official(song) => Self {
                id: i64::from(song.index),
                name: song.name.clone(),
                artist: song.artist.clone(),
                artist_id: None,
                size: None,
                link: None,
                video_id: None,
                youtube_url: None,
                is_verified: None,
                song_priority: None,
                custom: false,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SongList {
    pub count: usize,
    pub result: Vec<SongView>,
}

/// GET /api/song/:id
pub async fn find_songs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SongList>> {
    let ids = song_storage_ids(&id)?;
    let found = songs::songs_by_ids(&state.db, &ids).await?;
    let ordered = in_request_order(&ids, found, SongReference::storage_id);
    debug!(requested = ids.len(), found = ordered.len(), "Song lookup");

    if ordered.is_empty() {
        return Err(ApiError::NotFound(format!("No songs match {}", id)));
    }

    let result: Vec<SongView> = ordered.iter().map(SongView::full).collect();
    Ok(Json(SongList {
        count: result.len(),
        result,
    }))
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
