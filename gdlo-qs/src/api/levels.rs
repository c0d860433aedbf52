//! Level search
//!
//! `id` selects all levels, an id list, an id range or a name prefix; the
//! remaining parameters filter, order and page the result.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use gdlo_common::db::levels;
use gdlo_common::models::ingame_version;
use gdlo_common::LevelSnapshot;
use serde::Serialize;
use tracing::debug;

use super::players::PlayerView;
use super::songs::SongView;
use crate::error::ApiResult;
use crate::search::{in_request_order, LevelRequest, LevelSearch, Params};
use crate::AppState;

/// Length as a tier number (`lessVerbose`) or its name
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LengthView {
    Tier(u8),
    Text(&'static str),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelView {
    pub id: i64,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    pub downloads: i64,
    pub likes: i64,
    pub cp: u8,
    pub stars: u8,
    pub coins: u8,
    pub verified_coins: bool,
    pub length: LengthView,
    pub demon_difficulty: u8,
    pub updated_in_game_version: String,
    pub version: i64,
    #[serde(rename = "copiedID")]
    pub copied_id: i64,
    pub two_player: bool,
    pub stars_requested: u8,
    pub objects: i64,
    pub author: PlayerView,
    pub song: SongView,
}

impl LevelView {
    pub fn new(level: &LevelSnapshot, less_verbose: bool) -> Self {
        Self {
            id: level.id,
            name: level.name.clone(),
            description: level.description.clone(),
            difficulty: (!less_verbose).then(|| level.difficulty_text()),
            downloads: level.downloads,
            likes: level.likes,
            cp: level.creator_points,
            stars: level.difficulty_rating,
            coins: level.reward_coin_count,
            verified_coins: level.coins_verified,
            length: if less_verbose {
                LengthView::Tier(level.length_tier)
            } else {
                LengthView::Text(level.length_text())
            },
            demon_difficulty: level.demon_tier,
            updated_in_game_version: ingame_version(level.game_version_code),
            version: level.format_version,
            copied_id: level.source_level_id,
            two_player: level.supports_two_player,
            stars_requested: level.requested_difficulty,
            objects: level.object_count,
            author: PlayerView::from(&level.author),
            song: SongView::brief(&level.song, less_verbose),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LevelPage {
    pub total: i64,
    pub count: usize,
    pub page: i64,
    pub result: Vec<LevelView>,
}

/// GET /api/level
pub async fn search_levels(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> ApiResult<Json<LevelPage>> {
    run_search(&state, &params).await.map(Json)
}

/// GET /api/level/:id (a query-string `id` takes precedence)
pub async fn search_levels_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(mut params): Query<Params>,
) -> ApiResult<Json<LevelPage>> {
    params.entry("id".to_string()).or_insert(id);
    run_search(&state, &params).await.map(Json)
}

async fn run_search(state: &AppState, params: &Params) -> ApiResult<LevelPage> {
    let request = LevelRequest::from_params(params)?;
    let found = levels::find_levels(&state.db, &request.query).await?;

    let (total, found) = match &request.search {
        LevelSearch::IdList(ids) if request.listed_order => {
            let ordered = in_request_order(ids, found, |level| level.id);
            (ordered.len() as i64, ordered)
        }
        _ => (levels::count_levels(&state.db, &request.query).await?, found),
    };
    debug!(search = ?request.search, total, returned = found.len(), "Level search");

    let result: Vec<LevelView> = found
        .iter()
        .map(|level| LevelView::new(level, request.less_verbose))
        .collect();
    Ok(LevelPage {
        total,
        count: result.len(),
        page: request.page,
        result,
    })
}
