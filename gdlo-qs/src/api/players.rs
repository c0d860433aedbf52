//! Player lookup by ids or names

use axum::{
    extract::{Path, Query, State},
    Json,
};
use gdlo_common::db::creators;
use gdlo_common::Creator;
use serde::Serialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::search::{in_request_order, Params, PlayerSearch};
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    #[serde(rename = "playerID")]
    pub player_id: i64,
    pub name: String,
    /// Omitted for players without an account
    #[serde(rename = "accountID", skip_serializing_if = "Option::is_none")]
    pub account_id: Option<i64>,
}

impl From<&Creator> for PlayerView {
    fn from(creator: &Creator) -> Self {
        Self {
            player_id: creator.player_id,
            name: creator.name.clone(),
            account_id: (creator.account_id != 0).then_some(creator.account_id),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlayerList {
    pub count: usize,
    pub result: Vec<PlayerView>,
}

/// GET /api/player/:id
pub async fn find_players(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<Params>,
) -> ApiResult<Json<PlayerList>> {
    let search = PlayerSearch::parse(&id, params.contains_key("noIDSearch"))?;

    let ordered = match &search {
        PlayerSearch::Ids(ids) => {
            let found = creators::creators_by_ids(&state.db, ids).await?;
            in_request_order(ids, found, |c| c.player_id)
        }
        PlayerSearch::Names(names) => {
            let found = creators::creators_by_names(&state.db, names).await?;
            in_request_order(names, found, |c| c.name.to_lowercase())
        }
    };
    debug!(?search, found = ordered.len(), "Player lookup");

    if ordered.is_empty() {
        return Err(ApiError::NotFound(format!("No players match {}", id)));
    }

    let result: Vec<PlayerView> = ordered.iter().map(PlayerView::from).collect();
    Ok(Json(PlayerList {
        count: result.len(),
        result,
    }))
}
