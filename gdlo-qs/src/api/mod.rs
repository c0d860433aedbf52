//! HTTP API handlers for gdlo-qs

pub mod health;
pub mod levels;
pub mod players;
pub mod songs;

pub use health::health_routes;
pub use levels::{search_levels, search_levels_by_id};
pub use players::find_players;
pub use songs::find_songs;

/// GET /
pub async fn index() -> &'static str {
    "GDLO query server"
}
