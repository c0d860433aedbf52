//! Integration tests for the gdlo-qs endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use gdlo_common::db::{self, creators, levels, songs};
use gdlo_common::models::{Creator, CustomSong, LevelSnapshot, OfficialCatalog, SongReference};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::util::ServiceExt;

fn custom_song(id: i64) -> CustomSong {
    CustomSong {
        id,
        name: "Track".to_string(),
        artist_id: 77,
        artist: "Artist".to_string(),
        size: "4.20".to_string(),
        download_link: "http://audio.example/track.mp3".to_string(),
        video_id: String::new(),
        external_url: String::new(),
        verified: true,
        priority: 0,
    }
}

fn level(id: i64, name: &str, author: &Creator, likes: i64, stars: u8) -> LevelSnapshot {
    LevelSnapshot {
        id,
        name: name.to_string(),
        description: "A level".to_string(),
        author: author.clone(),
        downloads: likes * 2,
        likes,
        creator_points: 1,
        difficulty_rating: stars,
        demon_tier: 0,
        reward_coin_count: 0,
        coins_verified: false,
        length_tier: 3,
        game_version_code: 21,
        format_version: 1,
        source_level_id: 0,
        supports_two_player: false,
        requested_difficulty: stars,
        object_count: 500,
        song: SongReference::Official(OfficialCatalog::global().resolve(1)),
    }
}

/// Router over an in-memory database with five levels
///
/// Levels 10..=14 with likes 100, 400, 300, 200, 50; level 12 is a demon,
/// level 13 uses custom song 501 and belongs to the anonymous player 3.
async fn create_test_app() -> axum::Router {
    let pool = db::connect_memory().await.unwrap();

    let robtop = Creator::new(1, "RobTop", 71);
    let viprin = Creator::new(2, "Viprin", 72);
    let anonymous = Creator::new(3, "Guest", 0);
    creators::upsert_creators(&pool, &[robtop.clone(), viprin.clone(), anonymous.clone()])
        .await
        .unwrap();
    songs::install_official_songs(&pool, OfficialCatalog::global())
        .await
        .unwrap();
    songs::upsert_songs(&pool, &[custom_song(501)]).await.unwrap();

    let mut demon = level(12, "Bloodbath", &viprin, 300, 10);
    demon.demon_tier = 5;
    let mut custom = level(13, "Blood Lust", &anonymous, 200, 4);
    custom.song = SongReference::Custom(custom_song(501));

    levels::upsert_levels(
        &pool,
        &[
            level(10, "Stereo Madness", &robtop, 100, 2),
            level(11, "Back On Track", &robtop, 400, 3),
            demon,
            custom,
            level(14, "Polargeist", &viprin, 50, 4),
        ],
    )
    .await
    .unwrap();

    gdlo_qs::build_router(gdlo_qs::AppState::new(pool))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn ids(body: &Value) -> Vec<i64> {
    body["result"]
        .as_array()
        .unwrap()
        .iter()
        .map(|level| level["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (status, body) = get(create_test_app().await, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "gdlo-qs");
}

#[tokio::test]
async fn test_all_levels_by_likes() {
    let (status, body) = get(create_test_app().await, "/api/level?count=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 5);
    assert_eq!(body["count"], 3);
    assert_eq!(body["page"], 0);
    assert_eq!(ids(&body), vec![11, 12, 13]);
}

#[tokio::test]
async fn test_paging_and_order() {
    let (_, body) = get(
        create_test_app().await,
        "/api/level?count=2&page=1&order=id&orderDirection=asc",
    )
    .await;
    assert_eq!(body["total"], 5);
    assert_eq!(body["page"], 1);
    assert_eq!(ids(&body), vec![12, 13]);

    let (status, body) = get(
        create_test_app().await,
        "/api/level?page=9223372036854775807&count=10",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_id_list_keeps_request_order() {
    let (status, body) = get(create_test_app().await, "/api/level/14,10,99,14?page=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![14, 10]);
    assert_eq!(body["total"], 2);
    assert_eq!(body["page"], 0);
}

#[tokio::test]
async fn test_id_range() {
    let (_, body) = get(create_test_app().await, "/api/level/11-13").await;
    assert_eq!(ids(&body), vec![13, 12, 11]);

    let (_, body) = get(create_test_app().await, "/api/level/13..").await;
    assert_eq!(ids(&body), vec![14, 13]);

    let (status, body) = get(create_test_app().await, "/api/level/13-11").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_name_prefix_search() {
    let (_, body) = get(create_test_app().await, "/api/level/Blood").await;
    assert_eq!(ids(&body), vec![12, 13]);

    let (status, _) = get(create_test_app().await, "/api/level/Blood%21").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_filters() {
    let (_, body) = get(create_test_app().await, "/api/level?difficulty=hard").await;
    assert_eq!(ids(&body), vec![13, 14]);

    let (_, body) = get(create_test_app().await, "/api/level?difficulty=demon&demonDifficulty=extreme").await;
    assert_eq!(ids(&body), vec![12]);

    let (_, body) = get(create_test_app().await, "/api/level?author=1").await;
    assert_eq!(ids(&body), vec![11, 10]);

    let (_, body) = get(create_test_app().await, "/api/level?song=1&officialSong").await;
    assert_eq!(body["total"], 4);

    let (_, body) = get(create_test_app().await, "/api/level?song=501").await;
    assert_eq!(ids(&body), vec![13]);
}

#[tokio::test]
async fn test_level_rendering() {
    let (_, body) = get(create_test_app().await, "/api/level/13").await;
    let level = &body["result"][0];
    assert_eq!(level["difficulty"], "Hard");
    assert_eq!(level["length"], "Long");
    assert_eq!(level["updatedInGameVersion"], "2.1");
    assert_eq!(level["author"]["playerID"], 3);
    assert!(level["author"].get("accountID").is_none());
    assert_eq!(level["song"]["id"], 501);
    assert_eq!(level["song"]["size"], "4.20MB");
    assert_eq!(level["song"]["custom"], true);

    let (_, body) = get(create_test_app().await, "/api/level/11?lessVerbose").await;
    let level = &body["result"][0];
    assert!(level.get("difficulty").is_none());
    assert_eq!(level["length"], 3);
    assert_eq!(level["author"]["accountID"], 71);
    assert_eq!(level["song"]["id"], 1);
    assert_eq!(level["song"]["name"], "Back On Track");
    assert_eq!(level["song"]["custom"], false);
}

#[tokio::test]
async fn test_players_by_id_and_name() {
    let (status, body) = get(create_test_app().await, "/api/player/2,1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["result"][0]["name"], "Viprin");
    assert_eq!(body["result"][1]["playerID"], 1);

    let (_, body) = get(create_test_app().await, "/api/player/robtop,GUEST").await;
    assert_eq!(body["result"][0]["playerID"], 1);
    assert_eq!(body["result"][1]["playerID"], 3);
    assert!(body["result"][1].get("accountID").is_none());

    let (status, _) = get(create_test_app().await, "/api/player/404404").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(create_test_app().await, "/api/player/x").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_songs_custom_and_official() {
    let (status, body) = get(create_test_app().await, "/api/song/-1,501").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let official = &body["result"][0];
    assert_eq!(official["id"], 1);
    assert_eq!(official["name"], "Back On Track");
    assert_eq!(official["custom"], false);

    let custom = &body["result"][1];
    assert_eq!(custom["id"], 501);
    assert_eq!(custom["artistID"], 77);
    assert_eq!(custom["size"], "4.20MB");
    assert_eq!(custom["isVerified"], true);
    assert!(custom.get("videoID").is_none());

    let (status, _) = get(create_test_app().await, "/api/song/777").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(create_test_app().await, "/api/song/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}
