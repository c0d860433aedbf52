//! Storage collaborator tests against an in-memory database

use gdlo_common::db::{self, creators, levels, songs, Direction, IdFilter, LevelOrder, LevelQuery};
use gdlo_common::models::{Creator, CustomSong, LevelSnapshot, OfficialCatalog, SongReference};
use tempfile::TempDir;

fn custom_song(id: i64, name: &str) -> CustomSong {
    CustomSong {
        id,
        name: name.to_string(),
        artist_id: 77,
        artist: "Artist".to_string(),
        size: "4.20".to_string(),
        download_link: "http://audio.example/song.mp3".to_string(),
        video_id: String::new(),
        external_url: String::new(),
        verified: true,
        priority: 0,
    }
}

fn level(id: i64, name: &str, owner: i64, likes: i64) -> LevelSnapshot {
    LevelSnapshot {
        id,
        name: name.to_string(),
        description: String::new(),
        author: Creator::new(owner, format!("player{owner}"), owner * 10),
        downloads: likes * 3,
        likes,
        creator_points: 1,
        difficulty_rating: 5,
        demon_tier: 0,
        reward_coin_count: 0,
        coins_verified: false,
        length_tier: 2,
        game_version_code: 21,
        format_version: 1,
        source_level_id: 0,
        supports_two_player: false,
        requested_difficulty: 5,
        object_count: 1000,
        song: SongReference::Official(OfficialCatalog::global().resolve(0)),
    }
}

#[tokio::test]
async fn test_level_upsert_and_read_back() {
    let pool = db::connect_memory().await.unwrap();

    let mut with_custom = level(20, "Custom", 2, 5);
    with_custom.song = SongReference::Custom(custom_song(501, "Track"));
    let stored = vec![level(10, "Official", 1, 9), with_custom.clone()];

    creators::upsert_creators(&pool, &[stored[0].author.clone(), stored[1].author.clone()])
        .await
        .unwrap();
    songs::upsert_songs(&pool, &[custom_song(501, "Track")]).await.unwrap();
    levels::upsert_levels(&pool, &stored).await.unwrap();

    let read = levels::level_by_id(&pool, 20).await.unwrap().unwrap();
    assert_eq!(read, with_custom);

    let official = levels::level_by_id(&pool, 10).await.unwrap().unwrap();
    assert_eq!(official.song.storage_id(), -1);
    assert_eq!(official.song.name(), "Stereo Madness");

    assert!(levels::level_by_id(&pool, 99).await.unwrap().is_none());
}

#[tokio::test]
async fn test_upsert_is_last_write_wins() {
    let pool = db::connect_memory().await.unwrap();
    levels::upsert_levels(&pool, &[level(1, "Before", 1, 1)]).await.unwrap();

    let mut changed = level(1, "After", 1, 50);
    changed.reward_coin_count = 2;
    levels::upsert_levels(&pool, &[changed]).await.unwrap();

    let read = levels::level_by_id(&pool, 1).await.unwrap().unwrap();
    assert_eq!(read.name, "After");
    assert_eq!(read.likes, 50);
    assert_eq!(read.reward_coin_count, 2);
    assert_eq!(levels::level_ids(&pool).await.unwrap(), vec![1]);
}

#[tokio::test]
async fn test_missing_author_row_resolves_to_placeholder() {
    let pool = db::connect_memory().await.unwrap();
    levels::upsert_levels(&pool, &[level(3, "Lonely", 42, 1)]).await.unwrap();

    let read = levels::level_by_id(&pool, 3).await.unwrap().unwrap();
    assert_eq!(read.author.player_id, 42);
    assert_eq!(read.author.name, "?");
}

#[tokio::test]
async fn test_window_query_reads_from_cursor() {
    let pool = db::connect_memory().await.unwrap();
    let stored: Vec<LevelSnapshot> = [5, 1, 9, 3, 7]
        .iter()
        .map(|&id| level(id, "L", 1, id))
        .collect();
    levels::upsert_levels(&pool, &stored).await.unwrap();

    let window = levels::find_levels(&pool, &LevelQuery::window(3, 2)).await.unwrap();
    let ids: Vec<i64> = window.iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![3, 5]);

    let tail = levels::find_levels(&pool, &LevelQuery::window(8, 100)).await.unwrap();
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].id, 9);
}

#[tokio::test]
async fn test_attribute_filters_and_count() {
    let pool = db::connect_memory().await.unwrap();
    let mut a = level(1, "Alpha", 1, 10);
    a.difficulty_rating = 10;
    a.demon_tier = 3;
    let mut b = level(2, "Beta", 2, 30);
    b.reward_coin_count = 2;
    b.coins_verified = true;
    let c = level(3, "Alps", 1, 20);
    levels::upsert_levels(&pool, &[a, b, c]).await.unwrap();

    let demons = LevelQuery {
        stars: vec![10],
        ..LevelQuery::all()
    };
    assert_eq!(levels::count_levels(&pool, &demons).await.unwrap(), 1);

    let verified = LevelQuery {
        coins_verified: vec![true],
        coins: vec![1, 2, 3],
        ..LevelQuery::all()
    };
    let found = levels::find_levels(&pool, &verified).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, 2);

    let by_author = LevelQuery {
        authors: vec![1],
        ..LevelQuery::all()
    }
    .order_by(LevelOrder::Likes, Direction::Desc);
    let ids: Vec<i64> = levels::find_levels(&pool, &by_author)
        .await
        .unwrap()
        .iter()
        .map(|l| l.id)
        .collect();
    assert_eq!(ids, vec![3, 1]);

    let prefix = LevelQuery {
        ids: IdFilter::NamePrefix("Al".to_string()),
        ..LevelQuery::all()
    }
    .order_by(LevelOrder::Id, Direction::Asc)
    .limit(1)
    .offset(1);
    let found = levels::find_levels(&pool, &prefix).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, 3);
    assert_eq!(levels::count_levels(&pool, &prefix).await.unwrap(), 2);
}

#[tokio::test]
async fn test_delete_and_existing_ids() {
    let pool = db::connect_memory().await.unwrap();
    let stored: Vec<LevelSnapshot> = (1..=4).map(|id| level(id, "L", 1, id)).collect();
    levels::upsert_levels(&pool, &stored).await.unwrap();

    assert_eq!(levels::delete_levels(&pool, &[2, 4, 8]).await.unwrap(), 2);

    let mut existing = levels::existing_level_ids(&pool, &[1, 2, 3]).await.unwrap();
    existing.sort_unstable();
    assert_eq!(existing, vec![1, 3]);
    assert!(levels::existing_level_ids(&pool, &[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_most_recently_updated_id() {
    let pool = db::connect_memory().await.unwrap();
    assert_eq!(levels::most_recently_updated_id(&pool).await.unwrap(), None);

    levels::upsert_levels(&pool, &[level(4, "A", 1, 1), level(2, "B", 1, 1)])
        .await
        .unwrap();
    sqlx::query("UPDATE levels SET updated_at = '2000-01-01 00:00:00.000' WHERE id = 4")
        .execute(&pool)
        .await
        .unwrap();

    assert_eq!(levels::most_recently_updated_id(&pool).await.unwrap(), Some(2));
}

#[tokio::test]
async fn test_creator_upsert_keeps_cumulative_cp() {
    let pool = db::connect_memory().await.unwrap();
    creators::upsert_creators(&pool, &[Creator::new(7, "Old", 0)])
        .await
        .unwrap();
    creators::set_cumulative_cp(&pool, &[(7, 48)]).await.unwrap();

    creators::upsert_creators(&pool, &[Creator::new(7, "New", 1234)])
        .await
        .unwrap();
    let read = creators::creator_by_id(&pool, 7).await.unwrap().unwrap();
    assert_eq!(read.name, "New");
    assert_eq!(read.account_id, 1234);
    assert_eq!(read.cumulative_cp, 48);
}

#[tokio::test]
async fn test_insert_missing_creators_never_overwrites() {
    let pool = db::connect_memory().await.unwrap();
    creators::upsert_creators(&pool, &[Creator::new(7, "Named", 5)])
        .await
        .unwrap();
    creators::insert_missing_creators(&pool, &[Creator::new(7, "-", 0), Creator::new(8, "-", 0)])
        .await
        .unwrap();

    let read = creators::creators_by_ids(&pool, &[7, 8]).await.unwrap();
    assert_eq!(read.len(), 2);
    let seven = read.iter().find(|c| c.player_id == 7).unwrap();
    assert_eq!(seven.name, "Named");
    assert_eq!(seven.account_id, 5);
}

#[tokio::test]
async fn test_creators_by_names_is_case_insensitive() {
    let pool = db::connect_memory().await.unwrap();
    creators::upsert_creators(&pool, &[Creator::new(1, "RobTop", 71), Creator::new(2, "Viprin", 2)])
        .await
        .unwrap();

    let found = creators::creators_by_names(&pool, &["robtop".to_string()])
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].player_id, 1);
}

#[tokio::test]
async fn test_official_songs_install_once() {
    let pool = db::connect_memory().await.unwrap();
    assert!(!songs::has_official_songs(&pool).await.unwrap());

    let catalog = OfficialCatalog::global();
    songs::install_official_songs(&pool, catalog).await.unwrap();
    assert!(songs::has_official_songs(&pool).await.unwrap());

    let read = songs::songs_by_ids(&pool, &[-1, -3]).await.unwrap();
    assert_eq!(read.len(), 2);
    for song in read {
        match song {
            SongReference::Official(song) => {
                assert_eq!(&song, catalog.get(song.index).unwrap());
            }
            SongReference::Custom(_) => panic!("official id read back as custom"),
        }
    }
}

#[tokio::test]
async fn test_custom_song_upsert_round_trip() {
    let pool = db::connect_memory().await.unwrap();
    songs::upsert_songs(&pool, &[custom_song(900, "First")]).await.unwrap();
    songs::upsert_songs(&pool, &[custom_song(900, "Renamed")]).await.unwrap();

    let read = songs::custom_songs_by_ids(&pool, &[900, 901]).await.unwrap();
    assert_eq!(read, vec![custom_song(900, "Renamed")]);
}

#[tokio::test]
async fn test_delete_all_and_file_database() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("gdlo.db");
    let pool = db::init_database(&path).await.unwrap();
    assert!(path.exists());

    levels::upsert_levels(&pool, &[level(1, "A", 1, 1)]).await.unwrap();
    creators::upsert_creators(&pool, &[Creator::new(1, "A", 0)]).await.unwrap();
    db::delete_all(&pool).await.unwrap();

    assert!(levels::level_ids(&pool).await.unwrap().is_empty());
    assert!(creators::creator_by_id(&pool, 1).await.unwrap().is_none());
}

#[tokio::test]
async fn test_readonly_connect_requires_existing_file() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("missing.db");
    assert!(db::connect_readonly(&missing).await.is_err());
}
