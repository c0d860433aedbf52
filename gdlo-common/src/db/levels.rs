//! Level persistence

use super::{LevelQuery, NOW_SQL, WRITE_CHUNK};
use crate::models::official::storage_id_to_index;
use crate::models::{Creator, CustomSong, LevelSnapshot, OfficialCatalog, SongReference};
use crate::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

/// Columns overwritten when an already stored level is saved again
pub const LEVEL_UPDATE_FIELDS: [&str; 18] = [
    "name",
    "description",
    "player_id",
    "downloads",
    "likes",
    "cp",
    "stars",
    "demon_tier",
    "coins",
    "verified_coins",
    "length",
    "game_version",
    "version",
    "copied_id",
    "two_player",
    "stars_requested",
    "objects",
    "song_id",
];

const LEVEL_SELECT: &str = r#"
    SELECT l.id, l.name, l.description, l.player_id, l.downloads, l.likes, l.cp,
           l.stars, l.demon_tier, l.coins, l.verified_coins, l.length,
           l.game_version, l.version, l.copied_id, l.two_player,
           l.stars_requested, l.objects, l.song_id,
           c.name AS author_name, c.account_id AS author_account_id,
           c.cumulative_cp AS author_cp,
           s.name AS song_name, s.artist_id AS song_artist_id, s.artist AS song_artist,
           s.size AS song_size, s.link AS song_link, s.video_id AS song_video_id,
           s.external_url AS song_external_url, s.verified AS song_verified,
           s.priority AS song_priority
    FROM levels l
    LEFT JOIN creators c ON c.player_id = l.player_id
    LEFT JOIN songs s ON s.id = l.song_id"#;

/// Insert or update levels (last write wins on [`LEVEL_UPDATE_FIELDS`])
pub async fn upsert_levels(pool: &SqlitePool, levels: &[LevelSnapshot]) -> Result<u64> {
    let mut affected = 0;

    for chunk in levels.chunks(WRITE_CHUNK) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO levels (id, name, description, player_id, downloads, likes, cp, \
             stars, demon_tier, coins, verified_coins, length, game_version, version, \
             copied_id, two_player, stars_requested, objects, song_id, created_at, updated_at) ",
        );
        qb.push_values(chunk, |mut b, level| {
            b.push_bind(level.id)
                .push_bind(level.name.clone())
                .push_bind(level.description.clone())
                .push_bind(level.author.player_id)
                .push_bind(level.downloads)
                .push_bind(level.likes)
                .push_bind(i64::from(level.creator_points))
                .push_bind(i64::from(level.difficulty_rating))
                .push_bind(i64::from(level.demon_tier))
                .push_bind(i64::from(level.reward_coin_count))
                .push_bind(level.coins_verified)
                .push_bind(i64::from(level.length_tier))
                .push_bind(level.game_version_code)
                .push_bind(level.format_version)
                .push_bind(level.source_level_id)
                .push_bind(level.supports_two_player)
                .push_bind(i64::from(level.requested_difficulty))
                .push_bind(level.object_count)
                .push_bind(level.song.storage_id())
                .push(NOW_SQL)
                .push(NOW_SQL);
        });
        qb.push(" ON CONFLICT(id) DO UPDATE SET ");
        for field in LEVEL_UPDATE_FIELDS {
            qb.push(format!("{field} = excluded.{field}, "));
        }
        qb.push("updated_at = excluded.updated_at");

        affected += qb.build().execute(pool).await?.rows_affected();
    }

    Ok(affected)
}

pub async fn delete_levels(pool: &SqlitePool, ids: &[i64]) -> Result<u64> {
    let mut affected = 0;
    for chunk in ids.chunks(WRITE_CHUNK) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("DELETE FROM levels WHERE id IN (");
        let mut separated = qb.separated(", ");
        for id in chunk {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        affected += qb.build().execute(pool).await?.rows_affected();
    }
    Ok(affected)
}

pub async fn level_by_id(pool: &SqlitePool, id: i64) -> Result<Option<LevelSnapshot>> {
    let row = sqlx::query(&format!("{LEVEL_SELECT} WHERE l.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(level_from_row).transpose()
}

pub async fn find_levels(pool: &SqlitePool, query: &LevelQuery) -> Result<Vec<LevelSnapshot>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(LEVEL_SELECT);
    query.push_where(&mut qb);
    query.push_order_and_page(&mut qb);

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter().map(level_from_row).collect()
}

pub async fn count_levels(pool: &SqlitePool, query: &LevelQuery) -> Result<i64> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM levels l");
    query.unpaged().push_where(&mut qb);
    let count: i64 = qb.build_query_scalar().fetch_one(pool).await?;
    Ok(count)
}

/// All stored level ids (id-only projection)
pub async fn level_ids(pool: &SqlitePool) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar("SELECT id FROM levels ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

/// Ids from `ids` that are stored (id-only projection)
pub async fn existing_level_ids(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<i64>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT id FROM levels WHERE id IN (");
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
    let found: Vec<i64> = qb.build_query_scalar().fetch_all(pool).await?;
    Ok(found)
}

/// Id of the most recently updated level, if any
pub async fn most_recently_updated_id(pool: &SqlitePool) -> Result<Option<i64>> {
    let id = sqlx::query_scalar("SELECT id FROM levels ORDER BY updated_at DESC, id DESC LIMIT 1")
        .fetch_optional(pool)
        .await?;
    Ok(id)
}

fn small(value: i64) -> u8 {
    u8::try_from(value).unwrap_or(0)
}

fn level_from_row(row: &SqliteRow) -> Result<LevelSnapshot> {
    let player_id: i64 = row.try_get("player_id")?;
    let author = Creator {
        player_id,
        name: row
            .try_get::<Option<String>, _>("author_name")?
            .unwrap_or_else(|| "?".to_string()),
        account_id: row.try_get::<Option<i64>, _>("author_account_id")?.unwrap_or(0),
        cumulative_cp: row.try_get::<Option<i64>, _>("author_cp")?.unwrap_or(0),
    };

    let song_id: i64 = row.try_get("song_id")?;
    let song = match storage_id_to_index(song_id) {
        Some(index) => SongReference::Official(OfficialCatalog::global().resolve(index)),
        None => match row.try_get::<Option<String>, _>("song_name")? {
            Some(name) => SongReference::Custom(CustomSong {
                id: song_id,
                name,
                artist_id: row.try_get::<Option<i64>, _>("song_artist_id")?.unwrap_or(0),
                artist: row.try_get::<Option<String>, _>("song_artist")?.unwrap_or_default(),
                size: row.try_get::<Option<String>, _>("song_size")?.unwrap_or_default(),
                download_link: row.try_get::<Option<String>, _>("song_link")?.unwrap_or_default(),
                video_id: row.try_get::<Option<String>, _>("song_video_id")?.unwrap_or_default(),
                external_url: row
                    .try_get::<Option<String>, _>("song_external_url")?
                    .unwrap_or_default(),
                verified: row.try_get::<Option<bool>, _>("song_verified")?.unwrap_or(false),
                priority: row.try_get::<Option<i64>, _>("song_priority")?.unwrap_or(0),
            }),
            None => SongReference::Custom(CustomSong {
                id: song_id,
                ..CustomSong::fallback()
            }),
        },
    };

    Ok(LevelSnapshot {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        author,
        downloads: row.try_get("downloads")?,
        likes: row.try_get("likes")?,
        creator_points: small(row.try_get("cp")?),
        difficulty_rating: small(row.try_get("stars")?),
        demon_tier: small(row.try_get("demon_tier")?),
        reward_coin_count: small(row.try_get("coins")?),
        coins_verified: row.try_get("verified_coins")?,
        length_tier: small(row.try_get("length")?),
        game_version_code: row.try_get("game_version")?,
        format_version: row.try_get("version")?,
        source_level_id: row.try_get("copied_id")?,
        supports_two_player: row.try_get("two_player")?,
        requested_difficulty: small(row.try_get("stars_requested")?),
        object_count: row.try_get("objects")?,
        song,
    })
}
