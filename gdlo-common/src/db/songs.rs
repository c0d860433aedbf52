//! Song persistence (custom songs and the official catalog)

use super::{NOW_SQL, WRITE_CHUNK};
use crate::models::official::storage_id_to_index;
use crate::models::{CustomSong, OfficialCatalog, OfficialSong, SongReference};
use crate::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

const SONG_COLUMNS: &str =
    "id, name, artist_id, artist, size, link, video_id, external_url, verified, priority";

/// Insert or update custom songs
pub async fn upsert_songs(pool: &SqlitePool, songs: &[CustomSong]) -> Result<u64> {
    let mut affected = 0;
    for chunk in songs.chunks(WRITE_CHUNK) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "INSERT INTO songs ({SONG_COLUMNS}, created_at, updated_at) "
        ));
        qb.push_values(chunk, |mut b, song| {
            b.push_bind(song.id)
                .push_bind(song.name.clone())
                .push_bind(song.artist_id)
                .push_bind(song.artist.clone())
                .push_bind(song.size.clone())
                .push_bind(song.download_link.clone())
                .push_bind(song.video_id.clone())
                .push_bind(song.external_url.clone())
                .push_bind(song.verified)
                .push_bind(song.priority)
                .push(NOW_SQL)
                .push(NOW_SQL);
        });
        qb.push(
            " ON CONFLICT(id) DO UPDATE SET name = excluded.name, \
             artist_id = excluded.artist_id, artist = excluded.artist, size = excluded.size, \
             link = excluded.link, video_id = excluded.video_id, \
             external_url = excluded.external_url, verified = excluded.verified, \
             priority = excluded.priority, updated_at = excluded.updated_at",
        );
        affected += qb.build().execute(pool).await?.rows_affected();
    }
    Ok(affected)
}

/// Write the official catalog under its complement ids
pub async fn install_official_songs(pool: &SqlitePool, catalog: &OfficialCatalog) -> Result<u64> {
    let songs: Vec<&OfficialSong> = catalog.iter().collect();
    if songs.is_empty() {
        return Ok(0);
    }
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "INSERT OR REPLACE INTO songs (id, name, artist_id, artist, created_at, updated_at) ",
    );
    qb.push_values(songs, |mut b, song| {
        b.push_bind(song.storage_id())
            .push_bind(song.name.clone())
            .push_bind(song.artist_id)
            .push_bind(song.artist.clone())
            .push(NOW_SQL)
            .push(NOW_SQL);
    });
    Ok(qb.build().execute(pool).await?.rows_affected())
}

/// Whether official song `~0` is stored (first-run marker)
pub async fn has_official_songs(pool: &SqlitePool) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM songs WHERE id = -1")
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// Songs by storage id; official rows come back as [`SongReference::Official`]
pub async fn songs_by_ids(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<SongReference>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {SONG_COLUMNS} FROM songs WHERE id IN ("));
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
    let rows = qb.build().fetch_all(pool).await?;
    rows.iter().map(song_from_row).collect()
}

/// Custom songs by id
pub async fn custom_songs_by_ids(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<CustomSong>> {
    let songs = songs_by_ids(pool, ids).await?;
    Ok(songs
        .into_iter()
        .filter_map(|song| match song {
            SongReference::Custom(song) => Some(song),
            SongReference::Official(_) => None,
        })
        .collect())
}

fn song_from_row(row: &SqliteRow) -> Result<SongReference> {
    let id: i64 = row.try_get("id")?;
    let name: String = row.try_get("name")?;
    let artist_id: i64 = row.try_get("artist_id")?;
    let artist: String = row.try_get("artist")?;

    if let Some(index) = storage_id_to_index(id) {
        return Ok(SongReference::Official(OfficialSong {
            index,
            name,
            artist_id,
            artist,
        }));
    }

    Ok(SongReference::Custom(CustomSong {
        id,
        name,
        artist_id,
        artist,
        size: row.try_get("size")?,
        download_link: row.try_get("link")?,
        video_id: row.try_get("video_id")?,
        external_url: row.try_get("external_url")?,
        verified: row.try_get("verified")?,
        priority: row.try_get("priority")?,
    }))
}
