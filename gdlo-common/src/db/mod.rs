//! SQLite storage for levels, creators and songs
//!
//! Every write is an upsert keyed on the entity id with last-write-wins on a
//! fixed field list, stamping `updated_at`. Reads return fully resolved
//! model values (levels carry their author and song).

pub mod creators;
pub mod levels;
pub mod query;
pub mod songs;

pub use query::{Direction, IdFilter, LevelOrder, LevelQuery};

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// SQL expression for the current timestamp with millisecond precision
pub(crate) const NOW_SQL: &str = "strftime('%Y-%m-%d %H:%M:%f', 'now')";

/// Rows per multi-row statement, well under SQLite's bind variable limit
pub(crate) const WRITE_CHUNK: usize = 500;

/// Open (or create) the database file and make sure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    initialize_schema(&pool).await?;
    Ok(pool)
}

/// Open the database file read-only (query server)
pub async fn connect_readonly(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.exists() {
        return Err(crate::Error::NotFound(format!(
            "Database not found: {} (start gdlo-ob first to create it)",
            db_path.display()
        )));
    }
    let db_url = format!("sqlite://{}?mode=ro", db_path.display());
    Ok(SqlitePool::connect(&db_url).await?)
}

/// Single-connection in-memory database with the full schema
///
/// One connection only: every `sqlite::memory:` connection is its own
/// database.
pub async fn connect_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    initialize_schema(&pool).await?;
    Ok(pool)
}

/// Create tables and indexes (idempotent)
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS creators (
            player_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL DEFAULT '',
            account_id INTEGER NOT NULL DEFAULT 0,
            cumulative_cp INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL DEFAULT '',
            artist_id INTEGER NOT NULL DEFAULT 0,
            artist TEXT NOT NULL DEFAULT '',
            size TEXT NOT NULL DEFAULT '',
            link TEXT NOT NULL DEFAULT '',
            video_id TEXT NOT NULL DEFAULT '',
            external_url TEXT NOT NULL DEFAULT '',
            verified INTEGER NOT NULL DEFAULT 0,
            priority INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS levels (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            player_id INTEGER NOT NULL,
            downloads INTEGER NOT NULL DEFAULT 0,
            likes INTEGER NOT NULL DEFAULT 0,
            cp INTEGER NOT NULL DEFAULT 0,
            stars INTEGER NOT NULL DEFAULT 0,
            demon_tier INTEGER NOT NULL DEFAULT 0,
            coins INTEGER NOT NULL DEFAULT 0,
            verified_coins INTEGER NOT NULL DEFAULT 0,
            length INTEGER NOT NULL DEFAULT 0,
            game_version INTEGER NOT NULL DEFAULT 0,
            version INTEGER NOT NULL DEFAULT 0,
            copied_id INTEGER NOT NULL DEFAULT 0,
            two_player INTEGER NOT NULL DEFAULT 0,
            stars_requested INTEGER NOT NULL DEFAULT 0,
            objects INTEGER NOT NULL DEFAULT 0,
            song_id INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_levels_updated_at ON levels(updated_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_levels_player_id ON levels(player_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_levels_song_id ON levels(song_id)")
        .execute(pool)
        .await?;

    tracing::debug!("Database schema initialized (creators, songs, levels)");
    Ok(())
}

/// Delete every level, creator and song
pub async fn delete_all(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DELETE FROM levels").execute(pool).await?;
    sqlx::query("DELETE FROM creators").execute(pool).await?;
    sqlx::query("DELETE FROM songs").execute(pool).await?;
    info!("Deleted all levels, creators and songs");
    Ok(())
}
