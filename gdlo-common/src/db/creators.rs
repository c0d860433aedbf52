//! Creator persistence
//!
//! `cumulative_cp` is written only through [`set_cumulative_cp`]; the upserts
//! leave it untouched.

use super::{NOW_SQL, WRITE_CHUNK};
use crate::models::Creator;
use crate::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

/// Insert creators, updating name and account id of existing ones
pub async fn upsert_creators(pool: &SqlitePool, creators: &[Creator]) -> Result<u64> {
    write_creators(pool, creators, " ON CONFLICT(player_id) DO UPDATE SET \
        name = excluded.name, account_id = excluded.account_id, updated_at = excluded.updated_at")
        .await
}

/// Insert creators that are not stored yet; existing rows are left as they are
pub async fn insert_missing_creators(pool: &SqlitePool, creators: &[Creator]) -> Result<u64> {
    write_creators(pool, creators, " ON CONFLICT(player_id) DO NOTHING").await
}

async fn write_creators(pool: &SqlitePool, creators: &[Creator], conflict: &str) -> Result<u64> {
    let mut affected = 0;
    for chunk in creators.chunks(WRITE_CHUNK) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO creators (player_id, name, account_id, created_at, updated_at) ",
        );
        qb.push_values(chunk, |mut b, creator| {
            b.push_bind(creator.player_id)
                .push_bind(creator.name.clone())
                .push_bind(creator.account_id)
                .push(NOW_SQL)
                .push(NOW_SQL);
        });
        qb.push(conflict);
        affected += qb.build().execute(pool).await?.rows_affected();
    }
    Ok(affected)
}

/// Overwrite creator point totals, `(player_id, total)` pairs
pub async fn set_cumulative_cp(pool: &SqlitePool, totals: &[(i64, i64)]) -> Result<()> {
    let mut tx = pool.begin().await?;
    for (player_id, total) in totals {
        sqlx::query(&format!(
            "UPDATE creators SET cumulative_cp = ?, updated_at = {NOW_SQL} WHERE player_id = ?"
        ))
        .bind(total)
        .bind(player_id)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn creator_by_id(pool: &SqlitePool, player_id: i64) -> Result<Option<Creator>> {
    let row = sqlx::query(
        "SELECT player_id, name, account_id, cumulative_cp FROM creators WHERE player_id = ?",
    )
    .bind(player_id)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(creator_from_row).transpose()
}

pub async fn creators_by_ids(pool: &SqlitePool, player_ids: &[i64]) -> Result<Vec<Creator>> {
    if player_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT player_id, name, account_id, cumulative_cp FROM creators WHERE player_id IN (",
    );
    let mut separated = qb.separated(", ");
    for id in player_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
    let rows = qb.build().fetch_all(pool).await?;
    rows.iter().map(creator_from_row).collect()
}

/// Case-insensitive exact name lookup
pub async fn creators_by_names(pool: &SqlitePool, names: &[String]) -> Result<Vec<Creator>> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT player_id, name, account_id, cumulative_cp FROM creators WHERE lower(name) IN (",
    );
    let mut separated = qb.separated(", ");
    for name in names {
        separated.push_bind(name.to_lowercase());
    }
    separated.push_unseparated(")");
    let rows = qb.build().fetch_all(pool).await?;
    rows.iter().map(creator_from_row).collect()
}

fn creator_from_row(row: &SqliteRow) -> Result<Creator> {
    Ok(Creator {
        player_id: row.try_get("player_id")?,
        name: row.try_get("name")?,
        account_id: row.try_get("account_id")?,
        cumulative_cp: row.try_get("cumulative_cp")?,
    })
}
