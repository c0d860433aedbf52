//! Creator point ledger
//!
//! Nets the per-level deltas of a batch by creator, applies them to the
//! persisted totals and reports 50-point milestones.

use crate::diff::CpDelta;
use gdlo_common::db::creators;
use gdlo_common::models::Creator;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Milestone step in creator points
pub const MILESTONE_STEP: i64 = 50;

/// One creator's total before and after a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub player_id: i64,
    pub name: String,
    pub account_id: i64,
    pub before: i64,
    pub after: i64,
}

impl Settlement {
    /// Eligible creators (nonzero account id) crossing the next step
    pub fn milestone(&self) -> Option<String> {
        if self.account_id != 0 && crossed_milestone(self.before, self.after) {
            let reached = self.after.div_euclid(MILESTONE_STEP) * MILESTONE_STEP;
            Some(format!("{} - {} CP!", self.name, reached))
        } else {
            None
        }
    }
}

/// `floor(before / 50 + 1) * 50 <= after`
pub fn crossed_milestone(before: i64, after: i64) -> bool {
    (before.div_euclid(MILESTONE_STEP) + 1) * MILESTONE_STEP <= after
}

/// Sum deltas per creator, in order of first appearance; zero nets are dropped
pub fn net_deltas(deltas: &[CpDelta]) -> Vec<(i64, i64)> {
    let mut order: Vec<i64> = Vec::new();
    let mut sums: HashMap<i64, i64> = HashMap::new();
    for d in deltas {
        let sum = sums.entry(d.player_id).or_insert_with(|| {
            order.push(d.player_id);
            0
        });
        *sum += d.delta;
    }
    order
        .into_iter()
        .filter_map(|id| sums.get(&id).filter(|&&sum| sum != 0).map(|&sum| (id, sum)))
        .collect()
}

/// Apply netted deltas to known totals
///
/// Creators missing from `known` start from a zero total with a `?` name.
pub fn settle(deltas: &[CpDelta], known: &HashMap<i64, Creator>) -> Vec<Settlement> {
    net_deltas(deltas)
        .into_iter()
        .map(|(player_id, delta)| {
            let creator = known.get(&player_id).cloned().unwrap_or_else(|| Creator {
                player_id,
                ..Creator::fallback()
            });
            Settlement {
                player_id,
                name: creator.name,
                account_id: creator.account_id,
                before: creator.cumulative_cp,
                after: creator.cumulative_cp + delta,
            }
        })
        .collect()
}

/// Milestone lines, most recently evaluated creator first
pub fn milestones(settlements: &[Settlement]) -> Vec<String> {
    settlements
        .iter()
        .rev()
        .filter_map(Settlement::milestone)
        .collect()
}

/// Storage-backed ledger
pub struct CpLedger {
    pool: SqlitePool,
}

impl CpLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply a batch of deltas and return its milestone lines
    ///
    /// Storage failures are logged; totals that could not be read are not
    /// written back.
    pub async fn apply(&self, deltas: &[CpDelta]) -> Vec<String> {
        if deltas.is_empty() {
            return Vec::new();
        }

        let ids: Vec<i64> = net_deltas(deltas).into_iter().map(|(id, _)| id).collect();
        let known: HashMap<i64, Creator> = match creators::creators_by_ids(&self.pool, &ids).await
        {
            Ok(found) => found.into_iter().map(|c| (c.player_id, c)).collect(),
            Err(e) => {
                warn!("Failed to load creator totals: {}", e);
                return Vec::new();
            }
        };

        let settlements = settle(deltas, &known);
        let totals: Vec<(i64, i64)> = settlements
            .iter()
            .filter(|s| known.contains_key(&s.player_id))
            .map(|s| (s.player_id, s.after))
            .collect();

        if let Err(e) = creators::set_cumulative_cp(&self.pool, &totals).await {
            warn!("Failed to store creator totals: {}", e);
        }
        debug!(creators = totals.len(), "Applied creator point deltas");

        milestones(&settlements)
    }
}
