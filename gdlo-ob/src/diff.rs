//! Change detection between two snapshot sets of the same id space

use crate::report::{Category, Report};
use gdlo_common::models::LevelSnapshot;
use std::collections::{HashMap, HashSet};

/// Signed creator point change attributed to one creator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpDelta {
    pub player_id: i64,
    pub delta: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    /// Persisted records to purge (vanished or unrated)
    pub dropped_out: Vec<LevelSnapshot>,
    pub report: Report,
    /// Creator point changes in processing order
    pub cp_deltas: Vec<CpDelta>,
}

impl Comparison {
    pub fn dropped_ids(&self) -> Vec<i64> {
        self.dropped_out.iter().map(|level| level.id).collect()
    }

    fn credit(&mut self, player_id: i64, delta: i64) {
        if delta != 0 {
            self.cp_deltas.push(CpDelta { player_id, delta });
        }
    }
}

/// Compare persisted snapshots with freshly fetched ones
///
/// Lines within a category follow the order of `new` (first occurrence of
/// each id); vanished levels come first, in the order of `old`.
pub fn compare(old: &[LevelSnapshot], new: &[LevelSnapshot]) -> Comparison {
    let old_by_id: HashMap<i64, &LevelSnapshot> = old.iter().map(|l| (l.id, l)).collect();
    let new_by_id: HashMap<i64, &LevelSnapshot> = new.iter().map(|l| (l.id, l)).collect();

    let mut seen = HashSet::new();
    let new_order: Vec<i64> = new
        .iter()
        .map(|l| l.id)
        .filter(|id| seen.insert(*id))
        .collect();

    let mut out = Comparison::default();

    for level in old {
        if !new_by_id.contains_key(&level.id) {
            out.report.push(Category::LevelsUnrated, level.describe());
            out.credit(level.owner_player_id(), -i64::from(level.creator_points));
            out.dropped_out.push(level.clone());
        }
    }

    for id in new_order {
        let Some(&level_new) = new_by_id.get(&id) else {
            continue;
        };
        let level_old = old_by_id.get(&id).copied();

        if !level_new.is_rated() {
            if let Some(level_old) = level_old.filter(|l| l.is_rated()) {
                out.report.push(Category::LevelsUnrated, level_new.describe());
                out.credit(
                    level_old.owner_player_id(),
                    -i64::from(level_old.creator_points),
                );
                out.dropped_out.push(level_old.clone());
            }
            continue;
        }

        match level_old {
            Some(level_old) => compare_pair(level_old, level_new, &mut out),
            None => {
                out.report.push(Category::NewRatedLevels, level_new.describe());
                out.credit(
                    level_new.owner_player_id(),
                    i64::from(level_new.creator_points),
                );
            }
        }
    }

    out
}

fn compare_pair(old: &LevelSnapshot, new: &LevelSnapshot, out: &mut Comparison) {
    let desc = new.describe();

    if old.coins_verified != new.coins_verified {
        let category = if new.coins_verified {
            Category::VerifiedCoins
        } else {
            Category::UnverifiedCoins
        };
        out.report.push(category, desc.clone());
    }

    if old.reward_coin_count != new.reward_coin_count {
        let delta = i64::from(new.reward_coin_count) - i64::from(old.reward_coin_count);
        let category = match (delta > 0, new.coins_verified) {
            (true, true) => Category::AddedSilverCoins,
            (true, false) => Category::AddedBronzeCoins,
            (false, true) => Category::RemovedSilverCoins,
            (false, false) => Category::RemovedBronzeCoins,
        };
        out.report.push(category, format!("**{:+}** {}", delta, desc));
    }

    if old.difficulty_rating != new.difficulty_rating {
        out.report.push(
            Category::DifficultyChanged,
            format!("{}: {}★ → {}★", desc, old.difficulty_rating, new.difficulty_rating),
        );
    }

    if old.creator_points != new.creator_points {
        out.report.push(
            Category::RatingChanged,
            format!("{}: {} cp → {} cp", desc, old.creator_points, new.creator_points),
        );
        out.credit(
            old.owner_player_id(),
            i64::from(new.creator_points) - i64::from(old.creator_points),
        );
    }

    if old.owner_player_id() != new.owner_player_id() {
        out.report.push(
            Category::LevelsMoved,
            format!("{} → {}", old.describe(), new.author.name),
        );
        let cp = i64::from(new.creator_points);
        out.credit(old.owner_player_id(), -cp);
        out.credit(new.owner_player_id(), cp);
    }

    if old.name != new.name {
        out.report
            .push(Category::LevelNameChanged, format!("{} → {}", old.name, desc));
    }

    if old.song.storage_id() != new.song.storage_id() {
        out.report.push(
            Category::LevelSongChanged,
            format!("{}: {} → {}", desc, old.song.describe(), new.song.describe()),
        );
    }
}
