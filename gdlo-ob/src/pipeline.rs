//! Observer pipeline: fetch, build, compare, settle creator points, persist
//!
//! [`Observer`] owns the scan state (known ids and cursor) and runs one
//! discovery pass or one update tick at a time. Storage failures are logged
//! and degrade to empty values; a failed fetch ends the current pass.

use crate::builder::{build_creator, build_custom_song, build_snapshot};
use crate::client::{LevelSource, MAX_LIST_LENGTH};
use crate::cursor::CursorScheduler;
use crate::diff::compare;
use crate::ledger::CpLedger;
use crate::protocol::DecodedPage;
use crate::report::{Category, Report};
use gdlo_common::config::{DiscoveryConfig, JitterPeriod, TomlConfig, UpdateConfig};
use gdlo_common::db::{self, creators, levels, songs, LevelQuery};
use gdlo_common::models::{Creator, CustomSong, LevelSnapshot, OfficialCatalog};
use gdlo_common::{Error, Result};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Loop settings the observer needs from the bootstrap configuration
#[derive(Debug, Clone, Default)]
pub struct ObserverSettings {
    pub discovery: DiscoveryConfig,
    pub update: UpdateConfig,
    pub initial_load: Option<PathBuf>,
}

impl ObserverSettings {
    pub fn from_config(config: &TomlConfig) -> Self {
        Self {
            discovery: config.discovery.clone(),
            update: config.update.clone(),
            initial_load: config.initial_load.clone(),
        }
    }
}

/// Levels of one fetch with the creators and songs they reference
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub levels: Vec<LevelSnapshot>,
    /// Creators listed in the author table
    pub creators: Vec<Creator>,
    /// Owners missing from the author table
    pub placeholders: Vec<Creator>,
    /// Custom songs listed in the song table
    pub songs: Vec<CustomSong>,
}

impl Batch {
    /// Build the levels of `pages` whose id passes `keep`
    pub fn from_pages<F>(pages: &[DecodedPage], catalog: &OfficialCatalog, keep: F) -> Self
    where
        F: Fn(i64) -> bool,
    {
        let mut batch = Batch::default();
        let mut creator_slots: HashMap<i64, usize> = HashMap::new();
        let mut placeholder_ids: HashSet<i64> = HashSet::new();
        let mut song_slots: HashMap<i64, usize> = HashMap::new();

        for page in pages {
            for record in page.resolve() {
                let snapshot = build_snapshot(&record.level, &record.author, &record.song, catalog);
                if !keep(snapshot.id) {
                    continue;
                }

                let creator = build_creator(&record.author);
                if record.author_listed {
                    match creator_slots.get(&creator.player_id) {
                        Some(&slot) => batch.creators[slot] = creator,
                        None => {
                            creator_slots.insert(creator.player_id, batch.creators.len());
                            batch.creators.push(creator);
                        }
                    }
                } else if placeholder_ids.insert(creator.player_id) {
                    batch.placeholders.push(creator);
                }

                if record.level.custom_song() > 0 && record.song.song_id().is_some() {
                    let song = build_custom_song(&record.song);
                    match song_slots.get(&song.id) {
                        Some(&slot) => batch.songs[slot] = song,
                        None => {
                            song_slots.insert(song.id, batch.songs.len());
                            batch.songs.push(song);
                        }
                    }
                }

                batch.levels.push(snapshot);
            }
        }

        batch
            .placeholders
            .retain(|p| !creator_slots.contains_key(&p.player_id));
        batch
    }

    pub fn level_ids(&self) -> Vec<i64> {
        self.levels.iter().map(|level| level.id).collect()
    }
}

/// Result of processing one batch
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub report: Report,
    /// Ids purged from storage
    pub dropped: Vec<i64>,
    /// Rated ids written to storage
    pub saved: Vec<i64>,
}

pub struct Observer {
    source: Arc<dyn LevelSource>,
    pool: SqlitePool,
    catalog: &'static OfficialCatalog,
    ledger: CpLedger,
    cursor: CursorScheduler,
    settings: ObserverSettings,
}

impl Observer {
    pub fn new(source: Arc<dyn LevelSource>, pool: SqlitePool, settings: ObserverSettings) -> Self {
        Self {
            source,
            ledger: CpLedger::new(pool.clone()),
            pool,
            catalog: OfficialCatalog::global(),
            cursor: CursorScheduler::new(settings.update.batch_size),
            settings,
        }
    }

    pub fn cursor(&self) -> &CursorScheduler {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut CursorScheduler {
        &mut self.cursor
    }

    pub fn settings(&self) -> &ObserverSettings {
        &self.settings
    }

    /// Delete every level, creator and song
    pub async fn reset(&mut self) -> Result<()> {
        db::delete_all(&self.pool).await?;
        self.cursor = CursorScheduler::new(self.settings.update.batch_size);
        Ok(())
    }

    /// First-run initialization and known-id loading
    ///
    /// Installs the official catalog when it is absent, then fetches the
    /// configured initial id list. An empty known-id list is filled from
    /// storage afterwards.
    pub async fn setup(&mut self) -> Report {
        let mut report = Report::new();

        let installed = songs::has_official_songs(&self.pool)
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to check official songs: {}", e);
                true
            });

        if !installed {
            info!("Initializing database contents");
            match songs::install_official_songs(&self.pool, self.catalog).await {
                Ok(count) => info!(count, "Installed official songs"),
                Err(e) => warn!("Failed to install official songs: {}", e),
            }

            if let Some(path) = self.settings.initial_load.clone() {
                info!("Loading initial levels from {}", path.display());
                match read_initial_ids(&path) {
                    Ok(ids) => {
                        self.cursor.extend(ids.iter().copied());
                        report = self.load_list(&ids).await;
                    }
                    Err(e) => warn!("Loading initial levels failed: {}", e),
                }
            }
        }

        if self.cursor.is_empty() {
            let ids = degrade("load known level ids", levels::level_ids(&self.pool).await);
            self.cursor.extend(ids);
        }

        info!(known = self.cursor.len(), "Observer setup complete");
        report
    }

    /// Fetch `ids` in list-sized chunks, saving each chunk as it arrives
    pub async fn load_list(&mut self, ids: &[i64]) -> Report {
        let mut report = Report::new();
        let chunk_size = self.list_chunk_size();
        let chunk_count = ids.len().div_ceil(chunk_size);
        info!(count = ids.len(), pages = chunk_count, "Fetching level list");

        for (i, chunk) in ids.chunks(chunk_size).enumerate() {
            if i > 0 {
                pause(self.settings.update.next_page).await;
            }
            debug!(page = i, "Fetching list page");

            let page = self.source.fetch_list(chunk).await;
            let batch = Batch::from_pages(std::slice::from_ref(&page), self.catalog, |_| true);
            if !batch.levels.is_empty() {
                let old = self.stored_levels(&batch.level_ids()).await;
                let outcome = self.process_batch(&old, batch).await;
                self.cursor.extend(outcome.saved.iter().copied());
                report.merge(outcome.report);
            }

            if !page.is_success() {
                warn!(page = i, status = ?page.status, "List fetch stopped");
                break;
            }
        }

        report
    }

    /// One discovery pass over the awarded listing
    ///
    /// Pages are fetched until one is empty or partial, holds an already
    /// known id, fails, or `max_pages` is reached.
    pub async fn discover(&mut self, max_pages: Option<u32>) -> Report {
        info!("Fetching awarded levels");
        let mut report = Report::new();
        let mut page_number: u32 = 0;

        loop {
            if page_number > 0 {
                pause(self.settings.discovery.next_page).await;
            }

            let page = self.source.fetch_awarded(page_number).await;
            let received = page.levels.len();
            let cursor = &self.cursor;
            let batch = Batch::from_pages(std::slice::from_ref(&page), self.catalog, |id| {
                !cursor.contains(id)
            });
            let fresh = batch.levels.len();
            debug!(page = page_number, received, fresh, "Awarded page");

            if received == 0 && page.is_success() {
                info!(page = page_number, "Awarded returned no levels");
            }

            if fresh > 0 {
                let old = self.stored_levels(&batch.level_ids()).await;
                let outcome = self.process_batch(&old, batch).await;
                self.cursor.extend(outcome.saved.iter().copied());
                report.merge(outcome.report);
            }

            if !page.is_success() {
                warn!(page = page_number, status = ?page.status, "Awarded fetch stopped");
                break;
            }

            page_number += 1;
            let partial = page.page_size > 0 && (received as i64) < page.page_size;
            let limit_reached = max_pages.is_some_and(|max| page_number >= max);
            if received == 0 || partial || fresh < received || limit_reached {
                break;
            }
        }

        info!(known = self.cursor.len(), "Awarded pass done");
        report
    }

    /// Place the cursor at the batch holding the most recently updated level
    pub async fn find_start(&mut self) -> Option<usize> {
        let last = degrade(
            "find most recently updated level",
            levels::most_recently_updated_id(&self.pool).await,
        );
        self.cursor.find_start(last)
    }

    /// Re-fetch one window of stored levels starting at the cursor
    pub async fn update_tick(&mut self) -> Report {
        if self.cursor.is_empty() {
            info!("No known levels, update idle");
            return Report::new();
        }

        let query = LevelQuery::window(self.cursor.cursor(), self.cursor.batch_size());
        let old = match levels::find_levels(&self.pool, &query).await {
            Ok(old) => old,
            Err(e) => {
                warn!("Failed to read levels for update: {}", e);
                return Report::new();
            }
        };

        info!(cursor = self.cursor.cursor(), count = old.len(), "Updating levels");
        if old.is_empty() {
            self.cursor.advance();
            return Report::new();
        }

        let ids: Vec<i64> = old.iter().map(|level| level.id).collect();
        let Some(pages) = self.fetch_pages(&ids).await else {
            warn!("Level update failed");
            return Report::new();
        };

        let batch = Batch::from_pages(&pages, self.catalog, |_| true);
        if batch.levels.is_empty() {
            warn!("Level update failed: no levels returned");
            return Report::new();
        }

        let outcome = self.process_batch(&old, batch).await;
        self.cursor.advance();
        self.cursor.remove(&outcome.dropped);
        outcome.report
    }

    /// Fetch all of `ids`; `None` when any page is not a success
    async fn fetch_pages(&self, ids: &[i64]) -> Option<Vec<DecodedPage>> {
        let mut pages = Vec::new();
        for (i, chunk) in ids.chunks(self.list_chunk_size()).enumerate() {
            if i > 0 {
                pause(self.settings.update.next_page).await;
            }
            let page = self.source.fetch_list(chunk).await;
            if !page.is_success() {
                warn!(page = i, status = ?page.status, "List fetch failed");
                return None;
            }
            pages.push(page);
        }
        Some(pages)
    }

    /// Compare a batch with its stored versions, settle creator points and
    /// persist the result
    pub async fn process_batch(&self, old: &[LevelSnapshot], batch: Batch) -> BatchOutcome {
        let mut report = self.check_creators_and_songs(&batch).await;

        let comparison = compare(old, &batch.levels);
        report.merge(comparison.report.clone());

        let milestones = self.ledger.apply(&comparison.cp_deltas).await;
        report.extend(Category::CreatorMilestones, milestones);

        let rated: Vec<LevelSnapshot> = batch
            .levels
            .into_iter()
            .filter(LevelSnapshot::is_rated)
            .collect();
        if let Err(e) = levels::upsert_levels(&self.pool, &rated).await {
            warn!("Failed to save levels: {}", e);
        }

        let dropped = comparison.dropped_ids();
        if let Err(e) = levels::delete_levels(&self.pool, &dropped).await {
            warn!("Failed to delete unrated levels: {}", e);
        }

        debug!(saved = rated.len(), dropped = dropped.len(), "Batch processed");
        BatchOutcome {
            report,
            dropped,
            saved: rated.iter().map(|level| level.id).collect(),
        }
    }

    /// Report creator and song changes of a batch, then store both
    pub async fn check_creators_and_songs(&self, batch: &Batch) -> Report {
        let mut report = Report::new();
        if batch.levels.is_empty() {
            return report;
        }

        let creator_ids: Vec<i64> = batch.creators.iter().map(|c| c.player_id).collect();
        let song_ids: Vec<i64> = batch.songs.iter().map(|s| s.id).collect();
        let (old_creators, old_songs) = tokio::join!(
            creators::creators_by_ids(&self.pool, &creator_ids),
            songs::custom_songs_by_ids(&self.pool, &song_ids),
        );
        let old_creators: HashMap<i64, Creator> = degrade("load creators", old_creators)
            .into_iter()
            .map(|c| (c.player_id, c))
            .collect();
        let old_songs: HashMap<i64, CustomSong> = degrade("load songs", old_songs)
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        for creator in &batch.creators {
            match old_creators.get(&creator.player_id) {
                None if creator.account_id != 0 => {
                    report.push(
                        Category::CreatorMilestones,
                        format!("{} - first CP!", creator.name),
                    );
                }
                None => {}
                Some(old) => {
                    if old.name != creator.name {
                        report.push(
                            Category::CreatorNameChanged,
                            format!("{} → {}", old.name, creator.name),
                        );
                    }
                    if old.account_id != creator.account_id {
                        report.push(
                            Category::CreatorAccountChanged,
                            format!("{}: {} → {}", creator.name, old.account_id, creator.account_id),
                        );
                    }
                }
            }
        }

        for song in &batch.songs {
            match old_songs.get(&song.id) {
                None => report.push(
                    Category::SongsFirstUsed,
                    format!("{} - {} by {}", song.id, song.name, song.artist),
                ),
                Some(old) => {
                    let changes = old
                        .tracked_fields()
                        .into_iter()
                        .zip(song.tracked_fields())
                        .filter(|((_, before), (_, after))| before != after)
                        .map(|((field, before), (_, after))| {
                            format!("{} {}: {} → {}", song.id, field, before, after)
                        });
                    report.extend(Category::SongInfoChanged, changes);
                }
            }
        }

        let (stored_creators, stored_songs, stored_placeholders) = tokio::join!(
            creators::upsert_creators(&self.pool, &batch.creators),
            songs::upsert_songs(&self.pool, &batch.songs),
            creators::insert_missing_creators(&self.pool, &batch.placeholders),
        );
        if let Err(e) = stored_creators {
            warn!("Failed to save creators: {}", e);
        }
        if let Err(e) = stored_songs {
            warn!("Failed to save songs: {}", e);
        }
        if let Err(e) = stored_placeholders {
            warn!("Failed to save placeholder creators: {}", e);
        }

        report
    }

    async fn stored_levels(&self, ids: &[i64]) -> Vec<LevelSnapshot> {
        degrade(
            "load stored levels",
            levels::find_levels(&self.pool, &LevelQuery::by_ids(ids)).await,
        )
    }

    fn list_chunk_size(&self) -> usize {
        self.settings.update.batch_size.clamp(1, MAX_LIST_LENGTH)
    }
}

/// Read a JSON array of level ids
pub fn read_initial_ids(path: &Path) -> Result<Vec<i64>> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| Error::InvalidInput(format!("{}: {}", path.display(), e)))
}

/// Storage result or its neutral value, logging the failure
fn degrade<T: Default>(what: &str, result: Result<T>) -> T {
    result.unwrap_or_else(|e| {
        warn!("Failed to {}: {}", what, e);
        T::default()
    })
}

async fn pause(period: JitterPeriod) {
    let wait = period.sample();
    if !wait.is_zero() {
        debug!("Waiting {:.1}s before the next page", wait.as_secs_f64());
        tokio::time::sleep(wait).await;
    }
}
