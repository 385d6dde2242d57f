//! Local cache of catalog knowledge: names, genres and store classification.
//!
//! Simple JSON file keyed by id, filled from app listings and from store
//! page scrapes.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use crate::domain::GameId;

/// How the store classified an id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppType {
    /// Not scraped yet
    #[default]
    New,

    /// A recognized game page
    Game,

    /// Downloadable content for another title
    Dlc,

    /// The id resolved to a game page under a different id
    IdRedirect,

    /// Redirected somewhere that is not an application page
    NonApp,

    /// Redirected to the store front page
    NotFound,

    /// Stuck behind the age verification gate
    AgeGated,

    /// The store answered with its error page
    SiteError,

    /// Network or transport failure
    WebError,

    /// Fetched a page that could not be interpreted
    Unknown,
}

impl AppType {
    /// Whether a category string can accompany this classification
    pub fn carries_genre(self) -> bool {
        matches!(self, AppType::Game | AppType::Dlc | AppType::IdRedirect)
    }
}

impl std::fmt::Display for AppType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AppType::New => "new",
            AppType::Game => "game",
            AppType::Dlc => "dlc",
            AppType::IdRedirect => "id_redirect",
            AppType::NonApp => "non_app",
            AppType::NotFound => "not_found",
            AppType::AgeGated => "age_gated",
            AppType::SiteError => "site_error",
            AppType::WebError => "web_error",
            AppType::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One cached catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDbEntry {
    pub id: GameId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Comma-joined genre list from the store page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,

    #[serde(default)]
    pub app_type: AppType,

    /// When the store page was last scraped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scraped_at: Option<DateTime<Utc>>,
}

impl GameDbEntry {
    pub fn new(id: GameId, name: Option<String>) -> Self {
        Self {
            id,
            name,
            genre: None,
            app_type: AppType::New,
            scraped_at: None,
        }
    }
}

/// Catalog cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDb {
    /// Cache format version
    pub version: u32,

    games: BTreeMap<GameId, GameDbEntry>,
}

impl Default for GameDb {
    fn default() -> Self {
        Self::new()
    }
}

impl GameDb {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            version: 1,
            games: BTreeMap::new(),
        }
    }

    /// Load the cache; a missing file yields an empty cache
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read game database: {}", path.display()))?;

        let db: Self = serde_json::from_str(&content).context("Failed to parse game database JSON")?;
        info!(entries = db.len(), path = %path.display(), "Loaded game database");
        Ok(db)
    }

    /// Save the cache to disk
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write game database: {}", path.display()))?;

        info!(entries = self.len(), path = %path.display(), "Saved game database");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn contains(&self, id: GameId) -> bool {
        self.games.contains_key(&id)
    }

    pub fn get(&self, id: GameId) -> Option<&GameDbEntry> {
        self.games.get(&id)
    }

    /// Entries in id order
    pub fn entries(&self) -> impl Iterator<Item = &GameDbEntry> {
        self.games.values()
    }

    /// Insert or replace an entry
    pub fn insert(&mut self, entry: GameDbEntry) -> Option<GameDbEntry> {
        self.games.insert(entry.id, entry)
    }

    /// Whether the id is known to be downloadable content
    pub fn is_dlc(&self, id: GameId) -> bool {
        self.games
            .get(&id)
            .is_some_and(|e| e.app_type == AppType::Dlc)
    }

    pub fn get_name(&self, id: GameId) -> Option<&str> {
        self.games.get(&id).and_then(|e| e.name.as_deref())
    }

    /// Genre for an id. With `full` unset only the first genre is returned.
    pub fn get_genre(&self, id: GameId, full: bool) -> Option<&str> {
        let genre = self
            .games
            .get(&id)
            .and_then(|e| e.genre.as_deref())
            .filter(|g| !g.is_empty())?;

        if full {
            Some(genre)
        } else {
            Some(truncate_genre(genre))
        }
    }

    /// Ids the store has not classified yet
    pub fn unscraped_ids(&self) -> Vec<GameId> {
        self.games
            .values()
            .filter(|e| e.app_type == AppType::New)
            .map(|e| e.id)
            .collect()
    }

    /// Record a scrape outcome, creating the entry if needed. A genre is
    /// only kept for classifications that carry one.
    pub fn apply_scrape(&mut self, id: GameId, app_type: AppType, genre: Option<String>) {
        let entry = self
            .games
            .entry(id)
            .or_insert_with(|| GameDbEntry::new(id, None));

        entry.app_type = app_type;
        entry.genre = genre.filter(|_| app_type.carries_genre());
        entry.scraped_at = Some(Utc::now());
    }

    /// Merge an `(id, name)` listing.
    ///
    /// Unknown ids are added. A known id whose name is missing or changed
    /// takes the new name and goes back to [`AppType::New`]. Returns the
    /// number of ids added.
    pub fn integrate_app_list<I, S>(&mut self, apps: I) -> usize
    where
        I: IntoIterator<Item = (GameId, S)>,
        S: Into<String>,
    {
        let mut added = 0;

        for (id, name) in apps {
            let name = name.into();
            match self.games.get_mut(&id) {
                Some(entry) => {
                    if entry.name.as_deref() != Some(name.as_str()) {
                        entry.name = Some(name);
                        entry.app_type = AppType::New;
                    }
                }
                None => {
                    self.games.insert(id, GameDbEntry::new(id, Some(name)));
                    added += 1;
                }
            }
        }

        info!(added, "Integrated app list");
        added
    }
}

/// First element of a comma-separated genre list
pub fn truncate_genre(genre: &str) -> &str {
    match genre.find(',') {
        Some(idx) => &genre[..idx],
        None => genre,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_genre_only_kept_when_carried() {
        let mut db = GameDb::new();
        db.apply_scrape(10, AppType::Dlc, Some("Action, RPG".to_string()));
        db.apply_scrape(20, AppType::Unknown, Some("Action".to_string()));

        assert_eq!(db.get_genre(10, true), Some("Action, RPG"));
        assert_eq!(db.get_genre(20, true), None);
        assert_eq!(db.get(20).map(|e| e.app_type), Some(AppType::Unknown));

        // a later failure clears a stale genre
        db.apply_scrape(10, AppType::WebError, None);
        assert_eq!(db.get_genre(10, false), None);
    }

    #[test]
    fn test_truncate_genre() {
        assert_eq!(truncate_genre("Action, Indie"), "Action");
        assert_eq!(truncate_genre("Strategy"), "Strategy");
        assert_eq!(truncate_genre(""), "");
    }

    #[test]
    fn test_get_genre() {
        let mut db = GameDb::new();
        db.apply_scrape(10, AppType::Game, Some("Action, Indie".to_string()));
        db.apply_scrape(20, AppType::Game, Some(String::new()));

        assert_eq!(db.get_genre(10, true), Some("Action, Indie"));
        assert_eq!(db.get_genre(10, false), Some("Action"));
        assert_eq!(db.get_genre(20, true), None);
        assert_eq!(db.get_genre(30, true), None);
    }

    #[test]
    fn test_integrate_app_list() {
        let mut db = GameDb::new();
        assert_eq!(db.integrate_app_list(vec![(10, "Half-Life"), (20, "Portal")]), 2);

        db.apply_scrape(10, AppType::Game, Some("Action".to_string()));
        db.apply_scrape(20, AppType::Game, None);

        // unchanged name keeps the classification, renamed id resets it
        assert_eq!(db.integrate_app_list(vec![(10, "Half-Life"), (20, "Portal 2")]), 0);
        assert_eq!(db.get(10).unwrap().app_type, AppType::Game);
        assert_eq!(db.get(20).unwrap().app_type, AppType::New);
        assert_eq!(db.get_name(20), Some("Portal 2"));
    }

    #[test]
    fn test_is_dlc() {
        let mut db = GameDb::new();
        db.apply_scrape(5, AppType::Dlc, None);
        db.apply_scrape(6, AppType::Game, None);

        assert!(db.is_dlc(5));
        assert!(!db.is_dlc(6));
        assert!(!db.is_dlc(7));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("gamedb.json");

        let mut db = GameDb::new();
        db.integrate_app_list(vec![(10, "Half-Life")]);
        db.apply_scrape(10, AppType::Game, Some("Action".to_string()));
        db.save(&path).await.unwrap();

        let loaded = GameDb::load(&path).await.unwrap();
        assert_eq!(loaded, db);

        let missing = GameDb::load(&temp.path().join("none.json")).await.unwrap();
        assert!(missing.is_empty());
    }
}
