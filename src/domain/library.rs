//! In-memory collection of titles and categories.
//!
//! Titles refer to categories by name. Every category name held by a title
//! is present in the category list; removing a category clears it from the
//! titles that held it.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::{debug, warn};

use super::game::{Category, Game, GameId};

/// Errors from library mutations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LibraryError {
    #[error("Category already exists: {0}")]
    CategoryExists(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Game not found: {0}")]
    GameNotFound(GameId),

    #[error("Game {0} comes from the catalog and cannot be removed")]
    CatalogGame(GameId),
}

/// Titles keyed by id plus the category list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameLibrary {
    games: BTreeMap<GameId, Game>,
    categories: Vec<Category>,
}

impl GameLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all titles and categories
    pub fn clear(&mut self) {
        self.games.clear();
        self.categories.clear();
    }

    // ------------------------------------------------------------------
    // Titles
    // ------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn contains(&self, id: GameId) -> bool {
        self.games.contains_key(&id)
    }

    pub fn game(&self, id: GameId) -> Option<&Game> {
        self.games.get(&id)
    }

    /// Mutable access for merges, which register any category they assign
    pub(crate) fn game_mut(&mut self, id: GameId) -> Option<&mut Game> {
        self.games.get_mut(&id)
    }

    /// All titles in id order
    pub fn games(&self) -> impl Iterator<Item = &Game> {
        self.games.values()
    }

    /// Externally-added titles (negative ids)
    pub fn external_games(&self) -> impl Iterator<Item = &Game> {
        self.games.values().filter(|g| g.is_external())
    }

    /// Add a title. Returns false (and leaves the library unchanged) if the
    /// id is already present. A category named by the title is created if
    /// needed; an empty category name is cleared.
    pub fn add_game(&mut self, mut game: Game) -> bool {
        if self.games.contains_key(&game.id) {
            return false;
        }

        game.category = game
            .category
            .take()
            .and_then(|name| self.ensure_category(&name));

        self.games.insert(game.id, game);
        true
    }

    /// Set a title's name, adding the title if it does not exist yet.
    ///
    /// Existing names are only replaced when `overwrite` is set. Returns
    /// true if a new title was added.
    pub fn set_game_name(&mut self, id: GameId, name: &str, overwrite: bool) -> bool {
        match self.games.get_mut(&id) {
            Some(game) => {
                if overwrite {
                    game.name = name.to_string();
                }
                false
            }
            None => {
                self.games.insert(id, Game::new(id, name));
                true
            }
        }
    }

    /// Remove an externally-added title. Catalog titles are refused.
    pub fn remove_game(&mut self, id: GameId) -> Result<Game, LibraryError> {
        if id >= 0 {
            warn!(id, "Refusing to remove catalog game");
            return Err(LibraryError::CatalogGame(id));
        }

        let game = self
            .games
            .remove(&id)
            .ok_or(LibraryError::GameNotFound(id))?;
        debug!(id, name = %game.name, "Removed game from library");
        Ok(game)
    }

    /// Remove every external title and return them in id order
    pub fn take_external_games(&mut self) -> Vec<Game> {
        let ids: Vec<GameId> = self.external_games().map(|g| g.id).collect();
        ids.into_iter()
            .filter_map(|id| self.games.remove(&id))
            .collect()
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    /// Categories in insertion order
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category_exists(&self, name: &str) -> bool {
        self.categories.iter().any(|c| c.name == name)
    }

    /// Add a new category. Fails if the name is taken.
    pub fn add_category(&mut self, name: &str) -> Result<&Category, LibraryError> {
        if self.category_exists(name) {
            return Err(LibraryError::CategoryExists(name.to_string()));
        }

        self.categories.push(Category::new(name));
        Ok(&self.categories[self.categories.len() - 1])
    }

    /// Get a category by name, creating it if needed. Empty names yield
    /// `None`.
    pub fn ensure_category(&mut self, name: &str) -> Option<String> {
        if name.is_empty() {
            return None;
        }

        if !self.category_exists(name) {
            self.categories.push(Category::new(name));
        }
        Some(name.to_string())
    }

    /// Rename a category and every reference to it. Rejected if the new
    /// name is already in use (including by the category itself).
    pub fn rename_category(&mut self, old: &str, new: &str) -> Result<(), LibraryError> {
        if self.category_exists(new) {
            return Err(LibraryError::CategoryExists(new.to_string()));
        }

        let category = self
            .categories
            .iter_mut()
            .find(|c| c.name == old)
            .ok_or_else(|| LibraryError::CategoryNotFound(old.to_string()))?;
        category.name = new.to_string();

        for game in self.games.values_mut() {
            if game.category.as_deref() == Some(old) {
                game.category = Some(new.to_string());
            }
        }

        Ok(())
    }

    /// Remove a category, clearing it from every title that held it.
    ///
    /// Returns false if the category did not exist.
    pub fn remove_category(&mut self, name: &str) -> bool {
        let Some(pos) = self.categories.iter().position(|c| c.name == name) else {
            return false;
        };
        self.categories.remove(pos);

        for game in self.games.values_mut() {
            if game.category.as_deref() == Some(name) {
                game.category = None;
            }
        }
        true
    }

    /// Assign one category (or none) to a set of titles.
    ///
    /// All ids and the category are validated before anything changes.
    pub fn set_category(&mut self, ids: &[GameId], category: Option<&str>) -> Result<(), LibraryError> {
        if let Some(name) = category {
            if !self.category_exists(name) {
                return Err(LibraryError::CategoryNotFound(name.to_string()));
            }
        }
        self.check_ids(ids)?;

        for id in ids {
            if let Some(game) = self.games.get_mut(id) {
                game.category = category.map(str::to_string);
            }
        }
        Ok(())
    }

    /// Set the favorite flag on a set of titles.
    pub fn set_favorite(&mut self, ids: &[GameId], favorite: bool) -> Result<(), LibraryError> {
        self.check_ids(ids)?;

        for id in ids {
            if let Some(game) = self.games.get_mut(id) {
                game.favorite = favorite;
            }
        }
        Ok(())
    }

    /// Number of titles per category name
    pub fn category_counts(&self) -> HashMap<&str, usize> {
        let mut counts: HashMap<&str, usize> =
            self.categories.iter().map(|c| (c.name.as_str(), 0)).collect();

        for game in self.games.values() {
            if let Some(count) = game.category.as_deref().and_then(|n| counts.get_mut(n)) {
                *count += 1;
            }
        }
        counts
    }

    /// Remove every category no title refers to. Returns how many were
    /// removed.
    pub fn remove_empty_categories(&mut self) -> usize {
        let used: Vec<String> = self
            .category_counts()
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(name, _)| name.to_string())
            .collect();

        let before = self.categories.len();
        self.categories.retain(|c| used.contains(&c.name));
        before - self.categories.len()
    }

    fn check_ids(&self, ids: &[GameId]) -> Result<(), LibraryError> {
        match ids.iter().find(|id| !self.games.contains_key(*id)) {
            Some(&missing) => Err(LibraryError::GameNotFound(missing)),
            None => Ok(()),
        }
    }
}
