//! Titles and categories.

use serde::{Deserialize, Serialize};

/// Title identifier. Positive ids are issued by the catalog service; negative
/// ids are synthesized locally for externally-added titles.
pub type GameId = i32;

/// Tag value reserved for the favorite flag in tags blocks
pub const FAVORITE_TAG: &str = "favorite";

/// A single title in the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,

    /// Display name (empty when unknown)
    pub name: String,

    /// Name of the assigned category, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default)]
    pub favorite: bool,

    /// Stored launch key for external titles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    launch_key: Option<String>,
}

impl Game {
    /// Create a title with no category and no favorite flag
    pub fn new(id: GameId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            category: None,
            favorite: false,
            launch_key: None,
        }
    }

    /// Set the category name
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the favorite flag
    pub fn with_favorite(mut self, favorite: bool) -> Self {
        self.favorite = favorite;
        self
    }

    /// Set the stored launch key
    pub fn with_launch_key(mut self, key: impl Into<String>) -> Self {
        self.launch_key = Some(key.into());
        self
    }

    pub fn set_launch_key(&mut self, key: Option<String>) {
        self.launch_key = key;
    }

    /// Whether this title was added outside the catalog service
    pub fn is_external(&self) -> bool {
        self.id < 0
    }

    /// Key used to correlate the title with launch data.
    ///
    /// Catalog titles use their id; external titles use the stored key.
    pub fn launch_key(&self) -> Option<String> {
        if self.id > 0 {
            Some(self.id.to_string())
        } else {
            self.launch_key.clone()
        }
    }
}

/// A named category. Names are unique within a library.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
