//! Reconciler: merges title data from every source into a [`GameLibrary`].
//!
//! Sources, each in its own submodule:
//! - `listing`: catalog listings (profile HTML page or a tree of
//!   `(appID, name)` records)
//! - `local_config`: the client's local configuration file (categories and
//!   favorites for catalog titles)
//! - `shortcuts`: the binary shortcut file (externally-added titles)
//! - `writeback`: writing the library back into both files
//!
//! Every file-based merge parses its whole input before touching the
//! library, so a malformed file leaves the library unchanged.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{FetchError, GameDb};
use crate::domain::{Game, GameId, GameLibrary, FAVORITE_TAG};
use crate::vdf::{Node, VdfError};

pub mod listing;
pub mod local_config;
pub mod profile;
pub mod shortcuts;
pub mod writeback;

pub use listing::decode_unicode_escapes;
pub use local_config::{APPS_PATH, ROOT_KEY};
pub use profile::{fetch_profile_page, ProfileSource, DEFAULT_COMMUNITY_URL};
pub use shortcuts::{load_launch_keys, shortcut_title_id, LaunchKeys};

/// Errors that can occur while reconciling
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Tree error: {0}")]
    Vdf(#[from] VdfError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Profile is not publicly readable: {0}")]
    ProfileAccess(String),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
}

/// Merge policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// Replace names of titles already in the library
    pub overwrite_names: bool,

    /// Ids never imported
    pub ignore: BTreeSet<GameId>,

    /// Skip ids the catalog cache classifies as DLC
    pub ignore_dlc: bool,

    /// A shortcut's own tags win over the matched historical title's
    pub prefer_shortcut_data: bool,

    /// On write-back, drop tags for ids missing from the library
    pub discard_missing: bool,

    /// Import and write back the shortcut file
    pub include_shortcuts: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            overwrite_names: false,
            ignore: BTreeSet::new(),
            ignore_dlc: false,
            prefer_shortcut_data: true,
            discard_missing: true,
            include_shortcuts: true,
        }
    }
}

/// Counts reported by a catalog merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeCounts {
    /// Entries merged (not ignored)
    pub processed: usize,

    /// Titles newly created
    pub new_items: usize,
}

/// Counts reported by a shortcut merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShortcutCounts {
    pub processed: usize,
    pub new_items: usize,

    /// Historical external titles no shortcut matched
    pub removed: usize,
}

/// Merges sources into a library.
///
/// Holds the library mutably for the duration of a reconciliation pass; the
/// catalog cache is consulted for names and DLC classification.
pub struct Reconciler<'a> {
    library: &'a mut GameLibrary,
    db: &'a GameDb,
    options: MergeOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(library: &'a mut GameLibrary, db: &'a GameDb) -> Self {
        Self {
            library,
            db,
            options: MergeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: MergeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    pub fn library(&self) -> &GameLibrary {
        self.library
    }

    /// Whether an id is suppressed by the ignore set or the DLC rule
    fn is_ignored(&self, id: GameId) -> bool {
        self.options.ignore.contains(&id) || (self.options.ignore_dlc && self.db.is_dlc(id))
    }
}

/// Category and favorite flag read from a tags block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TagInfo {
    pub category: Option<String>,
    pub favorite: bool,
}

/// Read a tags block: the first non-empty, non-favorite tag is the category
pub(crate) fn read_tags(tags: &Node) -> TagInfo {
    let mut info = TagInfo::default();

    for (_, tag) in tags.iter() {
        match tag.as_str() {
            Some(FAVORITE_TAG) => info.favorite = true,
            Some(name) if !name.is_empty() && info.category.is_none() => {
                info.category = Some(name.to_string());
            }
            _ => {}
        }
    }

    info
}

/// Build a tags block for a title: `"0"` is the category, the next index
/// holds the favorite tag
pub(crate) fn tags_node(game: &Game) -> Node {
    let mut tags = Node::new();
    let mut index = 0;

    if let Some(ref category) = game.category {
        tags.insert(index.to_string(), Node::leaf(category.as_str()));
        index += 1;
    }
    if game.favorite {
        tags.insert(index.to_string(), Node::leaf(FAVORITE_TAG));
    }

    tags
}
