//! Shortcut merge: externally-added titles from the binary shortcut file.
//!
//! Shortcut records have no stable identity, so every import rebuilds the
//! external titles: the current ones are taken out of the library as a
//! snapshot, and each shortcut record is matched back to at most one
//! snapshot entry to recover its category and favorite flag.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, instrument, warn};

use super::{read_tags, ReconcileError, Reconciler, ShortcutCounts};
use crate::domain::{Game, GameId};
use crate::vdf::{binary, text, Node, ParseOptions};

/// Top-level node of the shortcut file
pub const SHORTCUTS_KEY: &str = "shortcuts";

/// Display name of a shortcut record
pub const APPNAME_KEY: &str = "appname";

/// Node of the screenshots file mapping launch key to shortcut name
pub const SHORTCUT_NAMES_KEY: &str = "shortcutnames";

/// Shortcut name to launch key
pub type LaunchKeys = HashMap<String, String>;

/// Title id for the shortcut at `index`.
///
/// Ids are negated and offset by one so index 0 does not collide with the
/// catalog id space. Returns `None` for keys that are not indices.
pub fn shortcut_title_id(index: &str) -> Option<GameId> {
    let index: GameId = index.parse().ok()?;
    if index < 0 {
        return None;
    }
    index.checked_add(1).map(|i| -i)
}

/// Load the launch-key table from a screenshots file.
///
/// A missing file yields an empty table.
pub fn load_launch_keys(path: &Path) -> Result<LaunchKeys, ReconcileError> {
    if !path.exists() {
        warn!(path = %path.display(), "Screenshots file not found, no launch keys loaded");
        return Ok(LaunchKeys::new());
    }

    let root = text::load(path, ParseOptions::first_as_root())?;
    let keys = launch_keys_from_tree(&root);
    debug!(count = keys.len(), "Loaded shortcut launch keys");
    Ok(keys)
}

/// Build the launch-key table from a parsed screenshots tree. The first key
/// seen for a name wins.
pub fn launch_keys_from_tree(root: &Node) -> LaunchKeys {
    let mut keys = LaunchKeys::new();

    if let Some(names) = root.get(SHORTCUT_NAMES_KEY) {
        for (launch_key, name) in names.iter() {
            if let Some(name) = name.as_str() {
                keys.entry(name.to_string())
                    .or_insert_with(|| launch_key.to_string());
            }
        }
    }

    keys
}

/// Display name of a shortcut record (empty when missing)
pub(crate) fn shortcut_name(record: &Node) -> &str {
    record.get(APPNAME_KEY).and_then(Node::as_str).unwrap_or_default()
}

/// Find the candidate matching a shortcut record.
///
/// Priority: launch key, then id and name together, then name alone. The
/// launch-key rule only applies when both sides have a key.
pub(crate) fn find_match<G: Borrow<Game>>(
    candidates: &[G],
    id: GameId,
    name: &str,
    launch_key: Option<&str>,
) -> Option<usize> {
    if let Some(key) = launch_key {
        let found = candidates
            .iter()
            .position(|g| g.borrow().launch_key().as_deref() == Some(key));
        if found.is_some() {
            return found;
        }
    }

    candidates
        .iter()
        .position(|g| g.borrow().id == id && g.borrow().name == name)
        .or_else(|| candidates.iter().position(|g| g.borrow().name == name))
}

impl<'a> Reconciler<'a> {
    /// Load the shortcut file and merge it.
    ///
    /// A missing shortcut file is logged and merges nothing.
    #[instrument(skip(self, launch_keys))]
    pub fn import_shortcuts(
        &mut self,
        path: &Path,
        launch_keys: &LaunchKeys,
    ) -> Result<ShortcutCounts, ReconcileError> {
        if !path.exists() {
            warn!(path = %path.display(), "Shortcut file not found");
            return Ok(ShortcutCounts::default());
        }

        let root = binary::load(path)?;
        Ok(self.integrate_shortcuts(&root, launch_keys))
    }

    /// Merge a parsed shortcut tree.
    ///
    /// Without a `shortcuts` node nothing changes. Otherwise every current
    /// external title is replaced by one title per shortcut record; snapshot
    /// entries no record matched are reported as removed.
    pub fn integrate_shortcuts(&mut self, root: &Node, launch_keys: &LaunchKeys) -> ShortcutCounts {
        let mut counts = ShortcutCounts::default();

        let Some(shortcuts) = root.get(SHORTCUTS_KEY) else {
            warn!("Shortcut file has no shortcuts node");
            return counts;
        };

        let mut snapshot = self.library.take_external_games();

        for (key, record) in shortcuts.iter() {
            let Some(id) = shortcut_title_id(key) else {
                warn!(key, "Skipping shortcut with a non-numeric index");
                continue;
            };

            if self.library.contains(id) {
                continue;
            }

            let name = shortcut_name(record);
            let launch_key = launch_keys.get(name).cloned();

            let matched = find_match(&snapshot, id, name, launch_key.as_deref())
                .map(|idx| snapshot.remove(idx));
            if matched.is_none() {
                counts.new_items += 1;
            }

            let mut game = Game::new(id, name);
            game.set_launch_key(launch_key);

            let tags = record
                .get("tags")
                .filter(|t| t.is_interior() && !t.is_empty());

            let use_shortcut_tags = match (&tags, &matched) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(_), Some(old)) => self.options.prefer_shortcut_data || old.category.is_none(),
            };

            match (tags, matched) {
                (Some(tags), _) if use_shortcut_tags => {
                    let info = read_tags(tags);
                    game.category = info
                        .category
                        .as_deref()
                        .and_then(|name| self.library.ensure_category(name));
                    game.favorite = info.favorite;
                }
                (_, Some(old)) => {
                    game.category = old.category;
                    game.favorite = old.favorite;
                }
                _ => {}
            }

            debug!(
                id,
                name,
                category = game.category.as_deref().unwrap_or("~none~"),
                favorite = game.favorite,
                "Integrated shortcut"
            );
            self.library.add_game(game);
            counts.processed += 1;
        }

        counts.removed = snapshot.len();
        info!(
            processed = counts.processed,
            new_items = counts.new_items,
            removed = counts.removed,
            "Integrated shortcuts"
        );
        counts
    }
}
