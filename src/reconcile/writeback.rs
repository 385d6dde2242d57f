//! Write-back of categories and favorites into the client's files.

use std::path::Path;

use tracing::{debug, info, instrument, warn};

use super::local_config::{APPS_PATH, ROOT_KEY};
use super::shortcuts::{find_match, shortcut_name, shortcut_title_id, LaunchKeys, SHORTCUTS_KEY};
use super::{tags_node, ReconcileError, Reconciler};
use crate::domain::{Game, GameId};
use crate::vdf::{binary, text, Node, ParseOptions};

impl<'a> Reconciler<'a> {
    /// Write the library into the local configuration file.
    ///
    /// The existing file is re-read so unrelated settings survive. Only a
    /// missing file starts from an empty tree; a file that cannot be read or
    /// parsed is an error and is left untouched.
    #[instrument(skip(self))]
    pub fn save_local_config(&self, path: &Path) -> Result<(), ReconcileError> {
        info!(path = %path.display(), "Saving local config file");

        let mut root = if path.exists() {
            text::load(path, ParseOptions::first_as_root())?
        } else {
            warn!(path = %path.display(), "Local config file not found, starting empty");
            Node::new()
        };

        self.apply_to_local_config(&mut root);

        let document = Node::new().with(ROOT_KEY, root);
        text::save(&document, path)?;
        info!("Local config file written");
        Ok(())
    }

    /// Update a parsed configuration tree (wrapper removed) in place.
    ///
    /// With `discard_missing` set, tags of ids not in the library are
    /// dropped. Every catalog title then gets a fresh tags block and empty
    /// containers are pruned.
    pub fn apply_to_local_config(&self, root: &mut Node) {
        let Some(apps) = root.get_path_mut(&APPS_PATH, true) else {
            return;
        };

        if self.options.discard_missing {
            let stale: Vec<String> = apps
                .iter()
                .filter(|(key, _)| {
                    !key.parse::<GameId>()
                        .is_ok_and(|id| self.library.contains(id))
                })
                .map(|(key, _)| key.to_string())
                .collect();

            for key in stale {
                if apps.remove_pruned(&[key.as_str(), "tags"]) {
                    debug!(key = %key, "Removed game category from local config");
                }
            }
        }

        for game in self.library.games().filter(|g| g.id > 0) {
            let entry = apps.entry(&game.id.to_string());
            let tags = tags_node(game);
            if tags.is_empty() {
                entry.remove("tags");
            } else {
                entry.insert("tags", tags);
            }
        }

        let pruned = apps.clean_tree();
        debug!(pruned, "Cleaned up local config tree");
    }

    /// Write external titles' tags into the shortcut file.
    ///
    /// Only existing shortcut records are edited; titles no record matches
    /// are not written. A missing file is skipped. Returns the number of
    /// records updated.
    #[instrument(skip(self, launch_keys))]
    pub fn save_shortcuts(&self, path: &Path, launch_keys: &LaunchKeys) -> Result<usize, ReconcileError> {
        if !path.exists() {
            warn!(path = %path.display(), "Shortcut file not found, skipping");
            return Ok(0);
        }

        let mut root = binary::load(path)?;
        let written = self.apply_to_shortcuts(&mut root, launch_keys);

        binary::save(&root, path)?;
        info!(written, path = %path.display(), "Shortcut file written");
        Ok(written)
    }

    /// Update a parsed shortcut tree in place. Each matched record's tags
    /// block is replaced (left empty when the title has no tags).
    pub fn apply_to_shortcuts(&self, root: &mut Node, launch_keys: &LaunchKeys) -> usize {
        let mut candidates: Vec<&Game> = self.library.external_games().collect();

        let Some(records) = root.get_mut(SHORTCUTS_KEY).and_then(Node::children_mut) else {
            warn!("Shortcut file has no shortcuts node");
            return 0;
        };

        let mut written = 0;

        for (key, record) in records.iter_mut() {
            let Some(id) = shortcut_title_id(key) else {
                continue;
            };

            let name = shortcut_name(record);
            let launch_key = launch_keys.get(name).map(String::as_str);

            let Some(idx) = find_match(&candidates, id, name, launch_key) else {
                continue;
            };
            let game = candidates.remove(idx);

            debug!(id = game.id, name = %game.name, "Writing shortcut tags");
            record.insert("tags", tags_node(game));
            written += 1;
        }

        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::GameDb;
    use crate::domain::GameLibrary;
    use crate::reconcile::MergeOptions;

    #[test]
    fn test_apply_to_local_config() {
        let mut root = Node::new();
        if let Some(apps) = root.get_path_mut(&APPS_PATH, true) {
            apps.insert(
                "10",
                Node::new()
                    .with("LastPlayed", Node::leaf("1"))
                    .with("tags", Node::new().with("0", Node::leaf("Old"))),
            );
            apps.insert(
                "99",
                Node::new().with("tags", Node::new().with("0", Node::leaf("Gone"))),
            );
        }

        let db = GameDb::new();
        let mut library = GameLibrary::new();
        library.add_game(Game::new(10, "Half-Life").with_category("Action"));
        library.add_game(Game::new(20, "Portal").with_favorite(true));
        library.add_game(Game::new(30, "Untagged"));
        library.add_game(Game::new(-1, "External").with_category("Emulated"));

        let reconciler = Reconciler::new(&mut library, &db);
        reconciler.apply_to_local_config(&mut root);

        let apps = root.get_path(&APPS_PATH).unwrap();
        // key order of the existing block is preserved
        assert_eq!(apps.children()[0].0, "10");
        assert_eq!(
            apps.get_path(&["10", "tags", "0"]).and_then(Node::as_str),
            Some("Action")
        );
        assert_eq!(apps.get_path(&["10", "LastPlayed"]).and_then(Node::as_str), Some("1"));
        assert_eq!(
            apps.get_path(&["20", "tags", "0"]).and_then(Node::as_str),
            Some("favorite")
        );
        assert!(!apps.contains_key("30"));
        assert!(!apps.contains_key("99"));
        assert!(!apps.contains_key("-1"));
    }

    #[test]
    fn test_keep_missing_when_not_discarding() {
        let mut root = Node::new();
        if let Some(apps) = root.get_path_mut(&APPS_PATH, true) {
            apps.insert(
                "99",
                Node::new().with("tags", Node::new().with("0", Node::leaf("Kept"))),
            );
        }

        let db = GameDb::new();
        let mut library = GameLibrary::new();
        let options = MergeOptions {
            discard_missing: false,
            ..MergeOptions::default()
        };
        Reconciler::new(&mut library, &db)
            .with_options(options)
            .apply_to_local_config(&mut root);

        assert_eq!(
            root.get_path(&["Software", "Valve", "Steam", "apps", "99", "tags", "0"])
                .and_then(Node::as_str),
            Some("Kept")
        );
    }

    #[test]
    fn test_apply_to_shortcuts() {
        let mut root = Node::new().with(
            SHORTCUTS_KEY,
            Node::new()
                .with(
                    "0",
                    Node::new()
                        .with("appname", Node::leaf("Emulator"))
                        .with("tags", Node::new().with("0", Node::leaf("Stale"))),
                )
                .with("1", Node::new().with("appname", Node::leaf("Editor")))
                .with("2", Node::new().with("appname", Node::leaf("Unknown"))),
        );

        let db = GameDb::new();
        let mut library = GameLibrary::new();
        library.add_game(Game::new(-1, "Emulator"));
        library.add_game(Game::new(-2, "Editor").with_category("Tools").with_favorite(true));
        library.add_game(Game::new(-9, "Not In File").with_category("Lost"));

        let written = Reconciler::new(&mut library, &db).apply_to_shortcuts(&mut root, &LaunchKeys::new());
        assert_eq!(written, 2);

        let records = root.get(SHORTCUTS_KEY).unwrap();
        let cleared = records.get_path(&["0", "tags"]).unwrap();
        assert!(cleared.is_interior() && cleared.is_empty());
        assert_eq!(records.get_path(&["1", "tags", "0"]).and_then(Node::as_str), Some("Tools"));
        assert_eq!(records.get_path(&["1", "tags", "1"]).and_then(Node::as_str), Some("favorite"));
        assert!(records.get_path(&["2", "tags"]).is_none());
    }
}
