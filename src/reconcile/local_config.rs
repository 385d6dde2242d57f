//! Local configuration merge: categories and favorites for catalog titles.

use std::path::Path;

use tracing::{debug, info, instrument};

use super::{read_tags, ReconcileError, Reconciler};
use crate::domain::{Game, GameId};
use crate::vdf::{text, Node, ParseOptions};

/// Top-level wrapper key of the local configuration file
pub const ROOT_KEY: &str = "UserLocalConfigStore";

/// Location of the per-title blocks below the wrapper
pub const APPS_PATH: [&str; 4] = ["Software", "Valve", "Steam", "apps"];

impl<'a> Reconciler<'a> {
    /// Load the local configuration file and merge it.
    ///
    /// Returns the number of title entries carrying a tags block.
    #[instrument(skip(self))]
    pub fn import_local_config(&mut self, path: &Path) -> Result<usize, ReconcileError> {
        info!(path = %path.display(), "Opening local config file");
        let root = text::load(path, ParseOptions::first_as_root())?;

        let count = self.integrate_local_config(&root);
        info!(count, "Local config file loaded");
        Ok(count)
    }

    /// Merge an already-parsed configuration tree (wrapper removed).
    ///
    /// For each title block with a `tags` child the first non-favorite tag
    /// becomes the category (an absent one never clears the current
    /// category) and the favorite flag is set to whether the tag is present.
    /// Unknown titles are created, named from the catalog cache.
    pub fn integrate_local_config(&mut self, root: &Node) -> usize {
        let Some(apps) = root.get_path(&APPS_PATH) else {
            debug!("No apps node in local config");
            return 0;
        };

        let mut loaded = 0;

        for (key, entry) in apps.iter() {
            let Ok(id) = key.parse::<GameId>() else {
                continue;
            };

            if self.is_ignored(id) {
                debug!(id, "Skipped processing game");
                continue;
            }

            let Some(tags) = entry.get("tags") else {
                continue;
            };

            let info = read_tags(tags);
            loaded += 1;

            if !self.library.contains(id) {
                let name = self.db.get_name(id).unwrap_or_default();
                debug!(id, name, "Added new game");
                self.library.add_game(Game::new(id, name));
            }

            let category = info
                .category
                .as_deref()
                .and_then(|name| self.library.ensure_category(name));

            if let Some(game) = self.library.game_mut(id) {
                if category.is_some() {
                    game.category = category;
                }
                game.favorite = info.favorite;
                debug!(
                    id,
                    category = game.category.as_deref().unwrap_or("~none~"),
                    favorite = game.favorite,
                    "Processed game"
                );
            }
        }

        loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::GameDb;
    use crate::domain::GameLibrary;

    fn config_with(apps: Node) -> Node {
        let mut root = Node::new();
        if let Some(node) = root.get_path_mut(&APPS_PATH, true) {
            *node = apps;
        }
        root
    }

    #[test]
    fn test_merge_creates_and_tags() {
        let root = config_with(
            Node::new()
                .with(
                    "10",
                    Node::new().with(
                        "tags",
                        Node::new()
                            .with("0", Node::leaf("Action"))
                            .with("1", Node::leaf("favorite")),
                    ),
                )
                .with("20", Node::new().with("LastPlayed", Node::leaf("123")))
                .with("not-a-number", Node::new().with("tags", Node::new())),
        );

        let mut db = GameDb::new();
        db.integrate_app_list(vec![(10, "Half-Life")]);
        let mut library = GameLibrary::new();

        let loaded = Reconciler::new(&mut library, &db).integrate_local_config(&root);
        assert_eq!(loaded, 1);

        let game = library.game(10).unwrap();
        assert_eq!(game.name, "Half-Life");
        assert_eq!(game.category.as_deref(), Some("Action"));
        assert!(game.favorite);
        assert!(library.category_exists("Action"));
        assert!(!library.contains(20));
    }

    #[test]
    fn test_missing_category_keeps_existing() {
        let root = config_with(Node::new().with(
            "10",
            Node::new().with("tags", Node::new().with("0", Node::leaf("favorite"))),
        ));

        let db = GameDb::new();
        let mut library = GameLibrary::new();
        library.add_game(Game::new(10, "Half-Life").with_category("Shooter"));

        Reconciler::new(&mut library, &db).integrate_local_config(&root);

        let game = library.game(10).unwrap();
        assert_eq!(game.category.as_deref(), Some("Shooter"));
        assert!(game.favorite);
    }

    #[test]
    fn test_favorite_cleared_when_absent() {
        let root = config_with(Node::new().with(
            "10",
            Node::new().with("tags", Node::new().with("0", Node::leaf("RPG"))),
        ));

        let db = GameDb::new();
        let mut library = GameLibrary::new();
        library.add_game(Game::new(10, "Half-Life").with_favorite(true));

        Reconciler::new(&mut library, &db).integrate_local_config(&root);
        assert!(!library.game(10).unwrap().favorite);
    }

    #[test]
    fn test_no_apps_node() {
        let db = GameDb::new();
        let mut library = GameLibrary::new();
        let loaded = Reconciler::new(&mut library, &db).integrate_local_config(&Node::new());
        assert_eq!(loaded, 0);
        assert!(library.is_empty());
    }
}
