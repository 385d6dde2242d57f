//! Library Model Integration Tests
//!
//! Category uniqueness, reference clearing, and bulk assignment.

use shelfsync::domain::{Game, GameLibrary, LibraryError};

fn sample() -> GameLibrary {
    let mut library = GameLibrary::new();
    library.add_category("RPG").unwrap();
    library.add_category("Indie").unwrap();
    library.add_game(Game::new(10, "Baldur's Gate").with_category("RPG"));
    library.add_game(Game::new(20, "Planescape: Torment").with_category("RPG"));
    library.add_game(Game::new(30, "Unsorted"));
    library
}

#[test]
fn test_purge_empty_categories() {
    let mut library = sample();

    assert_eq!(library.remove_empty_categories(), 1);
    assert!(library.category_exists("RPG"));
    assert!(!library.category_exists("Indie"));

    // nothing left to purge
    assert_eq!(library.remove_empty_categories(), 0);
}

#[test]
fn test_category_names_stay_unique() {
    let mut library = sample();

    assert!(matches!(
        library.add_category("RPG"),
        Err(LibraryError::CategoryExists(_))
    ));
    assert!(matches!(
        library.rename_category("Indie", "RPG"),
        Err(LibraryError::CategoryExists(_))
    ));
    assert!(matches!(
        library.rename_category("Missing", "Other"),
        Err(LibraryError::CategoryNotFound(_))
    ));

    library.rename_category("RPG", "Role-Playing").unwrap();
    assert_eq!(
        library.game(10).unwrap().category.as_deref(),
        Some("Role-Playing")
    );

    let mut names: Vec<&str> = library.categories().iter().map(|c| c.name.as_str()).collect();
    let total = names.len();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), total);
}

#[test]
fn test_remove_category_keeps_games() {
    let mut library = sample();

    assert!(library.remove_category("RPG"));
    assert_eq!(library.len(), 3);
    assert!(library.games().all(|g| g.category.is_none()));
    assert!(!library.remove_category("RPG"));
}

#[test]
fn test_bulk_assignment_is_all_or_nothing() {
    let mut library = sample();

    // one unknown id: nothing changes
    let err = library.set_category(&[10, 30, 99], Some("Indie")).unwrap_err();
    assert!(matches!(err, LibraryError::GameNotFound(99)));
    assert_eq!(library.game(10).unwrap().category.as_deref(), Some("RPG"));
    assert!(library.game(30).unwrap().category.is_none());

    library.set_category(&[10, 30], Some("Indie")).unwrap();
    assert_eq!(library.game(30).unwrap().category.as_deref(), Some("Indie"));

    library.set_favorite(&[20, 30], true).unwrap();
    assert!(library.game(20).unwrap().favorite);
    assert!(!library.game(10).unwrap().favorite);

    library.set_category(&[10], None).unwrap();
    assert!(library.game(10).unwrap().category.is_none());
}

#[test]
fn test_only_external_games_can_be_removed() {
    let mut library = sample();
    library.add_game(Game::new(-1, "Emulator"));

    assert!(matches!(
        library.remove_game(10),
        Err(LibraryError::CatalogGame(10))
    ));
    assert!(library.contains(10));

    let removed = library.remove_game(-1).unwrap();
    assert_eq!(removed.name, "Emulator");
    assert!(matches!(
        library.remove_game(-1),
        Err(LibraryError::GameNotFound(-1))
    ));
}

#[test]
fn test_added_games_only_reference_listed_categories() {
    let mut library = GameLibrary::new();
    library.add_game(Game::new(10, "Half-Life").with_category("Shooter"));
    library.add_game(Game::new(20, "Portal").with_category(""));

    assert!(library.category_exists("Shooter"));
    assert!(library.game(20).unwrap().category.is_none());
    assert!(!library.category_exists(""));

    for game in library.games() {
        if let Some(ref name) = game.category {
            assert!(library.category_exists(name));
        }
    }

    // assignment is validated against the list
    assert!(matches!(
        library.set_category(&[20], Some("Puzzle")),
        Err(LibraryError::CategoryNotFound(_))
    ));
}
