//! Domain types for the library model.
//!
//! This module contains the core data structures:
//! - Game: a single title with its category and favorite flag
//! - Category: a user-defined grouping, referenced from games by name
//! - GameLibrary: the in-memory collection the reconciler merges into

pub mod game;
pub mod library;

// Re-export commonly used types
pub use game::{Category, Game, GameId, FAVORITE_TAG};
pub use library::{GameLibrary, LibraryError};
