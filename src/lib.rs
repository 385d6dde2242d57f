//! shelfsync - Game library category reconciler
//!
//! Keeps a library of titles with their category and favorite flag in sync
//! across the client's local configuration file, its binary shortcut file
//! for externally-added titles, and the catalog service.
//!
//! # Architecture
//!
//! Everything funnels through one in-memory library:
//! - Configuration files are decoded into key-value trees
//! - The reconciler merges each source into the library in turn
//! - The library is written back into the same trees
//!
//! Unknown catalog ids are classified separately by scraping their store
//! page; results land in a local catalog cache the merges consult.
//!
//! # Modules
//!
//! - `vdf`: Key-value tree codec (text and binary encodings)
//! - `domain`: Library model (Game, Category, GameLibrary)
//! - `catalog`: Catalog cache, page fetching, store classifier, worker pool
//! - `reconcile`: Merges and write-back
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Import a library and print it
//! shelfsync import --config localconfig.vdf --shortcuts shortcuts.vdf
//!
//! # Classify catalog ids
//! shelfsync classify 10 20 440
//!
//! # Inspect a shortcut file
//! shelfsync dump shortcuts.vdf --binary
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod domain;
pub mod reconcile;
pub mod vdf;

// Re-export main types at crate root for convenience
pub use catalog::{AppType, GameDb, ScrapePool, StoreScraper};
pub use domain::{Category, Game, GameId, GameLibrary};
pub use reconcile::{MergeOptions, ReconcileError, Reconciler};
pub use vdf::{Node, VdfError};
