//! Catalog knowledge: the local cache and the store page classifier.

pub mod fetch;
pub mod game_db;
pub mod pool;
pub mod scraper;

pub use fetch::{FetchError, FetchedPage, HttpFetcher, PageFetcher, AGE_GATE_COOKIE};
pub use game_db::{truncate_genre, AppType, GameDb, GameDbEntry};
pub use pool::{ScrapeHandle, ScrapePool, ScrapeReport, DEFAULT_WORKERS};
pub use scraper::{ScrapeResult, StoreScraper, DEFAULT_STORE_URL, MAX_REDIRECT_DEPTH};
