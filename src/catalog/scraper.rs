//! Store page classifier.
//!
//! Fetches the store detail page for an id, inspects where the redirects
//! ended, and pulls the genre list and DLC marker out of the page.
//!
//! Redirect handling:
//! - store front page: [`AppType::NotFound`]
//! - age check for a *different* id: follow that id (at most
//!   [`MAX_REDIRECT_DEPTH`] hops), returning its classification as-is
//! - age check for the same id, or too deep: [`AppType::AgeGated`]
//! - anything outside `/app/`: [`AppType::NonApp`]
//! - `/app/` under a different id: parsed normally, but a recognized game
//!   is reported as [`AppType::IdRedirect`]

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, instrument, warn};

use super::fetch::PageFetcher;
use super::game_db::AppType;
use crate::domain::GameId;

/// Maximum number of age-check redirects followed for one request
pub const MAX_REDIRECT_DEPTH: u32 = 3;

/// Default detail page address; `{id}` is replaced with the app id
pub const DEFAULT_STORE_URL: &str = "https://store.steampowered.com/app/{id}/";

const SITE_ERROR_MARKER: &str = "<title>Site Error</title>";

static ALL_GAMES_REGEX: OnceLock<Regex> = OnceLock::new();
static GENRE_BLOCK_REGEX: OnceLock<Regex> = OnceLock::new();
static GENRE_LINK_REGEX: OnceLock<Regex> = OnceLock::new();
static DLC_REGEX: OnceLock<Regex> = OnceLock::new();

fn all_games_regex() -> &'static Regex {
    ALL_GAMES_REGEX.get_or_init(|| {
        Regex::new(r"(?i)<a[^>]*>All Games</a>").unwrap_or_else(|e| panic!("bad regex: {}", e))
    })
}

fn genre_block_regex() -> &'static Regex {
    GENRE_BLOCK_REGEX.get_or_init(|| {
        Regex::new(
            r#"(?i)<div class="glance_details">\s*<div>\s*Genre:\s*((?:<a[^>]*>[^<]+</a>,?\s*)+)\s*<br>\s*</div>"#,
        )
        .unwrap_or_else(|e| panic!("bad regex: {}", e))
    })
}

fn genre_link_regex() -> &'static Regex {
    GENRE_LINK_REGEX.get_or_init(|| {
        Regex::new(r"(?i)<a[^>]*>([^<]+)</a>").unwrap_or_else(|e| panic!("bad regex: {}", e))
    })
}

fn dlc_regex() -> &'static Regex {
    DLC_REGEX.get_or_init(|| {
        Regex::new(r#"(?i)<div class="name">Downloadable Content</div>"#)
            .unwrap_or_else(|e| panic!("bad regex: {}", e))
    })
}

/// Outcome of classifying one id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeResult {
    pub app_type: AppType,

    /// Comma-joined genres; only set for game, DLC and redirected pages
    pub genre: Option<String>,
}

impl ScrapeResult {
    fn of(app_type: AppType) -> Self {
        Self {
            app_type,
            genre: None,
        }
    }
}

/// What the redirect inspection decided
enum Resolution {
    Done(ScrapeResult),
    Follow(GameId),
    Parse { redirected: bool, body: String },
}

/// Classifier for store detail pages
pub struct StoreScraper<F> {
    fetcher: F,
    url_template: String,
}

impl<F: PageFetcher> StoreScraper<F> {
    /// Create a scraper using the default store address
    pub fn new(fetcher: F) -> Self {
        Self::with_url_template(fetcher, DEFAULT_STORE_URL)
    }

    /// Create a scraper with a custom detail page address (`{id}` placeholder)
    pub fn with_url_template(fetcher: F, url_template: impl Into<String>) -> Self {
        Self {
            fetcher,
            url_template: url_template.into(),
        }
    }

    /// Detail page address for an id
    pub fn store_url(&self, id: GameId) -> String {
        self.url_template.replace("{id}", &id.to_string())
    }

    /// Classify an id. Never fails: transport problems come back as
    /// [`AppType::WebError`].
    #[instrument(skip(self))]
    pub async fn scrape(&self, id: GameId) -> ScrapeResult {
        let mut target = id;
        let mut depth = 0;

        loop {
            match self.resolve(target, depth).await {
                Resolution::Done(result) => return result,
                Resolution::Follow(next) => {
                    debug!(id, from = target, to = next, depth, "Following age check redirect");
                    target = next;
                    depth += 1;
                }
                Resolution::Parse { redirected, body } => {
                    return classify_page(target, &body, redirected);
                }
            }
        }
    }

    async fn resolve(&self, id: GameId, depth: u32) -> Resolution {
        let page = match self.fetcher.fetch(&self.store_url(id)).await {
            Ok(page) => page,
            Err(e) => {
                debug!(id, error = %e, "Page read failed");
                return Resolution::Done(ScrapeResult::of(AppType::WebError));
            }
        };

        let segments = page.segments();

        match segments.first().copied() {
            None => {
                debug!(id, "Redirected to main store page");
                Resolution::Done(ScrapeResult::of(AppType::NotFound))
            }
            Some("agecheck") => {
                let target = segments.get(2).and_then(|s| s.parse::<GameId>().ok());
                match target {
                    Some(other) if other != id && depth < MAX_REDIRECT_DEPTH => {
                        debug!(id, other, "Hit age check for another id");
                        Resolution::Follow(other)
                    }
                    Some(_) => {
                        debug!(id, depth, "Age check with no redirect, or too many redirects");
                        Resolution::Done(ScrapeResult::of(AppType::AgeGated))
                    }
                    None => {
                        warn!(id, url = %page.url, "Stuck at age gate, redirect with no number");
                        Resolution::Done(ScrapeResult::of(AppType::AgeGated))
                    }
                }
            }
            Some("app") => {
                let landed = segments.get(1).and_then(|s| s.parse::<GameId>().ok());
                let redirected = landed != Some(id);
                if redirected {
                    debug!(id, landed = ?landed, "Redirected to another app id");
                }
                Resolution::Parse {
                    redirected,
                    body: page.body,
                }
            }
            Some(_) => {
                debug!(id, url = %page.url, "Redirected to a non-app URL");
                Resolution::Done(ScrapeResult::of(AppType::NonApp))
            }
        }
    }
}

/// Classify a fetched app page body
pub fn classify_page(id: GameId, page: &str, redirected: bool) -> ScrapeResult {
    if page.contains(SITE_ERROR_MARKER) {
        debug!(id, "Received site error");
        return ScrapeResult::of(AppType::SiteError);
    }

    if !all_games_regex().is_match(page) {
        debug!(id, "Could not parse info from page");
        return ScrapeResult::of(AppType::Unknown);
    }

    let genre = genre_from_page(page);

    let app_type = if dlc_regex().is_match(page) {
        AppType::Dlc
    } else if redirected {
        AppType::IdRedirect
    } else {
        AppType::Game
    };

    debug!(id, %app_type, genre = ?genre, "Parsed store page");
    ScrapeResult { app_type, genre }
}

/// Extract the comma-joined genre list from a store page
pub fn genre_from_page(page: &str) -> Option<String> {
    let block = genre_block_regex().captures(page)?.get(1)?.as_str();

    let genres: Vec<&str> = genre_link_regex()
        .captures_iter(block)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .collect();

    if genres.is_empty() {
        None
    } else {
        Some(genres.join(", "))
    }
}
