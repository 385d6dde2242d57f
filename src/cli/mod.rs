//! Command-line interface for shelfsync.
//!
//! Provides commands for inspecting configuration trees, classifying
//! catalog ids against the store, and importing (and optionally writing
//! back) a library from the client's files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use crate::catalog::{GameDb, HttpFetcher, ScrapePool, StoreScraper};
use crate::config::{self, ResolvedConfig};
use crate::domain::{GameId, GameLibrary};
use crate::reconcile::{fetch_profile_page, load_launch_keys, LaunchKeys, ProfileSource, Reconciler};
use crate::vdf::{binary, text, ParseOptions};

/// shelfsync - Reconcile game library categories across client files
#[derive(Parser, Debug)]
#[command(name = "shelfsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a tree file and print it in text form
    Dump {
        /// File to read
        file: PathBuf,

        /// Read the binary encoding (shortcut files)
        #[arg(short, long)]
        binary: bool,

        /// Unwrap the single top-level block
        #[arg(long)]
        first_as_root: bool,
    },

    /// Classify ids against the store and update the catalog cache
    Classify {
        /// Ids to classify (catalog ids are positive)
        #[arg(value_parser = clap::value_parser!(GameId).range(1..))]
        ids: Vec<GameId>,

        /// Also classify every cached id not classified yet
        #[arg(long)]
        all_new: bool,
    },

    /// Build a library from the client's files and print it
    Import {
        /// Local configuration file (localconfig.vdf)
        #[arg(short, long)]
        config: PathBuf,

        /// Binary shortcut file (shortcuts.vdf)
        #[arg(short, long)]
        shortcuts: Option<PathBuf>,

        /// Screenshots file holding shortcut launch keys
        #[arg(long)]
        screenshots: Option<PathBuf>,

        /// Profile name or 64-bit account id to fetch the game list for
        #[arg(short, long)]
        profile: Option<String>,

        /// Write categories back into the config and shortcut files
        #[arg(long)]
        write_back: bool,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Dump {
                file,
                binary,
                first_as_root,
            } => dump_tree(&file, binary, first_as_root),
            Commands::Classify { ids, all_new } => classify(ids, all_new).await,
            Commands::Import {
                config,
                shortcuts,
                screenshots,
                profile,
                write_back,
            } => {
                import_library(
                    &config,
                    shortcuts.as_deref(),
                    screenshots.as_deref(),
                    profile.as_deref(),
                    write_back,
                )
                .await
            }
            Commands::Config => show_config(),
        }
    }
}

/// Parse a tree file and print it
fn dump_tree(file: &Path, is_binary: bool, first_as_root: bool) -> Result<()> {
    let loaded = if is_binary {
        binary::load(file)
    } else {
        text::load(file, ParseOptions { first_as_root })
    };
    let root = loaded.with_context(|| format!("Failed to read tree file: {}", file.display()))?;

    // Written as bytes: binary files may hold leaves that are not UTF-8
    text::write(&root, &mut std::io::stdout().lock())?;
    Ok(())
}

/// Run the classifier pool over the requested ids
async fn classify(mut ids: Vec<GameId>, all_new: bool) -> Result<()> {
    let cfg = config::config()?;
    let db_path = cfg.gamedb_path();
    let db = GameDb::load(&db_path).await?;

    if all_new {
        ids.extend(db.unscraped_ids());
    }
    ids.sort_unstable();
    ids.dedup();

    if ids.is_empty() {
        println!("Nothing to classify");
        return Ok(());
    }

    let fetcher = HttpFetcher::with_age_gate_cookie().context("Failed to build HTTP client")?;
    let scraper = StoreScraper::with_url_template(fetcher, cfg.store_url.as_str());
    let pool = ScrapePool::new(scraper, cfg.scrape.workers);

    let handle = pool.handle();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel().await;
        }
    });

    let (db, report) = pool.run(db, ids.iter().copied()).await;
    ctrl_c.abort();

    db.save(&db_path).await?;

    println!("{:<10} {:<12} {}", "ID", "TYPE", "GENRE");
    println!("{}", "-".repeat(50));
    for id in &ids {
        if let Some(entry) = db.get(*id).filter(|e| e.scraped_at.is_some()) {
            println!(
                "{:<10} {:<12} {}",
                id,
                entry.app_type.to_string(),
                entry.genre.as_deref().unwrap_or("-")
            );
        }
    }

    eprintln!(
        "\n[{} of {} classified{}]",
        report.applied,
        report.requested,
        if report.cancelled { ", cancelled" } else { "" }
    );
    Ok(())
}

/// Run every merge and print the resulting library
async fn import_library(
    config_path: &Path,
    shortcuts: Option<&Path>,
    screenshots: Option<&Path>,
    profile: Option<&str>,
    write_back: bool,
) -> Result<()> {
    let cfg = config::config()?;
    let db = GameDb::load(&cfg.gamedb_path()).await?;
    let mut library = GameLibrary::new();

    let page = match profile {
        Some(input) => Some(fetch_profile(cfg, input).await?),
        None => None,
    };

    let launch_keys = match screenshots {
        Some(path) => load_launch_keys(path)?,
        None => LaunchKeys::new(),
    };

    let include_shortcuts = cfg.merge.include_shortcuts;
    if shortcuts.is_some() && !include_shortcuts {
        warn!("Shortcuts are disabled in the merge settings, ignoring shortcut file");
    }
    let shortcuts = shortcuts.filter(|_| include_shortcuts);

    {
        let mut reconciler = Reconciler::new(&mut library, &db).with_options(cfg.merge.clone());

        if let Some(ref page) = page {
            let counts = reconciler.integrate_html_listing(page);
            eprintln!(
                "Profile: {} games, {} new",
                counts.processed, counts.new_items
            );
        }

        let loaded = reconciler
            .import_local_config(config_path)
            .with_context(|| format!("Failed to import config file: {}", config_path.display()))?;
        eprintln!("Config: {} tagged games", loaded);

        if let Some(path) = shortcuts {
            let counts = reconciler
                .import_shortcuts(path, &launch_keys)
                .with_context(|| format!("Failed to import shortcut file: {}", path.display()))?;
            eprintln!(
                "Shortcuts: {} games, {} new, {} removed",
                counts.processed, counts.new_items, counts.removed
            );
        }

        if write_back {
            reconciler.save_local_config(config_path)?;
            if let Some(path) = shortcuts {
                let written = reconciler.save_shortcuts(path, &launch_keys)?;
                eprintln!("Shortcuts: {} records written", written);
            }
            eprintln!("Wrote categories back to {}", config_path.display());
        }
    }

    print_library(&library);
    Ok(())
}

async fn fetch_profile(cfg: &ResolvedConfig, input: &str) -> Result<String> {
    let source = ProfileSource::from_input(input);
    let fetcher = HttpFetcher::new().context("Failed to build HTTP client")?;
    let url = source.html_url(&cfg.community_url);

    fetch_profile_page(&fetcher, &url)
        .await
        .with_context(|| format!("Failed to fetch game list for {}", source))
}

fn print_library(library: &GameLibrary) {
    if library.is_empty() {
        println!("No games found");
        return;
    }

    println!("{:<12} {:<40} {:<20} {}", "ID", "NAME", "CATEGORY", "FAV");
    println!("{}", "-".repeat(80));
    for game in library.games() {
        println!(
            "{:<12} {:<40} {:<20} {}",
            game.id,
            truncate(&game.name, 40),
            game.category.as_deref().unwrap_or("-"),
            if game.favorite { "*" } else { "" }
        );
    }

    println!();
    println!("Categories:");
    let counts = library.category_counts();
    for category in library.categories() {
        println!(
            "  {} ({})",
            category.name,
            counts.get(category.name.as_str()).copied().unwrap_or(0)
        );
    }
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("shelfsync configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:          {}", cfg.home.display());
    println!("  Game database: {}", cfg.gamedb_path().display());
    println!();
    println!("URLs:");
    println!("  Store:     {}", cfg.store_url);
    println!("  Community: {}", cfg.community_url);
    println!();
    println!("Merge policy:");
    println!("  Overwrite names:      {}", cfg.merge.overwrite_names);
    println!("  Ignore DLC:           {}", cfg.merge.ignore_dlc);
    println!("  Ignored ids:          {:?}", cfg.merge.ignore);
    println!("  Prefer shortcut data: {}", cfg.merge.prefer_shortcut_data);
    println!("  Discard missing:      {}", cfg.merge.discard_missing);
    println!("  Include shortcuts:    {}", cfg.merge.include_shortcuts);
    println!();
    println!("Classification:");
    println!("  Workers: {}", cfg.scrape.workers);

    Ok(())
}

/// Truncate a string to a maximum number of characters
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
