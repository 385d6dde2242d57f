//! Concurrent classification pool.
//!
//! A fixed number of workers drain a shared id queue. Each finished
//! classification is applied to the catalog cache under the same lock that
//! holds the cancelled flag, so once [`ScrapeHandle::cancel`] returns no
//! further result is applied, even for fetches already in flight.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument};

use super::fetch::PageFetcher;
use super::game_db::GameDb;
use super::scraper::StoreScraper;
use crate::domain::GameId;

/// Default number of workers
pub const DEFAULT_WORKERS: usize = 5;

/// State guarded by the apply lock
#[derive(Default)]
struct Shared {
    db: GameDb,
    cancelled: bool,
    applied: usize,
}

/// Summary of a pool run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeReport {
    /// Ids handed to the pool
    pub requested: usize,

    /// Results written to the cache
    pub applied: usize,

    /// Whether the run was cancelled
    pub cancelled: bool,

    /// Ids never dequeued
    pub remaining: usize,
}

/// Cancellation handle, cloneable across tasks
#[derive(Clone)]
pub struct ScrapeHandle {
    shared: Arc<Mutex<Shared>>,
}

impl ScrapeHandle {
    /// Request cancellation. Results finishing after this call are dropped.
    pub async fn cancel(&self) {
        let mut shared = self.shared.lock().await;
        if !shared.cancelled {
            info!(applied = shared.applied, "Classification cancelled");
        }
        shared.cancelled = true;
    }

    pub async fn is_cancelled(&self) -> bool {
        self.shared.lock().await.cancelled
    }
}

/// Worker pool running a [`StoreScraper`] over many ids
pub struct ScrapePool<F> {
    scraper: Arc<StoreScraper<F>>,
    workers: usize,
    shared: Arc<Mutex<Shared>>,
}

impl<F: PageFetcher + 'static> ScrapePool<F> {
    /// Create a pool; a worker count of zero is raised to one
    pub fn new(scraper: StoreScraper<F>, workers: usize) -> Self {
        Self {
            scraper: Arc::new(scraper),
            workers: workers.max(1),
            shared: Arc::new(Mutex::new(Shared::default())),
        }
    }

    pub fn handle(&self) -> ScrapeHandle {
        ScrapeHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Classify every id, applying results to `db`.
    ///
    /// Returns the updated cache and a report. A cancelled run still returns
    /// every result applied before cancellation. The pool is consumed: a
    /// cancellation is final, and handles taken earlier keep reporting it.
    #[instrument(skip(self, db, ids), fields(workers = self.workers))]
    pub async fn run<I>(self, db: GameDb, ids: I) -> (GameDb, ScrapeReport)
    where
        I: IntoIterator<Item = GameId>,
    {
        let queue: VecDeque<GameId> = ids.into_iter().collect();
        let requested = queue.len();
        let queue = Arc::new(Mutex::new(queue));

        {
            let mut shared = self.shared.lock().await;
            shared.db = db;
            shared.applied = 0;
        }

        info!(requested, "Starting classification");

        let mut set = JoinSet::new();
        for worker in 0..self.workers.min(requested.max(1)) {
            let scraper = Arc::clone(&self.scraper);
            let queue = Arc::clone(&queue);
            let shared = Arc::clone(&self.shared);
            set.spawn(run_worker(worker, scraper, queue, shared));
        }

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Classification worker failed");
            }
        }

        let remaining = queue.lock().await.len();
        let mut shared = self.shared.lock().await;
        let report = ScrapeReport {
            requested,
            applied: shared.applied,
            cancelled: shared.cancelled,
            remaining,
        };

        info!(
            applied = report.applied,
            remaining = report.remaining,
            cancelled = report.cancelled,
            "Classification finished"
        );

        (std::mem::take(&mut shared.db), report)
    }
}

async fn run_worker<F: PageFetcher>(
    worker: usize,
    scraper: Arc<StoreScraper<F>>,
    queue: Arc<Mutex<VecDeque<GameId>>>,
    shared: Arc<Mutex<Shared>>,
) {
    loop {
        if shared.lock().await.cancelled {
            break;
        }

        let Some(id) = queue.lock().await.pop_front() else {
            break;
        };

        let result = scraper.scrape(id).await;

        let mut state = shared.lock().await;
        if state.cancelled {
            debug!(worker, id, "Dropping result after cancellation");
            break;
        }
        debug!(worker, id, app_type = %result.app_type, "Applying classification");
        state.db.apply_scrape(id, result.app_type, result.genre);
        state.applied += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fetch::{FetchError, FetchedPage};
    use crate::catalog::game_db::AppType;
    use async_trait::async_trait;
    use reqwest::Url;

    /// Every id lands on the store front page
    struct FrontPage;

    #[async_trait]
    impl PageFetcher for FrontPage {
        async fn fetch(&self, _url: &str) -> Result<FetchedPage, FetchError> {
            let url = Url::parse("https://store.example.com/").unwrap();
            Ok(FetchedPage::new(url, ""))
        }
    }

    #[tokio::test]
    async fn test_pool_applies_all() {
        let pool = ScrapePool::new(StoreScraper::new(FrontPage), 3);
        let (db, report) = pool.run(GameDb::new(), vec![1, 2, 3, 4, 5, 6, 7]).await;

        assert_eq!(report.requested, 7);
        assert_eq!(report.applied, 7);
        assert_eq!(report.remaining, 0);
        assert!(!report.cancelled);
        assert_eq!(db.len(), 7);
        assert!(db.entries().all(|e| e.app_type == AppType::NotFound));
    }

    #[tokio::test]
    async fn test_pool_empty_queue() {
        let pool = ScrapePool::new(StoreScraper::new(FrontPage), 0);
        let (db, report) = pool.run(GameDb::new(), Vec::new()).await;
        assert_eq!(report.applied, 0);
        assert!(db.is_empty());
    }

    #[tokio::test]
    async fn test_handle_outlives_pool() {
        let pool = ScrapePool::new(StoreScraper::new(FrontPage), 2);
        let handle = pool.handle();
        assert!(!handle.is_cancelled().await);

        let (_, report) = pool.run(GameDb::new(), vec![1]).await;
        assert!(!report.cancelled);

        handle.cancel().await;
        assert!(handle.is_cancelled().await);
    }

    #[tokio::test]
    async fn test_cancel_before_run() {
        let pool = ScrapePool::new(StoreScraper::new(FrontPage), 2);
        pool.handle().cancel().await;

        let (db, report) = pool.run(GameDb::new(), vec![1, 2, 3]).await;
        assert!(report.cancelled);
        assert_eq!(report.applied, 0);
        assert_eq!(report.remaining, 3);
        assert!(db.is_empty());
    }
}
