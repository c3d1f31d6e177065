//! Periodic cache warm-up.
//!
//! The warmer reads the pages most visitors land on. A read that misses
//! populates the cache the same way a visitor's read would, so warming needs no
//! cache access of its own.

use crate::app::Application;
use echoes_core::{EchoesResult, PageRequest};
use echoes_service::{LinkService, PostService};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Re-reads the hottest pages on an interval.
pub struct CacheWarmer {
    posts: Arc<dyn PostService>,
    links: Arc<dyn LinkService>,
    first_page: PageRequest,
}

impl CacheWarmer {
    pub fn new(posts: Arc<dyn PostService>, links: Arc<dyn LinkService>, page_size: u32) -> Self {
        Self {
            posts,
            links,
            first_page: PageRequest::new(1, page_size),
        }
    }

    /// Creates a warmer over the application's services.
    pub fn for_app(app: &Application) -> Self {
        Self::new(
            Arc::clone(&app.posts),
            Arc::clone(&app.links),
            app.config.cache.default_page_size,
        )
    }

    /// Reads the first page of posts and the link list once.
    ///
    /// Both reads are attempted; the first error is returned.
    pub async fn warm_once(&self) -> EchoesResult<()> {
        let posts = self.posts.get_posts_page(self.first_page).await;
        let links = self.links.get_links().await;

        match (&posts, &links) {
            (Ok(page), Ok(links)) => {
                debug!(posts = page.len(), links = links.len(), "Cache warmed");
            }
            _ => {
                if let Err(e) = &posts {
                    warn!(error = %e, "Failed to warm the post listing");
                }
                if let Err(e) = &links {
                    warn!(error = %e, "Failed to warm the link list");
                }
            }
        }

        posts?;
        links?;
        Ok(())
    }

    /// Warms immediately, then every `interval` until `shutdown` resolves.
    pub async fn run<F>(self, interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(interval = ?interval, "Cache warmer started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Failures are logged inside; the next tick retries.
                    let _ = self.warm_once().await;
                }
                () = &mut shutdown => break,
            }
        }

        info!("Cache warmer stopped");
    }
}
