use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use time::OffsetDateTime;

use crate::aggregate::Aggregator;
use crate::cache::{CacheSnapshot, CacheStore, TooSoon};
use crate::config::{Config, PlatformConfig};
use crate::scrape;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const TOTAL_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct State {
    pub cfg: Arc<Config>,

    /// The live platform table. Starts as a copy of the config and is
    /// mutated by the manual-update endpoint.
    pub platforms: Arc<RwLock<Vec<PlatformConfig>>>,

    pub cache: Arc<CacheStore>,
    aggregator: Arc<Aggregator>,
}

impl State {
    pub fn new(cfg: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(TOTAL_TIMEOUT)
            .user_agent(&cfg.user_agent)
            .build()
            .context("could not create an HTTP client")?;

        let aggregator = Arc::new(Aggregator::new(client, Arc::new(scrape::registry())));
        let cache = Arc::new(CacheStore::new(cfg.cache_ttl.into()));
        let platforms = Arc::new(RwLock::new(cfg.platforms.clone()));

        Ok(State {
            cfg: Arc::new(cfg),
            platforms,
            cache,
            aggregator,
        })
    }

    fn platforms_snapshot(&self) -> Vec<PlatformConfig> {
        self.platforms.read().unwrap().clone()
    }

    /// Cached records, refreshing first if the slot is EMPTY or STALE.
    pub async fn records(&self) -> CacheSnapshot {
        let platforms = self.platforms_snapshot();

        self.cache
            .get_or_refresh(|| async {
                self.aggregator
                    .run(&platforms, OffsetDateTime::now_utc())
                    .await
            })
            .await
    }

    /// Operator-triggered refresh through the TTL throttle.
    pub async fn force_sync(&self) -> Result<CacheSnapshot, TooSoon> {
        let platforms = self.platforms_snapshot();

        self.cache
            .force_refresh(|| async {
                self.aggregator
                    .run(&platforms, OffsetDateTime::now_utc())
                    .await
            })
            .await
    }
}
