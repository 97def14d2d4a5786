//! Background refresh task.
//!
//! Ticks at the cache TTL and refreshes through the same gate as
//! request-driven reads, so a tick racing an HTTP request can never start a
//! second concurrent scrape cycle. The first tick is jittered to avoid
//! hammering the platforms right at startup.

use std::time::Duration;

use anyhow::Result;
use rand::rngs::SmallRng;
use rand::{thread_rng, Rng, SeedableRng};
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};

use crate::state::State;

pub struct Refresher {
    state: State,
    max_initial_sleep: Duration,
}

impl Refresher {
    pub fn new(state: State, max_initial_sleep: Duration) -> Self {
        Refresher {
            state,
            max_initial_sleep,
        }
    }

    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        async move {
            let mut rng = SmallRng::from_rng(thread_rng()).unwrap();
            let initial_sleep = rng.gen_range(Duration::ZERO..=self.max_initial_sleep);
            debug!("Scheduling the first refresh in {}s", initial_sleep.as_secs());

            let mut interval = time::interval_at(
                time::Instant::now() + initial_sleep,
                self.state.cache.ttl(),
            );
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

            loop {
                select! {
                    _ = cancel.cancelled() => {
                        debug!("Received a cancellation signal; exiting");
                        break;
                    }

                    _ = interval.tick() => {
                        // Reuses the request path's TTL gate; if a request
                        // already refreshed, this is a cheap cache hit.
                        let snapshot = self.state.records().await;
                        debug!(
                            records = snapshot.records.len(),
                            fetched_at = %snapshot.fetched_at,
                            "Background refresh tick finished"
                        );
                    }
                }
            }

            Ok(())
        }
        .instrument(info_span!("refresher"))
        .await
    }
}
