//! Periodic reclamation of expired window entries.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::clock::Clock;
use super::limiter::RateLimiter;

/// Spawn the background sweep task.
///
/// Sweeps the limiter's store every `period`, independent of request
/// traffic. The task runs until the returned handle is aborted.
pub fn spawn_sweeper<C: Clock>(
    limiter: Arc<RateLimiter<C>>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval fires immediately on the first tick
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = limiter.sweep();
            if removed > 0 {
                debug!(removed, "Swept expired rate limit entries");
            }
        }
    })
}
