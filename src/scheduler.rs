// dbsnapshot/src/scheduler.rs
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

use crate::backup::BackupCycle;

const LONGEST_PERIOD: Duration = Duration::from_secs(86400 * 365 * 30);

/// Drives one [`BackupCycle`] per timer tick.
///
/// The loop is Idle while waiting on the timer and Running while a cycle is
/// awaited. A cycle always runs to completion before the timer is polled
/// again, so cycles never overlap. The timer is re-armed once a cycle
/// finishes, so ticks that fell due during a long cycle are never replayed.
pub struct Scheduler {
    interval: Duration,
    cycle: BackupCycle,
}

impl Scheduler {
    pub fn new(interval: Duration, cycle: BackupCycle) -> Self {
        Self { interval, cycle }
    }

    /// Ticks until `shutdown` resolves and returns the number of cycles run.
    /// Shutdown is only observed while Idle.
    pub async fn run_until<F>(self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        // The timer adds the period to `now` on every re-arm.
        let period = self.interval.min(LONGEST_PERIOD);
        // First tick fires one interval after start.
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            "⏱ Scheduler started, running a backup every {}",
            humantime::format_duration(self.interval)
        );

        let mut cycles = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, scheduler stopping after {} cycle(s)", cycles);
                    return cycles;
                }
                _ = ticker.tick() => {}
            }

            debug!("Tick received, starting cycle {}", cycles + 1);
            self.cycle.run().await.log();
            cycles += 1;
            ticker.reset();
        }
    }
}
