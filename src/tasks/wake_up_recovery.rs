//! Wake-up recovery background task

use std::{sync::Arc, time::Duration};
use tokio::time::{interval, Instant};
use tracing::{debug, info};

use crate::{clock::Clock, engine::CountdownEngine};

/// How often wall-clock and monotonic time are compared
pub const CHECK_INTERVAL: Duration = Duration::from_secs(15);

/// Unaccounted wall-clock time that counts as a host suspension
const SUSPEND_THRESHOLD_MS: i64 = 5_000;

/// Detects host suspensions: the wall clock keeps running while the
/// monotonic clock stands still.
#[derive(Debug, Clone, Copy)]
pub struct SuspendDetector {
    last_wall_millis: i64,
    last_monotonic: Instant,
}

impl SuspendDetector {
    pub fn new(wall_millis: i64, monotonic: Instant) -> Self {
        Self {
            last_wall_millis: wall_millis,
            last_monotonic: monotonic,
        }
    }

    /// Record a new observation; returns the unaccounted milliseconds if the
    /// host appears to have been suspended since the last one
    pub fn observe(&mut self, wall_millis: i64, monotonic: Instant) -> Option<i64> {
        let wall_delta = wall_millis - self.last_wall_millis;
        let monotonic_delta = monotonic.saturating_duration_since(self.last_monotonic).as_millis() as i64;
        self.last_wall_millis = wall_millis;
        self.last_monotonic = monotonic;

        let gap = wall_delta - monotonic_delta;
        (gap > SUSPEND_THRESHOLD_MS).then_some(gap)
    }
}

/// Background task that reconciles the countdown right after a host wake-up
pub async fn wake_up_recovery_task(engine: CountdownEngine, clock: Arc<dyn Clock>) {
    info!("Starting wake-up recovery task");

    let mut interval = interval(CHECK_INTERVAL);
    let mut detector = SuspendDetector::new(clock.now_millis(), Instant::now());

    loop {
        interval.tick().await;

        if let Some(gap) = detector.observe(clock.now_millis(), Instant::now()) {
            info!("System wake-up detected ({}s unaccounted), reconciling countdown", gap / 1000);
            let timer = engine.tick_now();
            debug!("Countdown after wake-up: {:?} remaining", timer.remaining_seconds());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, storage::MemoryStorage};

    #[test]
    fn steady_clocks_are_not_a_suspension() {
        let start = Instant::now();
        let mut detector = SuspendDetector::new(0, start);
        assert_eq!(detector.observe(15_000, start + Duration::from_secs(15)), None);
        assert_eq!(detector.observe(31_000, start + Duration::from_secs(30)), None);
    }

    #[test]
    fn wall_clock_jump_is_a_suspension() {
        let start = Instant::now();
        let mut detector = SuspendDetector::new(0, start);
        assert_eq!(detector.observe(615_000, start + Duration::from_secs(15)), Some(600_000));
        // the next observation starts from the new baseline
        assert_eq!(detector.observe(630_000, start + Duration::from_secs(30)), None);
    }

    #[tokio::test(start_paused = true)]
    async fn wake_up_completes_overdue_countdown() {
        let storage = Arc::new(MemoryStorage::new());
        let clock = ManualClock::new(0);
        let engine = CountdownEngine::with_tick_interval(
            storage,
            Arc::new(clock.clone()),
            Duration::from_secs(3600),
        );
        let mut events = engine.subscribe();
        engine.start(60, false).unwrap();

        let task = tokio::spawn(wake_up_recovery_task(engine.clone(), Arc::new(clock.clone())));
        tokio::task::yield_now().await;

        // host sleeps: wall clock jumps, monotonic time only moves one check interval
        clock.advance_secs(120);
        tokio::time::advance(CHECK_INTERVAL).await;
        tokio::task::yield_now().await;

        assert!(!engine.is_running());
        let mut completed = 0;
        while let Ok(event) = events.try_recv() {
            if event.name() == "completed" {
                completed += 1;
            }
        }
        assert_eq!(completed, 1);
        task.abort();
    }
}
