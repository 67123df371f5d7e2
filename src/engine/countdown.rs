//! Countdown engine: owns the timer state, persists it and drives the tick

use std::{
    sync::{Arc, Mutex, MutexGuard, Weak},
    time::Duration,
};

use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::{
    clock::Clock,
    error::EngineError,
    state::{TimerRecord, TimerState},
    storage::{Storage, TIMER_KEY},
};

use super::TimerEvent;

/// Period of the recomputation tick
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

const EVENT_CAPACITY: usize = 256;

/// Handle to the single countdown of this installation.
///
/// Clones share the same engine. Operations that can start ticking
/// (`start`, `reconcile`) must be called from inside a tokio runtime.
#[derive(Clone)]
pub struct CountdownEngine {
    inner: Arc<Inner>,
}

struct Inner {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
    core: Mutex<EngineCore>,
    events_tx: broadcast::Sender<TimerEvent>,
    state_tx: watch::Sender<TimerState>,
}

/// Mutable engine state; only touched with the `core` lock held
#[derive(Default)]
struct EngineCore {
    run: Option<ActiveRun>,
    /// Bumped on every run so ticks from a released ticker are recognisable
    generation: u64,
    /// Active tick handle, present exactly while a run is ticking
    ticker: Option<JoinHandle<()>>,
}

struct ActiveRun {
    record: TimerRecord,
    halfway_fired: bool,
    generation: u64,
}

impl EngineCore {
    fn begin(&mut self, record: TimerRecord, halfway_fired: bool) -> u64 {
        self.generation += 1;
        self.run = Some(ActiveRun {
            record,
            halfway_fired,
            generation: self.generation,
        });
        self.generation
    }

    /// Drop the tick source and the run; returns the run that was active
    fn release(&mut self) -> Option<ActiveRun> {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
        self.run.take()
    }

    fn snapshot(&self, now_millis: i64) -> TimerState {
        match &self.run {
            Some(run) => TimerState::running(
                &run.record,
                run.record.remaining_secs(now_millis),
                run.halfway_fired,
            ),
            None => TimerState::idle(),
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let core = self.core.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = core.ticker.take() {
            handle.abort();
        }
    }
}

impl CountdownEngine {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self::with_tick_interval(storage, clock, TICK_INTERVAL)
    }

    pub fn with_tick_interval(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>, tick_interval: Duration) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (state_tx, _) = watch::channel(TimerState::idle());

        Self {
            inner: Arc::new(Inner {
                storage,
                clock,
                tick_interval,
                core: Mutex::new(EngineCore::default()),
                events_tx,
                state_tx,
            }),
        }
    }

    /// Receive every lifecycle event from now on
    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.inner.events_tx.subscribe()
    }

    /// Watch the latest published timer state
    pub fn watch(&self) -> watch::Receiver<TimerState> {
        self.inner.state_tx.subscribe()
    }

    /// Current state, recomputed against the wall clock
    pub fn snapshot(&self) -> TimerState {
        self.lock_core().snapshot(self.now())
    }

    pub fn is_running(&self) -> bool {
        self.lock_core().run.is_some()
    }

    /// Start a countdown of `duration` seconds.
    ///
    /// A running countdown is replaced: its tick source is released and
    /// `CancelExternal` is emitted before the new record is written. If the
    /// record cannot be persisted the engine ends up `Idle`.
    pub fn start(&self, duration: u64, alarm_enabled: bool) -> Result<TimerState, EngineError> {
        if duration == 0 {
            return Err(EngineError::InvalidDuration);
        }
        let mut core = self.lock_core();
        self.begin_run(&mut core, duration, alarm_enabled)
    }

    /// Like `start`, but refuses with `AlreadyRunning` instead of replacing a
    /// live countdown. The check and the start share one lock.
    pub fn start_when_idle(&self, duration: u64, alarm_enabled: bool) -> Result<TimerState, EngineError> {
        if duration == 0 {
            return Err(EngineError::InvalidDuration);
        }
        let mut core = self.lock_core();
        if let Some(run) = &core.run {
            return Err(EngineError::AlreadyRunning {
                remaining: run.record.remaining_secs(self.now()),
            });
        }
        self.begin_run(&mut core, duration, alarm_enabled)
    }

    fn begin_run(&self, core: &mut EngineCore, duration: u64, alarm_enabled: bool) -> Result<TimerState, EngineError> {
        let replacing = core.release().is_some();
        if replacing {
            info!("Replacing running countdown");
            self.emit(TimerEvent::CancelExternal);
        }

        let record = TimerRecord::new(self.now(), duration, alarm_enabled);
        if let Err(e) = record
            .encode()
            .and_then(|encoded| self.inner.storage.set(TIMER_KEY, &encoded))
        {
            error!("Failed to persist countdown: {}", e);
            if replacing {
                // The replaced record must not come back on the next reconcile
                if let Err(remove_err) = self.inner.storage.remove(TIMER_KEY) {
                    warn!("Failed to clear replaced countdown: {}", remove_err);
                }
            }
            self.publish(core);
            return Err(e.into());
        }

        let generation = core.begin(record, false);
        core.ticker = Some(self.spawn_ticker(generation));

        info!("Countdown started: {}s (alarm: {})", duration, alarm_enabled);
        self.emit(TimerEvent::Started {
            duration,
            alarm_enabled,
            started_at: record.start_time,
        });
        Ok(self.publish(core))
    }

    /// Stop the running countdown.
    ///
    /// Returns `false` when nothing was running; stopping twice emits a
    /// single `Stopped`. The tick source is released before returning, even
    /// when clearing the record fails.
    pub fn stop(&self) -> Result<bool, EngineError> {
        let mut core = self.lock_core();
        if core.release().is_none() {
            debug!("Stop requested with no running countdown");
            return Ok(false);
        }

        info!("Countdown stopped");
        self.emit(TimerEvent::Stopped);
        self.emit(TimerEvent::CancelExternal);
        self.publish(&core);

        self.inner.storage.remove(TIMER_KEY).map_err(|e| {
            error!("Failed to clear stopped countdown: {}", e);
            EngineError::from(e)
        })?;
        Ok(true)
    }

    /// Pick up a persisted countdown after a process or UI resume.
    ///
    /// Remaining time is recomputed from the stored start time. A countdown
    /// that ran out in the meantime is cleared and reported as an overdue
    /// `Completed`; the halfway event is never replayed.
    pub fn reconcile(&self) -> Result<TimerState, EngineError> {
        let mut core = self.lock_core();
        if core.run.is_some() {
            debug!("Reconcile requested while running; keeping the live countdown");
            return Ok(core.snapshot(self.now()));
        }

        let raw = match self.inner.storage.get(TIMER_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No persisted countdown to reconcile");
                return Ok(self.publish(&core));
            }
            Err(e) => {
                warn!("Failed to read persisted countdown: {}", e);
                self.publish(&core);
                return Err(e.into());
            }
        };

        let record = match TimerRecord::decode(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!("Discarding unreadable countdown record: {}", e);
                if let Err(remove_err) = self.inner.storage.remove(TIMER_KEY) {
                    warn!("Failed to remove unreadable countdown record: {}", remove_err);
                }
                self.publish(&core);
                return Err(e.into());
            }
        };

        let now = self.now();
        if record.is_elapsed(now) {
            info!("Persisted countdown of {}s already ran out", record.duration);
            self.inner.storage.remove(TIMER_KEY)?;
            self.emit(TimerEvent::Completed {
                overdue: true,
                alarm_enabled: record.alarm_enabled,
            });
            return Ok(self.publish(&core));
        }

        let remaining = record.remaining_secs(now);
        let halfway_passed = record.halfway_passed(now);
        let generation = core.begin(record, halfway_passed);
        core.ticker = Some(self.spawn_ticker(generation));

        info!(
            "Resumed countdown: {}s of {}s remaining (halfway passed: {})",
            remaining, record.duration, halfway_passed
        );
        self.emit(TimerEvent::Resumed {
            duration: record.duration,
            remaining,
            alarm_enabled: record.alarm_enabled,
            halfway_passed,
        });
        self.emit(TimerEvent::Tick {
            remaining,
            duration: record.duration,
        });
        Ok(self.publish(&core))
    }

    /// Recompute the running countdown right away instead of waiting for the next tick
    pub fn tick_now(&self) -> TimerState {
        let mut core = self.lock_core();
        self.advance(&mut core);
        core.snapshot(self.now())
    }

    /// Stop ticking but keep the persisted record, so the next process
    /// reconciles it. Used on shutdown.
    pub fn detach(&self) {
        let mut core = self.lock_core();
        if core.release().is_some() {
            info!("Countdown detached; record kept for the next start-up");
        }
        self.publish(&core);
    }

    fn now(&self) -> i64 {
        self.inner.clock.now_millis()
    }

    fn lock_core(&self) -> MutexGuard<'_, EngineCore> {
        self.inner.core.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: TimerEvent) {
        let name = event.name();
        if self.inner.events_tx.send(event).is_err() {
            debug!("No listeners for {} event", name);
        }
    }

    fn publish(&self, core: &EngineCore) -> TimerState {
        let state = core.snapshot(self.now());
        self.inner.state_tx.send_replace(state.clone());
        state
    }

    fn spawn_ticker(&self, generation: u64) -> JoinHandle<()> {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let period = self.inner.tick_interval;
        let first = time::Instant::now() + period;

        tokio::spawn(async move {
            let mut interval = time::interval_at(first, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let engine = CountdownEngine { inner };
                if !engine.tick_run(generation) {
                    break;
                }
            }
        })
    }

    /// One scheduled tick; returns whether the ticker should keep going
    fn tick_run(&self, generation: u64) -> bool {
        let mut core = self.lock_core();
        if core.run.as_ref().map(|run| run.generation) != Some(generation) {
            debug!("Ignoring stale tick from run {}", generation);
            return false;
        }
        self.advance(&mut core)
    }

    /// Recompute remaining time from the wall clock and fire due transitions.
    ///
    /// Returns whether the countdown is still running.
    fn advance(&self, core: &mut EngineCore) -> bool {
        let now = self.now();
        let Some(run) = core.run.as_mut() else {
            return false;
        };

        let duration = run.record.duration;
        let remaining = run.record.remaining_secs(now);
        debug!("Countdown tick: {}s remaining", remaining);
        self.emit(TimerEvent::Tick { remaining, duration });

        if !run.halfway_fired && run.record.halfway_passed(now) {
            run.halfway_fired = true;
            info!("Countdown reached halfway ({}s)", duration / 2);
            self.emit(TimerEvent::Halfway { duration });
        }

        if remaining == 0 {
            self.complete_run(core);
            return false;
        }

        self.publish(core);
        true
    }

    fn complete_run(&self, core: &mut EngineCore) {
        let alarm_enabled = core
            .release()
            .is_some_and(|run| run.record.alarm_enabled);
        info!("Countdown completed");
        if let Err(e) = self.inner.storage.remove(TIMER_KEY) {
            // An elapsed record left behind is cleared by the next reconcile
            error!("Failed to clear completed countdown: {}", e);
        }
        self.emit(TimerEvent::Completed {
            overdue: false,
            alarm_enabled,
        });
        self.publish(core);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, error::PersistenceError, state::TimerPhase, storage::MemoryStorage};

    const EPOCH: i64 = 1_700_000_000_000;

    struct Fixture {
        engine: CountdownEngine,
        storage: Arc<MemoryStorage>,
        clock: ManualClock,
        events: broadcast::Receiver<TimerEvent>,
    }

    impl Fixture {
        fn new() -> Self {
            let storage = Arc::new(MemoryStorage::new());
            let clock = ManualClock::new(EPOCH);
            let engine = CountdownEngine::new(storage.clone(), Arc::new(clock.clone()));
            let events = engine.subscribe();
            Self { engine, storage, clock, events }
        }

        /// Simulate a process restart: a fresh engine over the same storage and clock
        fn restart(self) -> Self {
            let Fixture { engine, storage, clock, .. } = self;
            drop(engine);
            let engine = CountdownEngine::new(storage.clone(), Arc::new(clock.clone()));
            let events = engine.subscribe();
            Self { engine, storage, clock, events }
        }

        fn drain(&mut self) -> Vec<TimerEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                events.push(event);
            }
            events
        }

        fn stored(&self) -> Option<TimerRecord> {
            self.storage
                .get(TIMER_KEY)
                .unwrap()
                .map(|raw| TimerRecord::decode(&raw).unwrap())
        }
    }

    fn count(events: &[TimerEvent], name: &str) -> usize {
        events.iter().filter(|e| e.name() == name).count()
    }

    #[tokio::test(start_paused = true)]
    async fn start_persists_record_and_emits_started() {
        let mut f = Fixture::new();
        let state = f.engine.start(43200, true).unwrap();

        assert_eq!(state.phase, TimerPhase::Running);
        assert_eq!(state.remaining_seconds, Some(43200));
        assert_eq!(f.stored(), Some(TimerRecord::new(EPOCH, 43200, true)));
        assert_eq!(
            f.drain(),
            vec![TimerEvent::Started { duration: 43200, alarm_enabled: true, started_at: EPOCH }]
        );
        assert_eq!(f.engine.watch().borrow().remaining_seconds, Some(43200));
    }

    #[tokio::test(start_paused = true)]
    async fn start_then_reconcile_keeps_full_duration() {
        for duration in [1, 2, 59, 3600, 43200] {
            let f = Fixture::new();
            f.engine.start(duration, false).unwrap();
            assert_eq!(f.engine.reconcile().unwrap().remaining_seconds, Some(duration));

            let f = f.restart();
            let state = f.engine.reconcile().unwrap();
            assert_eq!(state.phase, TimerPhase::Running);
            assert_eq!(state.remaining_seconds, Some(duration));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn recovery_after_restart_is_exact() {
        for duration in [2, 10, 3600, 43200] {
            for elapsed in [0, 1, duration / 2, duration - 1] {
                let f = Fixture::new();
                f.engine.start(duration, false).unwrap();
                let f = f.restart();
                f.clock.advance_secs(elapsed);

                let state = f.engine.reconcile().unwrap();
                assert_eq!(state.phase, TimerPhase::Running, "duration {duration} elapsed {elapsed}");
                assert_eq!(state.remaining_seconds, Some(duration - elapsed));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reconcile_past_due_clears_record() {
        for elapsed in [14400, 14401, 144000] {
            let f = Fixture::new();
            f.engine.start(14400, false).unwrap();
            let mut f = f.restart();
            f.clock.advance_secs(elapsed);

            let state = f.engine.reconcile().unwrap();
            assert_eq!(state.phase, TimerPhase::Idle);
            assert_eq!(f.stored(), None);
            assert_eq!(
                f.drain(),
                vec![TimerEvent::Completed { overdue: true, alarm_enabled: false }]
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn completion_carries_the_record_alarm_flag() {
        let f = Fixture::new();
        f.engine.start(60, true).unwrap();
        let mut f = f.restart();
        f.clock.advance_secs(120);

        f.engine.reconcile().unwrap();
        assert_eq!(f.drain(), vec![TimerEvent::Completed { overdue: true, alarm_enabled: true }]);

        f.engine.start(60, true).unwrap();
        f.clock.advance_secs(60);
        f.engine.tick_now();
        assert_eq!(
            f.drain().last(),
            Some(&TimerEvent::Completed { overdue: false, alarm_enabled: true })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reconcile_without_record_stays_idle() {
        let mut f = Fixture::new();
        let state = f.engine.reconcile().unwrap();
        assert_eq!(state, TimerState::idle());
        assert!(f.drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn twelve_hour_run_resumed_at_midpoint() {
        let f = Fixture::new();
        f.engine.start(43200, false).unwrap();
        let mut f = f.restart();
        f.clock.advance_secs(21600);

        let state = f.engine.reconcile().unwrap();
        assert_eq!(state.phase, TimerPhase::Running);
        assert_eq!(state.remaining_seconds, Some(21600));
        assert!(state.halfway_passed);

        f.clock.advance_secs(1);
        f.engine.tick_now();
        let events = f.drain();
        assert_eq!(count(&events, "halfway"), 0);
        assert_eq!(
            events,
            vec![
                TimerEvent::Resumed {
                    duration: 43200,
                    remaining: 21600,
                    alarm_enabled: false,
                    halfway_passed: true,
                },
                TimerEvent::Tick { remaining: 21600, duration: 43200 },
                TimerEvent::Tick { remaining: 21599, duration: 43200 },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn four_hour_run_completes_once() {
        let mut f = Fixture::new();
        f.engine.start(14400, false).unwrap();
        f.clock.advance_secs(14400);

        let state = f.engine.tick_now();
        assert_eq!(state.phase, TimerPhase::Idle);
        f.engine.tick_now();
        f.engine.tick_now();

        let events = f.drain();
        assert_eq!(count(&events, "completed"), 1);
        assert_eq!(count(&events, "halfway"), 1);
        assert_eq!(
            events.last(),
            Some(&TimerEvent::Completed { overdue: false, alarm_enabled: false })
        );
        assert_eq!(f.stored(), None);
        assert!(f.engine.lock_core().ticker.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn halfway_fires_exactly_once() {
        let mut f = Fixture::new();
        f.engine.start(10, false).unwrap();

        f.clock.advance_secs(4);
        f.engine.tick_now();
        assert_eq!(count(&f.drain(), "halfway"), 0);

        f.clock.advance_secs(1);
        f.engine.tick_now();
        assert_eq!(f.drain().last(), Some(&TimerEvent::Halfway { duration: 10 }));

        f.clock.advance_secs(1);
        f.engine.tick_now();
        assert_eq!(count(&f.drain(), "halfway"), 0);
        assert!(f.engine.snapshot().halfway_passed);
    }

    #[tokio::test(start_paused = true)]
    async fn halfway_fires_after_restart_before_midpoint() {
        let f = Fixture::new();
        f.engine.start(100, false).unwrap();
        let mut f = f.restart();
        f.clock.advance_secs(30);
        assert!(!f.engine.reconcile().unwrap().halfway_passed);

        f.clock.advance_secs(20);
        f.engine.tick_now();
        assert_eq!(count(&f.drain(), "halfway"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent() {
        let mut f = Fixture::new();
        f.engine.start(600, false).unwrap();
        f.drain();

        assert!(f.engine.stop().unwrap());
        assert!(!f.engine.stop().unwrap());

        let events = f.drain();
        assert_eq!(events, vec![TimerEvent::Stopped, TimerEvent::CancelExternal]);
        assert_eq!(f.engine.snapshot().phase, TimerPhase::Idle);
        assert_eq!(f.stored(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_tick_after_stop_is_ignored() {
        let mut f = Fixture::new();
        f.engine.start(600, false).unwrap();
        let generation = f.engine.lock_core().generation;
        f.engine.stop().unwrap();
        f.drain();

        f.clock.advance_secs(600);
        assert!(!f.engine.tick_run(generation));
        assert!(f.drain().is_empty());
        assert!(f.engine.lock_core().ticker.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_tick_from_replaced_run_is_ignored() {
        let mut f = Fixture::new();
        f.engine.start(600, false).unwrap();
        let old_generation = f.engine.lock_core().generation;
        f.engine.start(300, false).unwrap();
        f.drain();

        assert!(!f.engine.tick_run(old_generation));
        assert!(f.drain().is_empty());
        assert!(f.engine.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_record_wholesale() {
        let mut f = Fixture::new();
        f.engine.start(100, false).unwrap();
        f.clock.advance_secs(30);
        f.drain();

        let state = f.engine.start(50, true).unwrap();
        assert_eq!(state.remaining_seconds, Some(50));
        assert_eq!(f.stored(), Some(TimerRecord::new(EPOCH + 30_000, 50, true)));
        assert_eq!(
            f.drain(),
            vec![
                TimerEvent::CancelExternal,
                TimerEvent::Started { duration: 50, alarm_enabled: true, started_at: EPOCH + 30_000 },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn start_when_idle_refuses_to_replace() {
        let mut f = Fixture::new();
        f.engine.start_when_idle(100, false).unwrap();
        f.clock.advance_secs(10);
        f.drain();

        assert!(matches!(
            f.engine.start_when_idle(50, true),
            Err(EngineError::AlreadyRunning { remaining: 90 })
        ));
        assert!(f.drain().is_empty());
        assert_eq!(f.stored(), Some(TimerRecord::new(EPOCH, 100, false)));
        assert_eq!(f.engine.snapshot().remaining_seconds, Some(90));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_restart_clears_replaced_record() {
        let mut f = Fixture::new();
        f.engine.start(600, false).unwrap();
        f.drain();
        f.storage.set_failing_writes(true);

        assert!(f.engine.start(300, false).is_err());
        assert!(!f.engine.is_running());
        assert_eq!(f.drain(), vec![TimerEvent::CancelExternal]);
        assert_eq!(f.stored(), None);

        let f = f.restart();
        assert_eq!(f.engine.reconcile().unwrap().phase, TimerPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn start_rejects_zero_duration() {
        let mut f = Fixture::new();
        assert!(matches!(f.engine.start(0, false), Err(EngineError::InvalidDuration)));
        assert!(f.drain().is_empty());
        assert_eq!(f.stored(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn storage_failure_on_start_leaves_idle() {
        let mut f = Fixture::new();
        f.storage.set_failing(true);

        let result = f.engine.start(600, false);
        assert!(matches!(
            result,
            Err(EngineError::Persistence(PersistenceError::Unavailable(_)))
        ));
        assert!(!f.engine.is_running());
        assert!(f.drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn storage_failure_on_reconcile_leaves_idle() {
        let f = Fixture::new();
        f.engine.start(600, false).unwrap();
        let f = f.restart();
        f.storage.set_failing(true);

        assert!(f.engine.reconcile().is_err());
        assert!(!f.engine.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn storage_failure_on_stop_still_releases_ticker() {
        let mut f = Fixture::new();
        f.engine.start(600, false).unwrap();
        f.drain();
        f.storage.set_failing(true);

        assert!(f.engine.stop().is_err());
        assert!(!f.engine.is_running());
        assert!(f.engine.lock_core().ticker.is_none());
        assert_eq!(f.drain(), vec![TimerEvent::Stopped, TimerEvent::CancelExternal]);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_record_is_discarded() {
        let mut f = Fixture::new();
        f.storage.set(TIMER_KEY, r#"{"startTime":"yesterday"}"#).unwrap();

        assert!(matches!(
            f.engine.reconcile(),
            Err(EngineError::Persistence(PersistenceError::Malformed { .. }))
        ));
        assert!(!f.engine.is_running());
        assert_eq!(f.storage.get(TIMER_KEY).unwrap(), None);
        assert!(f.drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_range_start_time_is_discarded() {
        let mut f = Fixture::new();
        f.storage
            .set(TIMER_KEY, &format!(r#"{{"startTime":{},"duration":60}}"#, i64::MIN))
            .unwrap();

        assert!(matches!(
            f.engine.reconcile(),
            Err(EngineError::Persistence(PersistenceError::Malformed { .. }))
        ));
        assert!(!f.engine.is_running());
        assert_eq!(f.storage.get(TIMER_KEY).unwrap(), None);
        assert!(f.drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn start_time_in_future_counts_as_not_started() {
        let f = Fixture::new();
        f.storage
            .set(TIMER_KEY, &TimerRecord::new(EPOCH + 60_000, 120, false).encode().unwrap())
            .unwrap();

        let state = f.engine.reconcile().unwrap();
        assert_eq!(state.remaining_seconds, Some(120));
    }

    #[tokio::test(start_paused = true)]
    async fn detach_keeps_record_for_next_process() {
        let f = Fixture::new();
        f.engine.start(300, false).unwrap();
        f.engine.detach();

        assert!(!f.engine.is_running());
        assert!(f.stored().is_some());
    }

    async fn next_tick(events: &mut broadcast::Receiver<TimerEvent>) -> u64 {
        loop {
            if let TimerEvent::Tick { remaining, .. } = events.recv().await.unwrap() {
                return remaining;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_derives_remaining_from_wall_clock() {
        let mut f = Fixture::new();
        f.engine.start(4, false).unwrap();
        f.drain();

        f.clock.advance_secs(1);
        assert_eq!(next_tick(&mut f.events).await, 3);

        // Missed ticks are not counted down one by one
        f.clock.advance_secs(3);
        assert_eq!(next_tick(&mut f.events).await, 0);
        assert_eq!(
            f.drain(),
            vec![
                TimerEvent::Halfway { duration: 4 },
                TimerEvent::Completed { overdue: false, alarm_enabled: false },
            ]
        );

        assert!(!f.engine.is_running());
        assert_eq!(f.stored(), None);
    }
}
