//! BackgroundScheduler - single cooperative worker for periodic partition jobs
//!
//! Jobs sit in a min-heap keyed by (due time, registration sequence). One tokio
//! task pops whatever is due, runs it to completion, and sleeps until the next
//! due time (capped by the poll interval). Jobs never run concurrently.

pub mod job;
pub mod schedule;
mod shutdown;

pub use job::{MaintenanceJob, ScheduledJob, TransitionJob};
pub use schedule::Schedule;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::constants::*;
use crate::application::maintenance::MaintenanceChecker;
use crate::application::panic_guard::{execute_guarded_async, PanicGuardResult};
use crate::application::transition::TransitionEngine;
use crate::port::TimeProvider;
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Upper bound on one worker sleep
    pub poll_interval: Duration,

    /// Delay before the one-shot startup transition check
    pub startup_delay: Duration,

    /// Daily transition check time (UTC)
    pub daily_at: NaiveTime,

    /// Weekly maintenance day and time (UTC)
    pub weekly_day: Weekday,
    pub weekly_at: NaiveTime,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            startup_delay: DEFAULT_STARTUP_DELAY,
            daily_at: NaiveTime::from_hms_opt(DEFAULT_DAILY_HOUR, DEFAULT_DAILY_MINUTE, 0)
                .unwrap_or(NaiveTime::MIN),
            weekly_day: DEFAULT_WEEKLY_DAY,
            weekly_at: NaiveTime::from_hms_opt(DEFAULT_WEEKLY_HOUR, DEFAULT_WEEKLY_MINUTE, 0)
                .unwrap_or(NaiveTime::MIN),
        }
    }
}

struct Registration {
    name: String,
    schedule: Schedule,
    job: Arc<dyn ScheduledJob>,
}

struct Entry {
    due: DateTime<Utc>,
    seq: u64,
    registration: Arc<Registration>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

#[derive(Default)]
struct JobQueue {
    heap: BinaryHeap<Reverse<Entry>>,
    /// Registered but not yet given a first due time
    unseeded: Vec<Arc<Registration>>,
    seq: u64,
}

impl JobQueue {
    fn push(&mut self, due: DateTime<Utc>, registration: Arc<Registration>) {
        self.seq += 1;
        self.heap.push(Reverse(Entry {
            due,
            seq: self.seq,
            registration,
        }));
    }

    fn pop_due(&mut self, now: DateTime<Utc>) -> Option<Entry> {
        let due = self
            .heap
            .peek()
            .is_some_and(|Reverse(entry)| entry.due <= now);
        if due {
            self.heap.pop().map(|Reverse(entry)| entry)
        } else {
            None
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct SchedulerState {
    queue: Mutex<JobQueue>,
    /// Serializes job execution between the worker and `run_pending` callers
    execution: tokio::sync::Mutex<()>,
    running: AtomicBool,
    time_provider: Arc<dyn TimeProvider>,
    config: SchedulerConfig,
}

impl SchedulerState {
    fn seed(&self, now: DateTime<Utc>) {
        let mut queue = lock(&self.queue);
        let pending: Vec<_> = queue.unseeded.drain(..).collect();
        for registration in pending {
            let due = registration.schedule.first_run(now);
            debug!(job = %registration.name, schedule = %registration.schedule, due = %due, "Job scheduled");
            queue.push(due, registration);
        }
    }

    async fn run_pending(&self, now: DateTime<Utc>) -> Vec<String> {
        let _execution = self.execution.lock().await;
        self.seed(now);

        let mut ran = Vec::new();
        loop {
            let entry = lock(&self.queue).pop_due(now);
            let Some(entry) = entry else { break };
            let registration = entry.registration;

            self.execute(&registration, now).await;

            // Occurrences that fell due while the job ran are skipped
            let finished = self.time_provider.now().max(now);
            match registration.schedule.next_after(finished) {
                Some(next) => {
                    debug!(job = %registration.name, next_run = %next, "Job rescheduled");
                    lock(&self.queue).push(next, registration.clone());
                }
                None => debug!(job = %registration.name, "One-shot job retired"),
            }
            ran.push(registration.name.clone());
        }
        ran
    }

    async fn execute(&self, registration: &Registration, now: DateTime<Utc>) {
        let started = Instant::now();
        info!(job = %registration.name, "Running scheduled job");

        match execute_guarded_async(&registration.name, registration.job.run(now)).await {
            PanicGuardResult::Success(Ok(())) => {
                info!(
                    job = %registration.name,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Scheduled job finished"
                );
            }
            PanicGuardResult::Success(Err(e)) => {
                warn!(
                    job = %registration.name,
                    error = %e,
                    "Scheduled job failed, will run again at next occurrence"
                );
            }
            PanicGuardResult::Panicked(msg) => {
                error!(job = %registration.name, panic_msg = %msg, "Scheduled job panicked");
            }
        }
    }

    /// Time until the earliest due job, capped by the poll interval
    ///
    /// Due times are wall-clock UTC, not monotonic. The cap bounds the damage
    /// of a clock step: a backwards step delays a job by at most one poll
    /// interval before the next wake re-reads the clock, and a forward step
    /// makes overdue jobs run at the next wake.
    fn sleep_for(&self, now: DateTime<Utc>) -> Duration {
        let queue = lock(&self.queue);
        match queue.heap.peek() {
            Some(Reverse(entry)) => (entry.due - now)
                .to_std()
                .unwrap_or(Duration::ZERO)
                .min(self.config.poll_interval),
            None => self.config.poll_interval,
        }
    }

    async fn run_worker(self: Arc<Self>, mut shutdown: ShutdownToken) {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "Scheduler worker started"
        );

        loop {
            if shutdown.is_shutdown() || !self.running.load(Ordering::SeqCst) {
                break;
            }

            let now = self.time_provider.now();
            self.run_pending(now).await;

            let wait = self.sleep_for(self.time_provider.now());
            tokio::select! {
                _ = sleep(wait) => {},
                _ = shutdown.wait() => {
                    info!("Scheduler worker interrupted during sleep");
                    break;
                }
            }
        }

        info!("Scheduler worker stopped");
    }
}

struct WorkerHandle {
    stop: ShutdownSender,
    handle: JoinHandle<()>,
}

/// Periodic runner for the transition and maintenance jobs
pub struct BackgroundScheduler {
    state: Arc<SchedulerState>,
    worker: Mutex<Option<WorkerHandle>>,
}

impl BackgroundScheduler {
    pub fn new(time_provider: Arc<dyn TimeProvider>, config: SchedulerConfig) -> Self {
        Self {
            state: Arc::new(SchedulerState {
                queue: Mutex::new(JobQueue::default()),
                execution: tokio::sync::Mutex::new(()),
                running: AtomicBool::new(false),
                time_provider,
                config,
            }),
            worker: Mutex::new(None),
        }
    }

    /// Scheduler with the startup, daily and weekly partition jobs registered
    pub fn for_partitions(
        engine: Arc<TransitionEngine>,
        checker: Arc<MaintenanceChecker>,
        time_provider: Arc<dyn TimeProvider>,
        config: SchedulerConfig,
    ) -> Self {
        let scheduler = Self::new(time_provider, config.clone());
        let transition: Arc<dyn ScheduledJob> = Arc::new(TransitionJob::new(engine));

        scheduler.register(
            JOB_STARTUP_TRANSITION,
            Schedule::Once {
                delay: config.startup_delay,
            },
            transition.clone(),
        );
        scheduler.register(
            JOB_DAILY_TRANSITION,
            Schedule::Daily { at: config.daily_at },
            transition,
        );
        scheduler.register(
            JOB_WEEKLY_MAINTENANCE,
            Schedule::Weekly {
                day: config.weekly_day,
                at: config.weekly_at,
            },
            Arc::new(MaintenanceJob::new(checker)),
        );
        scheduler
    }

    /// Register a job; it receives its first due time at the next worker wake
    pub fn register(&self, name: impl Into<String>, schedule: Schedule, job: Arc<dyn ScheduledJob>) {
        let name = name.into();
        info!(job = %name, schedule = %schedule, "Registered scheduled job");
        lock(&self.state.queue).unseeded.push(Arc::new(Registration {
            name,
            schedule,
            job,
        }));
    }

    /// Spawn the worker; returns false (and logs a warning) if already running
    pub fn start(&self) -> bool {
        if self.state.running.swap(true, Ordering::SeqCst) {
            warn!("Scheduler already running, ignoring start");
            return false;
        }

        let (stop, token) = shutdown_channel();
        let handle = tokio::spawn(self.state.clone().run_worker(token));
        *lock(&self.worker) = Some(WorkerHandle { stop, handle });

        info!("Scheduler started");
        true
    }

    /// Stop scheduling; an in-flight job is allowed to finish
    pub fn stop(&self) {
        let was_running = self.state.running.swap(false, Ordering::SeqCst);
        if let Some(worker) = lock(&self.worker).take() {
            worker.stop.shutdown();
        }
        if was_running {
            info!("Scheduler stop requested");
        }
    }

    /// Stop and wait up to `grace` for the worker to exit
    ///
    /// Returns true if the worker exited within the grace period.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.state.running.store(false, Ordering::SeqCst);
        let worker = lock(&self.worker).take();
        let Some(worker) = worker else {
            return true;
        };

        worker.stop.shutdown();
        match tokio::time::timeout(grace, worker.handle).await {
            Ok(_) => true,
            Err(_) => {
                warn!(grace_secs = grace.as_secs(), "Scheduler worker still busy after grace period");
                false
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Seeded jobs with their next due time, earliest first
    pub fn next_due(&self) -> Vec<(String, DateTime<Utc>)> {
        let queue = lock(&self.state.queue);
        let mut entries: Vec<&Entry> = queue.heap.iter().map(|Reverse(entry)| entry).collect();
        entries.sort();
        entries
            .into_iter()
            .map(|entry| (entry.registration.name.clone(), entry.due))
            .collect()
    }

    /// Run every job due at `now`, returning the names of the jobs that ran
    pub async fn run_pending(&self, now: DateTime<Utc>) -> Vec<String> {
        self.state.run_pending(now).await
    }
}

impl Drop for BackgroundScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
