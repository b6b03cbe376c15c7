//! Cron-driven job runner with overlap protection.
//!
//! Every registered expression gets its own ticker. A tick dispatches the
//! job only if the previous execution of that job has finished; otherwise
//! the tick is dropped (not queued). A [`Job`] registered under several
//! expressions shares one running flag, so at most one execution of it is
//! ever in flight.
//!
//! Shutdown drains: once the cancellation token fires, tickers stop and
//! [`Scheduler::run`] waits for executions already in flight before
//! returning.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use cron::Schedule;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Invalid cron expression '{expression}': {source}")]
    Parse {
        expression: String,
        source: cron::error::Error,
    },

    #[error("Invalid day-of-week field '{field}' in cron expression '{expression}'")]
    DayOfWeek { expression: String, field: String },
}

/// Parse a cron expression.
///
/// The classic five-field form (`min hour dom mon dow`) is accepted by
/// prepending a zero seconds field and translating numeric weekdays from
/// the classic 0-7 numbering (0 and 7 = Sunday) to the 1-7 numbering of the
/// `cron` crate (1 = Sunday). Six- and seven-field forms are passed through
/// unchanged and use the crate's numbering.
pub fn parse_schedule(expression: &str) -> Result<Schedule, ScheduleError> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    let normalized = if let [minute, hour, day, month, weekday] = fields[..] {
        let weekday = classic_weekdays(weekday).ok_or_else(|| ScheduleError::DayOfWeek {
            expression: expression.to_string(),
            field: weekday.to_string(),
        })?;
        format!("0 {minute} {hour} {day} {month} {weekday}")
    } else {
        fields.join(" ")
    };
    Schedule::from_str(&normalized).map_err(|source| ScheduleError::Parse {
        expression: expression.to_string(),
        source,
    })
}

/// Rewrite a classic day-of-week field for the `cron` crate.
///
/// Wildcards and named days are kept as they are. Numeric elements (single
/// days, ranges, steps) are expanded to an explicit list of days, since a
/// classic range ending on Sunday (`5-7`) wraps in the crate's numbering.
/// Returns `None` for numbers outside 0-7, reversed ranges or a zero step.
fn classic_weekdays(field: &str) -> Option<String> {
    if field == "*" || field == "?" || field.chars().any(|c| c.is_ascii_alphabetic()) {
        return Some(field.to_string());
    }

    let mut days = [false; 7];
    for element in field.split(',') {
        let (base, step) = match element.split_once('/') {
            Some((base, step)) => (base, Some(step.parse::<usize>().ok().filter(|s| *s > 0)?)),
            None => (element, None),
        };
        let (start, end) = match base.split_once('-') {
            Some((start, end)) => (start.parse::<usize>().ok()?, end.parse::<usize>().ok()?),
            None if base == "*" => (0, 6),
            // `n/step` runs from n to the end of the week.
            None if step.is_some() => (base.parse::<usize>().ok()?, 6),
            None => {
                let day = base.parse::<usize>().ok()?;
                (day, day)
            }
        };
        if start > end || end > 7 {
            return None;
        }
        for day in (start..=end).step_by(step.unwrap_or(1)) {
            days[day % 7] = true;
        }
    }

    let list: Vec<String> = days
        .iter()
        .enumerate()
        .filter(|(_, set)| **set)
        .map(|(day, _)| (day + 1).to_string())
        .collect();
    (!list.is_empty()).then(|| list.join(","))
}

/// Work the scheduler can run.
#[async_trait]
pub trait Task: Send + Sync {
    fn name(&self) -> &str;

    /// Run to completion. Errors are the task's own business to report.
    async fn execute(&self);
}

/// A task plus the flag recording whether it is currently executing.
/// Clones share the flag.
#[derive(Clone)]
pub struct Job {
    task: Arc<dyn Task>,
    running: Arc<AtomicBool>,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("task", &self.task.name())
            .field("running", &self.is_running())
            .finish()
    }
}

/// Clears the running flag when the execution ends, even by panic.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Job {
    pub fn new(task: Arc<dyn Task>) -> Self {
        Self {
            task,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &str {
        self.task.name()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn try_start(&self) -> Option<RunningGuard> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RunningGuard(Arc::clone(&self.running)))
    }
}

/// What happened to a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Started,
    /// The previous execution was still running; the trigger was dropped.
    Skipped,
}

fn dispatch(tracker: &TaskTracker, job: &Job) -> Dispatch {
    let Some(guard) = job.try_start() else {
        warn!(job = job.name(), "Skipping run: previous run still in progress");
        return Dispatch::Skipped;
    };
    let task = Arc::clone(&job.task);
    tracker.spawn(async move {
        let _guard = guard;
        task.execute().await;
    });
    Dispatch::Started
}

struct Entry {
    expression: String,
    schedule: Schedule,
    job: Job,
}

/// Maps cron times onto the tokio clock. The wall clock is read once when
/// a ticker starts; after that, waits follow the monotonic clock.
struct TickClock {
    wall: DateTime<Local>,
    instant: Instant,
}

impl TickClock {
    fn start() -> Self {
        Self {
            wall: Local::now(),
            instant: Instant::now(),
        }
    }

    fn now(&self) -> DateTime<Local> {
        let elapsed = chrono::Duration::from_std(self.instant.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.wall + elapsed
    }

    fn deadline(&self, at: DateTime<Local>) -> Instant {
        self.instant + (at - self.wall).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Fire `entry` on every upcoming tick until shutdown.
async fn tick_loop(entry: Entry, tracker: TaskTracker, shutdown: CancellationToken) {
    let clock = TickClock::start();
    let mut cursor = clock.now();
    loop {
        let Some(next) = entry.schedule.after(&cursor).next() else {
            debug!(schedule = %entry.expression, "Schedule has no further ticks");
            break;
        };
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep_until(clock.deadline(next)) => {}
        }
        if shutdown.is_cancelled() {
            break;
        }
        debug!(schedule = %entry.expression, job = entry.job.name(), "Cron tick");
        dispatch(&tracker, &entry.job);
        // Ticks missed while late are dropped rather than replayed.
        cursor = next.max(clock.now());
    }
}

pub struct Scheduler {
    entries: Vec<Entry>,
    at_launch: Vec<Job>,
    tracker: TaskTracker,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let schedules: Vec<&str> = self.entries.iter().map(|e| e.expression.as_str()).collect();
        f.debug_struct("Scheduler")
            .field("schedules", &schedules)
            .field("at_launch", &self.at_launch.len())
            .finish()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            at_launch: Vec::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Run `job` on every tick of `expression`.
    pub fn schedule_job(&mut self, expression: &str, job: &Job) -> Result<(), ScheduleError> {
        let schedule = parse_schedule(expression)?;
        info!(schedule = expression, job = job.name(), "Scheduled job");
        self.entries.push(Entry {
            expression: expression.to_string(),
            schedule,
            job: job.clone(),
        });
        Ok(())
    }

    /// Dispatch `job` once as soon as [`Scheduler::run`] starts.
    pub fn run_at_launch(&mut self, job: &Job) {
        self.at_launch.push(job.clone());
    }

    /// Run until `shutdown` is cancelled, then wait for in-flight executions.
    pub async fn run(self, shutdown: CancellationToken) {
        for job in &self.at_launch {
            info!(job = job.name(), "Running job at launch");
            dispatch(&self.tracker, job);
        }

        let mut tickers = JoinSet::new();
        for entry in self.entries {
            tickers.spawn(tick_loop(entry, self.tracker.clone(), shutdown.clone()));
        }

        shutdown.cancelled().await;
        info!("Scheduler stopping; no new runs will start");
        while tickers.join_next().await.is_some() {}

        self.tracker.close();
        if !self.tracker.is_empty() {
            info!("Waiting for {} running job(s) to finish...", self.tracker.len());
        }
        self.tracker.wait().await;
        info!("Scheduler stopped");
    }
}
