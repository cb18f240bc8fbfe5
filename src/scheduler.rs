// src/scheduler.rs
//! Timers driving the monitor: one delayed initial pass plus independent
//! periodic ranking and news jobs. Every job is owned by a [`JobHandle`];
//! [`Scheduler::shutdown`] cancels them all and waits for them to exit.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::AppConfig;
use crate::monitor::Monitor;
use crate::types::NotificationKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerCfg {
    pub initial_delay: Duration,
    pub ranking_interval: Duration,
    pub news_interval: Duration,
}

impl From<&AppConfig> for SchedulerCfg {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            initial_delay: cfg.initial_check_delay(),
            ranking_interval: cfg.ranking_interval(),
            news_interval: cfg.news_interval(),
        }
    }
}

/// A spawned job plus its cancel switch. Dropping the handle also stops the job
/// (after any firing in progress).
pub struct JobHandle {
    name: &'static str,
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl JobHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stop future firings. A firing already running completes.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn shutdown(self) {
        self.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(target: "scheduler", job = self.name, error = %e, "job ended abnormally");
        }
    }
}

/// Run `monitor.check(kind)` every `period`, first after one full period.
/// Firings never overlap; a slow firing delays the next tick instead of bursting.
pub fn spawn_periodic(
    name: &'static str,
    period: Duration,
    monitor: Arc<Monitor>,
    kind: NotificationKind,
) -> JobHandle {
    let (cancel, mut cancelled) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(target: "scheduler", job = name, period_secs = period.as_secs(), "job started");

        loop {
            tokio::select! {
                // Cancellation wins over a tick that became due during the last firing.
                biased;
                _ = cancelled.changed() => break,
                _ = ticker.tick() => {
                    // errors are logged inside check()
                    let _ = monitor.check(kind).await;
                }
            }
        }
        tracing::info!(target: "scheduler", job = name, "job stopped");
    });

    JobHandle { name, cancel, task }
}

/// Run one full ranking + news pass after `delay`.
pub fn spawn_once(name: &'static str, delay: Duration, monitor: Arc<Monitor>) -> JobHandle {
    let (cancel, mut cancelled) = watch::channel(false);
    let task = tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                let report = monitor.check_all().await;
                tracing::info!(
                    target: "scheduler",
                    job = name,
                    changes = report.total_changes(),
                    "initial check finished"
                );
            }
            _ = cancelled.changed() => {
                tracing::info!(target: "scheduler", job = name, "cancelled before firing");
            }
        }
    });

    JobHandle { name, cancel, task }
}

pub struct Scheduler {
    jobs: Vec<JobHandle>,
}

impl Scheduler {
    pub fn start(monitor: Arc<Monitor>, cfg: SchedulerCfg) -> Self {
        let jobs = vec![
            spawn_once("initial-check", cfg.initial_delay, monitor.clone()),
            spawn_periodic(
                "ranking-check",
                cfg.ranking_interval,
                monitor.clone(),
                NotificationKind::Ranking,
            ),
            spawn_periodic("news-check", cfg.news_interval, monitor, NotificationKind::News),
        ];
        Self { jobs }
    }

    pub fn jobs(&self) -> &[JobHandle] {
        &self.jobs
    }

    pub async fn shutdown(self) {
        for job in &self.jobs {
            job.cancel();
        }
        for job in self.jobs {
            job.shutdown().await;
        }
        tracing::info!(target: "scheduler", "all jobs stopped");
    }
}
