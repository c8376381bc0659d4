pub mod clean_webhook_events;

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::clock::Clock;
use crate::error::{AppError, Result};

pub use clean_webhook_events::CleanWebhookEvents;

/// A unit of scheduled work.
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self) -> Result<()>;
}

pub fn parse_schedule(expression: &str) -> Result<Schedule> {
    Schedule::from_str(expression)
        .map_err(|e| AppError::BadRequest(format!("Invalid cron expression '{}': {}", expression, e)))
}

/// First occurrence of `schedule` strictly after `after`.
pub fn next_run(schedule: &Schedule, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule.after(&after).next()
}

/// Runs one job on a cron schedule until the task is dropped. A failed run is
/// logged and the next occurrence is still scheduled.
pub struct Scheduler {
    schedule: Schedule,
    job: Arc<dyn Job>,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    pub fn new(expression: &str, job: Arc<dyn Job>, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self {
            schedule: parse_schedule(expression)?,
            job,
            clock,
        })
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run_forever().await })
    }

    async fn run_forever(self) {
        loop {
            let now = self.clock.now();
            let Some(next) = next_run(&self.schedule, now) else {
                tracing::warn!(job = self.job.name(), "Schedule has no upcoming runs; stopping");
                return;
            };

            tracing::debug!(job = self.job.name(), next_run = %next, "Job scheduled");
            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            self.run_once().await;
        }
    }

    pub async fn run_once(&self) {
        let started = std::time::Instant::now();
        match self.job.run().await {
            Ok(()) => tracing::info!(
                job = self.job.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Job finished"
            ),
            Err(e) => tracing::error!(job = self.job.name(), "Job failed: {}", e),
        }
    }
}
