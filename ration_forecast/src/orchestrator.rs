//! Run Orchestrator: run once, or on every trigger
//!
//! The orchestrator knows nothing about wall-clock time. It waits on a
//! [`TriggerSource`] for "run now" events; [`DailyTrigger`] turns a time of
//! day into such events and [`ChannelTrigger`] lets callers feed them.

use crate::error::Result;
use crate::models::RegressionModel;
use crate::pipeline::{Pipeline, RunSummary};
use crate::store::{DemandStore, StoreConnector};
use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use tokio::sync::mpsc;
use tracing::{error, info};

/// A request to run the pipeline for a given as-of date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub as_of: NaiveDate,
}

/// Source of "run now" events; `None` ends the schedule
#[async_trait]
pub trait TriggerSource: Send {
    async fn next_trigger(&mut self) -> Option<Trigger>;
}

/// Next occurrence of `at` strictly after `now`
pub fn next_fire(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

/// Fires once a day at a local time of day
#[derive(Debug, Clone)]
pub struct DailyTrigger {
    at: NaiveTime,
}

impl DailyTrigger {
    /// Trigger at `at`, local time
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }
}

#[async_trait]
impl TriggerSource for DailyTrigger {
    async fn next_trigger(&mut self) -> Option<Trigger> {
        let now = Local::now();
        let fire = next_fire(now.naive_local(), self.at);
        // DST gaps: fall back to the naive difference
        let wait = Local
            .from_local_datetime(&fire)
            .earliest()
            .map(|at| at.signed_duration_since(now))
            .unwrap_or_else(|| fire - now.naive_local())
            .to_std()
            .unwrap_or_default();

        info!(next_run = %fire, wait_secs = wait.as_secs(), "waiting for scheduled run");
        tokio::time::sleep(wait).await;
        Some(Trigger {
            as_of: fire.date(),
        })
    }
}

/// Triggers pushed through a channel; ends when every sender is dropped
#[derive(Debug)]
pub struct ChannelTrigger {
    receiver: mpsc::Receiver<Trigger>,
}

impl ChannelTrigger {
    /// Create a trigger source and the sender that feeds it
    pub fn new(buffer: usize) -> (mpsc::Sender<Trigger>, Self) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (sender, Self { receiver })
    }
}

#[async_trait]
impl TriggerSource for ChannelTrigger {
    async fn next_trigger(&mut self) -> Option<Trigger> {
        self.receiver.recv().await
    }
}

/// Outcome counts of a schedule loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Sequences pipeline runs against a freshly acquired store
#[derive(Debug, Clone)]
pub struct Orchestrator<C: StoreConnector, M: RegressionModel> {
    connector: C,
    pipeline: Pipeline<M>,
}

impl<C: StoreConnector, M: RegressionModel> Orchestrator<C, M> {
    /// Create an orchestrator
    pub fn new(connector: C, pipeline: Pipeline<M>) -> Self {
        Self {
            connector,
            pipeline,
        }
    }

    /// The store connector
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Execute the pipeline once. The store is closed on every exit path.
    pub async fn run_once(&self, as_of: NaiveDate) -> Result<RunSummary> {
        let store = self
            .pipeline
            .retry_policy()
            .run("connect", || self.connector.connect())
            .await
            .map_err(|err| {
                error!(%as_of, kind = err.kind(), error = %err, "could not open store");
                err
            })?;
        let result = self.pipeline.run(&store, as_of).await;
        store.close().await;

        if let Err(err) = &result {
            error!(%as_of, kind = err.kind(), error = %err, "pipeline run failed");
        }
        result
    }

    /// Run on every trigger until the source is exhausted.
    ///
    /// A failed run is logged and the loop waits for the next trigger.
    pub async fn run_on_schedule<T: TriggerSource>(&self, triggers: &mut T) -> ScheduleReport {
        let mut report = ScheduleReport::default();
        while let Some(trigger) = triggers.next_trigger().await {
            match self.run_once(trigger.as_of).await {
                Ok(_) => report.succeeded += 1,
                Err(_) => report.failed += 1,
            }
        }
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "trigger source closed, schedule stopped"
        );
        report
    }
}
