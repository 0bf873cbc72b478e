//! Fixed-cadence trigger for a `PipelineRunner`.
//!
//! Ticks fire at `start + k * interval`. Each tick derives its run id from the
//! tick's UTC time and runs the pipeline on the calling thread, so ticks never
//! overlap: ticks whose time passed while a run was still going are skipped.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

use sluice_core::id::RunId;
use sluice_core::manifest::RunState;

use crate::cancel::CancelToken;
use crate::error::PipelineError;
use crate::runner::PipelineRunner;

pub const DAILY: Duration = Duration::from_secs(24 * 60 * 60);

/// What happened on one tick.
#[derive(Debug, Clone)]
pub struct TickSummary {
    pub run_id: RunId,
    /// Terminal state, or `None` when the tick was rejected before running.
    pub state: Option<RunState>,
    pub error: Option<String>,
}

pub struct CadenceScheduler {
    interval: Duration,
    max_ticks: Option<u64>,
    start: Option<DateTime<Utc>>,
}

impl Default for CadenceScheduler {
    fn default() -> Self {
        Self::new(DAILY)
    }
}

impl CadenceScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            max_ticks: None,
            start: None,
        }
    }

    /// Stop after this many ticks have fired.
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// Time of tick zero; defaults to the moment `run` is called.
    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// Run id for a tick at `at`.
    pub fn run_id_for(&self, at: DateTime<Utc>) -> Result<RunId, PipelineError> {
        let format = if self.interval.subsec_nanos() == 0 {
            SecondsFormat::Secs
        } else {
            SecondsFormat::Millis
        };
        Ok(RunId::new(at.to_rfc3339_opts(format, true))?)
    }

    /// Fire ticks until `cancel` fires or `max_ticks` is reached.
    pub fn run(&self, runner: &PipelineRunner, cancel: &CancelToken) -> Vec<TickSummary> {
        let start = self.start.unwrap_or_else(Utc::now);
        let step = match chrono::Duration::from_std(self.interval) {
            Ok(step) => step,
            Err(e) => {
                tracing::error!(error = %e, "scheduler interval out of range");
                return Vec::new();
            }
        };

        let mut summaries = Vec::new();
        let mut next = start;
        while self.max_ticks.map_or(true, |max| (summaries.len() as u64) < max) {
            let now = Utc::now();
            if next > now {
                let wait = (next - now).to_std().unwrap_or_default();
                if cancel.wait_timeout(wait) {
                    break;
                }
            }
            if cancel.is_cancelled() {
                break;
            }

            let tick = next;
            next = tick + step;
            // do not queue up ticks that passed during a long run
            let now = Utc::now();
            while next <= now {
                tracing::warn!(skipped = %next.to_rfc3339_opts(SecondsFormat::Secs, true), "tick skipped, previous run overran");
                next += step;
            }

            let run_id = match self.run_id_for(tick) {
                Ok(id) => id,
                Err(e) => {
                    tracing::error!(error = %e, "cannot derive run id");
                    break;
                }
            };
            tracing::info!(run_id = %run_id, pipeline = %runner.definition().name(), "tick");
            let summary = match runner.run(&run_id, cancel) {
                Ok(manifest) => TickSummary {
                    run_id,
                    state: Some(manifest.state),
                    error: None,
                },
                Err(PipelineError::AlreadyRunning { active }) => {
                    tracing::warn!(run_id = %run_id, active = %active, "tick skipped, run in progress");
                    TickSummary {
                        run_id,
                        state: None,
                        error: Some(format!("run {active} is still in progress")),
                    }
                }
                Err(e) => {
                    let state = runner.manifest(&run_id).ok().map(|m| m.state);
                    TickSummary {
                        run_id,
                        state,
                        error: Some(e.to_string()),
                    }
                }
            };
            summaries.push(summary);
        }
        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn run_ids_use_second_precision_for_whole_second_intervals() {
        let at = Utc.with_ymd_and_hms(2023, 5, 9, 0, 0, 0).unwrap();
        let daily = CadenceScheduler::default();
        assert_eq!(daily.run_id_for(at).unwrap().as_str(), "2023-05-09T00:00:00Z");

        let fast = CadenceScheduler::new(Duration::from_millis(250));
        assert_eq!(fast.run_id_for(at).unwrap().as_str(), "2023-05-09T00:00:00.000Z");
    }
}
