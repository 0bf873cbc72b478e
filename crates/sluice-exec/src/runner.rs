//! Pipeline runner: gate → ingest → stages → load, one run at a time.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use sluice_core::config::EngineConfig;
use sluice_core::id::RunId;
use sluice_core::manifest::{RunManifest, RunState, StageOutcome, StageStatus};
use sluice_io::readers::read_csv;
use sluice_io::storage::build_storage;
use sluice_io::{ArtifactStore, DocumentSink, JsonlSink, Storage};
use sluice_planner::PipelineDefinition;

use crate::cancel::CancelToken;
use crate::error::PipelineError;
use crate::gate::{ArrivalGate, GateOutcome};
use crate::loader::Loader;
use crate::metrics::emit_span;
use crate::runtime::Engine;

/// Name recorded for the source-ingest step in manifests and errors.
pub const INGEST_STAGE: &str = "ingest";

pub struct PipelineRunner {
    def: Arc<PipelineDefinition>,
    source: Arc<dyn Storage>,
    artifacts: ArtifactStore,
    sink: Arc<dyn DocumentSink>,
    cfg: EngineConfig,
    active: Mutex<Option<RunId>>,
}

/// Clears the single-flight slot when the run ends, however it ends.
struct ActiveRun<'a> {
    slot: &'a Mutex<Option<RunId>>,
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        *lock(self.slot) = None;
    }
}

fn lock(slot: &Mutex<Option<RunId>>) -> MutexGuard<'_, Option<RunId>> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Book-keeping for one attempt: current state plus the manifest in progress.
struct Attempt {
    manifest: RunManifest,
}

impl Attempt {
    fn advance(&mut self, next: RunState) -> Result<(), PipelineError> {
        let from = self.manifest.state;
        self.manifest.state = from.transition(next)?;
        tracing::info!(
            run_id = %self.manifest.run_id,
            pipeline = %self.manifest.pipeline,
            from = %from,
            state = %next,
            "run state"
        );
        Ok(())
    }
}

impl PipelineRunner {
    pub fn new(
        def: PipelineDefinition,
        source: Arc<dyn Storage>,
        artifacts: ArtifactStore,
        sink: Arc<dyn DocumentSink>,
        cfg: EngineConfig,
    ) -> Self {
        Self {
            def: Arc::new(def),
            source,
            artifacts,
            sink,
            cfg,
            active: Mutex::new(None),
        }
    }

    /// Runner over the directories named in `cfg`: filesystem source and
    /// artifact stores, JSONL sink.
    pub fn from_config(def: PipelineDefinition, cfg: EngineConfig) -> Result<Self, PipelineError> {
        let source = build_storage(&cfg.source_root)?;
        let artifacts = ArtifactStore::new(build_storage(&cfg.artifact_root)?);
        let sink: Arc<dyn DocumentSink> = Arc::new(JsonlSink::new(&cfg.sink_root));
        Ok(Self::new(def, source, artifacts, sink, cfg))
    }

    pub fn definition(&self) -> &PipelineDefinition {
        &self.def
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Run currently holding the single-flight slot.
    pub fn active_run(&self) -> Option<RunId> {
        lock(&self.active).clone()
    }

    /// Manifest of the most recent attempt of `run_id`.
    pub fn manifest(&self, run_id: &RunId) -> Result<RunManifest, PipelineError> {
        Ok(self.artifacts.get_manifest(run_id)?)
    }

    fn claim(&self, run_id: &RunId) -> Result<ActiveRun<'_>, PipelineError> {
        let mut slot = lock(&self.active);
        if let Some(active) = slot.as_ref() {
            tracing::warn!(run_id = %run_id, active = %active, "run rejected, another run is active");
            return Err(PipelineError::AlreadyRunning {
                active: active.to_string(),
            });
        }
        *slot = Some(run_id.clone());
        Ok(ActiveRun { slot: &self.active })
    }

    /// Execute one run of the pipeline.
    ///
    /// The run's artifact namespace is purged first, so re-running a run id
    /// starts clean. Every terminal outcome writes `_manifest.json` for the
    /// run; `Ok` carries the manifest of a `Succeeded` run.
    pub fn run(&self, run_id: &RunId, cancel: &CancelToken) -> Result<RunManifest, PipelineError> {
        let _active = self.claim(run_id)?;
        let spec = &self.def.spec;
        let mut attempt = Attempt {
            manifest: RunManifest::new(
                run_id.clone(),
                spec.name.clone(),
                self.def.plan_hash,
                now_millis(),
            ),
        };
        tracing::info!(run_id = %run_id, pipeline = %spec.name, state = %RunState::Waiting, "run started");

        self.artifacts.purge_run(run_id)?;

        let gate = ArrivalGate::new(self.source.clone());
        let waited = Instant::now();
        let outcome = gate.await_artifact(
            &spec.source.artifact,
            self.cfg.poll_interval(),
            self.cfg.gate_timeout(),
            cancel,
        );
        let err = match outcome {
            Ok(GateOutcome::Present) => None,
            Ok(GateOutcome::TimedOut) => Some((
                RunState::TimedOut,
                PipelineError::GateTimeout {
                    run_id: run_id.to_string(),
                    artifact: spec.source.artifact.clone(),
                    waited_ms: waited.elapsed().as_millis() as u64,
                },
            )),
            Ok(GateOutcome::Cancelled) => return self.cancelled(attempt),
            Err(e) => Some((RunState::Failed, PipelineError::Io(e.to_string()))),
        };
        if let Some((state, err)) = err {
            return self.finish_err(attempt, state, err);
        }
        attempt.advance(RunState::Running)?;

        let ingest_started = Instant::now();
        if let Err(cause) = self.ingest(run_id) {
            tracing::warn!(run_id = %run_id, stage = INGEST_STAGE, cause = %cause, "stage failed");
            attempt.manifest.stages.push(StageOutcome {
                stage: INGEST_STAGE.to_string(),
                output: spec.source.artifact.clone(),
                status: StageStatus::Failed {
                    cause: cause.clone(),
                },
                elapsed_ms: ingest_started.elapsed().as_millis() as u64,
            });
            attempt
                .manifest
                .stages
                .extend(self.def.order.iter().filter_map(|id| spec.stage(*id)).map(|s| StageOutcome {
                    stage: s.name.clone(),
                    output: s.output.clone(),
                    status: StageStatus::Skipped {
                        because: INGEST_STAGE.to_string(),
                    },
                    elapsed_ms: 0,
                }));
            let err = PipelineError::StageFailure {
                run_id: run_id.to_string(),
                stage: INGEST_STAGE.to_string(),
                cause,
            };
            return self.finish_err(attempt, RunState::Failed, err);
        }

        let stages = Engine::new(self.artifacts.clone()).run_stages(&self.def, run_id, cancel);
        attempt.manifest.stages.extend(stages.outcomes.iter().cloned());
        if stages.cancelled {
            return self.cancelled(attempt);
        }
        if let Some((stage, cause)) = stages.first_failure() {
            let err = PipelineError::StageFailure {
                run_id: run_id.to_string(),
                stage: stage.to_string(),
                cause: cause.to_string(),
            };
            return self.finish_err(attempt, RunState::Failed, err);
        }
        if !stages.all_succeeded() {
            let err = PipelineError::Invalid(format!("run {run_id}: not every stage succeeded"));
            return self.finish_err(attempt, RunState::Failed, err);
        }

        attempt.advance(RunState::Loading)?;
        self.load(attempt)
    }

    /// Re-run only the loader for `run_id`, using the final artifact retained
    /// by an earlier attempt.
    pub fn retry_load(&self, run_id: &RunId) -> Result<RunManifest, PipelineError> {
        let _active = self.claim(run_id)?;
        let final_artifact = self.def.final_artifact();
        if !self.artifacts.contains(run_id, final_artifact)? {
            return Err(PipelineError::Invalid(format!(
                "run {run_id} has no retained '{final_artifact}' to load"
            )));
        }

        let mut manifest = match self.artifacts.get_manifest(run_id) {
            Ok(previous) => previous,
            Err(sluice_io::Error::NotFound(_)) => RunManifest::new(
                run_id.clone(),
                self.def.name().to_string(),
                self.def.plan_hash,
                now_millis(),
            ),
            Err(e) => return Err(e.into()),
        };
        if manifest.plan_hash != self.def.plan_hash {
            return Err(PipelineError::Invalid(format!(
                "run {run_id} was produced by a different pipeline definition"
            )));
        }
        manifest.state = RunState::Loading;
        manifest.error = None;
        manifest.load = None;
        tracing::info!(run_id = %run_id, pipeline = %manifest.pipeline, state = %RunState::Loading, "retrying load");
        self.load(Attempt { manifest })
    }

    fn ingest(&self, run_id: &RunId) -> Result<(), String> {
        let source = &self.def.spec.source;
        let bytes = self
            .source
            .read(&source.artifact)
            .map_err(|e| e.to_string())?;
        let batch = read_csv(&bytes, source.delimiter).map_err(|e| e.to_string())?;
        let meta = self
            .artifacts
            .put(run_id, &source.artifact, &batch)
            .map_err(|e| e.to_string())?;
        tracing::info!(run_id = %run_id, stage = INGEST_STAGE, rows = meta.rows, "source ingested");
        emit_span(
            "ingest",
            &[("run_id", run_id.to_string()), ("rows", meta.rows.to_string())],
        );
        Ok(())
    }

    fn load(&self, mut attempt: Attempt) -> Result<RunManifest, PipelineError> {
        let run_id = attempt.manifest.run_id.clone();
        let final_artifact = self.def.final_artifact();
        let loader = Loader::new(self.sink.clone(), self.cfg.load_batch_size);
        match loader.load(&self.artifacts, &run_id, final_artifact, &self.def.spec.sink) {
            Ok(summary) => {
                attempt.manifest.load = Some(summary);
                attempt.manifest.outputs_digest = attempt
                    .manifest
                    .stages
                    .iter()
                    .find(|o| o.output == final_artifact)
                    .and_then(|o| match &o.status {
                        StageStatus::Succeeded { digest, .. } => Some(digest.clone()),
                        _ => None,
                    });
                attempt.advance(RunState::Succeeded)?;
                let manifest = attempt.manifest.finish(now_millis(), RunState::Succeeded);
                self.artifacts.put_manifest(&manifest)?;
                Ok(manifest)
            }
            Err(e) => {
                tracing::error!(run_id = %run_id, error = %e, "load failed");
                let err = PipelineError::LoadFailure {
                    run_id: run_id.to_string(),
                    cause: e.to_string(),
                };
                self.finish_err(attempt, RunState::Failed, err)
            }
        }
    }

    fn cancelled(&self, mut attempt: Attempt) -> Result<RunManifest, PipelineError> {
        let run_id = attempt.manifest.run_id.clone();
        self.artifacts.purge_run(&run_id)?;
        let err = PipelineError::Cancelled {
            run_id: run_id.to_string(),
        };
        attempt.advance(RunState::Cancelled)?;
        attempt.manifest.error = Some(err.to_string());
        let manifest = attempt.manifest.finish(now_millis(), RunState::Cancelled);
        self.artifacts.put_manifest(&manifest)?;
        Err(err)
    }

    fn finish_err(
        &self,
        mut attempt: Attempt,
        state: RunState,
        err: PipelineError,
    ) -> Result<RunManifest, PipelineError> {
        attempt.advance(state)?;
        tracing::warn!(run_id = %attempt.manifest.run_id, state = %state, error = %err, "run did not succeed");
        attempt.manifest.error = Some(err.to_string());
        let manifest = attempt.manifest.finish(now_millis(), state);
        if let Err(e) = self.artifacts.put_manifest(&manifest) {
            tracing::error!(run_id = %manifest.run_id, error = %e, "manifest write failed");
        }
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_io::{MemorySink, MemoryStorage};
    use sluice_operators::{OpContext, Registry};
    use sluice_planner::{bind, default_pipeline};

    const CSV: &str = "at,content,x\n2023-01-02,Hi! 😀,\n2023-01-01,Bye.,5\n";

    struct Fixture {
        source: MemoryStorage,
        sink: Arc<MemorySink>,
        runner: PipelineRunner,
    }

    fn fixture() -> Fixture {
        let def = bind(default_pipeline(), &Registry::builtin(), &OpContext::default()).unwrap();
        let source = MemoryStorage::new();
        let sink = Arc::new(MemorySink::new());
        let cfg = EngineConfig {
            poll_interval_ms: 5,
            gate_timeout_ms: Some(50),
            ..EngineConfig::default()
        };
        let runner = PipelineRunner::new(
            def,
            Arc::new(source.clone()),
            ArtifactStore::new(Arc::new(MemoryStorage::new())),
            sink.clone(),
            cfg,
        );
        Fixture {
            source,
            sink,
            runner,
        }
    }

    fn run_id(s: &str) -> RunId {
        RunId::new(s).unwrap()
    }

    #[test]
    fn happy_path_records_manifest_and_clears_slot() {
        let f = fixture();
        f.source
            .insert("tiktok_google_play_reviews.csv", CSV.as_bytes().to_vec());
        let manifest = f.runner.run(&run_id("r1"), &CancelToken::new()).unwrap();

        assert_eq!(manifest.state, RunState::Succeeded);
        assert_eq!(manifest.stages.len(), 3);
        assert_eq!(manifest.load.unwrap().inserted, 2);
        assert!(manifest.outputs_digest.is_some());
        assert!(f.runner.active_run().is_none());
        assert_eq!(f.sink.count("task_7_database", "tiktok_collection").unwrap(), 2);
        assert_eq!(f.runner.manifest(&run_id("r1")).unwrap().state, RunState::Succeeded);
    }

    #[test]
    fn unparseable_source_fails_ingest_and_skips_every_stage() {
        let f = fixture();
        f.source
            .insert("tiktok_google_play_reviews.csv", b"at,content\n1\n".to_vec());
        let err = f.runner.run(&run_id("r1"), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, PipelineError::StageFailure { ref stage, .. } if stage == INGEST_STAGE));

        let manifest = f.runner.manifest(&run_id("r1")).unwrap();
        assert_eq!(manifest.state, RunState::Failed);
        assert_eq!(manifest.stages.len(), 4);
        assert!(manifest.stages[1..]
            .iter()
            .all(|s| matches!(s.status, StageStatus::Skipped { .. })));
        assert_eq!(f.sink.count("task_7_database", "tiktok_collection").unwrap(), 0);
    }

    #[test]
    fn retry_load_without_artifacts_is_invalid() {
        let f = fixture();
        assert!(matches!(
            f.runner.retry_load(&run_id("never")),
            Err(PipelineError::Invalid(_))
        ));
    }

    #[test]
    fn a_second_claim_is_rejected_while_the_first_is_held() {
        let f = fixture();
        let held = f.runner.claim(&run_id("r1")).unwrap();
        let err = f.runner.run(&run_id("r2"), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, PipelineError::AlreadyRunning { ref active } if active == "r1"));
        drop(held);
        assert!(f.runner.active_run().is_none());
    }
}
