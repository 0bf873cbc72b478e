//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use sluice_core::config::EngineConfig;
use sluice_core::dag::PipelineSpec;
use sluice_exec::PipelineRunner;
use sluice_io::{ArtifactStore, Document, DocumentSink, Error, InsertSummary, MemorySink, MemoryStorage};
use sluice_operators::{OpContext, Registry};
use sluice_planner::bind;

pub const SOURCE: &str = "tiktok_google_play_reviews.csv";
pub const DB: &str = "task_7_database";
pub const COLLECTION: &str = "tiktok_collection";

/// The two-row example: one row with an emoji and a missing `x`.
pub const EXAMPLE_CSV: &str = "at,content,x\n2023-01-02,Hi! 😀,\n2023-01-01,Bye.,5\n";

/// A fresh, not-yet-created directory under the system temp dir.
pub fn create_temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("sluice-it-{name}-{}", uuid::Uuid::new_v4()))
}

/// Review export with `rows` rows, timestamps deliberately out of order and
/// every seventh `content` left empty.
pub fn reviews_csv(rows: usize) -> String {
    let mut out = String::from("reviewId,userName,content,score,at\n");
    for i in 0..rows {
        let day = 1 + (i * 7919) % 28;
        let content = if i % 7 == 0 {
            String::new()
        } else {
            format!("\"Review {i}, great app! 👍🔥\"")
        };
        out.push_str(&format!(
            "r{i},user{i},{content},{},2023-02-{day:02} 10:{:02}:00\n",
            1 + i % 5,
            i % 60
        ));
    }
    out
}

/// Sink wrapper that can be switched off or made to fail halfway through a batch.
pub struct FlakySink {
    pub inner: MemorySink,
    down: AtomicBool,
    /// When non-zero: insert this many documents of the next batch, then fail.
    fail_after: AtomicUsize,
    pub calls: AtomicUsize,
}

impl FlakySink {
    pub fn new() -> Self {
        Self {
            inner: MemorySink::new(),
            down: AtomicBool::new(false),
            fail_after: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn fail_after(&self, n: usize) {
        self.fail_after.store(n, Ordering::SeqCst);
    }
}

impl DocumentSink for FlakySink {
    fn insert_many(&self, db: &str, coll: &str, docs: &[Document]) -> sluice_io::Result<InsertSummary> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(Error::Sink("connection refused".into()));
        }
        let partial = self.fail_after.swap(0, Ordering::SeqCst);
        if partial > 0 {
            self.inner.insert_many(db, coll, &docs[..partial.min(docs.len())])?;
            return Err(Error::Sink("connection reset mid-batch".into()));
        }
        self.inner.insert_many(db, coll, docs)
    }

    fn count(&self, db: &str, coll: &str) -> sluice_io::Result<u64> {
        self.inner.count(db, coll)
    }
}

/// In-memory runner plus handles on its source, artifacts and sink.
pub struct Harness {
    pub source: MemoryStorage,
    pub artifacts: ArtifactStore,
    pub sink: Arc<FlakySink>,
    pub runner: PipelineRunner,
}

impl Harness {
    pub fn stored(&self) -> u64 {
        self.sink.count(DB, COLLECTION).expect("count")
    }

    pub fn documents(&self) -> Vec<Document> {
        self.sink.inner.documents(DB, COLLECTION)
    }

    pub fn drop_source(&self, csv: &str) {
        self.source.insert(SOURCE, csv.as_bytes().to_vec());
    }
}

pub fn fast_config() -> EngineConfig {
    EngineConfig {
        poll_interval_ms: 5,
        gate_timeout_ms: Some(2_000),
        ..EngineConfig::default()
    }
}

pub fn harness_with(spec: PipelineSpec, registry: &Registry, cfg: EngineConfig) -> Harness {
    let ctx = OpContext {
        sentinel: cfg.sentinel.clone(),
    };
    let def = bind(spec, registry, &ctx).expect("bind pipeline");
    let source = MemoryStorage::new();
    let artifacts = ArtifactStore::new(Arc::new(MemoryStorage::new()));
    let sink = Arc::new(FlakySink::new());
    let runner = PipelineRunner::new(
        def,
        Arc::new(source.clone()),
        artifacts.clone(),
        sink.clone(),
        cfg,
    );
    Harness {
        source,
        artifacts,
        sink,
        runner,
    }
}

pub fn harness(cfg: EngineConfig) -> Harness {
    harness_with(sluice_planner::default_pipeline(), &Registry::builtin(), cfg)
}

/// Document with the dedup key removed.
pub fn without_id(mut doc: Document) -> Document {
    doc.remove("_id");
    doc
}
