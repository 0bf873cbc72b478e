//! The built-in review-cleaning pipeline.
//!
//! ```text
//! tiktok_google_play_reviews.csv
//!   └─ replace_null_values   (fill_nulls)       → tiktok_without_nulls
//!      └─ sort_by_created_date (temporal_sort)  → sorted_tiktok_without_nulls
//!         └─ clean_content_column (sanitize)    → sorted_tiktok_without_nulls_and_emojis
//!            └─ load → task_7_database.tiktok_collection
//! ```

use sluice_core::dag::{PipelineSpec, SinkSpec, SourceSpec, StageSpec};

pub const DEFAULT_PIPELINE_NAME: &str = "tiktok_processing";
pub const DEFAULT_SOURCE: &str = "tiktok_google_play_reviews.csv";

fn stage(name: &str, op: &str, input: &str, output: &str) -> StageSpec {
    StageSpec {
        name: name.to_string(),
        op: op.to_string(),
        inputs: vec![input.to_string()],
        output: output.to_string(),
        params: serde_json::Value::Null,
    }
}

pub fn default_pipeline() -> PipelineSpec {
    PipelineSpec {
        name: DEFAULT_PIPELINE_NAME.to_string(),
        source: SourceSpec {
            artifact: DEFAULT_SOURCE.to_string(),
            delimiter: ',',
        },
        stages: vec![
            stage(
                "replace_null_values",
                "fill_nulls",
                DEFAULT_SOURCE,
                "tiktok_without_nulls",
            ),
            stage(
                "sort_by_created_date",
                "temporal_sort",
                "tiktok_without_nulls",
                "sorted_tiktok_without_nulls",
            ),
            stage(
                "clean_content_column",
                "sanitize_content",
                "sorted_tiktok_without_nulls",
                "sorted_tiktok_without_nulls_and_emojis",
            ),
        ],
        final_artifact: None,
        sink: SinkSpec {
            database: "task_7_database".to_string(),
            collection: "tiktok_collection".to_string(),
        },
    }
}
