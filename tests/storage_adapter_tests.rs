mod test_data_gen;

use std::sync::Arc;

use sluice_core::id::RunId;
use sluice_core::types::{RowBatch, Scalar};
use sluice_io::storage::build_storage;
use sluice_io::{ArtifactStore, Document, DocumentSink, Error, JsonlSink};
use test_data_gen::create_temp_dir;

fn batch() -> RowBatch {
    RowBatch::from_rows(
        &["created_date", "content"],
        vec![
            vec!["2023-01-01".into(), "Bye.".into()],
            vec!["2023-01-02".into(), Scalar::Null],
        ],
    )
    .expect("batch")
}

fn doc(id: &str) -> Document {
    let mut d = Document::new();
    d.insert("_id".into(), id.into());
    d.insert("content".into(), "x".into());
    d
}

#[test]
fn test_file_storage_builder_write_read() {
    let dir = create_temp_dir("fs");
    let storage = build_storage(&format!("file://{}", dir.display())).expect("fs storage");

    storage.write("nested/segment.csv", b"hello world").expect("write");
    assert!(storage.exists("nested/segment.csv").expect("exists"));
    assert_eq!(storage.read("nested/segment.csv").expect("read"), b"hello world");
    assert_eq!(storage.list("nested/").expect("list"), vec!["nested/segment.csv"]);

    storage.delete_prefix("nested/").expect("delete");
    assert!(!storage.exists("nested/segment.csv").expect("exists"));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_invalid_scheme_errors() {
    let err = build_storage("ftp://example.com/data").err().expect("should fail");
    assert!(err.to_string().contains("unsupported storage scheme"));
}

#[test]
fn test_missing_key_is_not_found() {
    let storage = build_storage("memory://").expect("memory storage");
    assert!(matches!(storage.read("absent.csv"), Err(Error::NotFound(_))));
}

#[test]
fn test_artifacts_on_disk_are_write_once_and_purgeable() {
    let dir = create_temp_dir("artifacts");
    let store = ArtifactStore::new(build_storage(&dir.to_string_lossy()).expect("storage"));
    let run = RunId::new("2023-05-09").expect("run id");

    let meta = store.put(&run, "sorted", &batch()).expect("put");
    assert_eq!(meta.rows, 2);
    assert_eq!(store.get(&run, "sorted").expect("get"), batch());
    assert!(matches!(
        store.put(&run, "sorted", &batch()),
        Err(Error::ArtifactExists { .. })
    ));

    // a file edited behind the store's back is detected
    let path = dir.join("2023-05-09").join("sorted.json");
    let text = std::fs::read_to_string(&path).expect("artifact file");
    std::fs::write(&path, text.replace("Bye.", "Hi!!")).expect("tamper");
    assert!(matches!(store.get(&run, "sorted"), Err(Error::Corrupt { .. })));

    store.purge_run(&run).expect("purge");
    assert!(store.list(&run).expect("list").is_empty());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_jsonl_sink_dedups_across_instances() {
    let dir = create_temp_dir("jsonl");
    let first = JsonlSink::new(&dir);
    let s = first
        .insert_many("db", "coll", &[doc("a"), doc("b")])
        .expect("insert");
    assert_eq!((s.inserted, s.duplicates), (2, 0));

    let reopened: Arc<dyn DocumentSink> = Arc::new(JsonlSink::new(&dir));
    let s = reopened
        .insert_many("db", "coll", &[doc("b"), doc("c"), doc("c")])
        .expect("insert");
    assert_eq!((s.inserted, s.duplicates), (1, 2));
    assert_eq!(reopened.count("db", "coll").expect("count"), 3);
    assert_eq!(reopened.count("db", "other").expect("count"), 0);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_jsonl_sink_rejects_documents_without_id() {
    let dir = create_temp_dir("jsonl-noid");
    let sink = JsonlSink::new(&dir);
    let mut bare = Document::new();
    bare.insert("content".into(), "x".into());
    assert!(sink.insert_many("db", "coll", &[doc("a"), bare]).is_err());
    assert_eq!(sink.count("db", "coll").expect("count"), 0);
    std::fs::remove_dir_all(&dir).ok();
}
