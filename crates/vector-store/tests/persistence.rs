use docmentor_vector_store::{Embedder, IndexManager, StorePaths, StubEmbedder, VectorStoreError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

async fn populated(dir: &std::path::Path) -> IndexManager {
    let embedder = StubEmbedder::new(24);
    let docs = [
        ("doc-a", "Ownership", vec!["moves transfer ownership", "borrows are references"]),
        ("doc-b", "Async", vec!["futures are lazy", "executors poll futures", "pin keeps data in place"]),
        ("doc-c", "Traits", vec!["traits describe shared behaviour"]),
    ];

    let mut manager = IndexManager::new(dir);
    for (id, title, texts) in docs {
        let refs: Vec<&str> = texts.clone();
        let vectors = embedder.embed_batch(&refs).await.expect("embed");
        let embedded = texts
            .into_iter()
            .map(ToString::to_string)
            .zip(vectors)
            .collect();
        let report = manager
            .insert_embedded(id, title, embedded)
            .await
            .expect("insert");
        assert!(report.persisted(), "{:?}", report.persist_error);
    }
    manager
}

#[tokio::test]
async fn reload_reproduces_search_results() {
    let tmp = TempDir::new().expect("tempdir");
    let manager = populated(tmp.path()).await;

    let mut reloaded = IndexManager::new(tmp.path());
    reloaded.load().await.expect("load");

    assert_eq!(reloaded.next_slot(), manager.next_slot());
    assert_eq!(reloaded.dimension(), manager.dimension());
    assert_eq!(reloaded.documents(), manager.documents());

    let embedder = StubEmbedder::new(24);
    for question in ["what do executors do?", "ownership", "unrelated"] {
        let query = embedder.embed(question).await.expect("embed query");
        let before = manager.search(&query, 4).expect("search before");
        let after = reloaded.search(&query, 4).expect("search after");
        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(&after) {
            assert_eq!(a.slot, b.slot);
            assert_eq!(a.text, b.text);
            assert!((a.score - b.score).abs() < 1e-6);
        }
    }
}

#[tokio::test]
async fn load_twice_keeps_next_slot() {
    let tmp = TempDir::new().expect("tempdir");
    populated(tmp.path()).await;

    let mut manager = IndexManager::new(tmp.path());
    manager.load().await.expect("first load");
    let first = manager.next_slot();
    manager.load().await.expect("second load");
    assert_eq!(manager.next_slot(), first);
    assert_eq!(first, 6);
}

#[tokio::test]
async fn slots_continue_after_reload() {
    let tmp = TempDir::new().expect("tempdir");
    populated(tmp.path()).await;

    let mut manager = IndexManager::new(tmp.path());
    manager.load().await.expect("load");
    let vector = StubEmbedder::new(24).embed("lifetimes").await.expect("embed");
    let report = manager
        .insert_embedded("doc-d", "Lifetimes", vec![("lifetimes".to_string(), vector)])
        .await
        .expect("insert");
    assert_eq!(report.first_slot, 6);
    assert_eq!(manager.next_slot(), 7);
    assert_eq!(manager.records().len(), manager.len());
}

#[tokio::test]
async fn model_change_is_caught_at_first_insert_after_reload() {
    let tmp = TempDir::new().expect("tempdir");
    populated(tmp.path()).await;

    let mut manager = IndexManager::new(tmp.path());
    manager.load().await.expect("load");
    let wrong = StubEmbedder::new(12).embed("new model").await.expect("embed");
    let err = manager
        .insert_embedded("doc-e", "New", vec![("new model".to_string(), wrong)])
        .await
        .expect_err("dimension change must fail");
    assert!(matches!(
        err,
        VectorStoreError::DimensionMismatch {
            expected: 24,
            actual: 12
        }
    ));
    assert_eq!(manager.len(), 6);
    assert_eq!(manager.records().len(), 6);
}

#[tokio::test]
async fn corrupt_artifacts_fail_loudly_and_leave_manager_empty() {
    let tmp = TempDir::new().expect("tempdir");
    populated(tmp.path()).await;
    let paths = StorePaths::new(tmp.path());
    tokio::fs::write(paths.records(), b"{ not json")
        .await
        .expect("clobber records");

    let mut manager = IndexManager::new(tmp.path());
    let err = manager.load().await.expect_err("corrupt load");
    assert!(err.is_persistence(), "{err}");
    assert!(manager.is_empty());
    assert!(manager.records().is_empty());
    assert_eq!(manager.next_slot(), 0);
    assert!(manager.search(&[0.0; 24], 3).expect("search").is_empty());
}

#[tokio::test]
async fn missing_vector_artifact_is_inconsistent() {
    let tmp = TempDir::new().expect("tempdir");
    populated(tmp.path()).await;
    let paths = StorePaths::new(tmp.path());
    tokio::fs::remove_file(paths.vectors())
        .await
        .expect("remove vectors");

    let mut manager = IndexManager::new(tmp.path());
    let err = manager.load().await.expect_err("half snapshot");
    assert!(matches!(err, VectorStoreError::Corrupt(_)), "{err}");
    assert!(manager.is_empty());
}

#[tokio::test]
async fn fresh_directory_loads_empty() {
    let tmp = TempDir::new().expect("tempdir");
    let mut manager = IndexManager::new(tmp.path().join("never-written"));
    manager.load().await.expect("load");
    assert!(manager.is_empty());
    assert_eq!(manager.dimension(), None);
    assert!(manager.search(&[1.0, 2.0], 3).expect("search").is_empty());
}

#[tokio::test]
async fn saved_empty_index_reloads_empty() {
    let tmp = TempDir::new().expect("tempdir");
    let mut manager = IndexManager::new(tmp.path());
    manager.save().await.expect("save empty");

    let mut reloaded = IndexManager::new(tmp.path());
    reloaded.load().await.expect("load");
    assert_eq!(reloaded.next_slot(), 0);
    assert_eq!(reloaded.dimension(), None);
}
