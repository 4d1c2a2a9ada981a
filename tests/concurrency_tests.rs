//! Concurrency and thread safety tests for Nodescan

use std::sync::Arc;
use std::thread;

use nodescan::{
    BackendConfig, FetchState, FingerprintStore, InMemoryBackend, InvertedIndex, KvBackend,
    MemoryNodeStore, NodeRecord, NodescanConfig, RankConfig, Searcher, StoreConfig, StoreError,
    extract, pack,
};

#[test]
fn concurrent_extraction_is_identical() {
    let text = Arc::new("Concurrent extraction of the same note text".to_string());

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let text = Arc::clone(&text);
            thread::spawn(move || extract(&text))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let first = &results[0];
    for (i, result) in results.iter().enumerate().skip(1) {
        assert_eq!(first, result, "Thread {i} produced different fingerprints");
    }
}

#[test]
fn index_and_rank_on_many_threads() {
    let now = chrono::Utc::now();
    let records: Arc<Vec<NodeRecord>> = Arc::new(
        (0..40)
            .map(|i| {
                let text = format!("meeting notes {i} about the roadmap");
                NodeRecord::new(format!("n{i}"), now, Some(pack(&extract(&text), None).unwrap()))
            })
            .collect(),
    );
    let query = Arc::new(extract("roadmap"));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let records = Arc::clone(&records);
            let query = Arc::clone(&query);
            thread::spawn(move || {
                let index = InvertedIndex::build(records.as_ref().clone());
                index.rank(&query, &RankConfig::default()).len()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 40);
    }
}

#[test]
fn concurrent_cache_writers_on_one_handle() {
    let store = Arc::new(FingerprintStore::new(&StoreConfig::default()).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..25 {
                    let id = format!("t{t}-n{i}");
                    store.store_one(&id, &extract(&id)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let entries = store.load_all().unwrap();
    assert_eq!(entries.len(), 8 * 25);
    assert_eq!(store.ids().unwrap().len(), 8 * 25);
}

#[test]
fn separate_handles_tolerate_each_other() {
    // Two handles over one backend share no lock; an id written by one may
    // be missing from the other's list, but every listed id must load.
    let backend = Arc::new(InMemoryBackend::new());
    let handles: Vec<_> = (0..2)
        .map(|t| {
            let backend = Arc::clone(&backend);
            thread::spawn(move || {
                let store = FingerprintStore::with_backend("shared", Box::new(SharedBackend(backend)));
                for i in 0..20 {
                    let id = format!("h{t}-{i}");
                    store.store_one(&id, &extract(&id)).unwrap();
                }
                store.load_all().unwrap().len()
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap() >= 1);
    }
}

struct SharedBackend(Arc<InMemoryBackend>);

impl KvBackend for SharedBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.0.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.0.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.0.remove(key)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sessions_on_separate_controllers_run_in_parallel() {
    let store = Arc::new(MemoryNodeStore::new(3));
    let config = NodescanConfig {
        store: StoreConfig::default().with_backend(BackendConfig::in_memory()),
        ..NodescanConfig::default()
    };
    let writer = Searcher::new(store.clone(), &config).unwrap();
    for i in 0..12 {
        let topic = if i % 2 == 0 { "invoice" } else { "holiday" };
        writer
            .index_document(&format!("n{i}"), &format!("{topic} number {i}"))
            .await
            .unwrap();
    }

    let tasks: Vec<_> = ["invoice", "holiday"]
        .into_iter()
        .map(|query| {
            let store = store.clone();
            let config = config.clone();
            tokio::spawn(async move {
                let searcher = Searcher::new(store, &config).unwrap();
                let mut handle = searcher.search(query);
                handle.set_near_bottom(true);
                loop {
                    match handle.settled().await.unwrap() {
                        FetchState::Idle => {
                            handle.load_more();
                        }
                        _ => break,
                    }
                }
                handle.result_count()
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap(), 6);
    }
}
