#![allow(clippy::unwrap_used)]

use std::sync::Mutex;
use std::time::Duration;

use callbench_core::query::{
    CountQuery, Filter, FindQuery, GroupQuery, InsertQuery, ProbeOp, QueryBenchmark, QueryProbe,
    RecordStore, StoreError, call_center_probes,
};
use callbench_core::report::{QueryReport, ReportThresholds};

/// In-memory store with a small artificial latency; `broken` collections always fail.
struct FakeStore {
    broken: &'static str,
    calls: Mutex<Vec<String>>,
}

impl FakeStore {
    async fn hit(&self, collection: &str) -> Result<u64, StoreError> {
        self.calls.lock().unwrap().push(collection.to_string());
        tokio::time::sleep(Duration::from_millis(2)).await;
        if collection == self.broken {
            return Err(StoreError::Backend(format!("collection {collection} is offline")));
        }
        Ok(10)
    }
}

impl RecordStore for FakeStore {
    async fn count(&self, q: &CountQuery) -> Result<u64, StoreError> {
        self.hit(&q.collection).await
    }
    async fn find(&self, q: &FindQuery) -> Result<u64, StoreError> {
        self.hit(&q.collection).await
    }
    async fn group_count(&self, q: &GroupQuery) -> Result<u64, StoreError> {
        self.hit(&q.collection).await
    }
    async fn insert(&self, q: &InsertQuery) -> Result<(), StoreError> {
        self.hit(&q.collection).await.map(drop)
    }
}

fn count(name: &str, collection: &str) -> QueryProbe {
    QueryProbe::new(
        name,
        ProbeOp::Count(CountQuery {
            collection: collection.to_string(),
            filter: Filter::all(),
        }),
    )
    .iterations(3)
}

#[tokio::test]
async fn one_failing_probe_does_not_stop_its_siblings() {
    let store = FakeStore {
        broken: "orders",
        calls: Mutex::default(),
    };
    let probes = [
        count("calls", "calls"),
        count("orders", "orders"),
        count("accounts", "accounts"),
    ];

    let measurements = QueryBenchmark::new(&store).run(&probes).await.unwrap();

    assert_eq!(measurements.len(), 3);
    let failed: Vec<_> = measurements.iter().filter(|m| !m.success).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].name, "orders");
    assert_eq!(failed[0].avg_latency_ms, 0.0);
    assert_eq!(failed[0].min_latency_ms, 0.0);
    assert_eq!(failed[0].max_latency_ms, 0.0);
    assert!(failed[0].error.as_deref().unwrap().contains("offline"));

    for m in measurements.iter().filter(|m| m.success) {
        assert!(m.avg_latency_ms > 0.0, "{m:?}");
        assert_eq!(m.iterations, 3);
    }

    // Probes run in order, and the failing one stops after its first iteration.
    let calls = store.calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec!["calls", "calls", "calls", "orders", "accounts", "accounts", "accounts"]
    );

    let report = QueryReport::new(&measurements, &ReportThresholds::default());
    assert_eq!(report.failed, vec!["orders".to_string()]);
    assert_eq!(report.slowest.len(), 2);
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn call_center_catalog_runs_against_sqlite() {
    use callbench_core::query::SqliteStore;

    let store = SqliteStore::in_memory().await.unwrap();
    store.seed_demo(500, 42).await.unwrap();

    let probes = call_center_probes(2);
    let measurements = QueryBenchmark::new(&store).run(&probes).await.unwrap();

    assert_eq!(measurements.len(), probes.len());
    for m in &measurements {
        assert!(m.success, "{m:?}");
        assert!(m.min_latency_ms <= m.avg_latency_ms && m.avg_latency_ms <= m.max_latency_ms);
    }

    let by_name = |name: &str| measurements.iter().find(|m| m.name == name).unwrap();
    assert_eq!(by_name("calls_by_status").index_used, Some(true));
    assert_eq!(by_name("calls_by_direction_unindexed").index_used, Some(false));
    assert_eq!(by_name("orders_group_by_status").index_used, None);
    assert_eq!(by_name("calls_insert").iterations, 1);

    let report = QueryReport::new(&measurements, &ReportThresholds::default());
    assert!(
        report
            .full_scans
            .contains(&"calls_by_direction_unindexed".to_string())
    );
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn missing_schema_fails_every_probe_but_completes() {
    use callbench_core::query::SqliteStore;

    let store = SqliteStore::in_memory().await.unwrap();
    let measurements = QueryBenchmark::new(&store)
        .run(&call_center_probes(3))
        .await
        .unwrap();

    assert!(measurements.iter().all(|m| !m.success && m.error.is_some()));
}
