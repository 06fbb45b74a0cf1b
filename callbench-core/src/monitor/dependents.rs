use std::collections::BTreeMap;
use std::future::Future;

use super::SamplingError;
use crate::query::{CountQuery, Filter, RecordStore};

/// Best-effort snapshot of a system the monitored service depends on.
pub trait DependentSource: Send + Sync + 'static {
    fn snapshot(
        &self,
    ) -> impl Future<Output = Result<BTreeMap<String, u64>, SamplingError>> + Send;
}

/// Placeholder source for samplers without dependents; never polled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDependents;

impl DependentSource for NoDependents {
    async fn snapshot(&self) -> Result<BTreeMap<String, u64>, SamplingError> {
        Ok(BTreeMap::new())
    }
}

/// Record counts of a fixed set of collections.
#[derive(Debug, Clone)]
pub struct StoreCounts<S> {
    store: S,
    collections: Vec<String>,
}

impl<S> StoreCounts<S> {
    pub const CALL_CENTER: &'static [&'static str] = &["accounts", "calls", "orders"];

    pub fn new(store: S, collections: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            store,
            collections: collections.into_iter().map(Into::into).collect(),
        }
    }

    pub fn call_center(store: S) -> Self {
        Self::new(store, Self::CALL_CENTER.iter().copied())
    }
}

impl<S: RecordStore + 'static> DependentSource for StoreCounts<S> {
    async fn snapshot(&self) -> Result<BTreeMap<String, u64>, SamplingError> {
        let mut counts = BTreeMap::new();
        for collection in &self.collections {
            let n = self
                .store
                .count(&CountQuery {
                    collection: collection.clone(),
                    filter: Filter::all(),
                })
                .await?;
            counts.insert(collection.clone(), n);
        }
        Ok(counts)
    }
}
