//! Sequential latency probes against a [`RecordStore`].

mod benchmark;
mod probe;
#[cfg(feature = "sqlite")]
mod sqlite;
mod store;

pub use benchmark::{QueryBenchmark, QueryMeasurement};
pub use probe::{ProbeOp, QueryProbe, call_center_probes};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
pub use store::{
    CmpOp, Condition, CountQuery, FieldValue, Filter, FindQuery, GroupQuery, InsertQuery,
    RecordStore, Sort, StoreError, validate_identifier,
};
