//! Load, query and resource benchmarking harness for the call-center API.
//!
//! Three independent pipelines live here:
//!
//! - [`load`]: authenticated virtual users hammering HTTP scenarios tier by tier,
//! - [`query`]: sequential latency probes against a [`query::RecordStore`],
//! - [`monitor`]: periodic host/process sampling into a monitoring session.
//!
//! [`report`] turns their measurements into summaries, recommendations and JSON artifacts.

mod clock;
mod error;
mod progress;

pub mod load;
pub mod monitor;
pub mod query;
pub mod report;

pub use error::{Error, Result};
pub use progress::{ProgressEvent, ProgressFn};
