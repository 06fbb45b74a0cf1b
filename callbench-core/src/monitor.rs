//! Periodic host, process and dependent-store sampling.

mod dependents;
mod probe;
mod sample;
mod sampler;
mod session;

pub use dependents::{DependentSource, NoDependents, StoreCounts};
pub use probe::HostProbe;
pub use sample::{DependentSnapshot, HostSnapshot, ProcessSnapshot, ResourceSample};
pub use sampler::ResourceSampler;
pub use session::{MonitoringSession, SessionState};

use crate::query::StoreError;

/// A single tick's partial failure. Absorbed into the sample, never fatal to the session.
#[derive(Debug, thiserror::Error)]
pub enum SamplingError {
    #[error("process statistics unavailable")]
    ProcessUnavailable,

    #[error("dependent store: {0}")]
    Store(#[from] StoreError),

    #[error("dependent snapshot failed: {0}")]
    Dependents(String),
}

#[cfg(test)]
pub(crate) use session::tests::sample as test_sample;
