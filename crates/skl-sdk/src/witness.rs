//! Trusted-time witnesses over ledger states.

use chrono::Utc;
use skl_types::{Attestation, Digest, ErrorKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WitnessError {
    /// The timestamping service could not be reached. Callers may retry.
    #[error("timestamping service unavailable: {0}")]
    Unavailable(String),
}

impl WitnessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable(_) => ErrorKind::Dependency,
        }
    }
}

/// A timestamping collaborator. Called synchronously, without retries.
pub trait Witness: Send + Sync {
    fn witness(&self, state: &Digest) -> Result<Attestation, WitnessError>;
}

/// Attests with the local clock and an empty proof. For tests and local
/// tooling; it carries no third-party trust.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalClockWitness;

impl Witness for LocalClockWitness {
    fn witness(&self, state: &Digest) -> Result<Attestation, WitnessError> {
        Ok(Attestation::new(*state, Utc::now().timestamp_millis(), Vec::new()))
    }
}
