use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::Digest;

/// A trusted-time witness over a ledger state hash.
///
/// Produced by an external timestamping service. The proof bytes are opaque
/// here: they are stored and carried, never interpreted or computed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    /// The ledger state hash that was witnessed.
    pub state: Digest,
    /// Witnessed time, milliseconds since the UNIX epoch.
    pub utc_millis: i64,
    /// Service-specific proof material.
    pub proof: Vec<u8>,
}

impl Attestation {
    pub fn new(state: Digest, utc_millis: i64, proof: Vec<u8>) -> Self {
        Self {
            state,
            utc_millis,
            proof,
        }
    }

    pub fn witnessed_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.utc_millis).single()
    }
}
