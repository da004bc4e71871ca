//! Error taxonomy.
//!
//! Only transport-level failures are typed errors. Protocol-shape anomalies
//! (malformed lines, unknown commands, lookups that miss) are never errors in
//! this design: they are absorbed by the dispatcher and observable only
//! through the Status buffer's raw log.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect to {host}:{port} failed")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("no server address configured")]
    NoAddress,
}
