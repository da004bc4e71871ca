//! Network configuration model.
//!
//! Derives `Serialize`/`Deserialize` for TOML persistence in the embedding
//! application; every optional field has a serde default so a partial table
//! works. The core reads this once, at connect time.

use serde::{Deserialize, Serialize};

/// Default IRC port (plain text; TLS is out of scope for this core).
pub const DEFAULT_PORT: u16 = 6667;

/// A named remote network: candidate addresses, nickname, auto-join channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
    /// Candidate `host:port` addresses, in preference order.
    #[serde(default)]
    pub servers: Vec<String>,
    #[serde(default = "default_nick")]
    pub nick: String,
    /// Channels to join once registration completes, in order.
    #[serde(default)]
    pub channels: Vec<String>,
}

fn default_nick() -> String {
    "ircline".to_string()
}

/// Parse a `host:port` address string.
///
/// Splits on the last `:`; a missing or unparseable port falls back to
/// [`DEFAULT_PORT`].
pub fn parse_server_addr(addr: &str) -> (String, u16) {
    if let Some(colon_pos) = addr.rfind(':') {
        let host = addr[..colon_pos].to_string();
        let port = addr[colon_pos + 1..].parse().unwrap_or(DEFAULT_PORT);
        (host, port)
    } else {
        (addr.to_string(), DEFAULT_PORT)
    }
}
