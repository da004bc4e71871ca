//! Events flowing from transport tasks to the session dispatcher.

pub type NetworkId = usize;

/// An event produced by a network's transport task.
///
/// All transports of a [`NetworkManager`](crate::NetworkManager) share one
/// unbounded channel of these; the `network_id` routes each event back to the
/// session that owns the transport. The `generation` identifies which of the
/// session's transports sent it: a reconnect supersedes the old transport,
/// whose queued events may still be in flight and must not be mistaken for
/// the replacement's.
#[derive(Debug)]
pub enum SessionEvent {
    /// The TCP connection is established; registration may begin.
    Connected {
        network_id: NetworkId,
        generation: u64,
    },

    /// One complete line received from the server, terminator stripped.
    Line {
        network_id: NetworkId,
        generation: u64,
        line: String,
    },

    /// The connection ended, whoever initiated it. Sent exactly once per
    /// transport.
    Disconnected {
        network_id: NetworkId,
        generation: u64,
        reason: String,
    },
}

impl SessionEvent {
    pub fn network_id(&self) -> NetworkId {
        match self {
            SessionEvent::Connected { network_id, .. } => *network_id,
            SessionEvent::Line { network_id, .. } => *network_id,
            SessionEvent::Disconnected { network_id, .. } => *network_id,
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            SessionEvent::Connected { generation, .. } => *generation,
            SessionEvent::Line { generation, .. } => *generation,
            SessionEvent::Disconnected { generation, .. } => *generation,
        }
    }
}
