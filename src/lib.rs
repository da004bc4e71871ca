//! Minimal IRC client core.
//!
//! This crate is the transport and state-machine half of an IRC client: it
//! frames a raw TCP byte stream into protocol lines, runs the registration
//! handshake, dispatches the small set of commands and numeric replies needed
//! for connect/join/names/privmsg/ping, and projects the results into named
//! channel buffers. Rendering and user-command parsing live in the embedding
//! application, which observes this crate's state and calls back into it.
//!
//! The embedding application owns the event loop: it creates an
//! [`SessionEvent`] channel, hands the sender to [`NetworkManager`] (which
//! passes it to each spawned transport), and feeds received events back into
//! [`NetworkManager::handle_event`]. Every handled server line bumps the
//! update channel so the UI knows to re-read state.

pub mod config;
pub mod error;
pub mod event;
pub mod manager;
pub mod message;
pub mod session;
pub mod state;
pub mod transport;

pub use crate::config::NetworkConfig;
pub use crate::error::TransportError;
pub use crate::event::{NetworkId, SessionEvent};
pub use crate::manager::NetworkManager;
pub use crate::message::IrcMessage;
pub use crate::session::{ConnectionStatus, NetworkSession};
pub use crate::state::{Channel, Message, STATUS_CHANNEL};
pub use crate::transport::{LineCodec, LineTransport, MAX_LINE_LEN};
