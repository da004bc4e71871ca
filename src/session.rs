//! Per-network session: connection lifecycle and the line dispatcher.
//!
//! A [`NetworkSession`] owns one live transport at most, the ordered list of
//! channel buffers (index 0 is always the `Status` buffer), and the
//! registration state machine. All state mutation funnels through
//! [`handle_event`](NetworkSession::handle_event) and the explicit
//! connect/disconnect/write calls; the UI layer only reads.

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::{parse_server_addr, NetworkConfig};
use crate::error::TransportError;
use crate::event::{NetworkId, SessionEvent};
use crate::message::IrcMessage;
use crate::state::{Channel, STATUS_CHANNEL};
use crate::transport::{spawn_transport, LineTransport};

/// Connection lifecycle states.
///
/// `Registering` covers the window between the TCP connect and the
/// end-of-MOTD numeric; auto-join fires exactly once on the transition to
/// `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Registering,
    Ready,
}

pub struct NetworkSession {
    id: NetworkId,
    config: NetworkConfig,
    /// Current nickname; diverges from the configured one after 433
    /// collisions append underscores.
    nick: String,
    status: ConnectionStatus,
    channels: Vec<Channel>,
    transport: Option<LineTransport>,
    /// Bumped on every connect; events tagged with an older generation come
    /// from a superseded transport and are dropped, so a torn-down
    /// connection's queued events can never disturb its replacement.
    transport_generation: u64,
    /// "State changed, re-render" signal to the UI layer; bumped once per
    /// handled event, never batched.
    update_tx: mpsc::UnboundedSender<NetworkId>,
}

impl NetworkSession {
    pub fn new(
        id: NetworkId,
        config: NetworkConfig,
        update_tx: mpsc::UnboundedSender<NetworkId>,
    ) -> Self {
        let nick = config.nick.clone();
        Self {
            id,
            config,
            nick,
            status: ConnectionStatus::Disconnected,
            channels: vec![Channel::new(STATUS_CHANNEL)],
            transport: None,
            transport_generation: 0,
            update_tx,
        }
    }

    pub fn id(&self) -> NetworkId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// All buffers of this network, status buffer first, then channels in
    /// the order they were joined.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Look up a buffer by exact name. Case-sensitive, matching the rest of
    /// this design.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    pub fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| c.name == name)
    }

    /// The always-present status buffer.
    pub fn status_channel_mut(&mut self) -> &mut Channel {
        &mut self.channels[0]
    }

    /// Open the transport to the first configured address.
    ///
    /// Any previous transport is torn down first, so the session never holds
    /// two live connections. A connect failure leaves the session
    /// `Disconnected` and is returned to the caller; nothing retries here.
    pub async fn connect(&mut self, event_tx: mpsc::UnboundedSender<SessionEvent>) -> Result<()> {
        if let Some(mut old) = self.transport.take() {
            old.shutdown();
        }

        // TODO cycle through the remaining configured addresses on failure
        let addr = self
            .config
            .servers
            .first()
            .ok_or(TransportError::NoAddress)?;
        let (host, port) = parse_server_addr(addr);

        self.nick = self.config.nick.clone();
        self.status = ConnectionStatus::Connecting;
        self.transport_generation += 1;
        self.status_channel_mut()
            .add_line("status", &format!("Connecting to {}:{}...", host, port), None);

        match spawn_transport(self.id, self.transport_generation, &host, port, event_tx).await {
            Ok(transport) => {
                self.transport = Some(transport);
                Ok(())
            }
            Err(e) => {
                self.status = ConnectionStatus::Disconnected;
                self.status_channel_mut()
                    .add_line("status", &format!("Connection failed: {}", e), None);
                Err(e.into())
            }
        }
    }

    /// Send `QUIT` and close the transport. Safe to call at any time, in any
    /// state, repeatedly; the transport guarantees the disconnect
    /// notification fires at most once.
    pub fn disconnect(&mut self) {
        if self.transport.is_some() {
            self.write_line("QUIT :Bye");
        }
        if let Some(mut transport) = self.transport.take() {
            transport.shutdown();
        }
        self.status = ConnectionStatus::Disconnected;
    }

    /// Write one raw line to the server, echoing it to the status buffer
    /// with a `>` direction marker first.
    pub fn write_line(&mut self, line: &str) {
        self.channels[0].add_line("status", &format!("> {}", line), None);
        if let Some(transport) = &self.transport {
            transport.write_line(line);
        }
    }

    /// React to one transport event. Called from the owning event loop only;
    /// events for one network are always processed strictly in arrival
    /// order.
    pub fn handle_event(&mut self, event: SessionEvent) {
        if event.generation() != self.transport_generation {
            debug!(
                network_id = self.id,
                generation = event.generation(),
                "event from superseded transport dropped"
            );
            return;
        }
        match event {
            SessionEvent::Connected { .. } => {
                self.status = ConnectionStatus::Registering;
                let nick = self.nick.clone();
                self.write_line(&format!("NICK {}", nick));
                self.write_line(&format!("USER {} * * :{}", nick, nick));
            }
            SessionEvent::Line { line, .. } => {
                self.handle_line(&line);
            }
            SessionEvent::Disconnected { reason, .. } => {
                self.transport = None;
                self.status = ConnectionStatus::Disconnected;
                self.channels[0].add_line("status", &format!("Disconnected: {}", reason), None);
                // No automatic reconnect: a supervisor that wants one calls
                // connect() again from here.
            }
        }
        let _ = self.update_tx.send(self.id);
    }

    /// Dispatch one received line.
    ///
    /// The raw line is always echoed to the status buffer (with a `<`
    /// marker) before any interpretation, so unrecognized traffic is still
    /// auditable. Nothing in here is an error: unknown commands and lookups
    /// that miss are dropped silently.
    fn handle_line(&mut self, line: &str) {
        self.channels[0].add_line("status", &format!("< {}", line), None);

        let msg = IrcMessage::parse(line);
        match msg.command.as_str() {
            "PING" => {
                let token = msg
                    .trailing
                    .as_deref()
                    .or_else(|| msg.params.first().map(String::as_str))
                    .unwrap_or("");
                let reply = format!("PONG :{}", token);
                self.write_line(&reply);
            }

            // RPL_NAMREPLY: `353 <me> <symbol> <channel> :nick nick ...`
            "353" => {
                let Some(name) = msg.params.last() else {
                    return;
                };
                match self.channels.iter_mut().find(|c| c.name == *name) {
                    Some(chan) => {
                        let listed = msg.trailing.as_deref().unwrap_or("");
                        chan.nicks
                            .extend(listed.split_whitespace().map(str::to_string));
                    }
                    None => debug!(network_id = self.id, channel = %name, "names for unknown channel"),
                }
            }

            // MOTD start and body: reserved for future display.
            "375" | "372" => {}

            // End of MOTD (or no MOTD at all): registration is complete.
            "376" | "422" => {
                if self.status == ConnectionStatus::Registering {
                    self.status = ConnectionStatus::Ready;
                    for channel in self.config.channels.clone() {
                        self.write_line(&format!("JOIN {}", channel));
                    }
                }
            }

            // Nick in use: append an underscore and try again.
            "433" => {
                self.nick.push('_');
                let retry = format!("NICK {}", self.nick);
                self.write_line(&retry);
            }

            "JOIN" => {
                let name = msg
                    .params
                    .first()
                    .map(String::as_str)
                    .or(msg.trailing.as_deref());
                if let Some(name) = name {
                    if self.channel(name).is_none() {
                        self.channels.push(Channel::new(name));
                    }
                }
            }

            "PRIVMSG" => {
                let nick = msg.source_nick().unwrap_or("").to_string();
                if let (Some(target), Some(text)) = (msg.params.first(), msg.trailing.as_deref()) {
                    // Only JOIN creates buffers; a message for a target we
                    // don't track is dropped.
                    match self.channels.iter_mut().find(|c| c.name == *target) {
                        Some(chan) => chan.add_line(&nick, text, None),
                        None => {
                            debug!(network_id = self.id, target = %target, "privmsg for unknown buffer")
                        }
                    }
                }
            }

            "MODE" | "ERROR" => {}

            _ => {}
        }
    }
}
