//! Channel and message model.
//!
//! A [`Channel`] is an append-only log of timestamped, attributed lines plus
//! channel metadata (topic, member set). Buffers only ever grow in this
//! design: no scrollback cap, no member removal, no buffer deletion.

use chrono::Utc;
use std::collections::HashSet;

/// Name of the implicit per-network status buffer. Always present as the
/// first entry of a session's channel list.
pub const STATUS_CHANNEL: &str = "Status";

/// One line of conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    pub nick: String,
    pub text: String,
}

/// A conversation buffer: a channel, or the network's status log.
///
/// Names are matched case-sensitively, although IRC channel names are
/// conventionally case-insensitive.
#[derive(Debug)]
pub struct Channel {
    pub name: String,
    pub topic: Option<String>,
    /// Known members. Only ever grows: PART/KICK/QUIT are not handled.
    pub nicks: HashSet<String>,
    /// Chronological, append-only. Insertion order is display order.
    pub buffer: Vec<Message>,
    /// True once any line has been appended since the last acknowledgement.
    pub activity: bool,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            topic: None,
            nicks: HashSet::new(),
            buffer: Vec::new(),
            activity: false,
        }
    }

    /// Append one line of text, splitting embedded newlines into one
    /// [`Message`] per segment, all carrying the same timestamp and nick.
    ///
    /// `timestamp` defaults to now.
    pub fn add_line(&mut self, nick: &str, text: &str, timestamp: Option<i64>) {
        let ts = timestamp.unwrap_or_else(|| Utc::now().timestamp());
        for segment in text.split('\n') {
            self.buffer.push(Message {
                timestamp: ts,
                nick: nick.to_string(),
                text: segment.to_string(),
            });
        }
        self.activity = true;
    }

    /// [`add_line`](Self::add_line) applied per element, one shared timestamp.
    pub fn add_lines(&mut self, nick: &str, texts: &[String], timestamp: Option<i64>) {
        let ts = timestamp.unwrap_or_else(|| Utc::now().timestamp());
        for text in texts {
            self.add_line(nick, text, Some(ts));
        }
    }

    /// Clear the activity flag once the buffer has been viewed.
    pub fn acknowledge(&mut self) {
        self.activity = false;
    }
}
