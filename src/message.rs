//! Typed IRC line tokenizer.
//!
//! An IRC line is `[":" prefix] command [params...] [":" trailing]`. Parsing
//! is total: any input tokenizes into an [`IrcMessage`] (an empty line yields
//! an empty command), so a malformed line can never fault the dispatcher.

use std::fmt;

/// A tokenized IRC line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessage {
    /// Sender prefix, without the leading `:`. Absent on lines the server
    /// sends about itself without attribution.
    pub prefix: Option<String>,
    /// Command word (`PRIVMSG`, `PING`, ...) or three-digit numeric reply
    /// code, kept as a string (`"353"`, `"376"`, ...).
    pub command: String,
    /// Middle parameters, in order.
    pub params: Vec<String>,
    /// Trailing parameter, without the leading `:`. May contain spaces and
    /// further colons.
    pub trailing: Option<String>,
}

impl IrcMessage {
    /// Tokenize one line (terminator already stripped).
    pub fn parse(line: &str) -> Self {
        let mut rest = line;
        let mut prefix = None;

        if let Some(after) = rest.strip_prefix(':') {
            match after.split_once(' ') {
                Some((p, tail)) => {
                    prefix = Some(p.to_string());
                    rest = tail;
                }
                None => {
                    prefix = Some(after.to_string());
                    rest = "";
                }
            }
        }

        let mut command = String::new();
        let mut params = Vec::new();
        let mut trailing = None;

        let mut first = true;
        while !rest.is_empty() {
            if !first {
                if let Some(t) = rest.strip_prefix(':') {
                    trailing = Some(t.to_string());
                    break;
                }
            }
            let token = match rest.split_once(' ') {
                Some((tok, tail)) => {
                    rest = tail;
                    tok
                }
                None => {
                    let tok = rest;
                    rest = "";
                    tok
                }
            };
            if token.is_empty() {
                continue;
            }
            if first {
                command = token.to_string();
                first = false;
            } else {
                params.push(token.to_string());
            }
        }

        IrcMessage {
            prefix,
            command,
            params,
            trailing,
        }
    }

    /// The nickname part of the prefix: everything before `!`, or the whole
    /// prefix for server names.
    pub fn source_nick(&self) -> Option<&str> {
        self.prefix
            .as_deref()
            .map(|p| p.split('!').next().unwrap_or(p))
    }
}

impl fmt::Display for IrcMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        write!(f, "{}", self.command)?;
        for param in &self.params {
            write!(f, " {}", param)?;
        }
        if let Some(trailing) = &self.trailing {
            write!(f, " :{}", trailing)?;
        }
        Ok(())
    }
}
