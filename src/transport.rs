//! Stream-to-line framing over TCP.
//!
//! [`LineCodec`] turns the raw byte stream into discrete `\r\n`-delimited
//! lines; [`spawn_transport`] owns the socket and runs one reader and one
//! writer task, forwarding framed lines to the session's event channel. The
//! transport has no protocol knowledge.

use std::io;

use bytes::{Buf, BufMut, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::{Decoder, Encoder, FramedRead, FramedWrite};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::event::{NetworkId, SessionEvent};

/// Ceiling on how many bytes may accumulate without a line terminator
/// before the stream is considered broken. Orders of magnitude above any
/// real IRC line; this only bounds memory against a peer that never sends
/// `\r\n`.
pub const MAX_LINE_LEN: usize = 1 << 20;

/// Frames `\r\n`-terminated lines, decoding bytes one-byte-per-character.
///
/// Byte decoding never fails: bytes above 0x7F map to the corresponding
/// Latin-1 code points, so binary garbage degrades to odd characters rather
/// than a stream error. A partial trailing line stays buffered until more
/// bytes arrive; a bare `\r\n` is a valid zero-length line. The only decode
/// error is [`MAX_LINE_LEN`] bytes arriving with no terminator, which ends
/// the read loop like any other read error.
pub struct LineCodec;

impl Decoder for LineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        let Some(pos) = src.windows(2).position(|w| w == b"\r\n") else {
            if src.len() > MAX_LINE_LEN {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "line exceeds maximum length",
                ));
            }
            return Ok(None);
        };
        let line = src.split_to(pos);
        src.advance(2);
        Ok(Some(line.iter().map(|&b| b as char).collect()))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        // An unterminated partial line at EOF is dropped, not delivered.
        src.clear();
        Ok(None)
    }
}

impl Encoder<String> for LineCodec {
    type Error = io::Error;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), io::Error> {
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Handle to a live connection's writer and teardown paths.
///
/// Dropping the handle tears the connection down the same way
/// [`shutdown`](Self::shutdown) does.
pub struct LineTransport {
    write_tx: mpsc::UnboundedSender<String>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl LineTransport {
    /// Queue one line for sending; the terminator is appended by the codec.
    /// Fire-and-forget: completion is not observable, and writes after the
    /// connection died are silently dropped.
    pub fn write_line(&self, line: &str) {
        let _ = self.write_tx.send(line.to_string());
    }

    /// Tear down the socket. Idempotent; the disconnect notification still
    /// fires exactly once, from the reader task's single exit point.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }

    /// Transport backed by a bare channel instead of a socket, for dispatcher
    /// tests that want to observe written lines.
    #[cfg(test)]
    pub(crate) fn stub() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        (
            Self {
                write_tx,
                shutdown: None,
            },
            write_rx,
        )
    }
}

/// Connect to `host:port` and spawn the reader/writer tasks.
///
/// On success a [`SessionEvent::Connected`] is queued immediately and every
/// complete received line follows as [`SessionEvent::Line`], in arrival
/// order. The reader task ends on read error, peer close, or shutdown, and
/// sends [`SessionEvent::Disconnected`] exactly once on its way out. Connect
/// failure is returned to the caller; there is no retry here.
pub async fn spawn_transport(
    network_id: NetworkId,
    generation: u64,
    host: &str,
    port: u16,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
) -> Result<LineTransport, TransportError> {
    let stream = TcpStream::connect((host, port))
        .await
        .map_err(|source| TransportError::Connect {
            host: host.to_string(),
            port,
            source,
        })?;
    debug!(network_id, host, port, "connected");

    let (read_half, write_half) = stream.into_split();
    let mut reader = FramedRead::new(read_half, LineCodec);
    let mut writer = FramedWrite::new(write_half, LineCodec);

    let (write_tx, mut write_rx) = mpsc::unbounded_channel::<String>();
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    let _ = event_tx.send(SessionEvent::Connected {
        network_id,
        generation,
    });

    tokio::spawn(async move {
        while let Some(line) = write_rx.recv().await {
            if let Err(e) = writer.send(line).await {
                warn!(network_id, error = %e, "write failed");
                break;
            }
        }
    });

    tokio::spawn(async move {
        let reason = loop {
            tokio::select! {
                _ = &mut shutdown_rx => break "closed by client".to_string(),
                next = reader.next() => match next {
                    Some(Ok(line)) => {
                        if event_tx
                            .send(SessionEvent::Line {
                                network_id,
                                generation,
                                line,
                            })
                            .is_err()
                        {
                            break "event consumer gone".to_string();
                        }
                    }
                    Some(Err(e)) => {
                        warn!(network_id, error = %e, "read failed");
                        break e.to_string();
                    }
                    None => break "connection closed".to_string(),
                },
            }
        };
        // Single exit point: the one place Disconnected is ever sent.
        debug!(network_id, %reason, "transport down");
        let _ = event_tx.send(SessionEvent::Disconnected {
            network_id,
            generation,
            reason,
        });
    });

    Ok(LineTransport {
        write_tx,
        shutdown: Some(shutdown_tx),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn decode_all(codec: &mut LineCodec, buf: &mut BytesMut) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(line) = codec.decode(buf).unwrap() {
            out.push(line);
        }
        out
    }

    #[test]
    fn test_codec_lines_split_across_chunks() {
        let mut codec = LineCodec;
        let mut buf = BytesMut::new();

        buf.extend_from_slice(b"NICK f");
        assert!(decode_all(&mut codec, &mut buf).is_empty());

        buf.extend_from_slice(b"oo\r\nJOIN #");
        assert_eq!(decode_all(&mut codec, &mut buf), vec!["NICK foo"]);

        buf.extend_from_slice(b"bar\r\n");
        assert_eq!(decode_all(&mut codec, &mut buf), vec!["JOIN #bar"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_codec_many_lines_in_one_read() {
        let mut codec = LineCodec;
        let mut buf = BytesMut::from(&b"a\r\nb\r\n\r\nc\r\ntail"[..]);
        assert_eq!(decode_all(&mut codec, &mut buf), vec!["a", "b", "", "c"]);
        // Partial line stays buffered.
        assert_eq!(&buf[..], b"tail");
    }

    #[test]
    fn test_codec_terminator_split_between_reads() {
        let mut codec = LineCodec;
        let mut buf = BytesMut::from(&b"PING :x\r"[..]);
        assert!(decode_all(&mut codec, &mut buf).is_empty());
        buf.extend_from_slice(b"\n");
        assert_eq!(decode_all(&mut codec, &mut buf), vec!["PING :x"]);
    }

    #[test]
    fn test_codec_high_bytes_decode_losslessly() {
        let mut codec = LineCodec;
        let mut buf = BytesMut::from(&b"caf\xe9\r\n"[..]);
        assert_eq!(decode_all(&mut codec, &mut buf), vec!["caf\u{e9}"]);
    }

    #[test]
    fn test_codec_eof_drops_partial() {
        let mut codec = LineCodec;
        let mut buf = BytesMut::from(&b"done\r\nhalf a li"[..]);
        assert_eq!(codec.decode_eof(&mut buf).unwrap().as_deref(), Some("done"));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_codec_unterminated_flood_is_a_read_error() {
        let mut codec = LineCodec;
        let mut buf = BytesMut::new();
        buf.resize(MAX_LINE_LEN, b'a');
        // At the cap with no terminator: still just waiting for more bytes.
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"aa");
        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn test_codec_encode_appends_terminator() {
        let mut codec = LineCodec;
        let mut buf = BytesMut::new();
        codec.encode("NICK foo".to_string(), &mut buf).unwrap();
        codec.encode(String::new(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"NICK foo\r\n\r\n");
    }

    #[tokio::test]
    async fn test_transport_round_trip_and_single_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(b"NICK f").await.unwrap();
            sock.write_all(b"oo\r\nJOIN #").await.unwrap();
            sock.write_all(b"bar\r\n").await.unwrap();

            let mut buf = vec![0u8; 64];
            let n = sock.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"PONG :x\r\n");
        });

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let mut transport = spawn_transport(7, 1, "127.0.0.1", addr.port(), event_tx)
            .await
            .unwrap();

        assert!(matches!(
            event_rx.recv().await,
            Some(SessionEvent::Connected {
                network_id: 7,
                generation: 1,
            })
        ));
        let mut lines = Vec::new();
        for _ in 0..2 {
            match event_rx.recv().await {
                Some(SessionEvent::Line { line, .. }) => lines.push(line),
                other => panic!("expected line, got {:?}", other),
            }
        }
        assert_eq!(lines, vec!["NICK foo", "JOIN #bar"]);

        transport.write_line("PONG :x");
        server.await.unwrap();

        transport.shutdown();
        transport.shutdown(); // second call is a no-op

        // Exactly one Disconnected, then the channel closes.
        assert!(matches!(
            event_rx.recv().await,
            Some(SessionEvent::Disconnected {
                network_id: 7,
                generation: 1,
                ..
            })
        ));
        assert!(event_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_transport_peer_close_disconnects_once() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(b"one\r\npartial tail").await.unwrap();
            // Drop the socket: abrupt close with an unterminated line pending.
        });

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let _transport = spawn_transport(0, 1, "127.0.0.1", addr.port(), event_tx)
            .await
            .unwrap();

        assert!(matches!(
            event_rx.recv().await,
            Some(SessionEvent::Connected { .. })
        ));
        match event_rx.recv().await {
            Some(SessionEvent::Line { line, .. }) => assert_eq!(line, "one"),
            other => panic!("expected line, got {:?}", other),
        }
        assert!(matches!(
            event_rx.recv().await,
            Some(SessionEvent::Disconnected { .. })
        ));
        assert!(event_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported() {
        // Bind then drop to get a port nothing is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let result = spawn_transport(0, 1, "127.0.0.1", port, event_tx).await;
        assert!(matches!(result, Err(TransportError::Connect { .. })));
        assert!(event_rx.recv().await.is_none());
    }
}
