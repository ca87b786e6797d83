//! Host side of the WiFiPcap configuration handshake.
//!
//! The device boots into a line oriented console and prints a ready sentinel.
//! The host answers with one command line; the device applies it, prints an
//! ack sentinel and switches to raw pcap output. Only after the ack may the
//! stream be treated as opaque binary.

use chrono::{DateTime, Utc};
use log::{debug, info, trace, warn};
use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::time::Instant;

use crate::device::cancel::CancelToken;
use crate::models::config::CaptureConfig;
use crate::models::settings::ProtocolSettings;
use crate::protocol::command::build_command;
use crate::utils::error::HandshakeError;

/// Longest console line kept while waiting for a sentinel
const MAX_LINE_LEN: usize = 1024;

/// Opens the connection to the device
pub trait Connector {
    type Connection: Read + Write;

    /// Name used in logs and errors
    fn port_name(&self) -> &str;

    fn connect(&self) -> io::Result<Self::Connection>;
}

/// Handshake progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Connecting,
    AwaitingReady,
    Uploading,
    AwaitingAck,
    Streaming,
    Failed,
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            HandshakeState::Connecting => "connecting",
            HandshakeState::AwaitingReady => "waiting for the device to get ready",
            HandshakeState::Uploading => "uploading options",
            HandshakeState::AwaitingAck => "waiting for the device to apply options",
            HandshakeState::Streaming => "streaming",
            HandshakeState::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// A connection that has completed the handshake.
///
/// Bytes the device sent right after the ack line may already sit in the read
/// buffer; reading from this type returns them first.
pub struct ReadyStream<C> {
    reader: BufReader<C>,
}

impl<C> ReadyStream<C> {
    /// Capture bytes received together with the ack line
    pub fn buffered(&self) -> &[u8] {
        self.reader.buffer()
    }

    pub fn get_ref(&self) -> &C {
        self.reader.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut C {
        self.reader.get_mut()
    }
}

impl<C: Read> Read for ReadyStream<C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

/// Drives one handshake. Not reusable after it reaches `Streaming` or `Failed`.
pub struct Handshake<'a> {
    settings: &'a ProtocolSettings,
    cancel: CancelToken,
    clock: fn() -> DateTime<Utc>,
    state: HandshakeState,
}

impl<'a> Handshake<'a> {
    pub fn new(settings: &'a ProtocolSettings, cancel: CancelToken) -> Self {
        Self {
            settings,
            cancel,
            clock: Utc::now,
            state: HandshakeState::Connecting,
        }
    }

    /// Use another time source for the time sync field
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Open the connection and upload `config` over it.
    pub fn establish<K: Connector>(
        &mut self,
        connector: &K,
        config: CaptureConfig,
    ) -> Result<ReadyStream<K::Connection>, HandshakeError> {
        self.transition(HandshakeState::Connecting);
        if self.cancel.is_cancelled() {
            return Err(self.fail(HandshakeError::Interrupted(self.state)));
        }

        let connection = match connector.connect() {
            Ok(connection) => connection,
            Err(source) => {
                return Err(self.fail(HandshakeError::PortOpen {
                    port: connector.port_name().to_string(),
                    source,
                }))
            }
        };
        info!("Connected to serial port: \"{}\"", connector.port_name());

        self.negotiate(connection, config)
    }

    /// Upload `config` over an already open connection.
    ///
    /// On failure the connection is dropped; it is in an unknown protocol state.
    pub fn negotiate<C: Read + Write>(
        &mut self,
        connection: C,
        config: CaptureConfig,
    ) -> Result<ReadyStream<C>, HandshakeError> {
        let mut reader = BufReader::new(connection);
        match self.exchange(&mut reader, config) {
            Ok(()) => {
                self.transition(HandshakeState::Streaming);
                info!("Stream started ...");
                Ok(ReadyStream { reader })
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn exchange<C: Read + Write>(
        &mut self,
        reader: &mut BufReader<C>,
        config: CaptureConfig,
    ) -> Result<(), HandshakeError> {
        let settings = self.settings;

        self.transition(HandshakeState::AwaitingReady);
        self.wait_for(reader, &settings.ready_sentinel)?;

        // Rendered only now so the time sync value is not stale
        self.transition(HandshakeState::Uploading);
        info!("Uploading options ...");
        let command = build_command(&config, (self.clock)());
        self.upload(reader.get_mut(), &command)?;

        self.transition(HandshakeState::AwaitingAck);
        self.wait_for(reader, &settings.ack_sentinel)
    }

    fn upload<W: Write>(&self, writer: &mut W, command: &str) -> Result<(), HandshakeError> {
        if self.cancel.is_cancelled() {
            return Err(HandshakeError::Interrupted(self.state));
        }
        writer
            .write_all(command.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|source| self.lost(source))?;
        info!("Device <- {:?}", command);
        Ok(())
    }

    /// Read lines until one contains `sentinel`.
    ///
    /// Port reads time out every poll interval so cancellation and the optional
    /// sentinel timeout get a chance to run; a partial line survives the timeout.
    fn wait_for<R: BufRead>(&self, reader: &mut R, sentinel: &str) -> Result<(), HandshakeError> {
        let started = Instant::now();
        let mut line = Vec::new();

        loop {
            if self.cancel.is_cancelled() {
                return Err(HandshakeError::Interrupted(self.state));
            }
            if let Some(limit) = self.settings.sentinel_timeout {
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    return Err(HandshakeError::Timeout {
                        stage: self.state,
                        elapsed,
                    });
                }
            }

            let room = (MAX_LINE_LEN - line.len()) as u64;
            match reader.by_ref().take(room).read_until(b'\n', &mut line) {
                Ok(0) => {
                    return Err(self.lost(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "device closed the connection",
                    )))
                }
                Ok(_) if line.len() >= MAX_LINE_LEN && line.last() != Some(&b'\n') => {
                    if contains(&line, sentinel) {
                        debug!("Sentinel {:?} seen in an unterminated line", sentinel);
                        return Ok(());
                    }
                    // Keep a tail so a sentinel split across the cut still matches
                    let keep = sentinel.len().saturating_sub(1).min(line.len());
                    warn!("Dropping {} bytes of device output without a line break", line.len() - keep);
                    line.drain(..line.len() - keep);
                }
                Ok(_) => {
                    let text = String::from_utf8_lossy(&line);
                    let text = text.trim_end_matches(&['\r', '\n'][..]);
                    info!("Device -> \"{}\"", text);
                    let found = text.contains(sentinel);
                    line.clear();
                    if found {
                        debug!("Sentinel {:?} seen", sentinel);
                        return Ok(());
                    }
                }
                Err(e) if is_poll_timeout(&e) => {
                    trace!("No data yet, still {}", self.state);
                }
                Err(e) => return Err(self.lost(e)),
            }
        }
    }

    fn lost(&self, source: io::Error) -> HandshakeError {
        HandshakeError::ConnectionLost {
            stage: self.state,
            source,
        }
    }

    fn fail(&mut self, err: HandshakeError) -> HandshakeError {
        debug!("Handshake failed: {}", err);
        self.transition(HandshakeState::Failed);
        err
    }

    fn transition(&mut self, next: HandshakeState) {
        if self.state != next {
            debug!("Handshake {:?} -> {:?}", self.state, next);
        }
        self.state = next;
    }
}

fn contains(haystack: &[u8], needle: &str) -> bool {
    let needle = needle.as_bytes();
    !needle.is_empty() && haystack.windows(needle.len()).any(|window| window == needle)
}

fn is_poll_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}
