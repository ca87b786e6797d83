//! Raw relay of the capture stream to its consumer.
//!
//! Nothing here looks at the pcap bytes. Each chunk is flushed as soon as it
//! arrives so the viewer updates in real time.

use log::{info, trace, warn};
use std::io::{self, Read, Write};
use std::process::{Child, Command, Stdio};

use crate::device::cancel::CancelToken;
use crate::models::stats::RelayStats;
use crate::utils::error::RelayError;

/// Default viewer: Wireshark reading a capture from stdin, starting right away
pub const DEFAULT_VIEWER: &str = "wireshark -k -i -";

const CHUNK_SIZE: usize = 4096;

/// Copy `source` into `sink` until the device closes, the consumer goes away,
/// or `cancel` fires.
pub fn relay<R: Read, W: Write>(
    source: &mut R,
    sink: &mut W,
    cancel: &CancelToken,
) -> Result<RelayStats, RelayError> {
    let mut stats = RelayStats::started();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        if cancel.is_cancelled() {
            info!("Relay cancelled");
            break;
        }

        let len = match source.read(&mut buffer) {
            Ok(0) => {
                info!("Device closed the stream");
                break;
            }
            Ok(len) => len,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                continue
            }
            Err(e) => return Err(e.into()),
        };

        match sink.write_all(&buffer[..len]).and_then(|_| sink.flush()) {
            Ok(()) => {
                stats.record(len);
                trace!("Relayed {} bytes", len);
            }
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                info!("Consumer closed its input");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    stats.finish();
    info!(
        "Relayed {} bytes in {} chunks ({:.1} bytes/s)",
        stats.total_bytes, stats.chunks, stats.data_rate
    );
    Ok(stats)
}

/// Start the viewer with a piped stdin.
///
/// On unix the viewer gets its own process group so Ctrl-C stops the relay
/// without killing the viewer.
pub fn spawn_viewer(command_line: &str) -> Result<Child, RelayError> {
    let mut parts = command_line.split_whitespace();
    let program = parts.next().ok_or(RelayError::EmptyCommand)?;

    let mut command = Command::new(program);
    command.args(parts).stdin(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    info!("Starting viewer: {}", command_line);
    command.spawn().map_err(|source| RelayError::Spawn {
        command: command_line.to_string(),
        source,
    })
}

/// Relay into a freshly started viewer, then wait for it to exit.
pub fn relay_to_viewer<R: Read>(
    source: &mut R,
    command_line: &str,
    cancel: &CancelToken,
) -> Result<RelayStats, RelayError> {
    let mut child = spawn_viewer(command_line)?;

    let result = match child.stdin.take() {
        Some(mut stdin) => relay(source, &mut stdin, cancel),
        None => Err(RelayError::Io(io::Error::new(
            io::ErrorKind::Other,
            "viewer stdin is not available",
        ))),
    };

    match child.wait() {
        Ok(status) => info!("Viewer exited with {}", status),
        Err(e) => warn!("Failed to wait for viewer: {}", e),
    }
    result
}

/// Relay to our own stdout, for piping into another program.
pub fn relay_to_stdout<R: Read>(source: &mut R, cancel: &CancelToken) -> Result<RelayStats, RelayError> {
    let stdout = io::stdout();
    let mut sink = stdout.lock();
    relay(source, &mut sink, cancel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Cursor;

    /// Hands out queued reads, including timeouts
    struct Scripted(VecDeque<io::Result<Vec<u8>>>);

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(Ok(bytes)) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Err(e)) => Err(e),
                None => Ok(0),
            }
        }
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn copies_everything_until_eof() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let mut sink = Vec::new();

        let stats = relay(&mut Cursor::new(data.clone()), &mut sink, &CancelToken::new()).unwrap();
        assert_eq!(sink, data);
        assert_eq!(stats.total_bytes, 10_000);
        assert_eq!(stats.chunks, 3);
    }

    #[test]
    fn idle_port_timeouts_are_skipped() {
        let mut source = Scripted(VecDeque::from(vec![
            Err(io::ErrorKind::TimedOut.into()),
            Ok(vec![1, 2, 3]),
            Err(io::ErrorKind::WouldBlock.into()),
            Ok(vec![4]),
        ]));
        let mut sink = Vec::new();

        relay(&mut source, &mut sink, &CancelToken::new()).unwrap();
        assert_eq!(sink, vec![1, 2, 3, 4]);
    }

    #[test]
    fn read_failure_is_reported() {
        let mut source = Scripted(VecDeque::from(vec![Err(io::ErrorKind::BrokenPipe.into())]));
        assert!(matches!(
            relay(&mut source, &mut Vec::new(), &CancelToken::new()),
            Err(RelayError::Io(_))
        ));
    }

    #[test]
    fn closed_consumer_ends_relay_cleanly() {
        let stats = relay(&mut Cursor::new(vec![0u8; 16]), &mut ClosedPipe, &CancelToken::new()).unwrap();
        assert_eq!(stats.total_bytes, 0);
    }

    #[test]
    fn cancelled_relay_copies_nothing() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut sink = Vec::new();

        relay(&mut Cursor::new(vec![1u8; 16]), &mut sink, &cancel).unwrap();
        assert!(sink.is_empty());
    }

    #[test]
    fn empty_viewer_command_is_rejected() {
        assert!(matches!(spawn_viewer("   "), Err(RelayError::EmptyCommand)));
    }

    #[test]
    fn missing_viewer_is_a_spawn_error() {
        assert!(matches!(
            spawn_viewer("definitely-not-a-real-viewer-binary -k"),
            Err(RelayError::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn viewer_receives_the_stream() {
        // `true` may exit before or after the write; either way the relay ends cleanly
        let stats = relay_to_viewer(&mut Cursor::new(vec![7u8; 64]), "true", &CancelToken::new());
        assert!(stats.is_ok());
    }
}
