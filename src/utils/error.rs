use std::time::Duration;

use thiserror::Error;

use crate::device::handshake::HandshakeState;

/// Errors raised while turning user options into wire values.
///
/// These are always reported before any byte reaches the device.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Filter token is neither a known mnemonic nor a `0x` hex literal
    #[error("Unknown filter mnemonic: \"{token}\" (supported mnemonics: \"{supported}\")")]
    InvalidMnemonic { token: String, supported: String },

    /// Address text does not split into the expected number of hex bytes
    #[error("Bad address formatting: \"{text}\", expected {expected} hex bytes")]
    MalformedAddress { text: String, expected: &'static str },

    /// Channel outside the regional range
    #[error("Channel {channel} is outside the permitted range 1..={max}")]
    InvalidChannel { channel: u8, max: u8 },
}

/// Errors that abort a handshake with the device.
#[derive(Error, Debug)]
pub enum HandshakeError {
    /// Serial port could not be opened
    #[error("Serial port \"{port}\" open attempt failed: {source}")]
    PortOpen {
        port: String,
        #[source]
        source: std::io::Error,
    },

    /// Read or write failed, or the device went away
    #[error("Serial connection closed/failed while {stage}: {source}")]
    ConnectionLost {
        stage: HandshakeState,
        #[source]
        source: std::io::Error,
    },

    /// User cancelled while a blocking step was in progress
    #[error("Handshake interrupted while {0}")]
    Interrupted(HandshakeState),

    /// Optional sentinel timeout expired
    #[error("No response from device after {elapsed:?} while {stage}")]
    Timeout {
        stage: HandshakeState,
        elapsed: Duration,
    },
}

impl HandshakeError {
    /// Cancellation is a normal way to leave; callers should not report it as a failure.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, HandshakeError::Interrupted(_))
    }
}

/// Errors from relaying the capture stream to its consumer
#[derive(Error, Debug)]
pub enum RelayError {
    /// Viewer process could not be started
    #[error("Failed to start viewer \"{command}\": {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Viewer command line was empty
    #[error("Viewer command is empty")]
    EmptyCommand,

    /// Error reading from the device or writing to the sink
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Error encoding the capture options
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Error negotiating with the device
    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    /// Error streaming capture data
    #[error(transparent)]
    Relay(#[from] RelayError),

    /// Error from the serialport library
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Error from I/O operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No serial ports to choose from
    #[error("No serial ports found")]
    NoPorts,

    /// Port menu answer that does not name a port
    #[error("Not a valid selection: \"{0}\"")]
    InvalidSelection(String),
}

/// Result type for application
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_mnemonic_message_lists_supported_tokens() {
        let err = EncodeError::InvalidMnemonic {
            token: "beacon".to_string(),
            supported: "mgmt|data".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"beacon\""));
        assert!(msg.contains("mgmt|data"));
    }

    #[test]
    fn only_interrupted_counts_as_interrupt() {
        assert!(HandshakeError::Interrupted(HandshakeState::AwaitingAck).is_interrupt());

        let lost = HandshakeError::ConnectionLost {
            stage: HandshakeState::Uploading,
            source: std::io::Error::from(std::io::ErrorKind::BrokenPipe),
        };
        assert!(!lost.is_interrupt());
    }

    #[test]
    fn app_error_is_transparent_for_encode_errors() {
        let err: AppError = EncodeError::InvalidChannel { channel: 14, max: 11 }.into();
        assert_eq!(err.to_string(), "Channel 14 is outside the permitted range 1..=11");
    }
}
