use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::protocol::filter::{Mnemonic, MNEMONICS};

/// Bit rate both ends are built for. USB CDC ignores it but a UART bridge does not.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// North America, common range. Europe permits 13; the firmware caps at 14.
pub const DEFAULT_MAX_CHANNEL: u8 = 11;

/// Highest channel the firmware will ever accept
pub const FIRMWARE_MAX_CHANNEL: u8 = 14;

/// Printed by the device when it is ready for the command line
pub const READY_SENTINEL: &str = "<<SerialPcap>>";

/// Printed by the device once the command is applied and binary streaming begins
pub const ACK_SENTINEL: &str = "<<PASSTHROUGH>>";

/// Protocol constants shared by the encoders, the handshake and the relay.
///
/// Built once at startup and passed down by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolSettings {
    /// Serial bit rate
    pub baud_rate: u32,

    /// Highest channel permitted in the current region
    pub max_channel: u8,

    /// Substring that starts the upload
    pub ready_sentinel: String,

    /// Substring that confirms the upload
    pub ack_sentinel: String,

    /// How long a single port read may block before cancellation is checked
    pub poll_interval: Duration,

    /// Give up waiting for a sentinel after this long; `None` waits forever
    pub sentinel_timeout: Option<Duration>,

    /// Filter mnemonics accepted in a filter expression
    #[serde(skip, default = "default_mnemonics")]
    pub mnemonics: &'static [Mnemonic],
}

fn default_mnemonics() -> &'static [Mnemonic] {
    MNEMONICS
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            max_channel: DEFAULT_MAX_CHANNEL,
            ready_sentinel: READY_SENTINEL.to_string(),
            ack_sentinel: ACK_SENTINEL.to_string(),
            poll_interval: Duration::from_millis(100),
            sentinel_timeout: None,
            mnemonics: MNEMONICS,
        }
    }
}

impl ProtocolSettings {
    /// Set the serial bit rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the regional channel limit, clamped to what the firmware supports
    pub fn with_max_channel(mut self, max_channel: u8) -> Self {
        self.max_channel = max_channel.clamp(1, FIRMWARE_MAX_CHANNEL);
        self
    }

    /// Set an upper bound on waiting for each sentinel
    pub fn with_sentinel_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.sentinel_timeout = timeout;
        self
    }

    /// Use a different mnemonic table
    pub fn with_mnemonics(mut self, mnemonics: &'static [Mnemonic]) -> Self {
        self.mnemonics = mnemonics;
        self
    }
}
