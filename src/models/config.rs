use serde::{Deserialize, Serialize};

use crate::models::address::AddressPair;
use crate::models::filter::EncodedFilter;
use crate::utils::error::EncodeError;

/// Capture options for one session, already in wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CaptureConfig {
    /// WiFi channel to switch to; `None` keeps the device's current channel
    pub channel: Option<u8>,

    /// Packet filter
    pub filter: EncodedFilter,

    /// Source or destination address of interest (full MAC or OUI)
    pub unicast: Option<AddressPair>,

    /// Multicast or broadcast address accepted alongside `unicast`
    pub multicast: Option<AddressPair>,

    /// Send the host clock so capture timestamps line up
    pub time_sync: bool,
}

impl CaptureConfig {
    /// Create a config carrying only a filter
    pub fn new(filter: EncodedFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Set the channel, rejecting values outside `1..=max_channel`
    pub fn with_channel(mut self, channel: Option<u8>, max_channel: u8) -> Result<Self, EncodeError> {
        if let Some(ch) = channel {
            if ch == 0 || ch > max_channel {
                return Err(EncodeError::InvalidChannel {
                    channel: ch,
                    max: max_channel,
                });
            }
        }
        self.channel = channel;
        Ok(self)
    }

    /// Set the unicast/OUI and multicast address filters
    pub fn with_addresses(mut self, unicast: Option<AddressPair>, multicast: Option<AddressPair>) -> Self {
        self.unicast = unicast;
        self.multicast = multicast;
        self
    }

    /// Enable or disable host time sync
    pub fn with_time_sync(mut self, time_sync: bool) -> Self {
        self.time_sync = time_sync;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_within_range_is_accepted() {
        let config = CaptureConfig::default().with_channel(Some(11), 11).unwrap();
        assert_eq!(config.channel, Some(11));
    }

    #[test]
    fn channel_outside_range_is_rejected() {
        assert_eq!(
            CaptureConfig::default().with_channel(Some(12), 11),
            Err(EncodeError::InvalidChannel { channel: 12, max: 11 })
        );
        assert!(CaptureConfig::default().with_channel(Some(0), 11).is_err());
    }

    #[test]
    fn no_channel_is_always_valid() {
        let config = CaptureConfig::default().with_channel(None, 1).unwrap();
        assert_eq!(config.channel, None);
    }
}
