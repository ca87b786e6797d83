use serde::{Deserialize, Serialize};
use std::fmt;

/// A hardware address split into two 24-bit halves, the form the device parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressPair {
    /// OUI part, bytes 0-2
    pub most_significant: u32,

    /// Host part, bytes 3-5; zero for an OUI-only match
    pub least_significant: u32,
}

impl AddressPair {
    /// No address filter
    pub const NONE: AddressPair = AddressPair {
        most_significant: 0,
        least_significant: 0,
    };

    /// Match broadcast frames
    pub const BROADCAST: AddressPair = AddressPair {
        most_significant: 0xFF_FFFF,
        least_significant: 0xFF_FFFF,
    };

    /// Unpack back into the six address bytes
    pub fn to_bytes(&self) -> [u8; 6] {
        let hi = self.most_significant.to_be_bytes();
        let lo = self.least_significant.to_be_bytes();
        [hi[1], hi[2], hi[3], lo[1], lo[2], lo[3]]
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

impl fmt::Display for AddressPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_displays_as_all_ones() {
        assert_eq!(AddressPair::BROADCAST.to_string(), "FF:FF:FF:FF:FF:FF");
    }

    #[test]
    fn to_bytes_keeps_byte_order() {
        let pair = AddressPair {
            most_significant: 0x0A0B0C,
            least_significant: 0x0D0E0F,
        };
        assert_eq!(pair.to_bytes(), [0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F]);
    }

    #[test]
    fn only_the_zero_pair_is_none() {
        assert!(AddressPair::NONE.is_none());
        assert!(!AddressPair::BROADCAST.is_none());
        let oui_only = AddressPair {
            most_significant: 0x240AC4,
            least_significant: 0,
        };
        assert!(!oui_only.is_none());
    }
}
