//! Hardware address encoding.

use crate::models::address::AddressPair;
use crate::utils::error::EncodeError;

// ',' is not a separator so a comma in an option is reported, not silently split
const SEPARATORS: &[char] = &[':', '-', '.', ' '];

/// Number of bytes an address option must contain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressLength {
    /// First three bytes only
    Oui = 3,
    /// Full six byte MAC
    Mac = 6,
}

impl AddressLength {
    fn describe(self) -> &'static str {
        match self {
            AddressLength::Oui => "3",
            AddressLength::Mac => "6",
        }
    }
}

/// Encode `text` holding exactly `expected` hex bytes.
///
/// Bytes may be separated by `:`, `-`, `.` or a space, and each must be two hex
/// digits. A three byte OUI leaves the low half zero.
pub fn encode_address(text: &str, expected: AddressLength) -> Result<AddressPair, EncodeError> {
    let malformed = || EncodeError::MalformedAddress {
        text: text.to_string(),
        expected: expected.describe(),
    };

    let bytes = parse_bytes(text).ok_or_else(malformed)?;
    if bytes.len() != expected as usize {
        return Err(malformed());
    }
    Ok(pack(&bytes))
}

/// Encode `text` holding either 3 or 6 hex bytes.
pub fn encode_address_any(text: &str) -> Result<AddressPair, EncodeError> {
    match parse_bytes(text) {
        Some(bytes) if bytes.len() == 3 || bytes.len() == 6 => Ok(pack(&bytes)),
        _ => Err(EncodeError::MalformedAddress {
            text: text.to_string(),
            expected: "3 or 6",
        }),
    }
}

fn parse_bytes(text: &str) -> Option<Vec<u8>> {
    text.trim()
        .split(SEPARATORS)
        .map(|token| {
            if token.len() != 2 || !token.chars().all(|c| c.is_ascii_hexdigit()) {
                return None;
            }
            u8::from_str_radix(token, 16).ok()
        })
        .collect()
}

fn pack(bytes: &[u8]) -> AddressPair {
    let half = |chunk: &[u8]| chunk.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
    let (hi, lo) = bytes.split_at(3);
    AddressPair {
        most_significant: half(hi),
        least_significant: half(lo),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_splits_into_halves() {
        let pair = encode_address("AA:BB:CC:DD:EE:FF", AddressLength::Mac).unwrap();
        assert_eq!(pair.most_significant, 0xAABBCC);
        assert_eq!(pair.least_significant, 0xDDEEFF);
    }

    #[test]
    fn oui_leaves_low_half_zero() {
        let pair = encode_address("00-1a-2B", AddressLength::Oui).unwrap();
        assert_eq!(pair.most_significant, 0x001A2B);
        assert_eq!(pair.least_significant, 0);
    }

    #[test]
    fn every_separator_is_accepted() {
        for text in ["01:23:45:67:89:ab", "01-23-45-67-89-ab", "01.23.45.67.89.ab", "01 23 45 67 89 ab", "01:23-45.67 89:ab"] {
            let pair = encode_address(text, AddressLength::Mac).unwrap();
            assert_eq!(pair.to_bytes(), [0x01, 0x23, 0x45, 0x67, 0x89, 0xab], "{}", text);
        }
    }

    #[test]
    fn round_trips_through_bytes() {
        let samples: [[u8; 6]; 4] = [
            [0, 0, 0, 0, 0, 1],
            [0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
            [0x80, 0x01, 0x7f, 0xfe, 0x10, 0x00],
            [0x24, 0x0a, 0xc4, 0x12, 0x34, 0x56],
        ];
        for bytes in samples {
            let text = bytes.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(":");
            let pair = encode_address(&text, AddressLength::Mac).unwrap();
            assert_eq!(pair.to_bytes(), bytes);
        }
    }

    #[test]
    fn wrong_byte_count_is_rejected() {
        for text in ["aa:bb", "aa:bb:cc:dd", "aa:bb:cc:dd:ee", "aa:bb:cc:dd:ee:ff:00"] {
            assert!(matches!(
                encode_address(text, AddressLength::Mac),
                Err(EncodeError::MalformedAddress { .. })
            ), "{}", text);
            assert!(encode_address(text, AddressLength::Oui).is_err(), "{}", text);
        }
        assert!(encode_address("aa:bb:cc", AddressLength::Mac).is_err());
        assert!(encode_address("aa:bb:cc:dd:ee:ff", AddressLength::Oui).is_err());
    }

    #[test]
    fn bad_hex_is_rejected() {
        assert!(encode_address("aa:bb:cc:dd:ee:fg", AddressLength::Mac).is_err());
        assert!(encode_address("a:bb:cc", AddressLength::Oui).is_err());
        assert!(encode_address("aab:bb:cc", AddressLength::Oui).is_err());
        assert!(encode_address("aa::bb:cc", AddressLength::Oui).is_err());
        assert!(encode_address("+a:bb:cc", AddressLength::Oui).is_err());
    }

    #[test]
    fn comma_is_not_a_separator() {
        assert!(matches!(
            encode_address("24,0a,c4", AddressLength::Oui),
            Err(EncodeError::MalformedAddress { .. })
        ));
        assert!(encode_address_any("01,00,5e").is_err());
    }

    #[test]
    fn any_length_accepts_three_or_six() {
        assert_eq!(
            encode_address_any("01:00:5e").unwrap(),
            AddressPair {
                most_significant: 0x01005E,
                least_significant: 0
            }
        );
        assert_eq!(encode_address_any("ff:ff:ff:ff:ff:ff").unwrap(), AddressPair::BROADCAST);
        assert!(matches!(
            encode_address_any("01:00:5e:00"),
            Err(EncodeError::MalformedAddress { expected: "3 or 6", .. })
        ));
    }
}
