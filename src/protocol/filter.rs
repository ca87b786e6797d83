//! Filter mask encoding.
//!
//! Standard bit positions follow `esp_wifi_types.h` from the ESP32 SDK
//! (identical across ESP32, ESP32-S2, ESP32-S3 and ESP32-C3). The WiFiPcap
//! firmware adds its own bits in a range the SDK leaves unused. Word usage:
//! a filter here says what to *keep*.

use log::debug;

use crate::models::filter::{EncodedFilter, FilterSelection};
use crate::utils::error::EncodeError;

/// Named filter bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum FilterBit {
    /// Packets of type WIFI_PKT_MGMT
    Mgmt = 1 << 0,
    /// Packets of type WIFI_PKT_CTRL
    Ctrl = 1 << 1,
    /// Packets of type WIFI_PKT_DATA
    Data = 1 << 2,
    /// Packets of type WIFI_PKT_MISC
    Misc = 1 << 3,
    /// MPDU, a kind of WIFI_PKT_DATA
    DataMpdu = 1 << 4,
    /// AMPDU, a kind of WIFI_PKT_DATA
    DataAmpdu = 1 << 5,
    /// FCS failed packets
    FcsFail = 1 << 6,
    /// Firmware only: packets related to an AP connection
    Session = 1 << 16,
    /// Firmware only: packet length includes the FCS
    FcsLen = 1 << 17,
    CtrlWrapper = 1 << 23,
    CtrlBar = 1 << 24,
    CtrlBa = 1 << 25,
    CtrlPsPoll = 1 << 26,
    CtrlRts = 1 << 27,
    CtrlCts = 1 << 28,
    CtrlAck = 1 << 29,
    CtrlCfEnd = 1 << 30,
    CtrlCfEndAck = 1 << 31,
}

impl FilterBit {
    pub const fn mask(self) -> u32 {
        self as u32
    }
}

/// Saturated value, "no filtering" to the device
pub const FILTER_MASK_ALL: u32 = 0xFFFF_FFFF;

/// Every control subtype bit
pub const CTRL_SUBTYPE_MASK: u32 = 0xFF80_0000;

/// Every bit the SDK defines
pub const STANDARD_BITS: u32 = 0x0000_007F | CTRL_SUBTYPE_MASK;

/// Range reserved for firmware-only bits. Never overlaps `STANDARD_BITS`.
pub const CUSTOM_RANGE: u32 = 0x007F_0000;

const _: () = assert!(STANDARD_BITS & CUSTOM_RANGE == 0);

/// A filter expression token and the bits it stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mnemonic {
    pub name: &'static str,
    pub value: u32,
    pub help: &'static str,
}

const fn mnemonic(name: &'static str, value: u32, help: &'static str) -> Mnemonic {
    Mnemonic { name, value, help }
}

/// Default mnemonic table
pub static MNEMONICS: &[Mnemonic] = &[
    mnemonic("all", STANDARD_BITS, "Keep all packets"),
    mnemonic("all_mask", STANDARD_BITS, "Keep all packets"),
    mnemonic("mgmt", FilterBit::Mgmt.mask(), "WIFI_PKT_MGMT"),
    mnemonic("ctrl", FilterBit::Ctrl.mask(), "WIFI_PKT_CTRL"),
    mnemonic("data", FilterBit::Data.mask(), "WIFI_PKT_DATA"),
    mnemonic("misc", FilterBit::Misc.mask(), "WIFI_PKT_MISC"),
    mnemonic("mpdu", FilterBit::DataMpdu.mask(), "MPDU, a kind of WIFI_PKT_DATA"),
    mnemonic("ampdu", FilterBit::DataAmpdu.mask(), "AMPDU, a kind of WIFI_PKT_DATA"),
    mnemonic("fcsfail", FilterBit::FcsFail.mask(), "FCS failed packets, also includes bad packets"),
    mnemonic("ctrl_mask", CTRL_SUBTYPE_MASK, "All WIFI_PKT_CTRL subtypes"),
    mnemonic("wrapper", FilterBit::CtrlWrapper.mask(), "Control Wrapper"),
    mnemonic("bar", FilterBit::CtrlBar.mask(), "Block Ack Request"),
    mnemonic("ba", FilterBit::CtrlBa.mask(), "Block Ack"),
    mnemonic("pspoll", FilterBit::CtrlPsPoll.mask(), "PS-Poll"),
    mnemonic("rts", FilterBit::CtrlRts.mask(), "RTS"),
    mnemonic("cts", FilterBit::CtrlCts.mask(), "CTS"),
    mnemonic("ack", FilterBit::CtrlAck.mask(), "ACK"),
    mnemonic("cfend", FilterBit::CtrlCfEnd.mask(), "CF-END"),
    mnemonic("cfendack", FilterBit::CtrlCfEndAck.mask(), "CF-END+CF-ACK"),
    mnemonic("session", FilterBit::Session.mask(), "Packets related to AP connections (firmware only)"),
    mnemonic("fcslen", FilterBit::FcsLen.mask(), "Experimental, FCS length included in packet length (firmware only)"),
];

/// `|` joined mnemonic names, as shown in error messages
pub fn supported_mnemonics(table: &[Mnemonic]) -> String {
    table.iter().map(|m| m.name).collect::<Vec<_>>().join("|")
}

/// Encode a filter selection into its standard and custom masks.
pub fn encode_filter(selection: &FilterSelection, table: &[Mnemonic]) -> Result<EncodedFilter, EncodeError> {
    let mask = match selection {
        FilterSelection::Expression(expression) => parse_expression(expression, table)?,
        FilterSelection::All => STANDARD_BITS,
        FilterSelection::AllGood => STANDARD_BITS & !FilterBit::FcsFail.mask(),
        FilterSelection::Session => {
            FilterBit::Data.mask() | FilterBit::Mgmt.mask() | FilterBit::Session.mask()
        }
        FilterSelection::Keep => 0,
    };

    let encoded = split_mask(mask);
    debug!("Filter {:?} encoded as {:?}", selection, encoded);
    Ok(encoded)
}

/// OR together every token of a `|` separated expression.
///
/// A control subtype drags in the control type bit, otherwise the radio never
/// reports the subtype at all.
pub fn parse_expression(expression: &str, table: &[Mnemonic]) -> Result<u32, EncodeError> {
    let mut mask = 0u32;
    for token in expression.split('|').map(str::trim) {
        mask |= parse_token(token, table)?;
    }

    if mask & CTRL_SUBTYPE_MASK != 0 {
        mask |= FilterBit::Ctrl.mask();
    }
    Ok(mask)
}

fn parse_token(token: &str, table: &[Mnemonic]) -> Result<u32, EncodeError> {
    let invalid = || EncodeError::InvalidMnemonic {
        token: token.to_string(),
        supported: supported_mnemonics(table),
    };

    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).map_err(|_| invalid());
    }

    table
        .iter()
        .find(|m| m.name == token)
        .map(|m| m.value)
        .ok_or_else(invalid)
}

/// Partition a raw mask and saturate the standard portion.
fn split_mask(mask: u32) -> EncodedFilter {
    let mut standard = mask & !CUSTOM_RANGE;
    let custom = mask & CUSTOM_RANGE;

    if standard & STANDARD_BITS == STANDARD_BITS {
        standard = FILTER_MASK_ALL;
    }

    EncodedFilter {
        standard: (standard != 0).then_some(standard),
        custom: (custom != 0).then_some(custom),
    }
}
