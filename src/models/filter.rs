use serde::{Deserialize, Serialize};

/// Which packets the device should pass to the host.
///
/// The command line parser guarantees at most one of these is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FilterSelection {
    /// `|` separated mnemonics and `0x` hex literals, e.g. `"mgmt|data"`
    Expression(String),

    /// Keep every packet the radio reports
    All,

    /// Keep everything except packets with a failed FCS
    AllGood,

    /// Keep management and data frames related to an AP connection
    Session,

    /// Upload no filter; the device keeps whatever it had before
    #[default]
    Keep,
}

/// Filter mask in the form uploaded to the device.
///
/// `standard` holds bits the ESP32 SDK understands; `custom` holds bits only the
/// WiFiPcap firmware interprets. An absent portion is not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EncodedFilter {
    pub standard: Option<u32>,
    pub custom: Option<u32>,
}

impl EncodedFilter {
    /// True when nothing would be uploaded
    pub fn is_empty(&self) -> bool {
        self.standard.is_none() && self.custom.is_none()
    }
}
