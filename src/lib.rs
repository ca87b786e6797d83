//! Configure a WiFiPcap sniffer over USB serial and relay its pcap stream.
//!
//! The capture options are encoded by [`protocol`], uploaded by the
//! [`device::Handshake`], and the resulting stream is passed on by [`relay`].

pub mod device;
pub mod models;
pub mod protocol;
pub mod relay;
pub mod utils;
