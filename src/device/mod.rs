//! Talking to the WiFiPcap device: port access and the configuration handshake.

pub mod cancel;
pub mod handshake;
pub mod serial;

pub use cancel::CancelToken;
pub use handshake::{Connector, Handshake, HandshakeState, ReadyStream};
pub use serial::SerialConnector;
