//! Translation of capture options into the device's wire format.

pub mod address;
pub mod command;
pub mod filter;

pub use address::{encode_address, encode_address_any, AddressLength};
pub use command::build_command;
pub use filter::encode_filter;
