pub mod address;
pub mod config;
pub mod filter;
pub mod port;
pub mod settings;
pub mod stats;
