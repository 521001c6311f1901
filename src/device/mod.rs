//! Everything between the BLE stack and the user: filtering advertisements, the connection
//! lifecycle, and turning characteristic values into readings.

pub mod btle;
pub mod constants;
pub mod coordinator;
pub mod decoder;
pub mod filter;
pub mod platform;
pub mod reconnect;
pub mod resolver;
pub mod session;
pub mod types;
