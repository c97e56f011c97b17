//! Command-line and HTTP front ends for the ghostlink modem

pub mod args;
pub mod server;
