//! HTTP clients for the localapps server

pub mod apps;
pub mod client;
