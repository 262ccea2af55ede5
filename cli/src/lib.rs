//! localapps CLI library
//!
//! Builds an app's images, relays them into a temporary registry on a
//! localapps server and registers the app there.

pub mod cli;
pub mod commands;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod registry;
pub mod storage;
pub mod utils;
