pub mod config;
pub mod deploy;
pub mod version;

// Re-export command functions
pub use config::cmd_config;
pub use deploy::cmd_deploy;
pub use version::cmd_version;
