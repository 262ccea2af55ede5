//! Deployment module

pub mod builder;
pub mod docker;
pub mod engine;
pub mod executor;
pub mod fsm;
pub mod manifest;
pub mod publisher;
