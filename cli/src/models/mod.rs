//! Data models

pub mod api;
pub mod app;
