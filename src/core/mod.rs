//! Core services and infrastructure

pub mod cancel;
pub mod error_handling;
pub mod logging;
pub mod styles;
pub mod time;
pub mod version;
