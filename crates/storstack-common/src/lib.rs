//! storstack Common - Shared types and utilities
//!
//! This crate provides the error type, storage-topology primitives and the
//! tool configuration shared by every storstack component.

pub mod config;
pub mod error;
pub mod types;

pub use config::ToolConfig;
pub use error::{Error, Result};
pub use types::*;
