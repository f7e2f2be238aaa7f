//! # Tannoy Common Library
//!
//! Shared code for the Tannoy sound dispatcher:
//! - Bus event types (TannoyEvent enum) and the broadcast EventBus
//! - Inbound command grammar for the `sound/#` topic space
//! - Configuration loading
//! - Error types

pub mod config;
pub mod error;
pub mod events;
pub mod topic;

pub use error::{Error, Result};
