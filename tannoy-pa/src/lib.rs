//! # Tannoy Playback Agent
//!
//! Message-driven sound dispatcher for a multi-room speaker network:
//! commands arrive over the MQTT bus, a single-worker queue serializes
//! playback, and audio goes out through external player processes on
//! GPIO-selected room outputs.

pub mod bus;
pub mod error;
pub mod playback;
pub mod players;
pub mod rooms;
pub mod server;

pub use error::{Error, Result};
