//! Playback task contract and the single-worker sound queue

pub mod queue;
pub mod task;

pub use queue::{QueueStatus, SoundQueue};
pub use task::{PlaybackCommand, PlaybackTask};
