//! Player factories producing playback tasks
//!
//! A player validates a request and returns a task; it never runs anything
//! itself. Malformed requests degrade to tasks with nothing to play rather
//! than surfacing errors to the command router.

pub mod file;
pub mod files;
pub mod resolve;
pub mod speech;
pub mod test;

pub use file::FilePlayer;
pub use files::FilesPlayer;
pub use speech::{SpeechClient, SpeechPlayer};
pub use test::TestPlayer;
