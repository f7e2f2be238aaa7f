//! Multi-file player
//!
//! Plays a comma-separated sequence of repository files back to back with a
//! single playback process. Members that fail to resolve are excluded, not
//! fatal; the surviving members must share one extension, since one process
//! can only run one playback mechanism.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::error;

use crate::playback::task::{
    abort_playback, playback_slot, run_playback, PlaybackCommand, PlaybackSlot, PlaybackTask,
};
use crate::players::resolve::resolve_sound;

pub struct FilesPlayer {
    sounds_root: PathBuf,
    max_play_time: Duration,
}

impl FilesPlayer {
    pub fn new(sounds_root: PathBuf, max_play_time: Duration) -> Self {
        Self {
            sounds_root,
            max_play_time,
        }
    }

    pub fn task(&self, requested: &str) -> Arc<dyn PlaybackTask> {
        Arc::new(FilesTask::new(
            requested,
            &self.sounds_root,
            self.max_play_time,
        ))
    }
}

pub struct FilesTask {
    requested: String,
    selected: Vec<PathBuf>,
    command: Option<PlaybackCommand>,
    max_play_time: Duration,
    sounds_root: PathBuf,
    slot: PlaybackSlot,
}

impl FilesTask {
    /// Resolve each member of the comma-separated `requested` list. The
    /// overall maximum play time scales with the number of surviving
    /// members.
    pub fn new(requested: &str, sounds_root: &Path, per_file_max: Duration) -> Self {
        let selected: Vec<PathBuf> = requested
            .split(',')
            .filter_map(|name| resolve_sound(sounds_root, name))
            .collect();
        let max_play_time = per_file_max * selected.len() as u32;

        let extensions: BTreeSet<String> = selected
            .iter()
            .filter_map(|path| path.extension())
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .collect();
        let command = if !selected.is_empty() && extensions.len() == 1 {
            Some(PlaybackCommand::for_files(&selected))
        } else {
            if extensions.len() > 1 {
                error!(
                    "cannot play {:?}: members have mixed extensions {:?}",
                    requested, extensions
                );
            }
            None
        };

        Self {
            requested: requested.to_string(),
            selected,
            command,
            max_play_time,
            sounds_root: sounds_root.to_path_buf(),
            slot: playback_slot(),
        }
    }

    pub fn command(&self) -> Option<&PlaybackCommand> {
        self.command.as_ref()
    }

    pub fn selected(&self) -> &[PathBuf] {
        &self.selected
    }

    pub fn max_play_time(&self) -> Duration {
        self.max_play_time
    }
}

#[async_trait]
impl PlaybackTask for FilesTask {
    fn describe(&self) -> String {
        let resolved: Vec<String> = self
            .selected
            .iter()
            .map(|path| {
                path.strip_prefix(&self.sounds_root)
                    .unwrap_or(path)
                    .display()
                    .to_string()
            })
            .collect();
        match &self.command {
            Some(command) => format!(
                "<Files {:?} -> {:?} [{}]>",
                self.requested,
                resolved.join(","),
                command.program
            ),
            None => format!("<Files {:?} -> none>", self.requested),
        }
    }

    async fn play(&self) {
        if let Some(command) = &self.command {
            run_playback(&self.slot, command, self.max_play_time).await;
        }
    }

    async fn abort(&self) {
        abort_playback(&self.slot).await;
    }
}
