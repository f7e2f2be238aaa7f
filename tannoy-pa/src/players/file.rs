//! Single-file player
//!
//! Resolves one requested name against the sound repository and launches the
//! playback utility matching its extension. Resolution happens entirely at
//! construction; a request that cannot be resolved produces a task with no
//! command, which plays as a silent no-op.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::playback::task::{
    abort_playback, playback_slot, run_playback, PlaybackCommand, PlaybackSlot, PlaybackTask,
};
use crate::players::resolve::resolve_sound;

pub struct FilePlayer {
    sounds_root: PathBuf,
    max_play_time: Duration,
    duration_overrides: HashMap<String, u64>,
}

impl FilePlayer {
    pub fn new(
        sounds_root: PathBuf,
        max_play_time: Duration,
        duration_overrides: HashMap<String, u64>,
    ) -> Self {
        Self {
            sounds_root,
            max_play_time,
            duration_overrides,
        }
    }

    pub fn task(&self, requested: &str) -> Arc<dyn PlaybackTask> {
        Arc::new(FileTask::new(
            requested,
            &self.sounds_root,
            self.max_play_time,
            &self.duration_overrides,
        ))
    }
}

pub struct FileTask {
    requested: String,
    selected: Option<PathBuf>,
    command: Option<PlaybackCommand>,
    max_play_time: Duration,
    sounds_root: PathBuf,
    slot: PlaybackSlot,
}

impl FileTask {
    /// Resolve `requested` and build the launch command. Long-running files
    /// named in `duration_overrides` (keyed by repository-relative path) get
    /// their own maximum play time.
    pub fn new(
        requested: &str,
        sounds_root: &Path,
        max_play_time: Duration,
        duration_overrides: &HashMap<String, u64>,
    ) -> Self {
        let selected = resolve_sound(sounds_root, requested);
        let mut max_play_time = max_play_time;
        if let Some(path) = &selected {
            if let Ok(relative) = path.strip_prefix(sounds_root) {
                if let Some(secs) = duration_overrides.get(&relative.to_string_lossy().into_owned())
                {
                    max_play_time = Duration::from_secs(*secs);
                }
            }
        }
        let command = selected.as_deref().map(PlaybackCommand::for_file);
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

    pub fn selected(&self) -> Option<&Path> {
        self.selected.as_deref()
    }

    pub fn max_play_time(&self) -> Duration {
        self.max_play_time
    }
}

#[async_trait]
impl PlaybackTask for FileTask {
    fn describe(&self) -> String {
        match (&self.selected, &self.command) {
            (Some(path), Some(command)) => {
                let relative = path.strip_prefix(&self.sounds_root).unwrap_or(path);
                format!(
                    "<File {:?} -> {:?} [{}]>",
                    self.requested,
                    relative.display().to_string(),
                    command.program
                )
            }
            _ => format!("<File {:?} -> none>", self.requested),
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
