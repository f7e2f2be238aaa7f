//! Playback task contract
//!
//! Every player produces a task with a four-phase lifecycle: `prepare` runs
//! once when the job is accepted into the queue, `is_ready` is polled by the
//! worker before playback starts, `play` blocks until the task finishes (or
//! is killed), and `abort` may arrive from another task at any point.
//!
//! Tasks resolve everything that can fail at construction or during
//! `prepare`; by the time `play` runs there is either a concrete command to
//! launch or nothing to do. A task with no command plays as a silent no-op,
//! which is how invalid requests degrade instead of erroring.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Interval at which an in-flight playback process is polled for exit
const REAP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Shared handle to the external playback process, if one is running.
///
/// `play()` owns the spawn/wait cycle; `abort()` reaches in from another
/// task and kills whatever is in the slot. An empty slot means there is
/// nothing to stop.
pub type PlaybackSlot = Arc<Mutex<Option<Child>>>;

/// Create an empty process slot.
pub fn playback_slot() -> PlaybackSlot {
    Arc::new(Mutex::new(None))
}

/// The lifecycle every playback task implements.
///
/// Default behavior is a no-op for everything except `describe`; concrete
/// tasks override the subset they need.
#[async_trait]
pub trait PlaybackTask: Send + Sync {
    /// Human-readable identity, used in logs and now-playing notifications.
    fn describe(&self) -> String;

    /// Hook run once when the job is accepted into the queue, before it
    /// reaches the front. Must not block the enqueueing caller; slow work
    /// (synthesis, prefetch) is spawned and signalled via `is_ready`.
    async fn prepare(&self) {}

    /// Polled by the queue worker every 500ms before playback starts.
    async fn is_ready(&self) -> bool {
        true
    }

    /// Perform the playback side effect. Returns when the task finishes,
    /// exceeds its maximum duration (the process is force-killed and
    /// reaped), or is aborted concurrently.
    async fn play(&self) {}

    /// Stop any in-flight playback process. Safe to call before playback
    /// has started and after it has finished; idempotent.
    async fn abort(&self) {}
}

/// External playback process invocation
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl PlaybackCommand {
    /// Launch command for a single resolved file, selected by extension:
    /// `.mp3` goes to mpg123 (mono mixdown), everything else to sox play.
    pub fn for_file(path: &Path) -> Self {
        Self::for_files(std::slice::from_ref(&path.to_path_buf()))
    }

    /// Launch command for an already-homogeneous list of files, played in
    /// order by a single process.
    pub fn for_files(paths: &[PathBuf]) -> Self {
        let mp3 = paths
            .first()
            .and_then(|p| p.extension())
            .map(|e| e.eq_ignore_ascii_case("mp3"))
            .unwrap_or(false);
        let (program, mut args) = if mp3 {
            ("mpg123".to_string(), vec!["-q".to_string(), "-m".to_string()])
        } else {
            ("play".to_string(), vec!["-q".to_string()])
        };
        args.extend(paths.iter().map(|p| p.to_string_lossy().into_owned()));
        Self { program, args }
    }
}

/// Spawn `command`, park the child in `slot`, and wait for it to exit.
///
/// The child is polled rather than awaited so a concurrent [`abort_playback`]
/// can reach it through the slot. On reaching `max_play_time` the process is
/// force-killed and reaped; a timed-out playback is normal completion, not
/// an error. Spawn failures are logged and swallowed.
pub async fn run_playback(slot: &PlaybackSlot, command: &PlaybackCommand, max_play_time: Duration) {
    let child = match Command::new(&command.program).args(&command.args).spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!("failed to spawn {}: {}", command.program, e);
            return;
        }
    };
    debug!("spawned {} (pid {:?})", command.program, child.id());
    *slot.lock().await = Some(child);

    let deadline = tokio::time::Instant::now() + max_play_time;
    let mut killed = false;
    loop {
        {
            let mut guard = slot.lock().await;
            let Some(child) = guard.as_mut() else { break };
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!("{} exited with {}", command.program, status);
                    *guard = None;
                    break;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("failed to poll {}: {}", command.program, e);
                    *guard = None;
                    break;
                }
            }
            if !killed && tokio::time::Instant::now() >= deadline {
                debug!("{} exceeded max play time, killing", command.program);
                if let Err(e) = child.start_kill() {
                    warn!("failed to kill {}: {}", command.program, e);
                }
                killed = true;
            }
        }
        tokio::time::sleep(REAP_POLL_INTERVAL).await;
    }
}

/// Kill whatever process is currently in `slot`. No-op on an empty slot.
///
/// The killed child is reaped by the `run_playback` loop that owns it.
pub async fn abort_playback(slot: &PlaybackSlot) {
    let mut guard = slot.lock().await;
    if let Some(child) = guard.as_mut() {
        debug!("aborting playback (pid {:?})", child.id());
        if let Err(e) = child.start_kill() {
            debug!("abort kill failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mp3_files_go_to_mpg123() {
        let command = PlaybackCommand::for_file(Path::new("/sounds/alert.mp3"));
        assert_eq!(command.program, "mpg123");
        assert_eq!(command.args, vec!["-q", "-m", "/sounds/alert.mp3"]);
    }

    #[test]
    fn other_extensions_go_to_play() {
        let command = PlaybackCommand::for_file(Path::new("/sounds/alert.wav"));
        assert_eq!(command.program, "play");
        assert_eq!(command.args, vec!["-q", "/sounds/alert.wav"]);
    }

    #[test]
    fn file_lists_keep_order() {
        let command = PlaybackCommand::for_files(&[
            PathBuf::from("/sounds/a.mp3"),
            PathBuf::from("/sounds/b.mp3"),
        ]);
        assert_eq!(command.program, "mpg123");
        assert_eq!(command.args, vec!["-q", "-m", "/sounds/a.mp3", "/sounds/b.mp3"]);
    }

    #[tokio::test]
    async fn abort_with_no_process_is_a_noop() {
        let slot = playback_slot();
        abort_playback(&slot).await;
        assert!(slot.lock().await.is_none());
    }

    #[tokio::test]
    async fn overlong_playback_is_killed_near_the_deadline() {
        let slot = playback_slot();
        let command = PlaybackCommand {
            program: "sleep".to_string(),
            args: vec!["30".to_string()],
        };
        let started = std::time::Instant::now();
        run_playback(&slot, &command, Duration::from_millis(300)).await;
        let elapsed = started.elapsed();
        assert!(elapsed < Duration::from_secs(5), "took {:?}", elapsed);
        assert!(slot.lock().await.is_none());
    }

    #[tokio::test]
    async fn abort_interrupts_a_running_process() {
        let slot = playback_slot();
        let command = PlaybackCommand {
            program: "sleep".to_string(),
            args: vec!["30".to_string()],
        };
        let runner = {
            let slot = Arc::clone(&slot);
            let command = command.clone();
            tokio::spawn(async move {
                run_playback(&slot, &command, Duration::from_secs(60)).await;
            })
        };
        // give the spawn a moment to land in the slot
        tokio::time::sleep(Duration::from_millis(200)).await;
        abort_playback(&slot).await;
        tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .expect("playback did not stop after abort")
            .unwrap();
        assert!(slot.lock().await.is_none());
    }
}
