//! Player resolution and task construction tests
//!
//! Build tasks against a temporary sound repository and check how requests
//! resolve, degrade, and key the speech cache.

use std::collections::HashMap;
use std::fs;
use std::time::Duration;

use tannoy_pa::playback::PlaybackTask;
use tannoy_pa::players::file::FileTask;
use tannoy_pa::players::files::FilesTask;
use tannoy_pa::players::speech::{SpeechClient, SpeechTask};

const MAX_PLAY: Duration = Duration::from_secs(15);

fn sound_root() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("alerts")).unwrap();
    fs::write(dir.path().join("alert.mp3"), b"mp3").unwrap();
    fs::write(dir.path().join("siren.wav"), b"wav").unwrap();
    fs::write(dir.path().join("alerts/a.mp3"), b"mp3").unwrap();
    fs::write(dir.path().join("alerts/b.mp3"), b"mp3").unwrap();
    dir
}

fn no_overrides() -> HashMap<String, u64> {
    HashMap::new()
}

#[test]
fn single_file_resolves_to_exactly_that_file() {
    let root = sound_root();
    let task = FileTask::new("alert.mp3", root.path(), MAX_PLAY, &no_overrides());
    let command = task.command().expect("expected a playable command");
    assert_eq!(command.program, "mpg123");
    assert_eq!(task.selected().unwrap(), root.path().join("alert.mp3"));
    assert!(task.describe().contains("alert.mp3"));
}

#[test]
fn wav_files_use_the_sox_player() {
    let root = sound_root();
    let task = FileTask::new("siren.wav", root.path(), MAX_PLAY, &no_overrides());
    assert_eq!(task.command().unwrap().program, "play");
}

#[test]
fn path_traversal_yields_no_command() {
    let root = sound_root();
    let task = FileTask::new("../etc/passwd", root.path(), MAX_PLAY, &no_overrides());
    assert!(task.command().is_none());
    assert!(task.describe().contains("none"));
}

#[test]
fn missing_file_yields_no_command() {
    let root = sound_root();
    let task = FileTask::new("ghost.mp3", root.path(), MAX_PLAY, &no_overrides());
    assert!(task.command().is_none());
}

#[test]
fn trailing_separator_picks_a_file_from_the_subtree() {
    let root = sound_root();
    let task = FileTask::new("alerts/", root.path(), MAX_PLAY, &no_overrides());
    let selected = task.selected().expect("expected a random pick");
    assert!(selected.starts_with(root.path().join("alerts")));
    assert!(task.command().is_some());
}

#[test]
fn duration_override_replaces_the_default_bound() {
    let root = sound_root();
    let overrides = HashMap::from([("alert.mp3".to_string(), 32u64)]);
    let task = FileTask::new("alert.mp3", root.path(), MAX_PLAY, &overrides);
    assert_eq!(task.max_play_time(), Duration::from_secs(32));

    // unrelated files keep the default
    let other = FileTask::new("siren.wav", root.path(), MAX_PLAY, &overrides);
    assert_eq!(other.max_play_time(), MAX_PLAY);
}

#[test]
fn playlist_with_mixed_extensions_yields_no_command() {
    let root = sound_root();
    let task = FilesTask::new("alert.mp3,siren.wav", root.path(), MAX_PLAY);
    assert_eq!(task.selected().len(), 2);
    assert!(task.command().is_none());
}

#[test]
fn playlist_with_one_extension_plays_in_request_order() {
    let root = sound_root();
    let task = FilesTask::new("alerts/a.mp3,alerts/b.mp3", root.path(), MAX_PLAY);
    let command = task.command().expect("expected a playable command");
    assert_eq!(command.program, "mpg123");
    let a = root.path().join("alerts/a.mp3").display().to_string();
    let b = root.path().join("alerts/b.mp3").display().to_string();
    assert_eq!(&command.args[command.args.len() - 2..], &[a, b]);
    assert_eq!(task.max_play_time(), MAX_PLAY * 2);
}

#[test]
fn playlist_missing_members_are_excluded_not_fatal() {
    let root = sound_root();
    let task = FilesTask::new("alert.mp3,ghost.mp3", root.path(), MAX_PLAY);
    assert_eq!(task.selected().len(), 1);
    assert!(task.command().is_some());
    assert_eq!(task.max_play_time(), MAX_PLAY);
}

fn speech_client() -> SpeechClient {
    // unroutable endpoint: any attempt to actually synthesize would fail
    SpeechClient::new("http://127.0.0.1:9/v1/synthesize".to_string(), None)
}

#[test]
fn speech_cache_key_is_stable_per_text_and_voice() {
    let cache = tempfile::tempdir().unwrap();
    let first = SpeechTask::new("doors closing", "brian", cache.path(), None, MAX_PLAY, speech_client());
    let second = SpeechTask::new("doors closing", "brian", cache.path(), None, MAX_PLAY, speech_client());
    assert_eq!(first.cache_path(), second.cache_path());

    let other_voice = SpeechTask::new("doors closing", "amy", cache.path(), None, MAX_PLAY, speech_client());
    assert_ne!(first.cache_path(), other_voice.cache_path());

    let other_text = SpeechTask::new("doors opening", "brian", cache.path(), None, MAX_PLAY, speech_client());
    assert_ne!(first.cache_path(), other_text.cache_path());

    // voice is normalized to the service convention in the key
    assert!(first
        .cache_path()
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("Brian-"));
}

#[tokio::test]
async fn cached_artifact_makes_the_task_ready_without_synthesis() {
    let cache = tempfile::tempdir().unwrap();
    let task = SpeechTask::new("mind the gap", "brian", cache.path(), None, MAX_PLAY, speech_client());
    fs::write(task.cache_path(), b"cached mp3").unwrap();

    task.prepare().await;
    // a cache hit is ready immediately; nothing was sent to the service
    assert!(task.is_ready().await);
}

#[tokio::test]
async fn failed_synthesis_still_marks_the_task_ready() {
    let cache = tempfile::tempdir().unwrap();
    let task = SpeechTask::new("mind the gap", "brian", cache.path(), None, MAX_PLAY, speech_client());

    task.prepare().await;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !task.is_ready().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "task never became ready after synthesis failure"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    // no artifact was cached
    assert!(!task.cache_path().exists());
}

#[tokio::test]
async fn abort_is_safe_before_and_after_playback() {
    let root = sound_root();
    let task = FileTask::new("ghost.mp3", root.path(), MAX_PLAY, &no_overrides());
    // not started
    task.abort().await;
    // played (no command, so play is a silent no-op) and finished
    task.play().await;
    task.abort().await;
}
