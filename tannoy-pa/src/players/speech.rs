//! Speech synthesis player
//!
//! Synthesized audio is cached under the speech cache directory, keyed by
//! voice and a content hash of the text, so repeated phrases never hit the
//! synthesis service twice. Synthesis runs in the background from the
//! `prepare` hook; the queue worker holds the job at the head of the line
//! until the artifact lands (or the request fails, in which case playback
//! degrades to a no-op).
//!
//! An announce-style task prepends the configured chime, played as its own
//! blocking call with the same maximum-duration enforcement.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, error};

use crate::error::Result;
use crate::playback::task::{
    abort_playback, playback_slot, run_playback, PlaybackCommand, PlaybackSlot, PlaybackTask,
};

/// HTTP client for the external synthesis service
#[derive(Clone)]
pub struct SpeechClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl SpeechClient {
    pub fn new(endpoint: String, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            api_key,
        }
    }

    /// Synthesize `text` in `voice` and persist the mp3 artifact at `out`.
    /// Text beginning with `<speak>` is submitted as SSML.
    pub async fn synthesize(&self, text: &str, voice: &str, out: &Path) -> Result<()> {
        let text_type = if text.starts_with("<speak>") {
            debug!("submitting as SSML");
            "ssml"
        } else {
            "text"
        };
        let body = serde_json::json!({
            "text": text,
            "voice": voice,
            "format": "mp3",
            "text_type": text_type,
        });
        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?.error_for_status()?;
        let audio = response.bytes().await?;
        if let Some(parent) = out.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // write-then-rename so a half-written artifact never looks cached
        let partial = out.with_extension("part");
        tokio::fs::write(&partial, &audio).await?;
        tokio::fs::rename(&partial, out).await?;
        Ok(())
    }
}

pub struct SpeechPlayer {
    client: SpeechClient,
    cache_dir: PathBuf,
    default_voice: String,
    chime: Option<PathBuf>,
    max_play_time: Duration,
}

impl SpeechPlayer {
    pub fn new(
        client: SpeechClient,
        cache_dir: PathBuf,
        default_voice: String,
        chime: Option<PathBuf>,
        max_play_time: Duration,
    ) -> Self {
        Self {
            client,
            cache_dir,
            default_voice,
            chime,
            max_play_time,
        }
    }

    /// Build a speech task. `voice` falls back to the configured default;
    /// `with_chime` selects the announce variant.
    pub fn task(&self, text: &str, voice: Option<&str>, with_chime: bool) -> Arc<dyn PlaybackTask> {
        Arc::new(SpeechTask::new(
            text,
            voice.unwrap_or(&self.default_voice),
            &self.cache_dir,
            if with_chime { self.chime.clone() } else { None },
            self.max_play_time,
            self.client.clone(),
        ))
    }
}

pub struct SpeechTask {
    text: String,
    voice: String,
    cache_path: PathBuf,
    chime: Option<PathBuf>,
    max_play_time: Duration,
    client: SpeechClient,
    ready: Arc<AtomicBool>,
    slot: PlaybackSlot,
}

impl SpeechTask {
    pub fn new(
        text: &str,
        voice: &str,
        cache_dir: &Path,
        chime: Option<PathBuf>,
        max_play_time: Duration,
        client: SpeechClient,
    ) -> Self {
        let voice = capitalize(voice);
        let hash = format!("{:x}", Sha256::digest(text.as_bytes()));
        let cache_path = cache_dir.join(format!("{}-{}.mp3", voice, hash));
        Self {
            text: text.to_string(),
            voice,
            cache_path,
            chime,
            max_play_time,
            client,
            ready: Arc::new(AtomicBool::new(false)),
            slot: playback_slot(),
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }
}

#[async_trait]
impl PlaybackTask for SpeechTask {
    fn describe(&self) -> String {
        format!(
            "<Speech voice={:?} text={:?} chime={}>",
            self.voice,
            self.text,
            self.chime.is_some()
        )
    }

    async fn prepare(&self) {
        if self.cache_path.is_file() {
            debug!("speech cache hit: {}", self.cache_path.display());
            self.ready.store(true, Ordering::SeqCst);
            return;
        }
        debug!("speech cache miss: {} - requesting", self.cache_path.display());
        let client = self.client.clone();
        let text = self.text.clone();
        let voice = self.voice.clone();
        let cache_path = self.cache_path.clone();
        let ready = Arc::clone(&self.ready);
        tokio::spawn(async move {
            if let Err(e) = client.synthesize(&text, &voice, &cache_path).await {
                error!("speech synthesis failed: {}", e);
            }
            // A failed synthesis still marks the task ready; its play
            // degrades to a no-op instead of starving the queue behind it.
            ready.store(true, Ordering::SeqCst);
        });
    }

    async fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn play(&self) {
        if let Some(chime) = &self.chime {
            if chime.is_file() {
                run_playback(
                    &self.slot,
                    &PlaybackCommand::for_file(chime),
                    self.max_play_time,
                )
                .await;
            } else {
                debug!("chime {} missing, skipping", chime.display());
            }
        }
        if self.cache_path.is_file() {
            run_playback(
                &self.slot,
                &PlaybackCommand::for_file(&self.cache_path),
                self.max_play_time,
            )
            .await;
        } else {
            debug!(
                "speech artifact {} missing, skipping playback",
                self.cache_path.display()
            );
        }
    }

    async fn abort(&self) {
        abort_playback(&self.slot).await;
    }
}

fn capitalize(voice: &str) -> String {
    let mut chars = voice.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
