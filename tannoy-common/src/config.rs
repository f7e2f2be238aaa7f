//! Configuration loading and resolution
//!
//! Settings resolve in priority order: command-line argument, environment
//! variable (both handled by clap at the binary boundary), TOML config file
//! (`~/.config/tannoy/config.toml`, then `/etc/tannoy/config.toml`), and
//! finally compiled defaults. A partial config file is fine; absent keys
//! take their defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Daemon configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub http: HttpConfig,
    pub chat: ChatConfig,
    pub sounds: SoundsConfig,
    pub speech: SpeechConfig,
    pub rooms: RoomsConfig,
}

/// MQTT broker connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "tannoy-pa".to_string(),
        }
    }
}

/// HTTP status server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { port: 5750 }
    }
}

/// Chat side-channel settings (notifications are relayed here)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Bus topic the chat relay listens on
    pub topic: String,
    /// Channel named in the relayed JSON payload
    pub channel: String,
    /// Prefix prepended to every message
    pub prefix: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            topic: "irc/send".to_string(),
            channel: "#tannoy".to_string(),
            prefix: "tannoy: ".to_string(),
        }
    }
}

/// Sound repository settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SoundsConfig {
    /// Root of the sound repository; requests resolve under here
    pub root: PathBuf,
    /// Maximum play duration for a single file, seconds
    pub max_play_time_secs: u64,
    /// Per-file duration overrides, keyed by path relative to `root`
    pub duration_overrides: HashMap<String, u64>,
}

impl Default for SoundsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/var/lib/tannoy/sounds"),
            max_play_time_secs: 15,
            duration_overrides: HashMap::new(),
        }
    }
}

/// Speech synthesis settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Where synthesized artifacts are cached
    pub cache_dir: PathBuf,
    /// Synthesis service endpoint
    pub endpoint: String,
    /// Bearer token for the synthesis service
    pub api_key: Option<String>,
    /// Voice used when a request does not name one
    pub default_voice: String,
    /// Chime played before announcements
    pub chime: Option<PathBuf>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("/var/lib/tannoy/sounds/speech"),
            endpoint: "http://localhost:5500/v1/synthesize".to_string(),
            api_key: None,
            default_voice: "brian".to_string(),
            chime: None,
        }
    }
}

/// Room output settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    /// Room token to GPIO output-enable line (BCM numbering)
    pub channels: HashMap<String, u8>,
    /// Mixer utility for volume control; unset disables volume actuation
    pub mixer: Option<String>,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            channels: HashMap::from([
                ("g1".to_string(), 2),
                ("g2".to_string(), 3),
                ("g8".to_string(), 14),
                ("g11".to_string(), 4),
            ]),
            mixer: Some("/usr/bin/amixer".to_string()),
        }
    }
}

/// Load configuration, preferring an explicitly supplied file.
///
/// With no explicit path the platform candidates are tried in order; when
/// none exists the compiled defaults apply.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return read_config(path);
    }
    for candidate in default_config_paths() {
        if candidate.exists() {
            return read_config(&candidate);
        }
    }
    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    toml::from_str(&raw).map_err(|e| Error::Config(format!("invalid {}: {}", path.display(), e)))
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("tannoy").join("config.toml"));
    }
    paths.push(PathBuf::from("/etc/tannoy/config.toml"));
    paths
}
