//! MQTT bus glue
//!
//! Subscribes to the `sound/#` command topics, routes parsed commands into
//! the queue through the matching player, and relays notification events to
//! the chat side channel. Everything here is thin: the grammar lives in
//! `tannoy_common::topic`, policy lives in the queue coordinator.

use std::time::Duration;

use chrono::Utc;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use tannoy_common::config::{ChatConfig, Config};
use tannoy_common::events::{EventBus, TannoyEvent};
use tannoy_common::topic::{self, Command, PlayAction};

use crate::error::Result;
use crate::playback::SoundQueue;
use crate::players::{FilePlayer, FilesPlayer, SpeechClient, SpeechPlayer, TestPlayer};

/// Routes parsed commands to the queue via the matching player
pub struct Dispatcher {
    queue: SoundQueue,
    test: TestPlayer,
    speech: SpeechPlayer,
    file: FilePlayer,
    files: FilesPlayer,
}

impl Dispatcher {
    pub fn new(config: &Config, queue: SoundQueue) -> Self {
        let max_play_time = Duration::from_secs(config.sounds.max_play_time_secs);
        Self {
            queue,
            test: TestPlayer,
            speech: SpeechPlayer::new(
                SpeechClient::new(
                    config.speech.endpoint.clone(),
                    config.speech.api_key.clone(),
                ),
                config.speech.cache_dir.clone(),
                config.speech.default_voice.clone(),
                config.speech.chime.clone(),
                max_play_time,
            ),
            // single files get a little headroom over the base bound
            file: FilePlayer::new(
                config.sounds.root.clone(),
                max_play_time + Duration::from_secs(5),
                config.sounds.duration_overrides.clone(),
            ),
            files: FilesPlayer::new(config.sounds.root.clone(), max_play_time),
        }
    }

    pub async fn dispatch(&self, command: Command) {
        match command {
            Command::Kill => self.queue.kill().await,
            Command::TimeOut { seconds } => self.queue.time_out(seconds).await,
            Command::Play(request) => {
                let task = match request.action {
                    PlayAction::Test {
                        payload,
                        args,
                        kwargs,
                    } => self.test.task(&payload, args, kwargs),
                    PlayAction::Speak { text } => self.speech.task(&text, None, false),
                    PlayAction::Announce { text } => self.speech.task(&text, None, true),
                    PlayAction::Voice { voice, text } => {
                        self.speech.task(&text, Some(&voice), false)
                    }
                    PlayAction::File { name } => self.file.task(&name),
                    PlayAction::Playlist { names } => self.files.task(&names),
                };
                self.queue
                    .enqueue(request.rooms, request.volume, task)
                    .await;
            }
        }
    }
}

/// Connect to the broker and serve forever: inbound `sound/#` messages are
/// parsed and dispatched; outbound events are relayed to the chat topic.
/// Connection errors retry with a short pause rather than propagating.
pub async fn run(config: &Config, dispatcher: Dispatcher, events: EventBus) -> Result<()> {
    let mut options = MqttOptions::new(
        config.mqtt.client_id.as_str(),
        config.mqtt.host.as_str(),
        config.mqtt.port,
    );
    options.set_keep_alive(Duration::from_secs(30));
    let (client, mut eventloop) = AsyncClient::new(options, 64);
    client.subscribe("sound/#", QoS::AtMostOnce).await?;

    spawn_chat_relay(client.clone(), config.chat.clone(), events.subscribe());
    events.emit(TannoyEvent::Ready {
        timestamp: Utc::now(),
    });

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                // retained messages are stale state, not commands
                if publish.retain {
                    continue;
                }
                let payload = String::from_utf8_lossy(&publish.payload).into_owned();
                debug!("* {} {:?}", publish.topic, payload);
                match topic::parse(&publish.topic, &payload) {
                    Some(command) => dispatcher.dispatch(command).await,
                    None => debug!("ignoring {}", publish.topic),
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("bus connection error: {}, retrying", e);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

/// Forward every notification event to the chat relay topic.
fn spawn_chat_relay(
    client: AsyncClient,
    chat: ChatConfig,
    mut rx: broadcast::Receiver<TannoyEvent>,
) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let payload = event.chat_payload(&chat.channel, &chat.prefix);
                    if let Err(e) = client
                        .publish(chat.topic.as_str(), QoS::AtMostOnce, false, payload)
                        .await
                    {
                        warn!("chat relay publish failed: {}", e);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("chat relay lagged, {} events dropped", missed);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
