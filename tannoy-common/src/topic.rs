//! Inbound command grammar for the `sound/#` topic space
//!
//! Every inbound message is parsed here into a tagged [`Command`] so the
//! daemon dispatches on an enum instead of re-inspecting topic strings.
//! The grammar:
//!
//! - `sound/kill` — flush the queue and stop the current task
//! - `sound/time-out` — payload is whole seconds, clamped to [`MAX_TIME_OUT_SECS`]
//! - `sound/<rooms>/<command>/<args...>[/key=value...]` — rooms are
//!   hyphen-separated lowercase tokens; `vol=<n>` selects the volume
//!   (default [`DEFAULT_VOLUME`], malformed values fall back to it)
//!
//! Malformed requests degrade instead of erroring: unknown commands and
//! unparseable payloads yield `None` and are dropped by the caller.

/// Volume applied when a request carries no (or a malformed) `vol=` keyword
pub const DEFAULT_VOLUME: u8 = 90;

/// Upper bound on a requested suppression window, seconds
pub const MAX_TIME_OUT_SECS: u64 = 600;

/// A fully parsed inbound command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Flush the queue and abort the current task
    Kill,
    /// Suppress all new playback for `seconds`
    TimeOut { seconds: u64 },
    /// Enqueue a playback job
    Play(PlayRequest),
}

/// A playback request: where, how loud, and what
#[derive(Debug, Clone, PartialEq)]
pub struct PlayRequest {
    /// Lowercased room tokens; `"all"` selects every room
    pub rooms: Vec<String>,
    /// Volume percentage, clamped to 100
    pub volume: u8,
    pub action: PlayAction,
}

/// What to play, validated per command at parse time
#[derive(Debug, Clone, PartialEq)]
pub enum PlayAction {
    /// Diagnostic echo of the raw request
    Test {
        payload: String,
        args: Vec<String>,
        kwargs: Vec<(String, String)>,
    },
    /// Synthesized speech in the default voice
    Speak { text: String },
    /// Synthesized speech preceded by the announcement chime
    Announce { text: String },
    /// Synthesized speech in an explicitly selected voice
    Voice { voice: String, text: String },
    /// A single file from the sound repository
    File { name: String },
    /// A comma-separated sequence of files played back to back
    Playlist { names: String },
}

/// Parse an inbound (topic, payload) pair.
///
/// Returns `None` for topics outside the grammar, unknown commands, and
/// payloads that fail command-specific validation.
pub fn parse(topic: &str, payload: &str) -> Option<Command> {
    if topic == "sound/kill" {
        return Some(Command::Kill);
    }

    if topic == "sound/time-out" {
        let seconds: u64 = payload.trim().parse().ok()?;
        return Some(Command::TimeOut {
            seconds: seconds.min(MAX_TIME_OUT_SECS),
        });
    }

    let rest = topic.strip_prefix("sound/")?;
    let (rooms_part, command_part) = rest.split_once('/')?;
    if rooms_part.is_empty() || command_part.is_empty() {
        return None;
    }
    if !rooms_part
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return None;
    }

    let rooms: Vec<String> = rooms_part
        .to_ascii_lowercase()
        .split('-')
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect();
    if rooms.is_empty() {
        return None;
    }

    let (mut args, kwargs) = split_words(command_part);
    if args.is_empty() {
        return None;
    }
    let command = args.remove(0);

    let volume = kwargs
        .iter()
        .find(|(k, _)| k == "vol")
        .and_then(|(_, v)| v.parse::<u8>().ok())
        .unwrap_or(DEFAULT_VOLUME)
        .min(100);
    let kwargs: Vec<(String, String)> = kwargs.into_iter().filter(|(k, _)| k != "vol").collect();

    let action = match command.as_str() {
        "test" => PlayAction::Test {
            payload: payload.to_string(),
            args,
            kwargs,
        },
        "speak" => PlayAction::Speak {
            text: payload.to_string(),
        },
        "announce" => PlayAction::Announce {
            text: payload.to_string(),
        },
        "polly" => {
            if args.is_empty() {
                return None;
            }
            PlayAction::Voice {
                voice: args.remove(0),
                text: payload.to_string(),
            }
        }
        "play" => PlayAction::File {
            name: payload.to_string(),
        },
        "playlist" => PlayAction::Playlist {
            names: payload.to_string(),
        },
        _ => return None,
    };

    Some(Command::Play(PlayRequest {
        rooms,
        volume,
        action,
    }))
}

/// Split topic words into positional args and `key=value` keyword args.
fn split_words(part: &str) -> (Vec<String>, Vec<(String, String)>) {
    let mut args = Vec::new();
    let mut kwargs = Vec::new();
    for word in part.split('/') {
        match word.split_once('=') {
            Some((k, v)) => kwargs.push((k.to_string(), v.to_string())),
            None => args.push(word.to_string()),
        }
    }
    (args, kwargs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_topic() {
        assert_eq!(parse("sound/kill", ""), Some(Command::Kill));
    }

    #[test]
    fn time_out_is_clamped() {
        assert_eq!(
            parse("sound/time-out", "30"),
            Some(Command::TimeOut { seconds: 30 })
        );
        assert_eq!(
            parse("sound/time-out", "99999"),
            Some(Command::TimeOut {
                seconds: MAX_TIME_OUT_SECS
            })
        );
    }

    #[test]
    fn time_out_with_junk_payload_is_dropped() {
        assert_eq!(parse("sound/time-out", "soon"), None);
        assert_eq!(parse("sound/time-out", ""), None);
    }

    #[test]
    fn rooms_are_split_and_lowercased() {
        let Some(Command::Play(req)) = parse("sound/G1-g2/play", "alert.mp3") else {
            panic!("expected a play command");
        };
        assert_eq!(req.rooms, vec!["g1", "g2"]);
        assert_eq!(req.volume, DEFAULT_VOLUME);
        assert_eq!(
            req.action,
            PlayAction::File {
                name: "alert.mp3".into()
            }
        );
    }

    #[test]
    fn vol_keyword_selects_volume() {
        let Some(Command::Play(req)) = parse("sound/all/speak/vol=40", "hello") else {
            panic!("expected a play command");
        };
        assert_eq!(req.volume, 40);
        assert_eq!(
            req.action,
            PlayAction::Speak {
                text: "hello".into()
            }
        );
    }

    #[test]
    fn malformed_vol_falls_back_to_default() {
        let Some(Command::Play(req)) = parse("sound/g1/play/vol=loud", "x.mp3") else {
            panic!("expected a play command");
        };
        assert_eq!(req.volume, DEFAULT_VOLUME);
    }

    #[test]
    fn oversized_vol_is_clamped() {
        let Some(Command::Play(req)) = parse("sound/g1/play/vol=250", "x.mp3") else {
            panic!("expected a play command");
        };
        assert_eq!(req.volume, 100);
    }

    #[test]
    fn test_command_keeps_args_and_kwargs() {
        let Some(Command::Play(req)) = parse("sound/g1/test/a/b/k=v/vol=10", "body") else {
            panic!("expected a play command");
        };
        assert_eq!(req.volume, 10);
        assert_eq!(
            req.action,
            PlayAction::Test {
                payload: "body".into(),
                args: vec!["a".into(), "b".into()],
                kwargs: vec![("k".into(), "v".into())],
            }
        );
    }

    #[test]
    fn polly_requires_a_voice() {
        assert_eq!(parse("sound/g1/polly", "text"), None);
        let Some(Command::Play(req)) = parse("sound/g1/polly/amy", "text") else {
            panic!("expected a play command");
        };
        assert_eq!(
            req.action,
            PlayAction::Voice {
                voice: "amy".into(),
                text: "text".into()
            }
        );
    }

    #[test]
    fn announce_and_playlist_route() {
        assert!(matches!(
            parse("sound/g1/announce", "t"),
            Some(Command::Play(PlayRequest {
                action: PlayAction::Announce { .. },
                ..
            }))
        ));
        assert!(matches!(
            parse("sound/g1/playlist", "a.mp3,b.mp3"),
            Some(Command::Play(PlayRequest {
                action: PlayAction::Playlist { .. },
                ..
            }))
        ));
    }

    #[test]
    fn unknown_commands_and_foreign_topics_are_ignored() {
        assert_eq!(parse("sound/g1/dance", "x"), None);
        assert_eq!(parse("sound/g1", "x"), None);
        assert_eq!(parse("lights/g1/on", "x"), None);
        assert_eq!(parse("sound/g_1/play", "x"), None);
    }
}
