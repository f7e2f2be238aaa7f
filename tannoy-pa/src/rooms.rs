//! Room/output controller
//!
//! Maps logical room names onto GPIO output-enable lines and drives the
//! system mixer for volume. When the GPIO chip cannot be opened (development
//! machines, CI) the controller degrades to log-only operation; unknown room
//! names are ignored rather than erroring.

use std::collections::HashMap;

use rppal::gpio::{Gpio, OutputPin};
use tokio::process::Command;
use tracing::{debug, warn};

pub struct RoomController {
    channels: HashMap<String, u8>,
    lines: HashMap<u8, OutputPin>,
    mixer: Option<String>,
}

impl RoomController {
    /// Open the output-enable line for every configured room, starting with
    /// all rooms enabled. A missing GPIO chip leaves the controller in
    /// log-only mode.
    pub fn new(channels: HashMap<String, u8>, mixer: Option<String>) -> Self {
        let mut lines = HashMap::new();
        match Gpio::new() {
            Ok(gpio) => {
                for (room, line) in &channels {
                    match gpio.get(*line) {
                        Ok(pin) => {
                            let mut pin = pin.into_output();
                            pin.set_high();
                            lines.insert(*line, pin);
                        }
                        Err(e) => warn!("room {}: GPIO line {} unavailable: {}", room, line, e),
                    }
                }
            }
            Err(e) => warn!("continuing without GPIO: {}", e),
        }
        Self {
            channels,
            lines,
            mixer,
        }
    }

    /// Enable exactly the requested rooms and disable all others. The
    /// sentinel `"all"` enables every line regardless of what else the set
    /// contains.
    pub fn set_rooms(&mut self, rooms: &[String]) {
        if rooms.iter().any(|room| room == "all") {
            debug!("setting rooms=all");
            for pin in self.lines.values_mut() {
                pin.set_high();
            }
            return;
        }
        debug!("setting rooms={:?}", rooms);
        for (room, line) in &self.channels {
            if let Some(pin) = self.lines.get_mut(line) {
                if rooms.contains(room) {
                    pin.set_high();
                } else {
                    pin.set_low();
                }
            }
        }
    }

    /// Apply a volume percentage through the system mixer. Failures are
    /// logged, never propagated; with no mixer configured this is a no-op.
    pub async fn set_volume(&self, level: u8) {
        let Some(mixer) = &self.mixer else { return };
        let level = level.min(100);
        let status = Command::new(mixer)
            .args(["-M", "sset", "PCM"])
            .arg(format!("{}%", level))
            .status()
            .await;
        match status {
            Ok(status) if status.success() => {}
            Ok(status) => warn!("mixer exited with {}", status),
            Err(e) => warn!("failed to run mixer: {}", e),
        }
    }
}
