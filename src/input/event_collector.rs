//! Gamepad event collection on top of gilrs
//!
//! The collector owns the gilrs context on a dedicated thread and forwards only what
//! the assignment flow listens to: button releases plus connect and disconnect
//! notifications. The connected gamepad list is published through a watch channel so
//! enumeration never has to touch the gilrs context itself.
//!
//! ```text
//! Initializing ──► Collecting ──► (shutdown token cancelled)
//! ```

use super::{ButtonType, GamepadEnumerator, GamepadIndex, GamepadInfo, InputEvent};
use chrono::Local;
use gilrs::{Button, Event, EventType, GamepadId, Gilrs};
use statum::{machine, state};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// Collector settings
#[derive(Clone, Debug)]
pub struct CollectorSettings {
    /// Sleep between two empty polls of the gilrs queue
    pub poll_sleep_us: u64,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self { poll_sleep_us: 100 }
    }
}

// Collector errors
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to initialize collector: {0}")]
    InitializationError(String),

    #[error("Failed to send event: {0}")]
    EventSendError(String),

    #[error("Event channel closed")]
    ChannelClosed,
}

#[state]
#[derive(Debug, Clone)]
pub enum CollectionState {
    Initializing,
    Collecting,
}

#[machine]
#[derive(Debug)]
pub struct EventCollector<S: CollectionState> {
    gilrs: Gilrs,
    settings: CollectorSettings,
    event_sender: mpsc::Sender<InputEvent>,
    gamepad_list: watch::Sender<Vec<GamepadInfo>>,
}

impl<S: CollectionState> EventCollector<S> {
    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    fn publish_gamepads(&self) -> usize {
        let gamepads: Vec<GamepadInfo> = self
            .gilrs
            .gamepads()
            .map(|(id, gamepad)| GamepadInfo::new(usize::from(id), gamepad.name()))
            .collect();
        let count = gamepads.len();
        self.gamepad_list.send_replace(gamepads);
        count
    }
}

impl EventCollector<Initializing> {
    pub fn create(
        settings: Option<CollectorSettings>,
        event_sender: mpsc::Sender<InputEvent>,
        gamepad_list: watch::Sender<Vec<GamepadInfo>>,
    ) -> Result<Self, CollectorError> {
        let settings = settings.unwrap_or_default();
        debug!("Creating Event Collector with settings: {:?}", settings);

        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(CollectorError::InitializationError(e.to_string()));
            }
        };

        Ok(Self::new(gilrs, settings, event_sender, gamepad_list))
    }

    /// Publishes the initial gamepad list and starts collecting
    pub fn initialize(self) -> EventCollector<Collecting> {
        let count = self.publish_gamepads();
        if count == 0 {
            warn!("No gamepad connected, only the keyboard can be assigned");
        } else {
            info!("Found {} gamepads:", count);
            for (id, gamepad) in self.gilrs.gamepads() {
                info!("  ID: {}, Name: {}, UUID: {:?}", id, gamepad.name(), gamepad.uuid());
            }
        }
        self.transition()
    }
}

impl EventCollector<Collecting> {
    /// Forwards the next pending gilrs event. Returns whether there was one.
    pub fn collect_next_event(&mut self) -> Result<bool, CollectorError> {
        let Some(Event { id, event, .. }) = self.gilrs.next_event() else {
            return Ok(false);
        };
        let gamepad = usize::from(id);

        if let Some(input_event) = self.convert_gilrs_event(id, event) {
            match self.event_sender.try_send(input_event) {
                Ok(_) => debug!("Event from gamepad {} forwarded", gamepad),
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    return Err(CollectorError::ChannelClosed)
                }
                Err(e) => {
                    error!("Failed to forward gamepad event: {}", e);
                    return Err(CollectorError::EventSendError(e.to_string()));
                }
            }
        }
        Ok(true)
    }

    /// Runs until `shutdown` is cancelled or the event receiver is gone
    pub fn run_collection_loop(&mut self, shutdown: &CancellationToken) {
        info!("Starting Event Collector loop");
        let idle_sleep = Duration::from_micros(self.settings.poll_sleep_us);

        let mut event_count = 0u64;
        let mut last_log_time = Local::now();
        let log_interval = chrono::Duration::seconds(10);

        while !shutdown.is_cancelled() {
            match self.collect_next_event() {
                Ok(true) => event_count += 1,
                Ok(false) => std::thread::sleep(idle_sleep),
                Err(CollectorError::ChannelClosed) => {
                    info!("Event receiver dropped, stopping collector");
                    break;
                }
                Err(e) => error!("Error collecting event: {}", e),
            }

            let now = Local::now();
            if now - last_log_time > log_interval {
                debug!(
                    "Event Collector stats: {} gilrs events in last {} seconds",
                    event_count,
                    log_interval.num_seconds()
                );
                event_count = 0;
                last_log_time = now;
            }
        }
        info!("Event Collector loop finished");
    }

    fn convert_gilrs_event(&mut self, id: GamepadId, event: EventType) -> Option<InputEvent> {
        let gamepad: GamepadIndex = usize::from(id);
        match event {
            EventType::ButtonReleased(button, _) => {
                let button_type = map_button(button);
                info!(
                    "Button released: {:?} on gamepad {} at {}",
                    button_type,
                    gamepad,
                    Local::now().format("%H:%M:%S.%3f")
                );
                Some(InputEvent::button_released(gamepad, button_type))
            }
            EventType::ButtonPressed(button, _) | EventType::ButtonRepeated(button, _) => {
                debug!("Ignoring press/repeat of {:?} on gamepad {}", button, gamepad);
                None
            }
            EventType::Connected => {
                self.publish_gamepads();
                let name = self.gilrs.gamepad(id).name().to_string();
                info!("Gamepad {} connected: {}", gamepad, name);
                Some(InputEvent::GamepadConnected { gamepad, name })
            }
            EventType::Disconnected => {
                self.publish_gamepads();
                warn!("Gamepad {} disconnected", gamepad);
                Some(InputEvent::GamepadDisconnected { gamepad })
            }
            _ => None,
        }
    }
}

/// Enumerates gamepads from the list the collector publishes
#[derive(Debug, Clone)]
pub struct GilrsGamepads {
    receiver: watch::Receiver<Vec<GamepadInfo>>,
}

impl GamepadEnumerator for GilrsGamepads {
    fn enumerate_connected_gamepads(&self) -> Vec<GamepadInfo> {
        self.receiver.borrow().clone()
    }
}

/// Running collector thread
pub struct CollectorHandle {
    shutdown: CancellationToken,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl CollectorHandle {
    /// Starts the collector thread and waits until gilrs is up
    pub async fn spawn(
        settings: Option<CollectorSettings>,
        event_sender: mpsc::Sender<InputEvent>,
        shutdown: CancellationToken,
    ) -> Result<(Self, GilrsGamepads), CollectorError> {
        info!("Spawning Event Collector with settings: {:?}", settings);

        let (list_tx, list_rx) = watch::channel(Vec::new());
        let (ready_tx, ready_rx) = oneshot::channel();
        let token = shutdown.clone();

        let thread = std::thread::Builder::new()
            .name("gamepad-collector".to_string())
            .spawn(move || {
                let collector = match EventCollector::create(settings, event_sender, list_tx) {
                    Ok(collector) => collector,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let mut collecting = collector.initialize();
                let _ = ready_tx.send(Ok(()));
                collecting.run_collection_loop(&token);
            })
            .map_err(|e| CollectorError::InitializationError(e.to_string()))?;

        ready_rx
            .await
            .map_err(|_| CollectorError::InitializationError("collector thread died".into()))??;
        info!("Event Collector successfully started");

        Ok((
            Self {
                shutdown,
                thread: Some(thread),
            },
            GilrsGamepads { receiver: list_rx },
        ))
    }

    /// Cancels the collector and joins its thread
    pub fn stop(mut self) {
        self.shutdown.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Gamepad collector thread panicked");
            }
        }
    }
}

// Helper function to map gilrs Button to our ButtonType
fn map_button(button: Button) -> ButtonType {
    match button {
        Button::South => ButtonType::A,
        Button::East => ButtonType::B,
        Button::West => ButtonType::Y,
        Button::North => ButtonType::X,
        Button::Start => ButtonType::Start,
        Button::Select => ButtonType::Select,
        Button::LeftTrigger => ButtonType::LeftBumper,
        Button::RightTrigger => ButtonType::RightBumper,
        Button::LeftThumb => ButtonType::LeftStick,
        Button::RightThumb => ButtonType::RightStick,
        Button::DPadUp => ButtonType::DPadUp,
        Button::DPadDown => ButtonType::DPadDown,
        Button::DPadLeft => ButtonType::DPadLeft,
        Button::DPadRight => ButtonType::DPadRight,
        Button::Mode => ButtonType::Guide,
        _ => ButtonType::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_buttons_still_count_as_releases() {
        assert_eq!(map_button(Button::South), ButtonType::A);
        assert_eq!(map_button(Button::Mode), ButtonType::Guide);
        assert_eq!(map_button(Button::C), ButtonType::Other);
    }

    #[test]
    fn gilrs_enumerator_reads_published_list() {
        let (tx, rx) = watch::channel(Vec::new());
        let gamepads = GilrsGamepads { receiver: rx };
        assert!(gamepads.enumerate_connected_gamepads().is_empty());

        tx.send_replace(vec![GamepadInfo::new(0, "Pad")]);
        assert_eq!(
            gamepads.enumerate_connected_gamepads(),
            vec![GamepadInfo::new(0, "Pad")]
        );
    }
}
