//! Pre-game session: main menu, controller assignment, hand-over to gameplay
//!
//! Input is processed in batches, one batch per scheduling tick:
//!
//! ```text
//! mpsc<InputEvent> ──► batch ──► current screen ──► observations ──► hub.tick()
//! ```
//!
//! Listeners registered while a batch is processed only go live with the tick at the
//! end of that batch.

use crate::assignment::{
    AssignmentCoordinator, AssignmentError, AssignmentSettings, Observation, SlotAssignment,
};
use crate::input::{ActivationPolicy, GamepadEnumerator, InputEvent, ListenerHub};
use crate::players::{GameMode, GameSettings, PlayerRoster, RosterError};
use crate::screens::{MainMenu, MenuAction, Screen, ScreenId};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Assignment error: {0}")]
    Assignment(#[from] AssignmentError),

    #[error("Roster error: {0}")]
    Roster(#[from] RosterError),

    #[error("Input channel closed before the session finished")]
    InputClosed,
}

/// How a session ended
#[derive(Debug, Clone)]
pub enum SessionOutcome {
    /// Every player has a controller, gameplay may start
    Ready {
        mode: GameMode,
        assignments: Vec<SlotAssignment>,
        roster: PlayerRoster,
    },
    /// Exit chosen in the main menu
    Exited,
    /// Shut down from outside
    Cancelled,
}

/// Drives one pass from the main menu to players ready
pub struct Session<E: GamepadEnumerator> {
    hub: ListenerHub<E>,
    coordinator: AssignmentCoordinator,
    observations: mpsc::UnboundedReceiver<Observation>,
    screen: Screen,
    game: GameSettings,
    mode: GameMode,
    roster: Option<PlayerRoster>,
    outcome: Option<SessionOutcome>,
}

impl<E: GamepadEnumerator> Session<E> {
    /// Creates the session with the main menu open
    pub fn new(gamepads: E, assignment: AssignmentSettings, game: GameSettings) -> Self {
        let policy = if assignment.defer_subscriptions {
            ActivationPolicy::NextTick
        } else {
            ActivationPolicy::Immediate
        };
        let mut hub = ListenerHub::new(gamepads, policy);
        let (observation_tx, observations) = mpsc::unbounded_channel();
        let coordinator = AssignmentCoordinator::new(assignment, observation_tx);
        let menu = MainMenu::prepare(&mut hub);
        info!("Displaying {}", ScreenId::MainMenu);

        Self {
            hub,
            coordinator,
            observations,
            screen: Screen::MainMenu(menu),
            mode: game.mode,
            game,
            roster: None,
            outcome: None,
        }
    }

    pub fn screen_id(&self) -> ScreenId {
        self.screen.id()
    }

    pub fn hub(&self) -> &ListenerHub<E> {
        &self.hub
    }

    pub fn hub_mut(&mut self) -> &mut ListenerHub<E> {
        &mut self.hub
    }

    pub fn coordinator(&self) -> &AssignmentCoordinator {
        &self.coordinator
    }

    pub fn roster(&self) -> Option<&PlayerRoster> {
        self.roster.as_ref()
    }

    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    /// Skips the main menu and opens the controller screen for `mode`
    ///
    /// The session is left as it was when the roster cannot be built or the
    /// negotiation does not start.
    pub fn begin_assignment(&mut self, mode: GameMode) -> Result<(), SessionError> {
        let mut roster = PlayerRoster::for_mode(mode, &self.game)?;
        self.coordinator.start(&mut self.hub, roster.len() as i64)?;

        if let Screen::MainMenu(menu) = &mut self.screen {
            menu.remove_listeners(&mut self.hub);
        }
        roster.freeze_players();
        self.mode = mode;
        self.roster = Some(roster);
        self.screen = Screen::Controllers;
        info!("Displaying {}", ScreenId::Controllers);

        self.drain_observations()
    }

    /// Routes one event to the current screen
    pub fn handle_event(&mut self, event: &InputEvent) -> Result<(), SessionError> {
        if self.outcome.is_some() {
            return Ok(());
        }

        match &mut self.screen {
            Screen::MainMenu(menu) => match menu.deliver(&mut self.hub, event) {
                Some(MenuAction::Play(mode)) => {
                    if let Err(e) = self.begin_assignment(mode) {
                        warn!("Cannot start {:?} game: {}", mode, e);
                        self.screen = Screen::MainMenu(MainMenu::prepare(&mut self.hub));
                        info!("Displaying {}", ScreenId::MainMenu);
                    }
                }
                Some(MenuAction::Exit) => {
                    info!("Exit selected");
                    self.outcome = Some(SessionOutcome::Exited);
                }
                None => {}
            },
            Screen::Controllers => {
                self.coordinator.deliver(&mut self.hub, event);
                self.drain_observations()?;
            }
            Screen::Ingame => debug!("Ignoring {:?} in game", event),
        }
        Ok(())
    }

    /// Processes one tick worth of events, then activates pending listeners
    pub fn handle_batch(
        &mut self,
        events: Vec<InputEvent>,
    ) -> Result<Option<SessionOutcome>, SessionError> {
        if !events.is_empty() {
            debug!("Processing batch of {} input events", events.len());
        }
        for event in &events {
            self.handle_event(event)?;
            if self.outcome.is_some() {
                break;
            }
        }
        self.hub.tick();
        Ok(self.outcome.clone())
    }

    /// Stops whatever is running and ends the session as cancelled
    pub fn cancel(&mut self) -> SessionOutcome {
        info!("Cancelling session on {}", self.screen.id());
        if let Screen::MainMenu(menu) = &mut self.screen {
            menu.remove_listeners(&mut self.hub);
        }
        self.coordinator.cancel(&mut self.hub);
        let outcome = SessionOutcome::Cancelled;
        self.outcome = Some(outcome.clone());
        outcome
    }

    /// Runs the session on a fixed tick until it finishes or `shutdown` fires
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<InputEvent>,
        tick: Duration,
        shutdown: CancellationToken,
    ) -> Result<SessionOutcome, SessionError> {
        info!("Starting session loop with {}ms ticks", tick.as_millis());
        let mut interval = tokio::time::interval(tick);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(self.cancel()),
                _ = interval.tick() => {}
            }

            let mut batch = Vec::new();
            let mut closed = false;
            loop {
                match events.try_recv() {
                    Ok(event) => batch.push(event),
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        closed = true;
                        break;
                    }
                }
            }

            if let Some(outcome) = self.handle_batch(batch)? {
                return Ok(outcome);
            }
            if closed {
                warn!("Input channel closed on {}", self.screen.id());
                self.cancel();
                return Err(SessionError::InputClosed);
            }
        }
    }

    fn drain_observations(&mut self) -> Result<(), SessionError> {
        while let Ok(observation) = self.observations.try_recv() {
            match observation {
                Observation::SlotAdvanced(slot) => {
                    info!("Player {}: press any button on your controller", slot + 1);
                }
                Observation::NegotiationComplete(assignments) => {
                    self.players_ready(assignments)?;
                }
            }
        }
        Ok(())
    }

    fn players_ready(&mut self, assignments: Vec<SlotAssignment>) -> Result<(), SessionError> {
        let Some(mut roster) = self.roster.take() else {
            warn!("Negotiation finished without a roster");
            return Ok(());
        };
        roster.apply_assignments(&assignments)?;
        roster.unfreeze_players();

        self.screen = Screen::Ingame;
        info!("Displaying {}", ScreenId::Ingame);

        self.roster = Some(roster.clone());
        self.outcome = Some(SessionOutcome::Ready {
            mode: self.mode,
            assignments,
            roster,
        });
        Ok(())
    }
}
