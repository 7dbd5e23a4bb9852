//! Screens of the pre-game flow
//!
//! Each screen is a variant of [`Screen`]; the session matches on it to decide where
//! an input event goes. Only the main menu carries state of its own, the controller
//! screen is driven entirely by the assignment coordinator.

use crate::input::{InputEvent, InputSubsystem, Key, SubscriptionId};
use crate::players::GameMode;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenId {
    MainMenu,
    Controllers,
    Ingame,
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenId::MainMenu => write!(f, "MENU-MAIN"),
            ScreenId::Controllers => write!(f, "MENU-CONTROLLERS"),
            ScreenId::Ingame => write!(f, "INGAME-SCREEN"),
        }
    }
}

#[derive(Debug)]
pub enum Screen {
    MainMenu(MainMenu),
    Controllers,
    Ingame,
}

impl Screen {
    pub fn id(&self) -> ScreenId {
        match self {
            Screen::MainMenu(_) => ScreenId::MainMenu,
            Screen::Controllers => ScreenId::Controllers,
            Screen::Ingame => ScreenId::Ingame,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    Start,
    Coop,
    Exit,
}

impl fmt::Display for MenuOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuOption::Start => write!(f, "Start"),
            MenuOption::Coop => write!(f, "Co-op"),
            MenuOption::Exit => write!(f, "Exit"),
        }
    }
}

pub const MAIN_MENU_OPTIONS: [MenuOption; 3] = [MenuOption::Start, MenuOption::Coop, MenuOption::Exit];

/// What confirming a main menu entry asks the session to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Play(GameMode),
    Exit,
}

/// Keyboard-driven main menu
#[derive(Debug, Default)]
pub struct MainMenu {
    selection: usize,
    listener: Option<SubscriptionId>,
}

impl MainMenu {
    /// Opens the menu: selection back to the top, key listener registered
    pub fn prepare<S: InputSubsystem + ?Sized>(input: &mut S) -> Self {
        let listener = input.subscribe_key_released();
        debug!("Main menu listening on {}", listener);
        Self {
            selection: 0,
            listener: Some(listener),
        }
    }

    pub fn selection(&self) -> MenuOption {
        MAIN_MENU_OPTIONS[self.selection]
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    /// Handles a key release; returns the action when an entry was confirmed
    pub fn deliver<S: InputSubsystem + ?Sized>(
        &mut self,
        input: &mut S,
        event: &InputEvent,
    ) -> Option<MenuAction> {
        let listener = self.listener?;
        if !input.is_delivering(listener) {
            return None;
        }
        let InputEvent::KeyReleased { key, .. } = event else {
            return None;
        };

        match key {
            Key::Up => {
                self.selection = self.selection.saturating_sub(1);
                debug!("Menu selection: {}", self.selection());
                None
            }
            Key::Down => {
                self.selection = (self.selection + 1).min(MAIN_MENU_OPTIONS.len() - 1);
                debug!("Menu selection: {}", self.selection());
                None
            }
            Key::Enter | Key::Space => {
                let option = self.selection();
                info!("Main menu: {} selected", option);
                // disabled until prepared again so the entry cannot fire twice
                self.remove_listeners(input);
                Some(match option {
                    MenuOption::Start => MenuAction::Play(GameMode::Singleplayer),
                    MenuOption::Coop => MenuAction::Play(GameMode::Coop),
                    MenuOption::Exit => MenuAction::Exit,
                })
            }
            Key::Char(_) => None,
        }
    }

    pub fn remove_listeners<S: InputSubsystem + ?Sized>(&mut self, input: &mut S) {
        if let Some(listener) = self.listener.take() {
            input.unsubscribe_key_released(listener);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{ActivationPolicy, ListenerHub, StaticGamepads};

    fn hub() -> ListenerHub<StaticGamepads> {
        ListenerHub::new(StaticGamepads::default(), ActivationPolicy::Immediate)
    }

    #[test]
    fn navigation_is_clamped() {
        let mut input = hub();
        let mut menu = MainMenu::prepare(&mut input);
        let up = InputEvent::key_released(Key::Up);
        let down = InputEvent::key_released(Key::Down);

        menu.deliver(&mut input, &up);
        assert_eq!(menu.selection(), MenuOption::Start);
        for _ in 0..5 {
            menu.deliver(&mut input, &down);
        }
        assert_eq!(menu.selection(), MenuOption::Exit);
    }

    #[test]
    fn confirm_returns_action_and_stops_listening() {
        let mut input = hub();
        let mut menu = MainMenu::prepare(&mut input);
        menu.deliver(&mut input, &InputEvent::key_released(Key::Down));

        let action = menu.deliver(&mut input, &InputEvent::key_released(Key::Space));
        assert_eq!(action, Some(MenuAction::Play(GameMode::Coop)));
        assert!(!menu.is_listening());
        assert_eq!(input.subscription_count(), 0);
        assert_eq!(menu.deliver(&mut input, &InputEvent::key_released(Key::Enter)), None);
    }

    #[test]
    fn listener_is_deferred_with_next_tick_policy() {
        let mut input = ListenerHub::new(StaticGamepads::default(), ActivationPolicy::NextTick);
        let mut menu = MainMenu::prepare(&mut input);
        let enter = InputEvent::key_released(Key::Enter);

        assert_eq!(menu.deliver(&mut input, &enter), None);
        input.tick();
        assert_eq!(
            menu.deliver(&mut input, &enter),
            Some(MenuAction::Play(GameMode::Singleplayer))
        );
    }
}
