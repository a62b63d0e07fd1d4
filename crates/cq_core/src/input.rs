//! Keyboard state for the movement loop and the action handlers.
//!
//! - **Held movement keys** live in a [`HeldKeys`] handle shared with the
//!   movement loop. The loop takes one [`HeldKeys::snapshot`] per tick, so a
//!   tick never sees two different key states. Nothing is queued: only the
//!   keys down at the instant of sampling matter.
//!
//! - **Actions** (interact, attack, escape) are edge-triggered. A registered
//!   callback fires on the transition to pressed and never on auto-repeat.
//!
//! Key-down events are dropped while a text field owns focus, and losing
//! window focus releases every held key so nothing sticks after alt-tab.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use crate::direction::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    W,
    A,
    S,
    D,
    E,
    F,
    Enter,
    Space,
    Escape,
}

impl Key {
    pub fn direction(self) -> Option<Direction> {
        match self {
            Key::ArrowUp | Key::W => Some(Direction::Up),
            Key::ArrowDown | Key::S => Some(Direction::Down),
            Key::ArrowLeft | Key::A => Some(Direction::Left),
            Key::ArrowRight | Key::D => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn action(self) -> Option<Action> {
        match self {
            Key::E | Key::Enter => Some(Action::Interact),
            Key::Space | Key::F => Some(Action::Attack),
            Key::Escape => Some(Action::Escape),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Interact,
    Attack,
    Escape,
}

/// Shared set of held movement keys. Cloning yields another handle to the
/// same set.
#[derive(Debug, Clone, Default)]
pub struct HeldKeys {
    inner: Arc<RwLock<HashSet<Key>>>,
}

impl HeldKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current set. Callers sample once and work from the copy.
    pub fn snapshot(&self) -> HashSet<Key> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_direction_held(&self, direction: Direction) -> bool {
        direction_held(&self.snapshot(), direction)
    }

    pub fn is_empty(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_empty()
    }

    fn insert(&self, key: Key) -> bool {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key)
    }

    fn remove(&self, key: Key) -> bool {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&key)
    }

    fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

/// True if any alias of `direction` is in `held`.
pub fn direction_held(held: &HashSet<Key>, direction: Direction) -> bool {
    held.iter().any(|key| key.direction() == Some(direction))
}

type ActionCallback = Box<dyn FnMut(Action)>;

pub struct InputTracker {
    held: HeldKeys,
    actions_down: HashSet<Key>,
    text_focus: bool,
    callbacks: Vec<(Action, ActionCallback)>,
}

impl InputTracker {
    pub fn new() -> Self {
        Self::with_held_keys(HeldKeys::new())
    }

    /// Track into an existing shared set, typically the one already handed
    /// to a movement loop.
    pub fn with_held_keys(held: HeldKeys) -> Self {
        Self {
            held,
            actions_down: HashSet::new(),
            text_focus: false,
            callbacks: Vec::new(),
        }
    }

    pub fn held_keys(&self) -> HeldKeys {
        self.held.clone()
    }

    pub fn on_action(&mut self, action: Action, callback: impl FnMut(Action) + 'static) {
        self.callbacks.push((action, Box::new(callback)));
    }

    pub fn set_text_focus(&mut self, focused: bool) {
        self.text_focus = focused;
    }

    pub fn has_text_focus(&self) -> bool {
        self.text_focus
    }

    pub fn key_down(&mut self, key: Key) {
        if self.text_focus {
            log::trace!("Ignoring {:?} while a text field has focus", key);
            return;
        }
        if key.direction().is_some() {
            self.held.insert(key);
        }
        if let Some(action) = key.action() {
            // Auto-repeat arrives as further key-downs; only the edge counts.
            if self.actions_down.insert(key) {
                self.fire(action);
            }
        }
    }

    pub fn key_up(&mut self, key: Key) {
        if key.direction().is_some() {
            self.held.remove(key);
        }
        self.actions_down.remove(&key);
    }

    pub fn focus_lost(&mut self) {
        if !self.held.is_empty() {
            log::debug!("Window focus lost, releasing held keys");
        }
        self.held.clear();
        self.actions_down.clear();
    }

    fn fire(&mut self, action: Action) {
        for (registered, callback) in &mut self.callbacks {
            if *registered == action {
                callback(action);
            }
        }
    }
}

impl Default for InputTracker {
    fn default() -> Self {
        Self::new()
    }
}
