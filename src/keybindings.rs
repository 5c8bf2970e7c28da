//! Customizable keybindings for roimark.
//!
//! Keys are named the way host toolkits report them: a single character such
//! as `"n"`, or a modifier combination such as `"ctrl+z"`.

use serde::{Deserialize, Serialize};

use crate::session::Command;

/// A session action that can be bound to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    NextImage,
    Save,
    /// Lower the upper brightness level
    MaxDown,
    /// Raise the upper brightness level
    MaxUp,
    /// Lower the lower brightness level
    MinDown,
    /// Raise the lower brightness level
    MinUp,
    Undo,
}

impl KeyAction {
    /// Get all bindable actions in display order.
    pub fn all() -> &'static [KeyAction] {
        &[
            KeyAction::NextImage,
            KeyAction::Save,
            KeyAction::MaxDown,
            KeyAction::MaxUp,
            KeyAction::MinDown,
            KeyAction::MinUp,
            KeyAction::Undo,
        ]
    }

    /// Get the display name for this action.
    pub fn name(&self) -> &'static str {
        match self {
            KeyAction::NextImage => "Next image",
            KeyAction::Save => "Save",
            KeyAction::MaxDown => "Lower brightness cap",
            KeyAction::MaxUp => "Raise brightness cap",
            KeyAction::MinDown => "Lower brightness floor",
            KeyAction::MinUp => "Raise brightness floor",
            KeyAction::Undo => "Undo last shape",
        }
    }

    /// The session command issued by this action.
    pub fn command(&self) -> Command {
        match self {
            KeyAction::NextImage => Command::NextImage,
            KeyAction::Save => Command::Save,
            KeyAction::MaxDown => Command::BrightnessDown,
            KeyAction::MaxUp => Command::BrightnessUp,
            KeyAction::MinDown => Command::MinDown,
            KeyAction::MinUp => Command::MinUp,
            KeyAction::Undo => Command::Undo,
        }
    }
}

/// Keybinding configuration for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub next_image: String,
    pub save: String,
    pub max_down: String,
    pub max_up: String,
    pub min_down: String,
    pub min_up: String,
    pub undo: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            next_image: "n".to_string(),
            save: "w".to_string(),
            max_down: "z".to_string(),
            max_up: "x".to_string(),
            min_down: "c".to_string(),
            min_up: "v".to_string(),
            undo: "ctrl+z".to_string(),
        }
    }
}

impl KeyBindings {
    /// Create new keybindings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the key bound to an action.
    pub fn key_for(&self, action: KeyAction) -> &str {
        match action {
            KeyAction::NextImage => &self.next_image,
            KeyAction::Save => &self.save,
            KeyAction::MaxDown => &self.max_down,
            KeyAction::MaxUp => &self.max_up,
            KeyAction::MinDown => &self.min_down,
            KeyAction::MinUp => &self.min_up,
            KeyAction::Undo => &self.undo,
        }
    }

    /// Set the key for an action.
    pub fn set_key(&mut self, action: KeyAction, key: impl Into<String>) {
        let key = key.into();
        match action {
            KeyAction::NextImage => self.next_image = key,
            KeyAction::Save => self.save = key,
            KeyAction::MaxDown => self.max_down = key,
            KeyAction::MaxUp => self.max_up = key,
            KeyAction::MinDown => self.min_down = key,
            KeyAction::MinUp => self.min_up = key,
            KeyAction::Undo => self.undo = key,
        }
    }

    /// Get the action that corresponds to a key press, if any.
    pub fn action_for_key(&self, key: &str) -> Option<KeyAction> {
        KeyAction::all()
            .iter()
            .copied()
            .find(|action| self.key_for(*action) == key)
    }

    /// Get the session command for a key press, if the key is bound.
    pub fn command_for_key(&self, key: &str) -> Option<Command> {
        self.action_for_key(key).map(|action| action.command())
    }

    /// Pairs of actions bound to the same key.
    ///
    /// Key presses resolve to the first action of a pair, so the second one
    /// cannot be triggered.
    pub fn conflicts(&self) -> Vec<(KeyAction, KeyAction)> {
        let actions = KeyAction::all();
        actions
            .iter()
            .enumerate()
            .filter_map(|(i, action)| {
                let key = self.key_for(*action);
                actions[..i]
                    .iter()
                    .find(|earlier| self.key_for(**earlier) == key)
                    .map(|earlier| (*earlier, *action))
            })
            .collect()
    }

    /// One line per binding, for an on-screen cheat sheet.
    pub fn help_text(&self) -> String {
        KeyAction::all()
            .iter()
            .map(|action| format!("{}: {}", self.key_for(*action), action.name()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
