//! # Input Protocol
//!
//! Keyboard chords the host forwards to the editor, and the commands they map to.

use serde::{Deserialize, Serialize};

/// State of keyboard modifiers (Shift, Ctrl, Alt, Meta).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifiersState {
    /// Shift key is pressed.
    pub shift: bool,
    /// Ctrl key is pressed.
    pub ctrl: bool,
    /// Alt / Option key is pressed.
    pub alt: bool,
    /// Meta / Command / Windows key is pressed.
    pub meta: bool,
}

impl ModifiersState {
    pub const CTRL: Self = Self {
        shift: false,
        ctrl: true,
        alt: false,
        meta: false,
    };

    /// Ctrl on Linux/Windows, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Standard keyboard keys that the editor cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Delete,
    Backspace,
    S,
    Y,
    Z,
}

/// An editor-level action triggered by a shortcut or an explicit UI control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditorCommand {
    Save,
    Undo,
    Redo,
    DeleteSelection,
}

/// Maps a key chord to a command.
///
/// `consumed_by_content` is set when a form field inside a node has focus, in which
/// case editing keys belong to the field rather than the graph.
pub fn command_for(
    key: Key,
    modifiers: ModifiersState,
    consumed_by_content: bool,
) -> Option<EditorCommand> {
    match key {
        Key::S if modifiers.command() => Some(EditorCommand::Save),
        _ if consumed_by_content => None,
        Key::Z if modifiers.command() && modifiers.shift => Some(EditorCommand::Redo),
        Key::Z if modifiers.command() => Some(EditorCommand::Undo),
        Key::Y if modifiers.command() => Some(EditorCommand::Redo),
        Key::Delete | Key::Backspace if !modifiers.command() => {
            Some(EditorCommand::DeleteSelection)
        }
        _ => None,
    }
}
