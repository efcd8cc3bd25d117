//! Customizable keybindings for the annotation editor.
//!
//! Mode and class hotkeys are configurable. The edit shortcuts (undo, redo,
//! save, delete) and `Esc` are fixed.

use crate::constants::MAX_CLASS_HOTKEYS;
use crate::input::{KeyCode, KeyEvent};
use crate::model::DrawMode;

/// Editor command triggered by a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Undo,
    Redo,
    Save,
    DeleteSelected,
    /// Remove every box on the image as one undoable step.
    ClearAll,
    SetMode(DrawMode),
    /// Select the class at this position (0-based) in the dataset's list.
    SelectClassIndex(usize),
    /// Leave the annotation view.
    Escape,
}

/// Keybinding configuration for the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindings {
    /// Hotkey for draw mode
    pub mode_draw: KeyCode,
    /// Hotkey for edit mode
    pub mode_edit: KeyCode,
    /// Hotkey for view mode
    pub mode_view: KeyCode,

    /// Hotkeys for class selection (index 0 = first class).
    /// None means no hotkey assigned for that slot.
    pub class_hotkeys: [Option<KeyCode>; MAX_CLASS_HOTKEYS],
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            mode_draw: KeyCode::R,
            mode_edit: KeyCode::E,
            mode_view: KeyCode::V,
            class_hotkeys: default_class_hotkeys(),
        }
    }
}

/// Keys 1-9 for the first nine classes.
pub fn default_class_hotkeys() -> [Option<KeyCode>; MAX_CLASS_HOTKEYS] {
    [
        Some(KeyCode::Key1),
        Some(KeyCode::Key2),
        Some(KeyCode::Key3),
        Some(KeyCode::Key4),
        Some(KeyCode::Key5),
        Some(KeyCode::Key6),
        Some(KeyCode::Key7),
        Some(KeyCode::Key8),
        Some(KeyCode::Key9),
    ]
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the draw mode that corresponds to a key press, if any.
    pub fn mode_for_key(&self, key: KeyCode) -> Option<DrawMode> {
        if key == self.mode_draw {
            Some(DrawMode::Draw)
        } else if key == self.mode_edit {
            Some(DrawMode::Edit)
        } else if key == self.mode_view {
            Some(DrawMode::View)
        } else {
            None
        }
    }

    /// Get the class index (0-based) that corresponds to a key press, if any.
    pub fn class_index_for_key(&self, key: KeyCode) -> Option<usize> {
        self.class_hotkeys
            .iter()
            .position(|hotkey| *hotkey == Some(key))
    }

    pub fn key_for_mode(&self, mode: DrawMode) -> KeyCode {
        match mode {
            DrawMode::Draw => self.mode_draw,
            DrawMode::Edit => self.mode_edit,
            DrawMode::View => self.mode_view,
        }
    }

    pub fn set_mode_key(&mut self, mode: DrawMode, key: KeyCode) {
        match mode {
            DrawMode::Draw => self.mode_draw = key,
            DrawMode::Edit => self.mode_edit = key,
            DrawMode::View => self.mode_view = key,
        }
    }

    /// Set the hotkey for a class index. Out-of-range indices are ignored.
    pub fn set_class_key(&mut self, index: usize, key: Option<KeyCode>) {
        if let Some(slot) = self.class_hotkeys.get_mut(index) {
            *slot = key;
        }
    }

    /// Check if a key is already used by any binding.
    /// Returns a description of what it's used for, if anything.
    pub fn key_conflict(&self, key: KeyCode, exclude_mode: Option<DrawMode>) -> Option<String> {
        if matches!(
            key,
            KeyCode::Delete | KeyCode::Backspace | KeyCode::Escape
        ) {
            return Some(format!("{} (reserved)", key));
        }

        for &mode in DrawMode::all() {
            if exclude_mode != Some(mode) && key == self.key_for_mode(mode) {
                return Some(format!("{} mode", mode.name()));
            }
        }

        self.class_index_for_key(key)
            .map(|i| format!("Class {}", i + 1))
    }

    /// Resolve a key press to an editor command.
    pub fn shortcut_for(&self, event: &KeyEvent) -> Option<Shortcut> {
        let mods = event.modifiers;

        if mods.primary() {
            return match event.key {
                KeyCode::Z if mods.shift => Some(Shortcut::Redo),
                KeyCode::Z => Some(Shortcut::Undo),
                KeyCode::Y => Some(Shortcut::Redo),
                KeyCode::S => Some(Shortcut::Save),
                KeyCode::Delete | KeyCode::Backspace => Some(Shortcut::ClearAll),
                _ => None,
            };
        }
        if mods.alt {
            return None;
        }

        match event.key {
            KeyCode::Delete | KeyCode::Backspace => Some(Shortcut::DeleteSelected),
            KeyCode::Escape => Some(Shortcut::Escape),
            key => self
                .mode_for_key(key)
                .map(Shortcut::SetMode)
                .or_else(|| self.class_index_for_key(key).map(Shortcut::SelectClassIndex)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;

    fn ctrl() -> Modifiers {
        Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        }
    }

    #[test]
    fn test_default_mode_keys() {
        let bindings = KeyBindings::new();
        assert_eq!(bindings.mode_for_key(KeyCode::R), Some(DrawMode::Draw));
        assert_eq!(bindings.mode_for_key(KeyCode::E), Some(DrawMode::Edit));
        assert_eq!(bindings.mode_for_key(KeyCode::V), Some(DrawMode::View));
        assert_eq!(bindings.mode_for_key(KeyCode::Q), None);
    }

    #[test]
    fn test_class_hotkeys() {
        let bindings = KeyBindings::new();
        assert_eq!(bindings.class_index_for_key(KeyCode::Key1), Some(0));
        assert_eq!(bindings.class_index_for_key(KeyCode::Key9), Some(8));
        assert_eq!(bindings.class_index_for_key(KeyCode::Key0), None);
    }

    #[test]
    fn test_edit_shortcuts() {
        let bindings = KeyBindings::new();
        let press = |key, modifiers| bindings.shortcut_for(&KeyEvent::new(key, modifiers));

        assert_eq!(press(KeyCode::Z, ctrl()), Some(Shortcut::Undo));
        assert_eq!(
            press(
                KeyCode::Z,
                Modifiers {
                    shift: true,
                    ..ctrl()
                }
            ),
            Some(Shortcut::Redo)
        );
        assert_eq!(press(KeyCode::Y, ctrl()), Some(Shortcut::Redo));
        assert_eq!(
            press(
                KeyCode::S,
                Modifiers {
                    meta: true,
                    ..Modifiers::NONE
                }
            ),
            Some(Shortcut::Save)
        );
        assert_eq!(press(KeyCode::Delete, Modifiers::NONE), Some(Shortcut::DeleteSelected));
        assert_eq!(press(KeyCode::Backspace, Modifiers::NONE), Some(Shortcut::DeleteSelected));
        assert_eq!(press(KeyCode::Delete, ctrl()), Some(Shortcut::ClearAll));
        assert_eq!(press(KeyCode::Escape, Modifiers::NONE), Some(Shortcut::Escape));
        assert_eq!(press(KeyCode::Key3, Modifiers::NONE), Some(Shortcut::SelectClassIndex(2)));
        // Ctrl+R is not draw mode.
        assert_eq!(press(KeyCode::R, ctrl()), None);
    }

    #[test]
    fn test_rebinding_and_conflicts() {
        let mut bindings = KeyBindings::new();
        bindings.set_mode_key(DrawMode::Draw, KeyCode::D);
        assert_eq!(bindings.mode_for_key(KeyCode::D), Some(DrawMode::Draw));
        assert_eq!(bindings.mode_for_key(KeyCode::R), None);

        assert_eq!(bindings.key_conflict(KeyCode::E, None).as_deref(), Some("Edit mode"));
        assert_eq!(bindings.key_conflict(KeyCode::E, Some(DrawMode::Edit)), None);
        assert_eq!(bindings.key_conflict(KeyCode::Key2, None).as_deref(), Some("Class 2"));
        assert!(bindings.key_conflict(KeyCode::Delete, None).is_some());
        assert_eq!(bindings.key_conflict(KeyCode::Q, None), None);

        bindings.set_class_key(0, None);
        bindings.set_class_key(99, Some(KeyCode::Q));
        assert_eq!(bindings.class_index_for_key(KeyCode::Key1), None);
    }
}
