// Global hotkey module
// One system-wide shortcut, resolved into single-tap and double-tap actions

pub mod keymap;
pub mod disambiguator;
pub mod timer;
pub mod registrar;
pub mod dispatcher;

pub use disambiguator::{TapAction, TapDisambiguator};
pub use dispatcher::{HotkeyDispatcher, TapCallbacks, TapHandler};
pub use keymap::{supported_characters, KeyCode};
pub use registrar::{HotkeyHandle, HotkeyRegistrar, PulseSender, SimulatedRegistrar};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Two pulses closer together than this form a double tap
pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(300);

/// Character bound when no setting exists
pub const DEFAULT_HOTKEY_CHARACTER: char = 'T';

/// Modifier mask using Carbon's bit values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers(u32);

impl Modifiers {
    pub const COMMAND: Modifiers = Modifiers(0x0100);
    pub const SHIFT: Modifiers = Modifiers(0x0200);
    pub const OPTION: Modifiers = Modifiers(0x0800);
    pub const CONTROL: Modifiers = Modifiers(0x1000);

    /// Command+Shift, the only combination the app binds
    pub const DEFAULT: Modifiers = Modifiers(0x0100 | 0x0200);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

impl std::fmt::Display for Modifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // macOS menu order
        for (modifier, symbol) in [
            (Modifiers::CONTROL, "⌃"),
            (Modifiers::OPTION, "⌥"),
            (Modifiers::SHIFT, "⇧"),
            (Modifiers::COMMAND, "⌘"),
        ] {
            if self.contains(modifier) {
                f.write_str(symbol)?;
            }
        }
        Ok(())
    }
}

/// A key plus its fixed modifier combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HotkeyBinding {
    pub key_code: KeyCode,
    pub modifiers: Modifiers,
}

impl HotkeyBinding {
    /// Binding for `c` with the default modifiers
    pub fn for_char(c: char) -> Result<Self, HotkeyError> {
        Ok(Self {
            key_code: KeyCode::from_char(c)?,
            modifiers: Modifiers::DEFAULT,
        })
    }
}

impl std::fmt::Display for HotkeyBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.modifiers, self.key_code)
    }
}

/// Error types for hotkey operations
#[derive(thiserror::Error, Debug)]
pub enum HotkeyError {
    #[error("Character {0:?} cannot be used as a hotkey")]
    UnsupportedCharacter(char),

    #[error("Key code {0:#04x} is not in the key table")]
    UnsupportedKeyCode(u16),

    #[error("Failed to register hotkey {binding}: {reason}")]
    Registration { binding: HotkeyBinding, reason: String },

    #[error("Hotkey dispatcher has stopped")]
    DispatcherStopped,
}

impl Serialize for HotkeyError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_display() {
        let binding = HotkeyBinding::for_char('t').unwrap();
        assert_eq!(binding.to_string(), "⇧⌘T");
        assert_eq!(binding.modifiers.bits(), 0x0300);
    }

    #[test]
    fn test_modifiers() {
        let mods = Modifiers::CONTROL | Modifiers::OPTION;
        assert!(mods.contains(Modifiers::OPTION));
        assert!(!mods.contains(Modifiers::COMMAND));
        assert!(Modifiers::DEFAULT.contains(Modifiers::COMMAND | Modifiers::SHIFT));
        assert_eq!(mods.to_string(), "⌃⌥");
    }

    #[test]
    fn test_binding_rejects_unsupported_character() {
        let err = HotkeyBinding::for_char('ü').unwrap_err();
        assert_eq!(err.to_string(), "Character 'ü' cannot be used as a hotkey");
    }
}
