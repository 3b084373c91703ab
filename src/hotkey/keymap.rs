// Key code <-> character table
// Codes are macOS virtual key codes (kVK_ANSI_*) for the US layout

use crate::hotkey::HotkeyError;
use serde::{Deserialize, Serialize};

/// (character, virtual key code)
const KEY_TABLE: &[(char, u16)] = &[
    ('A', 0x00),
    ('S', 0x01),
    ('D', 0x02),
    ('F', 0x03),
    ('H', 0x04),
    ('G', 0x05),
    ('Z', 0x06),
    ('X', 0x07),
    ('C', 0x08),
    ('V', 0x09),
    ('B', 0x0B),
    ('Q', 0x0C),
    ('W', 0x0D),
    ('E', 0x0E),
    ('R', 0x0F),
    ('Y', 0x10),
    ('T', 0x11),
    ('1', 0x12),
    ('2', 0x13),
    ('3', 0x14),
    ('4', 0x15),
    ('6', 0x16),
    ('5', 0x17),
    ('=', 0x18),
    ('9', 0x19),
    ('7', 0x1A),
    ('-', 0x1B),
    ('8', 0x1C),
    ('0', 0x1D),
    (']', 0x1E),
    ('O', 0x1F),
    ('U', 0x20),
    ('[', 0x21),
    ('I', 0x22),
    ('P', 0x23),
    ('L', 0x25),
    ('J', 0x26),
    ('\'', 0x27),
    ('K', 0x28),
    (';', 0x29),
    ('\\', 0x2A),
    (',', 0x2B),
    ('/', 0x2C),
    ('N', 0x2D),
    ('M', 0x2E),
    ('.', 0x2F),
    ('`', 0x32),
];

/// A key code present in the lookup table. Construct via `from_char` or
/// `TryFrom<u16>`; out-of-table values are rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct KeyCode(u16);

impl KeyCode {
    /// Letters match case-insensitively
    pub fn from_char(c: char) -> Result<Self, HotkeyError> {
        let upper = c.to_ascii_uppercase();
        KEY_TABLE
            .iter()
            .find(|(ch, _)| *ch == upper)
            .map(|(_, code)| KeyCode(*code))
            .ok_or(HotkeyError::UnsupportedCharacter(c))
    }

    /// Display character for this key (uppercase for letters)
    pub fn to_char(self) -> char {
        KEY_TABLE
            .iter()
            .find(|(_, code)| *code == self.0)
            .map(|(ch, _)| *ch)
            // Unreachable for codes built through the checked constructors
            .unwrap_or('?')
    }

    pub fn raw(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for KeyCode {
    type Error = HotkeyError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        if KEY_TABLE.iter().any(|(_, c)| *c == code) {
            Ok(KeyCode(code))
        } else {
            Err(HotkeyError::UnsupportedKeyCode(code))
        }
    }
}

impl From<KeyCode> for u16 {
    fn from(code: KeyCode) -> u16 {
        code.0
    }
}

impl std::fmt::Display for KeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// Characters accepted by `KeyCode::from_char`, in table order
pub fn supported_characters() -> Vec<char> {
    KEY_TABLE.iter().map(|(ch, _)| *ch).collect()
}
