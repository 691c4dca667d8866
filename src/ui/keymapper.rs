//! Key mapping for terminal input
//!
//! Converts key events to session gestures and view actions.

use std::str::FromStr;

use bitflags::bitflags;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use thiserror::Error;

use crate::config::KeysConfig;
use crate::core::session::Gesture;

bitflags! {
    /// Modifier keys
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = Modifiers::empty();
        if mods.contains(KeyModifiers::SHIFT) {
            result |= Modifiers::SHIFT;
        }
        if mods.contains(KeyModifiers::CONTROL) {
            result |= Modifiers::CTRL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= Modifiers::ALT;
        }
        result
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum KeyParseError {
    #[error("Empty key binding")]
    Empty,

    #[error("Unknown modifier `{0}`")]
    UnknownModifier(String),

    #[error("Unknown key `{0}`")]
    UnknownKey(String),
}

/// A key plus modifiers, e.g. `shift+enter`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyChord {
    pub code: KeyCode,
    pub mods: Modifiers,
}

impl KeyChord {
    pub const fn new(code: KeyCode, mods: Modifiers) -> Self {
        Self { code, mods }
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        let mods = Modifiers::from(event.modifiers);
        match (self.code, event.code) {
            (KeyCode::Char(a), KeyCode::Char(b)) => {
                // Terminals disagree on whether Shift uppercases the char
                a.eq_ignore_ascii_case(&b) && self.mods - Modifiers::SHIFT == mods - Modifiers::SHIFT
            }
            (a, b) => a == b && self.mods == mods,
        }
    }
}

impl FromStr for KeyChord {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        if lower.is_empty() {
            return Err(KeyParseError::Empty);
        }

        let mut parts: Vec<&str> = lower.split('+').collect();
        let key = parts.pop().unwrap_or_default();
        let mut mods = Modifiers::empty();
        for part in parts {
            mods |= match part {
                "shift" => Modifiers::SHIFT,
                "ctrl" | "control" => Modifiers::CTRL,
                "alt" | "meta" | "option" => Modifiers::ALT,
                other => return Err(KeyParseError::UnknownModifier(other.to_string())),
            };
        }

        let code = match key {
            "enter" | "return" => KeyCode::Enter,
            "tab" => KeyCode::Tab,
            "space" => KeyCode::Char(' '),
            "esc" | "escape" => KeyCode::Esc,
            "backspace" => KeyCode::Backspace,
            _ => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => KeyCode::Char(ch),
                    _ => match key.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                        Some(n) if (1..=12).contains(&n) => KeyCode::F(n),
                        _ => return Err(KeyParseError::UnknownKey(key.to_string())),
                    },
                }
            }
        };

        Ok(Self { code, mods })
    }
}

/// Bindings for the configurable gestures
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyBindings {
    pub submit: Vec<KeyChord>,
    pub newline: Vec<KeyChord>,
}

impl KeyBindings {
    /// Terminals that report Shift+Enter: Shift+Enter runs, Enter breaks the line
    pub fn enhanced() -> Self {
        Self {
            submit: vec![KeyChord::new(KeyCode::Enter, Modifiers::SHIFT)],
            newline: vec![KeyChord::new(KeyCode::Enter, Modifiers::empty())],
        }
    }

    /// Terminals that can't tell Shift+Enter from Enter
    pub fn legacy() -> Self {
        Self {
            submit: vec![KeyChord::new(KeyCode::Enter, Modifiers::empty())],
            newline: vec![
                KeyChord::new(KeyCode::Enter, Modifiers::ALT),
                KeyChord::new(KeyCode::Char('j'), Modifiers::CTRL),
            ],
        }
    }

    /// Build bindings from config, filling gaps with terminal defaults
    pub fn from_config(keys: &KeysConfig, enhanced: bool) -> Result<Self, KeyParseError> {
        let defaults = if enhanced { Self::enhanced() } else { Self::legacy() };
        let parse = |list: &[String], fallback: Vec<KeyChord>| -> Result<Vec<KeyChord>, KeyParseError> {
            if list.is_empty() {
                Ok(fallback)
            } else {
                list.iter().map(|s| s.parse()).collect()
            }
        };
        Ok(Self {
            submit: parse(&keys.submit, defaults.submit)?,
            newline: parse(&keys.newline, defaults.newline)?,
        })
    }
}

/// What a key press asks for
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Gesture(Gesture),
    ScrollUp,
    ScrollDown,
    PasteClipboard,
    Quit,
}

/// Key mapper for converting key events to actions
pub struct KeyMapper;

impl KeyMapper {
    /// Map a crossterm KeyEvent to an action
    pub fn map(event: &KeyEvent, bindings: &KeyBindings, input_empty: bool) -> Option<KeyAction> {
        if bindings.submit.iter().any(|chord| chord.matches(event)) {
            return Some(KeyAction::Gesture(Gesture::Submit));
        }
        if bindings.newline.iter().any(|chord| chord.matches(event)) {
            return Some(KeyAction::Gesture(Gesture::SoftNewline));
        }

        let mods = Modifiers::from(event.modifiers);
        let gesture = match event.code {
            KeyCode::Char(ch) if mods.contains(Modifiers::CTRL) && !mods.contains(Modifiers::ALT) => {
                return match ch.to_ascii_lowercase() {
                    'c' => Some(KeyAction::Gesture(Gesture::Interrupt)),
                    'd' if input_empty => Some(KeyAction::Quit),
                    'v' => Some(KeyAction::PasteClipboard),
                    'a' => Some(KeyAction::Gesture(Gesture::CaretHome)),
                    'e' => Some(KeyAction::Gesture(Gesture::CaretEnd)),
                    _ => None,
                };
            }
            // AltGr arrives as Ctrl+Alt on Windows
            KeyCode::Char(ch)
                if mods.contains(Modifiers::CTRL | Modifiers::ALT) && !ch.is_ascii_alphabetic() =>
            {
                Gesture::Insert(ch)
            }
            KeyCode::Char(_) if mods.contains(Modifiers::ALT) => return None,
            KeyCode::Char(ch) => Gesture::Insert(ch),
            KeyCode::Tab if mods.is_empty() => Gesture::Tab,
            KeyCode::Up => Gesture::HistoryPrevious,
            KeyCode::Down => Gesture::HistoryNext,
            KeyCode::Left => Gesture::CaretLeft,
            KeyCode::Right => Gesture::CaretRight,
            KeyCode::Home => Gesture::CaretHome,
            KeyCode::End => Gesture::CaretEnd,
            KeyCode::Backspace => Gesture::Backspace,
            KeyCode::Delete => Gesture::Delete,
            KeyCode::Esc => Gesture::Interrupt,
            KeyCode::PageUp => return Some(KeyAction::ScrollUp),
            KeyCode::PageDown => return Some(KeyAction::ScrollDown),
            _ => return None,
        };
        Some(KeyAction::Gesture(gesture))
    }
}
