use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// All operator-issued display commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum DisplayCommand {
    // ── Clock control ─────────────────────────────
    TogglePause,
    /// One step-and-redraw. Only honoured while paused.
    Step,
    /// Reset every simulator. Only honoured while paused.
    Reset,

    // ── Presentation ──────────────────────────────
    ToggleFps,

    // ── Recording ─────────────────────────────────
    StartRecording {
        #[serde(default)]
        filename: Option<String>,
    },
    FinishRecording,

    Quit,
}

/// Keys the display reacts to. Anything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Space,
    S,
    R,
    F,
    Escape,
    Other,
}

impl FromStr for Key {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // A literal space char names the key itself.
        if s == " " {
            return Ok(Key::Space);
        }
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "space"       => Key::Space,
            "s"           => Key::S,
            "r"           => Key::R,
            "f"           => Key::F,
            "escape" | "esc" => Key::Escape,
            _             => Key::Other,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub alt:   bool,
    #[serde(default)]
    pub ctrl:  bool,
    #[serde(default)]
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Self = Self { alt: false, ctrl: false, shift: false };
    pub const ALT: Self = Self { alt: true, ctrl: false, shift: false };
}

impl DisplayCommand {
    /// Default key bindings.
    ///
    /// Space toggles pause, S single-steps, R resets, Alt+R starts
    /// recording, F toggles the frame-rate overlay, Escape quits.
    pub fn from_key(key: Key, modifiers: Modifiers) -> Option<Self> {
        match key {
            Key::Space  => Some(Self::TogglePause),
            Key::S      => Some(Self::Step),
            Key::R if modifiers.alt => Some(Self::StartRecording { filename: None }),
            Key::R      => Some(Self::Reset),
            Key::F      => Some(Self::ToggleFps),
            Key::Escape => Some(Self::Quit),
            Key::Other  => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TogglePause           => "toggle_pause",
            Self::Step                  => "step",
            Self::Reset                 => "reset",
            Self::ToggleFps             => "toggle_fps",
            Self::StartRecording { .. } => "start_recording",
            Self::FinishRecording       => "finish_recording",
            Self::Quit                  => "quit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alt_r_records_plain_r_resets() {
        assert_eq!(
            DisplayCommand::from_key(Key::R, Modifiers::ALT),
            Some(DisplayCommand::StartRecording { filename: None })
        );
        assert_eq!(DisplayCommand::from_key(Key::R, Modifiers::NONE), Some(DisplayCommand::Reset));
    }

    #[test]
    fn commands_round_trip_through_tagged_json() {
        let cmd: DisplayCommand = serde_json::from_str(r#"{"cmd":"start_recording"}"#).unwrap();
        assert_eq!(cmd, DisplayCommand::StartRecording { filename: None });
        let cmd: DisplayCommand = serde_json::from_str(r#"{"cmd":"toggle_pause"}"#).unwrap();
        assert_eq!(cmd, DisplayCommand::TogglePause);
    }

    #[test]
    fn key_names_parse_case_insensitively() {
        assert_eq!("SPACE".parse::<Key>().unwrap(), Key::Space);
        assert_eq!("q".parse::<Key>().unwrap(), Key::Other);
        assert_eq!(" ".parse::<Key>().unwrap(), Key::Space);
        assert_eq!("".parse::<Key>().unwrap(), Key::Other);
    }
}
