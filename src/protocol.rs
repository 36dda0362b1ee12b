// MIT License - Copyright (c) 2026 Peter Wright
// ESP32 LED link

use std::fmt;
use std::str::FromStr;

use crate::constants::{
    notice, BRIGHTNESS_MAX, BRIGHTNESS_MIN, ERROR_PREFIX, LINE_TERMINATOR, MAX_COMMAND_LEN,
    MUSIC_INTENSITY_MAX, MUSIC_INTENSITY_MIN, RESPONSE_PREFIX,
};
use crate::error::{LinkError, Result};

/// Strip colors the firmware knows about. Only shown while in solid mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Green,
    Blue,
    Yellow,
    White,
}

impl Color {
    pub const ALL: [Color; 5] = [Color::Red, Color::Green, Color::Blue, Color::Yellow, Color::White];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Yellow => "yellow",
            Self::White => "white",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Firmware auto-update sub-commands (`update:<action>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateAction {
    Check,
    Enable,
    Disable,
    Now,
}

impl UpdateAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Now => "now",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "check" => Some(Self::Check),
            "enable" => Some(Self::Enable),
            "disable" => Some(Self::Disable),
            "now" => Some(Self::Now),
            _ => None,
        }
    }
}

/// Commands understood by the LED firmware.
///
/// Every command is a single ASCII token, optionally followed by `:` and one
/// parameter, terminated by `\n` on the wire. Commands are fire-and-forget:
/// there is no sequence number and no guaranteed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `off`: stop LED output.
    Off,
    /// `rainbow`: rainbow animation mode.
    Rainbow,
    /// `solid`: solid color mode.
    Solid,
    /// `music`: music-reactive mode.
    Music,
    /// `red` / `green` / `blue` / `yellow` / `white`: set the solid color.
    Color(Color),
    /// `brightness:<0-255>`
    Brightness(u8),
    /// `music:<0-100>`: one beat-intensity sample.
    MusicSample(u8),
    /// `ledon`: built-in status LED on.
    LedOn,
    /// `ledoff`: built-in status LED off.
    LedOff,
    /// `toggle`: flip the built-in status LED.
    Toggle,
    /// `status`: request the current mode/LED/WiFi summary.
    Status,
    /// `info`: request device name, version and address.
    Info,
    /// `ping`: keepalive, answered with `RESPONSE:PONG`.
    Ping,
    /// `update:<action>`
    Update(UpdateAction),
    /// Any other validated token. Built through [`Command::raw`] or parsing.
    Raw(RawToken),
}

/// A token that passed [`validate_token`]. Only this module can build one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawToken(String);

impl RawToken {
    fn new(token: &str) -> Result<Self> {
        validate_token(token)?;
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Command {
    /// Build a brightness command, rejecting values the firmware would refuse.
    pub fn brightness(value: i64) -> Result<Self> {
        check_range("brightness", value, BRIGHTNESS_MIN, BRIGHTNESS_MAX)?;
        Ok(Command::Brightness(value as u8))
    }

    /// Build a beat-intensity sample.
    pub fn music_sample(value: i64) -> Result<Self> {
        check_range("music intensity", value, MUSIC_INTENSITY_MIN, MUSIC_INTENSITY_MAX)?;
        Ok(Command::MusicSample(value as u8))
    }

    /// Build a command from arbitrary wire text. Known tokens and prefixes
    /// are parsed (with their range checks); anything else must still travel
    /// as one line.
    pub fn raw(token: impl AsRef<str>) -> Result<Self> {
        token.as_ref().parse()
    }

    /// Check the command can go on the wire as exactly one line the firmware
    /// accepts.
    pub fn validate(&self) -> Result<()> {
        if let Command::MusicSample(v) = self {
            check_range("music intensity", i64::from(*v), MUSIC_INTENSITY_MIN, MUSIC_INTENSITY_MAX)?;
        }
        validate_token(&self.to_wire_string())
    }

    /// The command text without the line terminator.
    pub fn to_wire_string(&self) -> String {
        match self {
            Command::Off => "off".to_string(),
            Command::Rainbow => "rainbow".to_string(),
            Command::Solid => "solid".to_string(),
            Command::Music => "music".to_string(),
            Command::Color(color) => color.as_str().to_string(),
            Command::Brightness(v) => format!("brightness:{}", v),
            Command::MusicSample(v) => format!("music:{}", v),
            Command::LedOn => "ledon".to_string(),
            Command::LedOff => "ledoff".to_string(),
            Command::Toggle => "toggle".to_string(),
            Command::Status => "status".to_string(),
            Command::Info => "info".to_string(),
            Command::Ping => "ping".to_string(),
            Command::Update(action) => format!("update:{}", action.as_str()),
            Command::Raw(token) => token.as_str().to_string(),
        }
    }

    /// The exact bytes written to the transport: the token plus one `\n`.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = self.to_wire_string().into_bytes();
        bytes.push(LINE_TERMINATOR);
        bytes
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire_string())
    }
}

impl FromStr for Command {
    type Err = LinkError;

    /// Parse wire text. Matching is exact and case-sensitive; unknown tokens
    /// become [`Command::Raw`] once validated.
    fn from_str(s: &str) -> Result<Self> {
        let cmd = match s {
            "off" => Command::Off,
            "rainbow" => Command::Rainbow,
            "solid" => Command::Solid,
            "music" => Command::Music,
            "ledon" => Command::LedOn,
            "ledoff" => Command::LedOff,
            "toggle" => Command::Toggle,
            "status" => Command::Status,
            "info" => Command::Info,
            "ping" => Command::Ping,
            _ => {
                if let Some(color) = Color::from_name(s) {
                    Command::Color(color)
                } else if let Some(value) = s.strip_prefix("brightness:") {
                    Command::brightness(parse_param(s, value)?)?
                } else if let Some(value) = s.strip_prefix("music:") {
                    Command::music_sample(parse_param(s, value)?)?
                } else if let Some(action) = s.strip_prefix("update:")
                    && let Some(action) = UpdateAction::from_name(action)
                {
                    Command::Update(action)
                } else {
                    Command::Raw(RawToken::new(s)?)
                }
            }
        };
        Ok(cmd)
    }
}

fn check_range(name: &'static str, value: i64, min: i64, max: i64) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(LinkError::InvalidParameter { name, value, min, max })
    }
}

fn parse_param(command: &str, value: &str) -> Result<i64> {
    value.parse::<i64>().map_err(|_| LinkError::InvalidCommand {
        command: command.to_string(),
        reason: "parameter is not an integer",
    })
}

/// Check that a token is non-empty, short enough for the firmware's line
/// buffer, and printable ASCII only (which also rules out embedded newlines).
pub fn validate_token(token: &str) -> Result<()> {
    let reason = if token.is_empty() {
        Some("empty command")
    } else if token.contains(['\n', '\r']) {
        Some("embedded line break")
    } else if token.len() > MAX_COMMAND_LEN {
        Some("longer than 100 bytes")
    } else if !token.bytes().all(|b| (b' '..=b'~').contains(&b)) {
        Some("non-printable or non-ASCII character")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(LinkError::InvalidCommand {
            command: token.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Fixed notices the firmware reports through `RESPONSE:` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceNotice {
    /// First command after a period of silence.
    UsbConnected,
    /// No command for 30 seconds.
    UsbTimeout,
    /// Reply to `ping`.
    Pong,
    /// `RESPONSE:ERROR <detail>`
    Error(String),
}

/// Text read back after a command.
///
/// Holds whatever a single read returned, decoded and trimmed. Nothing ties
/// it to the command that was just written: it may answer an earlier command
/// or be unrelated log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    raw: String,
}

impl Response {
    /// Decode the bytes of one read. Returns `None` if nothing but whitespace
    /// was received.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(bytes);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self {
                raw: trimmed.to_string(),
            })
        }
    }

    /// The trimmed text exactly as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The trimmed text, with a leading `RESPONSE:` removed.
    pub fn text(&self) -> &str {
        match self.raw.strip_prefix(RESPONSE_PREFIX) {
            Some(rest) => rest.trim(),
            None => &self.raw,
        }
    }

    /// The first `RESPONSE:` line in the chunk, prefix removed. This is the
    /// only part meant for the status display; other lines are log output.
    pub fn status(&self) -> Option<&str> {
        self.raw
            .lines()
            .map(str::trim)
            .find_map(|line| line.strip_prefix(RESPONSE_PREFIX))
            .map(str::trim)
    }

    /// Classify the status line if it is one of the firmware's fixed notices.
    pub fn notice(&self) -> Option<DeviceNotice> {
        let status = self.status()?;
        match status {
            notice::USB_CONNECTED => Some(DeviceNotice::UsbConnected),
            notice::USB_TIMEOUT => Some(DeviceNotice::UsbTimeout),
            notice::PONG => Some(DeviceNotice::Pong),
            _ => status
                .strip_prefix(ERROR_PREFIX)
                .map(|detail| DeviceNotice::Error(detail.trim().to_string())),
        }
    }

    pub fn is_device_error(&self) -> bool {
        matches!(self.notice(), Some(DeviceNotice::Error(_)))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}
