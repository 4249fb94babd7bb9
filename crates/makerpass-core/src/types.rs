use crate::{Result, constants::CARD_CODE_LENGTH, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// RFID card code (8 uppercase hex digits)
///
/// Codes are normalized on construction (trimmed and uppercased), so two
/// codes that differ only in letter case compare equal.
///
/// # Security
/// This type implements constant-time comparison so that matching a scanned
/// card against the master key does not leak how many leading digits agree.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardCode(String);

impl CardCode {
    /// Create a new card code with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidCardCode` if:
    /// - The code is not exactly 8 characters after trimming
    /// - The code contains non-hex characters
    pub fn new(code: &str) -> Result<Self> {
        let code = code.trim().to_ascii_uppercase();

        if code.len() != CARD_CODE_LENGTH {
            return Err(Error::InvalidCardCode(format!(
                "Card code must be {CARD_CODE_LENGTH} hex digits, got {} chars",
                code.len()
            )));
        }

        if !code.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidCardCode(format!(
                "Card code must be hexadecimal: {code}"
            )));
        }

        Ok(CardCode(code))
    }

    /// Render a raw 32-bit Wiegand code as a zero-padded hex card code.
    ///
    /// # Examples
    ///
    /// ```
    /// use makerpass_core::CardCode;
    ///
    /// let code = CardCode::from_wiegand(0x00AB_12CD);
    /// assert_eq!(code.as_str(), "00AB12CD");
    /// ```
    #[must_use]
    pub fn from_wiegand(raw: u32) -> Self {
        CardCode(format!("{raw:08X}"))
    }

    /// Get the card code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CardCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CardCode::new(s)
    }
}

impl TryFrom<String> for CardCode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        CardCode::new(&value)
    }
}

impl From<CardCode> for String {
    fn from(code: CardCode) -> Self {
        code.0
    }
}

/// Constant-time comparison implementation for CardCode
impl PartialEq for CardCode {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl std::hash::Hash for CardCode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// Kind of load the relay controls.
///
/// Fixed for the life of the process; selects the relay lifecycle branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Door lock: the relay is pulsed for a fixed duration per grant.
    Door,
    /// Machine power: the relay stays energized for an explicit session.
    Machine,
}

impl DeviceType {
    /// Returns `true` for machine devices.
    #[inline]
    #[must_use]
    pub fn is_machine(self) -> bool {
        matches!(self, DeviceType::Machine)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeviceType::Door => write!(f, "door"),
            DeviceType::Machine => write!(f, "machine"),
        }
    }
}

/// Screen the controller asks the display to show.
///
/// Rendering is owned by the display driver; these requests only carry the
/// state to present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayRequest {
    /// Link or socket lost; only the master key works.
    Offline,
    /// Authenticated and idle.
    Ready { resource_name: String },
    /// Authenticated, but the authority reports the resource as disabled.
    ResourceDisabled,
    /// Door relay energized; whole seconds until it closes.
    DoorCountdown { user: String, remaining_secs: u64 },
    /// Machine session started.
    SessionStarted { user: String },
    /// Machine session running for `elapsed_secs`.
    SessionRuntime { user: String, elapsed_secs: u64 },
    /// Machine session ended.
    SessionEnded { user: String },
    /// Authority denied the scan.
    AccessDenied { reason: String },
    /// Scan denied locally because the authority is unreachable.
    OfflineDenied,
    /// Authority reported an error.
    Error { message: String },
}

impl DisplayRequest {
    /// Two-line text rendering used by text displays and logs.
    #[must_use]
    pub fn lines(&self) -> (String, String) {
        match self {
            DisplayRequest::Offline => ("Offline".into(), "Master Key Only".into()),
            DisplayRequest::Ready { resource_name } => (resource_name.clone(), "Scan card".into()),
            DisplayRequest::ResourceDisabled => ("Resource Disabled".into(), String::new()),
            DisplayRequest::DoorCountdown {
                user,
                remaining_secs,
            } => ("Access Granted".into(), format!("{user} in {remaining_secs} s")),
            DisplayRequest::SessionStarted { user } => (user.clone(), "Session Started".into()),
            DisplayRequest::SessionRuntime { user, elapsed_secs } => {
                let hours = elapsed_secs / 3600;
                let mins = (elapsed_secs / 60) % 60;
                let secs = elapsed_secs % 60;
                (user.clone(), format!("{hours:02}:{mins:02}:{secs:02}"))
            }
            DisplayRequest::SessionEnded { user } => ("Session Ended".into(), user.clone()),
            DisplayRequest::AccessDenied { reason } => ("Access Denied".into(), reason.clone()),
            DisplayRequest::OfflineDenied => ("Offline".into(), "Access Denied".into()),
            DisplayRequest::Error { message } => ("Error".into(), message.clone()),
        }
    }
}

impl fmt::Display for DisplayRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (first, second) = self.lines();
        if second.is_empty() {
            write!(f, "{first}")
        } else {
            write!(f, "{first} | {second}")
        }
    }
}
