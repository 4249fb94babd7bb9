//! Core constants for the MakerPass access terminal.
//!
//! This module centralises the timing defaults and fixed values shared by the
//! controller, the transport and the terminal binary. Every timing value here
//! is only a default; the [`TimingConfig`](crate::config::TimingConfig) and
//! [`DeviceConfig`](crate::config::DeviceConfig) sections of the TOML
//! configuration override them.
//!
//! # Timeout Domains
//!
//! The terminal reconciles three independent timeout domains:
//!
//! | Domain | Default | Governs |
//! |--------|---------|---------|
//! | Relay pulse | 5 s | How long a door relay stays energized per grant |
//! | Card presence | 2 s | Maximum gap between card sightings in a presence-gated session |
//! | Keep-alive | 16 min | Maximum silence from the authority before the socket is dropped |
//!
//! # Usage
//!
//! ```
//! use makerpass_core::constants::*;
//! use std::time::Duration;
//!
//! let pulse = Duration::from_millis(DEFAULT_DOOR_PULSE_MS);
//! assert_eq!(pulse, Duration::from_secs(5));
//! ```

// ============================================================================
// Timing Defaults
// ============================================================================

/// Silence from the authority after which the socket is dropped (milliseconds).
///
/// Slightly longer than the authority's own 15 minute idle timeout.
pub const DEFAULT_KEEPALIVE_TIMEOUT_MS: u64 = 960_000;

/// Maximum gap between card sightings during a presence-gated session (milliseconds).
pub const DEFAULT_CARD_PRESENT_TIMEOUT_MS: u64 = 2_000;

/// Door relay pulse duration per grant (milliseconds).
pub const DEFAULT_DOOR_PULSE_MS: u64 = 5_000;

/// Delay between transport reconnect attempts (milliseconds).
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 5_000;

/// Upper bound on a single connect attempt (milliseconds).
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Scheduler tick period of the control loop (milliseconds).
///
/// Must stay well below the card presence timeout so relay timers and
/// presence checks resolve within one loop iteration.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 50;

/// Display refresh period for countdown and runtime screens (milliseconds).
pub const DISPLAY_REFRESH_MS: u64 = 1_000;

/// How long a denial, error or session-ended screen stays up before the idle
/// screen returns (milliseconds).
pub const TEMP_MESSAGE_MS: u64 = 3_000;

// ============================================================================
// Indicator Feedback
// ============================================================================

/// Indicator flash on every card read (milliseconds).
pub const SCAN_FLASH_MS: u64 = 100;

/// Indicator flash on a denial, local or authority-issued (milliseconds).
pub const DENY_FLASH_MS: u64 = 200;

// ============================================================================
// Card Codes
// ============================================================================

/// Number of hex digits in a card code.
///
/// Wiegand readers deliver a 32-bit code which is rendered as 8 uppercase
/// hex digits, zero-padded.
///
/// # Examples
///
/// ```
/// use makerpass_core::constants::CARD_CODE_LENGTH;
///
/// assert_eq!(format!("{:08X}", 0xABCu32).len(), CARD_CODE_LENGTH);
/// ```
pub const CARD_CODE_LENGTH: usize = 8;

// ============================================================================
// Display Defaults
// ============================================================================

/// User name attached to grants issued by the offline master key.
pub const MASTER_KEY_USER: &str = "Master Key";

/// Fallback user name when a grant message carries none.
pub const DEFAULT_USER_NAME: &str = "User";

/// Fallback reason when a denial message carries none.
pub const DEFAULT_DENY_REASON: &str = "Denied";

/// Fallback text when an error message carries none.
pub const DEFAULT_ERROR_MESSAGE: &str = "Unknown error";

/// Maximum number of relay state transitions kept for diagnostics.
pub const MAX_HISTORY_SIZE: usize = 100;
