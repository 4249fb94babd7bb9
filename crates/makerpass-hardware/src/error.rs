//! Error types for peripheral operations.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while driving a peripheral.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Returns `true` if the device is gone for good and should not be polled
    /// again.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Disconnected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(HardwareError::disconnected("relay"), "Device disconnected: relay")]
    #[case(
        HardwareError::from(std::io::Error::other("bus fault")),
        "I/O error: bus fault"
    )]
    fn test_error_display(#[case] error: HardwareError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn test_is_disconnect() {
        assert!(HardwareError::disconnected("reader").is_disconnect());
        let read_failed = HardwareError::from(std::io::Error::other("read failed"));
        assert!(!read_failed.is_disconnect());
    }
}
