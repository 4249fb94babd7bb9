//! Console stand-ins for bench testing without terminal hardware.
//!
//! Outputs are written to the log; cards are read as lines from any async
//! reader, typically stdin. A line is either an 8-digit hex card code or a
//! decimal Wiegand number.

use std::time::Duration;

use makerpass_core::{CardCode, DisplayRequest};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{debug, info, warn};

use crate::traits::{ActivityIndicator, CardReader, RelayOutput, StatusDisplay};
use crate::{HardwareError, Result};

/// Relay that logs its state changes.
#[derive(Debug, Default)]
pub struct LogRelay {
    energized: bool,
}

impl LogRelay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RelayOutput for LogRelay {
    async fn set_energized(&mut self, energized: bool) -> Result<()> {
        self.energized = energized;
        info!(energized, "Relay");
        Ok(())
    }

    fn is_energized(&self) -> bool {
        self.energized
    }
}

/// Display that logs each screen on one line.
#[derive(Debug, Default)]
pub struct LogDisplay;

impl StatusDisplay for LogDisplay {
    async fn show(&mut self, request: &DisplayRequest) -> Result<()> {
        info!(screen = %request, "Display");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct LogIndicator;

impl ActivityIndicator for LogIndicator {
    async fn flash(&mut self, duration: Duration) -> Result<()> {
        let duration_ms = duration.as_millis();
        debug!(duration_ms, "Indicator flash");
        Ok(())
    }
}

/// Card reader reading one code per line.
pub struct LineCardReader<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin + Send> LineCardReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            lines: input.lines(),
        }
    }
}

impl<R: AsyncBufRead + Unpin + Send> CardReader for LineCardReader<R> {
    async fn read_card(&mut self) -> Result<CardCode> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                return Err(HardwareError::disconnected("console card reader"));
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match parse_card_line(line) {
                Some(code) => return Ok(code),
                None => warn!(%line, "Ignoring unreadable card line"),
            }
        }
    }
}

/// Hex card code first, then a decimal Wiegand number.
fn parse_card_line(line: &str) -> Option<CardCode> {
    CardCode::new(line)
        .ok()
        .or_else(|| line.parse::<u32>().ok().map(CardCode::from_wiegand))
}
