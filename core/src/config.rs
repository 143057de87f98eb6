use crate::error::{ModemError, Result};
use crate::waveform::validate_baud_rate;
use crate::SAMPLE_RATE;

pub const DEFAULT_BAUD_RATE: u32 = 1200;
pub const DEFAULT_SIGNAL_START_THRESHOLD: u16 = 18000;
pub const DEFAULT_SIGNAL_END_THRESHOLD: u16 = 14000;
pub const DEFAULT_RECEIVE_TIMEOUT_SECONDS: u32 = 100;
pub const DEFAULT_PREAMBLE_SECONDS: f64 = 0.5;

/// Parameters shared by a transmitter and a receiver.
///
/// Both ends of a link must agree on every field except the receive timeout;
/// nothing on the wire carries them.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Symbols per second, one bit per symbol
    pub baud_rate: u32,
    /// Block mean amplitude above which recording starts
    pub signal_start_threshold: u16,
    /// Block (or symbol) mean amplitude below which the signal is over
    pub signal_end_threshold: u16,
    /// How long the receiver waits for a signal to start
    pub receive_timeout_seconds: u32,
    /// Duration of the alternating-tone training preamble
    pub preamble_seconds: f64,
}

impl SessionConfig {
    pub fn new(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Self::default()
        }
    }

    pub fn with_thresholds(mut self, start: u16, end: u16) -> Self {
        self.signal_start_threshold = start;
        self.signal_end_threshold = end;
        self
    }

    pub fn with_receive_timeout(mut self, seconds: u32) -> Self {
        self.receive_timeout_seconds = seconds;
        self
    }

    pub fn with_preamble_seconds(mut self, seconds: f64) -> Self {
        self.preamble_seconds = seconds;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_baud_rate(self.baud_rate)?;

        if self.signal_end_threshold > self.signal_start_threshold {
            return Err(ModemError::InvalidConfig(format!(
                "signal end threshold {} exceeds start threshold {}",
                self.signal_end_threshold, self.signal_start_threshold
            )));
        }
        if self.signal_start_threshold > 32768 {
            return Err(ModemError::InvalidConfig(format!(
                "signal start threshold {} exceeds full scale",
                self.signal_start_threshold
            )));
        }
        if !(self.preamble_seconds > 0.0) || !self.preamble_seconds.is_finite() {
            return Err(ModemError::InvalidConfig(format!(
                "preamble duration must be positive, got {}",
                self.preamble_seconds
            )));
        }
        if self.preamble_cycles() == 0 {
            return Err(ModemError::InvalidConfig(
                "preamble too short to hold a single training cycle".to_string(),
            ));
        }

        Ok(())
    }

    /// Samples per transmitted symbol
    pub fn bit_frames(&self) -> usize {
        SAMPLE_RATE / self.baud_rate as usize
    }

    /// Training cycles (two symbols each) in the preamble
    pub fn preamble_cycles(&self) -> usize {
        (self.baud_rate as f64 * self.preamble_seconds / 2.0) as usize
    }

    /// Sample budget the receiver spends waiting for a signal
    pub fn timeout_samples(&self) -> usize {
        self.receive_timeout_seconds as usize * SAMPLE_RATE
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            signal_start_threshold: DEFAULT_SIGNAL_START_THRESHOLD,
            signal_end_threshold: DEFAULT_SIGNAL_END_THRESHOLD,
            receive_timeout_seconds: DEFAULT_RECEIVE_TIMEOUT_SECONDS,
            preamble_seconds: DEFAULT_PREAMBLE_SECONDS,
        }
    }
}
