use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModemError {
    #[error("Invalid symbol rate {0}: must divide 48000 and be a multiple of 4")]
    InvalidSymbolRate(u32),

    #[error("Waveform length mismatch: {left} vs {right} samples")]
    LengthMismatch { left: usize, right: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Audio transport error: {0}")]
    Transport(String),

    #[error("Audio stream ended")]
    EndOfStream,

    #[error("No signal detected after listening to {listened} samples")]
    NoSignalDetected { listened: usize },

    #[error("Recorded signal too short for clock recovery: {len} samples, need {required}")]
    InsufficientSignal { len: usize, required: usize },

    #[error("Malformed bitstream: {bits} bits is not a positive multiple of 14")]
    MalformedBitstream { bits: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModemError {
    /// Receive-time failures that leave the receiver usable for another attempt.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ModemError::NoSignalDetected { .. }
                | ModemError::InsufficientSignal { .. }
                | ModemError::MalformedBitstream { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ModemError>;
