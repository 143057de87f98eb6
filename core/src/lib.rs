//! Acoustic FSK modem
//!
//! Bytes are protected with Hamming(7,4), sent one bit per symbol as square-wave
//! binary FSK at 48 kHz, and framed by an alternating-tone training preamble and
//! a 1,0,0,0 terminator. The receiver recovers symbol timing by correlating
//! against the training cycle, so transmitter and receiver share no clock.

pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod hamming;
pub mod resample;
pub mod transport;
pub mod waveform;

pub use config::SessionConfig;
pub use decoder::{Demodulator, Receiver};
pub use encoder::{FrameEncoder, Transmitter};
pub use error::{ModemError, Result};
pub use transport::{MemorySink, MemorySource, PcmReaderSource, PcmWriterSink, SampleSink, SampleSource};

/// Fixed sample rate of every waveform, in Hz
pub const SAMPLE_RATE: usize = 48000;

/// Samples the receiver searches for the clock phase
pub const CLOCK_SCAN_WIDTH: usize = 4096;

/// Sample magnitude at or below which the bit decision treats input as silence
pub const HARD_LIMIT_FLOOR: u16 = 512;

/// Bit pattern closing the preamble
pub const TERMINATOR: [u8; 4] = [1, 0, 0, 0];

/// Transmitted bits per payload byte (two Hamming(7,4) codewords)
pub const BITS_PER_ENCODED_BYTE: usize = 14;

/// Samples per block read from a source (4096 bytes of 16-bit PCM)
pub const INPUT_BLOCK_SAMPLES: usize = 2048;
