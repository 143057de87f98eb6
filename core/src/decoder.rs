use crate::config::SessionConfig;
use crate::error::{ModemError, Result};
use crate::hamming;
use crate::transport::SampleSource;
use crate::waveform::{hard_limit, mean_abs_diff, mean_amplitude, Tones};
use crate::{CLOCK_SCAN_WIDTH, TERMINATOR};

/// Turns a recorded signal back into bytes
///
/// Stages, in order:
/// 1. clock recovery: find the sample offset where the recording best matches
///    the training cycle, scanning the first `CLOCK_SCAN_WIDTH` samples
/// 2. preamble skip: demodulate symbol by symbol until the last four bits are
///    the terminator (1,0,0,0)
/// 3. payload: demodulate until a symbol's amplitude drops below the end
///    threshold
/// 4. Hamming-decode the bits in groups of 14
///
/// The clock decision is made once and never revisited.
pub struct Demodulator {
    tones: Tones,
    signal_end_threshold: u32,
}

impl Demodulator {
    pub fn new(config: &SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tones: Tones::new(config.baud_rate)?,
            signal_end_threshold: config.signal_end_threshold as u32,
        })
    }

    /// Samples per symbol
    pub fn bit_frames(&self) -> usize {
        self.tones.bit_frames()
    }

    /// Offset of the best training-cycle match in the first `CLOCK_SCAN_WIDTH`
    /// samples. The earliest offset wins ties.
    pub fn recover_clock(&self, signal: &[i16]) -> Result<usize> {
        let reference = &self.tones.training;
        let required = CLOCK_SCAN_WIDTH.max(reference.len());
        if signal.len() < required {
            return Err(ModemError::InsufficientSignal {
                len: signal.len(),
                required,
            });
        }

        let last = CLOCK_SCAN_WIDTH.saturating_sub(reference.len());
        let mut best_offset = 0;
        let mut best_diff = u32::MAX;
        for offset in 0..=last {
            let diff = mean_abs_diff(reference, &signal[offset..offset + reference.len()])?;
            if diff < best_diff {
                best_diff = diff;
                best_offset = offset;
            }
        }

        log::debug!(
            "Recovered clock at offset {} (mean diff {})",
            best_offset,
            best_diff
        );
        Ok(best_offset)
    }

    /// Decide one symbol: mark if the hard-limited window is strictly closer to
    /// the mark tone than to the space tone.
    pub fn decode_bit(&self, window: &[i16]) -> Result<u8> {
        let limited = hard_limit(window);
        let space_diff = mean_abs_diff(&self.tones.space, &limited)?;
        let mark_diff = mean_abs_diff(&self.tones.mark, &limited)?;
        Ok(if mark_diff < space_diff { 1 } else { 0 })
    }

    /// Walk symbols from `clock_offset` until the terminator has been seen.
    /// Returns the offset of the first payload symbol, or `None` if the signal
    /// ends first.
    pub fn skip_preamble(&self, signal: &[i16], clock_offset: usize) -> Result<Option<usize>> {
        let bit_frames = self.bit_frames();
        let mut window = [0u8; 4];
        let mut pos = clock_offset;

        while pos + bit_frames <= signal.len() {
            let bit = self.decode_bit(&signal[pos..pos + bit_frames])?;
            window.rotate_left(1);
            window[3] = bit;
            if window == TERMINATOR {
                return Ok(Some(pos + bit_frames));
            }
            pos += bit_frames;
        }

        Ok(None)
    }

    /// Demodulate payload symbols starting at `start` until the signal fades
    pub fn demodulate_payload(&self, signal: &[i16], start: usize) -> Result<Vec<u8>> {
        let bit_frames = self.bit_frames();
        let mut bits = Vec::new();
        let mut pos = start;

        while pos + bit_frames <= signal.len() {
            let window = &signal[pos..pos + bit_frames];
            if mean_amplitude(window) < self.signal_end_threshold {
                break;
            }
            bits.push(self.decode_bit(window)?);
            pos += bit_frames;
        }

        Ok(bits)
    }

    /// Recover the bit stream from a recorded signal
    pub fn decode_bits(&self, signal: &[i16]) -> Result<Vec<u8>> {
        let clock = self.recover_clock(signal)?;
        match self.skip_preamble(signal, clock)? {
            Some(payload_start) => {
                log::debug!("Payload starts at sample {}", payload_start);
                self.demodulate_payload(signal, payload_start)
            }
            None => {
                log::debug!("Training sequence terminator not found");
                Ok(Vec::new())
            }
        }
    }

    /// Recover bytes from a recorded signal
    pub fn decode_signal(&self, signal: &[i16]) -> Result<Vec<u8>> {
        let bits = self.decode_bits(signal)?;
        log::debug!("Demodulated {} bits", bits.len());
        let bytes = hamming::decode_bits(&bits)?;
        log::debug!("Decoded {} bytes", bytes.len());
        Ok(bytes)
    }
}

/// Listens on a sample source and decodes one frame per call
pub struct Receiver<S: SampleSource> {
    demodulator: Demodulator,
    source: S,
    signal_start_threshold: u32,
    signal_end_threshold: u32,
    timeout_samples: usize,
}

impl<S: SampleSource> Receiver<S> {
    pub fn new(config: &SessionConfig, source: S) -> Result<Self> {
        Ok(Self {
            demodulator: Demodulator::new(config)?,
            source,
            signal_start_threshold: config.signal_start_threshold as u32,
            signal_end_threshold: config.signal_end_threshold as u32,
            timeout_samples: config.timeout_samples(),
        })
    }

    pub fn demodulator(&self) -> &Demodulator {
        &self.demodulator
    }

    /// Wait for a block louder than the start threshold, then record until a
    /// block falls below the end threshold.
    ///
    /// Only the wait is bounded by the timeout. Once recording has started it
    /// continues for as long as the source stays loud. The source is stopped
    /// again whether or not a signal was captured.
    pub fn record(&mut self) -> Result<Vec<i16>> {
        self.source.start()?;
        let captured = self.capture();
        let stopped = self.source.stop();
        let recorded = captured?;
        stopped?;

        log::debug!("Recorded {} samples", recorded.len());
        Ok(recorded)
    }

    fn capture(&mut self) -> Result<Vec<i16>> {
        let mut recorded = Vec::new();
        let mut listened = 0usize;
        while listened < self.timeout_samples {
            let block = self.next_block()?;
            if mean_amplitude(&block) > self.signal_start_threshold {
                recorded.extend_from_slice(&block);
                break;
            }
            listened += block.len();
        }

        if recorded.is_empty() {
            return Err(ModemError::NoSignalDetected { listened });
        }
        log::debug!("Signal detected after {} samples", listened);

        loop {
            let block = self.next_block()?;
            recorded.extend_from_slice(&block);
            if mean_amplitude(&block) < self.signal_end_threshold {
                break;
            }
        }

        Ok(recorded)
    }

    fn next_block(&mut self) -> Result<Vec<i16>> {
        let block = self.source.read_block()?;
        if block.is_empty() {
            return Err(ModemError::Transport(
                "source returned an empty block".to_string(),
            ));
        }
        Ok(block)
    }

    /// Receive one frame, reporting exactly why nothing was decoded
    pub fn try_receive(&mut self) -> Result<Vec<u8>> {
        let signal = self.record()?;
        self.demodulator.decode_signal(&signal)
    }

    /// Receive one frame. Receive-time failures come back as an empty
    /// payload so the caller can simply try again; transport failures are
    /// still errors.
    pub fn receive(&mut self) -> Result<Vec<u8>> {
        match self.try_receive() {
            Ok(bytes) => {
                log::info!("Received {} bytes", bytes.len());
                Ok(bytes)
            }
            Err(e) if e.is_recoverable() => {
                log::warn!("Could not decode: {}", e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Release the source, closing it first
    pub fn into_source(mut self) -> Result<S> {
        self.source.close()?;
        Ok(self.source)
    }
}
