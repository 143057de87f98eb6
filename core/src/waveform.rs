use crate::error::{ModemError, Result};
use crate::{HARD_LIMIT_FLOOR, SAMPLE_RATE};

// Binary FSK tones at 48 kHz, 16-bit signed samples
//
// - Space (bit 0): one square-wave cycle per symbol
// - Mark (bit 1): two square-wave cycles per symbol (twice the space frequency)
// - Training cycle: mark followed by space, the clock-recovery reference
//
// Square waves sit at the rails so the receiver's hard limiter reproduces
// them exactly on a clean channel.

const HIGH: i16 = i16::MAX;
const LOW: i16 = i16::MIN;

/// Check that `baud_rate` divides the sample rate and is a multiple of 4
pub fn validate_baud_rate(baud_rate: u32) -> Result<()> {
    if baud_rate == 0 || SAMPLE_RATE % baud_rate as usize != 0 || baud_rate % 4 != 0 {
        return Err(ModemError::InvalidSymbolRate(baud_rate));
    }
    Ok(())
}

/// One symbol of the space tone: first half high, second half low
pub fn space_tone(baud_rate: u32) -> Result<Vec<i16>> {
    validate_baud_rate(baud_rate)?;

    let bit_frames = SAMPLE_RATE / baud_rate as usize;
    let mut tone = vec![HIGH; bit_frames];
    tone[bit_frames / 2..].fill(LOW);
    Ok(tone)
}

/// One symbol of the mark tone: the space tone at twice the rate, played twice
pub fn mark_tone(baud_rate: u32) -> Result<Vec<i16>> {
    validate_baud_rate(baud_rate)?;

    let half = space_tone(baud_rate * 2)?;
    let mut tone = Vec::with_capacity(half.len() * 2);
    tone.extend_from_slice(&half);
    tone.extend_from_slice(&half);
    Ok(tone)
}

/// Two symbols, mark then space
pub fn training_cycle(baud_rate: u32) -> Result<Vec<i16>> {
    let mut cycle = mark_tone(baud_rate)?;
    cycle.extend_from_slice(&space_tone(baud_rate)?);
    Ok(cycle)
}

/// Mean absolute sample-wise difference between two equal-length waveforms
pub fn mean_abs_diff(a: &[i16], b: &[i16]) -> Result<u32> {
    if a.len() != b.len() {
        return Err(ModemError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    if a.is_empty() {
        return Ok(0);
    }

    let total: u64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x as i32 - y as i32).unsigned_abs() as u64)
        .sum();
    Ok((total / a.len() as u64) as u32)
}

/// Mean absolute sample value
pub fn mean_amplitude(samples: &[i16]) -> u32 {
    if samples.is_empty() {
        return 0;
    }

    let total: u64 = samples.iter().map(|&s| s.unsigned_abs() as u64).sum();
    (total / samples.len() as u64) as u32
}

/// Saturate samples beyond the noise floor to the rails, zero the rest
pub fn hard_limit(samples: &[i16]) -> Vec<i16> {
    let floor = HARD_LIMIT_FLOOR as i16;
    samples
        .iter()
        .map(|&s| {
            if s > floor {
                HIGH
            } else if s < -floor {
                LOW
            } else {
                0
            }
        })
        .collect()
}

/// The three reference waveforms of a session, generated once
#[derive(Debug, Clone)]
pub struct Tones {
    pub space: Vec<i16>,
    pub mark: Vec<i16>,
    pub training: Vec<i16>,
}

impl Tones {
    pub fn new(baud_rate: u32) -> Result<Self> {
        Ok(Self {
            space: space_tone(baud_rate)?,
            mark: mark_tone(baud_rate)?,
            training: training_cycle(baud_rate)?,
        })
    }

    /// Samples per symbol
    pub fn bit_frames(&self) -> usize {
        self.space.len()
    }

    pub fn for_bit(&self, bit: u8) -> &[i16] {
        if bit == 0 {
            &self.space
        } else {
            &self.mark
        }
    }
}
