use fskmodem_core::resample::{downmix, resample};
use fskmodem_core::{MemorySource, ModemError, SampleSink, SAMPLE_RATE};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// 16-bit mono 48 kHz, the modem's native format
pub fn modem_spec() -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE as u32,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Sink that writes every played frame into a WAV file
pub struct WavSink {
    writer: Option<WavWriter<BufWriter<File>>>,
    written: usize,
}

impl WavSink {
    pub fn create(path: &Path) -> Result<Self, ModemError> {
        let writer = WavWriter::create(path, modem_spec()).map_err(|e| {
            ModemError::DeviceUnavailable(format!("{}: {}", path.display(), e))
        })?;
        Ok(Self {
            writer: Some(writer),
            written: 0,
        })
    }

    /// Samples written so far
    pub fn written(&self) -> usize {
        self.written
    }
}

impl SampleSink for WavSink {
    fn play(&mut self, samples: &[i16]) -> Result<(), ModemError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| ModemError::Transport("WAV file already finalized".to_string()))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| ModemError::Transport(e.to_string()))?;
        }
        writer
            .flush()
            .map_err(|e| ModemError::Transport(e.to_string()))?;
        self.written += samples.len();
        Ok(())
    }

    fn close(&mut self) -> Result<(), ModemError> {
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .map_err(|e| ModemError::Transport(e.to_string()))?;
        }
        Ok(())
    }
}

/// Read a WAV capture and condition it to 48 kHz mono samples
pub fn read_samples(path: &Path) -> Result<Vec<i16>, Box<dyn std::error::Error>> {
    let mut reader = WavReader::open(path)
        .map_err(|e| ModemError::DeviceUnavailable(format!("{}: {}", path.display(), e)))?;

    let spec = reader.spec();
    log::info!(
        "Read WAV: {} Hz, {} channels, {} bits",
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample
    );

    let interleaved: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader.samples::<i16>().collect::<Result<_, _>>()?,
        (SampleFormat::Int, bits) if bits > 16 && bits <= 32 => {
            let shift = bits - 16;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| (v >> shift) as i16))
                .collect::<Result<_, _>>()?
        }
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
            .collect::<Result<_, _>>()?,
        (format, bits) => {
            return Err(format!("Unsupported WAV format: {:?} {} bits", format, bits).into());
        }
    };

    let mono = downmix(&interleaved, spec.channels as usize);
    Ok(resample(&mono, spec.sample_rate as usize, SAMPLE_RATE))
}

/// A WAV capture as a receiver input
pub fn open_source(path: &Path) -> Result<(MemorySource, usize), Box<dyn std::error::Error>> {
    let samples = read_samples(path)?;
    let len = samples.len();
    Ok((MemorySource::new(samples), len))
}
