//! Audio transport seam
//!
//! The modem never touches an audio device directly. It reads fixed-size
//! blocks from a [`SampleSource`] and hands whole frames to a [`SampleSink`].
//! At the device boundary samples are big-endian 16-bit PCM, 48 kHz mono;
//! everything past this module works on native `i16`.

use crate::error::{ModemError, Result};
use crate::INPUT_BLOCK_SAMPLES;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

/// Blocking producer of recorded samples
pub trait SampleSource {
    /// Flush stale input and begin capturing
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Block until the next fixed-size block of samples is available
    fn read_block(&mut self) -> Result<Vec<i16>>;

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Blocking consumer of samples to play
pub trait SampleSink {
    /// Write every sample and wait until playback has drained
    fn play(&mut self, samples: &[i16]) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: SampleSource + ?Sized> SampleSource for Box<T> {
    fn start(&mut self) -> Result<()> {
        (**self).start()
    }

    fn read_block(&mut self) -> Result<Vec<i16>> {
        (**self).read_block()
    }

    fn stop(&mut self) -> Result<()> {
        (**self).stop()
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

impl<T: SampleSink + ?Sized> SampleSink for Box<T> {
    fn play(&mut self, samples: &[i16]) -> Result<()> {
        (**self).play(samples)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

pub mod pcm {
    /// Convert big-endian 16-bit PCM bytes to samples; a trailing odd byte is dropped
    pub fn samples_from_be_bytes(bytes: &[u8]) -> Vec<i16> {
        bytes
            .chunks_exact(2)
            .map(|pair| i16::from_be_bytes([pair[0], pair[1]]))
            .collect()
    }

    pub fn samples_to_be_bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_be_bytes()).collect()
    }
}

/// Source backed by an in-memory recording.
///
/// Once the recording is used up the source keeps producing silence, the same
/// way an open line does when nothing is playing.
pub struct MemorySource {
    samples: VecDeque<i16>,
    block_size: usize,
    started: bool,
}

impl MemorySource {
    pub fn new(samples: Vec<i16>) -> Self {
        Self::with_block_size(samples, INPUT_BLOCK_SAMPLES)
    }

    pub fn with_block_size(samples: Vec<i16>, block_size: usize) -> Self {
        Self {
            samples: samples.into(),
            block_size: block_size.max(1),
            started: false,
        }
    }

    /// Samples not yet handed out
    pub fn remaining(&self) -> usize {
        self.samples.len()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl SampleSource for MemorySource {
    fn start(&mut self) -> Result<()> {
        self.started = true;
        Ok(())
    }

    fn read_block(&mut self) -> Result<Vec<i16>> {
        let take = self.block_size.min(self.samples.len());
        let mut block: Vec<i16> = self.samples.drain(..take).collect();
        block.resize(self.block_size, 0);
        Ok(block)
    }

    fn stop(&mut self) -> Result<()> {
        self.started = false;
        Ok(())
    }
}

/// Sink that keeps everything it is asked to play
#[derive(Debug, Default)]
pub struct MemorySink {
    played: Vec<i16>,
    frames: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> &[i16] {
        &self.played
    }

    /// Number of `play` calls so far
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn into_samples(self) -> Vec<i16> {
        self.played
    }
}

impl SampleSink for MemorySink {
    fn play(&mut self, samples: &[i16]) -> Result<()> {
        self.played.extend_from_slice(samples);
        self.frames += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.played.clear();
        Ok(())
    }
}

/// Source reading raw big-endian PCM from any byte stream, e.g. a pipe from
/// `arecord -t raw -f S16_BE -r 48000 -c 1`.
///
/// End of stream is treated as silence so the receiver can still see the
/// signal fall away. With [`PcmReaderSource::ending_at_eof`] the source
/// instead fails with `EndOfStream` after one block of that silence.
pub struct PcmReaderSource<R: Read> {
    reader: R,
    block_size: usize,
    exhausted: bool,
    end_at_eof: bool,
    silent_blocks: usize,
}

impl<R: Read> PcmReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self::with_block_size(reader, INPUT_BLOCK_SAMPLES)
    }

    pub fn with_block_size(reader: R, block_size: usize) -> Self {
        Self {
            reader,
            block_size: block_size.max(1),
            exhausted: false,
            end_at_eof: false,
            silent_blocks: 0,
        }
    }

    pub fn ending_at_eof(mut self) -> Self {
        self.end_at_eof = true;
        self
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn read_until_full(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => {
                    self.exhausted = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ModemError::Transport(e.to_string())),
            }
        }
        Ok(())
    }
}

impl PcmReaderSource<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ModemError::DeviceUnavailable(format!("{}: {}", path.display(), e))
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> SampleSource for PcmReaderSource<R> {
    fn read_block(&mut self) -> Result<Vec<i16>> {
        let mut buf = vec![0u8; self.block_size * 2];
        if self.exhausted {
            if self.end_at_eof && self.silent_blocks > 0 {
                return Err(ModemError::EndOfStream);
            }
            self.silent_blocks += 1;
        } else {
            self.read_until_full(&mut buf)?;
        }
        Ok(pcm::samples_from_be_bytes(&buf))
    }
}

/// Sink writing raw big-endian PCM to any byte stream, e.g. a pipe into
/// `aplay -t raw -f S16_BE -r 48000 -c 1`.
///
/// A byte stream has no idle line between frames, so the sink can append a
/// stretch of silence after each one for the receiver to find its end.
pub struct PcmWriterSink<W: Write> {
    writer: W,
    trailing_silence: usize,
}

impl<W: Write> PcmWriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            trailing_silence: 0,
        }
    }

    /// Append `samples` of silence after every played frame
    pub fn with_trailing_silence(mut self, samples: usize) -> Self {
        self.trailing_silence = samples;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl PcmWriterSink<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| {
            ModemError::DeviceUnavailable(format!("{}: {}", path.display(), e))
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> SampleSink for PcmWriterSink<W> {
    fn play(&mut self, samples: &[i16]) -> Result<()> {
        self.writer
            .write_all(&pcm::samples_to_be_bytes(samples))
            .map_err(|e| ModemError::Transport(e.to_string()))?;
        if self.trailing_silence > 0 {
            self.writer
                .write_all(&vec![0u8; self.trailing_silence * 2])
                .map_err(|e| ModemError::Transport(e.to_string()))?;
        }
        // Drain: nothing is left buffered once play returns
        self.writer
            .flush()
            .map_err(|e| ModemError::Transport(e.to_string()))
    }

    fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| ModemError::Transport(e.to_string()))
    }

    fn close(&mut self) -> Result<()> {
        self.flush()
    }
}
