use crate::config::SessionConfig;
use crate::error::Result;
use crate::hamming;
use crate::transport::SampleSink;
use crate::waveform::Tones;
use crate::TERMINATOR;

/// Builds complete transmit frames
///
/// Frame layout: preamble (training cycles) + terminator (1,0,0,0) + payload,
/// where every payload byte becomes 14 Hamming-coded symbols. There is no
/// length field; the receiver finds the end of the payload by amplitude.
pub struct FrameEncoder {
    tones: Tones,
    preamble_cycles: usize,
}

impl FrameEncoder {
    pub fn new(config: &SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tones: Tones::new(config.baud_rate)?,
            preamble_cycles: config.preamble_cycles(),
        })
    }

    pub fn tones(&self) -> &Tones {
        &self.tones
    }

    /// Samples per symbol
    pub fn bit_frames(&self) -> usize {
        self.tones.bit_frames()
    }

    pub fn preamble_len(&self) -> usize {
        self.preamble_cycles * self.tones.training.len()
    }

    /// Offset of the first payload symbol within a frame
    pub fn payload_offset(&self) -> usize {
        self.preamble_len() + TERMINATOR.len() * self.bit_frames()
    }

    /// Total frame length for a payload of `payload_len` bytes
    pub fn frame_len(&self, payload_len: usize) -> usize {
        self.payload_offset() + payload_len * crate::BITS_PER_ENCODED_BYTE * self.bit_frames()
    }

    /// Map a bit sequence onto mark/space symbols
    pub fn modulate_bits(&self, bits: &[u8]) -> Vec<i16> {
        let mut samples = Vec::with_capacity(bits.len() * self.bit_frames());
        for &bit in bits {
            samples.extend_from_slice(self.tones.for_bit(bit));
        }
        samples
    }

    /// Encode a payload into a full frame of samples
    pub fn encode(&self, data: &[u8]) -> Vec<i16> {
        let mut samples = Vec::with_capacity(self.frame_len(data.len()));

        for _ in 0..self.preamble_cycles {
            samples.extend_from_slice(&self.tones.training);
        }

        samples.extend(self.modulate_bits(&TERMINATOR));

        let bits = hamming::encode_bytes(data);
        samples.extend(self.modulate_bits(&bits));

        samples
    }
}

/// Encodes payloads and plays them through a sink
pub struct Transmitter<S: SampleSink> {
    encoder: FrameEncoder,
    sink: S,
}

impl<S: SampleSink> Transmitter<S> {
    pub fn new(config: &SessionConfig, sink: S) -> Result<Self> {
        Ok(Self {
            encoder: FrameEncoder::new(config)?,
            sink,
        })
    }

    pub fn encoder(&self) -> &FrameEncoder {
        &self.encoder
    }

    /// Encode and play `data`, returning once the sink has drained
    pub fn transmit(&mut self, data: &[u8]) -> Result<()> {
        log::info!("Transmitting {} bytes", data.len());
        let samples = self.encoder.encode(data);
        log::debug!(
            "Transmitting {} samples ({} preamble, {} payload symbols)",
            samples.len(),
            self.encoder.preamble_len(),
            data.len() * crate::BITS_PER_ENCODED_BYTE
        );
        self.sink.play(&samples)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Release the sink, closing it first
    pub fn into_sink(mut self) -> Result<S> {
        self.sink.close()?;
        Ok(self.sink)
    }
}
