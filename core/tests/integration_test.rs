// End-to-end modem tests: frames go through the same acquisition loop a live
// receiver uses, fed from an in-memory source (silence, frame, silence).

use fskmodem_core::{
    FrameEncoder, MemorySink, MemorySource, ModemError, Receiver, SessionConfig, Transmitter,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

fn with_silence(frame: &[i16], lead: usize, trail: usize) -> Vec<i16> {
    let mut samples = vec![0i16; lead];
    samples.extend_from_slice(frame);
    samples.extend(std::iter::repeat(0i16).take(trail));
    samples
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn receive(config: &SessionConfig, samples: Vec<i16>) -> Result<Vec<u8>, ModemError> {
    init_logging();
    let mut receiver =
        Receiver::new(config, MemorySource::new(samples)).expect("Failed to create receiver");
    receiver.try_receive()
}

/// Overwrite payload symbol `index` with the opposite tone
fn flip_symbol(encoder: &FrameEncoder, frame: &mut [i16], data: &[u8], index: usize) {
    let bits = fskmodem_core::hamming::encode_bytes(data);
    let flipped = encoder.tones().for_bit(bits[index] ^ 1);
    let start = encoder.payload_offset() + index * encoder.bit_frames();
    frame[start..start + encoder.bit_frames()].copy_from_slice(flipped);
}

fn add_noise(samples: &mut [i16], std_dev: f64, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, std_dev).unwrap();
    for sample in samples.iter_mut() {
        let noisy = *sample as f64 + normal.sample(&mut rng);
        *sample = noisy.clamp(i16::MIN as f64, i16::MAX as f64) as i16;
    }
}

#[test]
fn test_hi_round_trip() {
    let config = SessionConfig::new(1200);
    let encoder = FrameEncoder::new(&config).expect("Failed to create encoder");
    let frame = encoder.encode(b"Hi");

    let decoded = receive(&config, with_silence(&frame, 10000, 48000)).expect("Failed to decode");
    assert_eq!(decoded, b"Hi");
}

#[test]
fn test_transmitter_to_receiver() {
    let config = SessionConfig::new(1200);
    let original_data = b"The quick brown fox jumped over the lazy dog.";

    let mut transmitter =
        Transmitter::new(&config, MemorySink::new()).expect("Failed to create transmitter");
    transmitter.transmit(original_data).expect("Failed to transmit");
    let played = transmitter.into_sink().unwrap().into_samples();

    let mut receiver = Receiver::new(&config, MemorySource::new(with_silence(&played, 4800, 48000)))
        .expect("Failed to create receiver");
    let decoded = receiver.receive().expect("Receive failed");

    assert_eq!(decoded, original_data);
}

#[test]
fn test_round_trip_across_baud_rates() {
    let original_data = vec![0u8, 1, 2, 255, 128, 64, 32, 16, 8, 4, 2, 1, 0];

    for baud in [300, 600, 1200, 2400, 4800, 6000] {
        let config = SessionConfig::new(baud);
        let encoder = FrameEncoder::new(&config).expect("Failed to create encoder");
        let frame = encoder.encode(&original_data);

        let decoded = receive(&config, with_silence(&frame, 7000, 48000))
            .unwrap_or_else(|e| panic!("baud {} failed: {}", baud, e));
        assert_eq!(decoded, original_data, "Round trip failed at {} baud", baud);
    }
}

#[test]
fn test_all_byte_values() {
    let config = SessionConfig::new(4800);
    let encoder = FrameEncoder::new(&config).unwrap();
    let original_data: Vec<u8> = (0..=255).collect();

    let frame = encoder.encode(&original_data);
    let decoded = receive(&config, with_silence(&frame, 3000, 48000)).expect("Failed to decode");
    assert_eq!(decoded, original_data);
}

#[test]
fn test_single_bit_flip_is_corrected() {
    let config = SessionConfig::new(1200);
    let encoder = FrameEncoder::new(&config).unwrap();
    let data = b"Hi";
    let mut frame = encoder.encode(data);

    // Fourth bit of the first codeword
    flip_symbol(&encoder, &mut frame, data, 3);

    let decoded = receive(&config, with_silence(&frame, 10000, 48000)).expect("Failed to decode");
    assert_eq!(decoded, data);
}

#[test]
fn test_one_flip_per_codeword_is_corrected() {
    let config = SessionConfig::new(2400);
    let encoder = FrameEncoder::new(&config).unwrap();
    let data = b"Hamming";
    let mut frame = encoder.encode(data);

    for (i, _) in data.iter().enumerate() {
        flip_symbol(&encoder, &mut frame, data, i * 14 + i % 7);
        flip_symbol(&encoder, &mut frame, data, i * 14 + 7 + (6 - i % 7));
    }

    let decoded = receive(&config, with_silence(&frame, 5000, 48000)).expect("Failed to decode");
    assert_eq!(decoded, data);
}

#[test]
fn test_double_flip_in_one_codeword_goes_undetected() {
    let config = SessionConfig::new(1200);
    let encoder = FrameEncoder::new(&config).unwrap();
    let data = b"Hi";
    let mut frame = encoder.encode(data);

    flip_symbol(&encoder, &mut frame, data, 0);
    flip_symbol(&encoder, &mut frame, data, 1);

    let decoded = receive(&config, with_silence(&frame, 10000, 48000)).expect("Failed to decode");
    assert_eq!(decoded.len(), 2);
    assert_ne!(decoded[0], b'H');
    assert_eq!(decoded[1], b'i');
}

#[test]
fn test_noisy_channel() {
    let config = SessionConfig::new(1200);
    let encoder = FrameEncoder::new(&config).unwrap();
    let original_data = b"Noisy channel test";

    let mut samples = with_silence(&encoder.encode(original_data), 12000, 48000);
    add_noise(&mut samples, 3000.0, 7);

    let decoded = receive(&config, samples).expect("Failed to decode");
    assert_eq!(decoded, original_data);
}

#[test]
fn test_attenuated_signal() {
    let config = SessionConfig::new(1200);
    let encoder = FrameEncoder::new(&config).unwrap();
    let original_data = b"quiet";

    // 60% of full scale still clears the start threshold
    let frame: Vec<i16> = encoder
        .encode(original_data)
        .iter()
        .map(|&s| (s as f64 * 0.6) as i16)
        .collect();

    let decoded = receive(&config, with_silence(&frame, 9000, 48000)).expect("Failed to decode");
    assert_eq!(decoded, original_data);
}

#[test]
fn test_consecutive_frames_on_one_source() {
    let config = SessionConfig::new(2400);
    let encoder = FrameEncoder::new(&config).unwrap();

    let mut samples = with_silence(&encoder.encode(b"first"), 5000, 24000);
    samples.extend(with_silence(&encoder.encode(b"second"), 0, 24000));

    let mut receiver = Receiver::new(&config, MemorySource::new(samples)).unwrap();
    assert_eq!(receiver.receive().unwrap(), b"first");
    assert_eq!(receiver.receive().unwrap(), b"second");
}

#[test]
fn test_short_signal_is_insufficient() {
    let config = SessionConfig::new(1200);
    let encoder = FrameEncoder::new(&config).unwrap();
    let burst = &encoder.encode(b"")[..1500];

    let source = MemorySource::with_block_size(with_silence(burst, 1024, 4096), 512);
    let mut receiver = Receiver::new(&config, source).unwrap();

    match receiver.try_receive() {
        Err(ModemError::InsufficientSignal { len, required }) => {
            assert!(len < 4096);
            assert_eq!(required, 4096);
        }
        other => panic!("Expected InsufficientSignal, got {:?}", other),
    }
}

#[test]
fn test_short_signal_yields_empty_result() {
    let config = SessionConfig::new(1200);
    let encoder = FrameEncoder::new(&config).unwrap();
    let burst = &encoder.encode(b"")[..1500];

    let source = MemorySource::with_block_size(with_silence(burst, 1024, 4096), 512);
    let mut receiver = Receiver::new(&config, source).unwrap();
    assert!(receiver.receive().unwrap().is_empty());
}

#[test]
fn test_noise_only_is_no_signal() {
    let config = SessionConfig::new(1200).with_receive_timeout(2);
    let mut noise = vec![0i16; 2 * 48000];
    add_noise(&mut noise, 2000.0, 42);

    match receive(&config, noise.clone()) {
        Err(ModemError::NoSignalDetected { listened }) => assert!(listened >= 2 * 48000),
        other => panic!("Expected NoSignalDetected, got {:?}", other),
    }

    let mut receiver = Receiver::new(&config, MemorySource::new(noise)).unwrap();
    assert!(receiver.receive().unwrap().is_empty());
}

#[test]
fn test_truncated_payload_is_malformed() {
    let config = SessionConfig::new(1200);
    let encoder = FrameEncoder::new(&config).unwrap();
    let frame = encoder.encode(b"Hi");

    // Cut the frame six symbols into the second byte
    let cut = encoder.payload_offset() + 20 * encoder.bit_frames();
    let samples = with_silence(&frame[..cut], 10000, 48000);

    match receive(&config, samples.clone()) {
        Err(ModemError::MalformedBitstream { bits }) => assert_eq!(bits, 20),
        other => panic!("Expected MalformedBitstream, got {:?}", other),
    }

    let mut receiver = Receiver::new(&config, MemorySource::new(samples)).unwrap();
    assert!(receiver.receive().unwrap().is_empty());
}

#[test]
fn test_missing_terminator_yields_empty_result() {
    let config = SessionConfig::new(1200);
    let encoder = FrameEncoder::new(&config).unwrap();
    let frame = encoder.encode(b"Hi");

    let samples = with_silence(&frame[..encoder.preamble_len()], 10000, 48000);
    match receive(&config, samples) {
        Err(ModemError::MalformedBitstream { bits }) => assert_eq!(bits, 0),
        other => panic!("Expected MalformedBitstream, got {:?}", other),
    }
}

#[test]
fn test_mismatched_baud_rate_does_not_decode() {
    let tx_config = SessionConfig::new(1200);
    let rx_config = SessionConfig::new(2400);
    let encoder = FrameEncoder::new(&tx_config).unwrap();
    let frame = encoder.encode(b"Hi");

    let decoded = receive(&rx_config, with_silence(&frame, 10000, 48000));
    assert!(!matches!(decoded, Ok(ref bytes) if bytes.as_slice() == b"Hi"));
}

#[test]
fn test_round_trip_at_1000_baud() {
    // 48 samples per symbol: divides 48000 and is a multiple of 4
    let config = SessionConfig::new(1000);
    let encoder = FrameEncoder::new(&config).expect("1000 baud should be accepted");
    assert_eq!(encoder.bit_frames(), 48);

    let frame = encoder.encode(b"Hi");
    let decoded = receive(&config, with_silence(&frame, 6000, 48000)).expect("Failed to decode");
    assert_eq!(decoded, b"Hi");
}

#[test]
fn test_invalid_baud_rates_fail_construction() {
    for baud in [1100, 7000, 50] {
        let config = SessionConfig::new(baud);
        assert!(matches!(
            FrameEncoder::new(&config),
            Err(ModemError::InvalidSymbolRate(b)) if b == baud
        ));
        assert!(matches!(
            Receiver::new(&config, MemorySource::new(Vec::new())),
            Err(ModemError::InvalidSymbolRate(b)) if b == baud
        ));
    }
}
