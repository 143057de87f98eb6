mod settings;
mod wav;

use clap::{ArgAction, Args, Parser, Subcommand};
use fskmodem_core::{
    ModemError, PcmReaderSource, PcmWriterSink, Receiver, SessionConfig, Transmitter, SAMPLE_RATE,
};
use settings::SessionFile;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fskmodem")]
#[command(about = "Acoustic FSK modem with Hamming(7,4) error correction")]
struct Cli {
    #[command(flatten)]
    session: SessionArgs,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Session parameters; flags override values from --config
#[derive(Args)]
struct SessionArgs {
    /// JSON file with session parameters
    #[arg(long, value_name = "SESSION.JSON", global = true)]
    config: Option<PathBuf>,

    /// Symbol rate; must divide 48000 and be a multiple of 4
    #[arg(short, long, global = true)]
    baud: Option<u32>,

    /// Block amplitude that starts a recording
    #[arg(long, global = true)]
    start_threshold: Option<u16>,

    /// Block amplitude that ends a recording
    #[arg(long, global = true)]
    end_threshold: Option<u16>,

    /// Seconds to wait for a signal before giving up
    #[arg(short, long, global = true)]
    timeout: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a file into a WAV frame
    Encode {
        /// Input binary file
        #[arg(value_name = "INPUT.BIN")]
        input: PathBuf,

        /// Output WAV file
        #[arg(value_name = "OUTPUT.WAV")]
        output: PathBuf,
    },

    /// Decode every frame in a WAV capture
    Decode {
        /// Input WAV file
        #[arg(value_name = "INPUT.WAV")]
        input: PathBuf,

        /// Output binary file
        #[arg(value_name = "OUTPUT.BIN")]
        output: PathBuf,
    },

    /// Transmit as raw big-endian 16-bit PCM (pipe into a player)
    ///
    /// Without --message or --input, every line read from stdin is sent as its own frame.
    Tx {
        /// Text to send
        #[arg(short, long, conflicts_with = "input")]
        message: Option<String>,

        /// File to send
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Write PCM here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Silence after each frame, in milliseconds
        #[arg(long, default_value = "250")]
        gap_ms: u32,
    },

    /// Receive from raw big-endian 16-bit PCM (pipe from a recorder)
    Rx {
        /// Read PCM from this file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Stop after this many frames
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// Print the effective session parameters as JSON
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = session_config(&cli.session)?;

    match cli.command {
        Commands::Encode { input, output } => encode_command(&config, &input, &output)?,
        Commands::Decode { input, output } => decode_command(&config, &input, &output)?,
        Commands::Tx {
            message,
            input,
            output,
            gap_ms,
        } => tx_command(&config, message, input, output, gap_ms)?,
        Commands::Rx { input, count } => rx_command(&config, input, count)?,
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&SessionFile::from(&config))?);
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn session_config(args: &SessionArgs) -> Result<SessionConfig, Box<dyn std::error::Error>> {
    let mut config = SessionConfig::default();
    if let Some(path) = &args.config {
        config = SessionFile::load(path)?.apply(config);
    }

    let overrides = SessionFile {
        baud_rate: args.baud,
        signal_start_threshold: args.start_threshold,
        signal_end_threshold: args.end_threshold,
        receive_timeout_seconds: args.timeout,
        preamble_seconds: None,
    };
    let config = overrides.apply(config);
    config.validate()?;

    log::debug!("Session: {:?}", config);
    Ok(config)
}

fn encode_command(
    config: &SessionConfig,
    input_path: &Path,
    output_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(input_path)?;
    println!("Read {} bytes from {}", data.len(), input_path.display());

    let sink = wav::WavSink::create(output_path)?;
    let mut transmitter = Transmitter::new(config, sink)?;
    transmitter.transmit(&data)?;
    let sink = transmitter.into_sink()?;

    println!(
        "Encoded {} bytes at {} baud to {} samples ({:.2} s)",
        data.len(),
        config.baud_rate,
        sink.written(),
        sink.written() as f64 / SAMPLE_RATE as f64
    );
    println!("Wrote {}", output_path.display());
    Ok(())
}

fn decode_command(
    config: &SessionConfig,
    input_path: &Path,
    output_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let (source, len) = wav::open_source(input_path)?;
    println!("Extracted {} samples", len);

    // A file has no live timeout: let the wait cover the whole capture
    let file_seconds = (len / SAMPLE_RATE) as u32 + 1;
    let config = config
        .clone()
        .with_receive_timeout(config.receive_timeout_seconds.max(file_seconds));

    let mut receiver = Receiver::new(&config, source)?;
    let mut data = Vec::new();
    let mut frames = 0;
    while receiver.source().remaining() > 0 {
        let payload = receiver.receive()?;
        if !payload.is_empty() {
            frames += 1;
            data.extend_from_slice(&payload);
        }
    }

    if frames == 0 {
        return Err("No frame could be decoded".into());
    }
    println!("Decoded {} bytes from {} frame(s)", data.len(), frames);

    std::fs::write(output_path, &data)?;
    println!("Wrote {} bytes to {}", data.len(), output_path.display());
    Ok(())
}

fn tx_command(
    config: &SessionConfig,
    message: Option<String>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    gap_ms: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(io::BufWriter::new(std::fs::File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    let gap = SAMPLE_RATE * gap_ms as usize / 1000;
    let sink = PcmWriterSink::new(writer).with_trailing_silence(gap);
    let mut transmitter = Transmitter::new(config, sink)?;

    if let Some(message) = message {
        transmitter.transmit(message.as_bytes())?;
    } else if let Some(path) = input {
        transmitter.transmit(&std::fs::read(path)?)?;
    } else {
        for line in io::stdin().lock().lines() {
            let line = line?;
            transmitter.transmit(line.as_bytes())?;
            eprintln!("Tx~{}", line);
        }
    }

    transmitter.into_sink()?;
    Ok(())
}

fn rx_command(
    config: &SessionConfig,
    input: Option<PathBuf>,
    count: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let reader: Box<dyn Read> = match input {
        Some(path) => Box::new(io::BufReader::new(std::fs::File::open(&path).map_err(
            |e| ModemError::DeviceUnavailable(format!("{}: {}", path.display(), e)),
        )?)),
        None => Box::new(io::stdin().lock()),
    };
    let source = PcmReaderSource::new(reader).ending_at_eof();
    let mut receiver = Receiver::new(config, source)?;

    let mut received = 0;
    while count.map_or(true, |n| received < n) {
        let payload = match receiver.receive() {
            Ok(payload) => payload,
            Err(ModemError::EndOfStream) => break,
            Err(e) => return Err(e.into()),
        };
        if payload.is_empty() {
            continue;
        }
        received += 1;
        println!("Rx~{}", String::from_utf8_lossy(&payload));
        io::stdout().flush()?;
    }

    receiver.into_source()?;
    log::info!("Received {} frame(s)", received);
    Ok(())
}
