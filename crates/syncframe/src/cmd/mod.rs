use clap::{Args, Subcommand};
use std::path::PathBuf;

use syncframe::fixture::{StreamSpec, DEFAULT_FRAMES, DEFAULT_ITEMS, DEFAULT_TRAILING_NOISE};
use syncframe_frame::codec::{DEFAULT_MAX_BUFFER, DEFAULT_READ_CHUNK_SIZE};
use syncframe_frame::{FrameConfig, MAX_ITEMS};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod generate;
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode frames from a file, device, socket, or stdin.
    Decode(DecodeArgs),
    /// Write a random test stream of frames and noise.
    Generate(GenerateArgs),
    /// Generate a test stream in memory and decode it.
    Simulate(SimulateArgs),
    /// Encode payload items into a single frame.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Decode(args) => decode::run(args, format),
        Command::Generate(args) => generate::run(args),
        Command::Simulate(args) => simulate::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Reassembler limits shared by `decode` and `simulate`.
#[derive(Args, Debug, Clone)]
pub struct LimitArgs {
    /// Maximum bytes buffered while waiting for a frame to complete.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_BUFFER)]
    pub max_buffer: usize,
    /// Length fields above this many items are reported as malformed.
    #[arg(long, value_name = "ITEMS", default_value_t = MAX_ITEMS)]
    pub max_items: u16,
    /// Do not report discarded noise bytes.
    #[arg(long)]
    pub no_noise: bool,
}

impl LimitArgs {
    pub fn frame_config(&self, chunk_size: usize) -> CliResult<FrameConfig> {
        if chunk_size == 0 {
            return Err(CliError::new(USAGE, "--chunk-size must be greater than zero"));
        }
        Ok(FrameConfig {
            max_payload_items: self.max_items,
            max_buffer_size: self.max_buffer,
            read_chunk_size: chunk_size,
            report_noise: !self.no_noise,
            report_incomplete: true,
        })
    }
}

/// Shape of a generated stream, shared by `generate` and `simulate`.
#[derive(Args, Debug, Clone)]
pub struct StreamArgs {
    /// Number of frames.
    #[arg(long, default_value_t = DEFAULT_FRAMES)]
    pub frames: usize,
    /// Payload items per frame.
    #[arg(long, default_value_t = DEFAULT_ITEMS)]
    pub items: u16,
    /// Probability of a noise burst after each frame (0.0-1.0).
    #[arg(long, value_name = "P", default_value_t = DEFAULT_TRAILING_NOISE, value_parser = parse_probability)]
    pub trailing_noise: f64,
    /// Probability of flipping one byte in each frame (0.0-1.0).
    #[arg(long, value_name = "P", default_value_t = 0.0, value_parser = parse_probability)]
    pub corrupt: f64,
    /// Never emit 0xBE in noise, so no false markers can occur.
    #[arg(long)]
    pub marker_free_noise: bool,
    /// RNG seed for a reproducible stream.
    #[arg(long)]
    pub seed: Option<u64>,
}

impl StreamArgs {
    pub fn spec(&self) -> StreamSpec {
        StreamSpec {
            frames: self.frames,
            items: self.items,
            trailing_noise: self.trailing_noise,
            corrupt: self.corrupt,
            marker_free_noise: self.marker_free_noise,
            seed: self.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Input file or device node; `-` or omitted reads stdin.
    pub input: Option<PathBuf>,
    /// Connect to INPUT as a Unix domain socket.
    #[arg(long, requires = "input")]
    pub socket: bool,
    /// Bytes requested per read.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_READ_CHUNK_SIZE, env = "SYNCFRAME_CHUNK_SIZE")]
    pub chunk_size: usize,
    #[command(flatten)]
    pub limits: LimitArgs,
    /// Exit after N decoded frames.
    #[arg(long, value_parser = parse_count)]
    pub count: Option<usize>,
    /// Exit with status 60 if any corrupted or malformed frame was seen.
    #[arg(long)]
    pub strict: bool,
    /// Print counters after the stream ends.
    #[arg(long)]
    pub summary: bool,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub stream: StreamArgs,
    /// Output file; `-` or omitted writes stdout.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
    /// Write the stream as a hex string instead of raw bytes.
    #[arg(long)]
    pub hex: bool,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub stream: StreamArgs,
    /// Bytes fed to the reassembler per read.
    #[arg(long, value_name = "BYTES", default_value_t = 8)]
    pub chunk_size: usize,
    #[command(flatten)]
    pub limits: LimitArgs,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Payload items (decimal or 0x-prefixed hex, 0-65535).
    #[arg(value_parser = parse_item)]
    pub items: Vec<u16>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_item(input: &str) -> Result<u16, String> {
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => input.parse::<u16>(),
    };
    parsed.map_err(|err| format!("invalid item {input:?}: {err}"))
}

fn parse_count(input: &str) -> Result<usize, String> {
    match input.parse::<usize>() {
        Ok(0) => Err("count must be at least 1".to_string()),
        Ok(count) => Ok(count),
        Err(err) => Err(format!("invalid count {input:?}: {err}")),
    }
}

fn parse_probability(input: &str) -> Result<f64, String> {
    let value: f64 = input
        .parse()
        .map_err(|_| format!("invalid probability: {input}"))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("probability must be between 0 and 1, got {value}"));
    }
    Ok(value)
}

/// `-` means stdin/stdout.
pub fn is_stdio(path: Option<&PathBuf>) -> bool {
    path.is_none_or(|p| p.as_os_str() == "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_item_accepts_hex_and_decimal() {
        assert_eq!(parse_item("0xBEEF").unwrap(), 0xBEEF);
        assert_eq!(parse_item("0Xff").unwrap(), 0xFF);
        assert_eq!(parse_item("1234").unwrap(), 1234);
        assert!(parse_item("65536").is_err());
        assert!(parse_item("0xZZ").is_err());
    }

    #[test]
    fn parse_count_rejects_zero() {
        assert_eq!(parse_count("3").unwrap(), 3);
        assert!(parse_count("0").is_err());
        assert!(parse_count("-1").is_err());
    }

    #[test]
    fn parse_probability_bounds() {
        assert_eq!(parse_probability("0.3").unwrap(), 0.3);
        assert!(parse_probability("1.5").is_err());
        assert!(parse_probability("-0.1").is_err());
        assert!(parse_probability("often").is_err());
    }

    #[test]
    fn zero_chunk_size_is_usage_error() {
        let limits = LimitArgs {
            max_buffer: 64,
            max_items: 8,
            no_noise: true,
        };
        let err = limits.frame_config(0).unwrap_err();
        assert_eq!(err.code, USAGE);

        let cfg = limits.frame_config(4).unwrap();
        assert_eq!(cfg.read_chunk_size, 4);
        assert!(!cfg.report_noise);
        assert_eq!(cfg.max_payload_items, 8);
    }

    #[test]
    fn stdio_detection() {
        assert!(is_stdio(None));
        assert!(is_stdio(Some(&PathBuf::from("-"))));
        assert!(!is_stdio(Some(&PathBuf::from("/dev/ttyUSB0"))));
    }
}
