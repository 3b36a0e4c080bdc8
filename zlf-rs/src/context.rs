use std::path::PathBuf;

use clap::{Parser, Subcommand};
use zlf_protocol::DataRate;

#[derive(Debug, Parser)]
#[clap(name = "zlf")]
#[clap(about = "zlf inspects Zniffer ZLF capture files. ", long_about = None)]
#[clap(author = "maleicacid")]
#[clap(version)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Configuration file path.{n}
    /// Defaults to `zlf.toml` in the working directory if present.
    #[clap(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Read size in bytes when pulling from the capture file.
    #[clap(long, global = true, value_name = "BYTES")]
    pub chunk_size: Option<usize>,
}

/// Output format for listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON Lines, one object per row
    Json,
    /// CSV format
    Csv,
}

/// Data rate selector for checksum verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum RateArg {
    #[value(name = "9k6")]
    R9k6,
    #[value(name = "40k")]
    R40k,
    #[value(name = "100k")]
    R100k,
    #[value(name = "lr")]
    Lr,
}

impl From<RateArg> for DataRate {
    fn from(value: RateArg) -> Self {
        match value {
            RateArg::R9k6 => DataRate::Kbps9_6,
            RateArg::R40k => DataRate::Kbps40,
            RateArg::R100k => DataRate::Kbps100,
            RateArg::Lr => DataRate::LongRange,
        }
    }
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// List records.{n}
    /// Prints every record envelope in the capture: time, direction,
    /// session, kind and payload length.
    #[clap(name = "records")]
    Records {
        /// The capture file.
        #[clap(value_name = "FILE")]
        file: PathBuf,

        /// Output format.
        #[clap(value_enum, long, short = 'f', default_value = "table")]
        format: OutputFormat,

        /// Treat the file as a bare record stream without the 2048-byte header.
        #[clap(long = "no-skip-header")]
        no_skip_header: bool,

        /// Keep reading as the file grows.{n}
        /// Press Ctrl-C to stop.
        #[clap(long)]
        follow: bool,

        /// Polling interval in milliseconds for `--follow`.
        #[clap(long, value_name = "MS")]
        poll_interval_ms: Option<u64>,
    },

    /// List reassembled radio frames.{n}
    /// Continuation records are folded into the radio-data record they
    /// follow, then the frame is decoded: channel, data rate, RSSI,
    /// MAC header fields and checksum verdict.
    #[clap(name = "frames")]
    Frames {
        /// The capture file.
        #[clap(value_name = "FILE")]
        file: PathBuf,

        /// Output format.
        #[clap(value_enum, long, short = 'f', default_value = "table")]
        format: OutputFormat,

        /// Treat the file as a bare record stream without the 2048-byte header.
        #[clap(long = "no-skip-header")]
        no_skip_header: bool,

        /// Keep reading as the file grows.{n}
        /// Press Ctrl-C to stop.
        #[clap(long)]
        follow: bool,

        /// Polling interval in milliseconds for `--follow`.
        #[clap(long, value_name = "MS")]
        poll_interval_ms: Option<u64>,

        /// Show only frames whose checksum does not match.
        #[clap(long)]
        bad_only: bool,
    },

    /// Decode a hex MPDU.{n}
    /// Prints the MAC header and, when a data rate is given, verifies the
    /// trailing checksum.
    #[clap(name = "mpdu")]
    Mpdu {
        /// MPDU bytes as hex (spaces and colons are ignored).
        #[clap(value_name = "HEX")]
        hex: String,

        /// Data rate the frame was received at.
        #[clap(value_enum, long)]
        rate: Option<RateArg>,

        /// The first byte is a length prefix covering the rest of the buffer.
        #[clap(long)]
        length_prefixed: bool,

        /// Output format.
        #[clap(value_enum, long, short = 'f', default_value = "table")]
        format: OutputFormat,
    },
}
