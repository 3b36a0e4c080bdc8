//! zlf: command-line inspector for Zniffer ZLF capture files.

use clap::Parser;
use log::{debug, error};

mod commands;
mod config;
mod context;

use config::{load_config, resolve_config_path, ConfigFile, ScanOverrides};
use context::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    // Load config file: explicit path > auto-detect > default
    let config_path = resolve_config_path(args.config.clone());
    let file_config = match &config_path {
        Some(path) => match load_config(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config file {}: {}", path.display(), e);
                return Err(e);
            }
        },
        None => ConfigFile::default(),
    };

    // RUST_LOG takes precedence over both --verbose and the file
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(file_config.log_level(args.verbose)),
    )
    .init();
    if let Some(path) = &config_path {
        debug!("Loaded config from: {}", path.display());
    }

    let code = match args.command {
        Commands::Records {
            file,
            format,
            no_skip_header,
            follow,
            poll_interval_ms,
        } => {
            let settings = file_config.scan_settings(ScanOverrides {
                chunk_size: args.chunk_size,
                no_skip_header,
                follow,
                poll_interval_ms,
            });
            commands::cmd_records(&file, settings, format)
        }
        Commands::Frames {
            file,
            format,
            no_skip_header,
            follow,
            poll_interval_ms,
            bad_only,
        } => {
            let settings = file_config.scan_settings(ScanOverrides {
                chunk_size: args.chunk_size,
                no_skip_header,
                follow,
                poll_interval_ms,
            });
            commands::cmd_frames(&file, settings, format, bad_only)
        }
        Commands::Mpdu {
            hex,
            rate,
            length_prefixed,
            format,
        } => commands::cmd_mpdu(&hex, rate.map(Into::into), length_prefixed, format),
    };

    if code != 0 {
        error!("Exiting with status {}", code);
        std::process::exit(code);
    }
    Ok(())
}
