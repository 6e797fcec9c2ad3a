#![deny(clippy::all)]
#![warn(clippy::nursery)]

mod args;

use std::process::exit;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use paket_bootstrapper::resolver::{command_args, install_folder, USAGE};
use paket_bootstrapper::{resolve, DownloadChannel, Environment, Settings};
use crate::args::Args;

const SETTINGS_FILE_NAME: &str = "paket.bootstrapper.json";

fn init_logging(silent: bool) {
    let default_level = if silent { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn main() {
    let args = Args::parse();
    let silent = args.tokens.iter().any(|t| t == command_args::SILENT);
    init_logging(silent);

    let settings_path = args
        .settings_file
        .unwrap_or_else(|| install_folder().join(SETTINGS_FILE_NAME));
    let settings = Settings::load(&settings_path);
    let env = Environment::capture();

    let options = match resolve(args.tokens, &settings, &env) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{e}");
            eprint!("{USAGE}");
            exit(2);
        }
    };

    if options.show_help {
        print!("{USAGE}");
        return;
    }

    if !options.unprocessed_command_args.is_empty() {
        warn!(args = ?options.unprocessed_command_args, "ignoring unrecognized arguments");
    }

    if let Some(url) = args.fetch {
        let download = &options.download_arguments;
        let channel = match DownloadChannel::new(download.ignore_ssl) {
            Ok(channel) => channel,
            Err(e) => {
                eprintln!("{e}");
                exit(1);
            }
        };

        info!(%url, target = %download.target.display(), "downloading");
        if let Err(e) = channel.fetch_to_file(url.as_str(), &download.target) {
            eprintln!("{e}");
            exit(1);
        }
        info!("done");
        return;
    }

    if args.json {
        match serde_json::to_string_pretty(&options) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("failed to serialize options: {e}");
                exit(1);
            }
        }
    } else {
        println!("{options:#?}");
    }
}
