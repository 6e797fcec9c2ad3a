use std::path::PathBuf;
use clap::Parser;
use reqwest::Url;

/// Options of the executable itself. Everything after them is handed to the
/// option resolver untouched, so `--help` is not claimed here.
#[derive(Parser)]
#[clap(disable_help_flag = true, disable_version_flag = true)]
pub struct Args {
    /// JSON settings file; defaults to paket.bootstrapper.json next to the executable.
    #[clap(long, env = "PAKET_BOOTSTRAPPER_SETTINGS")]
    pub settings_file: Option<PathBuf>,
    /// Download this URL into the resolved target instead of printing the options.
    #[clap(long)]
    pub fetch: Option<Url>,
    #[clap(long)]
    pub json: bool,
    #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
    pub tokens: Vec<String>,
}
