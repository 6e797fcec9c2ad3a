use std::path::PathBuf;
use serde::Serialize;

/// Fully resolved configuration of one bootstrapper run.
#[derive(Serialize, Eq, PartialEq, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapperOptions {
    pub prefer_nuget: bool,
    pub force_nuget: bool,
    pub silent: bool,
    pub show_help: bool,
    pub download_arguments: DownloadArguments,
    /// Tokens no extraction step claimed, in their original order.
    pub unprocessed_command_args: Vec<String>,
}

#[derive(Serialize, Eq, PartialEq, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DownloadArguments {
    /// Empty means "whatever is latest".
    pub latest_version: String,
    pub ignore_prerelease: bool,
    pub ignore_cache: bool,
    pub nuget_source: Option<String>,
    pub do_self_update: bool,
    pub target: PathBuf,
    pub folder: PathBuf,
    pub max_file_age_in_minutes: Option<i32>,
    #[serde(rename = "ignoreSSL")]
    pub ignore_ssl: bool,
}

impl Default for DownloadArguments {
    fn default() -> Self {
        Self {
            latest_version: String::new(),
            ignore_prerelease: true,
            ignore_cache: false,
            nuget_source: None,
            do_self_update: false,
            target: PathBuf::new(),
            folder: PathBuf::new(),
            max_file_age_in_minutes: None,
            ignore_ssl: false,
        }
    }
}
