//! Turns raw command-line tokens, persisted settings and the environment into
//! [`BootstrapperOptions`].
//!
//! Each extraction step takes the remaining tokens by value and hands back a
//! new, shorter list, so no token is ever looked at by two steps.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};
use crate::error::UsageError;
use crate::lookup::Lookup;
use crate::model::{BootstrapperOptions, DownloadArguments};

pub mod command_args {
    pub const HELP: &str = "--help";
    pub const PREFER_NUGET: &str = "--prefer-nuget";
    pub const FORCE_NUGET: &str = "--force-nuget";
    pub const PRERELEASE: &str = "prerelease";
    pub const NUGET_SOURCE_PREFIX: &str = "--nuget-source=";
    pub const SELF_UPDATE: &str = "--self";
    pub const SILENT: &str = "-s";
    pub const IGNORE_CACHE: &str = "-f";
    pub const MAX_FILE_AGE_PREFIX: &str = "--max-file-age=";
    pub const IGNORE_SSL: &str = "--no-ssl";
}

pub mod setting_keys {
    pub const PREFER_NUGET: &str = "PreferNuget";
    pub const FORCE_NUGET: &str = "ForceNuget";
    pub const PAKET_VERSION: &str = "PaketVersion";
}

pub mod env_keys {
    pub const PAKET_VERSION: &str = "PAKET.VERSION";
}

pub const ARTIFACT_FILE_NAME: &str = "paket.exe";

pub const USAGE: &str = "\
usage: paket-bootstrapper [options] [prerelease | <version>]

  prerelease                 download the latest version, prereleases included
  <version>                  download exactly this version
  --prefer-nuget             try the NuGet source before GitHub
  --force-nuget              only use the NuGet source
  --nuget-source=<url>       use <url> as NuGet source
  --self                     update the bootstrapper itself
  -s                         silent mode
  -f                         ignore the local cache
  --max-file-age=<minutes>   reuse a cached download younger than <minutes>
  --no-ssl                   do not validate TLS certificates
  --help                     show this text

Options of the executable itself (--settings-file, --fetch, --json) must
come before all of the above; afterwards they are treated as unknown tokens.
";

/// Directory holding the running executable, determined once per process.
///
/// Falls back to an empty path when the executable cannot be located; the
/// working directory is never consulted.
pub fn install_folder() -> &'static Path {
    static FOLDER: OnceLock<PathBuf> = OnceLock::new();

    FOLDER.get_or_init(|| {
        match std::env::current_exe().and_then(|exe| exe.canonicalize()) {
            Ok(exe) => exe.parent().map(Path::to_path_buf).unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "cannot locate the running executable");
                PathBuf::new()
            }
        }
    })
}

pub fn resolve<S, E, I, T>(args: I, settings: &S, env: &E) -> Result<BootstrapperOptions, UsageError>
where
    S: Lookup,
    E: Lookup,
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    resolve_in(install_folder(), args, settings, env)
}

/// Like [`resolve`], with the install folder supplied by the caller.
pub fn resolve_in<S, E, I, T>(
    folder: &Path,
    args: I,
    settings: &S,
    env: &E,
) -> Result<BootstrapperOptions, UsageError>
where
    S: Lookup,
    E: Lookup,
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let tokens = args.into_iter().map(Into::into).collect::<Vec<String>>();

    let (prefer_on_cli, tokens) = take_flag(tokens, command_args::PREFER_NUGET);
    let prefer_nuget = prefer_on_cli || is_true(settings, setting_keys::PREFER_NUGET);
    let (force_on_cli, tokens) = take_flag(tokens, command_args::FORCE_NUGET);
    let force_nuget = force_on_cli || is_true(settings, setting_keys::FORCE_NUGET);
    let (silent, tokens) = take_flag(tokens, command_args::SILENT);
    let (show_help, tokens) = take_flag(tokens, command_args::HELP);

    let (download_arguments, unprocessed_command_args) =
        resolve_download_arguments(folder, tokens, settings, env)?;

    Ok(BootstrapperOptions {
        prefer_nuget,
        force_nuget,
        silent,
        show_help,
        download_arguments,
        unprocessed_command_args,
    })
}

fn resolve_download_arguments<S: Lookup, E: Lookup>(
    folder: &Path,
    tokens: Vec<String>,
    settings: &S,
    env: &E,
) -> Result<(DownloadArguments, Vec<String>), UsageError> {
    let pinned_version = settings
        .lookup(setting_keys::PAKET_VERSION)
        .or_else(|| env.lookup(env_keys::PAKET_VERSION))
        .unwrap_or_default();

    let (do_self_update, tokens) = take_flag(tokens, command_args::SELF_UPDATE);
    let (nuget_source, tokens) = take_prefixed(tokens, command_args::NUGET_SOURCE_PREFIX)?;
    let (ignore_cache, tokens) = take_flag(tokens, command_args::IGNORE_CACHE);
    let (max_file_age, tokens) = take_prefixed(tokens, command_args::MAX_FILE_AGE_PREFIX)?;
    let max_file_age_in_minutes = max_file_age.as_deref().and_then(parse_max_file_age);
    let (ignore_ssl, tokens) = take_flag(tokens, command_args::IGNORE_SSL);

    let mut tokens = tokens.into_iter();
    let (latest_version, ignore_prerelease) = match tokens.next() {
        Some(positional) if positional == command_args::PRERELEASE => (String::new(), false),
        Some(version) => (version, true),
        None => (pinned_version, true),
    };

    let arguments = DownloadArguments {
        latest_version,
        ignore_prerelease,
        ignore_cache,
        nuget_source,
        do_self_update,
        target: folder.join(ARTIFACT_FILE_NAME),
        folder: folder.to_path_buf(),
        max_file_age_in_minutes,
        ignore_ssl,
    };

    Ok((arguments, tokens.collect()))
}

fn is_true<S: Lookup>(settings: &S, key: &str) -> bool {
    settings
        .lookup(key)
        .is_some_and(|value| value.eq_ignore_ascii_case("true"))
}

/// Drops every token equal to `flag`.
fn take_flag(tokens: Vec<String>, flag: &str) -> (bool, Vec<String>) {
    let (taken, rest): (Vec<_>, Vec<_>) = tokens.into_iter().partition(|t| t == flag);
    if !taken.is_empty() {
        debug!(flag, "consumed");
    }

    (!taken.is_empty(), rest)
}

/// Drops the token starting with `prefix` and returns what follows the prefix.
fn take_prefixed(
    tokens: Vec<String>,
    prefix: &'static str,
) -> Result<(Option<String>, Vec<String>), UsageError> {
    let (mut taken, rest): (Vec<_>, Vec<_>) =
        tokens.into_iter().partition(|t| t.starts_with(prefix));

    match taken.len() {
        0 => Ok((None, rest)),
        1 => {
            let value = taken.swap_remove(0).split_off(prefix.len());
            debug!(prefix, value = %value, "consumed");
            Ok((Some(value), rest))
        }
        count => Err(UsageError::Ambiguous { prefix, count }),
    }
}

/// Reads the minutes after `--max-file-age=`. Empty pieces between `=` are
/// skipped; exactly one number must remain.
fn parse_max_file_age(value: &str) -> Option<i32> {
    let mut pieces = value.split('=').filter(|p| !p.is_empty());

    let parsed = match (pieces.next(), pieces.next()) {
        (Some(minutes), None) => minutes.trim().parse::<i32>().ok(),
        _ => None,
    };
    if parsed.is_none() {
        warn!(value, "ignoring malformed max file age");
    }

    parsed
}
