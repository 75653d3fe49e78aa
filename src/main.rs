use std::{error::Error, future::Future, io, process, time::Duration};

use clap::{command, Parser, Subcommand, ValueHint};
use log::{debug, error, info, LevelFilter};
use veil::Redact;

use ncm_resolver::{
    catalog::Catalog,
    config::Config,
    credential::Secrets,
    error::Result as ResolverResult,
    protocol::StreamQuality,
    resolver::Resolver,
    track::TrackId,
};

/// Profile to display when not built in release mode.
#[cfg(debug_assertions)]
const BUILD_PROFILE: &str = "debug";
/// Profile to display when not built release mode.
#[cfg(not(debug_assertions))]
const BUILD_PROFILE: &str = "release";

/// Group name for mutually exclusive logging options.
const ARGS_GROUP_LOGGING: &str = "logging";

/// Command line arguments as parsed by `clap`.
#[derive(Clone, Parser, Redact)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Secrets file
    ///
    /// TOML file with the session `cookie` and optionally a `cipher_key`.
    /// Ensure that this file is kept secure and not shared publicly, as it
    /// grants access to your account.
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath, default_value_t = String::from("secrets.toml"))]
    secrets_file: String,

    /// Session cookie
    ///
    /// Overrides the cookie from the secrets file.
    #[redact]
    #[arg(long, env = "NETEASE_MUSIC_COOKIE", hide_env_values = true)]
    cookie: Option<String>,

    /// Cipher key for encrypted requests
    ///
    /// Overrides the key from the secrets file.
    #[redact]
    #[arg(long, env = "NETEASE_MUSIC_AES_KEY", hide_env_values = true)]
    cipher_key: Option<String>,

    /// Quality to resolve when none is given
    ///
    /// One of: standard, exhigh, lossless, hires, sky, jyeffect, jymaster.
    #[arg(long, value_name = "QUALITY", env = "DEFAULT_MUSIC_QUALITY")]
    default_quality: Option<StreamQuality>,

    /// Give up after this many seconds
    #[arg(long, value_name = "SECONDS")]
    deadline: Option<u64>,

    /// Suppresses all output except warnings and errors.
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING)]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Specify twice for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING)]
    verbose: u8,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Resolve a track ID, catalog URL or short link into a playable stream
    Resolve {
        input: String,

        /// Requested quality [default: --default-quality or standard]
        #[arg(short = 'l', long)]
        quality: Option<StreamQuality>,
    },

    /// Look up details of one or more tracks
    Details {
        #[arg(required = true)]
        ids: Vec<TrackId>,
    },

    /// Look up the lyrics of a track
    Lyric { id: TrackId },

    /// Search songs by keywords
    Search {
        keywords: String,

        /// Result page, starting at 0
        #[arg(short, long, default_value_t = 0)]
        page: u32,
    },

    /// List the tracks of a playlist
    Playlist { id: u64 },

    /// List the playlists of a user
    UserPlaylists { uid: u64 },

    /// List the most popular playlists
    HotPlaylists,
}

/// Initializes the logger facade.
///
/// The logging level is determined as follows, in order of precedence from
/// highest to lowest:
/// 1. Command line arguments
/// 2. `RUST_LOG` environment variable
/// 3. Hard coded default
///
/// # Panics
///
/// Panics when a logger facade is already initialized.
fn init_logger(config: &Args) {
    let mut logger = env_logger::Builder::from_env(
        // Note: if you change the default logging level here, then you should
        // probably also change the verbosity levels below.
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    if config.quiet || config.verbose > 0 {
        let level = match config.verbose {
            0 => {
                // Quiet and verbose are mutually exclusive, and `verbose` is 0
                // by default. So this arm means: quiet mode.
                LevelFilter::Warn
            }
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Filter log messages of external crates.
        logger.filter_module(module_path!(), level);
    }

    // Results go to stdout; keep it clean for piping.
    logger.target(env_logger::Target::Stderr);
    logger.init();
}

/// Loads secrets from a file.
///
/// A missing file is not an error: without a cookie, tracks that are free to
/// stream still resolve.
fn load_secrets(secrets_file: &str) -> ResolverResult<Secrets> {
    match Secrets::from_file(secrets_file) {
        Err(e)
            if e.downcast::<io::Error>()
                .is_some_and(|e| e.kind() == io::ErrorKind::NotFound) =>
        {
            info!("{secrets_file} not found; continuing without secrets");
            Ok(Secrets::default())
        }
        result => result,
    }
}

/// Builds the configuration from the secrets file and command line.
fn load_config(args: &Args) -> ResolverResult<Config> {
    let mut secrets = load_secrets(&args.secrets_file)?;
    if args.cookie.is_some() {
        secrets.cookie.clone_from(&args.cookie);
    }
    if args.cipher_key.is_some() {
        secrets.cipher_key.clone_from(&args.cipher_key);
    }

    let mut config = Config::with_secrets(&secrets)?;
    if let Some(quality) = args.default_quality {
        config.default_quality = quality;
    }

    Ok(config)
}

/// Awaits `future`, giving up after `deadline` if one is set.
async fn within<T>(
    deadline: Option<Duration>,
    future: impl Future<Output = ResolverResult<T>>,
) -> ResolverResult<T> {
    match deadline {
        Some(deadline) => tokio::time::timeout(deadline, future).await?,
        None => future.await,
    }
}

/// Runs the command and prints its result as JSON.
///
/// # Errors
///
/// This function returns an error when the command fails, for example
/// because the track cannot be resolved or the vendor is unreachable.
async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args)?;
    let deadline = args.deadline.map(Duration::from_secs);

    let catalog = Catalog::new(&config)?;
    let resolver = Resolver::new(catalog, &config);

    let output = match args.command {
        Command::Resolve { input, quality } => {
            let quality = quality.unwrap_or(config.default_quality);
            info!("resolving {input} at {} quality", quality.label());

            let track = match deadline {
                Some(deadline) => {
                    resolver
                        .resolve_with_deadline(&input, quality, deadline)
                        .await?
                }
                None => resolver.resolve(&input, quality).await?,
            };
            serde_json::to_string_pretty(&track)?
        }

        Command::Details { ids } => {
            let batch = resolver.batch();
            let result = match deadline {
                Some(deadline) => {
                    batch
                        .lookup_with_deadline(resolver.catalog(), &ids, deadline)
                        .await
                }
                None => batch.lookup(resolver.catalog(), &ids).await,
            };
            info!("found {} of {} tracks", result.len(), ids.len());
            serde_json::to_string_pretty(&result.enrich(&ids))?
        }

        Command::Lyric { id } => {
            let lyrics = within(deadline, resolver.lyric(id)).await?;
            serde_json::to_string_pretty(&lyrics)?
        }

        Command::Search { keywords, page } => {
            let hits = within(deadline, resolver.search(&keywords, page)).await?;
            info!("{} hits for \"{keywords}\"", hits.len());
            serde_json::to_string_pretty(&hits)?
        }

        Command::Playlist { id } => {
            let tracks = within(deadline, resolver.playlist(id)).await?;
            serde_json::to_string_pretty(&tracks)?
        }

        Command::UserPlaylists { uid } => {
            let playlists = within(deadline, resolver.user_playlists(uid)).await?;
            info!("user {uid} has {} playlists", playlists.len());
            serde_json::to_string_pretty(&playlists)?
        }

        Command::HotPlaylists => {
            let playlists = within(deadline, resolver.hot_playlists()).await?;
            serde_json::to_string_pretty(&playlists)?
        }
    };

    println!("{output}");
    Ok(())
}

/// Main entry point of the application.
///
/// This function initializes the logger facade, parses the command line
/// arguments, and runs the requested command.
#[tokio::main]
async fn main() {
    // `clap` handles our command line arguments and help text.
    let args = Args::parse();
    init_logger(&args);

    // Dump command line arguments before we do anything more.
    // This aids in debugging of whatever comes next.
    debug!("Command {:#?}", args);

    let cmd = command!();
    let name = cmd.get_name().to_string();
    let version = cmd.get_version().unwrap_or("UNKNOWN").to_string();

    info!("starting {name}/{version}; {BUILD_PROFILE}");

    let result = tokio::select! {
        // Prioritize shutdown signals.
        biased;

        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            Ok(())
        }

        result = run(args) => result,
    };

    if let Err(e) = result {
        error!("{e}");
        process::exit(1);
    }
}
