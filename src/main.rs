#![forbid(unsafe_code)]

mod convert;
mod error;
mod profile;
mod randr;
mod storage;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::Level as TraceLevel;
use tracing_subscriber::FmtSubscriber;

use error::Error;
use randr::Session;
use storage::ProfileStore;

/// Save and inspect monitor layouts as named profiles.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// X display to query (defaults to $DISPLAY).
    #[arg(long, global = true)]
    display: Option<String>,

    /// Directory holding stored profiles.
    #[arg(long, global = true)]
    profiles_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a stored profile, or the current layout when no name is given.
    Cat {
        /// Stored profile name; omit it or pass "." for the live layout.
        name: Option<String>,

        /// Print the stored file verbatim instead of re-serializing it.
        #[arg(short, long, default_value_t = false)]
        raw: bool,
    },
    /// List stored profile names.
    #[command(alias = "ls")]
    List,
}

fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(exit_status(&err))
        }
    }
}

fn run(cli: &Cli) -> Result<(), Error> {
    let dir = cli
        .profiles_dir
        .clone()
        .unwrap_or_else(ProfileStore::default_dir);
    let _ = fs::create_dir_all(&dir);
    let store = ProfileStore::new(dir);

    match &cli.command {
        Commands::Cat { name, raw } => match name.as_deref() {
            None | Some("") | Some(".") => cat_active(cli.display.as_deref()),
            Some(name) => cat_saved(&store, name, *raw),
        },
        Commands::List => {
            for name in store.list() {
                println!("{name}");
            }
            Ok(())
        }
    }
}

/// Query the live layout and print it as a profile document.
fn cat_active(display: Option<&str>) -> Result<(), Error> {
    let session = Session::connect(display)?;
    let connected = session.connected_outputs()?;
    let primary = session.find_primary(&connected)?;
    let profile = convert::to_profile(&connected, primary);
    print!("{}", profile::write(&profile)?);
    Ok(())
}

/// Print a stored profile: parsed and re-serialized canonically, or the
/// file contents verbatim with --raw.
fn cat_saved(store: &ProfileStore, name: &str, raw: bool) -> Result<(), Error> {
    let text = store.load(name)?;
    if raw {
        print!("{text}");
        return Ok(());
    }

    let mut parsed = profile::read(&text)?;
    parsed.name = name.to_string();
    print!("{}", profile::write(&parsed)?);
    Ok(())
}

/// Boundary contract: user mistakes exit 2, display-server failures 64,
/// anything else 1.
fn exit_status(err: &Error) -> u8 {
    match err {
        Error::NotFound(_) | Error::EmptyProfile | Error::Parse(_) => 2,
        Error::Connect(_) | Error::Protocol(_) => 64,
        Error::Io(_) => 1,
    }
}

fn init_logging() {
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "warn".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "info" => TraceLevel::INFO,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::WARN,
    };

    // Profile text goes to stdout; logs must not.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
