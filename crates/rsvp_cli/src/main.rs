//! `rsvp` command-line entry point.
//!
//! Each subcommand opens its own unit of work on the configured database
//! (see [`CoreConfig::from_env`] for the `RSVP_*` variables), runs one
//! operation through the data service, and disposes the unit of work on exit.
//! Logging starts only when `RSVP_LOG_DIR` is set.

use std::fmt::{Display, Formatter};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info};
use rsvp_core::{
    core_version, init_logging_from_config, CoreConfig, DataService, FuzzyMatchService,
    LoggingError, Response, StoreError, UnitOfWork,
};

/// Guest response store.
#[derive(Parser)]
#[command(name = "rsvp", about = "Record and look up guest responses")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the core library version.
    Version,
    /// Record one response.
    Add {
        #[arg(long)]
        first: String,
        #[arg(long)]
        last: String,
        #[arg(long)]
        email: String,
        /// Mark the guest as attending.
        #[arg(long)]
        attending: bool,
        /// Free-form note stored with the response.
        #[arg(long)]
        note: Option<String>,
    },
    /// Print every stored response as one JSON object per line.
    List,
    /// Find the response best matching a possibly misspelled name.
    ///
    /// Prints the match as JSON, or `no match`.
    Lookup {
        #[arg(long)]
        first: Option<String>,
        #[arg(long)]
        last: Option<String>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::Add { .. } => "add",
            Self::List => "list",
            Self::Lookup { .. } => "lookup",
        }
    }
}

#[derive(Debug)]
enum CliError {
    Logging(LoggingError),
    Store(StoreError),
    Encode(serde_json::Error),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logging(err) => write!(f, "logging setup failed: {err}"),
            Self::Store(err) => write!(f, "store operation failed: {err}"),
            Self::Encode(err) => write!(f, "failed to encode response: {err}"),
        }
    }
}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<StoreError> for CliError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command, &CoreConfig::from_env()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("rsvp: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, config: &CoreConfig) -> Result<(), CliError> {
    init_logging_from_config(config)?;

    let name = command.name();
    info!("event=command_start module=cli status=start command={name}");
    let result = execute(command, config);
    match &result {
        Ok(()) => info!("event=command_finish module=cli status=ok command={name}"),
        Err(err) => {
            error!("event=command_finish module=cli status=error command={name} error={err}")
        }
    }
    result
}

fn execute(command: Commands, config: &CoreConfig) -> Result<(), CliError> {
    if let Commands::Version = command {
        println!("rsvp_core {}", core_version());
        return Ok(());
    }

    // Dropping the unit of work disposes it on every exit path.
    let uow = UnitOfWork::open(config)?;
    let service = DataService::<Response>::new(&uow);

    match command {
        Commands::Version => {}
        Commands::Add {
            first,
            last,
            email,
            attending,
            note,
        } => {
            let mut response = Response::new(first, last, email, attending);
            response.note = note;
            let saved = service.add_and_save(response)?;
            println!("{}", saved.id);
        }
        Commands::List => {
            for response in service.get_all()? {
                println!("{}", serde_json::to_string(&response)?);
            }
        }
        Commands::Lookup { first, last } => {
            let responses = service.get_all()?;
            let found = FuzzyMatchService::new().find_best_match(
                &responses,
                first.as_deref(),
                last.as_deref(),
            );
            match found {
                Some(response) => println!("{}", serde_json::to_string(response)?),
                None => println!("no match"),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{run, CliError, Commands};
    use rsvp_core::{CoreConfig, DataService, Response, UnitOfWork};

    fn config_in(dir: &tempfile::TempDir) -> CoreConfig {
        CoreConfig {
            database_path: dir.path().join("rsvp.sqlite3"),
            ..CoreConfig::default()
        }
    }

    #[test]
    fn add_then_lookup_round_trips_through_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);

        run(
            Commands::Add {
                first: "Ada".to_string(),
                last: "Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                attending: true,
                note: Some("arriving late".to_string()),
            },
            &config,
        )
        .unwrap();
        run(
            Commands::Lookup {
                first: Some("Adaa".to_string()),
                last: Some("Lovelace".to_string()),
            },
            &config,
        )
        .unwrap();
        run(Commands::List, &config).unwrap();

        let uow = UnitOfWork::open(&config).unwrap();
        let stored = DataService::<Response>::new(&uow).get_all().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].note.as_deref(), Some("arriving late"));
    }

    #[test]
    fn unopenable_database_is_reported_as_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig {
            database_path: dir.path().join("missing").join("rsvp.sqlite3"),
            ..CoreConfig::default()
        };
        assert!(matches!(run(Commands::List, &config), Err(CliError::Store(_))));
    }

    #[test]
    fn version_needs_no_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig {
            database_path: dir.path().join("missing").join("rsvp.sqlite3"),
            ..CoreConfig::default()
        };
        run(Commands::Version, &config).unwrap();
    }
}
