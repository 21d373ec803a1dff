pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod entities;
pub mod migrate;
pub mod services;

use std::process::ExitCode;
use tokio::runtime::{Builder, Runtime};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

pub use config::Config;

/// Runs the parsed command line and returns the process exit code.
pub fn run(cli: Cli) -> ExitCode {
    let command = cli.command.unwrap_or(Commands::Serve);

    let (config, ignored) = match load_config(&command, Config::load) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("ERROR: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config);

    if let Some(path) = &config.loaded_from {
        info!("Loaded config from {}", path.display());
    }
    if let Some(e) = ignored {
        warn!("Ignoring config file: {e:#}");
    }

    let runtime = match build_runtime(&config, &command) {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("ERROR: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match command {
        Commands::Serve => match runtime.block_on(cli::cmd_serve(config)) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Server failed: {e:#}");
                eprintln!("ERROR: {e:#}");
                ExitCode::FAILURE
            }
        },
        Commands::Migrate(args) => runtime.block_on(cli::cmd_migrate(args)),
        Commands::SetPassword(args) => runtime.block_on(cli::cmd_set_password(&config, args)),
        Commands::Init => match Config::create_default_if_missing() {
            Ok(true) => {
                info!("Created default config.toml");
                println!("Created config.toml with default settings.");
                ExitCode::SUCCESS
            }
            Ok(false) => {
                println!("config.toml already exists, leaving it untouched.");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("ERROR: {e:#}");
                ExitCode::FAILURE
            }
        },
    }
}

/// `serve` and `set-password` need a valid config. `migrate` and `init` fall
/// back to defaults plus the environment when the file cannot be loaded, and
/// the load error is returned alongside for logging.
fn load_config<F>(
    command: &Commands,
    loader: F,
) -> anyhow::Result<(Config, Option<anyhow::Error>)>
where
    F: FnOnce() -> anyhow::Result<Config>,
{
    match command {
        Commands::Serve | Commands::SetPassword(_) => {
            let config = loader()?;
            config.validate()?;
            Ok((config, None))
        }
        Commands::Migrate(_) | Commands::Init => match loader() {
            Ok(config) => Ok((config, None)),
            Err(e) => Ok((Config::from_env(), Some(e))),
        },
    }
}

/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = format!("{},sqlx=warn", config.log_filter());
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    let (json_layer, text_layer) = if config.general.log_json {
        (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
            None,
        )
    } else {
        (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

/// The web server gets a multi-threaded runtime; one-shot commands run on the
/// current thread.
fn build_runtime(config: &Config, command: &Commands) -> std::io::Result<Runtime> {
    let mut builder = match command {
        Commands::Serve => {
            let mut builder = Builder::new_multi_thread();
            if config.general.worker_threads > 0 {
                builder.worker_threads(config.general.worker_threads);
            }
            builder
        }
        Commands::Migrate(_) | Commands::SetPassword(_) | Commands::Init => {
            Builder::new_current_thread()
        }
    };

    builder.enable_all().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::MigrateArgs;
    use std::path::PathBuf;

    fn migrate_command() -> Commands {
        Commands::Migrate(MigrateArgs {
            sqlite: PathBuf::from("local.db"),
            target: None,
            force: false,
        })
    }

    #[test]
    fn test_migrate_survives_broken_config_file() {
        let (config, ignored) =
            load_config(&migrate_command(), || anyhow::bail!("bad toml")).unwrap();

        assert!(config.loaded_from.is_none());
        assert_eq!(config.server.port, Config::default().server.port);
        assert_eq!(ignored.unwrap().to_string(), "bad toml");
    }

    #[test]
    fn test_serve_rejects_broken_config_file() {
        assert!(load_config(&Commands::Serve, || anyhow::bail!("bad toml")).is_err());

        let mut invalid = Config::default();
        invalid.server.port = 0;
        assert!(load_config(&Commands::Serve, || Ok(invalid)).is_err());
    }

    #[test]
    fn test_loaded_config_is_kept() {
        let mut loaded = Config::default();
        loaded.general.log_level = "warn".to_string();
        loaded.loaded_from = Some(PathBuf::from("config.toml"));

        let (config, ignored) = load_config(&Commands::Init, || Ok(loaded)).unwrap();
        assert!(ignored.is_none());
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.loaded_from, Some(PathBuf::from("config.toml")));
    }
}
