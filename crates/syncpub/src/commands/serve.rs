//! `syncpub serve` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use syncpub_config::{CliSettings, Config, MAX_LOG_LEVEL, StorageBackend};
use syncpub_server::{run_server, server_config_from_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args, Debug)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover syncpub.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Refuse every push; reads keep working.
    #[arg(long)]
    readonly: bool,

    /// Only accept pushes to workspaces that already exist.
    #[arg(short = 'c', long)]
    closed: bool,

    /// List workspace names on the index page.
    #[arg(short, long)]
    discoverable: bool,

    /// Store each workspace in a SQLite file under the data directory.
    #[arg(short, long)]
    sqlite: bool,

    /// Directory for SQLite files (overrides config).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// 0 = warnings, 1 = basic, 2 = verbose, 3 = include workspace names.
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=i64::from(MAX_LOG_LEVEL)))]
    log_level: Option<u8>,

    /// Do not create the demo workspace at startup.
    #[arg(long)]
    no_demo: bool,
}

impl ServeArgs {
    /// Load and merge configuration for this invocation.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded or is invalid.
    pub(crate) fn load_config(self) -> Result<Config, CliError> {
        let cli_settings = self.cli_settings();
        Ok(Config::load(self.config.as_deref(), Some(&cli_settings))?)
    }

    /// Translate flags into config overrides. Absent flags leave file values.
    fn cli_settings(&self) -> CliSettings {
        CliSettings {
            host: self.host.clone(),
            port: self.port,
            readonly: self.readonly.then_some(true),
            allow_push_to_new_workspaces: self.closed.then_some(false),
            discoverable: self.discoverable.then_some(true),
            backend: self.sqlite.then_some(StorageBackend::Sqlite),
            data_dir: self.data_dir.clone(),
            log_level: self.log_level,
            seed_demo: self.no_demo.then_some(false),
        }
    }
}

/// Run the server with a loaded configuration.
///
/// # Errors
///
/// Returns an error if a startup precondition fails or the server stops
/// with an error.
pub(crate) async fn run(config: Config) -> Result<(), CliError> {
    let output = Output::new();

    tracing::debug!(config_file = ?config.config_path, "Loaded configuration");
    check_storage_root(&config)?;

    let policy = config.to_policy();
    output.highlight(&format!(
        "Starting syncpub on {}:{}",
        config.server.host, config.server.port
    ));
    match config.storage_resolved.backend {
        StorageBackend::Memory => {
            output.warning("Storage: memory (workspaces are lost when the server stops)");
        }
        StorageBackend::Sqlite => output.info(&format!(
            "Storage: sqlite in {}",
            config.storage_resolved.data_dir.display()
        )),
    }
    if policy.readonly {
        output.info("Readonly: pushes are refused");
    } else if !policy.allow_push_to_new_workspaces {
        output.info("Closed: pushes only reach existing workspaces");
    }
    if policy.discoverable {
        output.info("Discoverable: workspace names are listed on the index page");
    }

    let server_config = server_config_from_config(&config);
    run_server(server_config)
        .await
        .map_err(|e| CliError::Server(e.to_string()))?;

    Ok(())
}

/// SQLite mode needs an existing data directory; it is never created.
fn check_storage_root(config: &Config) -> Result<(), CliError> {
    if config.storage_resolved.backend == StorageBackend::Sqlite {
        require_dir(&config.storage_resolved.data_dir)?;
    }
    Ok(())
}

fn require_dir(dir: &Path) -> Result<(), CliError> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(CliError::Validation(format!(
            "Data directory does not exist: {}",
            dir.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        serve: ServeArgs,
    }

    fn parse(args: &[&str]) -> ServeArgs {
        let mut argv = vec!["syncpub"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap().serve
    }

    #[test]
    fn test_no_flags_override_nothing() {
        let settings = parse(&[]).cli_settings();

        assert_eq!(settings.port, None);
        assert_eq!(settings.readonly, None);
        assert_eq!(settings.allow_push_to_new_workspaces, None);
        assert_eq!(settings.discoverable, None);
        assert_eq!(settings.backend, None);
        assert_eq!(settings.seed_demo, None);
    }

    #[test]
    fn test_short_flags() {
        let settings = parse(&["-p", "4000", "-c", "-d", "-s"]).cli_settings();

        assert_eq!(settings.port, Some(4000));
        assert_eq!(settings.allow_push_to_new_workspaces, Some(false));
        assert_eq!(settings.discoverable, Some(true));
        assert_eq!(settings.backend, Some(StorageBackend::Sqlite));
    }

    #[test]
    fn test_long_flags() {
        let settings = parse(&[
            "--readonly",
            "--no-demo",
            "--log-level",
            "2",
            "--data-dir",
            "/srv/pub",
        ])
        .cli_settings();

        assert_eq!(settings.readonly, Some(true));
        assert_eq!(settings.seed_demo, Some(false));
        assert_eq!(settings.log_level, Some(2));
        assert_eq!(settings.data_dir, Some(PathBuf::from("/srv/pub")));
    }

    #[test]
    fn test_log_level_out_of_range() {
        let result = TestCli::try_parse_from(["syncpub", "--log-level", "4"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_sqlite_requires_existing_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage_resolved.backend = StorageBackend::Sqlite;

        config.storage_resolved.data_dir = dir.path().join("missing");
        assert!(matches!(
            check_storage_root(&config),
            Err(CliError::Validation(_))
        ));

        config.storage_resolved.data_dir = dir.path().to_path_buf();
        assert!(check_storage_root(&config).is_ok());
    }

    #[test]
    fn test_memory_ignores_data_dir() {
        let mut config = Config::default();
        config.storage_resolved.data_dir = PathBuf::from("/nonexistent/dir");
        assert!(check_storage_root(&config).is_ok());
    }
}
