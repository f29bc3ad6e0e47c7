use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

mod ai;
mod cli;
mod commands;
mod completion;
mod config;
mod database;
mod editor;
mod logging;
mod session;
mod tui;

use config::{Config, ConnectionConfig};
use database::{ConnectOptions, Database, MySqlDatabase};
use session::Session;

fn build_command() -> Command {
    Command::new("sqdesk")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A terminal SQL client with a modal editor and multi-source completion")
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("Connect to host"),
        )
        .arg(
            Arg::new("port")
                .short('P')
                .long("port")
                .value_name("PORT")
                .help("Port number to use for connection")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("user")
                .short('u')
                .long("user")
                .value_name("USER")
                .help("User for login; without one sqdesk starts disconnected"),
        )
        .arg(
            Arg::new("password")
                .short('p')
                .long("password")
                .value_name("PASSWORD")
                .help("Password to use when connecting to server")
                .num_args(0..=1)
                .require_equals(true),
        )
        .arg(
            Arg::new("database")
                .short('D')
                .long("database")
                .value_name("DATABASE")
                .help("Database to use"),
        )
        .arg(
            Arg::new("plain")
                .long("plain")
                .action(ArgAction::SetTrue)
                .help("Use the line-mode prompt instead of the full-screen editor"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Configuration file to use"),
        )
}

/// How the password should be obtained
#[derive(Debug, Clone, PartialEq, Eq)]
enum PasswordSource {
    Given(String),
    Prompt,
}

/// Merge command-line arguments over the configured connection.
///
/// Returns `None` when no user is known, in which case the client runs
/// without a database.
fn connect_options(
    matches: &ArgMatches,
    saved: Option<&ConnectionConfig>,
) -> Option<(ConnectOptions, PasswordSource)> {
    let saved = saved.cloned().unwrap_or_default();
    let arg = |id: &str| matches.get_one::<String>(id).cloned();

    let user = arg("user").or_else(|| (!saved.user.is_empty()).then(|| saved.user.clone()))?;
    let password = if matches.contains_id("password") {
        match arg("password") {
            Some(password) => PasswordSource::Given(password),
            None => PasswordSource::Prompt,
        }
    } else if !saved.password.is_empty() {
        PasswordSource::Given(saved.password.clone())
    } else {
        PasswordSource::Prompt
    };

    let options = ConnectOptions {
        host: arg("host").unwrap_or(saved.host),
        port: matches.get_one::<u16>("port").copied().unwrap_or(saved.port),
        user,
        password: String::new(),
        database: arg("database").or(saved.database),
    };
    Some((options, password))
}

fn read_password() -> Result<String> {
    print!("Enter password: ");
    io::stdout().flush()?;
    Ok(rpassword::read_password().unwrap_or_default())
}

fn connect(matches: &ArgMatches, config: &Config) -> Result<Option<Box<dyn Database>>> {
    let Some((mut options, password)) = connect_options(matches, config.active_connection())
    else {
        tracing::info!("No user given, starting without a connection");
        return Ok(None);
    };
    options.password = match password {
        PasswordSource::Given(password) => password,
        PasswordSource::Prompt => read_password()?,
    };

    let db = MySqlDatabase::connect(&options)?;
    println!("Connection id {}, server version {}", db.connection_id(), db.server_version());
    Ok(Some(Box::new(db)))
}

fn main() -> Result<()> {
    let _log_guard = logging::init();
    let matches = build_command().get_matches();

    let config_path = matches.get_one::<PathBuf>("config");
    let config = Config::load(config_path.map(PathBuf::as_path));
    if config_path.is_none() && config::config_file().is_some_and(|path| !path.exists()) {
        if let Err(e) = config.save() {
            tracing::warn!("Could not write default config: {}", e);
        }
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("sqdesk-worker")
        .build()
        .context("failed to start async runtime")?;

    let provider = ai::build_provider(&config.ai).unwrap_or_else(|e| {
        tracing::warn!("AI disabled: {}", e);
        eprintln!("Warning: AI disabled: {}", e);
        Arc::new(ai::NoopProvider)
    });

    let db = connect(&matches, &config)?;
    let mut session = Session::new(&config.completion, db, provider);

    tracing::info!(plain = matches.get_flag("plain"), "Starting sqdesk");
    if matches.get_flag("plain") {
        cli::Cli::new(&mut session, runtime.handle().clone())?.run()
    } else {
        tui::run(&mut session, &config, runtime.handle().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn matches(args: &[&str]) -> ArgMatches {
        build_command()
            .try_get_matches_from(std::iter::once("sqdesk").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_no_user_means_no_connection() {
        assert!(connect_options(&matches(&["--plain"]), None).is_none());
    }

    #[test]
    fn test_arguments_override_saved_connection() {
        let saved = ConnectionConfig {
            name: "local".to_string(),
            host: "db.internal".to_string(),
            port: 3307,
            user: "app".to_string(),
            password: "secret".to_string(),
            database: Some("shop".to_string()),
        };

        let (options, password) = connect_options(&matches(&[]), Some(&saved)).unwrap();
        assert_eq!(options.host, "db.internal");
        assert_eq!(options.port, 3307);
        assert_eq!(options.user, "app");
        assert_eq!(options.database.as_deref(), Some("shop"));
        assert_eq!(password, PasswordSource::Given("secret".to_string()));

        let args = ["-u", "root", "-P", "3306", "-D", "analytics", "--password=pw"];
        let (options, password) = connect_options(&matches(&args), Some(&saved)).unwrap();
        assert_eq!(options.user, "root");
        assert_eq!(options.port, 3306);
        assert_eq!(options.host, "db.internal");
        assert_eq!(options.database.as_deref(), Some("analytics"));
        assert_eq!(password, PasswordSource::Given("pw".to_string()));
    }

    #[test]
    fn test_bare_password_flag_prompts() {
        let (options, password) = connect_options(&matches(&["-u", "root", "-p"]), None).unwrap();
        assert_eq!(options.host, "localhost");
        assert_eq!(options.port, 3306);
        assert_eq!(password, PasswordSource::Prompt);
    }
}
