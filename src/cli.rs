//! CLI argument parsing and command handlers.
//!
//! Each invocation behaves like one page load of the BankABC frontend: the
//! session is restored from the cookie jar, one action runs, and the process
//! exits.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{Level, error};
use url::Url;

use crate::auth::{
    Credentials, GatewayError, GuardDecision, LOGIN_VIEW, LoginError, SessionMachine,
};
use crate::client_config::{ClientConfig, DEFAULT_API_BASE, DEFAULT_COOKIE_DIR};
use crate::role::RoleTag;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "bankabc", about = "Sign in to BankABC and browse as your role")]
pub struct Args {
    /// Base URL of the BankABC API
    #[arg(long, env = "BANKABC_API_URL", default_value = DEFAULT_API_BASE, value_parser = validate_api_base)]
    pub api_url: Url,

    /// Directory holding the session cookie
    #[arg(long, env = "BANKABC_COOKIE_DIR", default_value = DEFAULT_COOKIE_DIR)]
    pub cookie_dir: PathBuf,

    /// Request timeout in seconds
    #[arg(long, env = "BANKABC_TIMEOUT_SECS", default_value = "15")]
    pub timeout_secs: u64,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,

    /// Log session transitions, not just warnings
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Sign in and print the view for your role
    Login {
        /// Login tab: customer, employee or admin
        #[arg(short, long)]
        role: RoleTag,

        /// Email address (username)
        #[arg(short, long)]
        email: String,

        /// Password. Prefer the BANKABC_PASSWORD env var
        #[arg(long, env = "BANKABC_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// End the current session
    Logout,
    /// Show who is signed in
    Whoami,
    /// Ask the route guard whether a view may be shown
    Check {
        /// View path, e.g. /employee/dashboard
        path: String,
    },
    /// GET an API path with the session token and print the JSON response
    Fetch {
        /// API path, e.g. /api/employee/employees/42
        path: String,
    },
}

fn validate_api_base(s: &str) -> Result<Url, String> {
    let url = Url::parse(s).map_err(|e| format!("Invalid API URL '{}': {}", s, e))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!("API URL must use http or https: {}", s));
    }
    if url.host_str().is_none() {
        return Err(format!("API URL has no host: {}", s));
    }
    Ok(url)
}

/// Initialize logging based on the specified format. Logs go to stderr.
pub fn init_logging(format: &LogFormat, verbose: bool) {
    let level = if verbose { Level::INFO } else { Level::WARN };
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

/// Build the client configuration from validated arguments.
pub fn build_config(args: &Args) -> ClientConfig {
    ClientConfig::new(
        args.api_url.clone(),
        args.cookie_dir.clone(),
        Duration::from_secs(args.timeout_secs),
    )
}

/// Create the session machine, restoring any saved session.
/// Returns None and logs an error if the HTTP client cannot be built.
pub fn open_session(config: &ClientConfig) -> Option<SessionMachine> {
    match SessionMachine::from_config(config) {
        Ok(machine) => Some(machine),
        Err(e) => {
            error!(error = %e, "Failed to create HTTP client");
            None
        }
    }
}

/// Run one command. Returns false when the command failed.
pub async fn run_command(machine: &SessionMachine, command: Command) -> bool {
    match command {
        Command::Login {
            role,
            email,
            password,
        } => handle_login(machine, Credentials::new(email, password, role)).await,
        Command::Logout => {
            machine.logout();
            println!("Signed out.");
            true
        }
        Command::Whoami => handle_whoami(machine),
        Command::Check { path } => {
            match machine.guard(&path) {
                GuardDecision::Allow => println!("allow {}", path),
                GuardDecision::Deny { redirect } => println!("redirect {}", redirect),
            }
            true
        }
        Command::Fetch { path } => handle_fetch(machine, &path).await,
    }
}

async fn handle_login(machine: &SessionMachine, credentials: Credentials) -> bool {
    match machine.login(credentials).await {
        Ok(success) => {
            println!("Signed in successfully as {}.", success.role);
            println!("{}", success.landing_path);
            true
        }
        Err(LoginError::Validation(fields)) => {
            for message in [fields.email, fields.password].into_iter().flatten() {
                eprintln!("{}", message);
            }
            eprintln!("{}", LoginError::Validation(fields).user_message());
            false
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            false
        }
    }
}

fn handle_whoami(machine: &SessionMachine) -> bool {
    if let Some(notice) = machine.take_notice() {
        eprintln!("{}", notice.message());
    }
    match machine.current_identity() {
        Some(identity) => match serde_json::to_string_pretty(&identity) {
            Ok(json) => {
                println!("{}", json);
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to serialize identity");
                false
            }
        },
        None => {
            println!("Not signed in.");
            true
        }
    }
}

async fn handle_fetch(machine: &SessionMachine, path: &str) -> bool {
    match machine.gateway().get_json::<serde_json::Value>(path).await {
        Ok(body) => {
            println!("{:#}", body);
            true
        }
        Err(GatewayError::Unauthorized) => {
            if let Some(notice) = machine.take_notice() {
                eprintln!("{}", notice.message());
            }
            eprintln!("redirect {}", LOGIN_VIEW);
            false
        }
        Err(e) => {
            error!(path = %path, error = %e, "Request failed");
            false
        }
    }
}
