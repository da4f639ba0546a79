//! Command-line entry point for the connected samples.

use clap::{Parser, Subcommand};
use sorng_vsphere_session::samples::{ConnectSample, CurrentTimeSample};
use sorng_vsphere_session::types::SessionConfig;
use sorng_vsphere_session::{ConnectedSample, ExitPolicy, SampleRunner, SessionLifecycle};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vsphere-sample", version, about = "Run a sample against a vCenter server or ESXi host")]
struct Cli {
    /// Endpoint URL, e.g. https://vcenter.lab.local/sdk
    #[arg(long, global = true)]
    url: Option<String>,

    #[arg(long, global = true)]
    username: Option<String>,

    #[arg(long, global = true)]
    password: Option<String>,

    /// Turn off the use of SSO for connections. Useful for connecting to ESX or ESXi hosts.
    #[arg(long, global = true)]
    basic_connection: bool,

    /// SSO token for the default connection
    #[arg(long, global = true)]
    token: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    insecure: bool,

    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// JSON session config; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Exit non-zero when no session could be opened
    #[arg(long, global = true)]
    strict_exit: bool,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(long, global = true)]
    log_level: Option<log::Level>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a session and report it
    Connect,
    /// Print the server's current time
    CurrentTime,
}

fn session_config(cli: &Cli) -> Result<SessionConfig, Box<dyn std::error::Error>> {
    let mut config = match cli.config {
        Some(ref path) => SessionConfig::from_json_file(path)?,
        None => SessionConfig::default(),
    };
    if let Some(ref url) = cli.url {
        config.connection.url = url.clone();
    }
    if let Some(ref username) = cli.username {
        config.connection.username = username.clone();
    }
    if let Some(ref password) = cli.password {
        config.connection.password = password.clone();
    }
    if let Some(ref token) = cli.token {
        config.sso_token = Some(token.clone());
    }
    if let Some(secs) = cli.timeout_secs {
        config.connection.timeout_secs = secs;
    }
    config.basic_connection |= cli.basic_connection;
    config.connection.insecure |= cli.insecure;
    Ok(config)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else if let Some(level) = cli.log_level {
        level.to_level_filter()
    } else {
        // Can still be overridden by RUST_LOG
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    let mut session = match session_config(&cli)
        .and_then(|c| SessionLifecycle::from_config(&c).map_err(Into::into))
    {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Invalid session configuration: {e}");
            std::process::exit(2);
        }
    };

    let policy = if cli.strict_exit {
        ExitPolicy::strict()
    } else {
        ExitPolicy::default()
    };
    let runner = SampleRunner::new(policy);

    let stdout = std::io::stdout();
    let mut sample: Box<dyn ConnectedSample> = match cli.command {
        Commands::Connect => Box::new(ConnectSample::new(stdout)),
        Commands::CurrentTime => Box::new(CurrentTimeSample::new(stdout)),
    };

    let outcome = runner.run(&mut session, sample.as_mut()).await;
    if !outcome.is_success() {
        eprintln!("{outcome:?}");
    }
    std::process::exit(outcome.exit_code(runner.policy()));
}
