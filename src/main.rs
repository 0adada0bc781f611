use bankabc_session::cli::{Args, build_config, init_logging, open_session, run_command};
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format, args.verbose);

    let config = build_config(&args);
    info!(api = %config.api_base, cookie_dir = %config.cookie_dir.display(), "Starting");

    let Some(machine) = open_session(&config) else {
        std::process::exit(1);
    };

    if !run_command(&machine, args.command).await {
        std::process::exit(1);
    }
}
