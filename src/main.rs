//! rez-env CLI. Resolves a package request and hands off a configured shell.
//!
//! Stdout carries only the hand-off script; diagnostics go to stderr.

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "rez-env",
    version,
    about = "Invoke a shell based on a configuration request"
)]
struct Cli {
    #[command(flatten)]
    args: rez_env::cli::EnvArgs,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.args.quiet { "error" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = rez_env::cli::load_config(&cli.args).and_then(|config| {
        let ctx = rez_env::cli::read_environment();
        let stdout = std::io::stdout();
        rez_env::cli::dispatch(&cli.args, &config, &ctx, stdout.lock())
    });

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(e.exit_code());
    }
}
