use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fee_impact::api::{self, CompareArgs};

#[derive(Parser, Debug)]
#[command(
    name = "fee-impact",
    about = "Compare long-run growth of a low-fee index fund against an active fund with an advisor fee"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the comparison for one scenario
    Compare(CompareArgs),
    /// Serve the dashboard and JSON API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Compare(args) => match api::run_compare(args) {
            Ok(out) => print!("{out}"),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(2);
            }
        },
        Command::Serve { port } => api::run_http_server(port).await?,
    }

    Ok(())
}
