use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;

use textsplice::{merge, process, split, telemetry};

#[derive(Parser)]
#[command(name = "splice", about = "Split, transform, and reassemble large text files")]
struct Cli {
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Split(split::SplitCmd),
    Process(process::ProcessCmd),
    Merge(merge::MergeCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);
    telemetry::config::init_tracing();

    match cli.command {
        Commands::Split(args) => split::run(args)?,
        Commands::Process(args) => process::run(args).await?,
        Commands::Merge(args) => merge::run(args)?,
    }

    Ok(())
}
