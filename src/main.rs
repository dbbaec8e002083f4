use clap::Parser;

use yt2ado::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = cli::run(cli).await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
