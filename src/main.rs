mod cli;
mod error;
mod export;
mod gate;
mod logging;
mod model;
mod orchestrator;
mod text_summary;
mod transport;
#[cfg(feature = "tui")]
mod tui;
mod view;

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod backend_tests;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_non_tui = args.json || args.text;

    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success for non-TUI modes
            if is_non_tui {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            if is_non_tui {
                eprintln!("error: {e:#}");
                std::process::exit(1);
            }
            Err(e)
        }
    }
}
