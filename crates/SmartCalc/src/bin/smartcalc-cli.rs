//! Smart calculator CLI executable
//!
//! Evaluates a document from a file or stdin and prints each line's result.
//! See the cli module documentation for detailed usage information.

use clap::Parser;
use smart_calc::cli::{Args, run_cli};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    run_cli(args).await?;
    Ok(())
}
