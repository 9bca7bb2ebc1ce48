//! mds CLI - Mermaid diagram pre-renderer for Markdown.
//!
//! Provides commands for:
//! - `render`: Render every Mermaid block of a document to an image
//! - `themes`: List built-in and custom themes

mod commands;
mod error;
mod logging;
mod output;

use clap::{Parser, Subcommand};

use commands::{RenderArgs, ThemesArgs};
use logging::LoggingArgs;
use output::Output;

/// mds - Render Mermaid diagrams in Markdown to static images.
#[derive(Parser)]
#[command(name = "mds", version, about)]
struct Cli {
    #[command(flatten)]
    logging: LoggingArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render Mermaid blocks and write the rewritten document.
    Render(RenderArgs),
    /// List available themes.
    Themes(ThemesArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let result = logging::init(&cli.logging).and_then(|()| match cli.command {
        Commands::Render(args) => args.execute(),
        Commands::Themes(args) => args.execute(),
    });

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
