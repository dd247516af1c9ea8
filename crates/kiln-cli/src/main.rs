//! kiln CLI entry point.
//!
//! Parses arguments, derives the environment mode once from the parsed command,
//! initialises logging and dispatches the command.

use clap::Parser;
use kiln_cli::{cli, commands, error, logger, ui};
use kiln_config::ModeSelector;
use miette::Result;

static MODE: ModeSelector = ModeSelector::new();

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    let result = match MODE.select(&args.invocation()) {
        Ok(mode) => commands::dispatch(args, mode).await,
        Err(err) => Err(err.into()),
    };

    result.map_err(error::cli_error_to_miette)
}
