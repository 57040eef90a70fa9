//! rstindex CLI — API reference index generator.
//!
//! Turns a list of package, module, and subpackage names into a tree of
//! reStructuredText `automodule` pages.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
