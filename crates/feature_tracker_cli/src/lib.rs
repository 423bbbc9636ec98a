//! `feature-tracker` command-line front end.

mod cli;
mod commands;
mod context;
mod error;

pub use cli::{Cli, Command, GlobalArgs, SettingsCommand};
pub use error::{CliError, CliResult};

use clap::Parser;
use context::AppContext;
use std::io::Write;

/// Parses `args` and runs the selected command, writing output to `out`.
pub fn run<I, T>(args: I, out: &mut dyn Write) -> CliResult<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::try_parse_from(args)?;
    let mut context = AppContext::load(cli.global)?;
    commands::dispatch(&cli.command, &mut context, out)
}
