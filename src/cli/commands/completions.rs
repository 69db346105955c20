//! Completions command - generate shell completion scripts

use crate::cli::args::Cli;
use clap::CommandFactory;
use clap_complete::Shell;
use std::io;

/// Write the completion script for `shell` to stdout
pub fn execute(shell: Shell) {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(shell, &mut command, name, &mut io::stdout());
}
