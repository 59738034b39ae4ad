//! `tabio` command-line entry point.

use std::io::{self, IsTerminal};

use clap::Parser;
use tabio_cli::cli::{Cli, Command};
use tabio_cli::commands::{load_config, run_convert, run_describe, run_formats};
use tabio_cli::logging::init_logging;

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    if let Err(error) = init_logging(&cli.log_config(io::stderr().is_terminal())) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(&cli) {
        Ok(output) => {
            println!("{output}");
            0
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> anyhow::Result<String> {
    let config = load_config(cli.config.as_deref())?;
    let verbose = cli.reports_diagnostics();
    match &cli.command {
        Command::Describe(args) => run_describe(args, &config, verbose),
        Command::Convert(args) => {
            run_convert(args, &config, verbose).map(|summary| summary.to_string())
        }
        Command::Formats => run_formats(),
    }
}
