#![doc = include_str!("../README.md")]

use clap::Parser;
use std::process::exit;

mod cli;
mod subcommands;

fn main() {
    let cli = match cli::Cli::parse().init_tracing_subscriber() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{:?}", e);
            exit(1);
        }
    };

    exit(cli.run());
}
