//! `minibox` - common Unix file utilities behind one binary.
//!
//! See `README.md` for user documentation and `DESIGN.md` for architecture.

use clap::Parser;
use std::ffi::OsString;

use minibox::cli::Cli;
use minibox::{engine, logging};

fn main() {
    let argv: Vec<OsString> = std::env::args_os().collect();
    let stdout = std::io::stdout().lock();
    let exit_code = match Cli::try_parse_from(&argv) {
        Ok(cli) => {
            logging::init(cli.verbose);
            engine::run(cli.command, stdout)
        }
        Err(err) => engine::report_parse_error(&argv, &err, stdout),
    };
    std::process::exit(exit_code);
}
