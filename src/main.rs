//! ftfx - FTFx flash word programmer
//!
//! Host front end for `ftfx-core`. It loads a board configuration and runs
//! the program-longword sequence against the `ftfx-sim` controller model,
//! printing the register writes the driver issues and the outcome the
//! controller reports.
//!
//! # Usage
//!
//! ```text
//! ftfx program --address 0x1F000 --data 0xDEADBEEF
//! ftfx program --address 0x0 --data 0 --protect 0 --wait
//! ftfx --config board.toml info
//! ftfx regs
//! ```

mod cli;
mod commands;
mod config;

use clap::Parser;
use cli::{Cli, Commands};
use config::BoardConfig;

/// Log level selected by the number of `-v` flags
fn log_level(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG still overrides the verbosity flags
    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose))
        .parse_default_env()
        .init();

    let board = match BoardConfig::load(cli.config.as_deref()) {
        Ok(board) => board,
        Err(e) => {
            eprintln!("Failed to load board configuration: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Program {
            address,
            data,
            wait,
            timeout_us,
            busy_cycles,
            inject,
            wedged,
            protect,
        } => commands::run_program(
            &board,
            &commands::ProgramOptions {
                address,
                data,
                wait,
                timeout_us,
                busy_cycles,
                inject,
                wedged,
                protect,
            },
        ),
        Commands::Regs => {
            commands::list_registers(board.flash.controller_base);
            Ok(())
        }
        Commands::Info => commands::show_info(&board),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_sets_log_level() {
        assert_eq!(log_level(0), log::LevelFilter::Info);
        assert_eq!(log_level(1), log::LevelFilter::Debug);
        assert_eq!(log_level(2), log::LevelFilter::Trace);
        assert_eq!(log_level(5), log::LevelFilter::Trace);
    }

    #[test]
    fn test_verbose_flag_counted() {
        let cli = Cli::parse_from(["ftfx", "-vv", "regs"]);
        assert_eq!(log_level(cli.verbose), log::LevelFilter::Trace);

        let cli = Cli::parse_from(["ftfx", "program", "-a", "0", "-d", "1", "-v"]);
        assert_eq!(log_level(cli.verbose), log::LevelFilter::Debug);
    }
}
