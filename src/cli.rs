//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(&hex.replace('_', ""), 16)
            .map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "ftfx")]
#[command(author, version, about = "FTFx flash word programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Board configuration file (TOML). Defaults to the FRDM-KL25Z
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Controller fault to leave pending before programming
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Fault {
    /// Access error (FSTAT[ACCERR])
    Accerr,
    /// Protection violation (FSTAT[FPVIOL])
    Fpviol,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Program one 32-bit word into simulated P-Flash
    Program {
        /// Target address (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u32)]
        address: u32,

        /// Word to program (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u32)]
        data: u32,

        /// Wait for the command to finish and report its faults
        #[arg(short, long)]
        wait: bool,

        /// Give up waiting for the controller after this many microseconds
        #[arg(long)]
        timeout_us: Option<u32>,

        /// FSTAT polls the controller stays busy after each launch
        #[arg(long, default_value_t = 0)]
        busy_cycles: u32,

        /// Leave a fault pending from an earlier command
        #[arg(long, value_enum)]
        inject: Option<Fault>,

        /// Controller never reports command complete
        #[arg(long)]
        wedged: bool,

        /// Protect a P-Flash region (0-31, repeatable)
        #[arg(long, value_name = "REGION")]
        protect: Vec<u32>,
    },

    /// Show the controller register map
    Regs,

    /// Show the effective board configuration
    Info,
}
