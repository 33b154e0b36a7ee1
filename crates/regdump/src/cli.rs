//! Command-line arguments.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use regdump_core::ControllerLayout;

const AFTER_HELP: &str = "\
Examples:
  regdump --image gic.bin --load-address 0x08000000 GIC.ISENABLER0 GIC.ICFGR2
  regdump --image ram.bin --base 0x2f000000 --interrupt-lines 288 GIC.ICPENDR4
  regdump --list";

/// Decode GIC distributor registers from a target memory image.
#[derive(Parser, Debug, PartialEq, Eq)]
#[command(name = "regdump", version, after_help = AFTER_HELP)]
pub struct Args {
    /// Register queries of the form GIC.<FAMILY><N>, e.g. GIC.ISENABLER3.
    #[arg(value_name = "QUERY", required_unless_present = "list")]
    pub queries: Vec<String>,

    /// Raw physical memory dump to read registers from.
    #[arg(
        long,
        short,
        env = "REGDUMP_IMAGE",
        value_name = "PATH",
        required_unless_present = "list"
    )]
    pub image: Option<PathBuf>,

    /// Target address of the first byte of the image.
    #[arg(long, value_name = "ADDR", value_parser = parse_address, default_value = "0")]
    pub load_address: u64,

    /// Target address of the GIC distributor.
    #[arg(long, value_name = "ADDR", value_parser = parse_address, default_value = "0x0800_0000")]
    pub base: u64,

    /// Number of implemented interrupt lines; rejects registers beyond it.
    #[arg(long, value_name = "N")]
    pub interrupt_lines: Option<u32>,

    /// Print one JSON object per register instead of text.
    #[arg(long)]
    pub json: bool,

    /// List the known register families and exit.
    #[arg(long)]
    pub list: bool,

    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only report errors.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Controller layout described by the address flags.
    pub const fn layout(&self) -> ControllerLayout {
        ControllerLayout {
            distributor_base: self.base,
            interrupt_lines: self.interrupt_lines,
        }
    }

    /// Maximum log level implied by `-v`/`-q`.
    pub const fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

/// Parses `0x`-prefixed hex or decimal addresses; `_` separators are ignored.
pub fn parse_address(text: &str) -> Result<u64, String> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    let parsed = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => digits.parse::<u64>(),
    };
    parsed.map_err(|error| format!("invalid address `{text}`: {error}"))
}
