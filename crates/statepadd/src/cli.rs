use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

#[derive(Debug, Subcommand, PartialEq)]
pub(crate) enum Command {
    /// List registered layouts, or the controls of one layout.
    Layouts {
        /// Layout to describe
        name: Option<String>,
        /// Variant tag used to select controls
        #[clap(short, long)]
        variant: Option<String>,
    },
    /// Decode a single state buffer given as hex.
    Decode {
        /// Layout name
        layout: String,
        /// Buffer bytes, e.g. "00 01 ff"
        hex: String,
        /// Variant tag; resolved from the layout's default when omitted
        #[clap(short, long)]
        variant: Option<String>,
        /// Only print this control
        #[clap(short, long)]
        control: Option<String>,
    },
    /// Replay a captured device session.
    Replay {
        /// Capture file (YAML)
        capture: PathBuf,
        /// Pace frames by their timestamps instead of replaying instantly
        #[arg(long)]
        realtime: bool,
        /// Run a rebind over the replay, overriding the capture's settings
        #[arg(long)]
        rebind: bool,
        /// Expected control type for the rebind
        #[arg(long)]
        expect: Option<String>,
        /// Rebind timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

/// Decode gamepad state reports and resolve interactive rebinds.
#[derive(Parser)]
#[command(version, about, long_about = None)]
pub(crate) struct Cli {
    /// Turn debugging information on
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Directory with additional layout files
    #[arg(short, long)]
    pub layouts: Option<PathBuf>,

    /// The command to run
    #[clap(subcommand)]
    pub command: Command,
}
