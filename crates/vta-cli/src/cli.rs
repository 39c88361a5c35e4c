//! CLI argument definitions for the `vta` tool.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use vta_codec::{DEFAULT_SCAN_WINDOW, ParseOptions};

use crate::commands::OrderSource;

#[derive(Parser)]
#[command(
    name = "vta",
    version,
    about = "Inspect, verify and patch Visual Tree Asset (VTA) files",
    long_about = "Inspect, verify and patch Visual Tree Asset (VTA) files.\n\n\
                  Operates on the raw bytes of a single VTA object. Same-size edits are\n\
                  written in place; edits that change a record's size splice or rebuild."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Reject non-zero padding and unexpected separators instead of warning.
    #[arg(long = "strict", global = true)]
    pub strict: bool,

    /// How far past the visual array to search for the template array.
    #[arg(
        long = "scan-window",
        value_name = "BYTES",
        default_value_t = DEFAULT_SCAN_WINDOW,
        global = true
    )]
    pub scan_window: usize,
}

impl Cli {
    /// Parse options selected by the global flags.
    #[must_use]
    pub fn parse_options(&self) -> ParseOptions {
        let options = ParseOptions::new().with_scan_window(self.scan_window);
        if self.strict { options.strict() } else { options }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the header, template references and records of a file.
    Inspect(InspectArgs),

    /// Check that parsing and rebuilding reproduces the file exactly.
    Verify(VerifyArgs),

    /// Rename one record.
    Rename(RenameArgs),

    /// Rewrite `order_in_document` from an ordering.
    Reorder(ReorderArgs),

    /// Replace one record's class list.
    SetClasses(SetClassesArgs),

    /// Exchange the class lists of two records.
    SwapClasses(SwapClassesArgs),
}

#[derive(Args)]
pub struct InspectArgs {
    /// VTA file to read.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Print a JSON report instead of tables.
    #[arg(long = "json")]
    pub json: bool,

    /// Cross-check records against a JSON field view from the host library.
    #[arg(long = "view", value_name = "VIEW.json")]
    pub view: Option<PathBuf>,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// VTA file to read.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Args)]
pub struct RenameArgs {
    /// VTA file to read.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Id of the record to rename.
    #[arg(long = "id", allow_hyphen_values = true)]
    pub id: i32,

    /// New name.
    #[arg(long = "name")]
    pub name: String,

    /// Output file.
    #[arg(short = 'o', long = "output", value_name = "OUT")]
    pub output: PathBuf,

    /// Rebuild the whole asset when the new name changes the record size.
    #[arg(long = "rebuild")]
    pub rebuild: bool,
}

#[derive(Args)]
pub struct ReorderArgs {
    /// VTA file to read.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// File listing record ids in the desired order.
    #[arg(long = "order", value_name = "IDS.txt", conflicts_with = "flatten", required_unless_present = "flatten")]
    pub order: Option<PathBuf>,

    /// Derive the order from parent links (depth-first).
    #[arg(long = "flatten")]
    pub flatten: bool,

    /// Also rewrite records of the template array.
    #[arg(long = "include-templates")]
    pub include_templates: bool,

    /// Output file.
    #[arg(short = 'o', long = "output", value_name = "OUT")]
    pub output: PathBuf,
}

impl ReorderArgs {
    /// The ordering source picked on the command line, if any.
    pub fn source(&self) -> Option<OrderSource<'_>> {
        match (self.flatten, self.order.as_deref()) {
            (true, _) => Some(OrderSource::Flatten),
            (false, Some(path)) => Some(OrderSource::File(path)),
            (false, None) => None,
        }
    }
}

#[derive(Args)]
pub struct SetClassesArgs {
    /// VTA file to read.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Id of the record to change.
    #[arg(long = "id", allow_hyphen_values = true)]
    pub id: i32,

    /// Class to set; repeat for several. Omit to clear the list.
    #[arg(long = "class", value_name = "CLASS")]
    pub classes: Vec<String>,

    /// Output file.
    #[arg(short = 'o', long = "output", value_name = "OUT")]
    pub output: PathBuf,
}

#[derive(Args)]
pub struct SwapClassesArgs {
    /// VTA file to read.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Id of the first record.
    #[arg(long = "first", allow_hyphen_values = true)]
    pub first: i32,

    /// Id of the second record.
    #[arg(long = "second", allow_hyphen_values = true)]
    pub second: i32,

    /// Output file.
    #[arg(short = 'o', long = "output", value_name = "OUT")]
    pub output: PathBuf,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
