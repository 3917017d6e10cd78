use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracemark_attribution::{CarrierType, DEFAULT_LIST_LIMIT};

#[derive(Parser)]
#[command(
    name = "tracemark",
    about = "Tracemark: watermark downloads and attribute leaks",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Ledger file (overrides the configuration)
    #[arg(long, global = true)]
    pub ledger: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Declared carrier type, when the file name should not decide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum CarrierArg {
    Image,
    Json,
    Unsupported,
}

impl From<CarrierArg> for CarrierType {
    fn from(arg: CarrierArg) -> Self {
        match arg {
            CarrierArg::Image => CarrierType::Image,
            CarrierArg::Json => CarrierType::Json,
            CarrierArg::Unsupported => CarrierType::Unsupported,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Watermark a file for a requester and record the issuance
    Issue(IssueArgs),
    /// Attribute a suspected leak to its recipient
    Verify(VerifyArgs),
    /// List issuances of a post or a single artifact
    List(ListArgs),
    /// Show the issuance behind a tracking code
    Show(ShowArgs),
}

#[derive(Args)]
pub struct IssueArgs {
    /// File to watermark
    pub input: PathBuf,
    /// Requester id
    #[arg(short, long)]
    pub user: String,
    /// Requester display name
    #[arg(long)]
    pub name: Option<String>,
    #[arg(short, long)]
    pub post: String,
    /// Artifact file name (defaults to the input's file name)
    #[arg(long)]
    pub file: Option<String>,
    #[arg(long, default_value = "v1")]
    pub artifact_version: String,
    #[arg(long = "type", value_enum)]
    pub carrier: Option<CarrierArg>,
    /// Where to write the watermarked file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct VerifyArgs {
    pub input: PathBuf,
    #[arg(long = "type", value_enum)]
    pub carrier: Option<CarrierArg>,
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(short, long)]
    pub post: String,
    /// Restrict to one file; needs --artifact-version
    #[arg(long, requires = "artifact_version")]
    pub file: Option<String>,
    #[arg(long, requires = "file")]
    pub artifact_version: Option<String>,
    #[arg(short = 'n', long, default_value_t = DEFAULT_LIST_LIMIT)]
    pub limit: usize,
}

#[derive(Args)]
pub struct ShowArgs {
    pub code: String,
}
