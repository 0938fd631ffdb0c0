use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "eegstream",
    version,
    about = "Windowed EEG recording access with montages, filters and annotations",
    long_about = "Inspect EDF recordings, list montages, extract transformed display windows\n\
                  and read annotation files. Montage definitions are YAML files in a directory\n\
                  given by --montage-dir or $EEGSTREAM_MONTAGE_DIR."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show recording metadata
    Info(InfoArgs),
    /// List montages defined in a montage directory
    Montages(MontagesArgs),
    /// Extract one transformed window
    Window(WindowArgs),
    /// Show the consolidated annotations stored for a recording
    Annotations(AnnotationsArgs),
}

#[derive(Args)]
pub struct InfoArgs {
    /// Recording file path (EDF)
    #[arg(long)]
    pub file: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct MontagesArgs {
    /// Directory of montage YAML files
    #[arg(long, env = "EEGSTREAM_MONTAGE_DIR")]
    pub montage_dir: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct WindowArgs {
    /// Recording file path (EDF)
    #[arg(long)]
    pub file: String,

    /// Directory of montage YAML files (only AVERAGE is available without it)
    #[arg(long, env = "EEGSTREAM_MONTAGE_DIR")]
    pub montage_dir: Option<String>,

    /// Montage name
    #[arg(long, default_value = "AVERAGE")]
    pub montage: String,

    /// Window start in seconds
    #[arg(long, allow_hyphen_values = true)]
    pub start: f64,

    /// Window length in seconds
    #[arg(long)]
    pub duration: f64,

    /// High-pass cutoff in Hz
    #[arg(long)]
    pub low: Option<f64>,

    /// Low-pass cutoff in Hz
    #[arg(long)]
    pub high: Option<f64>,

    /// Optional streamer configuration file (YAML)
    #[arg(long)]
    pub config: Option<String>,

    /// Output samples as JSON instead of a per-channel summary
    #[arg(long)]
    pub json: bool,

    /// Compact JSON output
    #[arg(long)]
    pub compact: bool,

    /// Write JSON output to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,
}

#[derive(Args)]
pub struct AnnotationsArgs {
    /// Recording file path the annotations belong to
    #[arg(long)]
    pub file: String,

    /// Montage name the annotations were made under
    #[arg(long, default_value = "AVERAGE")]
    pub montage: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
