//! # CLI Structure and Argument Parsing
//!
//! `vitrine` drives the media resolution layer from a terminal: resolve gallery
//! assets against a live origin, inspect the candidate fallbacks for a path,
//! see which scheduling profile a connection maps to, and manage the persisted
//! hint cache.
//!
//! ## Usage Patterns
//!
//! ```bash
//! # Resolve photos against the storefront origin
//! vitrine resolve https://loja.example /galeria/vestido.jpg /galeria/blusa.png
//!
//! # Resolve a carousel clip on a slow connection
//! vitrine resolve https://loja.example /videos/desfile.mp4 --kind video --network 2g
//!
//! # What would be tried for a path
//! vitrine candidates /galeria/Vestido.JPG
//!
//! # Plan and resolve a filtered catalog
//! vitrine gallery catalogo.json --category vestidos --base-url https://loja.example
//!
//! # Hint cache maintenance
//! vitrine cache stats
//! vitrine cache clear
//! ```
//!
//! Connectivity is never sniffed; pass `--network`, `--downlink` and
//! `--save-data` to describe it. Without them the connection is unknown and
//! scheduling uses the medium tier.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use vitrine_core::{ConnectionInfo, DEFAULT_PRIORITY, EffectiveType, MediaKind, Priority};

use crate::output::OutputFormat;

/// Main CLI structure.
#[derive(Parser, Clone, Debug)]
#[command(name = "vitrine")]
#[command(version)]
#[command(about = "Resolve gallery media with fallbacks and a persistent hint cache", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show debug logs
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress informational messages (only show errors)
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable all ANSI colors in output (also respects `NO_COLOR` env)
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Path to configuration file. Also via `VITRINE_CONFIG`.
    #[arg(long, global = true, value_name = "FILE", env = "VITRINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the persisted hint cache. Also via `VITRINE_DATA_DIR`.
    #[arg(long = "data-dir", global = true, value_name = "DIR", env = "VITRINE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output format (defaults to text on a terminal, JSON otherwise)
    #[arg(short = 'f', long, global = true, value_enum)]
    pub format: Option<OutputFormat>,
}

impl Cli {
    /// Format requested on the command line, or the terminal-based default.
    pub fn output_format(&self) -> OutputFormat {
        self.format.unwrap_or_else(OutputFormat::detect)
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Resolve one or more nominal media paths against an origin
    Resolve {
        /// Site origin the paths are relative to
        base_url: String,

        /// Nominal paths, such as `/galeria/vestido.jpg`
        #[arg(required = true)]
        urls: Vec<String>,

        /// Media family of every path
        #[arg(short, long, value_enum, default_value_t = KindArg::Image)]
        kind: KindArg,

        /// Queue priority; higher is dispatched sooner
        #[arg(short, long, default_value_t = DEFAULT_PRIORITY)]
        priority: Priority,

        /// Print load-time samples after resolving
        #[arg(long)]
        report: bool,

        #[command(flatten)]
        network: NetworkArgs,
    },

    /// Show the ordered fallback candidates for a path
    Candidates {
        /// Nominal path
        path: String,

        /// Media family
        #[arg(short, long, value_enum, default_value_t = KindArg::Image)]
        kind: KindArg,
    },

    /// Show the scheduling profile a connection maps to
    Profile {
        #[command(flatten)]
        network: NetworkArgs,
    },

    /// Filter a catalog and plan, or resolve, its images
    Gallery {
        /// JSON catalog file
        catalog: PathBuf,

        /// Category key, or `todas` for every category
        #[arg(short, long, default_value = vitrine_core::ALL_CATEGORIES)]
        category: String,

        /// Case-insensitive text to look for in names and descriptions
        #[arg(short, long, default_value = "")]
        search: String,

        /// Number of leading items loaded at eager priority
        #[arg(long, default_value_t = 6)]
        eager: usize,

        /// Resolve the planned images against this origin
        #[arg(long, value_name = "URL")]
        base_url: Option<String>,

        /// Add a chat inquiry link per item for this phone number
        #[arg(long, value_name = "PHONE")]
        contact: Option<String>,

        #[command(flatten)]
        network: NetworkArgs,
    },

    /// Show which clips a carousel keeps loaded around the current one
    Carousel {
        /// Number of clips in the carousel
        count: usize,

        /// Index of the featured clip
        #[arg(short, long, default_value_t = 0)]
        current: usize,

        /// Neighbours kept on each side
        #[arg(short, long, default_value_t = 1)]
        radius: usize,
    },

    /// Manage the persisted hint cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum CacheCommands {
    /// Count persisted entries
    Stats,
    /// Remove every persisted entry
    Clear,
}

/// Media family selector.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Image,
    Video,
}

impl From<KindArg> for MediaKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Image => Self::Image,
            KindArg::Video => Self::Video,
        }
    }
}

/// Connectivity hints, as a browser would report them.
#[derive(Args, Clone, Debug, Default)]
pub struct NetworkArgs {
    /// Effective connection type: slow-2g, 2g, 3g or 4g
    #[arg(long = "network", value_name = "TYPE")]
    pub effective_type: Option<String>,

    /// Estimated downlink in megabits per second
    #[arg(long, value_name = "MBPS")]
    pub downlink: Option<f64>,

    /// Estimated round-trip time in milliseconds
    #[arg(long, value_name = "MS")]
    pub rtt: Option<u32>,

    /// Reduced data usage was requested
    #[arg(long)]
    pub save_data: bool,
}

impl NetworkArgs {
    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            effective_type: self
                .effective_type
                .as_deref()
                .map_or(EffectiveType::Unknown, EffectiveType::parse),
            downlink_mbps: self.downlink,
            rtt_ms: self.rtt,
            save_data: self.save_data,
        }
    }
}
