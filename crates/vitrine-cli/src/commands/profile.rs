//! Show the scheduling profile for a set of connectivity hints

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use vitrine_core::{Config, ConnectionInfo, ConnectionProfile};

use crate::output::{OutputFormat, print_json};

#[derive(Debug, Serialize)]
struct ProfileReport {
    connection: ConnectionInfo,
    #[serde(flatten)]
    profile: ConnectionProfile,
    should_preload: bool,
    is_slow: bool,
}

pub fn execute(config: &Config, connection: ConnectionInfo, format: OutputFormat) -> Result<()> {
    let profile = ConnectionProfile::derive(&connection, &config.network);
    let report = ProfileReport {
        connection,
        profile,
        should_preload: profile.should_preload(),
        is_slow: profile.is_slow(),
    };

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            println!("Tier: {}", profile.tier.to_string().bold());
            println!("Image concurrency: {}", profile.max_concurrency);
            println!("Video concurrency: {}", profile.video_concurrency);
            println!("Preload distance: {}px", profile.preload_distance_px);
            println!("Prefetch: {}", if report.should_preload { "yes" } else { "no" });
        },
    }
    Ok(())
}
