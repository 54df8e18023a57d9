//! Show the fallback candidates for a nominal path

use anyhow::Result;
use serde::Serialize;
use vitrine_core::{CandidateResolver, Config, MediaKind, display_name};

use crate::output::{OutputFormat, print_json};

#[derive(Debug, Serialize)]
struct CandidateList<'a> {
    path: &'a str,
    name: &'a str,
    kind: MediaKind,
    candidates: Vec<String>,
}

pub fn execute(config: &Config, path: &str, kind: MediaKind, format: OutputFormat) -> Result<()> {
    let resolver = CandidateResolver::new(kind, &config.media, config.formats);
    let list = CandidateList {
        path,
        name: display_name(path),
        kind,
        candidates: resolver.candidates(path),
    };

    match format {
        OutputFormat::Json => print_json(&list)?,
        OutputFormat::Text => {
            for (i, candidate) in list.candidates.iter().enumerate() {
                println!("{:>3}. {candidate}", i + 1);
            }
        },
    }
    Ok(())
}
