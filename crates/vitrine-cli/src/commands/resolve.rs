//! Resolve nominal media paths against a live origin.

use anyhow::{Result, bail};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use vitrine_core::{
    Config, ConnectionInfo, LoadQueue, MediaKind, MediaLoader, MetricSummary, NetworkTier,
    Priority, QueueStats, ResolutionStatus,
};

use crate::output::{OutputFormat, print_json};

#[derive(Debug, Serialize)]
struct ResolvedAsset {
    requested: String,
    /// `None` only for videos with no working candidate.
    url: Option<String>,
    status: Option<ResolutionStatus>,
}

#[derive(Debug, Serialize)]
struct ResolveReport {
    kind: MediaKind,
    tier: NetworkTier,
    assets: Vec<ResolvedAsset>,
    queue: QueueStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<BTreeMap<String, MetricSummary>>,
}

/// Resolve every path concurrently through the queue for `kind`.
///
/// Images that cannot be found come back as the placeholder; videos that
/// cannot be found make the command fail after the report is printed.
#[allow(clippy::too_many_arguments)]
pub async fn execute(
    config: &Config,
    base_url: &str,
    urls: &[String],
    kind: MediaKind,
    priority: Priority,
    connection: ConnectionInfo,
    report: bool,
    format: OutputFormat,
) -> Result<()> {
    let loader = MediaLoader::connect(config, base_url, connection)?;
    let queue = loader.queue(kind);

    let assets =
        futures::future::join_all(urls.iter().map(|url| resolve_one(queue, url, priority))).await;

    let failures = assets.iter().filter(|a| a.url.is_none()).count();
    let result = ResolveReport {
        kind,
        tier: loader.network().current_profile().tier,
        assets,
        queue: queue.stats(),
        metrics: report.then(|| loader.monitor().summary()),
    };

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Text => print_text(&result),
    }

    if failures > 0 {
        bail!("{failures} of {} {} asset(s) could not be resolved", urls.len(), kind.as_str());
    }
    Ok(())
}

async fn resolve_one(queue: &LoadQueue, url: &str, priority: Priority) -> ResolvedAsset {
    let resolved = match queue.kind() {
        MediaKind::Image => Some(queue.resolve_or_placeholder(url, priority).await),
        MediaKind::Video => queue.resolve(url, priority).await.ok(),
    };
    ResolvedAsset {
        requested: url.to_string(),
        url: resolved,
        status: queue.status(url),
    }
}

fn print_text(report: &ResolveReport) {
    for asset in &report.assets {
        match (&asset.url, asset.status) {
            (Some(url), Some(ResolutionStatus::Resolved)) if *url == asset.requested => {
                println!("{} {}", "✓".green(), asset.requested);
            },
            (Some(url), Some(ResolutionStatus::Resolved)) => {
                println!("{} {} -> {}", "✓".green(), asset.requested, url.cyan());
            },
            (Some(url), _) => {
                println!("{} {} -> {} (placeholder)", "!".yellow(), asset.requested, url);
            },
            (None, _) => println!("{} {}", "✗".red(), asset.requested),
        }
    }

    println!(
        "\n{} tier, peak {} of {} concurrent",
        report.tier, report.queue.peak_active, report.queue.max_concurrent
    );

    if let Some(metrics) = &report.metrics {
        for (name, s) in metrics {
            println!(
                "  {name}: {} sample(s), avg {:.1} ms, min {:.1}, max {:.1}",
                s.count, s.avg, s.min, s.max
            );
        }
    }
}
