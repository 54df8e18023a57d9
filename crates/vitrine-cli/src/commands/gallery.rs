//! Catalog filtering, image planning and carousel windows

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use vitrine_core::{
    CarouselSlot, Catalog, CatalogFilter, Config, ConnectionInfo, MediaLoader, Priority,
    carousel_window, plan_image_slots,
};

use crate::output::{OutputFormat, print_json};

#[derive(Debug, Serialize)]
struct GalleryEntry {
    id: u32,
    name: String,
    category: String,
    image: String,
    priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inquiry: Option<String>,
}

/// Filter the catalog and print the image load plan. With `base_url`, every
/// planned image is also resolved at its planned priority.
#[allow(clippy::too_many_arguments)]
pub async fn execute(
    config: &Config,
    catalog_path: &Path,
    filter: &CatalogFilter,
    eager: usize,
    base_url: Option<&str>,
    contact: Option<&str>,
    connection: ConnectionInfo,
    format: OutputFormat,
) -> Result<()> {
    let catalog = Catalog::load(catalog_path)
        .with_context(|| format!("Failed to read catalog {}", catalog_path.display()))?;
    let items = catalog.filter(filter);
    let slots = plan_image_slots(&items, eager);

    let resolved: Vec<Option<String>> = match base_url {
        Some(base) => {
            let loader = MediaLoader::connect(config, base, connection)?;
            let images = loader.images();
            futures::future::join_all(
                slots
                    .iter()
                    .map(|slot| images.resolve_or_placeholder(&slot.url, slot.priority)),
            )
            .await
            .into_iter()
            .map(Some)
            .collect()
        },
        None => vec![None; slots.len()],
    };

    let entries = items
        .iter()
        .zip(slots)
        .zip(resolved)
        .map(|((item, slot), resolved)| {
            Ok(GalleryEntry {
                id: item.id,
                name: item.name.clone(),
                category: item.category.clone(),
                image: slot.url,
                priority: slot.priority,
                resolved,
                inquiry: contact.map(|phone| item.inquiry_link(phone)).transpose()?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    match format {
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("{}", "No items match".yellow());
            }
            for entry in &entries {
                let target = entry.resolved.as_deref().unwrap_or(&entry.image);
                println!(
                    "{:>4} {} [{}] p{} {}",
                    entry.id,
                    entry.name.bold(),
                    entry.category,
                    entry.priority,
                    target
                );
            }
        },
    }
    Ok(())
}

/// Print the clips a carousel keeps loaded around `current`.
pub fn carousel(count: usize, current: usize, radius: usize, format: OutputFormat) -> Result<()> {
    let window: Vec<CarouselSlot> = carousel_window(count, current, radius);
    match format {
        OutputFormat::Json => print_json(&window)?,
        OutputFormat::Text => {
            for slot in &window {
                let marker = if slot.position == 0 { "*" } else { " " };
                println!(
                    "{marker} #{:<3} pos {:>+3} p{:<2} preload={:?}",
                    slot.index, slot.position, slot.priority, slot.preload
                );
            }
        },
    }
    Ok(())
}
