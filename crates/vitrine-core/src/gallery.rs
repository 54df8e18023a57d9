//! Gallery catalog, filtering, and load planning.
//!
//! The gallery is a consumer of the queues: it decides which assets to ask
//! for and at what priority, and filters what the visitor sees.

use crate::types::{PreloadHint, Priority, DEFAULT_PRIORITY};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;

/// Category key that matches every item.
pub const ALL_CATEGORIES: &str = "todas";

/// Priority given to items rendered above the fold.
pub const EAGER_PRIORITY: Priority = 10;

/// One garment in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Stable identifier.
    pub id: u32,
    /// Display name.
    #[serde(alias = "nome")]
    pub name: String,
    /// Category key, such as `vestidos`.
    #[serde(alias = "categoria")]
    pub category: String,
    /// Formatted price, shown verbatim.
    #[serde(alias = "preco")]
    pub price: String,
    /// Nominal image path.
    #[serde(alias = "imagem")]
    pub image: String,
    /// Short description.
    #[serde(alias = "descricao")]
    pub description: String,
    /// Available sizes.
    #[serde(default, alias = "tamanhos")]
    pub sizes: Vec<String>,
    /// Available colors.
    #[serde(default, alias = "cores")]
    pub colors: Vec<String>,
}

impl CatalogItem {
    /// Chat deep link asking about this item, sent to `phone` (digits with
    /// country code, as `wa.me` expects).
    pub fn inquiry_link(&self, phone: &str) -> Result<String> {
        let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(Error::InvalidUrl(format!("no digits in phone number '{phone}'")));
        }
        let mut link = Url::parse(&format!("https://wa.me/{digits}"))
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let message = format!(
            "Olá! Gostaria de mais informações sobre a peça:\n\n{}\nPreço: {}\n\nPoderia me enviar mais detalhes?",
            self.name, self.price
        );
        link.query_pairs_mut().append_pair("text", &message);
        Ok(link.into())
    }
}

/// Ordered list of catalog items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    /// Wrap an item list.
    #[must_use]
    pub const fn new(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }

    /// Parse a JSON array of items.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON catalog file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Items in catalog order.
    #[must_use]
    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    /// Distinct category keys in first-seen order.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for item in &self.items {
            if !seen.contains(&item.category.as_str()) {
                seen.push(&item.category);
            }
        }
        seen
    }

    /// Items accepted by `filter`, in catalog order.
    #[must_use]
    pub fn filter(&self, filter: &CatalogFilter) -> Vec<&CatalogItem> {
        self.items.iter().filter(|item| filter.matches(item)).collect()
    }
}

/// Visitor-selected category plus free-text search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogFilter {
    category: String,
    search: String,
}

impl Default for CatalogFilter {
    fn default() -> Self {
        Self::new(ALL_CATEGORIES, "")
    }
}

impl CatalogFilter {
    /// Filter on `category` (or [`ALL_CATEGORIES`]) and `search`.
    #[must_use]
    pub fn new(category: &str, search: &str) -> Self {
        Self {
            category: category.to_string(),
            search: search.to_lowercase(),
        }
    }

    /// Category matches and the search text occurs in the name or description,
    /// ignoring case. An empty search matches everything.
    #[must_use]
    pub fn matches(&self, item: &CatalogItem) -> bool {
        let category_ok = self.category == ALL_CATEGORIES || item.category == self.category;
        category_ok
            && (item.name.to_lowercase().contains(&self.search)
                || item.description.to_lowercase().contains(&self.search))
    }
}

/// One gallery image to request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSlot {
    /// Catalog item the image belongs to.
    pub id: u32,
    /// Nominal image path.
    pub url: String,
    /// Queue priority.
    pub priority: Priority,
}

/// Plan image requests: the first `eager` items are loaded up front.
#[must_use]
pub fn plan_image_slots(items: &[&CatalogItem], eager: usize) -> Vec<ImageSlot> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| ImageSlot {
            id: item.id,
            url: item.image.clone(),
            priority: if i < eager {
                EAGER_PRIORITY
            } else {
                DEFAULT_PRIORITY
            },
        })
        .collect()
}

/// One video shown by the carousel around the current clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CarouselSlot {
    /// Index into the video list.
    pub index: usize,
    /// Offset from the current clip; 0 is the featured one.
    pub position: i32,
    /// Queue priority.
    pub priority: Priority,
    /// Buffering hint for the video element.
    pub preload: PreloadHint,
}

/// Clips within `radius` of `current`, wrapping around the list.
///
/// The featured clip gets priority 10; neighbours get `8 - distance`, never
/// below 3.
#[must_use]
pub fn carousel_window(len: usize, current: usize, radius: usize) -> Vec<CarouselSlot> {
    if len == 0 {
        return Vec::new();
    }
    let current = current % len;
    // Capped so no clip appears twice.
    let radius = radius.min((len - 1) / 2);
    let radius = i64::try_from(radius).unwrap_or(0);
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let current_i = i64::try_from(current).unwrap_or(0);

    (-radius..=radius)
        .filter_map(|offset| {
            let index = usize::try_from((current_i + offset).rem_euclid(len_i)).ok()?;
            let position = i32::try_from(offset).ok()?;
            let priority = if position == 0 {
                EAGER_PRIORITY
            } else {
                (8 - position.abs()).max(3)
            };
            Some(CarouselSlot {
                index,
                position,
                priority,
                preload: PreloadHint::for_priority(priority),
            })
        })
        .collect()
}
