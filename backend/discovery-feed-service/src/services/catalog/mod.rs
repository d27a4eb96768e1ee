// ============================================
// Catalog (商品目錄)
// ============================================
//
// Holds the current item snapshot with an id index. Snapshots pushed by the
// catalog provider are validated item by item; an empty or failed snapshot
// falls back to the built-in seed catalog.

use crate::models::Item;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed catalog snapshot: {0}")]
    Malformed(String),
}

/// Where the active catalog came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSource {
    Provider,
    Seed,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<Item>,
    index: HashMap<String, usize>,
    source: CatalogSource,
}

impl Catalog {
    /// Build from raw items, dropping invalid ones and later duplicates of an id
    pub fn new(items: Vec<Item>) -> Self {
        Self::with_source(items, CatalogSource::Provider)
    }

    /// The built-in seed catalog
    pub fn seed() -> Self {
        Self::with_source(seed_items(), CatalogSource::Seed)
    }

    /// Resolve a provider snapshot, falling back to the seed catalog
    pub fn from_snapshot(snapshot: Result<Vec<Item>, CatalogError>) -> Self {
        match snapshot {
            Ok(items) => {
                let catalog = Self::new(items);
                if catalog.is_empty() {
                    info!("Catalog snapshot empty, using seed catalog");
                    Self::seed()
                } else {
                    catalog
                }
            }
            Err(err) => {
                warn!(error = %err, "Catalog fetch failed, using seed catalog");
                Self::seed()
            }
        }
    }

    fn with_source(raw: Vec<Item>, source: CatalogSource) -> Self {
        let mut items = Vec::with_capacity(raw.len());
        let mut index = HashMap::with_capacity(raw.len());

        for item in raw {
            if let Some(reason) = item.validation_error() {
                warn!(item_id = %item.id, reason, "Dropping invalid catalog item");
                continue;
            }
            if index.contains_key(&item.id) {
                warn!(item_id = %item.id, "Dropping duplicate catalog item");
                continue;
            }
            index.insert(item.id.clone(), items.len());
            items.push(item);
        }

        Self {
            items,
            index,
            source,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.index.get(id).map(|&i| &self.items[i])
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn source(&self) -> CatalogSource {
        self.source
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::seed()
    }
}

pub mod tags {
    pub const CASUAL: &str = "Casual";
    pub const FORMAL: &str = "Formal";
    pub const SUMMER: &str = "Summer";
    pub const WINTER: &str = "Winter";
    pub const STREETWEAR: &str = "Streetwear";
    pub const VINTAGE: &str = "Vintage";
    pub const MINIMALIST: &str = "Minimalist";
    pub const BOLD: &str = "Bold";
    pub const ACCESSORY: &str = "Accessory";
}

fn seed_items() -> Vec<Item> {
    use tags::*;

    const IMAGE_BASE: &str = "https://images.unsplash.com";

    let seed = [
        (
            "1",
            "Sunset Maxi Dress",
            85.0,
            "Maxi",
            "photo-1572804013309-59a88b7e92f1",
            [SUMMER, CASUAL, BOLD],
            "Flowing silhouette perfect for beach evenings.",
        ),
        (
            "2",
            "Velvet Evening Gown",
            180.0,
            "Evening",
            "photo-1566174053879-31528523f8ae",
            [WINTER, FORMAL, BOLD],
            "Luxurious velvet for elegant winter nights.",
        ),
        (
            "3",
            "Chic Linen Wrap",
            95.0,
            "Casual",
            "photo-1591047139829-d91aecb6caea",
            [SUMMER, MINIMALIST, CASUAL],
            "Breathable linen for effortless style.",
        ),
        (
            "4",
            "Boho Floral Midi",
            75.0,
            "Boho",
            "photo-1612336307429-8a898d10e223",
            [VINTAGE, CASUAL, SUMMER],
            "Vintage floral patterns with modern comfort.",
        ),
        (
            "5",
            "Silk Slip Dress",
            110.0,
            "Evening",
            "photo-1596870230751-ebdfce98ec42",
            [FORMAL, MINIMALIST, SUMMER],
            "Effortless luxury for special nights.",
        ),
        (
            "6",
            "Knit Sweater Dress",
            85.0,
            "Casual",
            "photo-1624421343487-0c674847a02a",
            [WINTER, CASUAL, MINIMALIST],
            "Cozy knit fabric, perfect for layering.",
        ),
        (
            "7",
            "Sequin Party Mini",
            120.0,
            "Mini",
            "photo-1515372039744-b8f02a3ae446",
            [BOLD, STREETWEAR, FORMAL],
            "Sparkle all night in this statement piece.",
        ),
        (
            "8",
            "Embroidered Tunic",
            65.0,
            "Boho",
            "photo-1551163943-3f6a855d1153",
            [VINTAGE, BOLD, CASUAL],
            "Intricate details for a unique look.",
        ),
        (
            "9",
            "Little Black Dress",
            150.0,
            "Mini",
            "photo-1539008835657-9e8e9680c956",
            [MINIMALIST, FORMAL, BOLD],
            "The timeless classic every wardrobe needs.",
        ),
        (
            "10",
            "Cottagecore Midi",
            90.0,
            "Midi",
            "photo-1585487000160-6ebcfceb0d03",
            [SUMMER, VINTAGE, CASUAL],
            "Dreamy silhouette with puff sleeves.",
        ),
    ];

    seed.into_iter()
        .map(|(id, name, price, category, photo, tags, description)| {
            Item::new(id, name, price, tags)
                .with_category(category)
                .with_description(description)
                .with_image(format!("{}/{}?auto=format&fit=crop&w=800&q=80", IMAGE_BASE, photo))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_catalog_is_valid() {
        let catalog = Catalog::seed();
        assert_eq!(catalog.len(), 10);
        assert_eq!(catalog.source(), CatalogSource::Seed);
        assert!(catalog.items().iter().all(|i| i.validation_error().is_none()));
        assert_eq!(catalog.get("2").map(|i| i.name.as_str()), Some("Velvet Evening Gown"));
    }

    #[test]
    fn test_empty_snapshot_uses_seed() {
        let catalog = Catalog::from_snapshot(Ok(vec![]));
        assert_eq!(catalog.source(), CatalogSource::Seed);
        assert_eq!(catalog.len(), 10);
    }

    #[test]
    fn test_failed_snapshot_uses_seed() {
        let catalog =
            Catalog::from_snapshot(Err(CatalogError::Unavailable("permission denied".into())));
        assert_eq!(catalog.source(), CatalogSource::Seed);
        assert!(!catalog.is_empty());
    }

    #[test]
    fn test_invalid_and_duplicate_items_dropped() {
        let catalog = Catalog::from_snapshot(Ok(vec![
            Item::new("a", "A", 10.0, ["X"]),
            Item::new("b", "B", -5.0, ["Y"]),
            Item::new("c", "C", 10.0, Vec::<String>::new()),
            Item::new("a", "A again", 12.0, ["Z"]),
        ]));

        assert_eq!(catalog.source(), CatalogSource::Provider);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("a").map(|i| i.name.as_str()), Some("A"));
        assert!(catalog.get("b").is_none());
    }

    #[test]
    fn test_snapshot_with_only_invalid_items_uses_seed() {
        let catalog = Catalog::from_snapshot(Ok(vec![Item::new("", "nameless", 1.0, ["X"])]));
        assert_eq!(catalog.source(), CatalogSource::Seed);
    }
}
