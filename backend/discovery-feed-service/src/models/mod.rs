use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Catalog entry eligible for recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub category: String,
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "image")]
    pub image_ref: String,
}

impl Item {
    pub fn new<I, T>(id: impl Into<String>, name: impl Into<String>, price: f64, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            category: String::new(),
            tags: tags.into_iter().map(Into::into).collect(),
            description: String::new(),
            image_ref: String::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = image_ref.into();
        self
    }

    /// Reason this item cannot enter a catalog, if any
    pub fn validation_error(&self) -> Option<&'static str> {
        if self.id.trim().is_empty() {
            return Some("empty id");
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Some("price must be a non-negative number");
        }
        if self.tags.is_empty() {
            return Some("item has no tags");
        }
        None
    }

    /// Display price, e.g. `$85.00`
    pub fn display_price(&self) -> String {
        format!("${:.2}", self.price)
    }
}

/// Binary swipe decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    #[serde(rename = "like", alias = "accept")]
    Accept,
    #[serde(rename = "dislike", alias = "reject")]
    Reject,
}

impl Decision {
    /// Name used by the interaction store
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Accept => "like",
            Decision::Reject => "dislike",
        }
    }

    pub fn is_accept(&self) -> bool {
        matches!(self, Decision::Accept)
    }
}

/// Horizontal swipe direction (right = accept)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Left,
    Right,
}

impl SwipeDirection {
    pub fn decision(&self) -> Decision {
        match self {
            SwipeDirection::Right => Decision::Accept,
            SwipeDirection::Left => Decision::Reject,
        }
    }

    /// Direction of a signed drag offset; `None` for zero
    pub fn from_offset(offset: f64) -> Option<Self> {
        if offset > 0.0 {
            Some(SwipeDirection::Right)
        } else if offset < 0.0 {
            Some(SwipeDirection::Left)
        } else {
            None
        }
    }

    pub fn sign(&self) -> f64 {
        match self {
            SwipeDirection::Right => 1.0,
            SwipeDirection::Left => -1.0,
        }
    }
}

/// One recorded decision. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(alias = "productId")]
    pub item_id: String,
    #[serde(rename = "type")]
    pub decision: Decision,
    #[serde(alias = "timestamp")]
    pub observed_at: DateTime<Utc>,
}

/// Item annotated for a single ranking pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredItem {
    pub item: Item,
    pub score: f64,
    /// Display affordance only, in `[0, 99]`
    pub match_percent: u8,
}

impl ScoredItem {
    pub fn id(&self) -> &str {
        &self.item.id
    }
}
