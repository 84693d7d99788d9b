//! Work-items: one product record pushed through every target.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};

use crate::target::Target;

/// A single attribute value as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Flag(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl AttributeValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            AttributeValue::Text(s) => s.trim().is_empty(),
            AttributeValue::List(items) => items.iter().all(|s| s.trim().is_empty()),
            _ => false,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Flag(b) => write!(f, "{b}"),
            AttributeValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            AttributeValue::Number(n) => write!(f, "{n}"),
            AttributeValue::Text(s) => f.write_str(s),
            AttributeValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

/// One size (or other axis) of a multi-variant item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<u32>,
}

impl Variant {
    /// Derived child key: `<parent>-<size without dots and spaces>`.
    pub fn key_for(&self, parent: &str) -> String {
        let suffix: String = self
            .size
            .chars()
            .filter(|c| *c != '.' && !c.is_whitespace())
            .collect();
        format!("{parent}-{suffix}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub key: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Media bundle identifier; defaults to the item key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<Variant>,
    /// Key of the multi-variant item this one was derived from.
    #[serde(skip)]
    pub parent: Option<String>,
}

impl WorkItem {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            attributes: BTreeMap::new(),
            media: None,
            variants: Vec::new(),
            parent: None,
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn with_variants(mut self, sizes: &[&str]) -> Self {
        self.variants = sizes
            .iter()
            .map(|size| Variant {
                size: size.to_string(),
                inventory: None,
            })
            .collect();
        self
    }

    /// Loads a work-item from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read work-item {}", path.display()))?;
        let item: WorkItem = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse work-item {}", path.display()))?;
        Ok(item)
    }

    pub fn media_bundle(&self) -> &str {
        self.media.as_deref().unwrap_or(&self.key)
    }

    /// The bundle archived with this item. Variants share their parent's
    /// bundle, which is archived with the parent instead.
    pub fn owned_media(&self) -> Option<&str> {
        match self.parent {
            Some(_) => None,
            None => Some(self.media_bundle()),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Text form of an attribute, including the item key (`key`) and the
    /// derived `year` and `season` attributes when not supplied.
    pub fn value_of(&self, name: &str) -> Option<String> {
        if name == "key" {
            return Some(self.key.clone());
        }
        if let Some(value) = self.attributes.get(name) {
            return Some(value.to_string());
        }
        let today = Local::now().date_naive();
        match name {
            "year" => Some(today.year().to_string()),
            "season" => Some(season_for_month(today.month()).to_string()),
            _ => None,
        }
    }

    pub fn is_multi_variant(&self) -> bool {
        !self.variants.is_empty()
    }

    /// One child item per declared variant, or the item itself.
    pub fn variant_items(&self) -> Vec<WorkItem> {
        if self.variants.is_empty() {
            return vec![self.clone()];
        }
        self.variants
            .iter()
            .map(|variant| {
                let mut child = self.clone();
                child.key = variant.key_for(&self.key);
                child.media = Some(self.media_bundle().to_string());
                child.variants.clear();
                child.parent = Some(self.key.clone());
                child
                    .attributes
                    .insert("size".into(), AttributeValue::Text(variant.size.clone()));
                if let Some(inventory) = variant.inventory {
                    child
                        .attributes
                        .insert("inventory".into(), AttributeValue::Number(inventory as f64));
                }
                child
            })
            .collect()
    }

    /// Problems that make this item unsuitable for `target`. Empty means valid.
    pub fn validate_for(&self, target: Target) -> Vec<String> {
        let mut problems = Vec::new();

        if self.key.trim().is_empty() {
            problems.push("item key is required".to_string());
        }
        for price in ["mrp", "selling_price"] {
            if let Some(value) = self.attribute(price) {
                match value.as_number() {
                    Some(n) if n > 0.0 => {}
                    _ => problems.push(format!("{price} must be greater than 0")),
                }
            }
        }

        let required: &[&str] = match target {
            Target::Flipkart => {
                if let Some(hsn) = self.value_of("hsn_code") {
                    let digits = hsn.trim();
                    if !digits.chars().all(|c| c.is_ascii_digit())
                        || ![4, 6, 8].contains(&digits.len())
                    {
                        problems.push("hsn_code must be 4, 6, or 8 digits".to_string());
                    }
                }
                &[]
            }
            Target::Myntra => &["material", "color", "article_type"],
            Target::Meesho => &["category"],
        };
        for name in required {
            match self.attribute(name) {
                Some(value) if !value.is_blank() => {}
                _ => problems.push(format!("{name} is required for {target}")),
            }
        }

        problems
    }
}

fn season_for_month(month: u32) -> &'static str {
    match month {
        3..=5 => "Spring",
        6..=8 => "Summer",
        9..=11 => "Fall",
        _ => "Winter",
    }
}

/// The sample necklace used by `demo` and the tests.
pub fn sample_necklace() -> WorkItem {
    WorkItem::new("NKL1234")
        .with_attribute("product_name", "Elegant Gold-Plated Statement Necklace")
        .with_attribute("brand", "ABC Jewels")
        .with_attribute(
            "description",
            "Traditional gold-plated necklace with intricate detailing",
        )
        .with_attribute("mrp", 1499.0)
        .with_attribute("selling_price", 799.0)
        .with_attribute("meesho_price", 749.0)
        .with_attribute("material", "Brass")
        .with_attribute("color", "Gold")
        .with_attribute("plating", "Gold Plated")
        .with_attribute("stone_type", "None")
        .with_attribute("size", "16 inches")
        .with_attribute("type", "Necklace")
        .with_attribute("gender", "Women")
        .with_attribute("article_type", "Necklace and Chains")
        .with_attribute("category", "Necklaces & Chains")
        .with_attribute("hsn_code", "71171900")
        .with_attribute("gst", 3.0)
        .with_attribute("inventory", 20.0)
        .with_attribute("net_quantity", 1.0)
        .with_attribute("net_weight", 25.0)
        .with_attribute("occasion", "Wedding")
        .with_attribute("keywords", "gold, necklace, festive, traditional")
        .with_attribute("manufacturer", "ABC Jewels, Siliguri")
        .with_attribute("packer", "ABC Jewels, Siliguri")
}
