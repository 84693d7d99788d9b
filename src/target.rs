//! The closed set of destinations and the stage catalog each one declares.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::state_machine::stage::{ExpandStrategy, FieldSpec, StageDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Meesho,
    Flipkart,
    Myntra,
}

impl Target {
    pub const ALL: [Target; 3] = [Target::Meesho, Target::Flipkart, Target::Myntra];

    pub fn name(&self) -> &'static str {
        match self {
            Target::Meesho => "meesho",
            Target::Flipkart => "flipkart",
            Target::Myntra => "myntra",
        }
    }

    /// Ordered stage catalog for this target.
    pub fn stages(&self) -> Vec<StageDefinition> {
        match self {
            Target::Meesho => meesho_stages(),
            Target::Flipkart => flipkart_stages(),
            Target::Myntra => myntra_stages(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "meesho" => Ok(Target::Meesho),
            "flipkart" => Ok(Target::Flipkart),
            "myntra" => Ok(Target::Myntra),
            other => Err(format!("unknown target: {other}")),
        }
    }
}

fn meesho_stages() -> Vec<StageDefinition> {
    vec![
        StageDefinition::new("Select Category")
            .field(FieldSpec::options("category", "{category}"))
            .ready_marker("category"),
        StageDefinition::new("Product Images")
            .field(FieldSpec::media("product_images"))
            .ready_marker("product_images"),
        StageDefinition::new("Product Details")
            .field(FieldSpec::options("gst", "{gst}"))
            .field(FieldSpec::literal("hsn_code", "{hsn_code}"))
            .field(FieldSpec::literal("net_weight", "{net_weight}"))
            .field(FieldSpec::literal("sku_id", "{key}"))
            .field(FieldSpec::literal("product_name", "{product_name}"))
            .field(FieldSpec::options_or("size", "Free Size", "Free Size"))
            .field(FieldSpec::literal("meesho_price", "{meesho_price}"))
            .field(FieldSpec::literal("mrp", "{mrp}"))
            .field(FieldSpec::literal("inventory", "{inventory}"))
            .field(FieldSpec::options("base_metal", "{material}"))
            .field(FieldSpec::options("color", "{color}"))
            .field(FieldSpec::options_or("generic_name", "Necklaces", "Necklaces"))
            .field(FieldSpec::options_or("multipack", "{net_quantity}", "1"))
            .field(FieldSpec::options("occasion", "{occasion}"))
            .field(FieldSpec::options("plating", "{plating}"))
            .field(FieldSpec::options_or("dimension_unit", "cm", "cm"))
            .ready_marker("gst")
            .ready_marker("sku_id"),
        StageDefinition::new("Submit Catalog")
            .ready_marker("submit_catalog")
            .strategies(&[ExpandStrategy::CardClick, ExpandStrategy::AnyControl]),
    ]
}

fn flipkart_stages() -> Vec<StageDefinition> {
    vec![
        StageDefinition::new("Product Photos")
            .field(FieldSpec::media("product_photos"))
            .ready_marker("thumbnail_0"),
        StageDefinition::new("Price, Stock and Shipping Information")
            .field(FieldSpec::literal("sku_id", "{key}"))
            .field(FieldSpec::options("listing_status", "ACTIVE"))
            .field(FieldSpec::literal("mrp", "{mrp}"))
            .field(FieldSpec::literal("flipkart_selling_price", "{selling_price}"))
            .field(FieldSpec::options("minimum_order_quantity", "1"))
            .field(FieldSpec::options("service_profile", "NON_FBF"))
            .field(FieldSpec::options("procurement_type", "REGULAR"))
            .field(FieldSpec::literal("shipping_days", "2"))
            .field(FieldSpec::literal("stock_size", "{inventory}"))
            .field(FieldSpec::options("shipping_provider", "FLIPKART"))
            .field(FieldSpec::literal("length", "5"))
            .field(FieldSpec::literal("breadth", "5"))
            .field(FieldSpec::literal("height", "5"))
            .field(FieldSpec::literal("weight", "0.1"))
            .field(FieldSpec::literal("hsn", "{hsn_code}"))
            .field(FieldSpec::options("tax_code", "GST_{gst}"))
            .field(FieldSpec::options("country_of_origin", "IN"))
            .field(FieldSpec::literal("manufacturer_details", "{manufacturer}"))
            .field(FieldSpec::literal("packer_details", "{packer}"))
            .ready_marker("sku_id")
            .ready_marker("mrp"),
        StageDefinition::new("Product Description")
            .field(FieldSpec::literal("model_number", "{key}"))
            .field(FieldSpec::options("base_material", "{material}"))
            .field(FieldSpec::options("type", "{type}"))
            .field(FieldSpec::options("color", "{color}"))
            .field(FieldSpec::options_or("gemstone", "{stone_type}", "NA"))
            .field(FieldSpec::options("ideal_for", "{gender}"))
            .field(FieldSpec::literal("certification", "NA"))
            .field(FieldSpec::literal("pack_of", "{net_quantity}"))
            .field(FieldSpec::options_or("plating", "{plating}", "Gold-plated"))
            .field(FieldSpec::literal("silver_weight", "0"))
            .ready_marker("model_number"),
        StageDefinition::new("Additional Description (Optional)")
            .field(FieldSpec::options("necklace_type", "{type}"))
            .field(FieldSpec::options("necklace_length", "{size}"))
            .field(FieldSpec::literal("description", "{description}"))
            .field(FieldSpec::literal("keywords", "{keywords}"))
            .ready_marker("description")
            .strategies(&[
                ExpandStrategy::EditControl,
                ExpandStrategy::CardClick,
                ExpandStrategy::AnyControl,
            ]),
        StageDefinition::new("Send to QC")
            .ready_marker("send_to_qc")
            .strategies(&[ExpandStrategy::CardClick]),
    ]
}

/// Myntra takes a spreadsheet; field ids are its column headers.
fn myntra_stages() -> Vec<StageDefinition> {
    vec![
        StageDefinition::new("Style Details")
            .field(FieldSpec::literal("Style ID", "{key}"))
            .field(FieldSpec::literal("Product Name", "{product_name}"))
            .field(FieldSpec::literal("Brand Name", "{brand}"))
            .field(FieldSpec::options("Article Type", "{article_type}"))
            .field(FieldSpec::literal("Product Details", "{description}"))
            .field(FieldSpec::literal("MRP", "{mrp}"))
            .field(FieldSpec::literal("Best Price", "{selling_price}"))
            .field(FieldSpec::options("Primary Material", "{material}"))
            .field(FieldSpec::options("Brand Color", "{color}"))
            .field(FieldSpec::options_or("Plating", "{plating}", "NA"))
            .field(FieldSpec::literal("Net Weight", "{net_weight}"))
            .field(FieldSpec::options("Gender", "{gender}"))
            .field(FieldSpec::options_or("Season", "{season}", "All Season"))
            .field(FieldSpec::literal("Year", "{year}"))
            .field(FieldSpec::literal("HSN", "{hsn_code}"))
            .field(FieldSpec::literal("Net Quantity", "{net_quantity}"))
            .field(FieldSpec::literal("Inventory", "{inventory}"))
            .field(FieldSpec::literal("Search Tags", "{keywords}"))
            .field(FieldSpec::options_or("Occasion", "{occasion}", "Casual"))
            .field(FieldSpec::literal("Manufacturer", "{manufacturer}"))
            .ready_marker("Style ID"),
        StageDefinition::new("Upload Catalogue")
            .field(FieldSpec::media("style_images"))
            .ready_marker("style_images")
            .strategies(&[ExpandStrategy::CardClick, ExpandStrategy::AnyControl]),
    ]
}
