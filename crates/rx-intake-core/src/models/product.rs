//! Catalog product models.

use serde::{Deserialize, Serialize};

/// A catalog product the order-gate and medication links refer to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Stock keeping unit - unique identifier.
    pub sku: String,
    /// Display name, e.g. "Amoxicillin 250mg Capsules".
    pub name: String,
    /// Alternative names/brand spellings for fuzzy matching.
    pub aliases: Vec<String>,
    /// Legally requires an approved prescription to ship.
    pub prescription_required: bool,
    /// Whether the product is currently sellable.
    pub active: bool,
}

impl Product {
    pub fn new(sku: String, name: String) -> Self {
        Self {
            sku,
            name,
            aliases: Vec::new(),
            prescription_required: false,
            active: true,
        }
    }

    pub fn requiring_prescription(mut self) -> Self {
        self.prescription_required = true;
        self
    }
}
