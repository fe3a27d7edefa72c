//! User-editable unit prices, persisted to ~/.upways/prices.json.

use crate::methods::{LevelRecord, Method};
use crate::persistence::{load_json_or_default, save_json, settings_path};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

pub const PRICES_FILENAME: &str = "prices.json";

/// Prices are quoted in millions; yang costs in the item data are raw units.
pub const YANG_PER_PRICE_UNIT: f64 = 1_000_000.0;

/// Unit prices by method name and material name. Unset prices are 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceBook {
    #[serde(default)]
    pub methods: BTreeMap<String, f64>,
    #[serde(default)]
    pub materials: BTreeMap<String, f64>,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, name: impl Into<String>, price: f64) -> Self {
        self.methods.insert(name.into(), price);
        self
    }

    pub fn with_material(mut self, name: impl Into<String>, price: f64) -> Self {
        self.materials.insert(name.into(), price);
        self
    }

    pub fn method_price(&self, name: &str) -> f64 {
        self.methods.get(name).copied().unwrap_or(0.0)
    }

    pub fn material_price(&self, name: &str) -> f64 {
        self.materials.get(name).copied().unwrap_or(0.0)
    }

    /// Materials plus yang for one attempt at a level, excluding the method.
    pub fn level_cost(&self, record: Option<&LevelRecord>) -> f64 {
        let Some(record) = record else {
            return 0.0;
        };
        let materials: f64 = record
            .materials
            .iter()
            .map(|(name, m)| self.material_price(name) * m.quantity as f64)
            .sum();
        materials + record.yang_cost / YANG_PER_PRICE_UNIT
    }

    /// Cost of one attempt with `method` at a level with `record`.
    pub fn unit_cost(&self, method: &Method, record: Option<&LevelRecord>) -> f64 {
        self.method_price(&method.name) + self.level_cost(record)
    }

    pub fn load_from(path: &Path) -> Self {
        load_json_or_default(path)
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        save_json(path, self)
    }

    /// Load ~/.upways/prices.json, or an empty book.
    pub fn load() -> Self {
        match settings_path(PRICES_FILENAME) {
            Ok(path) => Self::load_from(&path),
            Err(_) => Self::new(),
        }
    }

    pub fn save(&self) -> io::Result<()> {
        self.save_to(&settings_path(PRICES_FILENAME)?)
    }
}
