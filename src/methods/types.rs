use crate::error::{Result, UpgradeError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a method's success rate comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rates", rename_all = "snake_case")]
pub enum RateSource {
    /// Fixed table indexed by level (+1 first). Levels past the end of the
    /// table use the item's own rate.
    Fixed(Vec<f64>),
    /// The item's own per-level rate.
    Item,
}

/// A named refine strategy that can be assigned to a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub rate_source: RateSource,
    #[serde(default)]
    pub downgrade_exempt: bool,
    /// Highest level the method may be used for, if restricted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_level: Option<usize>,
}

impl Method {
    pub fn new(name: impl Into<String>, rate_source: RateSource) -> Self {
        Self {
            name: name.into(),
            rate_source,
            downgrade_exempt: false,
            max_level: None,
        }
    }

    pub fn downgrade_exempt(mut self, exempt: bool) -> Self {
        self.downgrade_exempt = exempt;
        self
    }

    pub fn up_to_level(mut self, max_level: usize) -> Self {
        self.max_level = Some(max_level);
        self
    }

    /// Whether the method may be used to reach `level` (1-based).
    pub fn is_eligible(&self, level: usize) -> bool {
        self.max_level.map_or(true, |max| level <= max)
    }

    /// Success rate, in percent, for reaching `level` (1-based) on `item`.
    pub fn success_rate(&self, level: usize, item: &ItemProfile) -> Result<f64> {
        match &self.rate_source {
            RateSource::Fixed(table) => match level.checked_sub(1).and_then(|i| table.get(i)) {
                Some(&rate) => Ok(rate),
                None => item.success_rate(level),
            },
            RateSource::Item => item.success_rate(level),
        }
    }
}

/// Quantity of one material consumed by a single attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRequirement {
    #[serde(rename = "qty")]
    pub quantity: u32,
    #[serde(rename = "img_name", default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Per-level refine data of one item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelRecord {
    pub success_rate: f64,
    /// Currency paid per attempt, in raw units.
    #[serde(default)]
    pub yang_cost: f64,
    #[serde(default)]
    pub materials: BTreeMap<String, MaterialRequirement>,
}

impl LevelRecord {
    pub fn new(success_rate: f64) -> Self {
        Self {
            success_rate,
            ..Default::default()
        }
    }

    pub fn with_material(mut self, name: impl Into<String>, quantity: u32) -> Self {
        self.materials.insert(
            name.into(),
            MaterialRequirement {
                quantity,
                icon: None,
            },
        );
        self
    }

    pub fn with_yang_cost(mut self, yang_cost: f64) -> Self {
        self.yang_cost = yang_cost;
        self
    }
}

/// Refine data of one item, keyed by target level as in the exported data
/// (`{"img_name": "...", "1": {...}, "2": {...}}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemProfile {
    #[serde(rename = "img_name", default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(flatten)]
    pub levels: BTreeMap<String, LevelRecord>,
}

impl ItemProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile with the given rates for levels +1, +2, ... and no materials.
    pub fn from_rates(rates: &[f64]) -> Self {
        let mut item = Self::new();
        for (i, &rate) in rates.iter().enumerate() {
            item.set_level(i + 1, LevelRecord::new(rate));
        }
        item
    }

    pub fn with_level(mut self, level: usize, record: LevelRecord) -> Self {
        self.set_level(level, record);
        self
    }

    pub fn set_level(&mut self, level: usize, record: LevelRecord) {
        self.levels.insert(level.to_string(), record);
    }

    pub fn level(&self, level: usize) -> Option<&LevelRecord> {
        self.levels.get(&level.to_string())
    }

    pub fn success_rate(&self, level: usize) -> Result<f64> {
        self.level(level)
            .map(|record| record.success_rate)
            .ok_or(UpgradeError::MissingLevelData { level })
    }

    /// Highest level with data.
    pub fn max_level(&self) -> usize {
        self.levels
            .keys()
            .filter_map(|k| k.parse::<usize>().ok())
            .max()
            .unwrap_or(0)
    }
}
