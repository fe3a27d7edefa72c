use super::types::{Method, RateSource};
use serde::{Deserialize, Serialize};

pub const BLESSING_SCROLL: &str = "Blessing Scroll";
pub const BLACKSMITH_MANUAL: &str = "Blacksmith Manual";
pub const DRAGON_GOD_SCROLL: &str = "Dragon God Scroll";
pub const WAR_SCROLL: &str = "War Scroll";
pub const MAGIC_STONE: &str = "Magic Stone";

/// Refine levels covered by the scroll system.
pub const SCROLL_LIMIT: usize = 9;

/// Levels +1 to +4 always use the War Scroll in the reference plan.
pub const WAR_SCROLL_MAX_LEVEL: usize = 4;

pub const BLACKSMITH_MANUAL_RATES: [f64; 9] =
    [100.0, 100.0, 90.0, 80.0, 70.0, 60.0, 50.0, 30.0, 20.0];

pub const DRAGON_GOD_SCROLL_RATES: [f64; 9] =
    [100.0, 75.0, 65.0, 55.0, 45.0, 40.0, 35.0, 25.0, 20.0];

pub const WAR_SCROLL_RATES: [f64; 4] = [100.0, 100.0, 100.0, 100.0];

/// Ordered list of methods. Order matters: the optimizer enumerates choices
/// in catalog order, which decides ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCatalog {
    pub methods: Vec<Method>,
}

impl Default for MethodCatalog {
    fn default() -> Self {
        Self::reference()
    }
}

impl MethodCatalog {
    pub fn new(methods: Vec<Method>) -> Self {
        Self { methods }
    }

    /// The five refine items of the reference game, in display order.
    pub fn reference() -> Self {
        Self::new(vec![
            Method::new(BLESSING_SCROLL, RateSource::Item),
            Method::new(
                BLACKSMITH_MANUAL,
                RateSource::Fixed(BLACKSMITH_MANUAL_RATES.to_vec()),
            ),
            Method::new(
                DRAGON_GOD_SCROLL,
                RateSource::Fixed(DRAGON_GOD_SCROLL_RATES.to_vec()),
            ),
            Method::new(WAR_SCROLL, RateSource::Fixed(WAR_SCROLL_RATES.to_vec()))
                .up_to_level(WAR_SCROLL_MAX_LEVEL),
            Method::new(MAGIC_STONE, RateSource::Item).downgrade_exempt(true),
        ])
    }

    pub fn get(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Methods usable for `level` (1-based), in catalog order.
    pub fn eligible_for(&self, level: usize) -> Vec<Method> {
        self.methods
            .iter()
            .filter(|m| m.is_eligible(level))
            .cloned()
            .collect()
    }

    /// Catalog without the named methods, order preserved.
    pub fn without(&self, names: &[&str]) -> Self {
        Self::new(
            self.methods
                .iter()
                .filter(|m| !names.contains(&m.name.as_str()))
                .cloned()
                .collect(),
        )
    }
}
