use crate::cost::{CostBreakdown, PriceBook};
use crate::markov::{ExpectedVisits, Level, SolverConfig};
use crate::methods::{ItemProfile, Method, MethodCatalog};
use serde::Serialize;

/// What may be used to reach one level.
#[derive(Debug, Clone, PartialEq)]
pub enum LevelSlot {
    /// Pre-assigned method.
    Fixed(Method),
    /// Any of these methods; ineligible ones are skipped.
    Free(Vec<Method>),
}

/// Levels +1..+n in order, plus the item and prices they are evaluated with.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationRequest {
    pub slots: Vec<LevelSlot>,
    /// Level the item already sits on; the plan refines it from here to +n.
    pub start_level: usize,
    pub item: ItemProfile,
    pub prices: PriceBook,
}

impl OptimizationRequest {
    pub fn new(item: ItemProfile, prices: PriceBook) -> Self {
        Self {
            slots: Vec::new(),
            start_level: 0,
            item,
            prices,
        }
    }

    /// Refine an item that is already on `level`.
    pub fn starting_at(mut self, level: usize) -> Self {
        self.start_level = level;
        self
    }

    /// Stop the plan at `target`, dropping the slots above it.
    pub fn up_to(mut self, target: usize) -> Self {
        self.slots.truncate(target);
        self
    }

    /// Append the next level with a pre-assigned method.
    pub fn fixed(mut self, method: Method) -> Self {
        self.slots.push(LevelSlot::Fixed(method));
        self
    }

    /// Append the next level with a set of candidate methods.
    pub fn free(mut self, methods: Vec<Method>) -> Self {
        self.slots.push(LevelSlot::Free(methods));
        self
    }

    /// Levels +1..+depth all free over the whole catalog.
    pub fn all_free(
        catalog: &MethodCatalog,
        depth: usize,
        item: ItemProfile,
        prices: PriceBook,
    ) -> Self {
        (0..depth).fold(Self::new(item, prices), |req, _| {
            req.free(catalog.methods.clone())
        })
    }

    pub fn depth(&self) -> usize {
        self.slots.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerConfig {
    /// Evaluate candidates on the rayon pool.
    pub parallel: bool,
    pub solver: SolverConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            solver: SolverConfig::default(),
        }
    }
}

impl OptimizerConfig {
    pub fn parallel() -> Self {
        Self {
            parallel: true,
            ..Default::default()
        }
    }
}

/// One full method assignment with its derived figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// Canonical enumeration index; breaks cost ties.
    pub index: usize,
    pub start_level: usize,
    pub methods: Vec<String>,
    pub levels: Vec<Level>,
    pub unit_costs: Vec<f64>,
    pub visits: ExpectedVisits,
    pub cost: CostBreakdown,
}

impl Candidate {
    pub fn total_cost(&self) -> f64 {
        self.cost.total
    }

    pub fn total_attempts(&self) -> f64 {
        self.visits.total()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationOutcome {
    pub best: Candidate,
    pub candidates_evaluated: usize,
}
