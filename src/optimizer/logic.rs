use super::enumerate::{candidate_count, decode, AssignmentOdometer};
use super::types::*;
use crate::cost::PriceBook;
use crate::error::{Result, UpgradeError};
use crate::markov::{Level, SolverConfig, UpgradeConfiguration};
use crate::methods::{
    ItemProfile, Method, MethodCatalog, SCROLL_LIMIT, WAR_SCROLL, WAR_SCROLL_MAX_LEVEL,
};
use crate::pipeline::{check_start_level, evaluate};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use tracing::{debug, info};

/// A method resolved against one level of the item.
#[derive(Debug, Clone)]
struct LevelOption {
    name: String,
    level: Level,
    unit_cost: f64,
}

/// Per-level options, resolved once and shared by every candidate.
#[derive(Debug)]
struct PreparedRequest {
    options: Vec<Vec<LevelOption>>,
    /// Indices of the free levels, ascending.
    free_levels: Vec<usize>,
    radices: Vec<usize>,
    candidates: usize,
    start_level: usize,
}

fn resolve(
    method: &Method,
    level: usize,
    item: &ItemProfile,
    prices: &PriceBook,
) -> Result<LevelOption> {
    let rate = method.success_rate(level, item)?;
    if !(0.0..=100.0).contains(&rate) {
        return Err(UpgradeError::InvalidRate { level, rate });
    }
    Ok(LevelOption {
        name: method.name.clone(),
        level: Level::new(rate, method.downgrade_exempt),
        unit_cost: prices.unit_cost(method, item.level(level)),
    })
}

impl PreparedRequest {
    fn new(request: &OptimizationRequest) -> Result<Self> {
        if request.slots.is_empty() {
            return Err(UpgradeError::EmptyConfiguration);
        }
        check_start_level(request.start_level, request.slots.len())?;

        let mut options = Vec::with_capacity(request.slots.len());
        let mut free_levels = Vec::new();
        let mut radices = Vec::new();

        for (i, slot) in request.slots.iter().enumerate() {
            let level = i + 1;
            let resolved = match slot {
                LevelSlot::Fixed(method) => {
                    vec![resolve(method, level, &request.item, &request.prices)?]
                }
                LevelSlot::Free(methods) => {
                    let eligible: Vec<LevelOption> = methods
                        .iter()
                        .filter(|m| m.is_eligible(level))
                        .map(|m| resolve(m, level, &request.item, &request.prices))
                        .collect::<Result<_>>()?;
                    if eligible.is_empty() {
                        return Err(UpgradeError::EmptyCatalog { level });
                    }
                    free_levels.push(i);
                    radices.push(eligible.len());
                    eligible
                }
            };
            options.push(resolved);
        }

        let candidates = candidate_count(&radices).ok_or(UpgradeError::SearchSpaceTooLarge {
            free_levels: free_levels.len(),
        })?;

        Ok(Self {
            options,
            free_levels,
            radices,
            candidates,
            start_level: request.start_level,
        })
    }

    /// Run matrix build, absorption and cost for one choice vector.
    fn evaluate(
        &self,
        index: usize,
        choice: &[usize],
        solver: &SolverConfig,
    ) -> Result<Candidate> {
        let mut picks: Vec<&LevelOption> = self.options.iter().map(|o| &o[0]).collect();
        for (&level, &pick) in self.free_levels.iter().zip(choice) {
            picks[level] = &self.options[level][pick];
        }

        let levels: Vec<Level> = picks.iter().map(|o| o.level).collect();
        let unit_costs: Vec<f64> = picks.iter().map(|o| o.unit_cost).collect();
        let config = UpgradeConfiguration::new(levels.clone())?;
        let evaluation = evaluate(&config, &unit_costs, self.start_level, solver)?;

        Ok(Candidate {
            index,
            start_level: self.start_level,
            methods: picks.iter().map(|o| o.name.clone()).collect(),
            levels,
            unit_costs,
            visits: evaluation.visits,
            cost: evaluation.cost,
        })
    }
}

/// Order by total cost, then by enumeration index.
fn rank(a: (f64, usize), b: (f64, usize)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
}

fn better(a: Option<(f64, usize)>, b: Option<(f64, usize)>) -> Option<(f64, usize)> {
    match (a, b) {
        (Some(x), Some(y)) => Some(if rank(x, y) == Ordering::Greater { y } else { x }),
        (x, None) => x,
        (None, y) => y,
    }
}

/// Brute-force search for the cheapest method assignment.
pub struct PathOptimizer {
    config: OptimizerConfig,
    cancelled: Arc<AtomicBool>,
}

impl PathOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns a handle to cancel a running (or the next) optimization. The
    /// flag is cleared once that run has returned `Cancelled`, so the
    /// optimizer stays usable.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(AtomicOrdering::Relaxed)
    }

    /// Evaluate every candidate and return the one with the lowest expected
    /// total cost. Ties keep the first candidate in enumeration order.
    pub fn optimize(&self, request: &OptimizationRequest) -> Result<OptimizationOutcome> {
        let prepared = PreparedRequest::new(request)?;
        let total = prepared.candidates;
        debug!(
            levels = request.depth(),
            free = prepared.free_levels.len(),
            candidates = total,
            parallel = self.config.parallel,
            "starting path optimization"
        );

        let search = if self.config.parallel {
            self.search_parallel(&prepared)
        } else {
            self.search_serial(&prepared)
        };
        let best = match search {
            Err(UpgradeError::Cancelled) => {
                self.cancelled.store(false, AtomicOrdering::Relaxed);
                info!(candidates = total, "path optimization cancelled");
                return Err(UpgradeError::Cancelled);
            }
            other => other?,
        };

        info!(
            candidates = total,
            best_index = best.index,
            total_cost = best.cost.total,
            total_attempts = best.visits.total(),
            "path optimization finished"
        );

        Ok(OptimizationOutcome {
            best,
            candidates_evaluated: total,
        })
    }

    fn search_serial(&self, prepared: &PreparedRequest) -> Result<Candidate> {
        let mut best: Option<Candidate> = None;
        for (index, choice) in AssignmentOdometer::new(prepared.radices.clone()) {
            if self.is_cancelled() {
                return Err(UpgradeError::Cancelled);
            }
            let candidate = prepared.evaluate(index, &choice, &self.config.solver)?;
            let replace = match &best {
                None => true,
                Some(current) => {
                    rank(
                        (candidate.cost.total, candidate.index),
                        (current.cost.total, current.index),
                    ) == Ordering::Less
                }
            };
            if replace {
                best = Some(candidate);
            }
        }
        best.ok_or(UpgradeError::EmptyConfiguration)
    }

    fn search_parallel(&self, prepared: &PreparedRequest) -> Result<Candidate> {
        let solver = self.config.solver;
        let winner = (0..prepared.candidates)
            .into_par_iter()
            .map(|index| -> Result<Option<(f64, usize)>> {
                if self.is_cancelled() {
                    return Ok(None);
                }
                let candidate =
                    prepared.evaluate(index, &decode(index, &prepared.radices), &solver)?;
                Ok(Some((candidate.cost.total, index)))
            })
            .try_reduce(|| None, |a, b| Ok(better(a, b)))?;

        if self.is_cancelled() {
            return Err(UpgradeError::Cancelled);
        }
        let (_, index) = winner.ok_or(UpgradeError::EmptyConfiguration)?;
        prepared.evaluate(index, &decode(index, &prepared.radices), &solver)
    }

    /// Every candidate in enumeration order.
    pub fn evaluate_all(&self, request: &OptimizationRequest) -> Result<Vec<Candidate>> {
        let prepared = PreparedRequest::new(request)?;
        AssignmentOdometer::new(prepared.radices.clone())
            .map(|(index, choice)| prepared.evaluate(index, &choice, &self.config.solver))
            .collect()
    }
}

/// Optimize with the default (serial) configuration.
pub fn optimize(request: &OptimizationRequest) -> Result<OptimizationOutcome> {
    PathOptimizer::new(OptimizerConfig::default()).optimize(request)
}

/// Evaluate one fixed assignment of methods to levels +1..+n for an item
/// sitting on `start_level`.
pub fn evaluate_assignment(
    methods: &[Method],
    item: &ItemProfile,
    prices: &PriceBook,
    start_level: usize,
    solver: &SolverConfig,
) -> Result<Candidate> {
    let request = methods.iter().fold(
        OptimizationRequest::new(item.clone(), prices.clone()).starting_at(start_level),
        |req, m| req.fixed(m.clone()),
    );
    PreparedRequest::new(&request)?.evaluate(0, &[], solver)
}

/// The reference plan: War Scroll on +1..+4, every other eligible catalog
/// method competing on +5..+9.
pub fn reference_request(
    catalog: &MethodCatalog,
    item: ItemProfile,
    prices: PriceBook,
) -> Result<OptimizationRequest> {
    let war = catalog
        .get(WAR_SCROLL)
        .cloned()
        .ok_or(UpgradeError::EmptyCatalog { level: 1 })?;
    let mut request = OptimizationRequest::new(item, prices);
    for level in 1..=SCROLL_LIMIT {
        request = if level <= WAR_SCROLL_MAX_LEVEL {
            request.fixed(war.clone())
        } else {
            request.free(catalog.eligible_for(level))
        };
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::{RateSource, BLESSING_SCROLL, MAGIC_STONE};

    fn fixed(name: &str, rate: f64) -> Method {
        Method::new(name, RateSource::Fixed(vec![rate; 9]))
    }

    #[test]
    fn test_single_free_level_picks_cheaper() {
        let item = ItemProfile::from_rates(&[50.0]);
        let prices = PriceBook::new().with_method("Cheap", 1.0).with_method("Dear", 10.0);
        let request = OptimizationRequest::new(item, prices)
            .free(vec![fixed("Dear", 100.0), fixed("Cheap", 50.0)]);
        let outcome = optimize(&request).unwrap();
        // Cheap: 2 attempts * 1 = 2, Dear: 1 attempt * 10 = 10
        assert_eq!(outcome.best.methods, vec!["Cheap"]);
        assert!((outcome.best.total_cost() - 2.0).abs() < 1e-9);
        assert_eq!(outcome.candidates_evaluated, 2);
    }

    #[test]
    fn test_tie_keeps_first_in_catalog_order() {
        let item = ItemProfile::from_rates(&[100.0]);
        let request = OptimizationRequest::new(item, PriceBook::new())
            .free(vec![fixed("A", 100.0), fixed("B", 100.0)]);
        let outcome = optimize(&request).unwrap();
        assert_eq!(outcome.best.methods, vec!["A"]);
        assert_eq!(outcome.best.index, 0);
    }

    #[test]
    fn test_empty_free_level_rejected() {
        let item = ItemProfile::from_rates(&[100.0, 100.0]);
        let request = OptimizationRequest::new(item, PriceBook::new())
            .fixed(fixed("A", 100.0))
            .free(Vec::new());
        assert_eq!(
            optimize(&request).unwrap_err(),
            UpgradeError::EmptyCatalog { level: 2 }
        );
    }

    #[test]
    fn test_ineligible_only_level_rejected() {
        let item = ItemProfile::from_rates(&[100.0; 5]);
        let low_only = fixed("Low", 100.0).up_to_level(4);
        let request = OptimizationRequest::all_free(
            &MethodCatalog::new(vec![low_only]),
            5,
            item,
            PriceBook::new(),
        );
        assert_eq!(
            optimize(&request).unwrap_err(),
            UpgradeError::EmptyCatalog { level: 5 }
        );
    }

    #[test]
    fn test_invalid_rate_rejected_before_search() {
        let item = ItemProfile::from_rates(&[150.0]);
        let request = OptimizationRequest::new(item, PriceBook::new())
            .free(vec![Method::new(BLESSING_SCROLL, RateSource::Item)]);
        assert_eq!(
            optimize(&request).unwrap_err(),
            UpgradeError::InvalidRate {
                level: 1,
                rate: 150.0
            }
        );
    }

    #[test]
    fn test_evaluate_assignment_uses_item_rates_and_exemption() {
        let item = ItemProfile::from_rates(&[100.0, 50.0]);
        let stone = Method::new(MAGIC_STONE, RateSource::Item).downgrade_exempt(true);
        let c = evaluate_assignment(
            &[stone.clone(), stone],
            &item,
            &PriceBook::new().with_method(MAGIC_STONE, 3.0),
            0,
            &SolverConfig::default(),
        )
        .unwrap();
        assert!((c.visits.visits[0] - 1.0).abs() < 1e-9);
        assert!((c.visits.visits[1] - 2.0).abs() < 1e-9);
        assert!((c.total_cost() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_cancelled_before_start() {
        let item = ItemProfile::from_rates(&[50.0; 3]);
        let request =
            OptimizationRequest::all_free(&MethodCatalog::reference(), 3, item, PriceBook::new());
        for config in [OptimizerConfig::default(), OptimizerConfig::parallel()] {
            let optimizer = PathOptimizer::new(config);
            optimizer.cancel_handle().store(true, AtomicOrdering::Relaxed);
            assert_eq!(optimizer.optimize(&request), Err(UpgradeError::Cancelled));
        }
    }

    #[test]
    fn test_cancellation_does_not_stick() {
        let item = ItemProfile::from_rates(&[50.0; 3]);
        let request =
            OptimizationRequest::all_free(&MethodCatalog::reference(), 3, item, PriceBook::new());
        let optimizer = PathOptimizer::new(OptimizerConfig::default());
        optimizer.cancel_handle().store(true, AtomicOrdering::Relaxed);
        assert_eq!(optimizer.optimize(&request), Err(UpgradeError::Cancelled));
        assert!(!optimizer.cancel_handle().load(AtomicOrdering::Relaxed));
        assert_eq!(optimizer.optimize(&request).unwrap().candidates_evaluated, 125);
    }

    #[test]
    fn test_start_level_skips_cost_below_it() {
        let item = ItemProfile::from_rates(&[100.0, 50.0]);
        let prices = PriceBook::new().with_method("Cheap", 1.0).with_method("Dear", 4.0);
        let request = OptimizationRequest::new(item, prices)
            .free(vec![fixed("Dear", 100.0), fixed("Cheap", 100.0)])
            .fixed(fixed("Plain", 50.0))
            .starting_at(1);
        let best = optimize(&request).unwrap().best;
        // +0 is only revisited after a downgrade and is not charged
        assert_eq!(best.start_level, 1);
        assert_eq!(best.cost.per_level[0], 0.0);
        assert!((best.visits.visits[0] - 1.0).abs() < 1e-9);
        assert!((best.visits.visits[1] - 2.0).abs() < 1e-9);
        assert_eq!(best.methods[0], "Dear");
    }

    #[test]
    fn test_start_level_past_plan_rejected() {
        let item = ItemProfile::from_rates(&[100.0, 50.0]);
        let request = OptimizationRequest::new(item, PriceBook::new())
            .fixed(fixed("A", 100.0))
            .fixed(fixed("A", 50.0))
            .starting_at(2);
        assert_eq!(
            optimize(&request).unwrap_err(),
            UpgradeError::InvalidStartLevel { start: 2, levels: 2 }
        );
    }

    #[test]
    fn test_huge_search_space_rejected() {
        let item = ItemProfile::from_rates(&[100.0; 40]);
        let request =
            OptimizationRequest::all_free(&MethodCatalog::reference(), 40, item, PriceBook::new());
        assert_eq!(
            optimize(&request).unwrap_err(),
            UpgradeError::SearchSpaceTooLarge { free_levels: 40 }
        );
    }

    #[test]
    fn test_better_prefers_lower_index_on_tie() {
        assert_eq!(better(Some((1.0, 5)), Some((1.0, 2))), Some((1.0, 2)));
        assert_eq!(better(Some((0.5, 5)), Some((1.0, 2))), Some((0.5, 5)));
        assert_eq!(better(None, Some((1.0, 2))), Some((1.0, 2)));
    }
}
