//! Path optimizer tests: brute-force oracle, tie-breaking, the reference plan.

use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use upways::cost::PriceBook;
use upways::markov::SolverConfig;
use upways::methods::{
    ItemProfile, LevelRecord, Method, MethodCatalog, RateSource, BLESSING_SCROLL,
    BLACKSMITH_MANUAL, DRAGON_GOD_SCROLL, MAGIC_STONE, WAR_SCROLL,
};
use upways::optimizer::{
    evaluate_assignment, reference_request, Candidate, OptimizationRequest, OptimizerConfig,
    PathOptimizer,
};
use upways::report::legacy_rounded_cost;
use upways::UpgradeError;

const ITEM_RATES: [f64; 9] = [100.0, 100.0, 90.0, 80.0, 70.0, 60.0, 50.0, 30.0, 20.0];

fn sword() -> ItemProfile {
    let mut item = ItemProfile::from_rates(&ITEM_RATES);
    for level in 1..=9 {
        let record = LevelRecord::new(ITEM_RATES[level - 1])
            .with_material("Orc Tooth", level as u32)
            .with_yang_cost(100_000.0 * level as f64);
        item.set_level(level, record);
    }
    item
}

fn market() -> PriceBook {
    PriceBook::new()
        .with_method(BLESSING_SCROLL, 3.0)
        .with_method(BLACKSMITH_MANUAL, 12.0)
        .with_method(DRAGON_GOD_SCROLL, 8.0)
        .with_method(WAR_SCROLL, 1.5)
        .with_method(MAGIC_STONE, 25.0)
        .with_material("Orc Tooth", 0.4)
}

fn oracle(candidates: &[Candidate]) -> &Candidate {
    candidates
        .iter()
        .min_by(|a, b| {
            a.total_cost()
                .total_cmp(&b.total_cost())
                .then(a.index.cmp(&b.index))
        })
        .unwrap()
}

// =========================================================================
// Reference plan
// =========================================================================

#[test]
fn test_reference_plan_shape() {
    let request = reference_request(&MethodCatalog::reference(), sword(), market()).unwrap();
    assert_eq!(request.depth(), 9);

    let all = PathOptimizer::new(OptimizerConfig::default())
        .evaluate_all(&request)
        .unwrap();
    assert_eq!(all.len(), 1024);
    for candidate in &all {
        assert!(candidate.methods[..4].iter().all(|m| m == WAR_SCROLL));
        assert!(candidate.methods[4..].iter().all(|m| m != WAR_SCROLL));
    }
    assert!(all.iter().enumerate().all(|(i, c)| c.index == i));
}

#[test]
fn test_optimizer_matches_brute_force_oracle() {
    let request = reference_request(&MethodCatalog::reference(), sword(), market()).unwrap();
    let optimizer = PathOptimizer::new(OptimizerConfig::default());
    let all = optimizer.evaluate_all(&request).unwrap();
    let outcome = optimizer.optimize(&request).unwrap();

    assert_eq!(outcome.candidates_evaluated, 1024);
    assert_eq!(&outcome.best, oracle(&all));
}

#[test]
fn test_parallel_agrees_with_serial() {
    let request = reference_request(&MethodCatalog::reference(), sword(), market()).unwrap();
    let serial = PathOptimizer::new(OptimizerConfig::default())
        .optimize(&request)
        .unwrap();
    let parallel = PathOptimizer::new(OptimizerConfig::parallel())
        .optimize(&request)
        .unwrap();
    assert_eq!(serial, parallel);
}

#[test]
fn test_repeated_runs_are_identical() {
    let request = reference_request(&MethodCatalog::reference(), sword(), market()).unwrap();
    let optimizer = PathOptimizer::new(OptimizerConfig::parallel());
    let first = optimizer.optimize(&request).unwrap();
    for _ in 0..3 {
        assert_eq!(optimizer.optimize(&request).unwrap(), first);
    }
}

#[test]
fn test_free_method_wins_everywhere() {
    let prices = market().with_method(MAGIC_STONE, 0.0).with_material("Orc Tooth", 0.0);
    let request = reference_request(&MethodCatalog::reference(), sword(), prices).unwrap();
    let best = upways::optimizer::optimize(&request).unwrap().best;
    assert!(best.methods[4..].iter().all(|m| m == MAGIC_STONE));
}

#[test]
fn test_all_zero_prices_keep_first_candidate() {
    let item = ItemProfile::from_rates(&ITEM_RATES);
    let request = reference_request(&MethodCatalog::reference(), item, PriceBook::new()).unwrap();
    for config in [OptimizerConfig::default(), OptimizerConfig::parallel()] {
        let best = PathOptimizer::new(config).optimize(&request).unwrap().best;
        assert_eq!(best.index, 0);
        assert_eq!(best.total_cost(), 0.0);
        assert!(best.methods[4..].iter().all(|m| m == BLESSING_SCROLL));
    }
}

// =========================================================================
// Fully free search
// =========================================================================

#[test]
fn test_all_free_search_skips_ineligible_methods() {
    let item = ItemProfile::from_rates(&ITEM_RATES[..6]);
    let request = OptimizationRequest::all_free(&MethodCatalog::reference(), 6, item, market());
    let optimizer = PathOptimizer::new(OptimizerConfig::default());
    let all = optimizer.evaluate_all(&request).unwrap();
    // five choices on +1..+4, four on +5 and +6
    assert_eq!(all.len(), 5usize.pow(4) * 4usize.pow(2));
    assert_eq!(&optimizer.optimize(&request).unwrap().best, oracle(&all));
}

#[test]
fn test_level_without_any_method_is_rejected() {
    let war = MethodCatalog::reference().get(WAR_SCROLL).cloned().unwrap();
    let request = OptimizationRequest::new(sword(), market())
        .fixed(war.clone())
        .free(Vec::new());
    let err = upways::optimizer::optimize(&request).unwrap_err();
    assert_eq!(err, UpgradeError::EmptyCatalog { level: 2 });

    let request = (0..5)
        .fold(OptimizationRequest::new(sword(), market()), |r, _| r.fixed(war.clone()))
        .free(vec![war]);
    let err = upways::optimizer::optimize(&request).unwrap_err();
    assert_eq!(err, UpgradeError::EmptyCatalog { level: 6 });
}

#[test]
fn test_invalid_method_rate_is_rejected() {
    let broken = Method::new("Cursed Scroll", RateSource::Fixed(vec![120.0]));
    let request = OptimizationRequest::new(sword(), market()).free(vec![broken]);
    let err = upways::optimizer::optimize(&request).unwrap_err();
    assert!(matches!(err, UpgradeError::InvalidRate { level: 1, .. }));
}

#[test]
fn test_cancelled_before_start() {
    let request = reference_request(&MethodCatalog::reference(), sword(), market()).unwrap();
    for config in [OptimizerConfig::default(), OptimizerConfig::parallel()] {
        let optimizer = PathOptimizer::new(config);
        optimizer.cancel_handle().store(true, Ordering::Relaxed);
        assert_eq!(optimizer.optimize(&request), Err(UpgradeError::Cancelled));
    }
}

#[test]
fn test_cancel_from_another_thread_mid_search() {
    // 5^4 * 4^5 paths: far longer than the cancel delay
    let request = OptimizationRequest::all_free(&MethodCatalog::reference(), 9, sword(), market());
    for config in [OptimizerConfig::default(), OptimizerConfig::parallel()] {
        let optimizer = PathOptimizer::new(config);
        let handle = optimizer.cancel_handle();
        let result = thread::scope(|s| {
            s.spawn(|| {
                thread::sleep(Duration::from_millis(50));
                handle.store(true, Ordering::Relaxed);
            });
            optimizer.optimize(&request)
        });
        assert_eq!(result, Err(UpgradeError::Cancelled));

        // the same optimizer runs again once the cancelled run has returned
        let small = reference_request(&MethodCatalog::reference(), sword(), market())
            .unwrap()
            .up_to(6);
        assert_eq!(optimizer.optimize(&small).unwrap().candidates_evaluated, 16);
    }
}

// =========================================================================
// Level ranges
// =========================================================================

#[test]
fn test_plan_from_mid_level_to_target() {
    let catalog = MethodCatalog::reference();
    let request = reference_request(&catalog, sword(), market())
        .unwrap()
        .up_to(7)
        .starting_at(5);
    assert_eq!(request.depth(), 7);

    let optimizer = PathOptimizer::new(OptimizerConfig::default());
    let all = optimizer.evaluate_all(&request).unwrap();
    assert_eq!(all.len(), 4usize.pow(3));
    let best = optimizer.optimize(&request).unwrap().best;
    assert_eq!(&best, oracle(&all));
    assert_eq!(best.start_level, 5);
    assert!(best.cost.per_level[..5].iter().all(|&c| c == 0.0));
    assert!(best.cost.per_level[5..].iter().all(|&c| c > 0.0));

    // a fresh item pays for every level on the way up
    let fresh = optimizer
        .optimize(&request.clone().starting_at(0))
        .unwrap()
        .best;
    assert!(fresh.total_cost() > best.total_cost());
}

#[test]
fn test_fixed_path_from_mid_level() {
    let catalog = MethodCatalog::reference();
    let war = catalog.get(WAR_SCROLL).cloned().unwrap();
    let blessing = catalog.get(BLESSING_SCROLL).cloned().unwrap();
    let item = ItemProfile::from_rates(&[100.0, 50.0]);
    let prices = PriceBook::new().with_method(WAR_SCROLL, 7.0).with_method(BLESSING_SCROLL, 3.0);

    let path = [war, blessing];
    let candidate =
        evaluate_assignment(&path, &item, &prices, 1, &SolverConfig::default()).unwrap();
    assert!((candidate.visits.visits[0] - 1.0).abs() < 1e-9);
    assert!((candidate.visits.visits[1] - 2.0).abs() < 1e-9);
    assert_eq!(candidate.cost.per_level[0], 0.0);
    assert!((candidate.total_cost() - 6.0).abs() < 1e-9);

    let err = evaluate_assignment(&path, &item, &prices, 2, &SolverConfig::default()).unwrap_err();
    assert_eq!(err, UpgradeError::InvalidStartLevel { start: 2, levels: 2 });
}

// =========================================================================
// Fixed paths and rounding
// =========================================================================

#[test]
fn test_fixed_path_cost_breakdown() {
    let catalog = MethodCatalog::reference();
    let war = catalog.get(WAR_SCROLL).cloned().unwrap();
    let stone = catalog.get(MAGIC_STONE).cloned().unwrap();
    let item = ItemProfile::from_rates(&[100.0, 100.0, 100.0, 100.0, 50.0]);
    let prices = PriceBook::new().with_method(WAR_SCROLL, 2.0).with_method(MAGIC_STONE, 10.0);

    let path = vec![war.clone(), war.clone(), war.clone(), war, stone];
    let candidate =
        evaluate_assignment(&path, &item, &prices, 0, &SolverConfig::default()).unwrap();

    assert!((candidate.total_attempts() - 6.0).abs() < 1e-9);
    assert!((candidate.cost.per_level[4] - 20.0).abs() < 1e-9);
    assert!((candidate.total_cost() - 28.0).abs() < 1e-9);
}

#[test]
fn test_rounding_before_cost_drifts_from_full_precision() {
    let request = reference_request(&MethodCatalog::reference(), sword(), market()).unwrap();
    let best = upways::optimizer::optimize(&request).unwrap().best;

    let legacy = legacy_rounded_cost(&best.visits.visits, &best.unit_costs).unwrap();
    let bound: f64 = best.unit_costs.iter().map(|c| c * 0.005).sum();
    assert!((legacy.total - best.total_cost()).abs() <= bound + 1e-9);

    // a third of an attempt does not survive two decimals
    let visits = [1.0 / 3.0];
    let unit = [1_000.0];
    let full = upways::cost::evaluate_cost(&visits, &unit).unwrap();
    let rounded = legacy_rounded_cost(&visits, &unit).unwrap();
    assert!((full.total - rounded.total).abs() > 1.0);
}
