//! Refine path calculator CLI.
//!
//! Evaluates a fixed refine path for an item, or searches every method
//! assignment for the cheapest one.
//!
//! Usage:
//!   cargo run --bin upways -- --data FILE --item NAME [OPTIONS]
//!
//! Examples:
//!   cargo run --bin upways -- --data data.json --item "Full Moon Sword+0"
//!   cargo run --bin upways -- --data data.json --item "Full Moon Sword+0" --parallel
//!   cargo run --bin upways -- --data data.json --item "Full Moon Sword+0" \
//!       --path "War Scroll,War Scroll,War Scroll,War Scroll,Magic Stone"
//!   cargo run --bin upways -- --data data.json --item X --from 5 --to 8
//!   cargo run --bin upways -- --data data.json --item X --simulate 20000 --seed 42

use serde::Serialize;
use std::env;
use std::error::Error;
use std::path::PathBuf;
use upways::build_info;
use upways::cost::PriceBook;
use upways::markov::{
    attempts_for_confidence, build_transition_matrix, completion_curve, Dispersion,
    SolverConfig, UpgradeConfiguration, DEFAULT_MAX_ATTEMPTS,
};
use upways::methods::{find_item, load_item_data, ItemProfile, Method, MethodCatalog};
use upways::optimizer::{
    evaluate_assignment, reference_request, Candidate, OptimizationRequest, OptimizerConfig,
    PathOptimizer,
};
use upways::pipeline::spread;
use upways::report::{format_cost, rounded_visits};
use upways::simulator::{run_simulation, SimConfig, SimReport};

#[derive(Debug, Default)]
struct CliArgs {
    data: Option<PathBuf>,
    item: Option<String>,
    path: Option<Vec<String>>,
    all_free: bool,
    from: usize,
    to: Option<usize>,
    prices: Option<PathBuf>,
    set_prices: Vec<(String, f64)>,
    save_prices: bool,
    parallel: bool,
    simulate: Option<u32>,
    seed: Option<u64>,
    json: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    version: String,
    item: &'a str,
    candidates_evaluated: usize,
    best: &'a Candidate,
    dispersion: &'a Dispersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    simulation: Option<&'a SimReport>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("Run with --help for usage.");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &CliArgs) -> Result<(), Box<dyn Error>> {
    let mut prices = match &cli.prices {
        Some(path) => PriceBook::load_from(path),
        None => PriceBook::load(),
    };
    for (name, price) in &cli.set_prices {
        set_price(&mut prices, name, *price);
    }
    if cli.save_prices {
        match &cli.prices {
            Some(path) => prices.save_to(path)?,
            None => prices.save()?,
        }
        println!("Prices saved.");
    }

    let (Some(data_path), Some(item_name)) = (&cli.data, &cli.item) else {
        if cli.save_prices {
            return Ok(());
        }
        return Err("--data and --item are required".into());
    };
    let data = load_item_data(data_path)?;
    let item = find_item(&data, item_name)
        .cloned()
        .ok_or_else(|| format!("item not found: {item_name}"))?;

    let catalog = MethodCatalog::reference();
    let solver = SolverConfig::default();

    let (best, evaluated) = match &cli.path {
        Some(names) => {
            let mut methods = resolve_methods(&catalog, names)?;
            if let Some(to) = cli.to {
                check_target(to, methods.len())?;
                methods.truncate(to);
            }
            (evaluate_assignment(&methods, &item, &prices, cli.from, &solver)?, 1)
        }
        None => {
            let request = build_request(
                &catalog,
                item.clone(),
                prices.clone(),
                cli.all_free,
                cli.from,
                cli.to,
            )?;
            let config = if cli.parallel {
                OptimizerConfig::parallel()
            } else {
                OptimizerConfig::default()
            };
            let outcome = PathOptimizer::new(config).optimize(&request)?;
            (outcome.best, outcome.candidates_evaluated)
        }
    };

    let upgrade = UpgradeConfiguration::new(best.levels.clone())?;
    let dispersion = spread(&upgrade, best.start_level, &solver);

    let simulation = cli.simulate.map(|runs| {
        let config = SimConfig {
            num_runs: runs,
            seed: cli.seed,
            start_level: best.start_level,
            ..Default::default()
        };
        run_simulation(&config, &upgrade)
    });

    print_summary(item_name, &item, &best, evaluated, &dispersion, &upgrade);
    if let Some(sim) = &simulation {
        print_simulation(sim, &best);
    }

    if cli.json {
        let report = JsonReport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            version: build_info::version_line(),
            item: item_name,
            candidates_evaluated: evaluated,
            best: &best,
            dispersion: &dispersion,
            simulation: simulation.as_ref(),
        };
        let filename = format!(
            "upways_report_{}.json",
            chrono::Utc::now().format("%Y%m%d_%H%M%S")
        );
        std::fs::write(&filename, serde_json::to_string_pretty(&report)?)?;
        println!("JSON report saved to: {}", filename);
    }

    Ok(())
}

/// `NAME=PRICE` sets a method price when NAME is a method, else a material.
fn set_price(prices: &mut PriceBook, name: &str, price: f64) {
    if MethodCatalog::reference().get(name).is_some() {
        prices.methods.insert(name.to_string(), price);
    } else {
        prices.materials.insert(name.to_string(), price);
    }
}

fn check_target(to: usize, depth: usize) -> Result<(), String> {
    if to == 0 || to > depth {
        return Err(format!("--to must be between 1 and {depth}, got {to}"));
    }
    Ok(())
}

fn resolve_methods(catalog: &MethodCatalog, names: &[String]) -> Result<Vec<Method>, String> {
    names
        .iter()
        .map(|name| {
            catalog
                .iter()
                .find(|m| m.name.eq_ignore_ascii_case(name.trim()))
                .cloned()
                .ok_or_else(|| format!("unknown method: {name}"))
        })
        .collect()
}

fn build_request(
    catalog: &MethodCatalog,
    item: ItemProfile,
    prices: PriceBook,
    all_free: bool,
    from: usize,
    to: Option<usize>,
) -> Result<OptimizationRequest, Box<dyn Error>> {
    let request = if all_free {
        let depth = item.max_level();
        OptimizationRequest::all_free(catalog, depth, item, prices)
    } else {
        reference_request(catalog, item, prices)?
    };
    let request = match to {
        Some(to) => {
            check_target(to, request.depth())?;
            request.up_to(to)
        }
        None => request,
    };
    Ok(request.starting_at(from))
}

fn print_summary(
    name: &str,
    item: &ItemProfile,
    best: &Candidate,
    evaluated: usize,
    dispersion: &Dispersion,
    upgrade: &UpgradeConfiguration,
) {
    println!("{}", build_info::version_line());
    println!();
    println!("Item:               {}", name);
    if let Some(icon) = &item.icon {
        println!("Icon:               {}", icon);
    }
    println!(
        "Refine:             +{} to +{}",
        best.start_level,
        best.methods.len()
    );
    println!("Paths evaluated:    {}", evaluated);
    println!("Solve method:       {:?}", best.visits.method);
    println!();
    println!(
        "{:<6} {:<20} {:>7} {:>12} {:>14} {:>14}",
        "Level", "Method", "Rate", "Attempts", "Unit cost", "Cost"
    );
    let shown = rounded_visits(&best.visits.visits);
    for (i, method) in best.methods.iter().enumerate() {
        println!(
            "+{:<5} {:<20} {:>6.0}% {:>12.2} {:>14} {:>14}",
            i + 1,
            method,
            best.levels[i].success_rate,
            shown[i],
            format_cost(best.unit_costs[i]),
            format_cost(best.cost.per_level[i]),
        );
    }
    println!();
    println!("Total attempts:     {:.2}", best.total_attempts());
    println!("Total cost:         {}", format_cost(best.total_cost()));
    println!(
        "Attempts 95% CI:    {:.0} - {:.0}",
        dispersion.total.ci95.lower, dispersion.total.ci95.upper
    );
    println!(
        "Attempts 99% CI:    {:.0} - {:.0}",
        dispersion.total.ci99.lower, dispersion.total.ci99.upper
    );
    println!(
        "Risk:               {:?} (cv {:.2})",
        dispersion.risk, dispersion.cv
    );

    let curve = completion_curve(
        &build_transition_matrix(upgrade),
        best.start_level,
        DEFAULT_MAX_ATTEMPTS,
    );
    for percent in [50.0, 90.0, 99.0] {
        match attempts_for_confidence(&curve, percent) {
            Some(k) => println!("{:>3.0}% done within:  {} attempts", percent, k),
            None => println!(
                "{:>3.0}% done within:  more than {} attempts",
                percent, DEFAULT_MAX_ATTEMPTS
            ),
        }
    }
}

fn print_simulation(sim: &SimReport, best: &Candidate) {
    println!();
    println!("Simulation:         {} runs", sim.num_runs);
    println!("  Completed:        {:.1}%", sim.completion_rate() * 100.0);
    println!("  Avg attempts:     {:.2}", sim.avg_total_attempts);
    println!(
        "  Min/Median/Max:   {} / {} / {}",
        sim.min_total_attempts, sim.median_total_attempts, sim.max_total_attempts
    );
    println!(
        "  Max level error:  {:.2}%",
        sim.max_relative_error(&best.visits) * 100.0
    );
}

fn next_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} needs a value"))
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut cli = CliArgs::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-d" | "--data" => {
                cli.data = Some(PathBuf::from(next_value(args, &mut i, "--data")?));
            }
            "-i" | "--item" => {
                cli.item = Some(next_value(args, &mut i, "--item")?.to_string());
            }
            "-p" | "--path" => {
                let value = next_value(args, &mut i, "--path")?;
                cli.path = Some(value.split(',').map(|s| s.trim().to_string()).collect());
            }
            "--all-free" => {
                cli.all_free = true;
            }
            "--from" => {
                let value = next_value(args, &mut i, "--from")?;
                cli.from = value
                    .parse()
                    .map_err(|_| format!("invalid start level: {value}"))?;
            }
            "--to" => {
                let value = next_value(args, &mut i, "--to")?;
                cli.to = Some(
                    value
                        .parse()
                        .map_err(|_| format!("invalid target level: {value}"))?,
                );
            }
            "--prices" => {
                cli.prices = Some(PathBuf::from(next_value(args, &mut i, "--prices")?));
            }
            "--price" => {
                let value = next_value(args, &mut i, "--price")?;
                let (name, price) = value
                    .rsplit_once('=')
                    .ok_or_else(|| format!("--price expects NAME=PRICE, got {value}"))?;
                let price: f64 = price
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid price: {price}"))?;
                cli.set_prices.push((name.trim().to_string(), price));
            }
            "--save-prices" => {
                cli.save_prices = true;
            }
            "--parallel" => {
                cli.parallel = true;
            }
            "-n" | "--simulate" => {
                let value = next_value(args, &mut i, "--simulate")?;
                cli.simulate = Some(
                    value
                        .parse()
                        .map_err(|_| format!("invalid run count: {value}"))?,
                );
            }
            "-s" | "--seed" => {
                let value = next_value(args, &mut i, "--seed")?;
                cli.seed = Some(value.parse().map_err(|_| format!("invalid seed: {value}"))?);
            }
            "--json" => {
                cli.json = true;
            }
            "-V" | "--version" => {
                println!("{}", build_info::version_line());
                std::process::exit(0);
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    Ok(cli)
}

fn print_help() {
    println!("Upways refine path calculator");
    println!();
    println!("USAGE:");
    println!("    cargo run --bin upways -- --data FILE --item NAME [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -d, --data <FILE>       Item data JSON exported by the data tools");
    println!("    -i, --item <NAME>       Item to refine");
    println!("    -p, --path <M1,M2,..>   Evaluate this method per level instead of optimizing");
    println!("    --all-free              Let every level pick any method (default: War Scroll");
    println!("                            on +1..+4, free choice on +5..+9)");
    println!("    --from <L>              Level the item is on now (default: 0)");
    println!("    --to <L>                Target level (default: top of the plan)");
    println!("    --prices <FILE>         Price book (default: ~/.upways/prices.json)");
    println!("    --price <NAME=PRICE>    Set a method or material price, in millions");
    println!("    --save-prices           Write the price book back");
    println!("    --parallel              Evaluate candidate paths on all cores");
    println!("    -n, --simulate <N>      Cross-check with N Monte Carlo runs");
    println!("    -s, --seed <S>          Random seed for the simulation");
    println!("    --json                  Save JSON report");
    println!("    -V, --version           Show version");
    println!("    -h, --help              Show this help");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG                Log filter (default: warn)");
}
