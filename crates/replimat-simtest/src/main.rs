//! Replimat Headless Simulation Harness
//!
//! Runs terminals, tanks and wardens through the engine and checks the
//! feedstock books balance. No rendering, no host game.
//!
//! Usage:
//!   cargo run -p replimat-simtest
//!   cargo run -p replimat-simtest -- --verbose
//!   cargo run -p replimat-simtest -- --config replimat.json

use replimat_core::prelude::*;
use replimat_core::systems::{DeliveryHost, Toil};
use serde::Deserialize;

// ── Prison scenarios ────────────────────────────────────────────────────
const SCENARIOS_JSON: &str = include_str!("../data/scenarios.json");

#[derive(Debug, Deserialize)]
struct Scenario {
    name: String,
    /// Litres in each tank on the terminal's network
    tanks: Vec<f32>,
    wardens: u32,
    prisoners: u32,
    expected_meals: u32,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose");
    let config = match args.iter().position(|a| a == "--config") {
        Some(i) => match args.get(i + 1).map(ReplimatConfig::load) {
            Some(Ok(config)) => config,
            Some(Err(e)) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(2);
            }
            None => {
                eprintln!("--config needs a path");
                std::process::exit(2);
            }
        },
        None => ReplimatConfig::default(),
    };

    println!("=== Replimat Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Terminal accounting
    results.extend(validate_dispensing(&config));

    // 2. Random draw order across tanks
    results.extend(validate_tank_draw(&config));

    // 3. Countdown and power draw
    results.extend(validate_countdown(&config));

    // 4. Delivery jobs
    results.extend(validate_delivery(&config));

    // 5. Scenario sweep
    results.extend(validate_scenarios(&config, verbose));

    // 6. Save/load mid-delivery
    results.extend(validate_persistence(&config));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

/// Engine whose only meal costs exactly `litres`
fn fixed_cost_engine(config: &ReplimatConfig, litres: f32, seed: u64) -> ColonyEngine {
    let config = ReplimatConfig {
        feedstock_litres_per_kg: 1.0,
        ..config.clone()
    };
    let catalog = FoodCatalog::new(vec![FoodDef::new(
        0,
        "test meal",
        litres,
        config.max_preferability,
    )]);
    ColonyEngine::with_config(config, seed).with_catalog(catalog)
}

fn meal_volume(engine: &ColonyEngine) -> f32 {
    engine
        .catalog
        .iter()
        .find(|d| d.preferability == engine.config.max_preferability)
        .map(|d| d.base_mass * engine.config.feedstock_litres_per_kg)
        .unwrap_or(0.0)
}

/// Tick until no delivery is running, returning how many completed
fn run_until_idle(engine: &mut ColonyEngine, max_ticks: u32) -> (u32, u32) {
    let mut completed = 0;
    let mut failed = 0;
    for _ in 0..max_ticks {
        engine.update();
        for (_, status) in engine.take_job_results() {
            match status {
                JobStatus::Completed => completed += 1,
                JobStatus::Failed(_) => failed += 1,
                JobStatus::Running => {}
            }
        }
        if engine.active_delivery_count() == 0 {
            break;
        }
    }
    (completed, failed)
}

// ── 1. Dispensing ───────────────────────────────────────────────────────

fn validate_dispensing(config: &ReplimatConfig) -> Vec<TestResult> {
    println!("--- Dispensing ---");
    let mut results = Vec::new();

    let mut engine = fixed_cost_engine(config, 3.0, 1);
    let net = PowerNetId(1);
    let terminal = engine.spawn_terminal(Vec3::ZERO, net);
    engine.spawn_tank(Vec3::ZERO, net, 5.0, 100.0);

    let first = engine.try_dispense(terminal).map(|(o, _)| o);
    let after_first = engine.network_feedstock(net).total;
    results.push(TestResult {
        name: "dispense_first_meal".into(),
        passed: matches!(first, Ok(DispenseOutcome::Produced(_))) && after_first == 2.0,
        detail: format!("{:?}, {:.2}L left", first.ok(), after_first),
    });

    let second = engine.try_dispense(terminal).map(|(o, _)| o);
    let after_second = engine.network_feedstock(net).total;
    results.push(TestResult {
        name: "dispense_refused_when_short".into(),
        passed: matches!(
            second,
            Ok(DispenseOutcome::Unavailable(Unavailable::InsufficientFeedstock { .. }))
        ) && after_second == 2.0,
        detail: format!("{:?}, {:.2}L left", second.ok(), after_second),
    });

    let mut dry = ColonyEngine::with_config(config.clone(), 2);
    let lonely = dry.spawn_terminal(Vec3::ZERO, PowerNetId(5));
    let powered = dry.can_dispense_now(lonely).unwrap_or(true);
    let _ = dry.set_powered(lonely, false);
    let unpowered = dry.can_dispense_now(lonely).unwrap_or(true);
    results.push(TestResult {
        name: "no_tanks_never_dispensable".into(),
        passed: !powered && !unpowered,
        detail: dry.inspect_terminal(lonely).unwrap_or_default(),
    });

    results
}

// ── 2. Tank draw order ──────────────────────────────────────────────────

fn validate_tank_draw(config: &ReplimatConfig) -> Vec<TestResult> {
    println!("--- Tank Draw ---");
    let mut results = Vec::new();

    let mut totals_ok = true;
    let mut orders_seen = std::collections::BTreeSet::new();
    for seed in 0..64 {
        let mut engine = fixed_cost_engine(config, 2.0, seed);
        let net = PowerNetId(1);
        let terminal = engine.spawn_terminal(Vec3::ZERO, net);
        let small = engine.spawn_tank(Vec3::ZERO, net, 1.0, 10.0);
        engine.spawn_tank(Vec3::ZERO, net, 4.0, 10.0);

        let _ = engine.try_dispense(terminal);
        totals_ok &= engine.network_feedstock(net).total == 3.0;
        if let Ok(tank) = engine.world.get::<&FeedTank>(small) {
            orders_seen.insert((tank.stored * 10.0) as i32);
        };
    }

    results.push(TestResult {
        name: "draw_total_order_independent".into(),
        passed: totals_ok,
        detail: "1.0L + 4.0L minus 2.0L leaves 3.0L for every seed".into(),
    });
    results.push(TestResult {
        name: "draw_order_randomized".into(),
        passed: orders_seen.len() == 2,
        detail: format!("{} distinct outcomes for the small tank", orders_seen.len()),
    });

    results
}

// ── 3. Countdown ────────────────────────────────────────────────────────

fn validate_countdown(config: &ReplimatConfig) -> Vec<TestResult> {
    println!("--- Countdown ---");
    let mut results = Vec::new();

    let mut engine = ColonyEngine::with_config(config.clone(), 3);
    let net = PowerNetId(1);
    let terminal = engine.spawn_terminal(Vec3::ZERO, net);
    engine.spawn_tank(Vec3::ZERO, net, 50.0, 100.0);
    let _ = engine.try_dispense(terminal);

    let duration = config.collect_duration_ticks();
    let mut strictly_decreasing = true;
    let mut last = duration;
    let mut peak_draw = 0.0f32;
    for _ in 0..duration + 5 {
        engine.update();
        let ticks = engine
            .world
            .get::<&ReplimatTerminal>(terminal)
            .map(|t| t.replicating_ticks)
            .unwrap_or(0);
        if last > 0 && ticks != last - 1 {
            strictly_decreasing = false;
        }
        if last == 0 && ticks != 0 {
            strictly_decreasing = false;
        }
        last = ticks;
        if let Ok(power) = engine.world.get::<&PowerTrader>(terminal) {
            peak_draw = peak_draw.max(-power.power_output);
        }
    }

    results.push(TestResult {
        name: "countdown_decrements".into(),
        passed: strictly_decreasing && last == 0,
        detail: format!("{} ticks from {}", duration, duration),
    });
    let idle = engine
        .world
        .get::<&PowerTrader>(terminal)
        .map(|p| -p.power_output)
        .unwrap_or(0.0);
    results.push(TestResult {
        name: "power_draw_follows_countdown".into(),
        passed: peak_draw == config.dispensing_power_draw && idle == config.idle_power_draw,
        detail: format!("peak {}W, idle {}W", peak_draw, idle),
    });

    results
}

// ── 4. Delivery ─────────────────────────────────────────────────────────

fn validate_delivery(config: &ReplimatConfig) -> Vec<TestResult> {
    println!("--- Delivery ---");
    let mut results = Vec::new();

    // Happy path
    let mut engine = ColonyEngine::with_config(config.clone(), 4);
    let net = PowerNetId(1);
    let terminal = engine.spawn_terminal(Vec3::ZERO, net);
    engine.spawn_tank(Vec3::ZERO, net, 10.0, 100.0);
    let warden = engine.spawn_pawn("Warden", Vec3::new(0.0, -4.0, 0.0));
    let prisoner = engine.spawn_prisoner("Prisoner", Vec3::new(5.0, 0.0, 0.0));
    let per_meal = meal_volume(&engine);

    let assigned = engine.assign_food_delivery(warden, terminal, prisoner);
    let report = engine.job_report(warden).unwrap_or_default();
    let (completed, _) = run_until_idle(&mut engine, 5_000);
    let left = engine.network_feedstock(net).total;
    results.push(TestResult {
        name: "delivery_completes".into(),
        passed: assigned.is_ok() && completed == 1 && (left - (10.0 - per_meal)).abs() < 1e-4,
        detail: format!("{} -> {:.3}L left", report, left),
    });

    // Terminal drained while the warden walks over
    let mut engine = ColonyEngine::with_config(config.clone(), 5);
    let terminal = engine.spawn_terminal(Vec3::ZERO, net);
    let tank = engine.spawn_tank(Vec3::ZERO, net, 10.0, 100.0);
    let warden = engine.spawn_pawn("Warden", Vec3::new(0.0, -4.0, 0.0));
    let prisoner = engine.spawn_prisoner("Prisoner", Vec3::new(5.0, 0.0, 0.0));
    let _ = engine.assign_food_delivery(warden, terminal, prisoner);

    let mut status = None;
    for _ in 0..5_000 {
        let at_terminal_walk = engine
            .deliveries()
            .first()
            .and_then(|d| d.current_toil())
            == Some(Toil::GotoTerminal);
        if at_terminal_walk {
            if let Ok(mut t) = engine.world.get::<&mut FeedTank>(tank) {
                t.stored = 0.0;
            }
        }
        engine.update();
        if let Some((_, s)) = engine.take_job_results().into_iter().next() {
            status = Some(s);
            break;
        }
    }
    let carrying = engine.world.get::<&Carrying>(warden).is_ok();
    results.push(TestResult {
        name: "delivery_aborts_on_empty_terminal".into(),
        passed: matches!(
            status,
            Some(JobStatus::Failed(JobFailure::TerminalUnavailable(_)))
        ) && !carrying
            && engine.network_feedstock(net).total == 0.0,
        detail: format!("{:?}", status),
    });

    // Meal carried in the pack
    let mut engine = ColonyEngine::with_config(config.clone(), 6);
    let warden = engine.spawn_pawn("Warden", Vec3::ZERO);
    let prisoner = engine.spawn_prisoner("Prisoner", Vec3::new(2.0, 0.0, 0.0));
    let meal = engine
        .catalog
        .find("simple meal")
        .map(|d| d.id)
        .and_then(|id| engine.spawn_meal_in_inventory(warden, id).ok());
    let assigned = meal.map(|m| engine.assign_food_delivery(warden, m, prisoner));
    let (completed, _) = run_until_idle(&mut engine, 5_000);
    let still_packed = meal.map(|m| engine.inventory_contains(warden, m)).unwrap_or(true);
    results.push(TestResult {
        name: "delivery_from_inventory".into(),
        passed: matches!(assigned, Some(Ok(()))) && completed == 1 && !still_packed,
        detail: format!("{} completed, meal left in pack: {}", completed, still_packed),
    });

    results
}

// ── 5. Scenario sweep ───────────────────────────────────────────────────

fn validate_scenarios(config: &ReplimatConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Scenarios ---");
    let mut results = Vec::new();

    let scenarios: Vec<Scenario> = match serde_json::from_str(SCENARIOS_JSON) {
        Ok(s) => s,
        Err(e) => {
            results.push(TestResult {
                name: "scenarios_parse".into(),
                passed: false,
                detail: format!("JSON parse error: {}", e),
            });
            return results;
        }
    };

    for (i, scenario) in scenarios.iter().enumerate() {
        // Every meal costs 1L so expectations read straight off the tank list
        let mut engine = fixed_cost_engine(config, 1.0, 100 + i as u64);
        let net = PowerNetId(1);
        let terminal = engine.spawn_terminal(Vec3::ZERO, net);
        for (t, stock) in scenario.tanks.iter().enumerate() {
            engine.spawn_tank(Vec3::new(-1.0 - t as f32, 0.0, 0.0), net, *stock, 100.0);
        }
        let before = engine.network_feedstock(net).total;

        let wardens: Vec<_> = (0..scenario.wardens)
            .map(|w| engine.spawn_pawn(&format!("Warden {}", w), Vec3::new(w as f32, -5.0, 0.0)))
            .collect();
        let mut prisoners: Vec<_> = (0..scenario.prisoners)
            .map(|p| engine.spawn_prisoner(&format!("Prisoner {}", p), Vec3::new(8.0, p as f32 * 2.0, 0.0)))
            .collect();

        // Wardens take prisoners in turn until every prisoner has been tried
        let mut delivered = 0;
        while !prisoners.is_empty() {
            for warden in &wardens {
                if let Some(prisoner) = prisoners.pop() {
                    if let Err(e) = engine.assign_food_delivery(*warden, terminal, prisoner) {
                        log::warn!("{}: {}", scenario.name, e);
                    }
                }
            }
            delivered += run_until_idle(&mut engine, 10_000).0;
        }

        let after = engine.network_feedstock(net).total;
        let debited = before - after;
        let balanced = (debited - delivered as f32).abs() < 1e-4;
        if verbose {
            println!(
                "  {}: {} meals, {:.2}L -> {:.2}L",
                scenario.name, delivered, before, after
            );
        }
        results.push(TestResult {
            name: format!("scenario_{}", scenario.name),
            passed: delivered == scenario.expected_meals && balanced,
            detail: format!(
                "{} meals (expected {}), {:.2}L debited",
                delivered, scenario.expected_meals, debited
            ),
        });
    }

    results
}

// ── 6. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(config: &ReplimatConfig) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();

    let mut engine = ColonyEngine::with_config(config.clone(), 7);
    let net = PowerNetId(1);
    let terminal = engine.spawn_terminal(Vec3::ZERO, net);
    engine.spawn_tank(Vec3::ZERO, net, 10.0, 100.0);
    let warden = engine.spawn_pawn("Warden", Vec3::new(0.0, -4.0, 0.0));
    let prisoner = engine.spawn_prisoner("Prisoner", Vec3::new(5.0, 0.0, 0.0));
    let _ = engine.assign_food_delivery(warden, terminal, prisoner);
    for _ in 0..10 {
        engine.update();
    }

    let mut buffer = Vec::new();
    let saved = engine.save(&mut buffer);
    let loaded = ColonyEngine::load(&buffer[..]);

    match (saved, loaded) {
        (Ok(()), Ok(mut loaded)) => {
            let resumed = loaded.active_delivery_count() == 1;
            let (completed, _) = run_until_idle(&mut loaded, 5_000);
            results.push(TestResult {
                name: "save_load_resumes_delivery".into(),
                passed: resumed && completed == 1,
                detail: format!("{} bytes, {} delivery completed after load", buffer.len(), completed),
            });
        }
        (saved, loaded) => {
            results.push(TestResult {
                name: "save_load_resumes_delivery".into(),
                passed: false,
                detail: format!(
                    "save: {:?}, load: {:?}",
                    saved.err().map(|e| e.to_string()),
                    loaded.err().map(|e| e.to_string())
                ),
            });
        }
    }

    results
}
