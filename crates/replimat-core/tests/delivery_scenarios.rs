//! End-to-end scenarios: terminals, tanks and wardens running in the engine.
//!
//! Exercises: placement → availability → dispensing → delivery job
//! → drop, including the cases where the world changes under a running job.

use hecs::Entity;
use replimat_core::prelude::*;
use replimat_core::systems::{DeliveryHost, NO_TANKS_MESSAGE};

// ── Helpers ────────────────────────────────────────────────────────────

const NET: PowerNetId = PowerNetId(7);

/// Catalog with a single 3kg lavish meal at 1L/kg: every meal costs 3L
fn three_litre_engine() -> ColonyEngine {
    let config = ReplimatConfig {
        feedstock_litres_per_kg: 1.0,
        ..Default::default()
    };
    let catalog = FoodCatalog::new(vec![FoodDef::new(
        0,
        "lavish meal",
        3.0,
        FoodPreferability::MealLavish,
    )]);
    ColonyEngine::with_config(config, 1234).with_catalog(catalog)
}

struct Prison {
    engine: ColonyEngine,
    terminal: Entity,
    tank: Entity,
    warden: Entity,
    prisoner: Entity,
}

fn prison(stored: f32) -> Prison {
    let mut engine = three_litre_engine();
    let terminal = engine.spawn_terminal(Vec3::new(0.0, 0.0, 0.0), NET);
    let tank = engine.spawn_tank(Vec3::new(-2.0, 0.0, 0.0), NET, stored, 100.0);
    let warden = engine.spawn_pawn("Warden", Vec3::new(0.0, -3.0, 0.0));
    let prisoner = engine.spawn_prisoner("Prisoner", Vec3::new(4.0, -1.0, 0.0));
    Prison {
        engine,
        terminal,
        tank,
        warden,
        prisoner,
    }
}

fn stored(engine: &ColonyEngine, tank: Entity) -> f32 {
    engine.world.get::<&FeedTank>(tank).unwrap().stored
}

fn meal_count(engine: &ColonyEngine) -> usize {
    engine.world.query::<&Meal>().iter().count()
}

/// Tick until the pawn's delivery finishes
fn run_delivery(engine: &mut ColonyEngine, pawn: Entity) -> JobStatus {
    for _ in 0..2_000 {
        engine.update();
        if let Some((_, status)) = engine
            .take_job_results()
            .into_iter()
            .find(|(p, _)| *p == pawn)
        {
            return status;
        }
    }
    panic!("delivery did not finish");
}

/// Tick until the pawn's job reaches the given toil
fn run_until_toil(engine: &mut ColonyEngine, pawn: Entity, toil: replimat_core::systems::Toil) {
    for _ in 0..2_000 {
        let current = engine
            .deliveries()
            .iter()
            .find(|d| d.pawn() == pawn)
            .and_then(|d| d.current_toil());
        if current == Some(toil) {
            return;
        }
        engine.update();
    }
    panic!("job never reached {:?}", toil);
}

// ── Dispensing ─────────────────────────────────────────────────────────

#[test]
fn five_litres_make_one_three_litre_meal() {
    let mut p = prison(5.0);

    let (first, item) = p.engine.try_dispense(p.terminal).unwrap();
    assert!(first.is_produced());
    assert!(item.is_some());
    assert_eq!(stored(&p.engine, p.tank), 2.0);

    let (second, item) = p.engine.try_dispense(p.terminal).unwrap();
    assert_eq!(
        second,
        DispenseOutcome::Unavailable(Unavailable::InsufficientFeedstock {
            required: 3.0,
            available: 2.0,
        })
    );
    assert!(item.is_none());
    assert_eq!(stored(&p.engine, p.tank), 2.0);
    assert_eq!(meal_count(&p.engine), 1);
}

#[test]
fn dispensing_spreads_over_network_tanks() {
    let mut engine = three_litre_engine();
    let terminal = engine.spawn_terminal(Vec3::ZERO, NET);
    engine.spawn_tank(Vec3::ZERO, NET, 1.0, 10.0);
    engine.spawn_tank(Vec3::ZERO, NET, 4.0, 10.0);
    let elsewhere = engine.spawn_tank(Vec3::ZERO, PowerNetId(99), 10.0, 10.0);

    let (outcome, _) = engine.try_dispense(terminal).unwrap();
    assert!(outcome.is_produced());

    let summary = engine.network_feedstock(NET);
    assert_eq!(summary.tank_count, 2);
    assert!((summary.total - 2.0).abs() < 1e-6);
    assert_eq!(stored(&engine, elsewhere), 10.0);
}

#[test]
fn terminal_without_tanks_never_dispenses() {
    let mut engine = three_litre_engine();
    let terminal = engine.spawn_terminal(Vec3::ZERO, NET);

    assert!(!engine.can_dispense_now(terminal).unwrap());
    engine.set_powered(terminal, false).unwrap();
    assert!(!engine.can_dispense_now(terminal).unwrap());
    assert_eq!(engine.inspect_terminal(terminal).unwrap(), NO_TANKS_MESSAGE);
}

#[test]
fn repeated_dispensing_debits_exactly() {
    let mut engine = ColonyEngine::with_seed(77);
    let terminal = engine.spawn_terminal(Vec3::ZERO, NET);
    for stock in [0.3, 1.1, 2.5, 0.9] {
        engine.spawn_tank(Vec3::ZERO, NET, stock, 10.0);
    }
    let per_meal = 0.44 * engine.config.feedstock_litres_per_kg;

    let mut expected = engine.network_feedstock(NET).total;
    let mut made = 0;
    loop {
        let (outcome, _) = engine.try_dispense(terminal).unwrap();
        if !outcome.is_produced() {
            break;
        }
        made += 1;
        expected -= per_meal;
        assert!((engine.network_feedstock(NET).total - expected).abs() < 1e-4);
    }

    assert_eq!(made, 6);
    for tank in engine.tank_entities_on_net(NET) {
        assert!(stored(&engine, tank) >= 0.0);
    }
}

// ── Delivery ───────────────────────────────────────────────────────────

#[test]
fn warden_delivers_meal_from_terminal() {
    let mut p = prison(10.0);
    p.engine
        .assign_food_delivery(p.warden, p.terminal, p.prisoner)
        .unwrap();
    assert_eq!(
        p.engine.job_report(p.warden).unwrap(),
        "Delivering lavish meal to Prisoner."
    );

    assert_eq!(run_delivery(&mut p.engine, p.warden), JobStatus::Completed);

    assert_eq!(stored(&p.engine, p.tank), 7.0);
    assert!(p.engine.world.get::<&Carrying>(p.warden).is_err());
    let drop_spot = p.engine.world.get::<&Position>(p.prisoner).unwrap().0;
    let (_, (_, pos)) = p
        .engine
        .world
        .query::<(&Meal, &Position)>()
        .iter()
        .map(|(e, (m, pos))| (e, (m.clone(), *pos)))
        .next()
        .expect("meal on the ground");
    assert_eq!(pos.0, drop_spot);
    assert_eq!(p.engine.reservations().count(), 0);
}

#[test]
fn terminal_emptied_before_pickup_aborts_cleanly() {
    let mut p = prison(10.0);
    p.engine
        .assign_food_delivery(p.warden, p.terminal, p.prisoner)
        .unwrap();

    run_until_toil(
        &mut p.engine,
        p.warden,
        replimat_core::systems::Toil::GotoTerminal,
    );
    // Someone drains the tank while the warden is walking over
    p.engine.world.get::<&mut FeedTank>(p.tank).unwrap().stored = 1.0;

    let status = run_delivery(&mut p.engine, p.warden);
    assert!(matches!(
        status,
        JobStatus::Failed(JobFailure::TerminalUnavailable(
            Unavailable::InsufficientFeedstock { .. }
        ))
    ));
    assert_eq!(stored(&p.engine, p.tank), 1.0);
    assert!(p.engine.world.get::<&Carrying>(p.warden).is_err());
    assert_eq!(meal_count(&p.engine), 0);
    assert_eq!(p.engine.reservations().count(), 0);
}

#[test]
fn released_prisoner_cancels_delivery() {
    let mut p = prison(10.0);
    p.engine
        .assign_food_delivery(p.warden, p.terminal, p.prisoner)
        .unwrap();

    run_until_toil(
        &mut p.engine,
        p.warden,
        replimat_core::systems::Toil::GotoDeliveree,
    );
    p.engine
        .world
        .get::<&mut Prisoner>(p.prisoner)
        .unwrap()
        .can_be_brought_food = false;

    assert_eq!(
        run_delivery(&mut p.engine, p.warden),
        JobStatus::Failed(JobFailure::DelivereeInvalid)
    );
    // The meal was already made; the warden keeps it
    assert!(p.engine.world.get::<&Carrying>(p.warden).is_ok());
    assert_eq!(stored(&p.engine, p.tank), 7.0);
}

#[test]
fn forbidden_terminal_is_not_used() {
    let mut p = prison(10.0);
    p.engine.set_forbidden(p.terminal, true).unwrap();
    p.engine
        .assign_food_delivery(p.warden, p.terminal, p.prisoner)
        .unwrap();

    assert_eq!(
        run_delivery(&mut p.engine, p.warden),
        JobStatus::Failed(JobFailure::FoodSourceUnavailable)
    );
    assert_eq!(stored(&p.engine, p.tank), 10.0);
}

#[test]
fn second_warden_cannot_claim_same_prisoner() {
    let mut p = prison(10.0);
    let other = p.engine.spawn_pawn("Other", Vec3::new(1.0, -3.0, 0.0));

    p.engine
        .assign_food_delivery(p.warden, p.terminal, p.prisoner)
        .unwrap();
    p.engine.update();
    p.engine
        .assign_food_delivery(other, p.terminal, p.prisoner)
        .unwrap();

    assert_eq!(
        run_delivery(&mut p.engine, other),
        JobStatus::Failed(JobFailure::ReservationDenied)
    );
    assert_eq!(run_delivery(&mut p.engine, p.warden), JobStatus::Completed);
}

#[test]
fn meal_from_inventory_skips_terminal() {
    let mut p = prison(10.0);
    let meal = p
        .engine
        .spawn_meal_in_inventory(p.warden, FoodDefId(0))
        .unwrap();
    assert!(p.engine.inventory_contains(p.warden, meal));

    p.engine
        .assign_food_delivery(p.warden, meal, p.prisoner)
        .unwrap();
    assert!(p.engine.deliveries()[0].from_inventory());

    assert_eq!(run_delivery(&mut p.engine, p.warden), JobStatus::Completed);
    assert_eq!(stored(&p.engine, p.tank), 10.0);
    assert!(!p.engine.inventory_contains(p.warden, meal));
    assert!(p.engine.world.get::<&Position>(meal).is_ok());
}

#[test]
fn food_not_held_is_rejected_up_front() {
    let mut p = prison(10.0);
    let (_, loose) = p.engine.try_dispense(p.terminal).unwrap();

    let err = p
        .engine
        .assign_food_delivery(p.warden, loose.unwrap(), p.prisoner)
        .unwrap_err();
    assert!(matches!(
        err,
        replimat_core::engine::EngineError::JobRejected(JobFailure::FoodSourceUnavailable)
    ));
    assert_eq!(p.engine.active_delivery_count(), 0);
}
