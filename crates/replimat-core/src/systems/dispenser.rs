//! Replimat terminal behaviour - availability checks, meal selection,
//! dispensing and the per-tick countdown.
//!
//! The methods on [`ReplimatTerminal`] take the connected tanks and the
//! terminal's power state as arguments. The free functions at the bottom
//! gather those from a [`World`] and call in.

use hecs::{Entity, World};
use rand::seq::IteratorRandom;
use rand::Rng;

use super::feedstock::{consume_feedstock, mass_to_feedstock_volume, summarize, FeedstockSource, FeedstockSummary};
use crate::components::{
    FeedTank, FoodCatalog, FoodDefId, FoodPreferability, Meal, MealFilter, PowerNetId, PowerTrader,
    ReplimatTerminal,
};
use crate::config::ReplimatConfig;

/// Inspect line shown when no tank shares the terminal's network
pub const NO_TANKS_MESSAGE: &str = "Requires connection to Replimat Feedstock Tank";
/// Inspect line shown when the tanks cannot cover a meal
pub const INSUFFICIENT_FEEDSTOCK_MESSAGE: &str = "Insufficient Feedstock";

/// Result of asking a terminal for a meal
#[derive(Debug, Clone, PartialEq)]
pub enum DispenseOutcome {
    /// A meal was made and its feedstock debited
    Produced(Meal),
    /// Nothing was made and no tank was touched
    Unavailable(Unavailable),
}

impl DispenseOutcome {
    pub fn is_produced(&self) -> bool {
        matches!(self, DispenseOutcome::Produced(_))
    }

    pub fn meal(self) -> Option<Meal> {
        match self {
            DispenseOutcome::Produced(meal) => Some(meal),
            DispenseOutcome::Unavailable(_) => None,
        }
    }
}

/// Why a terminal could not dispense
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Unavailable {
    Unpowered,
    NoTanks,
    InsufficientFeedstock { required: f32, available: f32 },
    NoEligibleFood,
}

impl std::fmt::Display for Unavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unavailable::Unpowered => write!(f, "terminal is unpowered"),
            Unavailable::NoTanks => write!(f, "no feedstock tanks connected"),
            Unavailable::InsufficientFeedstock { required, available } => write!(
                f,
                "insufficient feedstock: {:.2}L required, {:.2}L available",
                required, available
            ),
            Unavailable::NoEligibleFood => write!(f, "no allowed food at the selected tier"),
        }
    }
}

/// No allowed food type sits at the terminal's preferability tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionError {
    pub preferability: FoodPreferability,
}

impl std::fmt::Display for SelectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no allowed food with preferability {:?}", self.preferability)
    }
}

impl std::error::Error for SelectionError {}

impl ReplimatTerminal {
    /// Placement: adopt the default filter, check the network, pick a meal
    pub fn spawn_setup<S, R>(
        &mut self,
        default_filter: &MealFilter,
        catalog: &FoodCatalog,
        tanks: &[S],
        config: &ReplimatConfig,
        rng: &mut R,
    ) where
        S: FeedstockSource,
        R: Rng + ?Sized,
    {
        self.meal_filter.copy_from(default_filter);
        if let Err(e) = self.choose_meal(catalog, rng) {
            log::warn!("Replimat: {}", e);
        }
        let probe = self.probe_volume(catalog, config);
        self.refresh_availability(tanks, probe);
    }

    /// Recompute `has_tanks` and `has_enough_feedstock` for `required` litres
    pub fn refresh_availability<S: FeedstockSource>(
        &mut self,
        tanks: &[S],
        required: f32,
    ) -> FeedstockSummary {
        let summary = summarize(tanks);
        log::debug!(
            "Replimat: {} feedstock available across {} tanks",
            summary.total,
            summary.tank_count
        );
        self.has_tanks = summary.tank_count > 0;
        self.has_enough_feedstock = summary.total >= required;
        summary
    }

    /// Feedstock the currently selected meal needs
    pub fn probe_volume(&self, catalog: &FoodCatalog, config: &ReplimatConfig) -> f32 {
        self.selected_food
            .and_then(|id| catalog.get(id))
            .map(|def| mass_to_feedstock_volume(def.base_mass, config.feedstock_litres_per_kg))
            .unwrap_or(config.minimum_probe_volume)
    }

    /// Refreshes availability, then reports whether a meal could be made
    pub fn can_dispense_now<S: FeedstockSource>(
        &mut self,
        powered: bool,
        tanks: &[S],
        catalog: &FoodCatalog,
        config: &ReplimatConfig,
    ) -> bool {
        let probe = self.probe_volume(catalog, config);
        self.refresh_availability(tanks, probe);
        powered && self.has_tanks && self.has_enough_feedstock
    }

    /// Pick uniformly among allowed foods at exactly `max_preferability`
    pub fn choose_meal<R: Rng + ?Sized>(
        &mut self,
        catalog: &FoodCatalog,
        rng: &mut R,
    ) -> Result<FoodDefId, SelectionError> {
        let chosen = catalog
            .iter()
            .filter(|def| self.meal_filter.allows(def.id))
            .filter(|def| def.preferability == self.max_preferability)
            .map(|def| def.id)
            .choose(rng)
            .ok_or(SelectionError {
                preferability: self.max_preferability,
            })?;
        self.selected_food = Some(chosen);
        Ok(chosen)
    }

    /// Start the dispense glow if a meal could be made right now.
    /// Returns whether the countdown was (re)started.
    pub fn begin_dispense_animation<S: FeedstockSource>(
        &mut self,
        powered: bool,
        tanks: &[S],
        catalog: &FoodCatalog,
        config: &ReplimatConfig,
    ) -> bool {
        if !self.can_dispense_now(powered, tanks, catalog, config) {
            return false;
        }
        self.start_countdown(config);
        true
    }

    /// Make the selected meal: verify the network covers it, debit the
    /// tanks and hand the meal back. Either everything happens or nothing
    /// does. The next meal is picked right after, so probes made before the
    /// next dispense check the meal that will actually be produced.
    pub fn try_produce_food<S, R>(
        &mut self,
        powered: bool,
        tanks: &mut [S],
        catalog: &FoodCatalog,
        config: &ReplimatConfig,
        rng: &mut R,
    ) -> DispenseOutcome
    where
        S: FeedstockSource,
        R: Rng + ?Sized,
    {
        if !powered {
            return DispenseOutcome::Unavailable(Unavailable::Unpowered);
        }

        let id = match self.selected_food.filter(|id| self.is_eligible(*id, catalog)) {
            Some(id) => id,
            None => match self.choose_meal(catalog, rng) {
                Ok(id) => id,
                Err(e) => {
                    log::warn!("Replimat: {}", e);
                    return DispenseOutcome::Unavailable(Unavailable::NoEligibleFood);
                }
            },
        };
        let Some(def) = catalog.get(id) else {
            return DispenseOutcome::Unavailable(Unavailable::NoEligibleFood);
        };

        let required = mass_to_feedstock_volume(def.base_mass, config.feedstock_litres_per_kg);
        let summary = self.refresh_availability(tanks, required);
        if !self.has_tanks {
            return DispenseOutcome::Unavailable(Unavailable::NoTanks);
        }
        if !self.has_enough_feedstock {
            return DispenseOutcome::Unavailable(Unavailable::InsufficientFeedstock {
                required,
                available: summary.total,
            });
        }

        log::debug!(
            "Replimat: {} has mass of {}kg ({}L feedstock required)",
            def.label,
            def.base_mass,
            required
        );
        if consume_feedstock(tanks, required, rng).is_err() {
            return DispenseOutcome::Unavailable(Unavailable::NoTanks);
        }
        let meal = Meal::from_def(def);

        if let Err(e) = self.choose_meal(catalog, rng) {
            log::warn!("Replimat: {}", e);
        }
        let probe = self.probe_volume(catalog, config);
        self.refresh_availability(tanks, probe);
        DispenseOutcome::Produced(meal)
    }

    /// Allowed by the filter and at exactly the configured tier
    fn is_eligible(&self, id: FoodDefId, catalog: &FoodCatalog) -> bool {
        self.meal_filter.allows(id)
            && catalog
                .get(id)
                .is_some_and(|def| def.preferability == self.max_preferability)
    }

    /// Restart the glow for a meal that was just made
    pub fn start_countdown(&mut self, config: &ReplimatConfig) {
        self.replicating_ticks = config.collect_duration_ticks();
    }

    /// Advance the dispense countdown by one tick
    pub fn tick(&mut self) {
        self.replicating_ticks = self.replicating_ticks.saturating_sub(1);
    }

    /// Watts the terminal draws in its current state
    pub fn power_draw(&self, config: &ReplimatConfig) -> f32 {
        if self.is_dispensing() {
            config.dispensing_power_draw
        } else {
            config.idle_power_draw
        }
    }

    /// Opacity of the dispense glow: fades in over the first quarter of the
    /// countdown, holds, fades out over the last quarter
    pub fn glow_alpha(&self, duration_ticks: u32) -> f32 {
        if !self.is_dispensing() {
            return 0.0;
        }
        let duration = duration_ticks as f32;
        let quart = duration * 0.25;
        if quart <= 0.0 {
            return 1.0;
        }
        let ticks = self.replicating_ticks as f32;
        if ticks < quart {
            (ticks / quart).clamp(0.0, 1.0)
        } else if ticks > quart * 3.0 {
            ((duration - ticks) / quart).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    /// Advisory lines for the inspect pane, from the cached flags
    pub fn inspect_lines(&self) -> Vec<&'static str> {
        let mut lines = Vec::new();
        if !self.has_tanks {
            lines.push(NO_TANKS_MESSAGE);
        } else if !self.has_enough_feedstock {
            lines.push(INSUFFICIENT_FEEDSTOCK_MESSAGE);
        }
        lines
    }

    pub fn inspect_string(&self) -> String {
        self.inspect_lines().join("\n")
    }
}

/// Tank entities sharing the given power network
pub fn tank_entities_on_net(world: &World, net: PowerNetId) -> Vec<Entity> {
    world
        .query::<(&FeedTank, &PowerTrader)>()
        .iter()
        .filter(|(_, (_, power))| power.net == net)
        .map(|(entity, _)| entity)
        .collect()
}

/// Tank count and total feedstock on a network
pub fn network_feedstock(world: &World, net: PowerNetId) -> FeedstockSummary {
    summarize(&tank_snapshot(world, net))
}

/// Copies of the tanks on a network, for read-only checks
fn tank_snapshot(world: &World, net: PowerNetId) -> Vec<FeedTank> {
    world
        .query::<(&FeedTank, &PowerTrader)>()
        .iter()
        .filter(|(_, (_, power))| power.net == net)
        .map(|(_, (tank, _))| *tank)
        .collect()
}

/// Run placement setup for a terminal already spawned in the world
pub fn setup_terminal<R: Rng + ?Sized>(
    world: &World,
    terminal: Entity,
    catalog: &FoodCatalog,
    config: &ReplimatConfig,
    rng: &mut R,
) -> Result<(), hecs::ComponentError> {
    let power = *world.get::<&PowerTrader>(terminal)?;
    let mut replimat = world.get::<&mut ReplimatTerminal>(terminal)?;
    let tanks = tank_snapshot(world, power.net);

    let defaults = catalog.default_meal_filter();
    replimat.spawn_setup(&defaults, catalog, &tanks[..], config, rng);
    Ok(())
}

/// `can_dispense_now` for a terminal in the world
pub fn terminal_can_dispense(
    world: &World,
    terminal: Entity,
    catalog: &FoodCatalog,
    config: &ReplimatConfig,
) -> Result<bool, hecs::ComponentError> {
    let power = *world.get::<&PowerTrader>(terminal)?;
    let mut replimat = world.get::<&mut ReplimatTerminal>(terminal)?;
    let tanks = tank_snapshot(world, power.net);

    Ok(replimat.can_dispense_now(power.power_on, &tanks[..], catalog, config))
}

/// Make a meal from the terminal's network and play the dispense glow for
/// it. The meal is returned, not spawned.
pub fn dispense_from_terminal<R: Rng + ?Sized>(
    world: &World,
    terminal: Entity,
    catalog: &FoodCatalog,
    config: &ReplimatConfig,
    rng: &mut R,
) -> Result<DispenseOutcome, hecs::ComponentError> {
    let power = *world.get::<&PowerTrader>(terminal)?;
    let mut replimat = world.get::<&mut ReplimatTerminal>(terminal)?;
    let mut query = world.query::<(&mut FeedTank, &PowerTrader)>();
    let mut tanks: Vec<&mut FeedTank> = query
        .iter()
        .filter(|(_, (_, p))| p.net == power.net)
        .map(|(_, (tank, _))| tank)
        .collect();

    let outcome = replimat.try_produce_food(power.power_on, &mut tanks[..], catalog, config, rng);
    if outcome.is_produced() {
        replimat.start_countdown(config);
    }
    Ok(outcome)
}

/// Per-tick terminal update: power draw from the countdown, then countdown
pub fn terminal_tick_system(world: &mut World, config: &ReplimatConfig) {
    for (_, (terminal, power)) in world.query_mut::<(&mut ReplimatTerminal, &mut PowerTrader)>() {
        power.power_output = -terminal.power_draw(config);
        terminal.tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{FoodDef, Position, Vec3};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// One lavish meal weighing 3kg at 1L/kg, so each meal costs 3L
    fn heavy_meal_setup() -> (FoodCatalog, ReplimatConfig, ReplimatTerminal) {
        let catalog = FoodCatalog::new(vec![
            FoodDef::new(0, "lavish meal", 3.0, FoodPreferability::MealLavish),
            FoodDef::new(1, "simple meal", 1.0, FoodPreferability::MealSimple),
        ]);
        let config = ReplimatConfig {
            feedstock_litres_per_kg: 1.0,
            ..Default::default()
        };
        let mut terminal = ReplimatTerminal::new(FoodPreferability::MealLavish);
        terminal.meal_filter = catalog.default_meal_filter();
        (catalog, config, terminal)
    }

    fn total(tanks: &[FeedTank]) -> f32 {
        tanks.iter().map(|t| t.stored).sum()
    }

    #[test]
    fn test_refresh_sets_flags() {
        let (_, _, mut terminal) = heavy_meal_setup();

        let none: Vec<FeedTank> = Vec::new();
        terminal.refresh_availability(&none, 1.0);
        assert!(!terminal.has_tanks);
        assert!(!terminal.has_enough_feedstock);

        let tanks = vec![FeedTank::new(0.5, 10.0), FeedTank::new(0.5, 10.0)];
        terminal.refresh_availability(&tanks, 1.0);
        assert!(terminal.has_tanks);
        assert!(terminal.has_enough_feedstock);

        terminal.refresh_availability(&tanks, 1.5);
        assert!(!terminal.has_enough_feedstock);
    }

    #[test]
    fn test_cannot_dispense_without_tanks_even_when_powered() {
        let (catalog, config, mut terminal) = heavy_meal_setup();
        let none: Vec<FeedTank> = Vec::new();

        assert!(!terminal.can_dispense_now(true, &none, &catalog, &config));
        assert!(!terminal.can_dispense_now(false, &none, &catalog, &config));
    }

    #[test]
    fn test_probe_uses_selected_meal() {
        let (catalog, config, mut terminal) = heavy_meal_setup();
        let tanks = vec![FeedTank::new(2.0, 10.0)];

        // Nothing selected: falls back to the 1L probe
        assert!(terminal.can_dispense_now(true, &tanks, &catalog, &config));

        // A 3L meal does not fit in 2L
        terminal.selected_food = Some(FoodDefId(0));
        assert!(!terminal.can_dispense_now(true, &tanks, &catalog, &config));
        assert_eq!(terminal.inspect_string(), INSUFFICIENT_FEEDSTOCK_MESSAGE);
    }

    #[test]
    fn test_choose_meal_exact_tier_only() {
        let catalog = FoodCatalog::default();
        let mut terminal = ReplimatTerminal::new(FoodPreferability::MealFine);
        terminal.meal_filter = catalog.default_meal_filter();
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..20 {
            let id = terminal.choose_meal(&catalog, &mut rng).unwrap();
            let def = catalog.get(id).unwrap();
            assert_eq!(def.preferability, FoodPreferability::MealFine);
            assert_eq!(terminal.selected_food, Some(id));
        }
    }

    #[test]
    fn test_choose_meal_reports_empty_tier() {
        let catalog = FoodCatalog::default();
        let mut terminal = ReplimatTerminal::new(FoodPreferability::MealLavish);
        // Filter allows only the simple meal
        terminal.meal_filter.set_allowed(FoodDefId(1), true);
        let mut rng = StdRng::seed_from_u64(5);

        let err = terminal.choose_meal(&catalog, &mut rng).unwrap_err();
        assert_eq!(err.preferability, FoodPreferability::MealLavish);
        assert!(terminal.selected_food.is_none());
    }

    #[test]
    fn test_produce_then_run_dry() {
        let (catalog, config, mut terminal) = heavy_meal_setup();
        let mut rng = StdRng::seed_from_u64(2);
        let mut tanks = vec![FeedTank::new(5.0, 10.0)];

        let first = terminal.try_produce_food(true, &mut tanks, &catalog, &config, &mut rng);
        assert_eq!(first.meal().map(|m| m.label), Some("lavish meal".to_string()));
        assert_eq!(total(&tanks), 2.0);

        let second = terminal.try_produce_food(true, &mut tanks, &catalog, &config, &mut rng);
        assert_eq!(
            second,
            DispenseOutcome::Unavailable(Unavailable::InsufficientFeedstock {
                required: 3.0,
                available: 2.0
            })
        );
        assert_eq!(total(&tanks), 2.0);
    }

    #[test]
    fn test_produce_is_all_or_nothing() {
        let (catalog, config, mut terminal) = heavy_meal_setup();
        let mut rng = StdRng::seed_from_u64(8);

        let mut unpowered = vec![FeedTank::new(10.0, 10.0)];
        let outcome = terminal.try_produce_food(false, &mut unpowered, &catalog, &config, &mut rng);
        assert_eq!(outcome, DispenseOutcome::Unavailable(Unavailable::Unpowered));
        assert_eq!(total(&unpowered), 10.0);

        let mut none: Vec<FeedTank> = Vec::new();
        let outcome = terminal.try_produce_food(true, &mut none, &catalog, &config, &mut rng);
        assert_eq!(outcome, DispenseOutcome::Unavailable(Unavailable::NoTanks));

        terminal.meal_filter = MealFilter::default();
        let mut full = vec![FeedTank::new(10.0, 10.0)];
        let outcome = terminal.try_produce_food(true, &mut full, &catalog, &config, &mut rng);
        assert_eq!(outcome, DispenseOutcome::Unavailable(Unavailable::NoEligibleFood));
        assert_eq!(total(&full), 10.0);
    }

    #[test]
    fn test_countdown_and_power_draw() {
        let (catalog, config, mut terminal) = heavy_meal_setup();
        let tanks = vec![FeedTank::new(10.0, 10.0)];

        assert_eq!(terminal.power_draw(&config), 125.0);
        assert!(terminal.begin_dispense_animation(true, &tanks, &catalog, &config));
        assert_eq!(terminal.replicating_ticks, 120);
        assert_eq!(terminal.power_draw(&config), 1500.0);

        for expected in (0..120).rev() {
            terminal.tick();
            assert_eq!(terminal.replicating_ticks, expected);
        }
        terminal.tick();
        assert_eq!(terminal.replicating_ticks, 0);
        assert_eq!(terminal.power_draw(&config), 125.0);
    }

    #[test]
    fn test_animation_needs_dispensable_state() {
        let (catalog, config, mut terminal) = heavy_meal_setup();
        let tanks = vec![FeedTank::new(10.0, 10.0)];

        assert!(!terminal.begin_dispense_animation(false, &tanks, &catalog, &config));
        assert_eq!(terminal.replicating_ticks, 0);

        // Restart mid-dispense resets to the full duration
        assert!(terminal.begin_dispense_animation(true, &tanks, &catalog, &config));
        for _ in 0..50 {
            terminal.tick();
        }
        assert!(terminal.begin_dispense_animation(true, &tanks, &catalog, &config));
        assert_eq!(terminal.replicating_ticks, config.collect_duration_ticks());
    }

    #[test]
    fn test_glow_alpha_envelope() {
        let mut terminal = ReplimatTerminal::new(FoodPreferability::MealLavish);
        assert_eq!(terminal.glow_alpha(120), 0.0);

        terminal.replicating_ticks = 120;
        assert_eq!(terminal.glow_alpha(120), 0.0);
        terminal.replicating_ticks = 105;
        assert!((terminal.glow_alpha(120) - 0.5).abs() < 1e-6);
        terminal.replicating_ticks = 60;
        assert_eq!(terminal.glow_alpha(120), 1.0);
        terminal.replicating_ticks = 15;
        assert!((terminal.glow_alpha(120) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_inspect_lines() {
        let mut terminal = ReplimatTerminal::new(FoodPreferability::MealLavish);
        assert_eq!(terminal.inspect_lines(), vec![NO_TANKS_MESSAGE]);

        terminal.has_tanks = true;
        terminal.has_enough_feedstock = true;
        assert!(terminal.inspect_string().is_empty());
    }

    #[test]
    fn test_world_dispense_only_touches_own_network() {
        let (catalog, config, _) = heavy_meal_setup();
        let mut rng = StdRng::seed_from_u64(3);
        let mut world = World::new();

        let mut terminal = ReplimatTerminal::new(FoodPreferability::MealLavish);
        terminal.meal_filter = catalog.default_meal_filter();
        let replimat = world.spawn((
            Position(Vec3::ZERO),
            PowerTrader::new(PowerNetId(1)),
            terminal,
        ));
        let ours = world.spawn((FeedTank::new(4.0, 10.0), PowerTrader::new(PowerNetId(1))));
        let theirs = world.spawn((FeedTank::new(9.0, 10.0), PowerTrader::new(PowerNetId(2))));

        assert_eq!(tank_entities_on_net(&world, PowerNetId(1)), vec![ours]);
        assert!(terminal_can_dispense(&world, replimat, &catalog, &config).unwrap());

        let outcome = dispense_from_terminal(&world, replimat, &catalog, &config, &mut rng).unwrap();
        assert!(outcome.is_produced());
        assert_eq!(world.get::<&FeedTank>(ours).unwrap().stored, 1.0);
        assert_eq!(world.get::<&FeedTank>(theirs).unwrap().stored, 9.0);
        assert!(world.get::<&ReplimatTerminal>(replimat).unwrap().is_dispensing());

        let summary = network_feedstock(&world, PowerNetId(2));
        assert_eq!(summary.tank_count, 1);
        assert_eq!(summary.total, 9.0);
    }

    #[test]
    fn test_glow_follows_meal_with_mixed_masses() {
        // Two lavish meals at 1L and 3L, network holds 2L
        let catalog = FoodCatalog::new(vec![
            FoodDef::new(0, "light lavish meal", 1.0, FoodPreferability::MealLavish),
            FoodDef::new(1, "heavy lavish meal", 3.0, FoodPreferability::MealLavish),
        ]);
        let config = ReplimatConfig {
            feedstock_litres_per_kg: 1.0,
            ..Default::default()
        };

        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut world = World::new();
            let replimat = world.spawn((
                Position(Vec3::ZERO),
                PowerTrader::new(PowerNetId(1)),
                ReplimatTerminal::new(FoodPreferability::MealLavish),
            ));
            let tank = world.spawn((FeedTank::new(2.0, 10.0), PowerTrader::new(PowerNetId(1))));
            setup_terminal(&world, replimat, &catalog, &config, &mut rng).unwrap();

            let predicted = terminal_can_dispense(&world, replimat, &catalog, &config).unwrap();
            let outcome = dispense_from_terminal(&world, replimat, &catalog, &config, &mut rng).unwrap();
            let terminal = world.get::<&ReplimatTerminal>(replimat).unwrap();

            assert_eq!(predicted, outcome.is_produced(), "seed {}", seed);
            assert_eq!(terminal.is_dispensing(), outcome.is_produced(), "seed {}", seed);
            let expected = if outcome.is_produced() { 1.0 } else { 2.0 };
            assert_eq!(world.get::<&FeedTank>(tank).unwrap().stored, expected);
        }
    }

    #[test]
    fn test_produce_keeps_selected_meal_and_picks_next() {
        let catalog = FoodCatalog::new(vec![
            FoodDef::new(0, "light lavish meal", 1.0, FoodPreferability::MealLavish),
            FoodDef::new(1, "heavy lavish meal", 3.0, FoodPreferability::MealLavish),
        ]);
        let config = ReplimatConfig {
            feedstock_litres_per_kg: 1.0,
            ..Default::default()
        };
        let mut terminal = ReplimatTerminal::new(FoodPreferability::MealLavish);
        terminal.meal_filter = catalog.default_meal_filter();
        let mut rng = StdRng::seed_from_u64(4);
        let mut tanks = vec![FeedTank::new(100.0, 100.0)];

        for _ in 0..10 {
            let selected = terminal.selected_food;
            let before = total(&tanks);
            let meal = terminal
                .try_produce_food(true, &mut tanks, &catalog, &config, &mut rng)
                .meal()
                .unwrap();
            if let Some(id) = selected {
                assert_eq!(meal.def, id);
            }
            assert_eq!(before - total(&tanks), meal.mass);
            assert!(terminal.selected_food.is_some());
        }
    }

    #[test]
    fn test_tick_system_sets_power_output() {
        let config = ReplimatConfig::default();
        let mut world = World::new();
        let mut terminal = ReplimatTerminal::new(FoodPreferability::MealLavish);
        terminal.replicating_ticks = 1;
        let entity = world.spawn((PowerTrader::new(PowerNetId(1)), terminal));

        terminal_tick_system(&mut world, &config);
        assert_eq!(world.get::<&PowerTrader>(entity).unwrap().power_output, -1500.0);

        terminal_tick_system(&mut world, &config);
        assert_eq!(world.get::<&PowerTrader>(entity).unwrap().power_output, -125.0);
        assert_eq!(world.get::<&ReplimatTerminal>(entity).unwrap().replicating_ticks, 0);
    }
}
