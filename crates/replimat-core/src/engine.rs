//! Simulation engine - owns the world and plays host to terminals and jobs

use std::collections::HashMap;

use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::components::*;
use crate::config::ReplimatConfig;
use crate::systems::*;

/// Finished-job outcomes kept for `take_job_results`; older ones are dropped
pub const MAX_JOB_RESULTS: usize = 256;

/// Main simulation engine
pub struct ColonyEngine {
    /// ECS world containing all entities
    pub world: World,
    /// Known food types
    pub catalog: FoodCatalog,
    pub config: ReplimatConfig,
    /// Ticks simulated since start
    pub ticks: u64,
    seed: u64,
    rng: StdRng,
    /// Reserved target -> claimant
    reservations: HashMap<Entity, Entity>,
    /// Active food deliveries
    deliveries: Vec<FoodDeliveryDriver>,
    /// Finished deliveries not yet collected: (pawn, outcome).
    /// Holds at most `MAX_JOB_RESULTS`.
    job_results: Vec<(Entity, JobStatus)>,
}

impl ColonyEngine {
    /// Create an empty simulation with a random seed
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Create an empty simulation with deterministic randomness
    pub fn with_seed(seed: u64) -> Self {
        Self::with_config(ReplimatConfig::default(), seed)
    }

    pub fn with_config(config: ReplimatConfig, seed: u64) -> Self {
        Self {
            world: World::new(),
            catalog: FoodCatalog::default(),
            config,
            ticks: 0,
            seed,
            rng: StdRng::seed_from_u64(seed),
            reservations: HashMap::new(),
            deliveries: Vec::new(),
            job_results: Vec::new(),
        }
    }

    pub fn with_catalog(mut self, catalog: FoodCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Continue a loaded game: restore the tick count and move the
    /// random stream off the fresh-game sequence
    pub(crate) fn resume_at(&mut self, ticks: u64) {
        self.ticks = ticks;
        self.rng = StdRng::seed_from_u64(self.seed ^ ticks);
    }

    /// Save simulation state to a writer
    pub fn save<W: std::io::Write>(&self, writer: W) -> Result<(), crate::persistence::SaveError> {
        crate::persistence::save_engine(writer, self)
    }

    /// Load simulation state from a reader
    pub fn load<R: std::io::Read>(reader: R) -> Result<Self, crate::persistence::SaveError> {
        crate::persistence::load_engine(reader)
    }

    /// Advance the simulation by one tick
    pub fn update(&mut self) {
        self.ticks += 1;

        terminal_tick_system(&mut self.world, &self.config);
        movement_system(&mut self.world);
        self.delivery_system();
    }

    /// Step every active delivery once and drop the finished ones
    fn delivery_system(&mut self) {
        let mut deliveries = std::mem::take(&mut self.deliveries);
        let mut finished = Vec::new();

        deliveries.retain_mut(|driver| match driver.step(self) {
            JobStatus::Running => true,
            JobStatus::Completed => {
                finished.push((driver.pawn(), JobStatus::Completed));
                log::info!(
                    "{} delivered food to {}",
                    self.pawn_label(driver.pawn()).unwrap_or_default(),
                    self.pawn_label(driver.job().deliveree).unwrap_or_default()
                );
                false
            }
            JobStatus::Failed(failure) => {
                finished.push((driver.pawn(), JobStatus::Failed(failure)));
                log::warn!(
                    "Food delivery by {} failed: {}",
                    self.pawn_label(driver.pawn()).unwrap_or_default(),
                    failure
                );
                false
            }
        });

        // Keep anything queued while stepping
        deliveries.append(&mut self.deliveries);
        self.deliveries = deliveries;
        self.record_job_results(finished);
    }

    fn record_job_results(&mut self, finished: Vec<(Entity, JobStatus)>) {
        self.job_results.extend(finished);
        let overflow = self.job_results.len().saturating_sub(MAX_JOB_RESULTS);
        if overflow > 0 {
            self.job_results.drain(..overflow);
        }
    }

    /// Outcomes of deliveries finished since the last call, oldest first.
    /// Callers that never drain this only see the latest `MAX_JOB_RESULTS`.
    pub fn take_job_results(&mut self) -> Vec<(Entity, JobStatus)> {
        std::mem::take(&mut self.job_results)
    }

    // ── Spawning ────────────────────────────────────────────────────────

    /// Place a terminal and run its placement setup
    pub fn spawn_terminal(&mut self, position: Vec3, net: PowerNetId) -> Entity {
        let terminal = ReplimatTerminal::new(self.config.max_preferability);
        let entity = self
            .world
            .spawn((Position(position), PowerTrader::new(net), terminal));

        if let Err(e) = setup_terminal(&self.world, entity, &self.catalog, &self.config, &mut self.rng) {
            log::error!("Replimat: terminal setup failed: {}", e);
        }
        entity
    }

    pub fn spawn_tank(&mut self, position: Vec3, net: PowerNetId, stored: f32, capacity: f32) -> Entity {
        self.world.spawn((
            Position(position),
            PowerTrader::new(net),
            FeedTank::new(stored, capacity),
        ))
    }

    pub fn spawn_pawn(&mut self, name: &str, position: Vec3) -> Entity {
        self.world
            .spawn((Pawn::new(name), Position(position), Inventory::default()))
    }

    pub fn spawn_prisoner(&mut self, name: &str, position: Vec3) -> Entity {
        let entity = self.spawn_pawn(name, position);
        let _ = self.world.insert_one(entity, Prisoner::default());
        entity
    }

    /// Put a fresh meal of the given type in a pawn's pack
    pub fn spawn_meal_in_inventory(&mut self, pawn: Entity, food: FoodDefId) -> Result<Entity, EngineError> {
        let meal = self
            .catalog
            .get(food)
            .map(Meal::from_def)
            .ok_or(EngineError::UnknownFood(food))?;
        if !self.world.contains(pawn) {
            return Err(EngineError::NoSuchEntity);
        }
        let item = self.world.spawn((meal,));
        self.world.get::<&mut Inventory>(pawn)?.items.push(item);
        Ok(item)
    }

    // ── Jobs ────────────────────────────────────────────────────────────

    /// Give a pawn a food delivery job. The meal is dropped where the
    /// deliveree stands now.
    pub fn assign_food_delivery(
        &mut self,
        pawn: Entity,
        food_source: Entity,
        deliveree: Entity,
    ) -> Result<(), EngineError> {
        let drop_position = self.world.get::<&Position>(deliveree)?.0;
        let job = FoodDeliveryJob {
            food_source,
            deliveree,
            drop_position,
        };
        let driver = FoodDeliveryDriver::start(pawn, job, &*self).map_err(EngineError::JobRejected)?;
        self.deliveries.retain(|d| d.pawn() != pawn);
        self.deliveries.push(driver);
        Ok(())
    }

    pub fn active_delivery_count(&self) -> usize {
        self.deliveries.len()
    }

    pub fn deliveries(&self) -> &[FoodDeliveryDriver] {
        &self.deliveries
    }

    pub(crate) fn restore_delivery(&mut self, driver: FoodDeliveryDriver) {
        self.deliveries.push(driver);
    }

    /// Status line of the pawn's current delivery
    pub fn job_report(&self, pawn: Entity) -> Option<String> {
        self.deliveries
            .iter()
            .find(|d| d.pawn() == pawn)
            .map(|d| d.report(self))
    }

    pub fn reservations(&self) -> impl Iterator<Item = (Entity, Entity)> + '_ {
        self.reservations.iter().map(|(target, claimant)| (*target, *claimant))
    }

    pub(crate) fn restore_reservation(&mut self, target: Entity, claimant: Entity) {
        self.reservations.insert(target, claimant);
    }

    // ── Terminal queries ────────────────────────────────────────────────

    pub fn can_dispense_now(&mut self, terminal: Entity) -> Result<bool, EngineError> {
        Ok(terminal_can_dispense(&self.world, terminal, &self.catalog, &self.config)?)
    }

    /// Dispense a meal onto the ground at the terminal's interaction spot
    pub fn try_dispense(&mut self, terminal: Entity) -> Result<(DispenseOutcome, Option<Entity>), EngineError> {
        let outcome = dispense_from_terminal(&self.world, terminal, &self.catalog, &self.config, &mut self.rng)?;
        let item = match &outcome {
            DispenseOutcome::Produced(meal) => {
                let spot = self
                    .interaction_position(terminal)
                    .ok_or(EngineError::NoSuchEntity)?;
                Some(self.world.spawn((meal.clone(), Position(spot))))
            }
            DispenseOutcome::Unavailable(_) => None,
        };
        Ok((outcome, item))
    }

    /// Inspect pane text, refreshed against the current network
    pub fn inspect_terminal(&mut self, terminal: Entity) -> Result<String, EngineError> {
        terminal_can_dispense(&self.world, terminal, &self.catalog, &self.config)?;
        Ok(self.world.get::<&ReplimatTerminal>(terminal)?.inspect_string())
    }

    pub fn network_feedstock(&self, net: PowerNetId) -> FeedstockSummary {
        network_feedstock(&self.world, net)
    }

    pub fn tank_entities_on_net(&self, net: PowerNetId) -> Vec<Entity> {
        tank_entities_on_net(&self.world, net)
    }

    /// Cut or restore power to a building
    pub fn set_powered(&mut self, building: Entity, powered: bool) -> Result<(), EngineError> {
        self.world.get::<&mut PowerTrader>(building)?.power_on = powered;
        Ok(())
    }

    pub fn set_forbidden(&mut self, thing: Entity, forbidden: bool) -> Result<(), EngineError> {
        if forbidden {
            self.world.insert_one(thing, Forbidden)?;
        } else {
            let _ = self.world.remove_one::<Forbidden>(thing);
        }
        Ok(())
    }

    /// Remove an entity and any job or reservation that referred to it
    pub fn despawn(&mut self, entity: Entity) -> Result<(), EngineError> {
        self.world.despawn(entity)?;
        self.reservations
            .retain(|target, claimant| *target != entity && *claimant != entity);
        self.deliveries.retain(|d| d.pawn() != entity);
        Ok(())
    }
}

impl Default for ColonyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveryHost for ColonyEngine {
    fn is_terminal(&self, thing: Entity) -> bool {
        self.world.get::<&ReplimatTerminal>(thing).is_ok()
    }

    fn inventory_contains(&self, pawn: Entity, thing: Entity) -> bool {
        self.world
            .get::<&Inventory>(pawn)
            .map(|inv| inv.contains(thing))
            .unwrap_or(false)
    }

    fn is_carrying(&self, pawn: Entity, thing: Entity) -> bool {
        self.world
            .get::<&Carrying>(pawn)
            .map(|c| c.item == thing)
            .unwrap_or(false)
    }

    fn is_available(&self, thing: Entity) -> bool {
        self.world.contains(thing) && self.world.get::<&Forbidden>(thing).is_err()
    }

    fn can_receive_food(&self, deliveree: Entity) -> bool {
        self.world
            .get::<&Prisoner>(deliveree)
            .map(|p| p.can_be_brought_food)
            .unwrap_or(false)
    }

    fn interaction_position(&self, terminal: Entity) -> Option<Vec3> {
        let pos = self.world.get::<&Position>(terminal).ok()?.0;
        let offset = self
            .world
            .get::<&ReplimatTerminal>(terminal)
            .map(|t| t.interaction_offset)
            .unwrap_or(Vec3::ZERO);
        Some(pos + offset)
    }

    fn try_reserve(&mut self, claimant: Entity, target: Entity) -> bool {
        if !self.world.contains(target) {
            return false;
        }
        match self.reservations.get(&target) {
            Some(holder) if *holder != claimant => false,
            _ => {
                self.reservations.insert(target, claimant);
                true
            }
        }
    }

    fn release_reservations(&mut self, claimant: Entity) {
        self.reservations.retain(|_, holder| *holder != claimant);
    }

    fn start_path(&mut self, pawn: Entity, destination: Vec3) {
        start_path(&mut self.world, pawn, destination, self.config.pawn_speed);
    }

    fn has_arrived(&self, pawn: Entity, destination: Vec3) -> bool {
        has_arrived(&self.world, pawn, destination)
    }

    fn take_meal_from_terminal(
        &mut self,
        pawn: Entity,
        terminal: Entity,
    ) -> Result<DispenseOutcome, JobFailure> {
        if !self.world.contains(pawn) {
            return Err(JobFailure::HandOffFailed);
        }
        let outcome = dispense_from_terminal(&self.world, terminal, &self.catalog, &self.config, &mut self.rng)
            .map_err(|_| JobFailure::FoodSourceUnavailable)?;
        if let DispenseOutcome::Produced(meal) = &outcome {
            // Hands full: set the old thing down where the pawn stands
            if let Ok(previous) = self.world.remove_one::<Carrying>(pawn) {
                let here = self.world.get::<&Position>(pawn).map(|p| p.0).unwrap_or_default();
                if self.world.insert_one(previous.item, Position(here)).is_err() {
                    log::warn!("Replimat: previously carried item no longer exists");
                }
            }
            let item = self.world.spawn((meal.clone(),));
            if self.world.insert_one(pawn, Carrying { item }).is_err() {
                let _ = self.world.despawn(item);
                return Err(JobFailure::HandOffFailed);
            }
        }
        Ok(outcome)
    }

    fn take_from_inventory(&mut self, pawn: Entity, thing: Entity) -> bool {
        let taken = self
            .world
            .get::<&mut Inventory>(pawn)
            .map(|mut inv| inv.take(thing))
            .unwrap_or(false);
        taken && self.world.insert_one(pawn, Carrying { item: thing }).is_ok()
    }

    fn drop_carried(&mut self, pawn: Entity, at: Vec3) -> bool {
        match self.world.remove_one::<Carrying>(pawn) {
            Ok(carrying) => self.world.insert_one(carrying.item, Position(at)).is_ok(),
            Err(_) => false,
        }
    }

    fn food_label(&self, source: Entity) -> Option<String> {
        if let Ok(meal) = self.world.get::<&Meal>(source) {
            return Some(meal.label.clone());
        }
        let terminal = self.world.get::<&ReplimatTerminal>(source).ok()?;
        terminal
            .selected_food
            .and_then(|id| self.catalog.get(id))
            .map(|def| def.label.clone())
    }

    fn pawn_label(&self, pawn: Entity) -> Option<String> {
        self.world.get::<&Pawn>(pawn).ok().map(|p| p.name.clone())
    }
}

/// Errors from engine operations on specific entities
#[derive(Debug)]
pub enum EngineError {
    NoSuchEntity,
    MissingComponent(hecs::ComponentError),
    UnknownFood(FoodDefId),
    JobRejected(JobFailure),
}

impl From<hecs::ComponentError> for EngineError {
    fn from(e: hecs::ComponentError) -> Self {
        EngineError::MissingComponent(e)
    }
}

impl From<hecs::NoSuchEntity> for EngineError {
    fn from(_: hecs::NoSuchEntity) -> Self {
        EngineError::NoSuchEntity
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NoSuchEntity => write!(f, "no such entity"),
            EngineError::MissingComponent(e) => write!(f, "component error: {}", e),
            EngineError::UnknownFood(id) => write!(f, "unknown food type {}", id.0),
            EngineError::JobRejected(failure) => write!(f, "job rejected: {}", failure),
        }
    }
}

impl std::error::Error for EngineError {}
