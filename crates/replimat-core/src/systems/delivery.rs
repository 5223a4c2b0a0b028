//! Food delivery job - a warden fetches a meal and drops it by a prisoner.
//!
//! The driver is a fixed list of toils stepped one call at a time by the
//! engine. Everything it needs from the world goes through [`DeliveryHost`].

use hecs::Entity;

use super::dispenser::{DispenseOutcome, Unavailable};
use crate::components::Vec3;

/// Targets of a food delivery job
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoodDeliveryJob {
    /// Terminal to dispense from, or a meal the pawn already holds
    pub food_source: Entity,
    /// Prisoner receiving the meal
    pub deliveree: Entity,
    /// Where the meal is set down
    pub drop_position: Vec3,
}

/// One step of the delivery procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toil {
    ReserveDeliveree,
    GotoTerminal,
    TakeMealFromTerminal,
    TakeFromInventory,
    GotoDeliveree,
    DropMeal,
}

/// What the host reports after a step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JobStatus {
    Running,
    Completed,
    Failed(JobFailure),
}

/// Why a delivery was abandoned
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JobFailure {
    /// Someone else holds the deliveree
    ReservationDenied,
    /// Terminal or meal destroyed, forbidden or never held
    FoodSourceUnavailable,
    /// Terminal refused to dispense when the warden got there
    TerminalUnavailable(Unavailable),
    /// Deliveree gone or no longer accepting food
    DelivereeInvalid,
    /// Arrived with nothing in hand
    NothingCarried,
    /// The pawn could not take the produced meal in hand
    HandOffFailed,
}

impl std::fmt::Display for JobFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobFailure::ReservationDenied => write!(f, "deliveree reserved by another pawn"),
            JobFailure::FoodSourceUnavailable => write!(f, "food source unavailable"),
            JobFailure::TerminalUnavailable(reason) => write!(f, "terminal unavailable: {}", reason),
            JobFailure::DelivereeInvalid => write!(f, "deliveree can no longer be fed"),
            JobFailure::NothingCarried => write!(f, "nothing carried to drop"),
            JobFailure::HandOffFailed => write!(f, "could not take the meal in hand"),
        }
    }
}

/// World access the delivery driver needs
pub trait DeliveryHost {
    fn is_terminal(&self, thing: Entity) -> bool;
    fn inventory_contains(&self, pawn: Entity, thing: Entity) -> bool;
    fn is_carrying(&self, pawn: Entity, thing: Entity) -> bool;
    /// Exists and is not forbidden
    fn is_available(&self, thing: Entity) -> bool;
    fn can_receive_food(&self, deliveree: Entity) -> bool;
    fn interaction_position(&self, terminal: Entity) -> Option<Vec3>;

    fn try_reserve(&mut self, claimant: Entity, target: Entity) -> bool;
    fn release_reservations(&mut self, claimant: Entity);
    fn start_path(&mut self, pawn: Entity, destination: Vec3);
    fn has_arrived(&self, pawn: Entity, destination: Vec3) -> bool;

    /// Dispense a meal and put it in the pawn's hands. `Err` when the
    /// terminal or pawn cannot take part at all; nothing is debited then.
    fn take_meal_from_terminal(
        &mut self,
        pawn: Entity,
        terminal: Entity,
    ) -> Result<DispenseOutcome, JobFailure>;
    /// Move a thing from the pawn's pack to its hands
    fn take_from_inventory(&mut self, pawn: Entity, thing: Entity) -> bool;
    /// Set down whatever the pawn holds
    fn drop_carried(&mut self, pawn: Entity, at: Vec3) -> bool;

    fn food_label(&self, source: Entity) -> Option<String>;
    fn pawn_label(&self, pawn: Entity) -> Option<String>;
}

enum ToilResult {
    Done,
    Waiting,
    Fail(JobFailure),
}

/// Runs one food delivery for one pawn
#[derive(Debug, Clone)]
pub struct FoodDeliveryDriver {
    pawn: Entity,
    job: FoodDeliveryJob,
    using_terminal: bool,
    from_inventory: bool,
    toils: Vec<Toil>,
    current: usize,
    path_started: bool,
    finished: Option<JobStatus>,
}

impl FoodDeliveryDriver {
    /// Begin a delivery. Where the food comes from is decided here, once.
    pub fn start<H: DeliveryHost + ?Sized>(
        pawn: Entity,
        job: FoodDeliveryJob,
        host: &H,
    ) -> Result<Self, JobFailure> {
        let using_terminal = host.is_terminal(job.food_source);
        let from_inventory = !using_terminal && host.inventory_contains(pawn, job.food_source);

        if !using_terminal && !from_inventory && !host.is_carrying(pawn, job.food_source) {
            return Err(JobFailure::FoodSourceUnavailable);
        }
        Ok(Self::restore(pawn, job, using_terminal, from_inventory, 0))
    }

    /// Rebuild a driver from saved flags and toil index
    pub fn restore(
        pawn: Entity,
        job: FoodDeliveryJob,
        using_terminal: bool,
        from_inventory: bool,
        current: usize,
    ) -> Self {
        let mut toils = vec![Toil::ReserveDeliveree];
        if using_terminal {
            toils.push(Toil::GotoTerminal);
            toils.push(Toil::TakeMealFromTerminal);
        } else if from_inventory {
            toils.push(Toil::TakeFromInventory);
        }
        toils.push(Toil::GotoDeliveree);
        toils.push(Toil::DropMeal);

        Self {
            pawn,
            job,
            using_terminal,
            from_inventory,
            current: current.min(toils.len()),
            toils,
            path_started: false,
            finished: None,
        }
    }

    pub fn pawn(&self) -> Entity {
        self.pawn
    }

    pub fn job(&self) -> &FoodDeliveryJob {
        &self.job
    }

    pub fn using_terminal(&self) -> bool {
        self.using_terminal
    }

    pub fn from_inventory(&self) -> bool {
        self.from_inventory
    }

    pub fn toils(&self) -> &[Toil] {
        &self.toils
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_toil(&self) -> Option<Toil> {
        self.toils.get(self.current).copied()
    }

    /// Run the current toil once
    pub fn step<H: DeliveryHost + ?Sized>(&mut self, host: &mut H) -> JobStatus {
        if let Some(status) = self.finished {
            return status;
        }
        let Some(toil) = self.current_toil() else {
            return self.finish(host, JobStatus::Completed);
        };

        match self.run_toil(toil, host) {
            ToilResult::Waiting => JobStatus::Running,
            ToilResult::Fail(failure) => self.finish(host, JobStatus::Failed(failure)),
            ToilResult::Done => {
                self.current += 1;
                self.path_started = false;
                if self.current >= self.toils.len() {
                    self.finish(host, JobStatus::Completed)
                } else {
                    JobStatus::Running
                }
            }
        }
    }

    fn run_toil<H: DeliveryHost + ?Sized>(&mut self, toil: Toil, host: &mut H) -> ToilResult {
        let source = self.job.food_source;
        let deliveree = self.job.deliveree;

        match toil {
            Toil::ReserveDeliveree => {
                if host.try_reserve(self.pawn, deliveree) {
                    ToilResult::Done
                } else {
                    ToilResult::Fail(JobFailure::ReservationDenied)
                }
            }
            Toil::GotoTerminal => {
                if !host.is_available(source) {
                    return ToilResult::Fail(JobFailure::FoodSourceUnavailable);
                }
                match host.interaction_position(source) {
                    Some(spot) => self.walk_to(host, spot),
                    None => ToilResult::Fail(JobFailure::FoodSourceUnavailable),
                }
            }
            Toil::TakeMealFromTerminal => {
                if !host.is_available(source) {
                    return ToilResult::Fail(JobFailure::FoodSourceUnavailable);
                }
                match host.take_meal_from_terminal(self.pawn, source) {
                    Ok(DispenseOutcome::Produced(_)) => ToilResult::Done,
                    Ok(DispenseOutcome::Unavailable(reason)) => {
                        ToilResult::Fail(JobFailure::TerminalUnavailable(reason))
                    }
                    Err(failure) => ToilResult::Fail(failure),
                }
            }
            Toil::TakeFromInventory => {
                if host.take_from_inventory(self.pawn, source) {
                    ToilResult::Done
                } else {
                    ToilResult::Fail(JobFailure::FoodSourceUnavailable)
                }
            }
            Toil::GotoDeliveree => {
                if !host.is_available(deliveree) || !host.can_receive_food(deliveree) {
                    return ToilResult::Fail(JobFailure::DelivereeInvalid);
                }
                self.walk_to(host, self.job.drop_position)
            }
            Toil::DropMeal => {
                if host.drop_carried(self.pawn, self.job.drop_position) {
                    ToilResult::Done
                } else {
                    ToilResult::Fail(JobFailure::NothingCarried)
                }
            }
        }
    }

    fn walk_to<H: DeliveryHost + ?Sized>(&mut self, host: &mut H, destination: Vec3) -> ToilResult {
        if !self.path_started {
            host.start_path(self.pawn, destination);
            self.path_started = true;
        }
        if host.has_arrived(self.pawn, destination) {
            ToilResult::Done
        } else {
            ToilResult::Waiting
        }
    }

    fn finish<H: DeliveryHost + ?Sized>(&mut self, host: &mut H, status: JobStatus) -> JobStatus {
        host.release_reservations(self.pawn);
        self.finished = Some(status);
        status
    }

    /// Status line shown for the pawn
    pub fn report<H: DeliveryHost + ?Sized>(&self, host: &H) -> String {
        let food = host
            .food_label(self.job.food_source)
            .unwrap_or_else(|| "food".to_string());
        let deliveree = host
            .pawn_label(self.job.deliveree)
            .unwrap_or_else(|| "prisoner".to_string());
        format!("Delivering {} to {}.", food, deliveree)
    }
}
