//! Building components: feedstock tanks and Replimat terminals.

use super::common::Vec3;
use super::food::{FoodDefId, FoodPreferability, MealFilter};
use serde::{Deserialize, Serialize};

/// Feedstock storage tank
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeedTank {
    /// Litres currently held, never negative
    pub stored: f32,
    pub capacity: f32,
}

impl FeedTank {
    pub fn new(stored: f32, capacity: f32) -> Self {
        let capacity = capacity.max(0.0);
        Self {
            stored: stored.clamp(0.0, capacity),
            capacity,
        }
    }

    /// Fill level (0-1)
    pub fn level(&self) -> f32 {
        if self.capacity > 0.0 {
            self.stored / self.capacity
        } else {
            0.0
        }
    }

    /// Add feedstock, returning the amount that actually fit
    pub fn add_feedstock(&mut self, amount: f32) -> f32 {
        let accepted = amount.max(0.0).min(self.capacity - self.stored);
        self.stored += accepted;
        accepted
    }
}

/// Replimat terminal - turns networked feedstock into meals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplimatTerminal {
    /// Food types this terminal may produce
    pub meal_filter: MealFilter,
    /// Only meals of exactly this tier are picked
    pub max_preferability: FoodPreferability,
    /// Meal the next dispense is expected to produce
    pub selected_food: Option<FoodDefId>,
    /// Ticks left on the dispense glow; zero when idle
    pub replicating_ticks: u32,
    /// At least one tank shares the terminal's network
    pub has_tanks: bool,
    /// Networked tanks hold enough for the last probed amount
    pub has_enough_feedstock: bool,
    /// Where a pawn stands to use the terminal, relative to its position
    pub interaction_offset: Vec3,
}

impl ReplimatTerminal {
    pub fn new(max_preferability: FoodPreferability) -> Self {
        Self {
            meal_filter: MealFilter::default(),
            max_preferability,
            selected_food: None,
            replicating_ticks: 0,
            has_tanks: false,
            has_enough_feedstock: false,
            interaction_offset: Vec3::new(0.0, -1.0, 0.0),
        }
    }

    pub fn is_dispensing(&self) -> bool {
        self.replicating_ticks > 0
    }
}
