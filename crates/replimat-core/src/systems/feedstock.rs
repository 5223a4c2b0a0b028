//! Feedstock accounting across the tanks of one network.
//!
//! Tanks are handed in by the caller. Nothing here looks at the world, which
//! keeps the draw logic usable with hecs query results and plain vectors alike.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::components::FeedTank;

/// Anything that stores feedstock and lets it be drawn
pub trait FeedstockSource {
    /// Litres currently stored
    fn stored_feedstock(&self) -> f32;

    /// Remove up to `amount` litres, returning what was actually removed
    fn draw_feedstock(&mut self, amount: f32) -> f32;
}

impl FeedstockSource for FeedTank {
    fn stored_feedstock(&self) -> f32 {
        self.stored
    }

    fn draw_feedstock(&mut self, amount: f32) -> f32 {
        let drawn = amount.max(0.0).min(self.stored);
        self.stored -= drawn;
        drawn
    }
}

impl<S: FeedstockSource + ?Sized> FeedstockSource for &mut S {
    fn stored_feedstock(&self) -> f32 {
        (**self).stored_feedstock()
    }

    fn draw_feedstock(&mut self, amount: f32) -> f32 {
        (**self).draw_feedstock(amount)
    }
}

/// Tank count and total stock of a network
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeedstockSummary {
    pub tank_count: usize,
    pub total: f32,
}

/// Count the tanks and sum what they hold
pub fn summarize<S: FeedstockSource>(tanks: &[S]) -> FeedstockSummary {
    FeedstockSummary {
        tank_count: tanks.len(),
        total: tanks.iter().map(|t| t.stored_feedstock()).sum(),
    }
}

/// Feedstock needed to make an item of the given mass
pub fn mass_to_feedstock_volume(mass_kg: f32, litres_per_kg: f32) -> f32 {
    mass_kg * litres_per_kg
}

/// Draw `amount` litres from the tanks, visiting them in random order.
///
/// Each tank gives `min(remaining, stored)` until nothing remains. A short
/// network is drained without error; callers check availability first.
/// Returns the litres actually drawn.
pub fn consume_feedstock<S, R>(
    tanks: &mut [S],
    amount: f32,
    rng: &mut R,
) -> Result<f32, FeedstockError>
where
    S: FeedstockSource,
    R: Rng + ?Sized,
{
    if tanks.is_empty() {
        log::error!("Replimat: tried to draw feedstock from non-existent tanks");
        return Err(FeedstockError::NoTanks);
    }

    let mut order: Vec<usize> = (0..tanks.len()).collect();
    order.shuffle(rng);

    let mut remaining = amount.max(0.0);
    for idx in order {
        if remaining <= 0.0 {
            break;
        }
        let tank = &mut tanks[idx];
        let wanted = remaining.min(tank.stored_feedstock());
        remaining -= tank.draw_feedstock(wanted);
    }

    Ok(amount.max(0.0) - remaining.max(0.0))
}

/// Errors from drawing feedstock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedstockError {
    /// The network has no tanks at all
    NoTanks,
}

impl std::fmt::Display for FeedstockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedstockError::NoTanks => write!(f, "no feedstock tanks connected"),
        }
    }
}

impl std::error::Error for FeedstockError {}
