//! Pawn components: Pawn, Prisoner, Inventory, Carrying.

use hecs::Entity;
use serde::{Deserialize, Serialize};

/// Any character that can walk around and do jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pawn {
    pub name: String,
}

impl Pawn {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Pawn held prisoner by the colony
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Prisoner {
    /// Wardens may bring food (false once released, recruited or fed elsewhere)
    pub can_be_brought_food: bool,
}

impl Default for Prisoner {
    fn default() -> Self {
        Self {
            can_be_brought_food: true,
        }
    }
}

/// Things a pawn carries in its pack
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub items: Vec<Entity>,
}

impl Inventory {
    pub fn contains(&self, thing: Entity) -> bool {
        self.items.contains(&thing)
    }

    /// Remove a thing, returning whether it was there
    pub fn take(&mut self, thing: Entity) -> bool {
        match self.items.iter().position(|e| *e == thing) {
            Some(idx) => {
                self.items.remove(idx);
                true
            }
            None => false,
        }
    }
}

/// The single thing a pawn holds in its hands
#[derive(Debug, Clone, Copy)]
pub struct Carrying {
    pub item: Entity,
}
