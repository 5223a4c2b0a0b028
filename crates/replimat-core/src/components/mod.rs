//! Component definitions for the ECS simulation.
//!
//! Components are pure data structs attached to entities.
//! Most have no behavior - that lives in systems. The terminal is the
//! exception: its accounting is written against injected tanks so it can be
//! exercised without a world.

mod building;
mod common;
mod food;
mod pawn;
mod power;

pub use building::*;
pub use common::*;
pub use food::*;
pub use pawn::*;
pub use power::*;
