//! Replimat Core - feedstock terminal and food delivery simulation
//!
//! Models the slice of a colony simulation that a Replimat installation
//! touches: terminals that turn liquid feedstock into meals, the feedstock
//! tanks sharing their power network, and wardens carrying those meals to
//! prisoners.
//!
//! # Architecture
//!
//! The simulation uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: Terminals, feedstock tanks, pawns, meals
//! - **Components**: Pure data attached to entities (Position, FeedTank, ReplimatTerminal, etc.)
//! - **Systems**: Logic that queries and updates components
//!
//! Terminal accounting never queries the world on its own. The connected
//! tanks are gathered by the caller and handed in, so the same logic runs
//! against a live [`hecs::World`] or a plain slice in a unit test.
//!
//! # Example
//!
//! ```rust,no_run
//! use replimat_core::prelude::*;
//!
//! let mut engine = ColonyEngine::with_seed(7);
//! let net = PowerNetId(1);
//! let terminal = engine.spawn_terminal(Vec3::new(0.0, 0.0, 0.0), net);
//! engine.spawn_tank(Vec3::new(2.0, 0.0, 0.0), net, 50.0, 100.0);
//!
//! let warden = engine.spawn_pawn("Warden", Vec3::new(5.0, 5.0, 0.0));
//! let prisoner = engine.spawn_prisoner("Prisoner", Vec3::new(10.0, 0.0, 0.0));
//! engine.assign_food_delivery(warden, terminal, prisoner).unwrap();
//!
//! loop {
//!     engine.update();
//! }
//! ```

pub mod components;
pub mod config;
pub mod engine;
pub mod persistence;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::ReplimatConfig;
    pub use crate::engine::ColonyEngine;
    pub use crate::systems::{DispenseOutcome, JobFailure, JobStatus, Unavailable};
}
