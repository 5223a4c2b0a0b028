//! Systems - logic that operates on components

mod delivery;
mod dispenser;
mod feedstock;
mod movement;

pub use delivery::*;
pub use dispenser::*;
pub use feedstock::*;
pub use movement::*;
