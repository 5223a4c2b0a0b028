//! Power grid components.

use serde::{Deserialize, Serialize};

/// Identifier of a connected power network.
///
/// Feedstock tanks are plumbed through the same conduits as power, so a
/// terminal draws from every tank sharing its network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PowerNetId(pub u32);

/// Power consumer/producer attached to a building
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PowerTrader {
    pub net: PowerNetId,
    /// Whether the network currently supplies this building
    pub power_on: bool,
    /// Watts; negative values are consumption
    pub power_output: f32,
}

impl PowerTrader {
    pub fn new(net: PowerNetId) -> Self {
        Self {
            net,
            power_on: true,
            power_output: 0.0,
        }
    }
}
