//! Save/Load functionality for persisting simulation state
//!
//! Uses bincode for binary serialization. Entities are stored in world
//! iteration order; references between them (inventories, carried things,
//! reservations, deliveries) are written as indices into that list and
//! remapped on load.

use std::collections::HashMap;
use std::io::{Read, Write};

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

use crate::components::*;
use crate::config::ReplimatConfig;
use crate::engine::ColonyEngine;
use crate::systems::{FoodDeliveryDriver, FoodDeliveryJob};

/// Version number for save file format (increment when format changes)
const SAVE_VERSION: u32 = 1;

/// Serializable snapshot of the simulation state
#[derive(Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version
    pub version: u32,
    pub ticks: u64,
    pub seed: u64,
    pub config: ReplimatConfig,
    pub catalog: FoodCatalog,
    /// All entities with their components
    pub entities: Vec<SerializableEntity>,
    /// (target, claimant) index pairs
    pub reservations: Vec<(u32, u32)>,
    pub deliveries: Vec<SerializableDelivery>,
}

/// All possible components for an entity, serialized as optionals
#[derive(Serialize, Deserialize, Default)]
pub struct SerializableEntity {
    pub position: Option<Position>,
    pub movement: Option<Movement>,
    pub power: Option<PowerTrader>,
    pub terminal: Option<ReplimatTerminal>,
    pub tank: Option<FeedTank>,
    pub pawn: Option<Pawn>,
    pub prisoner: Option<Prisoner>,
    pub meal: Option<Meal>,
    pub forbidden: bool,
    /// Entity indices of inventory items
    pub inventory: Option<Vec<u32>>,
    /// Entity index of the carried thing
    pub carrying: Option<u32>,
}

/// A delivery in progress: targets, the cached source flags and the toil reached
#[derive(Serialize, Deserialize)]
pub struct SerializableDelivery {
    pub pawn: u32,
    pub food_source: u32,
    pub deliveree: u32,
    pub drop_position: Vec3,
    pub using_terminal: bool,
    pub from_inventory: bool,
    pub current_toil: usize,
}

/// Extract all entities from a world into serializable form
fn serialize_entities(world: &World, index: &HashMap<Entity, u32>) -> Vec<SerializableEntity> {
    let mut entities = Vec::new();

    for entity_ref in world.iter() {
        let mut se = SerializableEntity::default();

        if let Some(c) = entity_ref.get::<&Position>() {
            se.position = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&Movement>() {
            se.movement = Some((*c).clone());
        }
        if let Some(c) = entity_ref.get::<&PowerTrader>() {
            se.power = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&ReplimatTerminal>() {
            se.terminal = Some((*c).clone());
        }
        if let Some(c) = entity_ref.get::<&FeedTank>() {
            se.tank = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&Pawn>() {
            se.pawn = Some((*c).clone());
        }
        if let Some(c) = entity_ref.get::<&Prisoner>() {
            se.prisoner = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&Meal>() {
            se.meal = Some((*c).clone());
        }
        se.forbidden = entity_ref.has::<Forbidden>();
        if let Some(c) = entity_ref.get::<&Inventory>() {
            se.inventory = Some(c.items.iter().filter_map(|e| index.get(e).copied()).collect());
        }
        if let Some(c) = entity_ref.get::<&Carrying>() {
            se.carrying = index.get(&c.item).copied();
        }

        entities.push(se);
    }

    entities
}

/// Spawn an entity with all its non-reference components
fn spawn_entity(world: &mut World, se: &mut SerializableEntity) -> Entity {
    let entity = world.spawn(());

    if let Some(c) = se.position.take() {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.movement.take() {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.power.take() {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.terminal.take() {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.tank.take() {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.pawn.take() {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.prisoner.take() {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.meal.take() {
        let _ = world.insert_one(entity, c);
    }
    if se.forbidden {
        let _ = world.insert_one(entity, Forbidden);
    }

    entity
}

/// Save the complete simulation to a writer
pub fn save_engine<W: Write>(writer: W, engine: &ColonyEngine) -> Result<(), SaveError> {
    let order: Vec<Entity> = engine.world.iter().map(|e| e.entity()).collect();
    let index: HashMap<Entity, u32> = order
        .iter()
        .enumerate()
        .map(|(i, e)| (*e, i as u32))
        .collect();
    let idx = |e: Entity| index.get(&e).copied();

    let reservations = engine
        .reservations()
        .filter_map(|(target, claimant)| Some((idx(target)?, idx(claimant)?)))
        .collect();

    let deliveries = engine
        .deliveries()
        .iter()
        .filter_map(|d| {
            Some(SerializableDelivery {
                pawn: idx(d.pawn())?,
                food_source: idx(d.job().food_source)?,
                deliveree: idx(d.job().deliveree)?,
                drop_position: d.job().drop_position,
                using_terminal: d.using_terminal(),
                from_inventory: d.from_inventory(),
                current_toil: d.current_index(),
            })
        })
        .collect();

    let save_data = SaveData {
        version: SAVE_VERSION,
        ticks: engine.ticks,
        seed: engine.seed(),
        config: engine.config.clone(),
        catalog: engine.catalog.clone(),
        entities: serialize_entities(&engine.world, &index),
        reservations,
        deliveries,
    };

    bincode::serialize_into(writer, &save_data)?;
    Ok(())
}

/// Load a simulation from a reader
pub fn load_engine<R: Read>(reader: R) -> Result<ColonyEngine, SaveError> {
    let mut save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }

    let mut engine = ColonyEngine::with_config(save_data.config, save_data.seed)
        .with_catalog(save_data.catalog);
    engine.resume_at(save_data.ticks);

    let spawned: Vec<Entity> = save_data
        .entities
        .iter_mut()
        .map(|se| spawn_entity(&mut engine.world, se))
        .collect();
    let lookup = |i: u32| spawned.get(i as usize).copied().ok_or(SaveError::DanglingReference(i));

    for (entity, se) in spawned.iter().zip(&save_data.entities) {
        if let Some(items) = &se.inventory {
            let items = items.iter().map(|i| lookup(*i)).collect::<Result<Vec<_>, _>>()?;
            let _ = engine.world.insert_one(*entity, Inventory { items });
        }
        if let Some(item) = se.carrying {
            let _ = engine.world.insert_one(*entity, Carrying { item: lookup(item)? });
        }
    }

    for (target, claimant) in save_data.reservations {
        engine.restore_reservation(lookup(target)?, lookup(claimant)?);
    }

    for d in save_data.deliveries {
        let job = FoodDeliveryJob {
            food_source: lookup(d.food_source)?,
            deliveree: lookup(d.deliveree)?,
            drop_position: d.drop_position,
        };
        engine.restore_delivery(FoodDeliveryDriver::restore(
            lookup(d.pawn)?,
            job,
            d.using_terminal,
            d.from_inventory,
            d.current_toil,
        ));
    }

    Ok(engine)
}

/// Errors that can occur during save/load
#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Bincode(Box<bincode::ErrorKind>),
    VersionMismatch { expected: u32, found: u32 },
    DanglingReference(u32),
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for SaveError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        SaveError::Bincode(e)
    }
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "IO error: {}", e),
            SaveError::Bincode(e) => write!(f, "Serialization error: {}", e),
            SaveError::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Save version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            SaveError::DanglingReference(i) => write!(f, "Save references missing entity {}", i),
        }
    }
}

impl std::error::Error for SaveError {}
