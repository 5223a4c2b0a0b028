//! Food definitions, meal filters and produced meals.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Food quality tier, ordered from least to most desirable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FoodPreferability {
    NeverForNutrition,
    DesperateOnly,
    RawBad,
    RawTasty,
    MealAwful,
    MealSimple,
    MealFine,
    MealLavish,
}

impl FoodPreferability {
    pub fn is_meal(&self) -> bool {
        *self >= FoodPreferability::MealAwful
    }
}

/// Index of a food type in the [`FoodCatalog`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FoodDefId(pub u16);

/// A kind of food the world knows how to make
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodDef {
    pub id: FoodDefId,
    pub label: String,
    /// Mass of one item in kilograms
    pub base_mass: f32,
    pub preferability: FoodPreferability,
}

impl FoodDef {
    pub fn new(
        id: u16,
        label: impl Into<String>,
        base_mass: f32,
        preferability: FoodPreferability,
    ) -> Self {
        Self {
            id: FoodDefId(id),
            label: label.into(),
            base_mass,
            preferability,
        }
    }
}

/// Registry of every food type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodCatalog {
    defs: Vec<FoodDef>,
}

impl FoodCatalog {
    pub fn new(defs: Vec<FoodDef>) -> Self {
        Self { defs }
    }

    pub fn get(&self, id: FoodDefId) -> Option<&FoodDef> {
        self.defs.iter().find(|d| d.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FoodDef> {
        self.defs.iter()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Look a food type up by its label
    pub fn find(&self, label: &str) -> Option<&FoodDef> {
        self.defs.iter().find(|d| d.label == label)
    }

    /// Filter allowing every prepared meal in the catalog.
    /// This is what a freshly built terminal starts with.
    pub fn default_meal_filter(&self) -> MealFilter {
        let mut filter = MealFilter::default();
        for def in self.defs.iter().filter(|d| d.preferability.is_meal()) {
            filter.set_allowed(def.id, true);
        }
        filter
    }
}

impl Default for FoodCatalog {
    fn default() -> Self {
        use FoodPreferability::*;
        Self::new(vec![
            FoodDef::new(0, "nutrient paste meal", 0.44, MealAwful),
            FoodDef::new(1, "simple meal", 0.44, MealSimple),
            FoodDef::new(2, "fine meal", 0.44, MealFine),
            FoodDef::new(3, "vegetarian fine meal", 0.44, MealFine),
            FoodDef::new(4, "lavish meal", 0.44, MealLavish),
            FoodDef::new(5, "vegetarian lavish meal", 0.44, MealLavish),
            FoodDef::new(6, "raw potatoes", 0.03, RawBad),
            FoodDef::new(7, "berries", 0.03, RawTasty),
            FoodDef::new(8, "kibble", 0.02, DesperateOnly),
        ])
    }
}

/// Allow-list of food types a terminal may produce
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealFilter {
    allowed: BTreeSet<FoodDefId>,
}

impl MealFilter {
    pub fn allows(&self, id: FoodDefId) -> bool {
        self.allowed.contains(&id)
    }

    pub fn set_allowed(&mut self, id: FoodDefId, allowed: bool) {
        if allowed {
            self.allowed.insert(id);
        } else {
            self.allowed.remove(&id);
        }
    }

    pub fn copy_from(&mut self, other: &MealFilter) {
        self.allowed = other.allowed.clone();
    }

    /// Allowed ids in ascending order
    pub fn allowed(&self) -> impl Iterator<Item = FoodDefId> + '_ {
        self.allowed.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

/// A food item produced by a terminal or carried by a pawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub def: FoodDefId,
    pub label: String,
    /// Kilograms
    pub mass: f32,
}

impl Meal {
    pub fn from_def(def: &FoodDef) -> Self {
        Self {
            def: def.id,
            label: def.label.clone(),
            mass: def.base_mass,
        }
    }
}
