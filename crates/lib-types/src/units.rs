//! Unit definitions declared by a model description.
//!
//! A [`Unit`] carries an optional [`BaseUnit`] (SI exponents plus an affine
//! mapping to SI) and any number of [`DisplayUnit`]s. Conversions are the
//! plain affine maps the standard defines:
//!
//! - `value_si = factor * value + offset` for the base unit
//! - `value_display = factor * value + offset` for a display unit

use serde::{Deserialize, Serialize};

/// Exponents of the seven SI base units plus radians, with the affine
/// mapping from the declared unit to the SI combination.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaseUnit {
    pub kg: i32,
    pub m: i32,
    pub s: i32,
    pub a: i32,
    pub k: i32,
    pub mol: i32,
    pub cd: i32,
    pub rad: i32,
    pub factor: f64,
    pub offset: f64,
}

impl Default for BaseUnit {
    fn default() -> Self {
        Self {
            kg: 0,
            m: 0,
            s: 0,
            a: 0,
            k: 0,
            mol: 0,
            cd: 0,
            rad: 0,
            factor: 1.0,
            offset: 0.0,
        }
    }
}

impl BaseUnit {
    /// Exponent vector in the order kg, m, s, A, K, mol, cd, rad.
    pub fn exponents(&self) -> [i32; 8] {
        [
            self.kg, self.m, self.s, self.a, self.k, self.mol, self.cd, self.rad,
        ]
    }

    /// Two units are compatible when they share the same SI dimension.
    pub fn same_dimension(&self, other: &BaseUnit) -> bool {
        self.exponents() == other.exponents()
    }

    #[inline]
    pub fn to_si(&self, value: f64) -> f64 {
        self.factor * value + self.offset
    }

    #[inline]
    pub fn from_si(&self, value: f64) -> f64 {
        (value - self.offset) / self.factor
    }
}

/// Alternative unit used only for presentation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayUnit {
    pub name: String,
    pub factor: f64,
    pub offset: f64,
}

impl DisplayUnit {
    #[inline]
    pub fn to_display(&self, value: f64) -> f64 {
        self.factor * value + self.offset
    }

    #[inline]
    pub fn from_display(&self, value: f64) -> f64 {
        (value - self.offset) / self.factor
    }
}

/// One `<Unit>` entry of the unit definitions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub name: String,
    pub base_unit: Option<BaseUnit>,
    pub display_units: Vec<DisplayUnit>,
}

impl Unit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_unit: None,
            display_units: Vec::new(),
        }
    }

    /// Look up a display unit by name.
    pub fn display_unit(&self, name: &str) -> Option<&DisplayUnit> {
        self.display_units.iter().find(|d| d.name == name)
    }

    /// Convert a value in this unit into another unit of the same
    /// dimension, going through SI. Returns `None` when either unit has
    /// no base unit or the dimensions differ.
    pub fn convert_to(&self, value: f64, target: &Unit) -> Option<f64> {
        let from = self.base_unit.as_ref()?;
        let to = target.base_unit.as_ref()?;
        if !from.same_dimension(to) {
            return None;
        }
        Some(to.from_si(from.to_si(value)))
    }
}
