//! Material properties used to derive per-cell resistances.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Convert a length in mils (thousandths of an inch) to meters.
pub fn mil_to_meters(mil: f64) -> f64 {
    mil / 1000.0 * 2.54 / 100.0
}

/// Unit of a material thickness in run configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    #[default]
    Mil,
    #[serde(rename = "m")]
    Meter,
}

/// A homogeneous layer material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Thermal conductivity in W/(m·K).
    pub conductivity: f64,
    /// Layer thickness in `thickness_unit`.
    pub thickness: f64,
    #[serde(default)]
    pub thickness_unit: LengthUnit,
}

impl Material {
    pub fn new(conductivity: f64, thickness: f64, thickness_unit: LengthUnit) -> Self {
        Self {
            conductivity,
            thickness,
            thickness_unit,
        }
    }

    pub fn thickness_meters(&self) -> f64 {
        match self.thickness_unit {
            LengthUnit::Mil => mil_to_meters(self.thickness),
            LengthUnit::Meter => self.thickness,
        }
    }

    /// Thermal resistance of one square of this material, `1 / (k·t)`.
    pub fn resistance_per_square(&self) -> Result<f64> {
        let kt = self.conductivity * self.thickness_meters();
        if !(kt > 0.0 && kt.is_finite()) {
            return Err(Error::InvalidProblem(format!(
                "material conductivity {} and thickness {} must be positive",
                self.conductivity, self.thickness
            )));
        }
        Ok(1.0 / kt)
    }
}

/// The materials the built-in problems are laid out with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialSet {
    pub fr4: Material,
    pub copper: Material,
    /// Conductance from a fixed-temperature cell to its reservoir.
    pub bound_cond: f64,
}

impl Default for MaterialSet {
    fn default() -> Self {
        Self {
            fr4: Material::new(1.0, 59.0, LengthUnit::Mil),
            copper: Material::new(401.0, 1.2, LengthUnit::Mil),
            bound_cond: 1000.0,
        }
    }
}
