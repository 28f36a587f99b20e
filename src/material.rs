use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Physical constants for one granular material. Angles in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub name: &'static str,
    pub critical_angle_deg: f64,
    pub variance_deg: f64,
    pub cohesion: f64,
    pub density: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MaterialKind {
    #[default]
    Sand,
    Soil,
    Clay,
    Gravel,
    MixedSoil,
    WoodPellets,
}

const SAND: Material = Material {
    name: "Sand",
    critical_angle_deg: 35.0,
    variance_deg: 3.0,
    cohesion: 0.0,
    density: 1.6,
};
const SOIL: Material = Material {
    name: "Soil",
    critical_angle_deg: 40.0,
    variance_deg: 5.0,
    cohesion: 0.2,
    density: 1.4,
};
const CLAY: Material = Material {
    name: "Clay",
    critical_angle_deg: 45.0,
    variance_deg: 8.0,
    cohesion: 0.5,
    density: 1.8,
};
const GRAVEL: Material = Material {
    name: "Gravel",
    critical_angle_deg: 38.0,
    variance_deg: 6.0,
    cohesion: 0.1,
    density: 1.7,
};
const MIXED_SOIL: Material = Material {
    name: "Mixed soil",
    critical_angle_deg: 42.0,
    variance_deg: 10.0,
    cohesion: 0.3,
    density: 1.5,
};
const WOOD_PELLETS: Material = Material {
    name: "Wood pellets",
    critical_angle_deg: 30.0,
    variance_deg: 4.0,
    cohesion: 0.1,
    density: 1.2,
};

impl MaterialKind {
    pub const ALL: [MaterialKind; 6] = [
        MaterialKind::Sand,
        MaterialKind::Soil,
        MaterialKind::Clay,
        MaterialKind::Gravel,
        MaterialKind::MixedSoil,
        MaterialKind::WoodPellets,
    ];

    pub fn material(self) -> &'static Material {
        match self {
            MaterialKind::Sand => &SAND,
            MaterialKind::Soil => &SOIL,
            MaterialKind::Clay => &CLAY,
            MaterialKind::Gravel => &GRAVEL,
            MaterialKind::MixedSoil => &MIXED_SOIL,
            MaterialKind::WoodPellets => &WOOD_PELLETS,
        }
    }

    /// Catalog key, as used in exports and the HTTP surface.
    pub fn key(self) -> &'static str {
        match self {
            MaterialKind::Sand => "sand",
            MaterialKind::Soil => "soil",
            MaterialKind::Clay => "clay",
            MaterialKind::Gravel => "gravel",
            MaterialKind::MixedSoil => "mixedSoil",
            MaterialKind::WoodPellets => "woodPellets",
        }
    }

    pub fn from_key(key: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|k| k.key() == key)
            .ok_or_else(|| ConfigError::UnknownMaterial(key.to_string()))
    }
}

impl FromStr for MaterialKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s)
    }
}

impl fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
