//! Static progression tables: base tiers, upgrade track cost curves and wall names.
//!
//! Every combat and economy formula reads these tables; nothing else encodes
//! per-level stats.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::TRACK_MAX_LEVEL;

pub const BASE_MIN_LEVEL: u8 = 1;
pub const BASE_MAX_LEVEL: u8 = 8;

/// Stats for a single base tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BaseTier {
    pub level: u8,
    pub name: &'static str,
    pub max_hp: i64,
    pub vault_capacity: i64,
    pub max_guards: usize,
    pub max_medics: usize,
    /// Cost to reach the next tier; `None` at the top tier.
    pub upgrade_cost: Option<i64>,
}

static BASE_TIERS: [BaseTier; BASE_MAX_LEVEL as usize] = [
    BaseTier {
        level: 1,
        name: "Shack",
        max_hp: 250,
        vault_capacity: 10_000,
        max_guards: 2,
        max_medics: 1,
        upgrade_cost: Some(5_000),
    },
    BaseTier {
        level: 2,
        name: "Hideout",
        max_hp: 500,
        vault_capacity: 25_000,
        max_guards: 4,
        max_medics: 2,
        upgrade_cost: Some(15_000),
    },
    BaseTier {
        level: 3,
        name: "Safehouse",
        max_hp: 900,
        vault_capacity: 50_000,
        max_guards: 6,
        max_medics: 3,
        upgrade_cost: Some(40_000),
    },
    BaseTier {
        level: 4,
        name: "Warehouse",
        max_hp: 1_500,
        vault_capacity: 100_000,
        max_guards: 8,
        max_medics: 4,
        upgrade_cost: Some(90_000),
    },
    BaseTier {
        level: 5,
        name: "Compound",
        max_hp: 2_400,
        vault_capacity: 200_000,
        max_guards: 10,
        max_medics: 5,
        upgrade_cost: Some(200_000),
    },
    BaseTier {
        level: 6,
        name: "Fortress",
        max_hp: 3_600,
        vault_capacity: 400_000,
        max_guards: 12,
        max_medics: 6,
        upgrade_cost: Some(450_000),
    },
    BaseTier {
        level: 7,
        name: "Citadel",
        max_hp: 5_000,
        vault_capacity: 750_000,
        max_guards: 15,
        max_medics: 8,
        upgrade_cost: Some(1_000_000),
    },
    BaseTier {
        level: 8,
        name: "Kingpin HQ",
        max_hp: 7_500,
        vault_capacity: 1_500_000,
        max_guards: 20,
        max_medics: 10,
        upgrade_cost: None,
    },
];

const WALL_NAMES: [&str; TRACK_MAX_LEVEL as usize] = [
    "Wooden Fence",
    "Chain-Link",
    "Brick Wall",
    "Razor Wire",
    "Concrete Barrier",
    "Reinforced Concrete",
    "Steel Plating",
    "Blast Wall",
    "Bunker Shell",
    "Vault Fortification",
];

/// Look up the tier for `level`, clamping out-of-range levels into `[1, 8]`.
#[must_use]
pub fn base_tier(level: u8) -> &'static BaseTier {
    let clamped = level.clamp(BASE_MIN_LEVEL, BASE_MAX_LEVEL);
    &BASE_TIERS[usize::from(clamped - 1)]
}

#[must_use]
pub fn max_hp(level: u8) -> i64 {
    base_tier(level).max_hp
}

#[must_use]
pub fn vault_capacity(level: u8) -> i64 {
    base_tier(level).vault_capacity
}

#[must_use]
pub fn wall_name(level: u8) -> &'static str {
    let idx = level.clamp(1, TRACK_MAX_LEVEL) - 1;
    WALL_NAMES[usize::from(idx)]
}

/// Gang-wide upgrade tracks with geometric cost scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeTrack {
    Weapons,
    Walls,
    GuardsTraining,
    MedicTraining,
}

impl UpgradeTrack {
    pub const ALL: [Self; 4] = [
        Self::Weapons,
        Self::Walls,
        Self::GuardsTraining,
        Self::MedicTraining,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weapons => "weapons",
            Self::Walls => "walls",
            Self::GuardsTraining => "guards_training",
            Self::MedicTraining => "medic_training",
        }
    }

    #[must_use]
    pub const fn base_cost(self) -> i64 {
        match self {
            Self::Weapons => 2_000,
            Self::Walls => 2_500,
            Self::GuardsTraining => 1_500,
            Self::MedicTraining => 1_200,
        }
    }

    /// Per-level cost multiplier as an exact ratio (1.5 or 1.4).
    #[must_use]
    pub const fn multiplier(self) -> (i64, i64) {
        match self {
            Self::Weapons | Self::Walls => (3, 2),
            Self::GuardsTraining | Self::MedicTraining => (7, 5),
        }
    }
}

impl fmt::Display for UpgradeTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpgradeTrack {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weapons" => Ok(Self::Weapons),
            "walls" => Ok(Self::Walls),
            "guards_training" | "guardstraining" => Ok(Self::GuardsTraining),
            "medic_training" | "medictraining" => Ok(Self::MedicTraining),
            _ => Err(()),
        }
    }
}

/// `floor(base × multiplier^(current-1))`, or `None` once the track is maxed.
#[must_use]
pub fn upgrade_cost(track: UpgradeTrack, current_level: u8) -> Option<i64> {
    if current_level >= TRACK_MAX_LEVEL {
        return None;
    }
    let exponent = u32::from(current_level.max(1) - 1);
    let (num, den) = track.multiplier();
    Some(track.base_cost() * num.pow(exponent) / den.pow(exponent))
}
