//! Tool catalog and gang-scoped tool inventory.
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::BREACH_CHARGE_STACK_MAX;
use crate::error::Shortfall;
use crate::resolver::unit_draw;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    BasicLockpick,
    SteelLockpick,
    TitanLockpick,
    BreachCharge,
}

impl ToolKind {
    pub const ALL: [Self; 4] = [
        Self::BasicLockpick,
        Self::SteelLockpick,
        Self::TitanLockpick,
        Self::BreachCharge,
    ];

    /// Lockpicks in preference order, best first.
    pub const LOCKPICKS: [Self; 3] = [Self::TitanLockpick, Self::SteelLockpick, Self::BasicLockpick];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BasicLockpick => "basic_lockpick",
            Self::SteelLockpick => "steel_lockpick",
            Self::TitanLockpick => "titan_lockpick",
            Self::BreachCharge => "breach_charge",
        }
    }

    #[must_use]
    pub fn spec(self) -> &'static ToolSpec {
        match self {
            Self::BasicLockpick => &CATALOG[0],
            Self::SteelLockpick => &CATALOG[1],
            Self::TitanLockpick => &CATALOG[2],
            Self::BreachCharge => &CATALOG[3],
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

/// Static catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToolSpec {
    pub kind: ToolKind,
    pub name: &'static str,
    pub price: i64,
    /// Permanent tools are owned once and only lost to breakage.
    pub permanent: bool,
    pub success_bonus: f64,
    pub steal_cap_bonus: i64,
    /// Probability in `[0, 1]` that the tool breaks when used.
    pub break_chance: f64,
}

pub static CATALOG: [ToolSpec; 4] = [
    ToolSpec {
        kind: ToolKind::BasicLockpick,
        name: "Basic Lockpick",
        price: 2_000,
        permanent: true,
        success_bonus: 10.0,
        steal_cap_bonus: 0,
        break_chance: 0.25,
    },
    ToolSpec {
        kind: ToolKind::SteelLockpick,
        name: "Steel Lockpick",
        price: 6_000,
        permanent: true,
        success_bonus: 25.0,
        steal_cap_bonus: 0,
        break_chance: 0.10,
    },
    ToolSpec {
        kind: ToolKind::TitanLockpick,
        name: "Titan Lockpick",
        price: 15_000,
        permanent: true,
        success_bonus: 45.0,
        steal_cap_bonus: 2_000,
        break_chance: 0.05,
    },
    ToolSpec {
        kind: ToolKind::BreachCharge,
        name: "Breach Charge",
        price: 5_000,
        permanent: false,
        success_bonus: 30.0,
        steal_cap_bonus: 0,
        break_chance: 0.0,
    },
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInventory {
    #[serde(default)]
    pub basic_lockpick: bool,
    #[serde(default)]
    pub steel_lockpick: bool,
    #[serde(default)]
    pub titan_lockpick: bool,
    #[serde(default)]
    pub breach_charges: u32,
}

impl ToolInventory {
    #[must_use]
    pub const fn owns(&self, kind: ToolKind) -> bool {
        match kind {
            ToolKind::BasicLockpick => self.basic_lockpick,
            ToolKind::SteelLockpick => self.steel_lockpick,
            ToolKind::TitanLockpick => self.titan_lockpick,
            ToolKind::BreachCharge => self.breach_charges > 0,
        }
    }

    /// Check that one more `kind` fits in the inventory.
    ///
    /// # Errors
    ///
    /// Permanent tools may only be owned once; breach charges stack to 5.
    pub fn can_add(&self, kind: ToolKind) -> Result<(), Shortfall> {
        match kind {
            ToolKind::BreachCharge if self.breach_charges >= BREACH_CHARGE_STACK_MAX => {
                Err(Shortfall::StackFull(kind))
            }
            ToolKind::BreachCharge => Ok(()),
            _ if self.owns(kind) => Err(Shortfall::ToolOwned(kind)),
            _ => Ok(()),
        }
    }

    /// # Errors
    ///
    /// See [`ToolInventory::can_add`].
    pub fn add(&mut self, kind: ToolKind) -> Result<(), Shortfall> {
        self.can_add(kind)?;
        match kind {
            ToolKind::BasicLockpick => self.basic_lockpick = true,
            ToolKind::SteelLockpick => self.steel_lockpick = true,
            ToolKind::TitanLockpick => self.titan_lockpick = true,
            ToolKind::BreachCharge => self.breach_charges += 1,
        }
        Ok(())
    }

    /// Drop one `kind`. Returns false when nothing was owned.
    pub const fn remove(&mut self, kind: ToolKind) -> bool {
        if !self.owns(kind) {
            return false;
        }
        match kind {
            ToolKind::BasicLockpick => self.basic_lockpick = false,
            ToolKind::SteelLockpick => self.steel_lockpick = false,
            ToolKind::TitanLockpick => self.titan_lockpick = false,
            ToolKind::BreachCharge => self.breach_charges -= 1,
        }
        true
    }

    /// Best owned lockpick: titan, then steel, then basic.
    #[must_use]
    pub fn best_lockpick(&self) -> Option<ToolKind> {
        ToolKind::LOCKPICKS.into_iter().find(|kind| self.owns(*kind))
    }

    /// Spend one breach charge if any remain.
    pub const fn take_breach_charge(&mut self) -> bool {
        self.remove(ToolKind::BreachCharge)
    }
}

/// Result of using a lockpick on a rob.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LockpickUse {
    pub kind: ToolKind,
    pub success_bonus: f64,
    pub steal_cap_bonus: i64,
    pub broke: bool,
}

/// Use the best owned lockpick, rolling for breakage.
/// A broken lockpick is removed from the inventory; its bonus still applies.
pub fn use_lockpick<R: RngCore + ?Sized>(
    inventory: &mut ToolInventory,
    rng: &mut R,
) -> Option<LockpickUse> {
    let kind = inventory.best_lockpick()?;
    let spec = kind.spec();
    let broke = unit_draw(rng) < spec.break_chance;
    if broke {
        inventory.remove(kind);
    }
    Some(LockpickUse {
        kind,
        success_bonus: spec.success_bonus,
        steal_cap_bonus: spec.steal_cap_bonus,
        broke,
    })
}
