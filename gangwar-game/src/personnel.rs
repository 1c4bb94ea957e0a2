//! Hired personnel and gang-wide upgrade tracks.
//!
//! Guards and medics are explicit unit records in a roster; a roster's length
//! is the unit count, so there is nothing to reconcile. Individual upgrades
//! always target the minimum-level units, which keeps the minimum
//! non-decreasing.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    GUARD_HIRE_COST, GUARD_UPGRADE_COST, MEDIC_HIRE_COST, MEDIC_REPAIR_HP,
    MEDIC_REPAIR_HP_PER_LEVEL, MEDIC_UPGRADE_COST, TRACK_MAX_LEVEL, UNIT_MAX_LEVEL,
};
use crate::error::Shortfall;
use crate::numbers::{count_to_f64, scale_floor};
use crate::progression::{UpgradeTrack, base_tier, upgrade_cost};
use crate::resolver::{guard_protection, training_bonus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Guard,
    Medic,
}

impl UnitKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Guard => "guard",
            Self::Medic => "medic",
        }
    }

    #[must_use]
    pub const fn hire_cost(self) -> i64 {
        match self {
            Self::Guard => GUARD_HIRE_COST,
            Self::Medic => MEDIC_HIRE_COST,
        }
    }

    /// Flat cost to raise one unit by one level.
    #[must_use]
    pub const fn upgrade_cost(self) -> i64 {
        match self {
            Self::Guard => GUARD_UPGRADE_COST,
            Self::Medic => MEDIC_UPGRADE_COST,
        }
    }

    /// Roster cap at the given base level.
    #[must_use]
    pub fn cap(self, base_level: u8) -> usize {
        let tier = base_tier(base_level);
        match self {
            Self::Guard => tier.max_guards,
            Self::Medic => tier.max_medics,
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guard" | "guards" => Ok(Self::Guard),
            "medic" | "medics" => Ok(Self::Medic),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub level: u8,
}

impl Default for Unit {
    fn default() -> Self {
        Self { level: 1 }
    }
}

pub type Roster = SmallVec<[Unit; 8]>;

/// A priced plan for raising the minimum-level units of one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnitUpgradePlan {
    pub kind: UnitKind,
    pub from_level: u8,
    pub units: usize,
    pub cost: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Army {
    #[serde(default)]
    pub guards: Roster,
    #[serde(default)]
    pub medics: Roster,
}

impl Army {
    #[must_use]
    pub fn roster(&self, kind: UnitKind) -> &Roster {
        match kind {
            UnitKind::Guard => &self.guards,
            UnitKind::Medic => &self.medics,
        }
    }

    fn roster_mut(&mut self, kind: UnitKind) -> &mut Roster {
        match kind {
            UnitKind::Guard => &mut self.guards,
            UnitKind::Medic => &mut self.medics,
        }
    }

    #[must_use]
    pub fn count(&self, kind: UnitKind) -> usize {
        self.roster(kind).len()
    }

    #[must_use]
    pub fn min_level(&self, kind: UnitKind) -> Option<u8> {
        self.roster(kind).iter().map(|unit| unit.level).min()
    }

    /// Check the tier cap for one more hire.
    ///
    /// # Errors
    ///
    /// Returns [`Shortfall::RosterFull`] when the roster is at its cap.
    pub fn can_hire(&self, kind: UnitKind, base_level: u8) -> Result<(), Shortfall> {
        let cap = kind.cap(base_level);
        if self.count(kind) >= cap {
            return Err(Shortfall::RosterFull { kind, cap });
        }
        Ok(())
    }

    /// Append a level-1 unit, returning the new roster size.
    ///
    /// # Errors
    ///
    /// Returns [`Shortfall::RosterFull`] when the roster is at its cap.
    pub fn hire(&mut self, kind: UnitKind, base_level: u8) -> Result<usize, Shortfall> {
        self.can_hire(kind, base_level)?;
        let roster = self.roster_mut(kind);
        roster.push(Unit::default());
        Ok(roster.len())
    }

    /// Price an upgrade of the minimum-level unit (or all of them when `bulk`).
    ///
    /// # Errors
    ///
    /// Fails when the roster is empty or every unit is already at max level.
    pub fn plan_upgrade(&self, kind: UnitKind, bulk: bool) -> Result<UnitUpgradePlan, Shortfall> {
        let from_level = self.min_level(kind).ok_or(Shortfall::NoUnits(kind))?;
        if from_level >= UNIT_MAX_LEVEL {
            return Err(Shortfall::MaxLevel(kind.as_str().to_string()));
        }
        let units = if bulk {
            self.roster(kind)
                .iter()
                .filter(|unit| unit.level == from_level)
                .count()
        } else {
            1
        };
        let count = i64::try_from(units).unwrap_or(i64::MAX);
        Ok(UnitUpgradePlan {
            kind,
            from_level,
            units,
            cost: kind.upgrade_cost().saturating_mul(count),
        })
    }

    /// Raise the planned number of minimum-level units by one level.
    /// Returns the roster's new minimum level.
    pub fn apply_upgrade(&mut self, plan: &UnitUpgradePlan) -> u8 {
        let roster = self.roster_mut(plan.kind);
        roster
            .iter_mut()
            .filter(|unit| unit.level == plan.from_level)
            .take(plan.units)
            .for_each(|unit| unit.level = (unit.level + 1).min(UNIT_MAX_LEVEL));
        self.min_level(plan.kind).unwrap_or(plan.from_level)
    }

    /// Combined protection of every guard against robs and kidnaps.
    #[must_use]
    pub fn guard_protection(&self, guards_training: u8) -> f64 {
        count_to_f64(self.guards.len()) * guard_protection(guards_training)
    }

    /// Hit points the medic crew patches per repair, before the base amount.
    #[must_use]
    pub fn medic_repair(&self, medic_training: u8) -> i64 {
        let crew: i64 = self
            .medics
            .iter()
            .map(|unit| {
                MEDIC_REPAIR_HP + i64::from(unit.level.saturating_sub(1)) * MEDIC_REPAIR_HP_PER_LEVEL
            })
            .sum();
        let factor = 1.0 + training_bonus(medic_training) / 100.0;
        scale_floor(crew, factor)
    }
}

/// Gang-wide upgrade tiers, each in `[1, 10]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upgrades {
    pub weapons: u8,
    pub walls: u8,
    pub guards_training: u8,
    pub medic_training: u8,
}

impl Default for Upgrades {
    fn default() -> Self {
        Self {
            weapons: 1,
            walls: 1,
            guards_training: 1,
            medic_training: 1,
        }
    }
}

/// A priced plan for one track step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackUpgradePlan {
    pub track: UpgradeTrack,
    pub from_level: u8,
    pub to_level: u8,
    pub cost: i64,
}

impl Upgrades {
    #[must_use]
    pub const fn level(&self, track: UpgradeTrack) -> u8 {
        match track {
            UpgradeTrack::Weapons => self.weapons,
            UpgradeTrack::Walls => self.walls,
            UpgradeTrack::GuardsTraining => self.guards_training,
            UpgradeTrack::MedicTraining => self.medic_training,
        }
    }

    const fn level_mut(&mut self, track: UpgradeTrack) -> &mut u8 {
        match track {
            UpgradeTrack::Weapons => &mut self.weapons,
            UpgradeTrack::Walls => &mut self.walls,
            UpgradeTrack::GuardsTraining => &mut self.guards_training,
            UpgradeTrack::MedicTraining => &mut self.medic_training,
        }
    }

    /// # Errors
    ///
    /// Returns [`Shortfall::MaxLevel`] once the track is at level 10.
    pub fn plan(&self, track: UpgradeTrack) -> Result<TrackUpgradePlan, Shortfall> {
        let from_level = self.level(track);
        let cost = upgrade_cost(track, from_level)
            .ok_or_else(|| Shortfall::MaxLevel(track.as_str().to_string()))?;
        Ok(TrackUpgradePlan {
            track,
            from_level,
            to_level: from_level + 1,
            cost,
        })
    }

    pub fn apply(&mut self, plan: &TrackUpgradePlan) {
        let level = self.level_mut(plan.track);
        *level = plan.to_level.min(TRACK_MAX_LEVEL);
    }

    #[must_use]
    pub fn in_range(&self) -> bool {
        UpgradeTrack::ALL
            .iter()
            .all(|track| (1..=TRACK_MAX_LEVEL).contains(&self.level(*track)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn army_with(levels: &[u8]) -> Army {
        let mut army = Army::default();
        army.guards = levels.iter().map(|level| Unit { level: *level }).collect();
        army
    }

    #[test]
    fn hire_respects_tier_cap() {
        let mut army = Army::default();
        assert_eq!(army.hire(UnitKind::Guard, 1), Ok(1));
        assert_eq!(army.hire(UnitKind::Guard, 1), Ok(2));
        assert_eq!(
            army.hire(UnitKind::Guard, 1),
            Err(Shortfall::RosterFull {
                kind: UnitKind::Guard,
                cap: 2
            })
        );
        assert_eq!(army.hire(UnitKind::Guard, 2), Ok(3));
        assert!(army.guards.iter().all(|unit| unit.level == 1));
    }

    #[test]
    fn single_upgrade_targets_minimum() {
        let mut army = army_with(&[3, 1, 2, 1]);
        let plan = army.plan_upgrade(UnitKind::Guard, false).expect("plan");
        assert_eq!(plan.from_level, 1);
        assert_eq!(plan.units, 1);
        assert_eq!(plan.cost, GUARD_UPGRADE_COST);
        assert_eq!(army.apply_upgrade(&plan), 1);

        let plan = army.plan_upgrade(UnitKind::Guard, false).expect("plan");
        assert_eq!(army.apply_upgrade(&plan), 2);
        let mut levels: Vec<u8> = army.guards.iter().map(|u| u.level).collect();
        levels.sort_unstable();
        assert_eq!(levels, vec![2, 2, 2, 3]);
    }

    #[test]
    fn bulk_upgrade_raises_every_minimum_unit() {
        let mut army = army_with(&[2, 2, 4, 2]);
        let plan = army.plan_upgrade(UnitKind::Guard, true).expect("plan");
        assert_eq!(plan.units, 3);
        assert_eq!(plan.cost, GUARD_UPGRADE_COST * 3);
        assert_eq!(army.apply_upgrade(&plan), 3);
    }

    #[test]
    fn minimum_never_decreases_across_upgrades() {
        let mut army = army_with(&[1, 5, 1, 3, 2]);
        let mut previous = army.min_level(UnitKind::Guard).expect("min");
        while let Ok(plan) = army.plan_upgrade(UnitKind::Guard, false) {
            let next = army.apply_upgrade(&plan);
            assert!(next >= previous);
            previous = next;
        }
        assert_eq!(previous, UNIT_MAX_LEVEL);
    }

    #[test]
    fn empty_and_maxed_rosters_cannot_upgrade() {
        let army = Army::default();
        assert_eq!(
            army.plan_upgrade(UnitKind::Medic, false),
            Err(Shortfall::NoUnits(UnitKind::Medic))
        );
        let maxed = army_with(&[UNIT_MAX_LEVEL]);
        assert!(matches!(
            maxed.plan_upgrade(UnitKind::Guard, true),
            Err(Shortfall::MaxLevel(_))
        ));
    }

    #[test]
    fn guard_protection_sums_units() {
        let army = army_with(&[1, 1, 1]);
        assert!((army.guard_protection(1) - 15.0).abs() < f64::EPSILON);
        assert!((army.guard_protection(2) - 45.0).abs() < f64::EPSILON);
    }

    #[test]
    fn guard_protection_ignores_unit_levels() {
        let veterans = army_with(&[5, 5, 5]);
        assert!((veterans.guard_protection(1) - 15.0).abs() < f64::EPSILON);
        assert!((veterans.guard_protection(3) - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn medic_repair_scales_with_training() {
        let mut army = Army::default();
        army.medics.push(Unit { level: 1 });
        army.medics.push(Unit { level: 3 });
        assert_eq!(army.medic_repair(1), 50);
        assert_eq!(army.medic_repair(2), 55);
    }

    #[test]
    fn track_plans_stop_at_max() {
        let mut upgrades = Upgrades::default();
        let plan = upgrades.plan(UpgradeTrack::Walls).expect("plan");
        assert_eq!(plan.cost, 2_500);
        upgrades.apply(&plan);
        assert_eq!(upgrades.walls, 2);
        upgrades.walls = TRACK_MAX_LEVEL;
        assert!(upgrades.plan(UpgradeTrack::Walls).is_err());
        assert!(upgrades.in_range());
    }
}
