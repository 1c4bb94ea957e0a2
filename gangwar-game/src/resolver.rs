//! Success-rate algebra shared by every competitive action.
//!
//! A rate starts from an action's base probability, adds every named modifier
//! (negative values subtract) and is clamped once into the `[5, 95]` band so no
//! action is ever deterministic. A single uniform roll in `[0, 100)` below the
//! rate is a success.
//!
//! All randomness flows through [`unit_draw`], which maps one `u64` onto a
//! float in `[0, 1)`. Integer ranges are derived from that float instead of
//! rejection sampling, so scripted generators such as `StepRng` are safe.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::constants::{
    GUARD_BASE_PROTECTION, RATE_CEILING, RATE_FLOOR, ROLL_SCALE, TRAINING_BONUS_PER_LEVEL,
    WALL_DEFENSE_PER_LEVEL, WEAPON_DAMAGE_BONUS_PER_LEVEL, WEAPON_SUCCESS_BONUS_PER_LEVEL,
};
use crate::numbers::{floor_f64_to_i64, i64_to_f64};

/// Named term contributing to a success rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    WeaponBonus,
    ToolBonus,
    BreachCharge,
    UnaffiliatedTarget,
    WallDefense,
    GuardProtection,
    EscortProtection,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub kind: ModifierKind,
    /// Signed percentage points; defensive terms are negative.
    pub value: f64,
}

impl Modifier {
    #[must_use]
    pub const fn bonus(kind: ModifierKind, value: f64) -> Self {
        Self { kind, value }
    }

    #[must_use]
    pub fn penalty(kind: ModifierKind, value: f64) -> Self {
        Self {
            kind,
            value: -value.abs(),
        }
    }
}

/// Full accounting of a resolved rate, reported back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateBreakdown {
    pub base: f64,
    pub modifiers: Vec<Modifier>,
    /// Sum before clamping; may fall outside the safety band.
    pub raw: f64,
    pub rate: f64,
}

impl RateBreakdown {
    #[must_use]
    pub fn new(base: f64, modifiers: Vec<Modifier>) -> Self {
        let raw = raw_rate(base, &modifiers);
        Self {
            base,
            modifiers,
            raw,
            rate: clamp_rate(raw),
        }
    }

    /// Total contribution of one modifier kind.
    #[must_use]
    pub fn contribution(&self, kind: ModifierKind) -> f64 {
        self.modifiers
            .iter()
            .filter(|m| m.kind == kind)
            .map(|m| m.value)
            .sum()
    }
}

fn raw_rate(base: f64, modifiers: &[Modifier]) -> f64 {
    modifiers
        .iter()
        .map(|m| if m.value.is_finite() { m.value } else { 0.0 })
        .fold(base, |acc, v| acc + v)
}

/// Clamp into the `[5, 95]` band. Non-finite input collapses to the floor.
#[must_use]
pub fn clamp_rate(raw: f64) -> f64 {
    if raw.is_nan() {
        return RATE_FLOOR;
    }
    raw.clamp(RATE_FLOOR, RATE_CEILING)
}

/// Resolve a success rate from a base probability and its modifiers.
#[must_use]
pub fn resolve(base: f64, modifiers: &[Modifier]) -> f64 {
    clamp_rate(raw_rate(base, modifiers))
}

#[must_use]
pub fn training_bonus(level: u8) -> f64 {
    f64::from(level.max(1) - 1) * TRAINING_BONUS_PER_LEVEL
}

/// Fractional damage increase granted by the weapons track.
#[must_use]
pub fn weapon_damage_bonus(level: u8) -> f64 {
    f64::from(level.max(1) - 1) * WEAPON_DAMAGE_BONUS_PER_LEVEL
}

#[must_use]
pub fn weapon_success_bonus(level: u8) -> f64 {
    f64::from(level.max(1) - 1) * WEAPON_SUCCESS_BONUS_PER_LEVEL
}

#[must_use]
pub fn wall_defense_bonus(level: u8) -> f64 {
    f64::from(level.max(1) - 1) * WALL_DEFENSE_PER_LEVEL
}

/// Protection one guard adds against robs and kidnaps. Set by the gang's
/// guards-training tier; a guard's own level does not enter it.
#[must_use]
pub fn guard_protection(training_level: u8) -> f64 {
    GUARD_BASE_PROTECTION + training_bonus(training_level)
}

/// Uniform float in `[0, 1)` from a single draw.
pub fn unit_draw<R: RngCore + ?Sized>(rng: &mut R) -> f64 {
    rng.r#gen::<f64>()
}

/// Uniform roll in `[0, 100)`.
pub fn roll_percent<R: RngCore + ?Sized>(rng: &mut R) -> f64 {
    unit_draw(rng) * ROLL_SCALE
}

#[must_use]
pub fn succeeds(rate: f64, roll: f64) -> bool {
    roll < rate
}

/// Uniform fraction in `[lo, hi]`.
pub fn pick_fraction<R: RngCore + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if hi <= lo {
        return lo;
    }
    unit_draw(rng).mul_add(hi - lo, lo)
}

/// Uniform integer in `[lo, hi]`; returns `lo` when the range is empty.
pub fn pick_inclusive<R: RngCore + ?Sized>(rng: &mut R, lo: i64, hi: i64) -> i64 {
    if hi <= lo {
        return lo;
    }
    let span = i64_to_f64(hi - lo) + 1.0;
    let offset = floor_f64_to_i64(unit_draw(rng) * span);
    (lo + offset).min(hi)
}
