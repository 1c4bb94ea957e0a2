//! Quick vault theft, countered by the defender's guards.
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::Roll;
use crate::constants::{
    ROB_BASE_RATE, ROB_FAIL_ATTACKER_POWER, ROB_FAIL_DEFENDER_POWER, ROB_MAX_STEAL, ROB_MIN_STEAL,
    ROB_VICTIM_POWER, ROB_WIN_POWER,
};
use crate::resolver::{Modifier, ModifierKind, RateBreakdown, pick_inclusive};
use crate::state::Gang;
use crate::tools::{LockpickUse, use_lockpick};
use crate::vault::{self, Account, Transfer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobOutcome {
    pub attacker: String,
    pub defender: String,
    pub roll: Roll,
    pub lockpick: Option<LockpickUse>,
    /// Present on success.
    pub stolen: Option<Transfer>,
}

/// Steal window against a vault: `[min(500, vault), min(cap, vault)]`.
#[must_use]
pub fn steal_bounds(vault: i64, steal_cap_bonus: i64) -> (i64, i64) {
    let vault = vault.max(0);
    let max_steal = ROB_MAX_STEAL + steal_cap_bonus;
    (ROB_MIN_STEAL.min(vault), max_steal.min(vault))
}

/// Resolve a rob, mutating both gang snapshots.
///
/// The attacker's best lockpick is used and rolled for breakage on the tool
/// stream before the success roll; a broken lockpick is gone either way.
pub fn resolve_rob<R, T>(
    attacker: &mut Gang,
    defender: &mut Gang,
    rng: &mut R,
    tool_rng: &mut T,
) -> RobOutcome
where
    R: RngCore + ?Sized,
    T: RngCore + ?Sized,
{
    let lockpick = use_lockpick(&mut attacker.tools, tool_rng);
    let mut modifiers = Vec::with_capacity(2);
    if let Some(used) = &lockpick {
        modifiers.push(Modifier::bonus(ModifierKind::ToolBonus, used.success_bonus));
    }
    modifiers.push(Modifier::penalty(
        ModifierKind::GuardProtection,
        defender
            .army
            .guard_protection(defender.upgrades.guards_training),
    ));
    let roll = Roll::draw(RateBreakdown::new(ROB_BASE_RATE, modifiers), rng);

    let stolen = if roll.success {
        let cap_bonus = lockpick.map_or(0, |used| used.steal_cap_bonus);
        let (lo, hi) = steal_bounds(defender.vault, cap_bonus);
        let amount = pick_inclusive(rng, lo, hi);
        let to_capacity = attacker.capacity();
        let from_capacity = defender.capacity();
        let moved = vault::transfer(
            Account {
                balance: &mut defender.vault,
                capacity: from_capacity,
            },
            Account {
                balance: &mut attacker.vault,
                capacity: to_capacity,
            },
            amount,
        );
        attacker.gain_power(ROB_WIN_POWER);
        attacker.record.robs += 1;
        defender.lose_power(ROB_VICTIM_POWER);
        Some(moved)
    } else {
        attacker.lose_power(ROB_FAIL_ATTACKER_POWER);
        defender.gain_power(ROB_FAIL_DEFENDER_POWER);
        None
    };

    log::debug!(
        "rob {} -> {}: rate {:.1} roll {:.2} lockpick {:?} stolen {:?}",
        attacker.name, defender.name, roll.odds.rate, roll.roll, lockpick, stolen
    );
    RobOutcome {
        attacker: attacker.name.clone(),
        defender: defender.name.clone(),
        roll,
        lockpick,
        stolen,
    }
}
