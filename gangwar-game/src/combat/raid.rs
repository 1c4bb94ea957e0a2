//! Gang-on-gang raids against a base.
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::Roll;
use crate::clock::Timestamp;
use crate::constants::{
    RAID_BASE_RATE, RAID_BREACH_FLAT_DAMAGE, RAID_BREACH_SUCCESS_BONUS, RAID_DAMAGE_MAX_PCT,
    RAID_DAMAGE_MIN_PCT, RAID_DEFENDER_LOSS_POWER, RAID_DESTROY_POWER, RAID_FAIL_ATTACKER_POWER,
    RAID_FAIL_DEFENDER_POWER, RAID_LOOT_MAX_PCT, RAID_LOOT_MIN_PCT, RAID_WIN_POWER,
};
use crate::cooldown::{Action, remaining};
use crate::numbers::{floor_f64_to_i64, i64_to_f64, scale_floor};
use crate::resolver::{
    Modifier, ModifierKind, RateBreakdown, pick_fraction, wall_defense_bonus, weapon_damage_bonus,
    weapon_success_bonus,
};
use crate::state::Gang;
use crate::vault::{self, Account, Transfer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RaidResult {
    /// The base survived; some of its vault was looted.
    Damaged {
        damage: i64,
        hp_left: i64,
        loot: Transfer,
    },
    /// Hit points reached zero. The defender's vault was seized and the gang
    /// must be dissolved.
    Destroyed { damage: i64, seized: Transfer },
    Repelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaidOutcome {
    pub attacker: String,
    pub defender: String,
    pub roll: Roll,
    pub breach_charge_used: bool,
    pub result: RaidResult,
}

impl RaidOutcome {
    #[must_use]
    pub const fn destroyed(&self) -> bool {
        matches!(self.result, RaidResult::Destroyed { .. })
    }
}

/// Seconds until the attacking gang may raid again.
#[must_use]
pub fn cooldown_remaining(attacker: &Gang, now: Timestamp) -> Option<i64> {
    remaining(Action::Raid, attacker.base.last_raid_at, now)
}

/// `floor(max_hp × pct × (1 + weapon bonus))`, plus the flat breach damage.
#[must_use]
pub fn apply_raid_damage(max_hp: i64, pct: f64, weapons_level: u8, breach_charge: bool) -> i64 {
    let scaled = i64_to_f64(max_hp) * pct * (1.0 + weapon_damage_bonus(weapons_level));
    let flat = if breach_charge {
        RAID_BREACH_FLAT_DAMAGE
    } else {
        0
    };
    floor_f64_to_i64(scaled).max(0) + flat
}

fn odds(attacker: &Gang, defender: &Gang, breach_charge: bool) -> RateBreakdown {
    let mut modifiers = vec![
        Modifier::bonus(
            ModifierKind::WeaponBonus,
            weapon_success_bonus(attacker.upgrades.weapons),
        ),
        Modifier::penalty(
            ModifierKind::WallDefense,
            wall_defense_bonus(defender.upgrades.walls),
        ),
    ];
    if breach_charge {
        modifiers.push(Modifier::bonus(
            ModifierKind::BreachCharge,
            RAID_BREACH_SUCCESS_BONUS,
        ));
    }
    RateBreakdown::new(RAID_BASE_RATE, modifiers)
}

/// Resolve a raid, mutating both gang snapshots.
///
/// A breach charge is consumed whenever one is owned and its bonus applies
/// whatever the outcome. The attacker's raid clock is stamped on every attempt.
/// When the result is [`RaidResult::Destroyed`] the caller must delete the
/// defender and release its members.
pub fn resolve_raid<R: RngCore + ?Sized>(
    attacker: &mut Gang,
    defender: &mut Gang,
    rng: &mut R,
    now: Timestamp,
) -> RaidOutcome {
    let breach_charge_used = attacker.tools.take_breach_charge();
    let roll = Roll::draw(odds(attacker, defender, breach_charge_used), rng);
    attacker.base.last_raid_at = Some(now);

    let result = if roll.success {
        let pct = pick_fraction(rng, RAID_DAMAGE_MIN_PCT, RAID_DAMAGE_MAX_PCT);
        let damage = apply_raid_damage(
            defender.tier().max_hp,
            pct,
            attacker.upgrades.weapons,
            breach_charge_used,
        );
        let hp_left = defender.take_damage(damage);
        attacker.record.wins += 1;
        attacker.record.raids += 1;
        if hp_left == 0 {
            let seized = seize(attacker, defender, defender.vault);
            attacker.gain_power(RAID_DESTROY_POWER);
            RaidResult::Destroyed { damage, seized }
        } else {
            let share = pick_fraction(rng, RAID_LOOT_MIN_PCT, RAID_LOOT_MAX_PCT);
            let loot = seize(attacker, defender, scale_floor(defender.vault, share));
            attacker.gain_power(RAID_WIN_POWER);
            defender.lose_power(RAID_DEFENDER_LOSS_POWER);
            defender.record.losses += 1;
            RaidResult::Damaged {
                damage,
                hp_left,
                loot,
            }
        }
    } else {
        attacker.lose_power(RAID_FAIL_ATTACKER_POWER);
        attacker.record.losses += 1;
        defender.gain_power(RAID_FAIL_DEFENDER_POWER);
        RaidResult::Repelled
    };

    log::debug!(
        "raid {} -> {}: rate {:.1} roll {:.2} breach {} => {:?}",
        attacker.name, defender.name, roll.odds.rate, roll.roll, breach_charge_used, result
    );
    RaidOutcome {
        attacker: attacker.name.clone(),
        defender: defender.name.clone(),
        roll,
        breach_charge_used,
        result,
    }
}

fn seize(attacker: &mut Gang, defender: &mut Gang, amount: i64) -> Transfer {
    let to_capacity = attacker.capacity();
    let from_capacity = defender.capacity();
    vault::transfer(
        Account {
            balance: &mut defender.vault,
            capacity: from_capacity,
        },
        Account {
            balance: &mut attacker.vault,
            capacity: to_capacity,
        },
        amount,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemberId;
    use rand::rngs::mock::StepRng;

    fn gang(name: &str) -> Gang {
        Gang::new(name.into(), MemberId::from(name), 0)
    }

    #[test]
    fn damage_formula_matches_shack_example() {
        // 250 max HP at 12% with no weapon upgrades is 30 damage.
        assert_eq!(apply_raid_damage(250, 0.12, 1, false), 30);
        assert_eq!(apply_raid_damage(250, 0.12, 1, true), 130);
        assert_eq!(apply_raid_damage(1_000, 0.10, 3, false), 130);
    }

    #[test]
    fn successful_raid_loots_capped_share() {
        let mut attacker = gang("A");
        let mut defender = gang("D");
        attacker.vault = 9_900;
        defender.vault = 8_000;
        let mut rng = StepRng::new(0, 0);
        let outcome = resolve_raid(&mut attacker, &mut defender, &mut rng, 100);

        assert!(outcome.roll.success);
        // Lowest roll: 5% damage of 250 HP and 5% loot of 8 000.
        let RaidResult::Damaged {
            damage,
            hp_left,
            loot,
        } = outcome.result
        else {
            panic!("expected damage, got {:?}", outcome.result);
        };
        assert_eq!(damage, 12);
        assert_eq!(hp_left, 238);
        assert_eq!(loot.requested, 400);
        assert_eq!(loot.credited, 100);
        assert_eq!(attacker.vault, 10_000);
        assert_eq!(defender.vault, 7_900);
        assert_eq!(attacker.power, RAID_WIN_POWER);
        assert_eq!(attacker.record.wins, 1);
        assert_eq!(defender.record.losses, 1);
        assert_eq!(attacker.base.last_raid_at, Some(100));
    }

    #[test]
    fn lethal_raid_seizes_vault() {
        let mut attacker = gang("A");
        let mut defender = gang("D");
        attacker.tools.breach_charges = 1;
        defender.base.hp = 50;
        defender.vault = 3_000;
        let mut rng = StepRng::new(0, 0);
        let outcome = resolve_raid(&mut attacker, &mut defender, &mut rng, 0);

        assert!(outcome.breach_charge_used);
        assert!(outcome.destroyed());
        assert_eq!(defender.base.hp, 0);
        assert_eq!(attacker.vault, 3_000);
        assert_eq!(defender.vault, 0);
        assert_eq!(attacker.power, RAID_DESTROY_POWER);
        assert_eq!(attacker.tools.breach_charges, 0);
    }

    #[test]
    fn repelled_raid_shifts_power() {
        let mut attacker = gang("A");
        let mut defender = gang("D");
        attacker.power = 2;
        attacker.tools.breach_charges = 2;
        let mut rng = StepRng::new(u64::MAX, 0);
        let outcome = resolve_raid(&mut attacker, &mut defender, &mut rng, 5);

        assert_eq!(outcome.result, RaidResult::Repelled);
        assert!(outcome.breach_charge_used);
        assert_eq!(attacker.tools.breach_charges, 1);
        assert_eq!(attacker.power, 0);
        assert_eq!(attacker.record.losses, 1);
        assert_eq!(defender.power, RAID_FAIL_DEFENDER_POWER);
        assert_eq!(defender.base.hp, 250);
        assert_eq!(cooldown_remaining(&attacker, 35), Some(30));
    }

    #[test]
    fn walls_and_breach_feed_the_rate() {
        let mut attacker = gang("A");
        let mut defender = gang("D");
        attacker.upgrades.weapons = 3;
        defender.upgrades.walls = 5;
        let odds = odds(&attacker, &defender, true);
        assert!((odds.rate - 70.0).abs() < f64::EPSILON);
        defender.upgrades.walls = 10;
        attacker.upgrades.weapons = 1;
        let odds = super::odds(&attacker, &defender, false);
        assert!((odds.rate - 5.0).abs() < f64::EPSILON);
    }
}
