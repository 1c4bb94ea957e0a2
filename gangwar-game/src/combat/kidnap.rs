//! Member abductions.
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::Roll;
use crate::clock::Timestamp;
use crate::constants::{
    KIDNAP_BASE_RATE, KIDNAP_FAIL_POWER, KIDNAP_MAX_HOURS, KIDNAP_MIN_HOURS,
    KIDNAP_UNAFFILIATED_BONUS, KIDNAP_WIN_POWER, SECS_PER_HOUR,
};
use crate::error::Precondition;
use crate::resolver::{Modifier, ModifierKind, RateBreakdown, guard_protection, pick_inclusive};
use crate::state::{Captivity, Gang, Member, MemberId, MemberStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KidnapOutcome {
    pub kidnapper: MemberId,
    pub target: MemberId,
    pub roll: Roll,
    /// Captivity length in hours, on success.
    pub hours: Option<i64>,
    pub until: Option<Timestamp>,
    pub escort_lost: bool,
}

/// Whether `target` may be kidnapped by `actor`.
///
/// # Errors
///
/// The target may not be the actor, already captive, sheltering at their
/// gang's base, or a fellow gang member.
pub fn check_target(actor: &Member, target: &Member) -> Result<(), Precondition> {
    if actor.id == target.id {
        return Err(Precondition::SelfTarget);
    }
    if target.is_kidnapped() {
        return Err(Precondition::TargetKidnapped);
    }
    if target.gang.is_some() && target.status == MemberStatus::Base {
        return Err(Precondition::TargetAtBase);
    }
    if target.gang.is_some() && target.gang == actor.gang {
        return Err(Precondition::OwnGang);
    }
    Ok(())
}

fn odds(target: &Member, target_gang: Option<&Gang>) -> RateBreakdown {
    let mut modifiers = Vec::with_capacity(3);
    if target.gang.is_none() {
        modifiers.push(Modifier::bonus(
            ModifierKind::UnaffiliatedTarget,
            KIDNAP_UNAFFILIATED_BONUS,
        ));
    }
    let training = target_gang.map_or(1, |gang| gang.upgrades.guards_training);
    if let Some(gang) = target_gang {
        modifiers.push(Modifier::penalty(
            ModifierKind::GuardProtection,
            gang.army.guard_protection(training),
        ));
    }
    if target.escort {
        modifiers.push(Modifier::penalty(
            ModifierKind::EscortProtection,
            guard_protection(training),
        ));
    }
    RateBreakdown::new(KIDNAP_BASE_RATE, modifiers)
}

/// Resolve a kidnap, mutating the target and the kidnapper's gang.
///
/// Eligibility must already have passed [`check_target`].
pub fn resolve_kidnap<R: RngCore + ?Sized>(
    actor: &Member,
    actor_gang: &mut Gang,
    target: &mut Member,
    target_gang: Option<&Gang>,
    rng: &mut R,
    now: Timestamp,
) -> KidnapOutcome {
    let roll = Roll::draw(odds(target, target_gang), rng);
    let escort_lost = roll.success && target.escort;

    let (hours, until) = if roll.success {
        let hours = pick_inclusive(rng, KIDNAP_MIN_HOURS, KIDNAP_MAX_HOURS);
        let until = now + hours * SECS_PER_HOUR;
        target.kidnap(Captivity::for_gang(until, actor.id.clone(), actor_gang));
        actor_gang.hostages += 1;
        actor_gang.record.kidnaps += 1;
        actor_gang.gain_power(KIDNAP_WIN_POWER);
        (Some(hours), Some(until))
    } else {
        actor_gang.lose_power(KIDNAP_FAIL_POWER);
        (None, None)
    };

    log::debug!(
        "kidnap {} -> {}: rate {:.1} roll {:.2} hours {:?}",
        actor.id, target.id, roll.odds.rate, roll.roll, hours
    );
    KidnapOutcome {
        kidnapper: actor.id.clone(),
        target: target.id.clone(),
        roll,
        hours,
        until,
        escort_lost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::personnel::Unit;
    use rand::rngs::mock::StepRng;

    fn member(id: &str, gang: Option<&str>) -> Member {
        let mut member = Member::new(MemberId::from(id));
        member.gang = gang.map(str::to_string);
        member
    }

    #[test]
    fn three_guards_cut_rate_to_fifty_five() {
        let mut defenders = Gang::new("D".into(), MemberId::from("t"), 0);
        for _ in 0..3 {
            defenders.army.guards.push(Unit::default());
        }
        let target = member("t", Some("D"));
        let odds = odds(&target, Some(&defenders));
        assert!((odds.rate - 55.0).abs() < f64::EPSILON);
    }

    #[test]
    fn veteran_guards_protect_like_recruits() {
        let mut defenders = Gang::new("D".into(), MemberId::from("t"), 0);
        for _ in 0..3 {
            defenders.army.guards.push(Unit { level: 5 });
        }
        let target = member("t", Some("D"));
        assert!((odds(&target, Some(&defenders)).rate - 55.0).abs() < f64::EPSILON);

        defenders.upgrades.guards_training = 2;
        // 3 guards at 15 each.
        assert!((odds(&target, Some(&defenders)).rate - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unaffiliated_target_with_escort() {
        let mut target = member("t", None);
        assert!((odds(&target, None).rate - 90.0).abs() < f64::EPSILON);
        target.escort = true;
        assert!((odds(&target, None).rate - 85.0).abs() < f64::EPSILON);
    }

    #[test]
    fn eligibility_rules() {
        let actor = member("a", Some("A"));
        assert_eq!(check_target(&actor, &actor), Err(Precondition::SelfTarget));

        let mut sheltered = member("t", Some("D"));
        sheltered.status = MemberStatus::Base;
        assert_eq!(check_target(&actor, &sheltered), Err(Precondition::TargetAtBase));

        let ally = member("b", Some("A"));
        assert_eq!(check_target(&actor, &ally), Err(Precondition::OwnGang));

        let loner = member("l", None);
        assert_eq!(check_target(&actor, &loner), Ok(()));

        let mut captive = member("c", None);
        captive.kidnap(Captivity {
            until: 1,
            by: MemberId::from("x"),
            captor_gang: None,
            captor_founded_at: None,
        });
        assert_eq!(check_target(&actor, &captive), Err(Precondition::TargetKidnapped));
    }

    #[test]
    fn success_takes_target_and_escort() {
        let actor = member("a", Some("A"));
        let mut gang = Gang::new("A".into(), MemberId::from("a"), 0);
        let mut target = member("t", None);
        target.escort = true;
        let outcome = resolve_kidnap(
            &actor,
            &mut gang,
            &mut target,
            None,
            &mut StepRng::new(0, 0),
            1_000,
        );
        assert_eq!(outcome.hours, Some(1));
        assert_eq!(outcome.until, Some(1_000 + SECS_PER_HOUR));
        assert!(outcome.escort_lost);
        assert!(target.is_kidnapped());
        assert!(!target.escort);
        let captivity = target.captivity.as_ref().expect("captive");
        assert_eq!(captivity.by, actor.id);
        assert_eq!(captivity.captor_gang.as_deref(), Some("A"));
        assert_eq!(captivity.captor_founded_at, Some(gang.founded_at));
        assert_eq!(gang.hostages, 1);
        assert_eq!(gang.record.kidnaps, 1);
        assert_eq!(gang.power, KIDNAP_WIN_POWER);
    }

    #[test]
    fn failure_costs_power_only() {
        let actor = member("a", Some("A"));
        let mut gang = Gang::new("A".into(), MemberId::from("a"), 0);
        gang.power = 10;
        let mut target = member("t", None);
        let outcome = resolve_kidnap(
            &actor,
            &mut gang,
            &mut target,
            None,
            &mut StepRng::new(u64::MAX, 0),
            0,
        );
        assert!(outcome.hours.is_none());
        assert!(!target.is_kidnapped());
        assert_eq!(gang.power, 8);
        assert_eq!(gang.hostages, 0);
    }
}
