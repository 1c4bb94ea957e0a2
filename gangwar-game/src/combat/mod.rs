//! Competitive action resolution.
//!
//! Each resolver is a pure state transition over gang and member snapshots
//! plus a random stream: eligibility is checked first, then one roll decides
//! success, then the outcome is applied to the snapshots in place. Persisting
//! the result is the engine's job.

pub mod kidnap;
pub mod raid;
pub mod rob;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::Precondition;
use crate::resolver::{RateBreakdown, roll_percent, succeeds};
use crate::state::{Gang, Member};

pub use kidnap::{KidnapOutcome, resolve_kidnap};
pub use raid::{RaidOutcome, RaidResult, apply_raid_damage, resolve_raid};
pub use rob::{RobOutcome, resolve_rob};

/// A resolved success check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roll {
    pub odds: RateBreakdown,
    /// Uniform draw in `[0, 100)`.
    pub roll: f64,
    pub success: bool,
}

impl Roll {
    pub fn draw<R: RngCore + ?Sized>(odds: RateBreakdown, rng: &mut R) -> Self {
        let roll = roll_percent(rng);
        let success = succeeds(odds.rate, roll);
        Self {
            odds,
            roll,
            success,
        }
    }
}

/// The actor is free and affiliated. Returns the actor's gang name.
///
/// # Errors
///
/// Kidnapped or unaffiliated actors cannot start an action.
pub fn ensure_actor(actor: &Member) -> Result<&str, Precondition> {
    actor.ensure_free()?;
    actor.gang_name()
}

/// # Errors
///
/// Fails with [`Precondition::OwnGang`] when both sides are the same gang.
pub fn ensure_rival(attacker: &Gang, defender: &Gang) -> Result<(), Precondition> {
    if attacker.name == defender.name {
        return Err(Precondition::OwnGang);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{Modifier, ModifierKind};
    use crate::state::MemberId;
    use rand::rngs::mock::StepRng;

    #[test]
    fn roll_respects_rate_band() {
        let odds = RateBreakdown::new(
            50.0,
            vec![Modifier::penalty(ModifierKind::WallDefense, 500.0)],
        );
        let low = Roll::draw(odds.clone(), &mut StepRng::new(0, 0));
        assert!(low.success, "a floor rate still admits the lowest roll");
        let high = Roll::draw(odds, &mut StepRng::new(u64::MAX, 0));
        assert!(!high.success);
    }

    #[test]
    fn actors_must_be_free_and_affiliated() {
        let mut member = Member::new(MemberId::from("a"));
        assert_eq!(ensure_actor(&member), Err(Precondition::NotInGang));
        member.gang = Some("Crows".into());
        assert_eq!(ensure_actor(&member), Ok("Crows"));
    }

    #[test]
    fn own_gang_is_not_a_rival() {
        let gang = Gang::new("Crows".into(), MemberId::from("a"), 0);
        assert_eq!(ensure_rival(&gang, &gang.clone()), Err(Precondition::OwnGang));
    }
}
