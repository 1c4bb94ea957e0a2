//! Raid, rob and kidnap commands.
use super::{GangEngine, Plan};
use crate::clock::Clock;
use crate::collab::{Directory, Wallet};
use crate::combat::kidnap::check_target;
use crate::combat::raid::cooldown_remaining;
use crate::combat::{
    KidnapOutcome, RaidOutcome, RobOutcome, ensure_actor, ensure_rival, resolve_kidnap,
    resolve_raid, resolve_rob,
};
use crate::cooldown::Action;
use crate::error::{GangError, GangResult};
use crate::state::MemberId;
use crate::store::{Store, WriteBatch};

fn cooldown_check(action: Action, remaining: Option<i64>) -> GangResult<()> {
    match remaining {
        Some(remaining_secs) => Err(GangError::CooldownActive {
            action,
            remaining_secs,
        }),
        None => Ok(()),
    }
}

impl<S, W, D, C> GangEngine<S, W, D, C>
where
    S: Store,
    W: Wallet,
    D: Directory,
    C: Clock,
{
    /// Raid another gang's base on behalf of the actor's gang.
    ///
    /// A lethal raid deletes the defender in the same batch and detaches its
    /// members. Two concurrent lethal raids cannot both commit: the loser's
    /// batch fails on the defender's version and is re-resolved against the
    /// fresh state.
    ///
    /// # Errors
    ///
    /// Fails if the actor is kidnapped or unaffiliated, the target is missing
    /// or the actor's own gang, or the gang raided within the last minute.
    pub fn raid(&self, actor: &MemberId, target_gang: &str) -> GangResult<RaidOutcome> {
        let outcome = self.transact("raid", |engine| {
            let now = engine.now();
            let (_, member) = engine.load_member(actor)?;
            ensure_actor(&member)?;
            let mut attacker = engine.own_gang(&member)?;
            let mut defender = engine.load_gang(target_gang)?;
            ensure_rival(&attacker.record, &defender.record)?;
            cooldown_check(Action::Raid, cooldown_remaining(&attacker.record, now))?;

            let outcome = {
                let mut rng = engine.rng.raid();
                resolve_raid(&mut attacker.record, &mut defender.record, &mut *rng, now)
            };

            let mut batch = WriteBatch::new();
            if outcome.destroyed() {
                batch.delete_gang(defender.record.name.clone(), defender.version);
                for id in &defender.record.members {
                    if let Some(stored) = engine.store.member(id)? {
                        let mut evicted = stored.record;
                        evicted.clear_gang();
                        batch.put_member(Some(stored.version), evicted);
                    }
                }
            } else {
                batch.put_gang(Some(defender.version), defender.record);
            }
            batch.put_gang(Some(attacker.version), attacker.record);
            Ok(Plan::new(batch, outcome))
        })?;
        if outcome.destroyed() {
            log::info!(
                "{} destroyed {} (raid by {actor})",
                outcome.attacker,
                outcome.defender
            );
        }
        Ok(outcome)
    }

    /// Rob another gang's vault.
    ///
    /// # Errors
    ///
    /// Fails if the actor is kidnapped or unaffiliated, the target is missing
    /// or the actor's own gang, or the actor robbed within the last 30 seconds.
    pub fn rob(&self, actor: &MemberId, target_gang: &str) -> GangResult<RobOutcome> {
        self.transact("rob", |engine| {
            let now = engine.now();
            let (version, mut member) = engine.load_member(actor)?;
            ensure_actor(&member)?;
            cooldown_check(Action::Rob, member.cooldowns.remaining(Action::Rob, now))?;
            let mut attacker = engine.own_gang(&member)?;
            let mut defender = engine.load_gang(target_gang)?;
            ensure_rival(&attacker.record, &defender.record)?;

            let outcome = {
                let mut rng = engine.rng.rob();
                let mut tool_rng = engine.rng.tools();
                resolve_rob(
                    &mut attacker.record,
                    &mut defender.record,
                    &mut *rng,
                    &mut *tool_rng,
                )
            };
            member.cooldowns.stamp(Action::Rob, now);

            let mut batch = WriteBatch::new();
            batch
                .put_gang(Some(attacker.version), attacker.record)
                .put_gang(Some(defender.version), defender.record)
                .put_member(version, member);
            Ok(Plan::new(batch, outcome))
        })
    }

    /// Kidnap another player for one to three hours.
    ///
    /// # Errors
    ///
    /// Fails if the actor is kidnapped or unaffiliated, on cooldown, or the
    /// target is unknown, the actor, a gang-mate, already captive or at base.
    pub fn kidnap(&self, actor: &MemberId, target: &MemberId) -> GangResult<KidnapOutcome> {
        self.transact("kidnap", |engine| {
            let now = engine.now();
            let (version, mut member) = engine.load_member(actor)?;
            ensure_actor(&member)?;
            cooldown_check(
                Action::Kidnap,
                member.cooldowns.remaining(Action::Kidnap, now),
            )?;
            let (target_version, mut victim) = engine.load_member(target)?;
            check_target(&member, &victim)?;
            let mut captors = engine.own_gang(&member)?;
            let victim_gang = match victim.gang.as_deref() {
                Some(name) => engine.store.gang(name)?.map(|v| v.record),
                None => None,
            };

            let outcome = {
                let mut rng = engine.rng.kidnap();
                resolve_kidnap(
                    &member,
                    &mut captors.record,
                    &mut victim,
                    victim_gang.as_ref(),
                    &mut *rng,
                    now,
                )
            };
            member.cooldowns.stamp(Action::Kidnap, now);

            let mut batch = WriteBatch::new();
            batch
                .put_gang(Some(captors.version), captors.record)
                .put_member(version, member)
                .put_member(target_version, victim);
            Ok(Plan::new(batch, outcome))
        })
    }

    /// Whether `actor` could start `action` right now, and if not, how long
    /// until they can.
    ///
    /// # Errors
    ///
    /// Returns an error if the actor is unknown or the store cannot be read.
    pub fn cooldown(&self, actor: &MemberId, action: Action) -> GangResult<Option<i64>> {
        let now = self.now();
        let (_, member) = self.load_member(actor)?;
        if action == Action::Raid {
            return Ok(match member.gang.as_deref() {
                Some(name) => self
                    .store
                    .gang(name)?
                    .and_then(|g| cooldown_remaining(&g.record, now)),
                None => None,
            });
        }
        Ok(member.cooldowns.remaining(action, now))
    }
}
