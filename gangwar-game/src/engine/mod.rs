//! Command surface over the record store.
//!
//! Every operation follows the same cycle: read versioned snapshots, check
//! preconditions, compute the new records, then commit them as one batch. A
//! version conflict re-runs the whole cycle up to the configured attempt
//! bound. Pocket charges are taken just before the commit and refunded if it
//! fails.

mod actions;
mod economy;
mod lifecycle;
mod maintenance;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::collab::{Directory, Wallet};
use crate::constants::DEFAULT_COMMIT_ATTEMPTS;
use crate::error::{GangError, GangResult, Precondition, Shortfall};
use crate::rng::{DrawCounts, RngBundle};
use crate::state::{Gang, Member, MemberId};
use crate::store::{Store, StoreError, Version, Versioned, WriteBatch, gang_key};

pub use economy::{BaseUpgrade, HireReport, RansomReport, RepairReport, ToolPurchase};
pub use lifecycle::DisbandReport;
pub use maintenance::{HostageFix, Release};

/// Runtime knobs for a [`GangEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seed for the combat random streams.
    pub seed: u64,
    #[serde(default = "EngineConfig::default_attempts")]
    pub max_commit_attempts: u32,
}

impl EngineConfig {
    const fn default_attempts() -> u32 {
        DEFAULT_COMMIT_ATTEMPTS
    }

    #[must_use]
    pub const fn seeded(seed: u64) -> Self {
        Self {
            seed,
            max_commit_attempts: DEFAULT_COMMIT_ATTEMPTS,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::seeded(0)
    }
}

/// One row of the power ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub name: String,
    pub power: i64,
    pub wins: u32,
    pub losses: u32,
    pub base_level: u8,
    pub members: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Charge {
    actor: MemberId,
    amount: i64,
}

/// Pocket credit funded by a vault debit inside the same batch.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Payout {
    actor: MemberId,
    amount: i64,
    from_gang: String,
}

/// Writes computed by one attempt, plus pocket movements around the commit.
struct Plan<T> {
    batch: WriteBatch,
    charge: Option<Charge>,
    payout: Option<Payout>,
    outcome: T,
}

impl<T> Plan<T> {
    const fn new(batch: WriteBatch, outcome: T) -> Self {
        Self {
            batch,
            charge: None,
            payout: None,
            outcome,
        }
    }

    /// Debit `amount` from the actor's pocket when the batch commits.
    fn charging(mut self, actor: &MemberId, amount: i64) -> Self {
        if amount > 0 {
            self.charge = Some(Charge {
                actor: actor.clone(),
                amount,
            });
        }
        self
    }

    /// Credit `amount` from `gang`'s vault to the actor's pocket after the
    /// batch commits.
    fn paying(mut self, gang: &str, actor: &MemberId, amount: i64) -> Self {
        if amount > 0 {
            self.payout = Some(Payout {
                actor: actor.clone(),
                amount,
                from_gang: gang.to_string(),
            });
        }
        self
    }
}

/// Gang economy engine over injected collaborators.
pub struct GangEngine<S, W, D, C> {
    store: S,
    wallet: W,
    directory: D,
    clock: C,
    rng: RngBundle,
    config: EngineConfig,
}

impl<S, W, D, C> GangEngine<S, W, D, C>
where
    S: Store,
    W: Wallet,
    D: Directory,
    C: Clock,
{
    #[must_use]
    pub fn new(store: S, wallet: W, directory: D, clock: C, config: EngineConfig) -> Self {
        Self {
            store,
            wallet,
            directory,
            clock,
            rng: RngBundle::from_user_seed(config.seed),
            config,
        }
    }

    /// Replace the random streams, e.g. with [`RngBundle::scripted`].
    #[must_use]
    pub fn with_rng(mut self, rng: RngBundle) -> Self {
        self.rng = rng;
        self
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn wallet(&self) -> &W {
        &self.wallet
    }

    pub const fn directory(&self) -> &D {
        &self.directory
    }

    pub const fn clock(&self) -> &C {
        &self.clock
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn draws(&self) -> DrawCounts {
        self.rng.draws()
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn gang(&self, name: &str) -> GangResult<Option<Gang>> {
        Ok(self.store.gang(name)?.map(|v| v.record))
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn member(&self, id: &MemberId) -> GangResult<Option<Member>> {
        Ok(self.store.member(id)?.map(|v| v.record))
    }

    /// # Errors
    ///
    /// Returns an error if the wallet cannot be read.
    pub fn pocket(&self, id: &MemberId) -> GangResult<i64> {
        Ok(self.wallet.balance(id)?)
    }

    /// Gangs ranked by power, then wins, then name.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn leaderboard(&self, limit: usize) -> GangResult<Vec<LeaderboardEntry>> {
        let mut gangs: Vec<Gang> = self.store.gangs()?.into_iter().map(|v| v.record).collect();
        gangs.sort_by(|a, b| {
            b.power
                .cmp(&a.power)
                .then_with(|| b.record.wins.cmp(&a.record.wins))
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(gangs
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(idx, gang)| LeaderboardEntry {
                rank: idx + 1,
                power: gang.power,
                wins: gang.record.wins,
                losses: gang.record.losses,
                base_level: gang.base.level,
                members: gang.members.len(),
                name: gang.name,
            })
            .collect())
    }

    /// Audit every stored record and the links between gangs and members.
    ///
    /// # Errors
    ///
    /// Returns [`GangError::InvariantViolation`] naming the first broken rule.
    pub fn audit(&self) -> GangResult<()> {
        let gangs = self.store.gangs()?;
        let members = self.store.members()?;
        for gang in &gangs {
            gang.record
                .check_invariants()
                .map_err(GangError::InvariantViolation)?;
        }
        for member in &members {
            let member = &member.record;
            member
                .check_invariants()
                .map_err(GangError::InvariantViolation)?;
            if let Some(name) = &member.gang {
                let listed = gangs.iter().any(|g| {
                    gang_key(&g.record.name) == gang_key(name)
                        && g.record.members.contains(&member.id)
                });
                if !listed {
                    return Err(GangError::InvariantViolation(format!(
                        "member {} points at gang {name} which does not list them",
                        member.id
                    )));
                }
            }
        }
        Ok(())
    }

    fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Load a member, creating a fresh record for known identities.
    fn load_member(&self, id: &MemberId) -> GangResult<(Option<Version>, Member)> {
        if let Some(found) = self.store.member(id)? {
            return Ok((Some(found.version), found.record));
        }
        if self.directory.profile(id).is_none() {
            return Err(Precondition::UnknownIdentity(id.clone()).into());
        }
        Ok((None, Member::new(id.clone())))
    }

    fn load_gang(&self, name: &str) -> GangResult<Versioned<Gang>> {
        self.store
            .gang(name)?
            .ok_or_else(|| Precondition::UnknownGang.into())
    }

    /// The actor's own gang, which the actor must belong to.
    fn own_gang(&self, member: &Member) -> GangResult<Versioned<Gang>> {
        let name = member.gang_name()?;
        match self.store.gang(name)? {
            Some(gang) if gang.record.members.contains(&member.id) => Ok(gang),
            _ => Err(Precondition::NotInGang.into()),
        }
    }

    fn require_pocket(&self, actor: &MemberId, need: i64) -> GangResult<()> {
        let have = self.wallet.balance(actor)?;
        if have < need {
            return Err(Shortfall::Pocket { have, need }.into());
        }
        Ok(())
    }

    fn verify(batch: &WriteBatch) -> GangResult<()> {
        let checks = batch
            .gangs()
            .map(Gang::check_invariants)
            .chain(batch.members().map(Member::check_invariants));
        for check in checks {
            if let Err(msg) = check {
                log::error!("aborting commit: {msg}");
                return Err(GangError::InvariantViolation(msg));
            }
        }
        Ok(())
    }

    /// Return a charge taken for a batch that never committed.
    fn refund(&self, op: &str, charge: Option<&Charge>) -> GangResult<()> {
        let Some(charge) = charge else {
            return Ok(());
        };
        log::warn!("{op}: refunding {} to {}", charge.amount, charge.actor);
        self.wallet
            .credit(&charge.actor, charge.amount)
            .map_err(|err| {
                log::error!("{op}: refund to {} failed: {err}", charge.actor);
                GangError::Unsettled {
                    actor: charge.actor.clone(),
                    amount: charge.amount,
                    reason: format!("refund failed: {err}"),
                }
            })
    }

    /// Pay out after a committed vault debit. When the pocket credit fails
    /// the vault is credited back.
    fn settle_payout(&self, op: &str, payout: &Payout) -> GangResult<()> {
        let Err(err) = self.wallet.credit(&payout.actor, payout.amount) else {
            return Ok(());
        };
        log::warn!(
            "{op}: payout of {} to {} failed ({err}); restoring {}",
            payout.amount,
            payout.actor,
            payout.from_gang
        );
        let restored = self.transact("restore_vault", |engine| {
            let mut gang = engine.load_gang(&payout.from_gang)?;
            let credited = gang.record.credit(payout.amount);
            let mut batch = WriteBatch::new();
            batch.put_gang(Some(gang.version), gang.record);
            Ok(Plan::new(batch, credited))
        });
        match restored {
            Ok(credited) if credited == payout.amount => Err(err.into()),
            Ok(credited) => Err(GangError::Unsettled {
                actor: payout.actor.clone(),
                amount: payout.amount - credited,
                reason: format!("payout failed ({err}) and the vault had room for {credited}"),
            }),
            Err(restore_err) => {
                log::error!("{op}: could not restore {}: {restore_err}", payout.from_gang);
                Err(GangError::Unsettled {
                    actor: payout.actor.clone(),
                    amount: payout.amount,
                    reason: format!("payout failed ({err}) and restore failed ({restore_err})"),
                })
            }
        }
    }

    /// Run `attempt` until its batch commits or the attempt bound is reached.
    fn transact<T>(
        &self,
        op: &'static str,
        mut attempt: impl FnMut(&Self) -> GangResult<Plan<T>>,
    ) -> GangResult<T> {
        let attempts = self.config.max_commit_attempts.max(1);
        let mut last_key = String::new();
        for n in 1..=attempts {
            let plan = attempt(self)?;
            Self::verify(&plan.batch)?;
            if let Some(charge) = &plan.charge {
                self.wallet.debit(&charge.actor, charge.amount)?;
            }
            match self.store.commit(plan.batch) {
                Ok(()) => {
                    if let Some(payout) = &plan.payout {
                        self.settle_payout(op, payout)?;
                    }
                    return Ok(plan.outcome);
                }
                Err(StoreError::Conflict { key }) => {
                    log::warn!("{op}: write conflict on {key} (attempt {n}/{attempts})");
                    self.refund(op, plan.charge.as_ref())?;
                    last_key = key.to_string();
                }
                Err(err @ StoreError::Backend(_)) => {
                    self.refund(op, plan.charge.as_ref())?;
                    return Err(err.into());
                }
            }
        }
        Err(GangError::ConcurrencyConflict {
            key: last_key,
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::collab::{MemoryDirectory, MemoryWallet};
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    type Engine = GangEngine<MemoryStore, MemoryWallet, MemoryDirectory, ManualClock>;

    fn engine() -> Engine {
        GangEngine::new(
            MemoryStore::new(),
            MemoryWallet::new(),
            MemoryDirectory::new(),
            ManualClock::starting_at(1_000),
            EngineConfig::seeded(9),
        )
    }

    #[test]
    fn unknown_identities_are_rejected() {
        let engine = engine();
        let ghost = MemberId::from("ghost");
        assert_eq!(
            engine.load_member(&ghost).unwrap_err(),
            GangError::PreconditionFailed(Precondition::UnknownIdentity(ghost))
        );
    }

    #[test]
    fn conflicts_retry_then_surface() {
        let engine = engine();
        let actor = MemberId::from("a");
        engine.wallet.set(&actor, 100);
        let tries = AtomicU32::new(0);
        let result: GangResult<()> = engine.transact("test", |_| {
            tries.fetch_add(1, Ordering::SeqCst);
            let mut batch = WriteBatch::new();
            // Expects a version that never exists.
            batch.put_member(Some(99), Member::new(MemberId::from("a")));
            Ok(Plan::new(batch, ()).charging(&actor, 40))
        });
        assert!(matches!(
            result,
            Err(GangError::ConcurrencyConflict { attempts: 4, .. })
        ));
        assert_eq!(tries.load(Ordering::SeqCst), 4);
        assert_eq!(engine.wallet.balance(&actor), Ok(100));
    }

    #[test]
    fn invariant_violations_abort_before_charging() {
        let engine = engine();
        let actor = MemberId::from("a");
        engine.wallet.set(&actor, 100);
        let result: GangResult<()> = engine.transact("test", |_| {
            let mut gang = Gang::new("Bad".into(), actor.clone(), 0);
            gang.vault = -1;
            let mut batch = WriteBatch::new();
            batch.put_gang(None, gang);
            Ok(Plan::new(batch, ()).charging(&actor, 40))
        });
        assert!(matches!(result, Err(GangError::InvariantViolation(_))));
        assert_eq!(engine.wallet.balance(&actor), Ok(100));
        assert!(engine.gang("Bad").unwrap().is_none());
    }

    #[test]
    fn config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_commit_attempts, DEFAULT_COMMIT_ATTEMPTS);
        let parsed: EngineConfig = serde_json::from_str(r#"{"seed": 5}"#).unwrap();
        assert_eq!(parsed, EngineConfig::seeded(5));
    }
}
