//! Founding, membership and leadership operations.
use serde::{Deserialize, Serialize};

use super::{GangEngine, Plan};
use crate::clock::Clock;
use crate::collab::{Directory, Wallet};
use crate::constants::FOUNDING_COST;
use crate::error::{GangResult, Precondition};
use crate::state::{Gang, MemberId, Role, Settings, normalize_gang_name};
use crate::store::{Store, WriteBatch};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisbandReport {
    pub gang: String,
    pub released: Vec<MemberId>,
}

impl<S, W, D, C> GangEngine<S, W, D, C>
where
    S: Store,
    W: Wallet,
    D: Directory,
    C: Clock,
{
    /// Found a gang with the actor as leader, paying the founding fee.
    ///
    /// # Errors
    ///
    /// Fails if the actor is kidnapped or already affiliated, the name is
    /// invalid or taken (case-insensitively), or the pocket is short.
    pub fn found_gang(&self, actor: &MemberId, name: &str) -> GangResult<Gang> {
        let name = normalize_gang_name(name)?;
        let founded = self.transact("found_gang", |engine| {
            let (version, mut member) = engine.load_member(actor)?;
            member.ensure_free()?;
            if member.gang.is_some() {
                return Err(Precondition::AlreadyInGang.into());
            }
            if engine.store.gang(&name)?.is_some() {
                return Err(Precondition::NameTaken.into());
            }
            engine.require_pocket(actor, FOUNDING_COST)?;

            let gang = Gang::new(name.clone(), actor.clone(), engine.now());
            member.gang = Some(name.clone());
            let mut batch = WriteBatch::new();
            batch
                .put_gang(None, gang.clone())
                .put_member(version, member);
            Ok(Plan::new(batch, gang).charging(actor, FOUNDING_COST))
        })?;
        log::info!("{actor} founded {}", founded.name);
        Ok(founded)
    }

    /// Dissolve the actor's gang. Every member is detached; captives stay
    /// captive.
    ///
    /// # Errors
    ///
    /// Only the leader may disband.
    pub fn disband_gang(&self, actor: &MemberId) -> GangResult<DisbandReport> {
        let report = self.transact("disband_gang", |engine| {
            let (_, member) = engine.load_member(actor)?;
            let gang = engine.own_gang(&member)?;
            gang.record.require_leader(actor)?;

            let mut batch = WriteBatch::new();
            batch.delete_gang(gang.record.name.clone(), gang.version);
            let mut released = Vec::with_capacity(gang.record.members.len());
            for id in &gang.record.members {
                if let Some(stored) = engine.store.member(id)? {
                    let mut former = stored.record;
                    former.clear_gang();
                    batch.put_member(Some(stored.version), former);
                }
                released.push(id.clone());
            }
            Ok(Plan::new(
                batch,
                DisbandReport {
                    gang: gang.record.name,
                    released,
                },
            ))
        })?;
        log::info!("{actor} disbanded {}", report.gang);
        Ok(report)
    }

    /// Join an open gang.
    ///
    /// # Errors
    ///
    /// Fails if the actor is kidnapped, already affiliated, banned, under the
    /// gang's level requirement, or the gang is closed.
    pub fn join_gang(&self, actor: &MemberId, name: &str) -> GangResult<Gang> {
        self.transact("join_gang", |engine| {
            let (version, mut member) = engine.load_member(actor)?;
            member.ensure_free()?;
            if member.gang.is_some() {
                return Err(Precondition::AlreadyInGang.into());
            }
            let mut gang = engine.load_gang(name)?;
            let record = &mut gang.record;
            if record.banned.contains(actor) {
                return Err(Precondition::Banned.into());
            }
            if !record.settings.allow_invites {
                return Err(Precondition::Closed.into());
            }
            let level = engine
                .directory
                .profile(actor)
                .map_or(0, |profile| profile.level);
            let need = record.settings.min_level_to_join;
            if level < need {
                return Err(Precondition::LevelTooLow { have: level, need }.into());
            }

            record.add_member(actor.clone());
            member.gang = Some(record.name.clone());
            let mut batch = WriteBatch::new();
            batch
                .put_gang(Some(gang.version), gang.record.clone())
                .put_member(version, member);
            Ok(Plan::new(batch, gang.record))
        })
    }

    /// Leave the actor's gang. Leaders must hand over or disband first.
    ///
    /// # Errors
    ///
    /// Fails for unaffiliated actors and for the leader.
    pub fn leave_gang(&self, actor: &MemberId) -> GangResult<String> {
        self.transact("leave_gang", |engine| {
            let (version, mut member) = engine.load_member(actor)?;
            let mut gang = engine.own_gang(&member)?;
            if gang.record.leader == *actor {
                return Err(Precondition::LeaderMustStay.into());
            }
            gang.record.remove_member(actor);
            member.clear_gang();
            let name = gang.record.name.clone();
            let mut batch = WriteBatch::new();
            batch
                .put_gang(Some(gang.version), gang.record)
                .put_member(version, member);
            Ok(Plan::new(batch, name))
        })
    }

    /// Remove `target` from the actor's gang. Officers may only kick plain
    /// members; nobody kicks the leader.
    ///
    /// # Errors
    ///
    /// Fails on missing role or when `target` is not a member.
    pub fn kick_member(&self, actor: &MemberId, target: &MemberId) -> GangResult<()> {
        self.expel(actor, target, false, "kick_member")
    }

    /// Kick `target` if present and bar them from rejoining.
    ///
    /// # Errors
    ///
    /// Same rules as [`GangEngine::kick_member`].
    pub fn ban_member(&self, actor: &MemberId, target: &MemberId) -> GangResult<()> {
        self.expel(actor, target, true, "ban_member")
    }

    fn expel(&self, actor: &MemberId, target: &MemberId, ban: bool, op: &'static str) -> GangResult<()> {
        self.transact(op, |engine| {
            let (_, member) = engine.load_member(actor)?;
            let mut gang = engine.own_gang(&member)?;
            let record = &mut gang.record;
            record.require_manager(actor)?;
            if actor == target {
                return Err(Precondition::SelfTarget.into());
            }
            let target_role = record.role_of(target);
            match (record.role_of(actor), target_role) {
                (_, Some(Role::Leader)) => return Err(Precondition::MissingRole(Role::Leader).into()),
                (Some(Role::Officer), Some(Role::Officer)) => {
                    return Err(Precondition::MissingRole(Role::Leader).into());
                }
                (_, None) if !ban => return Err(Precondition::NotMember.into()),
                _ => {}
            }

            let mut batch = WriteBatch::new();
            if target_role.is_some() {
                record.remove_member(target);
                if let Some(stored) = engine.store.member(target)? {
                    let mut expelled = stored.record;
                    expelled.clear_gang();
                    batch.put_member(Some(stored.version), expelled);
                }
            }
            if ban {
                record.banned.insert(target.clone());
            }
            batch.put_gang(Some(gang.version), gang.record);
            Ok(Plan::new(batch, ()))
        })?;
        log::debug!("{actor} {op} {target}");
        Ok(())
    }

    /// Lift a ban. Returns whether one was in place.
    ///
    /// # Errors
    ///
    /// Requires leader or officer.
    pub fn unban_member(&self, actor: &MemberId, target: &MemberId) -> GangResult<bool> {
        self.transact("unban_member", |engine| {
            let (_, member) = engine.load_member(actor)?;
            let mut gang = engine.own_gang(&member)?;
            gang.record.require_manager(actor)?;
            let lifted = gang.record.banned.remove(target);
            let mut batch = WriteBatch::new();
            if lifted {
                batch.put_gang(Some(gang.version), gang.record);
            }
            Ok(Plan::new(batch, lifted))
        })
    }

    /// # Errors
    ///
    /// Leader only; `target` must be a plain member.
    pub fn promote_officer(&self, actor: &MemberId, target: &MemberId) -> GangResult<()> {
        self.set_officer(actor, target, true, "promote_officer")
    }

    /// # Errors
    ///
    /// Leader only; `target` must be an officer.
    pub fn demote_officer(&self, actor: &MemberId, target: &MemberId) -> GangResult<()> {
        self.set_officer(actor, target, false, "demote_officer")
    }

    fn set_officer(
        &self,
        actor: &MemberId,
        target: &MemberId,
        promote: bool,
        op: &'static str,
    ) -> GangResult<()> {
        self.transact(op, |engine| {
            let (_, member) = engine.load_member(actor)?;
            let mut gang = engine.own_gang(&member)?;
            let record = &mut gang.record;
            record.require_leader(actor)?;
            let expected = if promote { Role::Member } else { Role::Officer };
            if record.role_of(target) != Some(expected) {
                return Err(Precondition::NotMember.into());
            }
            if promote {
                record.officers.insert(target.clone());
            } else {
                record.officers.remove(target);
            }
            let mut batch = WriteBatch::new();
            batch.put_gang(Some(gang.version), gang.record);
            Ok(Plan::new(batch, ()))
        })
    }

    /// Hand the gang to another member. The old leader becomes an officer.
    ///
    /// # Errors
    ///
    /// Leader only; `target` must be a member.
    pub fn transfer_leadership(&self, actor: &MemberId, target: &MemberId) -> GangResult<()> {
        self.transact("transfer_leadership", |engine| {
            let (_, member) = engine.load_member(actor)?;
            let mut gang = engine.own_gang(&member)?;
            let record = &mut gang.record;
            record.require_leader(actor)?;
            if actor == target {
                return Err(Precondition::SelfTarget.into());
            }
            if !record.members.contains(target) {
                return Err(Precondition::NotMember.into());
            }
            record.officers.remove(target);
            record.officers.insert(actor.clone());
            record.leader = target.clone();
            let mut batch = WriteBatch::new();
            batch.put_gang(Some(gang.version), gang.record);
            Ok(Plan::new(batch, ()))
        })?;
        log::info!("{actor} handed leadership to {target}");
        Ok(())
    }

    /// # Errors
    ///
    /// Requires leader or officer.
    pub fn update_settings(&self, actor: &MemberId, settings: Settings) -> GangResult<()> {
        self.transact("update_settings", |engine| {
            let (_, member) = engine.load_member(actor)?;
            let mut gang = engine.own_gang(&member)?;
            gang.record.require_manager(actor)?;
            gang.record.settings = settings;
            let mut batch = WriteBatch::new();
            batch.put_gang(Some(gang.version), gang.record);
            Ok(Plan::new(batch, ()))
        })
    }
}
