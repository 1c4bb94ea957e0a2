//! Idempotent background sweeps.
use serde::{Deserialize, Serialize};

use super::{GangEngine, Plan};
use crate::clock::Clock;
use crate::collab::{Directory, Wallet};
use crate::error::GangResult;
use crate::state::MemberId;
use crate::store::{Store, WriteBatch};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub member: MemberId,
    pub captor_gang: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostageFix {
    pub gang: String,
    pub recorded: u32,
    pub actual: u32,
}

impl<S, W, D, C> GangEngine<S, W, D, C>
where
    S: Store,
    W: Wallet,
    D: Directory,
    C: Clock,
{
    /// Free every captive whose time is up. Each release commits on its own,
    /// so a conflict on one member never holds back the rest; running the
    /// sweep twice frees nobody the second time.
    ///
    /// # Errors
    ///
    /// Returns the first storage error or exhausted retry.
    pub fn release_expired_kidnaps(&self) -> GangResult<Vec<Release>> {
        let now = self.now();
        let due: Vec<MemberId> = self
            .store
            .members()?
            .into_iter()
            .filter(|v| v.record.captivity.as_ref().is_some_and(|c| c.until <= now))
            .map(|v| v.record.id)
            .collect();

        let mut released = Vec::with_capacity(due.len());
        for id in due {
            let release = self.transact("release_expired_kidnaps", |engine| {
                let Some(stored) = engine.store.member(&id)? else {
                    return Ok(Plan::new(WriteBatch::new(), None));
                };
                let mut member = stored.record;
                let still_due = member
                    .captivity
                    .as_ref()
                    .is_some_and(|c| c.until <= engine.now());
                if !still_due {
                    return Ok(Plan::new(WriteBatch::new(), None));
                }
                let captivity = member.release();
                let captor_gang = captivity.as_ref().and_then(|c| c.captor_gang.clone());
                let mut batch = WriteBatch::new();
                if let Some(captivity) = &captivity
                    && let Some(name) = &captor_gang
                    && let Some(mut gang) = engine.store.gang(name)?
                    && captivity.held_by(&gang.record)
                {
                    gang.record.hostages = gang.record.hostages.saturating_sub(1);
                    batch.put_gang(Some(gang.version), gang.record);
                }
                batch.put_member(Some(stored.version), member);
                Ok(Plan::new(
                    batch,
                    Some(Release {
                        member: id.clone(),
                        captor_gang,
                    }),
                ))
            })?;
            if let Some(release) = release {
                log::debug!("released {} from captivity", release.member);
                released.push(release);
            }
        }
        Ok(released)
    }

    /// Reset each gang's hostage counter to the number of members it actually
    /// holds captive.
    ///
    /// # Errors
    ///
    /// Returns the first storage error or exhausted retry.
    pub fn reconcile_hostages(&self) -> GangResult<Vec<HostageFix>> {
        let mut fixes = Vec::new();
        for gang in self.store.gangs()? {
            let name = gang.record.name;
            let fix = self.transact("reconcile_hostages", |engine| {
                let Some(mut current) = engine.store.gang(&name)? else {
                    return Ok(Plan::new(WriteBatch::new(), None));
                };
                let mut actual = 0;
                for member in engine.store.members()? {
                    if member
                        .record
                        .captivity
                        .is_some_and(|c| c.held_by(&current.record))
                    {
                        actual += 1;
                    }
                }
                let recorded = current.record.hostages;
                if recorded == actual {
                    return Ok(Plan::new(WriteBatch::new(), None));
                }
                current.record.hostages = actual;
                let mut batch = WriteBatch::new();
                batch.put_gang(Some(current.version), current.record);
                Ok(Plan::new(
                    batch,
                    Some(HostageFix {
                        gang: name.clone(),
                        recorded,
                        actual,
                    }),
                ))
            })?;
            if let Some(fix) = fix {
                log::warn!(
                    "{}: hostage count {} corrected to {}",
                    fix.gang,
                    fix.recorded,
                    fix.actual
                );
                fixes.push(fix);
            }
        }
        Ok(fixes)
    }
}
