//! Treasury, personnel, upgrades, tools and personal services.
use serde::{Deserialize, Serialize};

use super::{GangEngine, Plan};
use crate::clock::Clock;
use crate::collab::{Directory, Wallet};
use crate::constants::{ESCORT_COST, RANSOM_COST, REPAIR_BASE_HP, REPAIR_COST_PER_HP};
use crate::cooldown::Action;
use crate::error::{GangError, GangResult, Precondition, Shortfall};
use crate::personnel::{TrackUpgradePlan, UnitKind, UnitUpgradePlan};
use crate::progression::{UpgradeTrack, base_tier};
use crate::state::{Member, MemberId, MemberStatus};
use crate::store::{Store, Version, WriteBatch};
use crate::tools::ToolKind;
use crate::vault::Transfer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HireReport {
    pub kind: UnitKind,
    pub count: usize,
    pub cost: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseUpgrade {
    pub from_level: u8,
    pub to_level: u8,
    pub cost: i64,
    pub max_hp: i64,
    pub vault_capacity: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPurchase {
    pub kind: ToolKind,
    pub price: i64,
    pub vault_left: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    pub restored: i64,
    pub cost: i64,
    pub hp: i64,
    pub max_hp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RansomReport {
    pub paid: i64,
    /// Gang that received the ransom, if it still exists.
    pub captor_gang: Option<String>,
    pub credited: i64,
}

/// A free member acting on behalf of their gang.
struct Acting<'a> {
    version: Option<Version>,
    member: Member,
    id: &'a MemberId,
}

impl<S, W, D, C> GangEngine<S, W, D, C>
where
    S: Store,
    W: Wallet,
    D: Directory,
    C: Clock,
{
    fn free_member<'a>(&self, actor: &'a MemberId) -> GangResult<Acting<'a>> {
        let (version, member) = self.load_member(actor)?;
        member.ensure_free()?;
        Ok(Acting {
            version,
            member,
            id: actor,
        })
    }

    /// Move pocket money into the gang vault. Only what fits is taken.
    ///
    /// # Errors
    ///
    /// Fails for non-positive amounts, a full vault or a short pocket.
    pub fn deposit(&self, actor: &MemberId, amount: i64) -> GangResult<Transfer> {
        if amount <= 0 {
            return Err(Precondition::NonPositiveAmount.into());
        }
        self.transact("deposit", |engine| {
            let acting = engine.free_member(actor)?;
            let mut gang = engine.own_gang(&acting.member)?;
            engine.require_pocket(acting.id, amount)?;
            let credited = gang.record.credit(amount);
            if credited == 0 {
                return Err(Shortfall::VaultFull.into());
            }
            let mut batch = WriteBatch::new();
            batch.put_gang(Some(gang.version), gang.record);
            let moved = Transfer {
                requested: amount,
                credited,
            };
            Ok(Plan::new(batch, moved).charging(actor, credited))
        })
    }

    /// Move vault money into the actor's pocket.
    ///
    /// # Errors
    ///
    /// Requires leader or officer and enough in the vault.
    pub fn withdraw(&self, actor: &MemberId, amount: i64) -> GangResult<i64> {
        if amount <= 0 {
            return Err(Precondition::NonPositiveAmount.into());
        }
        self.transact("withdraw", |engine| {
            let acting = engine.free_member(actor)?;
            let mut gang = engine.own_gang(&acting.member)?;
            gang.record.require_manager(actor)?;
            gang.record.debit(amount)?;
            let left = gang.record.vault;
            let name = gang.record.name.clone();
            let mut batch = WriteBatch::new();
            batch.put_gang(Some(gang.version), gang.record);
            Ok(Plan::new(batch, left).paying(&name, actor, amount))
        })
    }

    /// Hire one level-1 guard or medic, paid from the actor's pocket.
    ///
    /// # Errors
    ///
    /// The actor must be free, outside the base, a leader or officer, with
    /// room on the roster and money in pocket.
    pub fn hire(&self, actor: &MemberId, kind: UnitKind) -> GangResult<HireReport> {
        let report = self.transact("hire", |engine| {
            let acting = engine.free_member(actor)?;
            if acting.member.status != MemberStatus::Outside {
                return Err(Precondition::MustBeOutside.into());
            }
            let mut gang = engine.own_gang(&acting.member)?;
            gang.record.require_manager(actor)?;
            gang.record.army.can_hire(kind, gang.record.base.level)?;
            let cost = kind.hire_cost();
            engine.require_pocket(actor, cost)?;
            let count = gang.record.army.hire(kind, gang.record.base.level)?;
            let mut batch = WriteBatch::new();
            batch.put_gang(Some(gang.version), gang.record);
            Ok(Plan::new(batch, HireReport { kind, count, cost }).charging(actor, cost))
        })?;
        log::info!("{actor} hired a {} ({} on roster)", report.kind, report.count);
        Ok(report)
    }

    /// Raise the lowest-level unit of `kind`, or every unit at that level when
    /// `bulk`. Returns the applied plan and the roster's new minimum level.
    ///
    /// # Errors
    ///
    /// Requires leader or officer, hired units below max level, and money.
    pub fn upgrade_units(
        &self,
        actor: &MemberId,
        kind: UnitKind,
        bulk: bool,
    ) -> GangResult<(UnitUpgradePlan, u8)> {
        self.transact("upgrade_units", |engine| {
            let acting = engine.free_member(actor)?;
            let mut gang = engine.own_gang(&acting.member)?;
            gang.record.require_manager(actor)?;
            let plan = gang.record.army.plan_upgrade(kind, bulk)?;
            engine.require_pocket(actor, plan.cost)?;
            let min_level = gang.record.army.apply_upgrade(&plan);
            let mut batch = WriteBatch::new();
            batch.put_gang(Some(gang.version), gang.record);
            Ok(Plan::new(batch, (plan, min_level)).charging(actor, plan.cost))
        })
    }

    /// Buy the next level of a gang-wide upgrade track.
    ///
    /// # Errors
    ///
    /// Requires leader or officer, a track below level 10, and money.
    pub fn upgrade_track(&self, actor: &MemberId, track: UpgradeTrack) -> GangResult<TrackUpgradePlan> {
        let plan = self.transact("upgrade_track", |engine| {
            let acting = engine.free_member(actor)?;
            let mut gang = engine.own_gang(&acting.member)?;
            gang.record.require_manager(actor)?;
            let plan = gang.record.upgrades.plan(track)?;
            engine.require_pocket(actor, plan.cost)?;
            gang.record.upgrades.apply(&plan);
            let mut batch = WriteBatch::new();
            batch.put_gang(Some(gang.version), gang.record);
            Ok(Plan::new(batch, plan).charging(actor, plan.cost))
        })?;
        log::info!("{actor} raised {} to level {}", plan.track, plan.to_level);
        Ok(plan)
    }

    /// Move the base to the next tier. Hit points are restored to the new
    /// maximum.
    ///
    /// # Errors
    ///
    /// Requires leader or officer, a base below the top tier, and money.
    pub fn upgrade_base(&self, actor: &MemberId) -> GangResult<BaseUpgrade> {
        let upgrade = self.transact("upgrade_base", |engine| {
            let acting = engine.free_member(actor)?;
            let mut gang = engine.own_gang(&acting.member)?;
            gang.record.require_manager(actor)?;
            let from_level = gang.record.base.level;
            let cost = gang
                .record
                .tier()
                .upgrade_cost
                .ok_or_else(|| Shortfall::MaxLevel("base".into()))?;
            engine.require_pocket(actor, cost)?;
            let next = base_tier(from_level + 1);
            gang.record.base.level = next.level;
            gang.record.base.hp = next.max_hp;
            let upgrade = BaseUpgrade {
                from_level,
                to_level: next.level,
                cost,
                max_hp: next.max_hp,
                vault_capacity: next.vault_capacity,
            };
            let mut batch = WriteBatch::new();
            batch.put_gang(Some(gang.version), gang.record);
            Ok(Plan::new(batch, upgrade).charging(actor, cost))
        })?;
        log::info!(
            "{actor} upgraded base {} -> {}",
            upgrade.from_level,
            upgrade.to_level
        );
        Ok(upgrade)
    }

    /// Buy a tool for the gang out of the vault.
    ///
    /// # Errors
    ///
    /// Requires leader or officer, room in the inventory, and vault funds.
    pub fn buy_tool(&self, actor: &MemberId, kind: ToolKind) -> GangResult<ToolPurchase> {
        self.transact("buy_tool", |engine| {
            let acting = engine.free_member(actor)?;
            let mut gang = engine.own_gang(&acting.member)?;
            gang.record.require_manager(actor)?;
            gang.record.tools.can_add(kind)?;
            let price = kind.spec().price;
            gang.record.debit(price)?;
            gang.record.tools.add(kind)?;
            let purchase = ToolPurchase {
                kind,
                price,
                vault_left: gang.record.vault,
            };
            let mut batch = WriteBatch::new();
            batch.put_gang(Some(gang.version), gang.record);
            Ok(Plan::new(batch, purchase))
        })
    }

    /// Patch the base: 50 HP plus the medic crew's share, clamped to the
    /// missing hit points and to what the vault can pay at 2 per HP.
    ///
    /// # Errors
    ///
    /// Fails on cooldown, at full health, or when the vault cannot pay for a
    /// single hit point.
    pub fn repair_base(&self, actor: &MemberId) -> GangResult<RepairReport> {
        self.transact("repair_base", |engine| {
            let now = engine.now();
            let mut acting = engine.free_member(actor)?;
            if let Some(remaining_secs) = acting.member.cooldowns.remaining(Action::Repair, now) {
                return Err(GangError::CooldownActive {
                    action: Action::Repair,
                    remaining_secs,
                });
            }
            let mut gang = engine.own_gang(&acting.member)?;
            let record = &mut gang.record;
            let max_hp = record.tier().max_hp;
            let missing = max_hp - record.base.hp;
            if missing <= 0 {
                return Err(Shortfall::FullHealth.into());
            }
            let crew = REPAIR_BASE_HP + record.army.medic_repair(record.upgrades.medic_training);
            let affordable = record.vault / REPAIR_COST_PER_HP;
            let restored = crew.min(missing).min(affordable);
            if restored <= 0 {
                return Err(Shortfall::Vault {
                    have: record.vault,
                    need: REPAIR_COST_PER_HP,
                }
                .into());
            }
            let cost = restored * REPAIR_COST_PER_HP;
            record.debit(cost)?;
            record.base.hp += restored;
            let report = RepairReport {
                restored,
                cost,
                hp: record.base.hp,
                max_hp,
            };
            acting.member.cooldowns.stamp(Action::Repair, now);
            let mut batch = WriteBatch::new();
            batch
                .put_gang(Some(gang.version), gang.record)
                .put_member(acting.version, acting.member);
            Ok(Plan::new(batch, report))
        })
    }

    /// Hire a personal bodyguard that counts as one guard against kidnaps.
    ///
    /// # Errors
    ///
    /// Fails if kidnapped, already escorted, or short on money.
    pub fn hire_escort(&self, actor: &MemberId) -> GangResult<i64> {
        self.transact("hire_escort", |engine| {
            let mut acting = engine.free_member(actor)?;
            if acting.member.escort {
                return Err(Precondition::EscortActive.into());
            }
            engine.require_pocket(actor, ESCORT_COST)?;
            acting.member.escort = true;
            let mut batch = WriteBatch::new();
            batch.put_member(acting.version, acting.member);
            Ok(Plan::new(batch, ESCORT_COST).charging(actor, ESCORT_COST))
        })
    }

    /// Buy an early release. The captor's gang vault is credited up to its
    /// capacity and its hostage count drops.
    ///
    /// # Errors
    ///
    /// The actor must be kidnapped and able to pay.
    pub fn pay_ransom(&self, actor: &MemberId) -> GangResult<RansomReport> {
        let report = self.transact("pay_ransom", |engine| {
            let (version, mut member) = engine.load_member(actor)?;
            if !member.is_kidnapped() {
                return Err(Precondition::NotKidnapped.into());
            }
            engine.require_pocket(actor, RANSOM_COST)?;
            let captivity = member.release();
            let mut batch = WriteBatch::new();
            let mut report = RansomReport {
                paid: RANSOM_COST,
                captor_gang: None,
                credited: 0,
            };
            if let Some(captivity) = captivity
                && let Some(name) = &captivity.captor_gang
                && let Some(mut gang) = engine.store.gang(name)?
                && captivity.held_by(&gang.record)
            {
                report.credited = gang.record.credit(RANSOM_COST);
                gang.record.hostages = gang.record.hostages.saturating_sub(1);
                report.captor_gang = Some(gang.record.name.clone());
                batch.put_gang(Some(gang.version), gang.record);
            }
            batch.put_member(version, member);
            Ok(Plan::new(batch, report).charging(actor, RANSOM_COST))
        })?;
        log::info!("{actor} paid ransom to {:?}", report.captor_gang);
        Ok(report)
    }

    /// # Errors
    ///
    /// The actor must be free, affiliated and currently outside.
    pub fn enter_base(&self, actor: &MemberId) -> GangResult<()> {
        self.move_to(actor, MemberStatus::Base, "enter_base")
    }

    /// # Errors
    ///
    /// The actor must be free and currently at base.
    pub fn leave_base(&self, actor: &MemberId) -> GangResult<()> {
        self.move_to(actor, MemberStatus::Outside, "leave_base")
    }

    fn move_to(&self, actor: &MemberId, status: MemberStatus, op: &'static str) -> GangResult<()> {
        self.transact(op, |engine| {
            let mut acting = engine.free_member(actor)?;
            engine.own_gang(&acting.member)?;
            if acting.member.status == status {
                return Err(Precondition::AlreadyThere(status).into());
            }
            acting.member.status = status;
            let mut batch = WriteBatch::new();
            batch.put_member(acting.version, acting.member);
            Ok(Plan::new(batch, ()))
        })
    }
}
