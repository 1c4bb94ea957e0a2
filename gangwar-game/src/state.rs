//! Persistent records: gangs and members.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::clock::Timestamp;
use crate::constants::{GANG_NAME_MAX_LEN, GANG_NAME_MIN_LEN};
use crate::cooldown::CooldownTable;
use crate::error::{Precondition, Shortfall};
use crate::personnel::{Army, UnitKind, Upgrades};
use crate::progression::{BASE_MAX_LEVEL, BASE_MIN_LEVEL, BaseTier, base_tier};
use crate::store::gang_key;
use crate::tools::ToolInventory;
use crate::vault;

/// Opaque identity issued by the host platform.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Leader,
    Officer,
    Member,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Leader => "leader",
            Self::Officer => "officer",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    #[default]
    Outside,
    Base,
    Kidnapped,
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Outside => "outside",
            Self::Base => "at base",
            Self::Kidnapped => "kidnapped",
        })
    }
}

/// Who holds a kidnapped member and until when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Captivity {
    pub until: Timestamp,
    pub by: MemberId,
    /// Gang credited with the hostage; `None` if the captor has since left it.
    #[serde(default)]
    pub captor_gang: Option<String>,
    /// Founding time of that gang, telling it apart from a later gang that
    /// reuses the name.
    #[serde(default)]
    pub captor_founded_at: Option<Timestamp>,
}

impl Captivity {
    /// Taken by the kidnapper on behalf of `gang`.
    #[must_use]
    pub fn for_gang(until: Timestamp, by: MemberId, gang: &Gang) -> Self {
        Self {
            until,
            by,
            captor_gang: Some(gang.name.clone()),
            captor_founded_at: Some(gang.founded_at),
        }
    }

    /// Whether `gang` is the gang that took this captive. Records written
    /// before founding times were kept match on name alone.
    #[must_use]
    pub fn held_by(&self, gang: &Gang) -> bool {
        self.captor_gang
            .as_deref()
            .is_some_and(|name| gang_key(name) == gang_key(&gang.name))
            && self
                .captor_founded_at
                .is_none_or(|at| at == gang.founded_at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    #[serde(default)]
    pub gang: Option<String>,
    #[serde(default)]
    pub status: MemberStatus,
    #[serde(default)]
    pub captivity: Option<Captivity>,
    #[serde(default)]
    pub cooldowns: CooldownTable,
    #[serde(default)]
    pub escort: bool,
}

impl Member {
    #[must_use]
    pub fn new(id: MemberId) -> Self {
        Self {
            id,
            gang: None,
            status: MemberStatus::Outside,
            captivity: None,
            cooldowns: CooldownTable::default(),
            escort: false,
        }
    }

    #[must_use]
    pub fn is_kidnapped(&self) -> bool {
        self.status == MemberStatus::Kidnapped
    }

    /// # Errors
    ///
    /// Kidnapped members cannot act.
    pub fn ensure_free(&self) -> Result<(), Precondition> {
        if self.is_kidnapped() {
            return Err(Precondition::Kidnapped);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Fails with [`Precondition::NotInGang`] for unaffiliated members.
    pub fn gang_name(&self) -> Result<&str, Precondition> {
        self.gang.as_deref().ok_or(Precondition::NotInGang)
    }

    /// Take the member captive. The escort is lost.
    pub fn kidnap(&mut self, captivity: Captivity) {
        self.status = MemberStatus::Kidnapped;
        self.captivity = Some(captivity);
        self.escort = false;
    }

    /// Free the member, returning the captivity that ended.
    pub fn release(&mut self) -> Option<Captivity> {
        let ended = self.captivity.take();
        if self.status == MemberStatus::Kidnapped {
            self.status = MemberStatus::Outside;
        }
        ended
    }

    /// Detach from the gang. Captivity survives; a member at base is put outside.
    pub fn clear_gang(&mut self) {
        self.gang = None;
        if self.status == MemberStatus::Base {
            self.status = MemberStatus::Outside;
        }
    }

    /// # Errors
    ///
    /// Reports the first broken rule as text.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.is_kidnapped() != self.captivity.is_some() {
            return Err(format!(
                "member {} status {} disagrees with captivity record",
                self.id, self.status
            ));
        }
        if self.gang.is_none() && self.status == MemberStatus::Base {
            return Err(format!("member {} is at base without a gang", self.id));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Base {
    pub level: u8,
    pub hp: i64,
    #[serde(default)]
    pub last_raid_at: Option<Timestamp>,
}

impl Default for Base {
    fn default() -> Self {
        Self {
            level: BASE_MIN_LEVEL,
            hp: base_tier(BASE_MIN_LEVEL).max_hp,
            last_raid_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub wins: u32,
    pub losses: u32,
    pub raids: u32,
    pub robs: u32,
    pub kidnaps: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub allow_invites: bool,
    pub min_level_to_join: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            allow_invites: true,
            min_level_to_join: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gang {
    pub name: String,
    pub leader: MemberId,
    pub members: BTreeSet<MemberId>,
    #[serde(default)]
    pub officers: BTreeSet<MemberId>,
    #[serde(default)]
    pub banned: BTreeSet<MemberId>,
    #[serde(default)]
    pub vault: i64,
    #[serde(default)]
    pub power: i64,
    #[serde(default)]
    pub record: Record,
    #[serde(default)]
    pub base: Base,
    #[serde(default)]
    pub army: Army,
    #[serde(default)]
    pub upgrades: Upgrades,
    #[serde(default)]
    pub tools: ToolInventory,
    #[serde(default)]
    pub hostages: u32,
    #[serde(default)]
    pub settings: Settings,
    pub founded_at: Timestamp,
}

impl Gang {
    #[must_use]
    pub fn new(name: String, leader: MemberId, founded_at: Timestamp) -> Self {
        let members = BTreeSet::from([leader.clone()]);
        Self {
            name,
            leader,
            members,
            officers: BTreeSet::new(),
            banned: BTreeSet::new(),
            vault: 0,
            power: 0,
            record: Record::default(),
            base: Base::default(),
            army: Army::default(),
            upgrades: Upgrades::default(),
            tools: ToolInventory::default(),
            hostages: 0,
            settings: Settings::default(),
            founded_at,
        }
    }

    #[must_use]
    pub fn tier(&self) -> &'static BaseTier {
        base_tier(self.base.level)
    }

    #[must_use]
    pub fn capacity(&self) -> i64 {
        self.tier().vault_capacity
    }

    /// Credit the vault up to capacity, returning what landed.
    pub fn credit(&mut self, amount: i64) -> i64 {
        let capacity = self.capacity();
        vault::credit(&mut self.vault, capacity, amount)
    }

    /// # Errors
    ///
    /// Returns [`Shortfall::Vault`] when the vault cannot cover `amount`.
    pub fn debit(&mut self, amount: i64) -> Result<(), Shortfall> {
        vault::debit(&mut self.vault, amount)
    }

    #[must_use]
    pub fn role_of(&self, id: &MemberId) -> Option<Role> {
        if *id == self.leader {
            Some(Role::Leader)
        } else if self.officers.contains(id) {
            Some(Role::Officer)
        } else if self.members.contains(id) {
            Some(Role::Member)
        } else {
            None
        }
    }

    /// Leaders and officers manage the gang.
    #[must_use]
    pub fn can_manage(&self, id: &MemberId) -> bool {
        matches!(self.role_of(id), Some(Role::Leader | Role::Officer))
    }

    /// # Errors
    ///
    /// Fails unless `id` is the leader or an officer.
    pub fn require_manager(&self, id: &MemberId) -> Result<(), Precondition> {
        if self.can_manage(id) {
            Ok(())
        } else {
            Err(Precondition::MissingRole(Role::Officer))
        }
    }

    /// # Errors
    ///
    /// Fails unless `id` is the leader.
    pub fn require_leader(&self, id: &MemberId) -> Result<(), Precondition> {
        if *id == self.leader {
            Ok(())
        } else {
            Err(Precondition::MissingRole(Role::Leader))
        }
    }

    pub fn add_member(&mut self, id: MemberId) {
        self.members.insert(id);
    }

    pub fn remove_member(&mut self, id: &MemberId) -> bool {
        self.officers.remove(id);
        self.members.remove(id)
    }

    pub const fn gain_power(&mut self, amount: i64) {
        self.power = self.power.saturating_add(amount);
    }

    /// Power losses floor at zero.
    pub fn lose_power(&mut self, amount: i64) {
        self.power = self.power.saturating_sub(amount).max(0);
    }

    /// Apply raid damage, returning the remaining hit points.
    pub fn take_damage(&mut self, damage: i64) -> i64 {
        self.base.hp = self.base.hp.saturating_sub(damage.max(0)).max(0);
        self.base.hp
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.base.hp == 0
    }

    /// # Errors
    ///
    /// Reports the first broken rule as text.
    pub fn check_invariants(&self) -> Result<(), String> {
        let name = &self.name;
        if !(BASE_MIN_LEVEL..=BASE_MAX_LEVEL).contains(&self.base.level) {
            return Err(format!("gang {name} base level {} out of range", self.base.level));
        }
        if !(0..=self.capacity()).contains(&self.vault) {
            return Err(format!(
                "gang {name} vault {} outside [0, {}]",
                self.vault,
                self.capacity()
            ));
        }
        if !(0..=self.tier().max_hp).contains(&self.base.hp) {
            return Err(format!(
                "gang {name} hp {} outside [0, {}]",
                self.base.hp,
                self.tier().max_hp
            ));
        }
        if self.power < 0 {
            return Err(format!("gang {name} power {} is negative", self.power));
        }
        if !self.members.contains(&self.leader) {
            return Err(format!("gang {name} leader {} is not a member", self.leader));
        }
        if !self.officers.is_subset(&self.members) {
            return Err(format!("gang {name} has officers outside the member set"));
        }
        if !self.upgrades.in_range() {
            return Err(format!("gang {name} upgrade track out of range"));
        }
        for kind in [UnitKind::Guard, UnitKind::Medic] {
            let cap = kind.cap(self.base.level);
            if self.army.count(kind) > cap {
                return Err(format!("gang {name} has more {kind}s than the cap {cap}"));
            }
        }
        Ok(())
    }
}

/// Trim and validate a prospective gang name.
///
/// # Errors
///
/// Fails with [`Precondition::InvalidName`] for names outside 3..=24
/// characters or containing control characters.
pub fn normalize_gang_name(raw: &str) -> Result<String, Precondition> {
    let name = raw.trim();
    let len = name.chars().count();
    if !(GANG_NAME_MIN_LEN..=GANG_NAME_MAX_LEN).contains(&len) || name.chars().any(char::is_control)
    {
        return Err(Precondition::InvalidName);
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gang() -> Gang {
        Gang::new("Crows".into(), MemberId::from("boss"), 0)
    }

    #[test]
    fn new_gang_starts_at_shack() {
        let gang = gang();
        assert_eq!(gang.base.level, 1);
        assert_eq!(gang.base.hp, 250);
        assert_eq!(gang.capacity(), 10_000);
        assert_eq!(gang.role_of(&MemberId::from("boss")), Some(Role::Leader));
        assert!(gang.check_invariants().is_ok());
    }

    #[test]
    fn roles_and_management() {
        let mut gang = gang();
        let officer = MemberId::from("o");
        let grunt = MemberId::from("g");
        gang.add_member(officer.clone());
        gang.add_member(grunt.clone());
        gang.officers.insert(officer.clone());
        assert!(gang.can_manage(&officer));
        assert!(!gang.can_manage(&grunt));
        assert_eq!(
            gang.require_manager(&grunt),
            Err(Precondition::MissingRole(Role::Officer))
        );
        assert!(gang.remove_member(&officer));
        assert!(!gang.officers.contains(&officer));
        assert_eq!(gang.role_of(&MemberId::from("nobody")), None);
    }

    #[test]
    fn power_floors_at_zero() {
        let mut gang = gang();
        gang.gain_power(3);
        gang.lose_power(5);
        assert_eq!(gang.power, 0);
    }

    #[test]
    fn damage_floors_at_zero() {
        let mut gang = gang();
        assert_eq!(gang.take_damage(30), 220);
        assert!(!gang.is_destroyed());
        assert_eq!(gang.take_damage(1_000), 0);
        assert!(gang.is_destroyed());
    }

    #[test]
    fn invariant_check_catches_overfull_vault() {
        let mut gang = gang();
        gang.vault = 10_001;
        assert!(gang.check_invariants().is_err());
        gang.vault = 10_000;
        assert!(gang.check_invariants().is_ok());
    }

    #[test]
    fn kidnap_and_release_keep_fields_paired() {
        let mut member = Member::new(MemberId::from("v"));
        member.escort = true;
        member.kidnap(Captivity {
            until: 3_600,
            by: MemberId::from("k"),
            captor_gang: Some("Crows".into()),
            captor_founded_at: Some(0),
        });
        assert!(member.is_kidnapped());
        assert!(!member.escort);
        assert!(member.check_invariants().is_ok());
        assert_eq!(member.ensure_free(), Err(Precondition::Kidnapped));

        let ended = member.release().expect("was captive");
        assert_eq!(ended.until, 3_600);
        assert_eq!(member.status, MemberStatus::Outside);
        assert!(member.check_invariants().is_ok());
    }

    #[test]
    fn captivity_belongs_to_one_founding() {
        let first = Gang::new("Crows".into(), MemberId::from("k"), 100);
        let captivity = Captivity::for_gang(3_600, MemberId::from("k"), &first);
        assert!(captivity.held_by(&first));

        let mut renamed = first.clone();
        renamed.name = "CROWS".into();
        assert!(captivity.held_by(&renamed));

        let refounded = Gang::new("Crows".into(), MemberId::from("k"), 900);
        assert!(!captivity.held_by(&refounded));

        let legacy = Captivity {
            captor_founded_at: None,
            ..captivity
        };
        assert!(legacy.held_by(&refounded));
    }

    #[test]
    fn clear_gang_keeps_captivity() {
        let mut member = Member::new(MemberId::from("v"));
        member.gang = Some("Crows".into());
        member.kidnap(Captivity {
            until: 10,
            by: MemberId::from("k"),
            captor_gang: None,
            captor_founded_at: None,
        });
        member.clear_gang();
        assert!(member.is_kidnapped());
        assert!(member.gang.is_none());
    }

    #[test]
    fn gang_names_are_validated() {
        assert_eq!(normalize_gang_name("  Crows "), Ok("Crows".to_string()));
        assert_eq!(normalize_gang_name("ab"), Err(Precondition::InvalidName));
        assert_eq!(
            normalize_gang_name(&"x".repeat(25)),
            Err(Precondition::InvalidName)
        );
        assert_eq!(normalize_gang_name("bad\nname"), Err(Precondition::InvalidName));
    }
}
