//! Centralized balance and tuning constants for gang warfare logic.
//!
//! These values define the deterministic math for the combat and economy
//! core. Keeping them together ensures that balance can only be adjusted via
//! code changes reviewed in version control, rather than through external
//! configuration files.

// Success-rate band ---------------------------------------------------------
pub const RATE_FLOOR: f64 = 5.0;
pub const RATE_CEILING: f64 = 95.0;
pub const ROLL_SCALE: f64 = 100.0;

// Raid tuning ---------------------------------------------------------------
pub const RAID_BASE_RATE: f64 = 50.0;
pub const RAID_COOLDOWN_SECS: i64 = 60;
pub const RAID_DAMAGE_MIN_PCT: f64 = 0.05;
pub const RAID_DAMAGE_MAX_PCT: f64 = 0.15;
pub const RAID_LOOT_MIN_PCT: f64 = 0.05;
pub const RAID_LOOT_MAX_PCT: f64 = 0.15;
pub const RAID_BREACH_SUCCESS_BONUS: f64 = 30.0;
pub const RAID_BREACH_FLAT_DAMAGE: i64 = 100;
pub const RAID_DESTROY_POWER: i64 = 25;
pub const RAID_WIN_POWER: i64 = 10;
pub const RAID_DEFENDER_LOSS_POWER: i64 = 5;
pub const RAID_FAIL_ATTACKER_POWER: i64 = 5;
pub const RAID_FAIL_DEFENDER_POWER: i64 = 3;

// Rob tuning ----------------------------------------------------------------
pub const ROB_BASE_RATE: f64 = 60.0;
pub const ROB_COOLDOWN_SECS: i64 = 30;
pub const ROB_MIN_STEAL: i64 = 500;
pub const ROB_MAX_STEAL: i64 = 1_500;
pub const ROB_WIN_POWER: i64 = 3;
pub const ROB_VICTIM_POWER: i64 = 2;
pub const ROB_FAIL_ATTACKER_POWER: i64 = 1;
pub const ROB_FAIL_DEFENDER_POWER: i64 = 1;

// Kidnap tuning -------------------------------------------------------------
pub const KIDNAP_BASE_RATE: f64 = 70.0;
pub const KIDNAP_COOLDOWN_SECS: i64 = 300;
pub const KIDNAP_UNAFFILIATED_BONUS: f64 = 20.0;
pub const KIDNAP_MIN_HOURS: i64 = 1;
pub const KIDNAP_MAX_HOURS: i64 = 3;
pub const KIDNAP_WIN_POWER: i64 = 5;
pub const KIDNAP_FAIL_POWER: i64 = 2;
pub const SECS_PER_HOUR: i64 = 3_600;

// Personnel tuning ----------------------------------------------------------
pub const GUARD_BASE_PROTECTION: f64 = 5.0;
pub const TRAINING_BONUS_PER_LEVEL: f64 = 10.0;
pub const WEAPON_DAMAGE_BONUS_PER_LEVEL: f64 = 0.15;
pub const WEAPON_SUCCESS_BONUS_PER_LEVEL: f64 = 5.0;
pub const WALL_DEFENSE_PER_LEVEL: f64 = 5.0;
pub const UNIT_MAX_LEVEL: u8 = 10;
pub const TRACK_MAX_LEVEL: u8 = 10;
pub const GUARD_HIRE_COST: i64 = 1_000;
pub const MEDIC_HIRE_COST: i64 = 1_500;
pub const GUARD_UPGRADE_COST: i64 = 750;
pub const MEDIC_UPGRADE_COST: i64 = 900;

// Repair tuning -------------------------------------------------------------
pub const REPAIR_COOLDOWN_SECS: i64 = 600;
pub const REPAIR_BASE_HP: i64 = 50;
pub const MEDIC_REPAIR_HP: i64 = 20;
pub const MEDIC_REPAIR_HP_PER_LEVEL: i64 = 5;
pub const REPAIR_COST_PER_HP: i64 = 2;

// Gang lifecycle ------------------------------------------------------------
pub const FOUNDING_COST: i64 = 5_000;
pub const GANG_NAME_MIN_LEN: usize = 3;
pub const GANG_NAME_MAX_LEN: usize = 24;
pub const ESCORT_COST: i64 = 800;
pub const RANSOM_COST: i64 = 1_000;

// Tool tuning ---------------------------------------------------------------
pub const BREACH_CHARGE_STACK_MAX: u32 = 5;

// Store discipline ----------------------------------------------------------
pub const DEFAULT_COMMIT_ATTEMPTS: u32 = 4;
