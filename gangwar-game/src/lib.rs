//! Gangwar Game Engine
//!
//! Platform-agnostic core for a persistent gang-warfare economy: treasuries,
//! fortified bases, hired personnel, tools, and the raid/rob/kidnap
//! resolution that ties them together. Presentation, wallets and identity
//! live with the host platform behind the traits in [`collab`], [`clock`]
//! and [`store`].

pub mod clock;
pub mod collab;
pub mod combat;
pub mod constants;
pub mod cooldown;
pub mod engine;
pub mod error;
pub mod numbers;
pub mod personnel;
pub mod progression;
pub mod resolver;
pub mod rng;
pub mod state;
pub mod store;
pub mod tools;
pub mod vault;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use collab::{Directory, MemoryDirectory, MemoryWallet, Profile, Wallet, WalletError};
pub use combat::{KidnapOutcome, RaidOutcome, RaidResult, RobOutcome, Roll, apply_raid_damage};
pub use cooldown::{Action, CooldownTable};
pub use engine::{
    BaseUpgrade, DisbandReport, EngineConfig, GangEngine, HireReport, HostageFix,
    LeaderboardEntry, RansomReport, Release, RepairReport, ToolPurchase,
};
pub use error::{GangError, GangResult, Precondition, Shortfall};
pub use personnel::{Army, TrackUpgradePlan, Unit, UnitKind, UnitUpgradePlan, Upgrades};
pub use progression::{BaseTier, UpgradeTrack, base_tier, upgrade_cost, wall_name};
pub use resolver::{Modifier, ModifierKind, RateBreakdown, clamp_rate, resolve};
pub use rng::{DrawCounts, RngBundle};
pub use state::{Base, Captivity, Gang, Member, MemberId, MemberStatus, Record, Role, Settings};
pub use store::{
    MemoryStore, RecordKey, Store, StoreError, Version, Versioned, WriteBatch, gang_key,
};
pub use tools::{ToolInventory, ToolKind, ToolSpec};
pub use vault::Transfer;

/// Engine wired to the in-process collaborators, as used by tests and the
/// tester binary.
pub type MemoryEngine<C = ManualClock> = GangEngine<MemoryStore, MemoryWallet, MemoryDirectory, C>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_engine_founds_and_ranks() {
        let engine: MemoryEngine = GangEngine::new(
            MemoryStore::new(),
            MemoryWallet::new(),
            MemoryDirectory::new(),
            ManualClock::starting_at(0),
            EngineConfig::default(),
        );
        let boss = MemberId::from("boss");
        engine.directory().register(&boss, 1);
        engine.wallet().set(&boss, 6_000);
        let gang = engine.found_gang(&boss, "Crows").unwrap();
        assert_eq!(gang.leader, boss);
        assert_eq!(engine.pocket(&boss).unwrap(), 1_000);
        let board = engine.leaderboard(10).unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].name, "Crows");
        assert!(engine.audit().is_ok());
    }
}
