#![allow(dead_code)]

use gangwar_game::constants::FOUNDING_COST;
use gangwar_game::{
    EngineConfig, GangEngine, ManualClock, MemberId, MemoryDirectory, MemoryEngine, MemoryStore,
    MemoryWallet, RngBundle, Store, WriteBatch,
};

pub const START: i64 = 1_700_000_000;

pub fn engine_with(rng: RngBundle) -> MemoryEngine {
    GangEngine::new(
        MemoryStore::new(),
        MemoryWallet::new(),
        MemoryDirectory::new(),
        ManualClock::starting_at(START),
        EngineConfig::seeded(7),
    )
    .with_rng(rng)
}

/// Every roll lands at the bottom: actions succeed, tools break, ranges
/// yield their minimum.
pub fn lucky_engine() -> MemoryEngine {
    engine_with(RngBundle::scripted(0))
}

/// Every roll lands at the top: actions fail.
pub fn unlucky_engine() -> MemoryEngine {
    engine_with(RngBundle::scripted(u64::MAX))
}

/// Register a level-1 player holding `pocket`.
pub fn player(engine: &MemoryEngine, name: &str, pocket: i64) -> MemberId {
    let id = MemberId::from(name);
    engine.directory().register(&id, 1);
    engine.wallet().set(&id, pocket);
    id
}

/// Found `gang` led by a fresh player and deposit `vault` into it.
pub fn founded(engine: &MemoryEngine, leader: &str, gang: &str, vault: i64) -> MemberId {
    let id = player(engine, leader, FOUNDING_COST + vault);
    engine.found_gang(&id, gang).unwrap();
    if vault > 0 {
        engine.deposit(&id, vault).unwrap();
    }
    id
}

/// Overwrite a stored gang's base hit points.
pub fn set_hp(engine: &MemoryEngine, gang: &str, hp: i64) {
    let stored = engine.store().gang(gang).unwrap().unwrap();
    let mut record = stored.record;
    record.base.hp = hp;
    let mut batch = WriteBatch::new();
    batch.put_gang(Some(stored.version), record);
    engine.store().commit(batch).unwrap();
}

/// Overwrite a stored gang's hostage counter.
pub fn set_hostages(engine: &MemoryEngine, gang: &str, hostages: u32) {
    let stored = engine.store().gang(gang).unwrap().unwrap();
    let mut record = stored.record;
    record.hostages = hostages;
    let mut batch = WriteBatch::new();
    batch.put_gang(Some(stored.version), record);
    engine.store().commit(batch).unwrap();
}
