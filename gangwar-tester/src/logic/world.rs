//! A seeded world of gangs, driven only through the public engine API.
use anyhow::{Context, Result, bail};
use gangwar_game::constants::FOUNDING_COST;
use gangwar_game::{
    Action, EngineConfig, GangEngine, GangError, ManualClock, MemberId, MemoryDirectory,
    MemoryEngine, MemoryStore, MemoryWallet, RngBundle, Store, ToolKind, UnitKind, UpgradeTrack,
    WriteBatch,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Arbitrary fixed epoch so runs are reproducible.
pub const WORLD_EPOCH: i64 = 1_700_000_000;

/// Counters gathered while a scenario runs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub operations: usize,
    pub committed: usize,
    pub rejected: usize,
    pub destroyed: usize,
}

impl RunStats {
    pub fn record(&mut self, committed: bool) {
        self.operations += 1;
        if committed {
            self.committed += 1;
        } else {
            self.rejected += 1;
        }
    }

    pub const fn merge(&mut self, other: Self) {
        self.operations += other.operations;
        self.committed += other.committed;
        self.rejected += other.rejected;
        self.destroyed += other.destroyed;
    }
}

pub struct World {
    pub engine: MemoryEngine,
    pub players: Vec<MemberId>,
    pub gangs: Vec<String>,
}

impl World {
    /// Engine whose combat streams derive from `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self::with_engine(GangEngine::new(
            MemoryStore::new(),
            MemoryWallet::new(),
            MemoryDirectory::new(),
            ManualClock::starting_at(WORLD_EPOCH),
            EngineConfig::seeded(seed),
        ))
    }

    /// Engine whose every roll yields `word`; see [`RngBundle::scripted`].
    pub fn scripted(word: u64) -> Self {
        let world = Self::seeded(0);
        Self::with_engine(world.engine.with_rng(RngBundle::scripted(word)))
    }

    fn with_engine(engine: MemoryEngine) -> Self {
        Self {
            engine,
            players: Vec::new(),
            gangs: Vec::new(),
        }
    }

    pub fn player(&mut self, name: &str, pocket: i64) -> MemberId {
        let id = MemberId::from(name);
        self.engine.directory().register(&id, 1);
        self.engine.wallet().set(&id, pocket);
        self.players.push(id.clone());
        id
    }

    /// Found a gang led by a new player and seed its vault.
    pub fn found(&mut self, leader: &str, gang: &str, vault: i64) -> Result<MemberId> {
        let id = self.player(leader, FOUNDING_COST + vault);
        self.engine
            .found_gang(&id, gang)
            .with_context(|| format!("founding {gang}"))?;
        if vault > 0 {
            self.engine.deposit(&id, vault)?;
        }
        self.gangs.push(gang.to_string());
        Ok(id)
    }

    /// Add `count` plain members to `gang`.
    pub fn recruit(&mut self, gang: &str, count: usize, pocket: i64) -> Result<Vec<MemberId>> {
        (0..count)
            .map(|n| {
                let id = self.player(&format!("{gang}-{n}"), pocket);
                self.engine
                    .join_gang(&id, gang)
                    .with_context(|| format!("{id} joining {gang}"))?;
                Ok(id)
            })
            .collect()
    }

    /// Overwrite a gang's base hit points directly in the store.
    pub fn set_hp(&self, gang: &str, hp: i64) -> Result<()> {
        let stored = self
            .engine
            .store()
            .gang(gang)?
            .with_context(|| format!("no gang {gang}"))?;
        let mut record = stored.record;
        record.base.hp = hp;
        let mut batch = WriteBatch::new();
        batch.put_gang(Some(stored.version), record);
        self.engine.store().commit(batch)?;
        Ok(())
    }

    pub fn audit(&self) -> Result<()> {
        self.engine.audit().context("world audit failed")
    }

    pub fn vault(&self, gang: &str) -> Result<i64> {
        Ok(self
            .engine
            .gang(gang)?
            .with_context(|| format!("no gang {gang}"))?
            .vault)
    }
}

/// Rule rejections are part of normal play; anything else is a defect.
const fn is_rule_rejection(err: &GangError) -> bool {
    matches!(
        err,
        GangError::PreconditionFailed(_)
            | GangError::CooldownActive { .. }
            | GangError::InsufficientResource(_)
    )
}

const TOOLS: [ToolKind; 4] = ToolKind::ALL;
const UNITS: [UnitKind; 2] = [UnitKind::Guard, UnitKind::Medic];

/// Issue `steps` random commands, auditing the whole store after each.
///
/// # Errors
///
/// Fails on the first non-rule error or broken invariant.
pub fn drive(world: &World, seed: u64, steps: usize) -> Result<RunStats> {
    if world.players.is_empty() || world.gangs.is_empty() {
        bail!("world has no players or gangs to drive");
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut stats = RunStats::default();
    let engine = &world.engine;

    for step in 0..steps {
        let actor = &world.players[rng.gen_range(0..world.players.len())];
        let target = &world.players[rng.gen_range(0..world.players.len())];
        let gang = &world.gangs[rng.gen_range(0..world.gangs.len())];
        let amount = rng.gen_range(1..=3_000);

        let result: Result<(), GangError> = match rng.gen_range(0..16) {
            0 => engine.deposit(actor, amount).map(drop),
            1 => engine.withdraw(actor, amount).map(drop),
            2 => engine.hire(actor, UNITS[rng.gen_range(0..UNITS.len())]).map(drop),
            3 => engine
                .upgrade_units(actor, UNITS[rng.gen_range(0..UNITS.len())], rng.r#gen())
                .map(drop),
            4 => engine
                .upgrade_track(actor, UpgradeTrack::ALL[rng.gen_range(0..UpgradeTrack::ALL.len())])
                .map(drop),
            5 => engine.upgrade_base(actor).map(drop),
            6 => engine.buy_tool(actor, TOOLS[rng.gen_range(0..TOOLS.len())]).map(drop),
            7 | 8 => engine.raid(actor, gang).map(|outcome| {
                if outcome.destroyed() {
                    stats.destroyed += 1;
                }
            }),
            9 => engine.rob(actor, gang).map(drop),
            10 => engine.kidnap(actor, target).map(drop),
            11 => engine.repair_base(actor).map(drop),
            12 => engine.pay_ransom(actor).map(drop),
            13 => engine.hire_escort(actor).map(drop),
            14 => {
                if rng.gen_bool(0.5) {
                    engine.enter_base(actor)
                } else {
                    engine.leave_base(actor)
                }
            }
            _ => engine.join_gang(actor, gang).map(drop),
        };

        match result {
            Ok(()) => stats.record(true),
            Err(err) if is_rule_rejection(&err) => {
                log::trace!("step {step}: {actor} rejected: {err}");
                stats.record(false);
            }
            Err(err) => bail!("step {step}: {actor} hit {err}"),
        }

        engine
            .clock()
            .advance(rng.gen_range(0..Action::Raid.window_secs()));
        if step % 25 == 24 {
            engine.release_expired_kidnaps()?;
        }
        world
            .audit()
            .with_context(|| format!("after step {step}"))?;
    }
    Ok(stats)
}
