//! Scenario registry. Each scenario builds its own world from the run seed
//! and returns the counters it gathered, or the first broken expectation.
use anyhow::{Result, bail, ensure};
use gangwar_game::constants::{RANSOM_COST, SECS_PER_HOUR, TRACK_MAX_LEVEL};
use gangwar_game::progression::BASE_MAX_LEVEL;
use gangwar_game::{
    GangError, Precondition, Shortfall, ToolKind, UnitKind, UpgradeTrack, base_tier,
};
use std::thread;

use super::world::{RunStats, World, drive};

#[derive(Debug, Clone, Copy)]
pub struct ScenarioCtx {
    pub seed: u64,
    pub verbose: bool,
}

pub type ScenarioFn = fn(&ScenarioCtx) -> Result<RunStats>;

pub struct TestScenario {
    pub name: &'static str,
    pub description: &'static str,
    pub run: ScenarioFn,
}

static SCENARIOS: [TestScenario; 5] = [
    TestScenario {
        name: "smoke",
        description: "Found two gangs and exercise every command once",
        run: smoke,
    },
    TestScenario {
        name: "invariant-sweep",
        description: "Seeded random workload with a full audit after every step",
        run: invariant_sweep,
    },
    TestScenario {
        name: "concurrent-raids",
        description: "Parallel lethal raids on one base; exactly one may win",
        run: concurrent_raids,
    },
    TestScenario {
        name: "kidnap-lifecycle",
        description: "Kidnap, expire and release captives; hostage counts stay exact",
        run: kidnap_lifecycle,
    },
    TestScenario {
        name: "personnel-ladder",
        description: "Climb every base tier, track and unit level to the cap",
        run: personnel_ladder,
    },
];

pub fn get_scenario(name: &str) -> Option<&'static TestScenario> {
    let name = name.to_lowercase();
    SCENARIOS.iter().find(|scenario| scenario.name == name)
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    SCENARIOS
        .iter()
        .map(|scenario| (scenario.name, scenario.description))
        .collect()
}

pub fn scenario_names() -> Vec<String> {
    SCENARIOS.iter().map(|s| s.name.to_string()).collect()
}

fn smoke(ctx: &ScenarioCtx) -> Result<RunStats> {
    let mut world = World::seeded(ctx.seed);
    let crow = world.found("crow", "Crows", 8_000)?;
    let shark = world.found("shark", "Sharks", 6_000)?;
    let loner = world.player("loner", RANSOM_COST);
    let engine = &world.engine;
    let mut stats = RunStats::default();

    engine.wallet().set(&crow, 10_000);
    engine.hire(&crow, UnitKind::Guard)?;
    engine.hire(&crow, UnitKind::Medic)?;
    engine.upgrade_units(&crow, UnitKind::Guard, true)?;
    engine.upgrade_track(&crow, UpgradeTrack::Weapons)?;
    engine.buy_tool(&crow, ToolKind::BasicLockpick)?;
    for _ in 0..6 {
        stats.record(true);
    }

    let raid = engine.raid(&crow, "Sharks")?;
    let rob = engine.rob(&crow, "Sharks")?;
    let kidnap = engine.kidnap(&shark, &loner)?;
    stats.record(raid.roll.success);
    stats.record(rob.roll.success);
    stats.record(kidnap.roll.success);
    if kidnap.roll.success {
        engine.pay_ransom(&loner)?;
        stats.record(true);
        ensure!(
            world.vault("Sharks")? >= RANSOM_COST,
            "ransom never reached the captor vault"
        );
    }

    engine.enter_base(&shark)?;
    engine.leave_base(&shark)?;
    stats.record(true);
    stats.record(true);

    world.audit()?;
    let board = engine.leaderboard(10)?;
    ensure!(board.len() == 2, "leaderboard lists {} gangs", board.len());
    if ctx.verbose {
        for entry in &board {
            println!(
                "   #{} {} power {} ({}W/{}L)",
                entry.rank, entry.name, entry.power, entry.wins, entry.losses
            );
        }
    }
    Ok(stats)
}

fn invariant_sweep(ctx: &ScenarioCtx) -> Result<RunStats> {
    let mut world = World::seeded(ctx.seed);
    for (leader, gang) in [("ash", "Ashes"), ("bay", "Bay Boys"), ("cog", "Cogs"), ("dun", "Dunes")] {
        world.found(leader, gang, 4_000)?;
        world.recruit(gang, 2, 3_000)?;
    }
    for n in 0..4 {
        world.player(&format!("drifter-{n}"), 2_000);
    }

    let stats = drive(&world, ctx.seed, 300)?;
    world.engine.clock().advance(4 * SECS_PER_HOUR);
    world.engine.release_expired_kidnaps()?;
    let fixes = world.engine.reconcile_hostages()?;
    ensure!(fixes.is_empty(), "hostage counters drifted: {fixes:?}");
    world.audit()?;
    Ok(stats)
}

fn concurrent_raids(ctx: &ScenarioCtx) -> Result<RunStats> {
    // Every roll succeeds so each raid is lethal against a 1 HP base.
    let mut world = World::scripted(0);
    let mut attackers = Vec::new();
    for n in 0..4 {
        attackers.push(world.found(&format!("raider-{n}"), &format!("Raiders {n}"), 0)?);
    }
    world.found("target", "Target", 5_000)?;
    world.set_hp("Target", 1)?;
    let engine = &world.engine;

    let results = thread::scope(|scope| {
        let handles: Vec<_> = attackers
            .iter()
            .map(|id| scope.spawn(move || engine.raid(id, "Target")))
            .collect();
        handles.into_iter().map(|h| h.join()).collect::<Vec<_>>()
    });

    let mut stats = RunStats::default();
    for joined in results {
        let Ok(result) = joined else {
            bail!("raid thread panicked");
        };
        match result {
            Ok(outcome) if outcome.destroyed() => {
                stats.destroyed += 1;
                stats.record(true);
            }
            Ok(outcome) => bail!("non-lethal raid on a 1 HP base: {:?}", outcome.result),
            Err(GangError::PreconditionFailed(Precondition::UnknownGang)) => stats.record(false),
            Err(err) => bail!("unexpected raid failure: {err}"),
        }
    }
    ensure!(
        stats.destroyed == 1,
        "{} raids destroyed the same base",
        stats.destroyed
    );
    ensure!(engine.gang("Target")?.is_none(), "destroyed gang still stored");
    world.audit()?;
    Ok(stats)
}

fn kidnap_lifecycle(ctx: &ScenarioCtx) -> Result<RunStats> {
    let mut world = World::seeded(ctx.seed);
    let boss = world.found("boss", "Wardens", 0)?;
    let victims: Vec<_> = (0..6)
        .map(|n| world.player(&format!("victim-{n}"), 0))
        .collect();
    let engine = &world.engine;
    let mut stats = RunStats::default();

    let mut taken = 0;
    for victim in &victims {
        let outcome = engine.kidnap(&boss, victim)?;
        stats.record(outcome.roll.success);
        if outcome.roll.success {
            taken += 1;
        }
        engine.clock().advance(300);
    }
    let held = engine.gang("Wardens")?.map_or(0, |gang| gang.hostages);
    ensure!(held == taken, "recorded {held} hostages, took {taken}");

    engine.clock().advance(3 * SECS_PER_HOUR);
    let released = engine.release_expired_kidnaps()?;
    ensure!(
        released.len() == usize::try_from(taken)?,
        "released {} of {taken}",
        released.len()
    );
    ensure!(
        engine.release_expired_kidnaps()?.is_empty(),
        "second sweep released captives again"
    );
    ensure!(
        engine.reconcile_hostages()?.is_empty(),
        "hostage counter needed a fix"
    );
    world.audit()?;
    Ok(stats)
}

fn personnel_ladder(ctx: &ScenarioCtx) -> Result<RunStats> {
    let mut world = World::seeded(ctx.seed);
    let boss = world.found("boss", "Climbers", 0)?;
    let engine = &world.engine;
    engine.wallet().set(&boss, i64::from(u32::MAX));
    let mut stats = RunStats::default();

    while engine.gang("Climbers")?.is_some_and(|g| g.base.level < BASE_MAX_LEVEL) {
        engine.upgrade_base(&boss)?;
        stats.record(true);
    }
    match engine.upgrade_base(&boss) {
        Err(GangError::InsufficientResource(Shortfall::MaxLevel(_))) => stats.record(false),
        other => bail!("upgrade past the top tier returned {other:?}"),
    }

    for track in UpgradeTrack::ALL {
        loop {
            match engine.upgrade_track(&boss, track) {
                Ok(_) => stats.record(true),
                Err(GangError::InsufficientResource(Shortfall::MaxLevel(_))) => break,
                Err(err) => bail!("{track} upgrade failed: {err}"),
            }
        }
    }

    let top = base_tier(BASE_MAX_LEVEL);
    for kind in [UnitKind::Guard, UnitKind::Medic] {
        loop {
            match engine.hire(&boss, kind) {
                Ok(_) => stats.record(true),
                Err(GangError::InsufficientResource(Shortfall::RosterFull { .. })) => break,
                Err(err) => bail!("hiring {kind} failed: {err}"),
            }
        }
        loop {
            match engine.upgrade_units(&boss, kind, true) {
                Ok(_) => stats.record(true),
                Err(GangError::InsufficientResource(Shortfall::MaxLevel(_))) => break,
                Err(err) => bail!("upgrading {kind} failed: {err}"),
            }
        }
    }

    let Some(gang) = engine.gang("Climbers")? else {
        bail!("gang vanished during the climb");
    };
    ensure!(gang.base.hp == top.max_hp, "hp {} after climb", gang.base.hp);
    ensure!(gang.army.count(UnitKind::Guard) == top.max_guards);
    ensure!(gang.army.count(UnitKind::Medic) == top.max_medics);
    ensure!(
        UpgradeTrack::ALL
            .iter()
            .all(|track| gang.upgrades.level(*track) == TRACK_MAX_LEVEL),
        "tracks not maxed: {:?}",
        gang.upgrades
    );
    world.audit()?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(seed: u64) -> ScenarioCtx {
        ScenarioCtx {
            seed,
            verbose: false,
        }
    }

    #[test]
    fn registry_lookup_is_case_insensitive() {
        assert!(get_scenario("SMOKE").is_some());
        assert!(get_scenario("missing").is_none());
        assert_eq!(list_scenarios().len(), scenario_names().len());
    }

    #[test]
    fn every_scenario_passes_for_a_fixed_seed() {
        for name in scenario_names() {
            let scenario = get_scenario(&name).unwrap();
            let stats = (scenario.run)(&ctx(1337)).unwrap_or_else(|err| panic!("{name}: {err:#}"));
            assert!(stats.operations > 0, "{name} did nothing");
        }
    }

    #[test]
    fn concurrent_raids_destroy_once() {
        let stats = concurrent_raids(&ctx(0)).unwrap();
        assert_eq!(stats.destroyed, 1);
        assert_eq!(stats.operations, 4);
    }
}
