mod common;

use common::{founded, lucky_engine, player, set_hp};
use gangwar_game::{GangError, Precondition, Wallet};
use std::thread;

#[test]
fn only_one_lethal_raid_commits() {
    let engine = lucky_engine();
    let crow = founded(&engine, "crow", "Crows", 0);
    let wolf = founded(&engine, "wolf", "Wolves", 0);
    founded(&engine, "shark", "Sharks", 3_000);
    set_hp(&engine, "Sharks", 1);

    let results = thread::scope(|scope| {
        let handles = [&crow, &wolf].map(|id| {
            let engine = &engine;
            scope.spawn(move || engine.raid(id, "Sharks"))
        });
        handles.map(|h| h.join().unwrap())
    });

    let destroyed = results
        .iter()
        .filter(|r| r.as_ref().is_ok_and(|o| o.destroyed()))
        .count();
    assert_eq!(destroyed, 1);
    for result in &results {
        if let Err(err) = result {
            assert_eq!(
                *err,
                GangError::PreconditionFailed(Precondition::UnknownGang)
            );
        }
    }

    assert!(engine.gang("Sharks").unwrap().is_none());
    let seized: i64 = ["Crows", "Wolves"]
        .iter()
        .map(|name| engine.gang(name).unwrap().unwrap().vault)
        .sum();
    assert_eq!(seized, 3_000);
    engine.audit().unwrap();
}

#[test]
fn concurrent_deposits_conserve_money() {
    let engine = lucky_engine();
    founded(&engine, "boss", "Crows", 0);
    let members: Vec<_> = (0..8)
        .map(|n| {
            let id = player(&engine, &format!("m{n}"), 1_000);
            engine.join_gang(&id, "Crows").unwrap();
            id
        })
        .collect();
    let before = engine.wallet().total();

    let credited: i64 = thread::scope(|scope| {
        let handles: Vec<_> = members
            .iter()
            .map(|id| {
                let engine = &engine;
                scope.spawn(move || {
                    let mut sum = 0;
                    for _ in 0..10 {
                        match engine.deposit(id, 100) {
                            Ok(moved) => sum += moved.credited,
                            Err(GangError::ConcurrencyConflict { .. }) => {}
                            Err(other) => panic!("unexpected deposit failure: {other}"),
                        }
                    }
                    sum
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    let vault = engine.gang("Crows").unwrap().unwrap().vault;
    assert_eq!(vault, credited);
    assert_eq!(engine.wallet().total() + vault, before);
    for id in &members {
        assert!(engine.wallet().balance(id).unwrap() >= 0);
    }
    engine.audit().unwrap();
}

#[test]
fn concurrent_joins_all_land() {
    let engine = lucky_engine();
    founded(&engine, "boss", "Crows", 0);
    let recruits: Vec<_> = (0..6)
        .map(|n| player(&engine, &format!("r{n}"), 0))
        .collect();

    thread::scope(|scope| {
        for id in &recruits {
            let engine = &engine;
            scope.spawn(move || {
                // Retry past exhausted attempts; every join must land eventually.
                loop {
                    match engine.join_gang(id, "Crows") {
                        Ok(_) => break,
                        Err(err) if err.is_transient() => {}
                        Err(err) => panic!("join failed: {err}"),
                    }
                }
            });
        }
    });

    let gang = engine.gang("Crows").unwrap().unwrap();
    assert_eq!(gang.members.len(), 7);
    engine.audit().unwrap();
}
