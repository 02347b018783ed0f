#[cfg(test)]
use pretty_assertions::assert_eq;

use super::*;
use crate::exec::execute;
use crate::exec::DepGraph;
use crate::exec::Executable;
use crate::types::Command;
use crate::types::InstanceId;
use crate::types::InstanceStatus;

fn space_of(insts: Vec<crate::types::Instance>) -> InstanceSpace {
    let mut sp = InstanceSpace::new();
    for inst in insts {
        sp.insert(inst);
    }
    sp
}

#[test]
fn test_space_entry() {
    let mut sp = InstanceSpace::new();
    assert!(sp.is_empty());
    assert_eq!(None, sp.get(instid!(1, 1)));

    let inst = sp.entry(instid!(1, 1)).unwrap();
    assert_eq!(InstanceStatus::NotStarted, inst.status);
    assert_eq!(1, sp.len());

    sp.insert(inst!((1, 2), "x", 1, [], Committed));
    assert_eq!(2, sp.len());
    assert_eq!("x", sp.get(instid!(1, 2)).unwrap().dkey);

    assert_eq!(0, sp.max_executed(1));
    assert_eq!(1, sp.min_active(1));
    assert_eq!(0, sp.max_executed(9));
}

#[test]
fn test_space_predecessors() {
    let sp = space_of(vec![
        inst!((1, 1), "x", 1, [], Committed),
        inst!((2, 1), "y", 1, [], Committed),
        inst!((2, 2), "x", 2, [(1, 1), (2, 1)], Committed),
        inst!((1, 2), "x", 3, [(1, 2), (2, 2)], Committed),
    ]);

    let cases: Vec<(InstanceId, Result<Vec<InstanceId>, InstanceId>)> = vec![
        // (2, 1) does not interfere
        (instid!(2, 2), Ok(vec![instid!(1, 1)])),
        // itself is not a dependency
        (instid!(1, 2), Ok(vec![instid!(1, 1), instid!(2, 2)])),
    ];
    for (key, want) in cases {
        assert_eq!(want, sp.predecessors(key), "predecessors of {}", key);
    }

    let blocked = space_of(vec![
        inst!((3, 1), "x", 1, [], PreAccepted),
        inst!((3, 2), "z", 1, [], PreAccepted),
        inst!((3, 3), noop, [], Accepted),
        inst!((1, 1), "x", 2, [(3, 1)], Committed),
        inst!((1, 2), "x", 2, [(4, 1)], Committed),
        inst!((1, 3), "w", 2, [(3, 3)], Committed),
    ]);

    let cases: Vec<(InstanceId, Result<Vec<InstanceId>, InstanceId>)> = vec![
        // an uncommitted interfering instance
        (instid!(1, 1), Err(instid!(3, 1))),
        // an unknown instance
        (instid!(1, 2), Err(instid!(4, 1))),
        // nothing interferes with "w" but a no-op may still be recovered into anything
        (instid!(1, 3), Err(instid!(3, 3))),
    ];
    for (key, want) in cases {
        assert_eq!(want, blocked.predecessors(key), "predecessors of {}", key);
    }
}

#[test]
fn test_space_order() {
    let sp = space_of(vec![
        inst!((1, 1), "x", 2, [(2, 1)], Committed),
        inst!((2, 1), "x", 2, [(1, 1)], Committed),
        inst!((3, 1), "x", 1, [(1, 1), (2, 1)], Committed),
    ]);

    assert_eq!((2, 1, 1), sp.order(instid!(1, 1)));
    assert!(sp.order(instid!(3, 1)) < sp.order(instid!(1, 1)));
    assert!(sp.order(instid!(1, 1)) < sp.order(instid!(2, 1)));
}

#[test]
fn test_space_execute_and_gc() {
    let mut sp = space_of(vec![
        inst!((1, 1), "x", 2, [(2, 1)], Committed),
        inst!((2, 1), "x", 1, [(1, 1)], Committed),
        inst!((1, 2), "x", 3, [(1, 1), (2, 1)], Committed),
        inst!((1, 3), "y", 1, [], Committed),
    ]);

    let apply = |_: &Command| {};

    let done = execute(&mut sp, instid!(1, 2), &apply).unwrap();
    assert_eq!(vec![instid!(2, 1), instid!(1, 1), instid!(1, 2)], done);
    assert_eq!(2, sp.max_executed(1));
    assert_eq!(1, sp.max_executed(2));

    assert_eq!(vec![instid!(1, 3)], execute(&mut sp, instid!(1, 3), &apply).unwrap());
    assert_eq!(3, sp.max_executed(1));

    assert_eq!(2, sp.gc(0));
    assert_eq!(3, sp.min_active(1));
    assert!(sp.is_purged(instid!(1, 2)));
    assert!(sp.is_executed(instid!(1, 2)));
    assert!(sp.entry(instid!(1, 2)).is_none());
    assert!(!sp.is_purged(instid!(2, 1)));

    assert_eq!(
        vec![instid!(1, 3), instid!(2, 1)],
        sp.iter().map(|x| x.instance_id).collect::<Vec<_>>()
    );
}
