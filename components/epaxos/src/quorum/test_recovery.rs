#[cfg(test)]
use pretty_assertions::assert_eq;

use super::*;
use crate::types::Ballot;
use crate::types::InstanceStatus;
use crate::types::InstanceStatus::*;
use crate::types::ReplicaId;

#[derive(Debug, PartialEq, Eq)]
struct R {
    replier: ReplicaId,
    status: InstanceStatus,
    ballot: Ballot,
    value: i64,
    ok: bool,
    purged: bool,
}

impl PreparedView for R {
    fn status(&self) -> InstanceStatus {
        self.status
    }
    fn accepted_ballot(&self) -> Ballot {
        self.ballot
    }
    fn replier(&self) -> ReplicaId {
        self.replier
    }
    fn promised(&self) -> bool {
        self.ok
    }
    fn purged(&self) -> bool {
        self.purged
    }
    fn same_proposal(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

fn r(replier: ReplicaId, status: InstanceStatus, ballot: Ballot, value: i64) -> R {
    R {
        replier,
        status,
        ballot,
        value,
        ok: true,
        purged: false,
    }
}

fn stale(replier: ReplicaId, status: InstanceStatus, value: i64) -> R {
    R {
        ok: false,
        ..r(replier, status, Ballot::default(), value)
    }
}

fn purged(replier: ReplicaId) -> R {
    R {
        ok: false,
        purged: true,
        ..r(replier, Executed, Ballot::default(), 0)
    }
}

/// Returns the kind of decision and the value it carries, -1 for a no-op.
fn kind(d: Recovery<'_, R>) -> (&'static str, i64) {
    match d {
        Recovery::Commit(x) => ("commit", x.value),
        Recovery::Accept(x) => ("accept", x.value),
        Recovery::PreAccept(x) => ("preaccept", x.value),
        Recovery::NoOp => ("noop", -1),
    }
}

#[test]
fn test_recovery_priority() {
    // leader of the instance is replica 1; 5 replicas; threshold 2
    let dflt = ballot!(0, 0, 1);
    let b2 = ballot!(0, 1, 2);
    let b3 = ballot!(0, 2, 3);

    let cases = vec![
        (
            "committed beats everything",
            vec![
                r(2, Accepted, b3, 7),
                r(3, Committed, dflt, 5),
                r(4, PreAccepted, dflt, 6),
            ],
            ("commit", 5),
        ),
        (
            "executed counts as committed",
            vec![r(2, NotStarted, dflt, 0), r(3, Executed, dflt, 5)],
            ("commit", 5),
        ),
        (
            "highest accepted ballot",
            vec![
                r(2, Accepted, b2, 7),
                r(3, Accepted, b3, 8),
                r(4, PreAccepted, dflt, 6),
            ],
            ("accept", 8),
        ),
        (
            "identical default pre-accepts from non-leaders",
            vec![
                r(2, PreAccepted, dflt, 6),
                r(3, PreAccepted, dflt, 6),
                r(4, NotStarted, Ballot::default(), 0),
            ],
            ("accept", 6),
        ),
        (
            "leader's own reply does not count",
            vec![
                r(1, PreAccepted, dflt, 6),
                r(3, PreAccepted, dflt, 6),
                r(4, NotStarted, Ballot::default(), 0),
            ],
            ("preaccept", 6),
        ),
        (
            "not identical, ties pick the latest reply",
            vec![
                r(2, PreAccepted, dflt, 6),
                r(3, PreAccepted, dflt, 9),
                r(4, NotStarted, Ballot::default(), 0),
            ],
            ("preaccept", 9),
        ),
        (
            "contended ballot disables rule 3",
            vec![
                r(2, PreAccepted, b2, 6),
                r(3, PreAccepted, dflt, 6),
                r(4, PreAccepted, dflt, 6),
            ],
            ("preaccept", 6),
        ),
        (
            "nobody saw it",
            vec![
                r(2, NotStarted, Ballot::default(), 0),
                r(3, NotStarted, Ballot::default(), 0),
                r(4, NotStarted, Ballot::default(), 0),
            ],
            ("noop", -1),
        ),
    ];

    for (name, replies, want) in cases {
        assert_eq!(want, kind(decide(&replies, 1, 5)), "case: {}", name);
    }
}

#[test]
fn test_recovery_learnable() {
    let dflt = ballot!(0, 0, 1);

    // (replies, expected values kept, None if nothing can be learned)
    let cases = vec![
        (vec![r(2, PreAccepted, dflt, 6), stale(3, PreAccepted, 7)], Some(vec![6])),
        (vec![r(2, PreAccepted, dflt, 6), stale(3, Committed, 7)], Some(vec![6, 7])),
        (vec![purged(2), stale(3, Executed, 7)], Some(vec![7])),
        (vec![r(2, PreAccepted, dflt, 6), purged(3)], None),
        (vec![stale(2, Accepted, 6)], Some(vec![])),
    ];

    for (replies, want) in cases {
        let msg = format!("{:?}", replies);
        let got = learnable(replies).map(|rs| rs.iter().map(|x| x.value).collect::<Vec<_>>());
        assert_eq!(want, got, "{}", msg);
    }
}
