use std::time::Duration;

#[cfg(test)]
use pretty_assertions::assert_eq;

use super::*;

fn identical(r: &bool) -> bool {
    *r
}

#[test]
fn test_event_yes_no() {
    // n_total=5, quorum=3
    // (yes, no, unreachable, yes(), no(), ready)
    let cases = vec![
        (0, 0, 0, false, false, false),
        (2, 0, 0, false, false, false),
        (3, 0, 0, true, false, true),
        (2, 2, 0, false, false, false),
        (2, 3, 0, false, true, true),
        (2, 1, 2, false, true, true),
        (1, 0, 2, false, false, false),
        (3, 2, 0, true, false, true),
    ];

    for (y, n, u, want_yes, want_no, want_ready) in cases {
        let (mut ev, _tx) = QuorumEvent::<bool>::new(5, 3);
        for _ in 0..y {
            ev.vote(Vote::Yes(false));
        }
        for _ in 0..n {
            ev.vote(Vote::No(false));
        }
        for _ in 0..u {
            ev.vote(Vote::Unreachable);
        }

        let msg = format!("yes={} no={} unreachable={}", y, n, u);
        assert_eq!(want_yes, ev.yes(), "{}", msg);
        assert_eq!(want_no, ev.no(), "{}", msg);
        assert_eq!(want_ready, ev.is_ready(), "{}", msg);
        assert_eq!(y + n, ev.replies.len(), "{}", msg);
        assert!(!ev.fast());
    }
}

#[test]
fn test_event_fast_path() {
    // n_total=3, quorum=2, fast_quorum=3; self vote is identical.
    let (ev, _tx) = QuorumEvent::<bool>::new(3, 2);
    let mut ev = ev.with_fast_path(3, identical);
    ev.vote_self();

    ev.vote(Vote::Yes(true));
    assert!(ev.yes());
    assert!(!ev.fast());
    // a fast path is still possible: keep waiting
    assert!(!ev.is_ready());

    ev.vote(Vote::Yes(true));
    assert!(ev.fast());
    assert!(ev.is_ready());

    // one non-identical yes makes the fast path impossible, a slow quorum is enough
    let (ev2, _tx) = QuorumEvent::<bool>::new(3, 2);
    let mut ev2 = ev2.with_fast_path(3, identical);
    ev2.vote_self();
    ev2.vote(Vote::Yes(false));
    assert!(ev2.yes());
    assert!(!ev2.fast());
    assert!(ev2.is_ready());
}

#[test]
fn test_event_test_poll() {
    let (mut ev, tx) = QuorumEvent::<bool>::new(3, 2);
    assert_eq!(EventStatus::Init, ev.status());
    assert!(!ev.test());

    tx.send(Vote::Yes(false)).unwrap();
    assert!(!ev.test());
    assert_eq!(1, ev.n_yes());

    tx.send(Vote::No(false)).unwrap();
    tx.send(Vote::Yes(false)).unwrap();
    assert!(ev.test());
    assert_eq!(EventStatus::Done, ev.status());
    assert_eq!(1, ev.n_no());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_event_wait_ready() {
    let (mut ev, tx) = QuorumEvent::<bool>::new(3, 2);
    ev.vote_self();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let _ = tx.send(Vote::Yes(false));
    });

    let st = ev.wait(Duration::from_secs(5)).await;
    assert_eq!(EventStatus::Done, st);
    assert!(ev.yes());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_event_wait_timeout() {
    let (mut ev, tx) = QuorumEvent::<bool>::new(3, 2);
    ev.vote_self();

    let st = ev.wait(Duration::from_millis(30)).await;
    assert_eq!(EventStatus::TimedOut, st);
    assert!(!ev.yes());
    assert!(!ev.no());

    // late votes are discarded
    assert!(tx.send(Vote::Yes(false)).is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_event_wait_senders_gone() {
    let (mut ev, tx) = QuorumEvent::<bool>::new(5, 3);
    tx.send(Vote::Yes(false)).unwrap();
    drop(tx);

    let st = ev.wait(Duration::from_secs(5)).await;
    assert_eq!(EventStatus::Done, st);
    assert!(!ev.yes());
    assert_eq!(1, ev.n_voted());
}
