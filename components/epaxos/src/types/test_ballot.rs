#[cfg(test)]
use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_ballot_order() {
    // (smaller, greater)
    let cases = vec![
        (ballot!(0, 0, 1), ballot!(0, 0, 2)),
        (ballot!(0, 0, 3), ballot!(0, 1, 1)),
        (ballot!(0, 9, 3), ballot!(1, 0, 1)),
        (Ballot::default(), ballot!(0, 0, 1)),
    ];

    for (a, b) in cases {
        assert!(a < b, "{} < {}", a, b);
        assert!(b > a, "{} > {}", b, a);
    }

    assert_eq!(ballot!(1, 2, 3), Ballot::from((1, 2, 3)));
}

#[test]
fn test_ballot_next() {
    // (current, epoch, owner, expected)
    let cases = vec![
        (ballot!(0, 0, 1), 0, 2, ballot!(0, 1, 2)),
        (ballot!(0, 3, 3), 0, 1, ballot!(0, 4, 1)),
        (ballot!(0, 3, 3), 2, 1, ballot!(2, 1, 1)),
        (ballot!(3, 3, 3), 2, 1, ballot!(3, 4, 1)),
    ];

    for (cur, epoch, owner, want) in cases {
        let nxt = cur.next(epoch, owner);
        assert_eq!(want, nxt, "next of {}", cur);
        assert!(nxt > cur);
        assert!(!nxt.is_default());
    }
}

#[test]
fn test_ballot_default() {
    let b = Ballot::default_of(0, 3);
    assert!(b.is_default());
    assert!(b.is_default_of(3));
    assert!(!b.is_default_of(2));
    assert!(!ballot!(0, 1, 3).is_default_of(3));

    assert_eq!("(0, 0, 3)", format!("{}", b));
}
