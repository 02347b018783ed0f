/// quorum returns the size of a simple majority of `n` replicas.
pub fn quorum(n: usize) -> usize {
    n / 2 + 1
}

/// fast_quorum returns the default fast-path quorum: every replica has to agree.
/// Never smaller than a simple majority.
pub fn fast_quorum(n: usize) -> usize {
    std::cmp::max(n, quorum(n))
}

/// recovery_threshold is the number of identical pre-accepted replies, not counting the
/// original leader, that shows an instance might have committed on the fast path.
pub fn recovery_threshold(n: usize) -> usize {
    n / 2
}
