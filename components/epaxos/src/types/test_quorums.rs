use super::quorums::*;

#[test]
fn test_quorums() {
    let cases: Vec<(usize, usize, usize, usize)> = vec![
        (0, 1, 1, 0),
        (1, 1, 1, 0),
        (2, 2, 2, 1),
        (3, 2, 3, 1),
        (4, 3, 4, 2),
        (5, 3, 5, 2),
        (6, 4, 6, 3),
        (7, 4, 7, 3),
    ];

    for (n_replicas, q, fastq, rec) in cases {
        assert_eq!(q, quorum(n_replicas), "quorum n={}", n_replicas);
        assert_eq!(
            fastq,
            fast_quorum(n_replicas),
            "fast-quorum n={}",
            n_replicas
        );
        assert_eq!(
            rec,
            recovery_threshold(n_replicas),
            "recovery threshold n={}",
            n_replicas
        );
    }
}
