use std::time::Duration;

#[cfg(test)]
use pretty_assertions::assert_eq;

use epaxos::conf::ClusterConf;
use epaxos::testutil::discard_logger;

use super::*;

#[test]
fn test_protocol_from_str() {
    let cases = vec![
        ("epaxos", Some(Protocol::EPaxos)),
        ("EPaxos", Some(Protocol::EPaxos)),
        ("copilot", Some(Protocol::Copilot)),
        ("raft", None),
    ];

    for (s, want) in cases {
        let got = s.parse::<Protocol>().ok();
        assert_eq!(want, got, "parse {}", s);
    }

    assert_eq!("copilot", Protocol::Copilot.to_string());
}

#[test]
fn test_workload_check() {
    let cases = vec![
        (Workload::default(), true),
        (
            Workload {
                concurrent: 0,
                ..Workload::default()
            },
            false,
        ),
        (
            Workload {
                conflict: 101,
                ..Workload::default()
            },
            false,
        ),
    ];

    for (w, ok) in cases {
        assert_eq!(ok, w.check().is_ok(), "{:?}", w);
    }
}

#[test]
fn test_workload_keys() {
    let cases = vec![
        (0, vec!["k1", "k2", "k3"]),
        (100, vec![HOT_KEY, HOT_KEY, HOT_KEY]),
    ];

    for (conflict, want) in cases {
        let w = Workload {
            requests: 3,
            conflict,
            ..Workload::default()
        };
        assert_eq!(want, w.keys(), "conflict: {}", conflict);
    }
}

#[test]
fn test_report() {
    let r = Report {
        protocol: Protocol::EPaxos,
        requests: 10,
        committed: 10,
        failed: 0,
        elapsed: Duration::from_secs(2),
        fast_path: 3,
        slow_path: 1,
        recoveries: 0,
        rpcs: 40,
    };

    assert_eq!(5.0, r.throughput());
    assert_eq!(75.0, r.fast_path_pct());

    let text = r.to_string();
    assert!(text.contains("10 committed, 0 failed"), "{}", text);
    assert!(text.contains("75.0%"), "{}", text);

    let idle = Report {
        fast_path: 0,
        slow_path: 0,
        elapsed: Duration::from_secs(0),
        ..r
    };
    assert_eq!(0.0, idle.throughput());
    assert_eq!(0.0, idle.fast_path_pct());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_epaxos() {
    let w = Workload {
        requests: 20,
        concurrent: 4,
        conflict: 50,
        ..Workload::default()
    };

    let report = run(Protocol::EPaxos, ClusterConf::new_local(3), &w, &discard_logger())
        .await
        .unwrap();

    assert_eq!(20, report.committed);
    assert_eq!(0, report.failed);
    assert!(report.fast_path + report.slow_path > 0);
    assert!(report.rpcs > 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_copilot() {
    let w = Workload {
        requests: 20,
        concurrent: 4,
        ..Workload::default()
    };

    let report = run(Protocol::Copilot, ClusterConf::new_local(3), &w, &discard_logger())
        .await
        .unwrap();

    assert_eq!(20, report.committed);
    assert_eq!(0, report.failed);
    assert!(report.rpcs > 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_copilot_without_pilots() {
    let mut conf = ClusterConf::new_local(3);
    conf.pilots.clear();

    let rst = run(Protocol::Copilot, conf, &Workload::default(), &discard_logger()).await;
    assert!(matches!(rst, Err(RunError::Conf(_))), "{:?}", rst);
}
