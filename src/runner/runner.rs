//! Drives a workload through an in-process cluster and reports what it cost.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use futures::future::join_all;
use rand::Rng;
use slog::Logger;

use epaxos::conf::ClusterConf;
use epaxos::replica::ReplicaStats;
use epaxos::testutil::CopilotCluster;
use epaxos::testutil::Recorder;
use epaxos::testutil::TestCluster;
use epaxos::types::Command;
use epaxos::types::DepKey;

use super::RunError;

/// The key every conflicting command shares.
pub const HOT_KEY: &str = "0";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Protocol {
    EPaxos,
    Copilot,
}

impl FromStr for Protocol {
    type Err = RunError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "epaxos" => Ok(Protocol::EPaxos),
            "copilot" => Ok(Protocol::Copilot),
            _ => Err(RunError::UnknownProtocol(s.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::EPaxos => write!(f, "epaxos"),
            Protocol::Copilot => write!(f, "copilot"),
        }
    }
}

/// Workload describes the commands to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    pub requests: usize,

    /// Number of proposals in flight at a time.
    pub concurrent: usize,

    /// Percentage of commands that use `HOT_KEY` instead of a key of their own.
    pub conflict: u32,

    /// How long to wait for every replica to execute what committed.
    pub apply_timeout: Duration,
}

impl Default for Workload {
    fn default() -> Self {
        Workload {
            requests: 1000,
            concurrent: 10,
            conflict: 0,
            apply_timeout: Duration::from_secs(10),
        }
    }
}

impl Workload {
    pub fn check(&self) -> Result<(), RunError> {
        if self.concurrent == 0 {
            return Err(RunError::BadWorkload("concurrent is 0".into()));
        }
        if self.conflict > 100 {
            return Err(RunError::BadWorkload(format!(
                "conflict {}% is more than 100%",
                self.conflict
            )));
        }
        Ok(())
    }

    /// keys picks the dependency key of every request.
    pub fn keys(&self) -> Vec<DepKey> {
        let mut rng = rand::thread_rng();
        (0..self.requests)
            .map(|i| {
                if rng.gen_range(0..100) < self.conflict {
                    HOT_KEY.to_string()
                } else {
                    format!("k{}", i + 1)
                }
            })
            .collect()
    }
}

/// Report is the outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub protocol: Protocol,
    pub requests: usize,
    pub committed: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub fast_path: u64,
    pub slow_path: u64,
    pub recoveries: u64,
    pub rpcs: u64,
}

impl Report {
    /// throughput in committed commands per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.committed as f64 / secs
    }

    pub fn fast_path_pct(&self) -> f64 {
        let total = self.fast_path + self.slow_path;
        if total == 0 {
            return 0.0;
        }
        self.fast_path as f64 * 100.0 / total as f64
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "protocol:    {}", self.protocol)?;
        writeln!(
            f,
            "requests:    {} committed, {} failed",
            self.committed, self.failed
        )?;
        writeln!(f, "elapsed:     {:?}", self.elapsed)?;
        writeln!(f, "throughput:  {:.1} cmd/s", self.throughput())?;
        writeln!(
            f,
            "fast path:   {:.1}% ({} fast, {} slow, {} recovered)",
            self.fast_path_pct(),
            self.fast_path,
            self.slow_path,
            self.recoveries
        )?;
        write!(f, "rpcs:        {}", self.rpcs)
    }
}

/// run submits `workload` to a fresh in-process cluster described by `conf` and waits until
/// every replica executed every committed command.
pub async fn run(
    protocol: Protocol,
    conf: ClusterConf,
    workload: &Workload,
    logger: &Logger,
) -> Result<Report, RunError> {
    workload.check()?;
    conf.check()?;

    info!(logger, "start run";
          "protocol" => %protocol,
          "replicas" => conf.replicas.len(),
          "requests" => workload.requests,
          "concurrent" => workload.concurrent,
          "conflict" => workload.conflict);

    match protocol {
        Protocol::EPaxos => run_epaxos(conf, workload, logger).await,
        Protocol::Copilot => run_copilot(conf, workload, logger).await,
    }
}

/// Tally of the proposals a run submitted.
#[derive(Debug, Default)]
struct Tally {
    committed: usize,
    failed: usize,
}

impl Tally {
    fn merge(tallies: Vec<Tally>) -> Tally {
        tallies.into_iter().fold(Tally::default(), |a, b| Tally {
            committed: a.committed + b.committed,
            failed: a.failed + b.failed,
        })
    }
}

async fn run_epaxos(
    conf: ClusterConf,
    workload: &Workload,
    logger: &Logger,
) -> Result<Report, RunError> {
    let cluster = TestCluster::with_conf(conf, logger);
    let keys = workload.keys();
    let n = cluster.replicas.len();

    let start = Instant::now();

    // worker w submits requests w, w+C, w+2C ... one at a time
    let workers = (0..workload.concurrent).map(|w| {
        let cluster = &cluster;
        let keys = &keys;
        async move {
            let mut tally = Tally::default();
            for i in (w..keys.len()).step_by(workload.concurrent) {
                let r = &cluster.replicas[i % n];
                let cmd = Command::write(format!("{}={}", keys[i], i));
                match r.propose(cmd, keys[i].clone()).await {
                    Ok(_) => tally.committed += 1,
                    Err(e) => {
                        warn!(logger, "propose failed"; "request" => i, "err" => %e);
                        tally.failed += 1;
                    }
                }
            }
            tally
        }
    });
    let tally = Tally::merge(join_all(workers).await);

    let applied = cluster
        .wait_applied(tally.committed, workload.apply_timeout)
        .await;
    let elapsed = start.elapsed();

    for r in cluster.replicas.iter() {
        r.shutdown();
    }
    if !applied {
        return Err(RunError::NotApplied(
            tally.committed,
            slowest(&cluster.recorders),
        ));
    }

    let stats: Vec<&ReplicaStats> = cluster.replicas.iter().map(|r| &r.stats).collect();
    let report = report(Protocol::EPaxos, workload, tally, elapsed, &stats, cluster.net.rpc_count());

    info!(logger, "run done"; "committed" => report.committed, "elapsed" => ?report.elapsed);
    Ok(report)
}

async fn run_copilot(
    conf: ClusterConf,
    workload: &Workload,
    logger: &Logger,
) -> Result<Report, RunError> {
    let cluster = CopilotCluster::with_conf(conf, logger)?;
    let proposers = [cluster.pilot().clone(), cluster.copilot().clone()];

    let start = Instant::now();

    // the two logs order commands by themselves; keys only label the payload
    let workers = (0..workload.concurrent).map(|w| {
        let proposers = &proposers;
        async move {
            let mut tally = Tally::default();
            for i in (w..workload.requests).step_by(workload.concurrent) {
                let s = &proposers[i % 2];
                let cmd = Command::write(format!("k{}={}", i + 1, i));
                match s.propose(cmd).await {
                    Ok(_) => tally.committed += 1,
                    Err(e) => {
                        warn!(logger, "propose failed"; "request" => i, "err" => %e);
                        tally.failed += 1;
                    }
                }
            }
            tally
        }
    });
    let tally = Tally::merge(join_all(workers).await);

    let applied = cluster
        .wait_applied(tally.committed, workload.apply_timeout)
        .await;
    let elapsed = start.elapsed();

    for s in cluster.servers.iter() {
        s.shutdown();
    }
    if !applied {
        return Err(RunError::NotApplied(
            tally.committed,
            slowest(&cluster.recorders),
        ));
    }

    let stats: Vec<&ReplicaStats> = cluster.servers.iter().map(|s| &s.stats).collect();
    let report = report(Protocol::Copilot, workload, tally, elapsed, &stats, cluster.net.rpc_count());

    info!(logger, "run done"; "committed" => report.committed, "elapsed" => ?report.elapsed);
    Ok(report)
}

fn slowest(recorders: &[Arc<Recorder>]) -> usize {
    recorders.iter().map(|r| r.len()).min().unwrap_or(0)
}

fn report(
    protocol: Protocol,
    workload: &Workload,
    tally: Tally,
    elapsed: Duration,
    stats: &[&ReplicaStats],
    rpcs: u64,
) -> Report {
    let sum = |f: fn(&ReplicaStats) -> u64| -> u64 { stats.iter().map(|s| f(s)).sum() };

    Report {
        protocol,
        requests: workload.requests,
        committed: tally.committed,
        failed: tally.failed,
        elapsed,
        fast_path: sum(|s| ReplicaStats::get(&s.fast_path)),
        slow_path: sum(|s| ReplicaStats::get(&s.slow_path)),
        recoveries: sum(|s| ReplicaStats::get(&s.recoveries)),
        rpcs,
    }
}
