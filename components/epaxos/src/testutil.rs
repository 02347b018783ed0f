//! In-process clusters for tests and the workload runner.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use slog::Logger;
use tokio::time::sleep;
use tokio::time::Instant;

use crate::comm::LocalNetwork;
use crate::conf::ClusterConf;
use crate::conf::ConfError;
use crate::copilot::CopilotReply;
use crate::copilot::CopilotRequest;
use crate::copilot::CopilotServer;
use crate::exec::Apply;
use crate::message::Reply;
use crate::message::Request;
use crate::replica::Replica;
use crate::types::Command;
use crate::types::ReplicaId;

/// discard_logger returns a root logger that drops everything.
pub fn discard_logger() -> Logger {
    Logger::root(slog::Discard, o!())
}

/// Recorder is an applier that remembers every command in execution order.
#[derive(Debug, Default)]
pub struct Recorder {
    applied: Mutex<Vec<Command>>,
}

impl Recorder {
    pub fn new() -> Arc<Recorder> {
        Arc::new(Recorder::default())
    }

    pub fn applied(&self) -> Vec<Command> {
        self.applied.lock().clone()
    }

    /// payloads returns the payloads of applied commands, no-ops left out.
    pub fn payloads(&self) -> Vec<String> {
        self.applied
            .lock()
            .iter()
            .filter(|c| !c.is_noop())
            .map(|c| String::from_utf8_lossy(&c.payload).to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.applied.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Apply for Recorder {
    fn apply(&self, cmd: &Command) {
        self.applied.lock().push(cmd.clone());
    }
}

/// wait_for polls `cond` until it holds or `timeout` passes. It returns the last result.
pub async fn wait_for<F: Fn() -> bool>(timeout: Duration, cond: F) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(5)).await;
    }
}

/// TestCluster is an EPaxos group over a LocalNetwork. Replica ids are `conf.replicas`.
pub struct TestCluster {
    pub conf: ClusterConf,
    pub net: Arc<LocalNetwork<Request, Reply>>,
    pub replicas: Vec<Arc<Replica>>,
    pub recorders: Vec<Arc<Recorder>>,
}

impl TestCluster {
    /// new builds `n` replicas with default protocol settings.
    /// It must be called inside a tokio runtime.
    pub fn new(n: usize) -> TestCluster {
        TestCluster::with_conf(ClusterConf::new_local(n), &discard_logger())
    }

    pub fn with_conf(conf: ClusterConf, logger: &Logger) -> TestCluster {
        let net = LocalNetwork::new();
        let mut replicas = vec![];
        let mut recorders = vec![];

        for rid in conf.replicas.iter().copied() {
            let rec = Recorder::new();
            let r = Replica::new(rid, &conf, net.communicator(rid), rec.clone(), logger);
            net.register(rid, r.clone());

            replicas.push(r);
            recorders.push(rec);
        }

        TestCluster {
            conf,
            net,
            replicas,
            recorders,
        }
    }

    fn pos(&self, rid: ReplicaId) -> usize {
        self.conf
            .replicas
            .iter()
            .position(|x| *x == rid)
            .unwrap_or_else(|| panic!("no replica {}", rid))
    }

    pub fn replica(&self, rid: ReplicaId) -> &Arc<Replica> {
        &self.replicas[self.pos(rid)]
    }

    pub fn recorder(&self, rid: ReplicaId) -> &Arc<Recorder> {
        &self.recorders[self.pos(rid)]
    }

    /// wait_applied waits until every replica applied at least `n` commands.
    pub async fn wait_applied(&self, n: usize, timeout: Duration) -> bool {
        wait_for(timeout, || self.recorders.iter().all(|r| r.len() >= n)).await
    }
}

/// CopilotCluster is a Copilot group over a LocalNetwork.
pub struct CopilotCluster {
    pub conf: ClusterConf,
    pub net: Arc<LocalNetwork<CopilotRequest, CopilotReply>>,
    pub servers: Vec<Arc<CopilotServer>>,
    pub recorders: Vec<Arc<Recorder>>,
}

impl CopilotCluster {
    pub fn new(n: usize) -> Result<CopilotCluster, ConfError> {
        CopilotCluster::with_conf(ClusterConf::new_local(n), &discard_logger())
    }

    pub fn with_conf(conf: ClusterConf, logger: &Logger) -> Result<CopilotCluster, ConfError> {
        let net = LocalNetwork::new();
        let mut servers = vec![];
        let mut recorders = vec![];

        for rid in conf.replicas.iter().copied() {
            let rec = Recorder::new();
            let s = CopilotServer::new(rid, &conf, net.communicator(rid), rec.clone(), logger)?;
            net.register(rid, s.clone());

            servers.push(s);
            recorders.push(rec);
        }

        Ok(CopilotCluster {
            conf,
            net,
            servers,
            recorders,
        })
    }

    fn pos(&self, rid: ReplicaId) -> usize {
        self.conf
            .replicas
            .iter()
            .position(|x| *x == rid)
            .unwrap_or_else(|| panic!("no replica {}", rid))
    }

    pub fn server(&self, rid: ReplicaId) -> &Arc<CopilotServer> {
        &self.servers[self.pos(rid)]
    }

    pub fn recorder(&self, rid: ReplicaId) -> &Arc<Recorder> {
        &self.recorders[self.pos(rid)]
    }

    pub fn pilot(&self) -> &Arc<CopilotServer> {
        self.server(self.conf.pilots[0])
    }

    pub fn copilot(&self) -> &Arc<CopilotServer> {
        self.server(self.conf.pilots[1])
    }

    pub async fn wait_applied(&self, n: usize, timeout: Duration) -> bool {
        wait_for(timeout, || self.recorders.iter().all(|r| r.len() >= n)).await
    }
}
