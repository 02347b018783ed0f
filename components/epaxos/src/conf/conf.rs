use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::ConfError;
use crate::exec::ExecPolicy;
use crate::types::ReplicaId;

/// ReplicaConf holds the protocol knobs every replica of a group shares.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ReplicaConf {
    /// How long a leader waits for a round of replies.
    pub quorum_timeout_ms: u64,

    /// How long execution waits for a blocking instance to commit before recovering it.
    pub commit_wait_timeout_ms: u64,

    /// Size of the fast-path quorum. It has to be the number of replicas, which is also
    /// the default.
    pub fast_quorum: Option<usize>,

    /// Number of executed instances kept per log before they are garbage collected.
    pub retention_window: i64,

    pub exec_policy: ExecPolicy,

    /// How many times a proposer falls back to recovery before giving up.
    pub recovery_attempts: usize,

    pub epoch: i32,
}

impl Default for ReplicaConf {
    fn default() -> Self {
        ReplicaConf {
            quorum_timeout_ms: 100,
            commit_wait_timeout_ms: 500,
            fast_quorum: None,
            retention_window: 10000,
            exec_policy: ExecPolicy::WaitAtUncommitted,
            recovery_attempts: 3,
            epoch: 0,
        }
    }
}

impl ReplicaConf {
    pub fn quorum_timeout(&self) -> Duration {
        Duration::from_millis(self.quorum_timeout_ms)
    }

    pub fn commit_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_wait_timeout_ms)
    }

    /// fast_quorum_of returns the fast quorum for a group of `n` replicas.
    pub fn fast_quorum_of(&self, n: usize) -> usize {
        match self.fast_quorum {
            Some(fq) => fq,
            None => crate::types::fast_quorum(n),
        }
    }
}

/// ClusterConf describes one replication group.
///
/// ```yaml
/// replicas: [1, 2, 3]
/// pilots: [1, 2]
/// protocol:
///     quorum_timeout_ms: 100
///     exec_policy: wait
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClusterConf {
    pub replicas: Vec<ReplicaId>,

    /// The two copilot proposers: the first one owns the pilot log.
    #[serde(default)]
    pub pilots: Vec<ReplicaId>,

    #[serde(default)]
    pub protocol: ReplicaConf,
}

impl ClusterConf {
    /// from_file read cluster conf yaml from a local file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ClusterConf, ConfError> {
        let content = fs::read_to_string(path)?;
        ClusterConf::from_str(content.as_str())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<ClusterConf, ConfError> {
        let cluster: ClusterConf = serde_yaml::from_str(content)?;
        cluster.check()?;
        Ok(cluster)
    }

    /// new_local builds a conf of replicas `1..=n`, with 1 and 2 as pilots.
    pub fn new_local(n: usize) -> ClusterConf {
        let replicas: Vec<ReplicaId> = (1..=n as ReplicaId).collect();
        let pilots = replicas.iter().take(2).copied().collect();
        ClusterConf {
            replicas,
            pilots,
            protocol: ReplicaConf::default(),
        }
    }

    /// check validates replica ids, pilots and quorum sizes.
    pub fn check(&self) -> Result<(), ConfError> {
        if self.replicas.is_empty() {
            return Err(ConfError::EmptyGroup);
        }

        let mut seen = BTreeSet::new();
        for rid in self.replicas.iter() {
            if !seen.insert(*rid) {
                return Err(ConfError::DupReplica(*rid));
            }
        }

        if !self.pilots.is_empty() {
            if self.pilots.len() != 2 {
                return Err(ConfError::BadPilots(format!(
                    "expect 2 pilots but {}",
                    self.pilots.len()
                )));
            }
            if self.pilots[0] == self.pilots[1] {
                return Err(ConfError::BadPilots(format!(
                    "pilot and copilot are both {}",
                    self.pilots[0]
                )));
            }
            for p in self.pilots.iter() {
                if !seen.contains(p) {
                    return Err(ConfError::OrphanPilot(*p));
                }
            }
        }

        let n = self.replicas.len();
        // recovery recognizes a fast commit only if every replica took part in it
        if let Some(fq) = self.protocol.fast_quorum {
            if fq != n {
                return Err(ConfError::BadFastQuorum(fq, n));
            }
        }

        if self.protocol.quorum_timeout_ms == 0 {
            return Err(ConfError::BadProtocol("quorum_timeout_ms is 0".into()));
        }
        if self.protocol.commit_wait_timeout_ms == 0 {
            return Err(ConfError::BadProtocol("commit_wait_timeout_ms is 0".into()));
        }
        if self.protocol.retention_window < 0 {
            return Err(ConfError::BadProtocol("negative retention_window".into()));
        }

        Ok(())
    }

    /// peers_of returns every replica except `rid`.
    pub fn peers_of(&self, rid: ReplicaId) -> Vec<ReplicaId> {
        self.replicas.iter().filter(|x| **x != rid).copied().collect()
    }
}
