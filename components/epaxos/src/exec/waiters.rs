use std::collections::HashMap;
use std::hash::Hash;

use tokio::sync::watch;

/// CommitWaiters lets execution wait for, or retry after, the commit of a blocking instance.
#[derive(Debug)]
pub struct CommitWaiters<K> {
    watchers: HashMap<K, watch::Sender<bool>>,

    /// blocker -> roots whose execution was abandoned because of it.
    parked: HashMap<K, Vec<K>>,
}

impl<K> Default for CommitWaiters<K> {
    fn default() -> Self {
        CommitWaiters {
            watchers: HashMap::new(),
            parked: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash> CommitWaiters<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// subscribe returns a receiver that turns true once `key` commits.
    pub fn subscribe(&mut self, key: K) -> watch::Receiver<bool> {
        self.watchers
            .entry(key)
            .or_insert_with(|| watch::channel(false).0)
            .subscribe()
    }

    /// park remembers to execute `root` again once `blocker` commits.
    pub fn park(&mut self, blocker: K, root: K) {
        let roots = self.parked.entry(blocker).or_default();
        if !roots.contains(&root) {
            roots.push(root);
        }
    }

    /// committed wakes up everyone waiting for `key` and returns the roots parked on it.
    pub fn committed(&mut self, key: K) -> Vec<K> {
        if let Some(tx) = self.watchers.remove(&key) {
            tx.send_replace(true);
        }
        self.parked.remove(&key).unwrap_or_default()
    }

    pub fn n_watched(&self) -> usize {
        self.watchers.len()
    }

    pub fn n_parked(&self) -> usize {
        self.parked.values().map(|v| v.len()).sum()
    }
}
