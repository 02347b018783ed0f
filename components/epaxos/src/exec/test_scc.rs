use std::collections::BTreeMap;

#[cfg(test)]
use pretty_assertions::assert_eq;

use super::*;
use crate::types::Command;
use crate::types::InstanceStatus;
use crate::types::InstanceStatus::*;

pub(crate) struct Node {
    pub status: InstanceStatus,
    pub preds: Vec<u32>,
    pub order: u32,
}

/// TestGraph is a dependency graph of plain numbers.
#[derive(Default)]
pub(crate) struct TestGraph {
    pub nodes: BTreeMap<u32, Node>,
}

impl TestGraph {
    /// add adds a node whose order is its own key.
    pub fn add(&mut self, key: u32, status: InstanceStatus, preds: &[u32]) -> &mut Self {
        self.add_ordered(key, key, status, preds)
    }

    pub fn add_ordered(
        &mut self,
        key: u32,
        order: u32,
        status: InstanceStatus,
        preds: &[u32],
    ) -> &mut Self {
        self.nodes.insert(
            key,
            Node {
                status,
                preds: preds.to_vec(),
                order,
            },
        );
        self
    }

    pub fn set_status(&mut self, key: u32, status: InstanceStatus) {
        if let Some(n) = self.nodes.get_mut(&key) {
            n.status = status;
        }
    }
}

impl DepGraph for TestGraph {
    type Key = u32;
    type Order = u32;

    fn predecessors(&self, key: u32) -> Result<Vec<u32>, u32> {
        let node = self.nodes.get(&key).ok_or(key)?;
        let mut preds = vec![];
        for p in node.preds.iter() {
            let pn = self.nodes.get(p).ok_or(*p)?;
            if pn.status == Executed {
                continue;
            }
            if !pn.status.is_committed() {
                return Err(*p);
            }
            preds.push(*p);
        }
        Ok(preds)
    }

    fn order(&self, key: u32) -> u32 {
        self.nodes[&key].order
    }
}

impl Executable for TestGraph {
    fn is_executed(&self, key: u32) -> bool {
        self.nodes.get(&key).map(|n| n.status == Executed) == Some(true)
    }

    fn is_committed(&self, key: u32) -> bool {
        self.nodes.get(&key).map(|n| n.status.is_committed()) == Some(true)
    }

    fn command(&self, key: u32) -> Option<Command> {
        self.nodes.get(&key).map(|_| Command::write(format!("{}", key)))
    }

    fn mark_executed(&mut self, key: u32) -> Option<Command> {
        let n = self.nodes.get_mut(&key)?;
        if n.status == Executed {
            return None;
        }
        n.status = Executed;
        Some(Command::write(format!("{}", key)))
    }
}

#[test]
fn test_scc_chain() {
    // 3 -> 2 -> 1
    let mut g = TestGraph::default();
    g.add(1, Committed, &[])
        .add(2, Committed, &[1])
        .add(3, Committed, &[2]);

    assert_eq!(vec![vec![1], vec![2], vec![3]], find_sccs(&g, 3).unwrap());
    assert_eq!(vec![vec![1], vec![2]], find_sccs(&g, 2).unwrap());
}

#[test]
fn test_scc_cycle() {
    //      .--------.
    //      v        |
    // 4 -> 1 -> 2 -> 3
    //           |
    //           `-> 5
    let mut g = TestGraph::default();
    g.add_ordered(1, 30, Committed, &[2])
        .add_ordered(2, 10, Committed, &[3, 5])
        .add_ordered(3, 20, Committed, &[1])
        .add(4, Committed, &[1])
        .add(5, Committed, &[]);

    // inside the cycle instances are sorted by order: 2(10), 3(20), 1(30)
    assert_eq!(vec![vec![5], vec![2, 3, 1], vec![4]], find_sccs(&g, 4).unwrap());
}

#[test]
fn test_scc_skip_executed() {
    let mut g = TestGraph::default();
    g.add(1, Executed, &[])
        .add(2, Committed, &[1])
        .add(3, Committed, &[1, 2]);

    assert_eq!(vec![vec![2], vec![3]], find_sccs(&g, 3).unwrap());
}

#[test]
fn test_scc_blocked() {
    let mut g = TestGraph::default();
    g.add(1, Accepted, &[])
        .add(2, Committed, &[1])
        .add(3, Committed, &[2, 9])
        .add(4, Committed, &[2]);

    // (root, blocker)
    let cases = vec![(2, 1), (4, 1), (3, 9), (9, 9)];
    for (root, blocker) in cases {
        assert_eq!(Err(blocker), find_sccs(&g, root), "root: {}", root);
    }

    g.set_status(1, Committed);
    assert_eq!(Err(9), find_sccs(&g, 3));
    assert_eq!(vec![vec![1], vec![2], vec![4]], find_sccs(&g, 4).unwrap());
}

#[test]
fn test_scc_deep_chain() {
    let n = 100_000;
    let mut g = TestGraph::default();
    g.add(1, Committed, &[]);
    for i in 2..=n {
        g.add(i, Committed, &[i - 1]);
    }

    let sccs = find_sccs(&g, n).unwrap();
    assert_eq!(n as usize, sccs.len());
    assert_eq!(vec![1], sccs[0]);
    assert_eq!(vec![n], sccs[n as usize - 1]);
}

#[test]
fn test_scc_big_cycle() {
    // i -> i-1, and 1 -> n
    let n = 1000;
    let mut g = TestGraph::default();
    g.add(1, Committed, &[n]);
    for i in 2..=n {
        g.add(i, Committed, &[i - 1]);
    }

    let sccs = find_sccs(&g, 500).unwrap();
    assert_eq!(1, sccs.len());
    assert_eq!((1..=n).collect::<Vec<_>>(), sccs[0]);
}
