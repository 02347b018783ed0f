use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tokio::time::timeout;

use super::find_sccs;
use super::Apply;
use super::CommitWaiters;
use super::DepGraph;
use super::ExecPolicy;
use crate::types::Command;

/// Executable is a DepGraph whose instances can be marked executed.
pub trait Executable: DepGraph {
    fn is_executed(&self, key: Self::Key) -> bool;

    fn is_committed(&self, key: Self::Key) -> bool;

    fn command(&self, key: Self::Key) -> Option<Command>;

    /// mark_executed moves a committed instance to Executed and returns its command.
    /// It returns None if the instance is already executed.
    fn mark_executed(&mut self, key: Self::Key) -> Option<Command>;
}

/// plan returns, in execution order, every committed and not yet executed instance `root`
/// depends on, and `root` itself, each with its command. Nothing is modified.
///
/// It returns the first uncommitted dependency found instead, if any.
pub fn plan<G: Executable>(g: &G, root: G::Key) -> Result<Vec<(G::Key, Command)>, G::Key> {
    if g.is_executed(root) {
        return Ok(vec![]);
    }
    if !g.is_committed(root) {
        return Err(root);
    }

    let sccs = find_sccs(g, root)?;

    let mut planned = Vec::new();
    for key in sccs.into_iter().flatten() {
        if g.is_executed(key) {
            continue;
        }
        if let Some(cmd) = g.command(key) {
            planned.push((key, cmd));
        }
    }
    Ok(planned)
}

/// mark_all marks planned instances executed, in plan order, and returns those that were not
/// executed yet.
pub fn mark_all<G: Executable>(g: &mut G, planned: &[(G::Key, Command)]) -> Vec<G::Key> {
    planned
        .iter()
        .filter(|(key, _)| g.mark_executed(*key).is_some())
        .map(|(key, _)| *key)
        .collect()
}

/// execute applies every committed instance `root` depends on, and `root` itself.
/// It returns the executed keys in execution order, or the first uncommitted dependency found,
/// in which case nothing is executed.
///
/// Executing an already executed root is a no-op.
pub fn execute<G: Executable>(
    g: &mut G,
    root: G::Key,
    apply: &dyn Apply,
) -> Result<Vec<G::Key>, G::Key> {
    let planned = plan(&*g, root)?;
    for (_, cmd) in planned.iter() {
        apply.apply(cmd);
    }
    Ok(mark_all(g, &planned))
}

/// Step is the outcome of one execution attempt.
#[derive(Debug)]
pub enum Step<K> {
    /// Ready to execute: the planned instances, to be applied and then marked executed.
    Done(Vec<(K, Command)>),

    /// Blocked by an uncommitted instance. The receiver turns true once it commits.
    Wait(K, watch::Receiver<bool>),

    /// Blocked by an uncommitted instance, with the root parked on it. Its commit re-triggers
    /// the root.
    Parked(K),

    /// The replica is shut down and stops executing.
    Stop,
}

/// attempt runs `plan()` and, when blocked, either subscribes to the blocker's commit or
/// parks `root` on it, according to `policy`.
///
/// Both `g` and `waiters` must be guarded by the same lock that commits take.
pub fn attempt<G: Executable>(
    g: &G,
    waiters: &mut CommitWaiters<G::Key>,
    root: G::Key,
    policy: ExecPolicy,
) -> Step<G::Key> {
    match plan(g, root) {
        Ok(done) => Step::Done(done),
        Err(blocker) => match policy {
            ExecPolicy::WaitAtUncommitted => Step::Wait(blocker, waiters.subscribe(blocker)),
            ExecPolicy::AbortAtUncommitted => {
                waiters.park(blocker, root);
                Step::Parked(blocker)
            }
        },
    }
}

/// drive keeps attempting to execute `root` until it is done or stopped.
///
/// `step` makes one attempt. A blocker is given `commit_wait` to
/// commit, after which `recover` is called on it and the attempt is made again:
/// - waiting, the wait ends early when the blocker commits;
/// - parked, the commit re-triggers `root` elsewhere and the next attempt here finds it done.
///
/// `recover` must return at once if the blocker is committed by then.
pub async fn drive<K, S, R, Fut>(root: K, commit_wait: Duration, mut step: S, recover: R)
where
    K: Copy,
    S: FnMut(K) -> Step<K>,
    R: Fn(K) -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        match step(root) {
            Step::Done(_) | Step::Stop => return,
            Step::Wait(blocker, mut rx) => {
                let committed = match timeout(commit_wait, rx.wait_for(|c| *c)).await {
                    Ok(r) => r.is_ok(),
                    Err(_) => false,
                };
                if !committed {
                    recover(blocker).await;
                }
            }
            Step::Parked(blocker) => {
                sleep(commit_wait).await;
                recover(blocker).await;
            }
        }
    }
}
