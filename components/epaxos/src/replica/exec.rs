use std::sync::Weak;

use tokio::sync::mpsc;

use super::Replica;
use super::ReplicaStats;
use crate::exec::attempt;
use crate::exec::drive;
use crate::exec::mark_all;
use crate::exec::Step;
use crate::types::InstanceId;

impl Replica {
    /// trigger_execution queues an execution attempt rooted at a just committed instance.
    pub(crate) fn trigger_execution(&self, iid: InstanceId) {
        // the receiver lives as long as the replica
        let _ = self.exec_tx.send(iid);
    }

    /// exec_loop turns every queued trigger into an execution task. It stops once the replica
    /// is dropped.
    pub(crate) async fn exec_loop(me: Weak<Replica>, mut rx: mpsc::UnboundedReceiver<InstanceId>) {
        while let Some(iid) = rx.recv().await {
            let r = match me.upgrade() {
                Some(r) => r,
                None => return,
            };
            tokio::spawn(async move { r.execute(iid).await });
        }
    }

    /// execute executes `root` and everything it depends on, waiting for or recovering
    /// uncommitted dependencies as the execution policy says.
    pub async fn execute(&self, root: InstanceId) {
        drive(
            root,
            self.conf.commit_wait_timeout(),
            |root| self.exec_step(root),
            |blocker| self.recover_blocker(blocker),
        )
        .await
    }

    /// exec_step plans under the replica lock, then applies without it, so that neither a slow
    /// applier nor one reading the replica holds up the handlers.
    fn exec_step(&self, root: InstanceId) -> Step<InstanceId> {
        let _applying = self.applying.lock();

        let step = {
            let mut guard = self.state.lock();
            let st = &mut *guard;
            attempt(&st.space, &mut st.waiters, root, self.conf.exec_policy)
        };

        match &step {
            Step::Done(planned) if !planned.is_empty() => {
                for (_, cmd) in planned.iter() {
                    self.applier.apply(cmd);
                }

                let mut st = self.state.lock();
                let done = mark_all(&mut st.space, planned);
                debug!(self.logger, "executed"; "root" => %root, "n" => done.len());
                ReplicaStats::incr(&self.stats.executed, done.len() as u64);

                let purged = st.space.gc(self.conf.retention_window);
                if purged > 0 {
                    debug!(self.logger, "purged"; "n" => purged);
                }
            }
            Step::Wait(blocker, _) | Step::Parked(blocker) => {
                debug!(self.logger, "execution blocked"; "root" => %root, "blocker" => %blocker);
            }
            _ => {}
        }

        match step {
            Step::Wait(..) | Step::Parked(_) if self.is_shut_down() => Step::Stop,
            _ => step,
        }
    }

    /// recover_blocker runs recovery on an instance execution has waited on for too long.
    /// Concurrent executions blocked on the same instance recover it only once.
    async fn recover_blocker(&self, blocker: InstanceId) {
        {
            let mut st = self.state.lock();
            let committed = st.space.get(blocker).map_or(false, |x| x.status.is_committed());
            if committed || !st.recovering.insert(blocker) {
                return;
            }
        }

        info!(self.logger, "recover blocking instance"; "iid" => %blocker);
        let rst = self.start_prepare(blocker).await;

        self.state.lock().recovering.remove(&blocker);

        if let Err(e) = rst {
            info!(self.logger, "recovery failed"; "iid" => %blocker, "err" => %e);
        }
    }
}
