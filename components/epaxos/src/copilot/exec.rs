use std::sync::Weak;

use tokio::sync::mpsc;

use super::CopilotServer;
use super::SlotId;
use crate::exec::attempt;
use crate::exec::drive;
use crate::exec::mark_all;
use crate::exec::Step;
use crate::replica::ReplicaStats;

impl CopilotServer {
    pub(crate) fn trigger_execution(&self, sid: SlotId) {
        let _ = self.exec_tx.send(sid);
    }

    pub(crate) async fn exec_loop(me: Weak<CopilotServer>, mut rx: mpsc::UnboundedReceiver<SlotId>) {
        while let Some(sid) = rx.recv().await {
            let s = match me.upgrade() {
                Some(s) => s,
                None => return,
            };
            tokio::spawn(async move { s.execute(sid).await });
        }
    }

    /// execute executes the entry `root` and every entry of both logs ordered before it.
    pub async fn execute(&self, root: SlotId) {
        drive(
            root,
            self.conf.commit_wait_timeout(),
            |root| self.exec_step(root),
            |blocker| self.recover_blocker(blocker),
        )
        .await
    }

    fn exec_step(&self, root: SlotId) -> Step<SlotId> {
        let _applying = self.applying.lock();

        let step = {
            let mut guard = self.state.lock();
            let st = &mut *guard;
            attempt(&st.logs, &mut st.waiters, root, self.conf.exec_policy)
        };

        match &step {
            Step::Done(planned) if !planned.is_empty() => {
                // the applier runs without the server lock
                for (_, cmd) in planned.iter() {
                    self.applier.apply(cmd);
                }

                let mut st = self.state.lock();
                let done = mark_all(&mut st.logs, planned);
                debug!(self.logger, "executed";
                       "log" => %root.log, "root" => root.slot, "n" => done.len());
                ReplicaStats::incr(&self.stats.executed, done.len() as u64);

                let purged = st.logs.gc(self.conf.retention_window);
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

    async fn recover_blocker(&self, blocker: SlotId) {
        {
            let mut st = self.state.lock();
            let committed = st.logs.get(blocker).map_or(false, |x| x.status.is_committed());
            if committed || !st.recovering.insert(blocker) {
                return;
            }
        }

        info!(self.logger, "take over blocking entry"; "slot" => %blocker);
        let rst = self.takeover(blocker).await;

        self.state.lock().recovering.remove(&blocker);

        if let Err(e) = rst {
            info!(self.logger, "takeover failed"; "slot" => %blocker, "err" => %e);
        }
    }
}
