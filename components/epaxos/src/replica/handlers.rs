//! Acceptor side: every handler is one short critical section.

use super::Replica;
use crate::comm::Handler;
use crate::message::AcceptReply;
use crate::message::AcceptRequest;
use crate::message::CommitReply;
use crate::message::CommitRequest;
use crate::message::MakeReply;
use crate::message::PreAcceptReply;
use crate::message::PreAcceptRequest;
use crate::message::PreAcceptStatus;
use crate::message::PrepareReply;
use crate::message::PrepareRequest;
use crate::message::Reply;
use crate::message::Request;
use crate::types::InstanceStatus;

impl Replica {
    pub fn handle_pre_accept(&self, req: PreAcceptRequest) -> PreAcceptReply {
        let iid = req.instance_id;

        let mut guard = self.state.lock();
        let st = &mut *guard;

        let inst = match st.space.entry(iid) {
            Some(x) => x,
            None => return MakeReply::pre_accept_failed(req.ballot),
        };

        if req.ballot < inst.highest_seen {
            debug!(self.logger, "pre-accept: stale ballot";
                   "iid" => %iid, "ballot" => %req.ballot, "seen" => %inst.highest_seen);
            return MakeReply::pre_accept_failed(inst.highest_seen);
        }

        // a delayed message: never go backward
        if inst.status.is_committed()
            || (req.ballot == inst.highest_seen && inst.status > InstanceStatus::PreAccepted)
        {
            return MakeReply::pre_accept_failed(inst.highest_seen);
        }

        let (seq, deps, changed) = if req.cmd.is_noop() {
            (req.seq, req.deps.clone(), false)
        } else {
            st.keys
                .merge_attrs(&req.dkey, iid.replica_id, req.seq, &req.deps)
        };

        inst.adopt(req.cmd, req.dkey, seq, deps);
        inst.ballot = req.ballot;
        inst.highest_seen = req.ballot;
        inst.status = InstanceStatus::PreAccepted;

        if !inst.is_noop() {
            st.keys.record(&inst.dkey, iid, inst.seq, &inst.deps);
        }

        let status = if changed {
            PreAcceptStatus::NonIdentical
        } else {
            PreAcceptStatus::Identical
        };

        debug!(self.logger, "pre-accepted"; "inst" => %inst, "reply" => ?status);
        MakeReply::pre_accept(status, inst)
    }

    pub fn handle_accept(&self, req: AcceptRequest) -> AcceptReply {
        let iid = req.instance_id;

        let mut guard = self.state.lock();
        let st = &mut *guard;

        let inst = match st.space.entry(iid) {
            Some(x) => x,
            // executed long ago, thus committed
            None => return MakeReply::accept(true, req.ballot),
        };

        if req.ballot < inst.highest_seen {
            debug!(self.logger, "accept: stale ballot";
                   "iid" => %iid, "ballot" => %req.ballot, "seen" => %inst.highest_seen);
            return MakeReply::accept(false, inst.highest_seen);
        }

        if inst.status.is_committed() {
            return MakeReply::accept(true, inst.highest_seen);
        }

        inst.adopt(req.cmd, req.dkey, req.seq, req.deps);
        inst.ballot = req.ballot;
        inst.highest_seen = req.ballot;
        inst.status = InstanceStatus::Accepted;

        if !inst.is_noop() {
            st.keys.record(&inst.dkey, iid, inst.seq, &inst.deps);
        }

        debug!(self.logger, "accepted"; "inst" => %inst);
        MakeReply::accept(true, req.ballot)
    }

    pub fn handle_commit(&self, req: CommitRequest) -> CommitReply {
        let iid = req.instance_id;

        let parked = {
            let mut guard = self.state.lock();
            let st = &mut *guard;

            let inst = match st.space.entry(iid) {
                Some(x) => x,
                None => return CommitReply { ok: true },
            };

            if inst.status.is_committed() {
                if inst.cmd != req.cmd {
                    crit!(self.logger, "committed twice with different commands";
                          "inst" => %inst, "cmd" => ?req.cmd);
                }
                return CommitReply { ok: true };
            }

            inst.adopt(req.cmd, req.dkey, req.seq, req.deps);
            inst.ballot = req.ballot;
            if req.ballot > inst.highest_seen {
                inst.highest_seen = req.ballot;
            }
            inst.status = InstanceStatus::Committed;

            if !inst.is_noop() {
                st.keys.record(&inst.dkey, iid, inst.seq, &inst.deps);
            }

            debug!(self.logger, "committed"; "inst" => %inst);
            st.waiters.committed(iid)
        };

        self.trigger_execution(iid);
        for root in parked {
            self.trigger_execution(root);
        }

        CommitReply { ok: true }
    }

    pub fn handle_prepare(&self, req: PrepareRequest) -> PrepareReply {
        let iid = req.instance_id;

        let mut guard = self.state.lock();
        let st = &mut *guard;

        let inst = match st.space.entry(iid) {
            Some(x) => x,
            None => return MakeReply::prepare_purged(self.replica_id, iid),
        };

        if !inst.promise(req.ballot) {
            debug!(self.logger, "prepare: stale ballot";
                   "iid" => %iid, "ballot" => %req.ballot, "seen" => %inst.highest_seen);
            return MakeReply::prepare(false, self.replica_id, inst);
        }

        MakeReply::prepare(true, self.replica_id, inst)
    }
}

impl Handler<Request, Reply> for Replica {
    fn handle(&self, req: Request) -> Reply {
        match req {
            Request::PreAccept(r) => Reply::PreAccept(self.handle_pre_accept(r)),
            Request::Accept(r) => Reply::Accept(self.handle_accept(r)),
            Request::Commit(r) => Reply::Commit(self.handle_commit(r)),
            Request::Prepare(r) => Reply::Prepare(self.handle_prepare(r)),
        }
    }
}
