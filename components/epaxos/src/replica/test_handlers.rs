use std::sync::Arc;
use std::sync::Weak;
use std::time::Duration;

use parking_lot::Mutex;
#[cfg(test)]
use pretty_assertions::assert_eq;

use super::*;
use crate::comm::LocalNetwork;
use crate::conf::ClusterConf;
use crate::exec::Apply;
use crate::message::MakeRequest;
use crate::message::PreAcceptStatus;
use crate::message::PrepareRequest;
use crate::message::Reply;
use crate::message::Request;
use crate::testutil::discard_logger;
use crate::testutil::wait_for;
use crate::testutil::Recorder;
use crate::types::Ballot;
use crate::types::Command;
use crate::types::InstanceStatus;
use crate::types::ReplicaId;

/// new_replica builds a replica of a 3-replica group whose peers are never registered.
fn new_replica(rid: ReplicaId, conf: &ClusterConf) -> (Arc<Replica>, Arc<Recorder>) {
    let net = LocalNetwork::<Request, Reply>::new();
    let rec = Recorder::new();
    let r = Replica::new(rid, conf, net.communicator(rid), rec.clone(), &discard_logger());
    (r, rec)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_handle_pre_accept() {
    let (r, _) = new_replica(2, &ClusterConf::new_local(3));

    let req = MakeRequest::pre_accept(&inst!((1, 1), "x", 1, [], PreAccepted));
    let rep = r.handle_pre_accept(req);
    assert_eq!(PreAcceptStatus::Identical, rep.status);
    assert_eq!((1, deps![]), (rep.seq, rep.deps));
    assert_eq!(Ballot::default_of(0, 1), rep.highest_seen);

    let inst = r.get_instance(instid!(1, 1)).unwrap();
    assert_eq!(InstanceStatus::PreAccepted, inst.status);

    // (3, 1) on the same key has to follow (1, 1)
    let req = MakeRequest::pre_accept(&inst!((3, 1), "x", 1, [], PreAccepted));
    let rep = r.handle_pre_accept(req);
    assert_eq!(PreAcceptStatus::NonIdentical, rep.status);
    assert_eq!((2, deps![(1, 1)]), (rep.seq, rep.deps));

    // another key does not interfere
    let req = MakeRequest::pre_accept(&inst!((3, 2), "y", 1, [(3, 1)], PreAccepted));
    let rep = r.handle_pre_accept(req);
    assert_eq!(PreAcceptStatus::Identical, rep.status);
    assert_eq!((1, deps![(3, 1)]), (rep.seq, rep.deps));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_handle_pre_accept_stale() {
    let (r, _) = new_replica(2, &ClusterConf::new_local(3));
    let higher = ballot!(0, 1, 3);

    let rep = r.handle_prepare(MakeRequest::prepare(higher, instid!(1, 1)));
    assert!(rep.ok);
    assert_eq!(InstanceStatus::NotStarted, rep.status);

    let req = MakeRequest::pre_accept(&inst!((1, 1), "x", 1, [], PreAccepted));
    let rep = r.handle_pre_accept(req);
    assert_eq!(PreAcceptStatus::Failed, rep.status);
    assert_eq!(higher, rep.highest_seen);

    // a lower prepare is refused but still reports the state
    let rep = r.handle_prepare(PrepareRequest {
        ballot: ballot!(0, 1, 2),
        instance_id: instid!(1, 1),
    });
    assert!(!rep.ok);
    assert_eq!(higher, rep.highest_seen);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_handle_accept() {
    let (r, _) = new_replica(2, &ClusterConf::new_local(3));

    let inst = inst!((1, 2), "y", 5, [(3, 1)], Accepted);
    let rep = r.handle_accept(MakeRequest::accept(&inst));
    assert!(rep.ok);
    assert_eq!(Ballot::default_of(0, 1), rep.highest_seen);

    let got = r.get_instance(instid!(1, 2)).unwrap();
    assert_eq!(InstanceStatus::Accepted, got.status);
    assert_eq!((5, deps![(3, 1)]), (got.seq, got.deps));

    // a pre-accept of the same round can not move it back
    let rep = r.handle_pre_accept(MakeRequest::pre_accept(&inst));
    assert_eq!(PreAcceptStatus::Failed, rep.status);

    let higher = ballot!(0, 2, 3);
    assert!(r.handle_prepare(MakeRequest::prepare(higher, instid!(1, 2))).ok);

    let rep = r.handle_accept(MakeRequest::accept(&inst));
    assert!(!rep.ok);
    assert_eq!(higher, rep.highest_seen);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_handle_commit() {
    let (r, rec) = new_replica(2, &ClusterConf::new_local(3));

    let inst = inst!((1, 1), "z", 1, [], Committed);
    assert!(r.handle_commit(MakeRequest::commit(&inst)).ok);

    let executed = wait_for(Duration::from_secs(2), || r.max_executed(1) == 1).await;
    assert!(executed);
    assert_eq!(vec!["z=(1, 1)"], rec.payloads());

    // idempotent
    assert!(r.handle_commit(MakeRequest::commit(&inst)).ok);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(1, rec.len());

    let rep = r.handle_pre_accept(MakeRequest::pre_accept(&inst));
    assert_eq!(PreAcceptStatus::Failed, rep.status);

    let rep = r.handle_prepare(MakeRequest::prepare(ballot!(0, 1, 2), instid!(1, 1)));
    assert!(rep.ok);
    assert_eq!(InstanceStatus::Executed, rep.status);
    assert_eq!(inst.cmd, rep.cmd);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_handle_purged() {
    let mut conf = ClusterConf::new_local(3);
    conf.protocol.retention_window = 0;
    let (r, _) = new_replica(2, &conf);

    let a = inst!((1, 1), "a", 1, [], Committed);
    let b = inst!((1, 2), "b", 1, [], Committed);
    r.handle_commit(MakeRequest::commit(&a));
    r.handle_commit(MakeRequest::commit(&b));

    let purged = wait_for(Duration::from_secs(2), || r.is_purged(instid!(1, 1))).await;
    assert!(purged);
    assert_eq!(None, r.get_instance(instid!(1, 1)));

    let rep = r.handle_prepare(MakeRequest::prepare(ballot!(0, 1, 2), instid!(1, 1)));
    assert!(!rep.ok);
    assert_eq!(InstanceStatus::Executed, rep.status);

    assert!(r.handle_accept(MakeRequest::accept(&a)).ok);
    assert!(r.handle_commit(MakeRequest::commit(&a)).ok);
    assert_eq!(
        PreAcceptStatus::Failed,
        r.handle_pre_accept(MakeRequest::pre_accept(&a)).status
    );

    // a purged instance is never recreated
    assert_eq!(None, r.get_instance(instid!(1, 1)));
}

/// ReadBack is an applier that looks the applied instance up in its own replica.
#[derive(Default)]
struct ReadBack {
    replica: Mutex<Option<Weak<Replica>>>,
    seen: Mutex<Vec<Option<InstanceStatus>>>,
}

impl Apply for ReadBack {
    fn apply(&self, _cmd: &Command) {
        let r = self.replica.lock().as_ref().and_then(|w| w.upgrade());
        if let Some(r) = r {
            let status = r.get_instance(instid!(1, 1)).map(|x| x.status);
            self.seen.lock().push(status);
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_applier_reads_replica() {
    let net = LocalNetwork::<Request, Reply>::new();
    let app = Arc::new(ReadBack::default());
    let conf = ClusterConf::new_local(3);
    let r = Replica::new(2, &conf, net.communicator(2), app.clone(), &discard_logger());
    *app.replica.lock() = Some(Arc::downgrade(&r));

    assert!(r.handle_commit(MakeRequest::commit(&inst!((1, 1), "x", 1, [], Committed))).ok);

    let executed = wait_for(Duration::from_secs(2), || r.max_executed(1) == 1).await;
    assert!(executed);

    // applied without the replica lock, before being marked executed
    assert_eq!(vec![Some(InstanceStatus::Committed)], *app.seen.lock());
    assert_eq!(
        InstanceStatus::Executed,
        r.get_instance(instid!(1, 1)).unwrap().status
    );
}
