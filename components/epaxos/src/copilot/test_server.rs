use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
use pretty_assertions::assert_eq;

use super::*;
use crate::comm::LocalNetwork;
use crate::conf::ClusterConf;
use crate::conf::ConfError;
use crate::testutil::discard_logger;
use crate::testutil::wait_for;
use crate::testutil::Recorder;
use crate::types::Ballot;
use crate::types::Command;
use crate::types::InstanceStatus;
use crate::types::ReplicaId;

/// new_server builds server `rid` of a 3-replica group whose peers are never registered.
fn new_server(rid: ReplicaId) -> Arc<CopilotServer> {
    let conf = ClusterConf::new_local(3);
    let net = LocalNetwork::<CopilotRequest, CopilotReply>::new();
    CopilotServer::new(rid, &conf, net.communicator(rid), Recorder::new(), &discard_logger())
        .unwrap()
}

fn fast_accept(log: LogKind, slot: i64, dep: i64, owner: ReplicaId) -> FastAcceptRequest {
    FastAcceptRequest {
        ballot: Ballot::default_of(0, owner),
        slot_id: SlotId::new(log, slot),
        cmd: Command::write(format!("{}:{}", log, slot)),
        dep,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_server_roles() {
    assert_eq!(Some(LogKind::Pilot), new_server(1).role);
    assert_eq!(Some(LogKind::Copilot), new_server(2).role);
    assert_eq!(None, new_server(3).role);

    let s = new_server(3);
    assert_eq!(
        Err(CopilotError::NotPilot(3)),
        s.propose(Command::write("x")).await
    );

    let mut conf = ClusterConf::new_local(3);
    conf.pilots = vec![];
    let net = LocalNetwork::<CopilotRequest, CopilotReply>::new();
    let rst = CopilotServer::new(1, &conf, net.communicator(1), Recorder::new(), &discard_logger());
    assert!(matches!(rst, Err(ConfError::BadPilots(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_handle_fast_accept() {
    let s = new_server(3);

    let rep = s.handle_fast_accept(fast_accept(LogKind::Pilot, 1, 0, 1));
    assert_eq!(
        FastAcceptReply {
            ok: true,
            highest_seen: Ballot::default_of(0, 1),
            dep: 0,
            compatible: true,
        },
        rep
    );
    let inst = s.get_instance(SlotId::new(LogKind::Pilot, 1)).unwrap();
    assert_eq!(InstanceStatus::PreAccepted, inst.status);
    assert_eq!(1, s.state.lock().logs.log(LogKind::Pilot).max_accepted);

    // copilot:1 proposed before pilot:1 was seen: it has to follow pilot:1
    let rep = s.handle_fast_accept(fast_accept(LogKind::Copilot, 1, 0, 2));
    assert!(rep.ok);
    assert!(!rep.compatible);
    assert_eq!(1, rep.dep);

    let inst = s.get_instance(SlotId::new(LogKind::Copilot, 1)).unwrap();
    assert_eq!(InstanceStatus::NotStarted, inst.status);
    assert_eq!(0, s.state.lock().logs.log(LogKind::Copilot).max_accepted);

    // a stale ballot
    let mut req = fast_accept(LogKind::Pilot, 1, 0, 1);
    req.ballot = Ballot::default();
    let rep = s.handle_fast_accept(req);
    assert!(!rep.ok);
    assert_eq!(Ballot::default_of(0, 1), rep.highest_seen);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_handle_accept() {
    let s = new_server(3);
    let sid = SlotId::new(LogKind::Copilot, 1);

    let rep = s.handle_accept(AcceptRequest {
        ballot: Ballot::default_of(0, 2),
        slot_id: sid,
        cmd: Command::write("c1"),
        dep: 1,
    });
    assert_eq!(
        AcceptReply {
            ok: true,
            highest_seen: Ballot::default_of(0, 2)
        },
        rep
    );

    let inst = s.get_instance(sid).unwrap();
    assert_eq!((InstanceStatus::Accepted, 1), (inst.status, inst.dep));
    assert_eq!(1, s.state.lock().logs.log(LogKind::Copilot).max_accepted);

    // a promise to a higher ballot rejects the old proposer
    let higher = Ballot::new(0, 1, 3);
    let prep = s.handle_prepare(PrepareRequest {
        ballot: higher,
        slot_id: sid,
    });
    assert!(prep.ok);
    assert_eq!(InstanceStatus::Accepted, prep.status);
    assert_eq!(Ballot::default_of(0, 2), prep.ballot);
    assert_eq!(higher, prep.highest_seen);

    let rep = s.handle_accept(AcceptRequest {
        ballot: Ballot::default_of(0, 2),
        slot_id: sid,
        cmd: Command::write("c1"),
        dep: 1,
    });
    assert_eq!(
        AcceptReply {
            ok: false,
            highest_seen: higher
        },
        rep
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_handle_commit() {
    let s = new_server(3);
    let sid = SlotId::new(LogKind::Pilot, 1);

    let req = CommitRequest {
        ballot: Ballot::default_of(0, 1),
        slot_id: sid,
        cmd: Command::write("p1"),
        dep: 0,
    };
    assert_eq!(CommitReply { ok: true }, s.handle_commit(req.clone()));
    assert_eq!(1, s.max_committed(LogKind::Pilot));

    // idempotent
    assert_eq!(CommitReply { ok: true }, s.handle_commit(req));

    let executed = wait_for(Duration::from_secs(2), || {
        s.max_executed(LogKind::Pilot) == 1
    })
    .await;
    assert!(executed);
    assert_eq!(
        InstanceStatus::Executed,
        s.get_instance(sid).unwrap().status
    );

    // a committed entry is never fast accepted again
    let rep = s.handle_fast_accept(fast_accept(LogKind::Pilot, 1, 0, 1));
    assert!(!rep.ok);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_handle_prepare_stale() {
    let s = new_server(3);
    let sid = SlotId::new(LogKind::Pilot, 2);

    let rep = s.handle_prepare(PrepareRequest {
        ballot: Ballot::new(0, 2, 2),
        slot_id: sid,
    });
    assert!(rep.ok);
    assert_eq!(InstanceStatus::NotStarted, rep.status);
    assert_eq!(3, rep.replica_id);

    let rep = s.handle_prepare(PrepareRequest {
        ballot: Ballot::new(0, 1, 2),
        slot_id: sid,
    });
    assert!(!rep.ok);
    assert_eq!(Ballot::new(0, 2, 2), rep.highest_seen);
}
