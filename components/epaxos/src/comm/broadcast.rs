use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use super::Communicator;
use crate::quorum::Vote;
use crate::types::ReplicaId;

/// bcast sends `req` to every replica in `to`, concurrently, and delivers each outcome as a vote
/// through `tx`. A transport failure is delivered as `Vote::Unreachable`.
///
/// It returns at once; the caller waits on the QuorumEvent that owns the receiving end.
pub fn bcast<Req, Rep, R, F>(
    comm: &Arc<dyn Communicator<Req, Rep>>,
    to: &[ReplicaId],
    req: Req,
    tx: UnboundedSender<Vote<R>>,
    classify: F,
) where
    Req: Clone + Send + 'static,
    Rep: Send + 'static,
    R: Send + 'static,
    F: Fn(Rep) -> Vote<R> + Clone + Send + 'static,
{
    for rid in to.iter().copied() {
        let comm = comm.clone();
        let req = req.clone();
        let tx = tx.clone();
        let classify = classify.clone();

        tokio::spawn(async move {
            let v = match comm.send(rid, req).await {
                Ok(rep) => classify(rep),
                Err(_) => Vote::Unreachable,
            };
            // the event may be resolved and gone already
            let _ = tx.send(v);
        });
    }
}
