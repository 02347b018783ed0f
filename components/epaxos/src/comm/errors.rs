use crate::types::ReplicaId;

quick_error! {
    /// TransportError is an error delivering a request or its reply.
    #[derive(Debug, Clone, Eq, PartialEq)]
    pub enum TransportError {
        Unreachable(from: ReplicaId, to: ReplicaId) {
            display("{} can not reach {}", from, to)
        }
        NoSuchReplica(rid: ReplicaId) {
            display("no such replica: {}", rid)
        }
        Closed {
            display("transport is closed")
        }
    }
}
