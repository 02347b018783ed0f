use crate::replication::ReplicationError;
use crate::types::ReplicaId;

quick_error! {
    /// CopilotError is an error proposing through a Copilot server.
    #[derive(Debug, Clone, Eq, PartialEq)]
    pub enum CopilotError {
        /// Only the pilot and the copilot propose.
        NotPilot(rid: ReplicaId) {
            display("replica {} is neither pilot nor copilot", rid)
        }

        Replication(err: ReplicationError) {
            from()
            display("{}", err)
            source(err)
        }
    }
}
