use crate::types::ReplicaId;

quick_error! {
    #[derive(Debug)]
    pub enum ConfError {
        IOError(e: std::io::Error) {
            from(e: std::io::Error) -> (e)
        }

        BadYaml(e: serde_yaml::Error) {
            from(e: serde_yaml::Error) -> (e)
        }

        EmptyGroup {
            display("no replica configured")
        }

        DupReplica(rid: ReplicaId) {
            display("duplicated replica: {}", rid)
        }

        OrphanPilot(rid: ReplicaId) {
            display("pilot {} is not a replica", rid)
        }

        BadPilots(reason: String) {
            display("bad pilots: {}", reason)
        }

        BadFastQuorum(fast_quorum: usize, n: usize) {
            display("fast quorum {} must be {}, every replica", fast_quorum, n)
        }

        BadProtocol(reason: String) {
            display("bad protocol conf: {}", reason)
        }
    }
}

impl PartialEq<ConfError> for ConfError {
    fn eq(&self, other: &ConfError) -> bool {
        match (self, other) {
            (Self::IOError(a), Self::IOError(b)) => a.kind() == b.kind(),
            (Self::BadYaml(_), Self::BadYaml(_)) => true,
            (Self::EmptyGroup, Self::EmptyGroup) => true,
            (Self::DupReplica(a), Self::DupReplica(b)) => a == b,
            (Self::OrphanPilot(a), Self::OrphanPilot(b)) => a == b,
            (Self::BadPilots(a), Self::BadPilots(b)) => a == b,
            (Self::BadFastQuorum(a, b), Self::BadFastQuorum(x, y)) => a == x && b == y,
            (Self::BadProtocol(a), Self::BadProtocol(b)) => a == b,
            _ => false,
        }
    }
}
