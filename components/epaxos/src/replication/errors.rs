use crate::quorum::EventStatus;
use crate::types::Ballot;

quick_error! {
    /// ReplicationError is an error encountered during replicating an instance.
    #[derive(Debug, Clone, Eq, PartialEq)]
    pub enum ReplicationError {
        NotEnoughQuorum(phase: &'static str, want: usize, got: usize) {
            display("{}: want at least {} replies, but:{}", phase, want, got)
        }

        /// Someone else is leading the instance with a higher ballot.
        Preempted(ballot: Ballot) {
            display("preempted by ballot {}", ballot)
        }

        Purged(id: String) {
            display("instance {} is purged", id)
        }

        NotFound(id: String) {
            display("instance {} not found", id)
        }

        /// The round did not resolve before its deadline.
        Timeout(phase: &'static str) {
            display("{}: timed out", phase)
        }

        Shutdown {
            display("replica is shut down")
        }
    }
}

impl ReplicationError {
    /// round_failed builds the error of a round that did not reach a quorum of yes votes.
    /// A round that ran out of time before a quorum could be ruled out is a Timeout.
    pub fn round_failed(
        phase: &'static str,
        status: EventStatus,
        no: bool,
        want: usize,
        got: usize,
    ) -> Self {
        if status == EventStatus::TimedOut && !no {
            ReplicationError::Timeout(phase)
        } else {
            ReplicationError::NotEnoughQuorum(phase, want, got)
        }
    }
}
