//! How replicas talk to each other.

mod broadcast;
mod errors;
mod local;

pub use broadcast::*;
pub use errors::*;
pub use local::*;

use async_trait::async_trait;

use crate::types::ReplicaId;

/// Communicator sends one request to one peer and waits for its reply.
#[async_trait]
pub trait Communicator<Req, Rep>: Send + Sync
where
    Req: Send + 'static,
    Rep: Send + 'static,
{
    /// me returns the id of the replica this communicator sends on behalf of.
    fn me(&self) -> ReplicaId;

    async fn send(&self, to: ReplicaId, req: Req) -> Result<Rep, TransportError>;
}

/// Handler serves requests addressed to one replica.
pub trait Handler<Req, Rep>: Send + Sync {
    fn handle(&self, req: Req) -> Rep;
}

#[cfg(test)]
mod test_local;
