mod broadcast;
mod errors;
mod prepare;
mod replication;

pub use broadcast::*;
pub use errors::*;
pub use self::replication::*;
