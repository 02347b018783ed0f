mod message;

pub use self::message::*;
