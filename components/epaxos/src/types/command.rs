use std::fmt;

use serde::{Deserialize, Serialize};

/// OpCode is the kind of a client command.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpCode {
    NoOp,
    Read,
    Write,
}

/// Command is an opaque client command. The payload is never interpreted by replication.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Command {
    pub op: OpCode,
    pub payload: Vec<u8>,
}

impl Command {
    pub fn noop() -> Command {
        Command {
            op: OpCode::NoOp,
            payload: vec![],
        }
    }

    pub fn read<T: Into<Vec<u8>>>(payload: T) -> Command {
        Command {
            op: OpCode::Read,
            payload: payload.into(),
        }
    }

    pub fn write<T: Into<Vec<u8>>>(payload: T) -> Command {
        Command {
            op: OpCode::Write,
            payload: payload.into(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.op == OpCode::NoOp
    }
}

impl Default for Command {
    fn default() -> Self {
        Command::noop()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.op, String::from_utf8_lossy(&self.payload))
    }
}

impl From<(OpCode, &str)> for Command {
    fn from(t: (OpCode, &str)) -> Command {
        Command {
            op: t.0,
            payload: t.1.as_bytes().to_vec(),
        }
    }
}

/// A bare string is a write command carrying the string as payload.
impl From<&str> for Command {
    fn from(s: &str) -> Command {
        Command::write(s)
    }
}
