mod keytable;

pub use keytable::*;
