mod event;
mod recovery;

pub use event::*;
pub use recovery::*;

#[cfg(test)]
mod test_event;
#[cfg(test)]
mod test_recovery;
