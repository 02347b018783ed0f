mod errors;
mod runner;

pub use errors::*;
pub use self::runner::*;

#[cfg(test)]
mod test_runner;
