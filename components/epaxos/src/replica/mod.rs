mod exec;
mod handlers;
mod replica;
mod space;

pub use self::replica::*;
pub use space::*;

#[cfg(test)]
mod test_handlers;
#[cfg(test)]
mod test_space;
