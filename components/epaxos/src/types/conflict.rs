/// Conflict is implemented by anything that touches at most one dependency key.
///
/// Two values interfere iff both touch a key and it is the same key. Something that touches
/// no key, such as a no-op, interferes with nothing.
pub trait Conflict {
    fn touched_key(&self) -> Option<&str>;

    fn conflict(&self, with: &Self) -> bool {
        match (self.touched_key(), with.touched_key()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}
