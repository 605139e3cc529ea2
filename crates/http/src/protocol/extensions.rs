use std::any::{Any, TypeId};
use std::fmt::{self, Debug, Formatter};

/// Typed per-message side channel.
///
/// Pipeline stages can stash values on a message that never appear on the
/// wire (an authenticated user, a route capture, a request id). Instead of a
/// stringly-keyed `Any` map, each entry is keyed by its Rust type: one slot
/// per type, insertion order retained.
#[derive(Default)]
pub struct Extensions {
    slots: Vec<(TypeId, Box<dyn Any + Send + Sync>)>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value`, replacing and returning any previous value of the
    /// same type.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) -> Option<T> {
        let previous = self.remove::<T>();
        self.slots.push((TypeId::of::<T>(), Box::new(value)));
        previous
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.slots
            .iter()
            .find(|(id, _)| *id == TypeId::of::<T>())
            .and_then(|(_, slot)| slot.downcast_ref())
    }

    pub fn get_mut<T: Any + Send + Sync>(&mut self) -> Option<&mut T> {
        self.slots
            .iter_mut()
            .find(|(id, _)| *id == TypeId::of::<T>())
            .and_then(|(_, slot)| slot.downcast_mut())
    }

    pub fn remove<T: Any + Send + Sync>(&mut self) -> Option<T> {
        let position = self.slots.iter().position(|(id, _)| *id == TypeId::of::<T>())?;
        let (_, slot) = self.slots.remove(position);
        slot.downcast().ok().map(|boxed| *boxed)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Debug for Extensions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions").field("len", &self.slots.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct RequestId(u64);

    #[derive(Debug, PartialEq)]
    struct User(String);

    #[test]
    fn typed_slots() {
        let mut extensions = Extensions::new();
        assert!(extensions.insert(RequestId(7)).is_none());
        extensions.insert(User("ada".to_string()));

        assert_eq!(extensions.get::<RequestId>(), Some(&RequestId(7)));
        assert_eq!(extensions.get::<User>(), Some(&User("ada".to_string())));
        assert_eq!(extensions.len(), 2);
    }

    #[test]
    fn insert_replaces_same_type() {
        let mut extensions = Extensions::new();
        extensions.insert(RequestId(1));
        let previous = extensions.insert(RequestId(2));

        assert_eq!(previous, Some(RequestId(1)));
        assert_eq!(extensions.get::<RequestId>(), Some(&RequestId(2)));
        assert_eq!(extensions.len(), 1);
    }

    #[test]
    fn remove_takes_ownership() {
        let mut extensions = Extensions::new();
        extensions.insert(RequestId(9));

        assert_eq!(extensions.remove::<RequestId>(), Some(RequestId(9)));
        assert!(extensions.get::<RequestId>().is_none());
    }
}
