use std::any::Any;
use std::collections::BTreeMap;

use crate::buffer::FramedBuffer;
use crate::error::Error;

/// Marker trait for anything the registry can hand back after decoding a
/// framed buffer (a model, a node, or a solution).
pub trait Knowledge: Any + Send + Sync {
    /// Gives access to `self` as `dyn Any`, so callers can downcast back to
    /// their own concrete kind after a registry decode.
    fn as_any(&self) -> &dyn Any;
}

/// A prototype capable of reconstructing a concrete [`Knowledge`] value from
/// a framed buffer carrying its type tag.
pub trait Prototype: Send + Sync {
    /// Consumes `buf` and yields a freshly constructed value.
    fn decode(&self, buf: &mut FramedBuffer) -> Result<Box<dyn Knowledge>, Error>;
}

/// A process-wide mapping from type tag to the prototype that can decode it.
///
/// Populated at startup, before any message is received, and immutable for
/// the rest of the search. Keys are ordered lexicographically by
/// byte value, which is what [`BTreeMap<String, _>`] gives for free.
#[derive(Default)]
pub struct Registry {
    prototypes: BTreeMap<String, Box<dyn Prototype>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Registry {
            prototypes: BTreeMap::new(),
        }
    }

    /// Registers `prototype` under `type_tag`, overwriting any prior
    /// registration for the same tag.
    pub fn register(&mut self, type_tag: impl Into<String>, prototype: Box<dyn Prototype>) {
        self.prototypes.insert(type_tag.into(), prototype);
    }

    /// Looks up `buf`'s type tag and delegates decoding to the matching
    /// prototype.
    pub fn decode(&self, buf: &mut FramedBuffer) -> Result<Box<dyn Knowledge>, Error> {
        let prototype = self
            .prototypes
            .get(buf.type_tag())
            .ok_or_else(|| Error::UnknownType(buf.type_tag().to_string()))?;
        prototype.decode(buf)
    }

    /// Whether a prototype is registered for `type_tag`.
    pub fn contains(&self, type_tag: &str) -> bool {
        self.prototypes.contains_key(type_tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(i32);

    impl Knowledge for Counter {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct CounterPrototype;

    impl Prototype for CounterPrototype {
        fn decode(&self, buf: &mut FramedBuffer) -> Result<Box<dyn Knowledge>, Error> {
            Ok(Box::new(Counter(buf.read::<i32>()?)))
        }
    }

    #[test]
    fn decodes_through_the_registered_prototype() {
        let mut registry = Registry::new();
        registry.register("counter", Box::new(CounterPrototype));

        let mut buf = FramedBuffer::new("counter");
        buf.write(42i32);
        buf.rewind();

        let decoded = registry.decode(&mut buf).unwrap();
        let counter = decoded.as_any().downcast_ref::<Counter>().unwrap();
        assert_eq!(counter.0, 42);
    }

    #[test]
    fn unregistered_tag_is_an_error() {
        let registry = Registry::new();
        let mut buf = FramedBuffer::new("mystery");
        assert!(matches!(
            registry.decode(&mut buf),
            Err(Error::UnknownType(tag)) if tag == "mystery"
        ));
    }
}
